//! Python binding layer for branch-length estimation.
//!
//! Provides Python functions that run the estimator on newick strings or
//! tree files.

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::gene_trees::GeneTrees;
use crate::pipeline::{estimate_newick, run};
use crate::species_tree::SpeciesTree;

/// Estimate SU branch lengths from newick strings.
///
/// Args:
///     species_tree: Annotated species tree in newick format
///     gene_trees: One or more gene trees in newick format
///
/// Returns:
///     The unrooted species tree with branch lengths, in newick format
///
/// Raises:
///     ValueError: If a tree cannot be parsed or an estimate fails
#[pyfunction]
fn annotate_newick(species_tree: &str, gene_trees: &str) -> PyResult<String> {
    let species = SpeciesTree::from_newick(species_tree).map_err(to_py_err)?;
    let genes = GeneTrees::from_newick(gene_trees).map_err(to_py_err)?;
    estimate_newick(species, &genes).map_err(to_py_err)
}

/// Estimate SU branch lengths from tree files and write the result.
///
/// Args:
///     speciestree: Path to the annotated species tree
///     genetrees: Path to the gene trees (may be .gz)
///     outputtree: Output path (.gz compresses)
///
/// Raises:
///     ValueError: If reading, estimation or writing fails
#[pyfunction]
fn annotate_files(speciestree: String, genetrees: String, outputtree: String) -> PyResult<()> {
    run(&speciestree, &genetrees, &outputtree).map_err(to_py_err)
}

fn to_py_err(e: crate::error::CastlesError) -> PyErr {
    PyValueError::new_err(e.to_string())
}

/// Python module definition
#[pymodule]
fn castles(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(annotate_newick, m)?)?;
    m.add_function(wrap_pyfunction!(annotate_files, m)?)?;
    Ok(())
}
