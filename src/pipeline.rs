//! End-to-end run: read both inputs, rewrite, deroot, write once.

use std::path::Path;
use std::time::Instant;

use log::info;

use crate::error::Result;
use crate::gene_trees::GeneTrees;
use crate::io::{read_gene_trees, read_species_tree, write_newick};
use crate::rewriter::annotate_branch_lengths;
use crate::species_tree::SpeciesTree;

/// Estimate branch lengths on an in-memory species tree and return the
/// unrooted result as newick text (without trailing newline).
pub fn estimate_newick(mut species: SpeciesTree, genes: &GeneTrees) -> Result<String> {
    let t0 = Instant::now();
    let written = annotate_branch_lengths(&mut species, genes)?;
    info!(
        "Estimated {written} branch lengths in {:.3}s",
        t0.elapsed().as_secs_f64()
    );
    species.deroot();
    Ok(species.to_newick())
}

/// Run the whole pipeline on files. Nothing is written unless every branch
/// was estimated.
pub fn run<P: AsRef<Path>>(species_path: P, genes_path: P, output_path: P) -> Result<()> {
    let t0 = Instant::now();
    let species = read_species_tree(species_path.as_ref())?;
    let genes = read_gene_trees(genes_path.as_ref())?;
    info!(
        "Read species tree with {} taxa and {} gene trees in {:.3}s",
        species.leaves().len(),
        genes.len(),
        t0.elapsed().as_secs_f64()
    );

    let newick = estimate_newick(species, &genes)?;

    let t1 = Instant::now();
    write_newick(output_path.as_ref(), &newick)?;
    info!(
        "Writing to {:?} {:.3}s",
        output_path.as_ref(),
        t1.elapsed().as_secs_f64()
    );
    Ok(())
}
