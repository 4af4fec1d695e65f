//! Crate root: module orchestration and public re-exports.
//!
//! Modules:
//! - `annotation`: decoding per-node quartet statistics from node labels.
//! - `estimator`: closed-form branch-length estimates from those statistics.
//! - `species_tree`: arena-backed species tree, derooting and newick output.
//! - `gene_trees`: gene tree collection (terminal branch lengths by taxon).
//! - `rewriter`: post-order traversal writing estimates onto the tree.
//! - `newick`: quoted-label handling around the `phylotree` parser.
//! - `io`: reading and writing tree files (gzip-aware).
//! - `pipeline`: end-to-end run used by the CLI and the Python bindings.
//! - `api`: Python bindings via `pyo3` (gated behind "python" feature).

pub mod annotation;
pub mod error;
pub mod estimator;
pub mod gene_trees;
pub mod io;
pub mod newick;
pub mod pipeline;
pub mod rewriter;
pub mod species_tree;

#[cfg(feature = "python")]
pub mod api;

// Re-export frequently used types & functions
pub use annotation::{decode_annotation, QuartetStats};
pub use error::{CastlesError, Result};
pub use estimator::{estimate, safe_div, Estimates};
pub use gene_trees::GeneTrees;
pub use pipeline::{estimate_newick, run};
pub use rewriter::annotate_branch_lengths;
pub use species_tree::{Annotation, SpeciesTree};
