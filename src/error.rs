//! Crate-level error type.
//!
//! Decoder and estimator failures carry their own error enums
//! ([`AnnotationError`], [`EstimationError`]); the rewriter wraps them here
//! together with a description of the species-tree node that failed, so the
//! message printed by the CLI points at the offending clade.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::annotation::AnnotationError;
use crate::estimator::EstimationError;

#[derive(Debug, Error)]
pub enum CastlesError {
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid newick in {context}: {message}")]
    Newick { context: String, message: String },

    #[error("expected exactly one species tree, found {0}")]
    SpeciesTreeCount(usize),

    #[error("no gene trees found in {0}")]
    NoGeneTrees(String),

    #[error("leaf {node} of the {context} has no taxon name")]
    UnnamedLeaf { context: String, node: usize },

    #[error("{node} has {children} children, expected 2")]
    NonBinaryNode { node: String, children: usize },

    #[error("malformed annotation at {node}: {source}")]
    MalformedAnnotation {
        node: String,
        #[source]
        source: AnnotationError,
    },

    #[error("estimation failed at {node}: {source}")]
    Estimation {
        node: String,
        #[source]
        source: EstimationError,
    },

    #[error("{node} has no branch length after estimation")]
    UnsetEdge { node: String },

    #[error("taxon '{taxon}' not found in gene tree {tree}")]
    TaxonLookup { taxon: String, tree: usize },

    #[error("taxon '{taxon}' has no terminal branch length in gene tree {tree}")]
    MissingBranchLength { taxon: String, tree: usize },
}

impl CastlesError {
    /// Process exit code used by the CLI: 2 for unusable input, 3 for a
    /// failed estimation, 4 for output failures.
    pub fn exit_code(&self) -> i32 {
        match self {
            CastlesError::Write { .. } => 4,
            CastlesError::MalformedAnnotation { .. }
            | CastlesError::Estimation { .. }
            | CastlesError::UnsetEdge { .. }
            | CastlesError::TaxonLookup { .. }
            | CastlesError::MissingBranchLength { .. } => 3,
            _ => 2,
        }
    }
}

pub type Result<T> = std::result::Result<T, CastlesError>;
