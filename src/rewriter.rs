//! Post-order rewrite of species-tree edge lengths.
//!
//! # Algorithm
//! For every internal node `v` (children `L`, `R`, sibling `S`):
//! 1. Take `v`'s annotation. The root's is discarded undecoded.
//! 2. Decode it and run the estimator.
//! 3. Internal edge:
//!    - `v` is a child of the root and `S` is a leaf: `v`'s edge gets `|l_d|`,
//!      or the average terminal length of `S` across gene trees when `l_d`
//!      is exactly zero. Both root edges merge into one when the tree is
//!      derooted, so this is the stretch between `v` and `S`.
//!    - otherwise `v`'s edge gets `|l_internal|`.
//! 4. Pendant edges: leaf `L`, `R`, `S` get `|l_a|`, `|l_b|`, `|l_c|`.
//!
//! Edges that already carry a non-zero length are never overwritten.
//! Every non-root edge must have a length once the pass is done.

use log::{debug, log_enabled, warn, Level};

use crate::annotation::{decode_annotation, AnnotationError};
use crate::error::{CastlesError, Result};
use crate::estimator::{estimate, Estimates};
use crate::gene_trees::GeneTrees;
use crate::species_tree::{NodeId, SpeciesTree};

/// Estimate every missing branch length of `tree` in place.
///
/// Returns the number of edges written.
///
/// # Errors
/// The first malformed annotation, failed estimate or failed taxon lookup
/// aborts the rewrite. [`CastlesError::UnsetEdge`] if an edge was reached by
/// no rule, e.g. a leaf hanging off a root with more than two children.
pub fn annotate_branch_lengths(tree: &mut SpeciesTree, genes: &GeneTrees) -> Result<usize> {
    let mut written = 0;
    let order = tree.postorder();
    for &id in &order {
        if tree.get(id).is_leaf() {
            continue;
        }
        written += rewrite_node(tree, genes, id)?;
    }
    if let Some(&id) = order
        .iter()
        .find(|&&id| !tree.is_root(id) && tree.get(id).edge_length.is_none())
    {
        return Err(CastlesError::UnsetEdge {
            node: tree.describe(id),
        });
    }
    Ok(written)
}

fn rewrite_node(tree: &mut SpeciesTree, genes: &GeneTrees, id: NodeId) -> Result<usize> {
    let raw = tree.get_mut(id).annotation.take();
    if tree.is_root(id) {
        return Ok(0);
    }

    let raw = raw.ok_or_else(|| CastlesError::MalformedAnnotation {
        node: tree.describe(id),
        source: AnnotationError::Missing,
    })?;
    let children = &tree.get(id).children;
    let [left, right] = children[..] else {
        return Err(CastlesError::NonBinaryNode {
            node: tree.describe(id),
            children: children.len(),
        });
    };

    let stats = decode_annotation(&raw).map_err(|source| CastlesError::MalformedAnnotation {
        node: tree.describe(id),
        source,
    })?;
    let est = estimate(&stats, genes.len()).map_err(|source| CastlesError::Estimation {
        node: tree.describe(id),
        source,
    })?;
    if log_enabled!(Level::Debug) {
        log_estimates(&tree.describe(id), &est);
    }

    let parent = tree.get(id).parent;
    let sibling = tree.sibling(id);
    let mut written = 0;

    let internal = match sibling {
        Some(s) if parent.is_some_and(|p| tree.is_root(p)) && tree.get(s).is_leaf() => {
            if tree.get(id).has_length() {
                None
            } else {
                Some(root_edge_length(tree, genes, s, est.l_d)?)
            }
        }
        _ => Some(est.l_internal),
    };
    if let Some(length) = internal {
        written += assign(tree, id, length.abs());
    }

    for (pendant, length) in [(Some(left), est.l_a), (Some(right), est.l_b), (sibling, est.l_c)] {
        if let Some(pendant) = pendant.filter(|&p| tree.get(p).is_leaf()) {
            written += assign(tree, pendant, length.abs());
        }
    }
    Ok(written)
}

/// Length for the edge between a root child and its leaf sibling.
fn root_edge_length(tree: &SpeciesTree, genes: &GeneTrees, sibling: NodeId, l_d: f64) -> Result<f64> {
    if l_d != 0.0 {
        return Ok(l_d);
    }
    let taxon = tree.get(sibling).taxon.as_deref().unwrap_or_default();
    let average = genes.average_terminal_length(taxon)?;
    warn!("l_d is zero next to leaf '{taxon}', using its average gene-tree terminal length {average}");
    Ok(average)
}

fn assign(tree: &mut SpeciesTree, id: NodeId, length: f64) -> usize {
    if tree.set_length_if_unset(id, length) {
        debug!("{}: edge length {length}", tree.describe(id));
        1
    } else {
        0
    }
}

fn log_estimates(node: &str, est: &Estimates) {
    debug!(
        "{node}: p_est {} d_est {} ln_internal {}",
        est.p_est, est.d_est, est.ln_internal
    );
    debug!(
        "{node}: l_formula {} l_naive {} l_mixed {}",
        est.l_formula, est.l_naive, est.l_internal
    );
    debug!(
        "{node}: l_a {} l_b {} l_c {} l_d {}",
        est.l_a, est.l_b, est.l_c, est.l_d
    );
}
