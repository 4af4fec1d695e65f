//! Gene tree collection, reduced to what the rewriter needs: the number of
//! trees and each tree's terminal branch lengths by taxon.

use std::collections::HashMap;

use phylotree::tree::Tree as PhyloTree;

use crate::error::{CastlesError, Result};
use crate::newick::MaskedNewick;

#[derive(Debug, Clone, Default)]
pub struct GeneTrees {
    /// Per tree: taxon -> length of its pendant edge.
    terminal_lengths: Vec<HashMap<String, Option<f64>>>,
}

impl GeneTrees {
    /// Parse one or more `;`-terminated gene trees.
    ///
    /// # Errors
    /// Newick syntax errors, unnamed leaves, or no trees at all.
    pub fn from_newick(input: &str) -> Result<Self> {
        let masked = MaskedNewick::new(input, "gene trees")?;
        let trees = masked.parse_trees("gene trees")?;
        if trees.is_empty() {
            return Err(CastlesError::NoGeneTrees("gene tree input".to_string()));
        }

        let terminal_lengths = trees
            .iter()
            .enumerate()
            .map(|(idx, tree)| terminal_lengths(idx, tree, &masked))
            .collect::<Result<Vec<_>>>()?;
        Ok(GeneTrees { terminal_lengths })
    }

    pub fn len(&self) -> usize {
        self.terminal_lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terminal_lengths.is_empty()
    }

    /// Mean pendant-edge length of `taxon` over all gene trees.
    ///
    /// # Errors
    /// [`CastlesError::TaxonLookup`] if a tree lacks the taxon,
    /// [`CastlesError::MissingBranchLength`] if its pendant edge has no length.
    pub fn average_terminal_length(&self, taxon: &str) -> Result<f64> {
        let mut sum = 0.0;
        for (tree, lengths) in self.terminal_lengths.iter().enumerate() {
            let length = lengths.get(taxon).ok_or_else(|| CastlesError::TaxonLookup {
                taxon: taxon.to_string(),
                tree,
            })?;
            sum += length.ok_or_else(|| CastlesError::MissingBranchLength {
                taxon: taxon.to_string(),
                tree,
            })?;
        }
        Ok(sum / self.terminal_lengths.len() as f64)
    }
}

fn terminal_lengths(
    idx: usize,
    tree: &PhyloTree,
    masked: &MaskedNewick,
) -> Result<HashMap<String, Option<f64>>> {
    tree.get_leaves()
        .into_iter()
        .map(|leaf_id| {
            let node = tree.get(&leaf_id).map_err(|e| CastlesError::Newick {
                context: format!("gene tree {idx}"),
                message: e.to_string(),
            })?;
            let name = node.name.as_deref().ok_or_else(|| CastlesError::UnnamedLeaf {
                context: format!("gene tree {idx}"),
                node: leaf_id,
            })?;
            Ok((masked.resolve(name), node.parent_edge))
        })
        .collect()
}
