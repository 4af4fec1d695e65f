//! Species tree stored as an arena of indexed nodes.
//!
//! Parent/child relations are plain indices into one `Vec`, so sibling and
//! grandparent lookups during the rewrite need no shared ownership. Topology
//! is fixed after parsing; the rewrite only touches edge lengths and
//! annotations.
//!
//! # Example
//! ```text
//!          root
//!         /    \
//!       v1      v2          v1, v2 carry Pending annotations,
//!      /  \    /  \         leaves carry taxa, edges optional lengths
//!     A    B  C    D
//! ```

use itertools::Itertools;
use phylotree::tree::Tree as PhyloTree;

use crate::error::{CastlesError, Result};
use crate::newick::{quote_label, MaskedNewick};

pub type NodeId = usize;

/// Single-use quartet annotation attached to an internal node.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Annotation {
    /// The node never carried a label.
    #[default]
    Absent,
    /// Raw label text, not yet decoded.
    Pending(String),
    /// Label has been handed out by [`Annotation::take`].
    Consumed,
}

impl Annotation {
    /// Hand out the raw label once. Later calls return `None`.
    pub fn take(&mut self) -> Option<String> {
        match std::mem::take(self) {
            Annotation::Pending(raw) => {
                *self = Annotation::Consumed;
                Some(raw)
            }
            other => {
                *self = other;
                None
            }
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Annotation::Pending(_))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpeciesNode {
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Taxon name; set on leaves only.
    pub taxon: Option<String>,
    /// Length of the edge towards the parent.
    pub edge_length: Option<f64>,
    pub annotation: Annotation,
}

impl SpeciesNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Whether the edge already carries a usable length. A missing length and
    /// an explicit `0` both count as unset.
    pub fn has_length(&self) -> bool {
        matches!(self.edge_length, Some(length) if length != 0.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesTree {
    nodes: Vec<SpeciesNode>,
    root: NodeId,
}

impl SpeciesTree {
    /// Tree consisting of a bare root.
    pub fn new() -> Self {
        SpeciesTree {
            nodes: vec![SpeciesNode::default()],
            root: 0,
        }
    }

    /// Append a node below `parent` and return its id.
    pub fn add_child(&mut self, parent: NodeId, node: SpeciesNode) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(SpeciesNode {
            parent: Some(parent),
            ..node
        });
        self.nodes[parent].children.push(id);
        id
    }

    /// Parse a single species tree. Quoted internal labels become pending
    /// annotations, existing branch lengths are kept.
    ///
    /// # Errors
    /// Newick syntax errors, more or fewer than one tree, unnamed leaves.
    pub fn from_newick(input: &str) -> Result<Self> {
        let masked = MaskedNewick::new(input, "species tree")?;
        let trees = masked.parse_trees("species tree")?;
        match trees.as_slice() {
            [tree] => Self::from_phylo(tree, &masked),
            _ => Err(CastlesError::SpeciesTreeCount(trees.len())),
        }
    }

    fn from_phylo(tree: &PhyloTree, masked: &MaskedNewick) -> Result<Self> {
        let phylo_root = tree.get_root().map_err(newick_error)?;

        let mut species = SpeciesTree::new();
        let mut stack = vec![(phylo_root, species.root)];
        while let Some((phylo_id, id)) = stack.pop() {
            let node = tree.get(&phylo_id).map_err(newick_error)?;
            let name = node.name.as_deref().map(|n| masked.resolve(n));

            let target = &mut species.nodes[id];
            target.edge_length = node.parent_edge;
            if node.children.is_empty() {
                target.taxon = Some(name.ok_or(CastlesError::UnnamedLeaf {
                    context: "species tree".to_string(),
                    node: phylo_id,
                })?);
            } else if let Some(label) = name {
                target.annotation = Annotation::Pending(label);
            }

            // Children are allocated in order, then visited.
            for &child in &node.children {
                let child_id = species.add_child(id, SpeciesNode::default());
                stack.push((child, child_id));
            }
        }
        Ok(species)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn is_root(&self, id: NodeId) -> bool {
        id == self.root
    }

    pub fn get(&self, id: NodeId) -> &SpeciesNode {
        &self.nodes[id]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut SpeciesNode {
        &mut self.nodes[id]
    }

    /// Nodes reachable from the root, children before parents, children in
    /// input order.
    pub fn postorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![(self.root, false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                order.push(id);
                continue;
            }
            stack.push((id, true));
            for &child in self.nodes[id].children.iter().rev() {
                stack.push((child, false));
            }
        }
        order
    }

    /// Leaves reachable from the root, left to right.
    pub fn leaves(&self) -> Vec<NodeId> {
        self.postorder()
            .into_iter()
            .filter(|&id| self.nodes[id].is_leaf())
            .collect()
    }

    /// The other one of the parent's first two children. For a
    /// multifurcating root, children beyond the second have no sibling.
    pub fn sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.nodes[id].parent?;
        match self.nodes[parent].children[..] {
            [first, second, ..] if first == id => Some(second),
            [first, second, ..] if second == id => Some(first),
            _ => None,
        }
    }

    /// Taxa below `id`, left to right.
    pub fn clade(&self, id: NodeId) -> Vec<&str> {
        let mut taxa = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let node = &self.nodes[current];
            if let Some(taxon) = &node.taxon {
                taxa.push(taxon.as_str());
            }
            stack.extend(node.children.iter().rev());
        }
        taxa
    }

    /// Human-readable node reference for error messages.
    pub fn describe(&self, id: NodeId) -> String {
        if self.is_root(id) {
            return "root".to_string();
        }
        let clade = self.clade(id);
        let shown = clade.iter().take(4).join(", ");
        if clade.len() > 4 {
            format!("node {id} (clade {shown}, ... {} taxa)", clade.len())
        } else {
            format!("node {id} (clade {shown})")
        }
    }

    /// Write `length` onto the edge above `id` unless it already has one.
    /// Returns whether the edge was written.
    pub fn set_length_if_unset(&mut self, id: NodeId, length: f64) -> bool {
        let node = &mut self.nodes[id];
        if node.has_length() {
            return false;
        }
        node.edge_length = Some(length);
        true
    }

    /// Collapse a basal bifurcation into a multifurcation.
    ///
    /// One internal root child (the second if both are internal) is removed;
    /// its edge length is added to the other root child's edge and its
    /// children take its place under the root. Trees whose root is not
    /// bifurcating, or has two leaf children, keep their topology.
    pub fn deroot(&mut self) {
        let root = self.root;
        let [first, second] = self.nodes[root].children[..] else {
            return;
        };
        let (keep, collapse) = if !self.nodes[second].is_leaf() {
            (first, second)
        } else if !self.nodes[first].is_leaf() {
            (second, first)
        } else {
            return;
        };

        let merged = match (self.nodes[keep].edge_length, self.nodes[collapse].edge_length) {
            (Some(a), Some(b)) => Some(a + b),
            (a, b) => a.or(b),
        };
        self.nodes[keep].edge_length = merged;

        let grandchildren = std::mem::take(&mut self.nodes[collapse].children);
        for &child in &grandchildren {
            self.nodes[child].parent = Some(root);
        }
        self.nodes[collapse].parent = None;

        let position = self.nodes[root]
            .children
            .iter()
            .position(|&c| c == collapse)
            .unwrap_or_default();
        self.nodes[root]
            .children
            .splice(position..=position, grandchildren);
    }

    /// Newick string of the tree: taxa on leaves, no internal labels, no
    /// root length, terminated by `;`.
    pub fn to_newick(&self) -> String {
        format!("{};", self.subtree_newick(self.root))
    }

    fn subtree_newick(&self, id: NodeId) -> String {
        let node = &self.nodes[id];
        let mut out = String::new();
        if !node.is_leaf() {
            let children = node.children.iter().map(|&c| self.subtree_newick(c)).join(",");
            out.push('(');
            out.push_str(&children);
            out.push(')');
        }
        if let Some(taxon) = &node.taxon {
            out.push_str(&quote_label(taxon));
        }
        if !self.is_root(id) {
            if let Some(length) = node.edge_length {
                out.push_str(&format!(":{length:?}"));
            }
        }
        out
    }
}

fn newick_error(e: impl std::fmt::Display) -> CastlesError {
    CastlesError::Newick {
        context: "species tree".to_string(),
        message: e.to_string(),
    }
}

impl Default for SpeciesTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(name: &str, length: Option<f64>) -> SpeciesNode {
        SpeciesNode {
            taxon: Some(name.to_string()),
            edge_length: length,
            ..Default::default()
        }
    }

    /// ((A,B),(C,D)) built by hand.
    fn four_taxa() -> SpeciesTree {
        let mut tree = SpeciesTree::new();
        let root = tree.root();
        let left = tree.add_child(root, SpeciesNode::default());
        let right = tree.add_child(root, SpeciesNode::default());
        tree.add_child(left, leaf("A", Some(0.1)));
        tree.add_child(left, leaf("B", Some(0.2)));
        tree.add_child(right, leaf("C", Some(0.3)));
        tree.add_child(right, leaf("D", Some(0.4)));
        tree.get_mut(left).edge_length = Some(0.5);
        tree.get_mut(right).edge_length = Some(0.25);
        tree
    }

    #[test]
    fn annotation_is_handed_out_once() {
        let mut annotation = Annotation::Pending("x".to_string());
        assert!(annotation.is_pending());
        assert_eq!(annotation.take().as_deref(), Some("x"));
        assert_eq!(annotation, Annotation::Consumed);
        assert_eq!(annotation.take(), None);

        let mut absent = Annotation::Absent;
        assert_eq!(absent.take(), None);
        assert_eq!(absent, Annotation::Absent);
    }

    #[test]
    fn zero_length_counts_as_unset() {
        assert!(!leaf("A", None).has_length());
        assert!(!leaf("A", Some(0.0)).has_length());
        assert!(leaf("A", Some(0.3)).has_length());
    }

    #[test]
    fn postorder_visits_children_first() {
        let tree = four_taxa();
        let order = tree.postorder();
        let taxa: Vec<String> = order
            .iter()
            .map(|&id| tree.get(id).taxon.clone().unwrap_or_else(|| format!("#{id}")))
            .collect();
        assert_eq!(taxa, ["A", "B", "#1", "C", "D", "#2", "#0"]);
        assert_eq!(tree.leaves().len(), 4);
    }

    #[test]
    fn sibling_lookup() {
        let tree = four_taxa();
        assert_eq!(tree.sibling(1), Some(2));
        assert_eq!(tree.sibling(2), Some(1));
        assert_eq!(tree.sibling(3), Some(4));
        assert_eq!(tree.sibling(0), None);
    }

    #[test]
    fn sibling_of_multifurcating_root_children() {
        let mut tree = SpeciesTree::new();
        let ids: Vec<NodeId> = ["A", "B", "C"]
            .into_iter()
            .map(|name| tree.add_child(0, leaf(name, None)))
            .collect();
        assert_eq!(tree.sibling(ids[0]), Some(ids[1]));
        assert_eq!(tree.sibling(ids[1]), Some(ids[0]));
        assert_eq!(tree.sibling(ids[2]), None);
    }

    #[test]
    fn set_length_keeps_existing_values() {
        let mut tree = four_taxa();
        assert!(!tree.set_length_if_unset(3, 9.0));
        assert_eq!(tree.get(3).edge_length, Some(0.1));

        tree.get_mut(3).edge_length = Some(0.0);
        assert!(tree.set_length_if_unset(3, 9.0));
        assert_eq!(tree.get(3).edge_length, Some(9.0));
    }

    #[test]
    fn newick_output() {
        let tree = four_taxa();
        assert_eq!(tree.to_newick(), "((A:0.1,B:0.2):0.5,(C:0.3,D:0.4):0.25);");
    }

    #[test]
    fn deroot_merges_root_edges() {
        let mut tree = four_taxa();
        tree.deroot();
        assert_eq!(tree.to_newick(), "((A:0.1,B:0.2):0.75,C:0.3,D:0.4);");
        assert_eq!(tree.get(tree.root()).children.len(), 3);
    }

    #[test]
    fn deroot_collapses_first_child_when_second_is_leaf() {
        let mut tree = SpeciesTree::new();
        let inner = tree.add_child(0, SpeciesNode::default());
        tree.add_child(0, leaf("C", Some(0.3)));
        tree.add_child(inner, leaf("A", Some(0.1)));
        tree.add_child(inner, leaf("B", Some(0.2)));
        tree.get_mut(inner).edge_length = Some(0.5);

        tree.deroot();
        assert_eq!(tree.to_newick(), "(A:0.1,B:0.2,C:0.8);");
    }

    #[test]
    fn deroot_leaves_multifurcating_root_alone() {
        let mut tree = SpeciesTree::new();
        for name in ["A", "B", "C"] {
            tree.add_child(0, leaf(name, Some(1.0)));
        }
        tree.deroot();
        assert_eq!(tree.to_newick(), "(A:1.0,B:1.0,C:1.0);");
    }

    #[test]
    fn parses_annotations_and_lengths() {
        let tree = SpeciesTree::from_newick("((A:0.1,B)'{x:1}':0.2,(C,D)'{y:2}');").unwrap();
        let root = tree.get(tree.root());
        let left = tree.get(root.children[0]);
        assert_eq!(left.annotation, Annotation::Pending("{x:1}".to_string()));
        assert_eq!(left.edge_length, Some(0.2));
        assert_eq!(tree.get(left.children[0]).edge_length, Some(0.1));
        assert_eq!(tree.get(left.children[1]).edge_length, None);
        assert_eq!(tree.clade(tree.root()), ["A", "B", "C", "D"]);
        assert_eq!(tree.describe(root.children[1]), format!("node {} (clade C, D)", root.children[1]));
    }

    #[test]
    fn quoted_taxa_keep_their_text() {
        let tree = SpeciesTree::from_newick("('Homo sapiens':1,'it''s':2);").unwrap();
        assert_eq!(tree.clade(tree.root()), ["Homo sapiens", "it's"]);
        assert_eq!(tree.to_newick(), "('Homo sapiens':1.0,'it''s':2.0);");
    }

    #[test]
    fn double_quoted_taxon_survives_rewrite() {
        let tree = SpeciesTree::from_newick("(\"a\"\"b\":1,C:2);").unwrap();
        assert_eq!(tree.clade(tree.root()), ["a\"b", "C"]);
        let written = tree.to_newick();
        assert_eq!(written, "('a\"b':1.0,C:2.0);");
        let again = SpeciesTree::from_newick(&written).unwrap();
        assert_eq!(again.clade(again.root()), tree.clade(tree.root()));
    }

    #[test]
    fn rejects_multiple_species_trees() {
        assert!(matches!(
            SpeciesTree::from_newick("(A,B);(A,B);"),
            Err(CastlesError::SpeciesTreeCount(2))
        ));
    }
}
