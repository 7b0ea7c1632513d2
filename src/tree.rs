//! The finalized, read-only generalized suffix tree.

use rustc_hash::FxHashSet;

use crate::config::TreeConfig;
use crate::membership::{DocumentMembership, DocumentSet};
use crate::node::{EdgeEnd, Node, NodeId, NodeKind, ROOT};
use crate::sequence::{DocumentId, Token};

/// Tokens of one inserted document followed by its end marker.
#[derive(Debug, Clone)]
pub(crate) struct StoredDocument {
    pub(crate) id: DocumentId,
    pub(crate) symbols: Vec<Token>,
}

/// Where a phrase ends inside the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Locus {
    AtNode(NodeId),
    /// `matched` tokens into the edge leading to `child`.
    OnEdge { child: NodeId, matched: usize },
}

impl Locus {
    /// The shallowest explicit node whose subtree holds every occurrence.
    fn node(self) -> NodeId {
        match self {
            Locus::AtNode(node) => node,
            Locus::OnEdge { child, .. } => child,
        }
    }
}

/// A generalized suffix tree over a batch of documents. Obtained from
/// [`SuffixTreeBuilder::finalize`](crate::SuffixTreeBuilder::finalize); every
/// edge is closed and nothing can be inserted any more.
///
/// # Examples
///
/// ```
/// use stc_suffix_tree::SuffixTreeBuilder;
/// let mut builder = SuffixTreeBuilder::default();
/// builder.insert_tokens(0, vec![1, 2, 3, 4, 5, 6, 7, 8, 9]).unwrap();
/// builder.insert_tokens(1, vec![7, 8, 9, 10, 11, 12, 13, 14]).unwrap();
/// let tree = builder.finalize().unwrap();
/// assert!(tree.is_suffix(&[7, 8, 9]));
/// assert!(tree.contains_phrase(&[9, 10, 11]));
/// ```
#[derive(Debug)]
pub struct SuffixTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) documents: Vec<StoredDocument>,
    pub(crate) document_ids: Vec<DocumentId>,
    pub(crate) terminators: FxHashSet<Token>,
    pub(crate) config: TreeConfig,
}

impl SuffixTree {
    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_leaf()).count()
    }

    /// Number of documents accepted, empty ones included.
    pub fn document_count(&self) -> usize {
        self.document_ids.len()
    }

    /// Ids of accepted documents in insertion order.
    pub fn document_ids(&self) -> &[DocumentId] {
        &self.document_ids
    }

    /// Checks whether `phrase` occurs in any document.
    #[must_use]
    pub fn contains_phrase(&self, phrase: &[Token]) -> bool {
        self.locate(phrase).is_some()
    }

    /// Checks whether `phrase` is a suffix of some document.
    #[must_use]
    pub fn is_suffix(&self, phrase: &[Token]) -> bool {
        match self.locate(phrase) {
            None => false,
            Some(Locus::AtNode(node)) => self.nodes[node as usize]
                .children
                .keys()
                .any(|token| self.terminators.contains(token)),
            Some(Locus::OnEdge { child, matched }) => self
                .label(child)
                .get(matched)
                .is_some_and(|token| self.terminators.contains(token)),
        }
    }

    /// The documents `phrase` occurs in, or `None` if it occurs nowhere.
    pub fn documents_containing<'m>(
        &self,
        membership: &'m DocumentMembership,
        phrase: &[Token],
    ) -> Option<&'m DocumentSet> {
        self.locate(phrase)
            .map(|locus| membership.get(locus.node()))
    }

    fn locate(&self, phrase: &[Token]) -> Option<Locus> {
        if phrase.iter().any(|token| self.terminators.contains(token)) {
            return None;
        }
        let mut node = ROOT;
        let mut index = 0;
        while index < phrase.len() {
            let child = self.nodes[node as usize].child(phrase[index])?;
            let label = self.label(child);
            let take = label.len().min(phrase.len() - index);
            if label[..take] != phrase[index..index + take] {
                return None;
            }
            index += take;
            if take < label.len() {
                return Some(Locus::OnEdge {
                    child,
                    matched: take,
                });
            }
            node = child;
        }
        Some(Locus::AtNode(node))
    }

    pub(crate) fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id as usize]
    }

    /// Tokens on the edge leading into `id`.
    pub(crate) fn label(&self, id: NodeId) -> &[Token] {
        let edge = &self.node(id).edge;
        let symbols = &self.documents[edge.slot as usize].symbols;
        match edge.end {
            EdgeEnd::Closed(end) => &symbols[edge.start as usize..end as usize],
            // finalize rejects trees with open edges
            EdgeEnd::Open => &[],
        }
    }

    /// Tokens on the path from the root to `id`, without end marker. The path
    /// of every node is a contiguous range of the document its edge points into.
    pub(crate) fn phrase(&self, id: NodeId) -> &[Token] {
        let node = self.node(id);
        if id == ROOT {
            return &[];
        }
        let symbols = &self.documents[node.edge.slot as usize].symbols;
        match node.kind {
            NodeKind::Leaf { suffix_start, .. } => {
                &symbols[suffix_start as usize..symbols.len() - 1]
            }
            NodeKind::Internal => {
                let end = node.edge.closed_end().unwrap_or(node.edge.start) as usize;
                &symbols[end - node.depth as usize..end]
            }
        }
    }

    pub(crate) fn internal_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| !node.is_leaf())
            .map(|(id, _)| id as NodeId)
    }
}

#[cfg(test)]
mod tests {
    use crate::builder::SuffixTreeBuilder;

    fn tree_of(documents: &[&[u32]]) -> super::SuffixTree {
        let mut builder = SuffixTreeBuilder::default();
        for (id, tokens) in documents.iter().enumerate() {
            builder.insert_tokens(id as u32, tokens.to_vec()).unwrap();
        }
        builder.finalize().unwrap()
    }

    #[test]
    fn test_is_suffix() {
        let s1 = [1, 2, 3, 4, 5, 6];
        let s2 = [4, 5, 6, 7, 8, 9, 10];
        let tree = tree_of(&[&s1]);
        for i in 0..s1.len() {
            assert!(tree.is_suffix(&s1[i..]), "{:?} should be a suffix", &s1[i..]);
        }
        assert!(!tree.is_suffix(&[1]));
        assert!(!tree.is_suffix(&[1, 2]));

        let tree = tree_of(&[&s1, &s2]);
        for s in [&s1[..], &s2[..]] {
            for i in 0..s.len() {
                assert!(tree.is_suffix(&s[i..]), "{:?} should be a suffix", &s[i..]);
            }
        }
        assert!(!tree.is_suffix(&[2, 3]));
        assert!(!tree.is_suffix(&[4, 5]));
    }

    #[test]
    fn test_contains_phrase() {
        let s1 = [1, 2, 3, 4, 5, 6];
        let s2 = [4, 5, 6, 7, 8, 9, 10];
        let tree = tree_of(&[&s1, &s2]);
        for s in [&s1[..], &s2[..]] {
            for i in 0..s.len() {
                for j in i..s.len() {
                    assert!(
                        tree.contains_phrase(&s[i..=j]),
                        "{:?} should be a phrase",
                        &s[i..=j]
                    );
                }
            }
        }
        assert!(!tree.contains_phrase(&[2, 3, 10]));
        assert!(!tree.contains_phrase(&[3, 4, 50]));
        assert!(!tree.contains_phrase(&[6, 7, 8, 9, 10, 11]));
        assert!(tree.contains_phrase(&[]));
    }

    #[test]
    fn end_markers_are_not_phrases() {
        let tree = tree_of(&[&[1, 2]]);
        let marker = *tree.terminators.iter().next().unwrap();
        assert!(!tree.contains_phrase(&[2, marker]));
        assert!(!tree.contains_phrase(&[marker]));
    }

    #[test]
    fn counts() {
        let tree = tree_of(&[&[1, 2, 1], &[], &[2, 1]]);
        assert_eq!(tree.document_count(), 3);
        assert_eq!(tree.document_ids(), &[0, 1, 2]);
        // one leaf per suffix, end-marker-only suffixes included
        assert_eq!(tree.leaf_count(), 4 + 3);
    }
}
