//! Base clusters: phrases shared by enough documents.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::membership::DocumentMembership;
use crate::node::{NodeId, ROOT};
use crate::sequence::{DocumentId, Token};
use crate::tree::SuffixTree;

/// A phrase together with the documents it occurs in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BaseCluster {
    pub phrase: Vec<Token>,
    /// Sorted ascending.
    pub document_ids: Vec<DocumentId>,
    /// Number of documents, `document_ids.len()`.
    pub frequency: usize,
}

/// Walks a finalized tree and emits a [`BaseCluster`] for every node whose
/// document set reaches the frequency threshold. The root is never emitted.
///
/// Every node yields its full phrase; the shorter phrases ending inside the
/// node's incoming edge have the same documents and are not repeated. Leaves
/// only qualify at a threshold of 1, and only when their edge carries more
/// than the end marker.
///
/// # Examples
///
/// ```
/// use stc_suffix_tree::{DocumentMembership, PhraseExtractor, SuffixTreeBuilder};
/// let mut builder = SuffixTreeBuilder::default();
/// builder.insert_tokens(0, vec![1, 2, 3, 4]).unwrap();
/// builder.insert_tokens(1, vec![1, 2, 3, 5]).unwrap();
/// let tree = builder.finalize().unwrap();
/// let membership = DocumentMembership::propagate(&tree);
/// let clusters: Vec<_> = PhraseExtractor::new(&tree, &membership).iter().collect();
/// assert!(clusters.iter().any(|c| c.phrase == [1, 2, 3] && c.document_ids == [0, 1]));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct PhraseExtractor<'t> {
    tree: &'t SuffixTree,
    membership: &'t DocumentMembership,
    min_document_frequency: usize,
}

impl<'t> PhraseExtractor<'t> {
    pub fn new(tree: &'t SuffixTree, membership: &'t DocumentMembership) -> Self {
        Self {
            tree,
            membership,
            min_document_frequency: tree.config().min_document_frequency,
        }
    }

    pub fn min_document_frequency(mut self, min_document_frequency: usize) -> Self {
        self.min_document_frequency = min_document_frequency;
        self
    }

    /// Lazily yields clusters in node order.
    pub fn iter(&self) -> impl Iterator<Item = BaseCluster> + 't {
        let this = *self;
        (0..self.tree.node_count() as NodeId).filter_map(move |id| this.cluster(id))
    }

    /// The same clusters as [`iter`](Self::iter), computed on the rayon pool
    /// once the tree reaches the configured parallel threshold.
    pub fn collect_parallel(&self) -> Vec<BaseCluster> {
        let nodes = self.tree.node_count();
        if nodes < self.tree.config().parallel_threshold {
            return self.iter().collect();
        }
        (0..nodes as NodeId)
            .into_par_iter()
            .filter_map(|id| self.cluster(id))
            .collect()
    }

    fn qualifies(&self, id: NodeId) -> bool {
        if id == ROOT {
            return false;
        }
        if self.membership.get(id).len() < self.min_document_frequency.max(1) {
            return false;
        }
        !self.tree.node(id).is_leaf() || self.tree.label(id).len() > 1
    }

    fn cluster(&self, id: NodeId) -> Option<BaseCluster> {
        if !self.qualifies(id) {
            return None;
        }
        let documents = self.membership.get(id);
        Some(BaseCluster {
            phrase: self.tree.phrase(id).to_vec(),
            document_ids: documents.as_slice().to_vec(),
            frequency: documents.len(),
        })
    }
}

/// Clusters of `tree` shared by at least `min_document_frequency` documents.
pub fn extract<'t>(
    tree: &'t SuffixTree,
    membership: &'t DocumentMembership,
    min_document_frequency: usize,
) -> impl Iterator<Item = BaseCluster> + 't {
    PhraseExtractor::new(tree, membership)
        .min_document_frequency(min_document_frequency)
        .iter()
}

/// The longest phrase occurring in at least `min_documents` documents. Ties
/// go to the smallest phrase in token order.
///
/// ```
/// use stc_suffix_tree::{longest_common_phrase, DocumentMembership, SuffixTreeBuilder};
/// let mut builder = SuffixTreeBuilder::default();
/// builder.insert_tokens(0, vec![1, 2, 3, 4, 5, 6, 7, 8, 9]).unwrap();
/// builder.insert_tokens(1, vec![7, 8, 9, 10, 11, 12, 13, 14]).unwrap();
/// let tree = builder.finalize().unwrap();
/// let membership = DocumentMembership::propagate(&tree);
/// assert_eq!(longest_common_phrase(&tree, &membership, 2), Some(vec![7, 8, 9]));
/// ```
pub fn longest_common_phrase(
    tree: &SuffixTree,
    membership: &DocumentMembership,
    min_documents: usize,
) -> Option<Vec<Token>> {
    let extractor = PhraseExtractor::new(tree, membership).min_document_frequency(min_documents);
    (0..tree.node_count() as NodeId)
        .filter(|&id| extractor.qualifies(id))
        .map(|id| tree.phrase(id))
        .max_by(|a, b| a.len().cmp(&b.len()).then_with(|| b.cmp(a)))
        .map(<[Token]>::to_vec)
}
