//! Per-node document sets, folded bottom-up over a finalized tree.

use std::sync::Arc;

use rayon::prelude::*;
use tracing::debug;

use crate::node::{NodeId, NodeKind, ROOT};
use crate::sequence::DocumentId;
use crate::tree::SuffixTree;

/// A sorted set of document ids. Clones share one allocation, and a union
/// whose result equals one of its inputs reuses that input's allocation, so
/// long chains of nodes over the same documents cost one set between them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentSet(Arc<[DocumentId]>);

impl Default for DocumentSet {
    fn default() -> Self {
        Self(Arc::from(Vec::new()))
    }
}

impl DocumentSet {
    pub fn singleton(document: DocumentId) -> Self {
        Self(Arc::from(vec![document]))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, document: DocumentId) -> bool {
        self.0.binary_search(&document).is_ok()
    }

    pub fn as_slice(&self) -> &[DocumentId] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = DocumentId> + '_ {
        self.0.iter().copied()
    }

    fn is_subset_of(&self, other: &DocumentSet) -> bool {
        self.len() <= other.len() && self.iter().all(|document| other.contains(document))
    }

    /// Union of `sets`.
    pub fn union<'s, I>(sets: I) -> Self
    where
        I: IntoIterator<Item = &'s DocumentSet>,
    {
        let sets: Vec<&DocumentSet> = sets.into_iter().collect();
        let Some(largest) = sets.iter().copied().max_by_key(|set| set.len()) else {
            return Self::default();
        };
        if sets.iter().all(|set| set.is_subset_of(largest)) {
            return largest.clone();
        }
        let mut merged: Vec<DocumentId> = sets.iter().flat_map(|set| set.iter()).collect();
        merged.sort_unstable();
        merged.dedup();
        Self(Arc::from(merged))
    }
}

impl FromIterator<DocumentId> for DocumentSet {
    fn from_iter<I: IntoIterator<Item = DocumentId>>(iter: I) -> Self {
        let mut documents: Vec<DocumentId> = iter.into_iter().collect();
        documents.sort_unstable();
        documents.dedup();
        Self(Arc::from(documents))
    }
}

/// The documents whose suffixes pass through each node of a tree.
///
/// Leaves hold their own document; every other node holds the union of its
/// children. Built level by level from the deepest nodes up, and a level
/// with at least `parallel_threshold` nodes is folded on the rayon pool.
#[derive(Debug, Clone)]
pub struct DocumentMembership {
    sets: Vec<DocumentSet>,
}

impl DocumentMembership {
    pub fn propagate(tree: &SuffixTree) -> Self {
        let levels = node_levels(tree);
        let threshold = tree.config().parallel_threshold;
        let mut sets = vec![DocumentSet::default(); tree.node_count()];

        for level in levels.iter().rev() {
            let folded: Vec<(NodeId, DocumentSet)> = if level.len() >= threshold {
                level
                    .par_iter()
                    .map(|&id| (id, fold_node(tree, &sets, id)))
                    .collect()
            } else {
                level
                    .iter()
                    .map(|&id| (id, fold_node(tree, &sets, id)))
                    .collect()
            };
            for (id, set) in folded {
                sets[id as usize] = set;
            }
        }

        debug!(
            nodes = sets.len(),
            levels = levels.len(),
            documents = sets[ROOT as usize].len(),
            "propagated document membership"
        );
        Self { sets }
    }

    pub fn get(&self, node: NodeId) -> &DocumentSet {
        &self.sets[node as usize]
    }

    /// Number of nodes covered.
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

fn fold_node(tree: &SuffixTree, sets: &[DocumentSet], id: NodeId) -> DocumentSet {
    let node = tree.node(id);
    match node.kind {
        NodeKind::Leaf { document, .. } => DocumentSet::singleton(document),
        NodeKind::Internal => {
            DocumentSet::union(node.children.values().map(|&child| &sets[child as usize]))
        }
    }
}

/// Node ids grouped by edge distance from the root.
fn node_levels(tree: &SuffixTree) -> Vec<Vec<NodeId>> {
    let mut levels = vec![vec![ROOT]];
    loop {
        let next: Vec<NodeId> = levels[levels.len() - 1]
            .iter()
            .flat_map(|&id| tree.node(id).children.values().copied())
            .collect();
        if next.is_empty() {
            return levels;
        }
        levels.push(next);
    }
}
