//! Arena nodes and the edge labels leading into them.

use rustc_hash::FxHashMap;

use crate::sequence::{DocumentId, Token};

pub(crate) type NodeId = u32;
pub(crate) type IndexType = u32;

pub(crate) const ROOT: NodeId = 0;

/// End of an edge label. Leaves of the document being inserted grow with
/// every extension and are pinned once the document's end marker is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EdgeEnd {
    Open,
    Closed(IndexType),
}

/// The label of the edge from a node's parent to the node: the half-open
/// range `start..end` of the tokens stored for document `slot`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Edge {
    pub(crate) slot: IndexType,
    pub(crate) start: IndexType,
    pub(crate) end: EdgeEnd,
}

impl Edge {
    pub(crate) const fn closed(slot: IndexType, start: IndexType, end: IndexType) -> Self {
        Self {
            slot,
            start,
            end: EdgeEnd::Closed(end),
        }
    }

    pub(crate) const fn open(slot: IndexType, start: IndexType) -> Self {
        Self {
            slot,
            start,
            end: EdgeEnd::Open,
        }
    }

    /// `None` while the edge is still open.
    pub(crate) fn closed_end(&self) -> Option<IndexType> {
        match self.end {
            EdgeEnd::Open => None,
            EdgeEnd::Closed(end) => Some(end),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeKind {
    Internal,
    /// The suffix of `document` starting at `suffix_start`.
    Leaf {
        document: DocumentId,
        suffix_start: IndexType,
    },
}

/// A vertex of the tree. `children` is keyed by the first token of each
/// child's edge label. `edge` is the label of the edge coming in from the
/// parent, so edges need no storage of their own. `depth` counts the tokens
/// on the path from the root; for leaves it is only valid once closed.
#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) edge: Edge,
    pub(crate) children: FxHashMap<Token, NodeId>,
    pub(crate) suffix_link: Option<NodeId>,
    pub(crate) depth: IndexType,
    pub(crate) kind: NodeKind,
}

impl Node {
    pub(crate) fn root() -> Self {
        Self::internal(Edge::closed(0, 0, 0), 0)
    }

    pub(crate) fn internal(edge: Edge, depth: IndexType) -> Self {
        Self {
            edge,
            children: FxHashMap::default(),
            suffix_link: None,
            depth,
            kind: NodeKind::Internal,
        }
    }

    pub(crate) fn leaf(edge: Edge, document: DocumentId, suffix_start: IndexType) -> Self {
        Self {
            edge,
            children: FxHashMap::default(),
            suffix_link: None,
            depth: 0,
            kind: NodeKind::Leaf {
                document,
                suffix_start,
            },
        }
    }

    pub(crate) fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { .. })
    }

    pub(crate) fn child(&self, token: Token) -> Option<NodeId> {
        self.children.get(&token).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_edges_have_no_end() {
        let edge = Edge::open(1, 4);
        assert_eq!(edge.closed_end(), None);
        assert_eq!(Edge::closed(1, 4, 6).closed_end(), Some(6));
    }

    #[test]
    fn child_lookup_by_leading_token() {
        let mut node = Node::root();
        node.children.insert(42, 3);
        assert_eq!(node.child(42), Some(3));
        assert_eq!(node.child(7), None);
        assert!(!node.is_leaf());
        assert!(Node::leaf(Edge::open(0, 0), 0, 0).is_leaf());
    }
}
