//! Incremental construction of the generalized suffix tree.

use rustc_hash::FxHashSet;
use tracing::{debug, error, warn};

use crate::config::TreeConfig;
use crate::error::{InvalidDocumentReason, Result, SuffixTreeError};
use crate::node::{Edge, EdgeEnd, IndexType, Node, NodeId, NodeKind, ROOT};
use crate::sequence::{DocumentId, Token, TokenSequence};
use crate::tree::{StoredDocument, SuffixTree};

/// A document left out of a batch, with the reason.
#[derive(Debug)]
pub struct SkippedDocument {
    pub document: DocumentId,
    pub error: SuffixTreeError,
}

/// Builds one [`SuffixTree`] from a batch of documents using Ukkonen's
/// algorithm, one document at a time. Every document's suffixes are inserted
/// into the same tree, so a suffix that starts like a phrase of an earlier
/// document walks down the existing path instead of creating a new one.
///
/// Construction is single-threaded. After an
/// [`InvariantViolation`](SuffixTreeError::InvariantViolation) the builder
/// must be discarded.
#[derive(Debug)]
pub struct SuffixTreeBuilder {
    config: TreeConfig,
    nodes: Vec<Node>,
    documents: Vec<StoredDocument>,
    document_ids: Vec<DocumentId>,
    seen_ids: FxHashSet<DocumentId>,
    seen_tokens: FxHashSet<Token>,
    terminators: FxHashSet<Token>,
    token_count: usize,
    next_terminator: Token,
}

impl Default for SuffixTreeBuilder {
    fn default() -> Self {
        Self::with_valid_config(TreeConfig::default())
    }
}

impl SuffixTreeBuilder {
    pub fn new(config: TreeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_valid_config(config))
    }

    fn with_valid_config(config: TreeConfig) -> Self {
        Self {
            config,
            nodes: vec![Node::root()],
            documents: Vec::new(),
            document_ids: Vec::new(),
            seen_ids: FxHashSet::default(),
            seen_tokens: FxHashSet::default(),
            terminators: FxHashSet::default(),
            token_count: 0,
            // End markers are handed out from the top of the token range down.
            next_terminator: Token::MAX,
        }
    }

    pub fn document_count(&self) -> usize {
        self.document_ids.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Stored symbols so far, end markers included.
    pub fn token_count(&self) -> usize {
        self.token_count
    }

    /// Adds all suffixes of one document to the tree.
    ///
    /// A rejected document leaves the tree untouched. An empty document is
    /// accepted but contributes no suffixes.
    pub fn insert(&mut self, document: DocumentId, sequence: TokenSequence) -> Result<()> {
        self.validate(document, &sequence)?;

        let requested = self.token_count + sequence.len() + 1;
        if !sequence.is_empty() && requested > self.config.max_tokens {
            return Err(SuffixTreeError::CapacityExceeded {
                documents_processed: self.document_ids.len(),
                limit: self.config.max_tokens,
                requested,
            });
        }

        let Some(symbols) = sequence.into_symbols() else {
            return Err(SuffixTreeError::invalid(
                document,
                InvalidDocumentReason::MissingTerminator,
            ));
        };
        let terminator = symbols[symbols.len() - 1];
        self.seen_ids.insert(document);
        self.document_ids.push(document);
        self.terminators.insert(terminator);
        self.seen_tokens.extend(&symbols[..symbols.len() - 1]);

        if symbols.len() == 1 {
            debug!(document, "empty document contributes no suffixes");
            return Ok(());
        }

        self.token_count = requested;
        let slot = self.documents.len() as IndexType;
        self.documents.push(StoredDocument {
            id: document,
            symbols,
        });

        let nodes_before = self.nodes.len();
        Extension::new(&mut self.nodes, &self.documents, slot).run()?;
        debug!(
            document,
            tokens = self.documents[slot as usize].symbols.len() - 1,
            new_nodes = self.nodes.len() - nodes_before,
            "inserted document"
        );
        Ok(())
    }

    /// Inserts `tokens` with an end marker picked by the builder and returns
    /// that marker. Markers come from the top of the token range and skip
    /// every value already seen as a token.
    pub fn insert_tokens(&mut self, document: DocumentId, tokens: Vec<Token>) -> Result<Token> {
        let terminator = self.free_terminator(&tokens).ok_or_else(|| {
            SuffixTreeError::invalid(document, InvalidDocumentReason::TerminatorsExhausted)
        })?;
        self.insert(document, TokenSequence::unterminated(tokens).with_terminator(terminator))?;
        self.next_terminator = terminator.saturating_sub(1);
        Ok(terminator)
    }

    /// Inserts a batch. Invalid documents are logged, skipped and returned;
    /// any other error aborts the batch.
    pub fn insert_all<I>(&mut self, documents: I) -> Result<Vec<SkippedDocument>>
    where
        I: IntoIterator<Item = (DocumentId, TokenSequence)>,
    {
        let mut skipped = Vec::new();
        for (document, sequence) in documents {
            match self.insert(document, sequence) {
                Ok(()) => {}
                Err(err) if err.is_recoverable() => {
                    warn!(document, error = %err, "skipping document");
                    skipped.push(SkippedDocument {
                        document,
                        error: err,
                    });
                }
                Err(err) => return Err(err),
            }
        }
        Ok(skipped)
    }

    /// Freezes the tree. Fails if any edge is still open or an internal node
    /// never received its suffix link.
    pub fn finalize(self) -> Result<SuffixTree> {
        for node in self.nodes.iter().skip(1) {
            let edge = &node.edge;
            let document = self.documents[edge.slot as usize].id;
            let Some(end) = edge.closed_end() else {
                return Err(violation(
                    document,
                    edge.start,
                    "open edge left after its document was inserted",
                ));
            };
            if !node.is_leaf() && node.suffix_link.is_none() {
                return Err(violation(document, end, "internal node without suffix link"));
            }
        }

        debug!(
            nodes = self.nodes.len(),
            documents = self.document_ids.len(),
            tokens = self.token_count,
            "finalized suffix tree"
        );
        Ok(SuffixTree {
            nodes: self.nodes,
            documents: self.documents,
            document_ids: self.document_ids,
            terminators: self.terminators,
            config: self.config,
        })
    }

    fn validate(&self, document: DocumentId, sequence: &TokenSequence) -> Result<()> {
        use InvalidDocumentReason::*;

        let reason = if self.seen_ids.contains(&document) {
            DuplicateDocument
        } else if let Some(terminator) = sequence.terminator() {
            if self.terminators.contains(&terminator) {
                DuplicateTerminator(terminator)
            } else if self.seen_tokens.contains(&terminator) {
                TerminatorCollision(terminator)
            } else if sequence.tokens().contains(&terminator) {
                TerminatorInTokens(terminator)
            } else if let Some(&token) = sequence
                .tokens()
                .iter()
                .find(|token| self.terminators.contains(token))
            {
                TokenIsTerminator(token)
            } else {
                return Ok(());
            }
        } else {
            MissingTerminator
        };
        Err(SuffixTreeError::invalid(document, reason))
    }

    fn free_terminator(&self, tokens: &[Token]) -> Option<Token> {
        let own: FxHashSet<Token> = tokens.iter().copied().collect();
        let mut candidate = self.next_terminator;
        loop {
            if !self.seen_tokens.contains(&candidate)
                && !self.terminators.contains(&candidate)
                && !own.contains(&candidate)
            {
                return Some(candidate);
            }
            candidate = candidate.checked_sub(1)?;
        }
    }
}

fn violation(document: DocumentId, position: IndexType, detail: &'static str) -> SuffixTreeError {
    error!(document, position, detail, "suffix tree invariant violated");
    SuffixTreeError::InvariantViolation {
        document,
        position: position as usize,
        detail,
    }
}

/// The point where the next extension starts: `length` tokens along the
/// edge of `node` whose first token is `text[edge]`. Implicit nodes are never
/// materialized; a split happens only when a suffix diverges inside an edge.
#[derive(Debug, Clone, Copy)]
struct ActivePoint {
    node: NodeId,
    edge: IndexType,
    length: IndexType,
}

impl ActivePoint {
    const fn new(node: NodeId, edge: IndexType, length: IndexType) -> Self {
        Self { node, edge, length }
    }
}

/// State for inserting one document. Lives only while that document is
/// inserted, so the active point and open leaves never cross documents.
struct Extension<'a> {
    nodes: &'a mut Vec<Node>,
    documents: &'a [StoredDocument],
    slot: IndexType,
    document: DocumentId,
    text: &'a [Token],
    active: ActivePoint,
    /// Suffixes of the current prefix not yet explicit in the tree.
    remainder: IndexType,
    /// Leaves created for this document, all with open edges until `close`.
    leaves: Vec<NodeId>,
}

impl<'a> Extension<'a> {
    fn new(nodes: &'a mut Vec<Node>, documents: &'a [StoredDocument], slot: IndexType) -> Self {
        let stored = &documents[slot as usize];
        Self {
            nodes,
            documents,
            slot,
            document: stored.id,
            text: &stored.symbols,
            active: ActivePoint::new(ROOT, 0, 0),
            remainder: 0,
            leaves: Vec::with_capacity(stored.symbols.len()),
        }
    }

    fn run(mut self) -> Result<()> {
        for pos in 0..self.text.len() as IndexType {
            self.extend(pos)?;
        }
        self.close()
    }

    /// Adds `text[pos]` to every suffix still pending.
    fn extend(&mut self, pos: IndexType) -> Result<()> {
        let token = self.text[pos as usize];
        self.remainder += 1;
        // Internal node created in this phase, waiting for its suffix link.
        let mut pending: Option<NodeId> = None;

        while self.remainder > 0 {
            if self.active.length == 0 {
                self.active.edge = pos;
            }
            let edge_token = self.text[self.active.edge as usize];

            match self.nodes[self.active.node as usize].child(edge_token) {
                None => {
                    self.add_leaf(self.active.node, pos);
                    if let Some(node) = pending.take() {
                        self.link(node, self.active.node);
                    }
                }
                Some(next) => {
                    let length = self.edge_length(next, pos)?;
                    if self.active.length >= length {
                        self.active.edge += length;
                        self.active.length -= length;
                        self.active.node = next;
                        continue;
                    }
                    if self.symbol_on_edge(next, self.active.length) == token {
                        // Already present: the rest of this phase is implicit.
                        if let Some(node) = pending.take() {
                            self.link(node, self.active.node);
                        }
                        self.active.length += 1;
                        break;
                    }
                    let split = self.split(self.active.node, next, self.active.length);
                    self.add_leaf(split, pos);
                    if let Some(node) = pending.replace(split) {
                        self.link(node, split);
                    }
                }
            }

            self.remainder -= 1;
            if self.active.node == ROOT && self.active.length > 0 {
                self.active.length -= 1;
                self.active.edge = pos + 1 - self.remainder;
            } else if self.active.node != ROOT {
                let Some(link) = self.nodes[self.active.node as usize].suffix_link else {
                    return Err(violation(self.document, pos, "active node has no suffix link"));
                };
                self.active.node = link;
            }
        }

        if pending.is_some() {
            return Err(violation(
                self.document,
                pos,
                "suffix link left unresolved at end of phase",
            ));
        }
        Ok(())
    }

    /// Pins every leaf of this document to its last index.
    fn close(mut self) -> Result<()> {
        let last = self.text.len() as IndexType - 1;
        if self.remainder != 0 {
            return Err(violation(
                self.document,
                last,
                "suffixes left implicit after the end marker",
            ));
        }
        if self.leaves.len() != self.text.len() {
            return Err(violation(
                self.document,
                last,
                "leaf count differs from suffix count",
            ));
        }

        let len = self.text.len() as IndexType;
        for &leaf in &self.leaves {
            let node = &mut self.nodes[leaf as usize];
            node.edge.end = EdgeEnd::Closed(len);
            if let NodeKind::Leaf { suffix_start, .. } = node.kind {
                node.depth = len - suffix_start;
            }
        }
        Ok(())
    }

    fn edge_length(&self, id: NodeId, pos: IndexType) -> Result<IndexType> {
        let edge = self.nodes[id as usize].edge;
        match edge.end {
            EdgeEnd::Closed(end) => Ok(end - edge.start),
            EdgeEnd::Open if edge.slot == self.slot => Ok(pos + 1 - edge.start),
            EdgeEnd::Open => Err(violation(
                self.document,
                pos,
                "open edge from an earlier document",
            )),
        }
    }

    fn symbol(&self, slot: IndexType, index: IndexType) -> Token {
        self.documents[slot as usize].symbols[index as usize]
    }

    fn symbol_on_edge(&self, id: NodeId, offset: IndexType) -> Token {
        let edge = self.nodes[id as usize].edge;
        self.symbol(edge.slot, edge.start + offset)
    }

    fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        (self.nodes.len() - 1) as NodeId
    }

    fn add_leaf(&mut self, parent: NodeId, pos: IndexType) -> NodeId {
        let suffix_start = pos + 1 - self.remainder;
        debug_assert_eq!(self.nodes[parent as usize].depth, pos - suffix_start);
        let leaf = self.push(Node::leaf(
            Edge::open(self.slot, pos),
            self.document,
            suffix_start,
        ));
        let token = self.text[pos as usize];
        self.nodes[parent as usize].children.insert(token, leaf);
        self.leaves.push(leaf);
        leaf
    }

    /// Inserts an internal node `at` tokens into the edge from `parent` to
    /// `child`. The new node takes the head of the label, `child` keeps the rest.
    fn split(&mut self, parent: NodeId, child: NodeId, at: IndexType) -> NodeId {
        let edge = self.nodes[child as usize].edge;
        let leading = self.symbol(edge.slot, edge.start);
        let branch = self.symbol(edge.slot, edge.start + at);
        let depth = self.nodes[parent as usize].depth + at;

        let split = self.push(Node::internal(
            Edge::closed(edge.slot, edge.start, edge.start + at),
            depth,
        ));
        self.nodes[split as usize].children.insert(branch, child);
        self.nodes[child as usize].edge.start += at;
        self.nodes[parent as usize].children.insert(leading, split);
        split
    }

    fn link(&mut self, from: NodeId, to: NodeId) {
        self.nodes[from as usize].suffix_link = Some(to);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(documents: &[&[Token]]) -> SuffixTree {
        let mut builder = SuffixTreeBuilder::default();
        for (id, tokens) in documents.iter().enumerate() {
            builder.insert_tokens(id as DocumentId, tokens.to_vec()).unwrap();
        }
        builder.finalize().unwrap()
    }

    fn assert_suffix_links(tree: &SuffixTree) {
        for id in tree.internal_nodes().filter(|&id| id != ROOT) {
            let link = tree.node(id).suffix_link.expect("internal node without link");
            let phrase = tree.phrase(id);
            assert_eq!(
                tree.phrase(link),
                &phrase[1..],
                "suffix link of {phrase:?} points to the wrong node"
            );
        }
    }

    #[test]
    fn suffix_links_drop_the_leading_token() {
        assert_suffix_links(&build(&[&[1, 2, 1, 2, 3, 1, 2, 1]]));
        assert_suffix_links(&build(&[&[1, 2, 3, 1, 2], &[2, 3, 1, 2, 3], &[3, 1, 2]]));
        assert_suffix_links(&build(&[&[5, 5, 5, 5, 5], &[5, 5, 5]]));
    }

    #[test]
    fn one_leaf_per_suffix_and_no_open_edges() {
        let tree = build(&[&[1, 2, 3], &[2, 3, 4], &[1, 2, 3]]);
        assert_eq!(tree.leaf_count(), 4 * 3);
        assert!(tree.nodes.iter().all(|node| node.edge.closed_end().is_some()));
        for node in tree.nodes.iter().filter(|node| node.is_leaf()) {
            let NodeKind::Leaf { document, suffix_start } = node.kind else {
                unreachable!()
            };
            let symbols = &tree.documents[node.edge.slot as usize].symbols;
            assert_eq!(tree.documents[node.edge.slot as usize].id, document);
            assert_eq!(node.depth as usize, symbols.len() - suffix_start as usize);
        }
    }

    #[test]
    fn repeated_token_collapses() {
        let tree = build(&[&[7; 6]]);
        for len in 1..=6 {
            assert!(tree.is_suffix(&vec![7; len]));
        }
        assert!(!tree.contains_phrase(&[7; 7]));
        assert_suffix_links(&tree);
    }

    #[test]
    fn rejects_invalid_documents() {
        let mut builder = SuffixTreeBuilder::default();
        builder.insert(0, TokenSequence::new(vec![1, 2], 100)).unwrap();
        let nodes = builder.node_count();

        let reason = |err: SuffixTreeError| match err {
            SuffixTreeError::InvalidDocument { reason, .. } => reason,
            other => panic!("unexpected error {other:?}"),
        };
        use InvalidDocumentReason::*;
        assert_eq!(
            reason(builder.insert(0, TokenSequence::new(vec![3], 101)).unwrap_err()),
            DuplicateDocument
        );
        assert_eq!(
            reason(builder.insert(1, TokenSequence::unterminated(vec![3])).unwrap_err()),
            MissingTerminator
        );
        assert_eq!(
            reason(builder.insert(1, TokenSequence::new(vec![3], 100)).unwrap_err()),
            DuplicateTerminator(100)
        );
        assert_eq!(
            reason(builder.insert(1, TokenSequence::new(vec![3], 2)).unwrap_err()),
            TerminatorCollision(2)
        );
        assert_eq!(
            reason(builder.insert(1, TokenSequence::new(vec![3, 101], 101)).unwrap_err()),
            TerminatorInTokens(101)
        );
        assert_eq!(
            reason(builder.insert(1, TokenSequence::new(vec![3, 100], 102)).unwrap_err()),
            TokenIsTerminator(100)
        );

        assert_eq!(builder.node_count(), nodes);
        assert_eq!(builder.document_count(), 1);
        builder.insert(1, TokenSequence::new(vec![2, 1], 101)).unwrap();
        assert_eq!(builder.document_count(), 2);
    }

    #[test]
    fn insert_all_skips_invalid_documents() {
        let mut builder = SuffixTreeBuilder::default();
        let skipped = builder
            .insert_all(vec![
                (0, TokenSequence::new(vec![1, 2, 3], 100)),
                (1, TokenSequence::new(vec![1, 100], 101)),
                (2, TokenSequence::unterminated(vec![1])),
                (3, TokenSequence::new(vec![2, 3], 102)),
            ])
            .unwrap();
        let skipped_ids: Vec<_> = skipped.iter().map(|s| s.document).collect();
        assert_eq!(skipped_ids, vec![1, 2]);

        let tree = builder.finalize().unwrap();
        assert_eq!(tree.document_ids(), &[0, 3]);
    }

    #[test]
    fn capacity_exceeded_reports_progress() {
        let config = TreeConfig::default().with_max_tokens(7);
        let mut builder = SuffixTreeBuilder::new(config).unwrap();
        let err = builder
            .insert_all(vec![
                (0, TokenSequence::new(vec![1, 2, 3], 100)),
                (1, TokenSequence::new(vec![4, 5, 6], 101)),
                (2, TokenSequence::new(vec![7], 102)),
            ])
            .unwrap_err();
        match err {
            SuffixTreeError::CapacityExceeded {
                documents_processed,
                limit,
                requested,
            } => {
                assert_eq!(documents_processed, 1);
                assert_eq!(limit, 7);
                assert_eq!(requested, 8);
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(builder.token_count(), 4);
    }

    #[test]
    fn empty_document_is_registered_without_suffixes() {
        let mut builder = SuffixTreeBuilder::default();
        builder.insert_tokens(0, Vec::new()).unwrap();
        assert_eq!(builder.node_count(), 1);
        assert_eq!(builder.token_count(), 0);
        let tree = builder.finalize().unwrap();
        assert_eq!(tree.document_count(), 1);
        assert_eq!(tree.leaf_count(), 0);
    }

    #[test]
    fn assigned_terminators_avoid_seen_tokens() {
        let mut builder = SuffixTreeBuilder::default();
        let first = builder.insert_tokens(0, vec![Token::MAX, 1]).unwrap();
        assert_eq!(first, Token::MAX - 1);
        let second = builder.insert_tokens(1, vec![Token::MAX - 2]).unwrap();
        assert_eq!(second, Token::MAX - 3);
    }

    #[test]
    fn rejects_invalid_config() {
        let err = SuffixTreeBuilder::new(TreeConfig::default().with_max_tokens(0)).unwrap_err();
        assert!(matches!(err, SuffixTreeError::InvalidConfig { .. }));
    }
}
