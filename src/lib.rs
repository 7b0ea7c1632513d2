//! A generalized suffix tree over tokenized documents, built with Ukkonen's
//! algorithm, that finds the phrases two or more documents have in common.
//!
//! Documents come in as [`TokenSequence`]s of interned word ids, each closed
//! by an end marker of its own. [`SuffixTreeBuilder`] inserts them into one
//! shared tree, [`DocumentMembership`] records which documents pass through
//! each node, and [`PhraseExtractor`] turns the nodes reached by enough
//! documents into [`BaseCluster`]s.
//!
//! # Examples
//!
//! ```
//! use stc_suffix_tree::{build_base_clusters, TokenSequence, TreeConfig};
//!
//! // data mining is fun / data mining is hard
//! let documents = vec![
//!     (0, TokenSequence::new(vec![10, 11, 12, 13], 1000)),
//!     (1, TokenSequence::new(vec![10, 11, 12, 14], 1001)),
//! ];
//! let outcome = build_base_clusters(TreeConfig::default(), documents).unwrap();
//! let cluster = outcome
//!     .clusters
//!     .iter()
//!     .find(|c| c.phrase == [10, 11, 12])
//!     .unwrap();
//! assert_eq!(cluster.document_ids, [0, 1]);
//! assert_eq!(cluster.frequency, 2);
//! ```
mod builder;
mod config;
mod error;
mod extract;
mod membership;
mod node;
mod sequence;
mod tree;

use tracing::debug;

pub use builder::{SkippedDocument, SuffixTreeBuilder};
pub use config::TreeConfig;
pub use error::{InvalidDocumentReason, Result, SuffixTreeError};
pub use extract::{extract, longest_common_phrase, BaseCluster, PhraseExtractor};
pub use membership::{DocumentMembership, DocumentSet};
pub use sequence::{DocumentId, Token, TokenSequence};
pub use tree::SuffixTree;

/// Base clusters of one batch and the documents that were left out.
#[derive(Debug)]
pub struct ClusteringOutcome {
    pub clusters: Vec<BaseCluster>,
    pub skipped: Vec<SkippedDocument>,
    /// Documents accepted into the tree.
    pub documents: usize,
}

/// Builds a tree over `documents`, propagates membership and extracts the
/// base clusters reaching `config.min_document_frequency`.
///
/// Invalid documents are skipped and reported in the outcome; exceeding the
/// token budget or an internal failure aborts the whole run.
pub fn build_base_clusters<I>(config: TreeConfig, documents: I) -> Result<ClusteringOutcome>
where
    I: IntoIterator<Item = (DocumentId, TokenSequence)>,
{
    let mut builder = SuffixTreeBuilder::new(config)?;
    let skipped = builder.insert_all(documents)?;
    let tree = builder.finalize()?;
    let membership = DocumentMembership::propagate(&tree);
    let clusters = PhraseExtractor::new(&tree, &membership).collect_parallel();
    debug!(
        clusters = clusters.len(),
        documents = tree.document_count(),
        skipped = skipped.len(),
        "extracted base clusters"
    );
    Ok(ClusteringOutcome {
        clusters,
        skipped,
        documents: tree.document_count(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_batch_yields_nothing() {
        let outcome = build_base_clusters(TreeConfig::default(), Vec::new()).unwrap();
        assert!(outcome.clusters.is_empty());
        assert!(outcome.skipped.is_empty());
        assert_eq!(outcome.documents, 0);
    }

    #[test]
    fn skipped_documents_are_reported() {
        let outcome = build_base_clusters(
            TreeConfig::default(),
            vec![
                (0, TokenSequence::new(vec![1, 2, 3], 100)),
                (1, TokenSequence::new(vec![1, 2, 100], 101)),
                (2, TokenSequence::new(vec![1, 2, 4], 102)),
            ],
        )
        .unwrap();
        assert_eq!(outcome.documents, 2);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].document, 1);
        assert!(outcome
            .clusters
            .iter()
            .any(|c| c.phrase == [1, 2] && c.document_ids == [0, 2]));
    }

    #[test]
    fn invalid_config_fails_fast() {
        let err = build_base_clusters(TreeConfig::default().with_max_tokens(0), Vec::new());
        assert!(matches!(err, Err(SuffixTreeError::InvalidConfig { .. })));
    }
}
