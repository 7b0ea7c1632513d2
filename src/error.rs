//! Error types for tree construction and configuration.

use crate::sequence::{DocumentId, Token};

/// Crate-wide result type, defaulting to [`SuffixTreeError`].
pub type Result<T, E = SuffixTreeError> = std::result::Result<T, E>;

/// Errors raised while configuring or building a suffix tree.
#[derive(Debug, thiserror::Error)]
pub enum SuffixTreeError {
    /// A document could not be inserted. The tree is unchanged and the
    /// remaining documents of a batch can still be inserted.
    #[error("document {document} rejected: {reason}")]
    InvalidDocument {
        document: DocumentId,
        reason: InvalidDocumentReason,
    },

    /// Inserting a document would exceed the configured token budget.
    #[error(
        "token budget exceeded after {documents_processed} documents: \
         {requested} tokens requested, limit is {limit}"
    )]
    CapacityExceeded {
        documents_processed: usize,
        limit: usize,
        requested: usize,
    },

    /// The engine reached a state that correct construction never produces.
    #[error("internal invariant violated in document {document} at position {position}: {detail}")]
    InvariantViolation {
        document: DocumentId,
        position: usize,
        detail: &'static str,
    },

    #[error("invalid configuration for `{field}`: {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: String,
    },
}

impl SuffixTreeError {
    pub(crate) fn invalid(document: DocumentId, reason: InvalidDocumentReason) -> Self {
        Self::InvalidDocument { document, reason }
    }

    /// Whether a batch insertion may skip the offending document and go on.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::InvalidDocument { .. })
    }
}

/// Why a document was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidDocumentReason {
    #[error("document id is already in use")]
    DuplicateDocument,

    #[error("token sequence has no end marker")]
    MissingTerminator,

    #[error("end marker {0} also occurs as a token in the document")]
    TerminatorInTokens(Token),

    #[error("end marker {0} collides with a token of an earlier document")]
    TerminatorCollision(Token),

    #[error("end marker {0} is already used by another document")]
    DuplicateTerminator(Token),

    #[error("token {0} is the end marker of an earlier document")]
    TokenIsTerminator(Token),

    #[error("no free end marker is left in the token range")]
    TerminatorsExhausted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_context() {
        let err = SuffixTreeError::invalid(7, InvalidDocumentReason::TerminatorInTokens(3));
        assert_eq!(
            err.to_string(),
            "document 7 rejected: end marker 3 also occurs as a token in the document"
        );
        assert!(err.is_recoverable());

        let err = SuffixTreeError::CapacityExceeded {
            documents_processed: 2,
            limit: 10,
            requested: 12,
        };
        assert!(err.to_string().contains("after 2 documents"));
        assert!(!err.is_recoverable());
    }
}
