//! Token sequences handed to the tree by the tokenizer.

/// An interned lexical unit. Two tokens are equal iff they stand for the same word.
pub type Token = u32;

/// Position of a document in the caller's input list.
pub type DocumentId = u32;

/// The tokens of one document plus the end marker that keeps its suffixes
/// distinct from every other document's.
///
/// # Examples
///
/// ```
/// use stc_suffix_tree::TokenSequence;
/// let seq = TokenSequence::new(vec![4, 2, 4], 1000);
/// assert_eq!(seq.len(), 3);
/// assert_eq!(seq.get(1), Some(2));
/// assert_eq!(seq.get(3), Some(1000));
/// assert_eq!(seq.get(4), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSequence {
    tokens: Vec<Token>,
    terminator: Option<Token>,
}

impl TokenSequence {
    pub fn new(tokens: Vec<Token>, terminator: Token) -> Self {
        Self {
            tokens,
            terminator: Some(terminator),
        }
    }

    /// A sequence without end marker. Only insertable through
    /// [`SuffixTreeBuilder::insert_tokens`](crate::SuffixTreeBuilder::insert_tokens),
    /// which picks a marker for it.
    pub fn unterminated(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            terminator: None,
        }
    }

    /// Number of real tokens, end marker excluded.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn terminator(&self) -> Option<Token> {
        self.terminator
    }

    /// Token at `index`; index `len()` is the end marker.
    pub fn get(&self, index: usize) -> Option<Token> {
        match index.cmp(&self.tokens.len()) {
            std::cmp::Ordering::Less => Some(self.tokens[index]),
            std::cmp::Ordering::Equal => self.terminator,
            std::cmp::Ordering::Greater => None,
        }
    }

    pub(crate) fn with_terminator(mut self, terminator: Token) -> Self {
        self.terminator = Some(terminator);
        self
    }

    /// Tokens followed by the end marker, as stored by the tree.
    pub(crate) fn into_symbols(self) -> Option<Vec<Token>> {
        let terminator = self.terminator?;
        let mut symbols = self.tokens;
        symbols.push(terminator);
        Some(symbols)
    }
}

impl From<(Vec<Token>, Token)> for TokenSequence {
    fn from((tokens, terminator): (Vec<Token>, Token)) -> Self {
        Self::new(tokens, terminator)
    }
}
