//! The token definition for the FIQL structural grammar.

/// A token is a single unit of the language, with a specific kind and location.
#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub span: Span,
}

/// The kind of a token.
///
/// Only the four reserved characters are structural; everything between them
/// is carried verbatim as `Text` and handed to the comparison parser.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind<'a> {
    LParen,    // (
    RParen,    // )
    Semicolon, // ; (AND)
    Comma,     // , (OR)
    Text(&'a str),
}

impl TokenKind<'_> {
    /// The boolean separator this token stands for, if any.
    pub fn separator(&self) -> Option<Separator> {
        match self {
            TokenKind::Semicolon => Some(Separator::And),
            TokenKind::Comma => Some(Separator::Or),
            _ => None,
        }
    }
}

/// Top-level boolean separator between two units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Separator {
    And,
    Or,
}

impl Separator {
    pub fn symbol(self) -> char {
        match self {
            Separator::And => ';',
            Separator::Or => ',',
        }
    }
}

/// Represents a span in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// The starting byte offset.
    pub start: usize,
    /// The ending byte offset.
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}
