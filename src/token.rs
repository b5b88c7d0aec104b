use std::{fmt, ops::Range};

#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    lo: usize,
    len: u32,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Token {
        Token {
            kind,
            lo: span.lo,
            len: span.len,
        }
    }

    pub fn span(&self) -> Span {
        Span {
            lo: self.lo,
            len: self.len,
        }
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({:?}, {})", self.kind, self.span())
    }
}

#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Span {
    pub lo: usize,
    pub len: u32,
}

impl Span {
    pub fn new_of_bounds(Range { start: lo, end: hi }: Range<usize>) -> Span {
        debug_assert!(hi >= lo);
        Self::new_of_length(lo, u32::try_from(hi - lo).unwrap())
    }

    pub fn new_of_length(lo: usize, len: u32) -> Span {
        Span { lo, len }
    }

    pub fn hi(&self) -> usize {
        self.lo + self.len as usize
    }

    /// Returns the smallest span covering both `self` and `other`.
    pub fn to(&self, other: Span) -> Span {
        let lo = self.lo.min(other.lo);
        let hi = self.hi().max(other.hi());
        Span::new_of_bounds(lo..hi)
    }

    pub fn substr<'src>(&self, src: &'src str) -> &'src str {
        &src[self.lo..self.hi()]
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Span({self}, len: {})", self.len)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lo = self.lo;
        let hi = self.hi();
        write!(f, "{lo}..{hi}")
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Begin,
    End,
    Of,
    If,
    Then,
    Else,
    Match,
    With,
    Fun,
    Let,
    Rec,
    In,
    Type,
    Mod,
    True,
    False,

    /// The `#include` directive marker.
    Include,
    /// A whole `[@@name]` attribute.
    Attribute,

    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Semicolon,
    Colon,
    Comma,
    Dot,
    Pipe,
    Underscore,
    /// `->`
    Arrow,
    Eq,
    /// `==`
    EqEq,
    /// `<>`
    NotEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    /// `::`
    ColonColon,
    AndAnd,
    OrOr,

    /// Lowercase-first identifier (also used for type and field names).
    Name,
    /// Uppercase-first identifier (data constructor or module-style name).
    NameCapital,

    Int,
    /// Natural number literal, e.g. `42n`.
    Nat,
    /// Tezos amount literal, e.g. `1.5tez` or `100mutez`.
    Tez,
    /// Byte string literal, e.g. `0xdeadbeef`.
    Bytes,
    String,

    Whitespace,
    LineComment,
    BlockComment,

    ErrorUnclosedString,
    ErrorUnclosedComment,
    ErrorMalformedNumber,
    ErrorMalformedAttribute,
    ErrorUnexpectedChar,

    Eof,
}

impl TokenKind {
    /// Whitespace and comments carry no grammatical meaning but are kept
    /// around so the concrete tree can reproduce the input exactly.
    ///
    /// An unclosed block comment still lexes as one comment region; its
    /// error is surfaced as a diagnostic, not as a grammatical token.
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            TokenKind::Whitespace
                | TokenKind::LineComment
                | TokenKind::BlockComment
                | TokenKind::ErrorUnclosedComment
        )
    }
}

pub static KEYWORDS: phf::Map<&'static str, TokenKind> = phf::phf_map! {
    "begin" => TokenKind::Begin,
    "end" => TokenKind::End,
    "of" => TokenKind::Of,
    "if" => TokenKind::If,
    "then" => TokenKind::Then,
    "else" => TokenKind::Else,
    "match" => TokenKind::Match,
    "with" => TokenKind::With,
    "fun" => TokenKind::Fun,
    "let" => TokenKind::Let,
    "rec" => TokenKind::Rec,
    "in" => TokenKind::In,
    "type" => TokenKind::Type,
    "mod" => TokenKind::Mod,
    "true" => TokenKind::True,
    "false" => TokenKind::False,
};
