use std::iter::Peekable;

use crate::token::{Span, Token, TokenKind, KEYWORDS};

pub const SUGGESTED_TOKENS_CAPACITY: usize = 8_192;

/// Lexes the provided string, producing the tokens into the provided buffer.
///
/// The lexer never fails: malformed input is represented by error tokens,
/// and the stream always ends with a single `Eof` token.
pub fn lex(src: &str, tokens: &mut Vec<Token>) {
    Lexer::new(src, tokens).lex();
}

/// A convenience function that allocates a new buffer per lexed input and
/// returns it.
pub fn lex_in_new(src: &str) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(SUGGESTED_TOKENS_CAPACITY);
    lex(src, &mut tokens);
    tokens
}

/// The CameLigo lexer
struct Lexer<'src, 'tok> {
    src: &'src str,
    iter: Peekable<std::str::Chars<'src>>,
    cursor: usize,
    current_lo: usize,
    tokens: &'tok mut Vec<Token>,
}

impl Lexer<'_, '_> {
    /// Scans the source string until the input is exhausted.
    ///
    /// Tokens are written into the provided tokens buffer.
    fn lex(mut self) {
        assert_eq!(self.tokens.len(), 0, "must pass clean tokens buffer");
        loop {
            let next = self.scan_token_kind();
            let is_eof = matches!(next, TokenKind::Eof);
            self.produce(next);
            if is_eof {
                break;
            }
        }
    }

    /// Tries to scan the current character.
    fn scan_token_kind(&mut self) -> TokenKind {
        use TokenKind::*;
        match self.mark_advance() {
            '\0' => Eof,
            '+' => Plus,
            '-' => match self.peek() {
                '>' => self.advance_with(Arrow),
                _ => Minus,
            },
            '*' => Star,
            '/' => match self.peek() {
                '/' => self.line_comment(),
                _ => Slash,
            },
            '^' => Caret,
            '=' => match self.peek() {
                '=' => self.advance_with(EqEq),
                _ => Eq,
            },
            '<' => match self.peek() {
                '=' => self.advance_with(LessEq),
                '>' => self.advance_with(NotEq),
                _ => Less,
            },
            '>' => match self.peek() {
                '=' => self.advance_with(GreaterEq),
                _ => Greater,
            },
            '&' => match self.peek() {
                '&' => self.advance_with(AndAnd),
                _ => ErrorUnexpectedChar,
            },
            '|' => match self.peek() {
                '|' => self.advance_with(OrOr),
                _ => Pipe,
            },
            ':' => match self.peek() {
                ':' => self.advance_with(ColonColon),
                _ => Colon,
            },
            ';' => Semicolon,
            ',' => Comma,
            '.' => Dot,
            '(' => match self.peek() {
                '*' => self.block_comment(),
                _ => LParen,
            },
            ')' => RParen,
            '[' => match self.peek() {
                '@' => self.attribute(),
                _ => LBracket,
            },
            ']' => RBracket,
            '{' => LBrace,
            '}' => RBrace,
            '#' => self.include_directive(),
            '"' => self.string(),
            '_' => match self.peek() {
                c if c.is_ascii_alphanumeric() || c == '_' => self.identifier_or_keyword(),
                _ => Underscore,
            },
            c if c.is_ascii_alphabetic() => self.identifier_or_keyword(),
            c if c.is_ascii_digit() => self.number(c),
            c if c.is_ascii_whitespace() => self.whitespace(),
            _ => TokenKind::ErrorUnexpectedChar,
        }
    }

    /// Tries to lex a string token.
    ///
    /// A string runs to the closing quotation mark on the same line. A
    /// backslash escapes the following character (which is all the lexer
    /// needs to know about escapes; interpreting them is a consumer
    /// concern). An unescaped line break or the end of input terminates
    /// the token as an unclosed-string error, without consuming the break,
    /// so the token never swallows input past the point of detection.
    fn string(&mut self) -> TokenKind {
        loop {
            match self.peek() {
                '\0' | '\n' => return TokenKind::ErrorUnclosedString,
                '"' => {
                    self.advance();
                    return TokenKind::String;
                }
                '\\' => {
                    self.advance();
                    // The escaped character, unless the input ends here.
                    if self.peek() != '\0' {
                        self.advance();
                    }
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn identifier_or_keyword(&mut self) -> TokenKind {
        let valid_identifier_suffix = |c: char| c.is_ascii_alphanumeric() || c == '_';

        while valid_identifier_suffix(self.peek()) {
            self.advance();
        }
        let substr = self.substr();
        // The case of the first character is load-bearing: uppercase-first
        // names are data constructors, and keywords are all lowercase.
        if substr.as_bytes()[0].is_ascii_uppercase() {
            return TokenKind::NameCapital;
        }
        match KEYWORDS.get(substr).copied() {
            Some(keyword) => keyword,
            None => TokenKind::Name,
        }
    }

    /// Scans a numeric literal and classifies it by its suffix: none for
    /// `Int`, `n` for `Nat`, `tz`/`tez`/`mutez` for `Tez`. Byte strings
    /// start with `0x`. A decimal part is only valid in tez amounts.
    fn number(&mut self, first: char) -> TokenKind {
        if first == '0' && self.peek() == 'x' {
            self.advance();
            let mut digits = 0;
            while self.peek().is_ascii_hexdigit() {
                self.advance();
                digits += 1;
            }
            return if digits == 0 {
                TokenKind::ErrorMalformedNumber
            } else {
                TokenKind::Bytes
            };
        }

        let valid_digit = |c: char| c.is_ascii_digit() || c == '_';
        while valid_digit(self.peek()) {
            self.advance();
        }

        let mut has_decimal = false;
        if self.peek() == '.' && self.peek2().is_ascii_digit() {
            has_decimal = true;
            self.advance(); // .
            while valid_digit(self.peek()) {
                self.advance();
            }
        }

        let suffix_lo = self.cursor;
        while self.peek().is_ascii_alphabetic() {
            self.advance();
        }
        let suffix = &self.src[suffix_lo..self.cursor];
        match suffix {
            "" if !has_decimal => TokenKind::Int,
            "n" if !has_decimal => TokenKind::Nat,
            "tz" | "tez" | "mutez" => TokenKind::Tez,
            _ => TokenKind::ErrorMalformedNumber,
        }
    }

    fn whitespace(&mut self) -> TokenKind {
        while self.peek().is_ascii_whitespace() {
            self.advance();
        }
        TokenKind::Whitespace
    }

    /// `// ...` runs to the end of the line, not including the line break.
    fn line_comment(&mut self) -> TokenKind {
        assert_eq!(self.advance(), '/');
        while !matches!(self.peek(), '\n' | '\0') {
            self.advance();
        }
        TokenKind::LineComment
    }

    /// `(* ... *)` comments nest. The depth counter increments on every
    /// inner `(*` and decrements on `*)`; the comment ends when the depth
    /// returns to zero. An explicit counter (rather than recursion) keeps
    /// deeply nested input off the call stack. A `//` sequence inside a
    /// block comment is plain text and cannot hide a closing `*)`.
    fn block_comment(&mut self) -> TokenKind {
        assert_eq!(self.advance(), '*');
        let mut depth = 1_u32;
        loop {
            match self.advance() {
                '\0' => return TokenKind::ErrorUnclosedComment,
                '*' => {
                    if self.peek() == ')' {
                        self.advance();
                        depth -= 1;
                        if depth == 0 {
                            return TokenKind::BlockComment;
                        }
                    }
                }
                '(' => {
                    if self.peek() == '*' {
                        self.advance();
                        depth += 1;
                    }
                }
                _ => continue,
            }
        }
    }

    /// `[@@name]`, lexed as a single token.
    fn attribute(&mut self) -> TokenKind {
        assert_eq!(self.advance(), '@');
        if self.peek() != '@' {
            return TokenKind::ErrorMalformedAttribute;
        }
        self.advance();
        let mut letters = 0;
        while self.peek().is_ascii_lowercase() {
            self.advance();
            letters += 1;
        }
        if letters > 0 && self.peek() == ']' {
            self.advance();
            TokenKind::Attribute
        } else {
            TokenKind::ErrorMalformedAttribute
        }
    }

    /// `#include` is the only `#`-directive in the grammar.
    fn include_directive(&mut self) -> TokenKind {
        while self.peek().is_ascii_alphabetic() {
            self.advance();
        }
        if self.substr() == "#include" {
            TokenKind::Include
        } else {
            TokenKind::ErrorUnexpectedChar
        }
    }
}

impl Lexer<'_, '_> {
    /// Constructs a new lexer with the default state.
    fn new<'src, 'tok>(src: &'src str, tokens: &'tok mut Vec<Token>) -> Lexer<'src, 'tok> {
        Lexer {
            src,
            iter: src.chars().peekable(),
            cursor: 0,
            current_lo: 0,
            tokens,
        }
    }

    /// Starts a new token "mark" and advances the iterator.
    fn mark_advance(&mut self) -> char {
        self.current_lo = self.cursor;
        self.advance()
    }

    /// Returns the next character and advances the iterator.
    fn advance(&mut self) -> char {
        self.iter
            .next()
            .inspect(|c| self.cursor += c.len_utf8())
            .unwrap_or('\0')
    }

    /// Advances and returns the provided value.
    fn advance_with<T>(&mut self, value: T) -> T {
        self.advance();
        value
    }

    /// Returns the next character without advancing the iterator.
    fn peek(&mut self) -> char {
        self.iter.peek().copied().unwrap_or('\0')
    }

    /// Returns the character after the next one. Only needed to decide
    /// whether a `.` after digits starts a decimal part.
    fn peek2(&self) -> char {
        let mut ahead = self.iter.clone();
        ahead.next();
        ahead.next().unwrap_or('\0')
    }

    /// Returns the current span.
    fn span(&self) -> Span {
        Span::new_of_bounds(self.current_lo..self.cursor)
    }

    /// Returns the substring of the current marked bounds.
    fn substr(&self) -> &str {
        self.span().substr(self.src)
    }

    /// Produces a token using the marked bounds.
    fn produce(&mut self, kind: TokenKind) {
        let span = self.span();
        self.tokens.push(Token::new(kind, span));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn tests_with_span() {
        use TokenKind::*;
        let cases = cases!(match .. {
            "+-*/^" => [
                (Plus, 0..1),
                (Minus, 1..2),
                (Star, 2..3),
                (Slash, 3..4),
                (Caret, 4..5),
                (Eof, 5..5),
            ],
            "-> :: && || <> == <= >=" => [
                (Arrow, 0..2),
                (Whitespace, 2..3),
                (ColonColon, 3..5),
                (Whitespace, 5..6),
                (AndAnd, 6..8),
                (Whitespace, 8..9),
                (OrOr, 9..11),
                (Whitespace, 11..12),
                (NotEq, 12..14),
                (Whitespace, 14..15),
                (EqEq, 15..17),
                (Whitespace, 17..18),
                (LessEq, 18..20),
                (Whitespace, 20..21),
                (GreaterEq, 21..23),
                (Eof, 23..23),
            ],
            "let rec in type match with fun" => [
                (Let, 0..3),
                (Whitespace, 3..4),
                (Rec, 4..7),
                (Whitespace, 7..8),
                (In, 8..10),
                (Whitespace, 10..11),
                (Type, 11..15),
                (Whitespace, 15..16),
                (Match, 16..21),
                (Whitespace, 21..22),
                (With, 22..26),
                (Whitespace, 26..27),
                (Fun, 27..30),
                (Eof, 30..30),
            ],
            // Keywords are case sensitive; capitalized names are constructors.
            "Let x _ _tmp" => [
                (NameCapital, 0..3),
                (Whitespace, 3..4),
                (Name, 4..5),
                (Whitespace, 5..6),
                (Underscore, 6..7),
                (Whitespace, 7..8),
                (Name, 8..12),
                (Eof, 12..12),
            ],
            "42 42n 1_000 1tez 1.5tz 100mutez 0xdeadBEEF" => [
                (Int, 0..2),
                (Whitespace, 2..3),
                (Nat, 3..6),
                (Whitespace, 6..7),
                (Int, 7..12),
                (Whitespace, 12..13),
                (Tez, 13..17),
                (Whitespace, 17..18),
                (Tez, 18..23),
                (Whitespace, 23..24),
                (Tez, 24..32),
                (Whitespace, 32..33),
                (Bytes, 33..43),
                (Eof, 43..43),
            ],
            "1x 1.5 0x" => [
                (ErrorMalformedNumber, 0..2),
                (Whitespace, 2..3),
                (ErrorMalformedNumber, 3..6),
                (Whitespace, 6..7),
                (ErrorMalformedNumber, 7..9),
                (Eof, 9..9),
            ],
            // A dot after digits only joins the number when digits follow.
            "x.1 1.f" => [
                (Name, 0..1),
                (Dot, 1..2),
                (Int, 2..3),
                (Whitespace, 3..4),
                (Int, 4..5),
                (Dot, 5..6),
                (Name, 6..7),
                (Eof, 7..7),
            ],
            r#""hi" "a\"b" "oi"# => [
                (String, 0..4),
                (Whitespace, 4..5),
                (String, 5..11),
                (Whitespace, 11..12),
                (ErrorUnclosedString, 12..15),
                (Eof, 15..15),
            ],
            "\"broken\nx\"y\"" => [
                (ErrorUnclosedString, 0..7),
                (Whitespace, 7..8),
                (Name, 8..9),
                (String, 9..12),
                (Eof, 12..12),
            ],
            "x // comment\ny" => [
                (Name, 0..1),
                (Whitespace, 1..2),
                (LineComment, 2..12),
                (Whitespace, 12..13),
                (Name, 13..14),
                (Eof, 14..14),
            ],
            // Nested block comments are one contiguous trivia region.
            "(* a (* b *) c *) 1" => [
                (BlockComment, 0..17),
                (Whitespace, 17..18),
                (Int, 18..19),
                (Eof, 19..19),
            ],
            "(* a (* b *) c" => [
                (ErrorUnclosedComment, 0..14),
                (Eof, 14..14),
            ],
            // A `//` inside a block comment cannot hide the closing `*)`.
            "(* x // *) y" => [
                (BlockComment, 0..10),
                (Whitespace, 10..11),
                (Name, 11..12),
                (Eof, 12..12),
            ],
            "#include \"lib.mligo\"" => [
                (Include, 0..8),
                (Whitespace, 8..9),
                (String, 9..20),
                (Eof, 20..20),
            ],
            "#import x" => [
                (ErrorUnexpectedChar, 0..7),
                (Whitespace, 7..8),
                (Name, 8..9),
                (Eof, 9..9),
            ],
            "[@@inline] [@bad] [1]" => [
                (Attribute, 0..10),
                (Whitespace, 10..11),
                (ErrorMalformedAttribute, 11..13),
                (Name, 13..16),
                (RBracket, 16..17),
                (Whitespace, 17..18),
                (LBracket, 18..19),
                (Int, 19..20),
                (RBracket, 20..21),
                (Eof, 21..21),
            ],
            "a&b" => [
                (Name, 0..1),
                (ErrorUnexpectedChar, 1..2),
                (Name, 2..3),
                (Eof, 3..3),
            ],
        });

        for (input, tokens) in cases {
            let lexed = lex_in_new(input);
            assert_eq!(lexed, tokens.as_slice(), "input: {input:?}");
        }
    }

    #[test]
    fn tokens_cover_input_exactly() {
        let input = "let f (x : int) = (* c *) x + 1 // t\nlet y = f 2n";
        let mut covered = 0;
        for token in lex_in_new(input) {
            assert_eq!(token.span().lo, covered);
            covered = token.span().hi();
        }
        assert_eq!(covered, input.len());
    }

    macro_rules! cases {
        (match .. {
            $($str:expr => [$(($kind:expr, $range:expr)),* $(,)?]),* $(,)?
        }) => {{
            &[$((
                $str,
                vec![
                    $(Token::new($kind, Span::new_of_bounds($range.start..$range.end))),*
                ],
            )),*]
        }};
    }
    use cases;
}
