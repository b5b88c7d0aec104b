use std::fmt;

use thiserror::Error;

use crate::{
    cst,
    token::{Span, TokenKind},
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// One reported problem. Diagnostics are ordinary values attached to a
/// still-valid tree; the parser never surfaces problems any other way.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub span: Span,
    pub message: String,
}

impl Diagnostic {
    pub fn error(span: Span, message: impl fmt::Display) -> Diagnostic {
        Diagnostic {
            severity: Severity::Error,
            span,
            message: message.to_string(),
        }
    }

    pub fn warning(span: Span, message: impl fmt::Display) -> Diagnostic {
        Diagnostic {
            severity: Severity::Warning,
            span,
            message: message.to_string(),
        }
    }

    /// Renders as `file:line:col: message`, with a 1-based line and column
    /// computed against the given source.
    pub fn render(&self, file: &str, src: &str) -> String {
        let (line, col) = line_col(src, self.span.lo);
        format!("{file}:{line}:{col}: {}", self.message)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.span, self.message)
    }
}

/// Problems detected while tokenizing. These never abort the lex; the
/// stream still terminates and the parser works around the error tokens.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("unclosed string literal")]
    UnclosedString,
    #[error("unterminated block comment opened at {opened}")]
    UnclosedComment { opened: usize },
    #[error("malformed number literal")]
    MalformedNumber,
    #[error("malformed attribute")]
    MalformedAttribute,
    #[error("unexpected character")]
    UnexpectedChar,
}

/// Problems detected while parsing. Always recovered locally by wrapping
/// the offending tokens in an error node; never raised as a fault.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SyntaxError {
    #[error("expected token {expected:?}, but got {actual:?}")]
    Unexpected {
        actual: TokenKind,
        expected: TokenKind,
    },
    #[error("unexpected token in expression")]
    UnexpectedInExpr,
    #[error("unexpected token in pattern")]
    UnexpectedInPattern,
    #[error("unexpected token in type expression")]
    UnexpectedInType,
    #[error("unexpected token at top level")]
    UnexpectedInDeclaration,
    #[error("record must have at least one field")]
    EmptyRecord,
    #[error("match must have at least one clause")]
    EmptyMatch,
}

/// The only condition under which no tree is produced: the input could not
/// even be tokenized because it is not valid UTF-8. Reachable solely
/// through the byte-buffer entry point.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("source is not valid UTF-8: {0}")]
    InvalidEncoding(#[from] std::str::Utf8Error),
}

/// Maps error tokens (including those hidden in trivia) to diagnostics.
///
/// An unterminated block comment necessarily runs to the end of input, so
/// its diagnostic points at the detection point (end of input) and names
/// the opening offset in the message.
pub(crate) fn collect_lex_errors(tokens: &[cst::Token]) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    let mut push = |kind: TokenKind, span: Span| {
        let error = match kind {
            TokenKind::ErrorUnclosedString => LexError::UnclosedString,
            TokenKind::ErrorUnclosedComment => LexError::UnclosedComment { opened: span.lo },
            TokenKind::ErrorMalformedNumber => LexError::MalformedNumber,
            TokenKind::ErrorMalformedAttribute => LexError::MalformedAttribute,
            TokenKind::ErrorUnexpectedChar => LexError::UnexpectedChar,
            _ => return,
        };
        let at = match error {
            LexError::UnclosedComment { .. } => Span::new_of_length(span.hi(), 0),
            _ => span,
        };
        out.push(Diagnostic::error(at, error));
    };

    for token in tokens {
        for trivia in &token.leading {
            push(trivia.kind, trivia.span);
        }
        push(token.kind, token.span);
        for trivia in &token.trailing {
            push(trivia.kind, trivia.span);
        }
    }
    out
}

/// Returns the 1-based line and column of a byte offset.
pub fn line_col(src: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(src.len());
    let before = &src[..offset];
    let line = before.matches('\n').count() + 1;
    let col = before.rfind('\n').map_or(offset, |nl| offset - nl - 1) + 1;
    (line, col)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_col_basics() {
        let src = "ab\ncde\nf";
        assert_eq!(line_col(src, 0), (1, 1));
        assert_eq!(line_col(src, 2), (1, 3));
        assert_eq!(line_col(src, 3), (2, 1));
        assert_eq!(line_col(src, 7), (3, 1));
        assert_eq!(line_col(src, 8), (3, 2));
    }

    #[test]
    fn unclosed_comment_reported_at_end_of_input() {
        let src = "let x = 1 (* a (* b *) c";
        let tokens = crate::cst::attach_trivia(src, &crate::lexer::lex_in_new(src));
        let errors = collect_lex_errors(&tokens);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].span, Span::new_of_length(src.len(), 0));
        assert_eq!(
            errors[0].message,
            "unterminated block comment opened at 10"
        );
    }
}
