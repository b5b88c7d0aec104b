/// The lexer takes the source input, mapping it into a sequence of tokens.
pub mod lexer;

/// The parser takes a sequence of tokens, mapping it into a lossless
/// concrete syntax tree with error recovery.
pub mod parser;

pub mod cst;
pub mod diag;
pub mod token;

pub mod util {
    pub mod fmt;
    #[cfg(test)]
    pub(crate) mod test_utils;
}

pub use parser::{parse, parse_bytes, parse_expr, parse_pattern, parse_type_expr, Parse};
