//! Recursive-descent parser producing a lossless concrete syntax tree.
//!
//! Expressions and patterns share one explicit operator-precedence table
//! (see [`infix_binding_power`](Parser::infix_binding_power)); the grammar
//! levels map to doubled binding powers so associativity is expressed by
//! the left/right pair ordering. Keeping the table literal (instead of
//! encoding precedence in grammar rules) makes tie-break behavior auditable
//! in one place.
//!
//! The parser never fails to return a tree: malformed input is wrapped in
//! error nodes at explicit synchronization points and surfaced as
//! diagnostics. Only the byte-buffer entry point can fail, and only on
//! invalid UTF-8.

use crate::{
    cst::{self, Child, ErrorContext, Field, NodeId, NodeKind, Tree},
    diag::{self, Diagnostic, FatalError, SyntaxError},
    lexer,
    token::{Span, TokenKind},
};

type Result<T, E = ()> = std::result::Result<T, E>;

type Children = Vec<(Field, Child)>;

/// The outcome of a parse: a tree (always) plus ordered diagnostics.
pub struct Parse {
    /// Opaque identity of the input, used only to label diagnostics.
    pub file: String,
    pub tree: Tree,
    pub diagnostics: Vec<Diagnostic>,
}

impl Parse {
    /// Whether the parse produced no error-severity diagnostics. Warnings
    /// do not count against a successful parse.
    pub fn ok(&self) -> bool {
        self.diagnostics
            .iter()
            .all(|d| d.severity != diag::Severity::Error)
    }

    /// Renders every diagnostic as `file:line:col: message`.
    pub fn render_diagnostics(&self) -> Vec<String> {
        self.diagnostics
            .iter()
            .map(|d| d.render(&self.file, self.tree.text()))
            .collect()
    }
}

/// Parses a full contract (an ordered sequence of declarations).
pub fn parse(src: &str, file: &str) -> Parse {
    run(src, file, |p| p.parse_contract())
}

/// Parses a byte buffer, failing only when the bytes are not valid UTF-8.
pub fn parse_bytes(bytes: &[u8], file: &str) -> Result<Parse, FatalError> {
    let src = std::str::from_utf8(bytes)?;
    Ok(parse(src, file))
}

/// Parses a single expression (or `let ... in` chain).
pub fn parse_expr(src: &str, file: &str) -> Parse {
    run(src, file, |p| {
        p.parse_root(Field::Expr, ErrorContext::Expr, Parser::parse_program)
    })
}

/// Parses a single pattern.
pub fn parse_pattern(src: &str, file: &str) -> Parse {
    run(src, file, |p| {
        p.parse_root(Field::Pattern, ErrorContext::Pattern, Parser::parse_pattern)
    })
}

/// Parses a single type expression.
pub fn parse_type_expr(src: &str, file: &str) -> Parse {
    run(src, file, |p| {
        p.parse_root(Field::Type, ErrorContext::Type, Parser::parse_type)
    })
}

fn run(src: &str, file: &str, f: impl FnOnce(&mut Parser) -> NodeId) -> Parse {
    let raw = lexer::lex_in_new(src);
    let tokens = cst::attach_trivia(src, &raw);
    let mut diagnostics = diag::collect_lex_errors(&tokens);

    let mut tree = Tree::new(src.to_owned(), tokens);
    let mut parser = Parser::new(&mut tree);
    let root = f(&mut parser);
    debug_assert!(matches!(parser.state, State::Done));

    diagnostics.extend(parser.errors);
    diagnostics.sort_by_key(|d| d.span.lo);
    tree.set_root(root);
    Parse {
        file: file.to_owned(),
        tree,
        diagnostics,
    }
}

/// Top-level keywords at which recovery may always resume. Bracketed
/// constructs extend this set with their own separator and closing
/// delimiter when synchronizing (see [`Parser::sync_to`]).
const DECL_START: &[TokenKind] = &[TokenKind::Let, TokenKind::Type, TokenKind::Include];

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum State {
    Parsing,
    Recovering,
    Done,
}

struct Parser<'t> {
    tree: &'t mut Tree,
    cursor: usize,
    errors: Vec<Diagnostic>,
    state: State,
}

// Declarations.
impl Parser<'_> {
    fn parse_contract(&mut self) -> NodeId {
        let mut ch = Children::new();
        while !self.at(TokenKind::Eof) {
            let start = self.cursor;
            match self.parse_declaration() {
                Ok(decl) => ch.push((Field::Declaration, Child::Node(decl))),
                Err(()) => {
                    self.sync_to(&[]);
                    let error = self.wrap_error(start, ErrorContext::Declaration);
                    ch.push((Field::Declaration, Child::Node(error)));
                }
            }
        }
        self.advance_into(&mut ch, Field::Token); // Eof
        self.state = State::Done;
        self.alloc(NodeKind::Contract, ch)
    }

    fn parse_declaration(&mut self) -> Result<NodeId> {
        match self.peek() {
            TokenKind::Let => self.parse_let_decl(),
            TokenKind::Type => self.parse_type_decl(),
            TokenKind::Include => self.parse_include(),
            _ => {
                let span = self.peek_span();
                self.error_at(span, SyntaxError::UnexpectedInDeclaration);
                Err(())
            }
        }
    }

    /// Parses `let [rec] ...`, deciding between a value binding (pattern on
    /// the left of `=`) and a function declaration (name followed by one or
    /// more parameter patterns). One token of lookahead after the name is
    /// enough to tell them apart.
    fn parse_let_decl(&mut self) -> Result<NodeId> {
        let mut ch = Children::new();
        self.consume(&mut ch, Field::Token, TokenKind::Let)?;
        self.take(&mut ch, Field::Recursive, TokenKind::Rec);

        let is_function = self.at(TokenKind::Name) && Self::starts_param(self.peek_nth(1));
        let kind = if is_function {
            self.consume(&mut ch, Field::Name, TokenKind::Name)?;
            while Self::starts_param(self.peek()) {
                let arg = self.parse_param_pattern()?;
                ch.push((Field::Arg, Child::Node(arg)));
            }
            NodeKind::FunDecl
        } else {
            let pattern = self.parse_pattern()?;
            ch.push((Field::Name, Child::Node(pattern)));
            NodeKind::LetDecl
        };

        if self.take(&mut ch, Field::Token, TokenKind::Colon) {
            let ty = self.parse_type()?;
            ch.push((Field::Type, Child::Node(ty)));
        }
        self.consume(&mut ch, Field::Token, TokenKind::Eq)?;
        let body = self.parse_program()?;
        ch.push((Field::Body, Child::Node(body)));
        self.parse_attributes(&mut ch);

        Ok(self.alloc(kind, ch))
    }

    fn parse_attributes(&mut self, ch: &mut Children) {
        while self.at(TokenKind::Attribute) {
            let mut attr = Children::new();
            self.advance_into(&mut attr, Field::Token);
            let node = self.alloc(NodeKind::Attribute, attr);
            ch.push((Field::Attribute, Child::Node(node)));
        }
    }

    fn parse_type_decl(&mut self) -> Result<NodeId> {
        let mut ch = Children::new();
        self.consume(&mut ch, Field::Token, TokenKind::Type)?;
        let name = self.parse_type_con()?;
        ch.push((Field::Name, Child::Node(name)));
        self.consume(&mut ch, Field::Token, TokenKind::Eq)?;

        // The body is exactly one of: sum type, record type, type expression.
        let body = match self.peek() {
            TokenKind::Pipe | TokenKind::NameCapital => self.parse_type_sum()?,
            TokenKind::LBrace => self.parse_type_record()?,
            _ => self.parse_type()?,
        };
        ch.push((Field::Type, Child::Node(body)));
        Ok(self.alloc(NodeKind::TypeDecl, ch))
    }

    /// `#include "file"`. The filename is stored verbatim; resolving and
    /// opening it is the job of an external module resolver.
    fn parse_include(&mut self) -> Result<NodeId> {
        let mut ch = Children::new();
        self.consume(&mut ch, Field::Token, TokenKind::Include)?;
        self.consume(&mut ch, Field::Filename, TokenKind::String)?;
        Ok(self.alloc(NodeKind::Include, ch))
    }
}

// Expressions.
impl Parser<'_> {
    /// Parses a "program": the body position of `let`, `fun`, `if`, and
    /// `match`, which admits a whole `let ... in` chain, not just a bare
    /// expression.
    ///
    /// A `let` here is only a let-expression if an `in` follows the
    /// binding. When the `in` is missing the `let` is most likely the next
    /// top-level declaration and the current body is what is malformed, so
    /// the cursor is rolled back to the `let` before failing; the abandoned
    /// speculative nodes stay unreachable in the arena.
    fn parse_program(&mut self) -> Result<NodeId> {
        if !self.at(TokenKind::Let) {
            return self.parse_expr_bp(0);
        }

        let checkpoint = self.cursor;
        let mut ch = Children::new();
        let decl = self.parse_let_decl()?;
        ch.push((Field::Decl, Child::Node(decl)));

        if !self.at(TokenKind::In) {
            let span = self.peek_span();
            self.error_at(
                span,
                SyntaxError::Unexpected {
                    actual: self.peek(),
                    expected: TokenKind::In,
                },
            );
            self.cursor = checkpoint;
            return Err(());
        }
        self.advance_into(&mut ch, Field::Token); // in
        let body = self.parse_program()?;
        ch.push((Field::Body, Child::Node(body)));
        Ok(self.alloc(NodeKind::LetExpr, ch))
    }

    fn parse_expr_bp(&mut self, min_bp: u8) -> Result<NodeId> {
        let mut lhs = self.parse_expr_nud()?;

        loop {
            let kind = self.peek();

            // Function application has no operator token: two adjacent
            // sub-expressions juxtapose. It binds tighter than every infix
            // operator, so `f a + b` is `(f a) + b`.
            if Self::starts_expr_atom(kind) {
                if Self::APP_BP.0 < min_bp {
                    break;
                }
                let mut ch = vec![(Field::F, Child::Node(lhs))];
                let arg = self.parse_expr_bp(Self::APP_BP.1)?;
                ch.push((Field::X, Child::Node(arg)));
                lhs = self.alloc(NodeKind::FunApp, ch);
                continue;
            }

            match kind {
                // Projection `a.0` / `a.b`, the tightest level.
                TokenKind::Dot => {
                    if Self::PROJ_BP.0 < min_bp {
                        break;
                    }
                    let mut ch = vec![(Field::Box, Child::Node(lhs))];
                    self.advance_into(&mut ch, Field::Token);
                    let field = self.parse_expr_bp(Self::PROJ_BP.1)?;
                    ch.push((Field::Field, Child::Node(field)));
                    lhs = self.alloc(NodeKind::Projection, ch);
                }
                // Comma sequencing is the loosest expression form. Items
                // parse above the comma level, so the node stays flat.
                TokenKind::Comma => {
                    if Self::TUPLE_BP.0 < min_bp {
                        break;
                    }
                    let mut ch = vec![(Field::Item, Child::Node(lhs))];
                    while self.at(TokenKind::Comma) {
                        self.advance_into(&mut ch, Field::Token);
                        let item = self.parse_expr_bp(Self::TUPLE_BP.0 + 1)?;
                        ch.push((Field::Item, Child::Node(item)));
                    }
                    lhs = self.alloc(NodeKind::Tuple, ch);
                }
                _ => {
                    let Some((lbp, rbp)) = Self::infix_binding_power(kind) else {
                        break;
                    };
                    if lbp < min_bp {
                        break;
                    }
                    let mut ch = vec![(Field::Left, Child::Node(lhs))];
                    self.advance_into(&mut ch, Field::Op);
                    let rhs = self.parse_expr_bp(rbp)?;
                    ch.push((Field::Right, Child::Node(rhs)));
                    lhs = self.alloc(NodeKind::BinaryOp, ch);
                }
            }
        }

        Ok(lhs)
    }

    /// Binding powers for infix operators, tighter to looser. Grammar
    /// level `n` maps to the pair `(2n, 2n+1)` for left-associative
    /// operators and `(2n+1, 2n)` for right-associative ones.
    ///
    /// | level | operators              | assoc |
    /// |-------|------------------------|-------|
    /// | 16    | `mod`                  | left  |
    /// | 15    | `/` `*`                | left  |
    /// | 14    | `-` `+`                | left  |
    /// | 13    | `::`                   | right |
    /// | 12    | `^`                    | right |
    /// | 11    | `&&` `\|\|`            | left  |
    /// | 10    | `=` `<>` `==` `<` `<=` `>` `>=` | left |
    ///
    /// Projection (21), application (20), unary negation (19), and tuple
    /// sequencing (9) occupy the levels around this table and are handled
    /// structurally in the parse loop.
    fn infix_binding_power(kind: TokenKind) -> Option<(u8, u8)> {
        use TokenKind::*;
        let bp = match kind {
            Mod => (32, 33),
            Slash | Star => (30, 31),
            Minus | Plus => (28, 29),
            ColonColon => (27, 26),
            Caret => (25, 24),
            AndAnd | OrOr => (22, 23),
            Eq | NotEq | EqEq | Less | LessEq | Greater | GreaterEq => (20, 21),
            _ => return None,
        };
        Some(bp)
    }

    const APP_BP: (u8, u8) = (40, 41);
    const PROJ_BP: (u8, u8) = (43, 42);
    const TUPLE_BP: (u8, u8) = (19, 18);
    const NEG_RBP: u8 = 38;

    /// Tokens that may begin an application argument (and hence continue a
    /// juxtaposition chain). Control forms like `if` and `match` must be
    /// parenthesized in argument position.
    fn starts_expr_atom(kind: TokenKind) -> bool {
        use TokenKind::*;
        matches!(
            kind,
            Name | NameCapital
                | Int
                | Nat
                | Tez
                | Bytes
                | String
                | True
                | False
                | LParen
                | LBracket
                | LBrace
                | Begin
                | ErrorUnclosedString
                | ErrorMalformedNumber
        )
    }

    fn parse_expr_nud(&mut self) -> Result<NodeId> {
        use TokenKind::*;
        match self.peek() {
            Name => Ok(self.leaf(NodeKind::Name)),
            NameCapital => Ok(self.leaf(NodeKind::NameCapital)),
            Int | Nat | Tez | Bytes | String | True | False | ErrorUnclosedString
            | ErrorMalformedNumber => Ok(self.leaf(NodeKind::Literal)),
            Minus if self.at_negative_int() => {
                let mut ch = Children::new();
                self.advance_into(&mut ch, Field::Token);
                self.advance_into(&mut ch, Field::Token);
                Ok(self.alloc(NodeKind::Literal, ch))
            }
            Minus => {
                let mut ch = Children::new();
                self.advance_into(&mut ch, Field::Op);
                let arg = self.parse_expr_bp(Self::NEG_RBP)?;
                ch.push((Field::Arg, Child::Node(arg)));
                Ok(self.alloc(NodeKind::UnaryOp, ch))
            }
            LParen => self.parse_paren_expr(),
            LBracket => self.parse_list_expr(),
            LBrace => self.parse_record_expr(),
            Begin => self.parse_block_expr(),
            If => self.parse_if_expr(),
            Match => self.parse_match_expr(),
            Fun => self.parse_lambda(),
            _ => {
                let span = self.peek_span();
                self.error_at(span, SyntaxError::UnexpectedInExpr);
                Err(())
            }
        }
    }

    /// `()`, `(e)`, or `(e : T)`.
    fn parse_paren_expr(&mut self) -> Result<NodeId> {
        let mut ch = Children::new();
        if self.peek_nth(1) == TokenKind::RParen {
            self.advance_into(&mut ch, Field::Token);
            self.advance_into(&mut ch, Field::Token);
            return Ok(self.alloc(NodeKind::Unit, ch));
        }
        self.consume(&mut ch, Field::Token, TokenKind::LParen)?;
        let expr = self.parse_program()?;
        ch.push((Field::Expr, Child::Node(expr)));
        let kind = if self.take(&mut ch, Field::Token, TokenKind::Colon) {
            let ty = self.parse_type()?;
            ch.push((Field::Type, Child::Node(ty)));
            NodeKind::Annot
        } else {
            NodeKind::Paren
        };
        self.expect(&mut ch, Field::Token, TokenKind::RParen);
        Ok(self.alloc(kind, ch))
    }

    fn parse_list_expr(&mut self) -> Result<NodeId> {
        let mut ch = Children::new();
        self.consume(&mut ch, Field::Token, TokenKind::LBracket)?;
        self.parse_list(
            &mut ch,
            Field::Item,
            TokenKind::Semicolon,
            TokenKind::RBracket,
            ErrorContext::Item,
            |p| p.parse_expr_bp(0),
        );
        self.expect(&mut ch, Field::Token, TokenKind::RBracket);
        Ok(self.alloc(NodeKind::List, ch))
    }

    /// `{ f = v; ... }` or `{ subject with f = v; ... }`, told apart by
    /// bounded lookahead right after the brace: a lowercase name followed
    /// by `with` selects the update form.
    fn parse_record_expr(&mut self) -> Result<NodeId> {
        let is_update =
            self.peek_nth(1) == TokenKind::Name && self.peek_nth(2) == TokenKind::With;

        let mut ch = Children::new();
        self.consume(&mut ch, Field::Token, TokenKind::LBrace)?;
        if is_update {
            let subject = self.leaf(NodeKind::Name);
            ch.push((Field::Subject, Child::Node(subject)));
            self.advance_into(&mut ch, Field::Token); // with
        }
        if self.at(TokenKind::RBrace) {
            let span = self.peek_span();
            self.error_at(span, SyntaxError::EmptyRecord);
        }
        self.parse_list(
            &mut ch,
            Field::Field,
            TokenKind::Semicolon,
            TokenKind::RBrace,
            ErrorContext::RecordField,
            Parser::parse_rec_assignment,
        );
        self.expect(&mut ch, Field::Token, TokenKind::RBrace);
        let kind = if is_update {
            NodeKind::RecordUpdate
        } else {
            NodeKind::RecordLiteral
        };
        Ok(self.alloc(kind, ch))
    }

    /// `field = value`. The field side parses at projection level so that
    /// `a.b = v` works while the `=` stays a separator, not a comparison.
    fn parse_rec_assignment(&mut self) -> Result<NodeId> {
        let mut ch = Children::new();
        let field = self.parse_expr_bp(Self::PROJ_BP.1)?;
        ch.push((Field::Field, Child::Node(field)));
        self.consume(&mut ch, Field::Token, TokenKind::Eq)?;
        let value = self.parse_expr_bp(0)?;
        ch.push((Field::Value, Child::Node(value)));
        Ok(self.alloc(NodeKind::RecordAssignment, ch))
    }

    /// `begin e; ...; e end`, grouping semicolon-separated sub-programs as
    /// one expression.
    fn parse_block_expr(&mut self) -> Result<NodeId> {
        let mut ch = Children::new();
        self.consume(&mut ch, Field::Token, TokenKind::Begin)?;
        self.parse_list(
            &mut ch,
            Field::Item,
            TokenKind::Semicolon,
            TokenKind::End,
            ErrorContext::Item,
            Parser::parse_program,
        );
        self.expect(&mut ch, Field::Token, TokenKind::End);
        Ok(self.alloc(NodeKind::Block, ch))
    }

    /// `if c then p [else p]`; the `else` is optional and binds to the
    /// nearest `if`. Both branches admit full programs, so nested
    /// `let ... in` needs no extra delimiters.
    fn parse_if_expr(&mut self) -> Result<NodeId> {
        let mut ch = Children::new();
        self.consume(&mut ch, Field::Token, TokenKind::If)?;
        let condition = self.parse_expr_bp(0)?;
        ch.push((Field::Condition, Child::Node(condition)));
        self.consume(&mut ch, Field::Token, TokenKind::Then)?;
        let then = self.parse_program()?;
        ch.push((Field::Then, Child::Node(then)));
        if self.at(TokenKind::Else) {
            self.advance_into(&mut ch, Field::Token);
            let alt = self.parse_program()?;
            ch.push((Field::Else, Child::Node(alt)));
        }
        Ok(self.alloc(NodeKind::If, ch))
    }

    /// `match e with [|] pat -> p (| pat -> p)*`.
    fn parse_match_expr(&mut self) -> Result<NodeId> {
        let mut ch = Children::new();
        self.consume(&mut ch, Field::Token, TokenKind::Match)?;
        let subject = self.parse_expr_bp(0)?;
        ch.push((Field::Subject, Child::Node(subject)));
        self.consume(&mut ch, Field::Token, TokenKind::With)?;
        self.take(&mut ch, Field::Token, TokenKind::Pipe);

        // A clause is coming if a pattern starts here; a bare `->` is a
        // clause with a broken pattern, which the loop recovers from. A
        // match with zero clauses is grammatical but almost certainly
        // unintended, so it gets a warning.
        if !Self::starts_pattern(self.peek()) && !self.at(TokenKind::Arrow) {
            let span = self.peek_span();
            self.errors
                .push(Diagnostic::warning(span, SyntaxError::EmptyMatch));
            return Ok(self.alloc(NodeKind::Match, ch));
        }
        loop {
            let start = self.cursor;
            match self.parse_match_clause() {
                Ok(clause) => ch.push((Field::Alt, Child::Node(clause))),
                Err(()) => {
                    self.sync_to(&[TokenKind::Pipe]);
                    let error = self.wrap_error(start, ErrorContext::MatchClause);
                    ch.push((Field::Alt, Child::Node(error)));
                }
            }
            if !self.take(&mut ch, Field::Token, TokenKind::Pipe) {
                break;
            }
        }
        Ok(self.alloc(NodeKind::Match, ch))
    }

    fn parse_match_clause(&mut self) -> Result<NodeId> {
        let mut ch = Children::new();
        let pattern = self.parse_pattern()?;
        ch.push((Field::Pattern, Child::Node(pattern)));
        self.consume(&mut ch, Field::Token, TokenKind::Arrow)?;
        let body = self.parse_program()?;
        ch.push((Field::Body, Child::Node(body)));
        Ok(self.alloc(NodeKind::MatchClause, ch))
    }

    /// `fun p+ -> program`.
    fn parse_lambda(&mut self) -> Result<NodeId> {
        let mut ch = Children::new();
        self.consume(&mut ch, Field::Token, TokenKind::Fun)?;
        let first = self.parse_param_pattern()?;
        ch.push((Field::Arg, Child::Node(first)));
        while Self::starts_param(self.peek()) {
            let arg = self.parse_param_pattern()?;
            ch.push((Field::Arg, Child::Node(arg)));
        }
        self.consume(&mut ch, Field::Token, TokenKind::Arrow)?;
        let body = self.parse_program()?;
        ch.push((Field::Body, Child::Node(body)));
        Ok(self.alloc(NodeKind::Lambda, ch))
    }
}

// Patterns. They mirror the expression precedence discipline at the levels
// that apply: constructor application (10, tightest), cons (9, right),
// tuple sequencing (8, loosest).
impl Parser<'_> {
    fn parse_pattern(&mut self) -> Result<NodeId> {
        self.parse_pattern_bp(0)
    }

    const CONS_PAT_BP: (u8, u8) = (19, 18);
    const TUPLE_PAT_BP: (u8, u8) = (17, 16);

    fn parse_pattern_bp(&mut self, min_bp: u8) -> Result<NodeId> {
        let mut lhs = self.parse_pattern_nud()?;

        loop {
            match self.peek() {
                TokenKind::ColonColon => {
                    if Self::CONS_PAT_BP.0 < min_bp {
                        break;
                    }
                    let mut ch = vec![(Field::Left, Child::Node(lhs))];
                    self.advance_into(&mut ch, Field::Op);
                    let rhs = self.parse_pattern_bp(Self::CONS_PAT_BP.1)?;
                    ch.push((Field::Right, Child::Node(rhs)));
                    lhs = self.alloc(NodeKind::ConsPattern, ch);
                }
                TokenKind::Comma => {
                    if Self::TUPLE_PAT_BP.0 < min_bp {
                        break;
                    }
                    let mut ch = vec![(Field::Item, Child::Node(lhs))];
                    while self.at(TokenKind::Comma) {
                        self.advance_into(&mut ch, Field::Token);
                        let item = self.parse_pattern_bp(Self::TUPLE_PAT_BP.0 + 1)?;
                        ch.push((Field::Item, Child::Node(item)));
                    }
                    lhs = self.alloc(NodeKind::TuplePattern, ch);
                }
                _ => break,
            }
        }

        Ok(lhs)
    }

    fn starts_pattern(kind: TokenKind) -> bool {
        use TokenKind::*;
        matches!(
            kind,
            Name | Underscore
                | NameCapital
                | Int
                | Nat
                | Tez
                | Bytes
                | String
                | True
                | False
                | Minus
                | LParen
                | LBracket
        )
    }

    /// Parameter patterns of `fun` and function declarations: a variable,
    /// a wildcard, or a parenthesized (possibly annotated) pattern.
    fn starts_param(kind: TokenKind) -> bool {
        matches!(
            kind,
            TokenKind::Name | TokenKind::Underscore | TokenKind::LParen
        )
    }

    fn parse_param_pattern(&mut self) -> Result<NodeId> {
        if Self::starts_param(self.peek()) {
            self.parse_pattern_nud()
        } else {
            let span = self.peek_span();
            self.error_at(span, SyntaxError::UnexpectedInPattern);
            Err(())
        }
    }

    fn parse_pattern_nud(&mut self) -> Result<NodeId> {
        use TokenKind::*;
        match self.peek() {
            Name => {
                let mut ch = Children::new();
                self.advance_into(&mut ch, Field::Var);
                Ok(self.alloc(NodeKind::VarPattern, ch))
            }
            Underscore => Ok(self.leaf(NodeKind::WildcardPattern)),
            Int | Nat | Tez | Bytes | String | True | False => {
                Ok(self.leaf(NodeKind::LiteralPattern))
            }
            Minus if self.at_negative_int() => {
                let mut ch = Children::new();
                self.advance_into(&mut ch, Field::Token);
                self.advance_into(&mut ch, Field::Token);
                Ok(self.alloc(NodeKind::LiteralPattern, ch))
            }
            NameCapital => {
                let mut ch = Children::new();
                self.advance_into(&mut ch, Field::Ctor);
                if Self::starts_pattern(self.peek()) {
                    let arg = self.parse_pattern_nud()?;
                    ch.push((Field::Arg, Child::Node(arg)));
                }
                Ok(self.alloc(NodeKind::ConPattern, ch))
            }
            LBracket => {
                let mut ch = Children::new();
                self.consume(&mut ch, Field::Token, LBracket)?;
                self.parse_list(
                    &mut ch,
                    Field::Item,
                    Semicolon,
                    RBracket,
                    ErrorContext::Pattern,
                    Parser::parse_pattern,
                );
                self.expect(&mut ch, Field::Token, RBracket);
                Ok(self.alloc(NodeKind::ListPattern, ch))
            }
            LParen => {
                let mut ch = Children::new();
                if self.peek_nth(1) == RParen {
                    // The unit value also works as a pattern.
                    self.advance_into(&mut ch, Field::Token);
                    self.advance_into(&mut ch, Field::Token);
                    return Ok(self.alloc(NodeKind::LiteralPattern, ch));
                }
                self.consume(&mut ch, Field::Token, LParen)?;
                let pattern = self.parse_pattern()?;
                ch.push((Field::Pattern, Child::Node(pattern)));
                let kind = if self.take(&mut ch, Field::Token, Colon) {
                    let ty = self.parse_type()?;
                    ch.push((Field::Type, Child::Node(ty)));
                    NodeKind::AnnotPattern
                } else {
                    NodeKind::ParenPattern
                };
                self.expect(&mut ch, Field::Token, RParen);
                Ok(self.alloc(kind, ch))
            }
            _ => {
                let span = self.peek_span();
                self.error_at(span, SyntaxError::UnexpectedInPattern);
                Err(())
            }
        }
    }
}

// Type expressions: application `a t` binds tightest, then product `*`,
// then the right-associative function arrow.
impl Parser<'_> {
    fn parse_type(&mut self) -> Result<NodeId> {
        let domain = self.parse_type_product()?;
        if !self.at(TokenKind::Arrow) {
            return Ok(domain);
        }
        let mut ch = vec![(Field::Domain, Child::Node(domain))];
        self.advance_into(&mut ch, Field::Token);
        let codomain = self.parse_type()?;
        ch.push((Field::Codomain, Child::Node(codomain)));
        Ok(self.alloc(NodeKind::TypeFun, ch))
    }

    fn parse_type_product(&mut self) -> Result<NodeId> {
        let first = self.parse_type_app()?;
        if !self.at(TokenKind::Star) {
            return Ok(first);
        }
        let mut ch = vec![(Field::X, Child::Node(first))];
        while self.at(TokenKind::Star) {
            self.advance_into(&mut ch, Field::Token);
            let next = self.parse_type_app()?;
            ch.push((Field::X, Child::Node(next)));
        }
        Ok(self.alloc(NodeKind::TypeProduct, ch))
    }

    /// Type application is postfix: the argument(s) come first and the
    /// constructor name follows, as in `int list` or `(a, b) map`.
    fn parse_type_app(&mut self) -> Result<NodeId> {
        let mut lhs = self.parse_type_atom()?;
        while self.at(TokenKind::Name) {
            let mut ch = vec![(Field::X, Child::Node(lhs))];
            let con = self.parse_type_con()?;
            ch.push((Field::F, Child::Node(con)));
            lhs = self.alloc(NodeKind::TypeApp, ch);
        }
        Ok(lhs)
    }

    fn parse_type_atom(&mut self) -> Result<NodeId> {
        match self.peek() {
            TokenKind::Name => self.parse_type_con(),
            // Michelson annotations appear as string literals in type
            // argument position.
            TokenKind::String => Ok(self.leaf(NodeKind::Literal)),
            TokenKind::LParen => {
                let mut ch = Children::new();
                self.consume(&mut ch, Field::Token, TokenKind::LParen)?;
                loop {
                    let item = self.parse_type()?;
                    ch.push((Field::X, Child::Node(item)));
                    if !self.take(&mut ch, Field::Token, TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(&mut ch, Field::Token, TokenKind::RParen);
                Ok(self.alloc(NodeKind::TypeTuple, ch))
            }
            _ => {
                let span = self.peek_span();
                self.error_at(span, SyntaxError::UnexpectedInType);
                Err(())
            }
        }
    }

    fn parse_type_con(&mut self) -> Result<NodeId> {
        let mut ch = Children::new();
        self.consume(&mut ch, Field::Token, TokenKind::Name)?;
        Ok(self.alloc(NodeKind::TypeCon, ch))
    }

    /// `[|] Ctor [of T] (| Ctor [of T])*`.
    fn parse_type_sum(&mut self) -> Result<NodeId> {
        let mut ch = Children::new();
        self.take(&mut ch, Field::Token, TokenKind::Pipe);
        loop {
            let variant = self.parse_variant()?;
            ch.push((Field::Variant, Child::Node(variant)));
            if !self.take(&mut ch, Field::Token, TokenKind::Pipe) {
                break;
            }
        }
        Ok(self.alloc(NodeKind::TypeSum, ch))
    }

    fn parse_variant(&mut self) -> Result<NodeId> {
        let mut ch = Children::new();
        self.consume(&mut ch, Field::Constructor, TokenKind::NameCapital)?;
        if self.take(&mut ch, Field::Token, TokenKind::Of) {
            let ty = self.parse_type()?;
            ch.push((Field::Type, Child::Node(ty)));
        }
        Ok(self.alloc(NodeKind::Variant, ch))
    }

    /// `{ field : T; ...; }`, trailing separator optional.
    fn parse_type_record(&mut self) -> Result<NodeId> {
        let mut ch = Children::new();
        self.consume(&mut ch, Field::Token, TokenKind::LBrace)?;
        self.parse_list(
            &mut ch,
            Field::Field,
            TokenKind::Semicolon,
            TokenKind::RBrace,
            ErrorContext::RecordField,
            Parser::parse_type_rec_field,
        );
        self.expect(&mut ch, Field::Token, TokenKind::RBrace);
        Ok(self.alloc(NodeKind::TypeRecord, ch))
    }

    fn parse_type_rec_field(&mut self) -> Result<NodeId> {
        let mut ch = Children::new();
        self.consume(&mut ch, Field::Field, TokenKind::Name)?;
        self.consume(&mut ch, Field::Token, TokenKind::Colon)?;
        let ty = self.parse_type()?;
        ch.push((Field::Type, Child::Node(ty)));
        Ok(self.alloc(NodeKind::TypeRecordField, ch))
    }
}

// Cursor machinery and error recovery.
impl Parser<'_> {
    fn new<'t>(tree: &'t mut Tree) -> Parser<'t> {
        Parser {
            tree,
            cursor: 0,
            errors: Vec::with_capacity(8),
            state: State::Parsing,
        }
    }

    /// Root wrapper for the single-production entry points. Anything left
    /// over after the production (including the `Eof` token) is appended
    /// raw so the tree stays lossless.
    fn parse_root(
        &mut self,
        field: Field,
        context: ErrorContext,
        f: impl FnOnce(&mut Self) -> Result<NodeId>,
    ) -> NodeId {
        let mut ch = Children::new();
        let start = self.cursor;
        match f(self) {
            Ok(node) => ch.push((field, Child::Node(node))),
            Err(()) => {
                self.sync_to(&[]);
                let error = self.wrap_error(start, context);
                ch.push((field, Child::Node(error)));
            }
        }
        while !self.at(TokenKind::Eof) {
            self.advance_into(&mut ch, Field::Token);
        }
        self.advance_into(&mut ch, Field::Token); // Eof
        self.state = State::Done;
        self.alloc(NodeKind::Contract, ch)
    }

    /// Parses `item (sep item)* [sep]` until the end delimiter, which is
    /// not consumed. Malformed items are wrapped in error nodes and
    /// parsing resumes at the separator or the delimiter.
    fn parse_list(
        &mut self,
        ch: &mut Children,
        field: Field,
        separator: TokenKind,
        end_delim: TokenKind,
        context: ErrorContext,
        parse_item: impl Fn(&mut Self) -> Result<NodeId>,
    ) {
        debug_assert_ne!(separator, end_delim);
        while !self.at(end_delim) && !self.at(TokenKind::Eof) {
            let start = self.cursor;
            match parse_item(self) {
                Ok(item) => ch.push((field, Child::Node(item))),
                Err(()) => {
                    self.sync_to(&[separator, end_delim]);
                    let error = self.wrap_error(start, context);
                    ch.push((field, Child::Node(error)));
                }
            }
            if !self.take(ch, Field::Token, separator) {
                break;
            }
        }
    }

    /// Skips forward to the next synchronization token: a top-level
    /// declaration keyword, end of input, or one of the extra tokens the
    /// enclosing construct supplied (its separator or closing delimiter).
    fn sync_to(&mut self, extra: &[TokenKind]) {
        self.state = State::Recovering;
        let from = self.peek_span();
        loop {
            let kind = self.peek();
            if kind == TokenKind::Eof || extra.contains(&kind) || DECL_START.contains(&kind) {
                break;
            }
            self.cursor += 1;
        }
        log::trace!(
            "recovered from parse error at {from}, resuming at {}",
            self.peek_span()
        );
        self.state = State::Parsing;
    }

    /// Wraps every token consumed or skipped since `start` in an error
    /// node. Nodes the failed production built from those tokens are
    /// abandoned in the arena and stay unreachable, so each token still
    /// appears exactly once in the tree.
    fn wrap_error(&mut self, start: usize, context: ErrorContext) -> NodeId {
        let ch: Children = (start..self.cursor)
            .map(|i| (Field::Token, Child::Token(self.tree.token_id(i))))
            .collect();
        self.alloc(NodeKind::Error(context), ch)
    }

    fn alloc(&mut self, kind: NodeKind, children: Children) -> NodeId {
        self.tree.alloc(kind, children)
    }

    /// Consumes the current token into a fresh single-token node.
    fn leaf(&mut self, kind: NodeKind) -> NodeId {
        let mut ch = Children::new();
        self.advance_into(&mut ch, Field::Token);
        self.alloc(kind, ch)
    }

    fn error_at(&mut self, span: Span, error: SyntaxError) {
        self.errors.push(Diagnostic::error(span, error));
    }

    fn kind_at(&self, index: usize) -> TokenKind {
        if index < self.tree.token_count() {
            self.tree.token(self.tree.token_id(index)).kind
        } else {
            TokenKind::Eof
        }
    }

    fn peek(&self) -> TokenKind {
        self.kind_at(self.cursor)
    }

    fn peek_nth(&self, n: usize) -> TokenKind {
        self.kind_at(self.cursor + n)
    }

    fn peek_span(&self) -> Span {
        if self.cursor < self.tree.token_count() {
            self.tree.token(self.tree.token_id(self.cursor)).span
        } else {
            Span::new_of_length(self.tree.text().len(), 0)
        }
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek() == kind
    }

    /// A `-` whose digits follow with nothing in between is the sign of an
    /// integer literal, not a unary operator: `-3` is one literal, `- 3`
    /// (and `a - 3`) is negation.
    fn at_negative_int(&self) -> bool {
        if self.peek() != TokenKind::Minus || self.peek_nth(1) != TokenKind::Int {
            return false;
        }
        let minus = self.tree.token(self.tree.token_id(self.cursor));
        let int = self.tree.token(self.tree.token_id(self.cursor + 1));
        minus.span.hi() == int.span.lo
    }

    /// Pushes the current token as a child and advances.
    fn advance_into(&mut self, ch: &mut Children, field: Field) {
        debug_assert!(self.cursor < self.tree.token_count());
        ch.push((field, Child::Token(self.tree.token_id(self.cursor))));
        self.cursor += 1;
    }

    /// Consumes the current token if it matches, returning whether it did.
    fn take(&mut self, ch: &mut Children, field: Field, expect: TokenKind) -> bool {
        if self.at(expect) {
            self.advance_into(ch, field);
            true
        } else {
            false
        }
    }

    /// Consumes the current token if it matches; records an error and
    /// fails the production otherwise.
    fn consume(&mut self, ch: &mut Children, field: Field, expect: TokenKind) -> Result<()> {
        if self.take(ch, field, expect) {
            Ok(())
        } else {
            let span = self.peek_span();
            self.error_at(
                span,
                SyntaxError::Unexpected {
                    actual: self.peek(),
                    expected: expect,
                },
            );
            Err(())
        }
    }

    /// Like [`consume`](Self::consume), but recovery-friendly: records the
    /// error and lets the caller keep building its node. Used for closing
    /// delimiters, where the partial node is still worth returning.
    fn expect(&mut self, ch: &mut Children, field: Field, expect: TokenKind) {
        if !self.take(ch, field, expect) {
            let span = self.peek_span();
            self.error_at(
                span,
                SyntaxError::Unexpected {
                    actual: self.peek(),
                    expected: expect,
                },
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::test_utils::tree_tests;

    #[test]
    fn parse_is_lossless_on_messy_input() {
        let src = "(* header (* nested *) *)\nlet x = 1 // trailing\n\n#include \"a.mligo\"\n\
                   type t = { a : int }\nlet main (p : int) = p + x\n";
        let parse = parse(src, "main.mligo");
        assert!(parse.ok(), "unexpected: {:?}", parse.diagnostics);
        assert_eq!(parse.tree.source(), src);
    }

    #[test]
    fn parse_bytes_rejects_invalid_utf8() {
        let err = parse_bytes(&[0x6c, 0x65, 0x74, 0xff, 0xfe], "bad.mligo");
        assert!(err.is_err());
    }

    #[test]
    fn every_input_yields_a_tree() {
        for src in ["", ")", "let", "let ;;;; =", "}{", "(* open", "\"oops"] {
            let parse = parse(src, "fuzz.mligo");
            assert_eq!(parse.tree.source(), src, "lossless on {src:?}");
        }
    }

    #[test]
    fn empty_match_is_a_warning_not_an_error() {
        let parse = parse_expr("match x with", "m.mligo");
        assert_eq!(parse.diagnostics.len(), 1);
        assert_eq!(parse.diagnostics[0].severity, diag::Severity::Warning);
        assert_eq!(parse.diagnostics[0].message, "match must have at least one clause");
        assert!(parse.ok());
    }

    #[test]
    fn render_uses_file_and_line_col() {
        let parse = parse("let x =\nlet y = 1 in", "inc.mligo");
        let rendered = parse.render_diagnostics();
        assert_eq!(rendered.len(), 1);
        assert!(rendered[0].starts_with("inc.mligo:2:"), "{rendered:?}");
    }

    tree_tests!(
        fn test_precedence_mul_plus() {
            let expr = "a + b * c";
            let tree_ok = "
                binary_op (0..9)
                  left: name a (0..1)
                  op: + (2..3)
                  right: binary_op (4..9)
                    left: name b (4..5)
                    op: * (6..7)
                    right: name c (8..9)
            ";
        }

        fn test_cons_right_assoc() {
            let expr = "a :: b :: c";
            let tree_ok = "
                binary_op (0..11)
                  left: name a (0..1)
                  op: :: (2..4)
                  right: binary_op (5..11)
                    left: name b (5..6)
                    op: :: (7..9)
                    right: name c (10..11)
            ";
        }

        fn test_application_binds_tighter_than_infix() {
            let expr = "f a + b";
            let tree_ok = "
                binary_op (0..7)
                  left: fun_app (0..3)
                    f: name f (0..1)
                    x: name a (2..3)
                  op: + (4..5)
                  right: name b (6..7)
            ";
        }

        fn test_application_left_assoc() {
            let expr = "f a b";
            let tree_ok = "
                fun_app (0..5)
                  f: fun_app (0..3)
                    f: name f (0..1)
                    x: name a (2..3)
                  x: name b (4..5)
            ";
        }

        fn test_parens_override_precedence() {
            let expr = "(a + b) * c";
            let tree_ok = "
                binary_op (0..11)
                  left: paren (0..7)
                    expr: binary_op (1..6)
                      left: name a (1..2)
                      op: + (3..4)
                      right: name b (5..6)
                  op: * (8..9)
                  right: name c (10..11)
            ";
        }

        fn test_unary_negation() {
            let expr = "- f x * y";
            let tree_ok = "
                binary_op (0..9)
                  left: unary_op (0..5)
                    op: - (0..1)
                    arg: fun_app (2..5)
                      f: name f (2..3)
                      x: name x (4..5)
                  op: * (6..7)
                  right: name y (8..9)
            ";
        }

        fn test_negative_int_literal() {
            let expr = "-3 + -1";
            let tree_ok = "
                binary_op (0..7)
                  left: literal -3 (0..2)
                  op: + (3..4)
                  right: literal -1 (5..7)
            ";
        }

        fn test_spaced_minus_stays_negation() {
            let expr = "- 3";
            let tree_ok = "
                unary_op (0..3)
                  op: - (0..1)
                  arg: literal 3 (2..3)
            ";
        }

        fn test_minus_after_operand_is_subtraction() {
            let expr = "a -3";
            let tree_ok = "
                binary_op (0..4)
                  left: name a (0..1)
                  op: - (2..3)
                  right: literal 3 (3..4)
            ";
        }

        fn test_constructor_application() {
            let expr = "Some 5";
            let tree_ok = "
                fun_app (0..6)
                  f: name_capital Some (0..4)
                  x: literal 5 (5..6)
            ";
        }

        fn test_projection_chain() {
            let expr = "p.0 + r.x";
            let tree_ok = "
                binary_op (0..9)
                  left: projection (0..3)
                    box: name p (0..1)
                    field: literal 0 (2..3)
                  op: + (4..5)
                  right: projection (6..9)
                    box: name r (6..7)
                    field: name x (8..9)
            ";
        }

        fn test_tuple_is_loosest() {
            let expr = "a, b + c, d";
            let tree_ok = "
                tuple (0..11)
                  item: name a (0..1)
                  item: binary_op (3..8)
                    left: name b (3..4)
                    op: + (5..6)
                    right: name c (7..8)
                  item: name d (10..11)
            ";
        }

        fn test_unit_application() {
            let expr = "f ()";
            let tree_ok = "
                fun_app (0..4)
                  f: name f (0..1)
                  x: unit (2..4)
            ";
        }

        fn test_annotated_expr() {
            let expr = "(x : int)";
            let tree_ok = "
                annot (0..9)
                  expr: name x (1..2)
                  type: type_con int (5..8)
            ";
        }

        fn test_list_expr() {
            let expr = "[1; 2]";
            let tree_ok = "
                list (0..6)
                  item: literal 1 (1..2)
                  item: literal 2 (4..5)
            ";
        }

        fn test_block_expr() {
            let expr = "begin a; b end";
            let tree_ok = "
                block (0..14)
                  item: name a (6..7)
                  item: name b (9..10)
            ";
        }

        fn test_record_literal() {
            let expr = "{ a = 1 }";
            let tree_ok = "
                record_literal (0..9)
                  field: record_assignment (2..7)
                    field: name a (2..3)
                    value: literal 1 (6..7)
            ";
        }

        fn test_record_update() {
            let expr = "{ x with a = 1 }";
            let tree_ok = "
                record_update (0..16)
                  subject: name x (2..3)
                  field: record_assignment (9..14)
                    field: name a (9..10)
                    value: literal 1 (13..14)
            ";
        }

        fn test_nat_and_tez_literals() {
            let expr = "amount + 100mutez";
            let tree_ok = "
                binary_op (0..17)
                  left: name amount (0..6)
                  op: + (7..8)
                  right: literal 100mutez (9..17)
            ";
        }

        fn test_if_with_nested_let_in() {
            let expr = "if c then let x = 1 in x else y";
            let tree_ok = "
                if (0..31)
                  condition: name c (3..4)
                  then: let_expr (10..24)
                    decl: let_decl (10..19)
                      name: var_pattern x (14..15)
                      body: literal 1 (18..19)
                    body: name x (23..24)
                  else: name y (30..31)
            ";
        }

        fn test_lambda() {
            let expr = "fun x -> x + 1";
            let tree_ok = "
                lambda (0..14)
                  arg: var_pattern x (4..5)
                  body: binary_op (9..14)
                    left: name x (9..10)
                    op: + (11..12)
                    right: literal 1 (13..14)
            ";
        }

        fn test_match_with_cons_pattern() {
            let expr = "match l with | [] -> 0 | x :: xs -> x";
            let tree_ok = "
                match (0..37)
                  subject: name l (6..7)
                  alt: match_clause (15..22)
                    pattern: list_pattern (15..17)
                    body: literal 0 (21..22)
                  alt: match_clause (25..37)
                    pattern: cons_pattern (25..32)
                      left: var_pattern x (25..26)
                      op: :: (27..29)
                      right: var_pattern xs (30..32)
                    body: name x (36..37)
            ";
        }

        fn test_pattern_tuple_and_con() {
            let pattern = "Some x, _, [a; b]";
            let tree_ok = "
                tuple_pattern (0..17)
                  item: con_pattern (0..6)
                    ctor: Some (0..4)
                    arg: var_pattern x (5..6)
                  item: wildcard_pattern _ (8..9)
                  item: list_pattern (11..17)
                    item: var_pattern a (12..13)
                    item: var_pattern b (15..16)
            ";
        }

        fn test_pattern_negative_literal() {
            let pattern = "-1 :: rest";
            let tree_ok = "
                cons_pattern (0..10)
                  left: literal_pattern -1 (0..2)
                  op: :: (3..5)
                  right: var_pattern rest (6..10)
            ";
        }

        fn test_pattern_annotated() {
            let pattern = "(p : int)";
            let tree_ok = "
                annot_pattern (0..9)
                  pattern: var_pattern p (1..2)
                  type: type_con int (5..8)
            ";
        }

        fn test_type_fun_right_assoc() {
            let ty = "int -> string -> bool";
            let tree_ok = "
                type_fun (0..21)
                  domain: type_con int (0..3)
                  codomain: type_fun (7..21)
                    domain: type_con string (7..13)
                    codomain: type_con bool (17..21)
            ";
        }

        fn test_type_two_argument_application() {
            let ty = "(a, b) t";
            let tree_ok = "
                type_app (0..8)
                  x: type_tuple (0..6)
                    x: type_con a (1..2)
                    x: type_con b (4..5)
                  f: type_con t (7..8)
            ";
        }

        fn test_type_product_above_arrow_below_app() {
            let ty = "int list * string -> bool";
            let tree_ok = "
                type_fun (0..25)
                  domain: type_product (0..17)
                    x: type_app (0..8)
                      x: type_con int (0..3)
                      f: type_con list (4..8)
                    x: type_con string (11..17)
                  codomain: type_con bool (21..25)
            ";
        }

        fn test_program_fun_decl_with_attribute() {
            let program = "let add (a : int) (b : int) : int = a + b [@@inline]";
            let tree_ok = "
                contract (0..52)
                  declaration: fun_decl (0..52)
                    name: add (4..7)
                    arg: annot_pattern (8..17)
                      pattern: var_pattern a (9..10)
                      type: type_con int (13..16)
                    arg: annot_pattern (18..27)
                      pattern: var_pattern b (19..20)
                      type: type_con int (23..26)
                    type: type_con int (30..33)
                    body: binary_op (36..41)
                      left: name a (36..37)
                      op: + (38..39)
                      right: name b (40..41)
                    attribute: attribute [@@inline] (42..52)
            ";
        }

        fn test_program_let_rec() {
            let program = "let rec go (n : int) = go n";
            let tree_ok = "
                contract (0..27)
                  declaration: fun_decl (0..27)
                    recursive: rec (4..7)
                    name: go (8..10)
                    arg: annot_pattern (11..20)
                      pattern: var_pattern n (12..13)
                      type: type_con int (16..19)
                    body: fun_app (23..27)
                      f: name go (23..25)
                      x: name n (26..27)
            ";
        }

        fn test_program_let_tuple_binding() {
            let program = "let (a, b) = p";
            let tree_ok = "
                contract (0..14)
                  declaration: let_decl (0..14)
                    name: paren_pattern (4..10)
                      pattern: tuple_pattern (5..9)
                        item: var_pattern a (5..6)
                        item: var_pattern b (8..9)
                    body: name p (13..14)
            ";
        }

        fn test_program_include() {
            let program = "#include \"lib.mligo\"";
            let tree_ok = "
                contract (0..20)
                  declaration: include (0..20)
                    filename: \"lib.mligo\" (9..20)
            ";
        }

        fn test_program_type_sum() {
            let program = "type t = | A | B of int * string";
            let tree_ok = "
                contract (0..32)
                  declaration: type_decl (0..32)
                    name: type_con t (5..6)
                    type: type_sum (9..32)
                      variant: variant (11..12)
                        constructor: A (11..12)
                      variant: variant (15..32)
                        constructor: B (15..16)
                        type: type_product (20..32)
                          x: type_con int (20..23)
                          x: type_con string (26..32)
            ";
        }

        fn test_program_type_record_trailing_separator() {
            let program = "type r = { a : int; b : string; }";
            let tree_ok = "
                contract (0..33)
                  declaration: type_decl (0..33)
                    name: type_con r (5..6)
                    type: type_record (9..33)
                      field: type_record_field (11..18)
                        field: a (11..12)
                        type: type_con int (15..18)
                      field: type_record_field (20..30)
                        field: b (20..21)
                        type: type_con string (24..30)
            ";
        }

        fn test_error_unexpected_token_in_expr() {
            let expr = "1 + ;";
            let tree_error = "
                error (0..5)
            ";
            let expected_errors = &["4..5: unexpected token in expression"];
        }

        fn test_error_empty_record() {
            let expr = "{}";
            let expected_errors = &["1..2: record must have at least one field"];
        }

        fn test_error_unmatched_paren_open() {
            let expr = "(1 + 2";
            let expected_errors = &["6..6: expected token RParen, but got Eof"];
        }

        fn test_recovery_missing_let_body_keeps_sibling() {
            let program = "let x =\nlet y = 1 in\nlet z = 2";
            let tree_error = "
                contract (0..30)
                  declaration: error (0..20)
                  declaration: let_decl (21..30)
                    name: var_pattern z (25..26)
                    body: literal 2 (29..30)
            ";
            let expected_errors = &["30..30: expected token In, but got Eof"];
        }

        fn test_recovery_in_list_items() {
            let expr = "[1; +; 3]";
            let tree_error = "
                list (0..9)
                  item: literal 1 (1..2)
                  item: error (4..5)
                  item: literal 3 (7..8)
            ";
            let expected_errors = &["4..5: unexpected token in expression"];
        }

        fn test_recovery_in_match_clauses() {
            let expr = "match x with | -> 1 | y -> y";
            let tree_error = "
                match (0..28)
                  subject: name x (6..7)
                  alt: error (15..19)
                  alt: match_clause (22..28)
                    pattern: var_pattern y (22..23)
                    body: name y (27..28)
            ";
            let expected_errors = &["15..17: unexpected token in pattern"];
        }

        fn test_error_garbage_between_declarations() {
            let program = "let a = 1\n)\nlet b = 2";
            let tree_error = "
                contract (0..21)
                  declaration: let_decl (0..9)
                    name: var_pattern a (4..5)
                    body: literal 1 (8..9)
                  declaration: error (10..11)
                  declaration: let_decl (12..21)
                    name: var_pattern b (16..17)
                    body: literal 2 (20..21)
            ";
            let expected_errors = &["10..11: unexpected token at top level"];
        }
    );
}
