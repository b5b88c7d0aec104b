//! The lossless concrete syntax tree.
//!
//! Nodes live in a flat arena owned by [`Tree`] and reference their children
//! by index, so large trees stay cheap to build and traverse. Every token of
//! the input (with its surrounding trivia) appears in exactly one leaf, in
//! source order: concatenating the tokens found by a pre-order traversal
//! reproduces the original text byte for byte.

use std::fmt;

use crate::token::{Span, Token as RawToken, TokenKind};

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct NodeId(u32);

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct TokenId(u32);

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Child {
    Node(NodeId),
    Token(TokenId),
}

/// One production of the grammar. Each tree node carries exactly one kind
/// tag; the per-kind field schema is fixed by the parser.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum NodeKind {
    Contract,
    LetDecl,
    FunDecl,
    TypeDecl,
    Include,
    Attribute,

    LetExpr,
    Lambda,
    If,
    Match,
    MatchClause,
    List,
    Tuple,
    Annot,
    Paren,
    BinaryOp,
    UnaryOp,
    FunApp,
    Projection,
    RecordLiteral,
    RecordUpdate,
    RecordAssignment,
    Block,
    Name,
    NameCapital,
    Literal,
    Unit,

    VarPattern,
    ConPattern,
    ListPattern,
    ConsPattern,
    TuplePattern,
    ParenPattern,
    AnnotPattern,
    WildcardPattern,
    LiteralPattern,

    TypeCon,
    TypeApp,
    TypeTuple,
    TypeProduct,
    TypeFun,
    TypeSum,
    Variant,
    TypeRecord,
    TypeRecordField,

    /// Wraps tokens that could not be assigned to any production. Carries
    /// the production that was being attempted when recovery kicked in.
    Error(ErrorContext),
}

/// What the parser was trying to build when it gave up and wrapped the
/// offending tokens in an [`NodeKind::Error`] node.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ErrorContext {
    Declaration,
    Expr,
    Pattern,
    Type,
    MatchClause,
    RecordField,
    Item,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use NodeKind::*;
        let name = match self {
            Contract => "contract",
            LetDecl => "let_decl",
            FunDecl => "fun_decl",
            TypeDecl => "type_decl",
            Include => "include",
            Attribute => "attribute",
            LetExpr => "let_expr",
            Lambda => "lambda",
            If => "if",
            Match => "match",
            MatchClause => "match_clause",
            List => "list",
            Tuple => "tuple",
            Annot => "annot",
            Paren => "paren",
            BinaryOp => "binary_op",
            UnaryOp => "unary_op",
            FunApp => "fun_app",
            Projection => "projection",
            RecordLiteral => "record_literal",
            RecordUpdate => "record_update",
            RecordAssignment => "record_assignment",
            Block => "block",
            Name => "name",
            NameCapital => "name_capital",
            Literal => "literal",
            Unit => "unit",
            VarPattern => "var_pattern",
            ConPattern => "con_pattern",
            ListPattern => "list_pattern",
            ConsPattern => "cons_pattern",
            TuplePattern => "tuple_pattern",
            ParenPattern => "paren_pattern",
            AnnotPattern => "annot_pattern",
            WildcardPattern => "wildcard_pattern",
            LiteralPattern => "literal_pattern",
            TypeCon => "type_con",
            TypeApp => "type_app",
            TypeTuple => "type_tuple",
            TypeProduct => "type_product",
            TypeFun => "type_fun",
            TypeSum => "type_sum",
            Variant => "variant",
            TypeRecord => "type_record",
            TypeRecordField => "type_record_field",
            Error(_) => "error",
        };
        f.write_str(name)
    }
}

/// Named edge from a node to one of its children. Several children of the
/// same node may share a field name (e.g. repeated `declaration` edges);
/// the order of the child list is the only ordering.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Field {
    Declaration,
    Name,
    Recursive,
    Arg,
    Type,
    Body,
    Attribute,
    Filename,
    Decl,
    Condition,
    Then,
    Else,
    Subject,
    Alt,
    Pattern,
    Item,
    Ctor,
    Var,
    Left,
    Op,
    Right,
    F,
    X,
    Box,
    Field,
    Value,
    Domain,
    Codomain,
    Constructor,
    Variant,
    Expr,
    /// Anonymous keyword or punctuation token kept for losslessness.
    Token,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // `self::` disambiguates the enum from its glob-imported `Field`
        // variant.
        use self::Field::*;
        let name = match self {
            Declaration => "declaration",
            Name => "name",
            Recursive => "recursive",
            Arg => "arg",
            Type => "type",
            Body => "body",
            Attribute => "attribute",
            Filename => "filename",
            Decl => "decl",
            Condition => "condition",
            Then => "then",
            Else => "else",
            Subject => "subject",
            Alt => "alt",
            Pattern => "pattern",
            Item => "item",
            Ctor => "ctor",
            Var => "var",
            Left => "left",
            Op => "op",
            Right => "right",
            F => "f",
            X => "x",
            Box => "box",
            Field => "field",
            Value => "value",
            Domain => "domain",
            Codomain => "codomain",
            Constructor => "constructor",
            Variant => "variant",
            Expr => "expr",
            Token => "token",
        };
        f.write_str(name)
    }
}

/// A comment or whitespace run attached to a neighboring token.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Trivia {
    pub kind: TokenKind,
    pub span: Span,
}

/// A grammatical token with its attached trivia.
///
/// Trivia directly following a token on the same line (no line break in the
/// trivia text) trails it; everything else leads the next token, and
/// end-of-file trivia leads `Eof`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub leading: Vec<Trivia>,
    pub trailing: Vec<Trivia>,
}

impl Token {
    /// Full extent including attached trivia.
    pub fn full_span(&self) -> Span {
        let lo = self
            .leading
            .first()
            .map_or(self.span.lo, |trivia| trivia.span.lo);
        let hi = self
            .trailing
            .last()
            .map_or(self.span.hi(), |trivia| trivia.span.hi());
        Span::new_of_bounds(lo..hi)
    }
}

/// Splits a raw lexer stream into grammatical tokens with attached trivia.
pub fn attach_trivia(src: &str, raw: &[RawToken]) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(raw.len());
    let mut pending: Vec<Trivia> = Vec::new();

    for token in raw {
        let span = token.span();
        if token.kind.is_trivia() {
            let trivia = Trivia {
                kind: token.kind,
                span,
            };
            let breaks_line = span.substr(src).contains('\n');
            match out.last_mut() {
                Some(last) if pending.is_empty() && !breaks_line => last.trailing.push(trivia),
                _ => pending.push(trivia),
            }
        } else {
            out.push(Token {
                kind: token.kind,
                span,
                leading: std::mem::take(&mut pending),
                trailing: Vec::new(),
            });
        }
    }

    debug_assert!(pending.is_empty(), "Eof must absorb final trivia");
    debug_assert!(out.last().is_some_and(|t| t.kind == TokenKind::Eof));
    out
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Node {
    kind: NodeKind,
    children: Vec<(Field, Child)>,
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn children(&self) -> impl Iterator<Item = (Field, Child)> + '_ {
        self.children.iter().copied()
    }

    pub fn children_by(&self, field: Field) -> impl Iterator<Item = Child> + '_ {
        self.children
            .iter()
            .filter(move |(f, _)| *f == field)
            .map(|(_, c)| *c)
    }

    pub fn child_by(&self, field: Field) -> Option<Child> {
        self.children_by(field).next()
    }
}

/// An immutable parse tree plus the source text it was built from.
///
/// The tree owns a copy of the text so that token slices stay available for
/// the tree's whole lifetime; no global state is involved and independent
/// trees may live on different threads.
pub struct Tree {
    text: String,
    nodes: Vec<Node>,
    tokens: Vec<Token>,
    root: NodeId,
}

impl Tree {
    pub(crate) fn new(text: String, tokens: Vec<Token>) -> Tree {
        Tree {
            text,
            nodes: Vec::with_capacity(tokens.len()),
            tokens,
            root: NodeId(0),
        }
    }

    pub(crate) fn alloc(&mut self, kind: NodeKind, children: Vec<(Field, Child)>) -> NodeId {
        let id = NodeId(u32::try_from(self.nodes.len()).expect("arena out of capacity"));
        self.nodes.push(Node { kind, children });
        id
    }

    pub(crate) fn set_root(&mut self, root: NodeId) {
        self.root = root;
    }

    pub(crate) fn token_count(&self) -> usize {
        self.tokens.len()
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    pub fn token(&self, id: TokenId) -> &Token {
        &self.tokens[id.0 as usize]
    }

    pub(crate) fn token_id(&self, index: usize) -> TokenId {
        debug_assert!(index < self.tokens.len());
        TokenId(u32::try_from(index).unwrap())
    }

    pub fn token_text(&self, id: TokenId) -> &str {
        self.token(id).span.substr(&self.text)
    }

    /// Extent of a node's own tokens, trivia excluded. The root of an empty
    /// input has no tokens besides `Eof`; its span is empty.
    pub fn span(&self, id: NodeId) -> Span {
        let mut span: Option<Span> = None;
        self.for_each_token(Child::Node(id), &mut |token| {
            if token.kind != TokenKind::Eof {
                let s = token.span;
                span = Some(span.map_or(s, |acc| acc.to(s)));
            }
        });
        span.unwrap_or_else(|| Span::new_of_length(0, 0))
    }

    /// Reconstructs the source text by pre-order traversal, emitting each
    /// token's leading trivia, text, and trailing trivia.
    pub fn source(&self) -> String {
        let mut buf = String::with_capacity(self.text.len());
        self.for_each_token(Child::Node(self.root), &mut |token| {
            for trivia in &token.leading {
                buf.push_str(trivia.span.substr(&self.text));
            }
            buf.push_str(token.span.substr(&self.text));
            for trivia in &token.trailing {
                buf.push_str(trivia.span.substr(&self.text));
            }
        });
        buf
    }

    fn for_each_token(&self, child: Child, f: &mut impl FnMut(&Token)) {
        match child {
            Child::Token(id) => f(self.token(id)),
            Child::Node(id) => {
                for (_, child) in self.node(id).children() {
                    self.for_each_token(child, f);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer;
    use pretty_assertions::assert_eq;

    fn attached(src: &str) -> Vec<Token> {
        attach_trivia(src, &lexer::lex_in_new(src))
    }

    #[test]
    fn display_names_are_snake_case() {
        assert_eq!(Field::Field.to_string(), "field");
        assert_eq!(Field::Codomain.to_string(), "codomain");
        assert_eq!(NodeKind::TypeRecordField.to_string(), "type_record_field");
        assert_eq!(NodeKind::Error(ErrorContext::Expr).to_string(), "error");
    }

    #[test]
    fn trailing_trivia_stays_on_its_line() {
        let src = "let x = 1 // one\nlet y = 2\n";
        let tokens = attached(src);
        // `1` carries the space and the comment as trailing trivia; the
        // line break leads the next `let`.
        assert_eq!(tokens[3].kind, TokenKind::Int);
        assert_eq!(tokens[3].trailing.len(), 2);
        assert_eq!(tokens[3].trailing[1].kind, TokenKind::LineComment);

        let second_let = &tokens[4];
        assert_eq!(second_let.kind, TokenKind::Let);
        assert_eq!(second_let.leading.len(), 1);
        assert_eq!(second_let.leading[0].span.substr(src), "\n");
    }

    #[test]
    fn whitespace_with_newline_leads_next_token() {
        let src = "a\n\nb";
        let tokens = attached(src);
        assert_eq!(tokens[0].trailing.len(), 0);
        assert_eq!(tokens[1].leading.len(), 1);
        assert_eq!(tokens[1].leading[0].span.substr(src), "\n\n");
    }

    #[test]
    fn eof_absorbs_final_trivia() {
        let src = "x (* tail *)\n";
        let tokens = attached(src);
        let eof = tokens.last().unwrap();
        assert_eq!(eof.kind, TokenKind::Eof);
        // The comment sits on the same line as `x`, so it trails `x`; the
        // final line break has nowhere to go but the Eof token.
        assert_eq!(tokens[0].trailing.len(), 2);
        assert_eq!(eof.leading.len(), 1);
    }

    #[test]
    fn attached_tokens_cover_input() {
        let src = "let f (x : int) = (* c *) x + 1 // t\nlet y = f 2n";
        let mut buf = String::new();
        for token in attached(src) {
            for trivia in &token.leading {
                buf.push_str(trivia.span.substr(src));
            }
            buf.push_str(token.span.substr(src));
            for trivia in &token.trailing {
                buf.push_str(trivia.span.substr(src));
            }
        }
        assert_eq!(buf, src);
    }
}
