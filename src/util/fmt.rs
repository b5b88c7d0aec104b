//! Plain-text printer for concrete syntax trees, used by tests and
//! debugging tools. One line per node, children indented, anonymous
//! keyword and punctuation tokens omitted.

use std::io::Write;

use crate::cst::{Child, Field, NodeId, NodeKind, Tree};

const INDENT_WIDTH: usize = 2;

fn sp(w: &mut impl Write, i: usize) -> std::io::Result<()> {
    write!(w, "{:width$}", "", width = i * INDENT_WIDTH)
}

pub fn print_tree_string(tree: &Tree) -> String {
    print_node_string(tree, tree.root())
}

pub fn print_node_string(tree: &Tree, id: NodeId) -> String {
    let mut buf = Vec::with_capacity(1024);
    print_node(&mut buf, tree, id).unwrap();
    String::from_utf8(buf).unwrap()
}

pub fn print_node(w: &mut impl Write, tree: &Tree, id: NodeId) -> std::io::Result<()> {
    print_node_at(w, tree, 0, None, id)
}

fn print_node_at(
    w: &mut impl Write,
    tree: &Tree,
    i: usize,
    field: Option<Field>,
    id: NodeId,
) -> std::io::Result<()> {
    sp(w, i)?;
    if let Some(field) = field {
        write!(w, "{field}: ")?;
    }
    let node = tree.node(id);
    let span = tree.span(id);
    if prints_own_text(node.kind()) {
        // Single-token kinds are one line; their token is the whole story.
        writeln!(w, "{} {} ({span})", node.kind(), span.substr(tree.text()))?;
        return Ok(());
    }
    writeln!(w, "{} ({span})", node.kind())?;
    for (field, child) in node.children() {
        if field == Field::Token {
            continue;
        }
        match child {
            Child::Node(child) => print_node_at(w, tree, i + 1, Some(field), child)?,
            Child::Token(token) => {
                sp(w, i + 1)?;
                writeln!(
                    w,
                    "{field}: {} ({})",
                    tree.token_text(token),
                    tree.token(token).span
                )?;
            }
        }
    }
    Ok(())
}

fn prints_own_text(kind: NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::Name
            | NodeKind::NameCapital
            | NodeKind::Literal
            | NodeKind::TypeCon
            | NodeKind::VarPattern
            | NodeKind::WildcardPattern
            | NodeKind::LiteralPattern
            | NodeKind::Attribute
    )
}
