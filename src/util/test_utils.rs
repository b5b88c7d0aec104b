use crate::{
    cst::{Child, Field},
    parser,
    util::fmt,
};

/// Each variant contains the input.
pub enum Test {
    Program(&'static str),
    Expr(&'static str),
    Pattern(&'static str),
    Type(&'static str),
}

pub enum Assertion {
    TreeOk(&'static str),
    TreeError(&'static str),
    ExpectedErrors(&'static [&'static str]),
}

#[track_caller]
pub fn run_pipeline(test: Test) -> (String, Vec<String>) {
    let (parse, whole_tree) = match test {
        Test::Program(input) => (parser::parse(input, "test.mligo"), true),
        Test::Expr(input) => (parser::parse_expr(input, "test.mligo"), false),
        Test::Pattern(input) => (parser::parse_pattern(input, "test.mligo"), false),
        Test::Type(input) => (parser::parse_type_expr(input, "test.mligo"), false),
    };

    // Every test doubles as a losslessness check: the tree must reproduce
    // its input byte for byte, whether or not the parse had errors.
    ::pretty_assertions::assert_eq!(parse.tree.source(), parse.tree.text());

    let tree = if whole_tree {
        fmt::print_tree_string(&parse.tree)
    } else {
        // Sub-grammar entry points wrap their production in a root node
        // holding leftover tokens; print just the production.
        let root = parse.tree.node(parse.tree.root());
        let inner = root
            .children()
            .find_map(|(field, child)| match child {
                Child::Node(id) if field != Field::Token => Some(id),
                _ => None,
            })
            .expect("entry point always wraps one node");
        fmt::print_node_string(&parse.tree, inner)
    };
    let errors = parse.diagnostics.iter().map(ToString::to_string).collect();
    (tree, errors)
}

#[track_caller]
pub fn run_assertion(
    assertion: Assertion,
    formatted_actual_tree: &str,
    formatted_actual_errors: &[String],
) {
    match assertion {
        Assertion::TreeOk(expected_tree) => {
            let expected_errors: &[&str] = &[];
            ::pretty_assertions::assert_eq!(formatted_actual_errors, expected_errors);
            ::pretty_assertions::assert_eq!(formatted_actual_tree.trim(), expected_tree.trim());
        }
        Assertion::TreeError(expected_tree) => {
            ::pretty_assertions::assert_eq!(formatted_actual_tree.trim(), expected_tree.trim())
        }
        Assertion::ExpectedErrors(expected_errors) => {
            ::pretty_assertions::assert_eq!(formatted_actual_errors, expected_errors)
        }
    }
}

macro_rules! tree_tests {
    (
        $(
            fn $test_name:ident() {
                let $source_kind:ident = $source:expr;
                $($assertions_tt:tt)*
            }
        )*
    ) => {
        $(
            #[test]
            fn $test_name() {
                let test: crate::util::test_utils::Test =
                    tree_tests!(@@get_test($source_kind), $source);
                let (formatted_actual_tree, formatted_actual_errors) =
                    crate::util::test_utils::run_pipeline(test);
                let ctx = (&formatted_actual_tree, &formatted_actual_errors);
                tree_tests!(@@expand_assertions, ctx, [$($assertions_tt)*]);
            }
        )*
    };

    (@@expand_assertions, $ctx:expr, []) => {};
    (@@expand_assertions, $ctx:expr, [
        let $assertion:ident = $assertion_expected:expr;
        $($rest_assertions_tt:tt)*
    ]) => {
        crate::util::test_utils::run_assertion(
            tree_tests!(@@assertion, $assertion, $assertion_expected),
            $ctx.0,
            $ctx.1,
        );
        tree_tests!(@@expand_assertions, $ctx, [$($rest_assertions_tt)*]);
    };

    (@@assertion, tree_ok, $expected:expr) => {
        crate::util::test_utils::Assertion::TreeOk(::indoc::indoc! { $expected })
    };
    (@@assertion, tree_error, $expected:expr) => {
        crate::util::test_utils::Assertion::TreeError(::indoc::indoc! { $expected })
    };
    (@@assertion, expected_errors, $expected:expr) => {
        crate::util::test_utils::Assertion::ExpectedErrors($expected)
    };

    (@@get_test(program), $source:expr) => {
        crate::util::test_utils::Test::Program($source)
    };
    (@@get_test(expr), $source:expr) => {
        crate::util::test_utils::Test::Expr($source)
    };
    (@@get_test(pattern), $source:expr) => {
        crate::util::test_utils::Test::Pattern($source)
    };
    (@@get_test(ty), $source:expr) => {
        crate::util::test_utils::Test::Type($source)
    };
}
pub(crate) use tree_tests;
