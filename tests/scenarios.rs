//! End-to-end scenarios exercising each combinator and result view together,
//! rather than in isolation.

use pegmatite::{
    any_char, char_in_set, char_range, choice, delimited, diff, end_of_input, forward,
    literal_char, literal_string, one_or_more, opt, regex, scope_tree, sequence, tagged_tokens,
    terminated, zero_or_more, ParseOptions, ScopeKind,
};

#[test]
fn arithmetic_precedence_via_scope_tree_and_pivot_fold() {
    let ws = zero_or_more(char_in_set(vec![(' ', ' ')], Vec::new()));
    let opts = || ParseOptions {
        auto_advance: Some(ws.clone()),
        ..ParseOptions::default()
    };

    let number = regex(r"-?\d+(\.\d+)?").unwrap().tag("Value");
    let open_paren = literal_char('(').scope(ScopeKind::OpenScope);
    let close_paren = literal_char(')').scope(ScopeKind::CloseScope);
    let plus = literal_char('+').tag("Operation").scope(ScopeKind::Pivot);
    let minus = literal_char('-').tag("Operation").scope(ScopeKind::Pivot);
    let star = literal_char('*').tag("Operation").scope(ScopeKind::Pivot);
    let slash = literal_char('/').tag("Operation").scope(ScopeKind::Pivot);
    let caret = literal_char('^').tag("Operation").scope(ScopeKind::Pivot);

    let expr = forward();
    let factor = choice(vec![
        number.clone(),
        sequence(vec![open_paren, expr.clone(), close_paren]).unwrap(),
    ])
    .unwrap();
    let power = sequence(vec![factor.clone(), opt(sequence(vec![caret, factor]).unwrap())]).unwrap();
    let term = sequence(vec![
        power.clone(),
        zero_or_more(sequence(vec![choice(vec![star, slash]).unwrap(), power]).unwrap()),
    ])
    .unwrap();
    let expr_body = sequence(vec![
        term.clone(),
        zero_or_more(sequence(vec![choice(vec![plus, minus]).unwrap(), term]).unwrap()),
    ])
    .unwrap();
    expr.assign(expr_body).unwrap();
    let root = sequence(vec![expr, end_of_input()]).unwrap();

    assert_eq!(evaluate(&root, "(6.5 + 3) * (2 - 5.5)", opts()), -33.25);
    assert_eq!(evaluate(&root, "2^(1+3)", opts()), 16.0);
    assert_eq!(evaluate(&root, "-2.71828182", opts()), -2.71828182);
}

fn evaluate(root: &pegmatite::Parser, input: &str, opts: ParseOptions) -> f64 {
    let m = root.parse_string(input, opts);
    assert!(m.is_success(), "failed to parse {input:?}");
    let tree = scope_tree(&m);
    eval_node(&tree.children()[0])
}

fn eval_node(node: &pegmatite::ScopeNode) -> f64 {
    use pegmatite::ScopeNodeKind;
    match node.kind() {
        ScopeNodeKind::Root => eval_node(&node.children()[0]),
        ScopeNodeKind::Data => node
            .data_match()
            .expect("data node always carries a match")
            .value()
            .parse()
            .expect("Value-tagged leaf is always a number"),
        ScopeNodeKind::ScopeChange => match node.data_match() {
            Some(op) => {
                let children = node.children();
                assert_eq!(children.len(), 2, "a folded operator always has two operands");
                let lhs = eval_node(&children[0]);
                let rhs = eval_node(&children[1]);
                match op.value().as_str() {
                    "+" => lhs + rhs,
                    "-" => lhs - rhs,
                    "*" => lhs * rhs,
                    "/" => lhs / rhs,
                    "^" => lhs.powf(rhs),
                    other => panic!("unexpected operator {other}"),
                }
            }
            // A parenthesized grouping: evaluate the single expression it wraps.
            None => eval_node(&node.children()[0]),
        },
    }
}

#[test]
fn delimited_list_stops_before_a_trailing_delimiter() {
    let digit = char_range('0', '9').tag("digit");
    let p = delimited(digit, literal_char(','));

    let m = p.parse_string("1,2,3", ParseOptions::default());
    assert!(m.is_success());
    assert_eq!((m.offset(), m.right()), (0, 5));
    let tokens = tagged_tokens(&m);
    assert_eq!(
        tokens.iter().map(|t| t.value.as_str()).collect::<Vec<_>>(),
        vec!["1", "2", "3"]
    );

    let trailing = p.parse_string("1,2,", ParseOptions::default());
    assert!(trailing.is_success());
    assert_eq!((trailing.offset(), trailing.right()), (0, 3));
}

#[test]
fn terminated_list_drops_a_dangling_item_without_its_terminator() {
    let digit = char_range('0', '9').tag("digit");
    let p = terminated(digit, literal_char(';'));

    let m = p.parse_string("1;2;3;", ParseOptions::default());
    assert!(m.is_success());
    assert_eq!((m.offset(), m.right()), (0, 6));
    assert_eq!(tagged_tokens(&m).len(), 3);

    let dangling = p.parse_string("1;2;3", ParseOptions::default());
    assert!(dangling.is_success());
    assert_eq!((dangling.offset(), dangling.right()), (0, 4));
    assert_eq!(tagged_tokens(&dangling).len(), 2);
}

#[test]
fn difference_excludes_one_character_from_another() {
    use pegmatite::Scanner;

    let p = diff(any_char(), literal_char('x'));
    let scanner = Scanner::new("abcxde", ParseOptions::default());

    let mut previous = None;
    let mut values = Vec::new();
    for _ in 0..3 {
        let m = p.parse(&scanner, previous.clone());
        assert!(m.is_success());
        values.push(m.value());
        previous = Some(m);
    }
    assert_eq!(values, vec!["a", "b", "c"]);

    let at_x = p.parse(&scanner, previous.clone());
    assert!(at_x.is_failure());
    assert_eq!(previous.unwrap().right(), 3);
}

#[test]
fn direct_left_recursion_is_rejected_at_construction() {
    use pegmatite::GrammarError;

    let digit = char_range('0', '9').tag("digit");
    let plus = literal_char('+').tag("plus");
    let e = forward();
    let err = e
        .assign(choice(vec![sequence(vec![e.clone(), plus, digit]).unwrap(), digit]).unwrap())
        .unwrap_err();
    assert_eq!(err, GrammarError::UnboundedLeftRecursion);
}

#[test]
fn right_recursive_grammar_parses_without_growing_the_stack_unreasonably() {
    // Same language as the rejected left-recursive grammar above, written the
    // way a grammar author would after hitting that rejection: a forward
    // reference that only ever recurses after consuming a digit first.
    let digit = char_range('0', '9').tag("digit");
    let plus = literal_char('+').tag("plus");
    let e = forward();
    e.assign(choice(vec![
        sequence(vec![digit.clone(), plus, e.clone()]).unwrap(),
        digit,
    ])
    .unwrap())
    .unwrap();
    let root = sequence(vec![e, end_of_input()]).unwrap();

    let m = root.parse_string("1+2+3", ParseOptions::default());
    assert!(m.is_success());
    let digits: Vec<_> = tagged_tokens(&m)
        .into_iter()
        .filter(|t| t.tag == "digit")
        .map(|t| t.value)
        .collect();
    assert_eq!(digits, vec!["1", "2", "3"]);
}

#[test]
fn scope_tree_nests_open_close_pairs_to_the_expected_depth() {
    let content = char_in_set(vec![('a', 'c')], Vec::new()).tag("content");
    let open = literal_char('(').scope(ScopeKind::OpenScope);
    let close = literal_char(')').scope(ScopeKind::CloseScope);
    let token = choice(vec![content, open, close]).unwrap();
    let root = one_or_more(token);

    let m = root.parse_string("(a(b)c)", ParseOptions::default());
    assert!(m.is_success());

    let tree = scope_tree(&m);
    let outer = &tree.children()[0];
    assert_eq!(outer.kind(), pegmatite::ScopeNodeKind::ScopeChange);
    assert!(outer.opening_match().is_some());
    assert!(outer.closing_match().is_some());
    assert!(!outer.is_unbalanced());

    let outer_children = outer.children();
    assert_eq!(outer_children.len(), 3);
    assert_eq!(outer_children[0].data_match().unwrap().value(), "a");
    let inner = &outer_children[1];
    assert_eq!(inner.kind(), pegmatite::ScopeNodeKind::ScopeChange);
    assert!(inner.opening_match().is_some());
    assert!(inner.closing_match().is_some());
    assert_eq!(inner.children()[0].data_match().unwrap().value(), "b");
    assert_eq!(outer_children[2].data_match().unwrap().value(), "c");
}

#[test]
fn scope_tree_leaves_a_dangling_open_unclosed() {
    let content = char_in_set(vec![('a', 'c')], Vec::new()).tag("content");
    let open = literal_char('(').scope(ScopeKind::OpenScope);
    let close = literal_char(')').scope(ScopeKind::CloseScope);
    let token = choice(vec![content, open, close]).unwrap();
    let root = one_or_more(token);

    // One more '(' than ')': the outer scope is never closed.
    let m = root.parse_string("(a(b)c", ParseOptions::default());
    assert!(m.is_success());

    let tree = scope_tree(&m);
    let outer = &tree.children()[0];
    assert!(outer.opening_match().is_some());
    assert!(outer.closing_match().is_none());
    assert!(outer.is_unbalanced());
}

#[test]
fn furthest_failure_reports_what_was_expected_after_what_matched() -> anyhow::Result<()> {
    use pretty_assertions::assert_eq;

    let let_kw = literal_string("let").tag("let");
    let ws = one_or_more(literal_char(' '));
    let identifier = regex("[A-Za-z]+")?.tag("identifier");
    let eq = literal_char('=').tag("eq");
    let root = sequence(vec![let_kw, ws.clone(), identifier, ws, eq])?;

    let scanner = pegmatite::Scanner::new("let 42 = x", ParseOptions::default());
    let m = root.parse(&scanner, None);
    assert!(m.is_failure());

    let furthest = scanner.furthest_test().unwrap();
    assert_eq!(furthest.offset(), 4);

    let report = scanner.list_failures(0, false).unwrap();
    assert_eq!(report, "Expected 'identifier' After 'let'");
    Ok(())
}
