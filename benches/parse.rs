use criterion::*;
use pegmatite::{
    char_in_set, char_range, delimited, forward, literal_char, one_or_more, regex, sequence,
    zero_or_more, ParseOptions,
};

fn parse_csv_row(row: &str) {
    let field = regex(r"[^,\n]*").unwrap();
    let row_parser = delimited(field, literal_char(','));
    let m = row_parser.parse_string(row, ParseOptions::default());
    assert!(m.is_success());
}

fn parse_arithmetic(input: &str) {
    let ws = zero_or_more(char_in_set(vec![(' ', ' ')], Vec::new()));
    let opts = ParseOptions {
        auto_advance: Some(ws),
        ..ParseOptions::default()
    };
    let number = regex(r"-?\d+(\.\d+)?").unwrap();
    let open_paren = literal_char('(');
    let close_paren = literal_char(')');
    let plus = literal_char('+');
    let minus = literal_char('-');
    let star = literal_char('*');
    let slash = literal_char('/');

    let expr = forward();
    let factor = pegmatite::choice(vec![
        number,
        sequence(vec![open_paren, expr.clone(), close_paren]).unwrap(),
    ])
    .unwrap();
    let term = sequence(vec![
        factor.clone(),
        zero_or_more(
            sequence(vec![pegmatite::choice(vec![star, slash]).unwrap(), factor]).unwrap(),
        ),
    ])
    .unwrap();
    let expr_body = sequence(vec![
        term.clone(),
        zero_or_more(sequence(vec![pegmatite::choice(vec![plus, minus]).unwrap(), term]).unwrap()),
    ])
    .unwrap();
    expr.assign(expr_body).unwrap();

    let m = expr.parse_string(input, opts);
    assert!(m.is_success());
}

fn parse_identifier_chain(input: &str) {
    let ident = one_or_more(char_range('a', 'z'));
    let chain = sequence(vec![ident.clone(), zero_or_more(sequence(vec![literal_char('.'), ident]).unwrap())])
        .unwrap();
    let m = chain.parse_string(input, ParseOptions::default());
    assert!(m.is_success());
}

fn bench_delimited_list(c: &mut Criterion) {
    let row = "a,bb,ccc,dddd,eeeee,ffffff,ggggggg,hhhhhhhh,iiiiiiiii,jjjjjjjjjj";
    c.bench_function("delimited_list_csv_row", move |b| b.iter(|| parse_csv_row(row)));
}

fn bench_arithmetic(c: &mut Criterion) {
    let input = "(1 + 2) * (3 - 4) / (5 + (6 * 7)) - 8";
    c.bench_function("arithmetic_with_precedence", move |b| {
        b.iter(|| parse_arithmetic(input))
    });
}

fn bench_identifier_chain(c: &mut Criterion) {
    let input = "a.bb.ccc.dddd.eeeee.ffffff.ggggggg.hhhhhhhh";
    c.bench_function("dotted_identifier_chain", move |b| {
        b.iter(|| parse_identifier_chain(input))
    });
}

criterion_group!(benches, bench_delimited_list, bench_arithmetic, bench_identifier_chain);
criterion_main!(benches);
