use criterion::{black_box, criterion_group, criterion_main, Criterion};
use markup::{
    emit, parse, validate, EmitOptions, LineIndex, ParseOptions, StrictStrategy, Tokenizer,
    ValidateOptions,
};

const SMALL_BLOCKS: usize = 64;
const LARGE_BLOCKS: usize = 20_000;

fn make_blocks(blocks: usize) -> String {
    let mut out = String::with_capacity(blocks * 96);
    for i in 0..blocks {
        out.push_str("<div class=box><span>hello</span>");
        out.push_str("<data:rec xmlns:data=\"urn:bench\" data:k=\"");
        out.push_str(&i.to_string());
        out.push_str("\">v</data:rec><img src=x></div>");
    }
    out
}

fn make_rawtext_adversarial(bytes: usize) -> String {
    let mut body = String::with_capacity(bytes + 32);
    body.push_str("<script>");
    while body.len() < bytes {
        body.push_str("</scri");
        body.push('<');
        body.push_str("pt");
    }
    body.push_str("</script>");
    body
}

fn bench_tokenize_small(c: &mut Criterion) {
    let input = make_blocks(SMALL_BLOCKS);
    c.bench_function("bench_tokenize_small", |b| {
        b.iter(|| {
            let index = LineIndex::new(black_box(&input));
            let (tokens, _) = Tokenizer::new(&input, &index).tokenize_all();
            black_box(tokens.len());
        });
    });
}

fn bench_tokenize_large(c: &mut Criterion) {
    let input = make_blocks(LARGE_BLOCKS);
    c.bench_function("bench_tokenize_large", |b| {
        b.iter(|| {
            let index = LineIndex::new(black_box(&input));
            let (tokens, _) = Tokenizer::new(&input, &index).tokenize_all();
            black_box(tokens.len());
        });
    });
}

fn bench_parse_large_end_to_end(c: &mut Criterion) {
    let input = make_blocks(LARGE_BLOCKS);
    let options = ParseOptions::default();
    c.bench_function("bench_parse_large_end_to_end", |b| {
        b.iter(|| {
            let outcome = parse(black_box(&input), &options);
            black_box(outcome.root);
        });
    });
}

fn bench_validate_large(c: &mut Criterion) {
    let input = make_blocks(LARGE_BLOCKS);
    let outcome = parse(&input, &ParseOptions::default());
    let options = ValidateOptions::default();
    c.bench_function("bench_validate_large", |b| {
        b.iter(|| {
            let diagnostics = validate(black_box(&outcome.root), &options);
            black_box(diagnostics.len());
        });
    });
}

fn bench_emit_large_custom_tag(c: &mut Criterion) {
    let input = make_blocks(LARGE_BLOCKS);
    let outcome = parse(&input, &ParseOptions::default());
    let options = EmitOptions {
        strategy: StrictStrategy::CustomTag,
        ..EmitOptions::default()
    };
    c.bench_function("bench_emit_large_custom_tag", |b| {
        b.iter(|| {
            let emitted = emit(black_box(&outcome.root), &options);
            black_box(emitted.output.len());
        });
    });
}

fn bench_tokenize_rawtext_adversarial(c: &mut Criterion) {
    let input = make_rawtext_adversarial(512 * 1024);
    c.bench_function("bench_tokenize_rawtext_adversarial", |b| {
        b.iter(|| {
            let index = LineIndex::new(black_box(&input));
            let (tokens, _) = Tokenizer::new(&input, &index).tokenize_all();
            black_box(tokens.len());
        });
    });
}

criterion_group!(
    benches,
    bench_tokenize_small,
    bench_tokenize_large,
    bench_parse_large_end_to_end,
    bench_validate_large,
    bench_emit_large_custom_tag,
    bench_tokenize_rawtext_adversarial
);
criterion_main!(benches);
