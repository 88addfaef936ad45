use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use platynui_xdm::{
    AtomicType, ItemType, Occurrence, SequenceType, SetOrdering, SimpleNode, ValueContext, XdmAtomicValue as A,
    XdmItem as I, XdmNode, XdmSequenceStream, attr, cast, doc, elem, intersect, union,
};
use std::hint::black_box;

type S = XdmSequenceStream<SimpleNode>;

fn create_wide_document(sections: usize, per_section: usize) -> SimpleNode {
    let mut body = elem("body");
    for i in 0..sections {
        let mut section = elem("section").attr(attr("id", &format!("s{i}")));
        for j in 0..per_section {
            section = section.child(elem("p").attr(attr("n", &j.to_string())));
        }
        body = body.child(section);
    }
    doc().child(body).build()
}

fn all_paragraphs(root: &SimpleNode) -> Vec<SimpleNode> {
    let mut out = Vec::new();
    let mut stack = vec![root.clone()];
    while let Some(n) = stack.pop() {
        if n.name().is_some_and(|q| q.local == "p") {
            out.push(n.clone());
        }
        stack.extend(n.children().into_iter().rev());
    }
    out
}

fn benchmark_cursors(c: &mut Criterion) {
    let mut group = c.benchmark_group("cursors");
    for n in [1_000i64, 100_000] {
        group.bench_with_input(BenchmarkId::new("range_iterate", n), &n, |b, &n| {
            b.iter(|| black_box(S::from_range_inclusive(1, n).iter().count()));
        });
        group.bench_with_input(BenchmarkId::new("range_count", n), &n, |b, &n| {
            b.iter(|| black_box(S::from_range_inclusive(1, n).count().ok()));
        });
        group.bench_with_input(BenchmarkId::new("buffered_two_passes", n), &n, |b, &n| {
            b.iter(|| {
                let source = S::from_generator(move || (1..=n).map(|i| Ok(I::Atomic(A::Integer(i)))));
                let buffered = source.create_buffered();
                let first = buffered.iter().count();
                let second = buffered.clone().iter().count();
                black_box(first + second)
            });
        });
    }
    group.finish();
}

fn benchmark_cast(c: &mut Criterion) {
    let ctx = ValueContext::default();
    let target = SequenceType::new(ItemType::Atomic(AtomicType::Integer), Occurrence::ZeroOrMore);
    let input = S::from_vec((0..10_000).map(|i| I::Atomic(A::String(i.to_string()))).collect());
    c.bench_function("cast_strings_to_integer", |b| {
        b.iter(|| black_box(cast(&input, &target, false, &ctx).and_then(|s| s.materialize()).map(|v| v.len())));
    });
}

fn benchmark_set_ops(c: &mut Criterion) {
    let document = create_wide_document(50, 40);
    let paragraphs = all_paragraphs(&document);
    let evens = S::from_vec(paragraphs.iter().step_by(2).cloned().map(I::Node).collect());
    let reversed = S::from_vec(paragraphs.iter().rev().cloned().map(I::Node).collect());

    let mut group = c.benchmark_group("set_ops");
    for ordering in [SetOrdering::Ordered, SetOrdering::Unordered] {
        let label = format!("{ordering:?}");
        group.bench_with_input(BenchmarkId::new("union", &label), &ordering, |b, &ordering| {
            b.iter(|| black_box(union(&evens, &reversed, ordering).and_then(|s| s.count())));
        });
        group.bench_with_input(BenchmarkId::new("intersect", &label), &ordering, |b, &ordering| {
            b.iter(|| black_box(intersect(&reversed, &evens, ordering).and_then(|s| s.count())));
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_cursors, benchmark_cast, benchmark_set_ops);
criterion_main!(benches);
