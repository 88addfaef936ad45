use std::str::FromStr;
use std::sync::Arc;

use platynui_xdm::engine::functions::default_function_registry;
use platynui_xdm::{
    DynamicContext, DynamicContextBuilder, Error, ErrorCode, ExpandedName, SimpleNode, XdmAtomicValue as A,
    XdmItem as I, XdmSequence,
};
use rstest::{fixture, rstest};
use rust_decimal::Decimal;

type Ctx = DynamicContext<SimpleNode>;

#[fixture]
fn ctx() -> Ctx {
    DynamicContextBuilder::new().build()
}

fn dec(s: &str) -> A {
    A::Decimal(Decimal::from_str(s).unwrap())
}

fn seq(values: &[A]) -> XdmSequence<SimpleNode> {
    values.iter().cloned().map(I::Atomic).collect()
}

fn call(ctx: &Ctx, name: &str, args: &[&[A]]) -> Result<Vec<A>, Error> {
    let args: Vec<_> = args.iter().map(|a| seq(a)).collect();
    let out = ctx.call(&ExpandedName::new(None, name), &args)?;
    Ok(out
        .into_iter()
        .map(|it| match it {
            I::Atomic(a) => a,
            I::Node(n) => panic!("unexpected node {n:?}"),
        })
        .collect())
}

fn ints(range: core::ops::RangeInclusive<i64>) -> Vec<A> {
    range.map(A::Integer).collect()
}

#[rstest]
fn distinct_values_collapses_nan(ctx: Ctx) {
    let input = [A::Double(1.0), A::Double(f64::NAN), A::Double(f64::NAN), A::Double(2.0)];
    let out = call(&ctx, "distinct-values", &[&input]).unwrap();
    assert_eq!(out.len(), 3);
    assert_eq!(out[0], A::Double(1.0));
    assert!(out[1].is_nan());
    assert_eq!(out[2], A::Double(2.0));
}

#[rstest]
fn distinct_values_compares_across_numeric_types(ctx: Ctx) {
    let input = [A::Integer(1), dec("1.0"), A::Float(1.0), A::from("1"), A::UntypedAtomic("1".into())];
    let out = call(&ctx, "distinct-values", &[&input]).unwrap();
    assert_eq!(out, vec![A::Integer(1), A::from("1")]);
}

#[rstest]
fn min_and_max_are_not_the_same_function(ctx: Ctx) {
    let input = [A::Integer(3), dec("1.5"), A::Integer(2)];
    assert_eq!(call(&ctx, "min", &[&input]).unwrap(), vec![dec("1.5")]);
    assert_eq!(call(&ctx, "max", &[&input]).unwrap(), vec![dec("3")]);
    let words = [A::from("pear"), A::from("apple"), A::from("zucchini")];
    assert_eq!(call(&ctx, "min", &[&words]).unwrap(), vec![A::from("apple")]);
    assert_eq!(call(&ctx, "max", &[&words]).unwrap(), vec![A::from("zucchini")]);
}

#[rstest]
fn min_and_max_accept_the_codepoint_collation(ctx: Ctx) {
    let collation = [A::from(platynui_xdm::consts::CODEPOINT_URI)];
    let input = [A::Integer(3), A::Integer(1)];
    assert_eq!(call(&ctx, "min", &[&input, &collation]).unwrap(), vec![A::Integer(1)]);
    assert_eq!(call(&ctx, "max", &[&input, &collation]).unwrap(), vec![A::Integer(3)]);
    let words = [A::from("b"), A::from("a")];
    assert_eq!(call(&ctx, "min", &[&words, &collation]).unwrap(), vec![A::from("a")]);

    let unknown = [A::from("http://example.com/collation/fr")];
    let err = call(&ctx, "min", &[&input, &unknown]).unwrap_err();
    assert_eq!(err.code_enum(), ErrorCode::FOCH0002);
}

#[rstest]
fn min_and_max_promote_to_the_common_type(ctx: Ctx) {
    let input = [A::Integer(1), A::Double(2.5)];
    assert_eq!(call(&ctx, "min", &[&input]).unwrap(), vec![A::Double(1.0)]);
    let untyped = [A::UntypedAtomic("10".into()), A::UntypedAtomic("9".into())];
    assert_eq!(call(&ctx, "max", &[&untyped]).unwrap(), vec![A::Double(10.0)]);
}

#[rstest]
#[case("min")]
#[case("max")]
fn extremum_edge_cases(ctx: Ctx, #[case] name: &str) {
    assert!(call(&ctx, name, &[&[]]).unwrap().is_empty());
    let with_nan = [A::Integer(1), A::Double(f64::NAN), A::Integer(5)];
    let out = call(&ctx, name, &[&with_nan]).unwrap();
    assert!(out[0].is_nan());
    let mixed = [A::Integer(1), A::from("a")];
    assert_eq!(call(&ctx, name, &[&mixed]).unwrap_err().code_enum(), ErrorCode::FORG0006);
    let unordered = [A::QName { ns_uri: None, prefix: None, local: "q".into() }];
    assert_eq!(call(&ctx, name, &[&unordered]).unwrap_err().code_enum(), ErrorCode::FORG0006);
}

#[rstest]
fn sum_and_avg(ctx: Ctx) {
    assert_eq!(call(&ctx, "sum", &[&[]]).unwrap(), vec![A::Integer(0)]);
    assert!(call(&ctx, "sum", &[&[], &[]]).unwrap().is_empty());
    assert_eq!(call(&ctx, "sum", &[&[A::Integer(1), dec("2.5")]]).unwrap(), vec![dec("3.5")]);
    assert_eq!(call(&ctx, "avg", &[&[A::Integer(1), A::Integer(2)]]).unwrap(), vec![dec("1.5")]);
    assert!(call(&ctx, "avg", &[&[]]).unwrap().is_empty());

    let months = [A::YearMonthDuration(3), A::YearMonthDuration(9)];
    assert_eq!(call(&ctx, "sum", &[&months]).unwrap(), vec![A::YearMonthDuration(12)]);
    assert_eq!(call(&ctx, "avg", &[&months]).unwrap(), vec![A::YearMonthDuration(6)]);

    let bad = [A::YearMonthDuration(3), A::DayTimeDuration(Decimal::ONE)];
    assert_eq!(call(&ctx, "sum", &[&bad]).unwrap_err().code_enum(), ErrorCode::FORG0006);
    assert_eq!(call(&ctx, "sum", &[&[A::from("a")]]).unwrap_err().code_enum(), ErrorCode::FORG0006);
}

#[rstest]
#[case(vec![A::Integer(2), A::Integer(2)], vec![2, 3])]
#[case(vec![A::Double(1.5)], vec![2, 3, 4, 5])]
#[case(vec![A::Integer(0), A::Integer(2)], vec![1])]
#[case(vec![A::Integer(-10)], vec![1, 2, 3, 4, 5])]
#[case(vec![A::Double(f64::NAN)], vec![])]
fn subsequence_positions(ctx: Ctx, #[case] bounds: Vec<A>, #[case] expected: Vec<i64>) {
    let input = ints(1..=5);
    let mut args: Vec<&[A]> = vec![&input];
    args.extend(bounds.iter().map(core::slice::from_ref));
    let out = call(&ctx, "subsequence", &args).unwrap();
    assert_eq!(out, expected.into_iter().map(A::Integer).collect::<Vec<_>>());
}

#[rstest]
fn cardinality_functions(ctx: Ctx) {
    let two = ints(1..=2);
    assert_eq!(call(&ctx, "exactly-one", &[&two]).unwrap_err().code_enum(), ErrorCode::FORG0005);
    assert_eq!(call(&ctx, "zero-or-one", &[&two]).unwrap_err().code_enum(), ErrorCode::FORG0003);
    assert_eq!(call(&ctx, "one-or-more", &[&[]]).unwrap_err().code_enum(), ErrorCode::FORG0004);
    assert_eq!(call(&ctx, "one-or-more", &[&two]).unwrap(), two);
    assert_eq!(call(&ctx, "count", &[&two]).unwrap(), vec![A::Integer(2)]);
    assert_eq!(call(&ctx, "empty", &[&[]]).unwrap(), vec![A::Boolean(true)]);
    assert_eq!(call(&ctx, "exists", &[&[]]).unwrap(), vec![A::Boolean(false)]);
}

#[rstest]
fn positional_functions(ctx: Ctx) {
    let input = [A::Integer(1), dec("2.0"), A::from("x"), A::Integer(2)];
    assert_eq!(call(&ctx, "index-of", &[&input, &[A::Integer(2)]]).unwrap(), vec![A::Integer(2), A::Integer(4)]);
    let abc = [A::from("a"), A::from("b"), A::from("c")];
    assert_eq!(call(&ctx, "reverse", &[&abc]).unwrap(), vec![A::from("c"), A::from("b"), A::from("a")]);
    assert_eq!(
        call(&ctx, "insert-before", &[&abc, &[A::Integer(2)], &[A::from("z")]]).unwrap(),
        vec![A::from("a"), A::from("z"), A::from("b"), A::from("c")]
    );
    assert_eq!(call(&ctx, "remove", &[&abc, &[A::Integer(9)]]).unwrap(), abc.to_vec());
    assert_eq!(call(&ctx, "remove", &[&abc, &[A::Integer(1)]]).unwrap(), abc[1..].to_vec());
}

#[rstest]
fn boolean_and_not(ctx: Ctx) {
    assert_eq!(call(&ctx, "boolean", &[&[A::from("a")]]).unwrap(), vec![A::Boolean(true)]);
    assert_eq!(call(&ctx, "not", &[&[A::Double(f64::NAN)]]).unwrap(), vec![A::Boolean(true)]);
    assert_eq!(call(&ctx, "boolean", &[&ints(1..=2)]).unwrap_err().code_enum(), ErrorCode::FORG0006);
}

#[rstest]
fn regex_functions(ctx: Ctx) {
    let s = |v: &str| A::from(v);
    assert_eq!(call(&ctx, "matches", &[&[s("Abc")], &[s("^a")], &[s("i")]]).unwrap(), vec![A::Boolean(true)]);
    assert_eq!(call(&ctx, "matches", &[&[], &[s("x")]]).unwrap(), vec![A::Boolean(false)]);
    assert_eq!(
        call(&ctx, "replace", &[&[s("2024-05-01")], &[s(r"(\d+)-(\d+)-(\d+)")], &[s("$3.$2.$1")]]).unwrap(),
        vec![s("01.05.2024")]
    );
    assert_eq!(call(&ctx, "tokenize", &[&[s("a,b,,c")], &[s(",")]]).unwrap(), vec![s("a"), s("b"), s(""), s("c")]);
    let err = call(&ctx, "replace", &[&[s("abc")], &[s("x*")], &[s("-")]]).unwrap_err();
    assert_eq!(err.code_enum(), ErrorCode::FORX0003);
    let err = call(&ctx, "matches", &[&[s("a")], &[s("a")], &[s("q")]]).unwrap_err();
    assert_eq!(err.code_enum(), ErrorCode::FORX0001);
    let err = call(&ctx, "matches", &[&[s("a")], &[s("(")]]).unwrap_err();
    assert_eq!(err.code_enum(), ErrorCode::FORX0002);
}

#[rstest]
fn unknown_functions_and_arities(ctx: Ctx) {
    let err = call(&ctx, "no-such-function", &[]).unwrap_err();
    assert_eq!(err.code_enum(), ErrorCode::XPST0017);
    let err = call(&ctx, "subsequence", &[&[]]).unwrap_err();
    assert_eq!(err.code_enum(), ErrorCode::XPST0017);
    assert!(err.message.contains("2, 3"));
    let qualified = ctx.call(&ExpandedName::fn_name("count"), &[seq(&ints(1..=3))]).unwrap();
    assert_eq!(qualified, seq(&[A::Integer(3)]));
}

#[rstest]
fn registry_is_built_once_and_shared() {
    let registry = Arc::new(default_function_registry::<SimpleNode>());
    let a: Ctx = DynamicContextBuilder::new().with_functions(Arc::clone(&registry)).build();
    let b: Ctx = DynamicContextBuilder::new().with_functions(Arc::clone(&registry)).build();
    assert!(Arc::ptr_eq(&a.functions, &b.functions));
    assert_eq!(call(&a, "count", &[&ints(1..=4)]).unwrap(), call(&b, "count", &[&ints(1..=4)]).unwrap());
    assert!(!registry.is_empty());
}

#[rstest]
fn calls_log_through_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("platynui_xdm=trace"))
        .with_test_writer()
        .try_init();
    let ctx: Ctx = DynamicContextBuilder::new().build();
    assert_eq!(call(&ctx, "matches", &[&[A::from("aa")], &[A::from("a+")]]).unwrap(), vec![A::Boolean(true)]);
}
