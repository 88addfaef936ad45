use platynui_xdm::engine::casting::cast_atomic;
use platynui_xdm::engine::comparison::{EqKey, general_compare, value_eq};
use platynui_xdm::{
    AtomicType, ComparisonOp, ErrorCode, SimpleNode, ValueContext, ValueContextBuilder, XdmAtomicValue as A,
    XdmItem as I, XdmSequenceStream, elem, text, value_compare,
};
use rstest::rstest;

type S = XdmSequenceStream<SimpleNode>;

fn ctx() -> ValueContext {
    ValueContext::default()
}

fn lit(text: &str, t: AtomicType) -> A {
    cast_atomic(&A::String(text.to_string()), t, &ctx()).unwrap()
}

fn atoms(values: Vec<A>) -> S {
    S::from_vec(values.into_iter().map(I::Atomic).collect())
}

#[rstest]
#[case(ComparisonOp::Eq, A::Integer(1), A::Double(1.0), true)]
#[case(ComparisonOp::Lt, A::Short(1), A::Float(1.5), true)]
#[case(ComparisonOp::Ge, A::from("b"), A::from("a"), true)]
#[case(ComparisonOp::Eq, A::UntypedAtomic("x".into()), A::from("x"), true)]
#[case(ComparisonOp::Gt, A::Boolean(true), A::Boolean(false), true)]
#[case(ComparisonOp::Ne, A::Integer(3), A::Integer(3), false)]
fn value_comparisons(#[case] op: ComparisonOp, #[case] a: A, #[case] b: A, #[case] expected: bool) {
    assert_eq!(value_compare(op, &a, &b, &ctx()).unwrap(), expected);
}

#[rstest]
fn nan_is_unordered() {
    let nan = A::Double(f64::NAN);
    assert!(!value_eq(&nan, &nan, &ctx()).unwrap());
    assert!(value_compare(ComparisonOp::Ne, &nan, &nan, &ctx()).unwrap());
    assert!(!value_compare(ComparisonOp::Lt, &nan, &A::Integer(1), &ctx()).unwrap());
    assert!(!value_compare(ComparisonOp::Ge, &nan, &A::Integer(1), &ctx()).unwrap());
}

#[rstest]
fn mixed_families_are_not_comparable() {
    let err = value_compare(ComparisonOp::Eq, &A::Integer(1), &A::from("1"), &ctx()).unwrap_err();
    assert_eq!(err.code_enum(), ErrorCode::XPTY0004);
    // untyped is compared as a string in value comparisons
    let err = value_compare(ComparisonOp::Eq, &A::UntypedAtomic("1".into()), &A::Integer(1), &ctx()).unwrap_err();
    assert_eq!(err.code_enum(), ErrorCode::XPTY0004);
}

#[rstest]
fn generic_durations_only_define_equality() {
    let year = lit("P1Y", AtomicType::YearMonthDuration);
    let twelve = lit("P12M", AtomicType::Duration);
    assert!(value_eq(&year, &twelve, &ctx()).unwrap());
    let err = value_compare(ComparisonOp::Lt, &year, &twelve, &ctx()).unwrap_err();
    assert_eq!(err.code_enum(), ErrorCode::XPTY0004);
    let short = lit("PT1H", AtomicType::DayTimeDuration);
    assert!(value_compare(ComparisonOp::Lt, &short, &lit("PT90M", AtomicType::DayTimeDuration), &ctx()).unwrap());
}

#[rstest]
#[case(ComparisonOp::Eq)]
#[case(ComparisonOp::Ne)]
#[case(ComparisonOp::Lt)]
fn year_month_and_day_time_durations_do_not_compare(#[case] op: ComparisonOp) {
    let none_months = A::YearMonthDuration(0);
    let none_seconds = A::DayTimeDuration(rust_decimal::Decimal::ZERO);
    let err = value_compare(op, &none_months, &none_seconds, &ctx()).unwrap_err();
    assert_eq!(err.code_enum(), ErrorCode::XPTY0004);
    let err = value_compare(op, &none_seconds, &none_months, &ctx()).unwrap_err();
    assert_eq!(err.code_enum(), ErrorCode::XPTY0004);
    assert_ne!(EqKey::new(&none_months, &ctx()), EqKey::new(&none_seconds, &ctx()));
}

#[rstest]
fn instants_compare_in_utc() {
    let a = lit("2024-05-01T12:00:00+02:00", AtomicType::DateTime);
    let b = lit("2024-05-01T10:00:00Z", AtomicType::DateTime);
    assert!(value_eq(&a, &b, &ctx()).unwrap());

    let local = lit("2024-05-01T12:00:00", AtomicType::DateTime);
    assert!(!value_eq(&a, &local, &ctx()).unwrap());
    let in_plus_two = ValueContextBuilder::new()
        .with_implicit_timezone(chrono::FixedOffset::east_opt(2 * 3600).unwrap())
        .build();
    assert!(value_eq(&a, &local, &in_plus_two).unwrap());
}

#[rstest]
fn general_comparison_is_existential() {
    let lhs = atoms(vec![A::Integer(1), A::Integer(5)]);
    let rhs = atoms(vec![A::Integer(4)]);
    assert!(general_compare(ComparisonOp::Gt, &lhs, &rhs, &ctx()).unwrap());
    assert!(general_compare(ComparisonOp::Lt, &lhs, &rhs, &ctx()).unwrap());
    assert!(!general_compare(ComparisonOp::Eq, &lhs, &rhs, &ctx()).unwrap());
    assert!(!general_compare(ComparisonOp::Eq, &lhs, &S::empty(), &ctx()).unwrap());
    assert!(!general_compare(ComparisonOp::Ne, &S::empty(), &rhs, &ctx()).unwrap());
}

#[rstest]
fn general_comparison_converts_untyped_by_the_other_operand() {
    let node = elem("price").child(text("10")).build();
    let lhs = S::from_item(I::Node(node));
    assert!(general_compare(ComparisonOp::Gt, &lhs, &atoms(vec![A::Integer(9)]), &ctx()).unwrap());
    assert!(general_compare(ComparisonOp::Eq, &lhs, &atoms(vec![A::from("10")]), &ctx()).unwrap());
    assert!(!general_compare(ComparisonOp::Gt, &lhs, &atoms(vec![A::from("9")]), &ctx()).unwrap());
    let date = lit("2024-01-01", AtomicType::Date);
    let untyped_date = atoms(vec![A::UntypedAtomic("2024-01-01".into())]);
    assert!(general_compare(ComparisonOp::Eq, &untyped_date, &atoms(vec![date]), &ctx()).unwrap());

    let bad = atoms(vec![A::UntypedAtomic("ten".into())]);
    let err = general_compare(ComparisonOp::Eq, &bad, &atoms(vec![A::Integer(10)]), &ctx()).unwrap_err();
    assert_eq!(err.code_enum(), ErrorCode::FORG0001);
}

#[rstest]
fn eq_keys_follow_eq() {
    let c = ctx();
    let key = |v: A| EqKey::new(&v, &c);
    assert_eq!(key(A::Integer(1)), key(A::Double(1.0)));
    assert_eq!(key(A::Integer(1)), key(lit("1.0", AtomicType::Decimal)));
    assert_eq!(key(A::Double(0.0)), key(A::Double(-0.0)));
    assert_eq!(key(A::Double(f64::NAN)), key(A::Float(f32::NAN)));
    assert_ne!(key(A::Integer(1)), key(A::from("1")));
    assert_eq!(key(A::from("a")), key(A::UntypedAtomic("a".into())));
    assert_eq!(key(lit("P1Y", AtomicType::YearMonthDuration)), key(lit("P12M", AtomicType::Duration)));
    assert_eq!(key(lit("PT1H", AtomicType::DayTimeDuration)), key(lit("PT60M", AtomicType::Duration)));
    assert_eq!(
        key(lit("2024-05-01T12:00:00+02:00", AtomicType::DateTime)),
        key(lit("2024-05-01T10:00:00Z", AtomicType::DateTime))
    );
}
