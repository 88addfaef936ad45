use std::sync::Arc;

use platynui_xdm::engine::casting::cast_atomic;
use platynui_xdm::engine::comparison::value_gt;
use platynui_xdm::engine::promotion::unary_plus;
use platynui_xdm::engine::regex::RegexProvider;
use platynui_xdm::engine::registry::CallCtx;
use platynui_xdm::engine::seqtype::{InternedQName, NameOrWildcard};
use platynui_xdm::{
    AtomicType, DynamicContextBuilder, Error, ErrorCode, ErrorKind, ExpandedName, FunctionRegistry, ItemType,
    NodeTest, Occurrence, SequenceType, SimpleNode, ValueContextBuilder, XdmAtomicValue as A, XdmItem as I,
    XdmSequence, XdmSequenceStream, elem, instance_of, ns,
};
use rstest::rstest;

#[rstest]
fn error_codes_round_trip_through_their_names() {
    let err = Error::from_code(ErrorCode::FORG0006, "bad argument");
    assert_eq!(err.format_code(), "err:FORG0006");
    assert_eq!(Error::parse_code("err:FORG0006"), ErrorCode::FORG0006.qname());
    assert_eq!(err.to_string(), "error: bad argument (err:FORG0006)");

    let custom = Error::new_qname(Error::parse_code("Q{urn:app}E1"), "custom");
    assert_eq!(custom.format_code(), "Q{urn:app}E1");
    assert_eq!(custom.code_enum(), ErrorCode::Unknown);
    assert_eq!(custom.kind(), ErrorKind::Other);

    let known = Error::new_qname(ErrorCode::FOAR0001.qname(), "x");
    assert_eq!(known.kind(), ErrorKind::DivisionByZero);
}

#[rstest]
fn cardinality_errors_keep_their_code() {
    let err = Error::cardinality(ErrorCode::XPTY0004, "too many");
    assert_eq!(err.kind(), ErrorKind::CardinalityViolation);
    assert_eq!(err.code_enum(), ErrorCode::XPTY0004);
}

#[rstest]
fn unary_plus_and_gt() {
    let ctx = ValueContextBuilder::new().build();
    assert_eq!(unary_plus(&A::Short(3)).unwrap(), A::Short(3));
    assert_eq!(unary_plus(&A::UntypedAtomic("2".into())).unwrap(), A::Double(2.0));
    assert_eq!(unary_plus(&A::Boolean(true)).unwrap_err().code_enum(), ErrorCode::XPTY0004);
    assert!(value_gt(&A::Integer(3), &A::Double(2.5), &ctx).unwrap());
}

#[rstest]
fn qname_casts_use_context_namespaces() {
    let ctx = ValueContextBuilder::new().with_namespace("app", "urn:app").with_namespace("xml", "urn:nope").build();
    let q = cast_atomic(&A::from("app:item"), AtomicType::QName, &ctx).unwrap();
    assert_eq!(q, A::QName { ns_uri: Some("urn:app".into()), prefix: Some("app".into()), local: "item".into() });
    let xml = cast_atomic(&A::from("xml:lang"), AtomicType::QName, &ctx).unwrap();
    assert_eq!(
        xml,
        A::QName {
            ns_uri: Some(platynui_xdm::consts::XML_URI.into()),
            prefix: Some("xml".into()),
            local: "lang".into(),
        }
    );
}

#[rstest]
fn custom_functions_resolve_without_namespace_first() {
    let mut reg: FunctionRegistry<SimpleNode> = FunctionRegistry::new();
    reg.register(
        ExpandedName::new(None, "answer"),
        0,
        Arc::new(|_ctx: &CallCtx<SimpleNode>, _args: &[XdmSequence<SimpleNode>]| Ok(vec![I::Atomic(A::Integer(42))])),
    );
    reg.register_ns("urn:app", "twice", 1, |_ctx, args| Ok(args[0].iter().chain(&args[0]).cloned().collect()));
    let ctx = DynamicContextBuilder::new()
        .with_functions(Arc::new(reg))
        .with_default_function_namespace(Some("urn:app".to_string()))
        .build();
    assert_eq!(ctx.call(&ExpandedName::new(None, "answer"), &[]).unwrap(), vec![I::Atomic(A::Integer(42))]);
    let doubled = ctx.call(&ExpandedName::new(None, "twice"), &[vec![I::Atomic(A::from("x"))]]).unwrap();
    assert_eq!(doubled.len(), 2);
    // the standard library is not part of a custom registry
    let err = ctx.call(&ExpandedName::fn_name("count"), &[vec![]]).unwrap_err();
    assert_eq!(err.code_enum(), ErrorCode::XPST0017);
}

struct Literal;

impl RegexProvider for Literal {
    fn matches(&self, pattern: &str, _flags: &str, text: &str) -> Result<bool, Error> {
        Ok(text.contains(pattern))
    }

    fn replace(&self, pattern: &str, _flags: &str, text: &str, replacement: &str) -> Result<String, Error> {
        Ok(text.replace(pattern, replacement))
    }

    fn tokenize(&self, pattern: &str, _flags: &str, text: &str) -> Result<Vec<String>, Error> {
        Ok(text.split(pattern).map(str::to_string).collect())
    }
}

#[rstest]
fn regex_backend_is_pluggable() {
    let ctx = DynamicContextBuilder::<SimpleNode>::new()
        .with_regex_provider(Arc::new(Literal))
        .with_value_context(ValueContextBuilder::new().build())
        .build();
    let out = ctx
        .call(&ExpandedName::fn_name("matches"), &[vec![I::Atomic(A::from("a.c"))], vec![I::Atomic(A::from("."))]])
        .unwrap();
    assert_eq!(out, vec![I::Atomic(A::Boolean(true))]);
    let out = ctx
        .call(&ExpandedName::fn_name("matches"), &[vec![I::Atomic(A::from("abc"))], vec![I::Atomic(A::from("."))]])
        .unwrap();
    assert_eq!(out, vec![I::Atomic(A::Boolean(false))]);
}

#[rstest]
fn element_tests_match_namespaces() {
    let svg = elem("svg:rect").namespace(ns("svg", "urn:svg")).build();
    let plain = elem("rect").in_namespace("urn:svg").build();
    assert_eq!(svg.lookup_namespace_uri("svg").as_deref(), Some("urn:svg"));
    let in_svg = SequenceType::new(
        ItemType::Kind(NodeTest::KindElement {
            name: Some(NameOrWildcard::Name(InternedQName::new(Some("urn:svg"), "rect"))),
            ty: None,
        }),
        Occurrence::One,
    );
    let one = |n: &SimpleNode| XdmSequenceStream::from_item(I::Node(n.clone()));
    assert!(instance_of(&one(&svg), &in_svg).unwrap());
    assert!(instance_of(&one(&plain), &in_svg).unwrap());
    assert!(!instance_of(&one(&elem("rect").build()), &in_svg).unwrap());
}
