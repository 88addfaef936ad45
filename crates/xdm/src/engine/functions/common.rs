use crate::consts::CODEPOINT_URI;
use crate::engine::atomize::{atomize_item, singleton_atomic};
use crate::engine::casting::{cast_atomic, lexical_of, parse_double_lex};
use crate::engine::numeric::a_as_i128;
use crate::engine::runtime::{Error, ErrorCode, ValueContext};
use crate::model::XdmNode;
use crate::xdm::{AtomicType, XdmAtomicValue, XdmItem, XdmSequence};

pub(super) fn atoms<N: XdmNode>(seq: &[XdmItem<N>]) -> Result<Vec<XdmAtomicValue>, Error> {
    let mut out = Vec::with_capacity(seq.len());
    for item in seq {
        out.extend(atomize_item(item)?);
    }
    Ok(out)
}

pub(super) fn one_atomic<N>(v: XdmAtomicValue) -> XdmSequence<N> {
    vec![XdmItem::Atomic(v)]
}

pub(super) fn boolean<N>(b: bool) -> XdmSequence<N> {
    one_atomic(XdmAtomicValue::Boolean(b))
}

/// String value of an optional singleton argument; the empty sequence is `""`.
pub(super) fn string_arg<N: XdmNode>(seq: &[XdmItem<N>]) -> Result<String, Error> {
    Ok(singleton_atomic(seq)?.map(|a| lexical_of(&a)).unwrap_or_default())
}

/// `xs:double` argument (untyped and numeric sources).
pub(super) fn to_number<N: XdmNode>(seq: &[XdmItem<N>]) -> Result<f64, Error> {
    let Some(a) = singleton_atomic(seq)? else {
        return Err(Error::cardinality(ErrorCode::XPTY0004, "expected a numeric argument, got an empty sequence"));
    };
    match &a {
        XdmAtomicValue::UntypedAtomic(s) => parse_double_lex(s)
            .ok_or_else(|| Error::from_code(ErrorCode::FORG0001, format!("cannot convert '{s}' to xs:double"))),
        v if v.is_numeric() => match cast_atomic(v, AtomicType::Double, &ValueContext::default())? {
            XdmAtomicValue::Double(d) => Ok(d),
            _ => Err(Error::from_code(ErrorCode::FOER0000, "double cast produced another type")),
        },
        other => {
            Err(Error::from_code(ErrorCode::XPTY0004, format!("expected a numeric argument, got {}", other.type_of())))
        }
    }
}

/// `xs:integer` argument.
pub(super) fn to_integer<N: XdmNode>(seq: &[XdmItem<N>]) -> Result<i128, Error> {
    let Some(a) = singleton_atomic(seq)? else {
        return Err(Error::cardinality(ErrorCode::XPTY0004, "expected an xs:integer argument, got an empty sequence"));
    };
    let a = match a {
        XdmAtomicValue::UntypedAtomic(_) => cast_atomic(&a, AtomicType::Integer, &ValueContext::default())?,
        other => other,
    };
    a_as_i128(&a).ok_or_else(|| {
        Error::from_code(ErrorCode::XPTY0004, format!("expected an xs:integer argument, got {}", a.type_of()))
    })
}

/// XPath `round`: half toward positive infinity.
pub(super) fn round_half_up(x: f64) -> f64 {
    (x + 0.5).floor()
}

/// Optional collation argument; only the codepoint collation is supported.
pub(super) fn check_collation<N: XdmNode>(arg: Option<&XdmSequence<N>>) -> Result<(), Error> {
    let Some(seq) = arg else {
        return Ok(());
    };
    let uri = string_arg(seq)?;
    if uri == CODEPOINT_URI {
        Ok(())
    } else {
        Err(Error::from_code(ErrorCode::FOCH0002, format!("unsupported collation '{uri}'")))
    }
}
