use core::fmt;

use super::ExpandedName;

/// Built-in atomic types of the XDM type hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtomicType {
    AnyAtomic,
    UntypedAtomic,
    String,
    NormalizedString,
    Token,
    Language,
    NmToken,
    Name,
    NcName,
    Id,
    IdRef,
    Entity,
    Boolean,
    Decimal,
    Integer,
    NonPositiveInteger,
    NegativeInteger,
    Long,
    Int,
    Short,
    Byte,
    NonNegativeInteger,
    UnsignedLong,
    UnsignedInt,
    UnsignedShort,
    UnsignedByte,
    PositiveInteger,
    Float,
    Double,
    Duration,
    YearMonthDuration,
    DayTimeDuration,
    DateTime,
    Date,
    Time,
    GYearMonth,
    GYear,
    GMonthDay,
    GDay,
    GMonth,
    HexBinary,
    Base64Binary,
    AnyUri,
    QName,
    Notation,
}

const ALL: &[AtomicType] = &[
    AtomicType::AnyAtomic,
    AtomicType::UntypedAtomic,
    AtomicType::String,
    AtomicType::NormalizedString,
    AtomicType::Token,
    AtomicType::Language,
    AtomicType::NmToken,
    AtomicType::Name,
    AtomicType::NcName,
    AtomicType::Id,
    AtomicType::IdRef,
    AtomicType::Entity,
    AtomicType::Boolean,
    AtomicType::Decimal,
    AtomicType::Integer,
    AtomicType::NonPositiveInteger,
    AtomicType::NegativeInteger,
    AtomicType::Long,
    AtomicType::Int,
    AtomicType::Short,
    AtomicType::Byte,
    AtomicType::NonNegativeInteger,
    AtomicType::UnsignedLong,
    AtomicType::UnsignedInt,
    AtomicType::UnsignedShort,
    AtomicType::UnsignedByte,
    AtomicType::PositiveInteger,
    AtomicType::Float,
    AtomicType::Double,
    AtomicType::Duration,
    AtomicType::YearMonthDuration,
    AtomicType::DayTimeDuration,
    AtomicType::DateTime,
    AtomicType::Date,
    AtomicType::Time,
    AtomicType::GYearMonth,
    AtomicType::GYear,
    AtomicType::GMonthDay,
    AtomicType::GDay,
    AtomicType::GMonth,
    AtomicType::HexBinary,
    AtomicType::Base64Binary,
    AtomicType::AnyUri,
    AtomicType::QName,
    AtomicType::Notation,
];

impl AtomicType {
    pub fn local_name(self) -> &'static str {
        use AtomicType::*;
        match self {
            AnyAtomic => "anyAtomicType",
            UntypedAtomic => "untypedAtomic",
            String => "string",
            NormalizedString => "normalizedString",
            Token => "token",
            Language => "language",
            NmToken => "NMTOKEN",
            Name => "Name",
            NcName => "NCName",
            Id => "ID",
            IdRef => "IDREF",
            Entity => "ENTITY",
            Boolean => "boolean",
            Decimal => "decimal",
            Integer => "integer",
            NonPositiveInteger => "nonPositiveInteger",
            NegativeInteger => "negativeInteger",
            Long => "long",
            Int => "int",
            Short => "short",
            Byte => "byte",
            NonNegativeInteger => "nonNegativeInteger",
            UnsignedLong => "unsignedLong",
            UnsignedInt => "unsignedInt",
            UnsignedShort => "unsignedShort",
            UnsignedByte => "unsignedByte",
            PositiveInteger => "positiveInteger",
            Float => "float",
            Double => "double",
            Duration => "duration",
            YearMonthDuration => "yearMonthDuration",
            DayTimeDuration => "dayTimeDuration",
            DateTime => "dateTime",
            Date => "date",
            Time => "time",
            GYearMonth => "gYearMonth",
            GYear => "gYear",
            GMonthDay => "gMonthDay",
            GDay => "gDay",
            GMonth => "gMonth",
            HexBinary => "hexBinary",
            Base64Binary => "base64Binary",
            AnyUri => "anyURI",
            QName => "QName",
            Notation => "NOTATION",
        }
    }

    pub fn from_local(local: &str) -> Option<Self> {
        ALL.iter().copied().find(|t| t.local_name() == local)
    }

    /// Resolve a type name. Unqualified names are looked up in the XML Schema namespace.
    pub fn from_name(name: &ExpandedName) -> Option<Self> {
        match name.ns_uri.as_deref() {
            None | Some(crate::consts::XS) => Self::from_local(&name.local),
            Some(_) => None,
        }
    }

    pub fn name(self) -> ExpandedName {
        ExpandedName::xs(self.local_name())
    }

    /// Direct supertype; `None` only for `xs:anyAtomicType`.
    pub fn parent(self) -> Option<Self> {
        use AtomicType::*;
        Some(match self {
            AnyAtomic => return None,
            NormalizedString => String,
            Token => NormalizedString,
            Language | NmToken | Name => Token,
            NcName => Name,
            Id | IdRef | Entity => NcName,
            Integer => Decimal,
            NonPositiveInteger | Long | NonNegativeInteger => Integer,
            NegativeInteger => NonPositiveInteger,
            Int => Long,
            Short => Int,
            Byte => Short,
            UnsignedLong | PositiveInteger => NonNegativeInteger,
            UnsignedInt => UnsignedLong,
            UnsignedShort => UnsignedInt,
            UnsignedByte => UnsignedShort,
            YearMonthDuration | DayTimeDuration => Duration,
            _ => AnyAtomic,
        })
    }

    /// True if `self` is `other` or derives from it by restriction.
    pub fn derives_from(self, other: AtomicType) -> bool {
        let mut cur = Some(self);
        while let Some(t) = cur {
            if t == other {
                return true;
            }
            cur = t.parent();
        }
        false
    }

    /// The primitive ancestor (direct child of `xs:anyAtomicType`).
    pub fn primitive(self) -> Self {
        let mut cur = self;
        while let Some(p) = cur.parent() {
            if p == AtomicType::AnyAtomic {
                return cur;
            }
            cur = p;
        }
        cur
    }

    pub fn is_numeric(self) -> bool {
        matches!(self.primitive(), AtomicType::Decimal | AtomicType::Float | AtomicType::Double)
    }

    pub fn is_integer(self) -> bool {
        self.derives_from(AtomicType::Integer)
    }

    pub fn is_string_like(self) -> bool {
        self.derives_from(AtomicType::String)
    }

    /// Abstract types cannot be the target of a cast.
    pub fn is_abstract(self) -> bool {
        matches!(self, AtomicType::AnyAtomic | AtomicType::Notation)
    }

    /// Promotion rank within a family of mutually promotable types.
    ///
    /// Numeric tower: integer 0, decimal 1, float 2, double 3. Durations: the two
    /// totally ordered subtypes rank 0, the generic duration ranks 1. `None` for types
    /// that never promote.
    pub fn rank(self) -> Option<u8> {
        use AtomicType::*;
        match self {
            t if t.is_integer() => Some(0),
            Decimal => Some(1),
            Float => Some(2),
            Double => Some(3),
            YearMonthDuration | DayTimeDuration => Some(0),
            Duration => Some(1),
            _ => None,
        }
    }
}

impl fmt::Display for AtomicType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "xs:{}", self.local_name())
    }
}
