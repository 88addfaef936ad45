//! Sequence and value runtime for XPath 2.0-style evaluation.
//!
//! The crate provides the pieces an expression evaluator builds on:
//! - [`xdm`]: atomic values, items and the lazy, restartable sequence cursors.
//! - [`engine`]: operator dispatch with type promotion, cast/treat/instance-of
//!   coercion, node set algebra and the sequence function library.
//! - [`model`]: the node capability trait implemented by tree backends, plus a
//!   small in-memory tree ([`model::simple`]) for tests and prototypes.

pub mod consts;
pub mod engine;
pub mod model;
pub mod xdm;

pub use engine::coercion::{cast, castable, instance_of, treat};
pub use engine::comparison::{ComparisonOp, value_compare};
pub use engine::promotion::{ArithOp, arithmetic};
pub use engine::registry::FunctionRegistry;
pub use engine::runtime::{
    DynamicContext, DynamicContextBuilder, Error, ErrorCode, ErrorKind, ValueContext, ValueContextBuilder,
};
pub use engine::seqtype::{ItemType, NodeTest, Occurrence, SequenceType};
pub use engine::set_ops::{SetOrdering, except, intersect, union};
pub use model::simple::{SimpleNode, SimpleNodeBuilder, attr, comment, doc, elem, ns, pi, text};
pub use model::{NodeKind, NodeOrder, QName, XdmNode};
pub use xdm::{
    AtomicType, CursorState, ExpandedName, SequenceCursor, XdmAtomicValue, XdmItem, XdmItemResult, XdmSequence,
    XdmSequenceStream,
};
