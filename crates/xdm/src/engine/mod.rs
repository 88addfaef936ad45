pub mod atomize;
pub mod casting;
pub mod coercion;
pub mod comparison;
pub mod functions;
pub mod node_ops;
pub(crate) mod numeric;
pub mod promotion;
pub mod regex;
pub mod registry;
pub mod runtime;
pub mod seqtype;
pub mod set_ops;
pub(crate) mod temporal;
pub mod type_check;
pub(crate) mod xml_helpers;
