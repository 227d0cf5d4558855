//! Unit and dimension algebra

mod composite;
mod dimension;
pub mod registry;

pub use composite::{convert_amount, is_symbol_char, CompositeUnit, UnitFactor, MAX_UNIT_POWER};
pub use dimension::{BaseDimension, Dimension, BASE_DIMENSIONS};
pub use registry::{is_unit, lookup, UnitDef};
