//! Core types for telemetry link data representation.
//!
//! The type system maps directly to the wire model:
//! - [`FieldDescriptor`] is one observed offset or variable, independent of
//!   which transport backend supplies it
//! - [`WireKey`] is descriptor identity: `(name, index)` in variable mode,
//!   `address` in offset mode
//! - [`RawUpdate`] / [`RawBatch`] carry observed values from a backend to the
//!   decoder, one batch per tick
//! - [`BitWord`] handles bit-packed words whose individual bits decode into
//!   boolean destination fields

mod bits;
mod descriptor;
mod value;

pub use bits::BitWord;
pub use descriptor::{FieldDescriptor, RawType, WireKey};
pub use value::{LatLonAlt, RawBatch, RawUpdate, RawValue};
