//! Schema definitions mapping wire variables to typed record fields.
//!
//! A [`SchemaDefinition`] is the compile-time-built replacement for tag
//! reflection: an ordered table of [`FieldDescriptor`] entries, each paired
//! with a typed mutator writing the converted value into the destination
//! record. It is produced once by [`SchemaBuilder`], validated at startup,
//! and immutable afterward. The same table drives both directions:
//! [`SchemaDefinition::declare_request`] builds the wire declaration, and the
//! decoder routes raw updates back through the mutators.

mod builder;

pub use builder::SchemaBuilder;

use std::time::Duration;

use crate::error::Result;
use crate::payload::PayloadRequest;
use crate::types::{FieldDescriptor, WireKey};
use crate::units::TargetKind;
use crate::LinkError;

/// Typed write access to one destination field.
///
/// Plain function pointers keep the schema table `Copy`-cheap and free of
/// allocation; a non-capturing closure coerces directly.
pub enum Mutator<R> {
    Int(fn(&mut R, i64)),
    Float(fn(&mut R, f64)),
    Bool(fn(&mut R, bool)),
    Text(fn(&mut R, String)),
}

impl<R> Clone for Mutator<R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for Mutator<R> {}

impl<R> Mutator<R> {
    /// The value kind this mutator accepts.
    pub fn target_kind(&self) -> TargetKind {
        match self {
            Mutator::Int(_) => TargetKind::Int,
            Mutator::Float(_) => TargetKind::Float,
            Mutator::Bool(_) => TargetKind::Bool,
            Mutator::Text(_) => TargetKind::Text,
        }
    }
}

impl<R> std::fmt::Debug for Mutator<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Mutator::{:?}", self.target_kind())
    }
}

/// One schema entry: a wire descriptor plus its destination-field binding.
#[derive(Debug, Clone)]
pub struct FieldSlot<R> {
    pub descriptor: FieldDescriptor,
    /// `None` for whole bit-packed words, which are declared on the wire but
    /// never written into the record.
    pub mutator: Option<Mutator<R>>,
    /// Bit position within a composite word, for per-bit boolean fields.
    pub bit: Option<u32>,
}

impl<R> FieldSlot<R> {
    /// Whether this slot is a whole bits word (transport-only).
    pub fn is_word(&self) -> bool {
        self.bit.is_none() && self.descriptor.is_bits_word()
    }

    /// Whether this slot participates in the wire declare list. Per-bit
    /// fields are covered by their composite word and excluded.
    pub fn is_declared(&self) -> bool {
        self.bit.is_none()
    }
}

/// Immutable mapping between one record type and its wire variables.
#[derive(Debug, Clone)]
pub struct SchemaDefinition<R> {
    name: String,
    slots: Vec<FieldSlot<R>>,
}

impl<R> SchemaDefinition<R> {
    /// Start building a schema under a logical subscription name.
    pub fn builder(name: impl Into<String>) -> SchemaBuilder<R> {
        SchemaBuilder::new(name)
    }

    pub(crate) fn from_parts(name: String, slots: Vec<FieldSlot<R>>) -> Self {
        Self { name, slots }
    }

    /// Logical subscription name, echoed back by the offset service.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of schema entries, per-bit fields included.
    pub fn field_count(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn slots(&self) -> &[FieldSlot<R>] {
        &self.slots
    }

    /// The descriptors announced to the transport backend.
    pub fn declared_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.slots.iter().filter(|slot| slot.is_declared()).map(|slot| &slot.descriptor)
    }

    /// Build the wire declaration for this schema.
    pub fn declare_request(
        &self,
        interval: Duration,
        payload: Option<PayloadRequest>,
    ) -> DeclareRequest {
        DeclareRequest {
            name: self.name.clone(),
            fields: self.declared_fields().cloned().collect(),
            interval,
            payload,
        }
    }

    /// Startup validation of the built table.
    ///
    /// - every declared descriptor identity appears exactly once
    /// - every per-bit field has a matching composite word
    /// - bit positions fall inside the word's declared size
    pub fn validate(&self) -> Result<()> {
        let mut seen: Vec<&WireKey> = Vec::new();
        let keys: Vec<WireKey> = self.slots.iter().map(|s| s.descriptor.key()).collect();

        for (slot, key) in self.slots.iter().zip(&keys) {
            if !slot.is_declared() {
                continue;
            }
            if seen.contains(&key) {
                return Err(LinkError::schema(format!(
                    "duplicate descriptor for wire variable {key}"
                )));
            }
            seen.push(key);
        }

        for (slot, key) in self.slots.iter().zip(&keys) {
            let Some(bit) = slot.bit else { continue };
            let word = self
                .slots
                .iter()
                .find(|other| other.is_word() && other.descriptor.matches(key));
            let Some(word) = word else {
                return Err(LinkError::schema(format!(
                    "bit field '{}' has no composite bits word for {key}",
                    slot.descriptor.name
                )));
            };
            if let Some(size) = word.descriptor.size {
                if bit as usize >= size * 8 {
                    return Err(LinkError::schema(format!(
                        "bit {bit} of '{}' is outside its {size}-byte word",
                        slot.descriptor.name
                    )));
                }
            }
        }

        Ok(())
    }
}

/// The fully-resolved declaration handed to a transport backend.
#[derive(Debug, Clone)]
pub struct DeclareRequest {
    /// Logical subscription name used to correlate responses.
    pub name: String,
    /// Descriptors to announce, whole bits words included.
    pub fields: Vec<FieldDescriptor>,
    /// Requested poll interval.
    pub interval: Duration,
    /// Optional payload snapshot subscription.
    pub payload: Option<PayloadRequest>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RawType;
    use crate::units::Unit;

    #[derive(Debug, Default)]
    struct State {
        airspeed: i64,
        n1: f64,
        beacon: bool,
        landing: bool,
        title: String,
    }

    fn schema() -> SchemaDefinition<State> {
        SchemaDefinition::builder("aircraft_state")
            .offset_field(
                "Airspeed",
                "0x02BC",
                RawType::Int,
                4,
                Unit::Knots,
                Mutator::Int(|r: &mut State, v| r.airspeed = v),
            )
            .field(
                FieldDescriptor::variable("TURB ENG N1:index", Unit::Percent).with_index(1),
                Mutator::Float(|r: &mut State, v| r.n1 = v),
            )
            .field(
                FieldDescriptor::offset("Title", 0x3D00, RawType::String, 256, None),
                Mutator::Text(|r: &mut State, v| r.title = v),
            )
            .bits_word(FieldDescriptor::offset("Lights", 0x0D0C, RawType::Bits, 2, None))
            .bit(
                FieldDescriptor::offset("Lights", 0x0D0C, RawType::Bits, 2, None),
                1,
                |r: &mut State, v| r.beacon = v,
            )
            .bit(
                FieldDescriptor::offset("Lights", 0x0D0C, RawType::Bits, 2, None),
                2,
                |r: &mut State, v| r.landing = v,
            )
            .build()
            .expect("schema is valid")
    }

    #[test]
    fn declared_fields_exclude_bit_subfields() {
        let schema = schema();
        assert_eq!(schema.field_count(), 6);
        let declared: Vec<_> = schema.declared_fields().map(|d| d.name.clone()).collect();
        assert_eq!(declared, vec!["Airspeed", "TURB ENG N1:index", "Title", "Lights"]);
    }

    #[test]
    fn declare_request_carries_schema_name_and_interval() {
        let request = schema().declare_request(Duration::from_millis(250), None);
        assert_eq!(request.name, "aircraft_state");
        assert_eq!(request.interval, Duration::from_millis(250));
        assert_eq!(request.fields.len(), 4);
        assert!(request.payload.is_none());
    }

    #[test]
    fn duplicate_wire_identity_is_rejected() {
        let result = SchemaDefinition::<State>::builder("dup")
            .field(
                FieldDescriptor::offset("A", 0x0570, RawType::Int, 8, None),
                Mutator::Int(|r: &mut State, v| r.airspeed = v),
            )
            .field(
                FieldDescriptor::offset("B", 0x0570, RawType::Int, 8, None),
                Mutator::Int(|r: &mut State, v| r.airspeed = v),
            )
            .build();
        assert!(matches!(result, Err(LinkError::Schema { .. })));
    }

    #[test]
    fn repeated_instruments_are_distinct_identities() {
        let result = SchemaDefinition::<State>::builder("engines")
            .field(
                FieldDescriptor::variable("ENG COMBUSTION:index", Unit::Bool).with_index(1),
                Mutator::Bool(|r: &mut State, v| r.beacon = v),
            )
            .field(
                FieldDescriptor::variable("ENG COMBUSTION:index", Unit::Bool).with_index(2),
                Mutator::Bool(|r: &mut State, v| r.landing = v),
            )
            .build();
        assert!(result.is_ok());
    }

    #[test]
    fn bit_without_word_is_rejected() {
        let result = SchemaDefinition::<State>::builder("orphan")
            .bit(
                FieldDescriptor::offset("Lights", 0x0D0C, RawType::Bits, 2, None),
                3,
                |r: &mut State, v| r.beacon = v,
            )
            .build();
        assert!(matches!(result, Err(LinkError::Schema { .. })));
    }

    #[test]
    fn bit_outside_word_size_is_rejected() {
        let result = SchemaDefinition::<State>::builder("overflow")
            .bits_word(FieldDescriptor::offset("Flags", 0x0B6B, RawType::Bits, 1, None))
            .bit(
                FieldDescriptor::offset("Flags", 0x0B6B, RawType::Bits, 1, None),
                8,
                |r: &mut State, v| r.beacon = v,
            )
            .build();
        assert!(matches!(result, Err(LinkError::Schema { .. })));
    }
}
