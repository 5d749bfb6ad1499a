//! Fluent construction of schema definitions.

use tracing::debug;

use super::{FieldSlot, Mutator, SchemaDefinition};
use crate::error::Result;
use crate::types::{FieldDescriptor, RawType};
use crate::units::Unit;

/// Builder for [`SchemaDefinition`], registering one destination field at a
/// time. Fields the wire contract does not describe are simply never
/// registered; they keep their `Default` value on every decode.
pub struct SchemaBuilder<R> {
    name: String,
    slots: Vec<FieldSlot<R>>,
}

impl<R> SchemaBuilder<R> {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), slots: Vec::new() }
    }

    /// Register a field: wire descriptor plus typed destination mutator.
    pub fn field(mut self, descriptor: FieldDescriptor, mutator: Mutator<R>) -> Self {
        self.slots.push(FieldSlot { descriptor, mutator: Some(mutator), bit: None });
        self
    }

    /// Register an offset-mode field from a textual address.
    ///
    /// A non-parseable address degrades the field to "ignored" — it is
    /// logged and skipped, and extraction continues with the rest of the
    /// schema.
    pub fn offset_field(
        self,
        name: &str,
        address: &str,
        raw_type: RawType,
        size: usize,
        unit: impl Into<Option<Unit>>,
        mutator: Mutator<R>,
    ) -> Self {
        match FieldDescriptor::offset_str(name, address, raw_type, size, unit) {
            Some(descriptor) => self.field(descriptor, mutator),
            None => {
                debug!("Ignoring field '{}' with malformed address '{}'", name, address);
                self
            }
        }
    }

    /// Register a whole bit-packed word. The word is declared on the wire
    /// and consumed by the transport only; it is never written into the
    /// record.
    pub fn bits_word(mut self, descriptor: FieldDescriptor) -> Self {
        self.slots.push(FieldSlot { descriptor, mutator: None, bit: None });
        self
    }

    /// Register one decoded bit of a composite word as a boolean field.
    ///
    /// The descriptor must carry the same wire identity as the composite
    /// word registered via [`SchemaBuilder::bits_word`]; each bit decodes
    /// independently of every other.
    pub fn bit(
        mut self,
        descriptor: FieldDescriptor,
        bit: u32,
        set: fn(&mut R, bool),
    ) -> Self {
        self.slots.push(FieldSlot {
            descriptor,
            mutator: Some(Mutator::Bool(set)),
            bit: Some(bit),
        });
        self
    }

    /// Finish building, validating the table once at startup.
    pub fn build(self) -> Result<SchemaDefinition<R>> {
        let schema = SchemaDefinition::from_parts(self.name, self.slots);
        schema.validate()?;
        Ok(schema)
    }
}
