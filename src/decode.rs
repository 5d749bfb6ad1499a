//! Value decoder — raw update batches into typed records.

use tracing::{trace, warn};

use crate::schema::{FieldSlot, Mutator, SchemaDefinition};
use crate::types::{BitWord, RawBatch, RawValue};
use crate::units::{convert, Converted};

/// Decode one raw batch into a fresh record.
///
/// Allocates a zero-valued destination, routes each update to the
/// descriptor(s) matching its wire key, converts per the unit table, and
/// writes through the typed mutators. Updates matching no descriptor are
/// dropped silently — the wire schema may be richer than the local one.
/// A per-field conversion failure is logged and leaves that field at its
/// zero value; it never aborts the rest of the batch.
///
/// Each call yields an independent value; previously published records are
/// never touched.
pub fn decode_batch<R: Default>(schema: &SchemaDefinition<R>, batch: &RawBatch) -> R {
    let mut record = R::default();

    for update in batch.iter() {
        let mut matched = false;
        for slot in schema.slots() {
            if !slot.descriptor.matches(&update.key) {
                continue;
            }
            matched = true;
            // The whole word never lands in the record, only its bits do.
            if slot.is_word() {
                continue;
            }
            apply(slot, &update.value, &mut record);
        }
        if !matched {
            trace!("Dropping update with no descriptor: {}", update.key);
        }
    }

    record
}

fn apply<R>(slot: &FieldSlot<R>, value: &RawValue, record: &mut R) {
    let Some(mutator) = slot.mutator else { return };

    if let Some(bit) = slot.bit {
        let Some(raw) = value.as_int() else {
            warn!(
                "Bit field '{}' expects an integer word, got {}; leaving zero value",
                slot.descriptor.name,
                value.kind()
            );
            return;
        };
        if let Mutator::Bool(set) = mutator {
            set(record, BitWord::from_raw(raw).is_set(bit));
        }
        return;
    }

    match convert(slot.descriptor.unit, value, mutator.target_kind()) {
        Ok(Converted::Int(v)) => {
            if let Mutator::Int(set) = mutator {
                set(record, v);
            }
        }
        Ok(Converted::Float(v)) => {
            if let Mutator::Float(set) = mutator {
                set(record, v);
            }
        }
        Ok(Converted::Bool(v)) => {
            if let Mutator::Bool(set) = mutator {
                set(record, v);
            }
        }
        Ok(Converted::Text(v)) => {
            if let Mutator::Text(set) = mutator {
                set(record, v);
            }
        }
        Err(error) => {
            warn!("Failed to set value for '{}': {}", slot.descriptor.name, error);
        }
    }
}
