//! Field descriptors — the wire-level identity of one observed quantity.

use serde::{Deserialize, Serialize};

use crate::units::Unit;

/// Identity of a variable or offset on the wire.
///
/// Two descriptors refer to the same wire variable iff their keys are equal:
/// `(name, index)` in variable mode, `address` in offset mode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WireKey {
    /// A named, possibly indexed simulator variable (subscription mode).
    Variable { name: String, index: u32 },
    /// A fixed memory offset in the simulator's telemetry block.
    Offset { address: u32 },
}

impl std::fmt::Display for WireKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WireKey::Variable { name, index: 0 } => write!(f, "{name}"),
            WireKey::Variable { name, index } => write!(f, "{name}:{index}"),
            WireKey::Offset { address } => write!(f, "{address:#06X}"),
        }
    }
}

/// Primitive type of an offset as declared to the offset service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RawType {
    Int,
    Uint,
    Float,
    String,
    /// Bit-packed word; only individual sub-bits are ever decoded.
    Bits,
}

impl RawType {
    /// Wire tag used by the offset protocol's `type` field.
    pub fn tag(&self) -> &'static str {
        match self {
            RawType::Int => "int",
            RawType::Uint => "uint",
            RawType::Float => "float",
            RawType::String => "string",
            RawType::Bits => "bits",
        }
    }
}

/// One observed offset or variable, independent of the transport backend.
///
/// Built once by the schema builder and immutable afterward.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// Wire name (variable name, or the logical name the offset service
    /// echoes back in its `data` map).
    pub name: String,
    /// Unit conversion applied on decode; `None` is numeric passthrough.
    pub unit: Option<Unit>,
    /// Repeat-group discriminator (engine 1..4 share a name).
    pub index: u32,
    /// Memory address, offset mode only.
    pub address: Option<u32>,
    /// Primitive wire type, offset mode only.
    pub raw_type: Option<RawType>,
    /// Size in bytes, offset mode only.
    pub size: Option<usize>,
    /// Whether the backend may write this quantity back to the simulator.
    pub settable: bool,
}

impl FieldDescriptor {
    /// Descriptor for a named simulator variable.
    pub fn variable(name: impl Into<String>, unit: impl Into<Option<Unit>>) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
            index: 0,
            address: None,
            raw_type: None,
            size: None,
            settable: false,
        }
    }

    /// Descriptor for a memory offset.
    pub fn offset(
        name: impl Into<String>,
        address: u32,
        raw_type: RawType,
        size: usize,
        unit: impl Into<Option<Unit>>,
    ) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
            index: 0,
            address: Some(address),
            raw_type: Some(raw_type),
            size: Some(size),
            settable: false,
        }
    }

    /// Descriptor for a memory offset with a textual address, as carried by
    /// declarative schema sources (`"0x02BC"`). Returns `None` when the
    /// address does not parse; callers degrade the field to "ignored" rather
    /// than aborting extraction.
    pub fn offset_str(
        name: impl Into<String>,
        address: &str,
        raw_type: RawType,
        size: usize,
        unit: impl Into<Option<Unit>>,
    ) -> Option<Self> {
        let parsed = parse_address(address)?;
        Some(Self::offset(name, parsed, raw_type, size, unit))
    }

    /// Set the repeat-group index (engine 1..4).
    pub fn with_index(mut self, index: u32) -> Self {
        self.index = index;
        self
    }

    /// Mark the quantity writable by the backend.
    pub fn settable(mut self) -> Self {
        self.settable = true;
        self
    }

    /// Wire identity used for declare-time dedup and decode-time matching.
    pub fn key(&self) -> WireKey {
        match self.address {
            Some(address) => WireKey::Offset { address },
            None => WireKey::Variable { name: self.name.clone(), index: self.index },
        }
    }

    /// Whether a raw update with `key` belongs to this descriptor.
    pub fn matches(&self, key: &WireKey) -> bool {
        match (self.address, key) {
            (Some(address), WireKey::Offset { address: other }) => address == *other,
            (None, WireKey::Variable { name, index }) => {
                self.name == *name && self.index == *index
            }
            _ => false,
        }
    }

    /// Whether this descriptor is a whole bit-packed word.
    pub fn is_bits_word(&self) -> bool {
        self.raw_type == Some(RawType::Bits) || self.unit == Some(Unit::Bits)
    }
}

/// Parse a decimal or `0x`-prefixed hexadecimal offset address.
fn parse_address(text: &str) -> Option<u32> {
    let text = text.trim();
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).ok()
    } else {
        text.parse().ok()
    }
}
