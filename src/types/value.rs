//! Raw update values as delivered by a transport backend.

use super::WireKey;

/// A structured geographic position delivered by the native subscription
/// backend for position-typed variables.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LatLonAlt {
    pub lat: f64,
    pub lon: f64,
    pub alt: f64,
}

impl std::fmt::Display for LatLonAlt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6},{:.6},{:.1}", self.lat, self.lon, self.alt)
    }
}

/// One raw value observed on the wire, before unit conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    Position(LatLonAlt),
}

impl RawValue {
    /// Short kind name used in conversion diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            RawValue::Int(_) => "integer",
            RawValue::Float(_) => "float",
            RawValue::Bool(_) => "bool",
            RawValue::Text(_) => "text",
            RawValue::Position(_) => "position",
        }
    }

    /// Integer view; integers only, no lossy coercion.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            RawValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric view; integers widen to float.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            RawValue::Float(v) => Some(*v),
            RawValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }
}

/// One observed change of one wire variable. Ephemeral; produced by a
/// transport backend, consumed by the decoder, then dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct RawUpdate {
    pub key: WireKey,
    pub value: RawValue,
}

impl RawUpdate {
    pub fn new(key: WireKey, value: RawValue) -> Self {
        Self { key, value }
    }
}

/// One batch of raw updates, delivered per observed tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawBatch {
    pub updates: Vec<RawUpdate>,
}

impl RawBatch {
    pub fn new(updates: Vec<RawUpdate>) -> Self {
        Self { updates }
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RawUpdate> {
        self.updates.iter()
    }
}

impl FromIterator<RawUpdate> for RawBatch {
    fn from_iter<I: IntoIterator<Item = RawUpdate>>(iter: I) -> Self {
        Self { updates: iter.into_iter().collect() }
    }
}
