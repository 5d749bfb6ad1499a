//! Unit conversion table.
//!
//! Pure functions mapping a raw wire value plus a unit tag to a physical
//! value. The numeric semantics are load-bearing — consumers calibrated
//! against the original offset encodings depend on the exact divisions,
//! truncations and roundings below, so every formula is reproduced literally:
//!
//! | unit | formula |
//! |---|---|
//! | knots | raw / 128 (integer division) |
//! | mach | raw / 2048 / 10 |
//! | degrees | raw * 360 / 65536² |
//! | raddeg | raw * 180 / π |
//! | GForce | raw / 624 |
//! | radio | (raw / 65536, integer division) * 3.28084, truncated |
//! | velocity | (raw / 65536, integer division) * 1.944, truncated |
//! | feet | round(raw * 3.28084) |
//! | ftm | (raw * 60) * 3.28084 / 256, truncated |
//! | bool | raw > 0 |
//! | percent | raw / 16384 * 100 |
//! | position | integer passthrough |
//! | (none) | numeric passthrough, widened to the destination kind |
//!
//! A conversion invoked against a value of the wrong underlying kind returns
//! an error; the decoder logs it and leaves the field at its zero value.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::RawValue;

const METERS_TO_FEET: f64 = 3.28084;
const MPS_TO_KNOTS: f64 = 1.944;

/// Unit tag selecting a conversion from the canonical table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Knots,
    Mach,
    Degrees,
    RadDeg,
    GForce,
    Radio,
    Velocity,
    Feet,
    /// Feet per minute (vertical speed).
    Ftm,
    Bool,
    Percent,
    Position,
    /// Bit-packed word; never converted directly, only per-bit.
    Bits,
}

impl Unit {
    /// Wire tag as carried by declarative schema sources.
    pub fn tag(&self) -> &'static str {
        match self {
            Unit::Knots => "knots",
            Unit::Mach => "mach",
            Unit::Degrees => "degrees",
            Unit::RadDeg => "raddeg",
            Unit::GForce => "GForce",
            Unit::Radio => "radio",
            Unit::Velocity => "velocity",
            Unit::Feet => "feet",
            Unit::Ftm => "ftm",
            Unit::Bool => "bool",
            Unit::Percent => "percent",
            Unit::Position => "position",
            Unit::Bits => "bits",
        }
    }
}

/// Destination field kind a conversion must produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Int,
    Float,
    Bool,
    Text,
}

impl TargetKind {
    pub fn name(&self) -> &'static str {
        match self {
            TargetKind::Int => "integer",
            TargetKind::Float => "float",
            TargetKind::Bool => "bool",
            TargetKind::Text => "text",
        }
    }
}

/// A converted value, shaped for exactly one destination kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Converted {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

/// Kind mismatch between a raw value and the conversion it was routed to.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unit '{unit}' cannot convert {found} into {target}")]
pub struct ConversionError {
    pub unit: &'static str,
    pub found: &'static str,
    pub target: &'static str,
}

impl ConversionError {
    fn new(unit: Option<Unit>, raw: &RawValue, target: TargetKind) -> Self {
        Self {
            unit: unit.map(|u| u.tag()).unwrap_or("none"),
            found: raw.kind(),
            target: target.name(),
        }
    }
}

/// Apply the conversion table entry for `unit` to one raw value.
///
/// Pure and total over the table: every `(unit, raw, target)` combination
/// either yields a value of the target kind or a [`ConversionError`].
pub fn convert(
    unit: Option<Unit>,
    raw: &RawValue,
    target: TargetKind,
) -> Result<Converted, ConversionError> {
    let err = || ConversionError::new(unit, raw, target);

    let converted = match unit {
        Some(Unit::Knots) => Converted::Int(raw.as_int().ok_or_else(err)? / 128),
        Some(Unit::Mach) => Converted::Float(raw.as_float().ok_or_else(err)? / 2048.0 / 10.0),
        Some(Unit::Degrees) => {
            Converted::Float(raw.as_float().ok_or_else(err)? * 360.0 / (65536.0 * 65536.0))
        }
        Some(Unit::RadDeg) => Converted::Float(raw.as_float().ok_or_else(err)? * 180.0 / PI),
        Some(Unit::GForce) => Converted::Float(raw.as_float().ok_or_else(err)? / 624.0),
        Some(Unit::Radio) => {
            // Integer division by 65536 happens before the meters-to-feet
            // scaling; changing the order changes the result.
            let whole = raw.as_int().ok_or_else(err)? / 65536;
            Converted::Int((whole as f64 * METERS_TO_FEET) as i64)
        }
        Some(Unit::Velocity) => {
            let whole = raw.as_int().ok_or_else(err)? / 65536;
            Converted::Int((whole as f64 * MPS_TO_KNOTS) as i64)
        }
        Some(Unit::Feet) => {
            let meters = match raw {
                RawValue::Float(v) => *v,
                _ => return Err(err()),
            };
            Converted::Int((meters * METERS_TO_FEET).round() as i64)
        }
        Some(Unit::Ftm) => {
            let per_second = raw.as_int().ok_or_else(err)?;
            Converted::Int((per_second as f64 * 60.0 * METERS_TO_FEET / 256.0) as i64)
        }
        Some(Unit::Bool) => match raw {
            RawValue::Int(v) => Converted::Bool(*v > 0),
            RawValue::Bool(v) => Converted::Bool(*v),
            _ => return Err(err()),
        },
        Some(Unit::Percent) => {
            Converted::Float(raw.as_float().ok_or_else(err)? / 16384.0 * 100.0)
        }
        Some(Unit::Position) => Converted::Int(raw.as_int().ok_or_else(err)?),
        Some(Unit::Bits) => return Err(err()),
        None => return passthrough(raw, target).ok_or_else(err),
    };

    reshape(converted, target).ok_or_else(err)
}

/// No unit tag: pass the raw value through, widened to the destination kind.
fn passthrough(raw: &RawValue, target: TargetKind) -> Option<Converted> {
    match (raw, target) {
        (RawValue::Float(v), TargetKind::Float) => Some(Converted::Float(*v)),
        (RawValue::Float(v), TargetKind::Int) => Some(Converted::Int(*v as i64)),
        (RawValue::Int(v), TargetKind::Int) => Some(Converted::Int(*v)),
        (RawValue::Int(v), TargetKind::Float) => Some(Converted::Float(*v as f64)),
        (RawValue::Bool(v), TargetKind::Bool) => Some(Converted::Bool(*v)),
        (RawValue::Text(v), TargetKind::Text) => Some(Converted::Text(v.clone())),
        (RawValue::Position(p), TargetKind::Text) => Some(Converted::Text(p.to_string())),
        _ => None,
    }
}

/// Reshape a converted numeric to the destination kind when the table entry's
/// natural output does not match it (an integer-table unit feeding a float
/// field, or vice versa). Non-numeric mismatches are errors.
fn reshape(converted: Converted, target: TargetKind) -> Option<Converted> {
    match (converted, target) {
        (Converted::Int(v), TargetKind::Int) => Some(Converted::Int(v)),
        (Converted::Int(v), TargetKind::Float) => Some(Converted::Float(v as f64)),
        (Converted::Float(v), TargetKind::Float) => Some(Converted::Float(v)),
        (Converted::Float(v), TargetKind::Int) => Some(Converted::Int(v as i64)),
        (Converted::Bool(v), TargetKind::Bool) => Some(Converted::Bool(v)),
        (Converted::Text(v), TargetKind::Text) => Some(Converted::Text(v)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn int(v: i64) -> RawValue {
        RawValue::Int(v)
    }

    fn float(v: f64) -> RawValue {
        RawValue::Float(v)
    }

    #[test]
    fn knots_uses_integer_division() {
        assert_eq!(convert(Some(Unit::Knots), &int(256), TargetKind::Int), Ok(Converted::Int(2)));
        // 300 / 128 truncates, it does not round
        assert_eq!(convert(Some(Unit::Knots), &int(300), TargetKind::Int), Ok(Converted::Int(2)));
        assert!(convert(Some(Unit::Knots), &float(256.0), TargetKind::Int).is_err());
    }

    #[test]
    fn mach_scales_raw_word() {
        assert_eq!(
            convert(Some(Unit::Mach), &int(16384), TargetKind::Float),
            Ok(Converted::Float(16384.0 / 2048.0 / 10.0))
        );
    }

    #[test]
    fn degrees_maps_full_word_to_circle() {
        // Half of the 32-bit range is half a turn
        assert_eq!(
            convert(Some(Unit::Degrees), &float(2147483648.0), TargetKind::Float),
            Ok(Converted::Float(180.0))
        );
    }

    #[test]
    fn raddeg_converts_radians() {
        let result = convert(Some(Unit::RadDeg), &float(std::f64::consts::PI), TargetKind::Float);
        match result {
            Ok(Converted::Float(v)) => assert!((v - 180.0).abs() < 1e-9),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn gforce_divides_by_624() {
        assert_eq!(
            convert(Some(Unit::GForce), &int(624), TargetKind::Float),
            Ok(Converted::Float(1.0))
        );
    }

    #[test]
    fn radio_divides_then_scales_then_truncates() {
        // 100 meters encoded as meters * 65536
        assert_eq!(
            convert(Some(Unit::Radio), &int(100 * 65536), TargetKind::Int),
            Ok(Converted::Int(328))
        );
        // The fractional part of the 65536 division is dropped first:
        // 99.999 m encodes to 6553534, 6553534/65536 = 99, 99*3.28084 = 324.8
        assert_eq!(
            convert(Some(Unit::Radio), &int(6_553_534), TargetKind::Int),
            Ok(Converted::Int(324))
        );
    }

    #[test]
    fn velocity_divides_then_scales_then_truncates() {
        assert_eq!(
            convert(Some(Unit::Velocity), &int(100 * 65536), TargetKind::Int),
            Ok(Converted::Int(194))
        );
    }

    #[test]
    fn feet_rounds_after_scaling() {
        assert_eq!(convert(Some(Unit::Feet), &float(100.0), TargetKind::Int), Ok(Converted::Int(328)));
        // 30 m = 98.4252 ft rounds down, 30.5 m = 100.06 ft rounds down to 100
        assert_eq!(convert(Some(Unit::Feet), &float(30.0), TargetKind::Int), Ok(Converted::Int(98)));
        assert!(convert(Some(Unit::Feet), &int(100), TargetKind::Int).is_err());
    }

    #[test]
    fn ftm_scales_per_minute() {
        // -5 m/s * 256 on the wire; (-1280 * 60) as float * 3.28084 / 256 = -984.25
        assert_eq!(
            convert(Some(Unit::Ftm), &int(-1280), TargetKind::Int),
            Ok(Converted::Int(-984))
        );
    }

    #[test]
    fn bool_is_strictly_positive() {
        assert_eq!(convert(Some(Unit::Bool), &int(1), TargetKind::Bool), Ok(Converted::Bool(true)));
        assert_eq!(convert(Some(Unit::Bool), &int(0), TargetKind::Bool), Ok(Converted::Bool(false)));
        assert_eq!(
            convert(Some(Unit::Bool), &int(-1), TargetKind::Bool),
            Ok(Converted::Bool(false))
        );
        assert!(convert(Some(Unit::Bool), &float(1.0), TargetKind::Bool).is_err());
    }

    #[test]
    fn percent_accepts_both_numeric_kinds() {
        assert_eq!(
            convert(Some(Unit::Percent), &int(8192), TargetKind::Float),
            Ok(Converted::Float(50.0))
        );
        assert_eq!(
            convert(Some(Unit::Percent), &float(16384.0), TargetKind::Float),
            Ok(Converted::Float(100.0))
        );
    }

    #[test]
    fn position_is_integer_passthrough() {
        assert_eq!(
            convert(Some(Unit::Position), &int(16383), TargetKind::Int),
            Ok(Converted::Int(16383))
        );
        assert!(convert(Some(Unit::Position), &float(1.0), TargetKind::Int).is_err());
    }

    #[test]
    fn bits_word_is_never_directly_convertible() {
        assert!(convert(Some(Unit::Bits), &int(0b1010), TargetKind::Int).is_err());
    }

    #[test]
    fn passthrough_widens_to_destination() {
        assert_eq!(convert(None, &int(42), TargetKind::Float), Ok(Converted::Float(42.0)));
        assert_eq!(convert(None, &float(42.9), TargetKind::Int), Ok(Converted::Int(42)));
        assert_eq!(
            convert(None, &RawValue::Text("Boeing 737-800".into()), TargetKind::Text),
            Ok(Converted::Text("Boeing 737-800".into()))
        );
        assert!(convert(None, &RawValue::Text("x".into()), TargetKind::Float).is_err());
    }

    #[test]
    fn integer_table_units_feed_float_destinations() {
        // A knots descriptor writing into a float field widens after the
        // table arithmetic, not before
        assert_eq!(
            convert(Some(Unit::Knots), &int(300), TargetKind::Float),
            Ok(Converted::Float(2.0))
        );
    }

    fn arb_raw() -> impl Strategy<Value = RawValue> {
        prop_oneof![
            any::<i64>().prop_map(RawValue::Int),
            any::<f64>().prop_map(RawValue::Float),
            any::<bool>().prop_map(RawValue::Bool),
            "[ -~]{0,12}".prop_map(RawValue::Text),
        ]
    }

    fn arb_unit() -> impl Strategy<Value = Option<Unit>> {
        prop::sample::select(vec![
            None,
            Some(Unit::Knots),
            Some(Unit::Mach),
            Some(Unit::Degrees),
            Some(Unit::RadDeg),
            Some(Unit::GForce),
            Some(Unit::Radio),
            Some(Unit::Velocity),
            Some(Unit::Feet),
            Some(Unit::Ftm),
            Some(Unit::Bool),
            Some(Unit::Percent),
            Some(Unit::Position),
            Some(Unit::Bits),
        ])
    }

    fn arb_target() -> impl Strategy<Value = TargetKind> {
        prop::sample::select(vec![
            TargetKind::Int,
            TargetKind::Float,
            TargetKind::Bool,
            TargetKind::Text,
        ])
    }

    proptest! {
        #[test]
        fn conversion_is_total_and_never_panics(
            raw in arb_raw(),
            unit in arb_unit(),
            target in arb_target()
        ) {
            // Every combination yields either a value of the requested kind
            // or an error; nothing panics
            match convert(unit, &raw, target) {
                Ok(Converted::Int(_)) => prop_assert_eq!(target, TargetKind::Int),
                Ok(Converted::Float(_)) => prop_assert_eq!(target, TargetKind::Float),
                Ok(Converted::Bool(_)) => prop_assert_eq!(target, TargetKind::Bool),
                Ok(Converted::Text(_)) => prop_assert_eq!(target, TargetKind::Text),
                Err(_) => {}
            }
        }

        #[test]
        fn knots_matches_reference_division(raw in any::<i64>()) {
            // Avoid i64::MIN / -1 style edge: division by 128 is always safe
            prop_assert_eq!(
                convert(Some(Unit::Knots), &RawValue::Int(raw), TargetKind::Int),
                Ok(Converted::Int(raw / 128))
            );
        }

        #[test]
        fn percent_stays_proportional(raw in 0i64..=16384) {
            let result = convert(Some(Unit::Percent), &RawValue::Int(raw), TargetKind::Float);
            match result {
                Ok(Converted::Float(v)) => {
                    prop_assert!((0.0..=100.0).contains(&v));
                }
                other => prop_assert!(false, "unexpected: {:?}", other),
            }
        }

        #[test]
        fn bool_tracks_sign(raw in any::<i64>()) {
            prop_assert_eq!(
                convert(Some(Unit::Bool), &RawValue::Int(raw), TargetKind::Bool),
                Ok(Converted::Bool(raw > 0))
            );
        }
    }
}
