//! Resilient, schema-driven Rust library for flight-simulator telemetry.
//!
//! Airlink bridges a live flight-simulator process to application code: it
//! declares which simulator variables or memory offsets to observe, keeps a
//! long-lived subscription session alive across an unreliable link, decodes
//! raw updates into strongly-typed records with physical-unit conversions,
//! and republishes them as discrete events.
//!
//! # Features
//!
//! - **Typed schemas**: explicit, builder-constructed field tables validated
//!   at startup — no runtime reflection
//! - **Unit conversions**: the canonical offset-encoding table (knots, mach,
//!   radio altitude, percent, bit-packed words, ...)
//! - **Session resilience**: supervised connect/stream/restart lifecycle
//!   with a staleness watchdog and a bounded retry budget
//! - **Backend-neutral**: one transport contract, offset-protocol and
//!   variable-subscription adapters included
//!
//! # Quick start
//!
//! Describe a record type once, then decode raw batches into it:
//!
//! ```rust
//! use airlink::{
//!     decode_batch, Mutator, RawBatch, RawType, RawUpdate, RawValue,
//!     SchemaDefinition, Unit, WireKey,
//! };
//!
//! #[derive(Debug, Default)]
//! struct AircraftState {
//!     airspeed: i64,
//!     on_ground: bool,
//! }
//!
//! let schema = SchemaDefinition::builder("aircraft_state")
//!     .offset_field(
//!         "Airspeed", "0x02BC", RawType::Int, 4, Unit::Knots,
//!         Mutator::Int(|r: &mut AircraftState, v| r.airspeed = v),
//!     )
//!     .offset_field(
//!         "OnGround", "0x0366", RawType::Uint, 2, Unit::Bool,
//!         Mutator::Bool(|r: &mut AircraftState, v| r.on_ground = v),
//!     )
//!     .build()
//!     .expect("valid schema");
//!
//! let batch = RawBatch::new(vec![
//!     RawUpdate::new(WireKey::Offset { address: 0x02BC }, RawValue::Int(256)),
//!     RawUpdate::new(WireKey::Offset { address: 0x0366 }, RawValue::Int(1)),
//! ]);
//!
//! let state = decode_batch(&schema, &batch);
//! assert_eq!(state.airspeed, 2);
//! assert!(state.on_ground);
//! ```
//!
//! For live tracking, hand the schema and a [`TransportFactory`] to
//! [`Supervisor::spawn`] (or the [`Airlink`] facade) and consume the
//! returned [`LinkChannels`]. See the `demos/` directory for an end-to-end
//! example against a scripted wire.

// Core types and error handling
pub mod catalog;
mod decode;
mod dispatch;
mod error;
pub mod payload;
pub mod schema;
pub mod types;
pub mod units;

// Session-resilience architecture
pub mod supervisor;
pub mod transport;

// Core exports
pub use decode::decode_batch;
pub use dispatch::EventDispatcher;
pub use error::{LinkError, Result};
pub use payload::{FuelTank, PayloadRequest, PayloadSnapshot, PayloadStation};
pub use schema::{DeclareRequest, Mutator, SchemaBuilder, SchemaDefinition};
pub use types::{
    BitWord, FieldDescriptor, LatLonAlt, RawBatch, RawType, RawUpdate, RawValue, WireKey,
};
pub use units::{convert, Converted, TargetKind, Unit};

// Supervision exports
pub use supervisor::{
    ConnectionState, LinkChannels, LinkHandle, RetryBudget, Supervisor, SupervisorConfig,
};
pub use transport::{LinkSignal, Transport, TransportEvent, TransportFactory};

use std::sync::Arc;

/// Unified entry point for supervised telemetry links.
///
/// Thin facade over [`Supervisor::spawn`]; useful when the call site wants a
/// single obvious name to start from.
///
/// ```rust,no_run
/// # use std::sync::Arc;
/// # use std::time::Duration;
/// # fn demo<F: airlink::TransportFactory>(factory: F) {
/// # #[derive(Default)] struct AircraftState;
/// # let schema: Arc<airlink::SchemaDefinition<AircraftState>> = Arc::new(
/// #     airlink::SchemaDefinition::builder("aircraft_state").build().unwrap());
/// let request = schema.declare_request(Duration::from_millis(250), None);
/// let link = airlink::Airlink::track(
///     factory,
///     schema,
///     request,
///     airlink::SupervisorConfig::default(),
/// );
/// # }
/// ```
pub struct Airlink;

impl Airlink {
    /// Start tracking: spawn a supervised link and return its channels.
    pub fn track<R, F>(
        factory: F,
        schema: Arc<SchemaDefinition<R>>,
        request: DeclareRequest,
        config: SupervisorConfig,
    ) -> LinkChannels<R>
    where
        R: Default + Send + 'static,
        F: TransportFactory,
    {
        Supervisor::spawn(factory, schema, request, config)
    }
}
