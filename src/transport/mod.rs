//! Transport adapter interface.
//!
//! A transport backend owns one connection to the simulator link and exposes
//! exactly four capabilities: declare the variables/offsets of interest,
//! stream raw update batches, signal lifecycle changes, and close. The
//! supervisor and decoder consume this interface only; no backend is
//! special-cased behind it.
//!
//! Two realizations ship with the crate: [`offset::OffsetTransport`] speaks
//! the JSON offset protocol over a caller-supplied duplex link, and
//! [`simvar::SimVarTransport`] wraps a native variable-subscription handle.

pub mod offset;
pub mod simvar;

use async_trait::async_trait;

use crate::error::Result;
use crate::payload::PayloadSnapshot;
use crate::schema::DeclareRequest;
use crate::types::RawBatch;

/// Discrete lifecycle signals a backend reports alongside data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkSignal {
    /// The link is established and the declaration was accepted.
    Ready,
    /// The simulator itself is confirmed running; streaming begins.
    SimRunning,
    /// The simulator is paused; the session stays up.
    Paused,
    /// The simulated aircraft crashed; the session restarts.
    Crashed,
    /// The underlying link was lost.
    Lost,
}

/// One item from a backend's event sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Signal(LinkSignal),
    Batch(RawBatch),
    Payload(PayloadSnapshot),
}

/// Capability contract required of any backend.
#[async_trait]
pub trait Transport: Send {
    /// Announce the set of variables/offsets of interest at the requested
    /// poll interval, including the optional payload subscription.
    async fn declare(&mut self, request: &DeclareRequest) -> Result<()>;

    /// Next event in the sequence: a raw batch, a payload snapshot, or a
    /// lifecycle signal. `Ok(None)` means the underlying link closed
    /// normally. Cancellable from the outside via `tokio::select!`.
    async fn next_event(&mut self) -> Result<Option<TransportEvent>>;

    /// Best-effort graceful shutdown; safe to call after the sequence has
    /// already ended.
    async fn close(&mut self);
}

/// Produces one connected [`Transport`] per supervised session.
#[async_trait]
pub trait TransportFactory: Send + 'static {
    type Transport: Transport;

    /// Establish a fresh connection to the simulator link.
    async fn connect(&mut self) -> Result<Self::Transport>;
}
