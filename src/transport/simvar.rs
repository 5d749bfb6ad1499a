//! Variable-subscription adapter.
//!
//! Wraps a native in-process subscription mechanism (the simulator SDK's
//! variable API) behind the common [`Transport`] contract. The SDK binding
//! itself is an external collaborator abstracted behind [`VariableSource`];
//! this module only maps between the two vocabularies.

use std::collections::VecDeque;

use async_trait::async_trait;
use tracing::debug;

use super::{LinkSignal, Transport, TransportEvent};
use crate::error::Result;
use crate::schema::DeclareRequest;
use crate::types::{RawBatch, RawUpdate, RawValue, WireKey};
use crate::units::Unit;

/// One variable subscription handed to the native backend.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableRequest {
    pub name: String,
    pub index: u32,
    pub unit: Option<Unit>,
    pub settable: bool,
}

/// One observed variable change from the native backend.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableUpdate {
    pub name: String,
    pub index: u32,
    pub value: RawValue,
}

/// Events surfaced by a native subscription handle.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    /// The simulator confirmed it is running.
    SimRunning,
    /// The simulator was paused.
    Paused,
    /// The simulated aircraft crashed.
    Crashed,
    /// One tick of observed variable values.
    Values(Vec<VariableUpdate>),
}

/// Capability contract of the native variable-subscription mechanism.
#[async_trait]
pub trait VariableSource: Send {
    /// Subscribe to the given variables; delivery starts afterwards.
    async fn subscribe(&mut self, vars: Vec<VariableRequest>) -> Result<()>;

    /// Next event from the subscription; `Ok(None)` when the handle closed.
    async fn next(&mut self) -> Result<Option<SourceEvent>>;

    /// Best-effort close of the handle.
    async fn close(&mut self);
}

/// Transport backend over a native [`VariableSource`].
pub struct SimVarTransport<S> {
    source: S,
    pending: VecDeque<TransportEvent>,
}

impl<S: VariableSource> SimVarTransport<S> {
    pub fn new(source: S) -> Self {
        Self { source, pending: VecDeque::new() }
    }
}

#[async_trait]
impl<S: VariableSource> Transport for SimVarTransport<S> {
    async fn declare(&mut self, request: &DeclareRequest) -> Result<()> {
        let vars: Vec<VariableRequest> = request
            .fields
            .iter()
            .filter(|field| {
                // Offset-mode descriptors have no meaning to the variable API
                if field.address.is_some() {
                    debug!("Skipping offset-mode field '{}'", field.name);
                    return false;
                }
                true
            })
            .map(|field| VariableRequest {
                name: field.name.clone(),
                index: field.index,
                unit: field.unit,
                settable: field.settable,
            })
            .collect();

        if request.payload.is_some() {
            debug!("payload subscription is not supported by the variable backend");
        }

        self.source.subscribe(vars).await?;
        // Subscription acceptance is the ready edge for this backend
        self.pending.push_back(TransportEvent::Signal(LinkSignal::Ready));
        Ok(())
    }

    async fn next_event(&mut self) -> Result<Option<TransportEvent>> {
        if let Some(event) = self.pending.pop_front() {
            return Ok(Some(event));
        }

        let event = match self.source.next().await? {
            None => return Ok(None),
            Some(SourceEvent::SimRunning) => TransportEvent::Signal(LinkSignal::SimRunning),
            Some(SourceEvent::Paused) => TransportEvent::Signal(LinkSignal::Paused),
            Some(SourceEvent::Crashed) => TransportEvent::Signal(LinkSignal::Crashed),
            Some(SourceEvent::Values(values)) => {
                let updates = values
                    .into_iter()
                    .map(|update| {
                        RawUpdate::new(
                            WireKey::Variable { name: update.name, index: update.index },
                            update.value,
                        )
                    })
                    .collect();
                TransportEvent::Batch(RawBatch::new(updates))
            }
        };

        Ok(Some(event))
    }

    async fn close(&mut self) {
        self.source.close().await;
    }
}
