//! Event dispatcher — hand-off point to the external publishing layer.

use tokio::sync::mpsc;
use tracing::debug;

use crate::payload::PayloadSnapshot;

/// Sender half of the consumer-facing channels.
///
/// Channels are bounded: the dispatcher never drops data, it applies
/// backpressure by awaiting capacity in the session task. The simulator
/// link, not this core, is the natural rate limiter.
pub struct EventDispatcher<R> {
    records: mpsc::Sender<R>,
    payloads: mpsc::Sender<PayloadSnapshot>,
}

impl<R> Clone for EventDispatcher<R> {
    fn clone(&self) -> Self {
        Self { records: self.records.clone(), payloads: self.payloads.clone() }
    }
}

impl<R> EventDispatcher<R> {
    /// Create the dispatcher and its paired receivers.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<R>, mpsc::Receiver<PayloadSnapshot>) {
        let (records, record_rx) = mpsc::channel(capacity);
        let (payloads, payload_rx) = mpsc::channel(capacity);
        (Self { records, payloads }, record_rx, payload_rx)
    }

    /// Publish one decoded record. Returns `false` when the consumer side
    /// is gone and the session should wind down.
    pub async fn publish_record(&self, record: R) -> bool {
        if self.records.send(record).await.is_err() {
            debug!("record receiver dropped");
            return false;
        }
        true
    }

    /// Publish one payload snapshot. Returns `false` when the consumer side
    /// is gone.
    pub async fn publish_payload(&self, snapshot: PayloadSnapshot) -> bool {
        if self.payloads.send(snapshot).await.is_err() {
            debug!("payload receiver dropped");
            return false;
        }
        true
    }
}
