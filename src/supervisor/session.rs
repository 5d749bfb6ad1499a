//! Session task — one connect-through-disconnect lifetime of a transport.

use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{ConnectionState, Liveness};
use crate::decode::decode_batch;
use crate::dispatch::EventDispatcher;
use crate::schema::{DeclareRequest, SchemaDefinition};
use crate::transport::{LinkSignal, Transport, TransportEvent, TransportFactory};
use crate::LinkError;

/// Why a session ended, as input to the supervisor's restart decision.
#[derive(Debug)]
pub(crate) enum SessionVerdict {
    /// Restartable end; the supervisor applies the retry policy.
    Continue(RestartReason),
    /// Fatal end; the supervisor surfaces the error and stops.
    Stop(LinkError),
}

#[derive(Debug)]
pub(crate) enum RestartReason {
    /// The simulated aircraft crashed.
    Crashed,
    /// The backend reported the link lost.
    LinkLost,
    /// The event sequence ended (link closed).
    StreamEnded,
    /// The session was cancelled from outside (watchdog or owner).
    Cancelled,
    /// The consumer dropped its receivers.
    ConsumerGone,
    /// A transient transport error.
    TransportError(LinkError),
}

impl std::fmt::Display for RestartReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RestartReason::Crashed => write!(f, "simulator crashed"),
            RestartReason::LinkLost => write!(f, "link lost"),
            RestartReason::StreamEnded => write!(f, "stream ended"),
            RestartReason::Cancelled => write!(f, "session cancelled"),
            RestartReason::ConsumerGone => write!(f, "consumer gone"),
            RestartReason::TransportError(e) => write!(f, "transport error: {e}"),
        }
    }
}

/// Run one session end-to-end: connect, declare, stream, decode, publish,
/// close. The session task is the sole owner of the transport and the only
/// writer of the liveness record.
///
/// The factory is returned with the verdict so the supervisor can reconnect.
pub(crate) async fn run_session<R, F>(
    mut factory: F,
    schema: Arc<SchemaDefinition<R>>,
    request: DeclareRequest,
    dispatcher: EventDispatcher<R>,
    liveness: Arc<Liveness>,
    state: Arc<watch::Sender<ConnectionState>>,
    cancel: CancellationToken,
) -> (F, SessionVerdict)
where
    R: Default + Send + 'static,
    F: TransportFactory,
{
    state.send_replace(ConnectionState::Connecting);

    let mut transport = tokio::select! {
        _ = cancel.cancelled() => {
            return (factory, SessionVerdict::Continue(RestartReason::Cancelled));
        }
        result = factory.connect() => match result {
            Ok(transport) => transport,
            Err(error) => return (factory, verdict_from_error(error)),
        },
    };

    let declared = tokio::select! {
        _ = cancel.cancelled() => {
            transport.close().await;
            return (factory, SessionVerdict::Continue(RestartReason::Cancelled));
        }
        result = transport.declare(&request) => result,
    };
    if let Err(error) = declared {
        transport.close().await;
        return (factory, verdict_from_error(error));
    }

    let verdict = loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Session cancelled");
                break SessionVerdict::Continue(RestartReason::Cancelled);
            }
            event = transport.next_event() => event,
        };

        match event {
            Ok(Some(TransportEvent::Signal(signal))) => match signal {
                LinkSignal::Ready => {
                    info!("Link ready, waiting for simulator");
                    state.send_replace(ConnectionState::AwaitingSimReady);
                }
                LinkSignal::SimRunning => {
                    info!("Simulator running, streaming");
                    liveness.set_connecting(false);
                    state.send_replace(ConnectionState::Streaming);
                }
                LinkSignal::Paused => {
                    debug!("Simulator paused");
                }
                LinkSignal::Crashed => {
                    warn!("Simulator crashed");
                    break SessionVerdict::Continue(RestartReason::Crashed);
                }
                LinkSignal::Lost => {
                    warn!("Link lost");
                    break SessionVerdict::Continue(RestartReason::LinkLost);
                }
            },
            Ok(Some(TransportEvent::Batch(batch))) => {
                liveness.touch();
                let record = decode_batch(schema.as_ref(), &batch);
                if !dispatcher.publish_record(record).await {
                    break SessionVerdict::Continue(RestartReason::ConsumerGone);
                }
            }
            Ok(Some(TransportEvent::Payload(snapshot))) => {
                liveness.touch();
                if !dispatcher.publish_payload(snapshot).await {
                    break SessionVerdict::Continue(RestartReason::ConsumerGone);
                }
            }
            Ok(None) => {
                info!("Transport stream ended");
                break SessionVerdict::Continue(RestartReason::StreamEnded);
            }
            Err(error) => break verdict_from_error(error),
        }
    };

    transport.close().await;
    (factory, verdict)
}

fn verdict_from_error(error: LinkError) -> SessionVerdict {
    if error.is_fatal() {
        SessionVerdict::Stop(error)
    } else {
        SessionVerdict::Continue(RestartReason::TransportError(error))
    }
}
