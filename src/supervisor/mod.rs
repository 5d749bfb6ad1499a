//! Connection supervisor — keeps a subscription session alive.
//!
//! The supervisor owns the session lifecycle: connect → wait-ready → stream
//! → detect staleness/crash → tear down → retry under a bounded budget.
//! Three tasks cooperate through channels and one cancellation token per
//! session:
//!
//! - the **session task** owns the transport end-to-end and is the only
//!   writer of the [`Liveness`] record
//! - the **watchdog task** reads liveness on a fixed tick and cancels the
//!   session when it goes stale; it performs no I/O
//! - the **supervisor task** joins both, then decides between a budgeted
//!   restart (`Continue`) and a terminal stop (`Stop`)
//!
//! Transient failures are absorbed here; the owner sees either a steady
//! stream of records or exactly one terminal failure.

mod liveness;
mod session;

pub use liveness::{Liveness, WatchdogConfig};

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::dispatch::EventDispatcher;
use crate::payload::PayloadSnapshot;
use crate::schema::{DeclareRequest, SchemaDefinition};
use crate::transport::TransportFactory;
use crate::LinkError;
use session::{run_session, RestartReason, SessionVerdict};

/// Connection lifecycle state, owned exclusively by the supervisor.
///
/// Observed (never driven) by the owner through [`LinkChannels::states`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    AwaitingSimReady,
    Streaming,
    Faulted,
}

/// Bounded retry budget.
///
/// Every failure-triggered restart consumes one try; a clean, owner-requested
/// restart refills the budget. At zero the supervisor stops permanently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    remaining: u32,
    initial: u32,
}

impl RetryBudget {
    pub fn new(initial: u32) -> Self {
        Self { remaining: initial, initial }
    }

    /// Consume one try for a failure-triggered restart.
    pub fn consume(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
    }

    /// Refill after a clean cancellation; an operator-initiated restart is
    /// not a fault.
    pub fn reset(&mut self) {
        self.remaining = self.initial;
    }

    pub fn exhausted(&self) -> bool {
        self.remaining == 0
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn initial(&self) -> u32 {
        self.initial
    }
}

/// Supervision parameters.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Retry budget for failure-triggered restarts.
    pub tries: u32,
    /// Watchdog check interval.
    pub watchdog_tick: Duration,
    /// Staleness bound while streaming.
    pub stale_after: Duration,
    /// Bound on an unconfirmed connect.
    pub connect_deadline: Duration,
    /// Pause between failure-triggered restarts.
    pub restart_backoff: Duration,
    /// Capacity of the record and payload channels.
    pub channel_capacity: usize,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            tries: 3,
            watchdog_tick: Duration::from_secs(1),
            stale_after: Duration::from_secs(15),
            connect_deadline: Duration::from_secs(60),
            restart_backoff: Duration::from_secs(2),
            channel_capacity: 64,
        }
    }
}

impl SupervisorConfig {
    fn watchdog(&self) -> WatchdogConfig {
        WatchdogConfig {
            tick: self.watchdog_tick,
            stale_after: self.stale_after,
            connect_deadline: self.connect_deadline,
        }
    }
}

/// Owner-side commands.
#[derive(Debug)]
enum Command {
    Restart,
    Shutdown,
}

/// Handle for owner-initiated control of a running supervisor.
///
/// Dropping every clone of the handle is treated as a shutdown request.
#[derive(Debug, Clone)]
pub struct LinkHandle {
    commands: mpsc::Sender<Command>,
}

impl LinkHandle {
    /// Request a clean session restart. Resets the retry budget; an
    /// operator-initiated restart is not a fault.
    pub async fn restart(&self) {
        let _ = self.commands.send(Command::Restart).await;
    }

    /// Request a clean, terminal shutdown. No failure is signalled.
    pub async fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown).await;
    }
}

/// Consumer-facing side of a supervised link.
pub struct LinkChannels<R> {
    /// Decoded telemetry records, one per raw batch, in arrival order.
    pub records: mpsc::Receiver<R>,
    /// Payload snapshots, decoded independently of the telemetry schema.
    pub payloads: mpsc::Receiver<PayloadSnapshot>,
    /// Carries exactly one terminal error, after which no more data arrives.
    pub failures: mpsc::Receiver<LinkError>,
    /// Live view of the connection state.
    pub states: watch::Receiver<ConnectionState>,
    /// Control handle.
    pub handle: LinkHandle,
}

impl<R> LinkChannels<R> {
    /// Connection state changes as a stream. A fresh `Streaming` edge is an
    /// epoch boundary: record ordering is only guaranteed within a session.
    pub fn state_stream(&self) -> WatchStream<ConnectionState> {
        WatchStream::new(self.states.clone())
    }
}

/// Supervisor spawns and manages the session and watchdog tasks.
pub struct Supervisor;

impl Supervisor {
    /// Spawn a supervised link for the given transport factory and schema.
    ///
    /// Returns the consumer-facing channels; the supervision loop runs until
    /// shutdown, a fatal error, or budget exhaustion.
    pub fn spawn<R, F>(
        factory: F,
        schema: Arc<SchemaDefinition<R>>,
        request: DeclareRequest,
        config: SupervisorConfig,
    ) -> LinkChannels<R>
    where
        R: Default + Send + 'static,
        F: TransportFactory,
    {
        let (dispatcher, record_rx, payload_rx) =
            EventDispatcher::channel(config.channel_capacity);
        let (failure_tx, failure_rx) = mpsc::channel(1);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (command_tx, command_rx) = mpsc::channel(4);

        tokio::spawn(supervisor_task(
            factory,
            schema,
            request,
            config,
            dispatcher,
            failure_tx,
            Arc::new(state_tx),
            command_rx,
        ));

        LinkChannels {
            records: record_rx,
            payloads: payload_rx,
            failures: failure_rx,
            states: state_rx,
            handle: LinkHandle { commands: command_tx },
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn supervisor_task<R, F>(
    mut factory: F,
    schema: Arc<SchemaDefinition<R>>,
    request: DeclareRequest,
    config: SupervisorConfig,
    dispatcher: EventDispatcher<R>,
    failures: mpsc::Sender<LinkError>,
    state: Arc<watch::Sender<ConnectionState>>,
    mut commands: mpsc::Receiver<Command>,
) where
    R: Default + Send + 'static,
    F: TransportFactory,
{
    let mut budget = RetryBudget::new(config.tries);
    let liveness = Arc::new(Liveness::new());

    info!("Supervisor started for '{}' ({} tries)", request.name, budget.initial());

    loop {
        // Reset liveness before either sub-task exists, so the new watchdog
        // cannot act on the previous session's timestamps
        liveness.begin_session();

        let cancel = CancellationToken::new();
        let watchdog = tokio::spawn(liveness::watchdog(
            Arc::clone(&liveness),
            cancel.clone(),
            config.watchdog(),
        ));
        let mut session = tokio::spawn(run_session(
            factory,
            Arc::clone(&schema),
            request.clone(),
            dispatcher.clone(),
            Arc::clone(&liveness),
            Arc::clone(&state),
            cancel.clone(),
        ));

        let mut clean_restart = false;
        let mut shutting_down = false;

        // Wait for the session to finish, reacting to owner commands. Once a
        // command fired the token, only the join remains of interest.
        let joined = loop {
            if clean_restart || shutting_down {
                break (&mut session).await;
            }
            tokio::select! {
                joined = &mut session => break joined,
                command = commands.recv() => match command {
                    Some(Command::Restart) => {
                        info!("Owner requested restart");
                        clean_restart = true;
                        cancel.cancel();
                    }
                    Some(Command::Shutdown) | None => {
                        info!("Owner requested shutdown");
                        shutting_down = true;
                        cancel.cancel();
                    }
                },
            }
        };

        // Both sub-tasks must be done before the restart decision
        cancel.cancel();
        let _ = watchdog.await;
        state.send_replace(ConnectionState::Disconnected);

        let verdict = match joined {
            Ok((returned_factory, verdict)) => {
                factory = returned_factory;
                verdict
            }
            Err(join_error) => {
                error!("Session task failed: {}", join_error);
                state.send_replace(ConnectionState::Faulted);
                let _ = failures
                    .send(LinkError::TaskFailed { reason: join_error.to_string() })
                    .await;
                return;
            }
        };

        if shutting_down {
            info!("Supervisor stopped by owner");
            return;
        }

        match verdict {
            SessionVerdict::Stop(fatal) => {
                error!("Fatal session error: {}", fatal);
                state.send_replace(ConnectionState::Faulted);
                let _ = failures.send(fatal).await;
                return;
            }
            SessionVerdict::Continue(RestartReason::ConsumerGone) => {
                debug!("All consumers dropped; stopping supervisor");
                return;
            }
            SessionVerdict::Continue(reason) => {
                if clean_restart {
                    budget.reset();
                    info!("Clean restart, budget reset to {}", budget.remaining());
                    continue;
                }

                budget.consume();
                warn!("Session ended ({}), {} tries remaining", reason, budget.remaining());

                if budget.exhausted() {
                    error!("Retry budget exhausted after {} tries", budget.initial());
                    state.send_replace(ConnectionState::Faulted);
                    let _ = failures
                        .send(LinkError::RetriesExhausted { tries: budget.initial() })
                        .await;
                    return;
                }

                // Back off before reconnecting, still honoring owner commands
                tokio::select! {
                    _ = tokio::time::sleep(config.restart_backoff) => {}
                    command = commands.recv() => match command {
                        Some(Command::Restart) => budget.reset(),
                        Some(Command::Shutdown) | None => {
                            info!("Supervisor stopped by owner");
                            return;
                        }
                    },
                }
            }
        }
    }
}
