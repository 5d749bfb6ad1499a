//! Liveness tracking and the watchdog task.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::{interval, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Freshness state of the current session.
///
/// During a session, written only by the session task and read by the
/// watchdog; the supervisor resets it at session boundaries while neither
/// sub-task is alive. Relaxed atomics are sufficient: reads may be stale by
/// one tick, which only delays a cancellation decision by one watchdog
/// interval.
#[derive(Debug)]
pub struct Liveness {
    epoch: Instant,
    /// Milliseconds since `epoch` of the last received message, plus one.
    /// Zero means no message this session.
    last_message_ms: AtomicU64,
    /// Milliseconds since `epoch` at which the current session began.
    session_start_ms: AtomicU64,
    connect_in_progress: AtomicBool,
}

impl Liveness {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            last_message_ms: AtomicU64::new(0),
            session_start_ms: AtomicU64::new(0),
            connect_in_progress: AtomicBool::new(false),
        }
    }

    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    /// Mark the start of a new session: clears the last-message mark and
    /// raises the connect flag.
    pub fn begin_session(&self) {
        self.session_start_ms.store(self.now_ms(), Ordering::Relaxed);
        self.last_message_ms.store(0, Ordering::Relaxed);
        self.connect_in_progress.store(true, Ordering::Relaxed);
    }

    /// Record receipt of a message.
    pub fn touch(&self) {
        self.last_message_ms.store(self.now_ms() + 1, Ordering::Relaxed);
    }

    pub fn set_connecting(&self, connecting: bool) {
        self.connect_in_progress.store(connecting, Ordering::Relaxed);
    }

    pub fn connecting(&self) -> bool {
        self.connect_in_progress.load(Ordering::Relaxed)
    }

    /// Time since the last message, measured from session start when no
    /// message has arrived yet.
    pub fn idle(&self) -> Duration {
        let last = match self.last_message_ms.load(Ordering::Relaxed) {
            0 => self.session_start_ms.load(Ordering::Relaxed),
            ms => ms - 1,
        };
        Duration::from_millis(self.now_ms().saturating_sub(last))
    }

    /// Time since the current session began.
    pub fn since_session_start(&self) -> Duration {
        let start = self.session_start_ms.load(Ordering::Relaxed);
        Duration::from_millis(self.now_ms().saturating_sub(start))
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

/// Watchdog thresholds.
#[derive(Debug, Clone, Copy)]
pub struct WatchdogConfig {
    /// Fixed check interval.
    pub tick: Duration,
    /// Staleness bound while streaming.
    pub stale_after: Duration,
    /// Bound on how long a connect may remain unconfirmed.
    pub connect_deadline: Duration,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(1),
            stale_after: Duration::from_secs(15),
            connect_deadline: Duration::from_secs(60),
        }
    }
}

/// Watchdog task: reads liveness on a fixed tick and cancels the session on
/// a breach. Performs no I/O of its own.
pub(crate) async fn watchdog(
    liveness: std::sync::Arc<Liveness>,
    cancel: CancellationToken,
    config: WatchdogConfig,
) {
    let mut ticker = interval(config.tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("watchdog stopped");
                return;
            }
            _ = ticker.tick() => {}
        }

        if liveness.connecting() {
            let waited = liveness.since_session_start();
            if waited > config.connect_deadline {
                warn!("Connection not confirmed after {:?}; cancelling session", waited);
                cancel.cancel();
                return;
            }
        } else {
            let idle = liveness.idle();
            if idle > config.stale_after {
                warn!("Last message received {:?} ago; cancelling session", idle);
                cancel.cancel();
                return;
            }
        }
    }
}
