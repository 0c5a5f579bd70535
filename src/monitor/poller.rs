//! Background refresh task for [`PolledMonitor`].

use std::{sync::Arc, time::Duration};

use tokio::{
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::PolledMonitor;

/// Default refresh cadence.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Handle to a running refresh loop.
///
/// The loop refreshes immediately on spawn, then once per interval, until
/// [`stop`](Self::stop) is called or the handle is dropped.
pub struct Poller {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl Poller {
    /// Spawn the refresh loop on the current tokio runtime.
    pub fn spawn(monitor: Arc<PolledMonitor>, interval: Duration) -> Self {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(refresh_loop(monitor, interval, cancel.clone()));
        Self {
            cancel,
            task: Some(task),
        }
    }

    /// Cancel the loop and wait for it to exit.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "freshness poller ended abnormally");
            }
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn refresh_loop(monitor: Arc<PolledMonitor>, interval: Duration, cancel: CancellationToken) {
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    debug!(
        path = %monitor.marker().path().display(),
        interval_ms = interval.as_millis() as u64,
        "freshness poller started"
    );

    let mut was_active = false;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let state = monitor.refresh_once();
        if state.is_active != was_active {
            if state.is_active {
                info!(last_seen = state.last_seen, "stream producer is alive");
            } else {
                info!(last_seen = state.last_seen, "stream producer went quiet");
            }
            was_active = state.is_active;
        }
    }

    debug!("freshness poller stopped");
}
