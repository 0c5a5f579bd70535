//! Liveness determination for the stream producer.
//!
//! Three sources implement [`Liveness`]:
//!
//! - [`DirectMonitor`] re-reads the marker on every query. No background work,
//!   but each query touches the filesystem.
//! - [`PolledMonitor`] serves queries from a cached [`LivenessState`] that a
//!   [`Poller`] refreshes on a fixed interval. Queries never touch the
//!   filesystem; answers lag the marker by at most one poll interval.
//! - [`SharedFlag`] is set directly by a host process that embeds the server
//!   and already knows whether its stream is running.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, PoisonError, RwLock,
    },
    time::Duration,
};

use chrono::Utc;

use crate::marker::FreshnessMarker;

mod poller;

pub use poller::Poller;

/// Heartbeats older than this many seconds mean the producer is gone.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(5);

/// Anything that can answer "is the producer alive right now?".
///
/// Implementations must be cheap and infallible: every failure mode answers
/// `false`.
pub trait Liveness: Send + Sync {
    fn is_active(&self) -> bool;
}

/// A heartbeat observation and the verdict derived from it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LivenessState {
    /// Last marker timestamp, `0` if never seen.
    pub last_seen: i64,
    pub is_active: bool,
}

impl LivenessState {
    /// Derive the verdict for `last_seen` as of `now` (both Unix seconds).
    ///
    /// A heartbeat from the future counts as fresh; clocks are assumed shared.
    pub fn evaluate(last_seen: i64, now: i64, stale_after: Duration) -> Self {
        let window = i64::try_from(stale_after.as_secs()).unwrap_or(i64::MAX);
        let is_active = last_seen != 0 && now.saturating_sub(last_seen) < window;
        Self { last_seen, is_active }
    }

    /// Read `marker` and evaluate it against the wall clock.
    pub fn observe(marker: &FreshnessMarker, stale_after: Duration) -> Self {
        Self::evaluate(marker.last_seen(), Utc::now().timestamp(), stale_after)
    }
}

/// Single-writer, multi-reader home of the cached [`LivenessState`].
///
/// The state is `Copy` and replaced whole, so readers always see a matching
/// `last_seen`/`is_active` pair. A poisoned lock still holds a complete
/// snapshot and is read through.
#[derive(Debug, Default)]
pub struct LivenessCell {
    state: RwLock<LivenessState>,
}

impl LivenessCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&self) -> LivenessState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn store(&self, state: LivenessState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
    }
}

/// Reads the marker synchronously on every query.
#[derive(Debug, Clone)]
pub struct DirectMonitor {
    marker: FreshnessMarker,
    stale_after: Duration,
}

impl DirectMonitor {
    pub fn new(marker: FreshnessMarker, stale_after: Duration) -> Self {
        Self { marker, stale_after }
    }

    pub fn state(&self) -> LivenessState {
        LivenessState::observe(&self.marker, self.stale_after)
    }
}

impl Liveness for DirectMonitor {
    fn is_active(&self) -> bool {
        self.state().is_active
    }
}

/// Serves queries from a cache refreshed by [`refresh_once`](Self::refresh_once).
///
/// Starts inactive with `last_seen = 0` until the first refresh.
#[derive(Debug)]
pub struct PolledMonitor {
    marker: FreshnessMarker,
    stale_after: Duration,
    cell: LivenessCell,
}

impl PolledMonitor {
    pub fn new(marker: FreshnessMarker, stale_after: Duration) -> Self {
        Self {
            marker,
            stale_after,
            cell: LivenessCell::new(),
        }
    }

    /// Read the marker once and publish the resulting state.
    ///
    /// Returns the published state. Never fails; a bad marker publishes
    /// `{ last_seen: 0, is_active: false }`.
    pub fn refresh_once(&self) -> LivenessState {
        let state = LivenessState::observe(&self.marker, self.stale_after);
        self.cell.store(state);
        state
    }

    /// The most recently published state.
    pub fn state(&self) -> LivenessState {
        self.cell.load()
    }

    pub fn marker(&self) -> &FreshnessMarker {
        &self.marker
    }
}

impl Liveness for PolledMonitor {
    fn is_active(&self) -> bool {
        self.cell.load().is_active
    }
}

/// Liveness flag owned by an embedding host.
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct SharedFlag {
    active: Arc<AtomicBool>,
}

impl SharedFlag {
    pub fn new(active: bool) -> Self {
        Self {
            active: Arc::new(AtomicBool::new(active)),
        }
    }

    pub fn set(&self, active: bool) {
        self.active.store(active, Ordering::Release);
    }
}

impl Liveness for SharedFlag {
    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    const NOW: i64 = 1_700_000_000;

    fn marker_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn now() -> i64 {
        Utc::now().timestamp()
    }

    // -----------------------------------------------------------------------
    // LivenessState::evaluate
    // -----------------------------------------------------------------------

    #[test]
    fn heartbeat_within_window_is_active() {
        for age in 0..5 {
            let state = LivenessState::evaluate(NOW - age, NOW, DEFAULT_STALE_AFTER);
            assert!(state.is_active, "age {age}s should be active");
            assert_eq!(state.last_seen, NOW - age);
        }
    }

    #[test]
    fn heartbeat_at_or_past_window_is_inactive() {
        for age in [5, 6, 10, 3600] {
            let state = LivenessState::evaluate(NOW - age, NOW, DEFAULT_STALE_AFTER);
            assert!(!state.is_active, "age {age}s should be inactive");
        }
    }

    #[test]
    fn zero_is_never_active() {
        assert!(!LivenessState::evaluate(0, NOW, DEFAULT_STALE_AFTER).is_active);
        assert!(!LivenessState::evaluate(0, 0, DEFAULT_STALE_AFTER).is_active);
        assert!(!LivenessState::evaluate(0, 3, DEFAULT_STALE_AFTER).is_active);
    }

    #[test]
    fn future_heartbeat_counts_as_fresh() {
        assert!(LivenessState::evaluate(NOW + 30, NOW, DEFAULT_STALE_AFTER).is_active);
    }

    #[test]
    fn window_is_configurable() {
        let window = Duration::from_secs(60);
        assert!(LivenessState::evaluate(NOW - 30, NOW, window).is_active);
        assert!(!LivenessState::evaluate(NOW - 60, NOW, window).is_active);
    }

    // -----------------------------------------------------------------------
    // DirectMonitor
    // -----------------------------------------------------------------------

    #[test]
    fn direct_monitor_follows_marker_on_every_call() {
        let file = marker_file(&format!("{}\n", now() - 2));
        let monitor = DirectMonitor::new(FreshnessMarker::new(file.path()), DEFAULT_STALE_AFTER);
        assert!(monitor.is_active());

        std::fs::write(file.path(), format!("{}\n", now() - 10)).unwrap();
        assert!(!monitor.is_active());
    }

    #[test]
    fn direct_monitor_reports_inactive_for_missing_marker() {
        let dir = tempfile::tempdir().unwrap();
        let monitor = DirectMonitor::new(
            FreshnessMarker::new(dir.path().join("absent")),
            DEFAULT_STALE_AFTER,
        );
        assert!(!monitor.is_active());
        assert_eq!(monitor.state(), LivenessState::default());
    }

    // -----------------------------------------------------------------------
    // PolledMonitor
    // -----------------------------------------------------------------------

    #[test]
    fn polled_monitor_is_inactive_before_first_refresh() {
        let file = marker_file(&format!("{}\n", now()));
        let monitor = PolledMonitor::new(FreshnessMarker::new(file.path()), DEFAULT_STALE_AFTER);
        assert!(!monitor.is_active());
        assert_eq!(monitor.state(), LivenessState::default());
    }

    #[test]
    fn polled_monitor_serves_cache_until_next_refresh() {
        let file = marker_file(&format!("{}\n", now() - 1));
        let monitor = PolledMonitor::new(FreshnessMarker::new(file.path()), DEFAULT_STALE_AFTER);

        let published = monitor.refresh_once();
        assert!(published.is_active);
        assert_eq!(monitor.state(), published);

        // Marker goes stale, cache does not notice until refreshed.
        std::fs::write(file.path(), "0\n").unwrap();
        assert!(monitor.is_active());

        let published = monitor.refresh_once();
        assert_eq!(published, LivenessState { last_seen: 0, is_active: false });
        assert!(!monitor.is_active());
    }

    #[test]
    fn polled_monitor_collapses_garbage_to_never_seen() {
        let file = marker_file("garbage\n");
        let monitor = PolledMonitor::new(FreshnessMarker::new(file.path()), DEFAULT_STALE_AFTER);
        assert_eq!(monitor.refresh_once(), LivenessState::default());
    }

    // -----------------------------------------------------------------------
    // LivenessCell / SharedFlag
    // -----------------------------------------------------------------------

    #[test]
    fn cell_readers_see_whole_snapshots() {
        let cell = Arc::new(LivenessCell::new());
        let writer = {
            let cell = Arc::clone(&cell);
            std::thread::spawn(move || {
                for i in 1..=10_000 {
                    cell.store(LivenessState { last_seen: i, is_active: i % 2 == 0 });
                }
            })
        };
        for _ in 0..10_000 {
            let state = cell.load();
            if state.last_seen != 0 {
                assert_eq!(state.is_active, state.last_seen % 2 == 0, "torn read: {state:?}");
            }
        }
        writer.join().unwrap();
    }

    #[test]
    fn shared_flag_clones_share_state() {
        let flag = SharedFlag::new(false);
        let host_side = flag.clone();
        assert!(!flag.is_active());
        host_side.set(true);
        assert!(flag.is_active());
        host_side.set(false);
        assert!(!flag.is_active());
    }
}
