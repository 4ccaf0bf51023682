//! Registry, classification and leak checking behind `leakwatch`.
//!
//! A [`Tracker`] owns one registry. Between [`Tracker::track`] and
//! [`Tracker::check`] every tracked resource constructed against it gets an
//! entry, and its lifecycle events move that entry towards a terminal state.
//! `check` reports whatever has not arrived there.
//!
//! The free functions at the bottom of this module operate on
//! [`Tracker::global`].

pub(crate) mod check;
pub(crate) mod classify;
pub(crate) mod config;
pub(crate) mod error;
pub(crate) mod handles;
pub(crate) mod registry;
pub(crate) mod report;
pub(crate) mod snapshot;
pub(crate) mod tracker;

use std::time::Duration;

pub use self::check::CheckOptions;
pub use self::classify::{classify, is_idle, WorkerActivity};
pub use self::config::{
    TrackerConfig, DEFAULT_IDLE_THRESHOLD, DEFAULT_SETTLE_DELAY, IDLE_THRESHOLD_ENV,
    REPORT_FORMAT_ENV, SETTLE_DELAY_ENV,
};
pub use self::error::{LeakDetected, TrackError};
pub use self::handles::Tracked;
pub use self::registry::{NewEntry, ReachabilityProbe, TrackedEntry};
pub use self::report::render;
pub use self::tracker::Tracker;
pub use leakwatch_types::*;

/// Opens a session on the process-wide tracker.
pub fn track() -> Result<(), TrackError> {
    Tracker::global().track()
}

pub fn snapshot() -> Snapshot {
    Tracker::global().snapshot()
}

pub async fn check(options: CheckOptions) -> Result<LeakReport, TrackError> {
    Tracker::global().check(options).await
}

pub fn set_idle_threshold(idle_threshold: Duration) -> Result<(), TrackError> {
    Tracker::global().set_idle_threshold(idle_threshold)
}

/// Discards the process-wide session without checking it.
pub fn end_session() -> Result<(), TrackError> {
    Tracker::global().end_session()
}
