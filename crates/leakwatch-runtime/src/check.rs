use std::time::{Duration, Instant};

use leakwatch_types::{BufferStatus, ChannelStatus, EntryStatus, LeakReport, ReportFormat};

use crate::classify::{classify, WorkerActivity};
use crate::error::{LeakDetected, TrackError};
use crate::snapshot::{build_snapshot, entry_snapshot, millis};
use crate::Tracker;

/// Upper bound on scheduler yields for the reclaim hint.
const RECLAIM_YIELDS: usize = 8;

/// Knobs for a single [`Tracker::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckOptions {
    /// Return `LeakDetected` instead of a report when anything leaked.
    pub throw_on_leaks: bool,
    /// Give finishing tasks a chance to drop captured handles before reading.
    pub force_gc: bool,
    /// Falls back to the tracker's configured format.
    pub format: Option<ReportFormat>,
    /// Falls back to the tracker's configured settle delay.
    pub settle_delay: Option<Duration>,
    /// Keep the session open when the check returns a report rather than
    /// `LeakDetected`.
    pub keep_tracking: bool,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            throw_on_leaks: true,
            force_gc: false,
            format: None,
            settle_delay: None,
            keep_tracking: false,
        }
    }
}

impl CheckOptions {
    pub fn throw_on_leaks(mut self, throw_on_leaks: bool) -> Self {
        self.throw_on_leaks = throw_on_leaks;
        self
    }

    pub fn force_gc(mut self, force_gc: bool) -> Self {
        self.force_gc = force_gc;
        self
    }

    pub fn format(mut self, format: ReportFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = Some(settle_delay);
        self
    }

    pub fn keep_tracking(mut self, keep_tracking: bool) -> Self {
        self.keep_tracking = keep_tracking;
        self
    }
}

impl Tracker {
    /// Ends the session and reports every resource that has not reached its
    /// terminal state.
    ///
    /// Waits for the settle delay first so exit and close notifications
    /// already in flight are counted. The session is ended whether or not
    /// leaks are found, unless `keep_tracking` is set and the check returns
    /// a report: nothing leaked, or `throw_on_leaks` is off.
    pub async fn check(&self, options: CheckOptions) -> Result<LeakReport, TrackError> {
        if !self.is_tracking() {
            return Err(TrackError::NotTracking);
        }

        let config = self.config();
        let settle_delay = options.settle_delay.unwrap_or(config.settle_delay);
        let format = options.format.unwrap_or(config.format);

        if !settle_delay.is_zero() {
            tokio::time::sleep(settle_delay).await;
        }
        if options.force_gc {
            reclaim_hint().await;
        }

        let idle_threshold = self.idle_threshold();
        let report = {
            let mut registry = self.registry().lock();
            if !registry.is_enabled() {
                return Err(TrackError::NotTracking);
            }
            let now = Instant::now();
            let report = leak_report(registry.entries(), now, idle_threshold);
            let returns_report = report.is_empty() || !options.throw_on_leaks;
            if !(options.keep_tracking && returns_report) {
                registry.end_session()?;
            }
            report
        };

        if report.is_empty() {
            tracing::debug!("leak check passed");
            return Ok(report);
        }

        tracing::warn!(
            workers = report.leaked_workers(),
            idle_workers = report.idle_workers.len(),
            channel_endpoints = report.open_channel_endpoints.len(),
            shared_buffers = report.retained_shared_buffers.len(),
            "leak check found unreleased resources"
        );
        if options.throw_on_leaks {
            return Err(LeakDetected::new(report, format).into());
        }
        Ok(report)
    }
}

/// Lets tasks that are finishing run far enough to drop what they captured.
async fn reclaim_hint() {
    for _ in 0..RECLAIM_YIELDS {
        tokio::task::yield_now().await;
    }
}

fn leak_report(
    entries: &[crate::registry::TrackedEntry],
    now: Instant,
    idle_threshold: Duration,
) -> LeakReport {
    let mut report = LeakReport {
        running_workers: Vec::new(),
        idle_workers: Vec::new(),
        open_channel_endpoints: Vec::new(),
        retained_shared_buffers: Vec::new(),
        idle_threshold_ms: millis(idle_threshold),
        snapshot: build_snapshot(entries, now, idle_threshold),
    };
    for entry in entries {
        let bucket = match entry.status() {
            EntryStatus::Worker(_) => match classify(entry, now, idle_threshold) {
                Some(WorkerActivity::Active) => &mut report.running_workers,
                Some(WorkerActivity::Idle) => &mut report.idle_workers,
                _ => continue,
            },
            EntryStatus::ChannelEndpoint(ChannelStatus::Open) => {
                &mut report.open_channel_endpoints
            }
            EntryStatus::SharedBuffer(BufferStatus::Retained) => {
                &mut report.retained_shared_buffers
            }
            _ => continue,
        };
        bucket.push(entry_snapshot(entry, now, idle_threshold));
    }
    report
}
