use std::time::{Duration, Instant};

use leakwatch_types::WorkerStatus;

use crate::registry::TrackedEntry;

/// Derived label for a worker entry; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerActivity {
    Active,
    Idle,
    Terminated,
}

/// Classifies a worker entry against the idle threshold.
///
/// A worker is idle iff it is alive and strictly more than `idle_threshold`
/// has passed since its last observed activity. Exactly at the threshold it
/// is still active. Returns `None` for entries that are not workers.
pub fn classify(
    entry: &TrackedEntry,
    now: Instant,
    idle_threshold: Duration,
) -> Option<WorkerActivity> {
    let (status, last_activity_at) = entry.worker_state()?;
    Some(match status {
        WorkerStatus::Terminated => WorkerActivity::Terminated,
        WorkerStatus::Alive => {
            if now.saturating_duration_since(last_activity_at) > idle_threshold {
                WorkerActivity::Idle
            } else {
                WorkerActivity::Active
            }
        }
    })
}

pub fn is_idle(entry: &TrackedEntry, now: Instant, idle_threshold: Duration) -> bool {
    classify(entry, now, idle_threshold) == Some(WorkerActivity::Idle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{NewEntry, Registry};
    use leakwatch_types::LifecycleEvent;

    const THRESHOLD: Duration = Duration::from_millis(100);

    #[test]
    fn boundary_is_not_idle() {
        let mut registry = Registry::default();
        registry.track().expect("session should start");
        let start = Instant::now();
        let id = registry.register(NewEntry::Worker, None, start);
        let entry = registry.get(id).expect("entry exists");

        assert_eq!(
            classify(entry, start + THRESHOLD, THRESHOLD),
            Some(WorkerActivity::Active)
        );
        assert_eq!(
            classify(entry, start + THRESHOLD + Duration::from_nanos(1), THRESHOLD),
            Some(WorkerActivity::Idle)
        );
    }

    #[test]
    fn activity_resets_the_idle_clock() {
        let mut registry = Registry::default();
        registry.track().expect("session should start");
        let start = Instant::now();
        let id = registry.register(NewEntry::Worker, None, start);
        registry.update(id, LifecycleEvent::Activity, start + Duration::from_millis(80));
        let entry = registry.get(id).expect("entry exists");

        assert!(!is_idle(entry, start + Duration::from_millis(150), THRESHOLD));
        assert!(is_idle(entry, start + Duration::from_millis(181), THRESHOLD));
    }

    #[test]
    fn terminated_workers_are_never_idle() {
        let mut registry = Registry::default();
        registry.track().expect("session should start");
        let start = Instant::now();
        let id = registry.register(NewEntry::Worker, None, start);
        registry.update(id, LifecycleEvent::Terminated, start);
        let entry = registry.get(id).expect("entry exists");

        assert_eq!(
            classify(entry, start + Duration::from_secs(60), THRESHOLD),
            Some(WorkerActivity::Terminated)
        );
        assert!(!is_idle(entry, start + Duration::from_secs(60), THRESHOLD));
    }

    #[test]
    fn non_workers_are_not_classified() {
        let mut registry = Registry::default();
        registry.track().expect("session should start");
        let id = registry.register(NewEntry::ChannelEndpoint, None, Instant::now());
        let entry = registry.get(id).expect("entry exists");
        assert_eq!(classify(entry, Instant::now(), THRESHOLD), None);
    }

    #[test]
    fn clock_going_backwards_counts_as_active() {
        let mut registry = Registry::default();
        registry.track().expect("session should start");
        let start = Instant::now() + Duration::from_secs(1);
        let id = registry.register(NewEntry::Worker, None, start);
        let entry = registry.get(id).expect("entry exists");
        assert_eq!(
            classify(entry, Instant::now(), THRESHOLD),
            Some(WorkerActivity::Active)
        );
    }
}
