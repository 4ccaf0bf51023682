use std::time::{Duration, Instant};

use leakwatch_types::{
    BufferStatus, ChannelStatus, EntrySnapshot, EntryStatus, Snapshot, WorkerStatus,
};

use crate::classify::is_idle;
use crate::registry::TrackedEntry;

pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

pub(crate) fn build_snapshot(
    entries: &[TrackedEntry],
    now: Instant,
    idle_threshold: Duration,
) -> Snapshot {
    let mut snapshot = Snapshot::default();
    for entry in entries {
        match entry.status() {
            EntryStatus::Worker(status) => {
                let workers = &mut snapshot.workers;
                workers.total += 1;
                match status {
                    WorkerStatus::Alive => {
                        workers.alive += 1;
                        if is_idle(entry, now, idle_threshold) {
                            workers.idle += 1;
                        }
                    }
                    WorkerStatus::Terminated => workers.terminated += 1,
                }
            }
            EntryStatus::ChannelEndpoint(status) => {
                let endpoints = &mut snapshot.channel_endpoints;
                endpoints.total += 1;
                match status {
                    ChannelStatus::Open => endpoints.open += 1,
                    ChannelStatus::Closed => endpoints.closed += 1,
                }
            }
            EntryStatus::SharedBuffer(status) => {
                let buffers = &mut snapshot.shared_buffers;
                let size = entry.size_bytes().unwrap_or(0);
                buffers.total += 1;
                buffers.total_bytes += size;
                if status == BufferStatus::Retained {
                    buffers.retained += 1;
                    buffers.retained_bytes += size;
                }
            }
        }
    }
    snapshot
}

pub(crate) fn entry_snapshot(
    entry: &TrackedEntry,
    now: Instant,
    idle_threshold: Duration,
) -> EntrySnapshot {
    EntrySnapshot {
        id: entry.id(),
        status: entry.status(),
        label: entry.label().map(str::to_owned),
        idle: is_idle(entry, now, idle_threshold),
        age_ms: millis(now.saturating_duration_since(entry.created_at())),
        last_activity_ms_ago: entry
            .last_activity_at()
            .map(|at| millis(now.saturating_duration_since(at))),
        size_bytes: entry.size_bytes(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{NewEntry, Registry};
    use leakwatch_types::{EntryId, LifecycleEvent, SharedBufferCounts};
    use std::any::Any;
    use std::sync::Arc;

    const THRESHOLD: Duration = Duration::from_millis(100);

    /// Small deterministic generator so the invariants run over many mixed
    /// event sequences.
    struct Lcg(u64);

    impl Lcg {
        fn next(&mut self, bound: u64) -> u64 {
            self.0 = self
                .0
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            (self.0 >> 33) % bound
        }
    }

    #[test]
    fn millis_saturates_instead_of_truncating() {
        assert_eq!(millis(Duration::from_millis(1_500)), 1_500);
        assert_eq!(millis(Duration::MAX), u64::MAX);
    }

    #[test]
    fn empty_session_is_all_zero() {
        let mut registry = Registry::default();
        registry.track().expect("session should start");
        let snapshot = build_snapshot(registry.entries(), Instant::now(), THRESHOLD);
        assert_eq!(snapshot, Snapshot::default());
        assert!(snapshot.is_empty());
    }

    #[test]
    fn worker_counts_stay_consistent_over_random_sequences() {
        for seed in 0..64 {
            let mut rng = Lcg(seed);
            let mut registry = Registry::default();
            registry.track().expect("session should start");
            let start = Instant::now();
            let mut ids: Vec<EntryId> = Vec::new();

            for step in 0..200u64 {
                let now = start + Duration::from_millis(step * 7);
                match rng.next(5) {
                    0 => ids.push(registry.register(NewEntry::Worker, None, now)),
                    1 => ids.push(registry.register(NewEntry::ChannelEndpoint, None, now)),
                    _ if ids.is_empty() => {}
                    choice => {
                        let id = ids[rng.next(ids.len() as u64) as usize];
                        let event = match choice {
                            2 => LifecycleEvent::Activity,
                            3 => LifecycleEvent::Terminated,
                            _ => LifecycleEvent::Closed,
                        };
                        registry.update(id, event, now);
                    }
                }

                let snapshot = build_snapshot(registry.entries(), now, THRESHOLD);
                let workers = snapshot.workers;
                assert_eq!(workers.total, workers.alive + workers.terminated);
                assert!(workers.alive >= workers.idle);
                let endpoints = snapshot.channel_endpoints;
                assert_eq!(endpoints.total, endpoints.open + endpoints.closed);
            }
        }
    }

    #[test]
    fn snapshot_is_idempotent_without_events() {
        let mut registry = Registry::default();
        registry.track().expect("session should start");
        let now = Instant::now();
        let worker = registry.register(NewEntry::Worker, None, now);
        registry.register(NewEntry::ChannelEndpoint, None, now);
        registry.update(worker, LifecycleEvent::Activity, now);

        let at = now + Duration::from_millis(30);
        let first = build_snapshot(registry.entries(), at, THRESHOLD);
        let second = build_snapshot(registry.entries(), at, THRESHOLD);
        assert_eq!(first, second);
    }

    #[test]
    fn double_termination_does_not_change_totals() {
        let mut registry = Registry::default();
        registry.track().expect("session should start");
        let now = Instant::now();
        let id = registry.register(NewEntry::Worker, None, now);
        registry.update(id, LifecycleEvent::Terminated, now);
        let once = build_snapshot(registry.entries(), now, THRESHOLD);
        registry.update(id, LifecycleEvent::Terminated, now);
        let twice = build_snapshot(registry.entries(), now, THRESHOLD);
        assert_eq!(once, twice);
        assert_eq!(twice.workers.total, 1);
        assert_eq!(twice.workers.terminated, 1);
    }

    #[test]
    fn shared_buffers_report_total_and_retained_bytes() {
        let mut registry = Registry::default();
        registry.track().expect("session should start");
        let now = Instant::now();
        let kept: Arc<dyn Any + Send + Sync> = Arc::new(vec![0u8; 64]);
        let dropped: Arc<dyn Any + Send + Sync> = Arc::new(vec![0u8; 32]);
        for (storage, size) in [(&kept, 64), (&dropped, 32)] {
            registry.register(
                NewEntry::SharedBuffer {
                    size_bytes: size,
                    probe: Arc::downgrade(storage),
                },
                None,
                now,
            );
        }
        drop(dropped);

        let snapshot = build_snapshot(registry.entries(), now, THRESHOLD);
        assert_eq!(
            snapshot.shared_buffers,
            SharedBufferCounts {
                total: 2,
                total_bytes: 96,
                retained: 1,
                retained_bytes: 64,
            }
        );
    }

    #[test]
    fn entry_snapshot_reports_age_and_activity() {
        let mut registry = Registry::default();
        registry.track().expect("session should start");
        let start = Instant::now();
        let id = registry.register(NewEntry::Worker, Some("echo".into()), start);
        registry.update(id, LifecycleEvent::Activity, start + Duration::from_millis(20));
        let entry = registry.get(id).expect("entry exists");

        let view = entry_snapshot(entry, start + Duration::from_millis(250), THRESHOLD);
        assert_eq!(view.age_ms, 250);
        assert_eq!(view.last_activity_ms_ago, Some(230));
        assert!(view.idle);
        assert_eq!(view.label.as_deref(), Some("echo"));
        assert_eq!(view.display_name(), "Worker#1");
        assert_eq!(view.size_bytes, None);
    }
}
