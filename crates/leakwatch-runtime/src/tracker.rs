use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use leakwatch_types::{EntryId, EntrySnapshot, LifecycleEvent, Snapshot};
use parking_lot::Mutex;

use crate::config::{validate_idle_threshold, TrackerConfig};
use crate::error::TrackError;
use crate::handles::Tracked;
use crate::registry::{NewEntry, ReachabilityProbe, Registry};
use crate::snapshot::{build_snapshot, entry_snapshot, millis};

static GLOBAL_TRACKER: OnceLock<Tracker> = OnceLock::new();

/// Handle to one registry and its configuration.
///
/// Cloning is cheap and every clone addresses the same state. Proxies keep a
/// clone so their events reach the registry they were registered in. The
/// registry lock is only held for a single register, update or read, which
/// is what serializes events coming from workers on other threads.
#[derive(Clone)]
pub struct Tracker {
    inner: Arc<TrackerInner>,
}

struct TrackerInner {
    registry: Mutex<Registry>,
    config: Mutex<TrackerConfig>,
}

impl Default for Tracker {
    fn default() -> Self {
        Self::new()
    }
}

impl Tracker {
    pub fn new() -> Self {
        Self::with_config(TrackerConfig::default())
    }

    pub fn with_config(config: TrackerConfig) -> Self {
        Self {
            inner: Arc::new(TrackerInner {
                registry: Mutex::new(Registry::default()),
                config: Mutex::new(config),
            }),
        }
    }

    /// The process-wide tracker, configured from the environment on first use.
    pub fn global() -> &'static Tracker {
        GLOBAL_TRACKER.get_or_init(|| match TrackerConfig::from_env() {
            Ok(config) => Tracker::with_config(config),
            Err(err) => {
                tracing::warn!(%err, "ignoring leakwatch environment, using defaults");
                Tracker::new()
            }
        })
    }

    pub fn ptr_eq(&self, other: &Tracker) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // ── Session lifecycle ───────────────────────────────────────

    pub fn track(&self) -> Result<(), TrackError> {
        self.inner.registry.lock().track().map(|_| ())
    }

    /// Ends the session and discards every entry without checking them.
    pub fn end_session(&self) -> Result<(), TrackError> {
        self.inner.registry.lock().end_session().map(|_| ())
    }

    pub fn is_tracking(&self) -> bool {
        self.inner.registry.lock().is_enabled()
    }

    // ── Configuration ───────────────────────────────────────────

    pub fn config(&self) -> TrackerConfig {
        *self.inner.config.lock()
    }

    pub fn idle_threshold(&self) -> Duration {
        self.inner.config.lock().idle_threshold()
    }

    /// Rejects a zero threshold and leaves the current one in place.
    pub fn set_idle_threshold(&self, idle_threshold: Duration) -> Result<(), TrackError> {
        validate_idle_threshold(idle_threshold)?;
        let mut config = self.inner.config.lock();
        *config = config.with_idle_threshold(idle_threshold)?;
        tracing::debug!(
            idle_threshold_ms = millis(idle_threshold),
            "idle threshold updated"
        );
        Ok(())
    }

    pub fn set_settle_delay(&self, settle_delay: Duration) {
        self.inner.config.lock().settle_delay = settle_delay;
    }

    // ── Registration and events ─────────────────────────────────

    pub fn register_worker(&self, label: impl Into<String>) -> Tracked {
        self.register(NewEntry::Worker, label.into())
    }

    pub fn register_channel_endpoint(&self, label: impl Into<String>) -> Tracked {
        self.register(NewEntry::ChannelEndpoint, label.into())
    }

    pub fn register_shared_buffer(
        &self,
        label: impl Into<String>,
        size_bytes: u64,
        probe: ReachabilityProbe,
    ) -> Tracked {
        self.register(NewEntry::SharedBuffer { size_bytes, probe }, label.into())
    }

    /// Never fails: without an open session the returned handle is untracked.
    pub fn register(&self, new: NewEntry, label: String) -> Tracked {
        let label = Some(label).filter(|label| !label.is_empty());
        let id = self
            .inner
            .registry
            .lock()
            .register(new, label, Instant::now());
        Tracked::new(self.clone(), id)
    }

    pub fn update(&self, id: EntryId, event: LifecycleEvent) -> bool {
        self.inner
            .registry
            .lock()
            .update(id, event, Instant::now())
    }

    // ── Reads ───────────────────────────────────────────────────

    /// All-zero outside a session.
    pub fn snapshot(&self) -> Snapshot {
        let idle_threshold = self.idle_threshold();
        let registry = self.inner.registry.lock();
        build_snapshot(registry.entries(), Instant::now(), idle_threshold)
    }

    /// Every entry of the current session in registration order.
    pub fn entries(&self) -> Vec<EntrySnapshot> {
        let idle_threshold = self.idle_threshold();
        let registry = self.inner.registry.lock();
        let now = Instant::now();
        registry
            .entries()
            .iter()
            .map(|entry| entry_snapshot(entry, now, idle_threshold))
            .collect()
    }

    pub fn entry(&self, id: EntryId) -> Option<EntrySnapshot> {
        let idle_threshold = self.idle_threshold();
        let registry = self.inner.registry.lock();
        registry
            .get(id)
            .map(|entry| entry_snapshot(entry, Instant::now(), idle_threshold))
    }

    pub(crate) fn registry(&self) -> &Mutex<Registry> {
        &self.inner.registry
    }
}
