use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Weak};

use leakwatch_runtime::{ReachabilityProbe, Tracked, Tracker};
use leakwatch_types::EntryId;

struct Storage {
    bytes: Box<[AtomicU8]>,
    tracked: Tracked,
}

/// Fixed-size byte storage that can be shared across workers.
///
/// Clones share the same bytes. The registry holds only a weak probe, so the
/// buffer is reported Released once the last clone is dropped. There is no
/// release call.
#[derive(Clone)]
pub struct SharedBuffer {
    storage: Arc<Storage>,
}

impl SharedBuffer {
    /// Allocates `len` zeroed bytes registered on [`Tracker::global`].
    pub fn new(label: impl Into<String>, len: usize) -> Self {
        Self::new_in(Tracker::global(), label, len)
    }

    pub fn new_in(tracker: &Tracker, label: impl Into<String>, len: usize) -> Self {
        let label = label.into();
        let storage = Arc::new_cyclic(|weak: &Weak<Storage>| {
            let probe: ReachabilityProbe = weak.clone();
            let tracked = tracker.register_shared_buffer(label, len as u64, probe);
            Storage {
                bytes: (0..len).map(|_| AtomicU8::new(0)).collect(),
                tracked,
            }
        });
        Self { storage }
    }

    pub fn id(&self) -> EntryId {
        self.storage.tracked.id()
    }

    pub fn len(&self) -> usize {
        self.storage.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.bytes.is_empty()
    }

    pub fn as_slice(&self) -> &[AtomicU8] {
        &self.storage.bytes
    }

    pub fn load(&self, index: usize) -> Option<u8> {
        self.storage
            .bytes
            .get(index)
            .map(|byte| byte.load(Ordering::Acquire))
    }

    /// Returns `None` when `index` is out of bounds.
    pub fn store(&self, index: usize, value: u8) -> Option<()> {
        let byte = self.storage.bytes.get(index)?;
        byte.store(value, Ordering::Release);
        Some(())
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.storage
            .bytes
            .iter()
            .map(|byte| byte.load(Ordering::Acquire))
            .collect()
    }

    /// Number of live clones, this one included.
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.storage)
    }
}

impl std::fmt::Debug for SharedBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedBuffer")
            .field("id", &self.id().seq())
            .field("len", &self.len())
            .field("handles", &self.handle_count())
            .finish()
    }
}
