use std::any::Any;
use std::sync::Weak;
use std::time::Instant;

use leakwatch_types::{
    BufferStatus, ChannelStatus, EntryId, EntryStatus, LifecycleEvent, ResourceKind,
    WorkerStatus,
};

use crate::error::TrackError;

/// Non-owning view of a shared buffer's storage. The buffer counts as
/// retained for as long as this still upgrades.
pub type ReachabilityProbe = Weak<dyn Any + Send + Sync>;

/// What a proxy registers, with the kind-specific data fixed at construction.
pub enum NewEntry {
    Worker,
    ChannelEndpoint,
    SharedBuffer {
        size_bytes: u64,
        probe: ReachabilityProbe,
    },
}

impl NewEntry {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Worker => ResourceKind::Worker,
            Self::ChannelEndpoint => ResourceKind::ChannelEndpoint,
            Self::SharedBuffer { .. } => ResourceKind::SharedBuffer,
        }
    }
}

enum EntryState {
    Worker {
        status: WorkerStatus,
        last_activity_at: Instant,
    },
    ChannelEndpoint {
        status: ChannelStatus,
    },
    SharedBuffer {
        size_bytes: u64,
        probe: ReachabilityProbe,
    },
}

/// The registry's record of one resource instance.
pub struct TrackedEntry {
    id: EntryId,
    label: Option<String>,
    created_at: Instant,
    state: EntryState,
}

impl TrackedEntry {
    pub fn id(&self) -> EntryId {
        self.id
    }

    pub fn kind(&self) -> ResourceKind {
        match self.state {
            EntryState::Worker { .. } => ResourceKind::Worker,
            EntryState::ChannelEndpoint { .. } => ResourceKind::ChannelEndpoint,
            EntryState::SharedBuffer { .. } => ResourceKind::SharedBuffer,
        }
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Shared buffer status is read from the probe on every call.
    pub fn status(&self) -> EntryStatus {
        match &self.state {
            EntryState::Worker { status, .. } => EntryStatus::Worker(*status),
            EntryState::ChannelEndpoint { status } => EntryStatus::ChannelEndpoint(*status),
            EntryState::SharedBuffer { probe, .. } => {
                if probe.strong_count() > 0 {
                    EntryStatus::SharedBuffer(BufferStatus::Retained)
                } else {
                    EntryStatus::SharedBuffer(BufferStatus::Released)
                }
            }
        }
    }

    pub fn last_activity_at(&self) -> Option<Instant> {
        match self.state {
            EntryState::Worker {
                last_activity_at, ..
            } => Some(last_activity_at),
            _ => None,
        }
    }

    pub fn size_bytes(&self) -> Option<u64> {
        match self.state {
            EntryState::SharedBuffer { size_bytes, .. } => Some(size_bytes),
            _ => None,
        }
    }

    pub(crate) fn worker_state(&self) -> Option<(WorkerStatus, Instant)> {
        match self.state {
            EntryState::Worker {
                status,
                last_activity_at,
            } => Some((status, last_activity_at)),
            _ => None,
        }
    }

    fn apply(&mut self, event: LifecycleEvent, now: Instant) -> bool {
        match (&mut self.state, event) {
            (
                EntryState::Worker {
                    status: WorkerStatus::Alive,
                    last_activity_at,
                },
                LifecycleEvent::Activity,
            ) => {
                *last_activity_at = now;
                true
            }
            (EntryState::Worker { status, .. }, LifecycleEvent::Terminated)
                if *status == WorkerStatus::Alive =>
            {
                *status = WorkerStatus::Terminated;
                true
            }
            (EntryState::ChannelEndpoint { status }, LifecycleEvent::Closed)
                if *status == ChannelStatus::Open =>
            {
                *status = ChannelStatus::Closed;
                true
            }
            _ => false,
        }
    }
}

/// Bookkeeping for one tracker: at most one session, entries in registration
/// order. Holds no policy; classification and reporting read from it.
#[derive(Default)]
pub(crate) struct Registry {
    entries: Vec<TrackedEntry>,
    enabled: bool,
    session: u64,
}

impl Registry {
    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn entries(&self) -> &[TrackedEntry] {
        if self.enabled { &self.entries } else { &[] }
    }

    pub(crate) fn track(&mut self) -> Result<u64, TrackError> {
        if self.enabled {
            return Err(TrackError::AlreadyTracking);
        }
        self.entries.clear();
        self.session += 1;
        self.enabled = true;
        tracing::info!(session = self.session, "leak tracking session started");
        Ok(self.session)
    }

    pub(crate) fn end_session(&mut self) -> Result<usize, TrackError> {
        if !self.enabled {
            return Err(TrackError::NotTracking);
        }
        let discarded = self.entries.len();
        self.entries.clear();
        self.enabled = false;
        tracing::info!(
            session = self.session,
            entries = discarded,
            "leak tracking session ended"
        );
        Ok(discarded)
    }

    /// Returns [`EntryId::UNTRACKED`] when no session is open.
    pub(crate) fn register(
        &mut self,
        new: NewEntry,
        label: Option<String>,
        now: Instant,
    ) -> EntryId {
        if !self.enabled {
            return EntryId::UNTRACKED;
        }
        let seq = self.entries.len() as u64 + 1;
        let Ok(id) = EntryId::new(self.session, seq) else {
            return EntryId::UNTRACKED;
        };
        let state = match new {
            NewEntry::Worker => EntryState::Worker {
                status: WorkerStatus::Alive,
                last_activity_at: now,
            },
            NewEntry::ChannelEndpoint => EntryState::ChannelEndpoint {
                status: ChannelStatus::Open,
            },
            NewEntry::SharedBuffer { size_bytes, probe } => {
                EntryState::SharedBuffer { size_bytes, probe }
            }
        };
        let entry = TrackedEntry {
            id,
            label,
            created_at: now,
            state,
        };
        tracing::debug!(
            kind = %entry.kind(),
            seq,
            label = entry.label().unwrap_or(""),
            "registered tracked resource"
        );
        self.entries.push(entry);
        id
    }

    /// Returns whether the event changed anything. Events for another
    /// session, an unknown entry, or a kind they do not apply to are ignored.
    pub(crate) fn update(&mut self, id: EntryId, event: LifecycleEvent, now: Instant) -> bool {
        let Some(entry) = self.get_mut(id) else {
            return false;
        };
        let applied = entry.apply(event, now);
        match (applied, event) {
            (true, LifecycleEvent::Activity) => {
                tracing::trace!(kind = %entry.kind(), seq = id.seq(), "activity")
            }
            (true, _) => tracing::debug!(
                kind = %entry.kind(),
                seq = id.seq(),
                status = ?entry.status(),
                "status changed"
            ),
            (false, _) => tracing::trace!(
                kind = %entry.kind(),
                seq = id.seq(),
                ?event,
                "ignored lifecycle event"
            ),
        }
        applied
    }

    pub(crate) fn get(&self, id: EntryId) -> Option<&TrackedEntry> {
        if !self.enabled || id.session() != self.session {
            return None;
        }
        let index = usize::try_from(id.seq()).ok()?.checked_sub(1)?;
        self.entries.get(index)
    }

    fn get_mut(&mut self, id: EntryId) -> Option<&mut TrackedEntry> {
        if !self.enabled || id.session() != self.session {
            return None;
        }
        let index = usize::try_from(id.seq()).ok()?.checked_sub(1)?;
        self.entries.get_mut(index)
    }
}
