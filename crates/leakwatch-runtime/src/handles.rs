use std::fmt;

use leakwatch_types::{EntryId, LifecycleEvent};

use crate::Tracker;

/// A proxy's link to its registry entry.
///
/// Created by one of the `Tracker::register_*` calls at construction time and
/// used to forward that instance's lifecycle events. When no session was open
/// at construction the handle is untracked and every emit is a no-op, so the
/// wrapped resource behaves exactly like its untracked counterpart.
#[derive(Clone)]
pub struct Tracked {
    tracker: Tracker,
    id: EntryId,
}

impl Tracked {
    pub(crate) fn new(tracker: Tracker, id: EntryId) -> Self {
        Self { tracker, id }
    }

    pub fn id(&self) -> EntryId {
        self.id
    }

    pub fn is_tracked(&self) -> bool {
        self.id.is_tracked()
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    /// Returns whether the event changed the entry.
    pub fn emit(&self, event: LifecycleEvent) -> bool {
        if !self.is_tracked() {
            return false;
        }
        self.tracker.update(self.id, event)
    }
}

impl fmt::Debug for Tracked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracked")
            .field("session", &self.id.session())
            .field("seq", &self.id.seq())
            .finish()
    }
}
