use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use leakwatch_runtime::{Tracked, Tracker};
use leakwatch_types::{EntryId, LifecycleEvent};
use tokio::sync::mpsc;

/// State shared by the two halves of a pair. Closing is one-shot and covers
/// both registry entries.
struct Link {
    closed: AtomicBool,
    ends: [Tracked; 2],
}

impl Link {
    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        for end in &self.ends {
            end.emit(LifecycleEvent::Closed);
        }
        tracing::debug!(
            endpoints = ?[self.ends[0].id().seq(), self.ends[1].id().seq()],
            "channel pair closed"
        );
    }
}

/// One half of an entangled, bidirectional channel.
///
/// Messages posted on one half arrive at the other. Calling
/// [`Endpoint::close`] or dropping either half closes both. Moving an
/// endpoint into a worker moves its entry's fate along with it: when that
/// worker exits and drops it, the pair is closed.
pub struct Endpoint<T> {
    tx: Option<mpsc::UnboundedSender<T>>,
    rx: mpsc::UnboundedReceiver<T>,
    link: Arc<Link>,
    side: usize,
}

/// Creates a pair registered on [`Tracker::global`].
pub fn channel_pair<T>(label: impl Into<String>) -> (Endpoint<T>, Endpoint<T>) {
    channel_pair_in(Tracker::global(), label)
}

pub fn channel_pair_in<T>(
    tracker: &Tracker,
    label: impl Into<String>,
) -> (Endpoint<T>, Endpoint<T>) {
    let label = label.into();
    let end_label = |side: usize| {
        if label.is_empty() {
            String::new()
        } else {
            format!("{label}.port{side}")
        }
    };
    let link = Arc::new(Link {
        closed: AtomicBool::new(false),
        ends: [
            tracker.register_channel_endpoint(end_label(1)),
            tracker.register_channel_endpoint(end_label(2)),
        ],
    });

    let (tx_a, rx_b) = mpsc::unbounded_channel();
    let (tx_b, rx_a) = mpsc::unbounded_channel();
    let a = Endpoint {
        tx: Some(tx_a),
        rx: rx_a,
        link: Arc::clone(&link),
        side: 0,
    };
    let b = Endpoint {
        tx: Some(tx_b),
        rx: rx_b,
        link,
        side: 1,
    };
    (a, b)
}

impl<T> Endpoint<T> {
    pub fn id(&self) -> EntryId {
        self.link.ends[self.side].id()
    }

    /// The other half's entry id.
    pub fn peer_id(&self) -> EntryId {
        self.link.ends[1 - self.side].id()
    }

    pub fn is_closed(&self) -> bool {
        self.link.closed.load(Ordering::Acquire)
    }

    /// Sends to the other half. Fails once either half has been closed.
    pub fn post_message(&self, message: T) -> Result<(), mpsc::error::SendError<T>> {
        match &self.tx {
            Some(tx) if !self.is_closed() => tx.send(message),
            _ => Err(mpsc::error::SendError(message)),
        }
    }

    /// Next message from the other half, or `None` once the pair is closed
    /// and drained.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Closes both halves. Idempotent.
    pub fn close(&mut self) {
        self.tx = None;
        self.rx.close();
        self.link.close();
    }
}

impl<T> Drop for Endpoint<T> {
    fn drop(&mut self) {
        self.link.close();
    }
}

impl<T> std::fmt::Debug for Endpoint<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("id", &self.id().seq())
            .field("peer", &self.peer_id().seq())
            .field("closed", &self.is_closed())
            .finish()
    }
}
