use std::future::Future;

use leakwatch_runtime::{Tracked, Tracker};
use leakwatch_types::{EntryId, LifecycleEvent};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};

/// A tracked tokio task with a mailbox in each direction.
///
/// Registered as a Worker entry on spawn. Messages posted in either direction
/// count as activity. The entry becomes Terminated when the task body
/// returns, panics, or is aborted through [`Worker::terminate`]. Dropping a
/// `Worker` closes the worker's inbox and detaches the task; it only leaks
/// if the body keeps running after [`WorkerScope::recv`] returns `None`.
pub struct Worker<In, Out> {
    to_worker: mpsc::UnboundedSender<In>,
    from_worker: mpsc::UnboundedReceiver<Out>,
    join: JoinHandle<()>,
    tracked: Tracked,
}

/// The worker's side of its mailboxes, handed to the task body.
pub struct WorkerScope<In, Out> {
    inbox: mpsc::UnboundedReceiver<In>,
    outbox: mpsc::UnboundedSender<Out>,
    tracked: Tracked,
}

/// Emits Terminated when the task future is dropped, whether it finished,
/// panicked, or was aborted before it ever ran.
struct ExitGuard {
    tracked: Tracked,
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        if self.tracked.emit(LifecycleEvent::Terminated) {
            tracing::debug!(worker = self.tracked.id().seq(), "worker terminated");
        }
    }
}

impl<In, Out> Worker<In, Out>
where
    In: Send + 'static,
    Out: Send + 'static,
{
    /// Spawns a worker registered on [`Tracker::global`].
    pub fn spawn<F, Fut>(label: impl Into<String>, body: F) -> Self
    where
        F: FnOnce(WorkerScope<In, Out>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::spawn_in(Tracker::global(), label, body)
    }

    pub fn spawn_in<F, Fut>(tracker: &Tracker, label: impl Into<String>, body: F) -> Self
    where
        F: FnOnce(WorkerScope<In, Out>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let tracked = tracker.register_worker(label);
        let (to_worker, inbox) = mpsc::unbounded_channel();
        let (outbox, from_worker) = mpsc::unbounded_channel();

        let scope = WorkerScope {
            inbox,
            outbox,
            tracked: tracked.clone(),
        };
        let guard = ExitGuard {
            tracked: tracked.clone(),
        };
        let task = body(scope);
        let join = tokio::spawn(async move {
            let guard = guard;
            tracing::debug!(worker = guard.tracked.id().seq(), "worker online");
            task.await;
            drop(guard);
        });

        Self {
            to_worker,
            from_worker,
            join,
            tracked,
        }
    }
}

impl<In, Out> Worker<In, Out> {
    pub fn id(&self) -> EntryId {
        self.tracked.id()
    }

    /// Queues a message for the worker. Fails once the worker has exited.
    pub fn post_message(&self, message: In) -> Result<(), mpsc::error::SendError<In>> {
        self.to_worker.send(message)?;
        self.tracked.emit(LifecycleEvent::Activity);
        Ok(())
    }

    /// Next message posted by the worker, or `None` once it has exited and
    /// everything it posted has been received.
    pub async fn recv(&mut self) -> Option<Out> {
        self.from_worker.recv().await
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Aborts the worker and waits until the task is gone.
    pub async fn terminate(self) {
        let Self { join, tracked, .. } = self;
        join.abort();
        if let Err(err) = join.await {
            if err.is_panic() {
                tracing::warn!(worker = tracked.id().seq(), "worker panicked before termination");
            }
        }
        tracked.emit(LifecycleEvent::Terminated);
    }

    /// Closes the worker's inbox and waits for the body to return.
    pub async fn join(self) -> Result<(), JoinError> {
        let Self { to_worker, join, .. } = self;
        drop(to_worker);
        join.await
    }
}

impl<In, Out> WorkerScope<In, Out> {
    pub fn id(&self) -> EntryId {
        self.tracked.id()
    }

    /// Next message from the parent, or `None` once the parent stopped
    /// holding the worker.
    pub async fn recv(&mut self) -> Option<In> {
        self.inbox.recv().await
    }

    /// Posts a message back to the parent.
    pub fn post(&self, message: Out) -> Result<(), mpsc::error::SendError<Out>> {
        self.outbox.send(message)?;
        self.tracked.emit(LifecycleEvent::Activity);
        Ok(())
    }
}

impl<In, Out> std::fmt::Debug for Worker<In, Out> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("tracked", &self.tracked)
            .field("finished", &self.join.is_finished())
            .finish()
    }
}
