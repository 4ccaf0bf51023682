//! Tracked tokio resources.
//!
//! Each type here behaves like the primitive it wraps and additionally keeps
//! a registry entry on the [`Tracker`](leakwatch_runtime::Tracker) it was
//! constructed against. Outside a session nothing is recorded.

pub(crate) mod channel;
pub(crate) mod shared_buffer;
pub(crate) mod worker;

pub use self::channel::{channel_pair, channel_pair_in, Endpoint};
pub use self::shared_buffer::SharedBuffer;
pub use self::worker::{Worker, WorkerScope};
