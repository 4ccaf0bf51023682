//! Resource leak detection for tokio test suites.
//!
//! Leakwatch replaces a handful of concurrency primitives with tracked
//! equivalents. Between [`track`] and [`check`] every [`Worker`], channel
//! [`Endpoint`] and [`SharedBuffer`] constructed gets a registry entry, and
//! `check` fails with [`TrackError::LeakDetected`] if any of them is still
//! alive, open, or referenced.
//!
//! # Using this crate
//!
//! ```rust,no_run
//! use leakwatch::{channel_pair, CheckOptions, Worker};
//!
//! #[tokio::main]
//! async fn main() {
//!     leakwatch::track().unwrap();
//!
//!     let mut worker: Worker<u32, u32> = Worker::spawn("echo", |mut scope| async move {
//!         while let Some(n) = scope.recv().await {
//!             let _ = scope.post(n);
//!         }
//!     });
//!     let (mut a, _b) = channel_pair::<String>("events");
//!
//!     worker.post_message(1).unwrap();
//!     worker.recv().await;
//!     worker.terminate().await;
//!     a.close();
//!
//!     leakwatch::check(CheckOptions::default()).await.unwrap();
//! }
//! ```
//!
//! Every operation is also available on an explicit [`Tracker`], and the
//! `*_in` constructors register on a tracker you pass in. That keeps tests
//! that run in parallel out of each other's sessions.
//!
//! # What counts as a leak
//!
//! | Resource | Terminal state | Reached by |
//! |----------|----------------|------------|
//! | [`Worker`] | terminated | body returns, panics, or [`Worker::terminate`] |
//! | [`Endpoint`] | closed | [`Endpoint::close`] or dropping either half |
//! | [`SharedBuffer`] | released | the last clone is dropped |
//!
//! Alive workers are split into running and idle: idle means no message
//! posted to or by the worker for longer than the idle threshold
//! ([`set_idle_threshold`], default 5 s). Retained shared buffers are
//! candidates only, since a buffer can legitimately outlive a test.
//!
//! # Environment
//!
//! The process-wide tracker reads `LEAKWATCH_IDLE_THRESHOLD_MS`,
//! `LEAKWATCH_SETTLE_DELAY_MS` and `LEAKWATCH_REPORT_FORMAT` (`short`,
//! `summary`, `details` or `json`) on first use.

pub use leakwatch_runtime::*;
pub use leakwatch_tokio::*;
