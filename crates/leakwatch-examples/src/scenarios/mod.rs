pub mod clean_worker;
pub mod idle_worker;
pub mod leaked_worker;
pub mod shared_buffer;
pub mod transferred_endpoint;

use leakwatch::{render, CheckOptions, TrackError, Tracker};

/// Runs the check and prints whatever it found. A detected leak is the
/// expected outcome for most scenarios, so only other errors fail the run.
pub async fn report(tracker: &Tracker, options: CheckOptions) -> Result<(), String> {
    match tracker.check(options).await {
        Ok(report) => {
            println!("{}", render(&report, options.format.unwrap_or_default()));
            Ok(())
        }
        Err(TrackError::LeakDetected(leaks)) => {
            println!("{leaks}");
            Ok(())
        }
        Err(err) => Err(err.to_string()),
    }
}

pub fn echo_worker(tracker: &Tracker, label: &str) -> leakwatch::Worker<u32, u32> {
    leakwatch::Worker::spawn_in(tracker, label, |mut scope| async move {
        while let Some(n) = scope.recv().await {
            if scope.post(n).is_err() {
                break;
            }
        }
    })
}
