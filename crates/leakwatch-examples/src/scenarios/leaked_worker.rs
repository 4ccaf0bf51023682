use leakwatch::{CheckOptions, Tracker};

use super::echo_worker;

pub async fn run(tracker: &Tracker, options: CheckOptions) -> Result<(), String> {
    let mut worker = echo_worker(tracker, "demo.forgotten");
    worker
        .post_message(1)
        .map_err(|e| format!("worker stopped early: {e}"))?;
    worker.recv().await;

    println!("checking while the worker is still running");
    let result = super::report(tracker, options).await;
    worker.terminate().await;
    result
}
