use leakwatch::{CheckOptions, Tracker};

use super::echo_worker;

pub async fn run(tracker: &Tracker, options: CheckOptions) -> Result<(), String> {
    let mut worker = echo_worker(tracker, "demo.echo");
    worker
        .post_message(7)
        .map_err(|e| format!("worker stopped early: {e}"))?;
    let reply = worker.recv().await;
    println!("echo replied with {reply:?}; terminating it");

    worker.terminate().await;
    println!("snapshot before check: {:?}", tracker.snapshot().workers);
    super::report(tracker, options).await
}
