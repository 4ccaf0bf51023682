use std::time::Duration;

use leakwatch::{CheckOptions, Tracker, Worker};

pub async fn run(tracker: &Tracker, options: CheckOptions) -> Result<(), String> {
    let threshold = tracker.idle_threshold();
    let mut worker: Worker<(), &'static str> =
        Worker::spawn_in(tracker, "demo.quiet", |mut scope| async move {
            let _ = scope.post("ready");
            while scope.recv().await.is_some() {}
        });
    if let Some(greeting) = worker.recv().await {
        println!("worker said {greeting:?}, then went quiet");
    }

    let wait = threshold + Duration::from_millis(50);
    println!("waiting {}ms for it to pass the idle threshold", wait.as_millis());
    tokio::time::sleep(wait).await;
    println!("idle workers: {}", tracker.snapshot().workers.idle);

    let result = super::report(tracker, options).await;
    worker.terminate().await;
    result
}
