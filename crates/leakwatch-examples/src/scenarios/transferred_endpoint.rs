use leakwatch::{channel_pair_in, CheckOptions, Tracker, Worker};

pub async fn run(tracker: &Tracker, options: CheckOptions) -> Result<(), String> {
    let (mut local, remote) = channel_pair_in::<String>(tracker, "demo.jobs");
    let relay: Worker<(), ()> = Worker::spawn_in(tracker, "demo.relay", move |_scope| async move {
        let mut port = remote;
        while let Some(job) = port.recv().await {
            if port.post_message(format!("done: {job}")).is_err() {
                break;
            }
        }
    });

    local
        .post_message("resize".to_owned())
        .map_err(|e| format!("pair closed early: {e}"))?;
    if let Some(reply) = local.recv().await {
        println!("relay answered {reply:?}");
    }

    println!("keeping the local endpoint open and the relay running");
    let result = super::report(tracker, options).await;
    local.close();
    relay.join().await.map_err(|e| e.to_string())?;
    result
}
