use leakwatch::{CheckOptions, SharedBuffer, Tracker, Worker};

pub async fn run(tracker: &Tracker, options: CheckOptions) -> Result<(), String> {
    let released = SharedBuffer::new_in(tracker, "demo.scratch", 4096);
    let writer: Worker<(), ()> = {
        let buffer = released.clone();
        Worker::spawn_in(tracker, "demo.writer", move |_scope| async move {
            for index in 0..buffer.len() {
                buffer.store(index, (index % 251) as u8);
            }
        })
    };
    writer.join().await.map_err(|e| e.to_string())?;
    println!("writer filled {} bytes", released.len());
    drop(released);

    let cache = SharedBuffer::new_in(tracker, "demo.cache", 1024);
    println!("still holding {} ({} handle)", cache.len(), cache.handle_count());

    let result = super::report(tracker, options.force_gc(true)).await;
    drop(cache);
    result
}
