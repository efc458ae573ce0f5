/*!
 * Background sweep that evicts workers whose last checkpoint is older
 * than twice their assignment timeout, returning the un-progressed tail
 * of each eviction to the dispatcher's reassignment queue.
 */
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::dispatcher::Dispatcher;
use crate::registry::WorkerRegistry;

const SWEEP_INTERVAL: Duration = Duration::from_secs(5);

pub fn spawn(dispatcher: Arc<Dispatcher>, registry: Arc<WorkerRegistry>) -> thread::JoinHandle<()> {
    thread::Builder::new()
        .name("liveness-sweep".into())
        .spawn(move || loop {
            if dispatcher.is_stopping() {
                return;
            }
            thread::sleep(SWEEP_INTERVAL);
            let stale_after = Duration::from_secs(dispatcher.timeout_seconds as u64 * 2);
            for tail in registry.sweep_stale(stale_after) {
                tracing::info!(start = tail.0, len = tail.1, "tail queued for reassignment");
                dispatcher.reassignment.push(tail);
            }
        })
        .expect("failed to spawn liveness sweep thread")
}
