/*!
 * Keyspace partitioning, the reassignment queue, and the single winner
 * slot — the pieces of coordinator state shared by every per-worker
 * handler thread.
 */
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use cracker_core::config::ServerConfig;
use cracker_core::keyspace::{Keyspace, Range, ReassignmentQueue};

use crate::registry::WorkerRegistry;

pub struct Dispatcher {
    pub keyspace: Keyspace,
    pub reassignment: ReassignmentQueue,
    pub work_size: u64,
    pub checkpoint_interval: u64,
    pub timeout_seconds: u32,
    pub target_hash: String,
    winner: OnceLock<(String, SocketAddr)>,
    pub stopping: AtomicBool,
}

impl Dispatcher {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            keyspace: Keyspace::new(config.keyspace_size),
            reassignment: ReassignmentQueue::new(),
            work_size: config.work_size,
            checkpoint_interval: config.checkpoint_interval,
            timeout_seconds: config.timeout_seconds,
            target_hash: config.target_hash.clone(),
            winner: OnceLock::new(),
            stopping: AtomicBool::new(false),
        }
    }

    /// Un-progressed tails are handed out before fresh keyspace, so no
    /// range dispatched once is ever skipped.
    pub fn next_assignment(&self) -> Option<Range> {
        self.reassignment.pop().or_else(|| self.keyspace.claim(self.work_size))
    }

    /// First caller wins; later calls are reported but discarded.
    pub fn try_accept_winner(&self, candidate: &str, from: SocketAddr) -> bool {
        let accepted = self.winner.set((candidate.to_string(), from)).is_ok();
        if accepted {
            self.stopping.store(true, Ordering::SeqCst);
        }
        accepted
    }

    pub fn winner(&self) -> Option<&(String, SocketAddr)> {
        self.winner.get()
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }

    /// True once the cursor and the reassignment queue are both drained and
    /// no worker still holds an assignment — the whole keyspace has been
    /// attempted with no match.
    pub fn is_exhausted(&self, registry: &WorkerRegistry) -> bool {
        self.keyspace.cursor_exhausted()
            && self.reassignment.is_empty()
            && !registry.has_outstanding_assignment()
    }
}
