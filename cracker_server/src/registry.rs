/*!
 * Coordinator-side bookkeeping for connected workers: identity, current
 * assignment, last checkpoint, and the liveness sweep that evicts workers
 * gone quiet for too long.
 */
use std::collections::HashMap;
use std::net::{SocketAddr, TcpStream};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use cracker_core::cracker_error;
use cracker_core::error::CrackerError;
use cracker_core::keyspace::Range;
use cracker_core::protocol::Message;

use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Handshaking,
    Idle,
    Assigned,
    Closed,
}

pub struct WorkerRecord {
    pub addr: SocketAddr,
    pub state: WorkerState,
    pub session: Arc<Mutex<Session>>,
    /// Clone of the accepted socket held outside the session mutex, so the
    /// liveness sweep can shut a dead connection down without contending
    /// with a handler thread parked in `Session::recv`.
    pub shutdown: TcpStream,
    pub assignment: Option<Range>,
    pub last_checkpoint: Option<u64>,
    pub last_checkpoint_at: Instant,
}

pub type WorkerId = u64;

pub struct WorkerRegistry {
    next_id: AtomicU64,
    workers: Mutex<HashMap<WorkerId, WorkerRecord>>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self { next_id: AtomicU64::new(1), workers: Mutex::new(HashMap::new()) }
    }

    pub fn register(&self, addr: SocketAddr, session: Arc<Mutex<Session>>, shutdown: TcpStream) -> WorkerId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.workers.lock().unwrap().insert(
            id,
            WorkerRecord {
                addr,
                state: WorkerState::Handshaking,
                session,
                shutdown,
                assignment: None,
                last_checkpoint: None,
                last_checkpoint_at: Instant::now(),
            },
        );
        id
    }

    pub fn mark_idle(&self, id: WorkerId) {
        if let Some(w) = self.workers.lock().unwrap().get_mut(&id) {
            w.state = WorkerState::Idle;
            w.assignment = None;
            w.last_checkpoint = None;
        }
    }

    pub fn mark_assigned(&self, id: WorkerId, range: Range) {
        if let Some(w) = self.workers.lock().unwrap().get_mut(&id) {
            w.state = WorkerState::Assigned;
            w.assignment = Some(range);
            w.last_checkpoint = None;
            w.last_checkpoint_at = Instant::now();
        }
    }

    /// Validates and records a checkpoint. A checkpoint index outside the
    /// worker's current assignment window is a protocol violation.
    pub fn record_checkpoint(&self, id: WorkerId, idx: u64) -> Result<(), CrackerError> {
        let mut workers = self.workers.lock().unwrap();
        let w = workers
            .get_mut(&id)
            .ok_or_else(|| cracker_error!(Protocol, "checkpoint from unknown worker"))?;
        let (start, len) = w
            .assignment
            .ok_or_else(|| cracker_error!(Protocol, "checkpoint with no active assignment"))?;
        if idx < start || idx >= start + len {
            return Err(cracker_error!(
                Range,
                "checkpoint {idx} outside assignment [{start}, {})",
                start + len
            ));
        }
        w.last_checkpoint = Some(idx);
        w.last_checkpoint_at = Instant::now();
        Ok(())
    }

    pub fn remove(&self, id: WorkerId) {
        if let Some(mut w) = self.workers.lock().unwrap().remove(&id) {
            w.state = WorkerState::Closed;
        }
    }

    pub fn broadcast_stop(&self) {
        for w in self.workers.lock().unwrap().values() {
            let mut guard = w.session.lock().unwrap();
            if let Err(e) = guard.send(&Message::Stop) {
                tracing::warn!(addr = %w.addr, error = %e, "failed to deliver STOP");
            }
        }
    }

    /// Evicts every worker whose last checkpoint (or whose assignment, if
    /// no checkpoint has arrived yet) is older than `stale_after`, returning
    /// the un-progressed tail of each evicted assignment for reassignment.
    pub fn sweep_stale(&self, stale_after: std::time::Duration) -> Vec<Range> {
        // Collect and remove the stale records while the map lock is held,
        // then drop it before touching any socket. A handler thread for an
        // `Assigned` worker is parked in `Session::recv` holding that
        // worker's session mutex for the duration of the blocking read;
        // shutting its socket down must not depend on acquiring that lock,
        // nor on this sweep still holding the map lock while it does so.
        let removed: Vec<WorkerRecord> = {
            let mut workers = self.workers.lock().unwrap();
            let stale: Vec<WorkerId> = workers
                .iter()
                .filter(|(_, w)| {
                    w.state == WorkerState::Assigned && w.last_checkpoint_at.elapsed() > stale_after
                })
                .map(|(id, _)| *id)
                .collect();
            stale.into_iter().filter_map(|id| workers.remove(&id)).collect()
        };

        let mut tails = Vec::new();
        for w in removed {
            tracing::warn!(addr = %w.addr, "evicting unresponsive worker");
            let _ = w.shutdown.shutdown(std::net::Shutdown::Both);
            if let Some((start, len)) = w.assignment {
                let progressed = w.last_checkpoint.map(|c| c + 1 - start).unwrap_or(0);
                let tail = (start + progressed, len - progressed);
                tails.push(tail);
            }
        }
        tails
    }

    pub fn live_count(&self) -> usize {
        self.workers.lock().unwrap().len()
    }

    pub fn has_outstanding_assignment(&self) -> bool {
        self.workers
            .lock()
            .unwrap()
            .values()
            .any(|w| w.state == WorkerState::Assigned)
    }
}

impl Default for WorkerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
