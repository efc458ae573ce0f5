/*!
 * The parallel crack loop: `T` threads sharing an atomic cursor claimed via
 * fetch-add, an atomic found flag, and a mutex-serialized control socket.
 */
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use cracker_core::candidate::{CandidateSource, HashMatcher};
use cracker_core::protocol::Message;

use crate::session::Session;

/// Indices claimed per fetch-add. Small enough that a thread checks the
/// found flag and deadline often, large enough to keep the atomic off the
/// hot path of the inner candidate loop.
const GRAIN: u64 = 4096;

pub struct CrackOutcome {
    pub found: Option<Vec<u8>>,
    pub last_checkpoint: Option<u64>,
}

/// Runs the crack loop over `[start, start + len)` with `num_threads`
/// workers. Blocks until every thread has exited: either a match was
/// found, the range was exhausted, or `timeout` elapsed.
#[allow(clippy::too_many_arguments)]
pub fn run(
    session: Arc<Mutex<Session>>,
    start: u64,
    len: u64,
    checkpoint_interval: u64,
    timeout: Duration,
    num_threads: usize,
    candidate_source: Arc<dyn CandidateSource>,
    hash_matcher: Arc<dyn HashMatcher>,
    target_hash: Arc<String>,
) -> CrackOutcome {
    let end = start + len;
    let shared_cursor = Arc::new(AtomicU64::new(start));
    let found_flag = Arc::new(AtomicBool::new(false));
    let last_emitted = Arc::new(AtomicU64::new(start));
    let found_candidate: Arc<Mutex<Option<Vec<u8>>>> = Arc::new(Mutex::new(None));
    let deadline = Instant::now() + timeout;

    let handles: Vec<_> = (0..num_threads.max(1))
        .map(|_| {
            let shared_cursor = shared_cursor.clone();
            let found_flag = found_flag.clone();
            let last_emitted = last_emitted.clone();
            let found_candidate = found_candidate.clone();
            let session = session.clone();
            let candidate_source = candidate_source.clone();
            let hash_matcher = hash_matcher.clone();
            let target_hash = target_hash.clone();

            thread::spawn(move || {
                worker_loop(
                    &shared_cursor,
                    &found_flag,
                    &last_emitted,
                    &found_candidate,
                    &session,
                    end,
                    checkpoint_interval,
                    deadline,
                    candidate_source.as_ref(),
                    hash_matcher.as_ref(),
                    &target_hash,
                );
            })
        })
        .collect();

    for h in handles {
        let _ = h.join();
    }

    let found = found_candidate.lock().unwrap().take();
    let last = last_emitted.load(Ordering::Acquire);
    let last_checkpoint = if last > start { Some(last - 1) } else { None };

    CrackOutcome { found, last_checkpoint }
}

#[allow(clippy::too_many_arguments)]
fn worker_loop(
    shared_cursor: &AtomicU64,
    found_flag: &AtomicBool,
    last_emitted: &AtomicU64,
    found_candidate: &Mutex<Option<Vec<u8>>>,
    session: &Mutex<Session>,
    end: u64,
    checkpoint_interval: u64,
    deadline: Instant,
    candidate_source: &dyn CandidateSource,
    hash_matcher: &dyn HashMatcher,
    target_hash: &str,
) {
    loop {
        if found_flag.load(Ordering::Acquire) {
            return;
        }
        if Instant::now() >= deadline {
            found_flag.store(true, Ordering::Release);
            return;
        }

        let chunk_start = shared_cursor.fetch_add(GRAIN, Ordering::AcqRel);
        if chunk_start >= end {
            return;
        }
        let chunk_end = (chunk_start + GRAIN).min(end);

        for idx in chunk_start..chunk_end {
            if found_flag.load(Ordering::Acquire) {
                return;
            }
            let candidate = candidate_source.candidate(idx);
            if hash_matcher.matches(&candidate, target_hash) {
                found_flag.store(true, Ordering::Release);
                *found_candidate.lock().unwrap() = Some(candidate.clone());
                let text = String::from_utf8_lossy(&candidate).into_owned();
                send_locked(session, &Message::Found(text));
                return;
            }
        }

        maybe_checkpoint(last_emitted, session, chunk_end, checkpoint_interval);
    }
}

/// Decides whether to checkpoint and sends it under one acquisition of the
/// session lock, so the index that gets chosen and the order messages hit
/// the wire in always agree. A lock-free `compare_exchange` on
/// `last_emitted` followed by a separately-locked `send` would let two
/// threads race: whichever wins the later CAS could still lose the send,
/// putting a smaller checkpoint index on the wire after a larger one.
fn maybe_checkpoint(
    last_emitted: &AtomicU64,
    session: &Mutex<Session>,
    chunk_end: u64,
    checkpoint_interval: u64,
) {
    let candidate_idx = chunk_end; // exclusive end == first not-yet-evaluated index
    if candidate_idx < last_emitted.load(Ordering::Acquire) + checkpoint_interval {
        return;
    }

    let mut guard = session.lock().unwrap();
    let prev = last_emitted.load(Ordering::Acquire);
    if candidate_idx < prev + checkpoint_interval {
        return;
    }
    last_emitted.store(candidate_idx, Ordering::Release);
    if let Err(e) = guard.send(&Message::Checkpoint(candidate_idx - 1)) {
        tracing::warn!(error = %e, "failed to emit message from crack loop");
    }
}

fn send_locked(session: &Mutex<Session>, msg: &Message) {
    let mut guard = session.lock().unwrap();
    if let Err(e) = guard.send(msg) {
        tracing::warn!(error = %e, "failed to emit message from crack loop");
    }
}
