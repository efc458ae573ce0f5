/*!
 * The worker's state machine.
 *
 * Happy path: `ResolveAddr -> Connect -> WaitHash -> WaitWork -> Crack ->
 * SendDone -> WaitWork -> ... -> Cleanup -> Exit`, with `Stop` from the
 * coordinator routing `WaitWork` straight to `Cleanup`. Every state also
 * has an implicit path to `Error` via its action's `Result`; `cracker_core`'s
 * runtime takes care of routing any `Err` to `Cleanup`.
 */
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use cracker_core::candidate::{CandidateSource, HashMatcher};
use cracker_core::config::WorkerConfig;
use cracker_core::error::CrackerError;
use cracker_core::fsm::{Fsm, Transition};
use cracker_core::protocol::Message;
use cracker_core::{cracker_error, net};

use crate::crack;
use crate::session::Session;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum State {
    ResolveAddr,
    Connect,
    WaitHash,
    WaitWork,
    Crack,
    SendDone,
    Cleanup,
    Error,
    Exit,
}

struct Assignment {
    start: u64,
    len: u64,
    checkpoint_interval: u64,
    timeout: Duration,
}

pub struct WorkerCtx {
    pub config: WorkerConfig,
    pub candidate_source: Arc<dyn CandidateSource>,
    pub hash_matcher: Arc<dyn HashMatcher>,
    target_hash: Option<Arc<String>>,
    session: Option<Arc<Mutex<Session>>>,
    current_assignment: Option<Assignment>,
    started_at: Option<Instant>,
    session_elapsed: Option<Duration>,
}

impl WorkerCtx {
    pub fn new(
        config: WorkerConfig,
        candidate_source: Arc<dyn CandidateSource>,
        hash_matcher: Arc<dyn HashMatcher>,
    ) -> Self {
        Self {
            config,
            candidate_source,
            hash_matcher,
            target_hash: None,
            session: None,
            current_assignment: None,
            started_at: None,
            session_elapsed: None,
        }
    }

    fn session(&self) -> Result<Arc<Mutex<Session>>, CrackerError> {
        self.session
            .clone()
            .ok_or_else(|| cracker_error!(Protocol, "no active session"))
    }

    /// Wall-clock duration of the just-finished session, available once the
    /// machine has reached `Exit`. There is no portable CPU-time source in
    /// the dependency stack, so only wall time is reported.
    pub fn session_elapsed(&self) -> Option<Duration> {
        self.session_elapsed
    }
}

pub fn machine() -> Fsm<State, WorkerCtx> {
    Fsm::new(
        vec![
            Transition { state: State::ResolveAddr, action: resolve_addr },
            Transition { state: State::Connect, action: connect },
            Transition { state: State::WaitHash, action: wait_hash },
            Transition { state: State::WaitWork, action: wait_work },
            Transition { state: State::Crack, action: crack_state },
            Transition { state: State::SendDone, action: send_done },
            Transition { state: State::Cleanup, action: cleanup_ok },
        ],
        State::Exit,
        State::Error,
        cleanup,
    )
}

fn resolve_addr(ctx: &mut WorkerCtx) -> Result<State, CrackerError> {
    tracing::debug!(addr = %ctx.config.coordinator_addr, port = ctx.config.coordinator_port, "resolving coordinator address");
    net::resolve(&ctx.config.coordinator_addr, ctx.config.coordinator_port)?;
    Ok(State::Connect)
}

fn connect(ctx: &mut WorkerCtx) -> Result<State, CrackerError> {
    let addr = net::resolve(&ctx.config.coordinator_addr, ctx.config.coordinator_port)?;
    tracing::info!(%addr, "connecting to coordinator");
    let session = Session::connect(addr)?;
    ctx.session = Some(Arc::new(Mutex::new(session)));
    ctx.started_at = Some(Instant::now());
    Ok(State::WaitHash)
}

fn wait_hash(ctx: &mut WorkerCtx) -> Result<State, CrackerError> {
    let session = ctx.session()?;
    let mut guard = session.lock().unwrap();
    let msg = guard.recv()?;
    let hash = match msg {
        Message::Hash(h) => h,
        other => return Err(cracker_error!(Protocol, "expected HASH, got {other:?}")),
    };
    guard.send(&Message::Ready)?;
    drop(guard);
    tracing::debug!("handshake complete, target hash received");
    ctx.target_hash = Some(Arc::new(hash));
    Ok(State::WaitWork)
}

fn wait_work(ctx: &mut WorkerCtx) -> Result<State, CrackerError> {
    let session = ctx.session()?;
    let msg = session.lock().unwrap().recv()?;
    match msg {
        Message::Work { start, len, checkpoint, timeout } => {
            ctx.current_assignment = Some(Assignment {
                start,
                len,
                checkpoint_interval: checkpoint.max(1),
                timeout: Duration::from_secs(timeout as u64),
            });
            Ok(State::Crack)
        }
        Message::Stop => {
            tracing::info!("received STOP, shutting down");
            Ok(State::Cleanup)
        }
        other => Err(cracker_error!(Protocol, "expected WORK or STOP, got {other:?}")),
    }
}

fn crack_state(ctx: &mut WorkerCtx) -> Result<State, CrackerError> {
    let assignment = ctx
        .current_assignment
        .take()
        .ok_or_else(|| cracker_error!(Protocol, "CRACK entered with no pending assignment"))?;

    let session = ctx.session()?;
    let target_hash = ctx
        .target_hash
        .clone()
        .ok_or_else(|| cracker_error!(Protocol, "CRACK entered before handshake"))?;

    tracing::info!(start = assignment.start, len = assignment.len, "cracking assignment");

    let outcome = crack::run(
        session,
        assignment.start,
        assignment.len,
        assignment.checkpoint_interval,
        assignment.timeout,
        ctx.config.threads,
        ctx.candidate_source.clone(),
        ctx.hash_matcher.clone(),
        target_hash,
    );

    if let Some(found) = outcome.found {
        tracing::info!(candidate = %String::from_utf8_lossy(&found), "match found, awaiting STOP");
        return Ok(State::WaitWork);
    }

    tracing::debug!(last_checkpoint = ?outcome.last_checkpoint, "unit exhausted without a match");
    Ok(State::SendDone)
}

fn send_done(ctx: &mut WorkerCtx) -> Result<State, CrackerError> {
    let session = ctx.session()?;
    session.lock().unwrap().send(&Message::Done)?;
    Ok(State::WaitWork)
}

/// Idempotent: safe to call whether the session ever got as far as a
/// handshake or not, and safe to call twice.
fn cleanup(ctx: &mut WorkerCtx) -> State {
    if let Some(started_at) = ctx.started_at.take() {
        let elapsed = started_at.elapsed();
        tracing::info!(?elapsed, "session finished");
        ctx.session_elapsed = Some(elapsed);
    }
    ctx.session = None;
    State::Exit
}

fn cleanup_ok(ctx: &mut WorkerCtx) -> Result<State, CrackerError> {
    Ok(cleanup(ctx))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn machine_has_one_action_per_non_terminal_state() {
        let fsm = machine();
        // exercised indirectly through integration tests; this just
        // documents that constructing the table doesn't panic.
        let _ = fsm;
    }
}
