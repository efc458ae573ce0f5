/*!
 * Per-connection handler: the sub-FSM the coordinator runs once per
 * accepted worker. `AwaitCheckpoint` / `AwaitDone` / `AwaitFound` from the
 * outline collapse into one `AwaitReply` state here — the three messages
 * share the same "block on recv, branch on variant" shape and nothing is
 * gained by giving each its own state.
 */
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use cracker_core::cracker_error;
use cracker_core::error::CrackerError;
use cracker_core::fsm::{Fsm, Transition};
use cracker_core::protocol::Message;

use crate::dispatcher::Dispatcher;
use crate::registry::{WorkerId, WorkerRegistry};
use crate::session::Session;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum State {
    SendHash,
    AwaitReady,
    Dispatch,
    AwaitReply,
    Terminate,
    Cleanup,
    Error,
    Exit,
}

pub struct ConnCtx {
    pub id: WorkerId,
    pub addr: SocketAddr,
    pub session: Arc<Mutex<Session>>,
    pub dispatcher: Arc<Dispatcher>,
    pub registry: Arc<WorkerRegistry>,
}

pub fn machine() -> Fsm<State, ConnCtx> {
    Fsm::new(
        vec![
            Transition { state: State::SendHash, action: send_hash },
            Transition { state: State::AwaitReady, action: await_ready },
            Transition { state: State::Dispatch, action: dispatch },
            Transition { state: State::AwaitReply, action: await_reply },
            Transition { state: State::Terminate, action: terminate },
            Transition { state: State::Cleanup, action: cleanup_ok },
        ],
        State::Exit,
        State::Error,
        cleanup,
    )
}

fn send_hash(ctx: &mut ConnCtx) -> Result<State, CrackerError> {
    ctx.session.lock().unwrap().send(&Message::Hash(ctx.dispatcher.target_hash.clone()))?;
    Ok(State::AwaitReady)
}

fn await_ready(ctx: &mut ConnCtx) -> Result<State, CrackerError> {
    let msg = ctx.session.lock().unwrap().recv()?;
    match msg {
        Message::Ready => {
            ctx.registry.mark_idle(ctx.id);
            Ok(State::Dispatch)
        }
        other => Err(cracker_error!(Protocol, "expected READY, got {other:?}")),
    }
}

fn dispatch(ctx: &mut ConnCtx) -> Result<State, CrackerError> {
    loop {
        if ctx.dispatcher.is_stopping() || ctx.dispatcher.is_exhausted(&ctx.registry) {
            return Ok(State::Terminate);
        }
        if let Some((start, len)) = ctx.dispatcher.next_assignment() {
            let work = Message::Work {
                start,
                len,
                checkpoint: ctx.dispatcher.checkpoint_interval,
                timeout: ctx.dispatcher.timeout_seconds,
            };
            ctx.session.lock().unwrap().send(&work)?;
            ctx.registry.mark_assigned(ctx.id, (start, len));
            tracing::info!(id = ctx.id, %start, %len, "assigned work unit");
            return Ok(State::AwaitReply);
        }
        // Nothing free to hand out right now, but other workers are still
        // making progress; a reassignment or exhaustion may show up soon.
        thread::sleep(Duration::from_millis(50));
    }
}

fn await_reply(ctx: &mut ConnCtx) -> Result<State, CrackerError> {
    let msg = ctx.session.lock().unwrap().recv()?;
    match msg {
        Message::Checkpoint(idx) => {
            ctx.registry.record_checkpoint(ctx.id, idx)?;
            Ok(State::AwaitReply)
        }
        Message::Done => {
            ctx.registry.mark_idle(ctx.id);
            Ok(State::Dispatch)
        }
        Message::Found(candidate) => {
            let accepted = ctx.dispatcher.try_accept_winner(&candidate, ctx.addr);
            if accepted {
                println!("FOUND {candidate} (worker {})", ctx.addr);
                tracing::info!(%candidate, addr = %ctx.addr, "winning candidate accepted");
            } else {
                tracing::info!(%candidate, addr = %ctx.addr, "duplicate FOUND discarded, winner already set");
            }
            ctx.registry.mark_idle(ctx.id);
            Ok(State::Terminate)
        }
        other => Err(cracker_error!(Protocol, "expected CHECKPOINT, DONE or FOUND, got {other:?}")),
    }
}

fn terminate(ctx: &mut ConnCtx) -> Result<State, CrackerError> {
    let _ = ctx.session.lock().unwrap().send(&Message::Stop);
    Ok(State::Cleanup)
}

fn cleanup(ctx: &mut ConnCtx) -> State {
    ctx.registry.remove(ctx.id);
    ctx.session.lock().unwrap().close();
    State::Exit
}

fn cleanup_ok(ctx: &mut ConnCtx) -> Result<State, CrackerError> {
    Ok(cleanup(ctx))
}
