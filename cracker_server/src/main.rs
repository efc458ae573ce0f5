//! Partitions a keyspace among connected workers and reports the winner.
//!
//! Usage: `cracker-server <bind-addr> <bind-port> <target-hash> <keyspace-size> <work-size> <checkpoint-interval> <timeout-seconds>`
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use cracker_core::config::ServerConfig;
use cracker_core::error::CrackerError;
use cracker_core::fsm::{Fsm, Transition};
use cracker_core::{cracker_error, net};

use cracker_server::dispatcher::Dispatcher;
use cracker_server::registry::WorkerRegistry;
use cracker_server::session::Session;
use cracker_server::{fsm, liveness};

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum State {
    ResolveAddr,
    Bind,
    Listen,
    AcceptLoop,
    Cleanup,
    Error,
    Exit,
}

struct ServerCtx {
    config: ServerConfig,
    dispatcher: Arc<Dispatcher>,
    registry: Arc<WorkerRegistry>,
    listener: Option<TcpListener>,
    liveness: Option<thread::JoinHandle<()>>,
    sigint: Arc<AtomicBool>,
}

fn machine() -> Fsm<State, ServerCtx> {
    Fsm::new(
        vec![
            Transition { state: State::ResolveAddr, action: resolve_addr },
            Transition { state: State::Bind, action: bind },
            Transition { state: State::Listen, action: listen },
            Transition { state: State::AcceptLoop, action: accept_loop },
            Transition { state: State::Cleanup, action: cleanup_ok },
        ],
        State::Exit,
        State::Error,
        cleanup,
    )
}

fn resolve_addr(ctx: &mut ServerCtx) -> Result<State, CrackerError> {
    net::resolve(&ctx.config.bind_addr, ctx.config.bind_port)?;
    Ok(State::Bind)
}

fn bind(ctx: &mut ServerCtx) -> Result<State, CrackerError> {
    let addr = net::resolve(&ctx.config.bind_addr, ctx.config.bind_port)?;
    let listener = TcpListener::bind(addr).map_err(|e| cracker_error!(Socket, "bind {addr} failed: {e}"))?;
    listener
        .set_nonblocking(true)
        .map_err(|e| cracker_error!(Socket, "failed to set listener non-blocking: {e}"))?;
    tracing::info!(%addr, keyspace = ctx.config.keyspace_size, "listening");
    ctx.listener = Some(listener);
    Ok(State::Listen)
}

fn listen(ctx: &mut ServerCtx) -> Result<State, CrackerError> {
    ctx.liveness = Some(liveness::spawn(ctx.dispatcher.clone(), ctx.registry.clone()));
    Ok(State::AcceptLoop)
}

fn accept_loop(ctx: &mut ServerCtx) -> Result<State, CrackerError> {
    if ctx.dispatcher.keyspace.total() == 0 {
        tracing::info!("empty keyspace, stopping immediately");
        ctx.dispatcher.stopping.store(true, Ordering::SeqCst);
        return Ok(State::Cleanup);
    }

    let listener = ctx.listener.as_ref().expect("listener bound before AcceptLoop");
    match listener.accept() {
        Ok((stream, addr)) => {
            spawn_handler(stream, addr, ctx.dispatcher.clone(), ctx.registry.clone());
            Ok(State::AcceptLoop)
        }
        Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
            if ctx.sigint.swap(false, Ordering::SeqCst) {
                tracing::info!("received SIGINT, stopping");
                ctx.dispatcher.stopping.store(true, Ordering::SeqCst);
            }
            if ctx.dispatcher.is_stopping() {
                ctx.registry.broadcast_stop();
                if ctx.registry.live_count() == 0 {
                    return Ok(State::Cleanup);
                }
            }
            thread::sleep(Duration::from_millis(100));
            Ok(State::AcceptLoop)
        }
        Err(e) => Err(cracker_error!(Socket, "accept failed: {e}")),
    }
}

fn spawn_handler(stream: TcpStream, addr: SocketAddr, dispatcher: Arc<Dispatcher>, registry: Arc<WorkerRegistry>) {
    thread::spawn(move || {
        let shutdown = match Session::shutdown_handle(&stream) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(%addr, error = %e, "failed to clone accepted socket");
                return;
            }
        };
        let session = match Session::from_stream(stream) {
            Ok(s) => Arc::new(Mutex::new(s)),
            Err(e) => {
                tracing::warn!(%addr, error = %e, "failed to wrap accepted socket");
                return;
            }
        };
        let id = registry.register(addr, session.clone(), shutdown);
        let mut ctx = fsm::ConnCtx { id, addr, session, dispatcher, registry };
        let machine = fsm::machine();
        if let Err(e) = machine.run(&mut ctx, fsm::State::SendHash) {
            tracing::warn!(%addr, error = %e, "worker connection ended with an error");
        }
    });
}

fn cleanup(ctx: &mut ServerCtx) -> State {
    ctx.registry.broadcast_stop();
    if let Some(handle) = ctx.liveness.take() {
        let _ = handle.join();
    }
    if let Some((candidate, addr)) = ctx.dispatcher.winner() {
        println!("winner: {candidate} (from {addr})");
    } else {
        println!("keyspace exhausted, no match found");
    }
    State::Exit
}

fn cleanup_ok(ctx: &mut ServerCtx) -> Result<State, CrackerError> {
    Ok(cleanup(ctx))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // SIGPIPE is already ignored by Rust's runtime, but the no-op registration
    // is kept explicit to document that intent rather than lean on a default.
    unsafe {
        signal_hook::low_level::register(signal_hook::consts::SIGPIPE, || {})
            .map_err(|e| anyhow::anyhow!("failed to install SIGPIPE handler: {e}"))?;
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = ServerConfig::parse(&args).map_err(|e| anyhow::anyhow!("{e} at {}", e.location()))?;

    let sigint = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, sigint.clone())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {e}"))?;

    let dispatcher = Arc::new(Dispatcher::new(&config));
    let registry = Arc::new(WorkerRegistry::new());

    let mut ctx = ServerCtx {
        config,
        dispatcher,
        registry,
        listener: None,
        liveness: None,
        sigint,
    };

    match machine().run(&mut ctx, State::ResolveAddr) {
        Ok(()) => Ok(()),
        Err(e) => {
            eprintln!("ERROR {e} at {}", e.location());
            Err(anyhow::anyhow!(e))
        }
    }
}
