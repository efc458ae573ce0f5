//! Connects to a coordinator, requests work, and cracks it in parallel.
//!
//! Usage: `cracker-worker <coordinator-addr> <coordinator-port> <threads>`
use std::sync::Arc;

use cracker_core::candidate::{Base26Enumerator, PlaintextMatcher};
use cracker_core::config::WorkerConfig;
use cracker_worker::fsm;

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
    let config = WorkerConfig::parse(&args)
        .map_err(|e| anyhow::anyhow!("{e} at {}", e.location()))?;

    let mut ctx = fsm::WorkerCtx::new(config, Arc::new(Base26Enumerator), Arc::new(PlaintextMatcher));
    let machine = fsm::machine();

    match machine.run(&mut ctx, fsm::State::ResolveAddr) {
        Ok(()) => {
            match ctx.session_elapsed() {
                Some(elapsed) => println!("session finished, wall time {:.3}s", elapsed.as_secs_f64()),
                None => println!("worker finished cleanly"),
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("ERROR {e} at {}", e.location());
            Err(anyhow::anyhow!(e))
        }
    }
}
