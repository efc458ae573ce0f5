/*!
 * Generic finite-state-machine runtime.
 *
 * The transition table is data, not code: each entry pairs a state with the
 * action that runs while the machine is in that state. An action inspects
 * and mutates the shared context and returns the next state. There is no
 * separate `ERROR` action — any action that returns `Err` causes the
 * runtime to route to the reserved error state, which always leads to
 * `cleanup`.
 *
 * This mirrors the `client_fsm_transition { from_id, to_id, perform }` /
 * `fsm_run()` pair from the reference implementation, minus the C version's
 * manual reentrant driver loop.
 */
use crate::error::CrackerError;

/// One entry of the transition table: the action to run while in `state`.
pub struct Transition<S, C> {
    pub state: S,
    pub action: fn(&mut C) -> Result<S, CrackerError>,
}

/// A runnable state machine: a table plus the three synthetic states every
/// machine needs (`exit`, `error`, and the `cleanup` action reached from
/// `error`). `init` is supplied separately to `run` so the same table can be
/// reused from different entry points (useful in tests).
pub struct Fsm<S, C> {
    table: Vec<Transition<S, C>>,
    exit: S,
    error: S,
    cleanup: fn(&mut C) -> S,
}

impl<S, C> Fsm<S, C>
where
    S: Copy + PartialEq,
{
    pub fn new(
        table: Vec<Transition<S, C>>,
        exit: S,
        error: S,
        cleanup: fn(&mut C) -> S,
    ) -> Self {
        Self {
            table,
            exit,
            error,
            cleanup,
        }
    }

    /// Drives the machine from `init` to `exit`, returning the first error
    /// encountered (cleanup still ran before it is returned).
    pub fn run(&self, ctx: &mut C, init: S) -> Result<(), CrackerError> {
        let mut current = init;
        let mut pending_error: Option<CrackerError> = None;

        loop {
            if current == self.exit {
                return match pending_error {
                    Some(e) => Err(e),
                    None => Ok(()),
                };
            }

            if current == self.error {
                current = (self.cleanup)(ctx);
                continue;
            }

            let entry = self
                .table
                .iter()
                .find(|t| t.state == current)
                .unwrap_or_else(|| panic!("no transition registered for this state"));

            match (entry.action)(ctx) {
                Ok(next) => current = next,
                Err(e) => {
                    tracing::error!(error = %e, "fsm action failed");
                    pending_error = Some(e);
                    current = self.error;
                }
            }
        }
    }
}
