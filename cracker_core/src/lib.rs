/*!
 * Cracker Core — shared runtime used by both the worker and the coordinator.
 *
 * Neither binary speaks directly to a socket or to the keyspace without
 * going through this crate.
 *
 * # Module structure
 *
 * - `protocol` — what goes over the wire: message types and the line codec
 * - `fsm` — the generic transition-table-driven state machine runtime
 * - `error` — the `CrackerError` taxonomy with call-site location capture
 * - `keyspace` — the integer keyspace and its partitioning policy
 * - `candidate` — pluggable candidate enumeration and hash matching
 * - `config` — validated configuration for the two binaries
 * - `net` — address resolution shared by worker and coordinator
 */

pub mod candidate;
pub mod config;
pub mod error;
pub mod fsm;
pub mod keyspace;
pub mod net;
pub mod protocol;

pub use error::{CrackerError, Location};
pub use fsm::{Fsm, Transition};
