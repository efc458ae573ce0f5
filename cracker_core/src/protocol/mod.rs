/*!
 * Wire protocol — the line-oriented ASCII messages exchanged between a
 * worker and the coordinator.
 *
 * `message` defines the `Message` enum and its textual encoding. `codec`
 * wraps a buffered reader so callers can feed it bytes as they arrive and
 * pull out whole messages, tolerating a message split across reads.
 */

pub mod codec;
pub mod message;

pub use codec::LineReader;
pub use message::Message;
