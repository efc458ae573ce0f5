//! Library half of the worker binary, split out so integration tests can
//! drive the crack loop and the FSM directly over real sockets.
pub mod crack;
pub mod fsm;
pub mod session;
