//! Near-real-time run-status synchronization.
//!
//! One shared WebSocket connection per session, multiplexing per-run
//! callbacks; see [`RunChannel`].

pub mod channel;
pub mod event;

pub use channel::{ChannelConfig, RunCallback, RunChannel};
pub use event::ControlMessage;
