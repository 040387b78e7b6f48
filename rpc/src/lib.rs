//! Wire-format data structures shared between `dlockd` and `nameserver`.
//!
//! A request is one line of JSON: `{"method": "...", "args": [...]}`.
//! A reply is one line of JSON: either `{"result": ...}` or
//! `{"error": {"name": "...", "args": [...]}}`. One request, one reply,
//! one connection - no multiplexing.

pub mod token;
pub mod wire;

pub use wire::{ErrorKind, ErrorPayload, Reply, Request};
