//! Library half of the peer daemon: everything but the entry point, so
//! the multi-peer protocol scenarios in `tests/` can wire up several
//! `TokenLock`/`PeerDirectory`/`ResourceOwner` instances in one process.

#[macro_use]
pub mod log;

pub mod args;
pub mod cli;
pub mod config;
pub mod directory;
pub mod dispatch;
pub mod errors;
pub mod monitor;
pub mod nameservice;
pub mod owner;
pub mod peer;
pub mod rwlock;
pub mod store;
pub mod tokenlock;
pub mod transport;
pub mod util;
