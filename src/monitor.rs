//! The single per-peer monitor: one mutex and condition variable
//! guarding both the peer directory's membership map and the token
//! lock's clock/state/token/request maps, so a membership change and a
//! lock-state change are never observed half-applied relative to each
//! other.

use std::net::SocketAddr;
use std::sync::{Arc, Condvar, Mutex};

use dlock_rpc::token::Token;

use crate::transport::RemoteHandle;
use crate::util::UHashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    NoToken,
    TokenPresent,
    TokenHeld,
}

pub struct MonitorState {
    pub peers: UHashMap<Arc<RemoteHandle>>,
    pub clock: u64,
    pub lock_state: LockState,
    pub token: Token,
    pub request: UHashMap<u64>,
}

pub struct Monitor {
    pub state: Mutex<MonitorState>,
    pub condvar: Condvar,
}

impl Monitor {
    pub fn new(self_id: u64, self_addr: SocketAddr) -> Arc<Monitor> {
        let mut peers = UHashMap::default();
        peers.insert(self_id, Arc::new(RemoteHandle::new(self_addr)));
        Arc::new(Monitor {
            state: Mutex::new(MonitorState {
                peers,
                clock: 0,
                lock_state: LockState::NoToken,
                token: Token::default(),
                request: UHashMap::default(),
            }),
            condvar: Condvar::new(),
        })
    }
}
