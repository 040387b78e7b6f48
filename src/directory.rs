//! The peer directory: the local view of who is alive. Backed by the
//! shared [`Monitor`] so that a peer's arrival or departure updates
//! membership and the token lock's bookkeeping (the token/request
//! maps) as one atomic step, rather than two monitor acquisitions with
//! a gap between them.

use std::net::SocketAddr;
use std::sync::Arc;

use crate::errors::{ErrorKind, Result};
use crate::monitor::{LockState, Monitor};
use crate::transport::RemoteHandle;
use crate::util::UHashMap;

pub struct PeerDirectory {
    pub self_id: u64,
    pub self_addr: SocketAddr,
    monitor: Arc<Monitor>,
}

/// What the name service handed back for one peer of our type.
pub struct NsPeer {
    pub id: u64,
    pub addr: SocketAddr,
}

impl PeerDirectory {
    pub fn new(self_id: u64, self_addr: SocketAddr, monitor: Arc<Monitor>) -> PeerDirectory {
        PeerDirectory {
            self_id,
            self_addr,
            monitor,
        }
    }

    /// Populate the directory from what the name service reports, and
    /// register ourselves with every peer that has a lower id (so
    /// older peers learn of the newcomer without us deadlocking on a
    /// peer that hasn't registered us yet). Per-peer failures are
    /// logged and the peer is simply omitted - it never aborts
    /// initialization.
    pub fn initialize(&self, known: Vec<NsPeer>) {
        for p in known {
            if p.id == self.self_id {
                continue;
            }
            let handle = Arc::new(RemoteHandle::new(p.addr));
            if p.id < self.self_id {
                if let Err(e) = handle.register_peer(self.self_id, self.self_addr) {
                    debug!("Failed to register with peer {}: {}", p.id, e);
                    continue;
                }
            }
            self.monitor.state.lock().unwrap().peers.insert(p.id, handle);
        }
    }

    /// Best-effort unregister from every other known peer.
    pub fn destroy(&self) {
        for pid in self.peer_ids() {
            if pid == self.self_id {
                continue;
            }
            if let Some(handle) = self.peer(pid) {
                if let Err(e) = handle.unregister_peer(self.self_id) {
                    debug!("Failed to unregister from peer {}: {}", pid, e);
                }
            }
        }
    }

    /// New peer joining the network. If the token is resident, its
    /// entry in the token map is extended to `0` in the same
    /// monitor-protected step.
    pub fn register_peer(&self, pid: u64, addr: SocketAddr) {
        let mut st = self.monitor.state.lock().unwrap();
        st.peers.insert(pid, Arc::new(RemoteHandle::new(addr)));
        if st.lock_state != LockState::NoToken {
            st.token.entry(pid).or_insert(0);
        }
        info!("Peer {} has joined the system.", pid);
    }

    /// Peer leaving the network. Always drops its request entry;
    /// drops its token entry too when the token is resident.
    pub fn unregister_peer(&self, pid: u64) -> Result<()> {
        let mut st = self.monitor.state.lock().unwrap();
        if st.peers.remove(&pid).is_none() {
            return Err(ErrorKind::NotFound(pid).into());
        }
        st.token.remove(&pid);
        st.request.remove(&pid);
        info!("Peer {} has left the system.", pid);
        Ok(())
    }

    pub fn peer(&self, pid: u64) -> Option<Arc<RemoteHandle>> {
        self.monitor.state.lock().unwrap().peers.get(&pid).cloned()
    }

    pub fn get_peers(&self) -> UHashMap<Arc<RemoteHandle>> {
        self.monitor.state.lock().unwrap().peers.clone()
    }

    pub fn peer_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.monitor.state.lock().unwrap().peers.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}
