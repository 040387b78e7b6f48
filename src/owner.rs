//! Binds the record store to the distributed lock and the peer
//! directory, exposing the RPC surface a peer needs: `read`, `write`,
//! the lock/directory forwarders, and `check`.

use std::net::SocketAddr;
use std::sync::Mutex;

use dlock_rpc::token::Token;

use crate::directory::PeerDirectory;
use crate::errors::Result;
use crate::rwlock::ReadWriteLock;
use crate::store::RecordStore;
use crate::tokenlock::StatusSnapshot;

pub struct ResourceOwner {
    pub self_id: u64,
    pub peer_type: String,
    directory: PeerDirectory,
    lock: ReadWriteLock,
    store: Mutex<RecordStore>,
}

impl ResourceOwner {
    pub fn new(self_id: u64, peer_type: String, directory: PeerDirectory, lock: ReadWriteLock, store: RecordStore) -> ResourceOwner {
        ResourceOwner {
            self_id,
            peer_type,
            directory,
            lock,
            store: Mutex::new(store),
        }
    }

    pub fn directory(&self) -> &PeerDirectory {
        &self.directory
    }

    pub fn lock(&self) -> &ReadWriteLock {
        &self.lock
    }

    /// A uniformly random record, or `None` if the store is empty.
    /// No remote traffic beyond the reader side of the local lock.
    pub fn read(&self) -> Option<String> {
        self.lock.read_acquire();
        let record = self.store.lock().unwrap().read();
        self.lock.read_release();
        record
    }

    /// Drives the full distributed write path: write-intent mutex,
    /// token acquisition, local writer lock, the actual append, then
    /// the symmetric release sequence.
    pub fn write(&self, record: &str) -> Result<()> {
        self.lock.write_acquire();
        let result = self.store.lock().unwrap().write(record);
        self.lock.write_release();
        result
    }

    pub fn register_peer(&self, pid: u64, addr: SocketAddr) {
        self.directory.register_peer(pid, addr);
    }

    pub fn unregister_peer(&self, pid: u64) -> Result<()> {
        self.directory.unregister_peer(pid)
    }

    pub fn request_token(&self, t: u64, pid: u64) {
        self.lock.token().on_request_token(t, pid);
    }

    pub fn obtain_token(&self, token: Token) {
        self.lock.token().on_obtain_token(token);
    }

    pub fn display_status(&self) -> StatusSnapshot {
        self.lock.token().snapshot()
    }

    pub fn check(&self) -> (u64, String) {
        (self.self_id, self.peer_type.clone())
    }
}
