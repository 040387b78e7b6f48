//! In-memory registry backing the name service. One entry per
//! `(type, id)`, since peers register and discover each other by type.

use std::collections::HashMap;

pub struct Entry {
    pub addr: String,
    pub hash: String,
}

pub struct State {
    next_id: u64,
    peers: HashMap<String, HashMap<u64, Entry>>,
}

impl State {
    pub fn new() -> State {
        State {
            next_id: 1,
            peers: HashMap::new(),
        }
    }

    /// Assigns a fresh id and an opaque hash token, required later to
    /// unregister.
    pub fn register(&mut self, peer_type: &str, addr: &str) -> (u64, String) {
        let id = self.next_id;
        self.next_id += 1;
        let hash = format!("{:x}", id ^ 0x5bd1_e995);
        self.peers.entry(peer_type.to_owned()).or_default().insert(
            id,
            Entry {
                addr: addr.to_owned(),
                hash: hash.clone(),
            },
        );
        (id, hash)
    }

    /// `Err` when the id/type/hash triple doesn't match a live
    /// registration.
    pub fn unregister(&mut self, peer_type: &str, id: u64, hash: &str) -> Result<(), String> {
        match self.peers.get_mut(peer_type) {
            Some(table) => match table.get(&id) {
                Some(entry) if entry.hash == hash => {
                    table.remove(&id);
                    Ok(())
                }
                Some(_) => Err(format!("hash mismatch for peer {}", id)),
                None => Err(format!("no peer with id: '{}'", id)),
            },
            None => Err(format!("no peer with id: '{}'", id)),
        }
    }

    pub fn require_all(&self, peer_type: &str) -> Vec<(u64, String)> {
        match self.peers.get(peer_type) {
            Some(table) => {
                let mut all: Vec<(u64, String)> =
                    table.iter().map(|(&id, e)| (id, e.addr.clone())).collect();
                all.sort_unstable_by_key(|(id, _)| *id);
                all
            }
            None => Vec::new(),
        }
    }
}
