//! The token-based distributed mutual exclusion state machine: a
//! Ricart-Agrawala-style token that circulates across the peer set
//! using a Lamport clock, with a circular grant scan on release and
//! rollback on hand-off failure.

use std::sync::Arc;

use dlock_rpc::token::Token;

use crate::monitor::{LockState, Monitor};
use crate::util::UHashMap;

pub struct TokenLock {
    pub self_id: u64,
    monitor: Arc<Monitor>,
}

/// A point-in-time view of the lock's state, for `display_status` and
/// the operator CLI.
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    pub state: LockState,
    pub clock: u64,
    pub token: Token,
    pub request: UHashMap<u64>,
}

/// Pick the next peer to hand the token to: starting just past `after`
/// in circular sorted order, the first peer whose recorded request
/// timestamp strictly exceeds its last-served token timestamp.
/// Factored out as a pure function so the grant rule's fairness can be
/// unit tested without any networking.
fn choose_candidate(pids: &[u64], after: u64, request: &UHashMap<u64>, token: &UHashMap<u64>) -> Option<u64> {
    let n = pids.len();
    if n <= 1 {
        return None;
    }
    let start = pids.iter().position(|&p| p == after)?;
    for i in 1..n {
        let candidate = pids[(start + i) % n];
        let req = request.get(&candidate).copied().unwrap_or(0);
        let tok = token.get(&candidate).copied().unwrap_or(0);
        if req > tok {
            return Some(candidate);
        }
    }
    None
}

impl TokenLock {
    pub fn new(self_id: u64, monitor: Arc<Monitor>) -> TokenLock {
        TokenLock { self_id, monitor }
    }

    pub fn state(&self) -> LockState {
        self.monitor.state.lock().unwrap().lock_state
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let st = self.monitor.state.lock().unwrap();
        StatusSnapshot {
            state: st.lock_state,
            clock: st.clock,
            token: st.token.clone(),
            request: st.request.clone(),
        }
    }

    /// Must be called after the directory has been populated. The
    /// peer with the lowest known id becomes the unique initial
    /// holder.
    pub fn initialize(&self) {
        let mut st = self.monitor.state.lock().unwrap();
        let min_id = st.peers.keys().copied().min();
        st.token = st.peers.keys().map(|&pid| (pid, 0)).collect();
        if min_id == Some(self.self_id) {
            st.lock_state = LockState::TokenPresent;
            info!("Bootstrapped as the initial token holder");
        }
    }

    /// Called locally by a would-be writer. Broadcasts a request if we
    /// don't hold or have the token, then blocks on the condition
    /// variable until we do - never busy-waits.
    pub fn acquire(&self) {
        let need_broadcast = {
            let st = self.monitor.state.lock().unwrap();
            st.lock_state == LockState::NoToken
        };

        if need_broadcast {
            let targets: Vec<(u64, Arc<crate::transport::RemoteHandle>)> = {
                let st = self.monitor.state.lock().unwrap();
                st.peers
                    .iter()
                    .filter(|&(&pid, _)| pid != self.self_id)
                    .map(|(&pid, h)| (pid, h.clone()))
                    .collect()
            };

            for (pid, handle) in targets {
                // The clock bump happens under a brief, separate lock
                // acquisition; the network call happens with no lock
                // held at all, so an inbound obtain_token destined for
                // us can never deadlock against this broadcast.
                let t = {
                    let mut st = self.monitor.state.lock().unwrap();
                    st.clock += 1;
                    st.clock
                };
                if let Err(e) = handle.request_token(t, self.self_id) {
                    debug!("request_token to peer {} failed: {}", pid, e);
                }
            }
        }

        let st = self.monitor.state.lock().unwrap();
        let mut st = self
            .monitor
            .condvar
            .wait_while(st, |s| s.lock_state == LockState::NoToken)
            .unwrap();
        st.lock_state = LockState::TokenHeld;
    }

    /// Called locally after the critical section. Idempotent: a
    /// release with no token held is a no-op.
    pub fn release(&self) {
        let mut st = self.monitor.state.lock().unwrap();
        if st.lock_state == LockState::NoToken {
            return;
        }
        st.lock_state = LockState::TokenPresent;

        let mut pids: Vec<u64> = st.peers.keys().copied().collect();
        pids.sort_unstable();

        // `after` is the last position the scan has passed - the
        // releaser's own id to start, then each failed candidate in
        // turn, so a failed hand-off advances the scan instead of
        // re-selecting the same unreachable peer forever.
        let mut after = self.self_id;
        loop {
            let candidate = match choose_candidate(&pids, after, &st.request, &st.token) {
                Some(c) => c,
                None => break,
            };

            let snapshot = st.token.clone();
            st.token.insert(self.self_id, st.clock);
            st.clock += 1;
            st.token.insert(candidate, st.clock);
            let payload = st.token.clone();
            let handle = st.peers.get(&candidate).cloned();

            // Drop the monitor before the blocking network call: the
            // recipient's obtain_token handler must never contend with
            // state we're still holding locally.
            drop(st);
            let sent = match handle {
                Some(h) => h.obtain_token(&payload).is_ok(),
                None => false,
            };
            st = self.monitor.state.lock().unwrap();

            if sent {
                st.lock_state = LockState::NoToken;
                return;
            }

            debug!("Hand-off to peer {} failed, trying next candidate", candidate);
            st.token = snapshot;
            // The unreachable peer stays in the directory and may be
            // retried on a future release; advance past it so the next
            // scan picks up where this one left off.
            after = candidate;
        }
        // No candidate had an outstanding request; the token stays
        // resident with us.
    }

    /// Inbound: a peer requests the token.
    pub fn on_request_token(&self, t: u64, pid: u64) {
        let should_release = {
            let mut st = self.monitor.state.lock().unwrap();
            st.clock = st.clock.max(t) + 1;
            let new_clock = st.clock;
            let prior = st.request.get(&pid).copied().unwrap_or(0);
            st.request.insert(pid, prior.max(new_clock));
            st.lock_state == LockState::TokenPresent
        };
        if should_release {
            self.release();
        }
    }

    /// Inbound: the token has been handed to us.
    pub fn on_obtain_token(&self, token: Token) {
        {
            let mut st = self.monitor.state.lock().unwrap();
            st.token = token;
            st.lock_state = LockState::TokenPresent;
            let self_served = st.token.get(&self.self_id).copied().unwrap_or(0);
            st.clock = (st.clock + 1).max(self_served);
        }
        self.monitor.condvar.notify_all();
    }

    /// Called during graceful departure. If we hold the token, release
    /// it first; if it is (now) resident, unconditionally hand it to
    /// the next reachable peer in circular order. Discarded if we are
    /// the only peer left.
    pub fn destroy(&self) {
        if self.state() == LockState::TokenHeld {
            self.release();
        }

        let (pids, start) = {
            let st = self.monitor.state.lock().unwrap();
            if st.lock_state == LockState::NoToken {
                return;
            }
            let mut pids: Vec<u64> = st.peers.keys().copied().collect();
            pids.sort_unstable();
            let idx = pids.iter().position(|&p| p == self.self_id).unwrap_or(0);
            (pids, idx)
        };

        let n = pids.len();
        if n <= 1 {
            let mut st = self.monitor.state.lock().unwrap();
            st.lock_state = LockState::NoToken;
            return;
        }

        let mut i = start + 1;
        loop {
            let candidate = pids[i % n];
            if candidate != self.self_id {
                let (handle, payload) = {
                    let st = self.monitor.state.lock().unwrap();
                    (st.peers.get(&candidate).cloned(), st.token.clone())
                };
                let ok = handle.map(|h| h.obtain_token(&payload).is_ok()).unwrap_or(false);
                if ok {
                    let mut st = self.monitor.state.lock().unwrap();
                    st.lock_state = LockState::NoToken;
                    info!("Handed token to peer {} on departure", candidate);
                    return;
                }
                debug!("Peer {} unreachable during departure hand-off", candidate);
            }
            i += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_candidate_when_alone() {
        let pids = vec![1];
        let request = UHashMap::default();
        let token = UHashMap::default();
        assert_eq!(choose_candidate(&pids, 1, &request, &token), None);
    }

    #[test]
    fn picks_first_requester_past_releaser_circularly() {
        let pids = vec![1, 2, 3];
        let mut request = UHashMap::default();
        request.insert(3, 5);
        let token = UHashMap::default();
        // Releaser is 1; scan order is 2, 3. Only 3 has an outstanding
        // request, so 3 is chosen even though 2 comes first in id order.
        assert_eq!(choose_candidate(&pids, 1, &request, &token), Some(3));
    }

    #[test]
    fn no_outstanding_request_keeps_token_resident() {
        let pids = vec![1, 2, 3];
        let request = UHashMap::default();
        let token = UHashMap::default();
        assert_eq!(choose_candidate(&pids, 1, &request, &token), None);
    }

    #[test]
    fn satisfied_request_is_not_chosen_again() {
        let pids = vec![1, 2];
        let mut request = UHashMap::default();
        request.insert(2, 4);
        let mut token = UHashMap::default();
        token.insert(2, 4); // already served at this timestamp
        assert_eq!(choose_candidate(&pids, 1, &request, &token), None);
    }

    #[test]
    fn scan_wraps_past_the_end_of_the_id_list() {
        let pids = vec![1, 2, 3];
        let mut request = UHashMap::default();
        request.insert(1, 2);
        let token = UHashMap::default();
        // Releaser is 3; scan order is 1, 2. 1 has an outstanding request.
        assert_eq!(choose_candidate(&pids, 3, &request, &token), Some(1));
    }
}
