//! Local multi-reader/single-writer lock layered over the [`TokenLock`]:
//! writers acquire the token before the local writer lock, so writes
//! across the whole system are totally ordered while reads stay purely
//! local.

use std::sync::{Condvar, Mutex};

use crate::tokenlock::TokenLock;

struct RwState {
    readers: u32,
    writer: bool,
    write_intent: bool,
}

pub struct ReadWriteLock {
    token: TokenLock,
    state: Mutex<RwState>,
    condvar: Condvar,
}

impl ReadWriteLock {
    pub fn new(token: TokenLock) -> ReadWriteLock {
        ReadWriteLock {
            token,
            state: Mutex::new(RwState {
                readers: 0,
                writer: false,
                write_intent: false,
            }),
            condvar: Condvar::new(),
        }
    }

    pub fn token(&self) -> &TokenLock {
        &self.token
    }

    pub fn read_acquire(&self) {
        let st = self.state.lock().unwrap();
        let mut st = self.condvar.wait_while(st, |s| s.writer).unwrap();
        st.readers += 1;
    }

    pub fn read_release(&self) {
        let mut st = self.state.lock().unwrap();
        st.readers -= 1;
        if st.readers == 0 {
            self.condvar.notify_all();
        }
    }

    /// Bypasses the token. Only for infrastructure that already holds
    /// the token on behalf of a remote write.
    pub fn write_acquire_local(&self) {
        let st = self.state.lock().unwrap();
        let mut st = self.condvar.wait_while(st, |s| s.writer || s.readers > 0).unwrap();
        st.writer = true;
    }

    pub fn write_release_local(&self) {
        let mut st = self.state.lock().unwrap();
        st.writer = false;
        self.condvar.notify_all();
    }

    /// Acquire the local write-intent mutex first (so only one local
    /// thread ever races on `TokenLock::acquire`), then the token,
    /// then the local writer lock.
    pub fn write_acquire(&self) {
        {
            let st = self.state.lock().unwrap();
            let mut st = self.condvar.wait_while(st, |s| s.write_intent).unwrap();
            st.write_intent = true;
        }
        self.token.acquire();
        self.write_acquire_local();
    }

    /// Local writer lock, then the token, then the write-intent mutex.
    pub fn write_release(&self) {
        self.write_release_local();
        self.token.release();
        let mut st = self.state.lock().unwrap();
        st.write_intent = false;
        self.condvar.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::{LockState, Monitor};
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    fn solo_lock() -> ReadWriteLock {
        let addr = SocketAddr::from(([127, 0, 0, 1], 5000));
        let monitor = Monitor::new(1, addr);
        let token = TokenLock::new(1, monitor);
        token.initialize();
        assert_eq!(token.state(), LockState::TokenPresent);
        ReadWriteLock::new(token)
    }

    #[test]
    fn multiple_readers_proceed_concurrently() {
        let lock = Arc::new(solo_lock());
        let concurrent = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let lock = lock.clone();
                let concurrent = concurrent.clone();
                let max_seen = max_seen.clone();
                thread::spawn(move || {
                    lock.read_acquire();
                    let now = concurrent.fetch_add(1, Ordering::SeqCst) + 1;
                    max_seen.fetch_max(now, Ordering::SeqCst);
                    concurrent.fetch_sub(1, Ordering::SeqCst);
                    lock.read_release();
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }
        assert!(max_seen.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn write_acquire_takes_the_token_solo() {
        let lock = solo_lock();
        lock.write_acquire();
        assert_eq!(lock.token().state(), LockState::TokenHeld);
        lock.write_release();
        assert_eq!(lock.token().state(), LockState::TokenPresent);
    }

    #[test]
    fn write_release_local_allows_blocked_reader_through() {
        let lock = Arc::new(solo_lock());
        lock.write_acquire_local();

        let other = lock.clone();
        let reader = thread::spawn(move || {
            other.read_acquire();
            other.read_release();
        });

        lock.write_release_local();
        reader.join().unwrap();
    }
}
