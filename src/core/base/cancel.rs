use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

/// CancelToken lets the caller interrupt a blocking wait inside the slot chain,
/// e.g., the queueing wait of the rate limiter.
/// Clones share the same state, so one clone can be kept by the caller and another
/// one carried by the entry.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels the token and wakes up all the waiters.
    pub fn cancel(&self) {
        let (lock, cvar) = &*self.inner;
        *lock.lock().unwrap() = true;
        cvar.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.0.lock().unwrap()
    }

    /// Blocks the current thread for `ms` milliseconds.
    /// Returns `false` if the token is cancelled before or during the wait.
    pub fn wait_for_ms(&self, ms: u64) -> bool {
        let (lock, cvar) = &*self.inner;
        let deadline = Instant::now() + Duration::from_millis(ms);
        let mut cancelled = lock.lock().unwrap();
        while !*cancelled {
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            let (guard, _) = cvar.wait_timeout(cancelled, deadline - now).unwrap();
            cancelled = guard;
        }
        false
    }
}
