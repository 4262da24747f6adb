//! Login rate limiting
//!
//! Fixed allowance per client key. The window restarts once the last
//! accepted attempt is older than the window; denied attempts do not
//! push it forward.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Attempt bookkeeping behind the login endpoint
pub trait LoginAttemptStore: Send + Sync {
    /// Count one attempt for `key`. Returns false when the client is over the limit.
    fn try_acquire(&self, key: &str, now: Instant) -> bool;
}

#[derive(Debug, Clone, Copy)]
struct AttemptRecord {
    count: u32,
    last_attempt: Instant,
}

/// Process-local store; state is lost on restart
pub struct InMemoryAttemptStore {
    max_attempts: u32,
    window: Duration,
    records: Mutex<HashMap<String, AttemptRecord>>,
}

impl InMemoryAttemptStore {
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        Self {
            max_attempts,
            window,
            records: Mutex::new(HashMap::new()),
        }
    }

    /// Drop records whose window has passed
    pub fn prune(&self, now: Instant) {
        let window = self.window;
        self.records
            .lock()
            .retain(|_, r| now.saturating_duration_since(r.last_attempt) <= window);
    }
}

impl LoginAttemptStore for InMemoryAttemptStore {
    fn try_acquire(&self, key: &str, now: Instant) -> bool {
        let mut records = self.records.lock();

        match records.get_mut(key) {
            Some(record) if now.saturating_duration_since(record.last_attempt) <= self.window => {
                if record.count >= self.max_attempts {
                    return false;
                }
                record.count += 1;
                record.last_attempt = now;
                true
            }
            _ => {
                records.insert(key.to_string(), AttemptRecord { count: 1, last_attempt: now });
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(900);

    #[test]
    fn test_allows_up_to_max_attempts() {
        let store = InMemoryAttemptStore::new(5, WINDOW);
        let now = Instant::now();

        for _ in 0..5 {
            assert!(store.try_acquire("10.0.0.1", now));
        }
        assert!(!store.try_acquire("10.0.0.1", now));
        // Other clients are unaffected
        assert!(store.try_acquire("10.0.0.2", now));
    }

    #[test]
    fn test_window_resets_after_quiet_period() {
        let store = InMemoryAttemptStore::new(2, WINDOW);
        let start = Instant::now();

        assert!(store.try_acquire("ip", start));
        assert!(store.try_acquire("ip", start));
        assert!(!store.try_acquire("ip", start + Duration::from_secs(60)));

        assert!(store.try_acquire("ip", start + WINDOW + Duration::from_secs(1)));
    }

    #[test]
    fn test_denied_attempts_do_not_extend_window() {
        let store = InMemoryAttemptStore::new(1, WINDOW);
        let start = Instant::now();

        assert!(store.try_acquire("ip", start));
        // Hammering during the window is refused
        assert!(!store.try_acquire("ip", start + Duration::from_secs(800)));
        // Window is still measured from the last accepted attempt
        assert!(store.try_acquire("ip", start + Duration::from_secs(901)));
    }

    #[test]
    fn test_prune_drops_stale_records() {
        let store = InMemoryAttemptStore::new(1, WINDOW);
        let start = Instant::now();
        store.try_acquire("a", start);
        store.prune(start + WINDOW + Duration::from_secs(1));
        assert!(store.records.lock().is_empty());
    }
}
