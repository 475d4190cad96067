//! Live credential list with a round-robin cursor

use parking_lot::Mutex;
use std::collections::HashSet;
use tracing::warn;

/// Pool of live API credentials.
///
/// The key list and the cursor share one lock, so removal and cursor
/// advancement are linearizable. Removed keys never come back.
pub struct CredentialPool {
    state: Mutex<PoolState>,
}

struct PoolState {
    keys: Vec<String>,
    cursor: usize,
}

impl CredentialPool {
    /// Create a pool from configured keys, dropping blanks and duplicates
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let keys = keys
            .into_iter()
            .map(Into::into)
            .filter(|k: &String| !k.trim().is_empty())
            .filter(|k| seen.insert(k.clone()))
            .collect();

        Self {
            state: Mutex::new(PoolState { keys, cursor: 0 }),
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().keys.is_empty()
    }

    /// Current live keys in list order
    pub fn keys(&self) -> Vec<String> {
        self.state.lock().keys.clone()
    }

    /// Take the next live key not yet in `tried`, starting at the cursor.
    ///
    /// The cursor moves one past the returned key. Returns `None` once every
    /// live key has been tried.
    pub fn next_untried(&self, tried: &HashSet<String>) -> Option<String> {
        let mut state = self.state.lock();
        let len = state.keys.len();
        if len == 0 {
            return None;
        }

        let start = state.cursor % len;
        let index = (0..len)
            .map(|offset| (start + offset) % len)
            .find(|&i| !tried.contains(&state.keys[i]))?;

        state.cursor = (index + 1) % len;
        Some(state.keys[index].clone())
    }

    /// Permanently remove a key. Returns false if it was already gone.
    pub fn invalidate(&self, key: &str) -> bool {
        let mut state = self.state.lock();
        let Some(index) = state.keys.iter().position(|k| k == key) else {
            return false;
        };

        state.keys.remove(index);
        if index < state.cursor {
            state.cursor -= 1;
        }
        if state.cursor >= state.keys.len() {
            state.cursor = 0;
        }

        warn!(
            key = %mask_key(key),
            remaining = state.keys.len(),
            "Removed invalid API key from rotation"
        );
        true
    }
}

/// Short fingerprint of a key for log output
pub fn mask_key(key: &str) -> String {
    let tail: String = key
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("***{tail}")
}
