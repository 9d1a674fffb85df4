// src/make/tokens.rs

use tracing::trace;

/// Fixed-size pool of job tokens.
///
/// A node is only handed to the job runner while holding a token, so the
/// number of outstanding jobs never exceeds `capacity`.
#[derive(Debug, Clone)]
pub struct TokenPool {
    capacity: usize,
    outstanding: usize,
}

impl TokenPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            outstanding: 0,
        }
    }

    /// Take a token. Fails when the pool is empty or the build is aborting.
    pub fn withdraw(&mut self, aborting: bool) -> bool {
        if aborting || self.outstanding >= self.capacity {
            return false;
        }
        self.outstanding += 1;
        trace!(outstanding = self.outstanding, "token withdrawn");
        true
    }

    pub fn give_back(&mut self) {
        self.outstanding = self.outstanding.saturating_sub(1);
        trace!(outstanding = self.outstanding, "token returned");
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
