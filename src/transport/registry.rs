//! Live call registry: exactly one pipeline per live call identifier.

use std::collections::HashSet;

use tokio::sync::Mutex;

use crate::error::SessionError;

#[derive(Default)]
pub struct CallRegistry {
    calls: Mutex<HashSet<String>>,
}

impl CallRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a call id. A second connect for a live id is refused.
    pub async fn register(&self, call_id: &str) -> Result<(), SessionError> {
        let mut calls = self.calls.lock().await;
        if !calls.insert(call_id.to_string()) {
            return Err(SessionError::CallInProgress(call_id.to_string()));
        }
        Ok(())
    }

    pub async fn deregister(&self, call_id: &str) {
        let mut calls = self.calls.lock().await;
        calls.remove(call_id);
    }

    pub async fn active_count(&self) -> usize {
        self.calls.lock().await.len()
    }
}
