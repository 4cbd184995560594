//! Per-request cancellation registry.

use lumen_index::CancelToken;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;

fn key(id: &Value) -> String {
    id.to_string()
}

/// Tracks the cancellation token of every in-flight request.
#[derive(Default)]
pub struct CancellationRegistry {
    tokens: Mutex<FxHashMap<String, CancelToken>>,
}

impl CancellationRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a request id and returns its token.
    pub fn register(&self, id: &Value) -> CancelToken {
        let token = CancelToken::new();
        self.tokens.lock().insert(key(id), token.clone());
        token
    }

    /// Cancels the request with the given id, if still in flight.
    pub fn cancel(&self, id: &Value) {
        if let Some(token) = self.tokens.lock().get(&key(id)) {
            token.cancel();
        }
    }

    /// Drops the bookkeeping for a completed request.
    pub fn finish(&self, id: &Value) {
        self.tokens.lock().remove(&key(id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cancel_reaches_registered_token() {
        let registry = CancellationRegistry::new();
        let token = registry.register(&json!(5));
        assert!(!token.is_cancelled());
        registry.cancel(&json!(5));
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_cancel_after_finish_is_a_no_op() {
        let registry = CancellationRegistry::new();
        let token = registry.register(&json!("req-1"));
        registry.finish(&json!("req-1"));
        registry.cancel(&json!("req-1"));
        assert!(!token.is_cancelled());
    }
}
