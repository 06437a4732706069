//! Parameter source seam.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Errors fetching a parameter.
#[derive(Debug, Clone, thiserror::Error)]
#[error("parameter fetch failed: {message}")]
pub struct ParamError {
    /// Backend-supplied detail.
    pub message: String,
}

/// Backend holding the mutable tuning knobs.
#[async_trait]
pub trait ParameterSource: Send + Sync {
    /// Fetches a parameter by name. `Ok(None)` means the parameter is not set.
    async fn fetch(&self, name: &str) -> Result<Option<String>, ParamError>;
}

/// In-memory parameter source for tests and fixed deployments.
///
/// Values can be changed at runtime, which is how tests exercise the cache
/// TTL and how single-node deployments flip knobs live.
#[derive(Default)]
pub struct StaticParameters {
    values: Mutex<HashMap<String, String>>,
    fail_all: Mutex<bool>,
}

impl StaticParameters {
    /// Creates an empty source.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Sets a parameter value.
    pub fn set(&self, name: &str, value: &str) {
        self.values
            .lock()
            .unwrap()
            .insert(name.to_string(), value.to_string());
    }

    /// Removes a parameter.
    pub fn remove(&self, name: &str) {
        self.values.lock().unwrap().remove(name);
    }

    /// Makes every fetch fail until disabled; for fallback tests.
    pub fn fail_all(&self, fail: bool) {
        *self.fail_all.lock().unwrap() = fail;
    }
}

#[async_trait]
impl ParameterSource for StaticParameters {
    async fn fetch(&self, name: &str) -> Result<Option<String>, ParamError> {
        if *self.fail_all.lock().unwrap() {
            return Err(ParamError {
                message: "injected fetch failure".to_string(),
            });
        }
        Ok(self.values.lock().unwrap().get(name).cloned())
    }
}
