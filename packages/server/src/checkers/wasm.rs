use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use extism::{Manifest, Plugin, Wasm};
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::{info, instrument};

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("script module failed to load: {0}")]
    LoadFailed(String),
    #[error("script execution failed: {0}")]
    ExecutionFailed(String),
    #[error("script serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("script runtime internal error: {0}")]
    Internal(String),
}

/// Executes user-supplied WASM modules (checkers and statement generators).
///
/// Modules are instantiated once per stored-path key and cached. Extism
/// plugin instances are stateful and single-threaded, so each one is
/// wrapped in a Mutex. WASI is disabled: scripts get no filesystem or
/// network access.
pub struct ScriptRuntime {
    instances: RwLock<HashMap<String, Mutex<Plugin>>>,
}

impl Default for ScriptRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptRuntime {
    pub fn new() -> Self {
        Self {
            instances: RwLock::new(HashMap::new()),
        }
    }

    pub fn is_loaded(&self, key: &str) -> bool {
        self.instances
            .read()
            .map(|r| r.contains_key(key))
            .unwrap_or(false)
    }

    /// Instantiate a module from its bytes under the given key. A module
    /// already loaded under the key is kept as is.
    #[instrument(skip(self, wasm_bytes), fields(key = %key, size = wasm_bytes.len()))]
    pub fn load(&self, key: &str, wasm_bytes: Vec<u8>) -> Result<(), ScriptError> {
        if self.is_loaded(key) {
            return Ok(());
        }

        let wasm = Wasm::data(wasm_bytes);
        let manifest = Manifest::new([wasm]);
        let plugin = Plugin::new(&manifest, [], false)
            .map_err(|e| ScriptError::LoadFailed(e.to_string()))?;

        let mut instances = self
            .instances
            .write()
            .map_err(|_| ScriptError::Internal("instance registry lock poisoned".into()))?;
        instances.entry(key.to_string()).or_insert(Mutex::new(plugin));

        info!("Script module loaded");
        Ok(())
    }

    /// Drop a cached instance, e.g. after the stored module is replaced.
    pub fn evict(&self, key: &str) {
        if let Ok(mut instances) = self.instances.write() {
            instances.remove(key);
        }
    }

    #[instrument(skip(self, input), fields(key = %key, func = %func_name))]
    pub fn call_raw(
        &self,
        key: &str,
        func_name: &str,
        input: Vec<u8>,
    ) -> Result<Vec<u8>, ScriptError> {
        let instances = self
            .instances
            .read()
            .map_err(|_| ScriptError::Internal("instance registry lock poisoned".into()))?;

        let plugin_mutex = instances
            .get(key)
            .ok_or_else(|| ScriptError::LoadFailed(format!("module '{key}' is not loaded")))?;

        let mut plugin = plugin_mutex
            .lock()
            .map_err(|_| ScriptError::Internal("plugin instance lock poisoned".into()))?;

        let output: Vec<u8> = plugin
            .call(func_name, input)
            .map_err(|e| ScriptError::ExecutionFailed(e.to_string()))?;

        Ok(output)
    }

    /// Call an exported function with JSON in and JSON out.
    pub fn call_json<T, R>(&self, key: &str, func_name: &str, input: &T) -> Result<R, ScriptError>
    where
        T: Serialize,
        R: DeserializeOwned,
    {
        let input_bytes = serde_json::to_vec(input)?;
        let output_bytes = self.call_raw(key, func_name, input_bytes)?;
        let result = serde_json::from_slice(&output_bytes)?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calling_an_unloaded_module_fails_cleanly() {
        let runtime = ScriptRuntime::new();
        let err = runtime
            .call_raw("ab/0123456789abcdef0123456789abcd", "check", vec![])
            .unwrap_err();
        assert!(matches!(err, ScriptError::LoadFailed(_)));
    }

    #[test]
    fn loading_garbage_bytes_fails_cleanly() {
        let runtime = ScriptRuntime::new();
        let err = runtime
            .load("ab/0123456789abcdef0123456789abcd", b"not wasm".to_vec())
            .unwrap_err();
        assert!(matches!(err, ScriptError::LoadFailed(_)));
        assert!(!runtime.is_loaded("ab/0123456789abcdef0123456789abcd"));
    }

    #[test]
    fn evicting_an_unknown_key_is_a_no_op() {
        let runtime = ScriptRuntime::new();
        runtime.evict("ab/0123456789abcdef0123456789abcd");
    }
}
