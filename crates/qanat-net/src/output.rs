//! Shared results and progress map.
//!
//! One map is shared by every agent of a simulation. Each agent owns
//! three keys: its name (final output), `"<name>:progress"` and
//! `"<name>:progress_max"` (counters polled by the progress monitor).

use std::sync::{Arc, Mutex};

use rustc_hash::FxHashMap;
use serde_json::Value;

/// Cloneable handle to the shared results/progress map.
#[derive(Debug, Clone, Default)]
pub struct SharedOutput {
    inner: Arc<Mutex<FxHashMap<String, Value>>>,
}

impl SharedOutput {
    /// Create an empty shared map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent's slots: null output, zero progress, and the
    /// given progress maximum.
    pub fn register(&self, name: &str, progress_max: u64) {
        let mut map = self.lock();
        map.insert(name.to_string(), Value::Null);
        map.insert(format!("{name}:progress"), Value::from(0u64));
        map.insert(format!("{name}:progress_max"), Value::from(progress_max));
    }

    /// Publish an agent's final output.
    pub fn set(&self, name: &str, value: Value) {
        self.lock().insert(name.to_string(), value);
    }

    /// An agent's published output, if any.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.lock().get(name).cloned()
    }

    /// Overwrite an agent's progress counter.
    pub fn update_progress(&self, name: &str, value: u64) {
        self.lock()
            .insert(format!("{name}:progress"), Value::from(value));
    }

    /// Add one to an agent's progress counter.
    pub fn increment_progress(&self, name: &str) {
        let mut map = self.lock();
        let key = format!("{name}:progress");
        let current = map.get(&key).and_then(Value::as_u64).unwrap_or(0);
        map.insert(key, Value::from(current + 1));
    }

    /// `(progress, progress_max)` for an agent.
    pub fn progress(&self, name: &str) -> (u64, u64) {
        let map = self.lock();
        let read = |key: String| map.get(&key).and_then(Value::as_u64).unwrap_or(0);
        (
            read(format!("{name}:progress")),
            read(format!("{name}:progress_max")),
        )
    }

    /// Copy of the whole map, as returned by a finished simulation.
    pub fn snapshot(&self) -> FxHashMap<String, Value> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FxHashMap<String, Value>> {
        self.inner.lock().expect("shared output lock poisoned")
    }
}
