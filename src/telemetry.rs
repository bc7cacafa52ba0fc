// ABOUTME: Injectable diagnostics sink for failures that must never fail the parent operation
// ABOUTME: Default sink emits structured tracing events; tests can record what was swallowed

use std::fmt::Display;
use std::sync::{Arc, Mutex};

pub trait Telemetry: Send + Sync {
    fn swallowed(&self, operation: &'static str, error: &dyn Display);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingTelemetry;

impl Telemetry for TracingTelemetry {
    fn swallowed(&self, operation: &'static str, error: &dyn Display) {
        tracing::warn!(operation, error = %error, "operation failed and was swallowed");
    }
}

/// Keeps every swallowed failure in memory.
#[derive(Debug, Default, Clone)]
pub struct RecordingTelemetry {
    events: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingTelemetry {
    pub fn events(&self) -> Vec<(String, String)> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl Telemetry for RecordingTelemetry {
    fn swallowed(&self, operation: &'static str, error: &dyn Display) {
        if let Ok(mut events) = self.events.lock() {
            events.push((operation.to_string(), error.to_string()));
        }
    }
}
