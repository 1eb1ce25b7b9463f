use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::error::{ClientError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub kind: String,
    pub timestamp: SystemTime,
    pub detail: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureRecord {
    pub context: String,
    pub error: String,
    pub attempt: u32,
}

/// In-memory sink for connection lifecycle events. Clones share storage.
#[derive(Default, Clone)]
pub struct TelemetryCollector {
    events: Arc<Mutex<Vec<TelemetryEvent>>>,
    failures: Arc<Mutex<Vec<FailureRecord>>>,
}

impl TelemetryCollector {
    pub fn record(&self, kind: impl Into<String>, detail: serde_json::Value) {
        self.events
            .lock()
            .expect("telemetry events poisoned")
            .push(TelemetryEvent {
                kind: kind.into(),
                timestamp: SystemTime::now(),
                detail,
            });
    }

    pub fn record_failure(
        &self,
        context: impl Into<String>,
        error: impl Into<String>,
        attempt: u32,
    ) {
        self.failures
            .lock()
            .expect("telemetry failures poisoned")
            .push(FailureRecord {
                context: context.into(),
                error: error.into(),
                attempt,
            });
    }

    /// Number of buffered events of the given kind.
    pub fn count(&self, kind: &str) -> usize {
        self.events
            .lock()
            .expect("telemetry events poisoned")
            .iter()
            .filter(|event| event.kind == kind)
            .count()
    }

    pub fn drain(&self) -> (Vec<TelemetryEvent>, Vec<FailureRecord>) {
        let mut events = self.events.lock().expect("telemetry events poisoned");
        let mut failures = self.failures.lock().expect("telemetry failures poisoned");
        (std::mem::take(&mut *events), std::mem::take(&mut *failures))
    }
}

impl std::fmt::Debug for TelemetryCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryCollector").finish_non_exhaustive()
    }
}

/// Install the global `tracing` subscriber. `RUST_LOG` wins over the
/// configured level when set.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|err| ClientError::Config(format!("invalid log filter `{}`: {err}", config.level)))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|err| ClientError::Config(format!("tracing already initialised: {err}")))
}
