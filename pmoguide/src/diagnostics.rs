//! Optional hook receiving records that failed to decode
//!
//! The orchestrator reports every per-record decode failure here before
//! recording it in the batch manifest. Nothing depends on the hook: with no
//! diagnostics installed, results are identical.

use std::sync::Mutex;

use serde_json::Value;
use tracing::warn;

use crate::error::DecodeError;

pub trait Diagnostics: Send + Sync {
    fn report_decode_failure(&self, id: &str, raw: &Value, error: &DecodeError);
}

/// Logs decode failures with `tracing`, the raw payload at debug level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn report_decode_failure(&self, id: &str, raw: &Value, error: &DecodeError) {
        warn!(id, entity = error.entity(), "Decode failure: {}", error);
        tracing::debug!(id, payload = %raw, "Payload of failed record");
    }
}

/// One failure kept by [`CollectingDiagnostics`]
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeReport {
    pub id: String,
    pub raw: Value,
    pub error: DecodeError,
}

/// Keeps every reported failure in memory for later triage
#[derive(Debug, Default)]
pub struct CollectingDiagnostics {
    reports: Mutex<Vec<DecodeReport>>,
}

impl CollectingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns the reports collected so far
    pub fn take(&self) -> Vec<DecodeReport> {
        match self.reports.lock() {
            Ok(mut reports) => std::mem::take(&mut *reports),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl Diagnostics for CollectingDiagnostics {
    fn report_decode_failure(&self, id: &str, raw: &Value, error: &DecodeError) {
        let report = DecodeReport {
            id: id.to_string(),
            raw: raw.clone(),
            error: error.clone(),
        };
        match self.reports.lock() {
            Ok(mut reports) => reports.push(report),
            Err(poisoned) => poisoned.into_inner().push(report),
        }
    }
}
