// Telemetry module - report shaping and interval pacing
//
// Builds the wire record for each classification and decides when to post
// it. Transport lives in client.rs; everything here is pure and testable
// without a network.

pub mod client;

use std::time::Instant;

use serde::Serialize;

use crate::analysis::{ClassificationResult, Detection};

pub use client::TelemetryClient;

/// One telemetry report in the wire format the backend consumes.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryRecord {
    pub device_id: String,
    /// Peak frequency in Hz, rounded to 2 decimal places.
    pub peak_frequency_hz: f64,
    /// Loudness percent, rounded to 1 decimal place.
    pub amplitude_percent: f64,
    /// Confidence percent, rounded to 1 decimal place.
    pub confidence_percent: f64,
    pub detection: Detection,
    /// Milliseconds since the process started.
    pub ts: u64,
}

/// Replace non-finite values with 0 so the serialized JSON stays valid.
fn sanitize(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Round to `decimals` decimal places.
fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

impl TelemetryRecord {
    pub fn from_result(device_id: &str, result: &ClassificationResult, ts: u64) -> Self {
        Self {
            device_id: device_id.to_string(),
            peak_frequency_hz: round_to(sanitize(result.peak_frequency_hz), 2),
            amplitude_percent: round_to(sanitize(result.amplitude_percent), 1),
            confidence_percent: round_to(sanitize(result.confidence_percent), 1),
            detection: result.detection,
            ts,
        }
    }
}

/// Paces telemetry posts to the configured interval and hands records to
/// the transport. Transport failures are logged and dropped; the next
/// interval posts fresh data.
pub struct TelemetryPublisher {
    client: Option<TelemetryClient>,
    device_id: String,
    interval_ms: u64,
    started_at: Instant,
    last_post_ms: Option<u64>,
}

impl TelemetryPublisher {
    /// `client` is `None` in dry-run mode: records are still built and
    /// logged on schedule, nothing leaves the process.
    pub fn new(client: Option<TelemetryClient>, device_id: String, interval_ms: u64) -> Self {
        Self {
            client,
            device_id,
            interval_ms,
            started_at: Instant::now(),
            last_post_ms: None,
        }
    }

    /// Milliseconds since the publisher was created.
    fn now_ms(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }

    /// Post `result` if the interval has elapsed. Returns the record that
    /// was published, if any.
    pub fn maybe_publish(&mut self, result: &ClassificationResult) -> Option<TelemetryRecord> {
        let now = self.now_ms();
        if let Some(last) = self.last_post_ms {
            if now - last < self.interval_ms {
                return None;
            }
        }
        self.last_post_ms = Some(now);

        let record = TelemetryRecord::from_result(&self.device_id, result, now);
        match &self.client {
            Some(client) => {
                if let Err(err) = client.send(&record) {
                    tracing::warn!("[Telemetry] Post failed: {}", err);
                } else {
                    tracing::debug!(
                        "[Telemetry] Posted {} at {:.2} Hz ({:.1}%)",
                        record.detection,
                        record.peak_frequency_hz,
                        record.confidence_percent
                    );
                }
            }
            None => {
                tracing::info!(
                    "[Telemetry] (dry-run) {}",
                    serde_json::to_string(&record).unwrap_or_default()
                );
            }
        }
        Some(record)
    }
}
