//! Configuration for capture, detection, and telemetry
//!
//! Runtime configuration is loaded from a JSON file so thresholds and band
//! boundaries can be tuned per apiary without recompiling. Missing or invalid
//! files fall back to built-in defaults with a logged warning.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub audio: AudioConfig,
    pub detection: DetectionConfig,
    pub telemetry: TelemetryConfig,
}

/// Audio acquisition parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Capture sample rate in Hz
    pub sample_rate_hz: u32,
    /// Frames per sample block (also the FFT size)
    pub frames_per_block: usize,
    /// Sleep between pipeline iterations in milliseconds
    pub idle_ms: u64,
    /// Deadline for a blocking block read in milliseconds
    pub read_timeout_ms: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 10_000,
            frames_per_block: 1024,
            idle_ms: 500,
            read_timeout_ms: 2_000,
        }
    }
}

/// Spectral detection and classification parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Lower edge of the detection band in Hz
    pub min_freq_hz: f64,
    /// Upper edge of the detection band in Hz
    pub max_freq_hz: f64,
    /// Lower edge of the honey-bee band in Hz
    pub honey_bee_min_hz: f64,
    /// Upper edge of the honey-bee band in Hz
    pub honey_bee_max_hz: f64,
    /// Minimum combined confidence percent required to report a detection
    pub min_confidence_percent: f64,
    /// dBFS value that maps to 0% loudness
    pub amplitude_db_floor: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            min_freq_hz: 100.0,
            max_freq_hz: 1000.0,
            honey_bee_min_hz: 200.0,
            honey_bee_max_hz: 300.0,
            min_confidence_percent: 3.0,
            amplitude_db_floor: -60.0,
        }
    }
}

/// Telemetry reporting parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Identifier included in every report
    pub device_id: String,
    /// Base URL of the telemetry server (POST {base}/api/telemetry)
    pub server_base: String,
    /// Firebase Realtime Database URL; when set, takes precedence over
    /// `server_base` (PUT {db}/telemetry/latest.json)
    pub firebase_db_url: String,
    /// Optional Firebase database secret appended as ?auth=
    pub firebase_db_secret: String,
    /// Optional x-api-key header value for the telemetry server
    pub api_key: String,
    /// Minimum interval between posts in milliseconds
    pub post_interval_ms: u64,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            device_id: "hive-1".to_string(),
            server_base: String::new(),
            firebase_db_url: String::new(),
            firebase_db_secret: String::new(),
            api_key: String::new(),
            post_interval_ms: 1_000,
            request_timeout_ms: 5_000,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            detection: DetectionConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file, falling back to defaults
    /// when the file is missing or malformed.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.audio.sample_rate_hz, 10_000);
        assert_eq!(config.audio.frames_per_block, 1024);
        assert_eq!(config.detection.min_freq_hz, 100.0);
        assert_eq!(config.detection.max_freq_hz, 1000.0);
        assert_eq!(config.detection.min_confidence_percent, 3.0);
        assert_eq!(config.telemetry.post_interval_ms, 1_000);
    }

    #[test]
    fn test_json_roundtrip() {
        let config = AppConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.audio.frames_per_block, config.audio.frames_per_block);
        assert_eq!(
            parsed.detection.honey_bee_max_hz,
            config.detection.honey_bee_max_hz
        );
        assert_eq!(parsed.telemetry.device_id, config.telemetry.device_id);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_from_file("/nonexistent/hive-sentry.json");
        assert_eq!(config.audio.sample_rate_hz, 10_000);
    }
}
