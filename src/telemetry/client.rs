// HTTP transport for telemetry records.
//
// Two destinations are supported: a Firebase Realtime Database (PUT to
// telemetry/latest.json, optionally authenticated with a database secret)
// and a plain telemetry server (POST to /api/telemetry with an optional
// x-api-key header). Firebase takes precedence when both are configured.
// All calls are blocking; the run loop posts at most once per second so
// there is nothing to gain from an async client here.

use std::time::Duration;

use crate::config::TelemetryConfig;
use crate::error::TransportError;

use super::TelemetryRecord;

enum Endpoint {
    /// PUT {url}?auth={secret}
    Firebase { url: String, secret: String },
    /// POST {url} with optional x-api-key
    Server { url: String, api_key: String },
}

pub struct TelemetryClient {
    http: reqwest::blocking::Client,
    endpoint: Endpoint,
}

impl TelemetryClient {
    /// Build a client from configuration, or `None` when no destination is
    /// configured at all.
    pub fn from_config(config: &TelemetryConfig) -> Result<Option<Self>, TransportError> {
        let endpoint = if !config.firebase_db_url.is_empty() {
            let base = config.firebase_db_url.trim_end_matches('/');
            if !base.starts_with("https://") {
                return Err(TransportError::InvalidEndpoint {
                    url: config.firebase_db_url.clone(),
                });
            }
            Endpoint::Firebase {
                url: format!("{}/telemetry/latest.json", base),
                secret: config.firebase_db_secret.clone(),
            }
        } else if !config.server_base.is_empty() {
            let base = config.server_base.trim_end_matches('/');
            Endpoint::Server {
                url: format!("{}/api/telemetry", base),
                api_key: config.api_key.clone(),
            }
        } else {
            return Ok(None);
        };

        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Some(Self { http, endpoint }))
    }

    /// Send one record, mapping non-2xx responses to errors.
    pub fn send(&self, record: &TelemetryRecord) -> Result<(), TransportError> {
        let request = match &self.endpoint {
            Endpoint::Firebase { url, secret } => {
                let mut request = self.http.put(url);
                if !secret.is_empty() {
                    request = request.query(&[("auth", secret.as_str())]);
                }
                request
            }
            Endpoint::Server { url, api_key } => {
                let mut request = self.http.post(url);
                if !api_key.is_empty() {
                    request = request.header("x-api-key", api_key);
                }
                request
            }
        };

        let response = request.json(record).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                code: status.as_u16(),
                body: response.text().unwrap_or_default(),
            });
        }
        Ok(())
    }

    /// Destination URL, for startup logging.
    pub fn endpoint_url(&self) -> &str {
        match &self.endpoint {
            Endpoint::Firebase { url, .. } => url,
            Endpoint::Server { url, .. } => url,
        }
    }
}
