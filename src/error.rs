// Error types for the hive-sentry pipeline
//
// Two failure domains exist and neither is fatal to the pipeline:
// acquisition errors degrade the iteration to an empty sample block, and
// transport errors are logged and dropped until the next telemetry interval.

use std::fmt;

/// Errors from the sample acquisition boundary.
///
/// The pipeline never aborts on these: the run loop substitutes a zeroed
/// sample block and carries on, so every iteration still produces a result.
#[derive(Debug, Clone, PartialEq)]
pub enum AcquisitionError {
    /// No capture device is available on this host
    DeviceUnavailable,

    /// The input stream could not be opened or configured
    StreamOpenFailed { reason: String },

    /// The ring buffer did not fill within the read deadline
    Timeout { waited_ms: u64 },

    /// An offline source (WAV replay) reached the end of its data
    EndOfStream,

    /// Driver or decoder reported a hard error
    Hardware { details: String },
}

impl fmt::Display for AcquisitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcquisitionError::DeviceUnavailable => {
                write!(f, "no default input device found")
            }
            AcquisitionError::StreamOpenFailed { reason } => {
                write!(f, "failed to open audio stream: {}", reason)
            }
            AcquisitionError::Timeout { waited_ms } => {
                write!(f, "no samples arrived within {} ms", waited_ms)
            }
            AcquisitionError::EndOfStream => write!(f, "input source exhausted"),
            AcquisitionError::Hardware { details } => {
                write!(f, "hardware error: {}", details)
            }
        }
    }
}

impl std::error::Error for AcquisitionError {}

impl From<std::io::Error> for AcquisitionError {
    fn from(err: std::io::Error) -> Self {
        AcquisitionError::Hardware {
            details: err.to_string(),
        }
    }
}

impl From<hound::Error> for AcquisitionError {
    fn from(err: hound::Error) -> Self {
        AcquisitionError::Hardware {
            details: err.to_string(),
        }
    }
}

/// Errors from the telemetry reporting boundary.
///
/// Logged by the publisher, never retried synchronously, never fatal; the
/// next interval posts fresh data.
#[derive(Debug)]
pub enum TransportError {
    /// Endpoint URL is missing or malformed (e.g. non-https Firebase URL)
    InvalidEndpoint { url: String },

    /// Request failed before a response arrived (connect, DNS, TLS, timeout)
    Http { details: String },

    /// Server answered with a non-success status
    Status { code: u16, body: String },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::InvalidEndpoint { url } => {
                write!(f, "invalid telemetry endpoint: {}", url)
            }
            TransportError::Http { details } => write!(f, "request failed: {}", details),
            TransportError::Status { code, body } => {
                write!(f, "server returned {}: {}", code, body)
            }
        }
    }
}

impl std::error::Error for TransportError {}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError::Http {
            details: err.to_string(),
        }
    }
}
