//! hive-sentry - acoustic hive monitor
//!
//! Listens to a microphone mounted near a hive entrance, estimates loudness
//! and the dominant in-band frequency of each sample block, classifies the
//! result as honey-bee activity or a hornet intrusion, and reports it as
//! JSON telemetry.
//!
//! Pipeline per block: acquisition ([`audio`]) -> channel selection and
//! loudness ([`analysis::amplitude`]) -> windowed FFT and peak search
//! ([`analysis::spectrum`]) -> confidence and label
//! ([`analysis::classifier`]) -> paced reporting ([`telemetry`]).

pub mod analysis;
pub mod audio;
pub mod config;
pub mod error;
pub mod telemetry;

pub use analysis::{ClassificationResult, Detection, Pipeline};
pub use audio::{CpalSource, SampleBlock, SampleSource, WavSource};
pub use config::AppConfig;
pub use error::{AcquisitionError, TransportError};
pub use telemetry::{TelemetryClient, TelemetryPublisher, TelemetryRecord};
