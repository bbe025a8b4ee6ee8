// hive-sentry - run the acoustic hive monitor.
//
// Reads sample blocks from the microphone (or a WAV file for offline
// tuning), runs each through the detection pipeline, and posts telemetry on
// the configured interval. Acquisition failures degrade to silence instead
// of aborting; only end-of-file on a WAV source stops the loop.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use hive_sentry::audio::{CpalSource, SampleBlock, SampleSource, WavSource};
use hive_sentry::config::AppConfig;
use hive_sentry::error::AcquisitionError;
use hive_sentry::telemetry::{TelemetryClient, TelemetryPublisher};
use hive_sentry::Pipeline;

#[derive(Parser, Debug)]
#[command(name = "hive-sentry")]
#[command(about = "Acoustic honey-bee and hornet monitor")]
struct Args {
    /// Path to the JSON configuration file
    #[arg(short, long, default_value = "hive-sentry.json")]
    config: PathBuf,

    /// Override the configured device identifier
    #[arg(long)]
    device_id: Option<String>,

    /// Replay a WAV file instead of capturing from the microphone
    #[arg(long)]
    input: Option<PathBuf>,

    /// Run the pipeline but log telemetry instead of posting it
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut config = AppConfig::load_from_file(&args.config);
    if let Some(device_id) = args.device_id {
        config.telemetry.device_id = device_id;
    }

    let mut source: Box<dyn SampleSource> = match &args.input {
        Some(path) => Box::new(
            WavSource::open(path)
                .with_context(|| format!("failed to open WAV input {:?}", path))?,
        ),
        None => Box::new(
            CpalSource::open(
                config.audio.sample_rate_hz,
                Duration::from_millis(config.audio.read_timeout_ms),
            )
            .context("failed to open capture device")?,
        ),
    };

    let client = if args.dry_run {
        tracing::info!("[Main] Dry run: telemetry will be logged, not posted");
        None
    } else {
        let client = TelemetryClient::from_config(&config.telemetry)
            .context("invalid telemetry configuration")?;
        match &client {
            Some(client) => tracing::info!("[Main] Reporting to {}", client.endpoint_url()),
            None => tracing::warn!("[Main] No telemetry destination configured"),
        }
        client
    };

    let mut publisher = TelemetryPublisher::new(
        client,
        config.telemetry.device_id.clone(),
        config.telemetry.post_interval_ms,
    );
    let mut pipeline = Pipeline::new(&config.audio, &config.detection, source.sample_rate());
    let mut block = SampleBlock::new(config.audio.frames_per_block);
    let idle = Duration::from_millis(config.audio.idle_ms);

    tracing::info!(
        "[Main] Monitoring as '{}' ({} frames at {} Hz)",
        config.telemetry.device_id,
        config.audio.frames_per_block,
        source.sample_rate()
    );

    loop {
        match source.read_block(&mut block) {
            Ok(_) => {}
            Err(AcquisitionError::EndOfStream) => {
                tracing::info!("[Main] Input exhausted, stopping");
                break;
            }
            Err(err) => {
                pipeline.note_acquisition_failure(&err);
                block.clear();
            }
        }

        let result = pipeline.process(&block);
        publisher.maybe_publish(&result);

        if !idle.is_zero() {
            thread::sleep(idle);
        }
    }

    Ok(())
}
