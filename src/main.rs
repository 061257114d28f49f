//! Firewatch: main entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Adapters (outer ring)                    │
//! │                                                              │
//! │  JsonConfigFile   FileRecordStore   CommandCamera            │
//! │  (ConfigPort)     (StoragePort)     (CameraPort)             │
//! │  LogEventSink     RetryingNotifier<LogNotifier>  SystemClock │
//! │  (EventSink)      (NotifierPort)                 (Clock)     │
//! │                                                              │
//! │  ──────────────── Port Trait Boundary ────────────────────   │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │        FireEngine (evaluator · fsm · sequencer ·       │  │
//! │  │                    classifier · verdict)               │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Usage: `firewatch [CONFIG_PATH]`.  Readings and operator commands are
//! read from stdin, one JSON-lines entry per line, until EOF.

use std::io::{self, BufRead};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};

use firewatch::adapters::command_camera::CommandCamera;
use firewatch::adapters::config_file::JsonConfigFile;
use firewatch::adapters::json_lines::{Inbound, LineError, parse_line};
use firewatch::adapters::log_sink::LogEventSink;
use firewatch::adapters::notifier::{LogNotifier, RetryingNotifier};
use firewatch::adapters::record_log::FileRecordStore;
use firewatch::adapters::time::SystemClock;
use firewatch::app::ports::{Clock, ConfigPort};
use firewatch::vision::HsvFireClassifier;
use firewatch::{AppCommand, EnginePorts, FireEngine};

const DEFAULT_CONFIG_PATH: &str = "firewatch.json";
const NOTIFY_ATTEMPTS: u8 = 3;
const NOTIFY_BACKOFF: Duration = Duration::from_secs(2);

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = JsonConfigFile::new(&config_path)
        .load()
        .map_err(anyhow::Error::msg)
        .with_context(|| format!("loading {config_path}"))?;

    let storage = Arc::new(
        FileRecordStore::open(&config.storage.data_dir)
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("opening store at {}", config.storage.data_dir))?,
    );
    let clock = Arc::new(SystemClock::new());
    let ports = EnginePorts {
        camera: Arc::new(CommandCamera::new(
            config.camera.command.clone(),
            storage.root(),
        )),
        storage,
        notifier: Arc::new(RetryingNotifier::new(
            LogNotifier::new(),
            NOTIFY_ATTEMPTS,
            NOTIFY_BACKOFF,
        )),
        sink: Arc::new(LogEventSink::new()),
        clock: clock.clone(),
        classifier: Arc::new(HsvFireClassifier::new(&config.classifier)),
    };

    let engine = FireEngine::new(config, ports).context("building engine")?;
    engine.start();
    info!("reading JSON lines from stdin (reset | cancel | status | reading)");

    for line in io::stdin().lock().lines() {
        let line = line.context("reading stdin")?;
        match parse_line(&line, clock.now_ms()) {
            Ok(Inbound::Reading(reading)) => {
                if let Err(e) = engine.ingest(reading) {
                    warn!("reading dropped: {e}");
                }
            }
            Ok(Inbound::Command(AppCommand::Shutdown)) => break,
            Ok(Inbound::Command(cmd)) => {
                let tier = engine.handle_command(cmd);
                info!("{cmd:?} -> tier {tier}");
            }
            Ok(Inbound::Status) => {
                let status = serde_json::to_string(&engine.status())?;
                let counters = serde_json::to_string(&engine.counters())?;
                println!("{status}");
                println!("{counters}");
            }
            Err(LineError::Empty) => {}
            Err(e) => warn!("{e}"),
        }
    }

    engine.handle_command(AppCommand::Shutdown);
    info!("firewatch stopped: {:?}", engine.counters());
    Ok(())
}
