//! # Anemo RX
//!
//! Wind sensor receiver: listens for telemetry frames from a masthead wind
//! sensor, applies the user's calibration, drives the front-panel UI and
//! republishes the reading as NMEA 0183 `MWV` sentences.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Load configuration (`anemo-rx [config.toml]`, defaults otherwise)
//!    - Set up logging with tracing subscriber
//!    - Load calibration and bind the link on the stored channel
//!    - Open the button device and the NMEA port; both are optional
//!
//! 2. **Main Loop**
//!    - Tick every 10 ms: buttons, interaction machine, NMEA pacing, render
//!    - Forward channel changes to the link task
//!    - Handle Ctrl+C for graceful shutdown
//!
//! # Examples
//!
//! ```bash
//! anemo-rx /etc/anemo-rx.toml
//! RUST_LOG=debug anemo-rx
//! ```

use anyhow::{Context, Result};
use std::path::Path;
use std::time::Instant;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use anemo_rx::app::App;
use anemo_rx::calibration::store::FileCalibrationStore;
use anemo_rx::config::{Config, LoggingConfig, NmeaConfig};
use anemo_rx::link::receiver::LinkReceiver;
use anemo_rx::link::transport::{run_link, UdpTransport};
use anemo_rx::serial::{run_sentence_sink, NmeaSerial};
use anemo_rx::ui::buttons::BUTTON_COUNT;
use anemo_rx::ui::input::{spawn_reader, ButtonDevice};
use anemo_rx::ui::view::LogDisplay;

/// Main loop period; also the button sampling period
const TICK_PERIOD: Duration = Duration::from_millis(10);

/// Sentences queued for the serial port before new ones are dropped
const SENTENCE_QUEUE: usize = 4;

fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .with_context(|| format!("invalid log level {:?}", config.level))?,
    };

    let (file_layer, guard) = if config.log_dir.is_empty() {
        (None, None)
    } else {
        let appender = tracing_appender::rolling::daily(&config.log_dir, "anemo-rx.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    Ok(guard)
}

fn open_nmea(config: &NmeaConfig) -> anemo_rx::error::Result<NmeaSerial> {
    if config.port.is_empty() {
        NmeaSerial::open(config.baud_rate)
    } else {
        NmeaSerial::open_with_paths(&[config.port.as_str()], config.baud_rate)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(&path).with_context(|| format!("loading config {}", path))?,
        None => Config::default(),
    };

    let _log_guard = init_logging(&config.logging)?;
    info!("Anemo RX v{} starting...", env!("CARGO_PKG_VERSION"));

    // Buttons; the debouncers start from what is already held
    let keymap = config.ui.keymap();
    let device_path = (!config.ui.input_device.is_empty()).then(|| Path::new(&config.ui.input_device));
    let device = match ButtonDevice::open(device_path, &keymap) {
        Ok(device) => Some(device),
        Err(e) => {
            warn!("{}; continuing without buttons", e);
            None
        }
    };
    let initial_levels = device
        .as_ref()
        .map(|d| d.initial_state(&keymap))
        .unwrap_or([false; BUTTON_COUNT]);
    let (levels_tx, levels_rx) = watch::channel(initial_levels);
    if let Some(device) = device {
        if let Err(e) = spawn_reader(device, keymap, levels_tx) {
            warn!("{}; continuing without buttons", e);
        }
    }

    let store = FileCalibrationStore::new(&config.calibration.path);
    let mut app = App::new(
        &config,
        Box::new(store),
        Box::new(LogDisplay::new()),
        initial_levels,
        Instant::now(),
    );

    // Link
    let channel = app.settings().channel;
    let transport = UdpTransport::bind(config.link.bind_addr, config.link.base_port, channel)
        .await
        .context("binding link transport")?;
    let (receiver, monitor) = LinkReceiver::new();
    let (channel_tx, channel_rx) = watch::channel(channel);
    let link_task = tokio::spawn(run_link(transport, receiver, channel_rx));

    // NMEA
    let mut sentence_tx = None;
    let mut sink_task = None;
    if config.nmea.enabled_out || config.nmea.enabled_in {
        match open_nmea(&config.nmea) {
            Ok(serial) => {
                info!("NMEA on {}", serial.device_path());
                let (tx, rx) = mpsc::channel(SENTENCE_QUEUE);
                sentence_tx = Some(tx);
                sink_task = Some(tokio::spawn(run_sentence_sink(
                    serial.into_port(),
                    rx,
                    config.nmea.enabled_in,
                )));
            }
            Err(e) => warn!("{}; continuing without NMEA output", e),
        }
    }

    let mut ticker = interval(TICK_PERIOD);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!("Running, press Ctrl+C to exit");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let levels = *levels_rx.borrow();
                let snapshot = monitor.snapshot();
                let outcome = app.tick(Instant::now(), levels, &snapshot);

                if let Some(channel) = outcome.retune {
                    channel_tx.send_replace(channel);
                }

                if let (Some(sentence), Some(tx)) = (outcome.sentence, sentence_tx.as_ref()) {
                    match tx.try_send(sentence) {
                        Ok(()) => {}
                        Err(mpsc::error::TrySendError::Full(_)) => {
                            debug!("NMEA port busy, sentence dropped");
                        }
                        Err(mpsc::error::TrySendError::Closed(_)) => {
                            warn!("NMEA output stopped");
                            sentence_tx = None;
                        }
                    }
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    drop(channel_tx);
    drop(sentence_tx);

    if let Err(e) = link_task.await {
        warn!("Link task ended abnormally: {}", e);
    }
    if let Some(task) = sink_task {
        match task.await {
            Ok(Ok(stats)) => info!("NMEA sentences written: {}", stats.sentences_written),
            Ok(Err(e)) => warn!("NMEA port error: {}", e),
            Err(e) => warn!("NMEA task ended abnormally: {}", e),
        }
    }

    let counters = monitor.snapshot().counters;
    info!(
        "Total frames: {} received, {} lost, {} rejected",
        counters.received,
        counters.lost,
        counters.rejected()
    );

    Ok(())
}
