// Module declarations for the application's core components
pub mod baseload;       // Baseload CSV watcher
pub mod battery;        // Battery polling actor and Modbus RTU transport
pub mod channels;       // Inter-component communication channels
pub mod config;         // Configuration management
pub mod datalog_writer; // Data logging functionality
pub mod dsmr;           // DSMR P1 telegram framing and scanning
pub mod error;          // Error handling and types
pub mod meter;          // P1 meter reading actor
pub mod options;        // Command line options parsing
pub mod prelude;        // Common imports and types
pub mod register;       // Register definitions and decoding
pub mod state;          // Shared decoded tables

// Get the package version from Cargo.toml
const CARGO_PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

use crate::baseload::BaseloadWatcher;
use crate::battery::Battery;
use crate::datalog_writer::DatalogWriter;
use crate::meter::Meter;
use crate::prelude::*;
use crate::state::{BaseloadState, SharedBaseload};

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Manages all application components and their lifecycle
#[derive(Clone)]
pub struct Components {
    pub battery: Option<Arc<Battery>>,
    pub meter: Option<Arc<Meter>>,
    pub baseload: Option<Arc<BaseloadWatcher>>,
    pub datalog_writer: Option<Arc<DatalogWriter>>,
    pub channels: Channels,
}

impl Components {
    /// Builds the enabled components. Fails when the register tables or
    /// their mapping rules are inconsistent.
    pub fn new(config: &ConfigWrapper, channels: Channels) -> Result<Self> {
        let battery = if config.battery().enabled() {
            let state = BatteryState::venus_e()?.shared();
            Some(Arc::new(Battery::new(config.clone(), channels.clone(), state)))
        } else {
            None
        };

        let meter = if config.meter().enabled() {
            let state = MeterState::new().shared();
            Some(Arc::new(Meter::new(config.clone(), channels.clone(), state)))
        } else {
            None
        };

        let baseload = config.baseload().map(|baseload| {
            Arc::new(BaseloadWatcher::new(&baseload, channels.clone(), BaseloadState::default().shared()))
        });

        let datalog_writer = match config.datalog() {
            Some(datalog) => Some(Arc::new(DatalogWriter::new(datalog.file())?)),
            None => None,
        };

        Ok(Self {
            battery,
            meter,
            baseload,
            datalog_writer,
            channels,
        })
    }

    pub fn battery_state(&self) -> Option<SharedBattery> {
        self.battery.as_ref().map(|b| b.state())
    }

    pub fn meter_state(&self) -> Option<SharedMeter> {
        self.meter.as_ref().map(|m| m.state())
    }

    pub fn baseload_state(&self) -> Option<SharedBaseload> {
        self.baseload.as_ref().map(|b| b.state())
    }

    /// Spawns one task per enabled component.
    pub fn start(&self, config: &ConfigWrapper) -> Vec<(&'static str, JoinHandle<()>)> {
        let mut handles = Vec::new();

        if let Some(battery) = self.battery.clone() {
            info!("  Starting battery poller...");
            handles.push((
                "battery",
                tokio::spawn(async move {
                    if let Err(e) = battery.start().await {
                        error!("Battery task failed: {}", e);
                    }
                }),
            ));
        }

        if let Some(meter) = self.meter.clone() {
            info!("  Starting meter reader...");
            handles.push((
                "meter",
                tokio::spawn(async move {
                    if let Err(e) = meter.start().await {
                        error!("Meter task failed: {}", e);
                    }
                }),
            ));
        }

        if let Some(baseload) = self.baseload.clone() {
            info!("  Starting baseload watcher...");
            handles.push((
                "baseload",
                tokio::spawn(async move {
                    if let Err(e) = baseload.start().await {
                        error!("Baseload task failed: {}", e);
                    }
                }),
            ));
        }

        if let (Some(writer), Some(datalog)) = (self.datalog_writer.clone(), config.datalog()) {
            info!("  Starting datalog writer...");
            let channels = self.channels.clone();
            let (battery, meter, baseload) = (self.battery_state(), self.meter_state(), self.baseload_state());
            handles.push((
                "datalog",
                tokio::spawn(async move {
                    let interval = Duration::from_secs(datalog.interval_secs());
                    if let Err(e) = writer.start(interval, channels, battery, meter, baseload).await {
                        error!("Datalog task failed: {}", e);
                    }
                }),
            ));
        }

        handles
    }

    /// Signals every component to stop after its current cycle.
    pub fn stop(&self) {
        info!("Stopping all components...");
        let _ = self.channels.shutdown.send(());
    }
}

fn init_logging(level: &str) {
    let result = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {} {}] {}",
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
                record.level(),
                record.module_path().unwrap_or(""),
                record.args()
            )
        })
        .write_style(env_logger::WriteStyle::Never)
        .try_init();

    if let Err(e) = result {
        eprintln!("Failed to initialise logging: {}", e);
    }
}

/// Runs all components until `shutdown_rx` fires.
pub async fn app(mut shutdown_rx: broadcast::Receiver<()>, config: ConfigWrapper) -> Result<()> {
    info!("Initializing channels...");
    let channels = Channels::new();

    info!("Initializing components...");
    let components = Components::new(&config, channels)?;
    let handles = components.start(&config);

    info!("Waiting for shutdown signal...");
    let _ = shutdown_rx.recv().await;

    info!("Shutdown signal received, stopping components...");
    components.stop();

    for (name, handle) in handles {
        if let Err(e) = handle.await {
            error!("Error waiting for {} task: {}", name, e);
        }
    }

    info!("Application shutdown complete");
    Ok(())
}

/// Application entry point: logging, configuration, signal handling.
pub async fn run(options: Options) -> Result<()> {
    let config = ConfigWrapper::new(options.config_file.clone())?;

    init_logging(&config.loglevel());
    info!("venus-bridge {} starting with config file: {}", CARGO_PKG_VERSION, options.config_file);
    config.log_summary();

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    let shutdown_tx_clone = shutdown_tx.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
        }
        let _ = shutdown_tx_clone.send(());
    });

    if let Some(runtime) = options.runtime {
        info!("Run time limited to {}s", runtime);
        let shutdown_tx_clone = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(runtime)).await;
            let _ = shutdown_tx_clone.send(());
        });
    }

    app(shutdown_rx, config).await
}
