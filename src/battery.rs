use crate::prelude::*;
use crate::register::display;
use crate::state::CycleReport;

use {
    async_trait::async_trait,
    chrono::Utc,
    std::time::Duration,
    tokio_modbus::client::{Context, Reader},
    tokio_serial::{DataBits, Parity, StopBits},
};

#[derive(Clone, Debug, PartialEq)]
pub enum ChannelData {
    Cycle(CycleReport),
    Shutdown,
}
pub type Sender = broadcast::Sender<ChannelData>;
pub type Receiver = broadcast::Receiver<ChannelData>;

/// Fetches a run of holding registers from the battery.
#[async_trait]
pub trait BlockReader: Send {
    async fn read_block(&mut self, address: u16, count: u16) -> Result<Vec<u16>, DecodeError>;
}

// ModbusRtuReader {{{
pub struct ModbusRtuReader {
    ctx: Context,
    timeout: Duration,
}

impl ModbusRtuReader {
    pub fn open(config: &config::Battery) -> Result<Self> {
        let builder = tokio_serial::new(config.device(), config.baud_rate())
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One);

        let port = tokio_serial::SerialStream::open(&builder)
            .map_err(|e| anyhow!("failed to open {}: {}", config.device(), e))?;
        let ctx = tokio_modbus::client::rtu::attach_slave(port, tokio_modbus::Slave(config.unit_id()));

        Ok(Self {
            ctx,
            timeout: Duration::from_millis(config.read_timeout_ms()),
        })
    }
}

#[async_trait]
impl BlockReader for ModbusRtuReader {
    async fn read_block(&mut self, address: u16, count: u16) -> Result<Vec<u16>, DecodeError> {
        let failure = |reason: String| DecodeError::TransportFailure { address, count, reason };

        match tokio::time::timeout(self.timeout, self.ctx.read_holding_registers(address, count)).await {
            Ok(Ok(Ok(words))) => Ok(words),
            Ok(Ok(Err(exception))) => Err(failure(format!("device exception {:?}", exception))),
            Ok(Err(e)) => Err(failure(e.to_string())),
            Err(_) => Err(failure(format!("no reply within {}ms", self.timeout.as_millis()))),
        }
    }
} // }}}

/// Reads every block of the schema, then applies them in one write-locked step.
pub async fn poll_cycle<R: BlockReader + ?Sized>(
    reader: &mut R,
    state: &SharedBattery,
) -> Result<CycleReport, DecodeError> {
    let blocks = state.read().await.schema.blocks();

    let mut reads = Vec::with_capacity(blocks.len());
    for block in blocks {
        let read = reader.read_block(block.address, block.count).await;
        reads.push((block, read));
    }

    let mut state = state.write().await;
    let report = state.apply_cycle(reads, Utc::now())?;

    if log::log_enabled!(log::Level::Trace) {
        for line in display::schema_table(&state.schema) {
            trace!("{}", line);
        }
        for line in display::canonical_table(&state.canonical) {
            trace!("{}", line);
        }
    }

    Ok(report)
}

#[derive(Clone)]
pub struct Battery {
    config: ConfigWrapper,
    channels: Channels,
    state: SharedBattery,
}

impl Battery {
    pub fn new(config: ConfigWrapper, channels: Channels, state: SharedBattery) -> Self {
        Self {
            config,
            channels,
            state,
        }
    }

    pub fn state(&self) -> SharedBattery {
        self.state.clone()
    }

    /// Opens the serial port and polls until shutdown, reopening it after
    /// errors.
    pub async fn start(&self) -> Result<()> {
        let mut shutdown = self.channels.shutdown.subscribe();

        loop {
            let battery = self.config.battery();

            match ModbusRtuReader::open(&battery) {
                Ok(mut reader) => {
                    info!("battery: {} opened at {} baud, unit {}", battery.device(), battery.baud_rate(), battery.unit_id());
                    match self.poll(&mut reader, &mut shutdown).await {
                        Ok(()) => break,
                        Err(e) => error!("battery: {}", e),
                    }
                }
                Err(e) => error!("battery: {}", e),
            }

            info!("battery: reconnecting in {}s", battery.reconnect_delay_secs());
            tokio::select! {
                _ = shutdown.recv() => break,
                _ = tokio::time::sleep(Duration::from_secs(battery.reconnect_delay_secs())) => {}
            }
        }

        info!("battery: poller exiting");
        let _ = self.channels.from_battery.send(ChannelData::Shutdown);
        Ok(())
    }

    /// Polls with `reader` until shutdown (Ok) or until a cycle where every
    /// block failed (Err, so the caller can reopen the port).
    pub async fn poll<R: BlockReader + ?Sized>(
        &self,
        reader: &mut R,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> Result<()> {
        let mut interval = tokio::time::interval(Duration::from_millis(self.config.battery().poll_interval_ms()));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.recv() => return Ok(()),
                _ = interval.tick() => {}
            }

            let report = poll_cycle(reader, &self.state).await?;
            debug!(
                "battery: cycle done, {}/{} blocks read",
                report.blocks - report.failed,
                report.blocks
            );

            if report.all_failed() {
                bail!("no block could be read");
            }

            let _ = self.channels.from_battery.send(ChannelData::Cycle(report));
        }
    }
}
