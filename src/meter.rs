use crate::dsmr::codec::MAX_BUFFER_SIZE;
use crate::dsmr::{Telegram, TelegramCodec};
use crate::prelude::*;
use crate::state::MeterReading;

use {
    bytes::BytesMut,
    chrono::Utc,
    net2::TcpStreamExt,
    std::time::Duration,
    tokio::io::AsyncReadExt,
    tokio_util::codec::Decoder,
};

#[derive(Clone, Debug, PartialEq)]
pub enum ChannelData {
    Reading(MeterReading),
    Shutdown,
}
pub type Sender = broadcast::Sender<ChannelData>;
pub type Receiver = broadcast::Receiver<ChannelData>;

const CONNECT_TIMEOUT_SECS: u64 = 10;
const TCP_KEEPALIVE_SECS: u64 = 60;

/// Reads P1 telegrams from a serial-to-TCP bridge.
#[derive(Clone)]
pub struct Meter {
    config: ConfigWrapper,
    channels: Channels,
    state: SharedMeter,
}

impl Meter {
    pub fn new(config: ConfigWrapper, channels: Channels, state: SharedMeter) -> Self {
        Self {
            config,
            channels,
            state,
        }
    }

    pub fn state(&self) -> SharedMeter {
        self.state.clone()
    }

    pub async fn start(&self) -> Result<()> {
        let mut shutdown = self.channels.shutdown.subscribe();

        loop {
            let meter = self.config.meter();

            match self.connect(&meter, &mut shutdown).await {
                Ok(()) => break,
                Err(e) => error!("meter {}:{}: {}", meter.host(), meter.port(), e),
            }

            info!("meter: reconnecting in {}s", meter.reconnect_delay_secs());
            tokio::select! {
                _ = shutdown.recv() => break,
                _ = tokio::time::sleep(Duration::from_secs(meter.reconnect_delay_secs())) => {}
            }
        }

        info!("meter: reader exiting");
        let _ = self.channels.from_meter.send(ChannelData::Shutdown);
        Ok(())
    }

    async fn connect(&self, meter: &config::Meter, shutdown: &mut broadcast::Receiver<()>) -> Result<()> {
        info!("meter: connecting to {}:{}", meter.host(), meter.port());

        let stream = match tokio::time::timeout(
            Duration::from_secs(CONNECT_TIMEOUT_SECS),
            tokio::net::TcpStream::connect((meter.host(), meter.port())),
        )
        .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => bail!("failed to connect: {}", e),
            Err(_) => bail!("connection timeout after {} seconds", CONNECT_TIMEOUT_SECS),
        };

        let std_stream = stream.into_std()?;
        if let Err(e) = std_stream.set_keepalive(Some(Duration::new(TCP_KEEPALIVE_SECS, 0))) {
            warn!("failed to set TCP keepalive: {}", e);
        }
        let stream = tokio::net::TcpStream::from_std(std_stream)?;

        info!("meter: connected");
        self.receiver(stream, meter, shutdown).await
    }

    async fn receiver<S>(&self, mut socket: S, meter: &config::Meter, shutdown: &mut broadcast::Receiver<()>) -> Result<()>
    where
        S: tokio::io::AsyncRead + Unpin,
    {
        let mut buf = BytesMut::with_capacity(MAX_BUFFER_SIZE);
        let mut decoder = TelegramCodec::new();
        let read_timeout = Duration::from_secs(meter.read_timeout_secs());

        loop {
            tokio::select! {
                _ = shutdown.recv() => return Ok(()),

                read_result = tokio::time::timeout(read_timeout, socket.read_buf(&mut buf)) => {
                    let len = match read_result {
                        Ok(Ok(n)) => n,
                        Ok(Err(e)) => bail!("read error: {}", e),
                        Err(_) => bail!("no data received for {} seconds", meter.read_timeout_secs()),
                    };

                    if len == 0 {
                        while let Some(telegram) = decoder.decode_eof(&mut buf)? {
                            self.handle_telegram(&telegram, meter).await;
                        }
                        bail!("connection closed by peer");
                    }

                    while let Some(telegram) = decoder.decode(&mut buf)? {
                        self.handle_telegram(&telegram, meter).await;
                    }
                }
            }
        }
    }

    /// Validates and scans one telegram. Never fails: a bad telegram is logged
    /// and the next one is read as usual.
    pub async fn handle_telegram(&self, telegram: &Telegram, meter: &config::Meter) -> Option<MeterReading> {
        if let Err(e) = telegram.check_complete(meter.min_telegram_len()) {
            debug!("meter: {}", e);
            return None;
        }

        if meter.verify_crc() {
            if let Err(e) = telegram.verify() {
                warn!("meter: {}", e);
                self.state.write().await.reject(Utc::now());
                return None;
            }
        }

        let result = self.state.write().await.apply(telegram.text(), Utc::now());
        match result {
            Ok(reading) => {
                if log::log_enabled!(log::Level::Trace) {
                    let state = self.state.read().await;
                    for field in state.table.fields() {
                        trace!("{:<20} {:>8} {:>24} {:>12?} {}", format!("{:?}", field.id), field.code, field.raw, field.value, field.unit);
                    }
                }
                debug!(
                    "meter: consumed {} W, produced {} W",
                    fmt_power(reading.power_consumed),
                    fmt_power(reading.power_produced)
                );
                let _ = self.channels.from_meter.send(ChannelData::Reading(reading.clone()));
                Some(reading)
            }
            Err(e) => {
                warn!("meter: {}", e);
                None
            }
        }
    }
}

fn fmt_power(value: Option<f64>) -> String {
    value.map(|v| format!("{:.0}", v)).unwrap_or_else(|| "-".to_string())
}

/// Power delivered to the premises, if a telegram has been read.
pub async fn power_consumed(state: &SharedMeter) -> Option<f64> {
    state.read().await.power_consumed()
}

/// Power returned to the grid, if a telegram has been read.
pub async fn power_produced(state: &SharedMeter) -> Option<f64> {
    state.read().await.power_produced()
}
