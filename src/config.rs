use crate::prelude::*;

use serde::Deserialize;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// A missing section leaves the battery disabled.
    #[serde(default)]
    pub battery: Battery,

    /// A missing section leaves the meter disabled.
    #[serde(default)]
    pub meter: Meter,

    pub datalog: Option<Datalog>,

    pub baseload: Option<Baseload>,

    #[serde(default = "Config::default_loglevel")]
    pub loglevel: String,
}

// Battery {{{
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Battery {
    #[serde(default = "Config::default_enabled")]
    pub enabled: bool,

    pub device: Option<String>,
    pub baud_rate: Option<u32>,
    pub unit_id: Option<u8>,
    pub poll_interval_ms: Option<u64>,
    pub read_timeout_ms: Option<u64>,
    pub reconnect_delay_secs: Option<u64>,
}
impl Battery {
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn device(&self) -> &str {
        self.device.as_deref().unwrap_or("/dev/ttyUSB0")
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate.unwrap_or(115200)
    }

    pub fn unit_id(&self) -> u8 {
        self.unit_id.unwrap_or(1)
    }

    pub fn poll_interval_ms(&self) -> u64 {
        self.poll_interval_ms.unwrap_or(2000)
    }

    pub fn read_timeout_ms(&self) -> u64 {
        self.read_timeout_ms.unwrap_or(1000)
    }

    pub fn reconnect_delay_secs(&self) -> u64 {
        self.reconnect_delay_secs.unwrap_or(10)
    }
} // }}}

// Meter {{{
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Meter {
    #[serde(default = "Config::default_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub host: String,
    pub port: Option<u16>,
    pub read_timeout_secs: Option<u64>,
    pub reconnect_delay_secs: Option<u64>,
    pub min_telegram_len: Option<usize>,
    pub verify_crc: Option<bool>,
}
impl Meter {
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(23)
    }

    pub fn read_timeout_secs(&self) -> u64 {
        self.read_timeout_secs.unwrap_or(10)
    }

    pub fn reconnect_delay_secs(&self) -> u64 {
        self.reconnect_delay_secs.unwrap_or(5)
    }

    /// Shorter telegrams are partial reads and are never scanned.
    pub fn min_telegram_len(&self) -> usize {
        self.min_telegram_len.unwrap_or(800)
    }

    pub fn verify_crc(&self) -> bool {
        self.verify_crc != Some(false)
    }
} // }}}

// Datalog {{{
#[derive(Clone, Debug, Deserialize)]
pub struct Datalog {
    pub file: String,
    pub interval_secs: Option<u64>,
}
impl Datalog {
    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn interval_secs(&self) -> u64 {
        self.interval_secs.unwrap_or(4)
    }
} // }}}

// Baseload {{{
#[derive(Clone, Debug, Deserialize)]
pub struct Baseload {
    pub file: Option<String>,
    pub interval_secs: Option<u64>,
}
impl Baseload {
    pub fn file(&self) -> &str {
        self.file.as_deref().unwrap_or("baseload.csv")
    }

    pub fn interval_secs(&self) -> u64 {
        self.interval_secs.unwrap_or(10)
    }
} // }}}

pub struct ConfigWrapper {
    config: Arc<Mutex<Config>>,
}

impl Clone for ConfigWrapper {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
        }
    }
}

impl ConfigWrapper {
    pub fn new(file: String) -> Result<Self> {
        let config = Config::new(file)?;
        Ok(Self::from_config(config))
    }

    pub fn from_config(config: Config) -> Self {
        Self {
            config: Arc::new(Mutex::new(config)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Config> {
        self.config.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn battery(&self) -> Battery {
        self.lock().battery.clone()
    }

    pub fn meter(&self) -> Meter {
        self.lock().meter.clone()
    }

    pub fn datalog(&self) -> Option<Datalog> {
        self.lock().datalog.clone()
    }

    pub fn baseload(&self) -> Option<Baseload> {
        self.lock().baseload.clone()
    }

    pub fn loglevel(&self) -> String {
        self.lock().loglevel.clone()
    }

    pub fn log_summary(&self) {
        self.lock().log_summary()
    }
}

impl Config {
    pub fn new(file: String) -> Result<Self> {
        let content = std::fs::read_to_string(&file).map_err(|err| file_error!("error reading {}: {}", file, err))?;

        Self::from_yaml(&content)
    }

    pub fn log_summary(&self) {
        info!("Configuration loaded successfully:");
        info!("  Battery: {}", if self.battery.enabled { "enabled" } else { "disabled" });
        if self.battery.enabled {
            info!("    Device: {}", self.battery.device());
            info!("    Baud Rate: {}", self.battery.baud_rate());
            info!("    Unit Id: {}", self.battery.unit_id());
            info!("    Poll Interval: {}ms", self.battery.poll_interval_ms());
            info!("    Read Timeout: {}ms", self.battery.read_timeout_ms());
        }

        info!("  Meter: {}", if self.meter.enabled { "enabled" } else { "disabled" });
        if self.meter.enabled {
            info!("    Host: {}", self.meter.host());
            info!("    Port: {}", self.meter.port());
            info!("    Min Telegram Length: {}", self.meter.min_telegram_len());
            info!("    Verify CRC: {}", self.meter.verify_crc());
        }

        info!("  Datalog: {}", self.datalog.as_ref().map(|d| d.file()).unwrap_or("disabled"));
        info!("  Baseload: {}", self.baseload.as_ref().map(|b| b.file()).unwrap_or("disabled"));
        info!("  Log Level: {}", self.loglevel);
    }

    /// Parses and validates a YAML document.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.battery.enabled {
            if self.battery.device().is_empty() {
                bail!("battery.device cannot be empty");
            }
            if !(1..=247).contains(&self.battery.unit_id()) {
                bail!("battery.unit_id must be between 1 and 247");
            }
            if self.battery.baud_rate() == 0 {
                bail!("battery.baud_rate cannot be 0");
            }
            if self.battery.poll_interval_ms() == 0 {
                bail!("battery.poll_interval_ms cannot be 0");
            }
            if self.battery.read_timeout_ms() == 0 {
                bail!("battery.read_timeout_ms cannot be 0");
            }
        }

        if self.meter.enabled {
            if self.meter.host().is_empty() {
                bail!("meter.host cannot be empty");
            }
            if self.meter.port() == 0 {
                bail!("meter.port must be between 1 and 65535");
            }
            if self.meter.read_timeout_secs() == 0 {
                bail!("meter.read_timeout_secs cannot be 0");
            }
        }

        if let Some(datalog) = &self.datalog {
            if datalog.file().is_empty() {
                bail!("datalog.file cannot be empty");
            }
            if datalog.interval_secs() == 0 {
                bail!("datalog.interval_secs cannot be 0");
            }
        }

        if let Some(baseload) = &self.baseload {
            if baseload.file().is_empty() {
                bail!("baseload.file cannot be empty");
            }
            if baseload.interval_secs() == 0 {
                bail!("baseload.interval_secs cannot be 0");
            }
        }

        Ok(())
    }

    fn default_enabled() -> bool {
        true
    }

    fn default_loglevel() -> String {
        "info".to_string()
    }
}
