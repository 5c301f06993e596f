use crate::prelude::*;
use crate::state::SharedBaseload;

use chrono::{DateTime, Timelike, Utc};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Appends one JSON line per interval with the decoded battery and meter state.
#[derive(Debug, Clone)]
pub struct DatalogWriter {
    file: Arc<Mutex<std::fs::File>>,
    path: String,
    lines_written: Arc<Mutex<u64>>,
}

impl DatalogWriter {
    pub fn new(path: &str) -> Result<Self> {
        info!("Opening datalog file at {}", path);

        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = match OpenOptions::new().create(true).append(true).open(path) {
            Ok(f) => f,
            Err(e) => {
                error!("Failed to open datalog file {}: {}", path, e);
                return Err(e.into());
            }
        };

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Err(e) = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o644)) {
                error!("Failed to set permissions on datalog file {}: {}", path, e);
                return Err(e.into());
            }
        }

        Ok(Self {
            file: Arc::new(Mutex::new(file)),
            path: path.to_string(),
            lines_written: Arc::new(Mutex::new(0)),
        })
    }

    pub fn snapshot(
        battery: Option<&BatteryState>,
        meter: Option<&MeterState>,
        now: DateTime<Utc>,
    ) -> Result<serde_json::Value> {
        let mut json_data = serde_json::Map::new();
        json_data.insert("utc_timestamp".to_string(), serde_json::Value::Number(now.timestamp().into()));

        if let Some(battery) = battery {
            let mut values = serde_json::Map::new();
            for row in battery.canonical.rows() {
                values.insert(row.name.key(), serde_json::to_value(&row.converted)?);
            }
            json_data.insert("battery".to_string(), serde_json::Value::Object(values));
            json_data.insert("battery_freshness".to_string(), serde_json::to_value(&battery.freshness)?);
        }

        if let Some(meter) = meter {
            json_data.insert("meter".to_string(), serde_json::to_value(meter.reading(now))?);
            json_data.insert("meter_freshness".to_string(), serde_json::to_value(&meter.freshness)?);
        }

        Ok(serde_json::Value::Object(json_data))
    }

    pub fn write_line(&self, json_value: &serde_json::Value) -> Result<()> {
        let json_string = serde_json::to_string(json_value)?;

        let mut file = self.file.lock().map_err(|_| anyhow!("Failed to lock datalog file"))?;
        match writeln!(file, "{}", json_string) {
            Ok(_) => {
                if let Err(e) = file.flush() {
                    error!("Failed to flush datalog file {}: {}", self.path, e);
                    return Err(e.into());
                }

                let mut lines_written = self
                    .lines_written
                    .lock()
                    .map_err(|_| anyhow!("Failed to lock line counter"))?;
                *lines_written += 1;
                debug!("Total lines stored in datalog file: {}", *lines_written);

                Ok(())
            }
            Err(e) => {
                error!("Failed to write to datalog file {}: {}", self.path, e);
                Err(e.into())
            }
        }
    }

    /// Writes a snapshot every `interval` until shutdown.
    pub async fn start(
        &self,
        interval: Duration,
        channels: Channels,
        battery: Option<SharedBattery>,
        meter: Option<SharedMeter>,
        baseload: Option<SharedBaseload>,
    ) -> Result<()> {
        let mut shutdown = channels.shutdown.subscribe();
        let mut ticker = tokio::time::interval(interval);

        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                _ = ticker.tick() => {}
            }

            let now = Utc::now();
            let mut line = {
                let battery = match &battery {
                    Some(b) => Some(b.read().await),
                    None => None,
                };
                let meter = match &meter {
                    Some(m) => Some(m.read().await),
                    None => None,
                };
                Self::snapshot(battery.as_deref(), meter.as_deref(), now)?
            };

            if let Some(baseload) = &baseload {
                let hour = now.with_timezone(&chrono::Local).hour() as u8;
                let entry = baseload.read().await.for_hour(hour).cloned();
                if let serde_json::Value::Object(map) = &mut line {
                    map.insert("baseload".to_string(), serde_json::to_value(entry)?);
                }
            }

            if let Err(e) = self.write_line(&line) {
                warn!("datalog: {}", e);
            }
        }

        info!("datalog: writer exiting");
        Ok(())
    }

    pub fn lines_written(&self) -> u64 {
        self.lines_written.lock().map(|n| *n).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_write_snapshot() -> Result<()> {
        let temp_file = NamedTempFile::new()?;
        let writer = DatalogWriter::new(temp_file.path().to_str().unwrap())?;

        let battery = BatteryState::venus_e()?;
        let meter = MeterState::new();
        let now = Utc::now();

        let line = DatalogWriter::snapshot(Some(&battery), Some(&meter), now)?;
        writer.write_line(&line)?;

        let contents = std::fs::read_to_string(temp_file.path())?;
        let json: serde_json::Value = serde_json::from_str(&contents)?;

        assert_eq!(json["utc_timestamp"], now.timestamp());
        assert_eq!(json["battery"]["dc_voltage"], serde_json::Value::Null);
        assert_eq!(json["battery_freshness"]["cycles"], 0);
        assert_eq!(json["meter"]["power_consumed"], serde_json::Value::Null);
        assert_eq!(writer.lines_written(), 1);

        Ok(())
    }

    #[test]
    fn test_appends_lines() -> Result<()> {
        let temp_file = NamedTempFile::new()?;
        let writer = DatalogWriter::new(temp_file.path().to_str().unwrap())?;

        let line = DatalogWriter::snapshot(None, None, Utc::now())?;
        writer.write_line(&line)?;
        writer.write_line(&line)?;

        let contents = std::fs::read_to_string(temp_file.path())?;
        assert_eq!(contents.lines().count(), 2);
        assert!(serde_json::from_str::<serde_json::Value>(contents.lines().next().unwrap())?
            .get("battery")
            .is_none());

        Ok(())
    }
}
