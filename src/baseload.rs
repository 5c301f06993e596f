use crate::prelude::*;
use crate::state::SharedBaseload;

use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One row of the baseload table: the household load expected in an hour.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BaseloadEntry {
    pub hour: u8,
    pub enabled: bool,
    /// Applies only while PV production is zero.
    pub zero_pv: bool,
    pub nominal: bool,
    pub power: i32,
}

fn flag(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" => Ok(true),
        "0" | "false" | "no" | "n" | "" => Ok(false),
        other => bail!("invalid flag {:?}", other),
    }
}

/// Parses `;`-delimited baseload rows after a header line.
pub fn parse<R: std::io::Read>(input: R) -> Result<Vec<BaseloadEntry>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let mut entries = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        if record.len() < 5 {
            bail!("row {}: expected 5 columns, got {}", line + 1, record.len());
        }

        let hour: u8 = record[0].parse().map_err(|_| anyhow!("row {}: invalid hour {:?}", line + 1, &record[0]))?;
        if hour > 23 {
            bail!("row {}: hour {} out of range", line + 1, hour);
        }

        entries.push(BaseloadEntry {
            hour,
            enabled: flag(&record[1])?,
            zero_pv: flag(&record[2])?,
            nominal: flag(&record[3])?,
            power: record[4]
                .parse()
                .map_err(|_| anyhow!("row {}: invalid power {:?}", line + 1, &record[4]))?,
        });
    }

    Ok(entries)
}

pub fn load(path: &Path) -> Result<Vec<BaseloadEntry>> {
    let file = std::fs::File::open(path).map_err(|e| anyhow!("{}: {}", path.display(), e))?;
    parse(file)
}

/// Re-reads the baseload file on an interval and publishes changes.
#[derive(Clone)]
pub struct BaseloadWatcher {
    path: PathBuf,
    interval: Duration,
    channels: Channels,
    state: SharedBaseload,
}

impl BaseloadWatcher {
    pub fn new(config: &config::Baseload, channels: Channels, state: SharedBaseload) -> Self {
        Self {
            path: PathBuf::from(config.file()),
            interval: Duration::from_secs(config.interval_secs()),
            channels,
            state,
        }
    }

    pub fn state(&self) -> SharedBaseload {
        self.state.clone()
    }

    /// Reads the file once. Returns true when the table changed.
    pub async fn refresh(&self) -> bool {
        match load(&self.path) {
            Ok(entries) => {
                let mut state = self.state.write().await;
                state.freshness.record(0, Utc::now());
                if state.entries == entries {
                    return false;
                }
                info!("baseload: {} loaded, {} hours", self.path.display(), entries.len());
                for entry in &entries {
                    debug!(
                        "baseload: hour {:>2} enabled {} zero_pv {} nominal {} power {}",
                        entry.hour, entry.enabled, entry.zero_pv, entry.nominal, entry.power
                    );
                }
                state.entries = entries;
                true
            }
            Err(e) => {
                warn!("baseload: could not be read or is corrupt: {}", e);
                self.state.write().await.freshness.record(1, Utc::now());
                false
            }
        }
    }

    pub async fn start(&self) -> Result<()> {
        let mut shutdown = self.channels.shutdown.subscribe();
        let mut ticker = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                _ = ticker.tick() => {}
            }
            self.refresh().await;
        }

        info!("baseload: watcher exiting");
        Ok(())
    }
}
