//! Tables shared between the producing actors and their readers.
//!
//! Each table has exactly one writer. Writers take the lock once per cycle, so
//! a reader always sees either the previous or the next complete cycle.

use crate::baseload::BaseloadEntry;
use crate::dsmr::{self, ObisFieldId, ObisTable};
use crate::prelude::*;
use crate::register::{BlockRequest, CanonicalMapper};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;

pub type SharedBattery = Arc<RwLock<BatteryState>>;
pub type SharedMeter = Arc<RwLock<MeterState>>;
pub type SharedBaseload = Arc<RwLock<BaseloadState>>;

/// When a table last completed a clean update.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Freshness {
    pub last_updated: Option<DateTime<Utc>>,
    pub last_attempt: Option<DateTime<Utc>>,
    pub cycles: u64,
    /// Failures in the most recent cycle.
    pub failed_reads: usize,
}

impl Freshness {
    pub fn record(&mut self, failed: usize, now: DateTime<Utc>) {
        self.cycles += 1;
        self.failed_reads = failed;
        self.last_attempt = Some(now);
        if failed == 0 {
            self.last_updated = Some(now);
        }
    }

    pub fn is_stale_at(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        match self.last_updated {
            Some(at) => now - at > max_age,
            None => true,
        }
    }

    pub fn is_stale(&self, max_age: Duration) -> bool {
        self.is_stale_at(max_age, Utc::now())
    }
}

/// Outcome of one battery poll cycle.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CycleReport {
    pub blocks: usize,
    pub failed: usize,
    pub at: DateTime<Utc>,
}

impl CycleReport {
    pub fn all_failed(&self) -> bool {
        self.blocks > 0 && self.failed == self.blocks
    }
}

pub struct BatteryState {
    pub schema: RegisterSchema,
    pub canonical: CanonicalTable,
    mapper: CanonicalMapper,
    pub freshness: Freshness,
}

impl BatteryState {
    /// Fails when a mapping rule points outside either table.
    pub fn new(schema: RegisterSchema, mapper: CanonicalMapper) -> Result<Self, DecodeError> {
        let canonical = CanonicalTable::new();
        mapper.validate(&schema, &canonical)?;

        Ok(Self {
            schema,
            canonical,
            mapper,
            freshness: Freshness::default(),
        })
    }

    pub fn venus_e() -> Result<Self, DecodeError> {
        Self::new(crate::register::marstek::schema()?, CanonicalMapper::venus_e())
    }

    pub fn shared(self) -> SharedBattery {
        Arc::new(RwLock::new(self))
    }

    /// Stores the block reads of one cycle, then converts and remaps.
    ///
    /// Failed or short blocks keep their previous raw words. Only a mapping
    /// error is returned; transport failures are counted in the report.
    pub fn apply_cycle(
        &mut self,
        reads: Vec<(BlockRequest, Result<Vec<u16>, DecodeError>)>,
        now: DateTime<Utc>,
    ) -> Result<CycleReport, DecodeError> {
        let blocks = reads.len();
        let mut failed = 0;

        for (block, read) in reads {
            let stored = read.and_then(|words| self.schema.store_block(block.index, &words));
            if let Err(e) = stored {
                warn!("{:?} block skipped: {}", block.name, e);
                failed += 1;
            }
        }

        self.schema.convert_all();
        self.mapper.remap(&self.schema, &mut self.canonical)?;
        self.freshness.record(failed, now);

        Ok(CycleReport { blocks, failed, at: now })
    }
}

/// Latest meter readings derived from the telegram table.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MeterReading {
    pub power_consumed: Option<f64>,
    pub power_produced: Option<f64>,
    pub at: DateTime<Utc>,
}

#[derive(Default)]
pub struct MeterState {
    pub table: ObisTable,
    pub freshness: Freshness,
    pub rejected: u64,
}

impl MeterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(self) -> SharedMeter {
        Arc::new(RwLock::new(self))
    }

    pub fn power_consumed(&self) -> Option<f64> {
        self.table.value(ObisFieldId::PowerConsumed)
    }

    pub fn power_produced(&self) -> Option<f64> {
        self.table.value(ObisFieldId::PowerProduced)
    }

    /// Scans one telegram. A malformed telegram leaves the table untouched.
    pub fn apply(&mut self, telegram: &str, now: DateTime<Utc>) -> Result<MeterReading, DecodeError> {
        match dsmr::scan(telegram, &mut self.table) {
            Ok(()) => {
                self.freshness.record(0, now);
                Ok(self.reading(now))
            }
            Err(e) => {
                self.reject(now);
                Err(e)
            }
        }
    }

    /// Counts a telegram that failed validation or scanning.
    pub fn reject(&mut self, now: DateTime<Utc>) {
        self.rejected += 1;
        self.freshness.record(1, now);
    }

    pub fn reading(&self, at: DateTime<Utc>) -> MeterReading {
        MeterReading {
            power_consumed: self.power_consumed(),
            power_produced: self.power_produced(),
            at,
        }
    }
}

#[derive(Default)]
pub struct BaseloadState {
    pub entries: Vec<BaseloadEntry>,
    pub freshness: Freshness,
}

impl BaseloadState {
    pub fn shared(self) -> SharedBaseload {
        Arc::new(RwLock::new(self))
    }

    pub fn for_hour(&self, hour: u8) -> Option<&BaseloadEntry> {
        self.entries.iter().find(|e| e.hour == hour)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn freshness_only_advances_on_clean_cycles() {
        let t0 = Utc::now();
        let mut freshness = Freshness::default();
        assert!(freshness.is_stale_at(Duration::seconds(10), t0));

        freshness.record(0, t0);
        assert!(!freshness.is_stale_at(Duration::seconds(10), t0 + Duration::seconds(5)));

        freshness.record(2, t0 + Duration::seconds(20));
        assert_eq!(freshness.last_updated, Some(t0));
        assert_eq!(freshness.failed_reads, 2);
        assert_eq!(freshness.cycles, 2);
        assert!(freshness.is_stale_at(Duration::seconds(10), t0 + Duration::seconds(20)));
    }

    #[test]
    fn stale_against_wall_clock() {
        let mut freshness = Freshness::default();
        assert!(freshness.is_stale(Duration::minutes(1)));

        freshness.record(0, Utc::now());
        assert!(!freshness.is_stale(Duration::minutes(1)));

        freshness.record(0, Utc::now() - Duration::minutes(5));
        assert!(freshness.is_stale(Duration::minutes(1)));
    }

    #[test]
    fn empty_meter_has_no_power() {
        let meter = MeterState::new();
        assert_eq!(meter.power_consumed(), None);
        assert_eq!(meter.power_produced(), None);
    }
}
