use crate::error::DecodeError;
use crate::register::convert::Value;
use crate::register::schema::{RegisterId, RegisterSchema};

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::Serialize;

/// Application facing battery fields, numbered independently of the device map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, IntoPrimitive, TryFromPrimitive)]
#[serde(rename_all = "snake_case")]
#[repr(u16)]
pub enum CanonicalId {
    DeviceName = 1,
    FirmwareVersion,
    SerialNumber,
    DcVoltage,
    DcCurrent,
    DcPowerDirection,
    DcPower,
    DcSoc,
    DcTotalEnergy,
    AcVoltage,
    AcCurrent,
    AcPowerDirection,
    AcPower,
    AcFrequency,
    BackupVoltage,
    BackupCurrent,
    BackupPowerDirection,
    BackupPower,
    TotalCharged,
    TotalDischarged,
    DayCharged,
    DayDischarged,
    MonthCharged,
    MonthDischarged,
    InternalTemp,
    Mos1Temp,
    Mos2Temp,
    MaxCellTemp,
    MinCellTemp,
    InverterState,
    LimitVoltage,
    LimitChargeCurrent,
    LimitDischargeCurrent,
    Alarm,
    FaultLow,
    FaultHigh,
    Restart,
    UnitId,
    Backup,
    RtuMode,
    SetInverterState,
    ChargeToSoc,
    ChargePower,
    DischargePower,
    UserMode,
    ChargeCutoff,
    DischargeCutoff,
    MaxChargePower,
    MaxDischargePower,
}

impl CanonicalId {
    pub fn index(self) -> usize {
        u16::from(self) as usize
    }

    /// snake_case name, used as the key in published snapshots.
    pub fn key(self) -> String {
        let name = format!("{:?}", self);
        let mut key = String::with_capacity(name.len() + 4);
        for (i, c) in name.chars().enumerate() {
            if c.is_ascii_uppercase() {
                if i > 0 {
                    key.push('_');
                }
                key.push(c.to_ascii_lowercase());
            } else {
                key.push(c);
            }
        }
        key
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CanonicalDescriptor {
    pub index: usize,
    pub name: CanonicalId,
    pub group: &'static str,
    pub converted: Value,
    pub unit: &'static str,
    pub description: &'static str,
}

#[rustfmt::skip]
const CANONICAL: &[(CanonicalId, &str, &str, &str)] = &[
    (CanonicalId::DeviceName, "DN", "", ""),
    (CanonicalId::FirmwareVersion, "FW", "", ""),
    (CanonicalId::SerialNumber, "SN", "", ""),
    (CanonicalId::DcVoltage, "DC", "V", ""),
    (CanonicalId::DcCurrent, "DC", "A", ""),
    (CanonicalId::DcPowerDirection, "DC", "W", "pos is charge"),
    (CanonicalId::DcPower, "DC", "W", "pos is charge"),
    (CanonicalId::DcSoc, "DC", "%", ""),
    (CanonicalId::DcTotalEnergy, "DC", "kWh", ""),
    (CanonicalId::AcVoltage, "AC", "V", ""),
    (CanonicalId::AcCurrent, "AC", "A", ""),
    (CanonicalId::AcPowerDirection, "AC", "W", "pos is discharge"),
    (CanonicalId::AcPower, "AC", "W", "pos is discharge"),
    (CanonicalId::AcFrequency, "AC", "Hz", ""),
    (CanonicalId::BackupVoltage, "BU", "V", ""),
    (CanonicalId::BackupCurrent, "BU", "A", ""),
    (CanonicalId::BackupPowerDirection, "BU", "W", "pos is discharge"),
    (CanonicalId::BackupPower, "BU", "W", "pos is discharge"),
    (CanonicalId::TotalCharged, "ST", "kWh", ""),
    (CanonicalId::TotalDischarged, "ST", "kWh", ""),
    (CanonicalId::DayCharged, "ST", "kWh", ""),
    (CanonicalId::DayDischarged, "ST", "kWh", ""),
    (CanonicalId::MonthCharged, "ST", "kWh", ""),
    (CanonicalId::MonthDischarged, "ST", "kWh", ""),
    (CanonicalId::InternalTemp, "TP", "°C", ""),
    (CanonicalId::Mos1Temp, "TP", "°C", ""),
    (CanonicalId::Mos2Temp, "TP", "°C", ""),
    (CanonicalId::MaxCellTemp, "CT", "°C", ""),
    (CanonicalId::MinCellTemp, "CT", "°C", ""),
    (CanonicalId::InverterState, "GI", "", "0:sleep,1:stdby,2:chrg,3:disch,4:backup,5:update"),
    (CanonicalId::LimitVoltage, "LT", "mV", ""),
    (CanonicalId::LimitChargeCurrent, "LT", "mA", ""),
    (CanonicalId::LimitDischargeCurrent, "LT", "mA", ""),
    (CanonicalId::Alarm, "AL", "", "Alarm register"),
    (CanonicalId::FaultLow, "FT", "", "Fault double register"),
    (CanonicalId::FaultHigh, "FT", "", "Fault double register"),
    (CanonicalId::Restart, "RS", "", "0x55AA-->restart"),
    (CanonicalId::UnitId, "UI", "", "unit id [1..255]"),
    (CanonicalId::Backup, "BK", "", "0:enable,1:disable"),
    (CanonicalId::RtuMode, "RM", "", "ON:0x55AA,OFF:0x55BB"),
    (CanonicalId::SetInverterState, "SI", "", "0:stop,1:charge,2:discharge"),
    (CanonicalId::ChargeToSoc, "SI", "%", "charge to target SOC"),
    (CanonicalId::ChargePower, "PW", "W", "range:[0..2500W]"),
    (CanonicalId::DischargePower, "PW", "W", "range:[0..2500W]"),
    (CanonicalId::UserMode, "UM", "", "0:manual,1:anti-feed,2:trade-mode"),
    (CanonicalId::ChargeCutoff, "CO", "%", "range:[80%..100%]"),
    (CanonicalId::DischargeCutoff, "CO", "%", "range:[12%..30%]"),
    (CanonicalId::MaxChargePower, "CO", "W", "range:[0..2500W]"),
    (CanonicalId::MaxDischargePower, "CO", "W", "range:[0..2500W]"),
];

/// The canonical battery table published to consumers.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CanonicalTable {
    rows: Vec<CanonicalDescriptor>,
}

impl Default for CanonicalTable {
    fn default() -> Self {
        Self::new()
    }
}

impl CanonicalTable {
    pub fn new() -> Self {
        let rows = CANONICAL
            .iter()
            .map(|&(name, group, unit, description)| CanonicalDescriptor {
                index: name.index(),
                name,
                group,
                converted: Value::Unavailable,
                unit,
                description,
            })
            .collect();

        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[CanonicalDescriptor] {
        &self.rows
    }

    pub fn get(&self, index: usize) -> Result<&CanonicalDescriptor, DecodeError> {
        self.check(index)?;
        Ok(&self.rows[index - 1])
    }

    pub fn value(&self, id: CanonicalId) -> Option<&Value> {
        self.get(id.index()).ok().map(|row| &row.converted)
    }

    fn set(&mut self, index: usize, value: Value) -> Result<(), DecodeError> {
        self.check(index)?;
        self.rows[index - 1].converted = value;
        Ok(())
    }

    fn check(&self, index: usize) -> Result<(), DecodeError> {
        if index == 0 || index > self.rows.len() {
            return Err(DecodeError::IndexOutOfRange {
                table: "canonical table",
                index,
                len: self.rows.len(),
            });
        }
        Ok(())
    }
}

/// How a canonical slot is filled from the device schema.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MappingRule {
    /// Joins the char-pair fragments of a whole block into one string.
    /// Unavailable until the block has been read.
    Concat {
        source: RegisterId,
        target: CanonicalId,
    },
    Direct {
        source: RegisterId,
        target: CanonicalId,
    },
    /// 1:1 copy of `first..=last` shifted by a fixed index offset.
    Range {
        first: RegisterId,
        last: RegisterId,
        target: CanonicalId,
    },
    /// A high/low word pair published as unavailable.
    ///
    /// The device documents these as u32 but the word order has not been
    /// validated against hardware, so no combined value is produced.
    WordPair {
        high: RegisterId,
        low: RegisterId,
        target: CanonicalId,
    },
}

impl MappingRule {
    fn sources(&self, schema: &RegisterSchema) -> Result<Vec<usize>, DecodeError> {
        Ok(match *self {
            MappingRule::Concat { source, .. } => {
                schema.block_rows(source.index())?.iter().map(|row| row.index).collect()
            }
            MappingRule::Direct { source, .. } => vec![source.index()],
            MappingRule::Range { first, last, .. } => (first.index()..=last.index()).collect(),
            MappingRule::WordPair { high, low, .. } => vec![high.index(), low.index()],
        })
    }

    fn targets(&self) -> Vec<usize> {
        match *self {
            MappingRule::Range {
                first,
                last,
                target,
            } => {
                let count = last.index().saturating_sub(first.index()) + 1;
                (target.index()..target.index() + count).collect()
            }
            MappingRule::Concat { target, .. }
            | MappingRule::Direct { target, .. }
            | MappingRule::WordPair { target, .. } => vec![target.index()],
        }
    }
}

/// Copies decoded device values into the canonical table.
#[derive(Clone, Debug, PartialEq)]
pub struct CanonicalMapper {
    rules: Vec<MappingRule>,
}

impl CanonicalMapper {
    pub fn new(rules: Vec<MappingRule>) -> Self {
        Self { rules }
    }

    /// Rules for the Venus E register map.
    pub fn venus_e() -> Self {
        use MappingRule::*;

        Self::new(vec![
            Concat {
                source: RegisterId::DeviceName,
                target: CanonicalId::DeviceName,
            },
            Direct {
                source: RegisterId::FirmwareVersion,
                target: CanonicalId::FirmwareVersion,
            },
            Concat {
                source: RegisterId::SerialNumber,
                target: CanonicalId::SerialNumber,
            },
            Range {
                first: RegisterId::DcVoltage,
                last: RegisterId::BackupPower,
                target: CanonicalId::DcVoltage,
            },
            WordPair {
                high: RegisterId::TotalChargedHigh,
                low: RegisterId::TotalChargedLow,
                target: CanonicalId::TotalCharged,
            },
            WordPair {
                high: RegisterId::TotalDischargedHigh,
                low: RegisterId::TotalDischargedLow,
                target: CanonicalId::TotalDischarged,
            },
            WordPair {
                high: RegisterId::DayChargedHigh,
                low: RegisterId::DayChargedLow,
                target: CanonicalId::DayCharged,
            },
            WordPair {
                high: RegisterId::DayDischargedHigh,
                low: RegisterId::DayDischargedLow,
                target: CanonicalId::DayDischarged,
            },
            WordPair {
                high: RegisterId::MonthChargedHigh,
                low: RegisterId::MonthChargedLow,
                target: CanonicalId::MonthCharged,
            },
            WordPair {
                high: RegisterId::MonthDischargedHigh,
                low: RegisterId::MonthDischargedLow,
                target: CanonicalId::MonthDischarged,
            },
            Range {
                first: RegisterId::InternalTemp,
                last: RegisterId::MaxDischargePower,
                target: CanonicalId::InternalTemp,
            },
        ])
    }

    pub fn rules(&self) -> &[MappingRule] {
        &self.rules
    }

    /// Checks every index the rules touch against both tables.
    pub fn validate(&self, schema: &RegisterSchema, canonical: &CanonicalTable) -> Result<(), DecodeError> {
        for rule in &self.rules {
            for index in rule.sources(schema)? {
                schema.get(index)?;
            }
            for index in rule.targets() {
                canonical.get(index)?;
            }
        }
        Ok(())
    }

    /// Applies every rule in order.
    pub fn remap(&self, schema: &RegisterSchema, canonical: &mut CanonicalTable) -> Result<(), DecodeError> {
        self.validate(schema, canonical)?;

        for rule in &self.rules {
            match *rule {
                MappingRule::Concat { source, target } => {
                    let fragments: Option<Vec<&str>> = schema
                        .block_rows(source.index())?
                        .iter()
                        .map(|row| row.converted.as_text())
                        .collect();
                    let value = match fragments {
                        Some(fragments) => Value::Text(fragments.concat()),
                        None => Value::Unavailable,
                    };
                    canonical.set(target.index(), value)?;
                }
                MappingRule::Direct { source, target } => {
                    let value = schema.field(source)?.converted.clone();
                    canonical.set(target.index(), value)?;
                }
                MappingRule::Range {
                    first,
                    last,
                    target,
                } => {
                    for index in first.index()..=last.index() {
                        let value = schema.get(index)?.converted.clone();
                        canonical.set(target.index() + (index - first.index()), value)?;
                    }
                }
                MappingRule::WordPair { target, .. } => {
                    canonical.set(target.index(), Value::Unavailable)?;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_indices_are_dense() {
        let table = CanonicalTable::new();
        assert_eq!(table.len(), 49);
        for (i, row) in table.rows().iter().enumerate() {
            assert_eq!(row.index, i + 1);
        }
    }

    #[test]
    fn keys_are_snake_case() {
        assert_eq!(CanonicalId::DcVoltage.key(), "dc_voltage");
        assert_eq!(CanonicalId::Mos1Temp.key(), "mos1_temp");
        assert_eq!(CanonicalId::MaxDischargePower.key(), "max_discharge_power");
    }

    #[test]
    fn range_offsets_match_layout() {
        assert_eq!(
            RegisterId::DcVoltage.index() - CanonicalId::DcVoltage.index(),
            RegisterId::BackupPower.index() - CanonicalId::BackupPower.index()
        );
        assert_eq!(
            RegisterId::InternalTemp.index() - CanonicalId::InternalTemp.index(),
            RegisterId::MaxDischargePower.index() - CanonicalId::MaxDischargePower.index()
        );
    }
}
