use crate::register::canonical::{CanonicalId, CanonicalTable};

use num_enum::TryFromPrimitive;
use serde::Serialize;

/// Operating state reported in register 35100.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, TryFromPrimitive)]
#[serde(rename_all = "snake_case")]
#[repr(u16)]
pub enum InverterState {
    Sleep = 0,
    Standby = 1,
    Charging = 2,
    Discharging = 3,
    Backup = 4,
    Upgrading = 5,
}

/// Requested state written to register 42010.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, TryFromPrimitive)]
#[serde(rename_all = "snake_case")]
#[repr(u16)]
pub enum InverterCommand {
    Stop = 0,
    Charge = 1,
    Discharge = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, TryFromPrimitive)]
#[serde(rename_all = "snake_case")]
#[repr(u16)]
pub enum UserMode {
    Manual = 0,
    AntiFeed = 1,
    Trade = 2,
}

fn code(table: &CanonicalTable, id: CanonicalId) -> Option<u16> {
    let value = table.value(id)?.as_f64()?;
    if value < 0.0 || value > u16::MAX as f64 || value.fract() != 0.0 {
        return None;
    }
    Some(value as u16)
}

impl InverterState {
    pub fn from_table(table: &CanonicalTable) -> Option<Self> {
        Self::try_from(code(table, CanonicalId::InverterState)?).ok()
    }
}

impl InverterCommand {
    pub fn from_table(table: &CanonicalTable) -> Option<Self> {
        Self::try_from(code(table, CanonicalId::SetInverterState)?).ok()
    }
}

impl UserMode {
    pub fn from_table(table: &CanonicalTable) -> Option<Self> {
        Self::try_from(code(table, CanonicalId::UserMode)?).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_codes_decode_to_none() {
        assert_eq!(InverterState::try_from(3).ok(), Some(InverterState::Discharging));
        assert!(InverterState::try_from(9).is_err());
        assert!(UserMode::try_from(3).is_err());
    }

    #[test]
    fn unpopulated_table_has_no_state() {
        let table = CanonicalTable::new();
        assert_eq!(InverterState::from_table(&table), None);
        assert_eq!(UserMode::from_table(&table), None);
    }
}
