//! Holding register map of the Marstek Venus E (v2.0 firmware).

use crate::error::DecodeError;
use crate::register::convert::{Value, WireType};
use crate::register::schema::{Access, RegisterDescriptor, RegisterId, RegisterSchema};

use Access::{ReadOnly as R, ReadWrite as RW};
use RegisterId::*;

// name, address, group, block size, offset, access, type, gain, unit, description
type Row = (
    RegisterId,
    u16,
    &'static str,
    u16,
    u16,
    Access,
    char,
    f64,
    &'static str,
    &'static str,
);

#[rustfmt::skip]
const VENUS_E: &[Row] = &[
    (DeviceName, 31000, "DN", 10, 0, R, 'c', 1.0, "", ""),
    (DeviceName, 31001, "DN", 0, 1, R, 'c', 1.0, "", ""),
    (DeviceName, 31002, "DN", 0, 2, R, 'c', 1.0, "", ""),
    (DeviceName, 31003, "DN", 0, 3, R, 'c', 1.0, "", ""),
    (DeviceName, 31004, "DN", 0, 4, R, 'c', 1.0, "", ""),
    (DeviceName, 31005, "DN", 0, 5, R, 'c', 1.0, "", ""),
    (DeviceName, 31006, "DN", 0, 6, R, 'c', 1.0, "", ""),
    (DeviceName, 31007, "DN", 0, 7, R, 'c', 1.0, "", ""),
    (DeviceName, 31008, "DN", 0, 8, R, 'c', 1.0, "", ""),
    (DeviceName, 31009, "DN", 0, 9, R, 'c', 1.0, "", ""),
    (FirmwareVersion, 31100, "FW", 1, 0, R, 'u', 0.01, "", ""),
    (SerialNumber, 31200, "SN", 10, 0, R, 'c', 1.0, "", ""),
    (SerialNumber, 31201, "SN", 0, 1, R, 'c', 1.0, "", ""),
    (SerialNumber, 31202, "SN", 0, 2, R, 'c', 1.0, "", ""),
    (SerialNumber, 31203, "SN", 0, 3, R, 'c', 1.0, "", ""),
    (SerialNumber, 31204, "SN", 0, 4, R, 'c', 1.0, "", ""),
    (SerialNumber, 31205, "SN", 0, 5, R, 'c', 1.0, "", ""),
    (SerialNumber, 31206, "SN", 0, 6, R, 'c', 1.0, "", ""),
    (SerialNumber, 31207, "SN", 0, 7, R, 'c', 1.0, "", ""),
    (SerialNumber, 31208, "SN", 0, 8, R, 'c', 1.0, "", ""),
    (SerialNumber, 31209, "SN", 0, 9, R, 'c', 1.0, "", ""),
    (DcVoltage, 32100, "DC", 6, 0, R, 'u', 0.01, "V", ""),
    (DcCurrent, 32101, "DC", 0, 1, R, 's', 0.01, "A", ""),
    (DcPowerDirection, 32102, "DC", 0, 2, R, 's', 1.0, "-->", "pos is charge"),
    (DcPower, 32103, "DC", 0, 3, R, 's', 1.0, "W", "pos is charge"),
    (DcSoc, 32104, "DC", 0, 4, R, 'u', 1.0, "%", ""),
    (DcTotalEnergy, 32105, "DC", 0, 5, R, 'u', 0.01, "kWh", ""),
    (AcVoltage, 32200, "AC", 5, 0, R, 'u', 0.1, "V", ""),
    (AcCurrent, 32201, "AC", 0, 1, R, 'u', 0.01, "A", ""),
    (AcPowerDirection, 32202, "AC", 0, 2, R, 's', 1.0, "-->", "pos is discharge"),
    (AcPower, 32203, "AC", 0, 3, R, 's', 1.0, "W", "pos is discharge"),
    (AcFrequency, 32204, "AC", 0, 4, R, 'u', 0.01, "Hz", ""),
    (BackupVoltage, 32300, "BU", 4, 0, R, 'u', 0.1, "V", ""),
    (BackupCurrent, 32301, "BU", 0, 1, R, 'u', 0.01, "A", ""),
    (BackupPowerDirection, 32302, "BU", 0, 2, R, 's', 1.0, "W", "pos is discharge"),
    (BackupPower, 32303, "BU", 0, 3, R, 's', 1.0, "W", "pos is discharge"),
    (TotalChargedHigh, 33000, "ST", 12, 0, R, 'u', 0.01, "kWh", ""),
    (TotalChargedLow, 33001, "ST", 0, 1, R, 'u', 0.01, "kWh", ""),
    (TotalDischargedHigh, 33002, "ST", 0, 2, R, 'u', 0.01, "kWh", ""),
    (TotalDischargedLow, 33003, "ST", 0, 3, R, 'u', 0.01, "kWh", ""),
    (DayChargedHigh, 33004, "ST", 0, 4, R, 'u', 0.01, "kWh", ""),
    (DayChargedLow, 33005, "ST", 0, 5, R, 'u', 0.01, "kWh", ""),
    (DayDischargedHigh, 33006, "ST", 0, 6, R, 'u', 0.01, "kWh", ""),
    (DayDischargedLow, 33007, "ST", 0, 7, R, 'u', 0.01, "kWh", ""),
    (MonthChargedHigh, 33008, "ST", 0, 8, R, 'u', 0.01, "kWh", ""),
    (MonthChargedLow, 33009, "ST", 0, 9, R, 'u', 0.01, "kWh", ""),
    (MonthDischargedHigh, 33010, "ST", 0, 10, R, 'u', 0.01, "kWh", ""),
    (MonthDischargedLow, 33011, "ST", 0, 11, R, 'u', 0.01, "kWh", ""),
    (InternalTemp, 35000, "TP", 3, 0, R, 'u', 0.1, "°C", ""),
    (Mos1Temp, 35001, "TP", 0, 1, R, 'u', 0.1, "°C", ""),
    (Mos2Temp, 35002, "TP", 0, 2, R, 'u', 0.1, "°C", ""),
    (MaxCellTemp, 35010, "CT", 2, 0, R, 'u', 0.1, "°C", ""),
    (MinCellTemp, 35011, "CT", 0, 1, R, 'u', 0.1, "°C", ""),
    (InverterState, 35100, "IS", 1, 0, R, 'u', 1.0, "", "0:sleep,1:standby,2:charge,3:discharge,4:backup,5:upgrade"),
    (LimitVoltage, 35110, "LT", 3, 0, R, 'u', 100.0, "mV", ""),
    (LimitChargeCurrent, 35111, "LT", 0, 1, R, 'u', 100.0, "mA", ""),
    (LimitDischargeCurrent, 35112, "LT", 0, 2, R, 'u', 100.0, "mA", ""),
    (Alarm, 36000, "AL", 1, 0, R, 'b', 1.0, "", "Alarm register"),
    (FaultLow, 36100, "FT", 2, 0, R, 'b', 1.0, "", "Fault register LSB"),
    (FaultHigh, 36101, "FT", 0, 1, R, 'b', 1.0, "", "Fault register MSB"),
    (Restart, 41000, "RS", 1, 0, RW, 'u', 1.0, "", "0x55AA-->restart"),
    (UnitId, 41100, "UI", 1, 0, RW, 'u', 1.0, "", "unit id [1..255]"),
    (Backup, 41200, "BK", 1, 0, RW, 'u', 1.0, "", "0:enable,1:disable"),
    (RtuMode, 42000, "RM", 1, 0, RW, 'u', 1.0, "", "0x55AA=ON,0x55BB=OFF"),
    (SetInverterState, 42010, "IV", 2, 0, RW, 'u', 1.0, "", "0:stop,1:charge,2:discharge"),
    (ChargeToSoc, 42011, "IV", 0, 1, RW, 'u', 1.0, "%", "charge to target SOC"),
    (ChargePower, 42020, "PW", 2, 0, RW, 'u', 1.0, "W", "range:[0..2500W]"),
    (DischargePower, 42021, "PW", 0, 1, RW, 'u', 1.0, "W", "range:[0..2500W]"),
    (UserMode, 43000, "UM", 1, 0, RW, 'u', 1.0, "", "0:manual,1:anti-feed,2:trade_mode"),
    (ChargeCutoff, 44000, "CO", 4, 0, RW, 'u', 0.1, "%", "range:[80%..100%]"),
    (DischargeCutoff, 44001, "CO", 0, 1, RW, 'u', 0.1, "%", "range:[12%..30%]"),
    (MaxChargePower, 44002, "CO", 0, 2, RW, 'u', 1.0, "W", "range:[0..2500W]"),
    (MaxDischargePower, 44003, "CO", 0, 3, RW, 'u', 1.0, "W", "range:[0..2500W]"),
];

pub fn descriptors() -> Vec<RegisterDescriptor> {
    VENUS_E
        .iter()
        .enumerate()
        .map(
            |(i, &(name, address, group, block_size, offset, access, code, gain, unit, description))| {
                RegisterDescriptor {
                    index: i + 1,
                    name,
                    address,
                    group,
                    block_size,
                    offset,
                    access,
                    wire_type: WireType::from_code(code),
                    raw: 0,
                    stored: false,
                    gain,
                    converted: Value::Unavailable,
                    unit,
                    description,
                }
            },
        )
        .collect()
}

/// The validated Venus E schema.
pub fn schema() -> Result<RegisterSchema, DecodeError> {
    RegisterSchema::new(descriptors())
}
