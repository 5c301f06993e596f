use crate::error::DecodeError;
use crate::register::convert::{self, Value, WireType};

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::Serialize;

/// Logical fields of the battery register map.
///
/// The discriminant is the schema index of the field's first descriptor, so a
/// multi-word field like `DeviceName` covers indices 1..=10.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, IntoPrimitive, TryFromPrimitive)]
#[repr(u16)]
pub enum RegisterId {
    DeviceName = 1,
    FirmwareVersion = 11,
    SerialNumber = 12,
    DcVoltage = 22,
    DcCurrent = 23,
    DcPowerDirection = 24,
    DcPower = 25,
    DcSoc = 26,
    DcTotalEnergy = 27,
    AcVoltage = 28,
    AcCurrent = 29,
    AcPowerDirection = 30,
    AcPower = 31,
    AcFrequency = 32,
    BackupVoltage = 33,
    BackupCurrent = 34,
    BackupPowerDirection = 35,
    BackupPower = 36,
    TotalChargedHigh = 37,
    TotalChargedLow = 38,
    TotalDischargedHigh = 39,
    TotalDischargedLow = 40,
    DayChargedHigh = 41,
    DayChargedLow = 42,
    DayDischargedHigh = 43,
    DayDischargedLow = 44,
    MonthChargedHigh = 45,
    MonthChargedLow = 46,
    MonthDischargedHigh = 47,
    MonthDischargedLow = 48,
    InternalTemp = 49,
    Mos1Temp = 50,
    Mos2Temp = 51,
    MaxCellTemp = 52,
    MinCellTemp = 53,
    InverterState = 54,
    LimitVoltage = 55,
    LimitChargeCurrent = 56,
    LimitDischargeCurrent = 57,
    Alarm = 58,
    FaultLow = 59,
    FaultHigh = 60,
    Restart = 61,
    UnitId = 62,
    Backup = 63,
    RtuMode = 64,
    SetInverterState = 65,
    ChargeToSoc = 66,
    ChargePower = 67,
    DischargePower = 68,
    UserMode = 69,
    ChargeCutoff = 70,
    DischargeCutoff = 71,
    MaxChargePower = 72,
    MaxDischargePower = 73,
}

impl RegisterId {
    pub fn index(self) -> usize {
        u16::from(self) as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Access {
    ReadOnly,
    ReadWrite,
}

impl Access {
    pub fn code(&self) -> &'static str {
        match self {
            Access::ReadOnly => "R",
            Access::ReadWrite => "RW",
        }
    }
}

/// One row of the register schema.
#[derive(Clone, Debug, PartialEq)]
pub struct RegisterDescriptor {
    /// 1-based position in the schema
    pub index: usize,
    pub name: RegisterId,
    pub address: u16,
    pub group: &'static str,
    /// Register count of the block, only set on the block's first row.
    pub block_size: u16,
    pub offset: u16,
    pub access: Access,
    pub wire_type: WireType,
    pub raw: u16,
    /// Set once a read of the row's block has been stored.
    pub stored: bool,
    pub gain: f64,
    pub converted: Value,
    pub unit: &'static str,
    pub description: &'static str,
}

impl RegisterDescriptor {
    pub fn is_block_start(&self) -> bool {
        self.block_size > 0
    }

    /// Rows never read stay unavailable.
    pub fn convert(&self) -> Value {
        if !self.stored {
            return Value::Unavailable;
        }
        convert::convert(self.wire_type, self.raw, self.gain)
    }
}

/// Address and register count of one block transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockRequest {
    pub index: usize,
    pub name: RegisterId,
    pub address: u16,
    pub count: u16,
}

/// The device register table together with the last raw words read.
#[derive(Clone, Debug, PartialEq)]
pub struct RegisterSchema {
    rows: Vec<RegisterDescriptor>,
}

impl RegisterSchema {
    /// Builds a schema, rejecting rows that break the block layout rules.
    pub fn new(rows: Vec<RegisterDescriptor>) -> Result<Self, DecodeError> {
        let schema = Self { rows };
        schema.validate()?;
        Ok(schema)
    }

    fn validate(&self) -> Result<(), DecodeError> {
        if self.rows.is_empty() {
            return Err(DecodeError::InvalidSchema("schema has no rows".to_string()));
        }

        let mut position = 0;
        while position < self.rows.len() {
            let start = &self.rows[position];
            if !start.is_block_start() || start.offset != 0 {
                return Err(DecodeError::InvalidSchema(format!(
                    "row {} ({:?}) is not inside any block",
                    start.index, start.name
                )));
            }

            let size = start.block_size as usize;
            if position + size > self.rows.len() {
                return Err(DecodeError::InvalidSchema(format!(
                    "block at row {} declares {} registers but only {} rows follow",
                    start.index,
                    size,
                    self.rows.len() - position
                )));
            }

            for (k, row) in self.rows[position..position + size].iter().enumerate() {
                if row.index != position + k + 1 {
                    return Err(DecodeError::InvalidSchema(format!(
                        "row at position {} has index {}",
                        position + k + 1,
                        row.index
                    )));
                }
                if k > 0 && row.block_size != 0 {
                    return Err(DecodeError::InvalidSchema(format!(
                        "row {} declares a block size inside the block starting at {}",
                        row.index, start.index
                    )));
                }
                if row.offset as usize != k || row.address as usize != start.address as usize + k {
                    return Err(DecodeError::InvalidSchema(format!(
                        "row {} at offset {} has address {}, expected {}",
                        row.index,
                        row.offset,
                        row.address,
                        start.address as usize + k
                    )));
                }
            }

            position += size;
        }

        for row in &self.rows {
            let first = self.get(row.name.index()).map_err(|_| {
                DecodeError::InvalidSchema(format!(
                    "row {} is named {:?} whose first index {} is outside the schema",
                    row.index,
                    row.name,
                    row.name.index()
                ))
            })?;
            if first.name != row.name || first.index > row.index {
                return Err(DecodeError::InvalidSchema(format!(
                    "row {} is named {:?} but that field starts at index {}",
                    row.index,
                    row.name,
                    row.name.index()
                )));
            }
        }

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[RegisterDescriptor] {
        &self.rows
    }

    pub fn get(&self, index: usize) -> Result<&RegisterDescriptor, DecodeError> {
        if index == 0 || index > self.rows.len() {
            return Err(DecodeError::IndexOutOfRange {
                table: "register schema",
                index,
                len: self.rows.len(),
            });
        }
        Ok(&self.rows[index - 1])
    }

    pub fn field(&self, id: RegisterId) -> Result<&RegisterDescriptor, DecodeError> {
        self.get(id.index())
    }

    /// All rows of the block starting at `index`, in offset order.
    pub fn block_rows(&self, index: usize) -> Result<&[RegisterDescriptor], DecodeError> {
        let start = self.block_start(index)?;
        let size = start.block_size as usize;
        Ok(&self.rows[index - 1..index - 1 + size])
    }

    fn block_start(&self, index: usize) -> Result<&RegisterDescriptor, DecodeError> {
        let row = self.get(index)?;
        if !row.is_block_start() {
            return Err(DecodeError::InvalidSchema(format!(
                "row {} ({:?}) does not start a block",
                index, row.name
            )));
        }
        Ok(row)
    }

    /// The address and register count to request for the block at `index`.
    pub fn read_block(&self, index: usize) -> Result<BlockRequest, DecodeError> {
        let row = self.block_start(index)?;
        Ok(BlockRequest {
            index,
            name: row.name,
            address: row.address,
            count: row.block_size,
        })
    }

    /// Every block of the schema in table order.
    pub fn blocks(&self) -> Vec<BlockRequest> {
        self.rows
            .iter()
            .filter(|row| row.is_block_start())
            .map(|row| BlockRequest {
                index: row.index,
                name: row.name,
                address: row.address,
                count: row.block_size,
            })
            .collect()
    }

    /// Stages freshly read words into the block starting at `index`.
    ///
    /// Nothing is written when fewer words than the block size were supplied.
    pub fn store_block(&mut self, index: usize, words: &[u16]) -> Result<(), DecodeError> {
        let size = self.block_start(index)?.block_size as usize;
        if words.len() < size {
            return Err(DecodeError::SchemaMismatch {
                index,
                expected: size,
                actual: words.len(),
            });
        }

        for row in &mut self.rows[index - 1..index - 1 + size] {
            row.raw = words[row.offset as usize];
            row.stored = true;
        }

        Ok(())
    }

    /// Recomputes `converted` for every row from its raw word.
    pub fn convert_all(&mut self) {
        for row in &mut self.rows {
            row.converted = row.convert();
        }
    }
}
