//! OBIS field table of a DSMR 5 P1 telegram with an optional gas meter.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, IntoPrimitive, TryFromPrimitive)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ObisFieldId {
    Version = 0,
    TimeStamp,
    SerialNumber,
    EnergyT1Consumed,
    EnergyT2Consumed,
    EnergyT1Produced,
    EnergyT2Produced,
    ActiveTariff,
    PowerConsumed,
    PowerProduced,
    VoltageL1,
    VoltageL2,
    VoltageL3,
    CurrentL1,
    CurrentL2,
    CurrentL3,
    PowerL1Consumed,
    PowerL2Consumed,
    PowerL3Consumed,
    PowerL1Produced,
    PowerL2Produced,
    PowerL3Produced,
    GasSerialNumber,
    GasTimeStamp,
    GasVolume,
}

impl ObisFieldId {
    /// Position in the field table and in telegram order.
    pub fn position(self) -> usize {
        u8::from(self) as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Numeric,
    Text,
    Timestamp,
}

impl ValueKind {
    /// Parses the table codes `u`, `s` and `t`.
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'u' => Some(ValueKind::Numeric),
            's' => Some(ValueKind::Text),
            't' => Some(ValueKind::Timestamp),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ObisField {
    pub id: ObisFieldId,
    pub code: &'static str,
    pub kind: ValueKind,
    pub raw: String,
    /// Only set for numeric fields.
    pub value: Option<f64>,
    pub divisor: u32,
    pub unit: &'static str,
}

impl ObisField {
    fn new(id: ObisFieldId, code: &'static str, kind: ValueKind, divisor: u32, unit: &'static str) -> Self {
        Self {
            id,
            code,
            kind,
            raw: String::new(),
            value: None,
            divisor,
            unit,
        }
    }
}

#[rustfmt::skip]
const DSMR5: &[(ObisFieldId, &str, char, u32, &str)] = &[
    (ObisFieldId::Version, "0.2.8", 'u', 10, ""),
    (ObisFieldId::TimeStamp, "1.0.0", 't', 1, ""),
    (ObisFieldId::SerialNumber, "96.1.1", 's', 1, ""),
    (ObisFieldId::EnergyT1Consumed, "1.8.1", 'u', 1000, "Wh"),
    (ObisFieldId::EnergyT2Consumed, "1.8.2", 'u', 1000, "Wh"),
    (ObisFieldId::EnergyT1Produced, "2.8.1", 'u', 1000, "Wh"),
    (ObisFieldId::EnergyT2Produced, "2.8.2", 'u', 1000, "Wh"),
    (ObisFieldId::ActiveTariff, "96.14.0", 'u', 1, ""),
    (ObisFieldId::PowerConsumed, "1.7.0", 'u', 1, "W"),
    (ObisFieldId::PowerProduced, "2.7.0", 'u', 1, "W"),
    (ObisFieldId::VoltageL1, "32.7.0", 'u', 10, "V"),
    (ObisFieldId::VoltageL2, "52.7.0", 'u', 10, "V"),
    (ObisFieldId::VoltageL3, "72.7.0", 'u', 10, "V"),
    (ObisFieldId::CurrentL1, "31.7.0", 'u', 1, "A"),
    (ObisFieldId::CurrentL2, "51.7.0", 'u', 1, "A"),
    (ObisFieldId::CurrentL3, "71.7.0", 'u', 1, "A"),
    (ObisFieldId::PowerL1Consumed, "21.7.0", 'u', 1, "W"),
    (ObisFieldId::PowerL2Consumed, "41.7.0", 'u', 1, "W"),
    (ObisFieldId::PowerL3Consumed, "61.7.0", 'u', 1, "W"),
    (ObisFieldId::PowerL1Produced, "22.7.0", 'u', 1, "W"),
    (ObisFieldId::PowerL2Produced, "42.7.0", 'u', 1, "W"),
    (ObisFieldId::PowerL3Produced, "62.7.0", 'u', 1, "W"),
    (ObisFieldId::GasSerialNumber, "96.1.0", 's', 1, ""),
    (ObisFieldId::GasTimeStamp, "24.2.1", 't', 1, ""),
    (ObisFieldId::GasVolume, "24.2.1", 'u', 1000, "m3"),
];

/// Fixed, ordered set of fields read from every telegram.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ObisTable {
    fields: Vec<ObisField>,
}

impl Default for ObisTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ObisTable {
    pub fn new() -> Self {
        let fields = DSMR5
            .iter()
            .map(|&(id, code, kind, divisor, unit)| {
                // the table above only uses known codes
                let kind = ValueKind::from_code(kind).unwrap_or(ValueKind::Text);
                ObisField::new(id, code, kind, divisor, unit)
            })
            .collect();

        Self { fields }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[ObisField] {
        &self.fields
    }

    pub(crate) fn fields_mut(&mut self) -> &mut [ObisField] {
        &mut self.fields
    }

    pub fn field(&self, id: ObisFieldId) -> &ObisField {
        &self.fields[id.position()]
    }

    pub fn value(&self, id: ObisFieldId) -> Option<f64> {
        self.field(id).value
    }

    pub fn raw(&self, id: ObisFieldId) -> &str {
        &self.field(id).raw
    }
}
