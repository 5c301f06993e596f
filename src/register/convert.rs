use serde::{Serialize, Serializer};
use std::fmt;

/// On-the-wire representation of a single 16-bit holding register.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WireType {
    /// Two ASCII characters, high byte first.
    CharPair,
    Unsigned,
    /// 16-bit two's complement.
    Signed,
    /// Left as-is, bits are interpreted by the consumer.
    Bitfield,
}

impl WireType {
    /// Parses the one letter type codes used in register tables.
    ///
    /// Unknown codes decode as `Unsigned`.
    pub fn from_code(code: char) -> Self {
        match code {
            'c' => WireType::CharPair,
            'u' => WireType::Unsigned,
            's' => WireType::Signed,
            'b' => WireType::Bitfield,
            other => {
                log::warn!("unknown wire type code {:?}, treating as unsigned", other);
                WireType::Unsigned
            }
        }
    }

    pub fn code(&self) -> char {
        match self {
            WireType::CharPair => 'c',
            WireType::Unsigned => 'u',
            WireType::Signed => 's',
            WireType::Bitfield => 'b',
        }
    }
}

/// A decoded register value.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Value {
    Number(f64),
    Text(String),
    Bits(u16),
    #[default]
    Unavailable,
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Bits(b) => Some(*b as f64),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self, Value::Unavailable)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{:.2}", n),
            Value::Text(s) => f.pad(s),
            Value::Bits(b) => write!(f, "0b{:016b}", b),
            Value::Unavailable => f.pad(UNAVAILABLE),
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Bits(b) => serializer.serialize_u16(*b),
            Value::Unavailable => serializer.serialize_none(),
        }
    }
}

/// Display form of [`Value::Unavailable`].
pub const UNAVAILABLE: &str = "n.a.";

// printable ASCII, excluding space
const PRINTABLE: std::ops::RangeInclusive<u8> = 33..=126;
const PLACEHOLDER: char = '.';

fn printable(byte: u8) -> char {
    if PRINTABLE.contains(&byte) {
        byte as char
    } else {
        PLACEHOLDER
    }
}

/// Splits a register into its high and low byte as a two character string.
pub fn char_pair(raw: u16) -> String {
    let [high, low] = raw.to_be_bytes();
    [printable(high), printable(low)].iter().collect()
}

pub fn signed(raw: u16) -> i32 {
    let raw = raw as i32;
    if raw > 0x7FFF {
        raw - 0x10000
    } else {
        raw
    }
}

/// Converts one raw register to its physical value.
pub fn convert(wire_type: WireType, raw: u16, gain: f64) -> Value {
    match wire_type {
        WireType::CharPair => Value::Text(char_pair(raw)),
        WireType::Unsigned => Value::Number(raw as f64 * gain),
        WireType::Signed => Value::Number(signed(raw) as f64 * gain),
        WireType::Bitfield => Value::Bits(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_pair_bytes() {
        assert_eq!(char_pair(0x4143), "AC");
        assert_eq!(char_pair(0x4100), "A.");
        assert_eq!(char_pair(0x7F20), "..");
        assert_eq!(char_pair(0x217E), "!~");
    }

    #[test]
    fn signed_boundaries() {
        assert_eq!(signed(0x7FFF), 32767);
        assert_eq!(signed(0x8000), -32768);
        assert_eq!(signed(0xFFFF), -1);
        assert_eq!(signed(0), 0);
    }

    #[test]
    fn unknown_code_is_unsigned() {
        assert_eq!(WireType::from_code('x'), WireType::Unsigned);
        assert_eq!(WireType::from_code('b'), WireType::Bitfield);
    }

    #[test]
    fn value_display() {
        assert_eq!(Value::Number(12.346).to_string(), "12.35");
        assert_eq!(Value::Bits(5).to_string(), "0b0000000000000101");
        assert_eq!(Value::Unavailable.to_string(), "n.a.");
        assert_eq!(format!("{:>6}", Value::Text("AC".to_string())), "    AC");
    }
}
