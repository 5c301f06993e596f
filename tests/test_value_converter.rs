mod common;
use common::*;
use venus_bridge::prelude::*;
use venus_bridge::register::convert::{char_pair, convert, signed};
use venus_bridge::register::WireType;

#[test]
fn unsigned_scales_by_gain() {
    common_setup();

    assert_eq!(convert(WireType::Unsigned, 5210, 0.01), Value::Number(5210.0 * 0.01));
    assert_eq!(convert(WireType::Unsigned, 0xFFFF, 1.0), Value::Number(65535.0));
    assert_eq!(convert(WireType::Unsigned, 12, 100.0), Value::Number(1200.0));
}

#[test]
fn signed_is_twos_complement() {
    for raw in [0u16, 1, 0x7FFF, 0x8000, 0xFFFE, 0xFFFF] {
        assert_eq!(signed(raw), raw as i16 as i32);
    }
    assert_eq!(convert(WireType::Signed, 0xFF38, 0.01), Value::Number(-200.0 * 0.01));
}

#[test]
fn char_pair_masks_non_printable_bytes() {
    assert_eq!(char_pair(u16::from_be_bytes(*b"VE")), "VE");
    assert_eq!(char_pair(0x2041), ".A");
    assert_eq!(char_pair(0x0000), "..");
    assert_eq!(char_pair(0xC3A9), "..");

    for raw in [0u16, 0x1F7F, 0x4142, 0xFFFF] {
        assert_eq!(char_pair(raw).chars().count(), 2);
    }

    assert_eq!(convert(WireType::CharPair, 0x4D53, 5.0), Value::Text("MS".to_string()));
}

#[test]
fn bitfield_keeps_raw_bits() {
    assert_eq!(convert(WireType::Bitfield, 0x8001, 0.1), Value::Bits(0x8001));
    assert_eq!(Value::Bits(0x8001).as_f64(), Some(32769.0));
}

#[test]
fn wire_type_codes() {
    for wire_type in [WireType::CharPair, WireType::Unsigned, WireType::Signed, WireType::Bitfield] {
        assert_eq!(WireType::from_code(wire_type.code()), wire_type);
    }
}

#[test]
fn unavailable_serializes_as_null() -> Result<()> {
    assert_eq!(serde_json::to_string(&Value::Unavailable)?, "null");
    assert_eq!(serde_json::to_string(&Value::Number(1.5))?, "1.5");
    assert_eq!(serde_json::to_string(&Value::Text("VE".to_string()))?, "\"VE\"");
    assert!(!Value::Unavailable.is_available());
    assert_eq!(Value::Unavailable.as_f64(), None);
    Ok(())
}
