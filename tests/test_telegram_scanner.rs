mod common;
use common::*;
use venus_bridge::dsmr::{scan, scan_fields, ObisFieldId, ObisTable, Telegram};
use venus_bridge::prelude::*;

#[test]
fn scans_a_full_telegram() -> Result<()> {
    common_setup();

    let mut table = ObisTable::new();
    scan(&Factory::telegram(), &mut table)?;

    assert_eq!(table.value(ObisFieldId::Version), Some(5.0));
    assert_eq!(table.raw(ObisFieldId::TimeStamp), "101209113020W");
    assert_eq!(table.value(ObisFieldId::TimeStamp), None);
    assert_eq!(table.raw(ObisFieldId::SerialNumber), "4B384547303034303436333935353037");
    assert_eq!(table.value(ObisFieldId::EnergyT1Consumed), Some(123456.789));
    assert_eq!(table.value(ObisFieldId::EnergyT2Produced), Some(123456.789));
    assert_eq!(table.value(ObisFieldId::ActiveTariff), Some(2.0));
    assert_eq!(table.value(ObisFieldId::PowerConsumed), Some(1193.0));
    assert_eq!(table.value(ObisFieldId::PowerProduced), Some(0.0));
    assert_eq!(table.value(ObisFieldId::VoltageL1), Some(220.1));
    assert_eq!(table.value(ObisFieldId::VoltageL3), Some(220.3));
    assert_eq!(table.value(ObisFieldId::CurrentL2), Some(2.0));
    assert_eq!(table.value(ObisFieldId::PowerL1Consumed), Some(1111.0));
    assert_eq!(table.value(ObisFieldId::PowerL3Produced), Some(6666.0));
    assert_eq!(table.raw(ObisFieldId::GasTimeStamp), "101209112500W");
    assert_eq!(table.raw(ObisFieldId::GasVolume), "12785.123*m");
    assert_eq!(table.value(ObisFieldId::GasVolume), Some(12785.123));

    Ok(())
}

#[test]
fn power_consumed_is_not_confused_with_phase_power() -> Result<()> {
    let body = Factory::telegram_body_with("1-0:1.7.0", "1-0:1.7.0(00345.67*kW)");

    let mut table = ObisTable::new();
    scan(&Factory::with_crc(&body), &mut table)?;

    // digits only, the decimal point is dropped
    assert_eq!(table.value(ObisFieldId::PowerConsumed), Some(34567.0));
    assert_eq!(table.value(ObisFieldId::PowerL1Consumed), Some(1111.0));

    Ok(())
}

#[test]
fn scanning_is_deterministic() -> Result<()> {
    let telegram = Factory::telegram();

    let first = scan_fields(&telegram, ObisTable::new().fields())?;
    let second = scan_fields(&telegram, ObisTable::new().fields())?;
    assert_eq!(first, second);

    let mut table = ObisTable::new();
    scan(&telegram, &mut table)?;
    let snapshot = table.clone();
    scan(&telegram, &mut table)?;
    assert_eq!(table, snapshot);

    Ok(())
}

#[test]
fn malformed_telegram_keeps_previous_values() -> Result<()> {
    let mut table = ObisTable::new();
    scan(&Factory::telegram(), &mut table)?;
    let before = table.clone();

    let body = Factory::telegram_body_with("1-0:32.7.0", "1-0:32.7.9(230.0*V)");
    let result = scan(&Factory::with_crc(&body), &mut table);

    match result {
        Err(DecodeError::TelegramMalformed { field, code, .. }) => {
            assert_eq!(field, "VoltageL1");
            assert_eq!(code, "32.7.0");
        }
        other => panic!("unexpected result {:?}", other),
    }
    assert_eq!(table, before);

    Ok(())
}

#[test]
fn numeric_field_without_digits_is_malformed() {
    let body = Factory::telegram_body_with("0-0:96.14.0", "0-0:96.14.0(----)");
    let mut table = ObisTable::new();

    let result = scan(&Factory::with_crc(&body), &mut table);

    assert!(matches!(
        result,
        Err(DecodeError::TelegramMalformed { ref field, .. }) if field == "ActiveTariff"
    ));
    assert!(table.fields().iter().all(|f| f.value.is_none()));
}

#[test]
fn telegram_checks() -> Result<()> {
    let telegram = Telegram::new(Factory::telegram())?;
    assert!(telegram.len() >= 800);
    telegram.check_complete(800)?;
    telegram.verify()?;

    let short = Telegram::new("/ISK5\r\n1-0:1.7.0(00.100*kW)\r\n!\r\n".to_string())?;
    assert_eq!(
        short.check_complete(800),
        Err(DecodeError::TelegramIncomplete {
            len: short.len(),
            min: 800
        })
    );
    assert_eq!(short.crc(), None);

    let tampered = Factory::telegram().replace("(220.1*V)", "(220.9*V)");
    let tampered = Telegram::new(tampered)?;
    assert!(matches!(
        tampered.verify(),
        Err(DecodeError::TelegramMalformed { ref field, .. }) if field == "Checksum"
    ));

    Ok(())
}
