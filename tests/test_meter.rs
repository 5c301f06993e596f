mod common;
use common::*;
use venus_bridge::dsmr::{Telegram, TelegramCodec};
use venus_bridge::meter::{self, Meter};
use venus_bridge::prelude::*;

use bytes::BytesMut;
use futures::StreamExt;
use tokio_util::codec::{Decoder, FramedRead};

fn meter_with_state() -> (Meter, Channels) {
    let channels = Channels::new();
    let meter = Meter::new(Factory::meter_config(), channels.clone(), MeterState::new().shared());
    (meter, channels)
}

#[tokio::test]
async fn valid_telegram_updates_and_broadcasts() -> Result<()> {
    common_setup();

    let (meter, channels) = meter_with_state();
    let mut from_meter = channels.from_meter.subscribe();
    let config = Factory::meter_config().meter();

    let telegram = Telegram::new(Factory::telegram())?;
    let reading = meter.handle_telegram(&telegram, &config).await;

    let reading = reading.ok_or_else(|| anyhow!("telegram was not scanned"))?;
    assert_eq!(reading.power_consumed, Some(1193.0));
    assert_eq!(reading.power_produced, Some(0.0));

    match from_meter.recv().await? {
        meter::ChannelData::Reading(sent) => assert_eq!(sent, reading),
        other => panic!("unexpected {:?}", other),
    }

    assert_eq!(meter::power_consumed(&meter.state()).await, Some(1193.0));
    assert_eq!(meter::power_produced(&meter.state()).await, Some(0.0));
    assert_eq!(meter.state().read().await.freshness.cycles, 1);

    Ok(())
}

#[tokio::test]
async fn short_telegram_is_never_scanned() -> Result<()> {
    let (meter, _channels) = meter_with_state();
    let config = Factory::meter_config().meter();

    let short = Factory::with_crc("/ISK5\\2MT382-1000\r\n\r\n1-0:1.7.0(00.100*kW)\r\n!");
    let telegram = Telegram::new(short)?;

    assert_eq!(meter.handle_telegram(&telegram, &config).await, None);

    let state = meter.state();
    let state = state.read().await;
    assert_eq!(state.freshness.cycles, 0);
    assert_eq!(state.rejected, 0);
    assert_eq!(state.power_consumed(), None);

    Ok(())
}

#[tokio::test]
async fn bad_checksum_is_rejected() -> Result<()> {
    let (meter, _channels) = meter_with_state();
    let config = Factory::meter_config().meter();

    let good = Telegram::new(Factory::telegram())?;
    meter.handle_telegram(&good, &config).await;
    let accepted_at = meter.state().read().await.freshness.last_updated;

    let tampered = Factory::telegram().replace("(01.193*kW)", "(09.999*kW)");
    let telegram = Telegram::new(tampered)?;
    assert_eq!(meter.handle_telegram(&telegram, &config).await, None);

    let state = meter.state();
    let state = state.read().await;
    assert_eq!(state.rejected, 1);
    assert_eq!(state.power_consumed(), Some(1193.0));
    assert_eq!(state.freshness.cycles, 2);
    assert_eq!(state.freshness.failed_reads, 1);
    assert_eq!(state.freshness.last_updated, accepted_at);

    Ok(())
}

#[tokio::test]
async fn checksum_can_be_ignored() -> Result<()> {
    let channels = Channels::new();
    let config = Factory::config("meter:\n  host: localhost\n  verify_crc: false\n");
    let meter = Meter::new(config.clone(), channels, MeterState::new().shared());

    let tampered = Factory::telegram().replace("(01.193*kW)", "(02.500*kW)");
    let telegram = Telegram::new(tampered)?;
    let reading = meter.handle_telegram(&telegram, &config.meter()).await;

    assert_eq!(reading.and_then(|r| r.power_consumed), Some(2500.0));

    Ok(())
}

#[tokio::test]
async fn malformed_telegram_counts_as_rejected() -> Result<()> {
    let (meter, _channels) = meter_with_state();
    let config = Factory::meter_config().meter();

    let body = Factory::telegram_body_with("1-0:2.7.0", "1-0:2.7.0(xx.xxx*kW)");
    let telegram = Telegram::new(Factory::with_crc(&body))?;
    assert_eq!(meter.handle_telegram(&telegram, &config).await, None);

    let state = meter.state();
    let state = state.read().await;
    assert_eq!(state.rejected, 1);
    assert_eq!(state.freshness.last_updated, None);
    assert_eq!(state.freshness.failed_reads, 1);

    Ok(())
}

#[tokio::test]
async fn codec_frames_a_noisy_stream() -> Result<()> {
    let stream = format!("{}{}{}", "0123)noise", Factory::telegram(), Factory::telegram());
    let mut frames = FramedRead::new(stream.as_bytes(), TelegramCodec::new());

    let mut count = 0;
    while let Some(telegram) = frames.next().await {
        let telegram = telegram?;
        telegram.verify()?;
        assert!(telegram.text().starts_with('/'));
        count += 1;
    }
    assert_eq!(count, 2);

    Ok(())
}

#[test]
fn codec_waits_for_the_checksum_line() -> Result<()> {
    let telegram = Factory::telegram();
    let (head, tail) = telegram.split_at(telegram.len() - 4);

    let mut codec = TelegramCodec::new();
    let mut buf = BytesMut::from(head);
    assert_eq!(codec.decode(&mut buf)?, None);

    buf.extend_from_slice(tail.as_bytes());
    let frame = codec.decode(&mut buf)?.ok_or_else(|| anyhow!("no frame"))?;
    assert_eq!(frame.text(), telegram);
    assert!(buf.is_empty());

    Ok(())
}
