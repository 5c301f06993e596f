#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;

use venus_bridge::battery::BlockReader;
use venus_bridge::prelude::*;
use venus_bridge::register::marstek;

pub fn common_setup() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub const TELEGRAM_LINES: &[&str] = &[
    r"/ISk5\2MT382-1000",
    "",
    "1-3:0.2.8(50)",
    "0-0:1.0.0(101209113020W)",
    "0-0:96.1.1(4B384547303034303436333935353037)",
    "1-0:1.8.1(123456.789*kWh)",
    "1-0:1.8.2(123456.789*kWh)",
    "1-0:2.8.1(123456.789*kWh)",
    "1-0:2.8.2(123456.789*kWh)",
    "0-0:96.14.0(0002)",
    "1-0:1.7.0(01.193*kW)",
    "1-0:2.7.0(00.000*kW)",
    "0-0:96.7.21(00004)",
    "0-0:96.7.9(00002)",
    "1-0:99.97.0(2)(0-0:96.7.19)(101208152415W)(0000000240*s)(101208151004W)(0000000301*s)",
    "1-0:32.32.0(00002)",
    "1-0:52.32.0(00001)",
    "1-0:72.32.0(00000)",
    "1-0:32.36.0(00000)",
    "1-0:52.36.0(00003)",
    "1-0:72.36.0(00000)",
    "0-0:96.13.0(303132333435363738393A3B3C3D3E3F303132333435363738393A3B3C3D3E3F303132333435363738393A3B3C3D3E3F303132333435363738393A3B3C3D3E3F303132333435363738393A3B3C3D3E3F)",
    "1-0:32.7.0(220.1*V)",
    "1-0:52.7.0(220.2*V)",
    "1-0:72.7.0(220.3*V)",
    "1-0:31.7.0(001*A)",
    "1-0:51.7.0(002*A)",
    "1-0:71.7.0(003*A)",
    "1-0:21.7.0(01.111*kW)",
    "1-0:41.7.0(02.222*kW)",
    "1-0:61.7.0(03.333*kW)",
    "1-0:22.7.0(04.444*kW)",
    "1-0:42.7.0(05.555*kW)",
    "1-0:62.7.0(06.666*kW)",
    "0-1:24.1.0(003)",
    "0-1:96.1.0(3232323241424344313233343536373839)",
    "0-1:24.2.1(101209112500W)(12785.123*m3)",
];

/// In-memory battery: answers from a table keyed by block address.
#[derive(Default)]
pub struct MockReader {
    pub responses: HashMap<u16, Result<Vec<u16>, DecodeError>>,
    pub calls: Vec<(u16, u16)>,
}

impl MockReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, address: u16, words: Vec<u16>) -> Self {
        self.responses.insert(address, Ok(words));
        self
    }

    pub fn fail(mut self, address: u16) -> Self {
        self.responses.insert(
            address,
            Err(DecodeError::TransportFailure {
                address,
                count: 0,
                reason: "timeout".to_string(),
            }),
        );
        self
    }
}

#[async_trait]
impl BlockReader for MockReader {
    async fn read_block(&mut self, address: u16, count: u16) -> Result<Vec<u16>, DecodeError> {
        self.calls.push((address, count));
        match self.responses.get(&address) {
            Some(response) => response.clone(),
            None => Ok(vec![0; count as usize]),
        }
    }
}

pub struct Factory();
impl Factory {
    pub fn schema() -> RegisterSchema {
        marstek::schema().expect("venus e schema")
    }

    /// Ten registers spelling `text`, padded with NUL bytes.
    pub fn name_words(text: &str) -> Vec<u16> {
        let mut bytes = text.as_bytes().to_vec();
        bytes.resize(20, 0);
        bytes.chunks(2).map(|pair| u16::from_be_bytes([pair[0], pair[1]])).collect()
    }

    pub fn telegram_body() -> String {
        format!("{}\r\n!", TELEGRAM_LINES.join("\r\n"))
    }

    /// The sample telegram with one line swapped out.
    pub fn telegram_body_with(prefix: &str, replacement: &str) -> String {
        let lines: Vec<&str> = TELEGRAM_LINES
            .iter()
            .map(|line| if line.starts_with(prefix) { replacement } else { *line })
            .collect();
        format!("{}\r\n!", lines.join("\r\n"))
    }

    pub fn with_crc(body: &str) -> String {
        let crc = crc16::State::<crc16::ARC>::calculate(body.as_bytes());
        format!("{}{:04X}\r\n", body, crc)
    }

    pub fn telegram() -> String {
        Self::with_crc(&Self::telegram_body())
    }

    pub fn config(yaml: &str) -> ConfigWrapper {
        ConfigWrapper::from_config(Config::from_yaml(yaml).expect("valid config"))
    }

    pub fn meter_config() -> ConfigWrapper {
        Self::config("meter:\n  host: localhost\n")
    }
}
