use crate::error::DecodeError;
use crate::prelude::*;

use {
    bytes::{Buf, BytesMut},
    tokio_util::codec::Decoder,
};

/// Largest amount of unframed input buffered before the stream is abandoned.
pub const MAX_BUFFER_SIZE: usize = 65536;

/// One framed P1 telegram, from the `/` header through the `!` trailer line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Telegram {
    text: String,
    // position of '!'
    trailer: usize,
    crc: Option<u16>,
}

impl Telegram {
    pub fn new(text: String) -> Result<Self> {
        let trailer = text.rfind('!').ok_or_else(|| anyhow!("telegram has no '!' trailer"))?;
        let checksum = text[trailer + 1..].trim();
        let crc = match checksum.len() {
            0 => None,
            4 => Some(u16::from_str_radix(checksum, 16).map_err(|_| anyhow!("invalid checksum {:?}", checksum))?),
            _ => bail!("invalid checksum {:?}", checksum),
        };

        Ok(Self { text, trailer, crc })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn crc(&self) -> Option<u16> {
        self.crc
    }

    /// CRC16/ARC over everything from `/` up to and including `!`.
    pub fn calculate_crc(&self) -> u16 {
        crc16::State::<crc16::ARC>::calculate(&self.text.as_bytes()[..=self.trailer])
    }

    /// Older meters send a bare `!`; those pass unchecked.
    pub fn verify(&self) -> Result<(), DecodeError> {
        match self.crc {
            Some(expected) => {
                let actual = self.calculate_crc();
                if actual == expected {
                    Ok(())
                } else {
                    Err(DecodeError::TelegramMalformed {
                        field: "Checksum".to_string(),
                        code: "!".to_string(),
                        reason: format!("crc {:04X} does not match {:04X}", actual, expected),
                    })
                }
            }
            None => Ok(()),
        }
    }

    pub fn check_complete(&self, min: usize) -> Result<(), DecodeError> {
        if self.len() < min {
            Err(DecodeError::TelegramIncomplete { len: self.len(), min })
        } else {
            Ok(())
        }
    }
}

/// Splits the P1 byte stream into telegrams.
#[derive(Debug, Default)]
pub struct TelegramCodec {}

impl TelegramCodec {
    pub fn new() -> Self {
        Self {}
    }
}

impl Decoder for TelegramCodec {
    type Item = Telegram;
    type Error = anyhow::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Telegram>> {
        loop {
            // anything before the header is noise or the tail of a telegram
            // we joined halfway through
            match src.iter().position(|&b| b == b'/') {
                Some(0) => {}
                Some(start) => {
                    trace!("discarding {} bytes before telegram header", start);
                    src.advance(start);
                }
                None => {
                    src.clear();
                    return Ok(None);
                }
            }

            let Some(bang) = src.iter().position(|&b| b == b'!') else {
                if src.len() >= MAX_BUFFER_SIZE {
                    bail!("no telegram trailer within {} bytes", MAX_BUFFER_SIZE);
                }
                return Ok(None);
            };

            let Some(newline) = src[bang..].iter().position(|&b| b == b'\n') else {
                if src.len() >= MAX_BUFFER_SIZE {
                    bail!("no end of line after telegram trailer within {} bytes", MAX_BUFFER_SIZE);
                }
                return Ok(None);
            };

            let frame = src.split_to(bang + newline + 1);
            let text = String::from_utf8_lossy(&frame).into_owned();

            match Telegram::new(text) {
                Ok(telegram) => return Ok(Some(telegram)),
                Err(e) => warn!("dropping telegram: {}", e),
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Telegram>> {
        match self.decode(src)? {
            Some(telegram) => Ok(Some(telegram)),
            None => {
                if !src.is_empty() {
                    debug!("dropping {} bytes of unterminated telegram", src.len());
                    src.clear();
                }
                Ok(None)
            }
        }
    }
}
