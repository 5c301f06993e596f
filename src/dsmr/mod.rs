//! DSMR P1 smart meter telegrams: framing, the OBIS field table and the
//! field scanner.

pub mod codec;
pub mod obis;
pub mod scanner;

pub use codec::{Telegram, TelegramCodec};
pub use obis::{ObisField, ObisFieldId, ObisTable, ValueKind};
pub use scanner::{scan, scan_fields};
