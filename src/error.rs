use thiserror::Error;

/// Failures raised by the register and telegram decoding core.
///
/// `TransportFailure`, `SchemaMismatch`, `TelegramIncomplete` and
/// `TelegramMalformed` are per-cycle conditions: the owning actor logs them and
/// carries on with the previous values. `IndexOutOfRange` and `InvalidSchema`
/// point at a defect in the static tables and abort startup.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("transport failure reading {count} registers at {address}: {reason}")]
    TransportFailure {
        address: u16,
        count: u16,
        reason: String,
    },

    #[error("block at index {index} declares {expected} registers but {actual} were returned")]
    SchemaMismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },

    #[error("index {index} out of range for {table} (valid 1..={len})")]
    IndexOutOfRange {
        table: &'static str,
        index: usize,
        len: usize,
    },

    #[error("telegram incomplete: {len} chars, need at least {min}")]
    TelegramIncomplete { len: usize, min: usize },

    #[error("telegram malformed at {field} ({code}): {reason}")]
    TelegramMalformed {
        field: String,
        code: String,
        reason: String,
    },

    #[error("invalid schema: {0}")]
    InvalidSchema(String),
}

impl DecodeError {
    /// True for conditions that only affect the current poll cycle or telegram.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DecodeError::TransportFailure { .. }
                | DecodeError::SchemaMismatch { .. }
                | DecodeError::TelegramIncomplete { .. }
                | DecodeError::TelegramMalformed { .. }
        )
    }
}

/// Creates an anyhow error with the current file and line number
#[macro_export]
macro_rules! file_error {
    ($($arg:tt)*) => {
        anyhow!(
            "[{}:{}] {}",
            std::path::Path::new(file!())
                .file_name()
                .map(|f| f.to_string_lossy())
                .unwrap_or_default(),
            line!(),
            format!($($arg)*)
        )
    };
}
