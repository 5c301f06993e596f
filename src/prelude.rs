pub use std::io::Write;

pub use anyhow::{anyhow, bail, Result};
pub use log::{debug, error, info, trace, warn};
pub use tokio::sync::{broadcast, RwLock};

pub use crate::channels::Channels;
pub use crate::config::{self, Config, ConfigWrapper};
pub use crate::error::DecodeError;
pub use crate::file_error;
pub use crate::options::Options;
pub use crate::register::{CanonicalId, CanonicalTable, RegisterId, RegisterSchema, Value};
pub use crate::state::{BatteryState, Freshness, MeterState, SharedBattery, SharedMeter};
