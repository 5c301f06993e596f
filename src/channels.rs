use crate::prelude::*;
use crate::{battery, meter};

#[derive(Debug, Clone)]
pub struct Channels {
    pub from_battery: battery::Sender,
    pub from_meter: meter::Sender,
    pub shutdown: broadcast::Sender<()>,
}

impl Default for Channels {
    fn default() -> Self {
        Self::new()
    }
}

impl Channels {
    pub fn new() -> Self {
        Self {
            from_battery: Self::channel(),
            from_meter: Self::channel(),
            shutdown: Self::channel(),
        }
    }

    fn channel<T: Clone>() -> broadcast::Sender<T> {
        broadcast::channel(2048).0
    }
}
