//! Hardware backend plus the availability cached from its last (re)connect

use std::collections::BTreeSet;

use contracts::{SensorId, StatusKind};
use sensors::{HardwareBackend, SensorBackend};
use tracing::{info, warn};

use crate::status::link_label;

pub(crate) struct BackendSlot {
    pub(crate) backend: Box<dyn SensorBackend>,
    pub(crate) link: Option<StatusKind>,
    available: BTreeSet<SensorId>,
    error: bool,
}

impl BackendSlot {
    pub(crate) fn new(hardware: HardwareBackend) -> Self {
        let mut slot = Self {
            backend: hardware.backend,
            link: hardware.link,
            available: BTreeSet::new(),
            error: false,
        };
        slot.refresh();
        slot
    }

    /// Recompute availability and the error flag from the backend state
    pub(crate) fn refresh(&mut self) {
        let connected = self.backend.is_connected();
        self.error = !connected;
        self.available = if connected {
            self.backend.available().into_iter().collect()
        } else {
            BTreeSet::new()
        };

        if connected {
            info!(
                backend = self.backend.name(),
                sensors = self.available.len(),
                "Sensor backend available"
            );
        } else {
            let link = self.link.map(link_label).unwrap_or(self.backend.name());
            warn!(backend = self.backend.name(), link, "Unable to initialise sensor backend comms");
        }
    }

    pub(crate) fn provides(&self, id: &str) -> bool {
        self.available.contains(id)
    }

    pub(crate) fn is_error(&self) -> bool {
        self.error
    }
}
