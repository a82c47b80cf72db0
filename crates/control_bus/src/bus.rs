//! ControlBus - routes control messages to component inboxes
//!
//! Every component registers one inbox and the bus copies each message into
//! all of them. Each [`Inbox`] keeps only what `is_mine` accepts for its
//! owner. Inboxes are unbounded since control traffic is sparse and must not
//! be lost.

use std::sync::Arc;

use async_channel::{unbounded, Receiver, Sender, TryRecvError};
use contracts::{Command, ControlMessage, Destination};
use tracing::{debug, instrument, trace, warn};

use crate::error::BusError;
use crate::metrics::QueueMetrics;

struct Route {
    owner: Destination,
    tx: Sender<ControlMessage>,
}

/// Builder collecting inboxes before the bus is shared
#[derive(Default)]
pub struct ControlBusBuilder {
    routes: Vec<Route>,
}

impl ControlBusBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the inbox for `owner`
    pub fn register(&mut self, owner: Destination) -> Result<Inbox, BusError> {
        if owner == Destination::Broadcast {
            return Err(BusError::InvalidRecipient { destination: owner });
        }
        if self.routes.iter().any(|r| r.owner == owner) {
            return Err(BusError::DuplicateRecipient { destination: owner });
        }
        let (tx, rx) = unbounded();
        self.routes.push(Route { owner, tx });
        debug!(owner = %owner, "Inbox registered");
        Ok(Inbox { owner, rx })
    }

    #[instrument(name = "control_bus_build", skip(self), fields(inboxes = self.routes.len()))]
    pub fn build(self) -> ControlBus {
        ControlBus {
            routes: Arc::new(self.routes),
            metrics: Arc::new(QueueMetrics::new()),
        }
    }
}

/// Cloneable publishing side of the bus
#[derive(Clone)]
pub struct ControlBus {
    routes: Arc<Vec<Route>>,
    metrics: Arc<QueueMetrics>,
}

impl ControlBus {
    /// Fan `message` out to every inbox; returns how many of them it is
    /// addressed to
    pub fn publish(&self, message: ControlMessage) -> usize {
        let destination = message.destination();
        let mut delivered = 0;

        for route in self.routes.iter() {
            match route.tx.try_send(message.clone()) {
                Ok(()) if message.is_mine(route.owner) => {
                    delivered += 1;
                    self.metrics.inc_delivered();
                    trace!(owner = %route.owner, command = ?message.command(), "Control message delivered");
                }
                Ok(()) => {}
                Err(_) => {
                    self.metrics.inc_dropped();
                    debug!(owner = %route.owner, command = ?message.command(), "Inbox closed, message dropped");
                }
            }
        }

        if delivered == 0 && destination != Destination::Broadcast {
            self.metrics.inc_dropped();
            warn!(
                destination = %destination,
                command = ?message.command(),
                "No inbox for destination, message dropped"
            );
        }
        self.metrics
            .set_queue_len(self.routes.iter().map(|r| r.tx.len()).sum());
        delivered
    }

    /// Publish `command` to its default destination
    pub fn send(&self, command: Command) -> usize {
        self.publish(ControlMessage::new(command))
    }

    pub fn metrics(&self) -> &Arc<QueueMetrics> {
        &self.metrics
    }
}

/// Receiving side owned by exactly one component
pub struct Inbox {
    owner: Destination,
    rx: Receiver<ControlMessage>,
}

impl Inbox {
    pub fn owner(&self) -> Destination {
        self.owner
    }

    /// Take every pending message addressed to this component without waiting
    pub fn drain(&self) -> Vec<ControlMessage> {
        let mut messages = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(message) => {
                    if let Some(message) = self.accept(message) {
                        messages.push(message);
                    }
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        messages
    }

    /// Wait for the next message addressed to this component
    pub async fn recv(&self) -> Result<ControlMessage, BusError> {
        loop {
            let message = self.rx.recv().await.map_err(|_| BusError::Closed {
                destination: self.owner,
            })?;
            if let Some(message) = self.accept(message) {
                return Ok(message);
            }
        }
    }

    fn accept(&self, message: ControlMessage) -> Option<ControlMessage> {
        if message.is_mine(self.owner) {
            Some(message)
        } else {
            debug!(
                owner = %self.owner,
                destination = %message.destination(),
                "Ignoring message for another component"
            );
            None
        }
    }
}
