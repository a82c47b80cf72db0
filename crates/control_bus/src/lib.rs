//! # Control Bus
//!
//! Message plumbing between the acquisition loop, the data logger and the
//! outside world.
//!
//! Responsibilities:
//! - Route addressed `ControlMessage`s to per-component inboxes
//! - Fan out `Broadcast` messages
//! - Carry data and status messages to display consumers without blocking
//!   the producers

pub mod bus;
pub mod error;
pub mod metrics;
pub mod monitor;
pub mod outbound;

pub use bus::{ControlBus, ControlBusBuilder, Inbox};
pub use contracts::{ControlMessage, Outbound};
pub use error::BusError;
pub use metrics::{MetricsSnapshot, QueueMetrics};
pub use monitor::{MonitorHandle, MonitorSnapshot, StatusMonitor};
pub use outbound::{outbound, OutboundReceiver, OutboundSender};
