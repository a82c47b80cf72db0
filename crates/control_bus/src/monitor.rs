//! StatusMonitor - logs outbound traffic and keeps the latest status per kind
//!
//! Stands in for a display consumer: it drains the outbound queue, reports
//! link and logger transitions, and exposes a snapshot for the CLI.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use contracts::{Outbound, StatusKind, StatusReport};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, trace, warn};

use crate::outbound::OutboundReceiver;

#[derive(Debug, Clone, Default)]
pub struct MonitorSnapshot {
    pub data_messages: u64,
    pub status_messages: u64,
    /// Counter of the most recent data message
    pub last_counter: Option<u64>,
    pub latest: HashMap<StatusKind, StatusReport>,
}

impl MonitorSnapshot {
    pub fn is_ok(&self, kind: StatusKind) -> Option<bool> {
        self.latest.get(&kind).map(|r| r.ok)
    }
}

/// Read-only view shared with the rest of the process
#[derive(Debug, Clone, Default)]
pub struct MonitorHandle {
    state: Arc<Mutex<MonitorSnapshot>>,
}

impl MonitorHandle {
    fn lock(&self) -> MutexGuard<'_, MonitorSnapshot> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> MonitorSnapshot {
        self.lock().clone()
    }
}

pub struct StatusMonitor {
    rx: OutboundReceiver,
    handle: MonitorHandle,
}

impl StatusMonitor {
    pub fn new(rx: OutboundReceiver) -> Self {
        Self {
            rx,
            handle: MonitorHandle::default(),
        }
    }

    pub fn handle(&self) -> MonitorHandle {
        self.handle.clone()
    }

    /// Consume until every outbound sender is dropped
    #[instrument(name = "status_monitor_run", skip(self))]
    pub async fn run(self) {
        info!("Status monitor started");
        while let Some(message) = self.rx.recv().await {
            self.observe(message);
        }
        let snapshot = self.handle.snapshot();
        info!(
            data = snapshot.data_messages,
            status = snapshot.status_messages,
            "Outbound queue closed, status monitor stopped"
        );
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    fn observe(&self, message: Outbound) {
        let mut state = self.handle.lock();
        match message {
            Outbound::Data(data) => {
                state.data_messages += 1;
                state.last_counter = Some(data.counter);
                trace!(
                    sensor_id = %data.sensor_id,
                    value = %data.value,
                    counter = data.counter,
                    "Sensor data"
                );
            }
            Outbound::Status(message) => {
                state.status_messages += 1;
                let Some(report) = message.status_report() else {
                    debug!(command = ?message.command(), "Status message without report");
                    return;
                };
                let changed = state.is_ok(report.kind) != Some(report.ok);
                if changed {
                    if report.ok {
                        info!(kind = ?report.kind, description = %report.description, "Status changed");
                    } else {
                        warn!(kind = ?report.kind, description = %report.description, "Status changed");
                    }
                } else {
                    debug!(
                        kind = ?report.kind,
                        ok = report.ok,
                        file_name = ?report.file_name,
                        file_size_mb = ?report.file_size_mb,
                        "Status heartbeat"
                    );
                }
                state.latest.insert(report.kind, report.clone());
            }
        }
    }
}
