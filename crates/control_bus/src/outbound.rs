//! Outbound queue carrying data and status messages to display consumers
//!
//! The producer side never blocks: when the queue is full the message is
//! dropped and counted.

use std::sync::Arc;

use async_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use contracts::{ControlMessage, DataMessage, Outbound, StatusReport};
use tracing::{error, warn};

use crate::metrics::QueueMetrics;

/// Create a bounded outbound queue
pub fn outbound(capacity: usize) -> (OutboundSender, OutboundReceiver) {
    let (tx, rx) = bounded(capacity.max(1));
    let metrics = Arc::new(QueueMetrics::new());
    (
        OutboundSender {
            tx,
            metrics: Arc::clone(&metrics),
        },
        OutboundReceiver { rx, metrics },
    )
}

#[derive(Clone)]
pub struct OutboundSender {
    tx: Sender<Outbound>,
    metrics: Arc<QueueMetrics>,
}

impl OutboundSender {
    /// Queue `message` without blocking.
    ///
    /// Returns true if queued, false if the queue was full or closed.
    pub fn try_send(&self, message: Outbound) -> bool {
        match self.tx.try_send(message) {
            Ok(()) => {
                self.metrics.inc_delivered();
                self.metrics.set_queue_len(self.tx.len());
                true
            }
            Err(TrySendError::Full(message)) => {
                self.metrics.inc_dropped();
                match &message {
                    Outbound::Data(data) => warn!(
                        sensor_id = %data.sensor_id,
                        counter = data.counter,
                        "Outbound queue full, data dropped"
                    ),
                    Outbound::Status(status) => warn!(
                        command = ?status.command(),
                        "Outbound queue full, status dropped"
                    ),
                }
                false
            }
            Err(TrySendError::Closed(_)) => {
                self.metrics.inc_dropped();
                error!("Outbound queue closed");
                false
            }
        }
    }

    pub fn data(&self, data: DataMessage) -> bool {
        self.try_send(Outbound::Data(data))
    }

    pub fn status(&self, report: StatusReport) -> bool {
        self.try_send(Outbound::Status(ControlMessage::status(report)))
    }

    pub fn metrics(&self) -> &Arc<QueueMetrics> {
        &self.metrics
    }
}

pub struct OutboundReceiver {
    rx: Receiver<Outbound>,
    metrics: Arc<QueueMetrics>,
}

impl OutboundReceiver {
    /// Next message; `None` once every sender is gone and the queue is empty
    pub async fn recv(&self) -> Option<Outbound> {
        let message = self.rx.recv().await.ok();
        self.metrics.set_queue_len(self.rx.len());
        message
    }

    pub fn try_recv(&self) -> Option<Outbound> {
        match self.rx.try_recv() {
            Ok(message) => {
                self.metrics.set_queue_len(self.rx.len());
                Some(message)
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => None,
        }
    }

    /// Everything currently queued
    pub fn drain(&self) -> Vec<Outbound> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    pub fn metrics(&self) -> &Arc<QueueMetrics> {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{SensorValue, StatusKind};

    fn data(counter: u64) -> DataMessage {
        DataMessage {
            sensor_id: "RPM".into(),
            value: SensorValue::Number(900.0),
            raw: None,
            counter,
            acquisition_ms: 0.0,
        }
    }

    #[test]
    fn test_full_queue_drops_and_counts() {
        let (tx, rx) = outbound(2);
        assert!(tx.data(data(1)));
        assert!(tx.data(data(2)));
        assert!(!tx.data(data(3)));

        let snapshot = tx.metrics().snapshot();
        assert_eq!(snapshot.delivered, 2);
        assert_eq!(snapshot.dropped, 1);

        let received = rx.drain();
        assert_eq!(received.len(), 2);
        assert!(matches!(&received[0], Outbound::Data(d) if d.counter == 1));
    }

    #[test]
    fn test_status_is_wrapped_for_display() {
        let (tx, rx) = outbound(4);
        tx.status(StatusReport::new(StatusKind::Logger, false, "Logger stopped."));
        match rx.try_recv() {
            Some(Outbound::Status(message)) => {
                assert!(message.is_mine(contracts::Destination::Display));
                assert_eq!(message.status_report().unwrap().description, "Logger stopped.");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_recv_ends_when_senders_dropped() {
        let (tx, rx) = outbound(4);
        tx.data(data(7));
        drop(tx);
        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_none());
    }
}
