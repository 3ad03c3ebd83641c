//! In-memory channel-backed message source.
//!
//! [`QueueSource`] is the transport seam: a caller embedding the pipeline
//! pushes messages through a [`QueueProducer`] and the ingestion loop
//! pulls them like any other source. Each pushed message hands back an
//! [`AckProbe`] so the producer (or a test) can observe whether the
//! message was acknowledged.

use super::{Acknowledge, InboundMessage, MessageSource};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

struct QueuedMessage {
    payload: Vec<u8>,
    origin_timestamp: Option<String>,
    acked: Arc<AtomicBool>,
}

/// Observer for a pushed message's acknowledgment state.
#[derive(Clone)]
pub struct AckProbe {
    acked: Arc<AtomicBool>,
}

impl AckProbe {
    /// Whether the message has been acknowledged.
    pub fn is_acked(&self) -> bool {
        self.acked.load(Ordering::SeqCst)
    }
}

struct QueueAck {
    acked: Arc<AtomicBool>,
}

#[async_trait]
impl Acknowledge for QueueAck {
    async fn ack(self: Box<Self>) -> Result<()> {
        self.acked.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Producer half of an in-memory queue source.
#[derive(Clone)]
pub struct QueueProducer {
    tx: mpsc::Sender<QueuedMessage>,
}

impl QueueProducer {
    /// Push a message into the queue.
    ///
    /// Returns a probe that reports when the ingestion loop has
    /// acknowledged the message.
    pub async fn push(
        &self,
        payload: Vec<u8>,
        origin_timestamp: Option<String>,
    ) -> Result<AckProbe> {
        let acked = Arc::new(AtomicBool::new(false));
        let probe = AckProbe {
            acked: Arc::clone(&acked),
        };
        self.tx
            .send(QueuedMessage {
                payload,
                origin_timestamp,
                acked,
            })
            .await
            .map_err(|_| Error::Source("queue receiver dropped".to_string()))?;
        Ok(probe)
    }
}

/// Consumer half of an in-memory queue source.
pub struct QueueSource {
    rx: mpsc::Receiver<QueuedMessage>,
}

/// Create a connected producer/source pair with the given channel capacity.
pub fn queue_source(capacity: usize) -> (QueueProducer, QueueSource) {
    let (tx, rx) = mpsc::channel(capacity);
    (QueueProducer { tx }, QueueSource { rx })
}

impl QueueSource {
    fn into_inbound(msg: QueuedMessage) -> InboundMessage {
        InboundMessage::new(
            msg.payload,
            msg.origin_timestamp,
            Box::new(QueueAck { acked: msg.acked }),
        )
    }
}

#[async_trait]
impl MessageSource for QueueSource {
    fn name(&self) -> &'static str {
        "queue"
    }

    async fn fetch(&mut self, max: usize, wait: Duration) -> Result<Vec<InboundMessage>> {
        let first = match tokio::time::timeout(wait, self.rx.recv()).await {
            // Wait elapsed: no messages this round, caller rechecks its flag.
            Err(_) => return Ok(Vec::new()),
            // All producers dropped: the source will never yield again.
            Ok(None) => return Err(Error::SourceClosed),
            Ok(Some(msg)) => msg,
        };

        let mut messages = vec![Self::into_inbound(first)];
        while messages.len() < max {
            match self.rx.try_recv() {
                Ok(msg) => messages.push(Self::into_inbound(msg)),
                Err(_) => break,
            }
        }
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_returns_pushed_messages() {
        let (producer, mut source) = queue_source(16);
        producer
            .push(b"hello".to_vec(), Some("1700000000000000000".to_string()))
            .await
            .unwrap();

        let msgs = source.fetch(10, Duration::from_millis(100)).await.unwrap();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].payload, b"hello");
        assert_eq!(
            msgs[0].origin_timestamp.as_deref(),
            Some("1700000000000000000")
        );
    }

    #[tokio::test]
    async fn test_fetch_drains_up_to_max() {
        let (producer, mut source) = queue_source(16);
        for i in 0..5u8 {
            producer.push(vec![i], None).await.unwrap();
        }

        let msgs = source.fetch(3, Duration::from_millis(100)).await.unwrap();
        assert_eq!(msgs.len(), 3);

        let rest = source.fetch(10, Duration::from_millis(100)).await.unwrap();
        assert_eq!(rest.len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_times_out_empty() {
        let (_producer, mut source) = queue_source(16);
        let msgs = source.fetch(10, Duration::from_millis(10)).await.unwrap();
        assert!(msgs.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_reports_closed() {
        let (producer, mut source) = queue_source(16);
        drop(producer);
        let err = source
            .fetch(10, Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SourceClosed));
    }

    #[tokio::test]
    async fn test_ack_probe_observes_ack() {
        let (producer, mut source) = queue_source(16);
        let probe = producer.push(b"x".to_vec(), None).await.unwrap();
        assert!(!probe.is_acked());

        let mut msgs = source.fetch(1, Duration::from_millis(100)).await.unwrap();
        let msg = msgs.pop().unwrap();
        assert!(!probe.is_acked());

        msg.ack().await.unwrap();
        assert!(probe.is_acked());
    }

    #[tokio::test]
    async fn test_unacked_message_stays_unacked() {
        let (producer, mut source) = queue_source(16);
        let probe = producer.push(b"x".to_vec(), None).await.unwrap();

        let msgs = source.fetch(1, Duration::from_millis(100)).await.unwrap();
        drop(msgs);
        assert!(!probe.is_acked());
    }
}
