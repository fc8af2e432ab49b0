//! Serializing event queue.
//!
//! Feed callbacks may fire on any number of threads. Every publisher pushes
//! into one bounded channel and the single consumer drains it, so the graph is
//! only ever mutated from the propagation thread.

use crate::source::EventSource;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use openbook_core::{DepthEvent, Error, MarketEvent, Result, TradeEvent};
use std::time::Duration;
use tracing::{debug, warn};

/// Constructor for a publisher/consumer pair.
pub struct EventQueue;

impl EventQueue {
    /// Create a queue holding at most `capacity` undelivered events.
    pub fn bounded(capacity: usize) -> (EventPublisher, QueueSource) {
        let (tx, rx) = bounded(capacity);
        (EventPublisher { tx }, QueueSource { rx, endpoint: None })
    }
}

/// Producer handle; clone one per feed thread.
#[derive(Clone)]
pub struct EventPublisher {
    tx: Sender<MarketEvent>,
}

impl EventPublisher {
    /// Publish any market event, blocking while the queue is full.
    pub fn publish(&self, event: MarketEvent) -> Result<()> {
        self.tx
            .send(event)
            .map_err(|_| Error::data("event queue consumer has shut down"))
    }

    /// Depth callback.
    pub fn publish_depth(&self, depth: DepthEvent) -> Result<()> {
        self.publish(MarketEvent::Depth(depth))
    }

    /// Trade callback.
    pub fn publish_trade(&self, trade: TradeEvent) -> Result<()> {
        self.publish(MarketEvent::Trade(trade))
    }

    /// Events waiting to be consumed.
    pub fn backlog(&self) -> usize {
        self.tx.len()
    }
}

/// Consumer side of the queue.
pub struct QueueSource {
    rx: Receiver<MarketEvent>,
    endpoint: Option<String>,
}

impl QueueSource {
    /// Wait up to `timeout` for the next event.
    ///
    /// `Ok(None)` means nothing arrived in time; disconnection is an error.
    pub fn next_event_timeout(&mut self, timeout: Duration) -> Result<Option<MarketEvent>> {
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                Err(Error::data("all event publishers disconnected"))
            }
        }
    }

    /// Endpoint this consumer was connected to, if any.
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }
}

impl EventSource for QueueSource {
    fn connect(&mut self, endpoint: &str) -> Result<()> {
        if let Some(previous) = &self.endpoint {
            warn!(previous = %previous, endpoint, "Queue reconnected to a new endpoint");
        }
        self.endpoint = Some(endpoint.to_string());
        Ok(())
    }

    fn next_event(&mut self) -> Result<Option<MarketEvent>> {
        match self.rx.recv() {
            Ok(event) => Ok(Some(event)),
            Err(_) => {
                debug!("All publishers dropped, queue drained");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn trade(ts_ms: i64, price: f64) -> TradeEvent {
        TradeEvent {
            ts_ms,
            price,
            size: 1.0,
        }
    }

    #[test]
    fn test_single_consumer_sees_every_event() {
        let (publisher, mut source) = EventQueue::bounded(16);
        source.connect("wss://feed.test").unwrap();
        assert_eq!(source.endpoint(), Some("wss://feed.test"));

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let publisher = publisher.clone();
                thread::spawn(move || {
                    for i in 0..25 {
                        publisher.publish_trade(trade(t * 100 + i, 1.0)).unwrap();
                    }
                })
            })
            .collect();
        drop(publisher);

        let mut count = 0;
        while let Some(_event) = source.next_event().unwrap() {
            count += 1;
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(count, 100);
    }

    #[test]
    fn test_per_publisher_order_is_preserved() {
        let (publisher, mut source) = EventQueue::bounded(8);
        publisher
            .publish_depth(DepthEvent::top(1, 10, 100.0, 101.0))
            .unwrap();
        publisher.publish_trade(trade(11, 100.5)).unwrap();
        assert_eq!(publisher.backlog(), 2);
        drop(publisher);

        assert_eq!(source.next_event().unwrap().unwrap().ts_ms(), 10);
        assert_eq!(source.next_event().unwrap().unwrap().ts_ms(), 11);
        assert!(source.next_event().unwrap().is_none());
    }

    #[test]
    fn test_timeout_without_events() {
        let (_publisher, mut source) = EventQueue::bounded(1);
        let next = source
            .next_event_timeout(Duration::from_millis(5))
            .unwrap();
        assert!(next.is_none());
    }

    #[test]
    fn test_publish_after_consumer_dropped_fails() {
        let (publisher, source) = EventQueue::bounded(1);
        drop(source);
        assert!(publisher.publish_trade(trade(1, 1.0)).is_err());
    }
}
