//! At-least-once message queue adapter.
//!
//! A simple enqueue / batch-consume / ack / redeliver contract shared by the
//! three durable queues (jobs, scrape tasks, healing tasks). A message taken
//! by `consume_batch` is
//! invisible to further consumers until it is acked or redelivered;
//! consumers are responsible for idempotency keyed by message id, since a
//! crash between dequeue and ack redelivers it.

use std::collections::{HashMap, VecDeque};
use tokio::sync::Mutex;
use uuid::Uuid;

/// A message handed to a consumer, carrying the delivery handle needed to
/// ack or redeliver it.
#[derive(Debug, Clone)]
pub struct Delivery<T> {
    pub delivery_id: String,
    pub message: T,
}

struct Inner<T> {
    pending: VecDeque<T>,
    in_flight: HashMap<String, T>,
}

/// A single named queue of messages of type `T`.
pub struct Queue<T> {
    name: String,
    inner: Mutex<Inner<T>>,
}

impl<T: Clone + Send + 'static> Queue<T> {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: Mutex::new(Inner {
                pending: VecDeque::new(),
                in_flight: HashMap::new(),
            }),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn enqueue(&self, message: T) {
        self.inner.lock().await.pending.push_back(message);
    }

    /// Pop up to `max` pending messages, marking each in-flight until acked
    /// or redelivered.
    pub async fn consume_batch(&self, max: usize) -> Vec<Delivery<T>> {
        let mut inner = self.inner.lock().await;
        let mut out = Vec::with_capacity(max.min(inner.pending.len()));
        for _ in 0..max {
            let Some(message) = inner.pending.pop_front() else {
                break;
            };
            let delivery_id = Uuid::new_v4().to_string();
            inner.in_flight.insert(delivery_id.clone(), message.clone());
            out.push(Delivery { delivery_id, message });
        }
        out
    }

    /// Confirm successful processing; the message is dropped for good.
    pub async fn ack(&self, delivery_id: &str) {
        self.inner.lock().await.in_flight.remove(delivery_id);
    }

    /// Return the message to the back of the pending queue for another
    /// consumer to pick up.
    pub async fn redeliver(&self, delivery_id: &str) {
        let mut inner = self.inner.lock().await;
        if let Some(message) = inner.in_flight.remove(delivery_id) {
            inner.pending.push_back(message);
        }
    }

    pub async fn pending_len(&self) -> usize {
        self.inner.lock().await.pending.len()
    }

    pub async fn in_flight_len(&self) -> usize {
        self.inner.lock().await.in_flight.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn enqueue_then_consume_in_order() {
        let q: Queue<i32> = Queue::new("test");
        q.enqueue(1).await;
        q.enqueue(2).await;
        let batch = q.consume_batch(10).await;
        assert_eq!(batch.iter().map(|d| d.message).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(q.in_flight_len().await, 2);
    }

    #[tokio::test]
    async fn ack_removes_from_in_flight() {
        let q: Queue<i32> = Queue::new("test");
        q.enqueue(1).await;
        let batch = q.consume_batch(10).await;
        q.ack(&batch[0].delivery_id).await;
        assert_eq!(q.in_flight_len().await, 0);
        assert_eq!(q.pending_len().await, 0);
    }

    #[tokio::test]
    async fn redeliver_returns_message_to_pending() {
        let q: Queue<i32> = Queue::new("test");
        q.enqueue(1).await;
        let batch = q.consume_batch(10).await;
        q.redeliver(&batch[0].delivery_id).await;
        assert_eq!(q.pending_len().await, 1);
        assert_eq!(q.in_flight_len().await, 0);
    }

    #[tokio::test]
    async fn consume_batch_respects_max() {
        let q: Queue<i32> = Queue::new("test");
        for i in 0..5 {
            q.enqueue(i).await;
        }
        let batch = q.consume_batch(3).await;
        assert_eq!(batch.len(), 3);
        assert_eq!(q.pending_len().await, 2);
    }
}
