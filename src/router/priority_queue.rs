use crate::error::{OrchestratorError, Result};
use crate::models::Message;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

struct QueuedMessage {
    message: Message,
    priority: i32,
    enqueued_at: DateTime<Utc>,
}

impl PartialEq for QueuedMessage {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.enqueued_at == other.enqueued_at
    }
}
impl Eq for QueuedMessage {}

impl PartialOrd for QueuedMessage {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedMessage {
    /// `BinaryHeap` is a max-heap, so to pop in "priority desc, timestamp
    /// asc" order: higher priority ranks greater, and for equal priority an
    /// earlier timestamp must also rank greater (reversed comparison).
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.enqueued_at.cmp(&self.enqueued_at))
    }
}

/// Bounded priority queue of in-flight messages, ordered by priority then
/// FIFO within a priority tier.
pub struct PriorityQueue {
    heap: Arc<Mutex<BinaryHeap<QueuedMessage>>>,
    max_size: usize,
}

impl PriorityQueue {
    pub fn new(max_size: usize) -> Self {
        Self {
            heap: Arc::new(Mutex::new(BinaryHeap::new())),
            max_size,
        }
    }

    pub async fn enqueue(&self, message: Message, priority: i32) -> Result<()> {
        let mut heap = self.heap.lock().await;
        if heap.len() >= self.max_size {
            return Err(OrchestratorError::Concurrency(format!(
                "message queue full (max: {})",
                self.max_size
            )));
        }
        heap.push(QueuedMessage {
            message,
            priority,
            enqueued_at: Utc::now(),
        });
        debug!(queue_len = heap.len(), "message enqueued");
        Ok(())
    }

    pub async fn dequeue(&self) -> Option<Message> {
        let mut heap = self.heap.lock().await;
        heap.pop().map(|q| q.message)
    }

    pub async fn len(&self) -> usize {
        self.heap.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn clear(&self) {
        let mut heap = self.heap.lock().await;
        let count = heap.len();
        heap.clear();
        info!(count, "cleared message queue");
    }
}
