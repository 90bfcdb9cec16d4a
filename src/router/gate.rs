use std::sync::Arc;
use tokio::sync::{Semaphore, SemaphorePermit};

/// Bounds how many messages the router dispatches concurrently, independent
/// of the priority queue's storage cap. Acquiring a permit blocks until a
/// slot frees, giving natural backpressure instead of spawning unbounded
/// dispatch tasks.
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
}

impl ConcurrencyGate {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    pub async fn acquire(&self) -> SemaphorePermit<'_> {
        self.semaphore
            .acquire()
            .await
            .expect("gate semaphore is never closed")
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn limits_concurrent_holders() {
        let gate = ConcurrencyGate::new(2);
        assert_eq!(gate.available_permits(), 2);

        let p1 = gate.acquire().await;
        let p2 = gate.acquire().await;
        assert_eq!(gate.available_permits(), 0);

        drop(p1);
        assert_eq!(gate.available_permits(), 1);
        drop(p2);
        assert_eq!(gate.available_permits(), 2);
    }
}
