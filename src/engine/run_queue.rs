use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use uuid::Uuid;

/// In-process, per-user bound on concurrently *running* tasks. Not
/// crash-durable: a process restart drops the map, and any task stuck in
/// `pending` simply waits for a future dispatch sweep or operator
/// intervention rather than resuming a queue position it never held
/// durably (spec §4.E Open Question resolution, see DESIGN.md).
pub struct RunQueue {
    semaphores: Mutex<HashMap<Uuid, Arc<Semaphore>>>,
    cap: NonZeroUsize,
}

impl RunQueue {
    #[must_use]
    pub fn new(cap: NonZeroUsize) -> Self {
        Self {
            semaphores: Mutex::new(HashMap::new()),
            cap,
        }
    }

    /// Waits for a free run slot for `user_id`. The returned permit must be
    /// held for the lifetime of the dispatched worker; dropping it frees the
    /// slot for the next queued task from the same user.
    pub async fn acquire(&self, user_id: Uuid) -> OwnedSemaphorePermit {
        let semaphore = {
            let mut semaphores = self.semaphores.lock().await;
            Arc::clone(
                semaphores
                    .entry(user_id)
                    .or_insert_with(|| Arc::new(Semaphore::new(self.cap.get()))),
            )
        };
        semaphore
            .acquire_owned()
            .await
            .expect("run queue semaphore is never closed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_acquire_for_same_user_waits_for_first_release() {
        let queue = RunQueue::new(NonZeroUsize::new(1).unwrap());
        let user_id = Uuid::new_v4();

        let first = queue.acquire(user_id).await;

        let queue = Arc::new(queue);
        let queue_clone = Arc::clone(&queue);
        let handle = tokio::spawn(async move {
            let _second = queue_clone.acquire(user_id).await;
        });

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!handle.is_finished(), "second acquire should still be waiting");

        drop(first);
        handle.await.expect("task completes after permit freed");
    }

    #[tokio::test]
    async fn different_users_do_not_contend() {
        let queue = RunQueue::new(NonZeroUsize::new(1).unwrap());
        let user_a = Uuid::new_v4();
        let user_b = Uuid::new_v4();

        let _permit_a = queue.acquire(user_a).await;
        let permit_b = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            queue.acquire(user_b),
        )
        .await;

        assert!(permit_b.is_ok(), "different users must not share a slot");
    }
}
