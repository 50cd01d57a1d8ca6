//! FIFO queue of requests waiting for the engine to become ready.

use crate::error::{EngineError, Result};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;

struct Waiter {
    id: u64,
    timeout: Duration,
    deadline: Instant,
    signal: oneshot::Sender<Result<()>>,
}

/// Readiness waiters, released or failed in arrival order.
#[derive(Default)]
pub struct ReadinessQueue {
    next_id: u64,
    waiters: VecDeque<Waiter>,
}

impl ReadinessQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a waiter that gives up after `timeout`.
    ///
    /// Waiters already past their deadline are dropped first.
    pub fn enqueue(&mut self, timeout: Duration) -> (u64, oneshot::Receiver<Result<()>>) {
        self.expire(Instant::now());
        let (signal, receiver) = oneshot::channel();
        let id = self.next_id;
        self.next_id += 1;
        self.waiters.push_back(Waiter {
            id,
            timeout,
            deadline: Instant::now() + timeout,
            signal,
        });
        (id, receiver)
    }

    /// Resolves every waiter successfully. Returns how many were released.
    pub fn release_all(&mut self) -> usize {
        let count = self.waiters.len();
        for waiter in self.waiters.drain(..) {
            let _ = waiter.signal.send(Ok(()));
        }
        count
    }

    /// Rejects every waiter with `error`. Returns how many were failed.
    pub fn fail_all(&mut self, error: &EngineError) -> usize {
        let count = self.waiters.len();
        for waiter in self.waiters.drain(..) {
            let _ = waiter.signal.send(Err(error.clone()));
        }
        count
    }

    /// Withdraws a waiter. Returns false if it was already resolved.
    pub fn remove(&mut self, id: u64) -> bool {
        let before = self.waiters.len();
        self.waiters.retain(|waiter| waiter.id != id);
        before != self.waiters.len()
    }

    /// Rejects waiters whose deadline has passed.
    pub fn expire(&mut self, now: Instant) -> usize {
        let mut expired = 0;
        let mut kept = VecDeque::with_capacity(self.waiters.len());
        for waiter in self.waiters.drain(..) {
            if waiter.deadline <= now {
                expired += 1;
                let _ = waiter
                    .signal
                    .send(Err(EngineError::ReadinessTimeout(waiter.timeout)));
            } else {
                kept.push_back(waiter);
            }
        }
        self.waiters = kept;
        expired
    }

    pub fn len(&self) -> usize {
        self.waiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_release_in_arrival_order() {
        let mut queue = ReadinessQueue::new();
        let (_, mut first) = queue.enqueue(Duration::from_secs(5));
        let (_, mut second) = queue.enqueue(Duration::from_secs(5));
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.release_all(), 2);
        assert!(queue.is_empty());
        assert_eq!(first.try_recv().unwrap(), Ok(()));
        assert_eq!(second.try_recv().unwrap(), Ok(()));
    }

    #[tokio::test]
    async fn test_fail_all_shares_error() {
        let mut queue = ReadinessQueue::new();
        let (_, mut a) = queue.enqueue(Duration::from_secs(5));
        let (_, mut b) = queue.enqueue(Duration::from_secs(5));

        queue.fail_all(&EngineError::ProcessExited);
        assert_eq!(a.try_recv().unwrap(), Err(EngineError::ProcessExited));
        assert_eq!(b.try_recv().unwrap(), Err(EngineError::ProcessExited));
    }

    #[tokio::test]
    async fn test_remove_withdraws_only_once() {
        let mut queue = ReadinessQueue::new();
        let (id, _rx) = queue.enqueue(Duration::from_secs(5));
        assert!(queue.remove(id));
        assert!(!queue.remove(id));
        assert_eq!(queue.release_all(), 0);
    }

    #[tokio::test]
    async fn test_expired_waiters_are_rejected() {
        let mut queue = ReadinessQueue::new();
        let (_, mut stale) = queue.enqueue(Duration::ZERO);
        let (_, mut fresh) = queue.enqueue(Duration::from_secs(60));

        // The second enqueue already swept the zero-timeout waiter.
        assert_eq!(queue.len(), 1);
        assert!(matches!(
            stale.try_recv().unwrap(),
            Err(EngineError::ReadinessTimeout(_))
        ));
        assert!(fresh.try_recv().is_err());
    }
}
