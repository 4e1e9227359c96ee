//! Process-wide cap on simultaneous connect handshakes.
//!
//! The device's SSH daemon drops connections once too many handshakes are in
//! flight, so every session and every transient export connection takes a slot
//! before connecting and gives it back once the handshake is done. Transports whose
//! operations each log in again take a slot per operation as well.

use std::sync::Arc;

use dashlink_common::config::DEFAULT_MAX_CONNECTIONS;
use dashlink_common::error::LimiterClosed;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Cloneable handle; clones share the same slots.
#[derive(Debug, Clone)]
pub struct ConnectionLimiter {
    slots: Arc<Semaphore>,
    capacity: usize,
}

/// Held for the duration of one handshake, released on drop.
#[derive(Debug)]
pub struct ConcurrencySlot {
    _permit: OwnedSemaphorePermit,
}

impl ConnectionLimiter {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Waits until a slot is free. Waiters are served in order.
    pub async fn acquire(&self) -> Result<ConcurrencySlot, LimiterClosed> {
        let permit = self
            .slots
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| LimiterClosed)?;
        Ok(ConcurrencySlot { _permit: permit })
    }

    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Fails all current and future waiters.
    pub fn close(&self) {
        self.slots.close();
    }
}

impl Default for ConnectionLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONNECTIONS)
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn default_capacity_is_ten() {
        let limiter = ConnectionLimiter::default();
        assert_eq!(limiter.capacity(), 10);
        assert_eq!(limiter.available(), 10);
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        assert_eq!(ConnectionLimiter::new(0).capacity(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn acquire_waits_for_a_released_slot() {
        let limiter = ConnectionLimiter::new(1);
        let held = limiter.acquire().await.unwrap();
        assert_eq!(limiter.available(), 0);

        let blocked = tokio::time::timeout(Duration::from_millis(50), limiter.acquire()).await;
        assert!(blocked.is_err(), "second acquire must wait while the slot is held");

        drop(held);
        let slot = tokio::time::timeout(Duration::from_millis(50), limiter.acquire()).await;
        assert!(matches!(slot, Ok(Ok(_))));
    }

    #[tokio::test]
    async fn clones_share_slots() {
        let limiter = ConnectionLimiter::new(2);
        let other = limiter.clone();
        let _slot = other.acquire().await.unwrap();
        assert_eq!(limiter.available(), 1);
    }

    #[tokio::test]
    async fn closed_limiter_rejects_waiters() {
        let limiter = ConnectionLimiter::new(1);
        limiter.close();
        assert_eq!(limiter.acquire().await.unwrap_err(), LimiterClosed);
    }
}
