//! Per-patient turn serialization.
//!
//! Turns for the same external id run one at a time, in the order they
//! reached the gate (tokio's mutex is FIFO). Different ids never contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Slots = Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>;

/// Keyed lock table. Entries live only while a turn holds or awaits them.
#[derive(Default, Clone)]
pub struct TurnGate {
    slots: Slots,
}

/// Held for the duration of a turn.
pub struct TurnPermit {
    key: String,
    slots: Slots,
    guard: Option<OwnedMutexGuard<()>>,
}

impl TurnGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other turn for `key` is running.
    pub async fn enter(&self, key: &str) -> TurnPermit {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(slots.entry(key.to_string()).or_default())
        };
        let guard = slot.lock_owned().await;
        TurnPermit {
            key: key.to_string(),
            slots: Arc::clone(&self.slots),
            guard: Some(guard),
        }
    }

    /// Number of ids with a running or waiting turn.
    pub fn active_keys(&self) -> usize {
        self.slots.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Drop for TurnPermit {
    fn drop(&mut self) {
        // Release first so the strong count below only sees the map and waiters.
        self.guard.take();
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        let idle = slots
            .get(&self.key)
            .is_some_and(|slot| Arc::strong_count(slot) == 1);
        if idle {
            slots.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_key_waits_for_previous_turn() {
        let gate = TurnGate::new();
        let first = gate.enter("+1").await;

        let gate2 = gate.clone();
        let mut second = tokio::spawn(async move {
            let _permit = gate2.enter("+1").await;
        });

        // Still blocked while the first permit is alive.
        assert!(
            tokio::time::timeout(Duration::from_millis(50), &mut second)
                .await
                .is_err()
        );

        drop(first);
        tokio::time::timeout(Duration::from_secs(1), second)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn different_keys_do_not_contend() {
        let gate = TurnGate::new();
        let _a = gate.enter("+1").await;
        let b = tokio::time::timeout(Duration::from_millis(100), gate.enter("+2")).await;
        assert!(b.is_ok());
        assert_eq!(gate.active_keys(), 2);
    }

    #[tokio::test]
    async fn entries_are_removed_when_idle() {
        let gate = TurnGate::new();
        {
            let _permit = gate.enter("+1").await;
            assert_eq!(gate.active_keys(), 1);
        }
        assert_eq!(gate.active_keys(), 0);
    }
}
