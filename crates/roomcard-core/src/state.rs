//! Shared state between the ingress endpoint and the reflector.
//!
//! [`ReflectorState`] owns the single pending-update slot and the
//! timestamp of the last successful publish. The ingress handler only
//! ever calls [`ReflectorState::set_pending`]; the reflector drains the
//! slot with [`ReflectorState::take_pending_if_due`] and reports back
//! with [`ReflectorState::record_publish`] or [`ReflectorState::requeue`].
//!
//! # Concurrency
//!
//! Handlers and the reflector run on the multi-threaded Tokio runtime, so
//! the slot sits behind a [`std::sync::Mutex`]. The lock is only held for
//! the replace/take steps and never across an `.await`.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use tokio::time::{Duration, Instant};

use crate::update::RoomUpdate;

/// Result of asking the state for a publishable update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pending {
    /// Nothing has arrived since the last successful publish.
    Empty,
    /// An update is waiting but the update interval has not elapsed.
    NotDue {
        /// Time left until the update becomes publishable.
        remaining: Duration,
    },
    /// The update was removed from the slot and should be published now.
    Due(RoomUpdate),
}

#[derive(Debug, Default)]
struct Slot {
    pending: Option<RoomUpdate>,
    last_publish: Option<Instant>,
}

/// Pending-update slot and rate-limit clock.
///
/// Wrapped in [`std::sync::Arc`] and shared by the ingress handler and the
/// reflector task.
#[derive(Debug)]
pub struct ReflectorState {
    slot: Mutex<Slot>,
    update_interval: Duration,
    nudge: Notify,
}

impl ReflectorState {
    /// Create an empty state that allows one publish per `update_interval`.
    ///
    /// No publish has happened yet, so the first pending update is due
    /// immediately.
    pub fn new(update_interval: Duration) -> Self {
        Self {
            slot: Mutex::new(Slot::default()),
            update_interval,
            nudge: Notify::new(),
        }
    }

    /// Minimum spacing between two successful publishes.
    pub const fn update_interval(&self) -> Duration {
        self.update_interval
    }

    /// Replace the pending update with `update`.
    ///
    /// Returns `true` if an unconsumed update was overwritten.
    pub fn set_pending(&self, update: RoomUpdate) -> bool {
        self.lock().pending.replace(update).is_some()
    }

    /// Return a copy of the pending update, if any.
    pub fn pending(&self) -> Option<RoomUpdate> {
        self.lock().pending.clone()
    }

    /// Time of the last successful publish, or `None` if there was none.
    pub fn last_publish(&self) -> Option<Instant> {
        self.lock().last_publish
    }

    /// Take the pending update if at least one update interval has passed
    /// since the last successful publish.
    ///
    /// The slot is emptied only when [`Pending::Due`] is returned. If the
    /// publish then fails, hand the update back with [`Self::requeue`].
    pub fn take_pending_if_due(&self, now: Instant) -> Pending {
        let mut slot = self.lock();
        if slot.pending.is_none() {
            return Pending::Empty;
        }

        let elapsed = slot
            .last_publish
            .map(|last| now.saturating_duration_since(last));
        if let Some(elapsed) = elapsed {
            if elapsed < self.update_interval {
                return Pending::NotDue {
                    remaining: self.update_interval.saturating_sub(elapsed),
                };
            }
        }

        slot.pending.take().map_or(Pending::Empty, Pending::Due)
    }

    /// Put back an update whose publish failed.
    ///
    /// A newer update that arrived while the publish was in flight wins;
    /// in that case `update` is dropped.
    pub fn requeue(&self, update: RoomUpdate) {
        let mut slot = self.lock();
        if slot.pending.is_none() {
            slot.pending = Some(update);
        }
    }

    /// Mark a successful publish at `at`, starting a new update interval.
    pub fn record_publish(&self, at: Instant) {
        self.lock().last_publish = Some(at);
    }

    /// Ask the reflector to run a tick without waiting for its cadence.
    ///
    /// If the reflector is busy the wakeup is remembered and delivered on
    /// its next wait.
    pub fn nudge(&self) {
        self.nudge.notify_one();
    }

    /// Wait for the next [`Self::nudge`].
    pub async fn nudged(&self) {
        self.nudge.notified().await;
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        // The slot holds plain data, so a panic elsewhere cannot leave it
        // half-written.
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
