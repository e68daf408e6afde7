//! The reflector loop.
//!
//! [`Reflector`] wakes on a fixed cadence (and whenever the ingress
//! endpoint nudges it), takes the pending [`RoomUpdate`] once the update
//! interval has elapsed, and mirrors it into the card message:
//!
//! 1. No known message: create one and persist its identity.
//! 2. Known message: fetch it, then edit it in place.
//! 3. Known message was deleted: create a replacement and persist the new
//!    identity.
//!
//! A failed publish puts the update back into the slot and leaves the
//! rate-limit clock untouched, so the same payload is retried on a later
//! tick. Nothing that happens during a tick stops the loop.
//!
//! [`RoomUpdate`]: crate::update::RoomUpdate

use std::future::Future;
use std::sync::Arc;

use chrono::Local;
use tokio::time::{Duration, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::publish::{PublishError, Publisher};
use crate::render::{CardTemplate, EmbedCard};
use crate::state::{Pending, ReflectorState};
use crate::store::IdentityStore;
use crate::update::MessageId;

/// What a single [`Reflector::tick`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// No update was pending.
    Idle,
    /// An update is pending but the update interval has not elapsed.
    NotDue {
        /// Time left until the update becomes publishable.
        remaining: Duration,
    },
    /// No message was known, so a new one was posted.
    Created(MessageId),
    /// The known message was edited in place.
    Edited(MessageId),
    /// The known message had been deleted and was replaced.
    Recreated {
        /// Identity of the vanished message.
        previous: MessageId,
        /// Identity of the replacement.
        current: MessageId,
    },
    /// Publishing failed; the update stays pending.
    Failed(PublishError),
}

/// Polling task that mirrors the pending update into the card message.
pub struct Reflector<P, S> {
    state: Arc<ReflectorState>,
    publisher: P,
    store: S,
    template: CardTemplate,
    tick_interval: Duration,
    message_id: Option<MessageId>,
}

impl<P, S> Reflector<P, S>
where
    P: Publisher,
    S: IdentityStore,
{
    /// Create a reflector in the "no known message" state.
    ///
    /// Call [`Self::bootstrap`] before the first tick to pick up an
    /// identity persisted by a previous run.
    pub const fn new(
        state: Arc<ReflectorState>,
        publisher: P,
        store: S,
        template: CardTemplate,
        tick_interval: Duration,
    ) -> Self {
        Self {
            state,
            publisher,
            store,
            template,
            tick_interval,
            message_id: None,
        }
    }

    /// Identity of the card message, if one is known.
    pub const fn message_id(&self) -> Option<&MessageId> {
        self.message_id.as_ref()
    }

    /// Load the persisted message identity.
    ///
    /// An unreadable store is logged and treated as empty; the first
    /// publish then creates a fresh card.
    pub async fn bootstrap(&mut self) {
        match self.store.load().await {
            Ok(Some(id)) => {
                info!(message_id = %id, "Resuming existing card message");
                self.message_id = Some(id);
            }
            Ok(None) => {
                info!("No card message recorded, will create one on first publish");
            }
            Err(e) => {
                warn!(error = %e, "Failed to load card message identity, starting fresh");
            }
        }
    }

    /// Run one reflector step at time `now`.
    pub async fn tick(&mut self, now: Instant) -> TickOutcome {
        let update = match self.state.take_pending_if_due(now) {
            Pending::Empty => return TickOutcome::Idle,
            Pending::NotDue { remaining } => return TickOutcome::NotDue { remaining },
            Pending::Due(update) => update,
        };

        let card = self.template.render(&update, Local::now().naive_local());

        match self.publish(&card).await {
            Ok(outcome) => {
                self.state.record_publish(now);
                outcome
            }
            Err(e) => {
                self.state.requeue(update);
                TickOutcome::Failed(e)
            }
        }
    }

    /// Tick on the configured cadence until `shutdown` resolves.
    ///
    /// A nudge from the ingress endpoint triggers an extra tick. A publish
    /// in progress always completes before shutdown is observed.
    pub async fn run_until<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let state = Arc::clone(&self.state);
        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(
            tick_interval_ms = self.tick_interval.as_millis(),
            update_interval_ms = state.update_interval().as_millis(),
            "Reflector loop started"
        );

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("Reflector loop stopping");
                    return;
                }
                _ = ticker.tick() => {}
                () = state.nudged() => {
                    debug!("Reflector woken by ingress");
                }
            }

            let outcome = self.tick(Instant::now()).await;
            log_outcome(&outcome);
        }
    }

    async fn publish(&mut self, card: &EmbedCard) -> Result<TickOutcome, PublishError> {
        let Some(id) = self.message_id.clone() else {
            let id = self.create(card).await?;
            return Ok(TickOutcome::Created(id));
        };

        match self.edit_existing(&id, card).await {
            Ok(()) => Ok(TickOutcome::Edited(id)),
            Err(PublishError::NotFound) => {
                warn!(message_id = %id, "Card message was deleted, recreating");
                self.message_id = None;
                let current = self.create(card).await?;
                Ok(TickOutcome::Recreated {
                    previous: id,
                    current,
                })
            }
            Err(e) => Err(e),
        }
    }

    async fn edit_existing(&self, id: &MessageId, card: &EmbedCard) -> Result<(), PublishError> {
        self.publisher.fetch_message(id).await?;
        self.publisher.edit_message(id, card).await
    }

    async fn create(&mut self, card: &EmbedCard) -> Result<MessageId, PublishError> {
        let id = self.publisher.create_message(card).await?;
        self.message_id = Some(id.clone());

        // The message exists either way; a failed save only costs a
        // duplicate card after the next restart.
        if let Err(e) = self.store.save(&id).await {
            error!(message_id = %id, error = %e, "Failed to persist card message identity");
        }

        Ok(id)
    }
}

fn log_outcome(outcome: &TickOutcome) {
    match outcome {
        TickOutcome::Idle => {}
        TickOutcome::NotDue { remaining } => {
            debug!(remaining_ms = remaining.as_millis(), "Update pending, interval not elapsed");
        }
        TickOutcome::Created(id) => info!(message_id = %id, "Card message created"),
        TickOutcome::Edited(id) => info!(message_id = %id, "Card message updated"),
        TickOutcome::Recreated { previous, current } => {
            info!(previous = %previous, message_id = %current, "Card message recreated");
        }
        TickOutcome::Failed(e) => {
            error!(error = %e, "Failed to publish card, will retry");
        }
    }
}
