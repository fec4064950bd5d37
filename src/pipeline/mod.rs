use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::directory::CustomerDirectory;
use crate::events::{InboundEvent, MessageEvent, StatusEvent};
use crate::guard::{GuardConfig, IntakeGuard};
use crate::ledger::MessageLedger;
use crate::model::{Direction, MessageStatus, NewMessage};
use crate::outbound::OutboundChannel;
use crate::policy;
use crate::settings::SettingsHandle;
use crate::store::{CustomerStore, MessageStore, StatusOutcome};

/// Prune threshold for the per-sender lock map.
const MAX_SENDER_LOCKS: usize = 4096;

/// Terminal result for one event in a delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// Hard admission-control rejection; nothing was persisted.
    RateLimited,
    /// Redelivery of an already-recorded channel message id; no side effects.
    Duplicate,
    /// Message persisted; `replied` says whether an auto-reply went out.
    Recorded { replied: bool },
    /// Status event routed to the ledger.
    StatusRouted(StatusOutcome),
    /// This event failed in isolation; siblings were unaffected.
    Failed(String),
}

/// Orchestrates one webhook delivery end to end: guard → directory →
/// ledger → policy → outbound dispatch, with per-sender serialization.
pub struct IntakePipeline {
    directory: CustomerDirectory,
    ledger: MessageLedger,
    guard: IntakeGuard,
    settings: SettingsHandle,
    outbound: Arc<dyn OutboundChannel>,
    sender_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl IntakePipeline {
    pub fn new<S>(store: Arc<S>, settings: SettingsHandle, outbound: Arc<dyn OutboundChannel>) -> Self
    where
        S: CustomerStore + MessageStore + Send + Sync + 'static,
    {
        Self::with_guard(store, settings, outbound, GuardConfig::default())
    }

    pub fn with_guard<S>(
        store: Arc<S>,
        settings: SettingsHandle,
        outbound: Arc<dyn OutboundChannel>,
        guard_config: GuardConfig,
    ) -> Self
    where
        S: CustomerStore + MessageStore + Send + Sync + 'static,
    {
        Self {
            directory: CustomerDirectory::new(store.clone()),
            ledger: MessageLedger::new(store),
            guard: IntakeGuard::new(guard_config),
            settings,
            outbound,
            sender_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn ledger(&self) -> &MessageLedger {
        &self.ledger
    }

    pub fn directory(&self) -> &CustomerDirectory {
        &self.directory
    }

    /// Process every event in a delivery independently. One event's failure
    /// must not abort its siblings, so errors are folded into outcomes.
    pub async fn handle_delivery(&self, events: Vec<InboundEvent>) -> Vec<EventOutcome> {
        let mut outcomes = Vec::with_capacity(events.len());
        for event in events {
            let outcome = match event {
                InboundEvent::Message(msg) => match self.process_message(msg).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        error!("message event failed: {:#}", e);
                        EventOutcome::Failed(e.to_string())
                    }
                },
                InboundEvent::Status(status) => match self.process_status(&status).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        error!("status event failed: {:#}", e);
                        EventOutcome::Failed(e.to_string())
                    }
                },
            };
            outcomes.push(outcome);
        }
        outcomes
    }

    /// One inbound message: admission gate, identity, persistence,
    /// best-effort read receipt, reply decision, dispatch.
    async fn process_message(&self, event: MessageEvent) -> Result<EventOutcome> {
        // Serialize per sender; unrelated senders proceed concurrently.
        let lock = self.sender_lock(&event.sender);
        let _guard = lock.lock().await;

        let now = Utc::now();
        let verdict = self.guard.assess(&event.sender, &event.content, now);
        if !verdict.admitted {
            info!("rate limited: dropping event from {}", event.sender);
            return Ok(EventOutcome::RateLimited);
        }

        let customer = self
            .directory
            .resolve_or_create(&event.sender, event.profile_name.as_deref())
            .await?;

        let (incoming, inserted) = self
            .ledger
            .append(NewMessage {
                customer_id: customer.id,
                channel_message_id: event.channel_message_id.clone(),
                direction: Direction::Incoming,
                content_type: event.content_type,
                content: event.content.clone(),
                status: MessageStatus::Delivered,
                is_auto_reply: false,
                reply_to: event.reply_to.clone(),
            })
            .await?;
        if !inserted {
            // Redelivered webhook: the first processing already did the side
            // effects, including any reply.
            return Ok(EventOutcome::Duplicate);
        }

        self.directory.record_activity(customer.id, now).await?;

        let settings = self.settings.get().await?;

        // Read receipt is cosmetic; a failure never aborts the pipeline.
        if settings.credentials.is_set() {
            if let Err(e) = self
                .outbound
                .mark_read(&settings.credentials, &event.channel_message_id)
                .await
            {
                warn!("mark-as-read failed for {}: {:#}", event.channel_message_id, e);
            }
        }

        let Some(decision) = policy::decide(&customer, &verdict, &settings, now) else {
            return Ok(EventOutcome::Recorded { replied: false });
        };

        debug!(
            "dispatching {:?} reply to {}",
            decision.kind, customer.phone_number
        );
        match self
            .outbound
            .send(&settings.credentials, &customer.phone_number, &decision.text)
            .await
        {
            Ok(delivery_id) => {
                self.ledger
                    .append(NewMessage {
                        customer_id: customer.id,
                        channel_message_id: delivery_id,
                        direction: Direction::Outgoing,
                        content_type: crate::model::ContentType::Text,
                        content: decision.text,
                        status: MessageStatus::Sent,
                        is_auto_reply: true,
                        reply_to: Some(incoming.channel_message_id.clone()),
                    })
                    .await?;
                if customer.is_new {
                    self.directory.mark_returning(&customer.phone_number).await?;
                }
                Ok(EventOutcome::Recorded { replied: true })
            }
            Err(e) => {
                // Degraded but accepted: the inbound message stays recorded,
                // no outgoing record is fabricated, redelivery is upstream's
                // call and the ledger dedup absorbs it.
                warn!("auto-reply dispatch to {} failed: {:#}", customer.phone_number, e);
                Ok(EventOutcome::Recorded { replied: false })
            }
        }
    }

    /// Status events route straight to the ledger; they never create
    /// customers or messages.
    async fn process_status(&self, event: &StatusEvent) -> Result<EventOutcome> {
        let outcome = self
            .ledger
            .update_status_by_channel_id(&event.channel_message_id, event.status)
            .await?;
        Ok(EventOutcome::StatusRouted(outcome))
    }

    fn sender_lock(&self, sender: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .sender_locks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if locks.len() > MAX_SENDER_LOCKS {
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        }
        locks
            .entry(sender.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}
