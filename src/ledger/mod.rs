use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::model::{Message, MessageStatus, NewMessage};
use crate::store::{MessageStore, StatusOutcome};

/// Capacity of the change-notification channel. Slow subscribers lag and
/// drop, they never block the pipeline.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Change notification for real-time consumers. The ledger itself stays a
/// point-in-time query surface; polling is not required.
#[derive(Debug, Clone)]
pub enum LedgerEvent {
    Appended(Message),
    StatusChanged {
        channel_message_id: String,
        status: MessageStatus,
    },
}

/// Append-only record of in/out messages over the record store. Content is
/// immutable after append; status moves forward only.
#[derive(Clone)]
pub struct MessageLedger {
    store: Arc<dyn MessageStore>,
    events: broadcast::Sender<LedgerEvent>,
}

impl MessageLedger {
    pub fn new(store: Arc<dyn MessageStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { store, events }
    }

    /// Assign an id and creation timestamp and store the record.
    ///
    /// Idempotent on `(channel_message_id, direction)`: a redelivered event
    /// returns the original record with `inserted == false` and must not
    /// trigger downstream side effects a second time.
    pub async fn append(&self, record: NewMessage) -> Result<(Message, bool)> {
        let message = Message {
            id: Uuid::new_v4(),
            customer_id: record.customer_id,
            channel_message_id: record.channel_message_id,
            direction: record.direction,
            content_type: record.content_type,
            content: record.content,
            status: record.status,
            is_auto_reply: record.is_auto_reply,
            timestamp: Utc::now(),
            reply_to: record.reply_to,
        };
        let (stored, inserted) = self.store.append_if_absent(message).await?;
        if inserted {
            debug!(
                "ledger: appended {:?} message {} (channel id {})",
                stored.direction, stored.id, stored.channel_message_id
            );
            let _ = self.events.send(LedgerEvent::Appended(stored.clone()));
        } else {
            debug!(
                "ledger: duplicate {:?} append for channel id {}, returning existing",
                stored.direction, stored.channel_message_id
            );
        }
        Ok((stored, inserted))
    }

    /// Apply a platform status event to the most recent message with that
    /// channel id. Regressions and unknown ids are dropped silently — the
    /// event may reference a message this instance never recorded.
    pub async fn update_status_by_channel_id(
        &self,
        channel_message_id: &str,
        status: MessageStatus,
    ) -> Result<StatusOutcome> {
        let outcome = self.store.apply_status(channel_message_id, status).await?;
        match outcome {
            StatusOutcome::Updated => {
                debug!("ledger: {} -> {:?}", channel_message_id, status);
                let _ = self.events.send(LedgerEvent::StatusChanged {
                    channel_message_id: channel_message_id.to_string(),
                    status,
                });
            }
            StatusOutcome::Ignored => {
                debug!(
                    "ledger: dropping regressive status {:?} for {}",
                    status, channel_message_id
                );
            }
            StatusOutcome::Unknown => {
                debug!("ledger: no message with channel id {}", channel_message_id);
            }
        }
        Ok(outcome)
    }

    /// Messages for one customer, newest first.
    pub async fn list_by_customer(&self, customer_id: Uuid, limit: usize) -> Result<Vec<Message>> {
        self.store.list_by_customer(customer_id, limit).await
    }

    /// Most recent messages across all customers, newest first.
    pub async fn list_recent(&self, limit: usize) -> Result<Vec<Message>> {
        self.store.list_recent(limit).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.events.subscribe()
    }
}
