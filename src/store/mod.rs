use std::collections::{HashMap, HashSet};

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::model::{Customer, Direction, Message, MessageStatus};
use crate::settings::BotSettings;

/// Outcome of a status event applied to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOutcome {
    /// Status advanced and was written.
    Updated,
    /// A message was found but the new status would regress the monotonic
    /// ordering; the event is dropped, not an error.
    Ignored,
    /// No message with that channel id exists here (e.g. recorded before a
    /// restart); a no-op by contract.
    Unknown,
}

/// Customer records, keyed by phone number.
///
/// This is the consumed storage contract: the core treats it as a
/// transactional record store and assumes nothing about the backing
/// technology.
#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn get_by_phone(&self, phone: &str) -> Result<Option<Customer>>;

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Customer>>;

    /// Insert `customer` unless one with the same phone number already
    /// exists, in which case the stored record wins. Must be atomic with
    /// respect to concurrent first-contact inserts for the same phone.
    async fn insert_if_absent(&self, customer: Customer) -> Result<Customer>;

    /// Overwrite the stored record for `customer.phone_number`.
    async fn update(&self, customer: &Customer) -> Result<()>;
}

/// Message records, append-only except for status.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Insert unless a message with the same `(channel_message_id, direction)`
    /// already exists. The check-then-insert must be atomic; on a duplicate
    /// the stored record is returned with `inserted == false`.
    async fn append_if_absent(&self, message: Message) -> Result<(Message, bool)>;

    /// Apply a status event to the most recent message with `channel_id`,
    /// only if it does not regress the monotonic ordering.
    async fn apply_status(&self, channel_id: &str, status: MessageStatus)
    -> Result<StatusOutcome>;

    async fn list_by_customer(&self, customer_id: Uuid, limit: usize) -> Result<Vec<Message>>;

    async fn list_recent(&self, limit: usize) -> Result<Vec<Message>>;
}

/// Process-wide settings singleton.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get_settings(&self) -> Result<Option<BotSettings>>;

    async fn put_settings(&self, settings: &BotSettings) -> Result<()>;

    /// Drop the stored settings so the next access re-initializes defaults.
    async fn clear_settings(&self) -> Result<()>;
}

#[derive(Default)]
struct MessageTable {
    rows: Vec<Message>,
    seen: HashSet<(String, Direction)>,
}

/// In-memory record store. The bundled backend for tests and single-node
/// deployments; anything durable plugs in behind the same traits.
#[derive(Default)]
pub struct MemoryStore {
    customers: RwLock<HashMap<String, Customer>>,
    messages: RwLock<MessageTable>,
    settings: RwLock<Option<BotSettings>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CustomerStore for MemoryStore {
    async fn get_by_phone(&self, phone: &str) -> Result<Option<Customer>> {
        Ok(self.customers.read().await.get(phone).cloned())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Customer>> {
        Ok(self
            .customers
            .read()
            .await
            .values()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn insert_if_absent(&self, customer: Customer) -> Result<Customer> {
        let mut customers = self.customers.write().await;
        // Double-check under the write lock: a concurrent first contact may
        // have inserted between the caller's read and this write.
        if let Some(existing) = customers.get(&customer.phone_number) {
            return Ok(existing.clone());
        }
        customers.insert(customer.phone_number.clone(), customer.clone());
        Ok(customer)
    }

    async fn update(&self, customer: &Customer) -> Result<()> {
        let mut customers = self.customers.write().await;
        customers.insert(customer.phone_number.clone(), customer.clone());
        Ok(())
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn append_if_absent(&self, message: Message) -> Result<(Message, bool)> {
        let mut table = self.messages.write().await;
        let key = (message.channel_message_id.clone(), message.direction);
        if table.seen.contains(&key) {
            let existing = table
                .rows
                .iter()
                .rev()
                .find(|m| {
                    m.channel_message_id == message.channel_message_id
                        && m.direction == message.direction
                })
                .cloned()
                .expect("seen-set entry without a backing row");
            return Ok((existing, false));
        }
        table.seen.insert(key);
        table.rows.push(message.clone());
        Ok((message, true))
    }

    async fn apply_status(
        &self,
        channel_id: &str,
        status: MessageStatus,
    ) -> Result<StatusOutcome> {
        let mut table = self.messages.write().await;
        let Some(row) = table
            .rows
            .iter_mut()
            .rev()
            .find(|m| m.channel_message_id == channel_id)
        else {
            return Ok(StatusOutcome::Unknown);
        };
        if row.status.can_advance_to(status) {
            row.status = status;
            Ok(StatusOutcome::Updated)
        } else {
            Ok(StatusOutcome::Ignored)
        }
    }

    async fn list_by_customer(&self, customer_id: Uuid, limit: usize) -> Result<Vec<Message>> {
        let table = self.messages.read().await;
        Ok(table
            .rows
            .iter()
            .rev()
            .filter(|m| m.customer_id == customer_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<Message>> {
        let table = self.messages.read().await;
        Ok(table.rows.iter().rev().take(limit).cloned().collect())
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn get_settings(&self) -> Result<Option<BotSettings>> {
        Ok(self.settings.read().await.clone())
    }

    async fn put_settings(&self, settings: &BotSettings) -> Result<()> {
        *self.settings.write().await = Some(settings.clone());
        Ok(())
    }

    async fn clear_settings(&self) -> Result<()> {
        *self.settings.write().await = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests;
