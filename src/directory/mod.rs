use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::model::Customer;
use crate::store::CustomerStore;

/// Customer identity resolution over the record store. One customer per
/// phone number; creation happens on first contact, never deletion.
#[derive(Clone)]
pub struct CustomerDirectory {
    store: Arc<dyn CustomerStore>,
}

impl CustomerDirectory {
    pub fn new(store: Arc<dyn CustomerStore>) -> Self {
        Self { store }
    }

    /// Return the existing customer for `phone` unchanged, or create one
    /// with `is_new = true`. Safe under concurrent first contact: the
    /// store's insert-if-absent resolves the race to a single record.
    pub async fn resolve_or_create(
        &self,
        phone: &str,
        profile_hint: Option<&str>,
    ) -> Result<Customer> {
        if let Some(existing) = self.store.get_by_phone(phone).await? {
            return Ok(existing);
        }

        let name = profile_hint
            .filter(|n| !n.trim().is_empty())
            .map_or_else(|| placeholder_name(phone), ToString::to_string);
        let customer = Customer::new(phone.to_string(), name, Utc::now());
        debug!("creating customer for {}", phone);
        self.store.insert_if_absent(customer).await
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Customer>> {
        self.store.get_by_id(id).await
    }

    pub async fn get_by_phone(&self, phone: &str) -> Result<Option<Customer>> {
        self.store.get_by_phone(phone).await
    }

    /// Flip `is_new` to false after the first successful auto-reply.
    /// No-op when already returning or the customer is absent.
    pub async fn mark_returning(&self, phone: &str) -> Result<()> {
        let Some(mut customer) = self.store.get_by_phone(phone).await? else {
            return Ok(());
        };
        if !customer.is_new {
            return Ok(());
        }
        customer.is_new = false;
        self.store.update(&customer).await
    }

    /// Bump last-seen and message count. Called exactly once per accepted
    /// inbound message — the ledger's dedup keeps redeliveries out.
    pub async fn record_activity(&self, customer_id: Uuid, timestamp: DateTime<Utc>) -> Result<()> {
        let Some(mut customer) = self.store.get_by_id(customer_id).await? else {
            warn!("record_activity for unknown customer {}", customer_id);
            return Ok(());
        };
        customer.last_message_at = timestamp;
        customer.message_count += 1;
        self.store.update(&customer).await
    }
}

/// Deterministic display name for customers without a profile: the phone
/// number's trailing digits.
fn placeholder_name(phone: &str) -> String {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    let tail = if digits.len() > 4 {
        &digits[digits.len() - 4..]
    } else {
        digits.as_str()
    };
    format!("Customer {}", tail)
}

#[cfg(test)]
mod tests;
