use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::*;
use crate::model::ContentType;

fn make_message(channel_id: &str, direction: Direction, customer_id: Uuid) -> Message {
    Message {
        id: Uuid::new_v4(),
        customer_id,
        channel_message_id: channel_id.to_string(),
        direction,
        content_type: ContentType::Text,
        content: "hello".to_string(),
        status: MessageStatus::Pending,
        is_auto_reply: false,
        timestamp: Utc::now(),
        reply_to: None,
    }
}

#[tokio::test]
async fn test_insert_if_absent_returns_existing_on_conflict() {
    let store = MemoryStore::new();
    let first = Customer::new("15551234567".to_string(), "Ada".to_string(), Utc::now());
    let second = Customer::new("15551234567".to_string(), "Imposter".to_string(), Utc::now());

    let stored = store.insert_if_absent(first.clone()).await.unwrap();
    assert_eq!(stored.id, first.id);

    let stored = store.insert_if_absent(second).await.unwrap();
    assert_eq!(stored.id, first.id);
    assert_eq!(stored.name, "Ada");
}

#[tokio::test]
async fn test_concurrent_insert_yields_one_customer() {
    let store = Arc::new(MemoryStore::new());
    let mut handles = Vec::new();
    for _ in 0..16 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let c = Customer::new("15550001111".to_string(), "Racer".to_string(), Utc::now());
            store.insert_if_absent(c).await.unwrap()
        }));
    }
    let mut ids = std::collections::HashSet::new();
    for h in handles {
        ids.insert(h.await.unwrap().id);
    }
    assert_eq!(ids.len(), 1);
}

#[tokio::test]
async fn test_append_if_absent_dedupes_on_channel_id_and_direction() {
    let store = MemoryStore::new();
    let customer_id = Uuid::new_v4();

    let (_, inserted) = store
        .append_if_absent(make_message("wamid.1", Direction::Incoming, customer_id))
        .await
        .unwrap();
    assert!(inserted);

    let (existing, inserted) = store
        .append_if_absent(make_message("wamid.1", Direction::Incoming, customer_id))
        .await
        .unwrap();
    assert!(!inserted);
    assert_eq!(existing.channel_message_id, "wamid.1");

    // Same channel id, other direction is a distinct record
    let (_, inserted) = store
        .append_if_absent(make_message("wamid.1", Direction::Outgoing, customer_id))
        .await
        .unwrap();
    assert!(inserted);

    assert_eq!(store.list_recent(10).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_apply_status_monotonic() {
    let store = MemoryStore::new();
    let customer_id = Uuid::new_v4();
    store
        .append_if_absent(make_message("wamid.X", Direction::Outgoing, customer_id))
        .await
        .unwrap();

    assert_eq!(
        store
            .apply_status("wamid.X", MessageStatus::Read)
            .await
            .unwrap(),
        StatusOutcome::Updated
    );
    // Redelivered or regressive events are dropped
    assert_eq!(
        store
            .apply_status("wamid.X", MessageStatus::Read)
            .await
            .unwrap(),
        StatusOutcome::Ignored
    );
    assert_eq!(
        store
            .apply_status("wamid.X", MessageStatus::Delivered)
            .await
            .unwrap(),
        StatusOutcome::Ignored
    );
    let recent = store.list_recent(1).await.unwrap();
    assert_eq!(recent[0].status, MessageStatus::Read);
}

#[tokio::test]
async fn test_apply_status_unknown_channel_id_is_noop() {
    let store = MemoryStore::new();
    assert_eq!(
        store
            .apply_status("wamid.ghost", MessageStatus::Read)
            .await
            .unwrap(),
        StatusOutcome::Unknown
    );
}

#[tokio::test]
async fn test_list_by_customer_newest_first() {
    let store = MemoryStore::new();
    let customer_id = Uuid::new_v4();
    for i in 0..5 {
        store
            .append_if_absent(make_message(
                &format!("wamid.{}", i),
                Direction::Incoming,
                customer_id,
            ))
            .await
            .unwrap();
    }
    store
        .append_if_absent(make_message("wamid.other", Direction::Incoming, Uuid::new_v4()))
        .await
        .unwrap();

    let listed = store.list_by_customer(customer_id, 3).await.unwrap();
    assert_eq!(listed.len(), 3);
    assert_eq!(listed[0].channel_message_id, "wamid.4");
    assert_eq!(listed[2].channel_message_id, "wamid.2");
}
