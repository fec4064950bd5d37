use std::sync::Arc;

use super::*;
use crate::store::MemoryStore;

fn make_directory() -> CustomerDirectory {
    CustomerDirectory::new(Arc::new(MemoryStore::new()))
}

#[tokio::test]
async fn test_creates_with_profile_name() {
    let dir = make_directory();
    let customer = dir
        .resolve_or_create("15551234567", Some("Grace Hopper"))
        .await
        .unwrap();
    assert_eq!(customer.name, "Grace Hopper");
    assert!(customer.is_new);
    assert_eq!(customer.message_count, 0);
}

#[tokio::test]
async fn test_placeholder_name_from_trailing_digits() {
    let dir = make_directory();
    let customer = dir.resolve_or_create("+15551234567", None).await.unwrap();
    assert_eq!(customer.name, "Customer 4567");

    let short = dir.resolve_or_create("123", Some("  ")).await.unwrap();
    assert_eq!(short.name, "Customer 123");
}

#[tokio::test]
async fn test_existing_customer_returned_unchanged() {
    let dir = make_directory();
    let first = dir
        .resolve_or_create("15551234567", Some("Grace"))
        .await
        .unwrap();
    // A later profile hint must not mutate the stored record
    let second = dir
        .resolve_or_create("15551234567", Some("Someone Else"))
        .await
        .unwrap();
    assert_eq!(second.id, first.id);
    assert_eq!(second.name, "Grace");
}

#[tokio::test]
async fn test_concurrent_resolve_yields_one_customer() {
    let dir = Arc::new(make_directory());
    let mut handles = Vec::new();
    for _ in 0..12 {
        let dir = dir.clone();
        handles.push(tokio::spawn(async move {
            dir.resolve_or_create("15559990000", None).await.unwrap()
        }));
    }
    let mut ids = std::collections::HashSet::new();
    for h in handles {
        ids.insert(h.await.unwrap().id);
    }
    assert_eq!(ids.len(), 1);
}

#[tokio::test]
async fn test_mark_returning_flips_once_and_tolerates_absent() {
    let dir = make_directory();
    dir.resolve_or_create("15551234567", None).await.unwrap();

    dir.mark_returning("15551234567").await.unwrap();
    let customer = dir.get_by_phone("15551234567").await.unwrap().unwrap();
    assert!(!customer.is_new);

    // Second call and unknown phone are both no-ops
    dir.mark_returning("15551234567").await.unwrap();
    dir.mark_returning("19990000000").await.unwrap();
}

#[tokio::test]
async fn test_record_activity_bumps_count_and_timestamp() {
    let dir = make_directory();
    let customer = dir.resolve_or_create("15551234567", None).await.unwrap();

    let later = Utc::now() + chrono::Duration::minutes(5);
    dir.record_activity(customer.id, later).await.unwrap();
    dir.record_activity(customer.id, later).await.unwrap();

    let stored = dir.get_by_phone("15551234567").await.unwrap().unwrap();
    assert_eq!(stored.message_count, 2);
    assert_eq!(stored.last_message_at, later);

    // Unknown id logs and returns Ok
    dir.record_activity(Uuid::new_v4(), later).await.unwrap();
}
