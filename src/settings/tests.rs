use std::sync::Arc;

use super::*;
use crate::store::MemoryStore;

#[tokio::test]
async fn test_first_access_initializes_defaults() {
    let handle = SettingsHandle::new(Arc::new(MemoryStore::new()));
    let settings = handle.get().await.unwrap();
    assert!(settings.active);
    assert!(settings.business_hours.enabled);
    assert!(!settings.credentials.is_set());
    assert!(settings.business_hours.monday.enabled);
    assert!(!settings.business_hours.sunday.enabled);
}

#[tokio::test]
async fn test_update_persists_and_reset_restores_defaults() {
    let handle = SettingsHandle::new(Arc::new(MemoryStore::new()));
    let mut settings = handle.get().await.unwrap();
    settings.active = false;
    settings.templates.new_customer = "custom greeting".to_string();
    handle.update(settings).await.unwrap();

    let reloaded = handle.get().await.unwrap();
    assert!(!reloaded.active);
    assert_eq!(reloaded.templates.new_customer, "custom greeting");

    handle.reset().await.unwrap();
    let fresh = handle.get().await.unwrap();
    assert!(fresh.active);
    assert_ne!(fresh.templates.new_customer, "custom greeting");
}

#[test]
fn test_credentials_set_requires_both_fields() {
    let mut creds = ChannelCredentials::default();
    assert!(!creds.is_set());
    creds.access_token = "tok".to_string();
    assert!(!creds.is_set());
    creds.phone_number_id = "123".to_string();
    assert!(creds.is_set());
}

#[tokio::test]
async fn test_update_rejects_unknown_timezone() {
    let handle = SettingsHandle::new(Arc::new(MemoryStore::new()));
    let mut settings = handle.get().await.unwrap();
    settings.business_hours.timezone = "Mars/Olympus_Mons".to_string();
    assert!(handle.update(settings).await.is_err());

    // Stored settings are untouched by the rejected update
    let current = handle.get().await.unwrap();
    assert_eq!(current.business_hours.timezone, "UTC");
}

#[test]
fn test_validate_rejects_malformed_schedule_times() {
    let mut settings = BotSettings::default();
    settings.business_hours.monday.start = "9:00".to_string();
    assert!(settings.validate().is_err());

    settings.business_hours.monday.start = "25:00".to_string();
    assert!(settings.validate().is_err());

    settings.business_hours.monday.start = "09:00".to_string();
    assert!(settings.validate().is_ok());

    // Disabled days are not checked; operators often leave stale values there
    settings.business_hours.sunday.start = "whenever".to_string();
    assert!(settings.validate().is_ok());

    // Disabling the whole evaluator skips validation entirely
    settings.business_hours.monday.start = "bogus".to_string();
    settings.business_hours.enabled = false;
    assert!(settings.validate().is_ok());
}

#[test]
fn test_settings_serialize_camel_case() {
    let json = serde_json::to_value(BotSettings::default()).unwrap();
    assert!(json.get("businessHours").is_some());
    assert!(json["templates"].get("newCustomer").is_some());
    assert!(json["credentials"].get("accessToken").is_some());
}
