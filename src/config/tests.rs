use super::*;

#[test]
fn test_missing_file_yields_defaults() {
    let config = load_config(Some(Path::new("/nonexistent/replygate.json"))).unwrap();
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 8080);
    assert!(config.webhook.app_secret.is_empty());
}

#[test]
fn test_round_trip_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("replygate.json");

    let mut config = Config::default();
    config.server.port = 9100;
    config.webhook.app_secret = "s3cret".to_string();
    config.webhook.verify_token = "handshake".to_string();
    save_config(&config, Some(&path)).unwrap();

    let loaded = load_config(Some(&path)).unwrap();
    assert_eq!(loaded.server.port, 9100);
    assert_eq!(loaded.webhook.app_secret, "s3cret");
    assert_eq!(loaded.webhook.verify_token, "handshake");
}

#[test]
fn test_partial_json_fills_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("replygate.json");
    std::fs::write(&path, r#"{"webhook": {"appSecret": "only-this"}}"#).unwrap();

    let loaded = load_config(Some(&path)).unwrap();
    assert_eq!(loaded.webhook.app_secret, "only-this");
    assert_eq!(loaded.server.port, 8080);
}

#[test]
fn test_malformed_json_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("replygate.json");
    std::fs::write(&path, "{not json").unwrap();
    assert!(load_config(Some(&path)).is_err());
}
