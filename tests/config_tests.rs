//! Integration tests for configuration loading

use dyehouse::config::{API_URL_ENV, BIND_ENV};
use dyehouse::prelude::*;
use std::io::Write;

#[test]
fn test_defaults_without_file() {
    let config = AppConfig::default();
    assert_eq!(config.server.bind, "127.0.0.1:5000");
    assert_eq!(config.api.base_url, "http://localhost:5000/api");
    assert_eq!(config.api.timeout_secs, 10);
    assert!(config.users.is_empty());
    assert!(config.validate().is_ok());
}

#[test]
fn test_load_from_yaml_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
server:
  bind: 0.0.0.0:8080
api:
  baseUrl: http://dyehouse.local/api
  timeoutSecs: 3
users:
  - username: admin
    name: Admin
    role: admin
    password: admin123
  - username: sue
    name: Sue Sales
    role: sales
    password: sales123
    department: Sales
"#
    )
    .unwrap();

    let config = AppConfig::from_yaml_file(file.path()).unwrap();
    assert_eq!(config.server.bind, "0.0.0.0:8080");
    assert_eq!(config.api.base_url, "http://dyehouse.local/api");
    assert_eq!(config.api.timeout().as_secs(), 3);
    assert_eq!(config.users.len(), 2);
    assert_eq!(config.users[1].role, Role::Sales);
    assert_eq!(config.users[1].department.as_deref(), Some("Sales"));
    assert!(config.validate().is_ok());

    assert!(InMemoryStore::with_users(config.users).is_ok());
}

#[test]
fn test_missing_file_names_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.yaml");
    let err = AppConfig::from_yaml_file(&path).unwrap_err();
    assert!(format!("{:#}", err).contains("absent.yaml"));
}

#[test]
fn test_partial_file_keeps_defaults() {
    let config = AppConfig::from_yaml_str("server:\n  bind: 127.0.0.1:9000\n").unwrap();
    assert_eq!(config.server.bind, "127.0.0.1:9000");
    assert_eq!(config.api, ApiConfig::default());
}

#[test]
fn test_unknown_role_is_rejected() {
    let yaml = r#"
users:
  - username: root
    name: Root
    role: superuser
    password: secret1
"#;
    assert!(AppConfig::from_yaml_str(yaml).is_err());
}

#[test]
fn test_overrides_win_over_file() {
    let config = AppConfig::from_yaml_str("server:\n  bind: 127.0.0.1:9000\n")
        .unwrap()
        .with_overrides(|key| match key {
            k if k == BIND_ENV => Some("0.0.0.0:7000".to_string()),
            k if k == API_URL_ENV => Some("https://orders.example.com/api/".to_string()),
            _ => None,
        });

    assert_eq!(config.server.bind, "0.0.0.0:7000");
    assert_eq!(config.api.base_url, "https://orders.example.com/api");
}

#[test]
fn test_blank_override_is_ignored() {
    let config = AppConfig::default().with_overrides(|_| Some("   ".to_string()));
    assert_eq!(config.server, ServerConfig::default());
    assert_eq!(config.api, ApiConfig::default());
}

#[test]
fn test_validate_rejects_bad_values() {
    let mut config = AppConfig::default();
    config.server.bind = "not an address".into();
    assert!(config.validate().is_err());

    let mut config = AppConfig::default();
    config.api.base_url = "ftp://files".into();
    assert!(config.validate().is_err());

    let mut config = AppConfig::default();
    config.api.timeout_secs = 0;
    assert!(config.validate().is_err());

    let mut config = AppConfig::default();
    config.users = vec![NewUser {
        username: "x".into(),
        name: "X".into(),
        role: Role::Sales,
        password: "secret1".into(),
        email: None,
        department: None,
    }];
    let err = config.validate().unwrap_err();
    assert!(format!("{:#}", err).contains("seed user 'x'"));
}

#[test]
fn test_demo_users_cover_every_role() {
    let users = AppConfig::demo_users();
    for role in Role::all() {
        assert!(users.iter().any(|u| u.role == *role));
    }
    assert!(users.iter().all(|u| u.check().is_ok()));
}
