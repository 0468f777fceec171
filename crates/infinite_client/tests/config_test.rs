//! Tests for client configuration loading.

use infinite_client::{
    ClientConfig, ClientErrorKind, LivenessStrategy, SERVER_URL_ENV, TransportKind,
};
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

#[test]
fn test_defaults() {
    let config = ClientConfig::default();
    assert_eq!(config.server_url(), "http://localhost:3000");
    assert_eq!(config.connect_deadline(), Duration::from_secs(15));
    assert_eq!(*config.transport().reconnection_attempts(), 3);
    assert_eq!(
        config.transport().transports(),
        &vec![TransportKind::Websocket, TransportKind::Polling]
    );
    assert_eq!(*config.liveness().strategy(), LivenessStrategy::Inactivity);
    assert_eq!(config.liveness().warning_start(), Duration::from_secs(10));
    assert_eq!(config.liveness().total_timeout(), Duration::from_secs(25));
    assert_eq!(config.liveness().poll_interval(), Duration::from_millis(500));
    assert_eq!(config.liveness().termination_grace(), Duration::from_secs(3));
}

#[test]
fn test_partial_file_keeps_defaults() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
server_url = "https://game.example.com"

[transport]
transports = ["polling"]

[liveness]
strategy = "heartbeat"
heartbeat_timeout_ms = 8000
"#
    )
    .unwrap();

    let config = ClientConfig::from_file(file.path()).unwrap();
    assert_eq!(config.server_url(), "https://game.example.com");
    assert_eq!(config.transport().transports(), &vec![TransportKind::Polling]);
    assert_eq!(*config.transport().reconnection_attempts(), 3);
    assert_eq!(*config.liveness().strategy(), LivenessStrategy::Heartbeat);
    assert_eq!(config.liveness().heartbeat_timeout(), Duration::from_secs(8));
    assert_eq!(config.liveness().heartbeat_interval(), Duration::from_secs(1));
    assert_eq!(config.connect_deadline(), Duration::from_secs(15));
}

#[test]
fn test_missing_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = ClientConfig::load_or_default(dir.path().join("absent.toml")).unwrap();
    assert_eq!(config, ClientConfig::default());
}

#[test]
fn test_malformed_file_is_config_error() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "server_url = [not toml").unwrap();

    let err = ClientConfig::from_file(file.path()).unwrap_err();
    assert_eq!(err.kind, ClientErrorKind::Config);
}

#[test]
fn test_rendered_toml_loads_back() {
    let config = ClientConfig::default().with_server_url("http://10.0.0.2:3000".to_string());
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", config.to_toml().unwrap()).unwrap();

    assert_eq!(ClientConfig::from_file(file.path()).unwrap(), config);
}

#[test]
fn test_environment_overrides_server_url() {
    // Only this test touches the variable.
    unsafe { std::env::set_var(SERVER_URL_ENV, "http://from-env:9000") };
    let config = ClientConfig::default().apply_env();
    unsafe { std::env::remove_var(SERVER_URL_ENV) };

    assert_eq!(config.server_url(), "http://from-env:9000");
}

#[test]
fn test_zero_periods_are_rejected() {
    for table in ["poll_interval_ms = 0", "heartbeat_interval_ms = 0"] {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[liveness]\n{}", table).unwrap();

        let err = ClientConfig::from_file(file.path()).unwrap_err();
        assert_eq!(err.kind, ClientErrorKind::Config, "{}", table);
    }
}

#[test]
fn test_warning_must_start_before_timeout() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "[liveness]\nwarning_start_ms = 25000\ntotal_timeout_ms = 25000"
    )
    .unwrap();

    let err = ClientConfig::load_or_default(file.path()).unwrap_err();
    assert_eq!(err.kind, ClientErrorKind::Config);
    assert!(ClientConfig::default().liveness().validate().is_ok());
}
