/// Configuration validation matrix
use gantry_core::bridge::{Bridge, BridgeConfig};
use serde_json::json;

#[test]
fn test_valid_commands_are_accepted() {
    for command in ["node", "python3", "/usr/local/bin/server", "my-tool"] {
        let mut config = BridgeConfig::new(command);
        config.args = vec!["--port".to_string(), "0".to_string()];
        assert!(config.validate().is_ok(), "rejected {:?}", command);
        assert!(Bridge::new(config).is_ok());
    }
}

#[test]
fn test_shell_metacharacters_always_rejected() {
    for command in [
        "node && id",
        "a||b",
        "node;",
        ";node",
        "cat|nc",
        "x && y || z; w | v",
    ] {
        let config = BridgeConfig::new(command);
        let err = config.validate().unwrap_err();
        assert_eq!(err.code(), "CONFIGURATION_ERROR", "accepted {:?}", command);
        assert!(Bridge::new(BridgeConfig::new(command)).is_err());
    }
}

#[test]
fn test_empty_and_blank_commands_rejected() {
    for command in ["", " ", "\t"] {
        assert!(BridgeConfig::new(command).validate().is_err());
    }
}

#[test]
fn test_json_config_round_trip_with_defaults() {
    let config = BridgeConfig::from_value(json!({
        "command": "node",
        "args": ["server.js"],
        "env": {"API_KEY": "k"},
        "cwd": "/tmp",
        "request_timeout_ms": 5000
    }))
    .unwrap();

    assert_eq!(config.command, "node");
    assert_eq!(config.args, vec!["server.js"]);
    assert_eq!(config.env.get("API_KEY").map(String::as_str), Some("k"));
    assert_eq!(config.cwd.as_deref(), Some("/tmp"));
    assert_eq!(config.request_timeout_ms, 5000);
    // Unspecified knobs take defaults.
    assert_eq!(config.max_restarts, 3);
    assert_eq!(config.heartbeat_interval_ms, 30_000);
    assert_eq!(config.restart_backoff_ms, 1_000);
}

#[test]
fn test_json_config_rejects_non_string_env_values() {
    for env in [
        json!({"PORT": 8080}),
        json!({"DEBUG": true}),
        json!({"NESTED": {"a": 1}}),
        json!({"LIST": ["x"]}),
        json!({"NULL": null}),
    ] {
        let err = BridgeConfig::from_value(json!({"command": "node", "env": env})).unwrap_err();
        assert_eq!(err.code(), "CONFIGURATION_ERROR", "accepted env {:?}", env);
    }
}
