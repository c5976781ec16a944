use herald_config::{BusConfig, ConfigError, env_key};

#[test]
fn config_round_trips_through_json() -> anyhow::Result<()> {
    let config = BusConfig {
        max_listeners: 10,
        enable_persistence: true,
        persistence_limit: 25,
        enable_replay: true,
        listener_timeout_ms: Some(500),
    };
    let document = serde_json::to_string(&config)?;
    let parsed = BusConfig::from_json_str(&document)?;
    assert_eq!(parsed, config);
    Ok(())
}

#[test]
fn lookup_reads_the_documented_variable_names() -> anyhow::Result<()> {
    let keys = [
        "max_listeners",
        "enable_persistence",
        "persistence_limit",
        "enable_replay",
        "listener_timeout_ms",
    ]
    .map(env_key);
    assert_eq!(
        keys,
        [
            "HERALD_MAX_LISTENERS",
            "HERALD_ENABLE_PERSISTENCE",
            "HERALD_PERSISTENCE_LIMIT",
            "HERALD_ENABLE_REPLAY",
            "HERALD_LISTENER_TIMEOUT_MS",
        ]
    );

    let config = BusConfig::from_lookup(|key| {
        (key == "HERALD_ENABLE_PERSISTENCE").then(|| "1".to_string())
    })?;
    assert!(config.enable_persistence);
    assert!(!config.enable_replay);
    Ok(())
}

#[test]
fn out_of_range_values_are_rejected() {
    let result = BusConfig::from_lookup(|key| {
        (key == "HERALD_LISTENER_TIMEOUT_MS").then(|| "0".to_string())
    });
    match result {
        Err(ConfigError::InvalidField { field, reason, .. }) => {
            assert_eq!(field, "listener_timeout_ms");
            assert_eq!(reason, "must be at least 1");
        }
        other => panic!("expected invalid field, got {other:?}"),
    }
}
