// Integration tests for the pick'em assistant scaffold.

/// Verify that defaults/pickem.toml is valid TOML with the sections the
/// loader expects.
#[test]
fn default_config_is_valid() {
    let content = std::fs::read_to_string("defaults/pickem.toml")
        .expect("defaults/pickem.toml should exist");
    let parsed: toml::Value =
        toml::from_str(&content).expect("defaults/pickem.toml is not valid TOML");
    for section in ["draft", "gateway", "storage", "user"] {
        assert!(
            parsed.get(section).is_some(),
            "defaults/pickem.toml is missing [{section}]"
        );
    }
}

/// The default config must itself pass the loader's validation once copied
/// into place.
#[test]
fn default_config_loads() {
    let dir = std::env::temp_dir().join(format!("pickem-scaffold-{}", std::process::id()));
    let config_dir = dir.join("config");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::copy("defaults/pickem.toml", config_dir.join("pickem.toml")).unwrap();

    let config = paintball_pickem::config::load_config_from(&dir).unwrap();
    assert_eq!(config.draft.budget_cap, 1_000_000);
    assert_eq!(config.draft.slot_count, 10);

    let _ = std::fs::remove_dir_all(&dir);
}
