//! Integration test for configuration loading

use camino::Utf8PathBuf;
use masterforge_lib::commands::Config;

#[test]
fn test_load_config_with_custom_targets() {
    let toml = r#"
namespace = "game"
tabular_dir = "master"

[[targets]]
name = "client"
bit = 1

[[targets]]
name = "editor"
bit = 3

[database]
path = "db/game.db"
schemas = ["main", "log"]
user_tables = ["Account"]
"#;

    let config: Config = toml::from_str(toml).expect("Could not parse config");
    config.validate().unwrap();

    assert_eq!(config.namespace, "game");
    assert_eq!(config.tabular_dir.as_str(), "master");
    assert_eq!(config.schema_dir.as_str(), "schema");
    assert_eq!(config.targets.len(), 2);
    assert_eq!(config.target("editor").unwrap().bit, 3);
    assert_eq!(config.database.schemas, ["main", "log"]);
    assert_eq!(config.database.user_tables, ["Account"]);
}

#[test]
fn test_unknown_target_lists_known_ones() {
    let config = Config::default();
    let err = config.target("console").unwrap_err().to_string();
    assert!(err.contains("client, server, tool"), "{err}");
}

#[test]
fn test_saved_default_loads_back() {
    let tmp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
    let path = root.join("masterforge.toml");

    Config::save_default(&path).unwrap();
    let loaded = Config::load(&root, Some(&path)).unwrap();
    let defaults = Config::default();
    assert_eq!(loaded.targets, defaults.targets);
    assert_eq!(loaded.database, defaults.database);
    assert_eq!(loaded.namespace, "masterdata");
}

#[test]
fn test_invalid_config_is_rejected_on_load() {
    let tmp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
    let path = root.join("masterforge.toml");

    std::fs::write(&path, "[[targets]]\nname = \"client\"\nbit = 0\n").unwrap();
    assert!(Config::load(&root, Some(&path)).is_err());
}
