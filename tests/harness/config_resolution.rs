//! Locating and loading the harness config.

use replcheck::config::{resolve_config_path, ConfigError, ConfigSource, HarnessConfig};
use std::io::Write;
use std::path::PathBuf;

const CONFIG: &str = r#"
source:
  addr: "127.0.0.1:6380"
target:
  type: dragonfly
  seed: "127.0.0.1:6379"
  password: "secret"
"#;

#[test]
fn test_discovery_used_when_explicit_path_is_missing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("engine.yaml");
    std::fs::File::create(&path)
        .unwrap()
        .write_all(CONFIG.as_bytes())
        .unwrap();

    let discovered = path.clone();
    let sources = [
        ConfigSource::Explicit(dir.path().join("absent.yaml")),
        ConfigSource::discovery("engine", move || Some(discovered.clone())),
    ];
    let resolved = resolve_config_path(&sources).unwrap();
    assert_eq!(resolved, path);

    let config = HarnessConfig::from_file(&resolved).unwrap();
    assert_eq!(config.source.addr, "127.0.0.1:6380");
    assert_eq!(config.target.addr, "127.0.0.1:6379");
    assert_eq!(config.target.store_type, "dragonfly");
}

#[test]
fn test_not_found_lists_every_source() {
    let sources = [
        ConfigSource::Explicit(PathBuf::from("/nonexistent/config.yaml")),
        ConfigSource::discovery("engine", || None),
    ];
    match resolve_config_path(&sources) {
        Err(ConfigError::NotFound { tried }) => {
            assert!(tried.contains("/nonexistent/config.yaml"));
            assert!(tried.contains("discovery via engine"));
        }
        other => panic!("expected NotFound, got {other:?}"),
    }
}
