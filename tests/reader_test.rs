//! 文件定义来源集成测试

use std::fs;
use std::path::Path;
use svc_factory::config::{CacheBackend, FactoryConfig};
use svc_factory::{
    DefinitionReader, FactoryError, FileReader, ServiceFactory, ServiceFactoryBuilder,
};

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

#[test]
fn test_includes_precede_including_file() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "base.toml",
        r#"
[[services]]
name = "mock"
type = "mock"
params = { user = "michael" }
"#,
    );
    write(
        dir.path(),
        "services.toml",
        r#"
includes = ["base.toml"]

[[services]]
name = "testing"
extends = "mock"
params = { subdomain = "test" }
"#,
    );

    let raw = FileReader::new(dir.path().join("services.toml")).read().unwrap();
    let names: Vec<&str> = raw.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["mock", "testing"]);
}

#[test]
fn test_include_cycle_is_detected() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.toml", "includes = [\"b.toml\"]\n");
    write(dir.path(), "b.toml", "includes = [\"a.toml\"]\n");

    let err = FileReader::new(dir.path().join("a.toml")).read().unwrap_err();
    assert!(matches!(err, FactoryError::IncludeCycle { .. }));
}

#[test]
fn test_shared_include_is_not_a_cycle() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "common.json",
        r#"{"services": [{"name": "log", "type": "logger"}]}"#,
    );
    write(dir.path(), "left.toml", "includes = [\"common.json\"]\n");
    write(
        dir.path(),
        "root.toml",
        "includes = [\"common.json\", \"left.toml\"]\n",
    );

    let raw = FileReader::new(dir.path().join("root.toml")).read().unwrap();
    assert_eq!(raw.len(), 2);
}

#[test]
fn test_unreadable_sources_are_source_read_errors() {
    let dir = tempfile::tempdir().unwrap();

    let missing = FileReader::new(dir.path().join("missing.toml")).read();
    assert!(matches!(missing, Err(FactoryError::SourceRead { .. })));

    write(dir.path(), "services.yaml", "services: []\n");
    let unsupported = FileReader::new(dir.path().join("services.yaml")).read();
    assert!(matches!(unsupported, Err(FactoryError::SourceRead { .. })));

    write(dir.path(), "broken.json", "{\"services\": [");
    let broken = FileReader::new(dir.path().join("broken.json")).read();
    assert!(matches!(broken, Err(FactoryError::SourceRead { .. })));
}

#[tokio::test]
async fn test_factory_from_config_reads_json_source() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "services.json",
        r#"{
  "services": [
    {"name": "mock", "type": "mock", "params": {"user": "michael", "port": 8080, "tls": true}},
    {"name": "testing", "extends": "mock", "params": {"subdomain": "test"}}
  ]
}"#,
    );

    let mut config = FactoryConfig::default();
    config.source = Some(dir.path().join("services.json"));
    config.cache.backend = CacheBackend::File;
    config.cache.dir = dir.path().join("cache");

    let factory: ServiceFactory = ServiceFactoryBuilder::from_config(&config)
        .build()
        .await
        .unwrap();

    let definition = factory.definition("testing").unwrap();
    assert_eq!(definition.type_name, "mock");
    assert_eq!(definition.param("port"), Some("8080"));
    assert_eq!(definition.param("tls"), Some("true"));
    assert!(factory.source_id().unwrap().starts_with("file:"));
    assert_eq!(dir.path().join("cache").is_dir(), cfg!(feature = "file-cache"));
}
