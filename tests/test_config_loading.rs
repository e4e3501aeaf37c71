//! Tests for configuration file loading and fallback

use anyhow::Result;
use resp_proxy::config::{
    ConfigSource, create_default_config, load_config, load_config_with_fallback,
};
use std::io::Write;
use std::time::Duration;
use tempfile::{NamedTempFile, TempDir};

/// Test loading a full config file
#[test]
fn test_load_config_from_file() -> Result<()> {
    let mut temp_file = NamedTempFile::new()?;

    let config_content = r#"
[proxy]
host = "127.0.0.1"
port = 7000

[pool]
max_idle = 32
max_active = 64
idle_timeout_secs = 60

[[instances]]
name = "Cache"
host = "10.1.0.5"
port = 6379

[[instances]]
name = "sessions"
host = "10.1.0.6"
"#;
    temp_file.write_all(config_content.as_bytes())?;
    temp_file.flush()?;

    let config = load_config(temp_file.path().to_str().unwrap())?;

    assert_eq!(config.proxy.listen_addr(), "127.0.0.1:7000");
    assert_eq!(config.pool.max_idle, 32);
    assert_eq!(config.pool.max_active, 64);
    assert_eq!(config.pool.idle_timeout(), Duration::from_secs(60));
    assert_eq!(config.instances.len(), 2);
    assert_eq!(config.instances[0].name.as_str(), "cache");
    assert_eq!(config.instances[0].host.as_str(), "10.1.0.5");
    assert_eq!(config.instances[1].port, 6379);

    Ok(())
}

/// Test invalid TOML returns error
#[test]
fn test_invalid_toml_returns_error() -> Result<()> {
    let mut temp_file = NamedTempFile::new()?;
    temp_file.write_all(b"[[instances]\nname = ")?;
    temp_file.flush()?;

    let err = load_config(temp_file.path().to_str().unwrap()).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config file"));

    Ok(())
}

/// Test missing file returns a read error from load_config
#[test]
fn test_missing_file_returns_error() {
    let err = load_config("/nonexistent/resp-proxy.toml").unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}

/// Test duplicate instance names are rejected case-insensitively
#[test]
fn test_duplicate_instances_rejected() -> Result<()> {
    let mut temp_file = NamedTempFile::new()?;
    temp_file.write_all(
        br#"
[[instances]]
name = "cache"
host = "a"

[[instances]]
name = "CACHE"
host = "b"
"#,
    )?;
    temp_file.flush()?;

    assert!(load_config(temp_file.path().to_str().unwrap()).is_err());
    Ok(())
}

/// Test empty instance name fails while parsing
#[test]
fn test_empty_instance_name_rejected() -> Result<()> {
    let mut temp_file = NamedTempFile::new()?;
    temp_file.write_all(b"[[instances]]\nname = \"\"\nhost = \"a\"\n")?;
    temp_file.flush()?;

    assert!(load_config(temp_file.path().to_str().unwrap()).is_err());
    Ok(())
}

/// Test config without instances fails validation
#[test]
fn test_no_instances_rejected() -> Result<()> {
    let mut temp_file = NamedTempFile::new()?;
    temp_file.write_all(b"[proxy]\nport = 7000\n")?;
    temp_file.flush()?;

    let err = load_config(temp_file.path().to_str().unwrap()).unwrap_err();
    assert!(err.to_string().contains("at least one instance"));
    Ok(())
}

/// Test fallback writes and then reuses a default config
#[test]
fn test_fallback_creates_default_config() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("config.toml");
    let path = path.to_str().unwrap();

    let (config, source) = load_config_with_fallback(path)?;
    assert_eq!(source, ConfigSource::DefaultCreated);
    assert_eq!(config, create_default_config());
    assert!(std::path::Path::new(path).exists());

    let (reloaded, source) = load_config_with_fallback(path)?;
    assert_eq!(source, ConfigSource::File);
    assert_eq!(reloaded, config);

    Ok(())
}

/// Test an existing broken file is reported, not replaced
#[test]
fn test_fallback_keeps_broken_file() -> Result<()> {
    let mut temp_file = NamedTempFile::new()?;
    temp_file.write_all(b"not = [valid")?;
    temp_file.flush()?;

    assert!(load_config_with_fallback(temp_file.path().to_str().unwrap()).is_err());
    assert_eq!(std::fs::read(temp_file.path())?, b"not = [valid");
    Ok(())
}
