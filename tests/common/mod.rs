//! Common test utilities for condor-config integration tests

pub use condor_config::{Config, ConfigError};
use std::path::{Path, PathBuf};

/// A store with no defaults and no host probing
pub fn bare() -> Config {
    Config::builder().defaults(&[]).without_probe().build()
}

/// Load `input` into a bare store
pub fn load(input: &str) -> Result<Config, ConfigError> {
    let mut config = bare();
    config.load_str(input)?;
    Ok(config)
}

/// Load `input` and return the expanded value of `name`
#[allow(dead_code)]
pub fn value(input: &str, name: &str) -> Option<String> {
    load(input).unwrap().get(name)
}

/// Write `contents` to `dir/name` and return the full path
#[allow(dead_code)]
pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}
