//! Config file location and persistence.

pub mod schema;

pub use schema::ErrandConfig;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Where errand keeps its files: `~/.errand`, or a relative `.errand`
/// when no home directory can be determined.
pub fn default_home_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().join(".errand"))
        .unwrap_or_else(|| PathBuf::from(".errand"))
}

/// `~/.errand/errand.toml`, unless overridden on the command line.
pub fn default_config_path() -> PathBuf {
    default_home_dir().join("errand.toml")
}

/// Read the config at `path`. An absent file is not an error: it yields
/// the built-in defaults, so a first run works without `init`.
pub fn load_config(path: &Path) -> Result<ErrandConfig> {
    if !path.exists() {
        return Ok(ErrandConfig::default());
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Could not read {}", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("Invalid TOML in {}", path.display()))
}

/// Write `config` to `path` as pretty TOML, creating parent directories
/// as needed.
pub fn save_config(config: &ErrandConfig, path: &Path) -> Result<()> {
    let contents = toml::to_string_pretty(config).context("Could not serialize config")?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Could not create {}", parent.display()))?;
    }
    std::fs::write(path, contents).with_context(|| format!("Could not write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let cfg = load_config(Path::new("/definitely/not/here/errand.toml")).unwrap();
        assert_eq!(cfg.name, "errand");
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = std::env::temp_dir().join(format!("errand-config-test-{}", std::process::id()));
        let path = dir.join("errand.toml");

        let config = ErrandConfig {
            model: "test-model".into(),
            ..Default::default()
        };
        save_config(&config, &path).unwrap();
        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded.model, "test-model");

        std::fs::remove_dir_all(&dir).ok();
    }
}
