//! Layered configuration: compiled-in defaults, overridden by an optional
//! YAML file, further overridden at runtime by UCI `setoption`.

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::types::{EngineConfig, MAX_PLY};

/// On-disk representation. Every field is optional so a config file only
/// needs to mention what it wants to override.
#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    pub tt_mb: Option<usize>,
    pub max_depth: Option<u8>,
    pub time_ms: Option<u64>,
    pub quiescence: Option<bool>,
    pub logging: Option<LoggingSettings>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoggingSettings {
    pub emit_depth_log: Option<bool>,
}

/// Start from compiled defaults, apply an optional YAML file's overrides,
/// validate the result. Returns a fatal `ConfigError` on a malformed file
/// or an out-of-range value.
pub fn load(config_path: Option<&Path>) -> Result<EngineConfig, ConfigError> {
    let mut config = EngineConfig::default();

    if let Some(path) = config_path {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let settings: Settings = serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        apply(&mut config, &settings);
    }

    validate(&config)?;
    Ok(config)
}

fn apply(config: &mut EngineConfig, settings: &Settings) {
    if let Some(tt_mb) = settings.tt_mb {
        config.hash_mb = tt_mb;
    }
    if let Some(max_depth) = settings.max_depth {
        config.max_depth = max_depth;
    }
    if let Some(time_ms) = settings.time_ms {
        config.time_ms = time_ms;
    }
    if let Some(quiescence) = settings.quiescence {
        config.quiescence = quiescence;
    }
    if let Some(logging) = &settings.logging {
        if let Some(emit) = logging.emit_depth_log {
            config.emit_depth_log = emit;
        }
    }
}

pub fn validate(config: &EngineConfig) -> Result<(), ConfigError> {
    if !(1..=4096).contains(&config.hash_mb) {
        return Err(ConfigError::HashOutOfRange(config.hash_mb));
    }
    if config.max_depth < 1 || config.max_depth as usize > MAX_PLY {
        return Err(ConfigError::MaxDepthOutOfRange(config.max_depth));
    }
    if config.time_ms < 1 {
        return Err(ConfigError::TimeOutOfRange(config.time_ms));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate_cleanly() {
        assert!(validate(&EngineConfig::default()).is_ok());
    }

    #[test]
    fn hash_out_of_range_is_rejected() {
        let mut config = EngineConfig::default();
        config.hash_mb = 0;
        assert!(matches!(validate(&config), Err(ConfigError::HashOutOfRange(0))));

        config.hash_mb = 5000;
        assert!(matches!(validate(&config), Err(ConfigError::HashOutOfRange(5000))));
    }

    #[test]
    fn max_depth_out_of_range_is_rejected() {
        let mut config = EngineConfig::default();
        config.max_depth = 0;
        assert!(validate(&config).is_err());

        config.max_depth = 200;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn time_ms_zero_is_rejected() {
        let mut config = EngineConfig::default();
        config.time_ms = 0;
        assert!(matches!(validate(&config), Err(ConfigError::TimeOutOfRange(0))));
    }

    #[test]
    fn yaml_overrides_layer_on_top_of_defaults() {
        let mut config = EngineConfig::default();
        let settings: Settings = serde_yaml::from_str("tt_mb: 256\nmax_depth: 8\n").unwrap();
        apply(&mut config, &settings);
        assert_eq!(config.hash_mb, 256);
        assert_eq!(config.max_depth, 8);
        // Untouched fields keep their default.
        assert_eq!(config.time_ms, crate::types::DEFAULT_TIME_MS);
    }

    #[test]
    fn missing_config_file_is_a_fatal_io_error() {
        let result = load(Some(Path::new("/nonexistent/path/to/config.yaml")));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn malformed_yaml_is_a_fatal_parse_error() {
        let dir = std::env::temp_dir();
        let path = dir.join("corvid_test_malformed_config.yaml");
        std::fs::write(&path, "tt_mb: [this, is, not, a, number]\nmax_depth: banana\n").unwrap();
        let result = load(Some(&path));
        let _ = std::fs::remove_file(&path);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }
}
