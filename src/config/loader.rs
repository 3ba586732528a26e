//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let config = parse_config("[static_files]\nurl_prefix = \"/assets\"\ndirectory = \"public\"\n").unwrap();
        assert_eq!(config.static_files.url_prefix, "/assets");
        assert_eq!(config.static_files.directory, "public");
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse_config("[server"), Err(ConfigError::Parse(_))));

        let err = parse_config("[server]\nchannel_capacity = 0\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "validation failed: server.channel_capacity: must be greater than zero"
        );
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/no/such/balboa.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
