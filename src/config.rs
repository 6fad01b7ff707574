//! Configuration for the mock server.
//!
//! Defines the listening port, import/export directories, and logging settings.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration for the mock server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory scanned by import
    #[serde(default = "default_import_dir")]
    pub import_dir: PathBuf,

    /// Directory written by export
    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,

    /// Import mocks from `import_dir` on startup
    #[serde(default)]
    pub auto_import: bool,

    /// Global settings
    #[serde(default)]
    pub settings: GlobalSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            import_dir: default_import_dir(),
            export_dir: default_export_dir(),
            auto_import: false,
            settings: GlobalSettings::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.port == 0 {
            anyhow::bail!("Port cannot be 0");
        }
        if self.import_dir.as_os_str().is_empty() {
            anyhow::bail!("Import directory cannot be empty");
        }
        if self.export_dir.as_os_str().is_empty() {
            anyhow::bail!("Export directory cannot be empty");
        }
        Ok(())
    }
}

fn default_port() -> u16 {
    8080
}

fn default_import_dir() -> PathBuf {
    PathBuf::from("./.import")
}

fn default_export_dir() -> PathBuf {
    PathBuf::from("./.export")
}

fn default_true() -> bool {
    true
}

/// Global settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GlobalSettings {
    /// Log all matched mocks
    #[serde(default = "default_true")]
    pub log_matches: bool,

    /// Log requests no mock answered
    #[serde(default = "default_true")]
    pub log_unmatched: bool,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            log_matches: true,
            log_unmatched: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
port: 9090
import_dir: ./stubs/in
export_dir: ./stubs/out
auto_import: true
settings:
  log_matches: false
"#;
        let config: ServerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.import_dir, PathBuf::from("./stubs/in"));
        assert!(config.auto_import);
        assert!(!config.settings.log_matches);
        assert!(config.settings.log_unmatched);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: ServerConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.import_dir, PathBuf::from("./.import"));
        assert_eq!(config.export_dir, PathBuf::from("./.export"));
        assert!(!config.auto_import);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let result: Result<ServerConfig, _> = serde_yaml::from_str("db_type: Postgres\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_port_invalid() {
        let config = ServerConfig {
            port: 0,
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port: 7070").unwrap();
        let config = ServerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.port, 7070);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port: 0").unwrap();
        assert!(ServerConfig::from_file(file.path()).is_err());
    }

    #[test]
    fn test_default_config_round_trips_as_yaml() {
        let yaml = serde_yaml::to_string(&ServerConfig::default()).unwrap();
        let config: ServerConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(config.port, 8080);
        assert!(config.settings.log_matches);
    }
}
