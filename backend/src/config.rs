use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::ConfigError;

const CONFIG_ENV: &str = "FRESHNESS_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub upload: UploadConfig,
    /// Directory relative model paths are resolved against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub path: PathBuf,
    pub device: ComputeDevice,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub max_bytes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ComputeDevice {
    #[default]
    Cpu,
    /// CUDA when available, CPU otherwise.
    Auto,
}

impl FromStr for ComputeDevice {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu" => Ok(ComputeDevice::Cpu),
            "auto" | "cuda" => Ok(ComputeDevice::Auto),
            other => Err(ConfigError::InvalidValue {
                key: "model.device".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8081,
            workers: None,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("model.pt"),
            device: ComputeDevice::Cpu,
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            model: ModelConfig::default(),
            upload: UploadConfig::default(),
            base_dir: PathBuf::from("."),
        }
    }
}

impl AppConfig {
    /// Reads the YAML config, then applies environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::default_path());
        let mut config = Self::from_file_or_default(&path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn default_path() -> PathBuf {
        match std::env::var("CARGO_MANIFEST_DIR") {
            Ok(manifest_dir) => PathBuf::from(manifest_dir).join("../config/freshness.yaml"),
            Err(_) => PathBuf::from("config/freshness.yaml"),
        }
    }

    /// A missing file yields the defaults, anchored at the file's directory.
    pub fn from_file_or_default(path: &Path) -> Result<Self, ConfigError> {
        let base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_yaml_str(&contents, base_dir),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("Config file {} not found, using defaults", path.display());
                Ok(Self {
                    base_dir,
                    ..Self::default()
                })
            }
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn from_yaml_str(contents: &str, base_dir: PathBuf) -> Result<Self, ConfigError> {
        let mut config: AppConfig = if contents.trim().is_empty() {
            AppConfig::default()
        } else {
            serde_yaml::from_str(contents)?
        };
        config.base_dir = base_dir;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port.parse().map_err(|_| ConfigError::InvalidValue {
                key: "PORT".to_string(),
                value: port.clone(),
            })?;
        }
        if let Some(path) = lookup("FRESHNESS_MODEL_PATH") {
            self.model.path = PathBuf::from(path);
        }
        if let Some(device) = lookup("FRESHNESS_DEVICE") {
            self.model.device = device.parse()?;
        }
        if let Some(max_bytes) = lookup("FRESHNESS_MAX_UPLOAD_BYTES") {
            self.upload.max_bytes =
                max_bytes.parse().map_err(|_| ConfigError::InvalidValue {
                    key: "FRESHNESS_MAX_UPLOAD_BYTES".to_string(),
                    value: max_bytes.clone(),
                })?;
        }
        self.validate()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.model.path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "model.path".to_string(),
                value: String::new(),
            });
        }
        if self.upload.max_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "upload.max_bytes".to_string(),
                value: "0".to_string(),
            });
        }
        if self.server.workers == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "server.workers".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    /// Model weights location; relative paths hang off `base_dir`.
    pub fn model_path(&self) -> PathBuf {
        if self.model.path.is_absolute() {
            self.model.path.clone()
        } else {
            self.base_dir.join(&self.model.path)
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn parses_yaml_and_resolves_model_against_base_dir() {
        let yaml = r#"
server:
  port: 9000
model:
  path: ../models/model.pt
  device: auto
upload:
  max_bytes: 1024
"#;
        let config = AppConfig::from_yaml_str(yaml, PathBuf::from("/srv/app/config")).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.model.device, ComputeDevice::Auto);
        assert_eq!(config.upload.max_bytes, 1024);
        assert_eq!(
            config.model_path(),
            PathBuf::from("/srv/app/config/../models/model.pt")
        );
        assert_eq!(config.bind_address(), "0.0.0.0:9000");
    }

    #[test]
    fn absolute_model_path_is_kept() {
        let yaml = "model:\n  path: /opt/models/fresh.pt\n";
        let config = AppConfig::from_yaml_str(yaml, PathBuf::from("/elsewhere")).unwrap();
        assert_eq!(config.model_path(), PathBuf::from("/opt/models/fresh.pt"));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.yaml");
        let config = AppConfig::from_file_or_default(&path).unwrap();
        assert_eq!(config.server.port, 8081);
        assert_eq!(config.model_path(), dir.path().join("model.pt"));
    }

    #[test]
    fn reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("freshness.yaml");
        std::fs::write(&path, "model:\n  path: weights/model.pt\n").unwrap();
        let config = AppConfig::from_file_or_default(&path).unwrap();
        assert_eq!(config.model_path(), dir.path().join("weights/model.pt"));
    }

    #[test]
    fn env_overrides_take_precedence() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("PORT", "7000"),
            ("HOST", "127.0.0.1"),
            ("FRESHNESS_MODEL_PATH", "other.pt"),
            ("FRESHNESS_DEVICE", "CPU"),
        ]);
        let mut config = AppConfig::default();
        config.model.device = ComputeDevice::Auto;
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.bind_address(), "127.0.0.1:7000");
        assert_eq!(config.model.path, PathBuf::from("other.pt"));
        assert_eq!(config.model.device, ComputeDevice::Cpu);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut config = AppConfig::default();
        let err = config
            .apply_overrides(|key| (key == "PORT").then(|| "not-a-port".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        assert!(AppConfig::from_yaml_str("model:\n  device: tpu\n", PathBuf::new()).is_err());
        assert!(AppConfig::from_yaml_str("upload:\n  max_bytes: 0\n", PathBuf::new()).is_err());
    }
}
