use serde::Deserialize;
use std::path::{Path, PathBuf};
use tumor_cnn::DevicePreference;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(deserialize_with = "deserialize_log_level")]
    pub log_level: LogLevel,
    pub model: ModelConfig,
}

fn deserialize_log_level<'de, D>(deserializer: D) -> Result<LogLevel, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.try_into().map_err(serde::de::Error::custom)
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

impl ServerConfig {
    pub fn get_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    pub weights_file: String,
    pub model_dir: PathBuf,
    #[serde(default)]
    pub device: DevicePreference,
}

impl ModelConfig {
    pub fn get_path(&self) -> PathBuf {
        self.model_dir.join(&self.weights_file)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.get_path().exists() {
            return Err(format!("Weights file not found: {:?}", self.get_path()));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            other => Err(format!(
                "{} is not a supported minimum log level. Use either `debug` or `info`.",
                other
            )),
        }
    }
}

/// Loads `configuration/base.yaml`, then `configuration/<APP_ENVIRONMENT>.yaml`,
/// then `APP_`-prefixed environment variables (`APP_SERVER__PORT=8080`).
pub fn get_configuration() -> Result<Config, config::ConfigError> {
    let base_path = std::env::current_dir()
        .map_err(|e| config::ConfigError::Message(format!("No current directory: {}", e)))?;
    let configuration_directory = base_path.join("configuration");

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(config::ConfigError::Message)?;

    load_configuration(&configuration_directory, environment)
}

pub fn load_configuration(
    configuration_directory: &Path,
    environment: Environment,
) -> Result<Config, config::ConfigError> {
    let sources = config::Config::builder()
        .add_source(config::File::from(
            configuration_directory.join("base.yaml"),
        ))
        .add_source(config::File::from(
            configuration_directory.join(format!("{}.yaml", environment.as_str())),
        ))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    let settings = sources.try_deserialize::<Config>()?;
    if let Err(e) = settings.model.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        return Err(config::ConfigError::Message(e));
    }

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const BASE: &str = r#"
log_level: info
server:
  host: 127.0.0.1
  port: 5000
model:
  model_dir: .
  weights_file: tumor.pth
"#;

    fn configuration_dir(base: &str, local: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("base.yaml"), base).unwrap();
        std::fs::write(dir.path().join("local.yaml"), local).unwrap();
        dir
    }

    #[test]
    fn test_load_configuration_with_overrides() {
        let weights_dir = TempDir::new().unwrap();
        std::fs::write(weights_dir.path().join("tumor.pth"), b"weights").unwrap();

        let local = format!(
            "log_level: debug\nmodel:\n  model_dir: {}\n  device: cpu\n",
            weights_dir.path().display()
        );
        let dir = configuration_dir(BASE, &local);

        let config = load_configuration(dir.path(), Environment::Local).unwrap();

        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.server.get_address(), "127.0.0.1:5000");
        assert_eq!(config.server.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.model.device, DevicePreference::Cpu);
        assert_eq!(config.model.get_path(), weights_dir.path().join("tumor.pth"));
    }

    #[test]
    fn test_missing_weights_file_fails_validation() {
        let local = "model:\n  model_dir: /nonexistent/models\n";
        let dir = configuration_dir(BASE, local);

        let error = load_configuration(dir.path(), Environment::Local).unwrap_err();
        assert!(error.to_string().contains("Weights file not found"));
    }

    #[test]
    fn test_invalid_log_level_is_rejected() {
        let dir = configuration_dir(
            &BASE.replace("log_level: info", "log_level: trace"),
            "server:\n  port: 5001\n",
        );

        assert!(load_configuration(dir.path(), Environment::Local).is_err());
    }

    #[test]
    fn test_environment_parsing() {
        assert_eq!(
            Environment::try_from("Production".to_string()).unwrap(),
            Environment::Production
        );
        assert!(Environment::try_from("staging".to_string()).is_err());
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(LogLevel::try_from("DEBUG".to_string()).unwrap(), LogLevel::Debug);
        assert!(LogLevel::try_from("warn".to_string()).is_err());
    }
}
