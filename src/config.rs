use std::env;

use thiserror::Error;

/// Class names in the order the model emits them.
pub const CLASS_NAMES: [&str; 3] = ["anthracnose", "nutrient_deficiency", "others"];

/// (height, width, channels) expected by the MobileNetV2 graph.
pub const IMAGE_DIMENSIONS: (u32, u32, u32) = (150, 150, 3);

pub const DEFAULT_MODEL_PATH: &str = "./model/chili_disease_mobilenet.pb";
pub const INPUT_OPERATION: &str = "x";
pub const OUTPUT_OPERATION: &str = "Identity";

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_BODY_LIMIT_MB: usize = 5;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("BODY_LIMIT_MB must be a valid integer, got {0:?}")]
    BodyLimit(String),
    #[error("PORT must be a valid number between 0 and 65535, got {0:?}")]
    Port(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub port: u16,
    pub body_limit_bytes: usize,
    pub model_path: String,
    pub model_url: Option<String>,
    pub github_token: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let body_limit_bytes = match lookup("BODY_LIMIT_MB") {
            Some(raw) => {
                let mb = raw
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| ConfigError::BodyLimit(raw.clone()))?;
                mb.checked_mul(1024 * 1024)
                    .ok_or(ConfigError::BodyLimit(raw))?
            }
            None => DEFAULT_BODY_LIMIT_MB * 1024 * 1024,
        };

        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::Port(raw.clone()))?,
            None => DEFAULT_PORT,
        };

        let model_path = lookup("MODEL_PATH")
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL_PATH.to_string());

        Ok(Config {
            port,
            body_limit_bytes,
            model_path,
            model_url: lookup("MODEL_URL").filter(|u| !u.is_empty()),
            github_token: lookup("GITHUB_TOKEN").filter(|t| !t.is_empty()),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.body_limit_bytes, 5 * 1024 * 1024);
        assert_eq!(config.model_path, DEFAULT_MODEL_PATH);
        assert_eq!(config.model_url, None);
        assert_eq!(config.bind_address(), "0.0.0.0:5000");
    }

    #[test]
    fn reads_overrides() {
        let config = config_from(&[
            ("PORT", "8080"),
            ("BODY_LIMIT_MB", "12"),
            ("MODEL_PATH", "/srv/model.pb"),
            ("MODEL_URL", "https://example.com/model.pb"),
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.body_limit_bytes, 12 * 1024 * 1024);
        assert_eq!(config.model_path, "/srv/model.pb");
        assert_eq!(config.model_url.as_deref(), Some("https://example.com/model.pb"));
    }

    #[test]
    fn rejects_bad_numbers() {
        assert_eq!(
            config_from(&[("PORT", "70000")]),
            Err(ConfigError::Port("70000".to_string()))
        );
        assert_eq!(
            config_from(&[("BODY_LIMIT_MB", "five")]),
            Err(ConfigError::BodyLimit("five".to_string()))
        );
    }
}
