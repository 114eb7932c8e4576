use std::env;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: `{value}`")]
    InvalidValue { var: &'static str, value: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub body_limit_bytes: usize,
    pub upload_dir: PathBuf,
    pub visualization_dir: PathBuf,
    pub model_path: PathBuf,
    pub model_url: Option<String>,
    pub github_token: Option<String>,
    pub model_input_op: String,
    pub model_output_op: String,
    pub image_size: u32,
    pub max_concurrent_predictions: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5000,
            body_limit_bytes: 10 * 1024 * 1024,
            upload_dir: PathBuf::from("uploads"),
            visualization_dir: PathBuf::from("visualizations"),
            model_path: PathBuf::from("model/frozen_graph.pb"),
            model_url: None,
            github_token: None,
            model_input_op: "x".to_string(),
            model_output_op: "Identity".to_string(),
            image_size: 224,
            max_concurrent_predictions: 1,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Unset variables keep their defaults; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Config::default();

        let body_limit_mb: usize = parse(&get, "BODY_LIMIT_MB", 10)?;
        let body_limit_bytes = body_limit_mb
            .checked_mul(1024 * 1024)
            .ok_or_else(|| ConfigError::InvalidValue {
                var: "BODY_LIMIT_MB",
                value: body_limit_mb.to_string(),
            })?;
        let image_size: u32 = parse(&get, "IMAGE_SIZE", defaults.image_size)?;
        if image_size == 0 {
            return Err(ConfigError::InvalidValue {
                var: "IMAGE_SIZE",
                value: "0".to_string(),
            });
        }
        let max_concurrent_predictions: usize = parse(
            &get,
            "MAX_CONCURRENT_PREDICTIONS",
            defaults.max_concurrent_predictions,
        )?;
        if max_concurrent_predictions == 0 {
            return Err(ConfigError::InvalidValue {
                var: "MAX_CONCURRENT_PREDICTIONS",
                value: "0".to_string(),
            });
        }

        Ok(Config {
            port: parse(&get, "PORT", defaults.port)?,
            body_limit_bytes,
            upload_dir: get("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            visualization_dir: get("VISUALIZATION_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.visualization_dir),
            model_path: get("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),
            model_url: get("MODEL_URL"),
            github_token: get("GITHUB_TOKEN"),
            model_input_op: get("MODEL_INPUT_OP").unwrap_or(defaults.model_input_op),
            model_output_op: get("MODEL_OUTPUT_OP").unwrap_or(defaults.model_output_op),
            image_size,
            max_concurrent_predictions,
        })
    }

    pub fn target_size(&self) -> (u32, u32) {
        (self.image_size, self.image_size)
    }
}

fn parse<T, G>(get: &G, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { var, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_with(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = config_with(&[]).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.body_limit_bytes, 10 * 1024 * 1024);
        assert_eq!(config.target_size(), (224, 224));
    }

    #[test]
    fn overrides_are_applied() {
        let config = config_with(&[
            ("PORT", "8081"),
            ("BODY_LIMIT_MB", "2"),
            ("UPLOAD_DIR", "/tmp/in"),
            ("MODEL_URL", "https://example.org/model.pb"),
            ("MODEL_OUTPUT_OP", "softmax"),
            ("MAX_CONCURRENT_PREDICTIONS", "4"),
        ])
        .unwrap();

        assert_eq!(config.port, 8081);
        assert_eq!(config.body_limit_bytes, 2 * 1024 * 1024);
        assert_eq!(config.upload_dir, PathBuf::from("/tmp/in"));
        assert_eq!(
            config.model_url.as_deref(),
            Some("https://example.org/model.pb")
        );
        assert_eq!(config.model_output_op, "softmax");
        assert_eq!(config.max_concurrent_predictions, 4);
    }

    #[test]
    fn blank_values_are_ignored() {
        let config = config_with(&[("PORT", "  "), ("MODEL_URL", "")]).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.model_url, None);
    }

    #[test]
    fn invalid_numbers_are_reported() {
        assert_eq!(
            config_with(&[("PORT", "70000")]).unwrap_err(),
            ConfigError::InvalidValue {
                var: "PORT",
                value: "70000".to_string()
            }
        );
        assert!(config_with(&[("BODY_LIMIT_MB", "ten")]).is_err());
        assert!(config_with(&[("MAX_CONCURRENT_PREDICTIONS", "0")]).is_err());
        assert!(config_with(&[("IMAGE_SIZE", "0")]).is_err());
    }

    #[test]
    fn body_limit_overflow_is_reported() {
        let huge = usize::MAX.to_string();
        assert_eq!(
            config_with(&[("BODY_LIMIT_MB", huge.as_str())]).unwrap_err(),
            ConfigError::InvalidValue {
                var: "BODY_LIMIT_MB",
                value: huge.clone()
            }
        );
    }
}
