use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default upstream model provider endpoint.
pub const DEFAULT_OPENAI_API_ENDPOINT: &str = "https://api.openai.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Process-wide provider key. A per-request key may override it.
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default = "default_endpoint")]
    pub openai_api_endpoint: String,
    #[serde(default)]
    pub openai_organization: Option<String>,
    /// Whether clients may bring their own provider key.
    #[serde(default)]
    pub allow_self_openai_key: bool,
    /// Persist sessions (connections, conversations, messages) to the data dir.
    #[serde(default)]
    pub use_database: bool,
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

/// Feature matrix derived from the environment and persistence flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Features {
    pub debug: bool,
    pub collect: bool,
    /// Clients may show a field for their own provider key.
    pub allow_self_openai_key: bool,
}

const CONFIG_FILE_PATH: &str = "config.toml";

fn default_endpoint() -> String {
    DEFAULT_OPENAI_API_ENDPOINT.to_string()
}

fn parse_bool_env(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            openai_api_key: None,
            openai_api_endpoint: default_endpoint(),
            openai_organization: None,
            allow_self_openai_key: false,
            use_database: false,
            environment: Environment::Development,
            data_dir: None,
        }
    }
}

impl Config {
    /// Load `config.toml` from the working directory when present, then apply
    /// environment overrides.
    pub fn new() -> Self {
        let mut config = Config::default();

        if std::path::Path::new(CONFIG_FILE_PATH).exists() {
            match std::fs::read_to_string(CONFIG_FILE_PATH) {
                Ok(content) => match toml::from_str::<Config>(&content) {
                    Ok(file_config) => config = file_config,
                    Err(e) => log::warn!("Failed to parse {}: {}", CONFIG_FILE_PATH, e),
                },
                Err(e) => log::warn!("Failed to read {}: {}", CONFIG_FILE_PATH, e),
            }
        }

        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Apply overrides from an environment lookup. Split out so tests can feed
    /// a fixed map instead of the process environment.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.openai_api_key = non_empty(key);
        }
        if let Some(endpoint) = lookup("OPENAI_API_ENDPOINT").and_then(non_empty) {
            self.openai_api_endpoint = endpoint;
        }
        if let Some(organization) = lookup("OPENAI_ORGANIZATION") {
            self.openai_organization = non_empty(organization);
        }
        if let Some(allow) = lookup("ALLOW_SELF_OPENAI_KEY")
            .or_else(|| lookup("NEXT_PUBLIC_ALLOW_SELF_OPENAI_KEY"))
        {
            self.allow_self_openai_key = parse_bool_env(&allow);
        }
        if let Some(use_database) =
            lookup("USE_DATABASE").or_else(|| lookup("NEXT_PUBLIC_USE_DATABASE"))
        {
            self.use_database = parse_bool_env(&use_database);
        }
        if let Some(env) = lookup("APP_ENV") {
            self.environment = Environment::parse(&env);
        }
        if let Some(dir) = lookup("DATA_DIR").and_then(non_empty) {
            self.data_dir = Some(PathBuf::from(dir));
        }
    }

    pub fn features(&self) -> Features {
        Features {
            debug: self.environment == Environment::Development,
            collect: self.use_database,
            allow_self_openai_key: self.allow_self_openai_key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn parse_bool_env_true_values() {
        for value in ["1", "true", "TRUE", " yes ", "Y", "on"] {
            assert!(parse_bool_env(value), "value {value:?} should be true");
        }
    }

    #[test]
    fn parse_bool_env_false_values() {
        for value in ["0", "false", "no", "off", "", "  "] {
            assert!(!parse_bool_env(value), "value {value:?} should be false");
        }
    }

    #[test]
    fn defaults_point_at_public_endpoint() {
        let config = Config::default();
        assert_eq!(config.openai_api_endpoint, DEFAULT_OPENAI_API_ENDPOINT);
        assert!(config.openai_api_key.is_none());
        assert!(!config.allow_self_openai_key);
    }

    #[test]
    fn env_overrides_are_applied() {
        let mut config = Config::default();
        config.apply_env(lookup_from(&[
            ("OPENAI_API_KEY", "sk-env"),
            ("OPENAI_API_ENDPOINT", "https://proxy.example.com"),
            ("OPENAI_ORGANIZATION", "org-1"),
            ("NEXT_PUBLIC_ALLOW_SELF_OPENAI_KEY", "true"),
            ("USE_DATABASE", "1"),
            ("APP_ENV", "production"),
        ]));

        assert_eq!(config.openai_api_key.as_deref(), Some("sk-env"));
        assert_eq!(config.openai_api_endpoint, "https://proxy.example.com");
        assert_eq!(config.openai_organization.as_deref(), Some("org-1"));
        assert!(config.allow_self_openai_key);
        assert!(config.use_database);
        assert_eq!(config.environment, Environment::Production);
    }

    #[test]
    fn blank_key_is_treated_as_missing() {
        let mut config = Config::default();
        config.apply_env(lookup_from(&[("OPENAI_API_KEY", "   ")]));
        assert!(config.openai_api_key.is_none());
    }

    #[test]
    fn features_follow_environment_and_persistence() {
        let mut config = Config::default();
        assert_eq!(
            config.features(),
            Features {
                debug: true,
                collect: false,
                allow_self_openai_key: false
            }
        );

        config.environment = Environment::Production;
        config.use_database = true;
        config.allow_self_openai_key = true;
        assert_eq!(
            config.features(),
            Features {
                debug: false,
                collect: true,
                allow_self_openai_key: true
            }
        );
    }
}
