//! Server configuration.
//!
//! Layers, later ones winning: built-in defaults, an optional TOML file, then
//! `COLLABVERSE__*` environment variables (`COLLABVERSE__STORE__BACKEND=mongo`).

use std::path::Path;

use ::config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

use crate::auth::models::AuthenticatedUser;
use crate::auth::provider::StaticTokenProvider;
use crate::error::AppError;

const DEFAULTS: &str = r#"
listen_addr = "0.0.0.0:3000"
demo_mode = false

[store]
backend = "memory"
"#;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub listen_addr: String,
    pub demo_mode: bool,
    pub store: StoreConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Which document store backs the server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreConfig {
    Memory,
    Mongo {
        uri: String,
        #[serde(default = "default_database")]
        database: String,
    },
    Firebase {
        url: String,
        #[serde(default)]
        auth_token: Option<String>,
    },
}

fn default_database() -> String {
    "collabverse".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub tokens: Vec<TokenEntry>,
}

/// A bearer token and the user it signs in as.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenEntry {
    pub token: String,
    pub user_id: String,
    pub display_name: String,
    #[serde(default)]
    pub email: String,
}

impl AppConfig {
    /// Load the layered configuration. `path` is the optional TOML file.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULTS, FileFormat::Toml));
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }
        let config = builder
            .add_source(
                Environment::with_prefix("COLLABVERSE")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// Parse a configuration from TOML text on top of the defaults.
    pub fn from_toml_str(toml: &str) -> Result<Self, AppError> {
        let config = Config::builder()
            .add_source(File::from_str(DEFAULTS, FileFormat::Toml))
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    pub fn identity_provider(&self) -> StaticTokenProvider {
        self.auth
            .tokens
            .iter()
            .fold(StaticTokenProvider::new(), |provider, entry| {
                provider.with_token(
                    &entry.token,
                    AuthenticatedUser::new(&entry.user_id, &entry.display_name, &entry.email),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:3000");
        assert!(!config.demo_mode);
        assert_eq!(config.store, StoreConfig::Memory);
        assert!(config.identity_provider().is_empty());
    }

    #[test]
    fn test_mongo_backend() {
        let config = AppConfig::from_toml_str(
            r#"
            demo_mode = true

            [store]
            backend = "mongo"
            uri = "mongodb://db:27017"
            "#,
        )
        .unwrap();
        assert!(config.demo_mode);
        assert_eq!(
            config.store,
            StoreConfig::Mongo {
                uri: "mongodb://db:27017".to_string(),
                database: "collabverse".to_string(),
            }
        );
    }

    #[test]
    fn test_firebase_backend_and_tokens() {
        let config = AppConfig::from_toml_str(
            r#"
            [store]
            backend = "firebase"
            url = "https://example-rtdb.firebaseio.com"

            [[auth.tokens]]
            token = "tok-ada"
            user_id = "u-ada"
            display_name = "Ada"
            "#,
        )
        .unwrap();
        assert!(matches!(
            config.store,
            StoreConfig::Firebase { auth_token: None, .. }
        ));
        assert_eq!(config.identity_provider().len(), 1);
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let result = AppConfig::from_toml_str("[store]\nbackend = \"redis\"\n");
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = AppConfig::load(Some(Path::new("/nonexistent/collabverse.toml")));
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
