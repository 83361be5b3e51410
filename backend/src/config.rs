//! Server configuration.
//!
//! Values are layered: serde defaults, then an optional `admissions.toml` next
//! to the binary, then `ADMISSIONS__<SECTION>__<KEY>` environment variables
//! (for example `ADMISSIONS__SERVER__PORT=9000`). A `.env` file, when present,
//! is loaded into the environment first.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "admissions";
const ENV_PREFIX: &str = "ADMISSIONS";

/// Placeholder shipped in the defaults; a server never starts with it.
const PLACEHOLDER_SECRET: &str = "change-me";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub uploads: UploadConfig,
    pub auth: AuthConfig,
    pub fees: FeesConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Maximum accepted JSON body, in bytes.
    pub json_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            json_limit: 10 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("admissions.sqlite"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding one sub-directory per bucket.
    pub root: PathBuf,
    pub signing_secret: String,
    /// Base URL prepended to generated object links.
    pub public_base_url: String,
    pub signed_url_ttl_secs: i64,
    /// Buckets whose objects are served without a signature.
    pub public_buckets: Vec<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("storage"),
            signing_secret: PLACEHOLDER_SECRET.to_string(),
            public_base_url: "http://127.0.0.1:8080".to_string(),
            signed_url_ttl_secs: 3600,
            public_buckets: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub max_bytes: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: common::model::document::MAX_UPLOAD_BYTES,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Accounts signing up with an address in this domain become admins.
    pub admin_email_domain: String,
    pub session_ttl_hours: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_email_domain: "@graceartisanschool.education".to_string(),
            session_ttl_hours: 24,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeesConfig {
    pub fonts_dir: PathBuf,
    /// Font family tried first; `LiberationSans` is the fallback.
    pub font_family: String,
    /// Output directory of batch invoice jobs.
    pub invoice_dir: PathBuf,
}

impl Default for FeesConfig {
    fn default() -> Self {
        Self {
            fonts_dir: PathBuf::from("./fonts"),
            font_family: "Arial".to_string(),
            invoice_dir: PathBuf::from("invoices"),
        }
    }
}

impl AppConfig {
    /// Loads `.env`, the optional config file and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        if Path::new(".env").exists() {
            match dotenvy::dotenv() {
                Ok(path) => log::info!("Loaded environment from {}", path.display()),
                Err(e) => log::warn!("Ignoring unreadable .env file: {e}"),
            }
        }

        let config = Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("storage.public_buckets")
                    .try_parsing(true),
            )
            .build()?;

        let config: AppConfig = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the server must not run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let secret = self.storage.signing_secret.trim();
        if secret.is_empty() || secret == PLACEHOLDER_SECRET {
            return Err(ConfigError::Message(format!(
                "storage.signing_secret must be set (for example with \
                 {ENV_PREFIX}__STORAGE__SIGNING_SECRET)"
            )));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.server.host.clone(), self.server.port)
    }

    /// A configuration rooted in `dir`, used by tests and local runs.
    pub fn rooted_at(dir: &Path) -> Self {
        let mut config = AppConfig::default();
        config.database.path = dir.join("admissions.sqlite");
        config.storage.root = dir.join("storage");
        config.storage.signing_secret = "test-secret".to_string();
        config.fees.invoice_dir = dir.join("invoices");
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.uploads.max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.storage.signed_url_ttl_secs, 3600);
        assert!(config.storage.public_buckets.is_empty());
        assert_eq!(config.auth.admin_email_domain, "@graceartisanschool.education");
    }

    #[test]
    fn partial_sources_keep_defaults() {
        let config: AppConfig = Config::builder()
            .set_override("server.port", 9000)
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.fees.font_family, "Arial");
    }

    #[test]
    fn placeholder_or_empty_signing_secret_is_rejected() {
        let mut config = AppConfig::default();
        assert!(config.validate().is_err());

        config.storage.signing_secret = "  ".to_string();
        assert!(config.validate().is_err());

        config.storage.signing_secret = "a-real-secret".to_string();
        assert!(config.validate().is_ok());
        assert!(AppConfig::rooted_at(Path::new("/tmp")).validate().is_ok());
    }
}
