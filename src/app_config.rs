//! Application configuration from file and environment variables
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Environment variables (`TICKETDESK_<SECTION>__<KEY>`)
//! 2. Config file (config.toml)
//! 3. Default values
//!
//! `DATABASE_URL`, `SECRET_KEY` and `SALT` are read from the environment
//! directly and never belong in the config file.

use config::{Config, ConfigError, Environment, File};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// Global application configuration
pub static APP_CONFIG: Lazy<RwLock<AppConfig>> = Lazy::new(|| {
    RwLock::new(AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config file, using defaults: {}", e);
        AppConfig::default()
    }))
});

/// Site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub name: String,
    pub description: String,
    pub base_url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: "Ticket Desk".to_string(),
            description: "Support tickets, groups and accounts".to_string(),
            base_url: "http://localhost:8080".to_string(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the server binds to
    pub bind: String,
    /// Directory served under /static
    pub static_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
            static_dir: "./public/static".to_string(),
        }
    }
}

/// Security configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Session timeout in minutes (default: 24 hours)
    pub session_timeout_minutes: u32,
    /// Minimum length accepted for new passwords
    pub min_password_length: u32,
    /// Mark the session cookie Secure (requires HTTPS)
    pub cookie_secure: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            session_timeout_minutes: 1440,
            min_password_length: 8,
            cookie_secure: false,
        }
    }
}

/// Listing limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Tickets per page
    pub tickets_per_page: u32,
    /// Members per page
    pub members_per_page: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            tickets_per_page: 20,
            members_per_page: 50,
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub site: SiteConfig,
    pub server: ServerConfig,
    pub security: SecurityConfig,
    pub limits: LimitsConfig,
}

impl AppConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("config.toml")
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &str) -> Result<Self, ConfigError> {
        Self::load_with_env(path, environment())
    }

    fn load_with_env(path: &str, env: Environment) -> Result<Self, ConfigError> {
        use config::FileFormat;

        let config = Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(File::new(path, FileFormat::Toml).required(false))
            .add_source(env)
            .build()?;

        config.try_deserialize()
    }
}

/// Environment overrides, e.g. `TICKETDESK_SERVER__BIND` or
/// `TICKETDESK_LIMITS__TICKETS_PER_PAGE`. Sections and keys are split on a
/// double underscore so key names keep their own underscores.
fn environment() -> Environment {
    Environment::with_prefix("TICKETDESK")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

/// Initialize application configuration
///
/// Triggers the lazy load so a broken config file is reported at start-up.
pub fn init() {
    let config = get_config();
    log::info!("Configuration loaded: site.name = {}", config.site.name);
}

/// Get the current application configuration
pub fn get_config() -> AppConfig {
    APP_CONFIG.read().map(|c| c.clone()).unwrap_or_default()
}

pub fn site() -> SiteConfig {
    get_config().site
}

pub fn server() -> ServerConfig {
    get_config().server
}

pub fn security() -> SecurityConfig {
    get_config().security
}

pub fn limits() -> LimitsConfig {
    get_config().limits
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.site.name, "Ticket Desk");
        assert_eq!(config.server.bind, "0.0.0.0:8080");
        assert_eq!(config.security.session_timeout_minutes, 1440);
        assert_eq!(config.security.min_password_length, 8);
        assert_eq!(config.limits.tickets_per_page, 20);
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut temp_file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[site]
name = "Acme Support"
base_url = "https://support.example.com"

[server]
bind = "127.0.0.1:9000"

[limits]
tickets_per_page = 50
"#
        )
        .unwrap();

        let config = AppConfig::load_from_path(temp_file.path().to_str().unwrap()).unwrap();

        assert_eq!(config.site.name, "Acme Support");
        assert_eq!(config.site.base_url, "https://support.example.com");
        assert_eq!(config.server.bind, "127.0.0.1:9000");
        assert_eq!(config.limits.tickets_per_page, 50);
        // Unspecified values keep their defaults
        assert_eq!(config.limits.members_per_page, 50);
        assert_eq!(config.security.min_password_length, 8);
    }

    #[test]
    fn test_environment_overrides_keys_with_underscores() {
        let vars: config::Map<String, String> = [
            ("TICKETDESK_SERVER__BIND", "127.0.0.1:1"),
            ("TICKETDESK_SERVER__STATIC_DIR", "/srv/static"),
            ("TICKETDESK_LIMITS__TICKETS_PER_PAGE", "7"),
            ("TICKETDESK_SECURITY__COOKIE_SECURE", "true"),
            ("TICKETDESK_SECURITY__SESSION_TIMEOUT_MINUTES", "30"),
            ("UNRELATED_LIMITS__TICKETS_PER_PAGE", "99"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect();

        let config = AppConfig::load_with_env(
            "/nonexistent/config.toml",
            environment().source(Some(vars)),
        )
        .unwrap();

        assert_eq!(config.server.bind, "127.0.0.1:1");
        assert_eq!(config.server.static_dir, "/srv/static");
        assert_eq!(config.limits.tickets_per_page, 7);
        assert!(config.security.cookie_secure);
        assert_eq!(config.security.session_timeout_minutes, 30);
        assert_eq!(config.limits.members_per_page, 50);
    }

    #[test]
    fn test_missing_config_file_uses_defaults() {
        let config = AppConfig::load_from_path("/nonexistent/config.toml").unwrap();
        assert_eq!(config.site.name, "Ticket Desk");
        assert_eq!(config.limits.tickets_per_page, 20);
    }
}
