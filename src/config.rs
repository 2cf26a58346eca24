// This file is part of the product Quire.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug)]
pub enum ConfigError {
    LoadError(String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::LoadError(msg) => write!(f, "Configuration load error: {}", msg),
            ConfigError::ValidationError(msg) => {
                write!(f, "Configuration validation error: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub admin: AdminConfig,
    pub logging: LoggingConfig,
    pub app: AppConfig,
}

#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub server: ServerConfig,
    pub admin: AdminConfig,
    pub logging: LoggingConfig,
    pub app: AppConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_workers() -> usize {
    4
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AdminConfig {
    pub path: String,
    pub password_hash: String,
    #[serde(default = "default_session_ttl_seconds")]
    pub session_ttl_seconds: u64,
}

fn default_session_ttl_seconds() -> u64 {
    3600
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub name: String,
    pub description: String,
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl Config {
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let config_path = root.join("config.yaml");
        let config_content = fs::read_to_string(&config_path).map_err(|e| {
            ConfigError::LoadError(format!(
                "Failed to read config file '{}': {}",
                config_path.display(),
                e
            ))
        })?;
        let config: Config = serde_yaml::from_str(&config_content).map_err(|e| {
            ConfigError::LoadError(format!(
                "Failed to parse config file '{}': {}",
                config_path.display(),
                e
            ))
        })?;
        Ok(config)
    }

    /// Loads and validates configuration at startup. If validation fails, the application should not start.
    pub fn load_and_validate(root: &Path) -> Result<ValidatedConfig, ConfigError> {
        let config = Self::load(root)?;

        Self::validate_server(&config.server)?;
        Self::validate_admin(&config.admin)?;
        Self::validate_logging(&config.logging)?;

        Ok(ValidatedConfig {
            server: config.server,
            admin: config.admin,
            logging: config.logging,
            app: config.app,
        })
    }

    fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
        if server.host.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "server.host cannot be empty".to_string(),
            ));
        }
        if server.port == 0 {
            return Err(ConfigError::ValidationError(
                "server.port must be greater than 0".to_string(),
            ));
        }
        if server.workers == 0 {
            return Err(ConfigError::ValidationError(
                "server.workers must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_admin(admin: &AdminConfig) -> Result<(), ConfigError> {
        if !admin.path.starts_with('/') || admin.path.len() < 2 {
            return Err(ConfigError::ValidationError(format!(
                "admin.path must start with '/' and name a route, got: '{}'",
                admin.path
            )));
        }
        if admin.path.ends_with('/') {
            return Err(ConfigError::ValidationError(
                "admin.path must not end with '/'".to_string(),
            ));
        }
        if !admin.password_hash.starts_with("$argon2") {
            return Err(ConfigError::ValidationError(
                "admin.password_hash must be an Argon2 PHC string".to_string(),
            ));
        }
        if !(60..=86400).contains(&admin.session_ttl_seconds) {
            return Err(ConfigError::ValidationError(format!(
                "admin.session_ttl_seconds must be between 60 and 86400, got: {}",
                admin.session_ttl_seconds
            )));
        }
        Ok(())
    }

    fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
        let level = logging.level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "logging.level must be one of {:?}, got: '{}'",
                LOG_LEVELS, logging.level
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::test_fixtures::TestFixtureRoot;
    use std::fs;

    fn base_server_config() -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 7080,
            workers: 1,
        }
    }

    fn base_admin_config() -> AdminConfig {
        AdminConfig {
            path: "/admin".to_string(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdHNhbHRzYWx0$hash".to_string(),
            session_ttl_seconds: 3600,
        }
    }

    #[test]
    fn validate_server_accepts_defaults() {
        assert!(Config::validate_server(&base_server_config()).is_ok());
    }

    #[test]
    fn validate_server_rejects_empty_host() {
        let mut server = base_server_config();
        server.host = "  ".to_string();
        assert!(Config::validate_server(&server).is_err());
    }

    #[test]
    fn validate_server_rejects_zero_port() {
        let mut server = base_server_config();
        server.port = 0;
        assert!(Config::validate_server(&server).is_err());
    }

    #[test]
    fn validate_admin_accepts_defaults() {
        assert!(Config::validate_admin(&base_admin_config()).is_ok());
    }

    #[test]
    fn validate_admin_rejects_relative_path() {
        let mut admin = base_admin_config();
        admin.path = "admin".to_string();
        assert!(Config::validate_admin(&admin).is_err());
    }

    #[test]
    fn validate_admin_rejects_trailing_slash() {
        let mut admin = base_admin_config();
        admin.path = "/admin/".to_string();
        assert!(Config::validate_admin(&admin).is_err());
    }

    #[test]
    fn validate_admin_rejects_plaintext_password() {
        let mut admin = base_admin_config();
        admin.password_hash = "admin123".to_string();
        let err = Config::validate_admin(&admin).expect_err("plaintext should be rejected");
        assert!(err.to_string().contains("Argon2"));
    }

    #[test]
    fn validate_admin_rejects_short_session_ttl() {
        let mut admin = base_admin_config();
        admin.session_ttl_seconds = 5;
        assert!(Config::validate_admin(&admin).is_err());
    }

    #[test]
    fn validate_logging_rejects_unknown_level() {
        let logging = LoggingConfig {
            level: "verbose".to_string(),
        };
        assert!(Config::validate_logging(&logging).is_err());
    }

    #[test]
    fn validate_logging_accepts_mixed_case_level() {
        let logging = LoggingConfig {
            level: "Info".to_string(),
        };
        assert!(Config::validate_logging(&logging).is_ok());
    }

    #[test]
    fn load_reports_missing_file() {
        let fixture = TestFixtureRoot::new_unique("config-missing").unwrap();
        let err = Config::load(fixture.path()).expect_err("missing config should fail");
        assert!(err.to_string().contains("config.yaml"));
    }

    #[test]
    fn load_and_validate_round_trips_yaml() {
        let fixture = TestFixtureRoot::new_unique("config-roundtrip").unwrap();
        let yaml = "server:\n  host: \"127.0.0.1\"\n  port: 7080\n  workers: 2\n\nadmin:\n  path: \"/admin\"\n  password_hash: \"$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA\"\n\nlogging:\n  level: \"debug\"\n\napp:\n  name: \"Quire\"\n  description: \"test\"\n";
        fs::write(fixture.path().join("config.yaml"), yaml).unwrap();
        let config = Config::load_and_validate(fixture.path()).expect("valid config");
        assert_eq!(config.server.workers, 2);
        assert_eq!(config.admin.session_ttl_seconds, 3600);
        assert_eq!(config.logging.level, "debug");
    }
}
