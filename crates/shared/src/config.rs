//! Application configuration management.
//!
//! Sources are layered in order: `config/default`, `config/{RUN_MODE}`, then
//! environment variables prefixed with `TALLYBOOK` (`__` separates sections,
//! e.g. `TALLYBOOK__LEDGER__STRICT_GL_SETUP=true`).

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Ledger posting behavior.
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Report query limits.
    #[serde(default)]
    pub reports: ReportsConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Ledger posting configuration.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LedgerConfig {
    /// When true, a source document whose GL accounts or fiscal period are
    /// missing fails to post instead of posting without a journal entry.
    #[serde(default)]
    pub strict_gl_setup: bool,
    /// Attempts made for operations that hit a lock conflict.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_max_retries() -> u32 {
    3
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            strict_gl_setup: false,
            max_retries: default_max_retries(),
        }
    }
}

/// Report configuration.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ReportsConfig {
    /// Audit trail page size when the caller gives none.
    #[serde(default = "default_audit_limit")]
    pub audit_default_limit: u64,
    /// Hard cap on the audit trail page size.
    #[serde(default = "default_audit_max_limit")]
    pub audit_max_limit: u64,
}

fn default_audit_limit() -> u64 {
    1000
}

fn default_audit_max_limit() -> u64 {
    5000
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            audit_default_limit: default_audit_limit(),
            audit_max_limit: default_audit_max_limit(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("TALLYBOOK").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_from_environment() {
        temp_env::with_vars(
            [
                ("TALLYBOOK__DATABASE__URL", Some("postgres://localhost/tally")),
                ("TALLYBOOK__LEDGER__STRICT_GL_SETUP", Some("true")),
                ("TALLYBOOK__REPORTS__AUDIT_MAX_LIMIT", Some("250")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.database.url, "postgres://localhost/tally");
                assert_eq!(config.database.max_connections, 10);
                assert!(config.ledger.strict_gl_setup);
                assert_eq!(config.ledger.max_retries, 3);
                assert_eq!(config.reports.audit_default_limit, 1000);
                assert_eq!(config.reports.audit_max_limit, 250);
            },
        );
    }

    #[test]
    fn test_missing_database_url_fails() {
        temp_env::with_vars_unset(["TALLYBOOK__DATABASE__URL"], || {
            assert!(AppConfig::load().is_err());
        });
    }

    #[test]
    fn test_section_defaults() {
        let ledger = LedgerConfig::default();
        assert!(!ledger.strict_gl_setup);
        assert_eq!(ledger.max_retries, 3);

        let reports = ReportsConfig::default();
        assert_eq!(reports.audit_default_limit, 1000);
        assert_eq!(reports.audit_max_limit, 5000);
    }
}
