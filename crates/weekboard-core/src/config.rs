use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{Employee, EmployeeKind};

pub const DEFAULT_PORT: u16 = 18790;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const MAX_PAYLOAD_BYTES: usize = 64 * 1024; // 64 KB cap per inbound WS frame
pub const HEARTBEAT_INTERVAL_SECS: u64 = 30;

/// Base collection names. The effective name is environment-qualified, see
/// [`WeekboardConfig::collection_name`].
pub const TASKS_COLLECTION: &str = "schedule_tasks";
pub const EMPLOYEES_COLLECTION: &str = "employees";

/// Top-level config (weekboard.toml + WEEKBOARD_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WeekboardConfig {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub roster: RosterConfig,
}

/// Deployment environment. Non-production environments write to suffixed
/// collections so a dev instance never touches production rows.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl Environment {
    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }

    /// Suffix appended to every collection name.
    pub fn collection_suffix(&self) -> &'static str {
        match self {
            Environment::Development => "_dev",
            Environment::Production => "",
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "Development"),
            Environment::Production => write!(f, "Production"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default)]
    pub auth: AuthConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
            auth: AuthConfig::default(),
        }
    }
}

/// Shared-password gate. `None` disables the check entirely (local use).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Fallback roster shown when the employees collection is empty, and the
/// seed source for `seed_defaults`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterConfig {
    #[serde(default = "default_roster")]
    pub defaults: Vec<Employee>,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            defaults: default_roster(),
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.weekboard/weekboard.db", home)
}

fn default_roster() -> Vec<Employee> {
    [
        ("Radim", "Foto / Retuše / Ad Hoc úkoly", EmployeeKind::Internal),
        ("Radek", "Copy", EmployeeKind::Internal),
        ("Věrka", "Copy", EmployeeKind::Internal),
        ("Tonda", "Grafika / DTP", EmployeeKind::Internal),
        ("Lukáš", "3D / Motion", EmployeeKind::Internal),
        ("Vlaďka", "Copy", EmployeeKind::External),
        ("Roman", "DTP / Motion", EmployeeKind::External),
        ("Honza Dočkal", "Grafika / DTP", EmployeeKind::External),
        ("Terka", "Foto / Retuše", EmployeeKind::External),
        ("Michal", "Video / 3D / Motion", EmployeeKind::External),
        ("Yume", "Grafika / Foto", EmployeeKind::External),
    ]
    .into_iter()
    .map(|(name, position, kind)| Employee::new(name, position, kind))
    .collect()
}

impl WeekboardConfig {
    /// Load config from a TOML file with WEEKBOARD_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.weekboard/weekboard.toml
    ///
    /// A missing file is not an error; every section has defaults.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: WeekboardConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("WEEKBOARD_").split("__"))
            .extract()
            .map_err(|e| crate::error::WeekboardError::Config(e.to_string()))?;

        Ok(config)
    }

    /// Environment-qualified collection (table) name for `base`.
    pub fn collection_name(&self, base: &str) -> String {
        let name = format!("{}{}", base, self.environment.collection_suffix());
        debug!(environment = %self.environment, collection = %name, "resolved collection");
        name
    }

    pub fn tasks_collection(&self) -> String {
        self.collection_name(TASKS_COLLECTION)
    }

    pub fn employees_collection(&self) -> String {
        self.collection_name(EMPLOYEES_COLLECTION)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.weekboard/weekboard.toml", home)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn development_collections_are_suffixed() {
        let mut config = WeekboardConfig::default();
        assert_eq!(config.tasks_collection(), "schedule_tasks");

        config.environment = Environment::Development;
        assert_eq!(config.tasks_collection(), "schedule_tasks_dev");
        assert_eq!(config.employees_collection(), "employees_dev");
    }

    #[test]
    fn load_merges_file_and_env() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "weekboard.toml",
                r#"
                environment = "development"

                [gateway]
                port = 9000

                [[roster.defaults]]
                name = "Jana"
                position = "Copy"
                type = "external"
                "#,
            )?;
            jail.set_env("WEEKBOARD_GATEWAY__BIND", "0.0.0.0");

            let config = WeekboardConfig::load(Some("weekboard.toml")).expect("load");
            assert!(config.environment.is_development());
            assert_eq!(config.gateway.port, 9000);
            assert_eq!(config.gateway.bind, "0.0.0.0");
            assert_eq!(config.roster.defaults.len(), 1);
            assert_eq!(config.roster.defaults[0].kind, EmployeeKind::External);
            Ok(())
        });
    }

    #[test]
    fn default_roster_is_populated() {
        let config = WeekboardConfig::default();
        assert_eq!(config.roster.defaults.len(), 11);
        assert!(config.gateway.auth.password.is_none());
    }
}
