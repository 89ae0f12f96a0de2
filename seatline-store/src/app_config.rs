use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub directory: DirectoryConfig,
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// Without a URL the service runs on the in-memory store.
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct DirectoryConfig {
    #[serde(alias = "baseUrl")]
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WorkflowConfig {
    #[serde(alias = "gatewayAddress")]
    pub gateway_address: String,
    #[serde(alias = "processId", default = "default_process_id")]
    pub process_id: String,
}

fn default_process_id() -> String {
    "seat-reservation".into()
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotifierConfig {
    pub sender: String,
    pub region: String,
    /// HTTP delivery endpoint; notifications are only logged when absent.
    pub endpoint: Option<String>,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            sender: "noreply@seatline.local".into(),
            region: "local".into(),
            endpoint: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TimeoutConfig {
    pub store_ms: u64,
    pub directory_ms: u64,
    pub workflow_ms: u64,
    pub notifier_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            store_ms: 5_000,
            directory_ms: 3_000,
            workflow_ms: 10_000,
            notifier_ms: 5_000,
        }
    }
}

impl TimeoutConfig {
    pub fn store(&self) -> Duration {
        Duration::from_millis(self.store_ms)
    }

    pub fn directory(&self) -> Duration {
        Duration::from_millis(self.directory_ms)
    }

    pub fn workflow(&self) -> Duration {
        Duration::from_millis(self.workflow_ms)
    }

    pub fn notifier(&self) -> Duration {
        Duration::from_millis(self.notifier_ms)
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Developer overrides, never checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `SEATLINE__DIRECTORY__BASE_URL=http://directory:8080`
            .add_source(config::Environment::with_prefix("SEATLINE").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    pub fn from_toml(source: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_fills_defaults() {
        let config = Config::from_toml(
            r#"
            [server]
            port = 8080

            [directory]
            base_url = "http://directory:8081"

            [workflow]
            gateway_address = "http://zeebe:8080"
            "#,
        )
        .unwrap();

        assert!(config.database.url.is_none());
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.workflow.process_id, "seat-reservation");
        assert!(config.notifier.endpoint.is_none());
        assert_eq!(config.timeouts.workflow(), Duration::from_secs(10));
    }

    #[test]
    fn test_timeouts_override_individually() {
        let config = Config::from_toml(
            r#"
            [server]
            port = 8080

            [directory]
            base_url = "http://directory:8081"

            [workflow]
            gateway_address = "http://zeebe:8080"
            process_id = "fww-reservation"

            [timeouts]
            directory_ms = 750
            "#,
        )
        .unwrap();

        assert_eq!(config.workflow.process_id, "fww-reservation");
        assert_eq!(config.timeouts.directory(), Duration::from_millis(750));
        assert_eq!(config.timeouts.store(), Duration::from_secs(5));
    }

    #[test]
    fn test_missing_directory_is_rejected() {
        let result = Config::from_toml(
            r#"
            [server]
            port = 8080

            [workflow]
            gateway_address = "http://zeebe:8080"
            "#,
        );
        assert!(result.is_err());
    }
}
