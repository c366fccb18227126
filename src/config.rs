use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub cors: CorsSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Mongodb,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    #[serde(default)]
    pub backend: StorageBackend,
    /// MongoDB connection string, required for the mongodb backend.
    pub uri: Option<String>,
    #[serde(default = "default_database")]
    pub database: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        StorageSettings {
            backend: StorageBackend::default(),
            uri: None,
            database: default_database(),
        }
    }
}

fn default_database() -> String {
    "OpenSplit".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CorsSettings {
    /// Any origin is allowed when unset.
    pub allowed_origin: Option<String>,
}

impl Settings {
    /// Layers `config/default`, `config/{RUN_MODE}` and `GROUPSPLIT_*`
    /// environment variables, later sources winning.
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                Environment::with_prefix("GROUPSPLIT")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }

    pub fn mongodb_uri(&self) -> Result<&str, ConfigError> {
        self.storage
            .uri
            .as_deref()
            .ok_or_else(|| ConfigError::NotFound("storage.uri".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn from_toml(raw: &str) -> Settings {
        Config::builder()
            .add_source(File::from_str(raw, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn defaults_apply_to_empty_config() {
        let settings = from_toml("");
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.storage.backend, StorageBackend::Mongodb);
        assert_eq!(settings.storage.database, "OpenSplit");
        assert!(settings.cors.allowed_origin.is_none());
        assert!(settings.mongodb_uri().is_err());
    }

    #[test]
    fn reads_nested_sections() {
        let settings = from_toml(
            r#"
            [server]
            port = 9000

            [storage]
            backend = "memory"
            uri = "mongodb://localhost:27017"
            database = "Splits"

            [cors]
            allowed_origin = "http://localhost:3000"
            "#,
        );
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.storage.backend, StorageBackend::Memory);
        assert_eq!(settings.mongodb_uri().unwrap(), "mongodb://localhost:27017");
        assert_eq!(settings.storage.database, "Splits");
        assert_eq!(
            settings.cors.allowed_origin.as_deref(),
            Some("http://localhost:3000")
        );
    }
}
