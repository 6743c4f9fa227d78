use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Fallback signing secret, used when neither the config file nor
/// `SECRET_KEY` provides one.
pub const DEFAULT_SECRET_KEY: &str = "default-secret-key";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub security: SecurityConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// sea-orm connection string, overridden by `DATABASE_URL`
    pub database_url: String,

    pub log_level: String,

    /// "pretty" or "json"
    pub log_format: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:data/warden.db".to_string(),
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,

    pub port: u16,

    /// Whether to set the Secure flag on session cookies.
    /// Set to false for local development without HTTPS.
    pub secure_cookies: bool,

    /// Idle timeout for ordinary sessions.
    pub session_inactivity_minutes: i64,

    /// Absolute lifetime of a "remember me" session.
    pub remember_me_days: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            secure_cookies: true,
            session_inactivity_minutes: 60,
            remember_me_days: 365,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Session-cookie signing secret, overridden by `SECRET_KEY`
    pub secret_key: String,

    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations)
    pub argon2_time_cost: u32,

    pub argon2_parallelism: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            secret_key: DEFAULT_SECRET_KEY.to_string(),
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
        }
    }
}

/// Where [`Config::load`] found its settings. Loading happens before the
/// subscriber is installed, so this is logged afterwards.
#[derive(Debug, Default)]
pub struct ConfigSources {
    pub file: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
}

impl ConfigSources {
    pub fn log(&self) {
        match &self.file {
            Some(path) => info!("Loaded config from: {}", path.display()),
            None => info!("No config file found, using defaults"),
        }

        if let Some(path) = &self.env_file {
            info!("Loaded environment from: {}", path.display());
        }
    }
}

impl Config {
    /// Load from the first config file found, then apply `.env` and
    /// environment overrides.
    pub fn load() -> Result<(Self, ConfigSources)> {
        let (mut config, file) = Self::load_first(&Self::config_paths())?;

        let env_file = dotenvy::dotenv().ok();
        config.apply_env(|key| std::env::var(key).ok())?;

        Ok((config, ConfigSources { file, env_file }))
    }

    fn load_first(paths: &[PathBuf]) -> Result<(Self, Option<PathBuf>)> {
        match paths.iter().find(|path| path.exists()) {
            Some(path) => Ok((Self::load_from_path(path)?, Some(path.clone()))),
            None => Ok((Self::default(), None)),
        }
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Environment overrides. `lookup` is injected so tests don't touch the
    /// process environment.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(secret) = lookup("SECRET_KEY") {
            self.security.secret_key = secret;
        }

        if let Some(url) = lookup("DATABASE_URL").or_else(|| lookup("SQLALCHEMY_DATABASE_URI")) {
            self.general.database_url = url;
        }

        if let Some(port) = lookup("WARDEN_PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("WARDEN_PORT is not a valid port: {port}"))?;
        }

        Ok(())
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("warden").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".warden").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port must be > 0");
        }

        if self.server.session_inactivity_minutes <= 0 || self.server.remember_me_days <= 0 {
            anyhow::bail!("Session lifetimes must be > 0");
        }

        if self.security.secret_key.is_empty() {
            anyhow::bail!("Secret key cannot be empty");
        }

        if self.general.min_db_connections > self.general.max_db_connections {
            anyhow::bail!("min_db_connections cannot exceed max_db_connections");
        }

        Ok(())
    }

    #[must_use]
    pub fn uses_default_secret(&self) -> bool {
        self.security.secret_key == DEFAULT_SECRET_KEY
    }
}
