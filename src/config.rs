use std::path::PathBuf;

use serde::Deserialize;

/// Default per-worker limit on concurrent connections.
pub const DEFAULT_MAX_CONNECTIONS: usize = 1000;

/// Default listen backlog when none is configured.
pub const DEFAULT_BACKLOG: i32 = 128;

/// TLS material for the listening socket.
#[derive(Debug, Clone, Deserialize)]
pub struct TlsConfig {
    /// PEM certificate chain file.
    pub cert: PathBuf,
    /// PEM private key file.
    pub key: PathBuf,
}

/// Server configuration.
///
/// Loaded once at startup from a YAML file named by `PORTER_CONFIG`, with
/// `PORTER_*` environment variables overriding individual fields. Worker
/// processes inherit the environment, so they resolve the same values the
/// supervisor did.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Host to bind (also exposed to applications as SERVER_NAME).
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Number of worker processes.
    pub workers: usize,
    /// Maximum concurrent connections per worker.
    pub max_connections: usize,
    /// Explicit listen backlog; implementation default if unset.
    pub backlog: Option<i32>,
    /// Optional TLS material; plain TCP if unset.
    pub tls: Option<TlsConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            workers: 2,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            backlog: None,
            tls: None,
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg = match std::env::var("PORTER_CONFIG") {
            Ok(path) => serde_yaml::from_str(&std::fs::read_to_string(&path)?)?,
            Err(_) => Config::default(),
        };

        if let Ok(host) = std::env::var("PORTER_HOST") {
            cfg.host = host;
        }
        if let Ok(port) = std::env::var("PORTER_PORT") {
            cfg.port = port.parse()?;
        }
        if let Ok(workers) = std::env::var("PORTER_WORKERS") {
            cfg.workers = workers.parse()?;
        }
        if let Ok(max) = std::env::var("PORTER_MAX_CONNECTIONS") {
            cfg.max_connections = max.parse()?;
        }

        Ok(cfg)
    }

    /// The `host:port` form used for bind and log messages.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// URL scheme exposed to applications.
    pub fn scheme(&self) -> &'static str {
        if self.tls.is_some() { "https" } else { "http" }
    }
}
