//! Per-source configuration

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Result, SrcpoolError};

const DEFAULT_PORT: u16 = 3306;
const DEFAULT_CONNECT_TIMEOUT_SECS: u32 = 3;
const DEFAULT_READ_TIMEOUT_SECS: u32 = 30;
const DEFAULT_MAX_CONNECTIONS: usize = 10;

/// Connection settings for one named data source.
///
/// A snapshot of this struct is handed to every resource in the source's
/// pool; replacing a source installs a new snapshot without touching
/// resources built from the old one.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Backend host name or address
    pub host: String,

    /// Backend port
    pub port: u16,

    /// Login user
    pub user: String,

    /// Login password
    pub password: String,

    /// Default database selected after the handshake
    pub database: String,

    /// Session character set; empty keeps the server default
    pub charset: String,

    /// Handshake timeout in seconds
    pub connect_timeout_secs: u32,

    /// Read timeout in seconds
    pub read_timeout_secs: u32,

    /// Whether statements commit implicitly
    pub autocommit: bool,

    /// Pool capacity for this source
    pub max_connections: usize,
}

impl SourceConfig {
    /// Create a configuration for `host` with default settings
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set user and password
    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = user.into();
        self.password = password.into();
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = charset.into();
        self
    }

    pub fn with_connect_timeout_secs(mut self, secs: u32) -> Self {
        self.connect_timeout_secs = secs;
        self
    }

    pub fn with_read_timeout_secs(mut self, secs: u32) -> Self {
        self.read_timeout_secs = secs;
        self
    }

    pub fn with_autocommit(mut self, autocommit: bool) -> Self {
        self.autocommit = autocommit;
        self
    }

    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Get the handshake timeout as a Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.connect_timeout_secs))
    }

    /// Get the read timeout as a Duration
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.read_timeout_secs))
    }

    /// `user@host:port/database`, safe to log
    pub fn display_target(&self) -> String {
        format!(
            "{}@{}:{}/{}",
            self.user, self.host, self.port, self.database
        )
    }

    /// Check that the configuration can back a pool
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(SrcpoolError::Configuration("host must not be empty".into()));
        }
        if self.max_connections == 0 {
            return Err(SrcpoolError::Configuration(
                "max_connections must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_PORT,
            user: String::new(),
            password: String::new(),
            database: String::new(),
            charset: String::new(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            read_timeout_secs: DEFAULT_READ_TIMEOUT_SECS,
            autocommit: true,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

// Hand-written so the password never reaches logs.
impl fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &if self.password.is_empty() { "" } else { "***" })
            .field("database", &self.database)
            .field("charset", &self.charset)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("read_timeout_secs", &self.read_timeout_secs)
            .field("autocommit", &self.autocommit)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

/// A set of named sources, as read from a TOML file:
///
/// ```toml
/// [sources.testdb]
/// host = "127.0.0.1"
/// user = "app"
/// database = "test"
/// max_connections = 4
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcesFile {
    #[serde(default)]
    pub sources: BTreeMap<String, SourceConfig>,
}

impl SourcesFile {
    /// Parse and validate a sources document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: SourcesFile = toml::from_str(content)?;
        for (name, config) in &file.sources {
            config.validate().map_err(|e| {
                SrcpoolError::Configuration(format!("source '{}': {}", name, e))
            })?;
        }
        tracing::debug!(count = file.sources.len(), "parsed sources file");
        Ok(file)
    }

    /// Read a sources file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "loading sources file");
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn get(&self, name: &str) -> Option<&SourceConfig> {
        self.sources.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
