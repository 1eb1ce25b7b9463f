use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};
use crate::persona::{DirectoryResources, PersonaCatalog};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    /// Websocket address of the chat server. `ws://` is assumed when no
    /// scheme is given.
    pub host: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_receive_timeout_secs")]
    pub receive_timeout_secs: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_receive_timeout_secs() -> u64 {
    30
}

impl ClientConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            max_retries: default_max_retries(),
            receive_timeout_secs: default_receive_timeout_secs(),
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_receive_timeout(mut self, timeout: Duration) -> Self {
        self.receive_timeout_secs = timeout.as_secs().max(1);
        self
    }

    /// Attempts per ask; never less than one.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.max(1)
    }

    pub fn receive_timeout(&self) -> Duration {
        Duration::from_secs(self.receive_timeout_secs)
    }

    pub fn endpoint(&self) -> String {
        if self.host.contains("://") {
            self.host.clone()
        } else {
            format!("ws://{}", self.host)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PersonaConfig {
    /// Directory holding `personas_list.txt`; the bundled list is used when unset.
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    pub client: ClientConfig,
    #[serde(default)]
    pub personas: PersonaConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            client: ClientConfig::new("ws://localhost:35496/websocket"),
            personas: PersonaConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Settings {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let cfg: Self = toml::from_str(&raw)
            .map_err(|err| ClientError::Config(format!("Failed to parse configuration: {err}")))?;
        Ok(cfg)
    }

    pub fn from_env_or_file(path: impl AsRef<Path>) -> Result<Self> {
        let mut cfg = Self::from_file(path)?;
        cfg.apply_env();
        Ok(cfg)
    }

    /// Defaults with environment overrides, for runs without a config file.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.apply_env();
        cfg
    }

    fn apply_env(&mut self) {
        if let Ok(host) = env::var("PARLAI_HOST") {
            self.client.host = host;
        }
        if let Ok(retries) = env::var("PARLAI_MAX_RETRIES") {
            if let Ok(parsed) = retries.parse::<u32>() {
                self.client.max_retries = parsed;
            }
        }
        if let Ok(timeout) = env::var("PARLAI_RECEIVE_TIMEOUT_SECS") {
            if let Ok(parsed) = timeout.parse::<u64>() {
                self.client.receive_timeout_secs = parsed;
            }
        }
        if let Ok(dir) = env::var("PARLAI_PERSONA_DIR") {
            self.personas.directory = Some(PathBuf::from(dir));
        }
        if let Ok(level) = env::var("PARLAI_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(json) = env::var("PARLAI_LOG_JSON") {
            if let Ok(parsed) = json.parse::<bool>() {
                self.logging.json = parsed;
            }
        }
    }

    /// The catalogue selected by `[personas]`: a directory-backed one when a
    /// directory is configured, otherwise `None` for the bundled catalogue.
    pub fn persona_catalog(&self) -> Option<PersonaCatalog> {
        self.personas
            .directory
            .as_ref()
            .map(|dir| PersonaCatalog::new(DirectoryResources::new(dir)))
    }
}
