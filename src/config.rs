//! Client configuration: built-in defaults, overridden by an optional TOML
//! file, overridden by command-line flags.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::cli::Args;
use crate::error::{ClientError, Result};

pub const DEFAULT_HOST: &str = "ws://localhost:8000";
pub const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    pub host: String,
    /// Blank means "generate on connect".
    pub session_id: String,
    /// Blank means "anonymous".
    pub user_id: String,
    pub color: bool,
    pub connect_on_start: bool,
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            session_id: String::new(),
            user_id: String::new(),
            color: true,
            connect_on_start: true,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl ClientConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ClientError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    /// Load the file named by `--config` (if any) and apply the other flags
    /// on top.
    pub fn load(args: &Args) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_args(args);
        config.validate()?;
        Ok(config)
    }

    pub fn apply_args(&mut self, args: &Args) {
        if let Some(host) = &args.host {
            self.host.clone_from(host);
        }
        if let Some(session) = &args.session {
            self.session_id.clone_from(session);
        }
        if let Some(user) = &args.user {
            self.user_id.clone_from(user);
        }
        if let Some(level) = &args.log_level {
            self.log_level.clone_from(level);
        }
        if args.no_color {
            self.color = false;
        }
        if args.no_connect {
            self.connect_on_start = false;
        }
    }

    /// The host is the only field that must be present; its scheme is left
    /// to the socket library.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(ClientError::Config("host must not be empty".to_string()));
        }
        Ok(())
    }
}
