//! Environment overlay for the loaded configuration

use super::{AppConfig, ConfigError};

/// Credential variables, in priority order
pub const CREDENTIAL_VARS: [&str; 2] = ["OPENAI_API_KEY", "OPENAI_API_TOKEN"];
pub const PORT_VAR: &str = "PORT";
pub const UPSTREAM_URL_VAR: &str = "OPENAI_BASE_URL";

impl AppConfig {
    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides using an arbitrary variable lookup. Empty values are
    /// treated as unset.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = CREDENTIAL_VARS.iter().find_map(|&name| var(name)) {
            self.upstream.api_key = Some(key);
        }

        if let Some(port) = var(PORT_VAR) {
            self.server.port = port.trim().parse().map_err(|_| {
                ConfigError::Validation(format!("{} must be a port number, got {:?}", PORT_VAR, port))
            })?;
        }

        if let Some(url) = var(UPSTREAM_URL_VAR) {
            self.upstream.url = url;
        }

        Ok(())
    }
}
