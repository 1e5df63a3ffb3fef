use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{HostError, Result};

/// Environment variable naming the display endpoint. Required.
pub const MATRIX_URL_ENV: &str = "MATRIX_URL";
/// Environment variable naming a plugin to launch at boot. Optional.
pub const AUTOSTART_ENV: &str = "PLUGIN_AUTOSTART";

/// Top-level configuration structure for the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Endpoint handed to [`crate::Display::connect`].
    pub matrix_url: Option<String>,
    /// Plugin launched once the loops are running.
    pub autostart: Option<String>,
    /// Edge length of the square matrix.
    pub matrix_size: usize,
    /// Initial delay between `update` notifications.
    pub tick_ms: u64,
    /// Floor below which tick changes are ignored.
    pub min_tick_ms: u64,
    /// Amount a single remote press moves the tick by.
    pub tick_step_ms: u64,
    /// Poll delay of the update timer while not running.
    pub idle_poll_ms: u64,
    /// Render loop cadence.
    pub render_ms: u64,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            matrix_url: None,
            autostart: None,
            matrix_size: 10,
            tick_ms: 500,
            min_tick_ms: 10,
            tick_step_ms: 100,
            idle_poll_ms: 10,
            render_ms: 100,
        }
    }
}

impl HostConfig {
    /// Reads a JSON configuration file. Missing keys fall back to defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Overrides the endpoint and autostart plugin from the environment when
    /// the variables are set and non-empty.
    pub fn apply_env(&mut self) {
        self.apply_vars(|key| std::env::var(key).ok());
    }

    fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        if let Some(url) = non_empty(MATRIX_URL_ENV) {
            self.matrix_url = Some(url);
        }
        if let Some(plugin) = non_empty(AUTOSTART_ENV) {
            self.autostart = Some(plugin);
        }
    }

    /// Returns the display endpoint, failing when it was never provided.
    pub fn endpoint(&self) -> Result<&str> {
        self.matrix_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                HostError::config(format!(
                    "please provide the display endpoint via {MATRIX_URL_ENV}"
                ))
            })
    }

    pub fn validate(&self) -> Result<()> {
        self.endpoint()?;
        if self.matrix_size == 0 {
            return Err(HostError::config("matrix size must be positive"));
        }
        if self.min_tick_ms == 0 || self.idle_poll_ms == 0 || self.render_ms == 0 {
            return Err(HostError::config("loop intervals must be positive"));
        }
        if self.tick_ms < self.min_tick_ms {
            return Err(HostError::config(format!(
                "tick of {}ms is below the {}ms floor",
                self.tick_ms, self.min_tick_ms
            )));
        }
        Ok(())
    }
}
