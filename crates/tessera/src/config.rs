//! # Engine Configuration
//!
//! Loaded once at startup.
//!
//! ```toml
//! default_world = "game"
//!
//! [[worlds]]
//! name = "game"
//! tags = ["render", "physics"]
//! reserve_entities = 4096
//!
//! [[worlds]]
//! name = "editor-preview"
//! attach_systems = false
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Top-level engine configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// World returned by [`EngineContext::default_world_mut`](crate::EngineContext::default_world_mut).
    /// Falls back to the first configured world when unset.
    pub default_world: Option<String>,
    /// Worlds created by [`EngineContext::from_config`](crate::EngineContext::from_config).
    pub worlds: Vec<WorldConfig>,
}

/// One world to create at startup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Unique world name.
    pub name: String,
    /// Tags gating which systems attach.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Attach the registered systems on creation.
    #[serde(default = "default_attach_systems")]
    pub attach_systems: bool,
    /// Entity slots to pre-allocate.
    #[serde(default)]
    pub reserve_entities: usize,
}

fn default_attach_systems() -> bool {
    true
}

impl EngineConfig {
    /// Parses a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] on malformed input.
    pub fn from_toml_str(text: &str) -> EngineResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Reads and parses a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Io`] if the file cannot be read and
    /// [`EngineError::Config`] if it does not parse.
    pub fn load(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| EngineError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), worlds = config.worlds.len(), "engine config loaded");
        Ok(config)
    }

    /// Name of the default world, if any world is configured.
    #[must_use]
    pub fn default_world_name(&self) -> Option<&str> {
        self.default_world
            .as_deref()
            .or_else(|| self.worlds.first().map(|world| world.name.as_str()))
    }
}
