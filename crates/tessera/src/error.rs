//! # Engine Error Types

use thiserror::Error;

use tessera_core::EcsError;

/// Errors raised while configuring or driving the engine context.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The configuration file could not be read.
    #[error("failed to read configuration '{path}': {source}")]
    Io {
        /// Path that was read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration text is not valid TOML for [`EngineConfig`](crate::EngineConfig).
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// A world operation failed.
    #[error(transparent)]
    Ecs(#[from] EcsError),

    /// No world with this name exists in the context.
    #[error("unknown world: {0}")]
    UnknownWorld(String),

    /// A world with this name already exists in the context.
    #[error("world already exists: {0}")]
    DuplicateWorld(String),
}

/// Result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
