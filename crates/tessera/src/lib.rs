//! # TESSERA
//!
//! The engine crate, wiring the ECS core into an application.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      EngineContext                       │
//! │                                                          │
//! │  EngineConfig ──> worlds ──────────> EcsWorld (per name) │
//! │                     ▲                   │                │
//! │  SystemRegistry ────┘ attach on create  │ update(dt)     │
//! │                                         ▼                │
//! │                          Pre / Update / PostUpdate       │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `config`: TOML engine configuration
//! - `context`: world ownership and the frame update
//! - `systems`: reusable system definitions
//! - `render`: render unit gathering boundary
//! - `data_block`: TOML-backed scene blocks

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod context;
pub mod data_block;
pub mod error;
pub mod render;
pub mod systems;

pub use tessera_core as core;

pub use config::{EngineConfig, WorldConfig};
pub use context::EngineContext;
pub use data_block::TomlDataBlock;
pub use error::{EngineError, EngineResult};
pub use render::{
    gather_render_units, sort_render_units, Render3DDefaultPassGatherRenderUnitsEvent, RenderUnit,
    TRANSPARENT_QUEUE_INDEX,
};
pub use systems::{SystemDescriptor, SystemRegistry};
