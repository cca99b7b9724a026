//! Ember Core
//!
//! Foundational types shared by every Ember crate:
//! - [`errors`]: the engine-wide [`EmberError`] taxonomy and [`Result`] alias
//! - [`settings`]: explicitly constructed [`EngineSettings`]

pub mod errors;
pub mod settings;

pub use errors::{EmberError, Result};
pub use settings::EngineSettings;
