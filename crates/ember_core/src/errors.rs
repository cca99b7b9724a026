//! Error Types
//!
//! This module defines the error types used throughout the engine.
//!
//! # Overview
//!
//! The main error type [`EmberError`] covers all failure modes of the core:
//! - Shader source lookup and compilation failures
//! - Pipeline lookups for unknown programs and pipeline creation failures
//! - Scene serialization, component state decoding and prefab validation
//!
//! # Usage
//!
//! All public APIs return [`Result<T>`] which is an alias for `std::result::Result<T, EmberError>`.
//!
//! ```rust,ignore
//! use ember_core::errors::{EmberError, Result};
//!
//! fn load_shader() -> Result<()> {
//!     // Operations that may fail return Result
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// Boxed error coming from an external collaborator (graphics device, serializer backend).
pub type BoxedSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The main error type for the Ember engine.
///
/// None of these errors are retried internally; they surface to the caller
/// synchronously from the operation that produced them.
#[derive(Error, Debug)]
pub enum EmberError {
    // ========================================================================
    // Shader & Pipeline Errors
    // ========================================================================
    /// A shader source file referenced by a program does not exist.
    #[error("Resource not found: {}", path.display())]
    ResourceNotFound {
        /// The resolved path that was looked up
        path: PathBuf,
    },

    /// One stage of a shader program failed to compile.
    #[error("Shader compilation failed for '{program}' ({stage} stage): {details}")]
    ShaderCompile {
        /// Program key in `name[variant]` form
        program: String,
        /// Stage that failed (`vertex`, `fragment`)
        stage: String,
        /// Diagnostic text reported by the device
        details: String,
    },

    /// A pipeline was requested for a program key that was never registered.
    #[error("Shader program not registered: {0}")]
    ProgramNotRegistered(String),

    /// The device rejected the pipeline state built from a valid program.
    #[error("Failed to create pipeline '{label}': {source}")]
    PipelineCreation {
        /// Label of the pipeline being created
        label: String,
        /// The underlying device failure
        #[source]
        source: BoxedSource,
    },

    /// The shader cache was disposed and no longer accepts work.
    #[error("Shader pipeline cache has been disposed")]
    CacheDisposed,

    // ========================================================================
    // Scene & Prefab Errors
    // ========================================================================
    /// Saving or loading a scene through the scene serializer failed.
    #[error("Scene serialization error: {0}")]
    Serialization(String),

    /// A prefab payload did not deserialize into a single-root scene.
    #[error("Invalid prefab {id}: {reason}")]
    InvalidPrefab {
        /// Identifier of the offending asset
        id: String,
        /// What was wrong with the payload
        reason: String,
    },

    /// A handle did not refer to a live object in the scene.
    #[error("Scene object not found: {0}")]
    ObjectNotFound(String),

    /// A re-parenting would make an object its own ancestor.
    #[error("Invalid hierarchy change: {0}")]
    InvalidHierarchy(String),

    /// No factory is registered for a component type name.
    #[error("Component type not registered: {0}")]
    ComponentNotRegistered(String),

    /// Binary component state was truncated or malformed.
    #[error("Component state codec error: {0}")]
    Codec(String),

    // ========================================================================
    // Configuration & I/O Errors
    // ========================================================================
    /// Engine settings failed validation.
    #[error("Invalid settings: {0}")]
    Settings(String),

    /// File I/O error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl EmberError {
    /// Wraps a device failure raised while building a pipeline.
    pub fn pipeline_creation(
        label: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::PipelineCreation {
            label: label.into(),
            source: Box::new(source),
        }
    }

    /// Builds a serialization error from any displayable cause.
    pub fn serialization(context: &str, cause: impl std::fmt::Display) -> Self {
        Self::Serialization(format!("{context}: {cause}"))
    }
}

/// Alias for `Result<T, EmberError>`.
pub type Result<T> = std::result::Result<T, EmberError>;
