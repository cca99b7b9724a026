//! Engine Settings
//!
//! [`EngineSettings`] is constructed once by the application and handed by
//! reference to the subsystems that need it (the shader pipeline cache and the
//! prefab system). There is no process-wide settings instance.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use ember_core::EngineSettings;
//!
//! // Defaults: shaders under `assets/shaders`, prefab temp files in the OS temp dir
//! let settings = EngineSettings::default();
//!
//! // Loaded from a JSON file; missing fields keep their defaults
//! let settings = EngineSettings::from_json_file("ember.json")?;
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{EmberError, Result};

/// Global configuration for the core subsystems.
///
/// | Field                    | Description                                   | Default           |
/// |--------------------------|-----------------------------------------------|-------------------|
/// | `shader_dir`             | Base directory for relative shader paths      | `assets/shaders`  |
/// | `temp_dir`               | Directory for prefab temp files (or OS temp)  | `None`            |
/// | `pipeline_capacity_hint` | Initial capacity of the pipeline cache map    | `64`              |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub shader_dir: PathBuf,
    pub temp_dir: Option<PathBuf>,
    pub pipeline_capacity_hint: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            shader_dir: PathBuf::from("assets/shaders"),
            temp_dir: None,
            pipeline_capacity_hint: 64,
        }
    }
}

impl EngineSettings {
    /// Parses settings from a JSON string and validates them.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reads and parses a JSON settings file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(EmberError::ResourceNotFound {
                path: path.to_path_buf(),
            });
        }
        let text = std::fs::read_to_string(path)?;
        let settings = Self::from_json_str(&text)?;
        log::info!("Loaded engine settings from {}", path.display());
        Ok(settings)
    }

    /// Checks the values for internal consistency.
    pub fn validate(&self) -> Result<()> {
        if self.shader_dir.as_os_str().is_empty() {
            return Err(EmberError::Settings("shader_dir must not be empty".into()));
        }
        if let Some(dir) = &self.temp_dir
            && dir.as_os_str().is_empty()
        {
            return Err(EmberError::Settings(
                "temp_dir must be omitted or non-empty".into(),
            ));
        }
        Ok(())
    }

    /// Resolves a shader path: absolute paths pass through, relative paths
    /// are joined onto `shader_dir`.
    #[must_use]
    pub fn resolve_shader_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.shader_dir.join(path)
        }
    }
}
