//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Every field has a serde default so partial files load cleanly.

use serde::{Deserialize, Serialize};

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Renderer invocation settings.
    #[serde(default)]
    pub renderer: RendererSettings,

    /// Path-related settings.
    #[serde(default)]
    pub paths: PathSettings,
}

/// External renderer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RendererSettings {
    /// Renderer executable to invoke.
    #[serde(default = "default_program")]
    pub program: String,

    /// Template source passed as the renderer's first argument. The preset
    /// store lives in this file's JSON sibling.
    #[serde(default = "default_template")]
    pub template: String,
}

fn default_program() -> String {
    "openscad".to_string()
}

fn default_template() -> String {
    "labeled-swatch.scad".to_string()
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            program: default_program(),
            template: default_template(),
        }
    }
}

/// Path configuration for generated models.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Output folder for generated model files.
    #[serde(default = "default_output_folder")]
    pub output_folder: String,
}

fn default_output_folder() -> String {
    ".".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            output_folder: default_output_folder(),
        }
    }
}
