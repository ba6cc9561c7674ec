//! `.nbclean.toml` discovery and merging.
//!
//! Precedence order (highest to lowest):
//! 1. Command-line arguments
//! 2. Project config (./.nbclean.toml)
//! 3. User config (~/.nbclean.toml)
//! 4. Built-in defaults (`nbclean::constants`)

use anyhow::{Context, Result};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Config file name, in the project directory or the home directory
pub const CONFIG_FILE: &str = ".nbclean.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Solution marker key, shared by `clean` and `coursework`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<String>,

    /// Default settings for the clean command
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clean: Option<CleanConfig>,

    /// Default settings for the coursework command
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coursework: Option<CourseworkConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanConfig {
    /// Kernel display name to enforce
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Indentation width of rewritten notebooks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indent: Option<usize>,

    /// Process notebooks in parallel
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CourseworkConfig {
    /// Output directory, relative to the root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,

    /// Data directory, relative to the root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Strip notebooks in parallel
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel: Option<bool>,
}

impl Config {
    /// Load configuration from file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Find and load configuration files
    /// Returns (`user_config`, `project_config`)
    pub fn discover_configs() -> (Option<Self>, Option<Self>) {
        let user_config = Self::user_config_path().and_then(|path| Self::load_optional(&path));
        let project_config = Self::load_optional(&Self::project_config_path());
        (user_config, project_config)
    }

    /// `~/.nbclean.toml`, if a home directory is known
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(CONFIG_FILE))
    }

    /// `./.nbclean.toml`
    pub fn project_config_path() -> PathBuf {
        PathBuf::from(CONFIG_FILE)
    }

    /// Load `path` if it exists; a broken file is reported and ignored
    fn load_optional(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        match Self::load_from_file(path) {
            Ok(config) => Some(config),
            Err(e) => {
                eprintln!(
                    "{} Ignoring config {}: {:#}",
                    "Warning:".yellow().bold(),
                    path.display(),
                    e
                );
                None
            }
        }
    }

    /// Merge multiple configs with precedence
    /// CLI args > project config > user config > defaults
    pub fn merge(user_config: Option<Self>, project_config: Option<Self>) -> Self {
        let mut merged = user_config.unwrap_or_default();

        let Some(project) = project_config else {
            return merged;
        };

        if project.marker.is_some() {
            merged.marker = project.marker;
        }

        if let Some(clean) = project.clean {
            let mut merged_clean = merged.clean.unwrap_or_default();
            if let Some(display_name) = clean.display_name {
                merged_clean.display_name = Some(display_name);
            }
            if let Some(indent) = clean.indent {
                merged_clean.indent = Some(indent);
            }
            if let Some(parallel) = clean.parallel {
                merged_clean.parallel = Some(parallel);
            }
            merged.clean = Some(merged_clean);
        }

        if let Some(coursework) = project.coursework {
            let mut merged_coursework = merged.coursework.unwrap_or_default();
            if let Some(output_dir) = coursework.output_dir {
                merged_coursework.output_dir = Some(output_dir);
            }
            if let Some(data_dir) = coursework.data_dir {
                merged_coursework.data_dir = Some(data_dir);
            }
            if let Some(parallel) = coursework.parallel {
                merged_coursework.parallel = Some(parallel);
            }
            merged.coursework = Some(merged_coursework);
        }

        merged
    }

    /// Fully populated config, as written by `config init`
    pub fn template() -> Self {
        use nbclean::constants::{
            CANONICAL_DISPLAY_NAME, COURSEWORK_DIR, DATA_DIR, PRETTY_INDENT, SOLUTION_MARKER,
        };

        Self {
            marker: Some(SOLUTION_MARKER.to_string()),
            clean: Some(CleanConfig {
                display_name: Some(CANONICAL_DISPLAY_NAME.to_string()),
                indent: Some(PRETTY_INDENT),
                parallel: Some(false),
            }),
            coursework: Some(CourseworkConfig {
                output_dir: Some(PathBuf::from(COURSEWORK_DIR)),
                data_dir: Some(PathBuf::from(DATA_DIR)),
                parallel: Some(false),
            }),
        }
    }
}
