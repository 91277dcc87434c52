// src/config.rs - Run configuration for batch scalp analysis

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use crate::errors::{Result, ScalpError};

/// Configuration for a scalp analysis run
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    pub input_path: String,
    pub output_base_dir: String,

    /// Resize every image before analysis. Thresholds were tuned on native
    /// resolution, so this stays off unless explicitly requested.
    #[serde(default)]
    pub resize_dimensions: Option<[u32; 2]>,

    #[serde(default = "default_parallel")]
    pub use_parallel: bool,

    // Annotation output
    #[serde(default = "default_true")]
    pub save_annotated: bool,

    #[serde(default = "default_true")]
    pub show_labels: bool,

    #[serde(default = "default_true")]
    pub show_legend: bool,

    #[serde(default = "default_label_limit")]
    pub label_limit: usize,

    /// Side-by-side sheet of originals and annotations when a run covers
    /// more than one image
    #[serde(default = "default_true")]
    pub save_comparison: bool,

    // Reports
    #[serde(default = "default_true")]
    pub write_json_report: bool,

    /// Directory holding externally produced results as `<image stem>.json`
    #[serde(default)]
    pub external_results_dir: Option<String>,
}

fn default_parallel() -> bool {
    true
}

fn default_true() -> bool {
    true
}

fn default_label_limit() -> usize {
    15
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_path: "./input".to_string(),
            output_base_dir: "./output".to_string(),
            resize_dimensions: None,
            use_parallel: true,
            save_annotated: true,
            show_labels: true,
            show_legend: true,
            label_limit: 15,
            save_comparison: true,
            write_json_report: true,
            external_results_dir: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ScalpError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;

        toml::from_str(&content).map_err(|source| ScalpError::ConfigLoad {
            source,
            path: path.to_path_buf(),
        })
    }

    /// Directory receiving annotated images
    pub fn annotated_dir(&self) -> PathBuf {
        PathBuf::from(&self.output_base_dir).join("annotated")
    }

    /// Directory receiving per-image JSON reports
    pub fn reports_dir(&self) -> PathBuf {
        PathBuf::from(&self.output_base_dir).join("reports")
    }

    /// Validate configuration and prepare output directories
    pub fn validate(&self) -> Result<()> {
        let input_path = PathBuf::from(&self.input_path);
        if !input_path.exists() {
            return Err(ScalpError::InvalidPath(input_path));
        }

        if self.label_limit == 0 {
            return Err(ScalpError::Config(
                "label_limit must be > 0".to_string(),
            ));
        }

        if let Some([width, height]) = self.resize_dimensions {
            if width == 0 || height == 0 {
                return Err(ScalpError::Config(
                    "resize_dimensions must both be > 0".to_string(),
                ));
            }
        }

        if let Some(dir) = &self.external_results_dir {
            let dir = PathBuf::from(dir);
            if !dir.is_dir() {
                return Err(ScalpError::InvalidPath(dir));
            }
        }

        for dir in [self.annotated_dir(), self.reports_dir()] {
            fs::create_dir_all(&dir).map_err(|e| {
                ScalpError::Io(io::Error::new(
                    ErrorKind::Other,
                    format!("Failed to create output directory {}: {}", dir.display(), e),
                ))
            })?;
        }

        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            ScalpError::Config(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(path, content)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_optional_fields_take_defaults() {
        let config: Config = toml::from_str(
            "input_path = \"./scans\"\noutput_base_dir = \"./out\"\n",
        )
        .unwrap();

        assert_eq!(config.input_path, "./scans");
        assert!(config.use_parallel);
        assert!(config.show_labels && config.show_legend);
        assert_eq!(config.label_limit, 15);
        assert_eq!(config.resize_dimensions, None);
        assert_eq!(config.external_results_dir, None);
    }

    #[test]
    fn default_config_survives_toml_round_trip() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn validate_rejects_missing_input() {
        let config = Config {
            input_path: "./definitely/not/here".to_string(),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ScalpError::InvalidPath(_))));
    }
}
