//! TOML configuration.
//!
//! ```toml
//! [db]
//! path = "./data/paradup.sqlite"
//!
//! [upload]
//! max_file_bytes = 16777216
//! allowed_extensions = ["pdf", "docx"]
//!
//! [segmentation]
//! min_paragraph_chars = 10
//!
//! [similarity]
//! default_min_similarity = 0.3
//! max_features = 5000
//! default_limit = 5
//! ```
//!
//! Only `[db]` is required. `[segmentation]` and `[container]` accept any
//! subset of their fields; omitted fields take the built-in defaults.

use anyhow::{Context, Result};
use paradup_core::container::ContainerFilterConfig;
use paradup_core::segment::SegmenterConfig;
use paradup_core::similarity::SimilarityConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub segmentation: SegmenterConfig,
    #[serde(default)]
    pub container: ContainerFilterConfig,
    #[serde(default)]
    pub similarity: SimilaritySettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: default_max_file_bytes(),
            allowed_extensions: default_allowed_extensions(),
        }
    }
}

fn default_max_file_bytes() -> u64 {
    16 * 1024 * 1024
}
fn default_allowed_extensions() -> Vec<String> {
    vec!["pdf".to_string(), "docx".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct SimilaritySettings {
    #[serde(default = "default_min_similarity")]
    pub default_min_similarity: f64,
    #[serde(default = "default_max_features")]
    pub max_features: usize,
    #[serde(default = "default_limit")]
    pub default_limit: usize,
}

impl Default for SimilaritySettings {
    fn default() -> Self {
        Self {
            default_min_similarity: default_min_similarity(),
            max_features: default_max_features(),
            default_limit: default_limit(),
        }
    }
}

fn default_min_similarity() -> f64 {
    0.3
}
fn default_max_features() -> usize {
    5000
}
fn default_limit() -> usize {
    5
}

impl SimilaritySettings {
    pub fn engine(&self) -> SimilarityConfig {
        SimilarityConfig {
            max_features: self.max_features,
        }
    }
}

impl UploadConfig {
    /// Whether `ext` (without the dot) is accepted, case-insensitively.
    pub fn allows(&self, ext: &str) -> bool {
        self.allowed_extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ext))
    }
}

impl Config {
    /// Defaults everywhere, storing the database at `db_path`.
    pub fn minimal(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db: DbConfig {
                path: db_path.into(),
            },
            upload: UploadConfig::default(),
            segmentation: SegmenterConfig::default(),
            container: ContainerFilterConfig::default(),
            similarity: SimilaritySettings::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.upload.max_file_bytes == 0 {
        anyhow::bail!("upload.max_file_bytes must be > 0");
    }
    if config.upload.allowed_extensions.is_empty() {
        anyhow::bail!("upload.allowed_extensions must not be empty");
    }
    for ext in &config.upload.allowed_extensions {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" | "docx" => {}
            other => anyhow::bail!(
                "Unsupported upload extension: '{}'. Must be pdf or docx.",
                other
            ),
        }
    }

    let seg = &config.segmentation;
    if seg.min_sentences_per_group == 0 || seg.min_sentences_per_group > seg.max_sentences_per_group
    {
        anyhow::bail!(
            "segmentation: need 0 < min_sentences_per_group <= max_sentences_per_group"
        );
    }

    if !(0.0..=1.0).contains(&config.container.coverage) {
        anyhow::bail!("container.coverage must be in [0.0, 1.0]");
    }

    if !(0.0..=1.0).contains(&config.similarity.default_min_similarity) {
        anyhow::bail!("similarity.default_min_similarity must be in [0.0, 1.0]");
    }
    if config.similarity.max_features == 0 {
        anyhow::bail!("similarity.max_features must be > 0");
    }
    if config.similarity.default_limit < 1 {
        anyhow::bail!("similarity.default_limit must be >= 1");
    }

    Ok(())
}
