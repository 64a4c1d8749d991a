//! Generator configuration.
//!
//! One JSON document names the statistics files and the optional model
//! library, and carries the knobs for catalog construction, edge sampling,
//! chain generation and batch runs. Every section except the two data paths
//! may be omitted.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::batch::BatchConfig;
use crate::catalog::CatalogOptions;
use crate::resolver::{ChainConfig, SamplingConfig};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GeneratorConfig {
    pub anatomy_path: PathBuf,
    pub physiology_path: PathBuf,
    /// Root of the model library; without one, cells carry no variant.
    #[serde(default)]
    pub model_library: Option<PathBuf>,
    #[serde(default)]
    pub catalog: CatalogOptions,
    #[serde(default)]
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub batch: BatchConfig,
}

impl GeneratorConfig {
    pub fn new(anatomy_path: impl Into<PathBuf>, physiology_path: impl Into<PathBuf>) -> Self {
        Self {
            anatomy_path: anatomy_path.into(),
            physiology_path: physiology_path.into(),
            model_library: None,
            catalog: CatalogOptions::default(),
            sampling: SamplingConfig::default(),
            chain: ChainConfig::default(),
            batch: BatchConfig::default(),
        }
    }

    /// Read and validate a config file.
    ///
    /// Relative data paths are resolved against the file's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let mut config = Self::from_json_str(&text)?;
        if let Some(base) = path.parent() {
            config.rebase(base);
        }
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn rebase(&mut self, base: &Path) {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        join(&mut self.anatomy_path);
        join(&mut self.physiology_path);
        if let Some(lib) = self.model_library.as_mut() {
            join(lib);
        }
    }

    pub fn validate(&self) -> Result<()> {
        let s = &self.sampling;
        if !(s.weight_min.is_finite() && s.weight_max.is_finite()) {
            return Err(Error::Config("weight range must be finite".into()));
        }
        if s.weight_min > s.weight_max {
            return Err(Error::Config(format!(
                "weightMin {} exceeds weightMax {}",
                s.weight_min, s.weight_max
            )));
        }
        if self.batch.max_attempts == 0 {
            return Err(Error::Config("batch.maxAttempts must be at least 1".into()));
        }
        Ok(())
    }
}
