//! Index configuration.
//!
//! TOML-loadable tuning knobs for the tree host. The similarity
//! thresholds themselves are calibration contract values and live as
//! constants next to the kernels, not here.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct IndexConfig {
    #[serde(default)]
    pub pages: PageConfig,
}

/// Page-level tuning
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PageConfig {
    /// Entries a page holds before it splits. Four is the typical
    /// fan-out once a 240-codeword entry is stored on an 8 KiB page.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

fn default_capacity() -> usize {
    4
}

impl IndexConfig {
    /// Load configuration from TOML file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file {}: {}", path.display(), e))?;
        let config: IndexConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.pages.capacity < 2 {
            anyhow::bail!("page capacity must be >= 2");
        }
        Ok(())
    }
}
