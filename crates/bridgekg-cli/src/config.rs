//! Pipeline configuration (`--config FILE`, JSON). Every field has a default;
//! command-line flags override file values.

use anyhow::{Context, Result};
use bridgekg_batch::{CorrectionLoop, DEFAULT_MAX_ITERATIONS};
use bridgekg_ontology::Vocabulary;
use bridgekg_store::{ConsolidationConfig, DEFAULT_MAX_DEPTH};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub schema_path: Option<PathBuf>,
    pub store_path: Option<PathBuf>,
    pub max_correction_iterations: usize,
    pub max_merge_depth: usize,
    /// Name of the top-level collection node excluded from path roots.
    pub collection_node: Option<String>,
    pub parallel: bool,
    pub vocabulary: Vocabulary,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            schema_path: None,
            store_path: None,
            max_correction_iterations: DEFAULT_MAX_ITERATIONS,
            max_merge_depth: DEFAULT_MAX_DEPTH,
            collection_node: None,
            parallel: true,
            vocabulary: Vocabulary::default(),
        }
    }
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn consolidation(&self) -> ConsolidationConfig {
        ConsolidationConfig {
            max_depth: self.max_merge_depth,
            parallel: self.parallel,
        }
    }

    /// Loop bound handed to whichever corrector drives re-extraction.
    pub fn correction_loop(&self) -> CorrectionLoop {
        CorrectionLoop::new(self.max_correction_iterations)
    }

    /// Flag value, else config value, else an error naming the flag.
    pub fn require_path(flag: Option<PathBuf>, configured: &Option<PathBuf>, name: &str) -> Result<PathBuf> {
        flag.or_else(|| configured.clone())
            .with_context(|| format!("--{name} is required (or set it in the config file)"))
    }
}
