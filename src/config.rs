use std::io::BufReader;
use std::path::Path;

use crate::foundation::error::{AnimpaceError, AnimpaceResult};
use crate::item::ItemOpts;
use crate::rate::coordinator::CoordinatorOpts;
use crate::render::pipeline::PipelineOpts;

/// Top-level runtime configuration. Every section falls back to its defaults when omitted.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AnimpaceConfig {
    /// Worker pool sizing.
    pub pipeline: PipelineOpts,
    /// Rate policies.
    pub coordinator: CoordinatorOpts,
    /// Defaults of new items.
    pub item: ItemOpts,
}

impl AnimpaceConfig {
    /// Read and validate a JSON config file.
    pub fn from_path(path: impl AsRef<Path>) -> AnimpaceResult<Self> {
        let path = path.as_ref();
        let f = std::fs::File::open(path).map_err(|e| {
            AnimpaceError::validation(format!("open config '{}': {e}", path.display()))
        })?;
        let cfg: Self = serde_json::from_reader(BufReader::new(f)).map_err(|e| {
            AnimpaceError::validation(format!("parse config '{}': {e}", path.display()))
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse and validate a JSON config string.
    pub fn from_json_str(s: &str) -> AnimpaceResult<Self> {
        let cfg: Self = serde_json::from_str(s)
            .map_err(|e| AnimpaceError::validation(format!("parse config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check every section.
    pub fn validate(&self) -> AnimpaceResult<()> {
        self.pipeline.validate()?;
        self.coordinator.validate()
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
