use crate::editor::EditorStyle;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const SETTINGS_FILE: &str = "settings.json";
pub const DEFAULT_ANALYSIS_URL: &str = "http://localhost:8000/pipelines/parse";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppSettings {
    pub style: EditorStyle,
    pub history_max_records: usize,
    /// Endpoint the Submit button posts the pipeline to.
    pub analysis_url: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            style: EditorStyle::default(),
            history_max_records: 200,
            analysis_url: DEFAULT_ANALYSIS_URL.to_string(),
        }
    }
}

impl AppSettings {
    /// Reads settings from `path`. A missing or unreadable file yields the
    /// defaults.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::try_load(path) {
            Ok(settings) => settings,
            Err(err) => {
                if path.exists() {
                    log::warn!("ignoring {}: {:#}", path.display(), err);
                }
                Self::default()
            }
        }
    }

    fn try_load(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let settings = serde_json::from_str(&json).context("parsing settings")?;
        Ok(settings)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }
}
