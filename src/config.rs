//! Render configuration. Every field has a default, so an empty JSON
//! object is a valid config file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::drawable::Tool;
use crate::error::{RenderError, RenderResult};

/// Executable used for each tool family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolConfig {
    #[serde(default = "default_convert")]
    pub convert: String,
    #[serde(default = "default_compare")]
    pub compare: String,
    #[serde(default = "default_composite")]
    pub composite: String,
}

fn default_convert() -> String {
    "convert".to_string()
}

fn default_compare() -> String {
    "compare".to_string()
}

fn default_composite() -> String {
    "composite".to_string()
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            convert: default_convert(),
            compare: default_compare(),
            composite: default_composite(),
        }
    }
}

impl ToolConfig {
    pub fn program(&self, tool: Tool) -> &str {
        match tool {
            Tool::Convert => &self.convert,
            Tool::Compare => &self.compare,
            Tool::Composite => &self.composite,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderConfig {
    /// Where staged intermediates live.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Extension of staged intermediates.
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default)]
    pub tools: ToolConfig,
    #[serde(default = "default_shell")]
    pub shell: String,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Leave intermediate files on disk for debugging.
    #[serde(default)]
    pub keep_intermediates: bool,
}

fn default_output_dir() -> PathBuf {
    std::env::temp_dir().join("inkstage")
}

fn default_format() -> String {
    "png".to_string()
}

fn default_shell() -> String {
    "sh".to_string()
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            format: default_format(),
            tools: ToolConfig::default(),
            shell: default_shell(),
            timeout_secs: None,
            keep_intermediates: false,
        }
    }
}

impl RenderConfig {
    pub fn load(path: &Path) -> RenderResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| RenderError::filesystem(path, e))?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
