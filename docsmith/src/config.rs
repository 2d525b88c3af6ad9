use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::constants::{CONFIG_FILENAME, PYPROJECT_FILENAME};
use crate::edit::DocstringLayout;

#[derive(Debug, Deserialize, Default, Clone)]
/// Top-level configuration struct.
pub struct Config {
    #[serde(default)]
    /// The `[docsmith]` section.
    pub docsmith: DocsmithConfig,
    /// The path to the configuration file this was loaded from.
    /// Set during `load_from_path`, `None` if using defaults.
    #[serde(skip)]
    pub config_file_path: Option<std::path::PathBuf>,
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
/// Configuration options for docsmith. Every key is optional; CLI flags win.
pub struct DocsmithConfig {
    /// Model identifier sent to Ollama.
    pub model: Option<String>,
    /// Ollama base URL.
    pub host: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// `pep257` or `block`.
    pub layout: Option<DocstringLayout>,
    /// Leave `_private` names undocumented.
    pub skip_private: Option<bool>,
    /// Leave `__dunder__` names undocumented.
    pub skip_dunder: Option<bool>,
    /// Bound for body summaries in prompts.
    pub max_summary_chars: Option<usize>,
    /// Quote referenced top-level definitions in prompts.
    pub include_related: Option<bool>,
    /// List of folders to exclude.
    pub exclude_folders: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Clone)]
struct PyProject {
    tool: ToolConfig,
}

#[derive(Debug, Deserialize, Clone)]
struct ToolConfig {
    docsmith: DocsmithConfig,
}

impl Config {
    /// Loads configuration starting from a specific path and traversing up.
    ///
    /// A `.docsmith.toml` wins over a `pyproject.toml` in the same directory;
    /// a `pyproject.toml` without a `[tool.docsmith]` table is passed over.
    #[must_use]
    pub fn load_from_path(path: &Path) -> Self {
        let mut current = path.to_path_buf();
        if current.is_file() {
            current.pop();
        }

        loop {
            let docsmith_toml = current.join(CONFIG_FILENAME);
            if docsmith_toml.exists() {
                if let Ok(content) = fs::read_to_string(&docsmith_toml) {
                    if let Ok(mut config) = toml::from_str::<Config>(&content) {
                        config.config_file_path = Some(docsmith_toml);
                        return config;
                    }
                }
            }

            let pyproject_toml = current.join(PYPROJECT_FILENAME);
            if pyproject_toml.exists() {
                if let Ok(content) = fs::read_to_string(&pyproject_toml) {
                    if let Ok(pyproject) = toml::from_str::<PyProject>(&content) {
                        return Config {
                            docsmith: pyproject.tool.docsmith,
                            config_file_path: Some(pyproject_toml),
                        };
                    }
                }
            }

            if !current.pop() {
                break;
            }
        }

        Config::default()
    }
}
