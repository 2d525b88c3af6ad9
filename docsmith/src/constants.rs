use regex::Regex;
use rustc_hash::FxHashSet;
use std::sync::OnceLock;

/// Name of the project-level configuration file.
pub const CONFIG_FILENAME: &str = ".docsmith.toml";

/// Name of the Python project file that may carry a `[tool.docsmith]` table.
pub const PYPROJECT_FILENAME: &str = "pyproject.toml";

/// Model used when neither the CLI nor a config file names one.
pub const DEFAULT_MODEL: &str = "qwen2.5-coder";

/// Ollama endpoint used when `OLLAMA_HOST` and the config are silent.
pub const DEFAULT_HOST: &str = "http://localhost:11434";

/// Environment variable that overrides the Ollama host.
pub const HOST_ENV_VAR: &str = "OLLAMA_HOST";

/// Per-request timeout for a single model call.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Upper bound (in chars) for body summaries and related-definition snippets.
pub const DEFAULT_SUMMARY_CHARS: usize = 1200;

/// Indent step assumed when a file has no indented definition body to learn from.
pub const DEFAULT_INDENT_UNIT: &str = "    ";

/// Maximum number of related definitions quoted in one prompt.
pub const MAX_RELATED: usize = 6;

/// Placeholder the model is asked to replace in the JSON template.
pub const SLOT: &str = "<SLOT>";

/// Matches the first fenced code block in a model response.
///
/// # Panics
///
/// Panics if the regex pattern is invalid.
pub fn get_fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| {
        Regex::new(r"(?s)```[^\n`]*\r?\n(.*?)\r?\n?```").expect("Invalid fence regex pattern")
    })
}

/// Matches any run of whitespace, used to collapse source snippets.
///
/// # Panics
///
/// Panics if the regex pattern is invalid.
pub fn get_whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| Regex::new(r"\s+").expect("Invalid whitespace regex pattern"))
}

/// Set of folders to exclude by default.
pub fn get_default_exclude_folders() -> &'static FxHashSet<&'static str> {
    static SET: OnceLock<FxHashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| {
        let mut s = FxHashSet::default();
        s.insert("__pycache__");
        s.insert(".git");
        s.insert(".pytest_cache");
        s.insert(".mypy_cache");
        s.insert(".ruff_cache");
        s.insert(".tox");
        s.insert(".nox");
        s.insert("build");
        s.insert("dist");
        s.insert("*.egg-info");
        s.insert("venv");
        s.insert(".venv");
        s.insert("node_modules");
        s
    })
}

pub use get_default_exclude_folders as DEFAULT_EXCLUDE_FOLDERS;
pub use get_fence_re as FENCE_RE;
pub use get_whitespace_re as WHITESPACE_RE;
