use clap::{Args, Parser};
use std::path::PathBuf;

use crate::edit::DocstringLayout;

/// Help text for configuration file options, shown at the bottom of --help.
const CONFIG_HELP: &str = "\
CONFIGURATION FILE (.docsmith.toml):
  Create this file in your project root to set defaults.
  The same keys are read from [tool.docsmith] in pyproject.toml.

  [docsmith]
  # Model
  model = \"qwen2.5-coder\"          # Ollama model name
  host = \"http://localhost:11434\"  # Overridden by OLLAMA_HOST and --host
  timeout_secs = 120               # Per-definition request timeout

  # Docstrings
  layout = \"pep257\"                # pep257 | block
  skip_private = false             # Leave _private names alone
  skip_dunder = false              # Leave __dunder__ names alone
  max_summary_chars = 1200         # Body text quoted in prompts
  include_related = true           # Quote referenced top-level definitions

  # Path filters
  exclude_folders = [\"build\", \"dist\", \".venv\"]
";

/// Options for the model connection.
#[derive(Args, Debug, Default, Clone)]
pub struct ModelOptions {
    /// Ollama model used to write docstrings (default: qwen2.5-coder).
    #[arg(short, long)]
    pub model: Option<String>,

    /// Ollama base URL (default: $OLLAMA_HOST or http://localhost:11434).
    #[arg(long)]
    pub host: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long)]
    pub timeout: Option<u64>,
}

/// Options for where results go.
#[derive(Args, Debug, Default, Clone)]
pub struct OutputOptions {
    /// Print the documented source to stdout instead of overwriting files.
    #[arg(short = 'o', long, conflicts_with = "diff")]
    pub output_only: bool,

    /// Print a unified diff instead of writing files.
    #[arg(long)]
    pub diff: bool,

    /// Enable verbose output for debugging (shows each definition as it is documented).
    #[arg(short, long)]
    pub verbose: bool,
}

/// Options for which definitions get docstrings and how.
#[derive(Args, Debug, Default, Clone)]
pub struct DocstringOptions {
    /// Skip `_private` functions and classes.
    #[arg(long)]
    pub skip_private: bool,

    /// Skip `__dunder__` functions and classes.
    #[arg(long)]
    pub skip_dunder: bool,

    /// Quote placement: pep257 (summary on the opening line) or block.
    #[arg(long)]
    pub layout: Option<DocstringLayout>,
}

/// Command line interface configuration using `clap`.
/// This struct defines the arguments and flags accepted by the program.
#[derive(Parser, Debug)]
#[command(
    name = "docsmith",
    author,
    version,
    about = "docsmith - Add model-written docstrings to Python code without touching anything else",
    long_about = None,
    after_help = CONFIG_HELP
)]
pub struct Cli {
    /// Python files or directories to document.
    /// Directories are walked recursively and respect .gitignore.
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Model connection options.
    #[command(flatten)]
    pub model: ModelOptions,

    /// Output options.
    #[command(flatten)]
    pub output: OutputOptions,

    /// Docstring selection and layout options.
    #[command(flatten)]
    pub docstrings: DocstringOptions,

    /// Folders to exclude when walking directories.
    #[arg(long, alias = "exclude-folder")]
    pub exclude_folders: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_full_flag_set() {
        let cli = Cli::try_parse_from([
            "docsmith",
            "src",
            "lib.py",
            "--model",
            "llama3",
            "--host",
            "http://box:11434",
            "--timeout",
            "5",
            "--diff",
            "-v",
            "--skip-private",
            "--layout",
            "block",
            "--exclude-folders",
            "gen",
        ])
        .unwrap();
        assert_eq!(cli.paths, vec![PathBuf::from("src"), PathBuf::from("lib.py")]);
        assert_eq!(cli.model.model.as_deref(), Some("llama3"));
        assert_eq!(cli.model.timeout, Some(5));
        assert!(cli.output.diff);
        assert!(cli.output.verbose);
        assert!(cli.docstrings.skip_private);
        assert!(!cli.docstrings.skip_dunder);
        assert_eq!(cli.docstrings.layout, Some(DocstringLayout::Block));
        assert_eq!(cli.exclude_folders, vec!["gen".to_owned()]);
    }

    #[test]
    fn test_rejects_bad_layout_and_missing_paths() {
        assert!(Cli::try_parse_from(["docsmith", "a.py", "--layout", "fancy"]).is_err());
        assert!(Cli::try_parse_from(["docsmith"]).is_err());
    }

    #[test]
    fn test_output_only_conflicts_with_diff() {
        assert!(Cli::try_parse_from(["docsmith", "a.py", "-o", "--diff"]).is_err());
    }
}
