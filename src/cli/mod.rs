//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "ragops",
    version,
    author = "neur0map",
    about = "Retrieval-augmented question answering with evaluation and quality gates",
    long_about = "Ragops ingests a source document into a persisted vector index, answers questions \
                  grounded in the retrieved chunks, scores the system against a golden dataset with an \
                  LLM judge, and compares evaluation reports to block quality regressions in CI."
)]
pub struct Cli {
    /// Config file path (defaults to ./ragops.toml, then ~/.config/ragops/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging and full error chains
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Named profile from the config file to apply
    #[arg(short, long, global = true)]
    pub profile: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Chunk, embed and index the source document
    Ingest {
        /// Source document (UTF-8 text, pages separated by form feeds)
        #[arg(short, long)]
        source: Option<PathBuf>,

        /// Where to write the index
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Chunk size in characters
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Overlap between adjacent chunks in characters
        #[arg(long)]
        chunk_overlap: Option<usize>,

        /// Rebuild even if the index is up to date with the source
        #[arg(short, long)]
        force: bool,
    },

    /// Answer a single question from the indexed document
    Ask {
        /// Question to ask
        question: String,

        /// Print the retrieved chunks used as context
        #[arg(long)]
        show_context: bool,

        /// Number of chunks to retrieve (overrides retrieval.top_k)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Interactive question loop over the indexed document
    Chat {
        /// Print the retrieved chunks after every answer
        #[arg(long)]
        show_context: bool,
    },

    /// Score the system against the golden dataset
    Evaluate {
        /// Golden dataset (JSON array of question/ground_truth_answer objects)
        #[arg(short, long)]
        dataset: Option<PathBuf>,

        /// Where to write the evaluation report
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Model used as the judge
        #[arg(long)]
        judge_model: Option<String>,
    },

    /// Compare two evaluation reports and fail on regressions
    Compare {
        /// Baseline evaluation report
        baseline: PathBuf,

        /// Current evaluation report
        current: PathBuf,

        /// Maximum allowed degradation per metric (0.05 = 5 points)
        #[arg(short, long)]
        threshold: Option<f64>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show {
        /// Show only a specific section
        #[arg(short, long)]
        section: Option<String>,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_compare_arguments() {
        let cli = Cli::parse_from(["ragops", "compare", "base.json", "cur.json", "--threshold", "0.1"]);
        match cli.command {
            Commands::Compare {
                baseline,
                current,
                threshold,
            } => {
                assert_eq!(baseline, PathBuf::from("base.json"));
                assert_eq!(current, PathBuf::from("cur.json"));
                assert_eq!(threshold, Some(0.1));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["ragops", "ask", "What?", "-k", "2", "--verbose", "--profile", "cheap"]);
        assert!(cli.verbose);
        assert_eq!(cli.profile.as_deref(), Some("cheap"));
        assert!(matches!(cli.command, Commands::Ask { top_k: Some(2), .. }));
    }
}
