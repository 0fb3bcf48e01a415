use std::path::PathBuf;

use clap::{Parser, Subcommand};

use nextword_cli::commands::{config_ops, history_ops, index_ops, predict_ops};
use nextword_core::index::MergeStrategy;

#[derive(Parser)]
#[command(name = "nwtool", about = "Next-word prediction index and history tool")]
struct Cli {
    /// Directory for JSON trace logs (only with the `trace` feature)
    #[arg(long, global = true)]
    trace_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract unigram/bigram/trigram counts from a text corpus
    Extract {
        /// Input text file
        corpus: String,
        /// Output directory for unigrams.json, bigrams.json, trigrams.json
        out_dir: String,
        /// Drop n-grams seen fewer times than this
        #[arg(long, default_value = "1")]
        min_freq: u64,
    },
    /// Merge several word lists into one index directory
    Merge {
        /// Index directories or unigram list files
        #[arg(required = true)]
        inputs: Vec<String>,
        /// Output directory
        #[arg(short, long)]
        output: String,
        /// How duplicate frequencies combine: max, sum, avg or weighted
        #[arg(short, long, default_value = "max")]
        strategy: String,
        /// Per-input weights for the weighted strategy, comma separated
        #[arg(long, value_delimiter = ',')]
        weights: Vec<f64>,
        /// Drop merged entries below this frequency
        #[arg(short, long, default_value = "1")]
        min_freq: u64,
    },
    /// Show summary information about an index directory
    Info {
        /// Index directory
        index_dir: String,
    },
    /// Predict the next word after the given context words
    Predict {
        /// Index directory
        index_dir: String,
        /// Context words, oldest first
        words: Vec<String>,
        /// Number of predictions
        #[arg(short, long, default_value = "3")]
        k: usize,
        /// Learning history file (optional)
        #[arg(long)]
        history: Option<String>,
        /// Settings TOML file (optional)
        #[arg(long)]
        settings: Option<String>,
    },
    /// Replay a text through a prediction session and report the hit rate
    Replay {
        /// Index directory
        index_dir: String,
        /// Text file to replay
        text_file: String,
        /// Learning history file (optional)
        #[arg(long)]
        history: Option<String>,
        /// Learn from the replayed text (persisted when --history is given)
        #[arg(long)]
        learn: bool,
        /// Settings TOML file (optional)
        #[arg(long)]
        settings: Option<String>,
    },
    /// Inspect or reset the learning history
    History {
        /// History file (default: $XDG_DATA_HOME/nextword/learning.nwls)
        #[arg(long)]
        file: Option<PathBuf>,
        #[command(subcommand)]
        action: HistoryAction,
    },
    /// Export default settings as TOML
    SettingsExport,
    /// Validate a custom settings TOML file
    SettingsValidate {
        /// Path to the TOML file
        file: String,
    },
}

#[derive(Subcommand)]
enum HistoryAction {
    /// Show entry counts
    Stats,
    /// List learned transitions, most used first
    Dump {
        /// One JSON object per line
        #[arg(long)]
        json: bool,
    },
    /// Remove all learned transitions
    Clear,
}

fn main() {
    let cli = Cli::parse();
    if let Some(dir) = &cli.trace_dir {
        nextword_cli::trace_init::init_tracing(dir);
    }

    match cli.command {
        Command::Extract {
            corpus,
            out_dir,
            min_freq,
        } => index_ops::extract(&corpus, &out_dir, min_freq),
        Command::Merge {
            inputs,
            output,
            strategy,
            weights,
            min_freq,
        } => {
            let strategy = match strategy.parse::<MergeStrategy>() {
                Ok(MergeStrategy::Weighted(_)) => MergeStrategy::Weighted(weights),
                Ok(_) if !weights.is_empty() => {
                    eprintln!("--weights only applies to the weighted strategy");
                    std::process::exit(1);
                }
                Ok(other) => other,
                Err(e) => {
                    eprintln!("{e}");
                    std::process::exit(1);
                }
            };
            index_ops::merge(&inputs, &output, &strategy, min_freq)
        }
        Command::Info { index_dir } => index_ops::info(&index_dir),
        Command::Predict {
            index_dir,
            words,
            k,
            history,
            settings,
        } => predict_ops::predict(
            &index_dir,
            &words,
            k,
            history.as_deref(),
            settings.as_deref(),
        ),
        Command::Replay {
            index_dir,
            text_file,
            history,
            learn,
            settings,
        } => predict_ops::replay(
            &index_dir,
            &text_file,
            history.as_deref(),
            learn,
            settings.as_deref(),
        ),
        Command::History { file, action } => {
            let path = file.unwrap_or_else(history_ops::default_history_path);
            match action {
                HistoryAction::Stats => history_ops::stats(&path),
                HistoryAction::Dump { json } => history_ops::dump(&path, json),
                HistoryAction::Clear => history_ops::clear(&path),
            }
        }
        Command::SettingsExport => config_ops::settings_export(),
        Command::SettingsValidate { file } => config_ops::settings_validate(&file),
    }
}
