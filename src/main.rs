//! # paradup CLI
//!
//! ```bash
//! paradup --config ./config/paradup.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `paradup init` | Create the SQLite database and run schema migrations |
//! | `paradup upload <files…>` | Extract, segment, and deduplicate PDF/DOCX files |
//! | `paradup documents` | List uploaded documents |
//! | `paradup show <id>` | Show a document and its paragraphs |
//! | `paradup delete <id>` | Delete a document and its orphaned paragraphs |
//! | `paradup delete-all --yes` | Delete everything |
//! | `paradup paragraphs [--shared]` | List canonical paragraphs with reuse counts |
//! | `paradup similarity calculate` | Recompute document similarity |
//! | `paradup similarity similar <id>` | Documents most similar to one document |
//! | `paradup similarity compare <a> <b>` | Shared and unique paragraphs of two documents |
//! | `paradup stats` | Corpus summary |
//!
//! Logging goes to stderr and is controlled by `RUST_LOG` (default `warn`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use paradup::{config, documents, migrate, paragraphs, similarity_cmd, stats, upload};

/// paradup: paragraph-level deduplication and document similarity.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/paradup.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "paradup",
    about = "Paragraph-level deduplication and document similarity for PDF and DOCX corpora",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/paradup.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Upload and process PDF or DOCX files.
    ///
    /// Files are processed one at a time. Rejected files (unsupported type,
    /// too large) and extraction failures are reported and skipped.
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// List uploaded documents, newest first.
    Documents,

    /// Show a document's metadata and paragraphs in position order.
    Show {
        id: String,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Delete a document. Paragraphs no other document uses are removed too.
    Delete { id: String },

    /// Delete every document, paragraph, and similarity edge.
    DeleteAll {
        /// Required confirmation.
        #[arg(long)]
        yes: bool,
    },

    /// List canonical paragraphs with the number of documents using each.
    Paragraphs {
        /// Only paragraphs that appear in two or more documents.
        #[arg(long)]
        shared: bool,
    },

    /// Similarity calculation and queries.
    Similarity {
        #[command(subcommand)]
        action: SimilarityAction,
    },

    /// Show corpus statistics.
    Stats,
}

#[derive(Subcommand)]
enum SimilarityAction {
    /// Recompute the full similarity edge set from processed documents.
    Calculate {
        /// Minimum score for a stored edge, clamped to [0.1, 0.9].
        /// Defaults to `similarity.default_min_similarity`.
        #[arg(long)]
        min_similarity: Option<f64>,
    },

    /// Documents most similar to the given document.
    Similar {
        id: String,

        #[arg(long)]
        min_score: Option<f64>,

        /// Defaults to `similarity.default_limit`.
        #[arg(long)]
        limit: Option<usize>,

        #[arg(long)]
        json: bool,
    },

    /// Compare two documents paragraph by paragraph.
    Compare {
        first: String,
        second: String,

        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Upload { files } => {
            upload::run_upload(&cfg, &files).await?;
        }
        Commands::Documents => {
            documents::run_list(&cfg).await?;
        }
        Commands::Show { id, json } => {
            documents::run_show(&cfg, &id, json).await?;
        }
        Commands::Delete { id } => {
            documents::run_delete(&cfg, &id).await?;
        }
        Commands::DeleteAll { yes } => {
            if !yes {
                anyhow::bail!("refusing to delete everything without --yes");
            }
            documents::run_delete_all(&cfg).await?;
        }
        Commands::Paragraphs { shared } => {
            paragraphs::run_paragraphs(&cfg, shared).await?;
        }
        Commands::Similarity { action } => match action {
            SimilarityAction::Calculate { min_similarity } => {
                similarity_cmd::run_calculate(&cfg, min_similarity).await?;
            }
            SimilarityAction::Similar {
                id,
                min_score,
                limit,
                json,
            } => {
                similarity_cmd::run_similar(&cfg, &id, min_score, limit, json).await?;
            }
            SimilarityAction::Compare {
                first,
                second,
                json,
            } => {
                similarity_cmd::run_compare(&cfg, &first, &second, json).await?;
            }
        },
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
    }

    Ok(())
}
