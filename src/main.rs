//! # Clause Harness CLI (`clx`)
//!
//! Commands for initializing the database, uploading and inspecting
//! contracts, searching clauses, running the patch workflow, drafting
//! clauses, and starting the HTTP server.
//!
//! ## Usage
//!
//! ```bash
//! clx --config ./config/clx.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `clx init` | Create the SQLite database and run schema migrations |
//! | `clx upload <file>` | Split, embed, and store a contract |
//! | `clx split <file>` | Print the clause spans of a file |
//! | `clx get <id>` / `clx list` | Inspect stored documents |
//! | `clx search "<query>"` | Similarity search over clauses |
//! | `clx library load` | Index reference clauses |
//! | `clx patch <id> "<instruction>"` | Propose, verify, and optionally apply edits |
//! | `clx generate` / `rewrite` / `summarize` | Clause drafting |
//! | `clx serve` | Start the HTTP API |
//! | `clx completions <shell>` | Print shell completions |

use clap::{CommandFactory, Parser, Subcommand};
use clause_harness::app::AppContext;
use clause_harness::{
    config, generate, get, ingest, library, migrate, patch, search, server,
};
use clause_harness_core::index::ReferenceFilter;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Clause Harness CLI: grounded contract editing with verified patches.
///
/// All commands except `split` and `completions` read a TOML configuration
/// file. See `config/clx.example.toml` for a full example.
#[derive(Parser)]
#[command(name = "clx", version, about = "Clause Harness: grounded contract editing")]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/clx.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Split, embed, and store a contract.
    Upload {
        /// Plain-text contract file.
        file: PathBuf,

        /// Display name (defaults to the file name).
        #[arg(long)]
        name: Option<String>,

        /// Mark the document as reference material for generation.
        #[arg(long)]
        reference: bool,
    },

    /// Print the clause spans of a file as JSON without storing anything.
    Split {
        file: PathBuf,
    },

    /// Show a stored document with its spans.
    Get {
        /// Document UUID.
        id: String,
    },

    /// List stored documents, newest first.
    List {
        /// Include reference documents.
        #[arg(long)]
        include_reference: bool,
    },

    /// Similarity search over indexed clauses.
    Search {
        query: String,

        /// Number of results (defaults to `retrieval.default_k`).
        #[arg(long)]
        k: Option<usize>,

        /// Reference filter: `any`, `only`, or `exclude`.
        #[arg(long, default_value = "any")]
        reference: ReferenceFilter,

        /// Restrict results to spans of one document.
        #[arg(long)]
        document: Option<String>,
    },

    /// Manage the reference clause library.
    Library {
        #[command(subcommand)]
        action: LibraryAction,
    },

    /// Propose edits to a stored document from an instruction.
    Patch {
        /// Document UUID.
        id: String,

        /// What to change, in plain language.
        instruction: String,

        /// Apply the verified edits and re-index the document.
        #[arg(long)]
        apply: bool,
    },

    /// Draft a new clause in the style of the reference library.
    Generate {
        instruction: String,
    },

    /// Rewrite a clause to be clearer and more professional.
    Rewrite {
        text: String,
    },

    /// Summarize a clause in plain English.
    Summarize {
        text: String,
    },

    /// Start the HTTP API on `[server].bind`.
    Serve,

    /// Print shell completions to stdout.
    Completions {
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
enum LibraryAction {
    /// Embed and index library clauses.
    ///
    /// Without `--file`, indexes the built-in exemplar clauses.
    Load {
        /// JSON array of `{ "id"?, "text", "category"? }` objects.
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("clause_harness=info".parse()?)
                .add_directive("clause_harness_core=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Commands that don't require config
    match &cli.command {
        Commands::Split { file } => {
            ingest::run_split(file)?;
            return Ok(());
        }
        Commands::Completions { shell } => {
            clap_complete::generate(*shell, &mut Cli::command(), "clx", &mut std::io::stdout());
            return Ok(());
        }
        _ => {}
    }

    let cfg = config::load_config(&cli.config)?;

    if let Commands::Init = cli.command {
        migrate::run_migrations(&cfg).await?;
        println!("Database initialized successfully.");
        return Ok(());
    }

    let ctx = AppContext::from_config(&cfg).await?;

    match cli.command {
        Commands::Upload {
            file,
            name,
            reference,
        } => {
            ingest::run_upload(&ctx, &file, name, reference).await?;
        }
        Commands::Get { id } => {
            get::run_get(&ctx, &id).await?;
        }
        Commands::List { include_reference } => {
            get::run_list(&ctx, include_reference).await?;
        }
        Commands::Search {
            query,
            k,
            reference,
            document,
        } => {
            search::run_search(&ctx, &query, k, reference, document).await?;
        }
        Commands::Library { action } => match action {
            LibraryAction::Load { file } => {
                library::run_load(&ctx, file.as_deref()).await?;
            }
        },
        Commands::Patch {
            id,
            instruction,
            apply,
        } => {
            patch::run_patch(&ctx, &id, &instruction, apply).await?;
        }
        Commands::Generate { instruction } => {
            generate::run_generate(&ctx, &instruction).await?;
        }
        Commands::Rewrite { text } => {
            generate::run_rewrite(&ctx, &text).await?;
        }
        Commands::Summarize { text } => {
            generate::run_summarize(&ctx, &text).await?;
        }
        Commands::Serve => {
            server::run_server(ctx).await?;
        }
        Commands::Init | Commands::Split { .. } | Commands::Completions { .. } => {
            // Handled above
            unreachable!()
        }
    }

    Ok(())
}
