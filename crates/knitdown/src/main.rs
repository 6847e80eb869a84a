//! knitdown CLI - Main entry point

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use knitdown_core::RuntimeMode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "knitdown")]
#[command(version)]
#[command(about = "Render literate documents with executable code", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Weaving engine used for literate inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EngineKind {
    /// Execute R chunks with knitr
    Knitr,
    /// Execute nothing; the text is converted as written
    Passthrough,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a document to one or more output formats
    Render {
        /// Input file (.Rmd, .md or an R script)
        input: String,

        /// Output format(s): a name, a comma-separated list, or "all"
        #[arg(short = 't', long)]
        to: Option<String>,

        /// Output file name (ignored when several formats are rendered)
        #[arg(short = 'o', long)]
        output: Option<String>,

        /// Directory to write outputs to
        #[arg(long)]
        output_dir: Option<String>,

        /// Directory for the whitespace-free copy of the input
        #[arg(long)]
        intermediates_dir: Option<String>,

        /// Runtime mode (auto, static, interactive)
        #[arg(long, default_value = "auto")]
        runtime: RuntimeMode,

        /// Leave intermediate files in place after render
        #[arg(long)]
        no_clean: bool,

        /// Suppress console output
        #[arg(long)]
        quiet: bool,

        /// Format option (KEY:VALUE)
        #[arg(short = 'M', long)]
        metadata: Vec<String>,

        /// Execution parameter (KEY:VALUE)
        #[arg(short = 'P', long)]
        param: Vec<String>,

        /// Encoding of the input file
        #[arg(long, default_value = "UTF-8")]
        encoding: String,

        /// Weaving engine
        #[arg(long, value_enum, default_value_t = EngineKind::Knitr)]
        engine: EngineKind,
    },

    /// Copy a directory of supporting files into a `_files` directory
    Materialize {
        /// Directory to copy
        source_dir: String,

        /// Destination `_files` directory
        files_dir: String,

        /// Name for the copied directory
        #[arg(long)]
        rename: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let quiet = matches!(cli.command, Commands::Render { quiet: true, .. });
    let default_filter = if quiet { "knitdown=warn" } else { "knitdown=info" };

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Render {
            input,
            to,
            output,
            output_dir,
            intermediates_dir,
            runtime,
            no_clean,
            quiet,
            metadata,
            param,
            encoding,
            engine,
        } => commands::render::execute(commands::render::RenderArgs {
            input,
            to,
            output,
            output_dir,
            intermediates_dir,
            runtime,
            no_clean,
            quiet,
            metadata,
            params: param,
            encoding,
            engine,
        }),
        Commands::Materialize {
            source_dir,
            files_dir,
            rename,
        } => commands::materialize::execute(&source_dir, &files_dir, rename.as_deref()),
    }
}
