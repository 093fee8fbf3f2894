//! odmerge CLI - Main entry point

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "odmerge")]
#[command(version)]
#[command(about = "Mail-merge and concatenate office documents", long_about = None)]
struct Cli {
    /// TOML file with engine options
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log engine steps (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Produce one copy of the template body per record
    Mailmerge {
        /// Template document
        template: PathBuf,

        /// JSON array of objects mapping field names to values
        records: PathBuf,

        /// Write the merged document to FILE
        #[arg(short = 'o', long)]
        output: PathBuf,
    },

    /// Append documents to the first one
    Concat {
        /// Reference document; its styles take precedence
        first: PathBuf,

        /// Documents to append, in order
        #[arg(required = true)]
        others: Vec<PathBuf>,

        /// Write the combined document to FILE
        #[arg(short = 'o', long)]
        output: PathBuf,
    },

    /// Substitute variable fields
    Replace {
        /// Input document
        input: PathBuf,

        /// Write the result to FILE
        #[arg(short = 'o', long)]
        output: PathBuf,

        /// Field value (NAME=VALUE)
        #[arg(short = 'f', long = "field")]
        fields: Vec<String>,
    },

    /// Print the text of every paragraph
    Text {
        /// Input document
        input: PathBuf,
    },

    /// Print an indented outline of a document part
    Pretty {
        /// Input document
        input: PathBuf,

        /// Part to print
        #[arg(long, default_value = "content.xml")]
        part: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_filter = if cli.verbose {
        "odmerge=debug,odmerge_core=debug"
    } else {
        "odmerge=info,odmerge_core=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Mailmerge {
            template,
            records,
            output,
        } => commands::mailmerge::execute(&template, &records, &output, &config),
        Commands::Concat {
            first,
            others,
            output,
        } => commands::concat::execute(&first, &others, &output, &config),
        Commands::Replace {
            input,
            output,
            fields,
        } => commands::replace::execute(&input, &output, &fields, &config),
        Commands::Text { input } => commands::text::execute(&input),
        Commands::Pretty { input, part } => commands::pretty::execute(&input, &part),
    }
}
