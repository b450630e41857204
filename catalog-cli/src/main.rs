mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "catalog")]
#[command(about = "Manage catalog collection images on local disk or S3", long_about = None)]
struct Cli {
    /// Use local storage in this directory, ignoring any S3 settings
    #[arg(long, global = true)]
    local: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every collection and its images
    Scan {
        /// Print the raw JSON report
        #[arg(long)]
        json: bool,
    },

    /// Upload image files or directories into a collection
    Upload {
        /// Files or directories to upload
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Target collection
        #[arg(short, long)]
        collection: String,
    },

    /// Delete an image and renumber the rest of its collection
    Delete {
        collection: String,
        filename: String,
    },

    /// Replace the bytes of an existing image, keeping its name
    Replace {
        collection: String,
        filename: String,
        /// New image file
        file: PathBuf,
    },

    /// Generate the collections manifest for the static site
    Manifest {
        /// Write the manifest here instead of CATALOG_MANIFEST_PATH
        #[arg(short, long, env = "CATALOG_MANIFEST_PATH")]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "catalog_cli=info,catalog_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scan { json } => {
            commands::scan::execute(cli.local, json).await?;
        }
        Commands::Upload { paths, collection } => {
            commands::upload::execute(cli.local, paths, collection).await?;
        }
        Commands::Delete { collection, filename } => {
            commands::delete::execute(cli.local, collection, filename).await?;
        }
        Commands::Replace {
            collection,
            filename,
            file,
        } => {
            commands::replace::execute(cli.local, collection, filename, file).await?;
        }
        Commands::Manifest { output } => {
            commands::manifest::execute(cli.local, output).await?;
        }
    }

    Ok(())
}
