//! BizGrow 360 CLI - session migrations and store maintenance.
//!
//! # Usage
//!
//! ```bash
//! # Create the session table
//! bizgrow migrate
//!
//! # Export a store's products
//! bizgrow products export --store 6f1c2a7e-... --out products.csv
//!
//! # Import products from CSV
//! bizgrow products import --store 6f1c2a7e-... products.csv
//!
//! # Write the storefront QR code
//! bizgrow qr --store 6f1c2a7e-... --out storefront.svg
//! ```
//!
//! Product commands run with `SUPABASE_SERVICE_ROLE_KEY` and bypass
//! row-level security; keep that key out of the web server's environment.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use bizgrow_core::StoreId;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "bizgrow")]
#[command(author, version, about = "BizGrow 360 CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or update the session table in the session database
    Migrate,
    /// Bulk product operations for one store
    Products {
        #[command(subcommand)]
        action: ProductsAction,
    },
    /// Write the storefront QR code as SVG
    Qr {
        /// Store ID
        #[arg(short, long)]
        store: StoreId,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Public base URL (defaults to `BIZGROW_BASE_URL`)
        #[arg(long)]
        base_url: Option<String>,
    },
}

#[derive(Subcommand)]
enum ProductsAction {
    /// Export products as CSV
    Export {
        /// Store ID
        #[arg(short, long)]
        store: StoreId,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Import products from a CSV file
    Import {
        /// Store ID
        #[arg(short, long)]
        store: StoreId,

        /// CSV file with a header row
        file: PathBuf,

        /// Validate the file without inserting anything
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bizgrow_cli=info,bizgrow_web=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::sessions().await?,
        Commands::Products { action } => match action {
            ProductsAction::Export { store, out } => {
                commands::products::export(store, out.as_deref()).await?;
            }
            ProductsAction::Import {
                store,
                file,
                dry_run,
            } => {
                commands::products::import(store, &file, dry_run).await?;
            }
        },
        Commands::Qr {
            store,
            out,
            base_url,
        } => commands::qr::write(store, base_url, out.as_deref())?,
    }
    Ok(())
}
