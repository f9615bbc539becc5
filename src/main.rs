//! # Asset Reconcile CLI (`asset-reconcile`)
//!
//! ## Usage
//!
//! ```bash
//! asset-reconcile --config ./config/assets.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `asset-reconcile extract` | Write featured-image ids from the WXR export into front matter |
//! | `asset-reconcile audit` | Compare referenced ids against the Cloudinary inventory |
//! | `asset-reconcile resolve <slug>` | Resolve one post to its featured asset id |
//!
//! ## Examples
//!
//! ```bash
//! # See what extract would change without touching any file
//! asset-reconcile extract --dry-run
//!
//! # Audit and keep the full report
//! CLOUDINARY_API_KEY=... CLOUDINARY_API_SECRET=... \
//!     asset-reconcile audit --output reports/audit.json
//!
//! # Check a single post
//! asset-reconcile resolve launch-day --title "Launch Day"
//! ```
//!
//! Logs go to stderr (`RUST_LOG` overrides the level); summaries go to
//! stdout.

use anyhow::bail;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use asset_reconcile::audit::run_audit;
use asset_reconcile::config::load_config;
use asset_reconcile::featured::{run_extract, ExtractOptions};
use asset_reconcile::inventory::CloudinaryAdmin;
use asset_reconcile::legacy_export::load_export;
use asset_reconcile::resolver::FeaturedAssetResolver;

/// Reconcile featured-image references between a WordPress export, Jekyll
/// posts, and Cloudinary.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/assets.example.toml` for a full example.
#[derive(Parser)]
#[command(name = "asset-reconcile", version)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/assets.toml")]
    config: PathBuf,

    /// Log per-document and per-page detail.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add featured-image ids to documents that lack one.
    ///
    /// Documents that already carry `featured_image` or `image`, or whose
    /// post cannot be resolved, are left byte-for-byte unchanged, so the
    /// command can be re-run safely.
    Extract {
        /// Report what would change without writing any file.
        #[arg(long)]
        dry_run: bool,

        /// Maximum number of documents to process.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// List referenced assets missing remotely and remote assets never referenced.
    ///
    /// Reads `CLOUDINARY_API_KEY` and `CLOUDINARY_API_SECRET` from the
    /// environment.
    Audit {
        /// Also write the full report as JSON.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Resolve one post to its featured asset id.
    Resolve {
        /// Post slug (`post_name` in the export).
        slug: String,

        /// Post title, tried when the slug has no binding.
        #[arg(long)]
        title: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let cfg = load_config(&cli.config)?;

    match cli.command {
        Commands::Extract { dry_run, limit } => {
            let report = run_extract(&cfg, ExtractOptions { dry_run, limit })?;
            report.print_summary();
            if report.failed() > 0 {
                bail!("{} documents failed", report.failed());
            }
        }
        Commands::Audit { output } => {
            let host = CloudinaryAdmin::from_env(cfg.asset_host()?)?;
            let report = run_audit(&cfg, &host)?;
            if let Some(path) = output {
                report.write_json(&path)?;
                eprintln!("Wrote audit report to {}", path.display());
            }
            report.print_summary(&cfg.report);
        }
        Commands::Resolve { slug, title } => {
            let export_config = cfg.export()?;
            let export = load_export(&export_config.path)?;
            let resolver = FeaturedAssetResolver::new(&export);
            match resolver.resolve(&slug, title.as_deref()) {
                Ok(id) => println!("{}", id),
                Err(reason) => {
                    eprintln!("unresolved: {}", reason);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
