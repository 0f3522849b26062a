mod commands;
mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use docfetch_resolver::{AnyFetcher, FetcherFactory};
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;

#[derive(Parser)]
#[command(name = "docfetch")]
#[command(about = "Resolve document URIs into locally cached files")]
struct Cli {
    /// Increase log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch a source if needed and print the cached path
    Resolve(FetchArgs),
    /// Print where a source is cached without fetching it
    Path {
        /// Source URI or filesystem path
        uri: String,
        #[command(flatten)]
        root: RootArg,
    },
    /// Fetch a source if needed and write its content to stdout
    Cat(FetchArgs),
}

#[derive(Args)]
struct RootArg {
    /// Directory that anchors the cache and relative paths
    /// (defaults to the configured root, then the current directory)
    #[arg(long)]
    root: Option<PathBuf>,
}

#[derive(Args)]
struct FetchArgs {
    /// Source URI or filesystem path
    uri: String,
    #[command(flatten)]
    root: RootArg,
    /// Retrieve again even if a cached copy exists
    #[arg(long, conflicts_with = "cache_only")]
    refresh: bool,
    /// Only use the cache; fail if there is no cached copy
    #[arg(long)]
    cache_only: bool,
}

fn init_logging(verbose: u8) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn root_dir(arg: &RootArg, config: &AppConfig) -> Result<PathBuf> {
    match arg.root.as_ref().or(config.root.as_ref()) {
        Some(root) => Ok(root.clone()),
        None => std::env::current_dir().context("could not determine current directory"),
    }
}

fn build_fetcher(
    config: &AppConfig,
    root: &RootArg,
    uri: &str,
    refresh: bool,
    cache_only: bool,
) -> Result<AnyFetcher> {
    let root = root_dir(root, config)?;
    let factory = FetcherFactory::new().with_sftp_options(config.sftp_options());
    factory
        .resolve(&root, uri, refresh, cache_only)
        .with_context(|| format!("cannot use source {uri:?}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let app_config = config::load_config();

    match cli.command {
        Command::Resolve(args) => {
            let fetcher = build_fetcher(
                &app_config,
                &args.root,
                &args.uri,
                args.refresh,
                args.cache_only,
            )?;
            commands::resolve::run(&fetcher).await
        }
        Command::Path { uri, root } => {
            let fetcher = build_fetcher(&app_config, &root, &uri, false, false)?;
            commands::path::run(&fetcher)
        }
        Command::Cat(args) => {
            let fetcher = build_fetcher(
                &app_config,
                &args.root,
                &args.uri,
                args.refresh,
                args.cache_only,
            )?;
            commands::cat::run(&fetcher).await
        }
    }
}
