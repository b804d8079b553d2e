use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use grano_ql::{config, server};

/// grano-ql - object queries over a grano entity graph
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// HTTP server host address
    #[arg(long, default_value = "0.0.0.0")]
    http_host: String,

    /// HTTP server port
    #[arg(long, default_value_t = 8080)]
    http_port: u16,

    /// SQLite database file (`:memory:` for a throwaway store)
    #[arg(long, default_value = "grano.db")]
    database: String,

    /// Seconds before a request is aborted
    #[arg(long, default_value_t = 30)]
    request_timeout: u64,

    /// Read settings from a YAML file instead of flags
    #[arg(long, value_name = "FILE", conflicts_with = "from_env")]
    config: Option<PathBuf>,

    /// Read settings from GRANO_QL_* environment variables (and `.env`)
    #[arg(long)]
    from_env: bool,
}

impl From<Cli> for config::CliConfig {
    fn from(cli: Cli) -> Self {
        config::CliConfig {
            http_host: cli.http_host,
            http_port: cli.http_port,
            database_path: cli.database,
            request_timeout_secs: cli.request_timeout,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // defaults to INFO, override with RUST_LOG
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    log::info!("grano-ql v{}", env!("CARGO_PKG_VERSION"));

    if cli.from_env {
        return server::run().await.context("server failed");
    }

    let yaml = cli.config.clone();
    let config = match yaml {
        Some(path) => config::ServerConfig::from_yaml_file(&path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => config::ServerConfig::from_cli(cli.into()).context("invalid configuration")?,
    };

    server::run_with_config(config)
        .await
        .context("server failed")
}
