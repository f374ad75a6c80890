use std::{path::PathBuf, sync::Arc};

use ac2_server::{
    config::{CliOverrides, ServerConfig},
    error::Result,
    server,
    store::CommitmentStore,
    telemetry::setup_simple_tracing,
};
use clap::Parser;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "ac2-server", version, about = "Threshold reveal backend for AC2 objectives")]
struct Cli {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    host: Option<String>,

    #[arg(short, long)]
    port: Option<u16>,

    /// Directory of the sled database. Objectives are kept in memory when unset.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[arg(long)]
    log_level: Option<String>,
}

#[actix_web::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let overrides = CliOverrides {
        host: cli.host,
        port: cli.port,
        data_dir: cli.data_dir,
        log_level: cli.log_level,
    };

    let config = ServerConfig::load(cli.config.as_deref(), &overrides)?;
    setup_simple_tracing(config.level()?);

    let store = match &config.data_dir {
        Some(dir) => {
            info!(data_dir = %dir.display(), "opening commitment store");
            CommitmentStore::open(dir)?
        }
        None => {
            warn!("no data_dir configured, objectives will not survive a restart");
            CommitmentStore::temporary()?
        }
    };

    server::run(config, Arc::new(store)).await
}
