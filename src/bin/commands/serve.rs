use clap::Args;
use ipblocks::dataset::sync_dataset_logged;
use ipblocks::server::{spawn_refresh_task, start_server, RefreshPlan, ServerConfig, ServerState};
use ipblocks::{IpblocksConfig, SharedIndex};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Arguments for the Serve command
#[derive(Args)]
pub struct ServeArgs {
    /// Address to bind to (overrides config)
    #[clap(short, long)]
    pub address: Option<String>,

    /// Port to listen on (overrides config)
    #[clap(short, long)]
    pub port: Option<u16>,

    /// Rebuild the index periodically, e.g. "6h" (overrides config)
    #[clap(short, long)]
    pub refresh: Option<humantime::Duration>,

    /// Do not clone/pull the dataset before building
    #[clap(long)]
    pub no_sync: bool,
}

pub fn run(config: &IpblocksConfig, args: ServeArgs) {
    let ServeArgs {
        address,
        port,
        refresh,
        no_sync,
    } = args;

    let sync = match (&config.dataset_url, no_sync) {
        (Some(url), false) => Some((url.clone(), PathBuf::from(&config.data_dir))),
        _ => None,
    };
    if let Some((url, dir)) = &sync {
        sync_dataset_logged(url, dir);
    }

    // build before binding: no listener ever serves an empty or partial index
    let builder = config.index_builder();
    let index = match SharedIndex::build(&builder) {
        Ok(index) => Arc::new(index),
        Err(e) => {
            eprintln!("ERROR: unable to build index, not starting server: {}", e);
            std::process::exit(1);
        }
    };
    let info = index.load().info();
    info!(
        "index ready: {} prefixes, {} labels from {}",
        info.entries, info.labels, info.root
    );

    let server_config = ServerConfig::new()
        .with_address(address.unwrap_or_else(|| config.address.clone()))
        .with_port(port.unwrap_or(config.port));

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("ERROR: unable to start async runtime: {}", e);
            std::process::exit(1);
        }
    };

    let refresh_interval = refresh.map(Into::into).or(config.refresh_interval);

    let res = runtime.block_on(async move {
        if let Some(interval) = refresh_interval {
            info!(
                "refreshing index every {}",
                humantime::format_duration(interval)
            );
            spawn_refresh_task(
                index.clone(),
                RefreshPlan {
                    interval,
                    builder,
                    sync,
                },
            );
        }
        start_server(ServerState::new(index, server_config)).await
    });

    if let Err(e) = res {
        eprintln!("ERROR: server failed: {:#}", e);
        std::process::exit(1);
    }
}
