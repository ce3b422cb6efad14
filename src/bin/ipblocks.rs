use clap::{Parser, Subcommand};
use ipblocks::lens::lookup::LookupArgs;
use ipblocks::lens::utils::OutputFormat;
use ipblocks::IpblocksConfig;
use tracing::Level;

mod commands;

use commands::serve::ServeArgs;
use commands::stats::StatsArgs;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    /// configuration file path, by default $HOME/.ipblocks/ipblocks.toml is used
    #[clap(short, long)]
    config: Option<String>,

    /// Print debug information
    #[clap(long)]
    debug: bool,

    /// Dataset directory (overrides config)
    #[clap(short, long, global = true)]
    data_dir: Option<String>,

    /// Output format: table, markdown, json, json-pretty, json-line, psv
    #[clap(short, long, global = true, default_value = "table")]
    format: OutputFormat,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index and serve lookups over HTTP
    Serve(ServeArgs),

    /// Find every country block containing the given addresses
    Lookup(LookupArgs),

    /// Build the index and print its size
    Stats(StatsArgs),

    /// Clone or update the dataset checkout
    Sync,

    /// Show the resolved configuration
    Config,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(match cli.debug {
            true => Level::INFO,
            false => Level::WARN,
        })
        .with_writer(std::io::stderr)
        .init();

    let mut config = match IpblocksConfig::new(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("ERROR: unable to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    match cli.command {
        Commands::Serve(args) => commands::serve::run(&config, args),
        Commands::Lookup(args) => commands::lookup::run(&config, args, cli.format),
        Commands::Stats(args) => commands::stats::run(&config, args, cli.format),
        Commands::Sync => commands::sync::run(&config),
        Commands::Config => commands::config::run(&config, cli.format),
    }
}
