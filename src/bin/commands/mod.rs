pub mod config;
pub mod lookup;
pub mod serve;
pub mod stats;
pub mod sync;

use ipblocks::{BuiltIndex, IpblocksConfig};

/// Build the index once for a one-shot command, exiting on failure
pub(crate) fn build_or_exit(config: &IpblocksConfig) -> BuiltIndex {
    match config.index_builder().build() {
        Ok(built) => built,
        Err(e) => {
            eprintln!("ERROR: unable to build index: {}", e);
            eprintln!("hint: run `ipblocks sync` first or set data_dir in the config file");
            std::process::exit(1);
        }
    }
}
