use ipblocks::dataset::{sync_dataset, SyncOutcome};
use ipblocks::IpblocksConfig;
use std::path::Path;

pub fn run(config: &IpblocksConfig) {
    let Some(url) = config.dataset_url.as_deref() else {
        eprintln!("ERROR: dataset_url is not configured, nothing to sync");
        std::process::exit(1);
    };

    match sync_dataset(url, Path::new(&config.data_dir)) {
        Ok(SyncOutcome::Cloned) => println!("cloned {} into {}", url, config.data_dir),
        Ok(SyncOutcome::Pulled) => println!("updated {}", config.data_dir),
        Err(e) => {
            eprintln!("ERROR: dataset sync failed: {:#}", e);
            std::process::exit(1);
        }
    }
}
