use ipblocks::lens::lookup::{LookupArgs, LookupLens};
use ipblocks::lens::utils::OutputFormat;
use ipblocks::IpblocksConfig;

pub fn run(config: &IpblocksConfig, args: LookupArgs, output_format: OutputFormat) {
    let built = super::build_or_exit(config);
    let lens = LookupLens::new(&built.index);

    let results = match lens.lookup_all(&args) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    if !output_format.is_json() && results.iter().all(|r| r.matches.is_empty()) {
        println!("no matching country blocks found");
        return;
    }

    println!("{}", lens.format_results(&results, &output_format));
}
