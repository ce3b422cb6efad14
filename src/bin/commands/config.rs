use ipblocks::lens::utils::OutputFormat;
use ipblocks::IpblocksConfig;

pub fn run(config: &IpblocksConfig, output_format: OutputFormat) {
    match output_format.render_json(config) {
        Some(json) => println!("{}", json),
        None => println!("{}", config.summary()),
    }
}
