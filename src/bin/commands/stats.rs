use clap::Args;
use ipblocks::lens::utils::OutputFormat;
use ipblocks::{AddressFamily, IpblocksConfig};
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Arguments for the Stats command
#[derive(Args)]
pub struct StatsArgs {
    /// List every label with its prefix counts
    #[clap(short, long)]
    pub labels: bool,
}

#[derive(Debug, Serialize, Tabled)]
struct LabelCount {
    label: String,
    ipv4: usize,
    ipv6: usize,
}

#[derive(Debug, Serialize)]
struct IndexStats {
    root: String,
    files: usize,
    entries: usize,
    ipv4_entries: usize,
    ipv6_entries: usize,
    skipped_lines: usize,
    labels: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    label_counts: Option<Vec<LabelCount>>,
}

pub fn run(config: &IpblocksConfig, args: StatsArgs, output_format: OutputFormat) {
    let built = super::build_or_exit(config);
    let index = &built.index;

    let label_counts = args.labels.then(|| {
        index
            .labels()
            .into_iter()
            .map(|label| {
                let count = |family| {
                    index
                        .entries()
                        .filter(|e| e.label == label && e.prefix.family() == family)
                        .count()
                };
                LabelCount {
                    label: label.to_string(),
                    ipv4: count(AddressFamily::V4),
                    ipv6: count(AddressFamily::V6),
                }
            })
            .collect::<Vec<_>>()
    });

    let stats = IndexStats {
        root: config.build_root().display().to_string(),
        files: built.stats.files,
        entries: index.len(),
        ipv4_entries: index.family_len(AddressFamily::V4),
        ipv6_entries: index.family_len(AddressFamily::V6),
        skipped_lines: built.stats.skipped_lines,
        labels: index.labels().len(),
        label_counts,
    };

    if let Some(json) = output_format.render_json(&stats) {
        println!("{}", json);
        return;
    }

    println!("Build Root:      {}", stats.root);
    println!("Files:           {}", stats.files);
    println!(
        "Prefixes:        {} ({} ipv4, {} ipv6)",
        stats.entries, stats.ipv4_entries, stats.ipv6_entries
    );
    println!("Labels:          {}", stats.labels);
    println!("Skipped Lines:   {}", stats.skipped_lines);
    if let Some(counts) = stats.label_counts {
        println!();
        let mut table = Table::new(counts);
        if output_format == OutputFormat::Markdown {
            table.with(Style::markdown());
        } else {
            table.with(Style::rounded());
        }
        println!("{}", table);
    }
}
