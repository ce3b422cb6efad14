//! Country lookup lens
//!
//! `LookupLens` is the read-only query facade over a built index: it validates
//! a raw address string, asks the index for every containing block and maps
//! each hit to a `{country, network}` pair.
//!
//! # Example
//!
//! ```rust,ignore
//! use ipblocks::builder::build;
//! use ipblocks::lens::lookup::LookupLens;
//!
//! let built = build("./cidr")?;
//! let lens = LookupLens::new(&built.index);
//! for m in lens.lookup("1.2.3.5")? {
//!     println!("{} {}", m.country, m.network);
//! }
//! ```

use crate::index::{ContainmentIndex, Entry};
use crate::lens::utils::OutputFormat;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use thiserror::Error;

// =============================================================================
// Types
// =============================================================================

/// Query failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("invalid IP address: '{0}'")]
    InvalidAddress(String),
}

/// One containing block for a queried address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryMatch {
    /// Label of the file the block came from
    pub country: String,
    /// Canonical `address/len` of the block
    pub network: String,
}

impl From<&Entry> for CountryMatch {
    fn from(entry: &Entry) -> Self {
        Self {
            country: entry.label.clone(),
            network: entry.prefix.to_string(),
        }
    }
}

/// Wire payload for a lookup: `status` is "200" with matches and "404" without
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupResponse {
    pub matches: Vec<CountryMatch>,
    pub status: String,
}

impl LookupResponse {
    pub fn from_matches(matches: Vec<CountryMatch>) -> Self {
        let status = if matches.is_empty() { "404" } else { "200" };
        Self {
            matches,
            status: status.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

/// Matches for one queried address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpMatches {
    pub ip: String,
    pub matches: Vec<CountryMatch>,
}

/// Flattened row for table and PSV output
#[derive(Debug, Clone)]
#[cfg_attr(feature = "display", derive(tabled::Tabled))]
struct MatchRow {
    ip: String,
    country: String,
    network: String,
}

// =============================================================================
// Args
// =============================================================================

/// Arguments for lookup operations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::Args))]
pub struct LookupArgs {
    /// IP addresses to look up
    #[cfg_attr(feature = "cli", clap(value_name = "IP", required = true))]
    pub ips: Vec<String>,
}

impl LookupArgs {
    pub fn new(ip: impl Into<String>) -> Self {
        Self {
            ips: vec![ip.into()],
        }
    }

    /// Add another address to look up
    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ips.push(ip.into());
        self
    }
}

// =============================================================================
// Lens
// =============================================================================

/// Read-only lookup facade over a [`ContainmentIndex`]
pub struct LookupLens<'a> {
    index: &'a ContainmentIndex,
}

impl<'a> LookupLens<'a> {
    pub fn new(index: &'a ContainmentIndex) -> Self {
        Self { index }
    }

    /// Validate a raw address string (single address, no CIDR suffix)
    pub fn parse_address(raw: &str) -> Result<IpAddr, LookupError> {
        raw.trim()
            .parse::<IpAddr>()
            .map_err(|_| LookupError::InvalidAddress(raw.to_string()))
    }

    /// Every block containing `raw`, least specific first
    pub fn lookup(&self, raw: &str) -> Result<Vec<CountryMatch>, LookupError> {
        let ip = Self::parse_address(raw)?;
        Ok(self.lookup_addr(&ip))
    }

    /// Lookup for an already validated address
    pub fn lookup_addr(&self, ip: &IpAddr) -> Vec<CountryMatch> {
        self.index
            .containing_networks(ip)
            .into_iter()
            .map(CountryMatch::from)
            .collect()
    }

    /// Look up every address in `args`; the first invalid address fails the batch
    pub fn lookup_all(&self, args: &LookupArgs) -> Result<Vec<IpMatches>, LookupError> {
        args.ips
            .iter()
            .map(|raw| -> Result<IpMatches, LookupError> {
                Ok(IpMatches {
                    ip: raw.trim().to_string(),
                    matches: self.lookup(raw)?,
                })
            })
            .collect()
    }

    // =========================================================================
    // Formatting
    // =========================================================================

    /// Format lookup results for display
    pub fn format_results(&self, results: &[IpMatches], format: &OutputFormat) -> String {
        let rows: Vec<MatchRow> = results
            .iter()
            .flat_map(|r| {
                r.matches.iter().map(move |m| MatchRow {
                    ip: r.ip.clone(),
                    country: m.country.clone(),
                    network: m.network.clone(),
                })
            })
            .collect();

        match format {
            OutputFormat::Json | OutputFormat::JsonPretty => {
                format.render_json(&results).unwrap_or_default()
            }
            OutputFormat::JsonLine => results
                .iter()
                .filter_map(|r| serde_json::to_string(r).ok())
                .collect::<Vec<_>>()
                .join("\n"),
            #[cfg(feature = "display")]
            OutputFormat::Table | OutputFormat::Markdown => {
                use tabled::settings::Style;
                use tabled::Table;

                let mut table = Table::new(rows);
                if matches!(format, OutputFormat::Markdown) {
                    table.with(Style::markdown());
                } else {
                    table.with(Style::rounded());
                }
                table.to_string()
            }
            _ => {
                let mut lines = vec!["ip|country|network".to_string()];
                lines.extend(
                    rows.iter()
                        .map(|r| format!("{}|{}|{}", r.ip, r.country, r.network)),
                );
                lines.join("\n")
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
