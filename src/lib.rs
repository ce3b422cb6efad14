#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

//! ipblocks - which country IP blocks contain an address?
//!
//! ipblocks loads a tree of plain-text CIDR files (one file per country, one
//! block per line) into an in-memory containment index and answers queries
//! for both IPv4 and IPv6. It can be used as a command-line application, an
//! HTTP service, or a library.
//!
//! # Feature Flags
//!
//! | Feature | Description | Key Dependencies |
//! |---------|-------------|------------------|
//! | (core) | Parsing, index, builder, snapshots, lookup lens | `ipnet`, `rayon`, `arc-swap` |
//! | `display` | Table formatting with `tabled` | `tabled` |
//! | `cli` | CLI binary with HTTP server | All above + `clap`, `axum` |
//!
//! # Architecture
//!
//! - **[`prefix`]**: CIDR parsing into canonical [`NetworkPrefix`] values
//! - **[`index`]**: the dual-family trie answering containment queries
//! - **[`builder`]**: directory walk + per-file parsing into an index
//! - **[`snapshot`]**: versioned, atomically swappable current index
//! - **[`lens`]**: the query facade (`LookupLens`) and output formatting
//! - **[`dataset`]**: git-based sync of the source tree
//! - **[`config`]**: configuration management
//! - **`server`**: HTTP API (requires `cli`)
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use ipblocks::builder::IndexBuilder;
//! use ipblocks::lens::lookup::LookupLens;
//!
//! let built = IndexBuilder::new("./cidr/ipv4").build()?;
//! let lens = LookupLens::new(&built.index);
//!
//! // every block containing the address, least specific first
//! for m in lens.lookup("1.2.3.5")? {
//!     println!("{} {}", m.country, m.network);
//! }
//! ```
//!
//! ## Refreshing while serving
//!
//! ```rust,ignore
//! use ipblocks::snapshot::SharedIndex;
//!
//! let builder = config.index_builder();
//! let shared = SharedIndex::build(&builder)?;
//!
//! // readers
//! let snapshot = shared.load();
//! let hits = snapshot.index.containing_networks(&"1.2.3.5".parse()?);
//!
//! // refresher: builds a new index, then swaps it in
//! shared.refresh(&builder)?;
//! ```

pub mod builder;
pub mod config;
pub mod dataset;
pub mod index;
pub mod lens;
pub mod prefix;
pub mod snapshot;

// Server module - requires CLI feature
#[cfg(feature = "cli")]
pub mod server;

// =============================================================================
// Re-exports
// =============================================================================

pub use builder::{build, rebuild, BuildError, BuildStats, BuiltIndex, IndexBuilder, LabelMode};
pub use config::IpblocksConfig;
pub use index::{ContainmentIndex, Entry};
pub use lens::lookup::{CountryMatch, LookupError, LookupLens, LookupResponse};
pub use lens::utils::OutputFormat;
pub use prefix::{AddressFamily, NetworkPrefix, ParseError};
pub use snapshot::{IndexSnapshot, SharedIndex, SnapshotInfo};

#[cfg(feature = "cli")]
pub use server::{create_axum_router, start_server, ServerConfig, ServerState};
