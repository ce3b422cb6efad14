//! Lens module
//!
//! Lenses combine query logic with output formatting so the same operation
//! can back the CLI and the HTTP API.
//!
//! - `lookup` - `LookupLens`, the read-only query facade over a built index
//! - `utils` - `OutputFormat` shared by every command
//!
//! ```rust,ignore
//! use ipblocks::lens::lookup::{LookupArgs, LookupLens};
//! use ipblocks::lens::utils::OutputFormat;
//!
//! let lens = LookupLens::new(&index);
//! let results = lens.lookup_all(&LookupArgs::new("1.2.3.5"))?;
//! println!("{}", lens.format_results(&results, &OutputFormat::Table));
//! ```

pub mod lookup;
pub mod utils;
