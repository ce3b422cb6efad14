//! HTTP handlers
//!
//! - `ip` - country block lookup (`GET /ip/{ip}`)
//! - `system` - health and index information (`GET /health`)

pub mod ip;
pub mod system;

pub use ip::ip_lookup_handler;
pub use system::health_handler;
