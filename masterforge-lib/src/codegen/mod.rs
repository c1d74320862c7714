//! Source generation in both directions.
//!
//! - [`rust`]: table definitions to Rust table types, one set per deploy target
//! - [`proto`]: runtime metadata back to schema source (scaffolding)

mod naming;
pub mod proto;
pub mod rust;

pub use naming::snake_name;
