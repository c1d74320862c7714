#![doc(hidden)]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Core library for masterforge
//!
//! This library holds the whole master-data pipeline: protobuf schemas with table
//! annotations are turned into per-target Rust types, tab-separated data files are
//! compiled into deterministic binary snapshots, and the same tables can be seeded
//! into or dumped from a SQLite store.
//!
//! # Module Organization
//!
//! - [`commands`]: Command-line interface and orchestration
//! - [`schema`]: Schema compilation and table definition extraction
//! - [`meta`]: Runtime table and column metadata
//! - [`codegen`]: Rust and schema source generation
//! - [`tabular`]: Tab-separated file reading and writing
//! - [`binary`]: Snapshot encoding, decoding and per-target builds
//! - [`relational`]: SQLite schema management, seeding and dumping
//! - [`verify`]: Consistency checks between artifacts

pub type Result<T, E = ohno::AppError> = core::result::Result<T, E>;

#[cfg(any(debug_assertions, test))]
pub mod binary;
#[cfg(not(any(debug_assertions, test)))]
mod binary;

#[cfg(any(debug_assertions, test))]
pub mod codegen;
#[cfg(not(any(debug_assertions, test)))]
mod codegen;

#[cfg(any(debug_assertions, test))]
pub mod commands;
#[cfg(not(any(debug_assertions, test)))]
mod commands;

pub mod meta;

#[cfg(any(debug_assertions, test))]
pub mod relational;
#[cfg(not(any(debug_assertions, test)))]
mod relational;

#[cfg(any(debug_assertions, test))]
pub mod schema;
#[cfg(not(any(debug_assertions, test)))]
mod schema;

#[cfg(any(debug_assertions, test))]
pub mod tabular;
#[cfg(not(any(debug_assertions, test)))]
mod tabular;

#[cfg(any(debug_assertions, test))]
pub mod verify;
#[cfg(not(any(debug_assertions, test)))]
mod verify;

pub use crate::commands::{Host, run};
