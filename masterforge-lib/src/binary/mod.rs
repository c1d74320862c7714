//! Per-target binary snapshots.
//!
//! A snapshot holds every table deployed to one target, including the column and
//! key metadata needed to read it back without the schema. Encoding is fully
//! deterministic: identical inputs produce identical bytes and so an identical
//! content hash.

mod builder;
mod row_reader;
mod row_writer;
mod snapshot;
mod target_build;

pub(crate) const LOG_TARGET: &str = "     build";

pub const BINARY_EXTENSION: &str = "bin";

pub use builder::SnapshotBuilder;
pub use row_reader::RowReader;
pub use row_writer::RowWriter;
pub use snapshot::{Snapshot, SnapshotTable};
pub use target_build::{TableOutcome, TableReport, build_target, content_hash};
