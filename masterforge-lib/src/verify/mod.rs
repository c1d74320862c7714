//! Consistency checks between generated code, binaries and tabular data.
//!
//! Checks never fail on a mismatch; they return a full report and leave the
//! exit code to the caller.

mod binary_diff;
mod normalize;
mod roundtrip;
mod tabular_diff;

pub(crate) const LOG_TARGET: &str = "    verify";

pub use binary_diff::diff_binaries;
pub use normalize::normalize_source;
pub use roundtrip::{RoundTripOutcome, generated_path, verify_roundtrip};
pub use tabular_diff::{MAX_DISPLAYED_DIFFERENCES, TabularDiff, diff_dirs, diff_typed, load_dir};
