//! Schema model and the reader that produces it.
//!
//! Schema source files are compiled by `protoc` into a descriptor set. The
//! descriptor set is then walked with a small wire-format scanner so that our
//! custom options (table marker, deploy masks, key roles) can be read without
//! generated code for them.

mod compiler;
mod definition;
mod deploy;
mod descriptor;
mod logical_type;
pub mod options;
mod reader;
mod validation;
mod wire;

pub(crate) const LOG_TARGET: &str = "    schema";

pub use compiler::{Precompiled, Protoc, SchemaCompiler};
pub use definition::{FieldDefinition, SecondaryKeyDefinition, SecondaryKeyInfo, TableDefinition};
pub use deploy::{EVERY_TARGET, should_include};
pub use logical_type::{EnumType, LogicalType};
pub use reader::{ReaderOptions, SchemaReader};

#[cfg(test)]
pub(crate) use definition::test_tables;
#[cfg(test)]
pub(crate) use descriptor::test_descriptors;
#[cfg(test)]
pub(crate) use wire::WireEncoder;
