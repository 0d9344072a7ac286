//! Persistence formats.
//!
//! Three surfaces share the data model:
//!
//! - **Stream** (`stream`): the versioned binary encoding of one image's
//!   annotation and its compressed history companion. This is the editor's
//!   native format and the only one that round-trips everything, including
//!   in-progress construction state.
//! - **Package** (`package`): a deflate archive bundling many annotation
//!   streams for the cross-validation tool.
//! - **JSON projection** (`json_export`): one-way, lossy flattened records
//!   for downstream batch consumers.

mod error;
pub mod json_export;
pub mod package;
pub mod stream;

pub use error::{PackageError, StreamError};

#[cfg(test)]
mod tests;
