//! Pure data types for shellac: values, execution results and job status.
//!
//! This crate is a leaf dependency with no async runtime and no parser. It
//! exists so that formatters, completers and other collaborators can work
//! with shellac's data without pulling in the kernel.

pub mod job;
pub mod result;
pub mod value;

// Flat re-exports for convenience
pub use job::*;
pub use result::*;
pub use value::*;
