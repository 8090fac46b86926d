//! IO modules - side effects (network, filesystem)

pub mod download;
pub mod extract;
pub mod package;

pub use extract::{ArchiveError, ArchiveFormat, Source};
