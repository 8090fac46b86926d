//! Core library for yapl.
//!
//! Acquisition, caching and launch of Proton-based environments. The pieces
//! are layered leaves first:
//!
//! - [`io`]: archive extraction/packaging and HTTP fetches
//! - [`resolver`]: decides which components need (re)acquisition
//! - [`prefix`]: idempotent Wine prefix bootstrap
//! - [`launch`]: process invocation for each launch strategy

pub mod dlls;
pub mod io;
pub mod launch;
pub mod paths;
pub mod prefix;
pub mod reporter;
pub mod resolver;

#[cfg(test)]
mod test_support;

pub use paths::*;
pub use reporter::{NullReporter, Reporter};

/// User Agent string for core operations
pub const USER_AGENT: &str = concat!("yapl-core/", env!("CARGO_PKG_VERSION"));
