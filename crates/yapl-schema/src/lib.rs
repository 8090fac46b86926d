//! Shared types for yapl.
//!
//! This crate holds the in-memory form of the two configuration documents the
//! launcher works from:
//!
//! - [`GlobalRegistry`] (`runner.json`): which Proton builds, container
//!   runtimes and auxiliary dependencies exist, and where to fetch them.
//! - [`AppSpec`] (`game.json` / `app.json`): how one application is launched.
//!
//! Both are loaded once at startup and treated as immutable values that are
//! passed explicitly to every component that needs them.

pub mod arch;
pub mod registry;
pub mod spec;

// Re-exports
pub use arch::*;
pub use registry::*;
pub use spec::*;

/// File name of the global registry at the working root.
pub const REGISTRY_FILE: &str = "runner.json";

/// Identity tag value that means "no identity configured".
pub const NO_APP_ID: &str = "0";
