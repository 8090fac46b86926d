//! Operations shared by the commands.

pub mod context;
pub mod error;
pub mod prepare;

pub use context::Context;
pub use error::OpsError;
pub use prepare::{Prepared, initialize_prefix, load, prepare};
