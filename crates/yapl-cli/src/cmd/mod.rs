//! Command implementations

pub mod package;
pub mod run;
pub mod setup;
pub mod unpackage;
