//! Domain-specific errors for launcher operations

use std::path::PathBuf;

use thiserror::Error;
use yapl_core::io::ArchiveError;
use yapl_core::io::download::FetchError;
use yapl_core::launch::LaunchError;
use yapl_core::prefix::PrefixError;
use yapl_core::resolver::ResolveError;
use yapl_schema::ConfigError;

#[derive(Error, Debug)]
pub enum OpsError {
    #[error("--game or --app flag is required")]
    NoTarget,

    #[error("could not parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("dependency resolution failed: {0}")]
    Resolve(#[from] ResolveError),

    #[error("prefix setup failed: {0}")]
    Prefix(#[from] PrefixError),

    #[error("launch failed: {0}")]
    Launch(#[from] LaunchError),

    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("network error: {0}")]
    Fetch(#[from] FetchError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{context}: {message}")]
    Context {
        context: &'static str,
        message: String,
    },
}

impl OpsError {
    /// Create an error with context for better debugging.
    pub fn context(ctx: &'static str, msg: impl std::fmt::Display) -> Self {
        Self::Context {
            context: ctx,
            message: msg.to_string(),
        }
    }
}
