//! yapl - Yet Another Proton Launcher
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_panics_doc)]
//!
//! Runs Windows applications through Proton without a Steam client.
//!
//! # Overview
//!
//! Every application lives in its own directory with a JSON launch spec and a
//! private Wine prefix. Proton builds, the Steam Linux Runtime and auxiliary
//! components (DXVK, VKD3D-Proton, umu-launcher) are fetched on demand from
//! the versions listed in `runner.json` and shared between applications.
//!
//! # Directory Layout
//!
//! ```text
//! <root>/
//! ├── runner.json                # Version registry
//! ├── proton/<version>/          # Proton builds (+ <version>-win32 copies)
//! ├── dependencies/
//! │   ├── runtime/<version>/     # Steam Linux Runtime
//! │   └── <kind>/<version>/      # dxvk, vkd3d, umu-launcher
//! ├── games/<name>/game.json     # Launch spec + prefix/
//! └── apps/<name>/app.json
//! ```

pub mod cmd;
pub mod config;
pub mod ops;
pub mod ui;

pub use yapl_core::USER_AGENT;
pub use yapl_core::paths::*;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use yapl_schema::AppKind;

#[derive(Debug, Parser)]
#[command(name = "yapl")]
#[command(author, version, about = "yapl - Yet Another Proton Launcher")]
pub struct Cli {
    /// Name of the game directory inside games/
    #[arg(long, global = true, conflicts_with = "app")]
    pub game: Option<String>,

    /// Name of the application directory inside apps/
    #[arg(long, global = true)]
    pub app: Option<String>,

    /// Working root holding runner.json, proton/, games/ and apps/
    #[arg(long, global = true, env = "YAPL_ROOT", default_value = ".")]
    pub root: PathBuf,

    /// Force re-download of the Proton version
    #[arg(long, global = true)]
    pub upgrade_proton: bool,

    /// Enable verbose Proton, DXVK and VKD3D logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Run Proton's bundled Steam client instead of the configured executable
    #[arg(long, global = true)]
    pub steam: bool,

    /// Compression format for packaging (gz, xz, zst)
    #[arg(long, global = true, default_value = "gz")]
    pub format: String,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// The application selected with `--game` or `--app`.
    pub fn target(&self) -> Option<Target> {
        match (&self.game, &self.app) {
            (Some(name), _) => Some(Target::new(AppKind::Game, name)),
            (None, Some(name)) => Some(Target::new(AppKind::App, name)),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Fetch dependencies and create the Wine prefix
    Setup,
    /// Fetch dependencies, create the prefix if needed and launch
    Run,
    /// Bundle the application directory into <name>.tar.<format>
    Package,
    /// Extract bundles into games/ (or apps/ when the first argument is `app`)
    Unpackage {
        /// Optional `game` or `app`, followed by archive paths or URLs
        #[arg(required = true)]
        archives: Vec<String>,
    },
}

/// One application directory: `games/<name>` or `apps/<name>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub kind: AppKind,
    pub name: String,
}

impl Target {
    pub fn new(kind: AppKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.kind.dir_name(), self.name)
    }
}
