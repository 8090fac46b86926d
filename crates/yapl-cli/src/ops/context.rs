//! Shared operation context.
//!
//! This module defines the `Context` struct, which groups the working root,
//! the HTTP client, output and the global flags so commands do not thread
//! them individually.

use crate::Cli;
use crate::ops::OpsError;
use crate::ui::Output;
use std::fmt;
use std::sync::Arc;
use yapl_core::{Layout, Reporter};

/// Groups common state used by every command.
#[derive(Clone)]
pub struct Context {
    pub layout: Layout,
    pub client: reqwest::Client,
    pub output: Output,
    pub reporter: Arc<dyn Reporter>,
    /// Re-extract Proton even when installed.
    pub force_upgrade: bool,
    /// Proton/DXVK/VKD3D logging.
    pub debug: bool,
    /// Launch Proton's bundled Steam client.
    pub steam: bool,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("layout", &self.layout)
            .field("force_upgrade", &self.force_upgrade)
            .field("debug", &self.debug)
            .field("steam", &self.steam)
            .finish_non_exhaustive()
    }
}

impl Context {
    pub fn new(layout: Layout, client: reqwest::Client, output: Output) -> Self {
        Self {
            layout,
            client,
            reporter: Arc::new(output.clone()),
            output,
            force_upgrade: false,
            debug: false,
            steam: false,
        }
    }

    /// Build from parsed arguments. The root is made absolute so every path
    /// handed to child processes is.
    pub fn from_cli(cli: &Cli) -> Result<Self, OpsError> {
        let root = std::path::absolute(&cli.root)?;
        let client = yapl_core::io::download::client()?;
        let mut ctx = Self::new(Layout::new(root), client, Output::new());
        ctx.force_upgrade = cli.upgrade_proton;
        ctx.debug = cli.debug;
        ctx.steam = cli.steam;
        Ok(ctx)
    }
}
