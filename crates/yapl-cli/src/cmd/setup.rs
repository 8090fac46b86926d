//! Setup command

use anyhow::Result;
use yapl_core::dlls;

use crate::Target;
use crate::ops::{self, Context};

/// Fetch dependencies, create the prefix and install custom DLLs.
pub async fn setup(ctx: &Context, target: &Target) -> Result<()> {
    ctx.output.section(&format!("Setting up '{}'", target.name));
    let Some(prepared) = ops::prepare(ctx, target).await? else {
        return Ok(());
    };
    let launch = prepared.launch_context(ctx)?;
    ops::initialize_prefix(ctx, &launch)?;

    let report = dlls::install_custom_dlls(
        &ctx.layout,
        &prepared.prefix,
        &prepared.app.dependencies,
    )?;
    for dll in &report.installed {
        ctx.output.info(&format!("Installed {}", dll.display()));
    }
    for warning in &report.warnings {
        ctx.output.warning(&warning.to_string());
    }

    ctx.output.success("Setup complete!");
    ctx.output.info(&format!(
        "If you haven't already, install your application into the prefix at '{}'",
        prepared.prefix.display()
    ));
    Ok(())
}
