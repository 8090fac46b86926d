//! Run command

use anyhow::Result;
use yapl_core::launch;

use crate::Target;
use crate::ops::{self, Context};

/// Prepare everything, then launch with the configured strategy.
///
/// A non-zero exit of the application is reported, not returned as an error.
pub async fn run(ctx: &Context, target: &Target) -> Result<()> {
    ctx.output.section(&format!("Launching '{}'", target.name));
    let Some(prepared) = ops::prepare(ctx, target).await? else {
        return Ok(());
    };
    let launch_ctx = prepared.launch_context(ctx)?;
    ops::initialize_prefix(ctx, &launch_ctx)?;

    ctx.output.section("Launch");
    ctx.output.info(&format!(
        "Using launch method from config: {}",
        prepared.app.launch_method
    ));
    let outcome = launch::launch(&launch_ctx)?;
    for warning in &outcome.warnings {
        ctx.output.warning(&warning.to_string());
    }
    if outcome.status.success() {
        ctx.output.success("Application exited.");
    } else {
        ctx.output
            .warning(&format!("Application exited with {}", outcome.status));
    }
    Ok(())
}
