//! Package command

use anyhow::{Context as _, Result};
use yapl_core::io::ArchiveFormat;
use yapl_core::io::package;

use crate::Target;
use crate::ops::Context;

/// Bundle `games/<name>` or `apps/<name>` into `<root>/<name>.tar.<fmt>`.
pub async fn package(ctx: &Context, target: &Target, format: &str) -> Result<()> {
    let format = ArchiveFormat::from_short_name(format)?;
    ctx.output.section(&format!("Packaging '{}'", target.name));

    let source = ctx.layout.app_dir(target.kind, &target.name);
    let archive = package::package(&source, format, ctx.layout.root())
        .await
        .with_context(|| format!("failed to package {target}"))?;

    ctx.output.success(&format!("Created {}", archive.display()));
    Ok(())
}
