//! Unpackage command

use anyhow::Result;
use yapl_core::io::package::{self, UnpackStatus};
use yapl_schema::AppKind;

use crate::ops::Context;

/// Split an optional leading `game`/`app` off the archive list.
pub fn split_kind(args: &[String]) -> (AppKind, &[String]) {
    match args.split_first() {
        Some((first, rest)) if first == "game" => (AppKind::Game, rest),
        Some((first, rest)) if first == "app" => (AppKind::App, rest),
        _ => (AppKind::Game, args),
    }
}

/// Extract each bundle into `games/` or `apps/`.
///
/// Per-bundle failures are reported and the batch continues.
pub async fn unpackage(ctx: &Context, args: &[String]) -> Result<()> {
    let (kind, archives) = split_kind(args);
    let target_dir = ctx.layout.root().join(kind.dir_name());
    ctx.output
        .section(&format!("Unpacking into {}/", kind.dir_name()));

    let reports = package::unpackage(&ctx.client, &target_dir, archives).await?;
    for report in &reports {
        match &report.status {
            UnpackStatus::Extracted(path) => ctx
                .output
                .success(&format!("{} -> {}", report.archive, path.display())),
            UnpackStatus::Unsupported => ctx.output.warning(&format!(
                "Skipping {}: not a .tar.gz, .tar.xz or .tar.zst bundle",
                report.archive
            )),
            UnpackStatus::AlreadyExists(path) => ctx.output.warning(&format!(
                "Skipping {}: {} already exists",
                report.archive,
                path.display()
            )),
            UnpackStatus::Failed(reason) => ctx
                .output
                .error(&format!("Failed to unpack {}: {reason}", report.archive)),
        }
    }
    Ok(())
}
