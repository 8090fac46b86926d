//! Bundling a target directory into a compressed tar and back.

use std::path::{Path, PathBuf};

use async_compression::tokio::write::{GzipEncoder, XzEncoder, ZstdEncoder};
use reqwest::Client;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_tar::{Builder, EntryType, Header};
use tracing::{info, warn};
use walkdir::WalkDir;

use super::extract::{ArchiveError, ArchiveFormat, Source, extract};

/// Owner written into every packaged entry.
const NOBODY_ID: u64 = 65534;
const NOBODY_NAME: &str = "nobody";

/// Package `source_dir` into `<output_dir>/<basename><ext>`.
///
/// Entry names are relative to the parent of `source_dir`, so the archive
/// holds exactly one top-level directory and round-trips through
/// [`extract`].
pub async fn package(
    source_dir: &Path,
    format: ArchiveFormat,
    output_dir: &Path,
) -> Result<PathBuf, ArchiveError> {
    if !source_dir.is_dir() {
        return Err(ArchiveError::MissingSource(source_dir.to_path_buf()));
    }
    let base = source_dir
        .file_name()
        .ok_or_else(|| ArchiveError::MissingSource(source_dir.to_path_buf()))?;
    let parent = source_dir.parent().unwrap_or(Path::new(""));

    tokio::fs::create_dir_all(output_dir).await?;
    let output = output_dir.join(format!("{}{}", base.to_string_lossy(), format.extension()));
    info!("Packaging {} into {}", source_dir.display(), output.display());

    let file = tokio::fs::File::create(&output).await?;
    if let Err(e) = write_archive(file, format, source_dir, parent).await {
        tokio::fs::remove_file(&output).await.ok();
        return Err(e);
    }
    Ok(output)
}

async fn write_archive(
    file: tokio::fs::File,
    format: ArchiveFormat,
    source_dir: &Path,
    parent: &Path,
) -> Result<(), ArchiveError> {
    match format {
        ArchiveFormat::Tar => finish(write_tree(file, source_dir, parent).await?).await,
        ArchiveFormat::TarGz => {
            finish(write_tree(GzipEncoder::new(file), source_dir, parent).await?).await
        }
        ArchiveFormat::TarXz => {
            finish(write_tree(XzEncoder::new(file), source_dir, parent).await?).await
        }
        ArchiveFormat::TarZst => {
            finish(write_tree(ZstdEncoder::new(file), source_dir, parent).await?).await
        }
    }
}

async fn finish<W: AsyncWrite + Unpin>(mut writer: W) -> Result<(), ArchiveError> {
    writer.shutdown().await?;
    Ok(())
}

/// Append every path under `source_dir` (including itself) to a tar stream.
async fn write_tree<W>(writer: W, source_dir: &Path, parent: &Path) -> Result<W, ArchiveError>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let mut builder = Builder::new(writer);
    builder.follow_symlinks(false);

    for entry in WalkDir::new(source_dir)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry.map_err(std::io::Error::from)?;
        let path = entry.path();
        let name = path
            .strip_prefix(parent)
            .map_err(|_| ArchiveError::Malformed(format!("{} outside source", path.display())))?;
        let meta = tokio::fs::symlink_metadata(path).await?;

        let mut header = Header::new_gnu();
        header.set_metadata(&meta);
        header.set_uid(NOBODY_ID);
        header.set_gid(NOBODY_ID);
        header.set_username(NOBODY_NAME)?;
        header.set_groupname(NOBODY_NAME)?;

        let file_type = meta.file_type();
        if file_type.is_dir() {
            header.set_size(0);
            builder
                .append_data(&mut header, name, tokio::io::empty())
                .await?;
        } else if file_type.is_symlink() {
            let target = tokio::fs::read_link(path).await?;
            header.set_entry_type(EntryType::Symlink);
            header.set_size(0);
            header.set_link_name(&target)?;
            builder
                .append_data(&mut header, name, tokio::io::empty())
                .await?;
        } else if file_type.is_file() {
            let file = tokio::fs::File::open(path).await?;
            header.set_size(meta.len());
            builder.append_data(&mut header, name, file).await?;
        } else {
            warn!("Skipping special file {}", path.display());
        }
    }

    Ok(builder.into_inner().await?)
}

/// Result of unpacking one bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnpackStatus {
    /// Extracted into the contained path.
    Extracted(PathBuf),
    /// Not a `.tar.gz`/`.tar.xz`/`.tar.zst` bundle.
    Unsupported,
    /// Destination already present; nothing was touched.
    AlreadyExists(PathBuf),
    /// Extraction failed with the contained message.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnpackReport {
    pub archive: String,
    pub status: UnpackStatus,
}

/// Extract each bundle into `<target_dir>/<name>`, where `<name>` is the
/// bundle file name without its suffix.
///
/// A failure on one bundle is logged and recorded in its report; the batch
/// continues.
pub async fn unpackage(
    client: &Client,
    target_dir: &Path,
    archives: &[String],
) -> Result<Vec<UnpackReport>, ArchiveError> {
    if archives.is_empty() {
        return Err(ArchiveError::NoArchives);
    }
    tokio::fs::create_dir_all(target_dir).await?;

    let mut reports = Vec::with_capacity(archives.len());
    for archive in archives {
        let status = unpack_one(client, target_dir, archive).await;
        reports.push(UnpackReport {
            archive: archive.clone(),
            status,
        });
    }
    Ok(reports)
}

async fn unpack_one(client: &Client, target_dir: &Path, archive: &str) -> UnpackStatus {
    let file_name = crate::filename_from_url(archive);
    let Some(name) = ArchiveFormat::bundle_stem(file_name) else {
        warn!("Skipping {archive}: unsupported bundle format");
        return UnpackStatus::Unsupported;
    };

    let destination = target_dir.join(name);
    if destination.exists() {
        warn!(
            "Skipping {archive}: {} already exists",
            destination.display()
        );
        return UnpackStatus::AlreadyExists(destination);
    }

    info!("Unpacking {archive} into {}", destination.display());
    let result = match Source::parse(archive) {
        Ok(source) => extract(client, &source, &destination).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(()) => UnpackStatus::Extracted(destination),
        Err(e) => {
            warn!("Failed to unpack {archive}: {e}");
            UnpackStatus::Failed(e.to_string())
        }
    }
}
