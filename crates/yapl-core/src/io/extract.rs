//! Streaming tar extraction with one leading path component stripped.
//!
//! Every archive this tool consumes (Proton builds, the Steam Linux Runtime,
//! DXVK, bundles written by [`package`](super::package)) wraps its payload in a
//! single top-level directory. Extraction drops that directory so the payload
//! lands directly in the destination.

use std::fmt;
use std::os::unix::fs::PermissionsExt;
use std::path::{Component, Path, PathBuf};

use async_compression::tokio::bufread::{GzipDecoder, XzDecoder, ZstdDecoder};
use futures::StreamExt;
use reqwest::Client;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncRead, BufReader};
use tokio_tar::{Archive, EntryType};
use tracing::debug;

use crate::io::download::{self, FetchError};

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("no archive source given")]
    EmptySource,

    #[error("unsupported archive format: {0}")]
    UnsupportedFormat(String),

    #[error("cannot open {location}: {reason}")]
    SourceUnreachable { location: String, reason: String },

    #[error("malformed archive: {0}")]
    Malformed(String),

    #[error("source directory does not exist: {}", .0.display())]
    MissingSource(PathBuf),

    #[error("no archives given")]
    NoArchives,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Compression wrapped around a tar stream, detected by file suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Tar,
    TarGz,
    TarXz,
    TarZst,
}

impl ArchiveFormat {
    /// Detect the format of `name` (a file name, path or URL) by its suffix.
    pub fn detect(name: &str) -> Result<Self, ArchiveError> {
        let name = name.split(['?', '#']).next().unwrap_or(name);
        if name.ends_with(".tar.gz") {
            Ok(Self::TarGz)
        } else if name.ends_with(".tar.xz") {
            Ok(Self::TarXz)
        } else if name.ends_with(".tar.zst") {
            Ok(Self::TarZst)
        } else if name.ends_with(".tar") {
            Ok(Self::Tar)
        } else {
            Err(ArchiveError::UnsupportedFormat(name.to_string()))
        }
    }

    /// Compressed format for a packaging short name (`gz`, `xz`, `zst`).
    pub fn from_short_name(name: &str) -> Result<Self, ArchiveError> {
        match name {
            "gz" => Ok(Self::TarGz),
            "xz" => Ok(Self::TarXz),
            "zst" => Ok(Self::TarZst),
            other => Err(ArchiveError::UnsupportedFormat(other.to_string())),
        }
    }

    /// Canonical file extension, including the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Tar => ".tar",
            Self::TarGz => ".tar.gz",
            Self::TarXz => ".tar.xz",
            Self::TarZst => ".tar.zst",
        }
    }

    /// Strip a compressed bundle suffix from `file_name`.
    ///
    /// Plain `.tar` is not a bundle format and yields `None`.
    pub fn bundle_stem(file_name: &str) -> Option<&str> {
        [Self::TarGz, Self::TarXz, Self::TarZst]
            .iter()
            .find_map(|f| file_name.strip_suffix(f.extension()))
            .filter(|stem| !stem.is_empty())
    }
}

/// Where archive bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Remote(String),
    Local(PathBuf),
}

impl Source {
    /// `http://` and `https://` strings are remote, anything else is a path.
    pub fn parse(location: &str) -> Result<Self, ArchiveError> {
        if location.is_empty() {
            return Err(ArchiveError::EmptySource);
        }
        if location.starts_with("http://") || location.starts_with("https://") {
            Ok(Self::Remote(location.to_string()))
        } else {
            Ok(Self::Local(PathBuf::from(location)))
        }
    }

    fn format(&self) -> Result<ArchiveFormat, ArchiveError> {
        match self {
            Self::Remote(url) => ArchiveFormat::detect(url),
            Self::Local(path) => ArchiveFormat::detect(&path.to_string_lossy()),
        }
    }

    async fn open<'a>(
        &'a self,
        client: &'a Client,
    ) -> Result<Box<dyn AsyncBufRead + Unpin + Send + 'a>, ArchiveError> {
        match self {
            Self::Remote(url) => {
                let reader = download::open_remote(client, url)
                    .await
                    .map_err(|e| self.unreachable(&e))?;
                Ok(Box::new(reader))
            }
            Self::Local(path) => {
                let file = tokio::fs::File::open(path)
                    .await
                    .map_err(|e| self.unreachable(&FetchError::Io(e)))?;
                Ok(Box::new(BufReader::new(file)))
            }
        }
    }

    fn unreachable(&self, err: &FetchError) -> ArchiveError {
        ArchiveError::SourceUnreachable {
            location: self.to_string(),
            reason: err.to_string(),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote(url) => write!(f, "{url}"),
            Self::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Extract `source` into `destination`, replacing it atomically.
///
/// The archive is unpacked into a staging directory next to `destination`
/// and renamed into place only once every entry was written, so the
/// destination is either left untouched or fully populated. An existing
/// destination is removed right before the rename.
pub async fn extract(
    client: &Client,
    source: &Source,
    destination: &Path,
) -> Result<(), ArchiveError> {
    let format = source.format()?;
    let parent = destination
        .parent()
        .ok_or_else(|| ArchiveError::Malformed(format!("{} has no parent", destination.display())))?;
    tokio::fs::create_dir_all(parent).await?;

    let reader = source.open(client).await?;
    let decoder: Box<dyn AsyncRead + Unpin + Send + '_> = match format {
        ArchiveFormat::Tar => Box::new(reader),
        ArchiveFormat::TarGz => Box::new(GzipDecoder::new(reader)),
        ArchiveFormat::TarXz => Box::new(XzDecoder::new(reader)),
        ArchiveFormat::TarZst => Box::new(ZstdDecoder::new(reader)),
    };

    let staging = tempfile::Builder::new()
        .prefix(".yapl-")
        .tempdir_in(parent)?;
    debug!(
        "Extracting {source} ({:?}) via {}",
        format,
        staging.path().display()
    );

    // The TempDir guard removes partial output on every early return.
    unpack_stripped(decoder, staging.path()).await?;
    tokio::fs::set_permissions(staging.path(), std::fs::Permissions::from_mode(0o755)).await?;

    if tokio::fs::symlink_metadata(destination).await.is_ok() {
        tokio::fs::remove_dir_all(destination).await?;
    }
    tokio::fs::rename(staging.path(), destination).await?;
    Ok(())
}

/// Strip the first component of an entry path.
///
/// Returns `None` for the top-level directory itself. Paths that would leave
/// the destination are rejected.
fn strip_first_component(path: &Path) -> Result<Option<PathBuf>, ArchiveError> {
    let mut stripped = PathBuf::new();
    for component in path.components().skip(1) {
        match component {
            Component::Normal(part) => stripped.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(ArchiveError::Malformed(format!(
                    "entry escapes destination: {}",
                    path.display()
                )));
            }
        }
    }
    Ok((!stripped.as_os_str().is_empty()).then_some(stripped))
}

async fn unpack_stripped<R>(reader: R, destination: &Path) -> Result<(), ArchiveError>
where
    R: AsyncRead + Unpin + Send,
{
    let mut archive = Archive::new(reader);
    let mut entries = archive.entries()?;

    while let Some(entry) = entries.next().await {
        let mut entry = entry?;
        let path = entry.path()?.into_owned();
        let Some(relative) = strip_first_component(&path)? else {
            continue;
        };
        let target = destination.join(&relative);
        let entry_type = entry.header().entry_type();
        let mode = entry.header().mode().unwrap_or(0o644) & 0o7777;

        // The entry itself may be replaced, but never written through.
        let guarded = match entry_type {
            EntryType::Directory => Some(relative.as_path()),
            _ => relative.parent(),
        };
        if let Some(guarded) = guarded {
            reject_symlinked_components(destination, guarded).await?;
        }
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        match entry_type {
            EntryType::Directory => {
                tokio::fs::create_dir_all(&target).await?;
                // owner must be able to populate it
                let perms = std::fs::Permissions::from_mode(mode | 0o700);
                tokio::fs::set_permissions(&target, perms).await?;
            }
            EntryType::Regular | EntryType::Continuous => {
                remove_existing(&target).await?;
                let mut file = tokio::fs::File::create(&target).await?;
                tokio::io::copy(&mut entry, &mut file).await?;
                drop(file);
                tokio::fs::set_permissions(&target, std::fs::Permissions::from_mode(mode))
                    .await?;
            }
            EntryType::Symlink => {
                let link = entry
                    .link_name()?
                    .ok_or_else(|| {
                        ArchiveError::Malformed(format!("symlink without target: {}", path.display()))
                    })?
                    .into_owned();
                remove_existing(&target).await?;
                tokio::fs::symlink(&link, &target).await?;
            }
            EntryType::Link => {
                let link = entry.link_name()?.ok_or_else(|| {
                    ArchiveError::Malformed(format!("hard link without target: {}", path.display()))
                })?;
                let Some(link_relative) = strip_first_component(&link)? else {
                    return Err(ArchiveError::Malformed(format!(
                        "hard link to archive root: {}",
                        path.display()
                    )));
                };
                if let Some(link_parent) = link_relative.parent() {
                    reject_symlinked_components(destination, link_parent).await?;
                }
                remove_existing(&target).await?;
                tokio::fs::hard_link(destination.join(link_relative), &target).await?;
            }
            other => debug!("Skipping {} ({other:?})", path.display()),
        }
    }
    Ok(())
}

/// Fail if any existing prefix of `relative` below `root` is a symlink.
///
/// An earlier entry may have planted a symlink pointing outside `root`;
/// following it would let later entries write anywhere.
async fn reject_symlinked_components(root: &Path, relative: &Path) -> Result<(), ArchiveError> {
    let mut current = root.to_path_buf();
    for component in relative.components() {
        current.push(component);
        match tokio::fs::symlink_metadata(&current).await {
            Ok(meta) if meta.file_type().is_symlink() => {
                return Err(ArchiveError::Malformed(format!(
                    "entry escapes destination through symlink: {}",
                    relative.display()
                )));
            }
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

async fn remove_existing(path: &Path) -> std::io::Result<()> {
    match tokio::fs::symlink_metadata(path).await {
        Ok(meta) if meta.is_dir() => tokio::fs::remove_dir_all(path).await,
        Ok(_) => tokio::fs::remove_file(path).await,
        Err(_) => Ok(()),
    }
}
