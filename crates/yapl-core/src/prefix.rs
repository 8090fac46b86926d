//! Wine prefix bootstrap.
//!
//! A prefix is ready once `system.reg` exists in its root. Initialization is
//! idempotent: a ready prefix is never touched again.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use thiserror::Error;
use tracing::{debug, info};

use crate::launch::{Invocation, LaunchContext, env};

/// File whose presence marks a bootstrapped prefix.
pub const SENTINEL: &str = "system.reg";

/// Directory Proton creates its prefix in, below `STEAM_COMPAT_DATA_PATH`.
pub const PROTON_PFX: &str = "pfx";

#[derive(Error, Debug)]
pub enum PrefixError {
    #[error("prefix initialization failed ({status}): {stderr}")]
    Bootstrap { status: ExitStatus, stderr: String },

    #[error("failed to execute {}: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to restructure prefix: {0}")]
    Layout(#[source] io::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixState {
    Absent,
    Ready,
}

/// How a new prefix gets populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bootstrap {
    /// `proton run cmd /c echo`, followed by layout normalization.
    ProtonRun,
    /// `<wine> wineboot -u` with only `WINEPREFIX`/`WINEARCH` added.
    Wineboot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    AlreadyReady,
    Initialized(Bootstrap),
}

pub fn state(prefix: &Path) -> PrefixState {
    if prefix.join(SENTINEL).exists() {
        PrefixState::Ready
    } else {
        PrefixState::Absent
    }
}

/// Bootstrap for a context: the Proton entrypoint only drives 64-bit
/// prefixes; alternate binaries and `win32` go through `wineboot`.
pub fn choose_bootstrap(ctx: &LaunchContext<'_>) -> Bootstrap {
    if ctx.app().uses_proton_entrypoint() && !ctx.app().wine_arch.is_32_bit() {
        Bootstrap::ProtonRun
    } else {
        Bootstrap::Wineboot
    }
}

/// Invocation that populates the prefix.
pub fn bootstrap_invocation(ctx: &LaunchContext<'_>) -> (Bootstrap, Invocation) {
    let bootstrap = choose_bootstrap(ctx);
    let invocation = match bootstrap {
        Bootstrap::ProtonRun => Invocation {
            program: ctx.proton_entrypoint(),
            args: ["run", "cmd", "/c", "echo", "Initializing..."]
                .into_iter()
                .map(Into::into)
                .collect(),
            env: env::shared_env(ctx, &[]),
        },
        Bootstrap::Wineboot => {
            let program = if ctx.app().uses_proton_entrypoint() {
                ctx.proton_root().join("files/bin/wine")
            } else {
                ctx.binary()
            };
            Invocation {
                program,
                args: vec!["wineboot".into(), "-u".into()],
                env: env::bootstrap_env(ctx),
            }
        }
    };
    (bootstrap, invocation)
}

/// Create the prefix if it is not ready yet.
pub fn initialize(ctx: &LaunchContext<'_>) -> Result<InitOutcome, PrefixError> {
    let prefix = ctx.prefix();
    std::fs::create_dir_all(prefix)?;
    if state(prefix) == PrefixState::Ready {
        debug!("Prefix {} already initialized", prefix.display());
        return Ok(InitOutcome::AlreadyReady);
    }

    let (bootstrap, invocation) = bootstrap_invocation(ctx);
    info!("Initializing Wine prefix ({bootstrap:?}): {invocation}");

    let output = invocation
        .command()
        .stdin(Stdio::null())
        .output()
        .map_err(|source| PrefixError::Spawn {
            program: invocation.program.clone(),
            source,
        })?;
    if !output.status.success() {
        return Err(PrefixError::Bootstrap {
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    info!("Prefix initialized");

    if bootstrap == Bootstrap::ProtonRun {
        normalize_layout(prefix).map_err(PrefixError::Layout)?;
    }
    Ok(InitOutcome::Initialized(bootstrap))
}

/// Flatten Proton's nested `pfx/` into the prefix root and leave a
/// `pfx -> .` symlink behind.
///
/// No-op when `pfx` is absent or already a symlink.
pub fn normalize_layout(prefix: &Path) -> io::Result<()> {
    let pfx = prefix.join(PROTON_PFX);
    let meta = match std::fs::symlink_metadata(&pfx) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    if !meta.is_dir() {
        return Ok(());
    }

    info!("Restructuring prefix {}", prefix.display());
    for entry in std::fs::read_dir(&pfx)? {
        let entry = entry?;
        std::fs::rename(entry.path(), prefix.join(entry.file_name()))?;
    }
    std::fs::remove_dir(&pfx)?;
    std::os::unix::fs::symlink(".", &pfx)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Fixture, write_script};
    use yapl_schema::WineArch;

    /// Fake `proton` that builds a nested prefix and counts invocations.
    fn fake_proton(fixture: &Fixture) -> PathBuf {
        let calls = fixture.dir.path().join("calls");
        write_script(
            &fixture.proton_root.join("proton"),
            &format!(
                "echo \"$@\" >> '{}'\n\
                 mkdir -p \"$STEAM_COMPAT_DATA_PATH/pfx/drive_c\"\n\
                 echo reg > \"$STEAM_COMPAT_DATA_PATH/pfx/system.reg\"\n",
                calls.display()
            ),
        );
        calls
    }

    #[test]
    fn test_state() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(state(dir.path()), PrefixState::Absent);
        std::fs::write(dir.path().join(SENTINEL), "").unwrap();
        assert_eq!(state(dir.path()), PrefixState::Ready);
    }

    #[test]
    fn test_choose_bootstrap() {
        let mut fixture = Fixture::new();
        assert_eq!(choose_bootstrap(&fixture.ctx()), Bootstrap::ProtonRun);

        fixture.app.wine_arch = WineArch::Win32;
        assert_eq!(choose_bootstrap(&fixture.ctx()), Bootstrap::Wineboot);
        let (_, inv) = bootstrap_invocation(&fixture.ctx());
        assert_eq!(inv.program, fixture.proton_root.join("files/bin/wine"));
        assert_eq!(inv.env.get("WINEARCH"), Some("win32"));

        fixture.app.wine_arch = WineArch::Win64;
        fixture.app.proton_bin_name = Some("files/bin/wine64".into());
        let (bootstrap, inv) = bootstrap_invocation(&fixture.ctx());
        assert_eq!(bootstrap, Bootstrap::Wineboot);
        assert_eq!(inv.program, fixture.proton_root.join("files/bin/wine64"));
    }

    #[test]
    fn test_proton_bootstrap_is_idempotent_and_normalized() {
        let fixture = Fixture::new();
        let calls = fake_proton(&fixture);
        let ctx = fixture.ctx();

        let first = initialize(&ctx).unwrap();
        assert_eq!(first, InitOutcome::Initialized(Bootstrap::ProtonRun));
        let second = initialize(&ctx).unwrap();
        assert_eq!(second, InitOutcome::AlreadyReady);

        let log = std::fs::read_to_string(calls).unwrap();
        assert_eq!(log.lines().collect::<Vec<_>>(), ["run cmd /c echo Initializing..."]);

        let prefix = &fixture.prefix;
        assert!(prefix.join(SENTINEL).exists());
        assert!(prefix.join("drive_c").is_dir());
        assert_eq!(
            std::fs::read_link(prefix.join(PROTON_PFX)).unwrap(),
            PathBuf::from(".")
        );
    }

    #[test]
    fn test_wineboot_for_win32() {
        let mut fixture = Fixture::new();
        fixture.app.wine_arch = WineArch::Win32;
        let seen = fixture.dir.path().join("seen");
        write_script(
            &fixture.proton_root.join("files/bin/wine"),
            &format!(
                "echo \"$1 $2 $WINEARCH\" > '{}'\necho reg > \"$WINEPREFIX/system.reg\"\n",
                seen.display()
            ),
        );

        let outcome = initialize(&fixture.ctx()).unwrap();
        assert_eq!(outcome, InitOutcome::Initialized(Bootstrap::Wineboot));
        assert_eq!(
            std::fs::read_to_string(seen).unwrap().trim(),
            "wineboot -u win32"
        );
        assert!(!fixture.prefix.join(PROTON_PFX).exists());
    }

    #[test]
    fn test_failed_bootstrap_reports_stderr() {
        let fixture = Fixture::new();
        write_script(
            &fixture.proton_root.join("proton"),
            "echo 'wine: could not load kernel32.dll' >&2\nexit 3\n",
        );

        let err = initialize(&fixture.ctx()).unwrap_err();
        match err {
            PrefixError::Bootstrap { status, stderr } => {
                assert_eq!(status.code(), Some(3));
                assert!(stderr.contains("kernel32.dll"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(state(&fixture.prefix), PrefixState::Absent);
    }

    #[test]
    fn test_normalize_layout_noops() {
        let dir = tempfile::tempdir().unwrap();
        normalize_layout(dir.path()).unwrap();
        assert!(!dir.path().join(PROTON_PFX).exists());

        std::os::unix::fs::symlink(".", dir.path().join(PROTON_PFX)).unwrap();
        normalize_layout(dir.path()).unwrap();
        assert_eq!(
            std::fs::read_link(dir.path().join(PROTON_PFX)).unwrap(),
            PathBuf::from(".")
        );
    }
}
