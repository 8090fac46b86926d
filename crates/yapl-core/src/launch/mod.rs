//! Launch orchestration: turn an [`AppSpec`] plus resolved components into a
//! process invocation and run it.
//!
//! Three strategies exist, selected by [`LaunchMethod`]:
//!
//! - **direct**: `proton run <exe>` on the host, or an alternate Wine-like
//!   binary invoked as `<bin> <exe>`
//! - **container**: Proton inside the Steam Linux Runtime entry point
//! - **umu**: hand-off to `umu-run`

pub mod env;

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use thiserror::Error;
use tracing::{info, warn};
use yapl_schema::{AppSpec, ComponentKind, ConfigError, GlobalRegistry, LaunchMethod, VersionInfo};

use crate::resolver::{ENTRY_POINT, ResolvedComponents, SHIM_FILE, UPSTREAM_ENTRY_POINT};
pub use env::LaunchEnv;

/// Identity file read by Steamworks titles.
pub const APP_ID_FILE: &str = "steam_appid.txt";

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("--steam requires 'proton' as the proton_bin_name")]
    SteamRequiresProton,

    #[error("could not find Proton's internal steam.exe, expected at: {}", .0.display())]
    SteamClientMissing(PathBuf),

    #[error("umu-run not found in PATH: {0}")]
    UmuNotFound(String),

    #[error("failed to execute {}: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A best-effort step that failed without aborting the launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchWarning {
    IdentityFile { path: PathBuf, reason: String },
    DllCopy { dll: String, reason: String },
}

impl fmt::Display for LaunchWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IdentityFile { path, reason } => {
                write!(f, "failed to write {}: {reason}", path.display())
            }
            Self::DllCopy { dll, reason } => write!(f, "failed to copy {dll}: {reason}"),
        }
    }
}

#[derive(Debug)]
pub struct LaunchOutcome {
    pub status: ExitStatus,
    pub warnings: Vec<LaunchWarning>,
}

/// Everything needed to build an invocation for one application.
///
/// All paths are expected to be absolute.
#[derive(Debug, Clone)]
pub struct LaunchContext<'a> {
    app: &'a AppSpec,
    proton_info: &'a VersionInfo,
    umu_info: Option<&'a VersionInfo>,
    components: ResolvedComponents,
    prefix: PathBuf,
    debug: bool,
    steam_client: bool,
}

impl<'a> LaunchContext<'a> {
    pub fn new(
        app: &'a AppSpec,
        registry: &'a GlobalRegistry,
        components: ResolvedComponents,
        prefix: PathBuf,
    ) -> Result<Self, LaunchError> {
        let proton_info = registry
            .proton(&app.proton_version)
            .map_err(ConfigError::from)?;
        let umu_info = match app.umu_options.version.as_deref() {
            Some(version) if app.needs_managed_umu() => Some(
                registry
                    .dependency(ComponentKind::UmuLauncher.as_str(), version)
                    .map_err(ConfigError::from)?,
            ),
            _ => None,
        };
        Ok(Self::from_parts(app, proton_info, umu_info, components, prefix))
    }

    pub(crate) fn from_parts(
        app: &'a AppSpec,
        proton_info: &'a VersionInfo,
        umu_info: Option<&'a VersionInfo>,
        components: ResolvedComponents,
        prefix: PathBuf,
    ) -> Self {
        Self {
            app,
            proton_info,
            umu_info,
            components,
            prefix,
            debug: false,
            steam_client: false,
        }
    }

    /// Enable Proton/DXVK/VKD3D logging.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Launch Proton's bundled Steam client instead of the configured target.
    pub fn steam_client(mut self, steam_client: bool) -> Self {
        self.steam_client = steam_client;
        self
    }

    pub fn app(&self) -> &AppSpec {
        self.app
    }

    pub fn proton_info(&self) -> &VersionInfo {
        self.proton_info
    }

    pub fn proton_root(&self) -> &Path {
        &self.components.proton
    }

    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// `<proton_root>/proton`
    pub fn proton_entrypoint(&self) -> PathBuf {
        self.proton_root().join(yapl_schema::PROTON_ENTRYPOINT)
    }

    /// `<proton_root>/<proton_bin_name>`
    pub fn binary(&self) -> PathBuf {
        self.proton_root().join(self.app.bin_name())
    }

    /// Target executable inside the prefix.
    pub fn executable(&self) -> PathBuf {
        self.prefix.join(&self.app.executable)
    }

    pub fn executable_dir(&self) -> PathBuf {
        let exe = self.executable();
        exe.parent().map_or_else(|| self.prefix.clone(), Path::to_path_buf)
    }
}

/// A fully planned process start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub env: LaunchEnv,
}

impl Invocation {
    fn new(program: impl Into<PathBuf>, env: LaunchEnv) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env,
        }
    }

    fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        self.env.apply(&mut cmd);
        cmd
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Build the invocation for the configured strategy.
///
/// Steam-client mode overrides the strategy and always runs directly.
pub fn plan(ctx: &LaunchContext<'_>) -> Result<Invocation, LaunchError> {
    if ctx.steam_client {
        return plan_steam_client(ctx);
    }
    match ctx.app.launch_method {
        LaunchMethod::Direct => Ok(plan_direct(ctx)),
        LaunchMethod::Container => plan_container(ctx),
        LaunchMethod::Umu => plan_umu(ctx),
    }
}

fn plan_direct(ctx: &LaunchContext<'_>) -> Invocation {
    let app = ctx.app;
    if app.uses_proton_entrypoint() {
        Invocation::new(ctx.proton_entrypoint(), env::shared_env(ctx, &[]))
            .arg("run")
            .arg(ctx.executable())
            .args(&app.launch_args)
    } else {
        Invocation::new(ctx.binary(), env::minimal_env(ctx))
            .arg(ctx.executable())
            .args(&app.launch_args)
    }
}

fn plan_steam_client(ctx: &LaunchContext<'_>) -> Result<Invocation, LaunchError> {
    if !ctx.app.uses_proton_entrypoint() {
        return Err(LaunchError::SteamRequiresProton);
    }
    let steam = ctx.proton_root().join("files/share/steam/steam.exe");
    if !steam.exists() {
        return Err(LaunchError::SteamClientMissing(steam));
    }
    Ok(Invocation::new(ctx.proton_entrypoint(), env::shared_env(ctx, &[]))
        .arg("run")
        .arg(steam))
}

fn plan_container(ctx: &LaunchContext<'_>) -> Result<Invocation, LaunchError> {
    let runtime = ctx
        .components
        .runtime
        .as_deref()
        .ok_or(ConfigError::MissingRuntime)?;

    let mut entry_point = runtime.join(ENTRY_POINT);
    if !entry_point.exists() {
        entry_point = runtime.join(UPSTREAM_ENTRY_POINT);
    }

    Ok(Invocation::new(entry_point, env::shared_env(ctx, &[]))
        .arg("--verb=waitforexitandrun")
        .arg("--")
        .arg(runtime.join(SHIM_FILE))
        .arg(ctx.proton_entrypoint())
        .arg("waitforexitandrun")
        .arg(ctx.executable())
        .args(&ctx.app.launch_args))
}

fn plan_umu(ctx: &LaunchContext<'_>) -> Result<Invocation, LaunchError> {
    let options = &ctx.app.umu_options;
    let program = if options.use_system_binary {
        which::which("umu-run").map_err(|e| LaunchError::UmuNotFound(e.to_string()))?
    } else {
        let dir = ctx
            .components
            .umu_launcher
            .as_deref()
            .ok_or(ConfigError::MissingUmuVersion)?;
        let bin_path = ctx
            .umu_info
            .and_then(|info| info.bin_path.as_deref())
            .unwrap_or_default();
        dir.join(bin_path).join("umu-run")
    };

    let mut extra = vec![(
        "PROTONPATH",
        ctx.proton_root().to_string_lossy().into_owned(),
    )];
    if let Some(game_id) = &options.game_id {
        extra.push(("GAMEID", game_id.clone()));
    }
    if let Some(store) = &options.store {
        extra.push(("STORE", store.clone()));
    }

    Ok(Invocation::new(program, env::shared_env(ctx, &extra))
        .arg(ctx.executable())
        .args(&options.launch_args)
        .args(&ctx.app.launch_args))
}

/// Write the identity tag to `steam_appid.txt` next to the target.
///
/// Returns a warning instead of failing.
pub fn write_identity_file(ctx: &LaunchContext<'_>) -> Option<LaunchWarning> {
    let app_id = ctx.app.app_id()?;
    let path = ctx.executable_dir().join(APP_ID_FILE);
    match std::fs::write(&path, app_id) {
        Ok(()) => None,
        Err(e) => {
            warn!("Failed to write {}: {e}", path.display());
            Some(LaunchWarning::IdentityFile {
                path,
                reason: e.to_string(),
            })
        }
    }
}

/// Run an invocation with inherited stdio and wait for it.
///
/// A non-zero exit is logged and reported in the status, never an error.
pub fn execute(invocation: &Invocation) -> Result<ExitStatus, LaunchError> {
    info!("Executing: {invocation}");
    let status = invocation
        .command()
        .status()
        .map_err(|source| LaunchError::Spawn {
            program: invocation.program.clone(),
            source,
        })?;
    if !status.success() {
        warn!("Application exited with {status}");
    }
    Ok(status)
}

/// Plan, write the identity file, then run.
pub fn launch(ctx: &LaunchContext<'_>) -> Result<LaunchOutcome, LaunchError> {
    let invocation = plan(ctx)?;
    let mut warnings = Vec::new();
    if !ctx.steam_client {
        warnings.extend(write_identity_file(ctx));
    }
    let status = execute(&invocation)?;
    Ok(LaunchOutcome { status, warnings })
}
