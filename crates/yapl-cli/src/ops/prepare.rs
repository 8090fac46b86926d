//! Configuration loading, dependency resolution and prefix bootstrap shared
//! by `setup` and `run`.

use std::path::PathBuf;

use tracing::info;
use yapl_core::launch::LaunchContext;
use yapl_core::prefix::{self, Bootstrap, InitOutcome};
use yapl_core::resolver::{ResolvedComponents, Resolver};
use yapl_schema::{AppSpec, GlobalRegistry};

use crate::Target;
use crate::config::{self, Origin};
use crate::ops::{Context, OpsError};

/// A validated application with every component it needs on disk.
#[derive(Debug)]
pub struct Prepared {
    pub target: Target,
    pub registry: GlobalRegistry,
    pub app: AppSpec,
    pub components: ResolvedComponents,
    pub prefix: PathBuf,
}

impl Prepared {
    pub fn launch_context(&self, ctx: &Context) -> Result<LaunchContext<'_>, OpsError> {
        Ok(LaunchContext::new(
            &self.app,
            &self.registry,
            self.components.clone(),
            self.prefix.clone(),
        )?
        .debug(ctx.debug)
        .steam_client(ctx.steam))
    }
}

/// Load `runner.json` and the target's launch spec, then validate it.
///
/// Returns `None` when `runner.json` was just created: its entries are
/// placeholders until the user edits them.
pub fn load(
    ctx: &Context,
    target: &Target,
) -> Result<Option<(GlobalRegistry, AppSpec)>, OpsError> {
    let (registry, origin) = config::load_or_create_registry(&ctx.layout, &ctx.output)?;
    if origin == Origin::Created {
        return Ok(None);
    }
    let (app, _) = config::load_or_create_app(&ctx.layout, target, &registry, &ctx.output)?;
    app.validate(&registry)?;
    Ok(Some((registry, app)))
}

/// Load, validate and acquire every component `target` needs.
pub async fn prepare(ctx: &Context, target: &Target) -> Result<Option<Prepared>, OpsError> {
    let Some((registry, app)) = load(ctx, target)? else {
        return Ok(None);
    };

    let components = Resolver::new(ctx.client.clone(), &ctx.layout, &registry)
        .force_upgrade(ctx.force_upgrade)
        .with_reporter(ctx.reporter.clone())
        .ensure_all(&app)
        .await?;

    Ok(Some(Prepared {
        target: target.clone(),
        prefix: ctx.layout.prefix_dir(target.kind, &target.name),
        registry,
        app,
        components,
    }))
}

/// Bootstrap the prefix if it is not ready yet.
pub fn initialize_prefix(ctx: &Context, launch: &LaunchContext<'_>) -> Result<(), OpsError> {
    ctx.output.section("Prefix");
    let detail = match prefix::initialize(launch)? {
        InitOutcome::AlreadyReady => "ready",
        InitOutcome::Initialized(Bootstrap::ProtonRun) => "created with proton",
        InitOutcome::Initialized(Bootstrap::Wineboot) => "created with wineboot",
    };
    info!("Prefix {}: {detail}", launch.prefix().display());
    ctx.output
        .success(&format!("{} ({detail})", launch.prefix().display()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::Output;
    use yapl_core::Layout;
    use yapl_schema::{AppKind, LaunchMethod, VersionInfo};

    fn context(root: &std::path::Path) -> Context {
        Context::new(Layout::new(root), reqwest::Client::new(), Output::new())
    }

    fn write_registry(root: &std::path::Path, proton: &std::path::Path) {
        let mut registry = GlobalRegistry::default();
        registry.proton_versions.insert(
            "local".into(),
            VersionInfo {
                path: Some(proton.to_path_buf()),
                ..VersionInfo::default()
            },
        );
        std::fs::write(
            root.join("runner.json"),
            serde_json::to_string(&registry).unwrap(),
        )
        .unwrap();
    }

    #[test]
    fn test_fresh_registry_stops_before_app() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let target = Target::new(AppKind::Game, "witcher");

        assert!(load(&ctx, &target).unwrap().is_none());
        assert!(dir.path().join("runner.json").exists());
        assert!(!dir.path().join("games/witcher").exists());
    }

    #[test]
    fn test_invalid_spec_rejected_before_acquisition() {
        let dir = tempfile::tempdir().unwrap();
        write_registry(dir.path(), dir.path());
        let app_dir = dir.path().join("games/witcher");
        std::fs::create_dir_all(&app_dir).unwrap();
        let mut app = AppSpec::template("local");
        app.launch_method = LaunchMethod::Container;
        std::fs::write(app_dir.join("game.json"), serde_json::to_string(&app).unwrap())
            .unwrap();

        let ctx = context(dir.path());
        let err = load(&ctx, &Target::new(AppKind::Game, "witcher")).unwrap_err();
        assert!(matches!(
            err,
            OpsError::Config(yapl_schema::ConfigError::MissingRuntime)
        ));
    }

    #[tokio::test]
    async fn test_unregistered_dxvk_fails_before_download() {
        let dir = tempfile::tempdir().unwrap();
        write_registry(dir.path(), dir.path());
        let app_dir = dir.path().join("games/witcher");
        std::fs::create_dir_all(&app_dir).unwrap();
        let mut app = AppSpec::template("local");
        app.dependencies.dxvk_version = Some("2.4".to_string());
        std::fs::write(app_dir.join("game.json"), serde_json::to_string(&app).unwrap())
            .unwrap();

        let ctx = context(dir.path());
        let err = prepare(&ctx, &Target::new(AppKind::Game, "witcher"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OpsError::Config(yapl_schema::ConfigError::Registry(_))
        ));
        assert!(!dir.path().join("dependencies").exists());
    }

    #[tokio::test]
    async fn test_prepare_with_local_proton() {
        let dir = tempfile::tempdir().unwrap();
        let proton = dir.path().join("my-proton");
        std::fs::create_dir_all(&proton).unwrap();
        write_registry(dir.path(), &proton);

        let ctx = context(dir.path());
        let target = Target::new(AppKind::App, "notepad");
        let prepared = prepare(&ctx, &target).await.unwrap().unwrap();

        assert_eq!(prepared.app.proton_version, "local");
        assert_eq!(prepared.components.proton, proton);
        assert_eq!(prepared.prefix, dir.path().join("apps/notepad/prefix"));
        let launch = prepared.launch_context(&ctx).unwrap();
        assert_eq!(launch.proton_root(), proton);
    }
}
