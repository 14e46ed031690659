slint::include_modules!();

mod callbacks;
mod cli;
mod utils;

use anyhow::{Context, Result};
use callbacks::{AppContext, setup_callbacks};
use env_logger::Env;
use std::cell::RefCell;
use std::rc::Rc;
use thermal_inspector::cache::FileCache;
use thermal_inspector::config::{AppConfig, load_config};
use thermal_inspector::gateway::ApiClient;
use thermal_inspector::geometry::Size;
use thermal_inspector::repository::AnnotationRepository;
use thermal_inspector::state::InspectionSession;

/// Pane size used until slint has laid the window out.
const INITIAL_PANE: Size = Size::new(400.0, 300.0);

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let args: cli::Cli = argh::from_env();
    let mut config = load_config();
    config.apply_overrides(args.api_url.clone());
    if let Some(user) = args.user.clone() {
        config.user.name = user;
    }
    log::debug!("backend at {}", config.backend.base_url);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;
    let repo = AnnotationRepository::new(
        ApiClient::new(&config.backend.base_url),
        detection_cache(&config)?,
        config.user.name.clone(),
    );

    match args.command {
        cli::Command::View(view) => run_viewer(runtime, repo, config, view),
        command => runtime.block_on(cli::run(command, &repo)),
    }
}

fn detection_cache(config: &AppConfig) -> Result<FileCache> {
    match &config.cache.dir {
        Some(dir) => Ok(FileCache::new(dir)),
        None => FileCache::in_default_location().context("no cache directory available on this platform"),
    }
}

fn run_viewer(
    runtime: tokio::runtime::Runtime,
    repo: callbacks::Repo,
    config: AppConfig,
    view: cli::ViewArgs,
) -> Result<()> {
    let ui = AppWindow::new()?;

    let session = Rc::new(RefCell::new(InspectionSession::new(
        view.transformer,
        view.inspection,
        INITIAL_PANE,
    )));
    let ctx = Rc::new(AppContext::new(runtime.handle().clone(), repo, config));
    setup_callbacks(&ui, ctx.clone(), session);

    ui.run()?;

    // Dropping the window releases its callbacks; the last context
    // reference then aborts outstanding tasks.
    drop(ui);
    drop(ctx);
    runtime.shutdown_background();
    Ok(())
}
