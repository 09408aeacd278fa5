mod console;

use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
    sync::Mutex,
};

use anyhow::{bail, Context, Result};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::{prelude::*, EnvFilter};
use tiggit_core::{
    cleanup::CleanupMarker,
    config::{self, AppConfig, PathStore},
    gamedata::RESTART_NOTIFICATION,
    import::RepoImporter,
    jobs::JobTracker,
    launcher::ProcessLauncher,
    repo::CHANNELS_DIR,
    spread::{FsSync, SyncEngine},
    updater::Updater,
    watch::ChannelWatcher,
    ChannelSync, GameData, ListKind, LocalRepo, RelocationOutcome, SyncEvent, UpdateOutcome,
};

use console::ConsoleFrontend;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    /// Load the repository and wait for channel updates.
    Run,
    List { kind: ListKind, search: String },
    News { mark_read: bool },
    Move { target: PathBuf },
}

impl Command {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self> {
        let Some(name) = args.next() else {
            return Ok(Command::Run);
        };
        match name.as_str() {
            "run" => Ok(Command::Run),
            "list" => {
                let kind = match args.next() {
                    Some(label) => ListKind::from_label(&label)
                        .with_context(|| format!("unknown list {label:?}"))?,
                    None => ListKind::Latest,
                };
                let search = args.collect::<Vec<_>>().join(" ");
                Ok(Command::List { kind, search })
            }
            "news" => {
                let mark_read = matches!(args.next().as_deref(), Some("--mark-read"));
                Ok(Command::News { mark_read })
            }
            "move" => {
                let target = args.next().context("move needs a target directory")?;
                Ok(Command::Move {
                    target: PathBuf::from(target),
                })
            }
            other => bail!("unknown command {other:?} (expected run, list, news or move)"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    let command = Command::parse(std::env::args().skip(1))?;

    config::ensure_default_config()?;
    let config = AppConfig::load()?;
    let repo_path = config.resolved_repo_path();
    info!(repo = %repo_path.display(), ?command, "starting tiggit");

    offer_cleanup(&repo_path).await;

    let repo = LocalRepo::with_channel(&repo_path, &config.data_channel, PathStore::default_location());
    let updater = Updater::new(
        env!("CARGO_PKG_VERSION"),
        &repo_path,
        repo.version_file(),
        Box::new(ProcessLauncher),
    );
    info!(version = updater.current_version(), "launcher version");
    let importer = RepoImporter::with_progress(Box::new(|label: &str, files: u64| {
        println!("{label}: {files} files");
        true
    }));

    let mut data = GameData::new(
        Box::new(repo),
        Box::new(updater),
        Box::new(importer),
        Box::new(ProcessLauncher),
        JobTracker::new(),
    );
    let ui = ConsoleFrontend::new();
    data.set_frontend(Box::new(ui.clone()));

    if let Err(err) = data.load_data() {
        error!("{err}");
        eprintln!("error: {err}");
    }

    match command {
        Command::Run => run_loop(&mut data, &ui, &config, &repo_path).await,
        Command::List { kind, search } => {
            data.set_search(kind, &search);
            console::print_rows(&data.rows(kind));
            if kind == ListKind::Latest {
                data.mark_catalogue_seen(chrono::Utc::now().timestamp())?;
            }
            Ok(())
        }
        Command::News { mark_read } => {
            console::print_news(data.news().items());
            if mark_read {
                data.news_mut().mark_all_as_read()?;
            }
            Ok(())
        }
        Command::Move { target } => {
            let outcome = data.move_repo(&target);
            info!(?outcome, target = %target.display(), "relocation finished");
            if outcome == RelocationOutcome::NotWritable {
                eprintln!("error: {} is not writable", target.display());
            }
            Ok(())
        }
    }
}

async fn run_loop(
    data: &mut GameData,
    ui: &ConsoleFrontend,
    config: &AppConfig,
    repo_path: &Path,
) -> Result<()> {
    let (sync_tx, mut sync_rx) = mpsc::channel(8);

    let _watcher = if config.watch_channels {
        match ChannelWatcher::spawn(&repo_path.join(CHANNELS_DIR), sync_tx.clone()) {
            Ok(watcher) => Some(watcher),
            Err(err) => {
                warn!("channel watching disabled: {err:#}");
                None
            }
        }
    } else {
        None
    };

    match ChannelSync::new(config, repo_path) {
        Some(sync) => {
            let sync_tx = sync_tx.clone();
            tokio::spawn(async move {
                if let Err(err) = sync.run(sync_tx).await {
                    error!("Channel sync task error: {err:#}");
                }
            });
        }
        None => {
            // Pick up whatever is already on disk.
            sync_tx.send(SyncEvent::Ready { changed: 0 }).await?;
        }
    }
    drop(sync_tx);

    while let Some(event) = sync_rx.recv().await {
        match event {
            SyncEvent::Ready { changed } => {
                info!(changed, "channel data ready");
                if let Err(err) = data.updater_mut().poll() {
                    warn!("version check failed: {err:#}");
                }
                if data.update_ready() == UpdateOutcome::RestartPending {
                    prompt_restart(data, ui).await?;
                }
            }
            SyncEvent::Error(err) => error!("channel sync failed: {err:#}"),
        }
        if ui.is_closed() {
            break;
        }
    }
    Ok(())
}

async fn prompt_restart(data: &mut GameData, ui: &ConsoleFrontend) -> Result<()> {
    let Some(pending) = ui.take_pending() else {
        return Ok(());
    };
    let question = format!("{}?", pending.button);
    let accepted = tokio::task::spawn_blocking(move || console::confirm(&question))
        .await
        .context("prompt task failed")??;
    if accepted && pending.id == RESTART_NOTIFICATION {
        data.notify_button(pending.id)?;
    }
    Ok(())
}

/// Offer to delete the repository left behind by a previous relocation.
async fn offer_cleanup(repo_path: &Path) {
    let marker = match CleanupMarker::load(repo_path) {
        Ok(Some(marker)) => marker,
        Ok(None) => return,
        Err(err) => {
            warn!("ignoring cleanup marker: {err:#}");
            return;
        }
    };
    info!(old = %marker.old_repo.display(), "previous repository found");

    if marker.ask_delete && marker.old_repo.exists() {
        let question = format!(
            "Tiggit moved from {}. Delete the old directory?",
            marker.old_repo.display()
        );
        let accepted = tokio::task::spawn_blocking(move || console::confirm(&question)).await;
        match accepted {
            Ok(Ok(true)) => {
                if let Err(err) = FsSync.remove_tree(&marker.old_repo) {
                    error!("failed to delete old repository: {err:#}");
                    eprintln!("error: {err:#}");
                }
            }
            Ok(Ok(false)) => {}
            Ok(Err(err)) => warn!("cleanup prompt failed: {err}"),
            Err(err) => warn!("cleanup prompt task failed: {err}"),
        }
    }

    if let Err(err) = CleanupMarker::discard(repo_path) {
        warn!("{err:#}");
    }
}

fn init_logging() -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(config::APP_DIR)
        .join("logs");
    fs::create_dir_all(&log_dir)?;
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("tiggit.log"))?;

    let env_filter = EnvFilter::from_default_env();

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .compact()
        .with_writer(std::io::stdout);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .compact()
        .with_ansi(false)
        .with_writer(Mutex::new(log_file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    Ok(())
}
