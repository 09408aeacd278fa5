use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Result;
use parking_lot::Mutex;
use tempfile::{tempdir, TempDir};

use super::*;
use crate::{
    cleanup::{marker_path, CleanupMarker},
    config::PathStore,
    filter::ListKind,
    import::RepoImporter,
    jobs::{JobKind, JobTracker},
    launcher::{Launcher, EXE_NAME},
    repo::{LocalRepo, CACHE_CONF, INSTALLED_FILE, NEWS_STATE_FILE, RUN_DIR},
};

#[derive(Debug, Clone, PartialEq)]
enum UiEvent {
    RefreshNews,
    Notification {
        message: String,
        button: String,
        id: i32,
    },
    StatusChanged,
    ListsReloaded,
    Error(String),
    Say(String),
    Close,
}

#[derive(Clone, Default)]
struct RecordingFrontend {
    events: Arc<Mutex<Vec<UiEvent>>>,
}

impl Frontend for RecordingFrontend {
    fn refresh_news(&mut self) {
        self.events.lock().push(UiEvent::RefreshNews);
    }

    fn display_notification(&mut self, message: &str, button: &str, id: i32) {
        self.events.lock().push(UiEvent::Notification {
            message: message.to_string(),
            button: button.to_string(),
            id,
        });
    }

    fn display_status_changed(&mut self) {
        self.events.lock().push(UiEvent::StatusChanged);
    }

    fn lists_reloaded(&mut self) {
        self.events.lock().push(UiEvent::ListsReloaded);
    }

    fn error(&mut self, message: &str) {
        self.events.lock().push(UiEvent::Error(message.to_string()));
    }

    fn say(&mut self, message: &str) {
        self.events.lock().push(UiEvent::Say(message.to_string()));
    }

    fn close(&mut self) {
        self.events.lock().push(UiEvent::Close);
    }
}

#[derive(Clone, Default)]
struct RecordingLauncher {
    runs: Arc<Mutex<Vec<(PathBuf, PathBuf)>>>,
    fail: bool,
}

impl Launcher for RecordingLauncher {
    fn run(&self, exe: &Path, workdir: &Path) -> Result<()> {
        if self.fail {
            anyhow::bail!("cannot start {}", exe.display());
        }
        self.runs
            .lock()
            .push((exe.to_path_buf(), workdir.to_path_buf()));
        Ok(())
    }
}

#[derive(Default)]
struct StubUpdater {
    has_new_update: bool,
    version: String,
    launch_ok: bool,
    launches: Arc<Mutex<u32>>,
}

impl UpdateChecker for StubUpdater {
    fn has_new_update(&self) -> bool {
        self.has_new_update
    }

    fn new_version(&self) -> &str {
        &self.version
    }

    fn new_exe_path(&self) -> Option<&Path> {
        None
    }

    fn launch_new(&mut self) -> bool {
        *self.launches.lock() += 1;
        self.launch_ok
    }

    fn poll(&mut self) -> Result<()> {
        Ok(())
    }
}

const GAMES: &str = r#"[
    {"id": "abuse", "title": "Abuse", "added": 1300000000},
    {"id": "doom-demo", "title": "Doom", "is_demo": true},
    {"id": "nethack", "title": "NetHack", "tags": ["roguelike"]},
    {"id": "quake-demo", "title": "Quake", "is_demo": true}
]"#;

struct Fixture {
    dir: TempDir,
    old: PathBuf,
    config: PathBuf,
    events: Arc<Mutex<Vec<UiEvent>>>,
    launcher: RecordingLauncher,
    jobs: JobTracker,
}

impl Fixture {
    fn new() -> Result<Self> {
        let dir = tempdir()?;
        let old = dir.path().join("old");
        let channel = old.join("spread/channels/tigdata");
        fs::create_dir_all(&channel)?;
        fs::write(channel.join("games.json"), GAMES)?;
        fs::write(
            channel.join("stats.json"),
            r#"{"abuse": {"downloads": 10, "rating": 4.0}}"#,
        )?;
        fs::write(
            channel.join("news.json"),
            r#"[{"date": 1325376000, "subject": "New games", "body": "Enjoy"}]"#,
        )?;
        fs::write(old.join(CACHE_CONF), "cache")?;
        fs::create_dir_all(old.join("run/1"))?;
        fs::write(old.join("run/1").join(EXE_NAME), "exe")?;
        fs::create_dir_all(old.join("gamedata/abuse"))?;
        fs::write(old.join("gamedata/abuse/abuse.bin"), "game")?;
        fs::create_dir_all(old.join("shots"))?;
        fs::write(old.join("shots/abuse.png"), "png")?;
        fs::write(
            old.join(INSTALLED_FILE),
            r#"{"abuse": "installed", "quake-demo": "downloading"}"#,
        )?;

        Ok(Self {
            config: dir.path().join("config.json"),
            old,
            dir,
            events: Arc::default(),
            launcher: RecordingLauncher::default(),
            jobs: JobTracker::new(),
        })
    }

    fn games_file(&self) -> PathBuf {
        self.old.join("spread/channels/tigdata/games.json")
    }

    fn game_data(&self, updater: StubUpdater) -> GameData {
        self.game_data_with(updater, RepoImporter::new())
    }

    fn game_data_with(&self, updater: StubUpdater, importer: RepoImporter) -> GameData {
        let repo = LocalRepo::new(&self.old, PathStore::new(&self.config));
        let mut data = GameData::new(
            Box::new(repo),
            Box::new(updater),
            Box::new(importer),
            Box::new(self.launcher.clone()),
            self.jobs.clone(),
        );
        data.set_frontend(Box::new(RecordingFrontend {
            events: self.events.clone(),
        }));
        data
    }

    fn loaded(&self, updater: StubUpdater) -> Result<GameData> {
        let mut data = self.game_data(updater);
        data.load_data()?;
        self.events.lock().clear();
        Ok(data)
    }

    fn events(&self) -> Vec<UiEvent> {
        self.events.lock().clone()
    }

    fn stored_path(&self) -> Result<Option<PathBuf>> {
        PathStore::new(&self.config).load()
    }
}

fn ids(data: &GameData, kind: ListKind) -> Vec<String> {
    data.list(kind)
        .map(|list| list.ids().to_vec())
        .unwrap_or_default()
}

fn snapshot(root: &Path) -> Result<Vec<PathBuf>> {
    let mut entries: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path().to_path_buf())
        .collect();
    entries.sort();
    Ok(entries)
}

#[test]
fn load_data_builds_lists_and_extensions() -> Result<()> {
    let fixture = Fixture::new()?;
    let data = fixture.loaded(StubUpdater::default())?;

    assert!(data.repo().is_loaded());
    assert_eq!(data.extras().len(), 4);
    assert!(data.extras().iter().all(|(_, inf)| inf.generation == 1));
    assert_eq!(data.extra("abuse").map(|inf| inf.downloads), Some(10));

    assert_eq!(ids(&data, ListKind::Latest).len(), 4);
    assert_eq!(ids(&data, ListKind::Freeware), ["abuse", "nethack"]);
    assert_eq!(ids(&data, ListKind::Demos), ["doom-demo", "quake-demo"]);
    assert_eq!(ids(&data, ListKind::Installed), ["abuse", "quake-demo"]);

    let rows = data.rows(ListKind::Installed);
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|(_, inf)| inf.is_some()));
    Ok(())
}

#[test]
fn reload_never_keeps_stale_extensions() -> Result<()> {
    let fixture = Fixture::new()?;
    let mut data = fixture.loaded(StubUpdater::default())?;

    fs::write(
        fixture.games_file(),
        r#"[{"id": "abuse", "title": "Abuse 2"}, {"id": "nethack", "title": "NetHack"}]"#,
    )?;
    data.load_data()?;

    let generation = data.repo().generation();
    assert_eq!(generation, 2);
    assert_eq!(data.extras().len(), 2);
    assert!(data.extras().iter().all(|(_, inf)| inf.generation == generation));
    assert!(data.extra("doom-demo").is_none());
    assert_eq!(data.extra("abuse").map(|inf| inf.title.as_str()), Some("Abuse 2"));
    assert_eq!(fixture.events(), [UiEvent::ListsReloaded]);
    Ok(())
}

#[test]
fn jobs_survive_a_reload() -> Result<()> {
    let fixture = Fixture::new()?;
    let mut data = fixture.loaded(StubUpdater::default())?;
    fixture.jobs.start("quake-demo", JobKind::Download, 1);
    assert!(data.is_active());

    data.load_data()?;
    let jobs = fixture.jobs.jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].generation, 2);
    assert!(!jobs[0].orphaned);
    Ok(())
}

#[test]
fn news_is_loaded_on_construction() -> Result<()> {
    let fixture = Fixture::new()?;
    fs::write(
        fixture.old.join(NEWS_STATE_FILE),
        r#"{"read": [{"date": 1325376000, "subject": "New games"}]}"#,
    )?;

    let mut data = fixture.game_data(StubUpdater::default());
    assert_eq!(data.news().items().len(), 1);
    assert!(data.news().items()[0].read);
    assert_eq!(data.news().items()[0].subject, "New games");

    data.news_mut().mark_all_as_read()?;
    drop(data);
    let data = fixture.game_data(StubUpdater::default());
    assert_eq!(data.news().unread_count(), 0);
    Ok(())
}

#[test]
fn search_narrows_one_list_only() -> Result<()> {
    let fixture = Fixture::new()?;
    let mut data = fixture.loaded(StubUpdater::default())?;

    data.set_search(ListKind::Freeware, "HACK");
    assert_eq!(ids(&data, ListKind::Freeware), ["nethack"]);
    assert_eq!(ids(&data, ListKind::Latest).len(), 4);

    data.load_data()?;
    assert_eq!(ids(&data, ListKind::Freeware), ["nethack"]);
    Ok(())
}

#[test]
fn kill_data_and_teardown_release_extensions() -> Result<()> {
    let fixture = Fixture::new()?;
    let mut data = fixture.loaded(StubUpdater::default())?;
    fixture.jobs.start("abuse", JobKind::Install, 1);

    data.kill_data();
    assert!(data.extras().is_empty());
    assert!(data.list(ListKind::Latest).is_some());

    data.load_data()?;
    assert_eq!(data.extras().len(), 4);
    fixture.events.lock().clear();

    drop(data);
    assert!(fixture.events().is_empty());
    assert_eq!(fixture.jobs.jobs().len(), 1);
    Ok(())
}

#[test]
fn broken_catalogue_fails_the_load() -> Result<()> {
    let fixture = Fixture::new()?;
    fs::write(fixture.games_file(), "{ broken")?;
    let mut data = fixture.game_data(StubUpdater::default());
    let err = data.load_data().unwrap_err();
    assert!(matches!(err, GameDataError::Load(_)));
    assert!(data.extras().is_empty());
    Ok(())
}

#[test]
fn update_without_frontend_does_nothing() -> Result<()> {
    let fixture = Fixture::new()?;
    let repo = LocalRepo::new(&fixture.old, PathStore::new(&fixture.config));
    let mut data = GameData::new(
        Box::new(repo),
        Box::new(StubUpdater::default()),
        Box::new(RepoImporter::new()),
        Box::new(fixture.launcher.clone()),
        JobTracker::new(),
    );
    assert_eq!(data.update_ready(), UpdateOutcome::NoListener);
    assert_eq!(data.repo().generation(), 0);
    Ok(())
}

#[test]
fn update_without_new_data_refreshes_stats() -> Result<()> {
    let fixture = Fixture::new()?;
    let mut data = fixture.loaded(StubUpdater::default())?;
    fs::write(
        fixture.old.join("spread/channels/tigdata/stats.json"),
        r#"{"abuse": {"downloads": 25}}"#,
    )?;

    assert_eq!(data.update_ready(), UpdateOutcome::StatsRefreshed);
    assert_eq!(data.state(), UpdateState::Idle);
    assert_eq!(data.repo().generation(), 1);
    assert_eq!(data.extra("abuse").map(|inf| inf.downloads), Some(25));
    assert_eq!(data.news().items().len(), 1);
    assert_eq!(
        fixture.events(),
        [UiEvent::RefreshNews, UiEvent::StatusChanged]
    );
    Ok(())
}

#[test]
fn new_version_wins_over_new_data() -> Result<()> {
    let fixture = Fixture::new()?;
    let mut data = fixture.loaded(StubUpdater {
        has_new_update: true,
        version: "2.0".to_string(),
        ..Default::default()
    })?;
    fs::write(fixture.games_file(), r#"[{"id": "new", "title": "New"}]"#)?;

    assert_eq!(data.update_ready(), UpdateOutcome::RestartPending);
    assert_eq!(data.state(), UpdateState::RestartNotifyPending);
    assert_eq!(data.repo().generation(), 1);
    assert_eq!(
        fixture.events(),
        [
            UiEvent::RefreshNews,
            UiEvent::Notification {
                message: "Tiggit has been updated to version 2.0".to_string(),
                button: "Restart now".to_string(),
                id: RESTART_NOTIFICATION,
            },
        ]
    );
    Ok(())
}

#[test]
fn pure_data_update_reloads_immediately() -> Result<()> {
    let fixture = Fixture::new()?;
    let mut data = fixture.loaded(StubUpdater::default())?;
    fs::write(
        fixture.games_file(),
        r#"[{"id": "abuse", "title": "Abuse"}, {"id": "new", "title": "New"}, {"id": "x", "title": "X"}]"#,
    )?;

    assert_eq!(data.update_ready(), UpdateOutcome::DataReloaded);
    assert_eq!(data.state(), UpdateState::Idle);
    assert_eq!(data.repo().generation(), 2);
    assert!(data.extra("new").is_some());
    assert_eq!(
        fixture.events(),
        [UiEvent::RefreshNews, UiEvent::ListsReloaded]
    );
    Ok(())
}

#[test]
fn failed_data_update_is_reported() -> Result<()> {
    let fixture = Fixture::new()?;
    let mut data = fixture.loaded(StubUpdater::default())?;
    fs::write(fixture.games_file(), "not json at all, and longer than before")?;

    assert_eq!(data.update_ready(), UpdateOutcome::ReloadFailed);
    let events = fixture.events();
    assert_eq!(events[0], UiEvent::RefreshNews);
    assert!(matches!(&events[1], UiEvent::Error(message) if message.contains("failed to load game data")));
    Ok(())
}

#[test]
fn restart_button_closes_only_after_launch() -> Result<()> {
    let fixture = Fixture::new()?;
    let launches = Arc::new(Mutex::new(0));
    let mut data = fixture.loaded(StubUpdater {
        has_new_update: true,
        version: "2.0".to_string(),
        launch_ok: false,
        launches: launches.clone(),
    })?;

    assert!(matches!(
        data.notify_button(7),
        Err(GameDataError::UnknownNotification(7))
    ));
    assert_eq!(*launches.lock(), 0);

    assert!(!data.notify_button(RESTART_NOTIFICATION)?);
    assert!(fixture.events().is_empty());

    let mut launching = fixture.loaded(StubUpdater {
        has_new_update: true,
        version: "2.0".to_string(),
        launch_ok: true,
        launches: launches.clone(),
    })?;
    assert!(launching.notify_button(RESTART_NOTIFICATION)?);
    assert_eq!(fixture.events(), [UiEvent::Close]);
    assert_eq!(*launches.lock(), 2);
    Ok(())
}

#[test]
fn relocation_to_unwritable_path_touches_nothing() -> Result<()> {
    let fixture = Fixture::new()?;
    let mut data = fixture.loaded(StubUpdater::default())?;
    let blocker = fixture.dir.path().join("blocker");
    fs::write(&blocker, "file")?;
    let before = snapshot(fixture.dir.path())?;

    let outcome = data.move_repo(&blocker.join("repo"));
    assert_eq!(outcome, RelocationOutcome::NotWritable);
    assert!(!outcome.attempted());
    assert_eq!(snapshot(fixture.dir.path())?, before);
    assert!(fixture.events().is_empty());
    assert_eq!(fixture.stored_path()?, None);
    Ok(())
}

#[test]
fn relocation_refused_while_jobs_run() -> Result<()> {
    let fixture = Fixture::new()?;
    let mut data = fixture.loaded(StubUpdater::default())?;
    fixture.jobs.start("abuse", JobKind::Install, 1);
    let before = snapshot(fixture.dir.path())?;

    let outcome = data.move_repo(&fixture.dir.path().join("new/nested"));
    assert_eq!(outcome, RelocationOutcome::JobsInProgress);
    assert!(outcome.attempted());
    assert_eq!(snapshot(fixture.dir.path())?, before);
    assert_eq!(
        fixture.events(),
        [UiEvent::Error(
            "Cannot change directories while downloads are in progress".to_string()
        )]
    );
    Ok(())
}

#[test]
fn relocation_onto_itself_is_a_no_op() -> Result<()> {
    let fixture = Fixture::new()?;
    let mut data = fixture.loaded(StubUpdater::default())?;
    assert_eq!(data.move_repo(&fixture.old), RelocationOutcome::Unchanged);
    assert_eq!(fixture.stored_path()?, None);
    Ok(())
}

#[test]
fn failed_executable_copy_keeps_imported_data() -> Result<()> {
    let fixture = Fixture::new()?;
    let mut data = fixture.loaded(StubUpdater::default())?;
    fs::remove_dir_all(fixture.old.join("run"))?;
    let new = fixture.dir.path().join("new");

    let outcome = data.move_repo(&new);
    assert_eq!(
        outcome,
        RelocationOutcome::StepFailed(RelocationStage::Executables)
    );
    assert!(outcome.attempted());
    assert!(new.join("gamedata/abuse/abuse.bin").is_file());
    assert!(new.join("shots/abuse.png").is_file());
    assert!(new.join(INSTALLED_FILE).is_file());
    assert!(!new.join("spread").exists());
    assert!(!marker_path(&new).exists());
    assert_eq!(fixture.stored_path()?, None);
    assert!(fixture.launcher.runs.lock().is_empty());

    let events = fixture.events();
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], UiEvent::Error(message) if message.starts_with("Failed copying executables")));
    Ok(())
}

#[test]
fn cancelled_import_stops_quietly() -> Result<()> {
    let fixture = Fixture::new()?;
    let cancel = RepoImporter::with_progress(Box::new(|_: &str, _: u64| false));
    let mut data = fixture.game_data_with(StubUpdater::default(), cancel);
    data.load_data()?;
    fixture.events.lock().clear();
    let new = fixture.dir.path().join("moved");

    let outcome = data.move_repo(&new);
    assert_eq!(outcome, RelocationOutcome::StepFailed(RelocationStage::Import));
    assert!(fixture.events().is_empty());
    assert!(!marker_path(&new).exists());
    assert!(!new.join(RUN_DIR).exists());
    assert_eq!(fixture.stored_path()?, None);
    assert!(fixture.launcher.runs.lock().is_empty());
    Ok(())
}

#[test]
fn successful_relocation_switches_path_and_relaunches() -> Result<()> {
    let fixture = Fixture::new()?;
    let mut data = fixture.loaded(StubUpdater::default())?;
    let new = fixture.dir.path().join("moved");

    let outcome = data.move_repo(&new);
    assert_eq!(outcome, RelocationOutcome::Success { relaunched: true });

    assert_eq!(fixture.stored_path()?, Some(new.clone()));
    let marker = CleanupMarker::load(&new)?.expect("cleanup marker");
    assert_eq!(marker.old_repo, fixture.old);
    assert!(marker.ask_delete);

    assert!(new.join("run/1").join(EXE_NAME).is_file());
    assert!(new.join("spread/channels/tigdata/games.json").is_file());
    assert_eq!(fs::read_to_string(new.join(CACHE_CONF))?, "cache");
    assert!(new.join("gamedata/abuse/abuse.bin").is_file());
    assert!(fixture.old.join("gamedata/abuse/abuse.bin").is_file());

    let run_dir = new.join("run/1");
    assert_eq!(
        fixture.launcher.runs.lock().as_slice(),
        [(run_dir.join(EXE_NAME), run_dir.clone())]
    );
    assert_eq!(
        fixture.events(),
        [
            UiEvent::Say("Tiggit will now restart for changes to take effect".to_string()),
            UiEvent::Close,
        ]
    );
    Ok(())
}

#[test]
fn relocation_commits_even_if_relaunch_fails() -> Result<()> {
    let mut fixture = Fixture::new()?;
    fixture.launcher.fail = true;
    let mut data = fixture.loaded(StubUpdater::default())?;
    let new = fixture.dir.path().join("moved");

    let outcome = data.move_repo(&new);
    assert_eq!(outcome, RelocationOutcome::Success { relaunched: false });
    assert_eq!(fixture.stored_path()?, Some(new));

    let events = fixture.events();
    assert_eq!(events.len(), 3);
    assert!(matches!(&events[1], UiEvent::Error(message) if message.starts_with("cannot start")));
    assert_eq!(events[2], UiEvent::Close);
    Ok(())
}
