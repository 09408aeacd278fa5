//! The launcher's data orchestrator.
//!
//! [`GameData`] owns the repository, the update checker, the job tracker and
//! the four game lists. It reacts to update signals, drives full data
//! reloads and relocates the repository on request.

mod relocate;
#[cfg(test)]
mod tests;

use anyhow::Context;
use tracing::{debug, error, info, warn};

use crate::{
    error::GameDataError,
    extra::{ExtraStore, GameInf},
    filter::{GameList, ListKind},
    frontend::Frontend,
    import::Importer,
    jobs::JobTracker,
    launcher::Launcher,
    models::LiveInfo,
    news::GameNews,
    repo::Repository,
    settings::{RepoSettings, SETTINGS_FILE},
    updater::UpdateChecker,
};

pub use relocate::{is_writable, RelocationOutcome, RelocationStage};

/// Notification id of the "Restart now" button.
pub const RESTART_NOTIFICATION: i32 = 2;

/// Where the orchestrator is in handling an update signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateState {
    /// Waiting for the next update signal.
    Idle,
    /// News were reloaded and the frontend told.
    NewsRefreshed,
    /// New data is being loaded.
    DataReloadPending,
    /// The user was asked to restart into a new version.
    RestartNotifyPending,
}

/// What [`GameData::update_ready`] ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// No frontend attached; nothing was done.
    NoListener,
    /// No new data; statistics were refreshed.
    StatsRefreshed,
    /// A new program version exists; the user was asked to restart.
    RestartPending,
    /// New data was loaded.
    DataReloaded,
    /// Loading new data failed and was reported.
    ReloadFailed,
}

/// The four filtered views over the repository.
#[derive(Debug)]
pub struct ListSet {
    latest: GameList,
    freeware: GameList,
    demos: GameList,
    installed: GameList,
}

impl ListSet {
    fn new() -> Self {
        Self {
            latest: GameList::new(ListKind::Latest.picker()),
            freeware: GameList::new(ListKind::Freeware.picker()),
            demos: GameList::new(ListKind::Demos.picker()),
            installed: GameList::new(ListKind::Installed.picker()),
        }
    }

    /// The view for `kind`.
    pub fn get(&self, kind: ListKind) -> &GameList {
        match kind {
            ListKind::Latest => &self.latest,
            ListKind::Freeware => &self.freeware,
            ListKind::Demos => &self.demos,
            ListKind::Installed => &self.installed,
        }
    }

    fn get_mut(&mut self, kind: ListKind) -> &mut GameList {
        match kind {
            ListKind::Latest => &mut self.latest,
            ListKind::Freeware => &mut self.freeware,
            ListKind::Demos => &mut self.demos,
            ListKind::Installed => &mut self.installed,
        }
    }

    fn notify_reloaded(&mut self, base: &[&LiveInfo]) {
        for kind in ListKind::ALL {
            self.get_mut(kind).notify_reloaded(base.iter().copied());
        }
    }
}

/// Owns the repository and everything derived from it.
///
/// Construction loads news and settings but no game data; call
/// [`GameData::load_data`] once a frontend is attached. Dropping it releases
/// the lists before the extension records.
pub struct GameData {
    repo: Box<dyn Repository>,
    updater: Box<dyn UpdateChecker>,
    importer: Box<dyn Importer>,
    launcher: Box<dyn Launcher>,
    jobs: JobTracker,
    settings: RepoSettings,
    news: GameNews,
    extras: ExtraStore<GameInf>,
    lists: Option<ListSet>,
    frontend: Option<Box<dyn Frontend>>,
    state: UpdateState,
}

impl GameData {
    /// Wire up the collaborators.
    pub fn new(
        repo: Box<dyn Repository>,
        updater: Box<dyn UpdateChecker>,
        importer: Box<dyn Importer>,
        launcher: Box<dyn Launcher>,
        jobs: JobTracker,
    ) -> Self {
        let settings = RepoSettings::load(repo.path_to(SETTINGS_FILE));
        let mut news = GameNews::new(repo.news_feed());
        if let Err(err) = news.reload() {
            warn!("news could not be loaded: {err:#}");
        }
        Self {
            repo,
            updater,
            importer,
            launcher,
            jobs,
            settings,
            news,
            extras: ExtraStore::new(),
            lists: Some(ListSet::new()),
            frontend: None,
            state: UpdateState::Idle,
        }
    }

    /// Attach the frontend that receives notifications and dialogs.
    pub fn set_frontend(&mut self, frontend: Box<dyn Frontend>) {
        self.frontend = Some(frontend);
    }

    /// The data repository.
    pub fn repo(&self) -> &dyn Repository {
        self.repo.as_ref()
    }

    /// The update checker, for polling from the frontend loop.
    pub fn updater_mut(&mut self) -> &mut dyn UpdateChecker {
        self.updater.as_mut()
    }

    /// Running download and install jobs.
    pub fn jobs(&self) -> &JobTracker {
        &self.jobs
    }

    /// Display-ready news.
    pub fn news(&self) -> &GameNews {
        &self.news
    }

    /// Display-ready news, for marking items read.
    pub fn news_mut(&mut self) -> &mut GameNews {
        &mut self.news
    }

    /// Progress through the current update signal.
    pub fn state(&self) -> UpdateState {
        self.state
    }

    /// Per-repository preferences.
    pub fn settings(&self) -> &RepoSettings {
        &self.settings
    }

    /// One of the four views. `None` once teardown started.
    pub fn list(&self, kind: ListKind) -> Option<&GameList> {
        self.lists.as_ref().map(|lists| lists.get(kind))
    }

    /// Extension record for `id` in the current generation.
    pub fn extra(&self, id: &str) -> Option<&GameInf> {
        self.extras.get(id)
    }

    /// Every extension record of the current generation.
    pub fn extras(&self) -> &ExtraStore<GameInf> {
        &self.extras
    }

    /// Records of a list, in list order, with their extension records.
    pub fn rows(&self, kind: ListKind) -> Vec<(&LiveInfo, Option<&GameInf>)> {
        let Some(list) = self.list(kind) else {
            return Vec::new();
        };
        let lookup = self.repo.list();
        list.ids()
            .iter()
            .filter_map(|id| lookup.get(id))
            .map(|info| (info, self.extras.get(info.id())))
            .collect()
    }

    /// Set a search query on one list and rebuild it.
    pub fn set_search(&mut self, kind: ListKind, query: &str) {
        if let Some(lists) = self.lists.as_mut() {
            let list = lists.get_mut(kind);
            list.set_search(query);
            list.notify_reloaded(self.repo.base_list());
        }
    }

    /// True while downloads or installs are running.
    pub fn is_active(&self) -> bool {
        self.jobs.has_jobs()
    }

    /// React to the update checker reporting that new content may be available.
    pub fn update_ready(&mut self) -> UpdateOutcome {
        info!(
            has_new_data = self.repo.has_new_data(),
            has_new_update = self.updater.has_new_update(),
            new_version = self.updater.new_version(),
            "update ready"
        );

        if self.frontend.is_none() {
            return UpdateOutcome::NoListener;
        }

        if let Err(err) = self.news.reload() {
            warn!("news reload failed: {err:#}");
        }
        self.state = UpdateState::NewsRefreshed;
        if let Some(frontend) = self.frontend.as_deref_mut() {
            frontend.refresh_news();
        }

        if !self.repo.has_new_data() {
            debug!("no new data available");
            if let Err(err) = self.repo.load_stats() {
                warn!("statistics reload failed: {err:#}");
            }
            self.update_display_status();
            self.state = UpdateState::Idle;
            return UpdateOutcome::StatsRefreshed;
        }

        // A program update wins; the restarted process loads the new data.
        if self.updater.has_new_update() {
            let version = self.updater.new_version().to_string();
            info!(%version, "new version available, notifying user");
            self.state = UpdateState::RestartNotifyPending;
            if let Some(frontend) = self.frontend.as_deref_mut() {
                frontend.display_notification(
                    &format!("Tiggit has been updated to version {version}"),
                    "Restart now",
                    RESTART_NOTIFICATION,
                );
            }
            return UpdateOutcome::RestartPending;
        }

        info!("pure data update, reloading data");
        self.state = UpdateState::DataReloadPending;
        let outcome = match self.load_data() {
            Ok(()) => UpdateOutcome::DataReloaded,
            Err(err) => {
                self.report_error(&err.to_string());
                UpdateOutcome::ReloadFailed
            }
        };
        self.state = UpdateState::Idle;
        outcome
    }

    /// Handle a press on a notification button.
    ///
    /// Returns `true` when a new process was started and the frontend closed.
    pub fn notify_button(&mut self, id: i32) -> Result<bool, GameDataError> {
        if id != RESTART_NOTIFICATION {
            return Err(GameDataError::UnknownNotification(id));
        }

        let launched = self.updater.launch_new();
        if launched {
            info!("launched new executable, exiting");
            if let Some(frontend) = self.frontend.as_deref_mut() {
                frontend.close();
            }
        } else {
            info!("no process launched, continuing with this one");
        }
        self.state = UpdateState::Idle;
        Ok(launched)
    }

    /// Reload all repository data and rebuild everything derived from it.
    ///
    /// There is no rollback: a failure may leave the repository reloaded but
    /// not fully wired up.
    pub fn load_data(&mut self) -> Result<(), GameDataError> {
        self.reload_data().map_err(GameDataError::Load)
    }

    fn reload_data(&mut self) -> anyhow::Result<()> {
        self.kill_data();

        debug!("loading repository data");
        self.repo
            .load_data()
            .context("repository could not load its data")?;

        for (id, info) in self.repo.list() {
            if self
                .extras
                .attach(id.clone(), GameInf::new(info, &self.settings))
                .is_some()
            {
                warn!(game_id = %id, "replaced a stale extension record");
            }
        }

        let reassigned = self.jobs.reassign_jobs(self.repo.list());
        debug!(reassigned, "jobs moved to fresh records");

        // Only once every record has its extension may listeners see the data.
        self.repo.done_loading();

        self.notify_reloaded();
        info!(
            generation = self.repo.generation(),
            games = self.extras.len(),
            "game data loaded"
        );
        Ok(())
    }

    /// Release every extension record.
    pub fn kill_data(&mut self) {
        let released = self.extras.clear();
        debug!(released, "extension records released");
    }

    /// Refresh status-dependent display state without a reload.
    pub fn update_display_status(&mut self) {
        let lookup = self.repo.list();
        for (id, inf) in self.extras.iter_mut() {
            if let Some(info) = lookup.get(id) {
                inf.refresh_status(info, &self.settings);
            }
        }
        if let Some(lists) = self.lists.as_mut() {
            lists
                .get_mut(ListKind::Installed)
                .notify_reloaded(self.repo.base_list());
        }
        if let Some(frontend) = self.frontend.as_deref_mut() {
            frontend.display_status_changed();
        }
    }

    /// Remember `now` as the moment the user last saw the catalogue.
    pub fn mark_catalogue_seen(&mut self, now: i64) -> anyhow::Result<()> {
        self.settings.last_seen = now;
        self.settings.persist(self.repo.path_to(SETTINGS_FILE))
    }

    fn notify_reloaded(&mut self) {
        if let Some(lists) = self.lists.as_mut() {
            let base = self.repo.base_list();
            lists.notify_reloaded(&base);
        }
        if let Some(frontend) = self.frontend.as_deref_mut() {
            frontend.lists_reloaded();
        }
    }

    fn report_error(&mut self, message: &str) {
        error!("{message}");
        if let Some(frontend) = self.frontend.as_deref_mut() {
            frontend.error(message);
        }
    }

    fn say(&mut self, message: &str) {
        info!("{message}");
        if let Some(frontend) = self.frontend.as_deref_mut() {
            frontend.say(message);
        }
    }

    fn close(&mut self) {
        if let Some(frontend) = self.frontend.as_deref_mut() {
            frontend.close();
        }
    }
}

impl Drop for GameData {
    fn drop(&mut self) {
        self.lists.take();
        self.kill_data();
    }
}
