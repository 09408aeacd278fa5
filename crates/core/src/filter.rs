//! Filtered views over the repository's game list.

use crate::models::LiveInfo;

/// Inclusion policy for a [`GameList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePicker {
    /// Every game.
    All,
    /// Games whose demo flag differs from `free`.
    ///
    /// `free: true` keeps full freeware titles, `free: false` keeps demos.
    FreeDemo {
        /// Keep freeware (`true`) or demos (`false`).
        free: bool,
    },
    /// Games with anything on disk.
    Installed,
}

impl GamePicker {
    /// Full freeware titles.
    pub const FREEWARE: GamePicker = GamePicker::FreeDemo { free: true };
    /// Demos only.
    pub const DEMOS: GamePicker = GamePicker::FreeDemo { free: false };

    /// Whether `info` belongs in a list using this picker.
    pub fn include(&self, info: &LiveInfo) -> bool {
        match *self {
            GamePicker::All => true,
            GamePicker::FreeDemo { free } => info.info.is_demo != free,
            GamePicker::Installed => !info.is_uninstalled(),
        }
    }
}

/// The four views the launcher keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListKind {
    /// Everything, in catalogue order.
    Latest,
    /// Full freeware games.
    Freeware,
    /// Demos.
    Demos,
    /// Games present on disk, including running downloads.
    Installed,
}

impl ListKind {
    /// Every kind, in display order.
    pub const ALL: [ListKind; 4] = [
        ListKind::Latest,
        ListKind::Freeware,
        ListKind::Demos,
        ListKind::Installed,
    ];

    /// Inclusion policy of this view.
    pub fn picker(self) -> GamePicker {
        match self {
            ListKind::Latest => GamePicker::All,
            ListKind::Freeware => GamePicker::FREEWARE,
            ListKind::Demos => GamePicker::DEMOS,
            ListKind::Installed => GamePicker::Installed,
        }
    }

    /// Lowercase name accepted by [`ListKind::from_label`].
    pub fn label(self) -> &'static str {
        match self {
            ListKind::Latest => "latest",
            ListKind::Freeware => "freeware",
            ListKind::Demos => "demos",
            ListKind::Installed => "installed",
        }
    }

    /// Parse a user-supplied list name.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "latest" | "all" => Some(ListKind::Latest),
            "freeware" | "free" => Some(ListKind::Freeware),
            "demos" | "demo" => Some(ListKind::Demos),
            "installed" => Some(ListKind::Installed),
            _ => None,
        }
    }
}

/// Ordered ids of the base-list entries accepted by a picker and the search query.
#[derive(Debug, Clone)]
pub struct GameList {
    picker: GamePicker,
    search: String,
    ids: Vec<String>,
    reloads: u64,
}

impl GameList {
    /// Empty view; populated by the first [`GameList::notify_reloaded`].
    pub fn new(picker: GamePicker) -> Self {
        Self {
            picker,
            search: String::new(),
            ids: Vec::new(),
            reloads: 0,
        }
    }

    /// Policy the list was built with.
    pub fn picker(&self) -> GamePicker {
        self.picker
    }

    /// Game ids in list order.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Number of games in the view.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// True when no game passes the filters.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Number of times the view has been rebuilt.
    pub fn reloads(&self) -> u64 {
        self.reloads
    }

    /// Rebuild from the base list after the repository reloaded.
    pub fn notify_reloaded<'a>(&mut self, base: impl IntoIterator<Item = &'a LiveInfo>) {
        let needle = self.search.to_lowercase();
        self.ids = base
            .into_iter()
            .filter(|info| self.picker.include(info))
            .filter(|info| needle.is_empty() || matches_query(info, &needle))
            .map(|info| info.id().to_string())
            .collect();
        self.reloads += 1;
    }

    /// Set a case-insensitive search query; takes effect on the next rebuild.
    pub fn set_search(&mut self, query: &str) {
        self.search = query.trim().to_string();
    }
}

fn matches_query(info: &LiveInfo, needle: &str) -> bool {
    let game = &info.info;
    game.id.to_lowercase().contains(needle)
        || game.title.to_lowercase().contains(needle)
        || game
            .tagline
            .as_ref()
            .map(|value| value.to_lowercase().contains(needle))
            .unwrap_or(false)
        || game
            .tags
            .iter()
            .any(|tag| tag.to_lowercase().contains(needle))
}
