//! The authoritative session state and its only mutator.
//!
//! Every mutation goes through a [`DocumentStore`] method (or the equivalent
//! [`Command`] passed to [`DocumentStore::dispatch`]). Each method updates the
//! state, writes the preference record when a persisted field changed, and
//! notifies subscribers before it returns.

use std::fmt;
use std::path::{Path, PathBuf};

use markzen_settings::{
    EditorConfig, EditorConfigPatch, Layout, PreferenceStorage, Preferences, Theme,
};
use tracing::{debug, warn};

use crate::document::{CursorPosition, FileIdentity, TreeEntry, UNTITLED_NAME};
use crate::recent::RecentFiles;

const APP_NAME: &str = "MarkZen";

/// 單一文件工作階段的完整狀態。 / Full state of the single-document session.
#[derive(Debug, Clone)]
pub struct SessionState {
    content: String,
    preview_content: String,
    current_file: Option<FileIdentity>,
    is_modified: bool,
    cursor: CursorPosition,
    layout: Layout,
    sidebar_visible: bool,
    focus_mode: bool,
    typewriter_mode: bool,
    theme: Theme,
    editor_config: EditorConfig,
    scroll_sync: bool,
    recent_files: RecentFiles,
    working_directory: Option<PathBuf>,
    file_tree: Vec<TreeEntry>,
    content_revision: u64,
    document_generation: u64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::from_preferences(Preferences::default())
    }
}

/// 實際顯示的窗格。 / Panes actually shown once focus mode is taken into account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaneVisibility {
    pub editor: bool,
    pub preview: bool,
    pub sidebar: bool,
    pub toolbar: bool,
}

impl SessionState {
    fn from_preferences(preferences: Preferences) -> Self {
        Self {
            content: String::new(),
            preview_content: String::new(),
            current_file: None,
            is_modified: false,
            cursor: CursorPosition::default(),
            layout: preferences.layout,
            sidebar_visible: preferences.sidebar_visible,
            focus_mode: false,
            typewriter_mode: false,
            theme: preferences.theme,
            editor_config: preferences.editor_config,
            scroll_sync: preferences.scroll_sync,
            recent_files: RecentFiles::default(),
            working_directory: None,
            file_tree: Vec::new(),
            content_revision: 0,
            document_generation: 0,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn preview_content(&self) -> &str {
        &self.preview_content
    }

    pub fn current_file(&self) -> Option<&FileIdentity> {
        self.current_file.as_ref()
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.current_file.as_ref().map(|file| file.path.as_path())
    }

    pub fn is_modified(&self) -> bool {
        self.is_modified
    }

    pub fn cursor_position(&self) -> CursorPosition {
        self.cursor
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn sidebar_visible(&self) -> bool {
        self.sidebar_visible
    }

    pub fn focus_mode(&self) -> bool {
        self.focus_mode
    }

    pub fn typewriter_mode(&self) -> bool {
        self.typewriter_mode
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn is_dark_theme(&self) -> bool {
        self.theme.is_dark()
    }

    pub fn editor_config(&self) -> &EditorConfig {
        &self.editor_config
    }

    pub fn scroll_sync(&self) -> bool {
        self.scroll_sync
    }

    pub fn recent_files(&self) -> &RecentFiles {
        &self.recent_files
    }

    pub fn working_directory(&self) -> Option<&Path> {
        self.working_directory.as_deref()
    }

    pub fn file_tree(&self) -> &[TreeEntry] {
        &self.file_tree
    }

    /// 每次 `set_content` 都會遞增。 / Incremented by every `set_content` call.
    pub fn content_revision(&self) -> u64 {
        self.content_revision
    }

    /// 文件身分（載入、清除、路徑變更）改變時遞增。 / Incremented whenever the document identity changes.
    pub fn document_generation(&self) -> u64 {
        self.document_generation
    }

    /// 專注模式下僅顯示編輯器。 / Focus mode shows the editor alone, whatever the layout says.
    pub fn visible_panes(&self) -> PaneVisibility {
        if self.focus_mode {
            return PaneVisibility {
                editor: true,
                preview: false,
                sidebar: false,
                toolbar: false,
            };
        }
        PaneVisibility {
            editor: self.layout.shows_editor(),
            preview: self.layout.shows_preview(),
            sidebar: self.sidebar_visible,
            toolbar: true,
        }
    }

    /// 需要持久化的偏好設定子集。 / The persisted preference subset of this state.
    pub fn preferences(&self) -> Preferences {
        Preferences {
            editor_config: self.editor_config.clone(),
            theme: self.theme,
            layout: self.layout,
            sidebar_visible: self.sidebar_visible,
            scroll_sync: self.scroll_sync,
            ..Preferences::default()
        }
    }
}

/// 視窗標題，未儲存時帶有圓點。 / Window title, with a dot while there are unsaved changes.
pub fn window_title(state: &SessionState) -> String {
    let marker = if state.is_modified() { " •" } else { "" };
    match state.current_file() {
        Some(file) => {
            let name = if file.name.is_empty() {
                UNTITLED_NAME
            } else {
                file.name.as_str()
            };
            format!("{name}{marker} - {APP_NAME}")
        }
        None if state.is_modified() => format!("{UNTITLED_NAME}{marker} - {APP_NAME}"),
        None => APP_NAME.to_string(),
    }
}

/// 狀態變更通知。 / Notification sent to subscribers after a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    ContentChanged,
    PreviewContentChanged,
    CursorMoved,
    CurrentFileChanged,
    ModifiedChanged,
    LayoutChanged,
    SidebarChanged,
    FocusModeChanged,
    TypewriterModeChanged,
    ThemeChanged,
    EditorConfigChanged,
    ScrollSyncChanged,
    RecentFilesChanged,
    WorkingDirectoryChanged,
    FileTreeChanged,
    DocumentLoaded,
    DocumentSaved,
    DocumentCleared,
}

/// 可分派至 store 的指令。 / A mutation expressed as a value.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetContent(String),
    SetPreviewContent(String),
    SetCursor(CursorPosition),
    SetLayout(Layout),
    CycleLayout,
    ToggleSidebar,
    ToggleFocusMode,
    ExitFocusMode,
    ToggleTypewriterMode,
    SetTheme(Theme),
    NextTheme,
    ToggleDarkMode,
    UpdateEditorConfig(EditorConfigPatch),
    ToggleScrollSync,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type ObserverFn = Box<dyn FnMut(&StoreEvent, &SessionState) + Send>;

struct Observer {
    id: SubscriptionId,
    callback: ObserverFn,
}

/// 工作階段狀態的唯一持有者與修改者。 / Sole owner and mutator of the session state.
pub struct DocumentStore {
    state: SessionState,
    observers: Vec<Observer>,
    next_subscription: u64,
    preferences: Option<Box<dyn PreferenceStorage>>,
}

impl fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentStore")
            .field("state", &self.state)
            .field("observers", &self.observers.len())
            .field("persistent", &self.preferences.is_some())
            .finish()
    }
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore {
    /// 以預設值建立且不持久化偏好設定。 / Creates a store with defaults and no preference persistence.
    pub fn new() -> Self {
        Self {
            state: SessionState::default(),
            observers: Vec::new(),
            next_subscription: 0,
            preferences: None,
        }
    }

    /// 啟動時讀取一次偏好設定，之後每次變更都寫回。 / Reads preferences once at startup and writes them back on every change.
    pub fn with_preferences(mut backend: Box<dyn PreferenceStorage>) -> Self {
        let preferences = match backend.load() {
            Ok(preferences) => preferences,
            Err(err) => {
                warn!(error = %err, "failed to load preferences, using defaults");
                Preferences::default()
            }
        };
        Self {
            state: SessionState::from_preferences(preferences),
            observers: Vec::new(),
            next_subscription: 0,
            preferences: Some(backend),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&StoreEvent, &SessionState) + Send + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push(Observer {
            id,
            callback: Box::new(callback),
        });
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|observer| observer.id != id);
        before != self.observers.len()
    }

    pub fn dispatch(&mut self, command: Command) {
        match command {
            Command::SetContent(text) => self.set_content(text),
            Command::SetPreviewContent(text) => self.set_preview_content(text),
            Command::SetCursor(position) => self.set_cursor_position(position),
            Command::SetLayout(layout) => self.set_layout(layout),
            Command::CycleLayout => self.cycle_layout(),
            Command::ToggleSidebar => self.toggle_sidebar(),
            Command::ToggleFocusMode => self.toggle_focus_mode(),
            Command::ExitFocusMode => self.exit_focus_mode(),
            Command::ToggleTypewriterMode => self.toggle_typewriter_mode(),
            Command::SetTheme(theme) => self.set_theme(theme),
            Command::NextTheme => self.next_theme(),
            Command::ToggleDarkMode => self.toggle_dark_mode(),
            Command::UpdateEditorConfig(patch) => self.update_editor_config(&patch),
            Command::ToggleScrollSync => self.toggle_scroll_sync(),
        }
    }

    /// 取代內容並無條件標記為已修改。 / Replaces the content and marks the session modified, unconditionally.
    pub fn set_content(&mut self, text: impl Into<String>) {
        self.state.content = text.into();
        self.state.is_modified = true;
        self.state.content_revision += 1;
        self.emit(StoreEvent::ContentChanged);
    }

    pub fn set_preview_content(&mut self, text: impl Into<String>) {
        self.state.preview_content = text.into();
        self.emit(StoreEvent::PreviewContentChanged);
    }

    pub fn set_cursor_position(&mut self, position: CursorPosition) {
        self.state.cursor = position;
        self.emit(StoreEvent::CursorMoved);
    }

    pub fn set_layout(&mut self, layout: Layout) {
        self.state.layout = layout;
        self.persist_preferences();
        self.emit(StoreEvent::LayoutChanged);
    }

    /// 依名稱設定版面；無效名稱會被忽略。 / Sets the layout by name; unknown names are ignored.
    pub fn set_layout_named(&mut self, name: &str) -> bool {
        match name.parse::<Layout>() {
            Ok(layout) => {
                self.set_layout(layout);
                true
            }
            Err(err) => {
                debug!(%err, "ignoring layout request");
                false
            }
        }
    }

    pub fn cycle_layout(&mut self) {
        self.set_layout(self.state.layout.next());
    }

    pub fn toggle_sidebar(&mut self) {
        self.state.sidebar_visible = !self.state.sidebar_visible;
        self.persist_preferences();
        self.emit(StoreEvent::SidebarChanged);
    }

    /// 切換專注模式；側邊欄可見性設為切換前的專注狀態。 / Flips focus mode; the sidebar takes the previous focus value.
    pub fn toggle_focus_mode(&mut self) {
        let previous = self.state.focus_mode;
        self.state.focus_mode = !previous;
        self.state.sidebar_visible = previous;
        self.persist_preferences();
        self.emit(StoreEvent::FocusModeChanged);
    }

    pub fn exit_focus_mode(&mut self) {
        if self.state.focus_mode {
            self.toggle_focus_mode();
        }
    }

    pub fn toggle_typewriter_mode(&mut self) {
        self.state.typewriter_mode = !self.state.typewriter_mode;
        self.emit(StoreEvent::TypewriterModeChanged);
    }

    /// 設定主題並同步至編輯器設定。 / Sets the theme and mirrors it into the editor config.
    pub fn set_theme(&mut self, theme: Theme) {
        self.state.theme = theme;
        self.state.editor_config.theme = theme;
        self.persist_preferences();
        self.emit(StoreEvent::ThemeChanged);
    }

    pub fn set_theme_named(&mut self, name: &str) -> bool {
        match name.parse::<Theme>() {
            Ok(theme) => {
                self.set_theme(theme);
                true
            }
            Err(err) => {
                debug!(%err, "ignoring theme request");
                false
            }
        }
    }

    pub fn next_theme(&mut self) {
        self.set_theme(self.state.theme.next());
    }

    pub fn toggle_dark_mode(&mut self) {
        self.set_theme(self.state.theme.toggled_dark());
    }

    pub fn update_editor_config(&mut self, patch: &EditorConfigPatch) {
        self.state.editor_config.apply(patch);
        self.persist_preferences();
        self.emit(StoreEvent::EditorConfigChanged);
    }

    pub fn toggle_scroll_sync(&mut self) {
        self.set_scroll_sync(!self.state.scroll_sync);
    }

    pub fn set_scroll_sync(&mut self, enabled: bool) {
        self.state.scroll_sync = enabled;
        self.persist_preferences();
        self.emit(StoreEvent::ScrollSyncChanged);
    }

    pub fn set_current_file(&mut self, file: Option<FileIdentity>) {
        let path_changed = self.state.current_path() != file.as_ref().map(|f| f.path.as_path());
        self.state.current_file = file;
        if path_changed {
            self.state.document_generation += 1;
        }
        self.emit(StoreEvent::CurrentFileChanged);
    }

    pub fn set_modified(&mut self, modified: bool) {
        self.state.is_modified = modified;
        self.emit(StoreEvent::ModifiedChanged);
    }

    pub fn add_recent_file(&mut self, file: FileIdentity) {
        self.state.recent_files.add(file);
        self.emit(StoreEvent::RecentFilesChanged);
    }

    pub fn set_working_directory(&mut self, directory: Option<PathBuf>) {
        self.state.working_directory = directory;
        self.emit(StoreEvent::WorkingDirectoryChanged);
    }

    pub fn set_file_tree(&mut self, entries: Vec<TreeEntry>) {
        self.state.file_tree = entries;
        self.emit(StoreEvent::FileTreeChanged);
    }

    /// 一次性替換文件：檔案、內容、修改旗標與最近清單。 / Replaces file, content, modified flag and recent list in one update.
    pub fn load_document(&mut self, file: FileIdentity, content: impl Into<String>) {
        let content = content.into();
        self.state.preview_content = content.clone();
        self.state.content = content;
        self.state.recent_files.add(file.clone());
        self.state.current_file = Some(file);
        self.state.is_modified = false;
        self.state.document_generation += 1;
        self.emit(StoreEvent::DocumentLoaded);
    }

    /// 記錄成功的儲存：更新快照並清除修改旗標。 / Records a successful save: new snapshot, clean flag, recent entry.
    pub fn commit_save(&mut self, file: FileIdentity) {
        if self.state.current_path() != Some(file.path.as_path()) {
            self.state.document_generation += 1;
        }
        self.state.recent_files.add(file.clone());
        self.state.current_file = Some(file);
        self.state.is_modified = false;
        self.emit(StoreEvent::DocumentSaved);
    }

    /// 回到未命名的空白文件。 / Resets to an empty, untitled, clean buffer.
    pub fn clear_document(&mut self) {
        self.state.current_file = None;
        self.state.content.clear();
        self.state.preview_content.clear();
        self.state.is_modified = false;
        self.state.document_generation += 1;
        self.emit(StoreEvent::DocumentCleared);
    }

    fn persist_preferences(&mut self) {
        let Some(backend) = self.preferences.as_mut() else {
            return;
        };
        if let Err(err) = backend.save(&self.state.preferences()) {
            warn!(error = %err, "failed to persist preferences");
        }
    }

    fn emit(&mut self, event: StoreEvent) {
        for observer in self.observers.iter_mut() {
            (observer.callback)(&event, &self.state);
        }
    }
}
