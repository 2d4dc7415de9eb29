use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use markzen_core::{
    Collaborators, Confirmation, DocumentStore, FileAction, FileFilter, FileIdentity, FilePicker,
    KeyChord, ManualClock, MemoryStorage, Notice, NoticeLevel, Notifier, PickerError,
    PreformattedRenderer, SessionOutcome, FileSession, Storage, Workbench, WorkbenchEvent,
    AUTOSAVE_DEBOUNCE, DISCARD_CHANGES_PROMPT, PREVIEW_DEBOUNCE,
};
use markzen_settings::{Layout, MemoryPreferences, PreferenceStorage, Theme};

#[derive(Default)]
struct ScriptedPicker {
    paths: Mutex<VecDeque<Option<PathBuf>>>,
    save_names: Mutex<Vec<String>>,
}

impl ScriptedPicker {
    fn returning(paths: impl IntoIterator<Item = Option<&'static str>>) -> Arc<Self> {
        Arc::new(Self {
            paths: Mutex::new(paths.into_iter().map(|p| p.map(PathBuf::from)).collect()),
            save_names: Mutex::new(Vec::new()),
        })
    }

    fn next(&self) -> Option<PathBuf> {
        self.paths.lock().unwrap().pop_front().flatten()
    }

    fn save_names(&self) -> Vec<String> {
        self.save_names.lock().unwrap().clone()
    }
}

#[async_trait]
impl FilePicker for ScriptedPicker {
    async fn pick_open_path(&self, _filters: &[FileFilter]) -> Result<Option<PathBuf>, PickerError> {
        Ok(self.next())
    }

    async fn pick_save_path(
        &self,
        default_name: &str,
        _filters: &[FileFilter],
    ) -> Result<Option<PathBuf>, PickerError> {
        self.save_names.lock().unwrap().push(default_name.to_string());
        Ok(self.next())
    }

    async fn pick_directory(&self) -> Result<Option<PathBuf>, PickerError> {
        Ok(self.next())
    }
}

struct Answer {
    accept: bool,
    prompts: Mutex<Vec<String>>,
}

impl Answer {
    fn new(accept: bool) -> Arc<Self> {
        Arc::new(Self {
            accept,
            prompts: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl Confirmation for Answer {
    async fn confirm(&self, message: &str) -> bool {
        self.prompts.lock().unwrap().push(message.to_string());
        self.accept
    }
}

#[derive(Default)]
struct Inbox {
    notices: Mutex<Vec<Notice>>,
}

impl Notifier for Inbox {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

impl Inbox {
    fn levels(&self) -> Vec<NoticeLevel> {
        self.notices.lock().unwrap().iter().map(|n| n.level).collect()
    }
}

struct Harness {
    storage: MemoryStorage,
    picker: Arc<ScriptedPicker>,
    confirmation: Arc<Answer>,
    inbox: Arc<Inbox>,
}

impl Harness {
    fn new(storage: MemoryStorage, picker: Arc<ScriptedPicker>, accept: bool) -> Self {
        Self {
            storage,
            picker,
            confirmation: Answer::new(accept),
            inbox: Arc::new(Inbox::default()),
        }
    }

    fn collaborators(&self) -> Collaborators {
        Collaborators {
            storage: Arc::new(self.storage.clone()),
            picker: self.picker.clone(),
            renderer: Arc::new(PreformattedRenderer),
            confirmation: self.confirmation.clone(),
            notifier: self.inbox.clone(),
        }
    }

    fn session(&self) -> FileSession {
        FileSession::new(self.collaborators())
    }
}

#[tokio::test]
async fn save_as_gives_untitled_buffer_an_identity() {
    let harness = Harness::new(
        MemoryStorage::new(),
        ScriptedPicker::returning([Some("/x/a.md")]),
        true,
    );
    let session = harness.session();
    let mut store = DocumentStore::new();

    store.set_content("hello");
    assert!(store.state().is_modified());

    let outcome = session.save_as_file(&mut store).await.unwrap();
    assert_eq!(outcome, SessionOutcome::Completed);

    let state = store.state();
    assert_eq!(state.current_path(), Some(Path::new("/x/a.md")));
    assert!(!state.is_modified());
    let recent: Vec<_> = state.recent_files().iter().map(|f| f.path.clone()).collect();
    assert_eq!(recent, vec![PathBuf::from("/x/a.md")]);
    assert_eq!(harness.storage.contents("/x/a.md").as_deref(), Some("hello"));
    assert_eq!(harness.picker.save_names(), vec!["Untitled.md"]);
}

#[tokio::test]
async fn declined_confirmation_leaves_document_untouched() {
    let harness = Harness::new(
        MemoryStorage::new().with_file("/x/other.md", "other"),
        ScriptedPicker::returning([Some("/x/other.md")]),
        false,
    );
    let session = harness.session();
    let mut store = DocumentStore::new();
    store.load_document(FileIdentity::new("/x/a.md", "saved"), "saved");
    store.set_content("unsaved edit");
    let before = store.state().clone();

    assert_eq!(
        session.open_file(&mut store).await.unwrap(),
        SessionOutcome::Cancelled
    );
    assert_eq!(
        session.new_file(&mut store).await.unwrap(),
        SessionOutcome::Cancelled
    );

    assert_eq!(store.state().content(), before.content());
    assert_eq!(store.state().current_file(), before.current_file());
    assert!(store.state().is_modified());
    assert_eq!(
        *harness.confirmation.prompts.lock().unwrap(),
        vec![DISCARD_CHANGES_PROMPT, DISCARD_CHANGES_PROMPT]
    );
}

#[tokio::test]
async fn cancelled_save_as_keeps_buffer_untitled_and_modified() {
    let harness = Harness::new(MemoryStorage::new(), ScriptedPicker::returning([None]), true);
    let session = harness.session();
    let mut store = DocumentStore::new();
    store.set_content("draft");

    let outcome = session.save_as_file(&mut store).await.unwrap();

    assert_eq!(outcome, SessionOutcome::Cancelled);
    assert!(store.state().is_modified());
    assert_eq!(store.state().current_file(), None);
    assert_eq!(store.state().content(), "draft");
    assert!(harness.inbox.levels().is_empty());
    assert_eq!(harness.picker.save_names(), vec!["Untitled.md"]);
}

#[tokio::test]
async fn unreadable_file_leaves_document_as_it_was() {
    let harness = Harness::new(
        MemoryStorage::new(),
        ScriptedPicker::returning([Some("/x/missing.md")]),
        true,
    );
    let session = harness.session();
    let mut store = DocumentStore::new();
    store.load_document(FileIdentity::new("/x/a.md", "saved"), "saved");
    store.set_content("unsaved edit");
    let before = store.state().clone();

    assert!(session.open_file(&mut store).await.is_err());
    assert!(session
        .open_recent_file(&mut store, Path::new("/x/gone.md"))
        .await
        .is_err());

    let state = store.state();
    assert_eq!(state.content(), before.content());
    assert_eq!(state.current_file(), before.current_file());
    assert_eq!(state.document_generation(), before.document_generation());
    assert!(state.is_modified());
    assert_eq!(
        harness.inbox.levels(),
        vec![NoticeLevel::Error, NoticeLevel::Error]
    );
}

#[tokio::test]
async fn open_replaces_document_and_promotes_recent_entry() {
    let harness = Harness::new(
        MemoryStorage::new()
            .with_file("/x/a.md", "# A")
            .with_file("/x/b.md", "# B"),
        ScriptedPicker::returning([Some("/x/a.md"), Some("/x/b.md")]),
        true,
    );
    let session = harness.session();
    let mut store = DocumentStore::new();

    session.open_file(&mut store).await.unwrap();
    session.open_file(&mut store).await.unwrap();
    session
        .open_recent_file(&mut store, Path::new("/x/a.md"))
        .await
        .unwrap();

    let state = store.state();
    assert_eq!(state.content(), "# A");
    assert_eq!(state.preview_content(), "# A");
    assert!(!state.is_modified());
    let recent: Vec<_> = state
        .recent_files()
        .iter()
        .map(|f| f.path.to_string_lossy().into_owned())
        .collect();
    assert_eq!(recent, vec!["/x/a.md", "/x/b.md"]);
}

#[tokio::test]
async fn failed_save_keeps_modified_and_notifies() {
    let storage = MemoryStorage::new();
    storage.set_fail_writes(true);
    let harness = Harness::new(storage, ScriptedPicker::returning([]), true);
    let session = harness.session();
    let mut store = DocumentStore::new();
    store.load_document(FileIdentity::new("/x/a.md", "old"), "old");
    store.set_content("new");

    assert!(session.save_file(&mut store).await.is_err());
    assert!(store.state().is_modified());
    assert_eq!(
        store.state().current_file().map(|f| f.snapshot.as_str()),
        Some("old")
    );
    assert_eq!(harness.inbox.levels(), vec![NoticeLevel::Error]);
}

#[tokio::test]
async fn export_writes_page_without_touching_session() {
    let harness = Harness::new(
        MemoryStorage::new(),
        ScriptedPicker::returning([Some("/x/notes.html")]),
        true,
    );
    let session = harness.session();
    let mut store = DocumentStore::new();
    store.load_document(FileIdentity::new("/x/notes.md", "a < b"), "a < b");
    store.set_content("a < b!");
    let generation = store.state().document_generation();

    let outcome = session.export_as_html(&store).await.unwrap();
    assert_eq!(outcome, SessionOutcome::Completed);

    let page = harness.storage.contents("/x/notes.html").unwrap();
    assert!(page.contains("<title>notes.md</title>"));
    assert!(page.contains("<pre>a &lt; b!</pre>"));
    assert!(store.state().is_modified());
    assert_eq!(store.state().document_generation(), generation);
    assert_eq!(harness.picker.save_names(), vec!["notes.html"]);
    assert_eq!(harness.inbox.levels(), vec![NoticeLevel::Info]);
}

#[tokio::test]
async fn working_directory_is_listed_into_file_tree() {
    let storage = MemoryStorage::new()
        .with_file("/notes/b.md", "")
        .with_file("/notes/a.md", "");
    let harness = Harness::new(storage, ScriptedPicker::returning([Some("/notes")]), true);
    harness
        .storage
        .create_directory(Path::new("/notes/drafts"))
        .await
        .unwrap();

    let session = harness.session();
    let mut store = DocumentStore::new();
    session.open_working_directory(&mut store).await.unwrap();

    let names: Vec<_> = store
        .state()
        .file_tree()
        .iter()
        .map(|entry| (entry.name.as_str(), entry.is_directory))
        .collect();
    assert_eq!(names, vec![("drafts", true), ("a.md", false), ("b.md", false)]);
    assert_eq!(store.state().working_directory(), Some(Path::new("/notes")));
    assert_eq!(
        store.state().file_tree()[1].path,
        PathBuf::from("/notes/a.md")
    );
}

#[tokio::test]
async fn workbench_autosaves_after_quiet_window() {
    let storage = MemoryStorage::new().with_file("/x/a.md", "start");
    let harness = Harness::new(storage, ScriptedPicker::returning([Some("/x/a.md")]), true);
    let clock = ManualClock::new();
    let mut bench = Workbench::new(clock.clone(), DocumentStore::new(), harness.collaborators());

    bench
        .handle(WorkbenchEvent::File(FileAction::Open))
        .await
        .unwrap();
    bench
        .handle(WorkbenchEvent::EditorChanged("start, then more".into()))
        .await
        .unwrap();
    assert!(bench.store().state().is_modified());

    clock.advance(PREVIEW_DEBOUNCE);
    let report = bench.tick().await;
    assert!(report.preview_updated);
    assert_eq!(report.autosaved, None);
    assert_eq!(bench.store().state().preview_content(), "start, then more");

    clock.advance(AUTOSAVE_DEBOUNCE - PREVIEW_DEBOUNCE - Duration::from_millis(1));
    assert_eq!(bench.tick().await.autosaved, None);
    clock.advance(Duration::from_millis(1));
    assert_eq!(bench.tick().await.autosaved, Some(true));

    assert_eq!(
        harness.storage.contents("/x/a.md").as_deref(),
        Some("start, then more")
    );
    assert!(bench.autosave_status().last_saved.is_some());
    assert!(bench.store().state().is_modified());
    assert_eq!(bench.next_deadline(), None);
}

#[tokio::test]
async fn save_shortcut_on_untitled_buffer_asks_for_a_path() {
    let harness = Harness::new(
        MemoryStorage::new(),
        ScriptedPicker::returning([Some("/x/a.md")]),
        true,
    );
    let mut bench = Workbench::new(ManualClock::new(), DocumentStore::new(), harness.collaborators());

    bench
        .handle(WorkbenchEvent::EditorChanged("hello".into()))
        .await
        .unwrap();
    let outcome = bench
        .handle(WorkbenchEvent::Key(KeyChord::ctrl('s')))
        .await
        .unwrap();

    assert_eq!(outcome, Some(SessionOutcome::Completed));
    assert_eq!(harness.picker.save_names(), vec!["Untitled.md"]);
    assert_eq!(harness.storage.contents("/x/a.md").as_deref(), Some("hello"));
    let state = bench.store().state();
    assert_eq!(state.current_path(), Some(Path::new("/x/a.md")));
    assert!(!state.is_modified());
}

#[tokio::test]
async fn opening_recent_file_drops_pending_preview() {
    let storage = MemoryStorage::new()
        .with_file("/x/a.md", "# A")
        .with_file("/x/b.md", "# B");
    let harness = Harness::new(storage, ScriptedPicker::returning([Some("/x/a.md")]), true);
    let clock = ManualClock::new();
    let mut bench = Workbench::new(clock.clone(), DocumentStore::new(), harness.collaborators());

    bench
        .handle(WorkbenchEvent::File(FileAction::Open))
        .await
        .unwrap();
    bench
        .handle(WorkbenchEvent::EditorChanged("# A, edited".into()))
        .await
        .unwrap();
    let outcome = bench
        .handle(WorkbenchEvent::File(FileAction::OpenRecent(PathBuf::from(
            "/x/b.md",
        ))))
        .await
        .unwrap();
    assert_eq!(outcome, Some(SessionOutcome::Completed));

    clock.advance(PREVIEW_DEBOUNCE);
    assert!(!bench.tick().await.preview_updated);
    let state = bench.store().state();
    assert_eq!(state.content(), "# B");
    assert_eq!(state.preview_content(), "# B");
    assert_eq!(state.current_path(), Some(Path::new("/x/b.md")));
    assert!(!state.is_modified());
}

#[tokio::test]
async fn shortcuts_dispatch_commands_and_persist_preferences() {
    let harness = Harness::new(MemoryStorage::new(), ScriptedPicker::returning([]), true);
    let preferences = MemoryPreferences::new();
    let store = DocumentStore::with_preferences(Box::new(preferences.clone()));
    let mut bench = Workbench::new(ManualClock::new(), store, harness.collaborators());

    bench
        .handle(WorkbenchEvent::Key(KeyChord::ctrl('2')))
        .await
        .unwrap();
    bench
        .handle(WorkbenchEvent::Key(KeyChord::ctrl_alt('t')))
        .await
        .unwrap();

    assert_eq!(bench.store().state().layout(), Layout::Split);
    assert_eq!(bench.store().state().theme(), Theme::Midnight);

    let mut reloaded = preferences.clone();
    let stored = reloaded.load().unwrap();
    assert_eq!(stored.layout, Layout::Split);
    assert_eq!(stored.theme, Theme::Midnight);
}
