pub mod autosave;
pub mod collaborators;
pub mod content_sync;
pub mod document;
pub mod keymap;
pub mod outline;
pub mod recent;
pub mod render;
pub mod scroll_sync;
pub mod session;
pub mod storage;
pub mod store;
pub mod timing;
pub mod workbench;

pub use autosave::{AutosaveJob, AutosavePipeline, AutosaveStatus, AUTOSAVE_DEBOUNCE};
pub use collaborators::{
    Confirmation, DirEntry, FileFilter, FilePicker, Notice, NoticeLevel, Notifier, PickerError,
    Renderer, Storage, StorageError, HTML_FILTERS, OPEN_FILTERS, SAVE_FILTERS,
};
pub use content_sync::{ContentSync, PREVIEW_DEBOUNCE};
pub use document::{
    basename, html_export_name, is_markdown, CursorPosition, FileIdentity, TreeEntry,
    UNTITLED_NAME,
};
pub use keymap::{Action, FileAction, Key, KeyChord, Keymap};
pub use outline::{document_title, slugify, table_of_contents, DocumentStats, Heading};
pub use recent::{RecentFiles, RECENT_FILES_CAPACITY};
pub use render::{escape_html, html_document, PreformattedRenderer};
pub use scroll_sync::{
    ScrollMetrics, ScrollSurface, ScrollSyncCoordinator, Surface, SCROLL_SUPPRESSION,
    SCROLL_THROTTLE,
};
pub use session::{
    Collaborators, FileSession, SessionError, SessionOutcome, DEFAULT_SAVE_NAME,
    DISCARD_CHANGES_PROMPT,
};
pub use storage::{LocalStorage, MemoryStorage};
pub use store::{
    window_title, Command, DocumentStore, PaneVisibility, SessionState, StoreEvent,
    SubscriptionId,
};
pub use timing::{Clock, Debounced, Debouncer, ManualClock, SystemClock, Throttle, Throttled};
pub use workbench::{TickReport, Workbench, WorkbenchEvent};
