//! The editing session wired together around one clock.
//!
//! A host feeds [`WorkbenchEvent`]s in and calls [`Workbench::tick`] whenever
//! [`Workbench::next_deadline`] passes. All debounced work (preview refresh,
//! autosave) runs from `tick`, so a test driving a
//! [`ManualClock`](crate::timing::ManualClock) sees exactly the same sequence
//! as a real event loop.

use std::time::Instant;

use tokio::sync::watch;
use tracing::debug;

use crate::autosave::{AutosavePipeline, AutosaveStatus};
use crate::content_sync::ContentSync;
use crate::document::CursorPosition;
use crate::keymap::{Action, FileAction, KeyChord, Keymap};
use crate::scroll_sync::{ScrollMetrics, ScrollSurface, ScrollSyncCoordinator, Surface};
use crate::session::{Collaborators, FileSession, SessionError, SessionOutcome};
use crate::store::{Command, DocumentStore};
use crate::timing::Clock;

#[derive(Debug, Clone, PartialEq)]
pub enum WorkbenchEvent {
    EditorChanged(String),
    CursorMoved(CursorPosition),
    Scrolled {
        surface: Surface,
        metrics: ScrollMetrics,
    },
    Command(Command),
    File(FileAction),
    Key(KeyChord),
}

/// `tick` 期間完成的工作。 / Work performed by one [`Workbench::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    pub preview_updated: bool,
    /// `Some(true)` 表示自動儲存成功。 / `Some(success)` when an autosave write ran.
    pub autosaved: Option<bool>,
}

#[derive(Debug)]
pub struct Workbench<C: Clock> {
    clock: C,
    store: DocumentStore,
    content: ContentSync,
    scroll: ScrollSyncCoordinator,
    autosave: AutosavePipeline,
    session: FileSession,
    keymap: Keymap,
}

impl<C: Clock> Workbench<C> {
    pub fn new(clock: C, store: DocumentStore, collaborators: Collaborators) -> Self {
        let mut autosave = AutosavePipeline::default();
        autosave.observe(store.state(), clock.now());
        Self {
            clock,
            store,
            content: ContentSync::default(),
            scroll: ScrollSyncCoordinator::default(),
            autosave,
            session: FileSession::new(collaborators),
            keymap: Keymap::default(),
        }
    }

    pub fn with_pipelines(
        mut self,
        content: ContentSync,
        scroll: ScrollSyncCoordinator,
        autosave: AutosavePipeline,
    ) -> Self {
        self.content = content;
        self.scroll = scroll;
        self.autosave = autosave;
        self.autosave.observe(self.store.state(), self.clock.now());
        self
    }

    pub fn with_keymap(mut self, keymap: Keymap) -> Self {
        self.keymap = keymap;
        self
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// 供訂閱使用；狀態修改仍應透過事件。 / For subscriptions; mutations should still go through events.
    pub fn store_mut(&mut self) -> &mut DocumentStore {
        &mut self.store
    }

    pub fn session(&self) -> &FileSession {
        &self.session
    }

    pub fn attach_surface(&mut self, which: Surface, surface: Box<dyn ScrollSurface>) {
        self.scroll.attach(which, surface);
    }

    pub fn detach_surface(&mut self, which: Surface) -> Option<Box<dyn ScrollSurface>> {
        self.scroll.detach(which)
    }

    pub fn autosave_status(&self) -> AutosaveStatus {
        self.autosave.status()
    }

    pub fn watch_autosave(&self) -> watch::Receiver<AutosaveStatus> {
        self.autosave.subscribe()
    }

    /// 處理事件；檔案動作回傳其結果。 / Handles one event; file actions report their outcome.
    pub async fn handle(
        &mut self,
        event: WorkbenchEvent,
    ) -> Result<Option<SessionOutcome>, SessionError> {
        let now = self.clock.now();
        let result = match event {
            WorkbenchEvent::EditorChanged(text) => {
                self.content.on_editor_change(&mut self.store, &text, now);
                Ok(None)
            }
            WorkbenchEvent::CursorMoved(position) => {
                self.store.set_cursor_position(position);
                Ok(None)
            }
            WorkbenchEvent::Scrolled { surface, metrics } => {
                self.scroll
                    .on_scroll(self.store.state(), surface, metrics, now);
                Ok(None)
            }
            WorkbenchEvent::Command(command) => {
                self.store.dispatch(command);
                Ok(None)
            }
            WorkbenchEvent::File(action) => self.run_file_action(action).await.map(Some),
            WorkbenchEvent::Key(chord) => match self.keymap.resolve(&chord).cloned() {
                Some(Action::Store(command)) => {
                    self.store.dispatch(command);
                    Ok(None)
                }
                Some(Action::File(action)) => self.run_file_action(action).await.map(Some),
                None => {
                    debug!(%chord, "unbound key");
                    Ok(None)
                }
            },
        };
        self.autosave.observe(self.store.state(), self.clock.now());
        result
    }

    /// 執行所有到期的延遲工作。 / Runs whatever debounced work is due.
    pub async fn tick(&mut self) -> TickReport {
        let now = self.clock.now();
        let preview_updated = self.content.poll(&mut self.store, now);
        self.autosave.observe(self.store.state(), now);
        let autosaved = match self.autosave.take_due(now) {
            Some(job) => {
                let storage = self.session.storage().clone();
                Some(self.autosave.run(job, storage.as_ref()).await)
            }
            None => None,
        };
        TickReport {
            preview_updated,
            autosaved,
        }
    }

    /// 下一次需要呼叫 `tick` 的時間。 / Earliest instant at which `tick` has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.content.deadline(), self.autosave.deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    async fn run_file_action(&mut self, action: FileAction) -> Result<SessionOutcome, SessionError> {
        let generation = self.store.state().document_generation();
        let replaces_document = matches!(
            action,
            FileAction::New | FileAction::Open | FileAction::OpenRecent(_)
        );
        let outcome = match action {
            FileAction::New => self.session.new_file(&mut self.store).await,
            FileAction::Open => self.session.open_file(&mut self.store).await,
            FileAction::OpenRecent(path) => {
                self.session.open_recent_file(&mut self.store, &path).await
            }
            FileAction::Save => self.session.save_file(&mut self.store).await,
            FileAction::SaveAs => self.session.save_as_file(&mut self.store).await,
            FileAction::ExportHtml => self.session.export_as_html(&self.store).await,
            FileAction::OpenFolder => self.session.open_working_directory(&mut self.store).await,
        };
        if replaces_document && self.store.state().document_generation() != generation {
            // A pending preview belongs to the document that was replaced.
            self.content.cancel();
        }
        outcome
    }
}
