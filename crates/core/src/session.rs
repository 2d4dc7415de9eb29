//! File operations over the single open document.
//!
//! Every operation either advances the document as a whole (content, current
//! file, modified flag and recent list in one store update) or leaves it
//! untouched. I/O failures are reported through the [`Notifier`] and returned
//! to the caller; a declined confirmation or a cancelled dialog is a normal
//! [`SessionOutcome::Cancelled`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::collaborators::{
    Confirmation, FilePicker, Notice, Notifier, PickerError, Renderer, Storage, StorageError,
    HTML_FILTERS, OPEN_FILTERS, SAVE_FILTERS,
};
use crate::document::{html_export_name, FileIdentity, TreeEntry, UNTITLED_NAME};
use crate::render::html_document;
use crate::store::DocumentStore;

/// 捨棄未儲存變更前的確認訊息。 / Prompt shown before unsaved changes are discarded.
pub const DISCARD_CHANGES_PROMPT: &str = "You have unsaved changes. Discard them?";
/// 未命名文件另存時的預設檔名。 / Default file name proposed for an untitled buffer.
pub const DEFAULT_SAVE_NAME: &str = "Untitled.md";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Picker(#[from] PickerError),
}

/// 操作結果：完成或被使用者取消。 / Whether an operation ran to completion or was called off by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Completed,
    Cancelled,
}

/// 檔案操作所需的外部協作者。 / External collaborators used by file operations.
#[derive(Clone)]
pub struct Collaborators {
    pub storage: Arc<dyn Storage>,
    pub picker: Arc<dyn FilePicker>,
    pub renderer: Arc<dyn Renderer>,
    pub confirmation: Arc<dyn Confirmation>,
    pub notifier: Arc<dyn Notifier>,
}

/// 檔案工作階段管理器。 / Opens, saves, exports and resets the document held by a [`DocumentStore`].
#[derive(Clone)]
pub struct FileSession {
    collaborators: Collaborators,
}

impl std::fmt::Debug for FileSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSession").finish_non_exhaustive()
    }
}

impl FileSession {
    pub fn new(collaborators: Collaborators) -> Self {
        Self { collaborators }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.collaborators.storage
    }

    pub fn has_unsaved_changes(&self, store: &DocumentStore) -> bool {
        store.state().is_modified()
    }

    pub async fn open_file(&self, store: &mut DocumentStore) -> Result<SessionOutcome, SessionError> {
        if !self.may_discard(store).await {
            return Ok(SessionOutcome::Cancelled);
        }
        let picked = self
            .collaborators
            .picker
            .pick_open_path(OPEN_FILTERS)
            .await
            .map_err(|err| self.report(err.into(), "Could not open a file"))?;
        match picked {
            Some(path) => self.load(store, path).await,
            None => Ok(SessionOutcome::Cancelled),
        }
    }

    /// 直接開啟最近清單中的路徑。 / Opens a path from the recent list without a dialog.
    pub async fn open_recent_file(
        &self,
        store: &mut DocumentStore,
        path: &Path,
    ) -> Result<SessionOutcome, SessionError> {
        if !self.may_discard(store).await {
            return Ok(SessionOutcome::Cancelled);
        }
        self.load(store, path.to_path_buf()).await
    }

    pub async fn save_file(&self, store: &mut DocumentStore) -> Result<SessionOutcome, SessionError> {
        let Some(file) = store.state().current_file().cloned() else {
            return self.save_as_file(store).await;
        };
        let content = store.state().content().to_owned();
        self.write(&file.path, &content, "Failed to save file").await?;
        store.commit_save(file.with_snapshot(content));
        info!(path = %file.path.display(), "saved");
        Ok(SessionOutcome::Completed)
    }

    pub async fn save_as_file(
        &self,
        store: &mut DocumentStore,
    ) -> Result<SessionOutcome, SessionError> {
        let default_name = store
            .state()
            .current_file()
            .map(|file| file.name.clone())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_SAVE_NAME.to_string());
        let picked = self
            .collaborators
            .picker
            .pick_save_path(&default_name, SAVE_FILTERS)
            .await
            .map_err(|err| self.report(err.into(), "Could not choose where to save"))?;
        let Some(path) = picked else {
            debug!("save as cancelled");
            return Ok(SessionOutcome::Cancelled);
        };
        let content = store.state().content().to_owned();
        self.write(&path, &content, "Failed to save file").await?;
        info!(path = %path.display(), "saved as");
        store.commit_save(FileIdentity::new(path, content));
        Ok(SessionOutcome::Completed)
    }

    pub async fn new_file(&self, store: &mut DocumentStore) -> Result<SessionOutcome, SessionError> {
        if !self.may_discard(store).await {
            return Ok(SessionOutcome::Cancelled);
        }
        store.clear_document();
        Ok(SessionOutcome::Completed)
    }

    /// 匯出為 HTML；不改變工作階段狀態。 / Exports the content as an HTML page without touching session state.
    pub async fn export_as_html(
        &self,
        store: &DocumentStore,
    ) -> Result<SessionOutcome, SessionError> {
        let state = store.state();
        let default_name = html_export_name(state.current_path());
        let picked = self
            .collaborators
            .picker
            .pick_save_path(&default_name, HTML_FILTERS)
            .await
            .map_err(|err| self.report(err.into(), "Could not choose where to export"))?;
        let Some(path) = picked else {
            return Ok(SessionOutcome::Cancelled);
        };

        let title = state
            .current_file()
            .map(|file| file.name.as_str())
            .unwrap_or(UNTITLED_NAME);
        let body = self.collaborators.renderer.render_to_html(state.content());
        let page = html_document(title, &body);
        self.write(&path, &page, "Failed to export HTML").await?;
        self.collaborators
            .notifier
            .notify(Notice::info(format!("Exported to {}", path.display())));
        Ok(SessionOutcome::Completed)
    }

    /// 選擇工作目錄並載入檔案樹。 / Picks a working directory and lists it into the file tree.
    pub async fn open_working_directory(
        &self,
        store: &mut DocumentStore,
    ) -> Result<SessionOutcome, SessionError> {
        let picked = self
            .collaborators
            .picker
            .pick_directory()
            .await
            .map_err(|err| self.report(err.into(), "Could not choose a folder"))?;
        let Some(directory) = picked else {
            return Ok(SessionOutcome::Cancelled);
        };
        self.refresh_file_tree(store, directory).await
    }

    /// 重新列出目錄內容。 / Lists `directory` into the store's file tree.
    pub async fn refresh_file_tree(
        &self,
        store: &mut DocumentStore,
        directory: PathBuf,
    ) -> Result<SessionOutcome, SessionError> {
        let listing = self
            .collaborators
            .storage
            .list_directory(&directory)
            .await
            .map_err(|err| self.report(err.into(), "Could not read the folder"))?;
        let entries = listing
            .into_iter()
            .map(|entry| TreeEntry {
                path: directory.join(&entry.name),
                name: entry.name,
                is_directory: entry.is_directory,
            })
            .collect();
        store.set_working_directory(Some(directory));
        store.set_file_tree(entries);
        Ok(SessionOutcome::Completed)
    }

    async fn may_discard(&self, store: &DocumentStore) -> bool {
        if !store.state().is_modified() {
            return true;
        }
        let confirmed = self
            .collaborators
            .confirmation
            .confirm(DISCARD_CHANGES_PROMPT)
            .await;
        if !confirmed {
            debug!("discarding unsaved changes declined");
        }
        confirmed
    }

    async fn load(
        &self,
        store: &mut DocumentStore,
        path: PathBuf,
    ) -> Result<SessionOutcome, SessionError> {
        let content = self
            .collaborators
            .storage
            .read_file(&path)
            .await
            .map_err(|err| self.report(err.into(), "Failed to open file"))?;
        info!(path = %path.display(), bytes = content.len(), "opened");
        store.load_document(FileIdentity::new(path, content.clone()), content);
        Ok(SessionOutcome::Completed)
    }

    async fn write(&self, path: &Path, contents: &str, context: &str) -> Result<(), SessionError> {
        self.collaborators
            .storage
            .write_file(path, contents)
            .await
            .map_err(|err| self.report(err.into(), context))
    }

    fn report(&self, err: SessionError, context: &str) -> SessionError {
        warn!(error = %err, "{context}");
        self.collaborators
            .notifier
            .notify(Notice::error(format!("{context}: {err}")));
        err
    }
}
