//! Contracts for everything outside the session core: storage, dialogs,
//! rendering and user notifications.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

/// 儲存操作的錯誤。 / Failure reported by a storage collaborator.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{path} does not exist")]
    NotFound { path: PathBuf },
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{path} is not valid text in any supported encoding")]
    InvalidEncoding { path: PathBuf },
    #[error("storage rejected the request for {path}: {reason}")]
    Rejected { path: PathBuf, reason: String },
}

impl StorageError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            StorageError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            StorageError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}

/// 目錄清單中的項目。 / One entry returned by [`Storage::list_directory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_directory: bool,
}

/// 檔案儲存協作者。 / Asynchronous file storage.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn read_file(&self, path: &Path) -> Result<String, StorageError>;

    async fn write_file(&self, path: &Path, contents: &str) -> Result<(), StorageError>;

    async fn list_directory(&self, path: &Path) -> Result<Vec<DirEntry>, StorageError>;

    async fn exists(&self, path: &Path) -> bool;

    async fn create_file(&self, path: &Path, contents: &str) -> Result<(), StorageError>;

    async fn create_directory(&self, path: &Path) -> Result<(), StorageError>;

    async fn delete(&self, path: &Path) -> Result<(), StorageError>;
}

/// 檔案對話框的篩選條件。 / Filter shown in a file dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileFilter {
    pub name: &'static str,
    pub extensions: &'static [&'static str],
}

pub const OPEN_FILTERS: &[FileFilter] = &[
    FileFilter {
        name: "Markdown",
        extensions: &["md", "markdown", "mdown", "mkd", "mdx"],
    },
    FileFilter {
        name: "Text",
        extensions: &["txt"],
    },
    FileFilter {
        name: "All",
        extensions: &["*"],
    },
];

pub const SAVE_FILTERS: &[FileFilter] = &[
    FileFilter {
        name: "Markdown",
        extensions: &["md"],
    },
    FileFilter {
        name: "Text",
        extensions: &["txt"],
    },
];

pub const HTML_FILTERS: &[FileFilter] = &[FileFilter {
    name: "HTML",
    extensions: &["html"],
}];

#[derive(Debug, Error)]
#[error("file dialog failed: {0}")]
pub struct PickerError(pub String);

/// 原生檔案對話框；`None` 表示使用者取消。 / Native file dialogs; `None` means the user cancelled.
#[async_trait]
pub trait FilePicker: Send + Sync {
    async fn pick_open_path(&self, filters: &[FileFilter]) -> Result<Option<PathBuf>, PickerError>;

    async fn pick_save_path(
        &self,
        default_name: &str,
        filters: &[FileFilter],
    ) -> Result<Option<PathBuf>, PickerError>;

    async fn pick_directory(&self) -> Result<Option<PathBuf>, PickerError>;
}

/// 將 Markdown 轉為 HTML；不得修改工作階段。 / Converts markdown to HTML without touching session state.
pub trait Renderer: Send + Sync {
    fn render_to_html(&self, markdown: &str) -> String;
}

/// 未儲存變更時向使用者確認。 / Asks the user to confirm discarding unsaved changes.
#[async_trait]
pub trait Confirmation: Send + Sync {
    async fn confirm(&self, message: &str) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// 顯示給使用者的訊息。 / Message surfaced to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}
