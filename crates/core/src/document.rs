use std::path::{Path, PathBuf};

use uuid::Uuid;

/// 預設的未命名文件名稱。 / Name shown for a buffer that has never been saved.
pub const UNTITLED_NAME: &str = "Untitled";

const MARKDOWN_EXTENSIONS: [&str; 4] = ["md", "markdown", "mdown", "mkd"];

/// 已開啟檔案的識別資訊與最後一次持久化的內容。 / Identity of an opened file plus its last persisted contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileIdentity {
    pub id: String,
    pub name: String,
    pub path: PathBuf,
    pub snapshot: String,
}

impl FileIdentity {
    /// 以路徑建立新的識別資訊，名稱取自檔名。 / Creates a fresh identity for a path; the name is its file name.
    pub fn new(path: impl Into<PathBuf>, snapshot: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            id: Uuid::new_v4().simple().to_string(),
            name: basename(&path),
            path,
            snapshot: snapshot.into(),
        }
    }

    /// 以新內容更新快照，保留識別碼。 / Returns a copy whose snapshot is replaced, keeping the id.
    pub fn with_snapshot(&self, snapshot: impl Into<String>) -> Self {
        Self {
            snapshot: snapshot.into(),
            ..self.clone()
        }
    }

    pub fn is_markdown(&self) -> bool {
        is_markdown(&self.path)
    }
}

/// 游標所在的行與欄（皆自 0 起算）。 / Zero-based caret location reported by the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CursorPosition {
    pub line: u32,
    pub column: u32,
}

impl CursorPosition {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// 檔案樹中的單一項目。 / One entry of the working-directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub name: String,
    pub path: PathBuf,
    pub is_directory: bool,
}

/// 取得路徑最後一段名稱（同時接受 `/` 與 `\`）。 / Last component of a path, splitting on both `/` and `\`.
pub fn basename(path: &Path) -> String {
    let raw = path.to_string_lossy();
    raw.rsplit(|c: char| c == '/' || c == '\\')
        .find(|segment| !segment.is_empty())
        .unwrap_or_default()
        .to_string()
}

pub fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            MARKDOWN_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// 匯出 HTML 時建議的檔名；非 Markdown 檔保留原名。 / Suggested file name for an HTML export of `current`.
/// A `.md`/`.markdown` suffix becomes `.html`; any other name is kept as is.
pub fn html_export_name(current: Option<&Path>) -> String {
    let Some(path) = current else {
        return "export.html".to_string();
    };
    let name = basename(path);
    let lower = name.to_ascii_lowercase();
    for suffix in [".markdown", ".md"] {
        if lower.ends_with(suffix) {
            return format!("{}.html", &name[..name.len() - suffix.len()]);
        }
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basename_handles_both_separators() {
        assert_eq!(basename(Path::new("/x/a.md")), "a.md");
        assert_eq!(basename(Path::new(r"C:\notes\b.md")), "b.md");
        assert_eq!(basename(Path::new("plain")), "plain");
    }

    #[test]
    fn identity_keeps_id_when_snapshot_changes() {
        let file = FileIdentity::new("/x/a.md", "one");
        let updated = file.with_snapshot("two");
        assert_eq!(file.id, updated.id);
        assert_eq!(updated.name, "a.md");
        assert_eq!(updated.snapshot, "two");
        assert!(updated.is_markdown());
    }

    #[test]
    fn export_name_replaces_markdown_suffix() {
        assert_eq!(html_export_name(Some(Path::new("/x/Notes.MD"))), "Notes.html");
        assert_eq!(html_export_name(Some(Path::new("/x/a.markdown"))), "a.html");
        assert_eq!(html_export_name(None), "export.html");
    }

    #[test]
    fn export_name_keeps_other_file_names() {
        assert_eq!(html_export_name(Some(Path::new("/x/a.txt"))), "a.txt");
        assert_eq!(html_export_name(Some(Path::new("/x/README"))), "README");
        assert_eq!(html_export_name(Some(Path::new("/x/notes.md.bak"))), "notes.md.bak");
    }
}
