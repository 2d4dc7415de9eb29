use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chardetng::EncodingDetector;
use encoding_rs::{Encoding as RsEncoding, UTF_16BE, UTF_16LE, UTF_8};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::collaborators::{DirEntry, Storage, StorageError};

/// 以 `tokio::fs` 實作的本機檔案儲存。 / Local filesystem storage backed by `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStorage;

impl LocalStorage {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn read_file(&self, path: &Path) -> Result<String, StorageError> {
        let bytes = fs::read(path)
            .await
            .map_err(|err| StorageError::io(path, err))?;
        let text = decode_text(&bytes).ok_or_else(|| StorageError::InvalidEncoding {
            path: path.to_path_buf(),
        })?;
        Ok(normalize_newlines(&text))
    }

    async fn write_file(&self, path: &Path, contents: &str) -> Result<(), StorageError> {
        let tmp_path = temp_sibling(path);
        if let Err(err) = write_synced(&tmp_path, contents.as_bytes()).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::io(&tmp_path, err));
        }
        fs::rename(&tmp_path, path)
            .await
            .map_err(|err| StorageError::io(path, err))?;
        debug!(path = %path.display(), bytes = contents.len(), "wrote file");
        Ok(())
    }

    async fn list_directory(&self, path: &Path) -> Result<Vec<DirEntry>, StorageError> {
        let mut dir = fs::read_dir(path)
            .await
            .map_err(|err| StorageError::io(path, err))?;
        let mut entries = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|err| StorageError::io(path, err))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(|err| StorageError::io(&entry.path(), err))?;
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_directory: file_type.is_dir(),
            });
        }
        sort_entries(&mut entries);
        Ok(entries)
    }

    async fn exists(&self, path: &Path) -> bool {
        fs::try_exists(path).await.unwrap_or(false)
    }

    async fn create_file(&self, path: &Path, contents: &str) -> Result<(), StorageError> {
        fs::write(path, contents.as_bytes())
            .await
            .map_err(|err| StorageError::io(path, err))
    }

    async fn create_directory(&self, path: &Path) -> Result<(), StorageError> {
        fs::create_dir_all(path)
            .await
            .map_err(|err| StorageError::io(path, err))
    }

    async fn delete(&self, path: &Path) -> Result<(), StorageError> {
        let metadata = fs::metadata(path)
            .await
            .map_err(|err| StorageError::io(path, err))?;
        let result = if metadata.is_dir() {
            fs::remove_dir_all(path).await
        } else {
            fs::remove_file(path).await
        };
        result.map_err(|err| StorageError::io(path, err))
    }
}

/// 目錄在前，其餘依名稱排序。 / Directories first, then by name.
pub fn sort_entries(entries: &mut [DirEntry]) {
    entries.sort_by(|a, b| {
        b.is_directory
            .cmp(&a.is_directory)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
}

/// 記憶體內的儲存實作，可模擬寫入失敗。 / In-memory storage with switchable write failures.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Mutex<MemoryFs>>,
}

#[derive(Debug, Default)]
struct MemoryFs {
    files: BTreeMap<PathBuf, String>,
    directories: BTreeSet<PathBuf>,
    fail_writes: bool,
    writes: usize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        self.lock().files.insert(path.into(), contents.into());
        self
    }

    pub fn contents(&self, path: impl AsRef<Path>) -> Option<String> {
        self.lock().files.get(path.as_ref()).cloned()
    }

    /// 成功寫入的次數。 / Number of successful writes.
    pub fn writes(&self) -> usize {
        self.lock().writes
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    fn lock(&self) -> MutexGuard<'_, MemoryFs> {
        self.inner.lock().unwrap_or_else(|poison| poison.into_inner())
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn read_file(&self, path: &Path) -> Result<String, StorageError> {
        self.lock()
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                path: path.to_path_buf(),
            })
    }

    async fn write_file(&self, path: &Path, contents: &str) -> Result<(), StorageError> {
        let mut state = self.lock();
        if state.fail_writes {
            return Err(StorageError::Rejected {
                path: path.to_path_buf(),
                reason: "writes are disabled".into(),
            });
        }
        state.files.insert(path.to_path_buf(), contents.to_string());
        state.writes += 1;
        Ok(())
    }

    async fn list_directory(&self, path: &Path) -> Result<Vec<DirEntry>, StorageError> {
        let state = self.lock();
        let child_name = |candidate: &PathBuf| {
            (candidate.parent() == Some(path))
                .then(|| candidate.file_name())
                .flatten()
                .map(|name| name.to_string_lossy().into_owned())
        };
        let mut entries: Vec<DirEntry> = state
            .directories
            .iter()
            .filter_map(|dir| child_name(dir))
            .map(|name| DirEntry {
                name,
                is_directory: true,
            })
            .chain(state.files.keys().filter_map(|file| child_name(file)).map(|name| {
                DirEntry {
                    name,
                    is_directory: false,
                }
            }))
            .collect();
        if entries.is_empty() && !state.directories.contains(path) {
            return Err(StorageError::NotFound {
                path: path.to_path_buf(),
            });
        }
        sort_entries(&mut entries);
        Ok(entries)
    }

    async fn exists(&self, path: &Path) -> bool {
        let state = self.lock();
        state.files.contains_key(path) || state.directories.contains(path)
    }

    async fn create_file(&self, path: &Path, contents: &str) -> Result<(), StorageError> {
        self.write_file(path, contents).await
    }

    async fn create_directory(&self, path: &Path) -> Result<(), StorageError> {
        let mut state = self.lock();
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            state.directories.insert(ancestor.to_path_buf());
        }
        Ok(())
    }

    async fn delete(&self, path: &Path) -> Result<(), StorageError> {
        let mut state = self.lock();
        let removed_file = state.files.remove(path).is_some();
        let removed_dir = state.directories.remove(path);
        if removed_dir {
            state.files.retain(|file, _| !file.starts_with(path));
            state.directories.retain(|dir| !dir.starts_with(path));
        }
        if removed_file || removed_dir {
            Ok(())
        } else {
            Err(StorageError::NotFound {
                path: path.to_path_buf(),
            })
        }
    }
}

/// 依 BOM、UTF-16 特徵、UTF-8、舊式編碼偵測的順序解碼。 / Decodes by BOM, then UTF-16 shape, then UTF-8, then legacy detection.
fn decode_text(bytes: &[u8]) -> Option<String> {
    if let Some((encoding, bom_len)) = RsEncoding::for_bom(bytes) {
        return decode_with(encoding, &bytes[bom_len..]);
    }
    if looks_like_utf16(bytes, false) {
        return decode_with(UTF_16LE, bytes);
    }
    if looks_like_utf16(bytes, true) {
        return decode_with(UTF_16BE, bytes);
    }
    if let Ok(text) = std::str::from_utf8(bytes) {
        return Some(text.to_owned());
    }
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let guess = detector.guess(None, true);
    if guess == UTF_8 {
        return None;
    }
    decode_with(guess, bytes)
}

fn decode_with(encoding: &'static RsEncoding, bytes: &[u8]) -> Option<String> {
    let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
    (!had_errors).then(|| text.into_owned())
}

fn looks_like_utf16(bytes: &[u8], big_endian: bool) -> bool {
    if bytes.len() < 2 || bytes.len() % 2 != 0 {
        return false;
    }
    let sample = &bytes[..bytes.len().min(64)];
    let pairs = sample.len() / 2;
    let zeros = sample
        .chunks_exact(2)
        .filter(|pair| if big_endian { pair[0] == 0 } else { pair[1] == 0 })
        .count();
    zeros * 2 >= pairs
}

fn normalize_newlines(input: &str) -> String {
    if !input.contains('\r') {
        return input.to_owned();
    }
    input.replace("\r\n", "\n").replace('\r', "\n")
}

/// 同目錄下的隱藏暫存檔，名稱含完整檔名。 / Hidden temp file beside `path`, named after the full file name.
fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.markzen-tmp"))
}

// 重新命名前先確保資料已寫入磁碟。 / Bytes must reach the disk before the rename.
async fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_storage_decodes_bom_and_normalizes_newlines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bom.md");
        std::fs::write(&path, b"\xEF\xBB\xBF# Title\r\nbody\r").unwrap();

        let text = LocalStorage::new().read_file(&path).await.unwrap();
        assert_eq!(text, "# Title\nbody\n");
    }

    #[tokio::test]
    async fn local_storage_reads_utf16_le_with_bom() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.md");
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "hi".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        std::fs::write(&path, bytes).unwrap();

        assert_eq!(LocalStorage::new().read_file(&path).await.unwrap(), "hi");
    }

    #[tokio::test]
    async fn local_storage_write_list_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new();
        storage
            .create_directory(&dir.path().join("zeta"))
            .await
            .unwrap();
        storage
            .write_file(&dir.path().join("alpha.md"), "a")
            .await
            .unwrap();
        storage
            .create_file(&dir.path().join("Beta.md"), "")
            .await
            .unwrap();

        let names: Vec<_> = storage
            .list_directory(dir.path())
            .await
            .unwrap()
            .into_iter()
            .map(|entry| entry.name)
            .collect();
        assert_eq!(names, vec!["zeta", "alpha.md", "Beta.md"]);

        storage.delete(&dir.path().join("zeta")).await.unwrap();
        assert!(!storage.exists(&dir.path().join("zeta")).await);
        assert!(storage.exists(&dir.path().join("alpha.md")).await);
    }

    #[tokio::test]
    async fn sibling_writes_do_not_share_a_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new();
        let markdown = dir.path().join("a.md");
        let page = dir.path().join("a.html");

        storage.write_file(&markdown, "# A").await.unwrap();
        storage.write_file(&page, "<p>A</p>").await.unwrap();
        storage.write_file(&markdown, "# A, again").await.unwrap();

        assert_eq!(std::fs::read_to_string(&markdown).unwrap(), "# A, again");
        assert_eq!(std::fs::read_to_string(&page).unwrap(), "<p>A</p>");
        let mut left: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        left.sort();
        assert_eq!(left, vec!["a.html", "a.md"]);
        assert_ne!(temp_sibling(&markdown), temp_sibling(&page));
    }

    #[tokio::test]
    async fn missing_file_maps_to_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = LocalStorage::new()
            .read_file(&dir.path().join("missing.md"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[tokio::test]
    async fn memory_storage_lists_children_and_fails_on_demand() {
        let storage = MemoryStorage::new().with_file("/notes/a.md", "a");
        storage.create_directory(Path::new("/notes/drafts")).await.unwrap();

        let entries = storage.list_directory(Path::new("/notes")).await.unwrap();
        assert_eq!(
            entries,
            vec![
                DirEntry {
                    name: "drafts".into(),
                    is_directory: true
                },
                DirEntry {
                    name: "a.md".into(),
                    is_directory: false
                },
            ]
        );

        storage.set_fail_writes(true);
        assert!(storage
            .write_file(Path::new("/notes/a.md"), "changed")
            .await
            .is_err());
        assert_eq!(storage.contents("/notes/a.md").as_deref(), Some("a"));
        assert_eq!(storage.writes(), 0);
    }

    #[test]
    fn legacy_bytes_fall_back_to_detection() {
        // "café" in windows-1252
        let bytes = b"caf\xE9 au lait";
        assert_eq!(decode_text(bytes).as_deref(), Some("café au lait"));
    }
}
