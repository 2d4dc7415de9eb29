use std::collections::VecDeque;
use std::path::Path;

use crate::document::FileIdentity;

/// 最近檔案清單的預設容量。 / Default number of recent files kept.
pub const RECENT_FILES_CAPACITY: usize = 10;

/// 管理最近開啟檔案的清單，依路徑去重。 / Bounded most-recent-first list of files, unique by path.
#[derive(Debug, Clone)]
pub struct RecentFiles {
    capacity: usize,
    entries: VecDeque<FileIdentity>,
}

impl Default for RecentFiles {
    fn default() -> Self {
        Self::new(RECENT_FILES_CAPACITY)
    }
}

impl RecentFiles {
    /// 建立指定容量的清單。 / Creates a history list with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 加入或提升某個檔案至清單頂端。 / Inserts or promotes a file to the front of the list.
    pub fn add(&mut self, file: FileIdentity) {
        self.entries.retain(|existing| existing.path != file.path);
        self.entries.push_front(file);
        self.entries.truncate(self.capacity);
    }

    /// 移除指定路徑；若存在則回傳 `true`。 / Removes the given path and returns `true` if it existed.
    pub fn remove(&mut self, path: &Path) -> bool {
        let initial_len = self.entries.len();
        self.entries.retain(|existing| existing.path.as_path() != path);
        initial_len != self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileIdentity> {
        self.entries.iter()
    }

    pub fn front(&self) -> Option<&FileIdentity> {
        self.entries.front()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
