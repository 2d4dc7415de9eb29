use std::time::{Duration, Instant};

use crate::store::DocumentStore;
use crate::timing::Debouncer;

/// 預覽更新的預設延遲。 / Default quiet window before the preview catches up.
pub const PREVIEW_DEBOUNCE: Duration = Duration::from_millis(300);

/// 編輯內容即時寫入，預覽內容延遲合併更新。 / Writes editor text immediately and coalesces preview updates.
#[derive(Debug, Clone)]
pub struct ContentSync {
    preview: Debouncer<String>,
}

impl Default for ContentSync {
    fn default() -> Self {
        Self::new(PREVIEW_DEBOUNCE)
    }
}

impl ContentSync {
    pub fn new(delay: Duration) -> Self {
        Self {
            preview: Debouncer::new(delay),
        }
    }

    pub fn on_editor_change(&mut self, store: &mut DocumentStore, text: &str, now: Instant) {
        store.set_content(text);
        self.preview.call(text.to_owned(), now);
    }

    /// 視窗關閉後更新預覽；有更新時回傳 `true`。 / Publishes the preview once due; returns `true` if it did.
    pub fn poll(&mut self, store: &mut DocumentStore, now: Instant) -> bool {
        match self.preview.poll(now) {
            Some(text) => {
                store.set_preview_content(text);
                true
            }
            None => false,
        }
    }

    pub fn flush(&mut self, store: &mut DocumentStore) -> bool {
        match self.preview.flush() {
            Some(text) => {
                store.set_preview_content(text);
                true
            }
            None => false,
        }
    }

    /// Drops a pending preview update, e.g. when a new document replaces the buffer.
    pub fn cancel(&mut self) {
        self.preview.cancel();
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.preview.deadline()
    }
}
