use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::collaborators::Storage;
use crate::store::SessionState;
use crate::timing::Debouncer;

/// 自動儲存的預設延遲。 / Default quiet window before an autosave write.
pub const AUTOSAVE_DEBOUNCE: Duration = Duration::from_millis(2000);

/// 待寫入的內容與目標路徑。 / Contents captured for one autosave write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutosaveJob {
    pub path: PathBuf,
    pub content: String,
}

/// 自動儲存狀態。 / Observable autosave status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutosaveStatus {
    pub is_saving: bool,
    pub last_saved: Option<DateTime<Utc>>,
}

/// 監看內容與路徑，延遲寫回已命名的文件。 / Watches content and path, writing titled documents back after a quiet window.
///
/// A successful write sets `last_saved` and leaves the session's modified
/// flag alone; only an explicit save clears it. Failures are logged and
/// never retried.
#[derive(Debug)]
pub struct AutosavePipeline {
    debouncer: Debouncer<AutosaveJob>,
    last_revision: u64,
    generation: u64,
    status: watch::Sender<AutosaveStatus>,
}

impl Default for AutosavePipeline {
    fn default() -> Self {
        Self::new(AUTOSAVE_DEBOUNCE)
    }
}

impl AutosavePipeline {
    pub fn new(delay: Duration) -> Self {
        let (status, _) = watch::channel(AutosaveStatus::default());
        Self {
            debouncer: Debouncer::new(delay),
            last_revision: 0,
            generation: 0,
            status,
        }
    }

    /// 觀察最新狀態並在內容變更時排程寫入。 / Inspects the latest state and schedules a write when the content changed.
    pub fn observe(&mut self, state: &SessionState, now: Instant) {
        if state.document_generation() != self.generation {
            if self.debouncer.is_pending() {
                debug!("document replaced, dropping pending autosave");
            }
            self.debouncer.cancel();
            self.generation = state.document_generation();
            self.last_revision = state.content_revision();
            return;
        }
        if state.content_revision() == self.last_revision {
            return;
        }
        self.last_revision = state.content_revision();

        match state.current_path() {
            Some(path) if !state.content().is_empty() => {
                self.debouncer.call(
                    AutosaveJob {
                        path: path.to_path_buf(),
                        content: state.content().to_owned(),
                    },
                    now,
                );
            }
            _ => self.debouncer.cancel(),
        }
    }

    pub fn take_due(&mut self, now: Instant) -> Option<AutosaveJob> {
        self.debouncer.poll(now)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// 執行一次寫入；成功時回傳 `true`。 / Performs one write and returns `true` on success.
    pub async fn run(&self, job: AutosaveJob, storage: &dyn Storage) -> bool {
        self.status.send_modify(|status| status.is_saving = true);
        match storage.write_file(&job.path, &job.content).await {
            Ok(()) => {
                let saved_at = Utc::now();
                self.status.send_modify(|status| {
                    status.is_saving = false;
                    status.last_saved = Some(saved_at);
                });
                info!(path = %job.path.display(), "autosaved");
                true
            }
            Err(err) => {
                self.status.send_modify(|status| status.is_saving = false);
                warn!(path = %job.path.display(), error = %err, "autosave failed");
                false
            }
        }
    }

    pub fn status(&self) -> AutosaveStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AutosaveStatus> {
        self.status.subscribe()
    }
}
