//! Proportional scroll mapping between the editor and the preview.
//!
//! A scroll on one surface is translated into the same relative position on
//! the other. The surface that started the scroll is marked as scrolling for a
//! short window before the write is issued, so the echo event produced by the
//! programmatic write on the target is dropped instead of bouncing back.

use std::fmt;
use std::time::{Duration, Instant};

use tracing::trace;

use crate::store::SessionState;
use crate::timing::Throttle;

/// 每個動畫影格最多同步一次。 / At most one update per animation frame.
pub const SCROLL_THROTTLE: Duration = Duration::from_millis(16);
/// 程式化捲動後忽略回音事件的時間。 / How long the echo of a programmatic scroll is ignored.
pub const SCROLL_SUPPRESSION: Duration = Duration::from_millis(100);

/// 捲動事件的量測值。 / Geometry carried by a scroll event.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollMetrics {
    pub scroll_top: f64,
    pub scroll_height: f64,
    pub client_height: f64,
}

impl ScrollMetrics {
    pub fn new(scroll_top: f64, scroll_height: f64, client_height: f64) -> Self {
        Self {
            scroll_top,
            scroll_height,
            client_height,
        }
    }

    /// 可捲動距離。 / Distance the surface can scroll.
    pub fn range(&self) -> f64 {
        self.scroll_height - self.client_height
    }

    /// 目前位置佔可捲動距離的比例，限制於 `[0, 1]`。 / Position as a fraction of the range, clamped to `[0, 1]`.
    pub fn ratio(&self) -> f64 {
        let range = self.range();
        if range <= 0.0 || !range.is_finite() {
            return 0.0;
        }
        (self.scroll_top / range).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Surface {
    Editor,
    Preview,
}

impl Surface {
    pub fn other(self) -> Self {
        match self {
            Surface::Editor => Surface::Preview,
            Surface::Preview => Surface::Editor,
        }
    }
}

/// 可被同步捲動的畫面。 / A scrollable view the coordinator can read and move.
pub trait ScrollSurface: Send {
    fn metrics(&self) -> ScrollMetrics;

    fn set_scroll_top(&mut self, scroll_top: f64);
}

#[derive(Default)]
struct Slot {
    surface: Option<Box<dyn ScrollSurface>>,
    scrolling_until: Option<Instant>,
}

impl Slot {
    fn is_scrolling(&self, now: Instant) -> bool {
        self.scrolling_until.map_or(false, |until| now < until)
    }
}

pub struct ScrollSyncCoordinator {
    editor: Slot,
    preview: Slot,
    throttle: Throttle,
    suppression: Duration,
}

impl fmt::Debug for ScrollSyncCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScrollSyncCoordinator")
            .field("editor_attached", &self.editor.surface.is_some())
            .field("preview_attached", &self.preview.surface.is_some())
            .field("suppression", &self.suppression)
            .finish()
    }
}

impl Default for ScrollSyncCoordinator {
    fn default() -> Self {
        Self::new(SCROLL_THROTTLE, SCROLL_SUPPRESSION)
    }
}

impl ScrollSyncCoordinator {
    pub fn new(throttle: Duration, suppression: Duration) -> Self {
        Self {
            editor: Slot::default(),
            preview: Slot::default(),
            throttle: Throttle::new(throttle),
            suppression,
        }
    }

    pub fn attach(&mut self, which: Surface, surface: Box<dyn ScrollSurface>) {
        let slot = self.slot_mut(which);
        slot.surface = Some(surface);
        slot.scrolling_until = None;
    }

    /// 卸載畫面並回傳原本的參照。 / Unmounts a surface, handing it back.
    pub fn detach(&mut self, which: Surface) -> Option<Box<dyn ScrollSurface>> {
        let slot = self.slot_mut(which);
        slot.scrolling_until = None;
        slot.surface.take()
    }

    pub fn is_attached(&self, which: Surface) -> bool {
        self.slot(which).surface.is_some()
    }

    pub fn is_scrolling(&self, which: Surface, now: Instant) -> bool {
        self.slot(which).is_scrolling(now)
    }

    /// 處理來自 `source` 的捲動事件，回傳寫入目標的位置。 / Handles a scroll on `source`; returns the position written to the other surface.
    pub fn on_scroll(
        &mut self,
        state: &SessionState,
        source: Surface,
        metrics: ScrollMetrics,
        now: Instant,
    ) -> Option<f64> {
        if !state.scroll_sync() {
            return None;
        }
        if !self.is_attached(Surface::Editor) || !self.is_attached(Surface::Preview) {
            return None;
        }
        let target = source.other();
        if self.slot(target).is_scrolling(now) {
            trace!(?source, "ignoring echo scroll");
            return None;
        }

        // Must be in place before the target is written.
        let until = now + self.suppression;
        self.slot_mut(source).scrolling_until = Some(until);

        if !self.throttle.try_acquire(now) {
            return None;
        }

        let ratio = metrics.ratio();
        let surface = self.slot_mut(target).surface.as_mut()?;
        let target_metrics = surface.metrics();
        let scroll_top = ratio * target_metrics.range().max(0.0);
        surface.set_scroll_top(scroll_top);
        trace!(?source, ratio, scroll_top, "synced scroll position");
        Some(scroll_top)
    }

    fn slot(&self, which: Surface) -> &Slot {
        match which {
            Surface::Editor => &self.editor,
            Surface::Preview => &self.preview,
        }
    }

    fn slot_mut(&mut self, which: Surface) -> &mut Slot {
        match which {
            Surface::Editor => &mut self.editor,
            Surface::Preview => &mut self.preview,
        }
    }
}
