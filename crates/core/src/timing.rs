//! Deferred-execution primitives driven by explicit timestamps.
//!
//! Nothing here owns a timer thread. Callers pass the current [`Instant`]
//! (usually from a [`Clock`]) and poll for due work, so a test can move a
//! [`ManualClock`] forward and observe exactly which executions happen.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// 時間來源。 / Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// 使用系統單調時鐘。 / Wall-clock time from the OS monotonic clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// 手動推進的虛擬時鐘，複製後共享同一時間。 / Virtual clock advanced by hand; clones share one timeline.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::starting_at(Instant::now())
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(start: Instant) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// 將時間往前推進。 / Moves the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|poison| poison.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(|poison| poison.into_inner())
    }
}

#[derive(Debug, Clone)]
struct Pending<T> {
    deadline: Instant,
    value: T,
}

/// 去抖動器：每次呼叫都重新計時，只保留最後一次的值。 / Debounce: every call restarts the window and replaces the pending value.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<Pending<T>>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// 排程一次執行；先前尚未觸發的排程隨之作廢。 / Schedules `value`; any earlier pending value is discarded.
    pub fn call(&mut self, value: T, now: Instant) {
        self.pending = Some(Pending {
            deadline: now + self.delay,
            value,
        });
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|pending| pending.deadline)
    }

    pub fn pending(&self) -> Option<&T> {
        self.pending.as_ref().map(|pending| &pending.value)
    }

    /// 視窗已關閉時取出待執行的值。 / Takes the pending value once its quiet window has closed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some(pending) if pending.deadline <= now => self.pending.take().map(|p| p.value),
            _ => None,
        }
    }

    /// 立即取出待執行的值，不論期限。 / Takes the pending value immediately, ignoring the deadline.
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|pending| pending.value)
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

/// 節流器：每個間隔最多放行一次，第一次立即放行。 / Throttle: at most one admission per interval, the first one immediate.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    window_start: Option<Instant>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            window_start: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// 嘗試取得執行許可；成功時開啟新的節流視窗。 / Returns `true` and opens a new window when the call may run.
    pub fn try_acquire(&mut self, now: Instant) -> bool {
        match self.window_start {
            Some(start) if now.saturating_duration_since(start) < self.interval => false,
            _ => {
                self.window_start = Some(now);
                true
            }
        }
    }

    pub fn reset(&mut self) {
        self.window_start = None;
    }
}

/// 包裝函式的去抖動版本。 / A function wrapped in a [`Debouncer`].
pub struct Debounced<A, F>
where
    F: FnMut(A),
{
    inner: Debouncer<A>,
    func: F,
}

impl<A, F> Debounced<A, F>
where
    F: FnMut(A),
{
    pub fn new(func: F, delay: Duration) -> Self {
        Self {
            inner: Debouncer::new(delay),
            func,
        }
    }

    pub fn call(&mut self, args: A, now: Instant) {
        self.inner.call(args, now);
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline()
    }

    /// 若已到期則執行函式並回傳 `true`。 / Runs the function if its window has closed.
    pub fn fire_due(&mut self, now: Instant) -> bool {
        match self.inner.poll(now) {
            Some(args) => {
                (self.func)(args);
                true
            }
            None => false,
        }
    }
}

/// 包裝函式的節流版本。 / A function wrapped in a [`Throttle`].
pub struct Throttled<A, F>
where
    F: FnMut(A),
{
    throttle: Throttle,
    func: F,
    _args: std::marker::PhantomData<fn(A)>,
}

impl<A, F> Throttled<A, F>
where
    F: FnMut(A),
{
    pub fn new(func: F, interval: Duration) -> Self {
        Self {
            throttle: Throttle::new(interval),
            func,
            _args: std::marker::PhantomData,
        }
    }

    /// 在節流允許時執行；被丟棄時回傳 `false`。 / Runs immediately when admitted; returns `false` when dropped.
    pub fn call(&mut self, args: A, now: Instant) -> bool {
        if self.throttle.try_acquire(now) {
            (self.func)(args);
            true
        } else {
            false
        }
    }
}
