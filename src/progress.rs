// Progress reporting for uploads and downloads. The transfer code only
// sees `Progress` handles and never knows how (or whether) they render.
//
// Lifecycle: `ProgressReporter::open` returns a `ProgressGuard` which
// closes the display when dropped, so every exit path (success, error,
// panic unwinding) releases the terminal line.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Rendering side of a single transfer.
pub trait ProgressDisplay: Send + Sync {
    /// Advance by `delta` bytes.
    fn advance(&self, delta: u64);
    /// Stop rendering. Called exactly once per display.
    fn close(&self);
}

/// Creates a display for each transfer.
pub trait ProgressReporter: Send + Sync {
    /// `total` is `None` when the size is unknown (indeterminate mode).
    fn create(&self, total: Option<u64>, label: &str) -> Box<dyn ProgressDisplay>;

    /// Start tracking a transfer of `total` bytes.
    fn open(&self, total: Option<u64>, label: &str) -> ProgressGuard {
        ProgressGuard::new(self.create(total, label), total)
    }
}

struct State {
    display: Box<dyn ProgressDisplay>,
    total: Option<u64>,
    transferred: AtomicU64,
    closed: AtomicBool,
}

/// Shared handle to a running transfer. Cloning is cheap; all clones
/// update the same counter.
#[derive(Clone)]
pub struct Progress {
    state: Arc<State>,
}

impl Progress {
    /// Record `delta` more bytes. The running count never exceeds the known
    /// total, and updates after `close` are ignored.
    pub fn update(&self, delta: u64) {
        if delta == 0 || self.state.closed.load(Ordering::Acquire) {
            return;
        }
        let total = self.state.total;
        let previous = self
            .state
            .transferred
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                let next = current.saturating_add(delta);
                Some(total.map_or(next, |t| next.min(t)))
            })
            .unwrap_or_else(|current| current);
        let next = previous.saturating_add(delta);
        let applied = total.map_or(next, |t| next.min(t)) - previous;
        if applied > 0 {
            self.state.display.advance(applied);
        }
    }

    pub fn transferred(&self) -> u64 {
        self.state.transferred.load(Ordering::Acquire)
    }

    pub fn total(&self) -> Option<u64> {
        self.state.total
    }

    /// Stop rendering. Idempotent.
    pub fn close(&self) {
        if !self.state.closed.swap(true, Ordering::AcqRel) {
            self.state.display.close();
        }
    }
}

/// Owns a transfer's progress for the duration of one call and closes it
/// on drop.
pub struct ProgressGuard {
    progress: Progress,
}

impl ProgressGuard {
    pub fn new(display: Box<dyn ProgressDisplay>, total: Option<u64>) -> Self {
        ProgressGuard {
            progress: Progress {
                state: Arc::new(State {
                    display,
                    total,
                    transferred: AtomicU64::new(0),
                    closed: AtomicBool::new(false),
                }),
            },
        }
    }

    /// A handle for code that must outlive a borrow, such as a reader moved
    /// into the request body.
    pub fn handle(&self) -> Progress {
        self.progress.clone()
    }
}

impl std::ops::Deref for ProgressGuard {
    type Target = Progress;

    fn deref(&self) -> &Progress {
        &self.progress
    }
}

impl Drop for ProgressGuard {
    fn drop(&mut self) {
        self.progress.close();
    }
}

/// Terminal progress bars on stderr, sized in binary units (KiB, MiB).
#[derive(Debug, Clone, Copy, Default)]
pub struct BarReporter {
    hidden: bool,
}

impl BarReporter {
    pub fn new() -> Self {
        BarReporter { hidden: false }
    }

    /// Same bookkeeping, nothing drawn. Useful when stderr is not a terminal.
    pub fn hidden() -> Self {
        BarReporter { hidden: true }
    }

    fn bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        let style = ProgressStyle::with_template(
            "{msg} {percent:>3}%|{wide_bar}| {binary_bytes}/{binary_total_bytes} [{elapsed_precise}<{eta}, {binary_bytes_per_sec}]",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        pb
    }

    fn spinner() -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template(
            "{spinner} {msg} {binary_bytes} [{elapsed_precise}, {binary_bytes_per_sec}]",
        )
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
        pb.set_style(style);
        pb
    }
}

impl ProgressReporter for BarReporter {
    fn create(&self, total: Option<u64>, label: &str) -> Box<dyn ProgressDisplay> {
        let pb = match total {
            Some(t) => Self::bar(t),
            None => Self::spinner(),
        };
        if self.hidden {
            pb.set_draw_target(ProgressDrawTarget::hidden());
        } else {
            pb.set_draw_target(ProgressDrawTarget::stderr());
        }
        pb.set_message(label.to_string());
        Box::new(pb)
    }
}

impl ProgressDisplay for ProgressBar {
    fn advance(&self, delta: u64) {
        self.inc(delta);
    }

    fn close(&self) {
        self.finish();
    }
}
