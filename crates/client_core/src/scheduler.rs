use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tracing::debug;

use crate::event_loop::EventLoop;

type RefreshFn = Arc<dyn Fn() + Send + Sync>;

/// Coalesces refresh requests into at most one outstanding animation frame.
#[derive(Clone)]
pub struct UpdateScheduler {
    pending: Arc<AtomicBool>,
    event_loop: Arc<dyn EventLoop>,
    refresh: RefreshFn,
}

impl UpdateScheduler {
    pub fn new(event_loop: Arc<dyn EventLoop>, refresh: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            pending: Arc::new(AtomicBool::new(false)),
            event_loop,
            refresh: Arc::new(refresh),
        }
    }

    /// Returns `true` when this call scheduled a new frame, `false` when one
    /// was already pending.
    pub fn request_update(&self) -> bool {
        if self.pending.swap(true, Ordering::AcqRel) {
            return false;
        }

        let pending = self.pending.clone();
        let refresh = self.refresh.clone();
        self.event_loop.request_animation_frame(Box::new(move || {
            pending.store(false, Ordering::Release);
            refresh();
        }));
        debug!("chart refresh scheduled for next frame");
        true
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }
}

#[cfg(test)]
#[path = "tests/scheduler_tests.rs"]
mod tests;
