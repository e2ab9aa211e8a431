//! Deferral primitives the page core runs on: "before the next paint" and
//! "after the current dispatch".

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

use tokio::runtime::Handle;

use crate::lock;

pub type Callback = Box<dyn FnOnce() + Send + 'static>;

pub trait EventLoop: Send + Sync {
    /// Runs `callback` once, before the next frame is painted.
    fn request_animation_frame(&self, callback: Callback);

    /// Runs `callback` once, after the event currently being dispatched completes.
    fn queue_task(&self, callback: Callback);
}

/// Event loop driven by its owner: a UI toolkit calls [`ManualEventLoop::run_frame`]
/// once per paint and [`ManualEventLoop::run_tasks`] after each dispatched event.
#[derive(Clone, Default)]
pub struct ManualEventLoop {
    frames: Arc<Mutex<VecDeque<Callback>>>,
    tasks: Arc<Mutex<VecDeque<Callback>>>,
}

impl ManualEventLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the callbacks registered before this frame began. Callbacks that
    /// request another frame while running land in the next one.
    pub fn run_frame(&self) -> usize {
        let due: Vec<Callback> = lock(&self.frames).drain(..).collect();
        let count = due.len();
        for callback in due {
            callback();
        }
        count
    }

    pub fn run_tasks(&self) -> usize {
        let mut count = 0;
        loop {
            let next = lock(&self.tasks).pop_front();
            let Some(callback) = next else {
                return count;
            };
            callback();
            count += 1;
        }
    }

    pub fn pending_frames(&self) -> usize {
        lock(&self.frames).len()
    }

    pub fn pending_tasks(&self) -> usize {
        lock(&self.tasks).len()
    }
}

impl EventLoop for ManualEventLoop {
    fn request_animation_frame(&self, callback: Callback) {
        lock(&self.frames).push_back(callback);
    }

    fn queue_task(&self, callback: Callback) {
        lock(&self.tasks).push_back(callback);
    }
}

/// Event loop for non-UI targets: every deferral is a single spawned task on a
/// tokio runtime. Frames wait `frame_interval` (zero means "next scheduler turn").
#[derive(Clone)]
pub struct TokioEventLoop {
    handle: Handle,
    frame_interval: Duration,
}

impl TokioEventLoop {
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            frame_interval: Duration::ZERO,
        }
    }

    pub fn current() -> anyhow::Result<Self> {
        Ok(Self::new(Handle::try_current()?))
    }

    pub fn with_frame_interval(mut self, frame_interval: Duration) -> Self {
        self.frame_interval = frame_interval;
        self
    }
}

impl EventLoop for TokioEventLoop {
    fn request_animation_frame(&self, callback: Callback) {
        let interval = self.frame_interval;
        self.handle.spawn(async move {
            if interval.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(interval).await;
            }
            callback();
        });
    }

    fn queue_task(&self, callback: Callback) {
        self.handle.spawn(async move {
            tokio::task::yield_now().await;
            callback();
        });
    }
}

#[cfg(test)]
#[path = "tests/event_loop_tests.rs"]
mod tests;
