//! Headless core of the Bucks2Bar budget page.
//!
//! Browser capabilities (form fields, the charting library, animation frames,
//! the task queue, script execution) sit behind traits so the page logic runs
//! and tests without a document.

use std::sync::{Mutex, MutexGuard, PoisonError};

pub mod chart;
pub mod dashboard;
pub mod email_charts;
pub mod event_loop;
pub mod form_model;
pub mod fragment;
pub mod scheduler;
pub mod username;

pub use chart::{ChartBackend, ChartConfig, ChartHandle, ChartImages, ChartPresenter};
pub use dashboard::Dashboard;
pub use email_charts::{ChartMailClient, EmailChartsForm, EmailSubmitOutcome, MailClientError};
pub use event_loop::{EventLoop, ManualEventLoop, TokioEventLoop};
pub use form_model::{FieldSource, FormModel, InMemoryForm, MonthFields};
pub use fragment::{FragmentContainer, FragmentFetcher, HttpFragmentFetcher, ScriptHost};
pub use scheduler::UpdateScheduler;
pub use username::{
    validate_username, UsernameFieldState, UsernameForm, UsernameView, ValidationResult,
};

// Poisoning only means an earlier callback panicked; the state is still usable.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
