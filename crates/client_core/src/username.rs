use std::sync::{Arc, Mutex};

use crate::{event_loop::EventLoop, lock};

pub const MIN_USERNAME_CHARS: usize = 8;
pub const VALID_FEEDBACK: &str = "Username looks good.";
pub const ACCEPTED_MESSAGE: &str = "Username accepted.";

/// First rule a username breaks, in the order the rules are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    TooShort,
    MissingUppercase,
    MissingLowercase,
    MissingSpecial,
}

impl InvalidReason {
    pub fn message(self) -> &'static str {
        match self {
            InvalidReason::TooShort => "Minimum 8 characters",
            InvalidReason::MissingUppercase => "Must contain at least one uppercase letter",
            InvalidReason::MissingLowercase => "Must contain at least one lowercase letter",
            InvalidReason::MissingSpecial => "Must contain at least one special character",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationResult {
    Valid,
    Invalid(InvalidReason),
}

impl ValidationResult {
    pub fn is_valid(self) -> bool {
        matches!(self, ValidationResult::Valid)
    }
}

pub fn validate_username(value: &str) -> ValidationResult {
    if value.chars().count() < MIN_USERNAME_CHARS {
        return ValidationResult::Invalid(InvalidReason::TooShort);
    }
    if !value.chars().any(|c| c.is_ascii_uppercase()) {
        return ValidationResult::Invalid(InvalidReason::MissingUppercase);
    }
    if !value.chars().any(|c| c.is_ascii_lowercase()) {
        return ValidationResult::Invalid(InvalidReason::MissingLowercase);
    }
    if !value.chars().any(|c| !c.is_ascii_alphanumeric()) {
        return ValidationResult::Invalid(InvalidReason::MissingSpecial);
    }
    ValidationResult::Valid
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackTone {
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldMarker {
    Valid,
    Invalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UsernameFieldState {
    #[default]
    Empty,
    Valid,
    Invalid(InvalidReason),
}

impl UsernameFieldState {
    pub fn from_text(text: &str) -> Self {
        if text.is_empty() {
            return UsernameFieldState::Empty;
        }
        match validate_username(text) {
            ValidationResult::Valid => UsernameFieldState::Valid,
            ValidationResult::Invalid(reason) => UsernameFieldState::Invalid(reason),
        }
    }

    pub fn feedback(self) -> &'static str {
        match self {
            UsernameFieldState::Empty => "",
            UsernameFieldState::Valid => VALID_FEEDBACK,
            UsernameFieldState::Invalid(reason) => reason.message(),
        }
    }

    pub fn tone(self) -> Option<FeedbackTone> {
        match self {
            UsernameFieldState::Empty => None,
            UsernameFieldState::Valid => Some(FeedbackTone::Success),
            UsernameFieldState::Invalid(_) => Some(FeedbackTone::Error),
        }
    }

    pub fn marker(self) -> Option<FieldMarker> {
        match self {
            UsernameFieldState::Empty => None,
            UsernameFieldState::Valid => Some(FieldMarker::Valid),
            UsernameFieldState::Invalid(_) => Some(FieldMarker::Invalid),
        }
    }

    pub fn submit_enabled(self) -> bool {
        self == UsernameFieldState::Valid
    }
}

pub trait UsernameView: Send {
    fn set_feedback(&mut self, text: &str, tone: Option<FeedbackTone>);
    fn set_marker(&mut self, marker: Option<FieldMarker>);
    fn set_submit_enabled(&mut self, enabled: bool);
    fn acknowledge(&mut self, message: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted,
    Ignored,
}

pub struct UsernameForm<V> {
    state: UsernameFieldState,
    view: V,
}

impl<V: UsernameView> UsernameForm<V> {
    pub fn new(view: V) -> Self {
        let mut form = Self {
            state: UsernameFieldState::Empty,
            view,
        };
        form.apply(UsernameFieldState::Empty);
        form
    }

    pub fn state(&self) -> UsernameFieldState {
        self.state
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn on_input(&mut self, text: &str) -> UsernameFieldState {
        self.apply(UsernameFieldState::from_text(text));
        self.state
    }

    /// Submission never leaves the page; a valid username is only acknowledged.
    pub fn on_submit(&mut self) -> SubmitOutcome {
        if self.state != UsernameFieldState::Valid {
            return SubmitOutcome::Ignored;
        }
        self.view.acknowledge(ACCEPTED_MESSAGE);
        SubmitOutcome::Accepted
    }

    pub fn clear(&mut self) {
        self.apply(UsernameFieldState::Empty);
    }

    fn apply(&mut self, state: UsernameFieldState) {
        self.state = state;
        self.view.set_marker(state.marker());
        self.view.set_feedback(state.feedback(), state.tone());
        self.view.set_submit_enabled(state.submit_enabled());
    }
}

/// Handles the form's `reset` event. The native reset has not cleared the
/// field yet while the event is dispatched, so the transition to `Empty` is
/// queued to run after the dispatch completes.
pub fn on_username_reset<V>(form: &Arc<Mutex<UsernameForm<V>>>, event_loop: &dyn EventLoop)
where
    V: UsernameView + 'static,
{
    let form = form.clone();
    event_loop.queue_task(Box::new(move || {
        lock(&form).clear();
    }));
}

#[cfg(test)]
#[path = "tests/username_tests.rs"]
mod tests;
