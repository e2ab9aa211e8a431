use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::{
    chart::{ChartBackend, ChartImages, ChartPresenter},
    email_charts::{EmailChartsForm, EmailSubmitOutcome},
    event_loop::EventLoop,
    form_model::{FieldSource, FormModel},
    lock,
    scheduler::UpdateScheduler,
};

pub struct Dashboard<S, B: ChartBackend> {
    form: Arc<FormModel<S>>,
    presenter: Arc<Mutex<ChartPresenter<B>>>,
    scheduler: UpdateScheduler,
}

impl<S, B> Dashboard<S, B>
where
    S: FieldSource + 'static,
    B: ChartBackend + 'static,
{
    pub fn new(form: FormModel<S>, backend: B, event_loop: Arc<dyn EventLoop>) -> Self {
        let form = Arc::new(form);
        let presenter = Arc::new(Mutex::new(ChartPresenter::new(backend)));

        let refresh_form = form.clone();
        let refresh_presenter = presenter.clone();
        let scheduler = UpdateScheduler::new(event_loop, move || {
            let figures = refresh_form.read();
            lock(&refresh_presenter).refresh(&figures);
        });

        Self {
            form,
            presenter,
            scheduler,
        }
    }

    pub fn start(&self) {
        self.scheduler.request_update();
    }

    /// `input` events bubbling up from the budget form. Only events whose
    /// target is an input element trigger a redraw.
    pub fn on_form_input(&self, target_is_input: bool) {
        if !target_is_input {
            return;
        }
        self.scheduler.request_update();
    }

    /// The chart tab just became visible: charts drawn while hidden have no
    /// size yet.
    pub fn on_chart_tab_shown(&self) {
        self.scheduler.request_update();
        lock(&self.presenter).resize();
    }

    pub fn refresh_now(&self) {
        let figures = self.form.read();
        lock(&self.presenter).refresh(&figures);
    }

    pub fn capture_charts(&self) -> Option<ChartImages> {
        lock(&self.presenter).capture()
    }

    /// An invalid address stops before any chart work.
    pub async fn email_charts(&self, form: &mut EmailChartsForm, email: &str) -> EmailSubmitOutcome {
        if !form.check_address(email) {
            return EmailSubmitOutcome::InvalidAddress;
        }
        self.scheduler.request_update();
        self.refresh_now();
        let charts = self.capture_charts();
        debug!(captured = charts.is_some(), "captured charts for email");
        form.submit(email, charts).await
    }

    pub fn form(&self) -> &FormModel<S> {
        &self.form
    }

    pub fn presenter(&self) -> Arc<Mutex<ChartPresenter<B>>> {
        self.presenter.clone()
    }

    pub fn scheduler(&self) -> &UpdateScheduler {
        &self.scheduler
    }
}

#[cfg(test)]
#[path = "tests/dashboard_tests.rs"]
mod tests;
