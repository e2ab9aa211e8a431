//! In-memory doubles shared by the unit tests.

use std::sync::{Arc, Mutex};

use crate::chart::{ChartBackend, ChartConfig, ChartHandle};

#[derive(Debug, Clone)]
pub(crate) struct ChartRecord {
    pub(crate) canvas: String,
    pub(crate) config: ChartConfig,
    pub(crate) datasets: Vec<Vec<f64>>,
    pub(crate) updates: usize,
    pub(crate) resizes: usize,
    pub(crate) destroyed: bool,
}

#[derive(Debug, Default)]
pub(crate) struct BackendLog {
    pub(crate) charts: Vec<ChartRecord>,
}

impl BackendLog {
    pub(crate) fn chart(&self, canvas: &str) -> Option<&ChartRecord> {
        self.charts.iter().find(|c| c.canvas == canvas)
    }
}

/// Chart backend that records every call. Canvases listed in `missing` (or
/// all of them when the library is unavailable) yield no chart.
#[derive(Clone, Default)]
pub(crate) struct RecordingBackend {
    pub(crate) log: Arc<Mutex<BackendLog>>,
    pub(crate) library_missing: bool,
    pub(crate) missing: Vec<String>,
}

impl RecordingBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn without_library() -> Self {
        Self {
            library_missing: true,
            ..Self::default()
        }
    }

    pub(crate) fn without_canvas(canvas: &str) -> Self {
        Self {
            missing: vec![canvas.to_string()],
            ..Self::default()
        }
    }

    pub(crate) fn created(&self) -> usize {
        self.log.lock().expect("log").charts.len()
    }

    pub(crate) fn record(&self, canvas: &str) -> Option<ChartRecord> {
        self.log.lock().expect("log").chart(canvas).cloned()
    }
}

impl ChartBackend for RecordingBackend {
    type Handle = RecordingChart;

    fn create_chart(&mut self, canvas_id: &str, config: &ChartConfig) -> Option<RecordingChart> {
        if self.library_missing || self.missing.iter().any(|c| c == canvas_id) {
            return None;
        }
        let mut log = self.log.lock().expect("log");
        log.charts.push(ChartRecord {
            canvas: canvas_id.to_string(),
            config: config.clone(),
            datasets: config.data.datasets.iter().map(|d| d.data.clone()).collect(),
            updates: 0,
            resizes: 0,
            destroyed: false,
        });
        Some(RecordingChart {
            index: log.charts.len() - 1,
            log: self.log.clone(),
        })
    }
}

pub(crate) struct RecordingChart {
    index: usize,
    log: Arc<Mutex<BackendLog>>,
}

impl RecordingChart {
    fn with_record<R>(&self, f: impl FnOnce(&mut ChartRecord) -> R) -> R {
        let mut log = self.log.lock().expect("log");
        f(&mut log.charts[self.index])
    }
}

impl ChartHandle for RecordingChart {
    fn set_dataset_data(&mut self, dataset: usize, data: &[f64]) {
        self.with_record(|record| record.datasets[dataset] = data.to_vec());
    }

    fn update(&mut self) {
        self.with_record(|record| record.updates += 1);
    }

    fn resize(&mut self) {
        self.with_record(|record| record.resizes += 1);
    }

    fn to_data_url(&self, mime: &str) -> Option<String> {
        self.with_record(|record| {
            let sum: f64 = record.datasets.iter().flatten().sum();
            Some(format!("data:{mime};base64,{}:{sum}", record.canvas))
        })
    }

    fn destroy(&mut self) {
        self.with_record(|record| record.destroyed = true);
    }
}
