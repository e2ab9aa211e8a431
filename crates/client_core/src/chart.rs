use serde::{Deserialize, Serialize};
use shared::domain::{ChartSeries, Month, MonthlyFigures, MAX_AMOUNT};
use tracing::debug;

pub const INCOME_LABEL: &str = "Income";
pub const EXPENSE_LABEL: &str = "Expense";
pub const INCOME_FILL: &str = "rgba(13,110,253,0.6)";
pub const EXPENSE_FILL: &str = "rgba(220,53,69,0.6)";
pub const INCOME_BORDER: &str = "#0d6efd";
pub const EXPENSE_BORDER: &str = "#dc3545";

pub const MONTHLY_CHART_CANVAS: &str = "monthlyChart";
pub const TOTALS_PIE_CHART_CANVAS: &str = "totalsPieChart";

const PNG_MIME: &str = "image/png";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Pie,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartConfig {
    #[serde(rename = "type")]
    pub kind: ChartKind,
    pub data: ChartData,
    pub options: ChartOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Colors {
    Single(String),
    PerItem(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub data: Vec<f64>,
    pub background_color: Colors,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_color: Option<Colors>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_width: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartOptions {
    pub responsive: bool,
    pub maintain_aspect_ratio: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scales: Option<Scales>,
    pub plugins: Plugins,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scales {
    pub y: Axis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Axis {
    pub begin_at_zero: bool,
    pub suggested_max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plugins {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legend: Option<Legend>,
    pub tooltip: TooltipStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Legend {
    pub position: LegendPosition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LegendPosition {
    Top,
    Bottom,
}

/// How tooltip labels are built; the text itself comes from
/// [`ChartPresenter::bar_tooltip`] and [`ChartPresenter::pie_tooltip`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TooltipStyle {
    DatasetValue,
    ShareOfTotal,
}

pub fn monthly_bar_config(figures: &MonthlyFigures) -> ChartConfig {
    ChartConfig {
        kind: ChartKind::Bar,
        data: ChartData {
            labels: Month::ALL.iter().map(|m| m.label().to_string()).collect(),
            datasets: vec![
                Dataset {
                    label: Some(INCOME_LABEL.into()),
                    data: figures.income.to_vec(),
                    background_color: Colors::Single(INCOME_FILL.into()),
                    border_color: None,
                    border_width: None,
                },
                Dataset {
                    label: Some(EXPENSE_LABEL.into()),
                    data: figures.expense.to_vec(),
                    background_color: Colors::Single(EXPENSE_FILL.into()),
                    border_color: None,
                    border_width: None,
                },
            ],
        },
        options: ChartOptions {
            responsive: true,
            maintain_aspect_ratio: false,
            scales: Some(Scales {
                y: Axis {
                    begin_at_zero: true,
                    suggested_max: MAX_AMOUNT,
                },
            }),
            plugins: Plugins {
                legend: None,
                tooltip: TooltipStyle::DatasetValue,
            },
        },
    }
}

pub fn totals_pie_config(series: &ChartSeries) -> ChartConfig {
    ChartConfig {
        kind: ChartKind::Pie,
        data: ChartData {
            labels: vec![INCOME_LABEL.into(), EXPENSE_LABEL.into()],
            datasets: vec![Dataset {
                label: None,
                data: series.totals().to_vec(),
                background_color: Colors::PerItem(vec![INCOME_FILL.into(), EXPENSE_FILL.into()]),
                border_color: Some(Colors::PerItem(vec![
                    INCOME_BORDER.into(),
                    EXPENSE_BORDER.into(),
                ])),
                border_width: Some(1),
            }],
        },
        options: ChartOptions {
            responsive: true,
            maintain_aspect_ratio: false,
            scales: None,
            plugins: Plugins {
                legend: Some(Legend {
                    position: LegendPosition::Bottom,
                }),
                tooltip: TooltipStyle::ShareOfTotal,
            },
        },
    }
}

/// The charting library. `create_chart` returns `None` when the canvas or the
/// library itself is not available; callers treat that as "nothing to draw".
pub trait ChartBackend: Send {
    type Handle: ChartHandle;

    fn create_chart(&mut self, canvas_id: &str, config: &ChartConfig) -> Option<Self::Handle>;
}

pub trait ChartHandle: Send {
    /// Replaces `datasets[dataset].data` in place.
    fn set_dataset_data(&mut self, dataset: usize, data: &[f64]);
    fn update(&mut self);
    fn resize(&mut self);
    fn to_data_url(&self, mime: &str) -> Option<String>;
    fn destroy(&mut self) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartImages {
    pub monthly_chart: String,
    pub totals_pie_chart: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartCanvases {
    pub monthly: String,
    pub totals: String,
}

impl Default for ChartCanvases {
    fn default() -> Self {
        Self {
            monthly: MONTHLY_CHART_CANVAS.into(),
            totals: TOTALS_PIE_CHART_CANVAS.into(),
        }
    }
}

/// Owns the bar and pie chart handles. Charts are built on first use and
/// afterwards only have their data swapped and redrawn.
pub struct ChartPresenter<B: ChartBackend> {
    backend: B,
    canvases: ChartCanvases,
    bar: Option<B::Handle>,
    pie: Option<B::Handle>,
    figures: MonthlyFigures,
    series: ChartSeries,
}

impl<B: ChartBackend> ChartPresenter<B> {
    pub fn new(backend: B) -> Self {
        Self::with_canvases(backend, ChartCanvases::default())
    }

    pub fn with_canvases(backend: B, canvases: ChartCanvases) -> Self {
        let figures = MonthlyFigures::default();
        let series = figures.series();
        Self {
            backend,
            canvases,
            bar: None,
            pie: None,
            figures,
            series,
        }
    }

    pub fn upsert_bar_chart(&mut self, figures: &MonthlyFigures) {
        self.figures = figures.clone();
        if let Some(chart) = self.bar.as_mut() {
            chart.set_dataset_data(0, &figures.income);
            chart.set_dataset_data(1, &figures.expense);
            chart.update();
            return;
        }

        let config = monthly_bar_config(figures);
        self.bar = self.backend.create_chart(&self.canvases.monthly, &config);
        if self.bar.is_none() {
            debug!(canvas = %self.canvases.monthly, "bar chart unavailable; skipping");
        }
    }

    pub fn upsert_pie_chart(&mut self, series: &ChartSeries) {
        self.series = series.clone();
        if let Some(chart) = self.pie.as_mut() {
            chart.set_dataset_data(0, &series.totals());
            chart.update();
            return;
        }

        let config = totals_pie_config(series);
        self.pie = self.backend.create_chart(&self.canvases.totals, &config);
        if self.pie.is_none() {
            debug!(canvas = %self.canvases.totals, "pie chart unavailable; skipping");
        }
    }

    pub fn refresh(&mut self, figures: &MonthlyFigures) {
        self.upsert_bar_chart(figures);
        self.upsert_pie_chart(&figures.series());
    }

    /// Re-measures both charts; needed once a hidden container becomes visible.
    pub fn resize(&mut self) {
        if let Some(chart) = self.bar.as_mut() {
            chart.resize();
        }
        if let Some(chart) = self.pie.as_mut() {
            chart.resize();
        }
    }

    /// PNG snapshots of both charts, or `None` unless both can be exported.
    pub fn capture(&self) -> Option<ChartImages> {
        let monthly_chart = self.bar.as_ref()?.to_data_url(PNG_MIME)?;
        let totals_pie_chart = self.pie.as_ref()?.to_data_url(PNG_MIME)?;
        Some(ChartImages {
            monthly_chart,
            totals_pie_chart,
        })
    }

    pub fn has_bar_chart(&self) -> bool {
        self.bar.is_some()
    }

    pub fn has_pie_chart(&self) -> bool {
        self.pie.is_some()
    }

    pub fn bar_chart(&self) -> Option<&B::Handle> {
        self.bar.as_ref()
    }

    pub fn pie_chart(&self) -> Option<&B::Handle> {
        self.pie.as_ref()
    }

    pub fn series(&self) -> &ChartSeries {
        &self.series
    }

    pub fn bar_tooltip(&self, dataset: usize, month: Month) -> Option<String> {
        let (label, values) = match dataset {
            0 => (INCOME_LABEL, &self.figures.income),
            1 => (EXPENSE_LABEL, &self.figures.expense),
            _ => return None,
        };
        Some(format!("{label}: {}", format_amount(values[month.index()])))
    }

    pub fn pie_tooltip(&self, slice: usize) -> Option<String> {
        let (label, value) = match slice {
            0 => (INCOME_LABEL, self.series.total_income),
            1 => (EXPENSE_LABEL, self.series.total_expense),
            _ => return None,
        };
        let pct = self.series.percent_of_total(value);
        Some(format!("{label}: {} ({pct:.1}%)", format_amount(value)))
    }
}

impl<B: ChartBackend> Drop for ChartPresenter<B> {
    fn drop(&mut self) {
        if let Some(chart) = self.bar.as_mut() {
            chart.destroy();
        }
        if let Some(chart) = self.pie.as_mut() {
            chart.destroy();
        }
    }
}

/// At most two fraction digits, trailing zeros dropped, thousands grouped with `,`.
pub fn format_amount(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    let negative = rounded < 0.0;
    let text = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = match text.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (text.as_str(), ""),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3 + 1);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let frac = frac_part.trim_end_matches('0');
    let sign = if negative { "-" } else { "" };
    if frac.is_empty() {
        format!("{sign}{grouped}")
    } else {
        format!("{sign}{grouped}.{frac}")
    }
}

#[cfg(test)]
#[path = "tests/chart_tests.rs"]
mod tests;
