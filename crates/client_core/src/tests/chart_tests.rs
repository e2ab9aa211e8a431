use super::*;
use crate::test_support::RecordingBackend;

fn figures_with(income: &[(Month, f64)], expense: &[(Month, f64)]) -> MonthlyFigures {
    let mut figures = MonthlyFigures::default();
    for (month, value) in income {
        figures.income[month.index()] = *value;
    }
    for (month, value) in expense {
        figures.expense[month.index()] = *value;
    }
    figures
}

#[test]
fn first_upsert_builds_bar_chart_with_fixed_config() {
    let backend = RecordingBackend::new();
    let mut presenter = ChartPresenter::new(backend.clone());
    let figures = figures_with(&[(Month::January, 1200.0)], &[(Month::January, 300.0)]);
    presenter.upsert_bar_chart(&figures);

    let record = backend.record(MONTHLY_CHART_CANVAS).expect("bar chart");
    let config = &record.config;
    assert_eq!(config.kind, ChartKind::Bar);
    assert_eq!(config.data.labels.len(), 12);
    assert_eq!(config.data.labels[0], "January");
    assert_eq!(config.data.datasets[0].label.as_deref(), Some("Income"));
    assert_eq!(config.data.datasets[1].label.as_deref(), Some("Expense"));
    assert_eq!(
        config.data.datasets[0].background_color,
        Colors::Single(INCOME_FILL.into())
    );
    let axis = &config.options.scales.as_ref().expect("scales").y;
    assert!(axis.begin_at_zero);
    assert_eq!(axis.suggested_max, 50_000.0);
    assert_eq!(record.datasets[0][0], 1200.0);
}

#[test]
fn later_upserts_mutate_in_place_without_rebuilding() {
    let backend = RecordingBackend::new();
    let mut presenter = ChartPresenter::new(backend.clone());
    presenter.refresh(&MonthlyFigures::default());
    assert_eq!(backend.created(), 2);

    let figures = figures_with(&[(Month::May, 500.0)], &[(Month::May, 125.0)]);
    presenter.refresh(&figures);
    presenter.refresh(&figures);

    assert_eq!(backend.created(), 2);
    let bar = backend.record(MONTHLY_CHART_CANVAS).expect("bar");
    assert_eq!(bar.updates, 2);
    assert_eq!(bar.datasets[0][4], 500.0);
    assert_eq!(bar.datasets[1][4], 125.0);

    let pie = backend.record(TOTALS_PIE_CHART_CANVAS).expect("pie");
    assert_eq!(pie.updates, 2);
    assert_eq!(pie.datasets[0], vec![500.0, 125.0]);
}

#[test]
fn pie_config_has_bottom_legend_and_borders() {
    let backend = RecordingBackend::new();
    let mut presenter = ChartPresenter::new(backend.clone());
    presenter.upsert_pie_chart(&MonthlyFigures::default().series());

    let config = backend.record(TOTALS_PIE_CHART_CANVAS).expect("pie").config;
    assert_eq!(config.kind, ChartKind::Pie);
    assert_eq!(config.data.labels, vec!["Income", "Expense"]);
    let legend = config.options.plugins.legend.expect("legend");
    assert_eq!(legend.position, LegendPosition::Bottom);
    assert_eq!(config.data.datasets[0].border_width, Some(1));
    assert_eq!(config.options.plugins.tooltip, TooltipStyle::ShareOfTotal);
}

#[test]
fn config_serializes_in_charting_library_shape() {
    let value = serde_json::to_value(monthly_bar_config(&MonthlyFigures::default())).expect("json");
    assert_eq!(value["type"], "bar");
    assert_eq!(value["options"]["maintainAspectRatio"], false);
    assert_eq!(value["options"]["scales"]["y"]["beginAtZero"], true);
    assert_eq!(value["data"]["datasets"][1]["backgroundColor"], EXPENSE_FILL);

    let pie = serde_json::to_value(totals_pie_config(&MonthlyFigures::default().series()))
        .expect("json");
    assert_eq!(pie["options"]["plugins"]["legend"]["position"], "bottom");
    assert_eq!(pie["data"]["datasets"][0]["borderColor"][1], EXPENSE_BORDER);
}

#[test]
fn missing_library_or_canvas_is_silently_skipped() {
    let backend = RecordingBackend::without_library();
    let mut presenter = ChartPresenter::new(backend.clone());
    presenter.refresh(&MonthlyFigures::default());
    presenter.resize();
    assert!(!presenter.has_bar_chart());
    assert!(!presenter.has_pie_chart());
    assert!(presenter.capture().is_none());
    assert_eq!(backend.created(), 0);

    let backend = RecordingBackend::without_canvas(TOTALS_PIE_CHART_CANVAS);
    let mut presenter = ChartPresenter::new(backend.clone());
    presenter.refresh(&MonthlyFigures::default());
    assert!(presenter.has_bar_chart());
    assert!(!presenter.has_pie_chart());
    assert!(presenter.capture().is_none());
}

#[test]
fn resize_touches_every_existing_chart() {
    let backend = RecordingBackend::new();
    let mut presenter = ChartPresenter::new(backend.clone());
    presenter.refresh(&MonthlyFigures::default());
    presenter.resize();
    assert_eq!(backend.record(MONTHLY_CHART_CANVAS).expect("bar").resizes, 1);
    assert_eq!(backend.record(TOTALS_PIE_CHART_CANVAS).expect("pie").resizes, 1);
}

#[test]
fn dropping_presenter_destroys_its_charts() {
    let backend = RecordingBackend::new();
    {
        let mut presenter = ChartPresenter::new(backend.clone());
        presenter.refresh(&MonthlyFigures::default());
    }
    assert!(backend.record(MONTHLY_CHART_CANVAS).expect("bar").destroyed);
    assert!(backend.record(TOTALS_PIE_CHART_CANVAS).expect("pie").destroyed);
}

#[test]
fn capture_returns_png_data_urls_for_both_charts() {
    let backend = RecordingBackend::new();
    let mut presenter = ChartPresenter::new(backend);
    presenter.refresh(&MonthlyFigures::default());
    let images = presenter.capture().expect("images");
    assert!(images.monthly_chart.starts_with("data:image/png;base64,"));
    assert!(images.totals_pie_chart.starts_with("data:image/png;base64,"));
}

#[test]
fn tooltips_format_amounts_and_shares() {
    let backend = RecordingBackend::new();
    let mut presenter = ChartPresenter::new(backend);
    let figures = figures_with(
        &[(Month::January, 1500.0), (Month::February, 1500.0)],
        &[(Month::January, 1000.0)],
    );
    presenter.refresh(&figures);

    assert_eq!(
        presenter.bar_tooltip(0, Month::January).as_deref(),
        Some("Income: 1,500")
    );
    assert_eq!(
        presenter.bar_tooltip(1, Month::February).as_deref(),
        Some("Expense: 0")
    );
    assert_eq!(presenter.bar_tooltip(2, Month::January), None);
    assert_eq!(presenter.pie_tooltip(0).as_deref(), Some("Income: 3,000 (75.0%)"));
    assert_eq!(presenter.pie_tooltip(1).as_deref(), Some("Expense: 1,000 (25.0%)"));
}

#[test]
fn pie_tooltip_with_zero_totals_reports_zero_percent() {
    let mut presenter = ChartPresenter::new(RecordingBackend::new());
    presenter.refresh(&MonthlyFigures::default());
    assert_eq!(presenter.pie_tooltip(0).as_deref(), Some("Income: 0 (0.0%)"));
}

#[test]
fn format_amount_groups_and_trims() {
    assert_eq!(format_amount(0.0), "0");
    assert_eq!(format_amount(999.0), "999");
    assert_eq!(format_amount(1000.0), "1,000");
    assert_eq!(format_amount(50_000.0), "50,000");
    assert_eq!(format_amount(1_234_567.891), "1,234,567.89");
    assert_eq!(format_amount(12.5), "12.5");
    assert_eq!(format_amount(0.004), "0");
    assert_eq!(format_amount(-1234.5), "-1,234.5");
}
