use serde::{Deserialize, Serialize};

/// Smallest accepted monthly amount.
pub const MIN_AMOUNT: f64 = 0.0;
/// Largest accepted monthly amount; also the bar chart's soft y-axis ceiling.
pub const MAX_AMOUNT: f64 = 50_000.0;

pub const MONTHS_PER_YEAR: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Month {
    January,
    February,
    March,
    April,
    May,
    June,
    July,
    August,
    September,
    October,
    November,
    December,
}

impl Month {
    pub const ALL: [Month; MONTHS_PER_YEAR] = [
        Month::January,
        Month::February,
        Month::March,
        Month::April,
        Month::May,
        Month::June,
        Month::July,
        Month::August,
        Month::September,
        Month::October,
        Month::November,
        Month::December,
    ];

    /// Lowercase key used in form field ids, e.g. `march`.
    pub fn key(self) -> &'static str {
        match self {
            Month::January => "january",
            Month::February => "february",
            Month::March => "march",
            Month::April => "april",
            Month::May => "may",
            Month::June => "june",
            Month::July => "july",
            Month::August => "august",
            Month::September => "september",
            Month::October => "october",
            Month::November => "november",
            Month::December => "december",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Month::January => "January",
            Month::February => "February",
            Month::March => "March",
            Month::April => "April",
            Month::May => "May",
            Month::June => "June",
            Month::July => "July",
            Month::August => "August",
            Month::September => "September",
            Month::October => "October",
            Month::November => "November",
            Month::December => "December",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Clamps into `[MIN_AMOUNT, MAX_AMOUNT]`; NaN and infinities become 0.
pub fn clamp_amount(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    value.clamp(MIN_AMOUNT, MAX_AMOUNT)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthlyEntry {
    pub month: Month,
    pub income: f64,
    pub expense: f64,
}

impl MonthlyEntry {
    pub fn new(month: Month, income: f64, expense: f64) -> Self {
        Self {
            month,
            income: clamp_amount(income),
            expense: clamp_amount(expense),
        }
    }
}

/// One sanitized snapshot of the twelve month-pairs on the form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyFigures {
    pub income: [f64; MONTHS_PER_YEAR],
    pub expense: [f64; MONTHS_PER_YEAR],
}

impl Default for MonthlyFigures {
    fn default() -> Self {
        Self {
            income: [0.0; MONTHS_PER_YEAR],
            expense: [0.0; MONTHS_PER_YEAR],
        }
    }
}

impl MonthlyFigures {
    pub fn from_entries(entries: impl IntoIterator<Item = MonthlyEntry>) -> Self {
        let mut figures = Self::default();
        for entry in entries {
            let idx = entry.month.index();
            figures.income[idx] = clamp_amount(entry.income);
            figures.expense[idx] = clamp_amount(entry.expense);
        }
        figures
    }

    pub fn entries(&self) -> impl Iterator<Item = MonthlyEntry> + '_ {
        Month::ALL.iter().map(move |&month| self.entry(month))
    }

    pub fn entry(&self, month: Month) -> MonthlyEntry {
        MonthlyEntry::new(month, self.income[month.index()], self.expense[month.index()])
    }

    pub fn series(&self) -> ChartSeries {
        ChartSeries::from_figures(self)
    }
}

/// Chart-ready view of the figures: both series plus their totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub income: Vec<f64>,
    pub expense: Vec<f64>,
    pub total_income: f64,
    pub total_expense: f64,
}

impl ChartSeries {
    pub fn from_figures(figures: &MonthlyFigures) -> Self {
        Self {
            income: figures.income.to_vec(),
            expense: figures.expense.to_vec(),
            total_income: figures.income.iter().sum(),
            total_expense: figures.expense.iter().sum(),
        }
    }

    pub fn totals(&self) -> [f64; 2] {
        [self.total_income, self.total_expense]
    }

    /// Share of `value` in the combined total, in percent. A zero total divides by 1.
    pub fn percent_of_total(&self, value: f64) -> f64 {
        let total = self.total_income + self.total_expense;
        let denominator = if total == 0.0 { 1.0 } else { total };
        value / denominator * 100.0
    }
}
