use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use shared::domain::{clamp_amount, Month, MonthlyFigures, MONTHS_PER_YEAR};

pub trait FieldSource: Send + Sync {
    fn field_text(&self, field_id: &str) -> Option<String>;
}

/// Field source backed by a shared map. Clones see the same fields.
#[derive(Debug, Clone, Default)]
pub struct InMemoryForm {
    fields: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, field_id: impl Into<String>, text: impl Into<String>) {
        let mut fields = self
            .fields
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        fields.insert(field_id.into(), text.into());
    }

    pub fn set_month(&self, month: Month, income: &str, expense: &str) {
        let fields = MonthFields::standard(month);
        self.set(fields.income, income);
        self.set(fields.expense, expense);
    }

    pub fn remove(&self, field_id: &str) {
        self.fields
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(field_id);
    }

    pub fn clear(&self) {
        self.fields
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clear();
    }
}

impl FieldSource for InMemoryForm {
    fn field_text(&self, field_id: &str) -> Option<String> {
        self.fields
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(field_id)
            .cloned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthFields {
    pub month: Month,
    pub income: String,
    pub expense: String,
}

impl MonthFields {
    /// `income-<month>` / `expense-<month>`, as laid out by the monthly form fragment.
    pub fn standard(month: Month) -> Self {
        Self {
            month,
            income: format!("income-{}", month.key()),
            expense: format!("expense-{}", month.key()),
        }
    }

    pub fn standard_layout() -> [MonthFields; MONTHS_PER_YEAR] {
        Month::ALL.map(Self::standard)
    }
}

pub struct FormModel<S> {
    source: S,
    fields: [MonthFields; MONTHS_PER_YEAR],
}

impl<S: FieldSource> FormModel<S> {
    pub fn new(source: S) -> Self {
        Self::with_fields(source, MonthFields::standard_layout())
    }

    /// Uses a custom id mapping. Entries are stored by their `month`, so the
    /// array order does not matter.
    pub fn with_fields(source: S, fields: [MonthFields; MONTHS_PER_YEAR]) -> Self {
        let mut ordered = MonthFields::standard_layout();
        for field in fields {
            let idx = field.month.index();
            ordered[idx] = field;
        }
        Self {
            source,
            fields: ordered,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn fields(&self) -> &[MonthFields; MONTHS_PER_YEAR] {
        &self.fields
    }

    /// Current form contents. Missing or garbage input reads as 0, everything
    /// is clamped into the accepted range.
    pub fn read(&self) -> MonthlyFigures {
        let mut figures = MonthlyFigures::default();
        for field in &self.fields {
            let idx = field.month.index();
            figures.income[idx] = parse_amount(self.source.field_text(&field.income).as_deref());
            figures.expense[idx] = parse_amount(self.source.field_text(&field.expense).as_deref());
        }
        figures
    }
}

pub fn parse_amount(text: Option<&str>) -> f64 {
    text.and_then(parse_leading_float)
        .map(clamp_amount)
        .unwrap_or(0.0)
}

/// Parses the longest numeric prefix of `text` after leading whitespace,
/// ignoring whatever follows (`"12.5kg"` is 12.5). `None` when there is no prefix.
pub fn parse_leading_float(text: &str) -> Option<f64> {
    let s = text.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }

    let int_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    let int_digits = end - int_start;

    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while bytes.get(frac_end).is_some_and(u8::is_ascii_digit) {
            frac_end += 1;
        }
        frac_digits = frac_end - frac_start;
        if int_digits > 0 || frac_digits > 0 {
            end = frac_end;
        }
    }

    if int_digits == 0 && frac_digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while bytes.get(exp_end).is_some_and(u8::is_ascii_digit) {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().ok()
}

#[cfg(test)]
#[path = "tests/form_model_tests.rs"]
mod tests;
