use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveTime};

use super::error::DataResult;
use super::model::CellValue;
use super::view::View;

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

/// Single-value selector: either no constraint or one exact value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Filter {
    #[default]
    Any,
    Exactly(CellValue),
}

/// A calendar-date range intersected with a daily clock-time window.
/// Both ranges are inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateTimeWindow {
    pub date_column: String,
    pub time_column: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Value of `column` is one of `allowed`; an empty set selects nothing.
    Membership {
        column: String,
        allowed: BTreeSet<CellValue>,
    },
    Exact {
        column: String,
        filter: Filter,
    },
    DateTimeRange(DateTimeWindow),
    /// Row positions within the view the predicate is applied to, as
    /// reported by an interactive chart selection.
    Positions(Vec<usize>),
}

impl Predicate {
    pub fn apply<'a>(&self, view: &View<'a>) -> DataResult<View<'a>> {
        match self {
            Predicate::Membership { column, allowed } => filter_by_membership(view, column, allowed),
            Predicate::Exact { column, filter } => filter_by_exact_or_all(view, column, filter),
            Predicate::DateTimeRange(window) => filter_by_date_time_range(view, window),
            Predicate::Positions(positions) => Ok(view.select_positions(positions)),
        }
    }
}

// ---------------------------------------------------------------------------
// FilterSpec – conjunction of predicates
// ---------------------------------------------------------------------------

/// An immutable conjunction of predicates, applied in insertion order.
/// The empty spec selects every row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    predicates: Vec<Predicate>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new spec with `predicate` appended.
    pub fn with(&self, predicate: Predicate) -> Self {
        let mut predicates = self.predicates.clone();
        predicates.push(predicate);
        FilterSpec { predicates }
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn apply<'a>(&self, view: &View<'a>) -> DataResult<View<'a>> {
        let mut current = view.clone();
        for predicate in &self.predicates {
            current = predicate.apply(&current)?;
        }
        Ok(current)
    }
}

// ---------------------------------------------------------------------------
// Filter operations
// ---------------------------------------------------------------------------

/// Rows whose `column` value is in `allowed`. Nothing selected → no rows.
pub fn filter_by_membership<'a>(
    view: &View<'a>,
    column: &str,
    allowed: &BTreeSet<CellValue>,
) -> DataResult<View<'a>> {
    let col = view.table().column(column)?;
    Ok(view.retain(|i| allowed.contains(&col.values[i])))
}

/// `Filter::Any` keeps the view unchanged; `Filter::Exactly(v)` keeps rows
/// whose `column` equals `v`.
pub fn filter_by_exact_or_all<'a>(view: &View<'a>, column: &str, filter: &Filter) -> DataResult<View<'a>> {
    let col = view.table().column(column)?;
    match filter {
        Filter::Any => Ok(view.clone()),
        Filter::Exactly(value) => Ok(view.retain(|i| col.values[i] == *value)),
    }
}

/// Rows whose date lies in `[start_date, end_date]` and whose clock time lies
/// in `[start_time, end_time]`. Null or non-temporal cells never match.
pub fn filter_by_date_time_range<'a>(view: &View<'a>, window: &DateTimeWindow) -> DataResult<View<'a>> {
    let dates = view.table().column(&window.date_column)?;
    let times = view.table().column(&window.time_column)?;
    Ok(view.retain(|i| {
        let date_ok = dates.values[i]
            .as_date()
            .is_some_and(|d| window.start_date <= d && d <= window.end_date);
        let time_ok = times.values[i]
            .as_time()
            .is_some_and(|t| window.start_time <= t && t <= window.end_time);
        date_ok && time_ok
    }))
}
