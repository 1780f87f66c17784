use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;
use serde::Serialize;

use super::error::DataResult;
use super::model::CellValue;
use super::view::View;

// ---------------------------------------------------------------------------
// Value counts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueCount {
    pub category: CellValue,
    pub count: usize,
    pub percent_of_total: f64,
}

/// Occurrences per distinct non-null value, most frequent first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueCounts {
    pub entries: Vec<ValueCount>,
    pub total: usize,
}

/// The first `n` entries of a [`ValueCounts`] and their combined share.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopN {
    pub entries: Vec<ValueCount>,
    pub count: usize,
    pub percent_of_total: f64,
}

/// `part / whole * 100`, or 0 when `whole` is 0.
pub fn percent_of(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Number of distinct non-null values in `column`.
pub fn count_unique(view: &View<'_>, column: &str) -> DataResult<usize> {
    let distinct: BTreeSet<&CellValue> = view.values(column)?.filter(|v| !v.is_null()).collect();
    Ok(distinct.len())
}

/// Count each distinct non-null value. Ordered by descending count; ties
/// keep first-seen order.
pub fn value_counts(view: &View<'_>, column: &str) -> DataResult<ValueCounts> {
    let mut slots: HashMap<&CellValue, usize> = HashMap::new();
    let mut counts: Vec<(&CellValue, usize)> = Vec::new();
    for value in view.values(column)?.filter(|v| !v.is_null()) {
        let slot = *slots.entry(value).or_insert_with(|| {
            counts.push((value, 0));
            counts.len() - 1
        });
        counts[slot].1 += 1;
    }
    // Stable sort keeps first-seen order among equal counts.
    counts.sort_by(|a, b| b.1.cmp(&a.1));

    let total: usize = counts.iter().map(|(_, n)| n).sum();
    let entries = counts
        .into_iter()
        .map(|(value, count)| ValueCount {
            category: value.clone(),
            count,
            percent_of_total: percent_of(count, total),
        })
        .collect();
    Ok(ValueCounts { entries, total })
}

/// The first `n` entries and their share of all counts. The caller bounds `n`.
pub fn top_n(counts: &ValueCounts, n: usize) -> TopN {
    let entries: Vec<ValueCount> = counts.entries.iter().take(n).cloned().collect();
    let count: usize = entries.iter().map(|e| e.count).sum();
    TopN {
        entries,
        count,
        percent_of_total: percent_of(count, counts.total),
    }
}

/// Distinct non-null values of `value_column` per non-null group of
/// `group_column`, ordered by group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupCount {
    pub group: CellValue,
    pub unique: usize,
}

pub fn unique_per_group(view: &View<'_>, group_column: &str, value_column: &str) -> DataResult<Vec<GroupCount>> {
    let mut groups: BTreeMap<&CellValue, BTreeSet<&CellValue>> = BTreeMap::new();
    for (group, value) in view.values(group_column)?.zip(view.values(value_column)?) {
        if group.is_null() {
            continue;
        }
        let members = groups.entry(group).or_default();
        if !value.is_null() {
            members.insert(value);
        }
    }
    Ok(groups
        .into_iter()
        .map(|(group, members)| GroupCount {
            group: group.clone(),
            unique: members.len(),
        })
        .collect())
}

/// Earliest and latest non-null date in `column`.
pub fn date_bounds(view: &View<'_>, column: &str) -> DataResult<Option<(NaiveDate, NaiveDate)>> {
    let mut dates = view.values(column)?.filter_map(CellValue::as_date);
    let Some(first) = dates.next() else {
        return Ok(None);
    };
    Ok(Some(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)))))
}

// ---------------------------------------------------------------------------
// Descriptive statistics
// ---------------------------------------------------------------------------

fn numbers(view: &View<'_>, column: &str) -> DataResult<Vec<f64>> {
    Ok(view.values(column)?.filter_map(CellValue::as_f64).collect())
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Sample standard deviation (n - 1 denominator); undefined below two values.
fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

/// Linear-interpolated quantile of already sorted values.
fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = (sorted.len() - 1) as f64 * q;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64))
}

/// Most frequent integer-truncated value; ties go to the smallest.
fn truncated_mode(values: &[f64]) -> Option<i64> {
    let mut freq: BTreeMap<i64, usize> = BTreeMap::new();
    for v in values {
        *freq.entry(v.trunc() as i64).or_default() += 1;
    }
    // BTreeMap iterates ascending, and max_by_key keeps the last maximum,
    // so walk it backwards to land on the smallest value among ties.
    freq.into_iter().rev().max_by_key(|&(_, n)| n).map(|(v, _)| v)
}

/// The standard descriptive statistics of one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnDescription {
    pub column: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    #[serde(rename = "25%")]
    pub q25: Option<f64>,
    #[serde(rename = "50%")]
    pub median: Option<f64>,
    #[serde(rename = "75%")]
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

/// Describe each named column over its numeric cells.
pub fn describe(view: &View<'_>, columns: &[&str]) -> DataResult<Vec<ColumnDescription>> {
    columns
        .iter()
        .map(|&column| -> DataResult<ColumnDescription> {
            let mut values = numbers(view, column)?;
            values.sort_by(f64::total_cmp);
            Ok(ColumnDescription {
                column: column.to_string(),
                count: values.len(),
                mean: mean(&values),
                std: sample_std(&values),
                min: values.first().copied(),
                q25: quantile(&values, 0.25),
                median: quantile(&values, 0.5),
                q75: quantile(&values, 0.75),
                max: values.last().copied(),
            })
        })
        .collect()
}

/// Count, distinct values and the most frequent value of one category
/// column. Ties for `top` go to the value seen first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryDescription {
    pub column: String,
    pub count: usize,
    pub unique: usize,
    pub top: Option<CellValue>,
    pub freq: usize,
}

pub fn describe_categories(view: &View<'_>, columns: &[&str]) -> DataResult<Vec<CategoryDescription>> {
    columns
        .iter()
        .map(|&column| -> DataResult<CategoryDescription> {
            let counts = value_counts(view, column)?;
            let top = counts.entries.first();
            Ok(CategoryDescription {
                column: column.to_string(),
                count: counts.total,
                unique: counts.entries.len(),
                top: top.map(|e| e.category.clone()),
                freq: top.map_or(0, |e| e.count),
            })
        })
        .collect()
}

/// Description of a whole view: its numeric columns when it has any,
/// otherwise every column as a category.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TableDescription {
    Numeric(Vec<ColumnDescription>),
    Categorical(Vec<CategoryDescription>),
}

pub fn describe_table(view: &View<'_>) -> DataResult<TableDescription> {
    let table = view.table();
    let numeric = table.numeric_columns();
    if numeric.is_empty() {
        Ok(TableDescription::Categorical(describe_categories(view, &table.column_names())?))
    } else {
        Ok(TableDescription::Numeric(describe(view, &numeric)?))
    }
}

/// Fixed-key summary of one column. Every metric is `None` over an empty
/// subset.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatSummary {
    #[serde(rename = "Count")]
    pub count: Option<usize>,
    #[serde(rename = "Max")]
    pub max: Option<f64>,
    #[serde(rename = "Min")]
    pub min: Option<f64>,
    #[serde(rename = "Mean")]
    pub mean: Option<f64>,
    #[serde(rename = "Median")]
    pub median: Option<f64>,
    #[serde(rename = "Mode")]
    pub mode: Option<i64>,
    #[serde(rename = "Std")]
    pub std: Option<f64>,
    #[serde(rename = "Std/Count")]
    pub std_per_count: Option<f64>,
}

impl StatSummary {
    pub const METRICS: [&'static str; 8] = ["Count", "Max", "Min", "Mean", "Median", "Mode", "Std", "Std/Count"];

    /// Metric name → value, in display order.
    pub fn entries(&self) -> [(&'static str, Option<f64>); 8] {
        let values = [
            self.count.map(|c| c as f64),
            self.max,
            self.min,
            self.mean,
            self.median,
            self.mode.map(|m| m as f64),
            self.std,
            self.std_per_count,
        ];
        let mut out = [("", None); 8];
        for (slot, (name, value)) in out.iter_mut().zip(Self::METRICS.into_iter().zip(values)) {
            *slot = (name, value);
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.count.is_none()
    }
}

pub fn stat_summary(view: &View<'_>, column: &str) -> DataResult<StatSummary> {
    let mut values = numbers(view, column)?;
    if values.is_empty() {
        return Ok(StatSummary::default());
    }
    values.sort_by(f64::total_cmp);
    let count = values.len();
    let std = sample_std(&values);
    Ok(StatSummary {
        count: Some(count),
        max: values.last().copied(),
        min: values.first().copied(),
        mean: mean(&values),
        median: quantile(&values, 0.5),
        mode: truncated_mode(&values),
        std,
        std_per_count: std.map(|s| s / count as f64),
    })
}
