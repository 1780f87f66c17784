use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use super::error::{DataError, DataResult};
use super::model::{CellValue, Table};

/// Accepted timestamp layouts, tried in order (month-first before day-first).
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S%.f",
    "%m/%d/%Y %H:%M",
    "%d/%m/%Y %H:%M:%S%.f",
    "%d/%m/%Y %H:%M",
    "%d.%m.%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d/%m/%Y"];

/// Parse a timestamp string; a bare date means midnight.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

fn timestamp_cell(cell: &CellValue) -> CellValue {
    match cell {
        CellValue::DateTime(dt) => CellValue::DateTime(*dt),
        CellValue::Date(d) => CellValue::DateTime(d.and_time(NaiveTime::MIN)),
        CellValue::Text(s) => parse_timestamp(s).map_or(CellValue::Null, CellValue::DateTime),
        _ => CellValue::Null,
    }
}

fn numeric_cell(cell: &CellValue) -> CellValue {
    match cell {
        CellValue::Number(v) => CellValue::Number(*v),
        CellValue::Text(s) => match s.trim().parse::<f64>() {
            Ok(v) if !v.is_nan() => CellValue::Number(v),
            _ => CellValue::Null,
        },
        _ => CellValue::Null,
    }
}

/// Convert `column` to timestamps in place. Cells that do not parse become
/// null; no row is ever removed.
pub fn parse_timestamp_column(mut table: Table, column: &str) -> DataResult<Table> {
    let col = table.column_mut(column)?;
    let mut nulled = 0usize;
    for cell in &mut col.values {
        let parsed = timestamp_cell(cell);
        if parsed.is_null() && !cell.is_null() {
            nulled += 1;
        }
        *cell = parsed;
    }
    if nulled > 0 {
        log::warn!("{nulled} unparsable timestamps in '{column}' set to null");
    }
    Ok(table)
}

/// Convert each named column to numeric in place. Non-numeric cells become
/// null; no row is ever removed.
pub fn coerce_numeric(mut table: Table, columns: &[String]) -> DataResult<Table> {
    for name in columns {
        let col = table.column_mut(name)?;
        let mut nulled = 0usize;
        for cell in &mut col.values {
            let parsed = numeric_cell(cell);
            if parsed.is_null() && !cell.is_null() {
                nulled += 1;
            }
            *cell = parsed;
        }
        if nulled > 0 {
            log::debug!("{nulled} non-numeric cells in '{name}' set to null");
        }
    }
    Ok(table)
}

/// Measurement columns: everything after the first `leading` structural
/// columns, minus the names in `exclude`.
pub fn measurement_columns(table: &Table, leading: usize, exclude: &[&str]) -> DataResult<Vec<String>> {
    if table.n_columns() < leading {
        return Err(DataError::schema(format!(
            "expected at least {leading} leading columns, found {}",
            table.n_columns()
        )));
    }
    Ok(table.columns()[leading..]
        .iter()
        .map(|c| c.name.clone())
        .filter(|name| !exclude.contains(&name.as_str()))
        .collect())
}
