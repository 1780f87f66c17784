use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::error::{DataError, DataResult};
use super::model::{dedupe_names, CellValue, Column, Table};

/// Where the real header lives inside a raw sensor export.
///
/// Row numbers are data-row positions of the loaded table (the file's first
/// line is already consumed as the loader's header).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderLayout {
    /// Banner / metadata rows to discard.
    pub banner_rows: Vec<usize>,
    /// Row holding the sensor-group labels.
    pub group_row: usize,
    /// Row holding the sub-labels (measurement and unit).
    pub sub_row: usize,
    /// Names whose column is dropped outright. A name matches either the
    /// flattened name or the literal `"{group} {sub}"` join, where a missing
    /// label reads `nan`.
    pub sentinel_names: Vec<String>,
}

impl Default for HeaderLayout {
    fn default() -> Self {
        HeaderLayout {
            banner_rows: vec![0, 2, 3, 4],
            group_row: 1,
            sub_row: 5,
            sentinel_names: vec!["nan Time".to_string()],
        }
    }
}

/// Label text of a header cell, or `None` for the missing placeholder.
fn label(cell: &CellValue) -> Option<String> {
    let text = match cell {
        CellValue::Null => return None,
        CellValue::Text(s) => s.trim().to_string(),
        other => other.to_string(),
    };
    if text.is_empty() || text.eq_ignore_ascii_case("nan") {
        None
    } else {
        Some(text)
    }
}

/// Flatten a two-row header into one name per column: `"{group} {sub}"`,
/// or the sub-label alone when the group label is missing.
pub fn flatten_header(group: &[CellValue], sub: &[CellValue]) -> Vec<String> {
    group
        .iter()
        .zip(sub)
        .map(|(g, s)| match (label(g), label(s)) {
            (Some(g), Some(s)) => format!("{g} {s}").trim().to_string(),
            (None, Some(s)) => s,
            (Some(g), None) => g,
            (None, None) => String::new(),
        })
        .collect()
}

/// Literal `"{group} {sub}"` join of two header cells, spelling a missing
/// label as `nan`.
fn literal_name(group: &CellValue, sub: &CellValue) -> String {
    let group = label(group).unwrap_or_else(|| "nan".to_string());
    let sub = label(sub).unwrap_or_else(|| "nan".to_string());
    format!("{group} {sub}")
}

/// Replace the loader's header with the flattened two-row header and drop
/// the banner and header rows. Data-row values are carried over untouched.
pub fn normalize_headers(table: &Table, layout: &HeaderLayout) -> DataResult<Table> {
    let n_rows = table.n_rows();
    for (what, row) in [("group", layout.group_row), ("sub-label", layout.sub_row)] {
        if row >= n_rows {
            return Err(DataError::schema(format!(
                "{what} header row {row} is missing (table has {n_rows} rows)"
            )));
        }
    }

    let group: Vec<CellValue> = table.columns().iter().map(|c| c.values[layout.group_row].clone()).collect();
    let sub: Vec<CellValue> = table.columns().iter().map(|c| c.values[layout.sub_row].clone()).collect();
    let names = dedupe_names(flatten_header(&group, &sub));
    let literal: Vec<String> = group.iter().zip(&sub).map(|(g, s)| literal_name(g, s)).collect();

    let dropped: BTreeSet<usize> = layout
        .banner_rows
        .iter()
        .copied()
        .chain([layout.group_row, layout.sub_row])
        .collect();
    let keep: Vec<usize> = (0..n_rows).filter(|i| !dropped.contains(i)).collect();
    let body = table.take_rows(&keep);

    let mut columns = Vec::with_capacity(names.len());
    for ((name, literal), col) in names.into_iter().zip(&literal).zip(body.columns()) {
        if layout.sentinel_names.contains(&name) || layout.sentinel_names.contains(literal) {
            log::debug!("dropping sentinel column '{name}'");
            continue;
        }
        columns.push(Column::new(name, col.values.clone()));
    }
    log::debug!(
        "normalized header: {} columns, {} data rows",
        columns.len(),
        keep.len()
    );
    Table::new(columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(v: &[&str]) -> Vec<CellValue> {
        v.iter().map(|s| CellValue::from(*s)).collect()
    }

    #[test]
    fn test_flatten_prefers_sub_label_for_missing_group() {
        let names = flatten_header(&cells(&["Sensor1", "NaN"]), &cells(&["Temp", "Time"]));
        assert_eq!(names, vec!["Sensor1 Temp", "Time"]);

        let names = flatten_header(&[CellValue::Null], &cells(&["Time"]));
        assert_eq!(names, vec!["Time"]);
    }

    #[test]
    fn test_flatten_trims_and_handles_missing_sub() {
        let names = flatten_header(&cells(&[" Sensor2 ", "Logger"]), &[CellValue::from("  "), CellValue::Null]);
        assert_eq!(names, vec!["Sensor2", "Logger"]);
    }

    /// Raw export as the loader sees it: banner rows 0, 2, 3, 4; group row 1;
    /// sub-label row 5; readings from row 6.
    fn raw_export() -> Table {
        let rows = vec![
            cells(&["Device: HX-200", "", "", ""]),
            vec![CellValue::Null, "Sensor1".into(), "Sensor1".into(), "Ghost".into()],
            cells(&["Serial", "123", "", ""]),
            cells(&["Site", "Lab A", "", ""]),
            cells(&["Interval", "60s", "", ""]),
            cells(&["Date Time", "Humidity", "Temp", "Time"]),
            vec!["2024-01-01 08:00:00".into(), 40.5.into(), 21.0.into(), "x".into()],
            vec!["2024-01-01 08:01:00".into(), "bad".into(), 21.1.into(), "y".into()],
        ];
        Table::from_rows(
            vec!["Report".into(), "a".into(), "b".into(), "c".into()],
            rows,
        )
        .unwrap()
    }

    #[test]
    fn test_normalize_headers_drops_banner_rows() {
        let raw = raw_export();
        let table = normalize_headers(&raw, &HeaderLayout::default()).unwrap();
        assert_eq!(
            table.column_names(),
            vec!["Date Time", "Sensor1 Humidity", "Sensor1 Temp", "Ghost Time"]
        );
        assert_eq!(table.n_rows(), 2);
        // Values are copied verbatim, including the unparsable one.
        assert_eq!(table.column("Sensor1 Humidity").unwrap().values[1], CellValue::from("bad"));
        assert_eq!(table.column("Date Time").unwrap().values[0], CellValue::from("2024-01-01 08:00:00"));
    }

    #[test]
    fn test_normalize_headers_drops_sentinel_columns() {
        let raw = raw_export();
        let layout = HeaderLayout {
            sentinel_names: vec!["Ghost Time".to_string()],
            ..HeaderLayout::default()
        };
        let table = normalize_headers(&raw, &layout).unwrap();
        assert_eq!(table.column_names(), vec!["Date Time", "Sensor1 Humidity", "Sensor1 Temp"]);
    }

    #[test]
    fn test_default_layout_drops_time_column_without_group() {
        let rows = vec![
            cells(&["Device: HX-200", "", "", ""]),
            vec![CellValue::Null, "Sensor1".into(), "Sensor1".into(), CellValue::Null],
            cells(&["Serial", "123", "", ""]),
            cells(&["Site", "Lab A", "", ""]),
            cells(&["Interval", "60s", "", ""]),
            cells(&["Date Time", "Humidity", "Temp", "Time"]),
            vec!["2024-01-01 08:00:00".into(), 40.5.into(), 21.0.into(), "08:00".into()],
        ];
        let raw = Table::from_rows(
            vec!["Report".into(), "a".into(), "b".into(), "c".into()],
            rows,
        )
        .unwrap();

        let table = normalize_headers(&raw, &HeaderLayout::default()).unwrap();
        assert_eq!(table.column_names(), vec!["Date Time", "Sensor1 Humidity", "Sensor1 Temp"]);
    }

    #[test]
    fn test_missing_header_rows_is_schema_error() {
        let raw = Table::from_rows(vec!["a".into()], vec![cells(&["x"])]).unwrap();
        assert!(matches!(
            normalize_headers(&raw, &HeaderLayout::default()),
            Err(DataError::Schema(_))
        ));
    }
}
