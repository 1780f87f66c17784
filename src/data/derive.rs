use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use super::error::{DataError, DataResult};
use super::model::{CellValue, Column, Table};

pub const DATE_COLUMN: &str = "date";
pub const TIME_COLUMN: &str = "time";
pub const DATETIME_COLUMN: &str = "datetime";

/// Rebuild a timestamp from its calendar date and clock time by way of their
/// text forms, the same path a plotting layer takes.
pub fn combine_date_time(date: NaiveDate, time: NaiveTime) -> Option<NaiveDateTime> {
    let text = format!("{date} {time}");
    NaiveDateTime::parse_from_str(&text, "%Y-%m-%d %H:%M:%S%.f").ok()
}

/// Split a parsed timestamp column into `date` and `time`, drop it, and
/// append a rebuilt `datetime` column.
///
/// Resulting order: `date, time, <other columns as before>, datetime`.
/// Null timestamps yield null in all three derived columns.
pub fn derive_calendar_columns(mut table: Table, timestamp_column: &str) -> DataResult<Table> {
    let source = table.remove_column(timestamp_column).ok_or_else(|| {
        DataError::schema(format!("missing timestamp column '{timestamp_column}'"))
    })?;

    for name in [DATE_COLUMN, TIME_COLUMN, DATETIME_COLUMN] {
        if table.remove_column(name).is_some() {
            log::warn!("replacing existing '{name}' column with derived values");
        }
    }

    let stamps: Vec<Option<NaiveDateTime>> = source.values.iter().map(CellValue::as_datetime).collect();
    let dates = stamps
        .iter()
        .map(|s| s.map_or(CellValue::Null, |dt| CellValue::Date(dt.date())))
        .collect();
    let times = stamps
        .iter()
        .map(|s| s.map_or(CellValue::Null, |dt| CellValue::Time(dt.time())))
        .collect();
    let combined = stamps
        .iter()
        .map(|s| {
            s.and_then(|dt| combine_date_time(dt.date(), dt.time()))
                .map_or(CellValue::Null, CellValue::DateTime)
        })
        .collect();

    table.insert_column(0, Column::new(DATE_COLUMN, dates))?;
    table.insert_column(1, Column::new(TIME_COLUMN, times))?;
    table.push_column(Column::new(DATETIME_COLUMN, combined))?;
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").unwrap()
    }

    fn sample() -> Table {
        Table::from_rows(
            vec!["site".into(), "stamp".into(), "S1 Humidity".into()],
            vec![
                vec!["A".into(), CellValue::DateTime(dt("2024-01-01 08:00:00")), 40.0.into()],
                vec!["A".into(), CellValue::Null, 41.0.into()],
                vec!["B".into(), CellValue::DateTime(dt("2024-02-29 23:59:59.125")), 42.0.into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_column_order() {
        let table = derive_calendar_columns(sample(), "stamp").unwrap();
        assert_eq!(
            table.column_names(),
            vec!["date", "time", "site", "S1 Humidity", "datetime"]
        );
        assert_eq!(table.n_rows(), 3);
    }

    #[test]
    fn test_round_trip_is_lossless() {
        let original = sample();
        let stamps = original.column("stamp").unwrap().values.clone();
        let table = derive_calendar_columns(original, "stamp").unwrap();
        let rebuilt = &table.column(DATETIME_COLUMN).unwrap().values;
        for (before, after) in stamps.iter().zip(rebuilt) {
            assert_eq!(before, after);
        }
        assert_eq!(
            table.column(TIME_COLUMN).unwrap().values[2],
            CellValue::Time(NaiveTime::from_hms_milli_opt(23, 59, 59, 125).unwrap())
        );
        assert_eq!(table.column(DATE_COLUMN).unwrap().values[1], CellValue::Null);
    }

    #[test]
    fn test_combine_date_time() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let t = NaiveTime::from_hms_micro_opt(10, 0, 0, 1).unwrap();
        assert_eq!(combine_date_time(d, t), Some(d.and_time(t)));
    }

    #[test]
    fn test_missing_timestamp_column() {
        assert!(matches!(
            derive_calendar_columns(sample(), "when"),
            Err(DataError::Schema(_))
        ));
    }
}
