use std::collections::BTreeSet;
use std::ops::RangeInclusive;

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;

use crate::data::derive::{DATETIME_COLUMN, DATE_COLUMN, TIME_COLUMN};
use crate::data::error::DataResult;
use crate::data::filter::{DateTimeWindow, Filter, FilterSpec, Predicate};
use crate::data::model::{CellValue, Table};
use crate::data::stats::{
    count_unique, date_bounds, describe_table, percent_of, stat_summary, top_n, unique_per_group,
    value_counts, GroupCount, StatSummary, TableDescription, TopN, ValueCounts,
};
use crate::data::view::View;
use crate::pipeline::{RegistryConfig, SensorConfig};

/// Bounds the widget layer places on the top-N slider.
pub const TOP_N_RANGE: RangeInclusive<usize> = 5..=50;

/// Rows shown in the filtered-data preview.
pub const PREVIEW_ROWS: usize = 5;

// ---------------------------------------------------------------------------
// Registry dashboard
// ---------------------------------------------------------------------------

/// Widget state of the registry dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrySelection {
    /// Selected materials; `None` means every material is selected.
    pub materials: Option<BTreeSet<CellValue>>,
    pub standard: Filter,
    pub top_n: usize,
}

impl Default for RegistrySelection {
    fn default() -> Self {
        RegistrySelection {
            materials: None,
            standard: Filter::Any,
            top_n: 10,
        }
    }
}

impl RegistrySelection {
    pub fn filter_spec(&self, cfg: &RegistryConfig) -> FilterSpec {
        let mut spec = FilterSpec::new();
        if let Some(materials) = &self.materials {
            spec = spec.with(Predicate::Membership {
                column: cfg.material_column.clone(),
                allowed: materials.clone(),
            });
        }
        spec.with(Predicate::Exact {
            column: cfg.standard_column.clone(),
            filter: self.standard.clone(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegistryReport {
    /// Rows in the uploaded table.
    pub services: usize,
    pub accredited_labs: usize,
    pub standards: usize,
    pub description: TableDescription,
    pub filtered_rows: usize,
    pub preview: Table,
    pub unique_ids_by_material: Vec<GroupCount>,
    pub material_counts: ValueCounts,
    /// Filtered material occurrences as a share of all occurrences.
    pub filtered_share_percent: f64,
    pub standard_counts: ValueCounts,
    pub top_standards: TopN,
}

pub fn registry_report(table: &Table, cfg: &RegistryConfig, selection: &RegistrySelection) -> DataResult<RegistryReport> {
    let full = View::full(table);
    let view = selection.filter_spec(cfg).apply(&full)?;
    log::debug!("registry filter kept {} of {} rows", view.len(), full.len());

    let material_counts = value_counts(&view, &cfg.material_column)?;
    let all_materials = value_counts(&full, &cfg.material_column)?;
    let standard_counts = value_counts(&view, &cfg.standard_column)?;
    let top_standards = top_n(&standard_counts, selection.top_n);

    Ok(RegistryReport {
        services: full.len(),
        accredited_labs: count_unique(&full, &cfg.id_column)?,
        standards: count_unique(&full, &cfg.standard_column)?,
        description: describe_table(&full)?,
        filtered_rows: view.len(),
        preview: view.head(PREVIEW_ROWS).to_table(),
        unique_ids_by_material: unique_per_group(&view, &cfg.material_column, &cfg.id_column)?,
        filtered_share_percent: percent_of(material_counts.total, all_materials.total),
        material_counts,
        standard_counts,
        top_standards,
    })
}

// ---------------------------------------------------------------------------
// Sensor dashboard
// ---------------------------------------------------------------------------

/// Widget state of the sensor dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorSelection {
    /// Inclusive date range; an open end defaults to the dates present in
    /// the table.
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Inclusive daily clock-time window.
    pub times: (NaiveTime, NaiveTime),
    /// Positions picked on the humidity chart, relative to the filtered rows.
    /// `None` or an empty selection means no brush.
    pub selected_rows: Option<Vec<usize>>,
}

impl Default for SensorSelection {
    fn default() -> Self {
        SensorSelection {
            start_date: None,
            end_date: None,
            times: (NaiveTime::MIN, NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)),
            selected_rows: None,
        }
    }
}

impl SensorSelection {
    fn window(&self, bounds: Option<(NaiveDate, NaiveDate)>) -> DateTimeWindow {
        let (lo, hi) = bounds.unwrap_or((NaiveDate::MIN, NaiveDate::MAX));
        DateTimeWindow {
            date_column: DATE_COLUMN.to_string(),
            time_column: TIME_COLUMN.to_string(),
            start_date: self.start_date.unwrap_or(lo),
            end_date: self.end_date.unwrap_or(hi),
            start_time: self.times.0,
            end_time: self.times.1,
        }
    }

    fn brush(&self) -> Option<Predicate> {
        match &self.selected_rows {
            Some(rows) if !rows.is_empty() => Some(Predicate::Positions(rows.clone())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SensorStats {
    pub column: String,
    pub summary: StatSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct SensorReport {
    /// Dates present in the table, the default for the date pickers.
    pub date_bounds: Option<(NaiveDate, NaiveDate)>,
    pub window: (NaiveDate, NaiveDate, NaiveTime, NaiveTime),
    pub filtered_rows: usize,
    pub preview: Table,
    pub humidity_columns: Vec<String>,
    /// `datetime` plus the humidity columns over the filtered rows.
    pub chart: Table,
    pub selected_rows: usize,
    pub statistics: Vec<SensorStats>,
}

pub fn sensor_report(table: &Table, cfg: &SensorConfig, selection: &SensorSelection) -> DataResult<SensorReport> {
    let humidity = cfg.humidity_columns(table)?;
    let full = View::full(table);
    let bounds = date_bounds(&full, DATE_COLUMN)?;
    let window = selection.window(bounds);

    let view = FilterSpec::new()
        .with(Predicate::DateTimeRange(window.clone()))
        .apply(&full)?;
    let selected = match selection.brush() {
        Some(brush) => brush.apply(&view)?,
        None => view.clone(),
    };
    log::debug!(
        "sensor filter kept {} of {} rows, {} selected",
        view.len(),
        full.len(),
        selected.len()
    );

    let mut chart_columns = vec![DATETIME_COLUMN];
    chart_columns.extend(humidity.iter().copied());
    let chart = view.to_table().select_columns(&chart_columns)?;

    let statistics = humidity
        .iter()
        .map(|&column| -> DataResult<SensorStats> {
            Ok(SensorStats {
                column: column.to_string(),
                summary: stat_summary(&selected, column)?,
            })
        })
        .collect::<DataResult<Vec<_>>>()?;

    Ok(SensorReport {
        date_bounds: bounds,
        window: (window.start_date, window.end_date, window.start_time, window.end_time),
        filtered_rows: view.len(),
        preview: view.head(PREVIEW_ROWS).to_table(),
        humidity_columns: humidity.iter().map(|c| c.to_string()).collect(),
        chart,
        selected_rows: selected.len(),
        statistics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::error::DataError;
    use crate::pipeline::tests::{registry_export, sensor_export};
    use crate::pipeline::PipelineConfig;

    fn registry_table() -> Table {
        PipelineConfig::Registry(RegistryConfig::default())
            .load(&registry_export(), "labs.csv")
            .unwrap()
    }

    fn sensor_table() -> Table {
        PipelineConfig::Sensor(SensorConfig::default())
            .load(&sensor_export(), "export.csv")
            .unwrap()
    }

    fn materials(values: &[&str]) -> Option<BTreeSet<CellValue>> {
        Some(values.iter().map(|v| CellValue::from(*v)).collect())
    }

    #[test]
    fn test_registry_report() {
        let table = registry_table();
        let selection = RegistrySelection {
            materials: materials(&["Cement", "Steel"]),
            standard: Filter::Any,
            top_n: 5,
        };
        let report = registry_report(&table, &RegistryConfig::default(), &selection).unwrap();

        assert_eq!(report.services, 6);
        assert_eq!(report.accredited_labs, 4);
        assert_eq!(report.standards, 3);
        assert_eq!(report.filtered_rows, 5);
        assert_eq!(report.preview.n_rows(), 5);
        assert_eq!(report.material_counts.entries[0].category, CellValue::from("Steel"));
        assert!((report.filtered_share_percent - 5.0 / 6.0 * 100.0).abs() < 1e-9);
        assert_eq!(
            report.unique_ids_by_material,
            vec![
                GroupCount { group: "Cement".into(), unique: 1 },
                GroupCount { group: "Steel".into(), unique: 2 },
            ]
        );
        let standards: Vec<String> = report
            .standard_counts
            .entries
            .iter()
            .map(|e| e.category.to_string())
            .collect();
        assert_eq!(standards, vec!["ISO 1", "ISO 2", "ISO 3"]);
        assert!((report.top_standards.percent_of_total - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_registry_report_numeric_looking_categories() {
        let cfg = RegistryConfig::default();
        let table = PipelineConfig::Registry(cfg.clone())
            .load(
                b"ID,Material_Product_Tested,Standard\n1,304,17025\n2,316,9001\n3,304,17025\n",
                "labs.csv",
            )
            .unwrap();
        let selection = RegistrySelection {
            materials: materials(&["304"]),
            standard: Filter::Exactly("17025".into()),
            ..RegistrySelection::default()
        };
        let report = registry_report(&table, &cfg, &selection).unwrap();
        assert_eq!(report.filtered_rows, 2);

        match report.description {
            TableDescription::Categorical(d) => {
                assert_eq!(d.len(), 3);
                assert_eq!(d[1].top, Some(CellValue::from("304")));
                assert_eq!((d[1].unique, d[1].freq), (2, 2));
            }
            other => panic!("expected categorical description, got {other:?}"),
        }
    }

    #[test]
    fn test_registry_report_exact_standard_and_empty_materials() {
        let table = registry_table();
        let cfg = RegistryConfig::default();

        let selection = RegistrySelection {
            standard: Filter::Exactly("ISO 2".into()),
            ..RegistrySelection::default()
        };
        let report = registry_report(&table, &cfg, &selection).unwrap();
        assert_eq!(report.filtered_rows, 2);

        let selection = RegistrySelection {
            materials: Some(BTreeSet::new()),
            ..RegistrySelection::default()
        };
        let report = registry_report(&table, &cfg, &selection).unwrap();
        assert_eq!(report.filtered_rows, 0);
        assert_eq!(report.material_counts.total, 0);
        assert_eq!(report.filtered_share_percent, 0.0);
        assert!(report.top_standards.entries.is_empty());
    }

    #[test]
    fn test_sensor_report_defaults_to_all_dates() {
        let table = sensor_table();
        let report = sensor_report(&table, &SensorConfig::default(), &SensorSelection::default()).unwrap();

        assert_eq!(
            report.date_bounds,
            Some((
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
            ))
        );
        // The row with an unparsable timestamp has no date and never matches.
        assert_eq!(report.filtered_rows, 2);
        assert_eq!(report.selected_rows, 2);
        assert_eq!(report.chart.column_names(), vec!["datetime", "Sensor1 Humidity", "Sensor2 Humidity"]);

        let s1 = &report.statistics[0];
        assert_eq!(s1.column, "Sensor1 Humidity");
        assert_eq!(s1.summary.count, Some(1));
        assert_eq!(s1.summary.std, None);
        let s2 = &report.statistics[1].summary;
        assert_eq!(s2.count, Some(2));
        assert_eq!(s2.mean, Some(38.75));
    }

    #[test]
    fn test_sensor_report_time_window_and_brush() {
        let table = sensor_table();
        let cfg = SensorConfig::default();

        let morning = SensorSelection {
            times: (
                NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            ),
            ..SensorSelection::default()
        };
        let report = sensor_report(&table, &cfg, &morning).unwrap();
        assert_eq!(report.filtered_rows, 1);

        let brushed = SensorSelection {
            selected_rows: Some(vec![1]),
            ..SensorSelection::default()
        };
        let report = sensor_report(&table, &cfg, &brushed).unwrap();
        assert_eq!(report.filtered_rows, 2);
        assert_eq!(report.selected_rows, 1);
        // Sensor1 has no valid reading in the brushed row.
        assert!(report.statistics[0].summary.is_empty());
        assert_eq!(report.statistics[1].summary.max, Some(38.5));

        let no_brush = SensorSelection {
            selected_rows: Some(vec![]),
            ..SensorSelection::default()
        };
        assert_eq!(sensor_report(&table, &cfg, &no_brush).unwrap().selected_rows, 2);
    }

    #[test]
    fn test_sensor_report_explicit_start_date() {
        let table = sensor_table();
        let selection = SensorSelection {
            start_date: NaiveDate::from_ymd_opt(2024, 1, 2),
            ..SensorSelection::default()
        };
        let report = sensor_report(&table, &SensorConfig::default(), &selection).unwrap();
        assert_eq!(report.filtered_rows, 1);
        assert_eq!(report.window.1, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
    }

    #[test]
    fn test_sensor_report_requires_humidity_columns() {
        let table = registry_table();
        let err = sensor_report(&table, &SensorConfig::default(), &SensorSelection::default()).unwrap_err();
        assert!(matches!(err, DataError::Schema(_)));
    }
}
