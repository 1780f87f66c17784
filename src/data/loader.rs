use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::{NaiveDate, NaiveDateTime};
use encoding_rs::WINDOWS_1252;

use super::error::{DataError, DataResult};
use super::model::{dedupe_names, CellValue, Table};

/// Tokens read as a missing value, as the common dataframe readers do.
const NA_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load an uploaded file into a [`Table`]. Dispatch by extension.
///
/// Supported formats:
/// * `.csv` / `.txt` – comma-delimited text, decoded as Latin-1 (Windows-1252)
/// * `.xlsx` / `.xls` – first worksheet of the workbook
///
/// The first line (or worksheet row) is the header. Nothing is written to disk.
pub fn load_bytes(bytes: &[u8], filename: &str) -> DataResult<Table> {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "csv" | "txt" => load_delimited(bytes, filename)?,
        "xlsx" | "xls" => load_spreadsheet(bytes, filename)?,
        _ => return Err(DataError::UnsupportedFormat(filename.to_string())),
    };

    log::info!(
        "Loaded {filename}: {} rows, columns {:?}",
        table.n_rows(),
        table.column_names()
    );
    Ok(table)
}

/// Convenience wrapper around [`load_bytes`] for files on disk.
pub fn load_file(path: &Path) -> DataResult<Table> {
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    let bytes = std::fs::read(path).map_err(|e| DataError::load(&filename, e))?;
    load_bytes(&bytes, &filename)
}

// ---------------------------------------------------------------------------
// Delimited text
// ---------------------------------------------------------------------------

fn load_delimited(bytes: &[u8], filename: &str) -> DataResult<Table> {
    // Every byte maps to a character in Windows-1252, so decoding cannot fail.
    let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());
    let mut records = reader.records();

    let header = match records.next() {
        Some(result) => result.map_err(|e| DataError::load(filename, e))?,
        None => return Ok(Table::default()),
    };
    let names = dedupe_names(header.iter().map(|h| h.trim().to_string()).collect());

    let mut rows = Vec::new();
    for (row_no, result) in records.enumerate() {
        let record = result.map_err(|e| DataError::load(filename, e))?;
        if record.len() > names.len() {
            return Err(DataError::load(
                filename,
                format!(
                    "row {row_no}: expected {} fields, saw {}",
                    names.len(),
                    record.len()
                ),
            ));
        }
        rows.push(record.iter().map(guess_cell_type).collect());
    }

    Table::from_rows(names, rows)
}

/// Interpret one raw text field: NA tokens become null, numbers become
/// numeric, everything else stays text.
pub(crate) fn guess_cell_type(s: &str) -> CellValue {
    if NA_TOKENS.contains(&s) || NA_TOKENS.contains(&s.trim()) {
        return CellValue::Null;
    }
    match s.trim().parse::<f64>() {
        Ok(v) if v.is_nan() => CellValue::Null,
        Ok(v) => CellValue::Number(v),
        Err(_) => CellValue::Text(s.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Spreadsheets
// ---------------------------------------------------------------------------

fn load_spreadsheet(bytes: &[u8], filename: &str) -> DataResult<Table> {
    let mut workbook =
        open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(|e| DataError::load(filename, e))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| DataError::load(filename, "workbook has no worksheets"))?
        .map_err(|e| DataError::load(filename, e))?;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(Table::default());
    };
    let names = dedupe_names(header.iter().map(header_text).collect());
    let rows = rows
        .map(|row| row.iter().map(spreadsheet_cell).collect())
        .collect();

    Table::from_rows(names, rows)
}

fn header_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

fn spreadsheet_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) if f.is_nan() => CellValue::Null,
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) => guess_cell_type(s),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::DateTime(dt) => dt.as_datetime().map_or(CellValue::Null, CellValue::DateTime),
        Data::DateTimeIso(s) => {
            if let Ok(dt) = s.parse::<NaiveDateTime>() {
                CellValue::DateTime(dt)
            } else if let Ok(d) = s.parse::<NaiveDate>() {
                CellValue::Date(d)
            } else {
                CellValue::Text(s.clone())
            }
        }
        Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(_) | Data::Empty => CellValue::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_unsupported_extension() {
        let err = load_bytes(b"a,b\n1,2\n", "data.parquet").unwrap_err();
        assert!(matches!(err, DataError::UnsupportedFormat(name) if name == "data.parquet"));
        assert!(matches!(
            load_bytes(b"", "no_extension"),
            Err(DataError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_csv_extension_is_case_insensitive() {
        let table = load_bytes(b"a,b\n1,x\n", "DATA.CSV").unwrap();
        assert_eq!(table.column_names(), vec!["a", "b"]);
        assert_eq!(table.column("a").unwrap().values, vec![CellValue::Number(1.0)]);
        assert_eq!(table.column("b").unwrap().values, vec![CellValue::from("x")]);

        let txt = load_bytes(b"a\n2\n", "export.Txt").unwrap();
        assert_eq!(txt.n_rows(), 1);
    }

    #[test]
    fn test_latin1_decoding() {
        // 0xB0 is the degree sign in Latin-1 and invalid as UTF-8.
        let bytes = b"Temp \xb0C,site\n21.5,Riyadh\n";
        let table = load_bytes(bytes, "sensor.csv").unwrap();
        assert_eq!(table.column_names(), vec!["Temp \u{b0}C", "site"]);
    }

    #[test]
    fn test_na_tokens_and_header_hygiene() {
        let table = load_bytes(b"x,,x\nNaN,NA,\n n/a ,7,abc\n", "t.csv").unwrap();
        assert_eq!(table.column_names(), vec!["x", "Unnamed: 1", "x.1"]);
        assert_eq!(
            table.column("x").unwrap().values,
            vec![CellValue::Null, CellValue::Null]
        );
        assert_eq!(
            table.column("x.1").unwrap().values,
            vec![CellValue::Null, CellValue::from("abc")]
        );
    }

    #[test]
    fn test_malformed_numeric_cell_keeps_row() {
        let mut csv = String::from("id,value\n");
        for i in 0..10 {
            if i == 3 {
                csv.push_str("3,not-a-number\n");
            } else {
                csv.push_str(&format!("{i},{}\n", i * 10));
            }
        }
        let table = load_bytes(csv.as_bytes(), "t.csv").unwrap();
        assert_eq!(table.n_rows(), 10);
        assert_eq!(table.column("value").unwrap().values[3], CellValue::from("not-a-number"));
    }

    #[test]
    fn test_row_wider_than_header_is_load_error() {
        let err = load_bytes(b"a,b\n1,2,3\n", "t.csv").unwrap_err();
        assert!(matches!(err, DataError::Load { .. }));
    }

    #[test]
    fn test_corrupt_workbook_is_load_error() {
        let err = load_bytes(b"definitely not a workbook", "book.xlsx").unwrap_err();
        match err {
            DataError::Load { file, .. } => assert_eq!(file, "book.xlsx"),
            other => panic!("expected load error, got {other:?}"),
        }
    }

    /// Two-sheet workbook; only the first sheet holds the table.
    fn workbook_bytes() -> Vec<u8> {
        use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

        let mut workbook = Workbook::new();
        let stamp_format = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");
        let stamp = ExcelDateTime::from_ymd(2024, 1, 2).unwrap().and_hms(12, 0, 0).unwrap();

        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "Name").unwrap();
        sheet.write_string(0, 1, " Value ").unwrap();
        sheet.write_string(0, 3, "Stamp").unwrap();
        sheet.write_string(1, 0, "a").unwrap();
        sheet.write_number(1, 1, 1.5).unwrap();
        sheet.write_string(1, 2, "NA").unwrap();
        sheet.write_datetime_with_format(1, 3, &stamp, &stamp_format).unwrap();
        sheet.write_string(2, 0, "b").unwrap();
        sheet.write_number(2, 1, 2).unwrap();
        sheet.write_string(2, 2, " 7 ").unwrap();

        let other = workbook.add_worksheet();
        other.write_string(0, 0, "ignored").unwrap();
        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn test_xlsx_first_sheet_is_loaded() {
        let table = load_bytes(&workbook_bytes(), "labs.XLSX").unwrap();
        assert_eq!(table.column_names(), vec!["Name", "Value", "Unnamed: 2", "Stamp"]);
        assert_eq!(table.n_rows(), 2);

        assert_eq!(
            table.column("Name").unwrap().values,
            vec![CellValue::from("a"), CellValue::from("b")]
        );
        assert_eq!(
            table.column("Value").unwrap().values,
            vec![CellValue::Number(1.5), CellValue::Number(2.0)]
        );
        assert_eq!(
            table.column("Unnamed: 2").unwrap().values,
            vec![CellValue::Null, CellValue::Number(7.0)]
        );

        let noon = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        assert_eq!(
            table.column("Stamp").unwrap().values,
            vec![CellValue::DateTime(noon), CellValue::Null]
        );
    }

    #[test]
    fn test_load_file_from_disk() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "ID,Standard").unwrap();
        writeln!(file, "L1,ISO 9001").unwrap();
        let table = load_file(file.path()).unwrap();
        assert_eq!(table.n_rows(), 1);
        assert_eq!(table.column("Standard").unwrap().values[0], CellValue::from("ISO 9001"));
    }

    #[test]
    fn test_empty_file_loads_empty_table() {
        let table = load_bytes(b"", "empty.csv").unwrap();
        assert_eq!(table.n_columns(), 0);
        assert!(table.is_empty());
    }
}
