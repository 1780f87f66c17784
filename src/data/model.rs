use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

use super::error::{DataError, DataResult};

// ---------------------------------------------------------------------------
// CellValue – a single cell of a table column
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value.
///
/// `CellValue` is used as a key in `BTreeSet`/`HashMap` by the filter engine
/// and the aggregator, so equality, ordering and hashing are all defined on
/// the same total order (floats compare with `total_cmp`).
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    Number(f64),
    DateTime(NaiveDateTime),
    Date(NaiveDate),
    Time(NaiveTime),
    Null,
}

impl CellValue {
    fn rank(&self) -> u8 {
        match self {
            CellValue::Null => 0,
            CellValue::Number(_) => 1,
            CellValue::Text(_) => 2,
            CellValue::Date(_) => 3,
            CellValue::Time(_) => 4,
            CellValue::DateTime(_) => 5,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// The cell as a category label: every non-null value becomes its text
    /// form (`304.0` reads `"304"`), null stays null.
    pub fn to_text(&self) -> CellValue {
        match self {
            CellValue::Null => CellValue::Null,
            CellValue::Text(s) => CellValue::Text(s.clone()),
            other => CellValue::Text(other.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Calendar date of a `Date` or `DateTime` cell.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            CellValue::Date(d) => Some(*d),
            CellValue::DateTime(dt) => Some(dt.date()),
            _ => None,
        }
    }

    /// Time of day of a `Time` or `DateTime` cell.
    pub fn as_time(&self) -> Option<NaiveTime> {
        match self {
            CellValue::Time(t) => Some(*t),
            CellValue::DateTime(dt) => Some(dt.time()),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            CellValue::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    pub fn kind(&self) -> ColumnType {
        match self {
            CellValue::Text(_) => ColumnType::Text,
            CellValue::Number(_) => ColumnType::Numeric,
            CellValue::DateTime(_) => ColumnType::DateTime,
            CellValue::Date(_) => ColumnType::Date,
            CellValue::Time(_) => ColumnType::Time,
            CellValue::Null => ColumnType::Null,
        }
    }
}

impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> Ordering {
        use CellValue::*;
        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Number(a), Number(b)) => a.total_cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            (Date(a), Date(b)) => a.cmp(b),
            (Time(a), Time(b)) => a.cmp(b),
            (DateTime(a), DateTime(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for CellValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            CellValue::Text(s) => s.hash(state),
            CellValue::Number(v) => v.to_bits().hash(state),
            CellValue::DateTime(dt) => dt.hash(state),
            CellValue::Date(d) => d.hash(state),
            CellValue::Time(t) => t.hash(state),
            CellValue::Null => {}
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Number(v) => write!(f, "{v}"),
            CellValue::DateTime(dt) => write!(f, "{dt}"),
            CellValue::Date(d) => write!(f, "{d}"),
            CellValue::Time(t) => write!(f, "{t}"),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Number(v)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(CellValue::Null)
    }
}

// ---------------------------------------------------------------------------
// ColumnType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Text,
    Numeric,
    DateTime,
    Date,
    Time,
    /// No non-null cell to infer from.
    Null,
    /// Non-null cells of more than one kind.
    Mixed,
}

// ---------------------------------------------------------------------------
// Column / Table
// ---------------------------------------------------------------------------

/// One named column; `values` is aligned by row index with its siblings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<CellValue>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<CellValue>) -> Self {
        Column {
            name: name.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The declared type discovered from the non-null cells.
    pub fn inferred_type(&self) -> ColumnType {
        let mut kinds = self.values.iter().filter(|v| !v.is_null()).map(CellValue::kind);
        let Some(first) = kinds.next() else {
            return ColumnType::Null;
        };
        if kinds.all(|k| k == first) {
            first
        } else {
            ColumnType::Mixed
        }
    }
}

/// An ordered set of equally long named columns. Row order is significant.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    /// Build a table, checking that every column has the same length.
    pub fn new(columns: Vec<Column>) -> DataResult<Self> {
        if let Some(first) = columns.first() {
            let n = first.len();
            if let Some(bad) = columns.iter().find(|c| c.len() != n) {
                return Err(DataError::schema(format!(
                    "column '{}' has {} rows, expected {n}",
                    bad.name,
                    bad.len()
                )));
            }
        }
        Ok(Table { columns })
    }

    /// Build a table from row-major cells. Short rows are padded with nulls;
    /// a row longer than the header is rejected.
    pub fn from_rows(names: Vec<String>, rows: Vec<Vec<CellValue>>) -> DataResult<Self> {
        let width = names.len();
        let mut columns: Vec<Column> = names
            .into_iter()
            .map(|name| Column::new(name, Vec::with_capacity(rows.len())))
            .collect();

        for (row_no, row) in rows.into_iter().enumerate() {
            if row.len() > width {
                return Err(DataError::schema(format!(
                    "row {row_no}: expected {width} fields, saw {}",
                    row.len()
                )));
            }
            let n = row.len();
            for (col, value) in columns.iter_mut().zip(row) {
                col.values.push(value);
            }
            for col in &mut columns[n..] {
                col.values.push(CellValue::Null);
            }
        }
        Ok(Table { columns })
    }

    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows() == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Named column lookup; a missing column is a schema error.
    pub fn column(&self, name: &str) -> DataResult<&Column> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| DataError::schema(format!("missing column '{name}'")))
    }

    pub(crate) fn column_mut(&mut self, name: &str) -> DataResult<&mut Column> {
        self.columns
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| DataError::schema(format!("missing column '{name}'")))
    }

    /// Cells of row `index` in column order.
    pub fn row(&self, index: usize) -> Option<Vec<&CellValue>> {
        if index >= self.n_rows() {
            return None;
        }
        Some(self.columns.iter().map(|c| &c.values[index]).collect())
    }

    /// Column name → type, discovered from the data.
    pub fn schema(&self) -> Vec<(String, ColumnType)> {
        self.columns
            .iter()
            .map(|c| (c.name.clone(), c.inferred_type()))
            .collect()
    }

    /// Fail with one schema error naming every required column that is absent.
    pub fn require_columns(&self, required: &[&str]) -> DataResult<()> {
        let missing: Vec<&str> = required
            .iter()
            .copied()
            .filter(|name| self.column_index(name).is_none())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(DataError::schema(format!(
                "missing required columns {missing:?} (found {:?})",
                self.column_names()
            )))
        }
    }

    /// Projection onto the named columns, in the order given.
    pub fn select_columns(&self, names: &[&str]) -> DataResult<Table> {
        self.require_columns(names)?;
        let columns = names
            .iter()
            .filter_map(|name| self.columns.iter().find(|c| c.name == *name))
            .cloned()
            .collect();
        Ok(Table { columns })
    }

    /// Copy of the given rows, in the order given.
    pub fn take_rows(&self, indices: &[usize]) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|c| Column::new(c.name.clone(), indices.iter().map(|&i| c.values[i].clone()).collect()))
            .collect();
        Table { columns }
    }

    pub fn remove_column(&mut self, name: &str) -> Option<Column> {
        let idx = self.column_index(name)?;
        Some(self.columns.remove(idx))
    }

    /// Insert a column at `index`, replacing any existing column of the same name.
    pub fn insert_column(&mut self, index: usize, column: Column) -> DataResult<()> {
        if !self.columns.is_empty() && column.len() != self.n_rows() {
            return Err(DataError::schema(format!(
                "column '{}' has {} rows, expected {}",
                column.name,
                column.len(),
                self.n_rows()
            )));
        }
        self.remove_column(&column.name);
        let index = index.min(self.columns.len());
        self.columns.insert(index, column);
        Ok(())
    }

    pub fn push_column(&mut self, column: Column) -> DataResult<()> {
        self.insert_column(usize::MAX, column)
    }

    /// Names of the columns whose name contains `substring` (case-sensitive).
    pub fn columns_matching(&self, substring: &str) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.name.contains(substring))
            .map(|c| c.name.as_str())
            .collect()
    }

    pub fn numeric_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.inferred_type() == ColumnType::Numeric)
            .map(|c| c.name.as_str())
            .collect()
    }
}

/// Make header names usable as keys: blank names become `Unnamed: {i}` and
/// repeated names get the first free `.{k}` suffix.
pub(crate) fn dedupe_names(names: Vec<String>) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    let mut suffixes: HashMap<String, usize> = HashMap::new();
    names
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let base = if name.trim().is_empty() {
                format!("Unnamed: {i}")
            } else {
                name
            };
            let mut out = base.clone();
            if taken.contains(&out) {
                let k = suffixes.entry(base.clone()).or_insert(0);
                loop {
                    *k += 1;
                    out = format!("{base}.{k}");
                    if !taken.contains(&out) {
                        break;
                    }
                }
            }
            taken.insert(out.clone());
            out
        })
        .collect()
}
