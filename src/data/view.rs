use super::error::DataResult;
use super::model::{CellValue, Table};

/// A read-only row subset of a [`Table`].
///
/// A view borrows its source and keeps the selected source row indices in
/// ascending order, so every view is a subsequence of the source rows.
/// Views never mutate the table they were built from.
#[derive(Debug, Clone)]
pub struct View<'a> {
    table: &'a Table,
    rows: Vec<usize>,
}

impl<'a> View<'a> {
    /// A view over every row of `table`.
    pub fn full(table: &'a Table) -> Self {
        View {
            table,
            rows: (0..table.n_rows()).collect(),
        }
    }

    pub fn table(&self) -> &'a Table {
        self.table
    }

    /// Source row indices, ascending.
    pub fn row_indices(&self) -> &[usize] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cells of `column` for the rows in this view, in view order.
    pub fn values(&self, column: &str) -> DataResult<impl Iterator<Item = &'a CellValue> + '_> {
        let col = self.table.column(column)?;
        Ok(self.rows.iter().map(move |&i| &col.values[i]))
    }

    /// Keep the rows whose source index satisfies `keep`.
    pub(crate) fn retain(&self, mut keep: impl FnMut(usize) -> bool) -> View<'a> {
        View {
            table: self.table,
            rows: self.rows.iter().copied().filter(|&i| keep(i)).collect(),
        }
    }

    /// Keep the rows at the given positions *within this view*. Positions out
    /// of range are ignored; duplicates collapse and order follows the view.
    pub fn select_positions(&self, positions: &[usize]) -> View<'a> {
        let mut wanted = vec![false; self.rows.len()];
        for &p in positions {
            if let Some(slot) = wanted.get_mut(p) {
                *slot = true;
            } else {
                log::debug!("ignoring out-of-range row position {p} (view has {} rows)", self.rows.len());
            }
        }
        View {
            table: self.table,
            rows: self
                .rows
                .iter()
                .zip(wanted)
                .filter_map(|(&i, keep)| keep.then_some(i))
                .collect(),
        }
    }

    /// The first `n` rows.
    pub fn head(&self, n: usize) -> View<'a> {
        View {
            table: self.table,
            rows: self.rows.iter().copied().take(n).collect(),
        }
    }

    /// Materialise the view as an owned table with the same columns.
    pub fn to_table(&self) -> Table {
        self.table.take_rows(&self.rows)
    }
}

impl PartialEq for View<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.table, other.table) && self.rows == other.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        Table::from_rows(
            vec!["n".to_string()],
            (0..5).map(|i| vec![CellValue::Number(i as f64)]).collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_full_view_covers_table() {
        let t = table();
        let v = View::full(&t);
        assert_eq!(v.len(), 5);
        assert_eq!(v.to_table(), t);
    }

    #[test]
    fn test_select_positions_is_subsequence() {
        let t = table();
        let v = View::full(&t).retain(|i| i % 2 == 0); // rows 0, 2, 4
        let picked = v.select_positions(&[2, 0, 2, 9]);
        assert_eq!(picked.row_indices(), &[0, 4]);
        let values: Vec<_> = picked.values("n").unwrap().cloned().collect();
        assert_eq!(values, vec![CellValue::Number(0.0), CellValue::Number(4.0)]);
    }

    #[test]
    fn test_head_and_missing_column() {
        let t = table();
        let v = View::full(&t);
        assert_eq!(v.head(2).row_indices(), &[0, 1]);
        assert!(v.values("nope").is_err());
    }
}
