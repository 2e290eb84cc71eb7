//! In-memory tabular dataset that accumulates one row per processed report.
//!
//! A [`Dataset`] is loaded from a template (which fixes column order and may
//! already hold rows), grows by [`Dataset::append`], and is written back once
//! with [`Dataset::persist`]. Sequential identifiers come from
//! [`Dataset::next_id`].

mod table;

use std::path::Path;

use tracing::{info, instrument};

use simreport_shared::schema::ENTITY_ID_COLUMN;
use simreport_shared::{FieldValue, Result, Row, SimReportError};

use table::{Table, TableFormat};

/// Ordered rows sharing one column list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<FieldValue>>,
}

impl Dataset {
    /// An empty dataset with the given column order.
    pub fn with_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Load a template: header row plus any pre-existing rows.
    ///
    /// `.csv` is read with the `csv` crate; `.xlsx`, `.xlsm`, `.xls`, `.xlsb`
    /// and `.ods` are read from their first worksheet.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self> {
        let Table { columns, rows } = match TableFormat::from_path(path) {
            Some(TableFormat::Csv) => table::read_csv(path)?,
            Some(TableFormat::Xlsx | TableFormat::ReadOnlyWorkbook) => table::read_workbook(path)?,
            None => {
                return Err(SimReportError::load(
                    path,
                    "unsupported template format (expected .csv, .xlsx, .xls or .ods)",
                ));
            }
        };

        info!(columns = columns.len(), rows = rows.len(), "loaded template");
        Ok(Self { columns, rows })
    }

    /// Write every column and row, in order, to `path`.
    ///
    /// The format follows the extension: `.csv` or `.xlsx`/`.xlsm`.
    #[instrument(skip_all, fields(path = %path.display(), rows = self.rows.len()))]
    pub fn persist(&self, path: &Path) -> Result<()> {
        match TableFormat::from_path(path) {
            Some(TableFormat::Csv) => table::write_csv(path, &self.columns, &self.rows)?,
            Some(TableFormat::Xlsx) => table::write_xlsx(path, &self.columns, &self.rows)?,
            Some(TableFormat::ReadOnlyWorkbook) | None => {
                return Err(SimReportError::save(
                    path,
                    "unsupported output format (expected .csv or .xlsx)",
                ));
            }
        }

        info!("saved dataset");
        Ok(())
    }

    /// Whether [`Dataset::persist`] can write to `path`.
    pub fn can_persist_to(path: &Path) -> bool {
        matches!(
            TableFormat::from_path(path),
            Some(TableFormat::Csv | TableFormat::Xlsx)
        )
    }

    /// Identifier for the next row: 0 when empty, else 1 + the largest id.
    ///
    /// Ids that are missing, negative, or too large to be followed by another
    /// `u64` are ignored. Gaps in existing data are left alone.
    pub fn next_id(&self) -> u64 {
        let Some(idx) = self.column_index(ENTITY_ID_COLUMN) else {
            return 0;
        };

        self.rows
            .iter()
            .filter_map(|row| row.get(idx).and_then(FieldValue::as_f64))
            .filter(|id| (0.0..u64::MAX as f64).contains(id))
            .filter_map(|id| (id.floor() as u64).checked_add(1))
            .max()
            .unwrap_or(0)
    }

    /// Add `row` after all existing rows.
    ///
    /// Template columns the row lacks stay empty. Columns the template lacks
    /// are appended to the column list, and earlier rows read empty there.
    pub fn append(&mut self, row: Row) {
        let mut cells = vec![FieldValue::Null; self.columns.len()];

        for (column, value) in row.into_cells() {
            let idx = match self.column_index(&column) {
                Some(idx) => idx,
                None => {
                    self.columns.push(column);
                    for existing in &mut self.rows {
                        existing.push(FieldValue::Null);
                    }
                    cells.push(FieldValue::Null);
                    self.columns.len() - 1
                }
            };
            cells[idx] = value;
        }

        self.rows.push(cells);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell at `row` under `column`, if both exist.
    pub fn value(&self, row: usize, column: &str) -> Option<&FieldValue> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)
    }

    fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }
}
