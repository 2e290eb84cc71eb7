//! Spreadsheet file formats: CSV via `csv`, workbooks via `calamine`
//! (read) and `rust_xlsxwriter` (write).

use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};
use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};

use simreport_shared::{FieldValue, Result, SimReportError};

/// On-disk table format, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TableFormat {
    Csv,
    Xlsx,
    /// Readable through calamine but never written (`.xls`, `.xlsb`, `.ods`).
    ReadOnlyWorkbook,
}

impl TableFormat {
    pub(crate) fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(Self::Csv),
            "xlsx" | "xlsm" => Some(Self::Xlsx),
            "xls" | "xlsb" | "ods" => Some(Self::ReadOnlyWorkbook),
            _ => None,
        }
    }
}

/// Column names plus row-major cells, every row as wide as `columns`.
pub(crate) struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<FieldValue>>,
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

pub(crate) fn read_csv(path: &Path) -> Result<Table> {
    let load_err = |e: csv::Error| SimReportError::load(path, e.to_string());

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(load_err)?;

    let columns: Vec<String> = reader
        .headers()
        .map_err(load_err)?
        .iter()
        .map(str::to_string)
        .collect();
    ensure_header(path, &columns)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(load_err)?;
        if record.len() > columns.len() {
            tracing::warn!(
                line = record.position().map(|p| p.line()),
                extra = record.len() - columns.len(),
                "row has more cells than the header; extra cells dropped"
            );
        }
        let mut row: Vec<FieldValue> = record.iter().map(FieldValue::from_cell_text).collect();
        row.resize(columns.len(), FieldValue::Null);
        rows.push(row);
    }

    Ok(Table { columns, rows })
}

/// Read the first worksheet of a workbook; its first row is the header.
pub(crate) fn read_workbook(path: &Path) -> Result<Table> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| SimReportError::load(path, e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| SimReportError::load(path, "workbook has no worksheets"))?
        .map_err(|e| SimReportError::load(path, e.to_string()))?;

    let mut sheet_rows = range.rows();
    let columns: Vec<String> = sheet_rows
        .next()
        .map(|header| header.iter().map(|cell| cell.to_string()).collect())
        .unwrap_or_default();
    ensure_header(path, &columns)?;

    let rows = sheet_rows
        .map(|cells| {
            let mut row: Vec<FieldValue> = cells.iter().map(cell_value).collect();
            row.resize(columns.len(), FieldValue::Null);
            row
        })
        .collect();

    Ok(Table { columns, rows })
}

fn ensure_header(path: &Path, columns: &[String]) -> Result<()> {
    if columns.iter().all(|c| c.trim().is_empty()) {
        return Err(SimReportError::load(path, "template has no header row"));
    }
    Ok(())
}

fn cell_value(cell: &Data) -> FieldValue {
    match cell {
        Data::Empty => FieldValue::Null,
        Data::Int(i) => FieldValue::Number(*i as f64),
        Data::Float(f) => FieldValue::Number(*f),
        Data::String(s) if s.trim().is_empty() => FieldValue::Null,
        Data::String(s) => FieldValue::Text(s.clone()),
        other => FieldValue::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

pub(crate) fn write_csv(path: &Path, columns: &[String], rows: &[Vec<FieldValue>]) -> Result<()> {
    let save_err = |e: csv::Error| SimReportError::save(path, e.to_string());

    let mut writer = csv::Writer::from_path(path).map_err(save_err)?;
    writer.write_record(columns).map_err(save_err)?;
    for row in rows {
        writer
            .write_record(row.iter().map(ToString::to_string))
            .map_err(save_err)?;
    }
    writer
        .flush()
        .map_err(|e| SimReportError::save(path, e.to_string()))
}

pub(crate) fn write_xlsx(path: &Path, columns: &[String], rows: &[Vec<FieldValue>]) -> Result<()> {
    let save_err = |e: XlsxError| SimReportError::save(path, e.to_string());

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (col, name) in columns.iter().enumerate() {
        worksheet
            .write_string(0, column_number(path, col)?, name)
            .map_err(save_err)?;
    }

    for (i, row) in rows.iter().enumerate() {
        let row_number = u32::try_from(i + 1)
            .map_err(|_| SimReportError::save(path, "too many rows for a worksheet"))?;
        for (col, value) in row.iter().enumerate() {
            write_cell(worksheet, row_number, column_number(path, col)?, value)
                .map_err(save_err)?;
        }
    }

    workbook.save(path).map_err(save_err)
}

fn column_number(path: &Path, col: usize) -> Result<u16> {
    u16::try_from(col).map_err(|_| SimReportError::save(path, "too many columns for a worksheet"))
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &FieldValue,
) -> std::result::Result<(), XlsxError> {
    match value {
        FieldValue::Null => {}
        FieldValue::Number(n) => {
            worksheet.write_number(row, col, *n)?;
        }
        FieldValue::Text(s) => {
            worksheet.write_string(row, col, s)?;
        }
        FieldValue::List(_) => {
            worksheet.write_string(row, col, value.to_string())?;
        }
    }
    Ok(())
}
