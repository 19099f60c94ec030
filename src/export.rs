//! CSV and XLSX serialization of a (filtered) submission table.
//!
//! Both exporters are pure functions of the table: header row included, no
//! index column, UTF-8 throughout. Scalars render bare (a string cell is not
//! JSON-quoted); nested values that survived flattening render as compact
//! JSON text.

use std::path::{Path, PathBuf};

use rust_xlsxwriter::Workbook;
use serde_json::Value;
use snafu::{ResultExt, Snafu};

use crate::table::Table;

pub const CSV_FILE_NAME: &str = "kobo_filtered_data.csv";
pub const XLSX_FILE_NAME: &str = "kobo_filtered_data.xlsx";

const SHEET_NAME: &str = "Data";

#[derive(Debug, Snafu)]
pub enum ExportError {
    #[snafu(display("CSV serialization failed: {source}"))]
    Csv { source: csv::Error },
    #[snafu(display("CSV buffer error: {message}"))]
    CsvBuffer { message: String },
    #[snafu(display("XLSX serialization failed: {source}"))]
    Xlsx { source: rust_xlsxwriter::XlsxError },
    #[snafu(display("cannot write export file {}: {source}", path.display()))]
    WriteFile { path: PathBuf, source: std::io::Error },
}

fn cell_text(cell: &Value) -> String {
    match cell {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        nested => nested.to_string(),
    }
}

pub fn to_csv(table: &Table) -> Result<Vec<u8>, ExportError> {
    if table.n_cols() == 0 {
        return Ok(Vec::new());
    }
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(table.columns()).context(CsvSnafu)?;
    for row in table.rows() {
        writer
            .write_record(row.iter().map(cell_text))
            .context(CsvSnafu)?;
    }
    writer.into_inner().map_err(|e| ExportError::CsvBuffer {
        message: e.to_string(),
    })
}

pub fn to_xlsx(table: &Table) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME).context(XlsxSnafu)?;

    for (col, name) in table.columns().iter().enumerate() {
        sheet
            .write_string(0, col as u16, name)
            .context(XlsxSnafu)?;
    }
    for (r, row) in table.rows().iter().enumerate() {
        let r = (r + 1) as u32;
        for (c, cell) in row.iter().enumerate() {
            let c = c as u16;
            match cell {
                Value::Null => {}
                Value::Bool(b) => {
                    sheet.write_boolean(r, c, *b).context(XlsxSnafu)?;
                }
                Value::Number(n) => match n.as_f64() {
                    Some(f) => {
                        sheet.write_number(r, c, f).context(XlsxSnafu)?;
                    }
                    None => {
                        sheet.write_string(r, c, &n.to_string()).context(XlsxSnafu)?;
                    }
                },
                Value::String(s) => {
                    sheet.write_string(r, c, s).context(XlsxSnafu)?;
                }
                nested => {
                    sheet
                        .write_string(r, c, &nested.to_string())
                        .context(XlsxSnafu)?;
                }
            }
        }
    }

    workbook.save_to_buffer().context(XlsxSnafu)
}

/// Write both export files under `dir`, returning their paths.
pub fn write_snapshot(table: &Table, dir: &Path) -> Result<(PathBuf, PathBuf), ExportError> {
    std::fs::create_dir_all(dir).context(WriteFileSnafu {
        path: dir.to_path_buf(),
    })?;

    let csv_path = dir.join(CSV_FILE_NAME);
    let csv_bytes = to_csv(table)?;
    std::fs::write(&csv_path, csv_bytes).context(WriteFileSnafu {
        path: csv_path.clone(),
    })?;

    let xlsx_path = dir.join(XLSX_FILE_NAME);
    let xlsx_bytes = to_xlsx(table)?;
    std::fs::write(&xlsx_path, xlsx_bytes).context(WriteFileSnafu {
        path: xlsx_path.clone(),
    })?;

    Ok((csv_path, xlsx_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_table() -> Table {
        let results = vec![
            json!({"a": 1, "geo.lat": 10, "geo.lon": 20}),
            json!({"a": "x,y", "geo.lat": null, "geo.lon": 20}),
        ];
        Table::from_results(&results).0
    }

    #[test]
    fn csv_has_header_and_one_line_per_row() {
        let bytes = to_csv(&sample_table()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "a,geo.lat,geo.lon");
        assert_eq!(lines[1], "1,10,20");
        // embedded comma quoted, null cell empty
        assert_eq!(lines[2], "\"x,y\",,20");
    }

    #[test]
    fn csv_renders_nested_values_as_json_text() {
        let (table, _) = Table::from_results(&[json!({"tags": ["a", "b"]})]);
        let text = String::from_utf8(to_csv(&table).unwrap()).unwrap();
        assert!(text.contains("\"[\"\"a\"\",\"\"b\"\"]\""));
    }

    #[test]
    fn xlsx_buffer_is_a_zip_container() {
        let bytes = to_xlsx(&sample_table()).unwrap();
        // xlsx is a zip archive; the magic bytes are enough to prove we
        // produced a real workbook without unzipping it here
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn snapshot_writes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let (csv_path, xlsx_path) = write_snapshot(&sample_table(), dir.path()).unwrap();
        assert!(csv_path.ends_with(CSV_FILE_NAME));
        assert!(std::fs::metadata(&csv_path).unwrap().len() > 0);
        assert!(std::fs::metadata(&xlsx_path).unwrap().len() > 0);
    }
}
