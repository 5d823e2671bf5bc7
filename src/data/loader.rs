use std::collections::HashSet;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use calamine::{open_workbook_from_rs, Data, Reader, Xlsx, XlsxError};

use super::model::{guess_cell_type, CellValue, Columns, LoadedData, ParsedTable, Record};
use crate::error::ParseError;

// ---------------------------------------------------------------------------
// Parsing collaborators
// ---------------------------------------------------------------------------

/// Turns raw file bytes into headers + rows. Datetime inference happens
/// afterwards, in [`LoadedData::from_table`].
pub trait TableParser {
    fn parse(&self, input: &[u8]) -> Result<ParsedTable, ParseError>;
}

/// Full CSV parser: quoting, header detection, dynamic cell typing.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvParser;

/// Bare comma-split parser without quoting support. Cells stay text.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommaSplitParser;

/// Reads the first worksheet of an `.xlsx` workbook.
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxParser;

/// Options for [`load_file`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    /// Parse CSV with [`CommaSplitParser`] instead of [`CsvParser`].
    pub comma_split_csv: bool,
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Supported input formats, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Csv,
    Xlsx,
}

impl FileKind {
    pub fn from_path(path: &Path) -> Result<Self, ParseError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        match ext.as_str() {
            "csv" => Ok(FileKind::Csv),
            "xlsx" => Ok(FileKind::Xlsx),
            _ => Err(ParseError::UnsupportedFileType(ext)),
        }
    }
}

/// Read a file and load it, dispatching on its extension.
pub async fn load_file(path: &Path, options: LoadOptions) -> Result<LoadedData, ParseError> {
    let kind = FileKind::from_path(path)?;
    let bytes = tokio::fs::read(path).await?;

    let data = match kind {
        FileKind::Csv => {
            let text = std::str::from_utf8(&bytes)?;
            if options.comma_split_csv {
                load_from_csv_with(&CommaSplitParser, text)?
            } else {
                load_from_csv(text)?
            }
        }
        FileKind::Xlsx => load_from_xlsx(&bytes)?,
    };

    log::info!(
        "Loaded {} rows from {} with columns {:?} (datetime column: {:?})",
        data.len(),
        path.display(),
        data.headers,
        data.datetime_key
    );
    Ok(data)
}

/// Load CSV text with the full [`CsvParser`].
pub fn load_from_csv(text: &str) -> Result<LoadedData, ParseError> {
    load_from_csv_with(&CsvParser, text)
}

pub fn load_from_csv_with(parser: &dyn TableParser, text: &str) -> Result<LoadedData, ParseError> {
    let text = text.trim_start_matches('\u{feff}');
    if text.trim().is_empty() {
        return Err(ParseError::Empty);
    }
    let table = parser.parse(text.as_bytes())?;
    into_loaded(table)
}

/// Load an `.xlsx` workbook held in memory.
pub fn load_from_xlsx(bytes: &[u8]) -> Result<LoadedData, ParseError> {
    load_from_xlsx_with(&XlsxParser, bytes)
}

pub fn load_from_xlsx_with(
    parser: &dyn TableParser,
    bytes: &[u8],
) -> Result<LoadedData, ParseError> {
    if bytes.is_empty() {
        return Err(ParseError::Empty);
    }
    let table = parser.parse(bytes)?;
    into_loaded(table)
}

fn into_loaded(table: ParsedTable) -> Result<LoadedData, ParseError> {
    if table.headers.is_empty() {
        return Err(ParseError::MissingHeader);
    }
    Ok(LoadedData::from_table(table))
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

impl TableParser for CsvParser {
    fn parse(&self, input: &[u8]) -> Result<ParsedTable, ParseError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(input);

        let raw_headers = reader.headers()?.clone();
        if raw_headers.is_empty() {
            return Err(ParseError::MissingHeader);
        }
        let headers = unique_headers(raw_headers.iter().map(str::to_string));
        let columns = Arc::new(Columns::new(headers.iter().cloned()));

        let mut rows = Vec::new();
        for (row_no, result) in reader.records().enumerate() {
            let record = result?;
            if record.len() > headers.len() {
                log::warn!(
                    "CSV row {row_no}: {} fields beyond the {} headers ignored",
                    record.len() - headers.len(),
                    headers.len()
                );
            }

            let values = record.iter().take(headers.len()).map(guess_cell_type).collect();
            rows.push(Record::with_values(Arc::clone(&columns), values));
        }

        Ok(ParsedTable { headers, rows })
    }
}

impl TableParser for CommaSplitParser {
    fn parse(&self, input: &[u8]) -> Result<ParsedTable, ParseError> {
        let text = std::str::from_utf8(input)?;
        let mut lines = text.trim().lines();
        let header_line = lines.next().ok_or(ParseError::MissingHeader)?;
        let headers = unique_headers(header_line.split(',').map(|h| h.trim().to_string()));

        let columns = Arc::new(Columns::new(headers.iter().cloned()));

        let rows = lines
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                let values = line
                    .split(',')
                    .take(headers.len())
                    .map(|v| match v.trim() {
                        "" => CellValue::Null,
                        v => CellValue::String(v.to_string()),
                    })
                    .collect();
                Record::with_values(Arc::clone(&columns), values)
            })
            .collect();

        Ok(ParsedTable { headers, rows })
    }
}

// ---------------------------------------------------------------------------
// XLSX
// ---------------------------------------------------------------------------

impl TableParser for XlsxParser {
    fn parse(&self, input: &[u8]) -> Result<ParsedTable, ParseError> {
        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(input))
            .map_err(|e: XlsxError| ParseError::Spreadsheet(e.to_string()))?;

        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| ParseError::Spreadsheet("workbook has no worksheets".into()))?
            .map_err(|e| ParseError::Spreadsheet(e.to_string()))?;

        let mut sheet_rows = range.rows();
        let Some(header_row) = sheet_rows.next() else {
            return Ok(ParsedTable::default());
        };
        if header_row.iter().all(|c| matches!(c, Data::Empty)) {
            return Ok(ParsedTable::default());
        }
        let headers = unique_headers(header_row.iter().map(|c| c.to_string()));
        let columns = Arc::new(Columns::new(headers.iter().cloned()));

        let rows = sheet_rows
            .filter(|cells| !cells.iter().all(|c| matches!(c, Data::Empty)))
            .map(|cells| {
                let values = cells.iter().take(headers.len()).map(sheet_cell).collect();
                Record::with_values(Arc::clone(&columns), values)
            })
            .collect();

        Ok(ParsedTable { headers, rows })
    }
}

/// Raw spreadsheet cell → [`CellValue`]. Dates keep their serial number.
fn sheet_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Int(i) => CellValue::Integer(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => CellValue::Float(dt.as_f64()),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => {
            if s.is_empty() {
                CellValue::Null
            } else {
                CellValue::String(s.clone())
            }
        }
        Data::Error(_) | Data::Empty => CellValue::Null,
    }
}

// -- shared helpers --

/// Blank headers become `__EMPTY`; repeats get `_1`, `_2`, ... suffixes.
fn unique_headers<I: IntoIterator<Item = String>>(raw: I) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut headers = Vec::new();

    for h in raw {
        let base = match h.trim() {
            "" => "__EMPTY".to_string(),
            trimmed => trimmed.to_string(),
        };
        let mut name = base.clone();
        let mut n = 1;
        while seen.contains(&name) {
            name = format!("{base}_{n}");
            n += 1;
        }
        seen.insert(name.clone());
        headers.push(name);
    }
    headers
}
