use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// CellValue – a single cell of the loaded table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell, as produced by the CSV / spreadsheet parsers.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// Empty or absent cell. Distinct from zero.
    Null,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Null => Ok(()),
        }
    }
}

impl CellValue {
    /// Numeric coercion used for features and targets.
    ///
    /// Never fails: `Null`, blank text and unparseable text all become
    /// [`MISSING`]. Text spelling a non-finite number (`inf`, `NaN`) is
    /// missing too. Booleans map to `1.0` / `0.0`.
    pub fn to_numeric(&self) -> f64 {
        match self {
            CellValue::Float(v) => *v,
            CellValue::Integer(i) => *i as f64,
            CellValue::Bool(b) => f64::from(u8::from(*b)),
            CellValue::String(s) => parse_finite(s.trim()).unwrap_or(MISSING),
            CellValue::Null => MISSING,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

/// Sentinel for a missing or unparseable numeric value.
pub const MISSING: f64 = f64::NAN;

/// Guess the type of a raw text cell: integer, float, boolean, else string.
/// Empty text is `Null`.
pub fn guess_cell_type(s: &str) -> CellValue {
    if s.is_empty() {
        return CellValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return CellValue::Integer(i);
    }
    if let Some(f) = parse_finite(s) {
        return CellValue::Float(f);
    }
    if s == "true" || s == "false" {
        return CellValue::Bool(s == "true");
    }
    CellValue::String(s.to_string())
}

/// `str::parse` also accepts `inf`, `infinity` and `NaN`; those are not data.
fn parse_finite(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

// ---------------------------------------------------------------------------
// Record – one row of the table
// ---------------------------------------------------------------------------

/// Column names with a name → position index. Loaders build one per table
/// and share it between every row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Columns {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl Columns {
    /// Repeats of a name after its first occurrence are dropped.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut columns = Columns::default();
        for name in names {
            columns.push(name.into());
        }
        columns
    }

    fn push(&mut self, name: String) -> usize {
        if let Some(&pos) = self.index.get(&name) {
            return pos;
        }
        let pos = self.names.len();
        self.index.insert(name.clone(), pos);
        self.names.push(name);
        pos
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// One row: a value per column, in column order.
///
/// `values` always has exactly one entry per column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    columns: Arc<Columns>,
    values: Vec<CellValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Row over shared columns. Short rows are padded with `Null`, extra
    /// values are dropped.
    pub fn with_values(columns: Arc<Columns>, mut values: Vec<CellValue>) -> Self {
        values.resize(columns.len(), CellValue::Null);
        Record { columns, values }
    }

    /// Set a column, replacing any earlier value for the same key. A new key
    /// unshares this row's columns.
    pub fn insert(&mut self, key: impl Into<String>, value: CellValue) {
        let key = key.into();
        match self.columns.position(&key) {
            Some(pos) => self.values[pos] = value,
            None => {
                Arc::make_mut(&mut self.columns).push(key);
                self.values.push(value);
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&CellValue> {
        self.columns.position(key).and_then(|pos| self.values.get(pos))
    }

    /// Numeric value of a column; absent keys coerce like `Null`.
    pub fn numeric(&self, key: &str) -> f64 {
        self.get(key).map_or(MISSING, CellValue::to_numeric)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.columns.names().iter().map(String::as_str)
    }

    pub fn columns(&self) -> &Arc<Columns> {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, CellValue)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, CellValue)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

// ---------------------------------------------------------------------------
// ParsedTable / LoadedData
// ---------------------------------------------------------------------------

/// Raw parser output, before datetime inference.
#[derive(Debug, Clone, Default)]
pub struct ParsedTable {
    pub headers: Vec<String>,
    pub rows: Vec<Record>,
}

/// A loaded time-series table. Rebuilt from scratch on every load.
#[derive(Debug, Clone)]
pub struct LoadedData {
    /// Column names in first-seen order. Never empty.
    pub headers: Vec<String>,
    /// Rows in file order; the order is the time axis.
    pub rows: Vec<Record>,
    /// Header inferred to hold timestamps, if any. Always one of `headers`.
    pub datetime_key: Option<String>,
}

impl LoadedData {
    /// Wrap parser output and run datetime inference.
    pub fn from_table(table: ParsedTable) -> Self {
        let datetime_key = infer_datetime_key(&table.headers).map(str::to_string);
        LoadedData {
            headers: table.headers,
            rows: table.rows,
            datetime_key,
        }
    }

    pub fn has_column(&self, key: &str) -> bool {
        self.headers.iter().any(|h| h == key)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// First header whose lowercase text contains `date` or `time`.
pub fn infer_datetime_key(headers: &[String]) -> Option<&str> {
    headers
        .iter()
        .find(|h| {
            let lower = h.to_lowercase();
            lower.contains("date") || lower.contains("time")
        })
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn datetime_inference_is_case_insensitive_first_match() {
        let h = headers(&["value", "Timestamp", "date"]);
        assert_eq!(infer_datetime_key(&h), Some("Timestamp"));

        let h = headers(&["x", "y"]);
        assert_eq!(infer_datetime_key(&h), None);

        let h = headers(&["UPDATED", "DateOfBirth"]);
        assert_eq!(infer_datetime_key(&h), Some("UPDATED"));
    }

    #[test]
    fn numeric_coercion_uses_missing_sentinel() {
        assert_eq!(CellValue::Integer(3).to_numeric(), 3.0);
        assert_eq!(CellValue::String(" 2.5 ".into()).to_numeric(), 2.5);
        assert_eq!(CellValue::Bool(true).to_numeric(), 1.0);
        assert!(CellValue::Null.to_numeric().is_nan());
        assert!(CellValue::String(String::new()).to_numeric().is_nan());
        assert!(CellValue::String("abc".into()).to_numeric().is_nan());
        assert_eq!(CellValue::Integer(0).to_numeric(), 0.0);
    }

    #[test]
    fn non_finite_text_is_missing() {
        for text in ["inf", "-Infinity", "NaN", "1e999"] {
            assert!(CellValue::String(text.into()).to_numeric().is_nan(), "{text}");
            assert_eq!(guess_cell_type(text), CellValue::String(text.into()));
        }
        assert_eq!(guess_cell_type("1e3"), CellValue::Float(1000.0));
    }

    #[test]
    fn guess_cell_type_matches_dynamic_typing() {
        assert_eq!(guess_cell_type(""), CellValue::Null);
        assert_eq!(guess_cell_type("42"), CellValue::Integer(42));
        assert_eq!(guess_cell_type("4.5"), CellValue::Float(4.5));
        assert_eq!(guess_cell_type("true"), CellValue::Bool(true));
        assert_eq!(
            guess_cell_type("2025-01-01"),
            CellValue::String("2025-01-01".into())
        );
    }

    #[test]
    fn record_keeps_insertion_order_and_replaces() {
        let mut r: Record = [("b", CellValue::Integer(1)), ("a", CellValue::Integer(2))]
            .into_iter()
            .collect();
        r.insert("b", CellValue::Integer(9));
        assert_eq!(r.keys().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(r.get("b"), Some(&CellValue::Integer(9)));
        assert!(r.numeric("missing").is_nan());
    }

    #[test]
    fn rows_share_columns_until_one_grows() {
        let columns = Arc::new(Columns::new(["t", "v", "t"]));
        assert_eq!(columns.names().to_vec(), vec!["t", "v"]);

        let short = Record::with_values(Arc::clone(&columns), vec![CellValue::Integer(1)]);
        let mut long = Record::with_values(
            Arc::clone(&columns),
            vec![CellValue::Integer(2), CellValue::Integer(3), CellValue::Integer(4)],
        );
        assert_eq!(short.get("v"), Some(&CellValue::Null));
        assert_eq!(long.len(), 2);
        assert!(Arc::ptr_eq(short.columns(), long.columns()));

        long.insert("extra", CellValue::Bool(true));
        assert_eq!(long.keys().collect::<Vec<_>>(), vec!["t", "v", "extra"]);
        assert_eq!(short.keys().count(), 2);
        assert_eq!(short.get("extra"), None);
    }

    #[test]
    fn loaded_data_datetime_key_is_a_header() {
        let data = LoadedData::from_table(ParsedTable {
            headers: headers(&["x", "event_time"]),
            rows: vec![],
        });
        let key = data.datetime_key.as_deref().unwrap();
        assert!(data.has_column(key));
    }
}
