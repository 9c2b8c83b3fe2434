//! Typed in-memory table with CSV I/O.
//!
//! The cleaning transform works on a [`Table`]: named columns over rows of
//! [`Value`] cells. Cells read from CSV stay as [`Value::Text`] (empty fields
//! become [`Value::Null`]) and are written back verbatim, so a pass that does
//! not touch a column leaves its bytes unchanged. Typed access happens on
//! demand: numeric views for range filters, date coercion for review dates.

use std::io::Write;
use std::path::Path;

use chrono::NaiveDate;

use crate::error::{CleanerError, Result};

/// A single cell in a [`Table`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Float(f64),
    Date(NaiveDate),
    Null,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Text form written to CSV output. Missing values render as the empty
    /// field; dates render in the canonical date form.
    pub fn render(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Float(f) => format!("{}", f),
            Value::Date(d) => d.format(crate::constants::CANONICAL_DATE_FORMAT).to_string(),
            Value::Null => String::new(),
        }
    }
}

/// Counts reported by [`Table::coerce_date_column`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateCoercion {
    pub parsed: usize,
    pub nulled: usize,
}

/// Column-named, row-ordered tabular data.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.headers.len()
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.headers.len() {
            return Err(CleanerError::Table(format!(
                "row has {} cells, table has {} columns",
                row.len(),
                self.headers.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Index of a named column, or a missing-column error.
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| CleanerError::MissingColumn(name.to_string()))
    }

    /// Numeric view of a column. Missing cells (empty or null) yield `None`;
    /// a non-empty cell that does not parse as a number is a data error.
    pub fn float_column(&self, name: &str) -> Result<Vec<Option<f64>>> {
        let idx = self.column_index(name)?;
        let mut out = Vec::with_capacity(self.rows.len());
        for (row_no, row) in self.rows.iter().enumerate() {
            let parsed = match &row[idx] {
                Value::Null => None,
                Value::Float(f) => Some(*f),
                Value::Text(s) if s.trim().is_empty() => None,
                Value::Text(s) => match s.trim().parse::<f64>() {
                    Ok(f) => Some(f),
                    Err(_) => {
                        return Err(CleanerError::BadNumber {
                            column: name.to_string(),
                            row: row_no,
                            value: s.clone(),
                        })
                    }
                },
                other => {
                    return Err(CleanerError::BadNumber {
                        column: name.to_string(),
                        row: row_no,
                        value: other.render(),
                    })
                }
            };
            out.push(parsed);
        }
        Ok(out)
    }

    /// New table keeping only the rows whose mask entry is true. Row order
    /// and the column set are preserved.
    pub fn retain_rows(&self, mask: &[bool]) -> Table {
        debug_assert_eq!(mask.len(), self.rows.len());
        let rows = self
            .rows
            .iter()
            .zip(mask.iter())
            .filter(|(_, keep)| **keep)
            .map(|(row, _)| row.clone())
            .collect();
        Table {
            headers: self.headers.clone(),
            rows,
        }
    }

    /// Coerces a column to dates in place. Cells parsing against any of the
    /// accepted formats become [`Value::Date`]; anything else becomes
    /// [`Value::Null`] rather than an error.
    pub fn coerce_date_column(&mut self, name: &str, formats: &[&str]) -> Result<DateCoercion> {
        let idx = self.column_index(name)?;
        let mut stats = DateCoercion::default();
        for row in &mut self.rows {
            let coerced = match &row[idx] {
                Value::Date(d) => Some(*d),
                Value::Null => None,
                Value::Text(s) if s.trim().is_empty() => None,
                Value::Text(s) => {
                    let trimmed = s.trim();
                    formats
                        .iter()
                        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
                }
                Value::Float(_) => None,
            };
            match coerced {
                Some(d) => {
                    stats.parsed += 1;
                    row[idx] = Value::Date(d);
                }
                None => {
                    if !row[idx].is_null() {
                        stats.nulled += 1;
                    }
                    row[idx] = Value::Null;
                }
            }
        }
        Ok(stats)
    }

    /// Reads a headered CSV file. Every cell is kept as text; empty fields
    /// become missing values.
    pub fn from_csv_path(path: &Path) -> Result<Table> {
        let mut reader = csv::Reader::from_path(path)?;
        let headers = reader
            .headers()?
            .iter()
            .map(|h| h.to_string())
            .collect::<Vec<_>>();
        let mut table = Table::new(headers);
        for record in reader.records() {
            let record = record?;
            let row = record
                .iter()
                .map(|cell| {
                    if cell.is_empty() {
                        Value::Null
                    } else {
                        Value::Text(cell.to_string())
                    }
                })
                .collect();
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Writes the table as headered CSV.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&self.headers)?;
        for row in &self.rows {
            wtr.write_record(row.iter().map(|v| v.render()))?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn to_csv_path(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)?;
        self.write_csv(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> Table {
        let mut t = Table::new(vec![
            "id".to_string(),
            "price".to_string(),
            "last_review".to_string(),
        ]);
        t.push_row(vec![
            Value::Text("1".to_string()),
            Value::Text("120".to_string()),
            Value::Text("2019-05-21".to_string()),
        ])
        .unwrap();
        t.push_row(vec![
            Value::Text("2".to_string()),
            Value::Null,
            Value::Text("not-a-date".to_string()),
        ])
        .unwrap();
        t
    }

    #[test]
    fn float_column_parses_and_skips_missing() {
        let t = sample_table();
        let prices = t.float_column("price").unwrap();
        assert_eq!(prices, vec![Some(120.0), None]);
    }

    #[test]
    fn float_column_rejects_garbage() {
        let mut t = sample_table();
        t.push_row(vec![
            Value::Text("3".to_string()),
            Value::Text("cheap".to_string()),
            Value::Null,
        ])
        .unwrap();
        let err = t.float_column("price").unwrap_err();
        assert!(matches!(err, CleanerError::BadNumber { row: 2, .. }));
    }

    #[test]
    fn missing_column_is_an_error() {
        let t = sample_table();
        let err = t.float_column("rating").unwrap_err();
        assert!(matches!(err, CleanerError::MissingColumn(name) if name == "rating"));
    }

    #[test]
    fn retain_rows_keeps_order_and_schema() {
        let t = sample_table();
        let kept = t.retain_rows(&[false, true]);
        assert_eq!(kept.headers(), t.headers());
        assert_eq!(kept.n_rows(), 1);
        assert_eq!(kept.rows()[0][0], Value::Text("2".to_string()));
    }

    #[test]
    fn date_coercion_parses_or_nulls() {
        let mut t = sample_table();
        let stats = t
            .coerce_date_column("last_review", crate::constants::ACCEPTED_DATE_FORMATS)
            .unwrap();
        assert_eq!(stats.parsed, 1);
        assert_eq!(stats.nulled, 1);
        assert_eq!(
            t.rows()[0][2],
            Value::Date(NaiveDate::from_ymd_opt(2019, 5, 21).unwrap())
        );
        assert!(t.rows()[1][2].is_null());
    }

    #[test]
    fn csv_roundtrip_preserves_untouched_cells() {
        let t = sample_table();
        let mut buf = Vec::new();
        t.write_csv(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "id,price,last_review\n1,120,2019-05-21\n2,,not-a-date\n");
    }

    #[test]
    fn push_row_checks_arity() {
        let mut t = sample_table();
        let err = t.push_row(vec![Value::Null]).unwrap_err();
        assert!(matches!(err, CleanerError::Table(_)));
    }

    #[test]
    fn empty_table_writes_header_only() {
        let t = Table::new(vec!["a".to_string(), "b".to_string()]);
        let mut buf = Vec::new();
        t.write_csv(&mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "a,b\n");
    }
}
