//! Minimal tabular data consumed by the engine, reader and saver.
//!
//! These types are deliberately small: they exist so that identities,
//! delimited files and cache artifacts have something concrete to flow
//! through, not to be a dataframe library.

use std::fmt::{self, Display, Formatter};
use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::content::ContentHash;
use crate::error::{Error, Result};
use crate::hash::hash_bytes;

/// A single table cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    Null,
}

impl Value {
    /// Parse a raw text field, preferring the narrowest type.
    pub fn parse(field: &str) -> Self {
        if field.is_empty() {
            Self::Null
        } else if let Ok(int) = field.parse::<i64>() {
            Self::Int(int)
        } else if let Ok(float) = field.parse::<f64>() {
            Self::Float(float)
        } else {
            Self::Str(field.to_string())
        }
    }

    /// Whether the cell holds a number.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_))
    }

    /// The cell as a float, if numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(int) => Some(*int as f64),
            Self::Float(float) => Some(*float),
            _ => None,
        }
    }

    /// Append a canonical, type-tagged byte encoding.
    ///
    /// The tag guarantees that `1`, `1.0` and `"1"` never encode alike.
    fn write_content(&self, buf: &mut Vec<u8>) {
        match self {
            Self::Null => buf.push(0x00),
            Self::Int(int) => {
                buf.push(0x01);
                buf.extend_from_slice(&int.to_le_bytes());
            }
            Self::Float(float) => {
                buf.push(0x02);
                buf.extend_from_slice(&float.to_le_bytes());
            }
            Self::Str(s) => {
                buf.push(0x03);
                buf.extend_from_slice(&(s.len() as u64).to_le_bytes());
                buf.extend_from_slice(s.as_bytes());
            }
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Int(int) => write!(f, "{int}"),
            Self::Float(float) => write!(f, "{float}"),
            Self::Str(s) => write!(f, "{s}"),
            Self::Null => Ok(()),
        }
    }
}

fn digest_values(values: &[Value]) -> u128 {
    let mut buf = Vec::new();
    for value in values {
        value.write_content(&mut buf);
    }
    hash_bytes(&buf)
}

fn digest_labels(labels: &[String]) -> u128 {
    let mut buf = Vec::new();
    for label in labels {
        buf.extend_from_slice(&(label.len() as u64).to_le_bytes());
        buf.extend_from_slice(label.as_bytes());
    }
    hash_bytes(&buf)
}

/// A labeled sequence of cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    name: Option<String>,
    index: Vec<Value>,
    values: Vec<Value>,
}

impl Series {
    /// Create a series with a default integer index.
    pub fn new(values: Vec<Value>) -> Self {
        let index = (0..values.len() as i64).map(Value::Int).collect();
        Self { name: None, index, values }
    }

    /// Attach a name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Replace the index labels.
    ///
    /// Panics if the length does not match.
    pub fn with_index(mut self, index: Vec<Value>) -> Self {
        assert_eq!(index.len(), self.values.len(), "index length mismatch");
        self.index = index;
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn index(&self) -> &[Value] {
        &self.index
    }
}

impl ContentHash for Series {
    /// Digest of cell content and row labels, independently combined.
    fn content_hash(&self) -> u128 {
        let mut buf = Vec::with_capacity(32);
        buf.extend_from_slice(&digest_values(&self.values).to_le_bytes());
        buf.extend_from_slice(&digest_values(&self.index).to_le_bytes());
        hash_bytes(&buf)
    }
}

/// A two-dimensional table with row index and column labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    columns: Vec<String>,
    index: Vec<Value>,
    rows: Vec<Vec<Value>>,
}

impl Frame {
    /// Create a frame from rows with a default integer index.
    ///
    /// Panics if a row's width does not match the column count.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        for row in &rows {
            assert_eq!(row.len(), columns.len(), "row width mismatch");
        }
        let index = (0..rows.len() as i64).map(Value::Int).collect();
        Self { columns, index, rows }
    }

    /// Replace the row index.
    ///
    /// Panics if the length does not match.
    pub fn with_index(mut self, index: Vec<Value>) -> Self {
        assert_eq!(index.len(), self.rows.len(), "index length mismatch");
        self.index = index;
        self
    }

    /// The `(rows, cols)` shape.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.columns.len())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn index(&self) -> &[Value] {
        &self.index
    }

    /// Read the cell at `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> &Value {
        &self.rows[row][col]
    }

    /// Overwrite the cell at `(row, col)`.
    pub fn set(&mut self, row: usize, col: usize, value: Value) {
        self.rows[row][col] = value;
    }

    /// Iterate over one column's cells.
    pub fn column(&self, col: usize) -> impl Iterator<Item = &Value> + '_ {
        self.rows.iter().map(move |row| &row[col])
    }

    /// Remove the leftmost column.
    pub(crate) fn drop_first_column(&mut self) {
        self.columns.remove(0);
        for row in &mut self.rows {
            row.remove(0);
        }
    }

    /// Insert a column at the front.
    ///
    /// Panics if the length does not match.
    pub(crate) fn insert_first_column(&mut self, label: String, values: Vec<Value>) {
        assert_eq!(values.len(), self.rows.len(), "column length mismatch");
        self.columns.insert(0, label);
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.insert(0, value);
        }
    }

    /// Swap rows and columns, exchanging the labels as well.
    ///
    /// Labels move through their text form, so a transposed-and-transposed-
    /// back frame carries the labels it started with.
    pub fn transpose(&self) -> Self {
        let (n_rows, n_cols) = self.shape();
        let columns = self.index.iter().map(|label| label.to_string()).collect();
        let index = self.columns.iter().map(|label| Value::parse(label)).collect();
        let rows = (0..n_cols)
            .map(|col| (0..n_rows).map(|row| self.rows[row][col].clone()).collect())
            .collect();
        Self { columns, index, rows }
    }

    /// Read a delimited text file.
    pub fn read_delimited(path: &Path, delimiter: u8, has_header: bool) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(Error::io(path))?;
        Ok(Self::parse_delimited(&text, delimiter, has_header))
    }

    /// Parse delimited text.
    pub fn parse_delimited(text: &str, delimiter: u8, has_header: bool) -> Self {
        let mut lines = text.lines().filter(|line| !line.is_empty());

        let columns: Vec<String> = match lines.next() {
            Some(first) if has_header => {
                split_fields(first, delimiter).into_iter().map(str::to_string).collect()
            }
            Some(first) => {
                let width = split_fields(first, delimiter).len();
                let columns = (0..width).map(|i| i.to_string()).collect();
                let rows = std::iter::once(first)
                    .chain(lines)
                    .map(|line| parse_row(line, delimiter))
                    .collect();
                return Self::new(columns, rows);
            }
            None => return Self::new(Vec::new(), Vec::new()),
        };

        let rows = lines.map(|line| parse_row(line, delimiter)).collect();
        Self::new(columns, rows)
    }

    /// Write the frame as delimited text.
    ///
    /// `header` overrides the frame's own column labels; `None` suppresses
    /// the header line entirely.
    pub fn write_delimited(
        &self,
        out: &mut dyn Write,
        delimiter: u8,
        header: Option<&[String]>,
    ) -> std::io::Result<()> {
        let delimiter = delimiter as char;
        if let Some(labels) = header {
            let line: Vec<&str> = labels.iter().map(String::as_str).collect();
            writeln!(out, "{}", line.join(&delimiter.to_string()))?;
        }
        for row in &self.rows {
            let line: Vec<String> = row.iter().map(Value::to_string).collect();
            writeln!(out, "{}", line.join(&delimiter.to_string()))?;
        }
        Ok(())
    }
}

impl ContentHash for Frame {
    /// Digests of cell content, row labels and column labels, independently
    /// computed and concatenated.
    fn content_hash(&self) -> u128 {
        let mut buf = Vec::new();
        for row in &self.rows {
            for value in row {
                value.write_content(&mut buf);
            }
        }
        let cells = hash_bytes(&buf);

        let mut combined = Vec::with_capacity(48);
        combined.extend_from_slice(&cells.to_le_bytes());
        combined.extend_from_slice(&digest_values(&self.index).to_le_bytes());
        combined.extend_from_slice(&digest_labels(&self.columns).to_le_bytes());
        hash_bytes(&combined)
    }
}

fn parse_row(line: &str, delimiter: u8) -> Vec<Value> {
    split_fields(line, delimiter).into_iter().map(Value::parse).collect()
}

/// Split one line into fields, honoring double-quoted fields.
fn split_fields(line: &str, delimiter: u8) -> Vec<&str> {
    let delimiter = delimiter as char;
    let mut fields = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    for (i, c) in line.char_indices() {
        match c {
            '"' => quoted = !quoted,
            c if c == delimiter && !quoted => {
                fields.push(unquote(&line[start..i]));
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    fields.push(unquote(&line[start..]));
    fields
}

fn unquote(field: &str) -> &str {
    let field = field.trim_end_matches('\r');
    field
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(field)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Frame {
        Frame::parse_delimited("a,b\n1,2\n3,x\n", b',', true)
    }

    #[test]
    fn test_parse() {
        let frame = sample();
        assert_eq!(frame.shape(), (2, 2));
        assert_eq!(frame.columns(), ["a", "b"]);
        assert_eq!(*frame.get(0, 1), Value::Int(2));
        assert_eq!(*frame.get(1, 1), Value::Str("x".into()));
    }

    #[test]
    fn test_parse_headerless() {
        let frame = Frame::parse_delimited("1;2\n3;4\n", b';', false);
        assert_eq!(frame.shape(), (2, 2));
        assert_eq!(frame.columns(), ["0", "1"]);
    }

    #[test]
    fn test_quoted_fields() {
        let frame = Frame::parse_delimited("a,b\n\"x,y\",2\n", b',', true);
        assert_eq!(*frame.get(0, 0), Value::Str("x,y".into()));
    }

    #[test]
    fn test_double_transpose_digest() {
        let frame = sample();
        assert_eq!(
            frame.content_hash(),
            frame.transpose().transpose().content_hash(),
        );
    }

    #[test]
    fn test_cell_change_digest() {
        let frame = sample();
        let mut changed = frame.clone();
        changed.set(0, 0, Value::Int(7));
        assert_ne!(frame.content_hash(), changed.content_hash());
    }

    #[test]
    fn test_label_change_digest() {
        let frame = sample();
        let relabeled = frame.clone().with_index(vec![Value::Int(5), Value::Int(6)]);
        assert_ne!(frame.content_hash(), relabeled.content_hash());
    }

    #[test]
    fn test_int_float_str_cells_differ() {
        let int = Frame::new(vec!["a".into()], vec![vec![Value::Int(1)]]);
        let float = Frame::new(vec!["a".into()], vec![vec![Value::Float(1.0)]]);
        let text = Frame::new(vec!["a".into()], vec![vec![Value::Str("1".into())]]);
        assert_ne!(int.content_hash(), float.content_hash());
        assert_ne!(int.content_hash(), text.content_hash());
    }
}
