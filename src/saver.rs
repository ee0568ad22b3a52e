//! The output writer.
//!
//! An [`AutoSaver`] writes a table, series or array as delimited text.
//! When an example file is configured (a submission template, typically),
//! the saver sniffs its delimiter, header and encoding and speculates the
//! output into the same layout: extra leading index columns are dropped, a
//! missing index column is synthesized, and the example's header line is
//! reused. Each save can append a human-readable memo line to a `memo.txt`
//! sidecar next to the outputs.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::content::{Array2, Scalar};
use crate::error::{Error, Result};
use crate::frame::{Frame, Series, Value};

/// How delimited output is written when no example file is given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOptions {
    /// The field delimiter.
    pub delimiter: u8,
    /// Whether to write a header line.
    pub header: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self { delimiter: b',', header: true }
    }
}

/// Values the saver can lay out as a table.
pub trait AsFrame {
    fn as_frame(&self) -> Frame;
}

impl AsFrame for Frame {
    fn as_frame(&self) -> Frame {
        self.clone()
    }
}

impl AsFrame for Series {
    fn as_frame(&self) -> Frame {
        let label = self.name().unwrap_or("0").to_string();
        let rows = self.values().iter().map(|value| vec![value.clone()]).collect();
        Frame::new(vec![label], rows).with_index(self.index().to_vec())
    }
}

impl<T: Scalar + Into<Value>> AsFrame for Array2<T> {
    fn as_frame(&self) -> Frame {
        let (n_rows, n_cols) = self.shape();
        let columns = (0..n_cols).map(|col| col.to_string()).collect();
        let rows = (0..n_rows)
            .map(|row| (0..n_cols).map(|col| self.get(row, col).into()).collect())
            .collect();
        Frame::new(columns, rows)
    }
}

impl<T: Scalar + Into<Value>> AsFrame for Vec<T> {
    fn as_frame(&self) -> Frame {
        let rows = self.iter().map(|value| vec![(*value).into()]).collect();
        Frame::new(vec!["0".to_string()], rows)
    }
}

/// Writes computation outputs as delimited text files.
pub struct AutoSaver {
    save_dir: PathBuf,
    example_path: Option<PathBuf>,
    options: Option<WriteOptions>,
}

impl AutoSaver {
    /// Create a saver targeting a directory, creating it if missing.
    pub fn new(save_dir: impl Into<PathBuf>) -> Result<Self> {
        let save_dir = save_dir.into();
        if !save_dir.as_os_str().is_empty() && !save_dir.exists() {
            fs::create_dir_all(&save_dir).map_err(Error::io(&save_dir))?;
        }
        Ok(Self { save_dir, example_path: None, options: None })
    }

    /// Configure an example file whose layout outputs must match.
    ///
    /// Mutually exclusive with [`with_options`](Self::with_options).
    pub fn with_example(mut self, path: impl Into<PathBuf>) -> Result<Self> {
        if self.options.is_some() {
            return Err(Error::ExampleWithOptions);
        }
        self.example_path = Some(path.into());
        Ok(self)
    }

    /// Configure explicit write options.
    ///
    /// Mutually exclusive with [`with_example`](Self::with_example).
    pub fn with_options(mut self, options: WriteOptions) -> Result<Self> {
        if self.example_path.is_some() {
            return Err(Error::ExampleWithOptions);
        }
        self.options = Some(options);
        Ok(self)
    }

    /// Write a value as a delimited file.
    ///
    /// Without a filename, a `MMDD-HHMMSS.csv` timestamp name is used. The
    /// memo, if any, is appended to `memo.txt` in the save directory.
    /// Returns the path of the written file.
    pub fn save<T: AsFrame>(
        &self,
        value: &T,
        filename: Option<&str>,
        memo: Option<&str>,
    ) -> Result<PathBuf> {
        let filename = match filename {
            Some(name) => name.to_string(),
            None => chrono::Local::now().format("%m%d-%H%M%S.csv").to_string(),
        };
        let path = self.save_dir.join(&filename);
        let frame = value.as_frame();

        if let Some(example_path) = &self.example_path {
            let example = ExampleLayout::sniff(example_path)?;
            let shaped = example.speculate(frame)?;
            let header = example.cleaned_header();
            let mut file = fs::File::create(&path).map_err(Error::io(&path))?;
            shaped
                .write_delimited(&mut file, example.delimiter, header.as_deref())
                .map_err(Error::io(&path))?;
        } else {
            let options = self.options.clone().unwrap_or_default();
            let header = options.header.then(|| frame.columns().to_vec());
            let mut file = fs::File::create(&path).map_err(Error::io(&path))?;
            frame
                .write_delimited(&mut file, options.delimiter, header.as_deref())
                .map_err(Error::io(&path))?;
        }

        if let Some(memo) = memo {
            let memo_path = self.save_dir.join("memo.txt");
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&memo_path)
                .map_err(Error::io(&memo_path))?;
            writeln!(file, "{filename}: {memo}").map_err(Error::io(&memo_path))?;
        }

        Ok(path)
    }
}

/// The sampled layout of an example file.
struct ExampleLayout {
    delimiter: u8,
    has_header: bool,
    frame: Frame,
}

impl ExampleLayout {
    /// Sample delimiter, header and encoding from an example file.
    fn sniff(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(Error::io(path))?;
        // Tolerate a UTF-8 byte order mark and lossily decode the rest.
        let bytes = bytes.strip_prefix(b"\xef\xbb\xbf").unwrap_or(&bytes);
        let text = String::from_utf8_lossy(bytes);

        let delimiter = sniff_delimiter(&text);
        let has_header = sniff_header(&text, delimiter);
        let frame = Frame::parse_delimited(&text, delimiter, has_header);
        Ok(Self { delimiter, has_header, frame })
    }

    /// The example's header labels with `Unnamed: N` placeholders blanked,
    /// or `None` if the example has no header line.
    fn cleaned_header(&self) -> Option<Vec<String>> {
        self.has_header.then(|| {
            self.frame
                .columns()
                .iter()
                .map(|label| if is_unnamed(label) { String::new() } else { label.clone() })
                .collect()
        })
    }

    /// Reshape a frame to the example's column layout.
    fn speculate(&self, mut frame: Frame) -> Result<Frame> {
        let target = self.frame.shape().1;

        // Too wide: drop leading index-like columns.
        while frame.shape().1 > target {
            let first: Vec<Value> = frame.column(0).cloned().collect();
            if speculate_ordered(&first).is_none() {
                return Err(Error::Speculation(
                    "the number of columns of 'X' is larger than that in the \
                     example file"
                        .into(),
                ));
            }
            frame.drop_first_column();
        }

        // Too narrow: synthesize index columns.
        while frame.shape().1 < target {
            frame = self.add_index_column(frame)?;
        }

        // Align the first column to the example's ordered index.
        let example_first: Vec<Value> = self.frame.column(0).cloned().collect();
        if let Some(Value::Int(start)) = speculate_ordered(&example_first) {
            for row in 0..frame.shape().0 {
                frame.set(row, 0, Value::Int(start + row as i64));
            }
        }

        Ok(frame)
    }

    /// Prepend the frame's own index as a column, reconciling it with the
    /// corresponding example column.
    fn add_index_column(&self, mut frame: Frame) -> Result<Frame> {
        let too_small = || {
            Error::Speculation(
                "the number of columns of 'X' is smaller than that in the \
                 example file"
                    .into(),
            )
        };

        let col_ix = self.frame.shape().1 - frame.shape().1 - 1;
        let example_col: Vec<Value> = self.frame.column(col_ix).cloned().collect();

        let index: Vec<Value> = frame
            .index()
            .iter()
            .map(|label| match label.as_f64() {
                Some(float) => Value::Int(float as i64),
                None => label.clone(),
            })
            .collect();
        frame.insert_first_column(String::new(), index);

        match speculate_ordered(&example_col) {
            Some(example_start) => {
                let own: Vec<Value> = frame.column(0).cloned().collect();
                match speculate_ordered(&own) {
                    Some(start) if start == example_start => {}
                    _ => match example_start {
                        Value::Int(0) => {
                            for row in 0..frame.shape().0 {
                                frame.set(row, 0, Value::Int(row as i64));
                            }
                        }
                        Value::Int(1) => {
                            for row in 0..frame.shape().0 {
                                frame.set(row, 0, Value::Int(row as i64 + 1));
                            }
                        }
                        _ => return Err(too_small()),
                    },
                }
            }
            None if frame.shape().0 == self.frame.shape().0 => {
                let replacement: Vec<Value> = self.frame.column(0).cloned().collect();
                for (row, value) in replacement.into_iter().enumerate() {
                    frame.set(row, 0, value);
                }
            }
            None => return Err(too_small()),
        }

        Ok(frame)
    }
}

/// Pick the delimiter whose per-line field count is consistent and maximal
/// over the first sampled lines.
fn sniff_delimiter(text: &str) -> u8 {
    const CANDIDATES: [u8; 4] = [b',', b';', b'\t', b'|'];

    let lines: Vec<&str> = text.lines().filter(|line| !line.is_empty()).take(10).collect();
    let mut best = b',';
    let mut best_count = 0;
    for candidate in CANDIDATES {
        let counts: Vec<usize> =
            lines.iter().map(|line| line.matches(candidate as char).count()).collect();
        let Some(&first) = counts.first() else { continue };
        if first > best_count && counts.iter().all(|&count| count == first) {
            best = candidate;
            best_count = first;
        }
    }
    best
}

/// A header is assumed when no first-line field looks numeric.
fn sniff_header(text: &str, delimiter: u8) -> bool {
    let Some(first) = text.lines().find(|line| !line.is_empty()) else {
        return false;
    };
    first
        .split(delimiter as char)
        .all(|field| !Value::parse(field.trim_matches('"')).is_numeric())
}

fn is_unnamed(label: &str) -> bool {
    label
        .strip_prefix("Unnamed: ")
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
}

/// Whether the values look like an ordered index; returns the first value.
///
/// Text sequences count as ordered by convention (a label column), numeric
/// sequences are sampled for a constant unit step.
fn speculate_ordered(values: &[Value]) -> Option<Value> {
    if values.is_empty() {
        return None;
    }
    if values.iter().all(|value| !value.is_numeric()) {
        return Some(values[0].clone());
    }

    let step = values.len() / 100 + 1;
    let mut i = 0;
    while i + step < values.len() {
        let low = values[i].as_f64()?;
        let high = values[i + step].as_f64()?;
        if high - low != step as f64 {
            return None;
        }
        i += step;
    }
    Some(values[0].clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_delimiter() {
        assert_eq!(sniff_delimiter("a,b,c\n1,2,3\n"), b',');
        assert_eq!(sniff_delimiter("a;b;c\n1;2;3\n"), b';');
        assert_eq!(sniff_delimiter("a\tb\n1\t2\n"), b'\t');
    }

    #[test]
    fn test_sniff_header() {
        assert!(sniff_header("id,score\n1,0.5\n", b','));
        assert!(!sniff_header("1,0.5\n2,0.7\n", b','));
    }

    #[test]
    fn test_speculate_ordered() {
        let ordered: Vec<Value> = (3..7).map(Value::Int).collect();
        assert_eq!(speculate_ordered(&ordered), Some(Value::Int(3)));

        let unordered = vec![Value::Int(3), Value::Int(9), Value::Int(4), Value::Int(5)];
        assert_eq!(speculate_ordered(&unordered), None);

        let labels = vec![Value::Str("a".into()), Value::Str("b".into())];
        assert_eq!(speculate_ordered(&labels), Some(Value::Str("a".into())));
    }

    #[test]
    fn test_unnamed_labels() {
        assert!(is_unnamed("Unnamed: 0"));
        assert!(!is_unnamed("Unnamed: x"));
        assert!(!is_unnamed("score"));
    }
}
