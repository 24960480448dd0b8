//! Reader and writer for ASCII matrix (`.amat`) feature tables.
//!
//! ```text
//! #size: 2 3
//! #: charge hbond_donor hydrophobic
//! 0.25 1 0
//! -0.5 0 1
//! ```
//!
//! `#:` names the columns, `#size:` optionally declares the shape, any other
//! line starting with `#` is a comment. Values are whitespace separated.

use super::traits::PointCloudFile;
use nalgebra::DMatrix;
use std::io::{self, BufRead, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AmatError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: AmatParseErrorKind },
    #[error("Inconsistent data: {0}")]
    Inconsistency(String),
}

#[derive(Debug, Error)]
pub enum AmatParseErrorKind {
    #[error("Invalid numeric value '{value}'")]
    InvalidFloat { value: String },
    #[error("Row has {found} values but {expected} columns are declared")]
    RowLength { expected: usize, found: usize },
    #[error("Malformed size header '{value}'")]
    InvalidSizeHeader { value: String },
    #[error("Field names declared more than once")]
    DuplicateHeader,
}

/// A dense table with named columns.
#[derive(Debug, Clone, PartialEq)]
pub struct AmatTable {
    pub names: Vec<String>,
    pub data: DMatrix<f64>,
}

impl AmatTable {
    pub fn new(names: Vec<String>, data: DMatrix<f64>) -> Result<Self, AmatError> {
        if names.len() != data.ncols() {
            return Err(AmatError::Inconsistency(format!(
                "{} column names for {} columns",
                names.len(),
                data.ncols()
            )));
        }
        Ok(Self { names, data })
    }

    #[inline]
    pub fn nrows(&self) -> usize {
        self.data.nrows()
    }

    #[inline]
    pub fn ncols(&self) -> usize {
        self.data.ncols()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Copies the given columns, in the given order, into a new matrix.
    pub fn select_columns(&self, columns: &[usize]) -> DMatrix<f64> {
        DMatrix::from_fn(self.nrows(), columns.len(), |r, c| {
            self.data[(r, columns[c])]
        })
    }
}

fn parse_size_header(rest: &str, line: usize) -> Result<(usize, usize), AmatError> {
    let err = || AmatError::Parse {
        line,
        kind: AmatParseErrorKind::InvalidSizeHeader {
            value: rest.trim().to_string(),
        },
    };
    let parts: Vec<&str> = rest.split_whitespace().collect();
    if parts.len() != 2 {
        return Err(err());
    }
    let rows = parts[0].parse().map_err(|_| err())?;
    let cols = parts[1].parse().map_err(|_| err())?;
    Ok((rows, cols))
}

pub struct AmatFile;

impl PointCloudFile for AmatFile {
    type Data = AmatTable;
    type Error = AmatError;

    fn read_from(reader: &mut impl BufRead) -> Result<Self::Data, Self::Error> {
        let mut names: Option<Vec<String>> = None;
        let mut declared_size: Option<(usize, usize)> = None;
        let mut width: Option<usize> = None;
        let mut values: Vec<f64> = Vec::new();
        let mut rows = 0usize;

        for (line_num, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line_num = line_num + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            if let Some(rest) = trimmed.strip_prefix("#size:") {
                declared_size = Some(parse_size_header(rest, line_num)?);
                continue;
            }
            if let Some(rest) = trimmed.strip_prefix("#:") {
                if names.is_some() {
                    return Err(AmatError::Parse {
                        line: line_num,
                        kind: AmatParseErrorKind::DuplicateHeader,
                    });
                }
                let header: Vec<String> = rest.split_whitespace().map(str::to_string).collect();
                if let Some(w) = width {
                    if w != header.len() {
                        return Err(AmatError::Parse {
                            line: line_num,
                            kind: AmatParseErrorKind::RowLength {
                                expected: w,
                                found: header.len(),
                            },
                        });
                    }
                }
                width = Some(header.len());
                names = Some(header);
                continue;
            }
            if trimmed.starts_with('#') {
                continue;
            }

            let start = values.len();
            for field in trimmed.split_whitespace() {
                let value: f64 = field.parse().map_err(|_| AmatError::Parse {
                    line: line_num,
                    kind: AmatParseErrorKind::InvalidFloat {
                        value: field.to_string(),
                    },
                })?;
                values.push(value);
            }
            let found = values.len() - start;
            match width {
                Some(expected) if expected != found => {
                    return Err(AmatError::Parse {
                        line: line_num,
                        kind: AmatParseErrorKind::RowLength { expected, found },
                    });
                }
                Some(_) => {}
                None => width = Some(found),
            }
            rows += 1;
        }

        let cols = width.unwrap_or(0);
        if let Some((declared_rows, declared_cols)) = declared_size {
            if declared_rows != rows || declared_cols != cols {
                return Err(AmatError::Inconsistency(format!(
                    "size header declares {}x{} but the data is {}x{}",
                    declared_rows, declared_cols, rows, cols
                )));
            }
        }

        let names = names.unwrap_or_else(|| (0..cols).map(|i| format!("field_{}", i)).collect());
        let data = DMatrix::from_row_slice(rows, cols, &values);
        AmatTable::new(names, data)
    }

    fn write_to(data: &Self::Data, writer: &mut impl Write) -> Result<(), Self::Error> {
        writeln!(writer, "#size: {} {}", data.nrows(), data.ncols())?;
        writeln!(writer, "#: {}", data.names.join(" "))?;
        for row in data.data.row_iter() {
            let fields: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            writeln!(writer, "{}", fields.join(" "))?;
        }
        Ok(())
    }
}
