//! Structural CSV parsing
//!
//! Turns raw upload bytes into header-keyed row maps. Everything here is
//! shape-only: headers must be unique and non-empty, data rows must match
//! the header's column count, blank rows are skipped. Business meaning is
//! the validators' job.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Structural errors. Any of these fails the whole file before a single
/// row is validated.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("CSV file is empty")]
    Empty,
    #[error("column {0} has empty header")]
    EmptyHeader(usize),
    #[error("duplicate header column: {0}")]
    DuplicateHeader(String),
    #[error("row {row} has {found} columns, expected {expected}")]
    ColumnCount {
        row: i32,
        found: usize,
        expected: usize,
    },
    #[error("CSV file contains no data rows")]
    NoDataRows,
    #[error("failed to read CSV row: {0}")]
    Malformed(#[from] csv::Error),
}

/// One data row of the CSV, keyed by header name.
///
/// `line` is the 1-based source line the record starts on (the header is
/// line 1), so error reports always point at the right place in the file
/// even when blank rows were skipped above it.
#[derive(Debug, Clone)]
pub struct CsvRow {
    pub line: i32,
    pub values: HashMap<String, String>,
}

impl CsvRow {
    pub fn new(line: i32, values: HashMap<String, String>) -> Self {
        Self { line, values }
    }

    /// Value for a column, already trimmed; empty string when absent.
    pub fn get(&self, column: &str) -> &str {
        self.values.get(column).map(String::as_str).unwrap_or("")
    }
}

/// Parse a CSV upload into `(rows, headers)`.
///
/// The first record is always the header row. Headers and all field
/// values are trimmed of surrounding whitespace. Rows whose every field
/// is blank are skipped silently and do not count as data.
pub fn parse_csv(input: &[u8]) -> Result<(Vec<CsvRow>, Vec<String>), ParseError> {
    let input = input.strip_prefix(UTF8_BOM).unwrap_or(input);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(input);

    let mut records = reader.records();

    let header_record = match records.next() {
        Some(record) => record?,
        None => return Err(ParseError::Empty),
    };

    let mut headers = Vec::with_capacity(header_record.len());
    let mut seen = HashSet::new();
    for (i, header) in header_record.iter().enumerate() {
        let header = header.trim();
        if header.is_empty() {
            return Err(ParseError::EmptyHeader(i + 1));
        }
        if !seen.insert(header.to_string()) {
            return Err(ParseError::DuplicateHeader(header.to_string()));
        }
        headers.push(header.to_string());
    }

    let mut rows = Vec::new();
    for record in records {
        let record = record?;
        // 1-based source line of this record; the csv reader skips fully
        // empty lines, so the position is the ground truth for numbering
        let line = record
            .position()
            .map(|p| p.line() as i32)
            .unwrap_or((rows.len() + 2) as i32);

        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }

        if record.len() != headers.len() {
            return Err(ParseError::ColumnCount {
                row: line,
                found: record.len(),
                expected: headers.len(),
            });
        }

        let values = headers
            .iter()
            .zip(record.iter())
            .map(|(header, value)| (header.clone(), value.trim().to_string()))
            .collect();
        rows.push(CsvRow::new(line, values));
    }

    if rows.is_empty() {
        return Err(ParseError::NoDataRows);
    }

    Ok((rows, headers))
}

// ==========================================================================
// Tests
// ==========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_csv() {
        let input = b"name,age\nAlice,10\nBob,11\n";
        let (rows, headers) = parse_csv(input).unwrap();
        assert_eq!(headers, vec!["name", "age"]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("name"), "Alice");
        assert_eq!(rows[0].line, 2);
        assert_eq!(rows[1].get("age"), "11");
        assert_eq!(rows[1].line, 3);
    }

    #[test]
    fn test_values_and_headers_are_trimmed() {
        let input = b" name , age \n Alice , 10 \n";
        let (rows, headers) = parse_csv(input).unwrap();
        assert_eq!(headers, vec!["name", "age"]);
        assert_eq!(rows[0].get("name"), "Alice");
        assert_eq!(rows[0].get("age"), "10");
    }

    #[test]
    fn test_bom_is_stripped_before_header() {
        let input = b"\xEF\xBB\xBFname,age\nAlice,10\n";
        let (_, headers) = parse_csv(input).unwrap();
        assert_eq!(headers[0], "name");
    }

    #[test]
    fn test_empty_file_is_structural_error() {
        let err = parse_csv(b"").unwrap_err();
        assert!(matches!(err, ParseError::Empty));
    }

    #[test]
    fn test_empty_header_is_structural_error() {
        let err = parse_csv(b"name,,age\nAlice,x,10\n").unwrap_err();
        assert!(matches!(err, ParseError::EmptyHeader(2)));
    }

    #[test]
    fn test_duplicate_header_is_structural_error() {
        let err = parse_csv(b"name,name\nAlice,Bob\n").unwrap_err();
        match err {
            ParseError::DuplicateHeader(name) => assert_eq!(name, "name"),
            other => panic!("expected duplicate header error, got {other:?}"),
        }
    }

    #[test]
    fn test_column_count_mismatch_cites_row_number() {
        let err = parse_csv(b"name,age,gender\nAlice,10,female\nBob,11\n").unwrap_err();
        match err {
            ParseError::ColumnCount {
                row,
                found,
                expected,
            } => {
                assert_eq!(row, 3);
                assert_eq!(found, 2);
                assert_eq!(expected, 3);
            }
            other => panic!("expected column count error, got {other:?}"),
        }
    }

    #[test]
    fn test_blank_rows_are_skipped_without_losing_line_numbers() {
        let input = b"name,age\nAlice,10\n,\n\nBob,11\n";
        let (rows, _) = parse_csv(input).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].line, 2);
        // Bob sits on source line 5: a blank-fields row and an empty line
        // come before him, and neither may shift his reported position
        assert_eq!(rows[1].line, 5);
        assert_eq!(rows[1].get("name"), "Bob");
    }

    #[test]
    fn test_header_only_file_has_no_data_rows() {
        let err = parse_csv(b"name,age\n").unwrap_err();
        assert!(matches!(err, ParseError::NoDataRows));

        let err = parse_csv(b"name,age\n,\n").unwrap_err();
        assert!(matches!(err, ParseError::NoDataRows));
    }

    #[test]
    fn test_every_row_is_keyed_by_every_header() {
        let input = b"name,age,gender\nAlice,10,female\n";
        let (rows, headers) = parse_csv(input).unwrap();
        for row in &rows {
            for header in &headers {
                assert!(row.values.contains_key(header));
            }
        }
    }

    #[test]
    fn test_missing_column_reads_as_empty_string() {
        let input = b"name\nAlice\n";
        let (rows, _) = parse_csv(input).unwrap();
        assert_eq!(rows[0].get("nickname"), "");
    }
}
