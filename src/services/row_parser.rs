//! CSV row parser for employee import files.
//!
//! Turns raw upload bytes into an ordered, lazy sequence of header-keyed
//! rows. Header problems fail the whole file; nothing here is row-level.

use std::collections::HashMap;
use std::io::Cursor;

use thiserror::Error;

/// Columns every import file must carry. Extra columns are ignored.
pub const REQUIRED_COLUMNS: [&str; 5] = ["name", "cpf", "email", "position", "hired_at"];

/// Stream-level parse failures. Any of these is fatal to the job.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("file is empty or has no header row")]
    EmptyFile,
    #[error("required column '{0}' is missing from the header")]
    MissingColumn(&'static str),
    #[error("unreadable csv stream: {0}")]
    Read(#[from] csv::Error),
}

/// One data row, keyed by header name. Row numbers are 1-based file lines;
/// the header is line 1, so data starts at 2.
#[derive(Debug, Clone)]
pub struct RawRow {
    pub number: u32,
    fields: HashMap<String, String>,
}

impl RawRow {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }

    #[cfg(test)]
    pub fn from_pairs(number: u32, pairs: &[(&str, &str)]) -> Self {
        Self {
            number,
            fields: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

/// Lazy, forward-only reader over an import file. `open` consumes the
/// header and verifies the required columns; iteration then yields rows in
/// file order exactly once.
pub struct RowReader {
    reader: csv::Reader<Cursor<Vec<u8>>>,
    headers: Vec<String>,
    line: u32,
}

impl RowReader {
    pub fn open(bytes: Vec<u8>) -> Result<Self, ParseError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(Cursor::new(bytes));

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_lowercase())
            .collect();

        if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
            return Err(ParseError::EmptyFile);
        }

        for required in REQUIRED_COLUMNS {
            if !headers.iter().any(|h| h == required) {
                return Err(ParseError::MissingColumn(required));
            }
        }

        Ok(Self {
            reader,
            headers,
            line: 1, // the header line
        })
    }
}

impl Iterator for RowReader {
    type Item = Result<RawRow, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut record = csv::StringRecord::new();
        match self.reader.read_record(&mut record) {
            Ok(false) => None,
            Err(e) => Some(Err(ParseError::Read(e))),
            Ok(true) => {
                self.line += 1;
                let fields = self
                    .headers
                    .iter()
                    .enumerate()
                    .map(|(i, header)| {
                        (header.clone(), record.get(i).unwrap_or("").to_string())
                    })
                    .collect();
                Some(Ok(RawRow {
                    number: self.line,
                    fields,
                }))
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "name,cpf,email,position,hired_at";

    fn file(body: &str) -> Vec<u8> {
        format!("{}\n{}", HEADER, body).into_bytes()
    }

    #[test]
    fn yields_rows_in_file_order_with_line_numbers() {
        let reader = RowReader::open(file(
            "Ana,111,a@x.com,Dev,2024-01-01\nBeto,222,b@x.com,QA,2024-02-01",
        ))
        .unwrap();
        let rows: Vec<RawRow> = reader.map(Result::unwrap).collect();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].number, 2);
        assert_eq!(rows[0].get("name"), Some("Ana"));
        assert_eq!(rows[1].number, 3);
        assert_eq!(rows[1].get("email"), Some("b@x.com"));
    }

    #[test]
    fn missing_required_column_fails_open() {
        let err = RowReader::open(b"name,cpf,email,position\nAna,111,a@x.com,Dev".to_vec()).err();
        assert!(matches!(err, Some(ParseError::MissingColumn("hired_at"))));
    }

    #[test]
    fn empty_file_fails_open() {
        let err = RowReader::open(Vec::new()).err();
        assert!(matches!(err, Some(ParseError::EmptyFile)));
    }

    #[test]
    fn extra_columns_are_carried_but_harmless() {
        let bytes = format!("{},notes\nAna,111,a@x.com,Dev,2024-01-01,temp", HEADER).into_bytes();
        let rows: Vec<RawRow> = RowReader::open(bytes).unwrap().map(Result::unwrap).collect();
        assert_eq!(rows[0].get("name"), Some("Ana"));
        assert_eq!(rows[0].get("notes"), Some("temp"));
    }

    #[test]
    fn header_matching_is_case_insensitive() {
        let bytes = b"Name,CPF,Email,Position,Hired_At\nAna,111,a@x.com,Dev,2024-01-01".to_vec();
        let rows: Vec<RawRow> = RowReader::open(bytes).unwrap().map(Result::unwrap).collect();
        assert_eq!(rows[0].get("cpf"), Some("111"));
    }

    #[test]
    fn short_row_reads_as_empty_fields() {
        let rows: Vec<RawRow> = RowReader::open(file("Ana,111"))
            .unwrap()
            .map(Result::unwrap)
            .collect();
        assert_eq!(rows[0].get("email"), Some(""));
    }
}
