use crate::error::TransformError;
use crate::transform::rule::{EmailRule, FieldRule};

/// One CSV row as raw field bytes. Fields are not required to be UTF-8.
pub type Record = Vec<Vec<u8>>;

/// Default name of the appended column.
pub const DEFAULT_COLUMN: &str = "has_email";

/// Appends one derived boolean column to every record.
///
/// The header always gains the column name. A data row whose fields are all
/// blank passes through untouched, so it ends up one field shorter than the
/// header. Every other row gains `"true"` when any field matches the rule and
/// `"false"` otherwise. A field that is not valid UTF-8 never matches.
pub struct RecordTransform {
    rule: Box<dyn FieldRule>,
    column: String,
}

impl Default for RecordTransform {
    fn default() -> Self {
        Self::new(EmailRule::new(), DEFAULT_COLUMN)
    }
}

impl RecordTransform {
    pub fn new(rule: impl FieldRule + 'static, column: impl Into<String>) -> Self {
        Self {
            rule: Box::new(rule),
            column: column.into(),
        }
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    /// Parse, transform and serialize in one go.
    pub fn process(&self, input: &[u8]) -> Result<Vec<u8>, TransformError> {
        let records = parse_records(input)?;
        if records.is_empty() {
            return Err(TransformError::EmptyInput);
        }
        serialize_records(&self.apply(records))
    }

    pub fn apply(&self, records: Vec<Record>) -> Vec<Record> {
        let mut rows = records.into_iter();
        let mut output = Vec::with_capacity(rows.len());

        if let Some(mut header) = rows.next() {
            header.push(self.column.clone().into_bytes());
            output.push(header);
        }

        for mut record in rows {
            if !is_blank(&record) {
                let flag = record.iter().any(|field| self.field_matches(field));
                record.push(flag.to_string().into_bytes());
            }
            output.push(record);
        }

        output
    }

    fn field_matches(&self, field: &[u8]) -> bool {
        std::str::from_utf8(field).is_ok_and(|text| self.rule.matches(text))
    }
}

fn is_blank(record: &[Vec<u8>]) -> bool {
    record
        .iter()
        .all(|field| std::str::from_utf8(field).is_ok_and(|text| text.trim().is_empty()))
}

/// Reads every record of `input`. Rows may have differing field counts;
/// empty lines are skipped. Quoting must be well formed: see [`check_quotes`].
pub fn parse_records(input: &[u8]) -> Result<Vec<Record>, TransformError> {
    check_quotes(input)?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(input);

    reader
        .byte_records()
        .map(|row| {
            row.map(|record| record.iter().map(<[u8]>::to_vec).collect())
                .map_err(TransformError::Malformed)
        })
        .collect()
}

#[derive(Clone, Copy)]
enum QuoteState {
    FieldStart,
    Unquoted,
    Quoted,
    /// A `"` was seen inside a quoted field: either an escape or the close.
    QuoteInQuoted,
}

/// Rejects quoting the reader would otherwise recover from silently: a `"`
/// inside an unquoted field, text after a closing quote, and a quoted field
/// still open at end of input.
fn check_quotes(input: &[u8]) -> Result<(), TransformError> {
    use QuoteState::*;

    let mut state = FieldStart;
    let mut line = 1u64;
    let mut opened_on = 1u64;

    for &byte in input {
        state = match (state, byte) {
            (FieldStart, b'"') => {
                opened_on = line;
                Quoted
            }
            (FieldStart | Unquoted | QuoteInQuoted, b',' | b'\r') => FieldStart,
            (FieldStart | Unquoted | QuoteInQuoted, b'\n') => {
                line += 1;
                FieldStart
            }
            (Unquoted, b'"') => {
                return Err(TransformError::Quoting {
                    line,
                    reason: "bare \" in non-quoted field",
                })
            }
            (FieldStart | Unquoted, _) => Unquoted,
            (Quoted, b'"') => QuoteInQuoted,
            (Quoted, b'\n') => {
                line += 1;
                Quoted
            }
            (Quoted, _) => Quoted,
            (QuoteInQuoted, b'"') => Quoted,
            (QuoteInQuoted, _) => {
                return Err(TransformError::Quoting {
                    line,
                    reason: "extraneous \" in quoted field",
                })
            }
        };
    }

    if let Quoted = state {
        return Err(TransformError::Quoting {
            line: opened_on,
            reason: "quoted field is never closed",
        });
    }
    Ok(())
}

/// Writes records as CSV with `\n` line endings, quoting only where needed.
pub fn serialize_records(records: &[Record]) -> Result<Vec<u8>, TransformError> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    for record in records {
        writer
            .write_record(record)
            .map_err(|e| TransformError::Serialize(e.to_string()))?;
    }

    writer
        .into_inner()
        .map_err(|e| TransformError::Serialize(e.to_string()))
}
