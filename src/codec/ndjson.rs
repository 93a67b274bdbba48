//! Newline-delimited JSON record decoder and encoder.

use std::io::{BufRead, Lines, Write};

use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::{debug, trace};

use crate::codec::RecordSchema;
use crate::effect::CancelToken;
use crate::error::{CodecError, DecodeError, Error};
use crate::pipeline::types::{Record, Value};

/// Lazy decoder over NDJSON lines.
///
/// Blank lines are skipped. The first error is yielded once and the
/// underlying reader is dropped.
pub struct NdjsonDecoder<R> {
    lines: Option<Lines<R>>,
    fields: Vec<String>,
    line: usize,
    cancel: CancelToken,
}

impl<R: BufRead> NdjsonDecoder<R> {
    pub fn new(reader: R, schema: &RecordSchema, cancel: CancelToken) -> Self {
        Self {
            lines: Some(reader.lines()),
            fields: schema.field_names(),
            line: 0,
            cancel,
        }
    }
}

impl<R: BufRead> Iterator for NdjsonDecoder<R> {
    type Item = Result<Record, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        let lines = self.lines.as_mut()?;

        if self.cancel.is_cancelled() {
            self.lines = None;
            return Some(Err(DecodeError::Cancelled));
        }

        let result = loop {
            let text = match lines.next() {
                Some(Ok(text)) => text,
                Some(Err(e)) => break Err(DecodeError::Io(e)),
                None => {
                    debug!(lines = self.line, "Input exhausted");
                    self.lines = None;
                    return None;
                }
            };
            self.line += 1;

            if text.trim().is_empty() {
                continue;
            }
            break decode_line(&text, self.line, &self.fields);
        };

        if result.is_err() {
            self.lines = None;
        }
        Some(result)
    }
}

fn decode_line(text: &str, line: usize, fields: &[String]) -> Result<Record, DecodeError> {
    let parsed: Value =
        serde_json::from_str(text).map_err(|source| DecodeError::Json { line, source })?;

    let mut record = match parsed {
        Value::Record(record) => record,
        other => {
            return Err(DecodeError::NotARecord {
                line,
                found: other.kind(),
            });
        }
    };

    for field in fields {
        record.entry(field.clone()).or_insert(Value::Null);
    }
    trace!(line, keys = record.len(), "Decoded record");
    Ok(record)
}

/// Writes records as NDJSON, projected onto the schema's fields.
pub struct NdjsonEncoder<W: Write> {
    writer: W,
    fields: Vec<String>,
}

impl<W: Write> NdjsonEncoder<W> {
    pub fn new(writer: W, schema: &RecordSchema) -> Self {
        Self {
            writer,
            fields: schema.field_names(),
        }
    }

    /// Write every record until the stream ends or yields an error.
    ///
    /// Records written before an error are flushed; the error is returned.
    pub fn encode_all<I, E>(&mut self, records: I) -> Result<u64, Error>
    where
        I: IntoIterator<Item = Result<Record, E>>,
        E: Into<Error>,
    {
        let mut written = 0u64;
        for item in records {
            let record = match item {
                Ok(record) => record,
                Err(e) => {
                    self.flush()?;
                    return Err(e.into());
                }
            };
            self.write_record(&record)?;
            written += 1;
        }
        self.flush()?;
        Ok(written)
    }

    pub fn write_record(&mut self, record: &Record) -> Result<(), Error> {
        let projected = Projected {
            fields: &self.fields,
            record,
        };
        serde_json::to_writer(&mut self.writer, &projected).map_err(CodecError::from)?;
        self.writer
            .write_all(b"\n")
            .map_err(CodecError::from)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Error> {
        self.writer.flush().map_err(CodecError::from)?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// A record viewed through the schema's field list.
struct Projected<'a> {
    fields: &'a [String],
    record: &'a Record,
}

impl Serialize for Projected<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for field in self.fields {
            map.serialize_entry(field, self.record.get(field).unwrap_or(&Value::Null))?;
        }
        map.end()
    }
}
