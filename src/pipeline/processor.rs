//! Lazy, pull-driven tagging of a decoded record stream.
//!
//! For every record pulled from upstream:
//! 1. Upstream decode errors are forwarded and end the stream.
//! 2. The source field is read as body text (null/absent means empty).
//! 3. Addresses found in the body are appended to the existing string tags.
//! 4. The tag field is overwritten with the result; all other keys pass through.
//!
//! The first error of any kind is yielded once, after which the stream is
//! finished and the upstream iterator has been dropped.

use std::iter::FusedIterator;

use tracing::debug;

use crate::error::{DecodeError, TagError};
use crate::pipeline::address::Address;
use crate::pipeline::converter::{Converter, append_tags};
use crate::pipeline::types::{Record, Value};

/// Iterator adapter produced by [`Converter::tag_records`].
pub struct TagRecords<I> {
    /// `None` once the stream has ended or failed.
    input: Option<I>,
    converter: Converter,
    /// Address accumulator, cleared and reused for each record.
    found: Vec<Address>,
    index: usize,
}

impl Converter {
    /// Wrap a decoded record stream so each record gets its address tags.
    pub fn tag_records<I>(&self, input: I) -> TagRecords<I>
    where
        I: Iterator<Item = Result<Record, DecodeError>>,
    {
        TagRecords {
            input: Some(input),
            converter: self.clone(),
            found: Vec::new(),
            index: 0,
        }
    }
}

impl<I> TagRecords<I> {
    fn tag(&mut self, mut record: Record) -> Result<Record, TagError> {
        let config = &self.converter.config;

        let body = body_text(&record, &config.source_field)?;
        let found = self.converter.add_addresses_from_body(&mut self.found, body);

        let mut tags = take_tags(&mut record, &config.tag_field, found.len())?;
        append_tags(&mut tags, found);

        debug!(
            record = self.index,
            addresses = found.len(),
            tags = tags.len(),
            "Tagged record"
        );

        record.insert(config.tag_field.clone(), Value::from(tags));
        Ok(record)
    }
}

impl<I> Iterator for TagRecords<I>
where
    I: Iterator<Item = Result<Record, DecodeError>>,
{
    type Item = Result<Record, TagError>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = match self.input.as_mut()?.next() {
            Some(item) => item,
            None => {
                self.input = None;
                return None;
            }
        };

        let result = match item {
            Ok(record) => self.tag(record),
            Err(e) => Err(TagError::Upstream(e)),
        };

        if let Err(e) = &result {
            debug!(record = self.index, error = %e, "Stopping tagged stream");
            self.input = None;
        }
        self.index += 1;
        Some(result)
    }
}

impl<I> FusedIterator for TagRecords<I> where I: Iterator<Item = Result<Record, DecodeError>> {}

/// Body text of `record`. A missing or null field reads as empty text.
fn body_text<'r>(record: &'r Record, field: &str) -> Result<&'r str, TagError> {
    match record.get(field) {
        None | Some(Value::Null) => Ok(""),
        Some(Value::String(body)) => Ok(body.as_str()),
        Some(
            other @ (Value::Bool(_) | Value::Number(_) | Value::List(_) | Value::Record(_)),
        ) => Err(TagError::InvalidBody {
            field: field.to_string(),
            found: other.kind(),
        }),
    }
}

/// Remove the tag field from `record` and keep its string elements.
fn take_tags(record: &mut Record, field: &str, extra: usize) -> Result<Vec<String>, TagError> {
    match record.remove(field) {
        None | Some(Value::Null) => Ok(Vec::with_capacity(extra)),
        Some(Value::List(items)) => {
            let mut tags = Vec::with_capacity(items.len() + extra);
            for item in items {
                match item {
                    Value::String(tag) => tags.push(tag),
                    Value::Null
                    | Value::Bool(_)
                    | Value::Number(_)
                    | Value::List(_)
                    | Value::Record(_) => {}
                }
            }
            Ok(tags)
        }
        Some(
            other @ (Value::Bool(_) | Value::Number(_) | Value::String(_) | Value::Record(_)),
        ) => Err(TagError::InvalidTags {
            field: field.to_string(),
            found: other.kind(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use serde_json::json;

    use super::*;
    use crate::config::TagConfig;
    use crate::pipeline::converter::AddressEnricher;

    fn record(value: serde_json::Value) -> Record {
        serde_json::from_value(value).unwrap()
    }

    fn value(value: serde_json::Value) -> Value {
        serde_json::from_value(value).unwrap()
    }

    fn tags_of(record: &Record) -> Vec<&str> {
        match &record["tags"] {
            Value::List(items) => items
                .iter()
                .map(|v| match v {
                    Value::String(s) => s.as_str(),
                    other => panic!("non-string tag {}", other.kind()),
                })
                .collect(),
            other => panic!("tags is {}", other.kind()),
        }
    }

    fn run_one(input: serde_json::Value) -> Result<Record, TagError> {
        let converter = Converter::default();
        let mut out = converter.tag_records(std::iter::once(Ok(record(input))));
        let result = out.next().expect("one item");
        assert!(out.next().is_none());
        result
    }

    #[test]
    fn appends_addresses_after_existing_tags() {
        let out = run_one(json!({"tags": ["a", "b"], "body": "hello 1.2.3.4 world"})).unwrap();
        assert_eq!(tags_of(&out), vec!["a", "b", "1.2.3.4"]);
    }

    #[test]
    fn drops_non_string_tags() {
        let out = run_one(json!({"tags": [1, "x", true, "y"], "body": ""})).unwrap();
        assert_eq!(tags_of(&out), vec!["x", "y"]);
    }

    #[test]
    fn missing_body_and_tags_yield_empty_list() {
        let out = run_one(json!({"level": "info"})).unwrap();
        assert!(tags_of(&out).is_empty());
        assert_eq!(out["level"], Value::from("info"));
    }

    #[test]
    fn null_body_is_empty_text() {
        let out = run_one(json!({"body": null, "tags": null})).unwrap();
        assert!(tags_of(&out).is_empty());
        assert_eq!(out["body"], Value::Null);
    }

    #[test]
    fn invalid_candidates_contribute_nothing() {
        let out = run_one(json!({"body": "999.1.1.1 and 10.1.1.1 and 1.2.3.256"})).unwrap();
        assert_eq!(tags_of(&out), vec!["10.1.1.1"]);
    }

    #[test]
    fn finds_addresses_next_to_non_ascii_text() {
        let out = run_one(json!({"body": "接続元1.2.3.4から、é5.6.7.8"})).unwrap();
        assert_eq!(tags_of(&out), vec!["1.2.3.4", "5.6.7.8"]);
    }

    #[test]
    fn other_keys_pass_through() {
        let out = run_one(json!({
            "body": "8.8.8.8",
            "nested": {"k": [1, 2]},
            "n": 42
        }))
        .unwrap();
        assert_eq!(out["nested"], value(json!({"k": [1, 2]})));
        assert_eq!(out["n"], value(json!(42)));
        assert_eq!(tags_of(&out), vec!["8.8.8.8"]);
    }

    #[test]
    fn numeric_body_is_invalid() {
        let err = run_one(json!({"body": 42})).unwrap_err();
        assert!(matches!(err, TagError::InvalidBody { found: "number", .. }));
    }

    #[test]
    fn scalar_tags_are_invalid() {
        let err = run_one(json!({"body": "", "tags": "a"})).unwrap_err();
        assert!(matches!(err, TagError::InvalidTags { found: "string", .. }));
        let err = run_one(json!({"tags": {"a": 1}})).unwrap_err();
        assert!(matches!(err, TagError::InvalidTags { found: "record", .. }));
    }

    #[test]
    fn invalid_body_is_reported_before_tags() {
        let err = run_one(json!({"body": true, "tags": 5})).unwrap_err();
        assert!(matches!(err, TagError::InvalidBody { .. }));
    }

    #[test]
    fn custom_field_names() {
        let converter = Converter::new(
            TagConfig {
                source_field: "msg".into(),
                tag_field: "labels".into(),
            },
            AddressEnricher::dotted_quad(),
        );
        let input = record(json!({"msg": "peer 172.16.0.9", "labels": ["x"], "tags": 7}));
        let out: Vec<_> = converter.tag_records(std::iter::once(Ok(input))).collect();
        let out = out.into_iter().next().unwrap().unwrap();
        assert_eq!(out["labels"], value(json!(["x", "172.16.0.9"])));
        assert_eq!(out["tags"], value(json!(7)));
    }

    #[test]
    fn stops_after_upstream_error_without_pulling_further() {
        let pulled = Rc::new(Cell::new(0));
        let counter = Rc::clone(&pulled);
        let items: Vec<Result<Record, DecodeError>> = vec![
            Ok(record(json!({"body": "1.1.1.1"}))),
            Err(DecodeError::NotARecord { line: 2, found: "number" }),
            Ok(record(json!({"body": "2.2.2.2"}))),
        ];
        let input = items.into_iter().inspect(move |_| counter.set(counter.get() + 1));

        let converter = Converter::default();
        let out: Vec<_> = converter.tag_records(input).collect();

        assert_eq!(out.len(), 2);
        assert!(out[0].is_ok());
        assert!(matches!(out[1], Err(TagError::Upstream(_))));
        assert_eq!(pulled.get(), 2);
    }

    #[test]
    fn invalid_body_ends_stream() {
        let items: Vec<Result<Record, DecodeError>> = vec![
            Ok(record(json!({"body": "1.1.1.1"}))),
            Ok(record(json!({"body": 42}))),
            Ok(record(json!({"body": "2.2.2.2"}))),
        ];
        let converter = Converter::default();
        let mut out = converter.tag_records(items.into_iter());

        assert!(out.next().unwrap().is_ok());
        assert!(matches!(out.next(), Some(Err(TagError::InvalidBody { .. }))));
        assert!(out.next().is_none());
        assert!(out.next().is_none());
    }

    #[test]
    fn addresses_do_not_leak_between_records() {
        let items: Vec<Result<Record, DecodeError>> = vec![
            Ok(record(json!({"body": "1.1.1.1 2.2.2.2"}))),
            Ok(record(json!({"body": "no addresses"}))),
        ];
        let converter = Converter::default();
        let out: Vec<Record> = converter
            .tag_records(items.into_iter())
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(tags_of(&out[0]), vec!["1.1.1.1", "2.2.2.2"]);
        assert!(tags_of(&out[1]).is_empty());
    }

    #[test]
    fn consumer_can_stop_early() {
        let pulled = Rc::new(Cell::new(0));
        let counter = Rc::clone(&pulled);
        let input = (0..100)
            .map(|_| Ok(record(json!({"body": "1.2.3.4"}))))
            .inspect(move |_| counter.set(counter.get() + 1));

        let converter = Converter::default();
        let taken: Vec<_> = converter.tag_records(input).take(3).collect();
        assert_eq!(taken.len(), 3);
        assert_eq!(pulled.get(), 3);
    }
}
