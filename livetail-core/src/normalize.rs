use crate::record::{LogLevel, LogRecord};
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

lazy_static! {
    // RFC3339 stamp the server prefixes onto plain lines when the channel
    // was opened with timestamps enabled (docker convention)
    static ref WIRE_TIMESTAMP_RE: Regex = Regex::new(
        r"^(\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d+)?(?:Z|[+-]\d{2}:\d{2}))\s"
    ).unwrap();
}

/// Turns one wire frame into a record. Total: malformed or unexpected
/// input degrades to a plain-text record, it never fails.
///
/// Three shapes are recognized, tried in order:
/// 1. a JSON object carrying `level` + `message` (the platform's
///    structured build logs) maps field for field,
/// 2. a JSON object carrying only a free-form `message` or `log` string
///    keeps that text with level `unknown`,
/// 3. anything else is kept verbatim as the message with level `unknown`.
///
/// `wire_timestamps` says the channel was opened with server timestamps,
/// so plain lines carry a docker-style RFC3339 prefix the server added;
/// only then is a leading stamp split off into the display timestamp. A
/// stamp the emitter wrote itself stays part of the message.
///
/// Leading and trailing line breaks are stripped in every branch. The
/// sequence is assigned by the caller (the buffer), never derived from the
/// frame; a `line` field on the wire is identity metadata only.
pub fn normalize_frame(frame: &str, sequence: u64, wire_timestamps: bool) -> LogRecord {
    if let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(frame) {
        let timestamp = fields.get("timestamp").and_then(parse_timestamp);
        if let Some(message) = fields.get("message").and_then(Value::as_str) {
            let level = fields
                .get("level")
                .and_then(Value::as_str)
                .map(LogLevel::parse)
                .unwrap_or(LogLevel::Unknown);
            return structured(frame, sequence, level, message, timestamp);
        }
        if let Some(message) = fields.get("log").and_then(Value::as_str) {
            return structured(frame, sequence, LogLevel::Unknown, message, timestamp);
        }
    }
    plain(frame, sequence, wire_timestamps)
}

fn structured(
    frame: &str,
    sequence: u64,
    level: LogLevel,
    message: &str,
    timestamp: Option<DateTime<Utc>>,
) -> LogRecord {
    let message = trim_line_breaks(message);
    let mut record = LogRecord::new(sequence, level, message).with_raw(frame);
    if let Some(timestamp) = timestamp {
        record = record.with_timestamp(timestamp);
    }
    record
}

fn plain(frame: &str, sequence: u64, wire_timestamps: bool) -> LogRecord {
    let trimmed = trim_line_breaks(frame);
    let (timestamp, message) = if wire_timestamps {
        split_wire_timestamp(&trimmed)
    } else {
        (None, trimmed)
    };
    let mut record = LogRecord::new(sequence, LogLevel::Unknown, message);
    if let Some(timestamp) = timestamp {
        record = record.with_timestamp(timestamp);
    }
    if record.message != frame {
        record = record.with_raw(frame);
    }
    record
}

/// splits a leading RFC3339 stamp off a plain line; the stamp becomes the
/// display timestamp, the remainder the message
fn split_wire_timestamp(line: &str) -> (Option<DateTime<Utc>>, String) {
    if let Some(captures) = WIRE_TIMESTAMP_RE.captures(line) {
        let stamp = &captures[1];
        if let Ok(parsed) = DateTime::parse_from_rfc3339(stamp) {
            let rest = line[captures[0].len()..].to_string();
            return (Some(parsed.with_timezone(&Utc)), rest);
        }
    }
    (None, line.to_string())
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let text = value.as_str()?;
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

fn trim_line_breaks(text: &str) -> String {
    text.trim_matches(['\n', '\r']).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_structured_frame_maps_fields() {
        let frame = r#"{"level":"error","message":"boom","line":7,"timestamp":"2024-01-15T10:30:00Z"}"#;
        let record = normalize_frame(frame, 3, false);
        assert_eq!(record.sequence, 3);
        assert_eq!(record.level, LogLevel::Error);
        assert_eq!(record.message, "boom");
        assert_eq!(
            record.timestamp,
            Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap()
        );
        assert_eq!(record.raw.as_deref(), Some(frame));
    }

    #[test]
    fn test_structured_frame_without_timestamp() {
        let record = normalize_frame(r#"{"level":"success","message":"built"}"#, 0, false);
        assert_eq!(record.level, LogLevel::Success);
        assert_eq!(record.message, "built");
    }

    #[test]
    fn test_message_only_object_is_unknown_level() {
        let record = normalize_frame(r#"{"message":"plain note"}"#, 0, false);
        assert_eq!(record.level, LogLevel::Unknown);
        assert_eq!(record.message, "plain note");
    }

    #[test]
    fn test_log_field_object_is_unknown_level() {
        let record = normalize_frame(r#"{"log":"container said hi\n"}"#, 0, false);
        assert_eq!(record.level, LogLevel::Unknown);
        assert_eq!(record.message, "container said hi");
    }

    #[test]
    fn test_plain_text_survives_as_message() {
        let record = normalize_frame("hello", 0, false);
        assert_eq!(record.level, LogLevel::Unknown);
        assert_eq!(record.message, "hello");
        assert_eq!(record.raw, None);
    }

    #[test]
    fn test_mixed_scenario_in_order() {
        let frames = ["hello", r#"{"level":"error","message":"boom"}"#];
        let records: Vec<LogRecord> = frames
            .iter()
            .enumerate()
            .map(|(i, frame)| normalize_frame(frame, i as u64, false))
            .collect();
        assert_eq!(records[0].sequence, 0);
        assert_eq!(records[0].level, LogLevel::Unknown);
        assert_eq!(records[0].message, "hello");
        assert_eq!(records[1].sequence, 1);
        assert_eq!(records[1].level, LogLevel::Error);
        assert_eq!(records[1].message, "boom");
    }

    #[test]
    fn test_wire_timestamp_prefix_is_split_off() {
        let record = normalize_frame("2024-01-15T10:30:00.123456789Z GET /healthz 200", 0, true);
        assert_eq!(record.message, "GET /healthz 200");
        assert_eq!(
            record.timestamp.date_naive(),
            Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap().date_naive()
        );
        assert!(record.raw.as_deref().unwrap().starts_with("2024-01-15T"));
    }

    #[test]
    fn test_stamp_stays_in_message_without_wire_timestamps() {
        // the emitter wrote this stamp itself; the server added nothing
        let line = "2024-01-15T10:30:00Z GET /healthz 200";
        let record = normalize_frame(line, 0, false);
        assert_eq!(record.message, line);
        assert_eq!(record.raw, None);
    }

    #[test]
    fn test_line_breaks_stripped_everywhere() {
        assert_eq!(normalize_frame("\nhello\r\n", 0, false).message, "hello");
        assert_eq!(
            normalize_frame("{\"message\":\"\\nhi\\n\"}", 0, false).message,
            "hi"
        );
    }

    #[test]
    fn test_unrecognized_json_shapes_fall_back_to_text() {
        // arrays, bare scalars and objects without a text field all keep
        // their frame verbatim
        for frame in ["[1,2,3]", "42", r#"{"count":7}"#, r#"{"message":12}"#] {
            let record = normalize_frame(frame, 0, false);
            assert_eq!(record.level, LogLevel::Unknown);
            assert_eq!(record.message, *frame);
        }
    }

    #[test]
    fn test_never_fails_on_hostile_input() {
        let inputs = [
            "",
            "\n",
            "{",
            "{\"level\":null,\"message\":null}",
            "\u{0}\u{1}\u{2}",
            "﻿bom prefixed",
            "2024-99-99T99:99:99Z not a date",
            &"x".repeat(100_000),
        ];
        for input in inputs {
            let record = normalize_frame(input, 0, true);
            assert_eq!(record.sequence, 0);
        }
    }

    #[test]
    fn test_empty_frame_yields_empty_message() {
        let record = normalize_frame("", 9, false);
        assert_eq!(record.message, "");
        assert_eq!(record.sequence, 9);
        assert_eq!(record.level, LogLevel::Unknown);
    }
}
