//! On-disk encoding of frames and of the running frame.
//!
//! The frames file is a JSON array of rows
//! `[start, stop, project, id, tags, updated_at]` with Unix-second
//! timestamps. The state file is `{}` when idle, otherwise an object with
//! `project`, `start`, `tags`, `id` and `updated_at`. Older files may lack
//! the trailing row fields and the state's `id`/`updated_at`; loading fills
//! them in. Fractional timestamps are accepted and truncated.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value, json};
use tt_core::{Frame, FrameId};

/// A running frame read from the state file, before it gets an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateRecord {
    pub project: String,
    pub tags: Vec<String>,
    pub start: DateTime<Utc>,
    pub id: Option<FrameId>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Parses the frames file contents. Blank contents mean no frames.
pub fn decode_frames(contents: &str) -> Result<Vec<Frame>, String> {
    if contents.trim().is_empty() {
        return Ok(Vec::new());
    }
    let value: Value = serde_json::from_str(contents).map_err(|err| format!("invalid JSON: {err}"))?;
    let Value::Array(rows) = value else {
        return Err("expected a list of frames".to_string());
    };
    rows.iter()
        .enumerate()
        .map(|(index, row)| decode_row(row).map_err(|reason| format!("frame #{index}: {reason}")))
        .collect()
}

fn decode_row(row: &Value) -> Result<Frame, String> {
    let Value::Array(fields) = row else {
        return Err("expected a list of fields".to_string());
    };
    if fields.len() < 4 {
        return Err(format!("expected at least 4 fields, found {}", fields.len()));
    }

    let start = timestamp(&fields[0], "start")?;
    let stop = match &fields[1] {
        Value::Null => None,
        value => Some(timestamp(value, "stop")?),
    };
    let project = string(&fields[2], "project")?;
    let id = FrameId::new(string(&fields[3], "id")?).map_err(|err| err.to_string())?;
    let tags = tags(fields.get(4))?;
    let updated_at = match fields.get(5) {
        None | Some(Value::Null) => stop.unwrap_or(start),
        Some(value) => timestamp(value, "updated_at")?,
    };

    Frame::restore(id, &project, tags, start, stop, updated_at).map_err(|err| err.to_string())
}

/// Renders stopped frames as the frames file, one-space indented.
pub fn encode_frames(frames: &[Frame]) -> Result<Vec<u8>, serde_json::Error> {
    let rows: Vec<Value> = frames
        .iter()
        .map(|frame| {
            json!([
                frame.start.timestamp(),
                frame.stop.map(|stop| stop.timestamp()),
                frame.project,
                frame.id,
                frame.tags,
                frame.updated_at.timestamp(),
            ])
        })
        .collect();
    to_indented(&rows)
}

/// Parses the state file contents. `None` means nothing is running.
pub fn decode_state(contents: &str) -> Result<Option<StateRecord>, String> {
    if contents.trim().is_empty() {
        return Ok(None);
    }
    let value: Value = serde_json::from_str(contents).map_err(|err| format!("invalid JSON: {err}"))?;
    let Value::Object(fields) = value else {
        return Err("expected an object".to_string());
    };
    if fields.is_empty() {
        return Ok(None);
    }

    let field = |name: &str| fields.get(name).filter(|value| !value.is_null());
    let project = string(field("project").unwrap_or(&Value::Null), "project")?;
    let start = timestamp(field("start").unwrap_or(&Value::Null), "start")?;
    let tags = tags(field("tags"))?;
    let id = field("id")
        .map(|value| string(value, "id").and_then(|id| FrameId::new(id).map_err(|err| err.to_string())))
        .transpose()?;
    let updated_at = field("updated_at")
        .map(|value| timestamp(value, "updated_at"))
        .transpose()?;

    Ok(Some(StateRecord {
        project,
        tags,
        start,
        id,
        updated_at,
    }))
}

/// Renders the state file for the running frame, or `{}`.
pub fn encode_state(active: Option<&Frame>) -> Result<Vec<u8>, serde_json::Error> {
    let value = active.map_or_else(
        || Value::Object(Map::new()),
        |frame| {
            json!({
                "project": frame.project,
                "start": frame.start.timestamp(),
                "tags": frame.tags,
                "id": frame.id,
                "updated_at": frame.updated_at.timestamp(),
            })
        },
    );
    to_indented(&value)
}

fn to_indented<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b" ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer)?;
    Ok(out)
}

#[allow(clippy::cast_possible_truncation)]
fn timestamp(value: &Value, field: &str) -> Result<DateTime<Utc>, String> {
    let seconds = match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|secs| secs.trunc() as i64)),
        _ => None,
    }
    .ok_or_else(|| format!("{field} must be a Unix timestamp"))?;
    DateTime::from_timestamp(seconds, 0).ok_or_else(|| format!("{field} is out of range"))
}

fn string(value: &Value, field: &str) -> Result<String, String> {
    match value {
        Value::String(s) if !s.is_empty() => Ok(s.clone()),
        Value::String(_) => Err(format!("{field} cannot be empty")),
        _ => Err(format!("{field} must be a string")),
    }
}

fn tags(value: Option<&Value>) -> Result<Vec<String>, String> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items.iter().map(|item| string(item, "tag")).collect(),
        Some(_) => Err("tags must be a list".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 1, 1, hour, minute, 0).unwrap()
    }

    #[test]
    fn decodes_legacy_rows_without_trailing_fields() {
        let contents = r#"[
 [1672563600, 1672567200, "p1", "abc123"],
 [1672567200.75, 1672569000, "p2", "def456", null]
]"#;
        let frames = decode_frames(contents).unwrap();

        assert_eq!(frames.len(), 2);
        assert!(frames[0].tags.is_empty());
        assert_eq!(frames[0].start, at(9, 0));
        assert_eq!(frames[0].updated_at, at(10, 0));
        assert_eq!(frames[1].start, at(10, 0));
        assert!(frames[1].tags.is_empty());
    }

    #[test]
    fn rejects_schema_violations() {
        let cases = [
            (r#"{"a": 1}"#, "expected a list of frames"),
            (r#"[[1672563600, 1672567200, "p1"]]"#, "at least 4 fields"),
            (r#"[["x", 1672567200, "p1", "a"]]"#, "start must be a Unix timestamp"),
            (r#"[[1672563600, 1672567200, "", "a"]]"#, "project cannot be empty"),
            (r#"[[1672563600, 1672567200, "p1", ""]]"#, "id cannot be empty"),
            (r#"[[1672567200, 1672563600, "p1", "a"]]"#, "cannot end before it starts"),
            (r#"[[1672563600, 1672567200, "p1", "a", "x"]]"#, "tags must be a list"),
        ];
        for (contents, expected) in cases {
            let err = decode_frames(contents).unwrap_err();
            assert!(err.contains(expected), "{contents}: {err}");
        }
    }

    #[test]
    fn encodes_rows_with_one_space_indent() {
        let frame = Frame::restore(
            FrameId::new("abc123").unwrap(),
            "p1",
            vec!["x".to_string()],
            at(9, 0),
            Some(at(10, 0)),
            at(10, 0),
        )
        .unwrap();
        let out = String::from_utf8(encode_frames(&[frame]).unwrap()).unwrap();
        insta::assert_snapshot!(out, @r#"
        [
         [
          1672563600,
          1672567200,
          "p1",
          "abc123",
          [
           "x"
          ],
          1672567200
         ]
        ]
        "#);
    }

    #[test]
    fn empty_state_means_idle() {
        assert_eq!(decode_state("").unwrap(), None);
        assert_eq!(decode_state("{}").unwrap(), None);
        assert_eq!(String::from_utf8(encode_state(None).unwrap()).unwrap(), "{}");
    }

    #[test]
    fn legacy_state_has_no_id() {
        let state = decode_state(r#"{"project": "p1", "start": 1672563600, "tags": ["x"]}"#)
            .unwrap()
            .unwrap();
        assert_eq!(state.project, "p1");
        assert_eq!(state.start, at(9, 0));
        assert_eq!(state.tags, vec!["x"]);
        assert_eq!(state.id, None);
        assert_eq!(state.updated_at, None);
    }

    #[test]
    fn state_requires_project_and_start() {
        assert!(decode_state(r#"{"start": 1672563600}"#).is_err());
        assert!(decode_state(r#"{"project": "p1"}"#).is_err());
        assert!(decode_state("[]").is_err());
    }
}
