//! Salt event model and the conversions the live view consumes.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// An event as delivered by a producer, before it is turned into a display item.
pub trait RawEvent {
    /// Minion id of the sender, empty when the master emitted the event.
    fn id(&self) -> &str;
    fn tag(&self) -> &str;
    fn event_type(&self) -> &str;
    /// Job family from the tag (`job`, `run`, `wheel`), empty for other events.
    fn module(&self) -> &str {
        ""
    }
    /// Raw `_stamp` value, unparsed.
    fn timestamp(&self) -> &str;
    fn to_json(&self) -> Result<String, EventError>;
    fn to_yaml(&self) -> Result<String, EventError>;
    /// Short summary of the state being applied, empty for non-state jobs.
    fn extract_state(&self) -> String;
}

#[derive(Debug, Error)]
pub enum EventError {
    #[error("empty event line")]
    EmptyLine,
    #[error("event has no tag")]
    MissingTag,
    #[error("invalid event data: {0}")]
    InvalidData(String),
    #[error("json serialization failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("yaml serialization failed: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// One event from the Salt master event bus.
#[derive(Debug, Clone, PartialEq)]
pub struct SaltEvent {
    pub tag: String,
    pub event_type: String,
    pub module: String,
    pub data: Value,
}

#[derive(Serialize)]
struct Envelope<'a> {
    tag: &'a str,
    data: &'a Value,
}

impl SaltEvent {
    pub fn new(tag: impl Into<String>, data: Value) -> Self {
        let tag = tag.into();
        let (module, event_type) = split_tag(&tag);
        Self { tag, event_type, module, data }
    }

    /// Parses one line of producer output.
    ///
    /// Two shapes are accepted: a JSON object carrying `tag` and `data`, or the
    /// `salt-run state.event` text form where the tag is followed by whitespace and the
    /// JSON data.
    pub fn parse_line(line: &str) -> Result<Self, EventError> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Err(EventError::EmptyLine);
        }

        if trimmed.starts_with('{') {
            let mut value: Value = serde_json::from_str(trimmed)
                .map_err(|err| EventError::InvalidData(err.to_string()))?;
            let Some(object) = value.as_object_mut() else {
                return Err(EventError::InvalidData("expected a json object".to_string()));
            };
            let tag = match object.remove("tag") {
                Some(Value::String(tag)) if !tag.trim().is_empty() => tag,
                _ => return Err(EventError::MissingTag),
            };
            let data = object.remove("data").unwrap_or_else(|| Value::Object(Map::new()));
            return Ok(Self::new(tag, data));
        }

        let split_at = trimmed.find(char::is_whitespace).ok_or(EventError::MissingTag)?;
        let (tag, rest) = trimmed.split_at(split_at);
        let data: Value = serde_json::from_str(rest.trim())
            .map_err(|err| EventError::InvalidData(err.to_string()))?;
        Ok(Self::new(tag, data))
    }

    fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    pub fn fun(&self) -> Option<&str> {
        self.data_str("fun")
    }

    pub fn jid(&self) -> Option<&str> {
        self.data_str("jid")
    }

    /// Positional arguments of the job. `ret` events carry `fun_args`, `new` events `arg`.
    pub fn fun_args(&self) -> &[Value] {
        self.data
            .get("fun_args")
            .or_else(|| self.data.get("arg"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn first_positional_arg(&self) -> Option<&str> {
        self.fun_args().iter().filter_map(Value::as_str).find(|arg| !arg.contains('='))
    }
}

impl RawEvent for SaltEvent {
    fn id(&self) -> &str {
        self.data_str("id").unwrap_or("")
    }

    fn tag(&self) -> &str {
        &self.tag
    }

    fn event_type(&self) -> &str {
        &self.event_type
    }

    fn module(&self) -> &str {
        &self.module
    }

    fn timestamp(&self) -> &str {
        self.data_str("_stamp").unwrap_or("")
    }

    fn to_json(&self) -> Result<String, EventError> {
        let envelope = Envelope { tag: &self.tag, data: &self.data };
        Ok(serde_json::to_string_pretty(&envelope)?)
    }

    fn to_yaml(&self) -> Result<String, EventError> {
        let envelope = Envelope { tag: &self.tag, data: &self.data };
        Ok(serde_yaml::to_string(&envelope)?)
    }

    fn extract_state(&self) -> String {
        match self.fun() {
            Some("state.sls" | "state.single" | "state.sls_id") => {
                self.first_positional_arg().unwrap_or_default().to_string()
            }
            Some("state.apply") => {
                self.first_positional_arg().unwrap_or("highstate").to_string()
            }
            Some("state.highstate") => "highstate".to_string(),
            _ => String::new(),
        }
    }
}

fn split_tag(tag: &str) -> (String, String) {
    let parts: Vec<&str> = tag.split('/').collect();
    if parts.len() >= 4 && parts[0] == "salt" && matches!(parts[1], "job" | "run" | "wheel") {
        return (parts[1].to_string(), parts[3].to_string());
    }
    let event_type =
        parts.iter().rev().find(|part| !part.is_empty()).copied().unwrap_or("unknown");
    (String::new(), event_type.to_string())
}
