//! Render-ready records built once per received event.

use chrono::NaiveDateTime;
use thiserror::Error;
use tracing::warn;

use crate::event::{EventError, RawEvent};

/// Sender shown for events the master emitted itself (no minion id).
pub const FALLBACK_SENDER: &str = "master";

/// Shown instead of a timestamp when the event carries none.
pub const MISSING_TIMESTAMP: &str = "-";

const STAMP_LAYOUT: &str = "%Y-%m-%dT%H:%M:%S%.f";
const DISPLAY_LAYOUT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to render event {tag} as json: {source}")]
    Json { tag: String, sender: String, source: EventError },
    #[error("failed to render event {tag} as yaml: {source}")]
    Yaml { tag: String, sender: String, source: EventError },
}

impl BuildError {
    pub fn tag(&self) -> &str {
        match self {
            Self::Json { tag, .. } | Self::Yaml { tag, .. } => tag,
        }
    }

    /// Resolved sender of the event that failed.
    pub fn sender(&self) -> &str {
        match self {
            Self::Json { sender, .. } | Self::Yaml { sender, .. } => sender,
        }
    }
}

/// Immutable view of one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayItem {
    pub title: String,
    pub description: String,
    /// Job family (`job`, `run`, `wheel`), empty for other events.
    pub module: String,
    pub timestamp: String,
    pub sender: String,
    pub state: String,
    pub json: String,
    pub yaml: String,
    /// Set when the item stands in for an event that could not be rendered.
    pub failed: bool,
}

impl DisplayItem {
    pub fn build(event: &impl RawEvent) -> Result<Self, BuildError> {
        let tag = event.tag();
        let sender = resolve_sender(event.id());
        let json = event.to_json().map_err(|source| BuildError::Json {
            tag: tag.to_string(),
            sender: sender.clone(),
            source,
        })?;
        let yaml = event.to_yaml().map_err(|source| BuildError::Yaml {
            tag: tag.to_string(),
            sender: sender.clone(),
            source,
        })?;

        Ok(Self {
            title: tag.to_string(),
            description: event.event_type().to_string(),
            module: event.module().to_string(),
            timestamp: format_timestamp(event.timestamp()),
            sender,
            state: event.extract_state(),
            json,
            yaml,
            failed: false,
        })
    }

    /// Builds the visible placeholder used when `build` fails.
    pub fn from_build_error(error: &BuildError) -> Self {
        let message = error.to_string();
        Self {
            title: error.tag().to_string(),
            description: "error".to_string(),
            module: String::new(),
            timestamp: MISSING_TIMESTAMP.to_string(),
            sender: error.sender().to_string(),
            state: String::new(),
            json: message.clone(),
            yaml: message,
            failed: true,
        }
    }

    /// Build, falling back to the error placeholder.
    pub fn build_or_placeholder(event: &impl RawEvent) -> Self {
        Self::build(event).unwrap_or_else(|error| {
            warn!(tag = error.tag(), %error, "failed to render event");
            Self::from_build_error(&error)
        })
    }

    /// Text the list filter matches against.
    pub fn filter_value(&self) -> String {
        format!(
            "{} {} {} {} {}",
            self.title, self.module, self.sender, self.state, self.description
        )
    }

    /// Second list row: `[module] type · sender · state · time`.
    pub fn summary(&self) -> String {
        let kind = if self.module.is_empty() {
            self.description.clone()
        } else {
            format!("{} {}", self.module, self.description)
        };
        let mut parts = vec![kind.as_str(), self.sender.as_str()];
        if !self.state.is_empty() {
            parts.push(self.state.as_str());
        }
        parts.push(self.timestamp.as_str());
        parts.join(" · ")
    }
}

pub fn resolve_sender(id: &str) -> String {
    if id.is_empty() {
        FALLBACK_SENDER.to_string()
    } else {
        id.to_string()
    }
}

/// Formats a Salt `_stamp`. Unparseable stamps are kept verbatim.
pub fn format_timestamp(raw: &str) -> String {
    if raw.is_empty() {
        return MISSING_TIMESTAMP.to_string();
    }
    match NaiveDateTime::parse_from_str(raw, STAMP_LAYOUT) {
        Ok(parsed) => parsed.format(DISPLAY_LAYOUT).to_string(),
        Err(_) => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::SaltEvent;
    use rstest::rstest;
    use serde_json::json;

    struct BrokenEvent;

    impl RawEvent for BrokenEvent {
        fn id(&self) -> &str {
            "minion01"
        }

        fn tag(&self) -> &str {
            "salt/job/1/ret/minion01"
        }

        fn event_type(&self) -> &str {
            "ret"
        }

        fn timestamp(&self) -> &str {
            ""
        }

        fn to_json(&self) -> Result<String, EventError> {
            Ok("{}".to_string())
        }

        fn to_yaml(&self) -> Result<String, EventError> {
            Err(EventError::InvalidData("unrepresentable".to_string()))
        }

        fn extract_state(&self) -> String {
            String::new()
        }
    }

    #[rstest]
    #[case("", FALLBACK_SENDER)]
    #[case("minion07", "minion07")]
    fn resolves_sender(#[case] id: &str, #[case] expected: &str) {
        assert_eq!(resolve_sender(id), expected);
    }

    #[rstest]
    #[case("2024-01-02T10:10:10.654321", "2024-01-02 10:10")]
    #[case("2024-01-02T23:59:01", "2024-01-02 23:59")]
    #[case("yesterday", "yesterday")]
    #[case("", MISSING_TIMESTAMP)]
    fn formats_timestamp(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(format_timestamp(raw), expected);
    }

    #[test]
    fn builds_item_from_event() {
        let event = SaltEvent::new(
            "salt/job/1/ret/minion07",
            json!({
                "id": "minion07",
                "fun": "state.apply",
                "fun_args": ["nginx"],
                "_stamp": "2024-01-02T10:10:10.654321",
            }),
        );
        let item = DisplayItem::build(&event).expect("build");
        assert_eq!(item.title, "salt/job/1/ret/minion07");
        assert_eq!(item.description, "ret");
        assert_eq!(item.module, "job");
        assert_eq!(item.sender, "minion07");
        assert_eq!(item.state, "nginx");
        assert_eq!(item.timestamp, "2024-01-02 10:10");
        assert!(item.json.contains("\"fun\": \"state.apply\""));
        assert!(item.yaml.contains("fun: state.apply"));
        assert!(!item.failed);
    }

    #[test]
    fn master_events_use_fallback_sender() {
        let event = SaltEvent::new("salt/job/1/new", json!({ "fun": "test.ping" }));
        let item = DisplayItem::build(&event).expect("build");
        assert_eq!(item.sender, FALLBACK_SENDER);
    }

    #[test]
    fn serialization_failure_yields_visible_error_item() {
        let error = DisplayItem::build(&BrokenEvent).expect_err("yaml fails");
        assert!(matches!(error, BuildError::Yaml { .. }));

        let item = DisplayItem::build_or_placeholder(&BrokenEvent);
        assert!(item.failed);
        assert_eq!(item.title, "salt/job/1/ret/minion01");
        assert_eq!(item.description, "error");
        assert_eq!(item.sender, "minion01");
        assert!(item.json.contains("unrepresentable"));
        assert_eq!(item.json, item.yaml);
    }

    #[test]
    fn summary_skips_empty_state() {
        let event = SaltEvent::new(
            "salt/job/1/ret/web01",
            json!({ "id": "web01", "fun": "test.ping", "_stamp": "2024-01-02T10:10:10.1" }),
        );
        let item = DisplayItem::build(&event).expect("build");
        assert_eq!(item.summary(), "job ret · web01 · 2024-01-02 10:10");
        assert!(item.filter_value().contains("web01"));
    }
}
