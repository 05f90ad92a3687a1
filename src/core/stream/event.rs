//! Typed events carried by `data:` frames.

use serde::de::DeserializeOwned;
use serde::Deserialize;

const DATA_LABEL: &str = "data:";

/// A labeled frame whose payload is not valid JSON for the vocabulary.
///
/// Never fatal: the session logs and skips it.
#[derive(Debug, thiserror::Error)]
#[error("malformed frame payload {payload:?}: {source}")]
pub struct MalformedFrame {
    pub payload: String,
    #[source]
    pub source: serde_json::Error,
}

/// An event vocabulary decodable from frame payloads.
///
/// Vocabularies are internally tagged by `type` and keep an `#[serde(other)]`
/// catch-all so a server can add event types without breaking older clients.
pub trait StreamEvent: DeserializeOwned + Send + std::fmt::Debug + 'static {
    fn is_unknown(&self) -> bool;
}

/// Events on the chat stream.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChatEvent {
    Chunk {
        text: String,
    },
    Done,
    Error {
        message: String,
    },
    #[serde(other)]
    #[doc(hidden)]
    Unknown,
}

impl StreamEvent for ChatEvent {
    fn is_unknown(&self) -> bool {
        matches!(self, ChatEvent::Unknown)
    }
}

/// Events on the remote command stream.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ExecEvent {
    Start {
        command: String,
    },
    Log {
        line: String,
    },
    Output {
        data: String,
    },
    Error {
        message: String,
    },
    Done,
    #[serde(other)]
    #[doc(hidden)]
    Unknown,
}

impl StreamEvent for ExecEvent {
    fn is_unknown(&self) -> bool {
        matches!(self, ExecEvent::Unknown)
    }
}

/// Returns the payload of a `data:` frame, or `None` for any other frame.
pub fn data_payload(frame: &str) -> Option<&str> {
    let rest = frame.trim_start().strip_prefix(DATA_LABEL)?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

/// Decode one frame.
///
/// `Ok(None)` covers frames without the `data:` label and events whose type
/// tag this client does not know.
pub fn parse_frame<E: StreamEvent>(frame: &str) -> Result<Option<E>, MalformedFrame> {
    let Some(payload) = data_payload(frame) else {
        return Ok(None);
    };

    let event = serde_json::from_str::<E>(payload).map_err(|source| MalformedFrame {
        payload: payload.to_string(),
        source,
    })?;

    Ok((!event.is_unknown()).then_some(event))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_frames_decode_to_events() {
        assert_eq!(
            parse_frame::<ChatEvent>(r#"data: {"type":"chunk","text":"Hel"}"#).unwrap(),
            Some(ChatEvent::Chunk { text: "Hel".into() })
        );
        assert_eq!(
            parse_frame::<ChatEvent>(r#"data: {"type":"done"}"#).unwrap(),
            Some(ChatEvent::Done)
        );
        assert_eq!(
            parse_frame::<ChatEvent>(r#"data: {"type":"error","message":"quota"}"#).unwrap(),
            Some(ChatEvent::Error {
                message: "quota".into()
            })
        );
    }

    #[test]
    fn exec_frames_decode_to_events() {
        let cases = [
            (
                r#"data: {"type":"start","command":"ls"}"#,
                ExecEvent::Start {
                    command: "ls".into(),
                },
            ),
            (
                r#"data: {"type":"log","line":"connecting"}"#,
                ExecEvent::Log {
                    line: "connecting".into(),
                },
            ),
            (
                r#"data: {"type":"output","data":"a.txt\n"}"#,
                ExecEvent::Output {
                    data: "a.txt\n".into(),
                },
            ),
            (r#"data: {"type":"done","code":0}"#, ExecEvent::Done),
        ];
        for (frame, expected) in cases {
            assert_eq!(parse_frame::<ExecEvent>(frame).unwrap(), Some(expected));
        }
    }

    #[test]
    fn unlabeled_frames_are_ignored_without_parsing() {
        assert!(parse_frame::<ChatEvent>("event: ping").unwrap().is_none());
        assert!(parse_frame::<ChatEvent>(": keep-alive").unwrap().is_none());
        assert!(parse_frame::<ChatEvent>("{not json at all").unwrap().is_none());
    }

    #[test]
    fn label_spacing_variants_are_accepted() {
        assert_eq!(data_payload("data: {}"), Some("{}"));
        assert_eq!(data_payload("data:{}"), Some("{}"));
        assert_eq!(data_payload("\ndata: {}"), Some("{}"));
        assert_eq!(data_payload("event: x\ndata: {}"), None);
    }

    #[test]
    fn unknown_type_tags_are_skipped() {
        let parsed = parse_frame::<ChatEvent>(r#"data: {"type":"usage","tokens":12}"#).unwrap();
        assert!(parsed.is_none());
        let parsed = parse_frame::<ExecEvent>(r#"data: {"type":"chunk","text":"x"}"#).unwrap();
        assert!(parsed.is_none());
    }

    #[test]
    fn malformed_payload_is_reported_not_panicking() {
        let err = parse_frame::<ChatEvent>("data: {\"type\":\"chunk\",").unwrap_err();
        assert_eq!(err.payload, "{\"type\":\"chunk\",");

        let err = parse_frame::<ChatEvent>(r#"data: {"type":"chunk"}"#).unwrap_err();
        assert!(err.to_string().contains("text"));
    }
}
