//! Chat transcript and its chunk-merge policy.

use serde::{Deserialize, Serialize};

use crate::api::ChatMessage;
use crate::core::stream::{Applied, ChatEvent, StreamError, StreamStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl AsRef<str> for Role {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl TryFrom<&str> for Role {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            _ => Err(format!("invalid role: {value}")),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl From<Role> for String {
    fn from(value: Role) -> Self {
        value.as_str().to_string()
    }
}

/// A file attached to a user turn. Only its name and size are recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    /// Failure notice rendered in the transcript; never sent back upstream.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            attachments: Vec::new(),
            is_error: false,
        }
    }

    pub fn user(content: impl Into<String>, attachments: Vec<Attachment>) -> Self {
        Self {
            attachments,
            ..Self::new(Role::User, content)
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn error(message: impl std::fmt::Display) -> Self {
        Self {
            is_error: true,
            ..Self::new(Role::Assistant, format!("Error: {message}"))
        }
    }

    pub fn to_api(&self) -> Option<ChatMessage> {
        (!self.is_error).then(|| ChatMessage {
            role: self.role.as_str().to_string(),
            content: self.content.clone(),
        })
    }
}

/// Ordered chat history.
///
/// Append-only, except that the open assistant message (tracked by index,
/// always the last entry) grows in place as chunks arrive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<Message>,
    open: Option<usize>,
    pending: bool,
}

impl Transcript {
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Whether a reply is still expected ("thinking").
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn open_index(&self) -> Option<usize> {
        self.open
    }

    /// Append a user turn and mark a reply as pending.
    pub fn push_user(&mut self, message: Message) {
        self.open = None;
        self.messages.push(message);
        self.pending = true;
    }

    /// Request history: every non-error turn, in order.
    pub fn api_messages(&self) -> Vec<ChatMessage> {
        self.messages.iter().filter_map(Message::to_api).collect()
    }

    fn append_chunk(&mut self, text: String) {
        match self.open {
            Some(index) => {
                debug_assert_eq!(index + 1, self.messages.len());
                self.messages[index].content.push_str(&text);
            }
            None => {
                self.messages.push(Message::assistant(text));
                self.open = Some(self.messages.len() - 1);
            }
        }
    }
}

impl StreamStore for Transcript {
    type Event = ChatEvent;

    fn apply(&mut self, event: ChatEvent) -> Applied {
        match event {
            ChatEvent::Chunk { text } => {
                self.append_chunk(text);
                Applied::Continue
            }
            ChatEvent::Done => {
                self.seal();
                Applied::Continue
            }
            ChatEvent::Error { message } => {
                self.seal();
                self.messages.push(Message::error(&message));
                Applied::Failed(message)
            }
            ChatEvent::Unknown => Applied::Continue,
        }
    }

    fn fail(&mut self, error: &StreamError) {
        self.seal();
        self.messages.push(Message::error(error));
    }

    fn seal(&mut self) {
        self.open = None;
        self.pending = false;
    }
}
