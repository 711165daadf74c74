//! [`Response`] types for the [Anthropic Messages API].
//!
//! [Anthropic Messages API]: <https://docs.anthropic.com/en/api/messages>

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::{prompt::Role, Model};

/// Sucessful API response from the [Anthropic Messages API].
///
/// [Anthropic Messages API]: <https://docs.anthropic.com/en/api/messages>
pub enum Response<'a> {
    /// Single [`response::Message`] from the API.
    ///
    /// [`response::Message`]: Message
    Message {
        #[allow(missing_docs)]
        message: self::Message<'a>,
    },
    /// [`Stream`] of [`Event`]s (message delta, etc.).
    ///
    /// [`Stream`]: crate::Stream
    /// [`Event`]: crate::stream::Event
    Stream {
        #[allow(missing_docs)]
        stream: crate::Stream<'a>,
    },
}

impl<'a> Response<'a> {
    /// Convert a [`Response::Stream`] variant into a [`crate::Stream`].
    pub fn into_stream(self) -> Option<crate::Stream<'a>> {
        match self {
            Self::Stream { stream } => Some(stream),
            _ => None,
        }
    }

    /// Convert a [`Response::Message`] variant into a [`response::Message`].
    ///
    /// [`response::Message`]: self::Message
    pub fn into_message(self) -> Option<Message<'a>> {
        match self {
            Self::Message { message } => Some(message),
            _ => None,
        }
    }
}

/// A content block of a [`Message`]. Only text is ever requested by this
/// crate, anything else the API sends is kept as [`Block::Other`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum Block<'a> {
    /// Text content.
    Text {
        /// The text.
        text: Cow<'a, str>,
    },
    /// Any block type we do not handle (tool use, thinking, ...).
    #[serde(other)]
    Other,
}

/// Assistant message with response metadata.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Message<'a> {
    /// Unique `id` for the message.
    pub id: Cow<'a, str>,
    /// Author. Always [`Role::Assistant`] for responses.
    pub role: Role,
    /// Content [`Block`]s.
    pub content: Vec<Block<'a>>,
    /// [`Model`] that generated the message.
    pub model: Model,
    /// The reason the model stopped generating tokens.
    pub stop_reason: Option<StopReason>,
    /// If the [`StopReason`] was [`StopSequence`], this is the sequence that
    /// triggered it.
    ///
    /// [`StopSequence`]: StopReason::StopSequence
    pub stop_sequence: Option<Cow<'a, str>>,
    /// Usage statistics for the message.
    pub usage: Usage,
}

impl std::fmt::Display for Message<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for block in &self.content {
            if let Block::Text { text } = block {
                f.write_str(text)?;
            }
        }
        Ok(())
    }
}

/// Reason the model stopped generating tokens.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The model reached a natural stopping point.
    EndTurn,
    /// Maximum tokens reached.
    MaxTokens,
    /// A stop sequence was generated.
    StopSequence,
    /// A tool was used.
    ToolUse,
    /// Newer stop reasons (`refusal`, `pause_turn`, ...).
    #[serde(other)]
    Other,
}

/// Usage statistics from the API. This is used in multiple contexts, not just
/// for messages.
#[derive(Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct Usage {
    /// Number of input tokens used.
    #[serde(default)]
    pub input_tokens: u64,
    /// Number of output tokens generated.
    #[serde(default)]
    pub output_tokens: u64,
}
