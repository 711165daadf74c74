//! [Anthropic Messages API] `Request` type. We call it [`Prompt`] since in
//! actual usage this makes the code more readable.
//!
//! [Anthropic Messages API]: <https://docs.anthropic.com/en/api/messages>

use std::{borrow::Cow, num::NonZeroU16};

use serde::{Deserialize, Serialize};

use crate::Model;

/// Role of the [`Message`] author.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// From the user.
    User,
    /// From the AI.
    Assistant,
}

impl Role {
    /// Get the string representation of the role.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Assistant => "Assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single text message in a [`Prompt`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Message<'a> {
    /// Who is the message from.
    pub role: Role,
    /// Text content of the message.
    pub content: Cow<'a, str>,
}

impl<'a, T> From<(Role, T)> for Message<'a>
where
    T: Into<Cow<'a, str>>,
{
    fn from((role, content): (Role, T)) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Request for the [Anthropic Messages API].
///
/// [Anthropic Messages API]: <https://docs.anthropic.com/en/api/messages>
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Prompt<'a> {
    /// [`Model`] to use for inference.
    pub model: Model,
    /// Input [`Message`]s. A new [`Role::Assistant`] message is generated in
    /// response.
    pub messages: Vec<Message<'a>>,
    /// Max tokens to generate. See Anthropic [docs] for the maximum number of
    /// tokens for each model.
    ///
    /// [docs]: <https://docs.anthropic.com/en/docs/about-claude/models>
    pub max_tokens: NonZeroU16,
    /// If `true`, the response will be a stream of [`Event`]s. If `false`, the
    /// response will be a single [`response::Message`].
    ///
    /// [`Event`]: crate::stream::Event
    /// [`response::Message`]: crate::response::Message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

impl Default for Prompt<'_> {
    fn default() -> Self {
        Self {
            model: Default::default(),
            messages: Default::default(),
            max_tokens: Self::DEFAULT_MAX_TOKENS,
            stream: Default::default(),
        }
    }
}

impl<'a> Prompt<'a> {
    /// Default for [`max_tokens`].
    ///
    /// [`max_tokens`]: Prompt::max_tokens
    pub const DEFAULT_MAX_TOKENS: NonZeroU16 = match NonZeroU16::new(1000) {
        Some(n) => n,
        None => unreachable!(),
    };

    /// Set the [`model`].
    ///
    /// [`model`]: Prompt::model
    pub fn model(mut self, model: Model) -> Self {
        self.model = model;
        self
    }

    /// Set the [`messages`] from an iterable of [`Message`]s.
    ///
    /// [`messages`]: Prompt::messages
    pub fn messages<M, Ms>(mut self, messages: Ms) -> Self
    where
        M: Into<Message<'a>>,
        Ms: IntoIterator<Item = M>,
    {
        self.messages = messages.into_iter().map(Into::into).collect();
        self
    }

    /// Set the [`max_tokens`]. If this is reached, the [`StopReason`] will be
    /// [`MaxTokens`].
    ///
    /// [`max_tokens`]: Prompt::max_tokens
    /// [`StopReason`]: crate::response::StopReason
    /// [`MaxTokens`]: crate::response::StopReason::MaxTokens
    pub fn max_tokens(mut self, max_tokens: NonZeroU16) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}
