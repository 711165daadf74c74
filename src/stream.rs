//! [`Event`] [`Stream`] for streaming responses from the API as well as
//! associated types and errors only used when streaming.
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::{borrow::Cow, pin::Pin, task::Poll};

use crate::{
    client::AnthropicError,
    response::{self, Block, StopReason, Usage},
};

/// Sucessful Event from the API. See [`stream::Error`] for errors.
///
/// [`stream::Error`]: Error
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum Event<'a> {
    /// Periodic ping.
    Ping,
    /// [`response::Message`] with empty content. [`MessageDelta`] and
    /// [`Delta`]s must be applied to this message.
    MessageStart {
        /// The message.
        message: response::Message<'a>,
    },
    /// Content [`Block`] with empty content.
    ContentBlockStart {
        /// Index of the [`Block`] in [`response::Message::content`].
        index: usize,
        /// Empty content block.
        content_block: Block<'a>,
    },
    /// Content block delta.
    ContentBlockDelta {
        /// Index of the [`Block`] in [`response::Message::content`].
        index: usize,
        /// Delta to apply to the content block.
        delta: Delta<'a>,
    },
    /// Content block end.
    ContentBlockStop {
        /// Index of the [`Block`] in [`response::Message::content`].
        index: usize,
    },
    /// [`MessageDelta`]. Contains metadata, not [`Delta`]s. Apply to the
    /// [`response::Message`].
    MessageDelta {
        /// Delta to apply to the [`response::Message`].
        delta: MessageDelta,
    },
    /// Message end.
    MessageStop,
    /// Event types added to the API after this was written. The API reserves
    /// the right to add them, so they are skipped rather than failing.
    #[serde(other)]
    Unknown,
}

/// Internal enum for the API result so we don't have to add an error variant to
/// the `Event` enum. [`ApiResult::Error`] comes first because [`Event`] would
/// otherwise swallow error events as [`Event::Unknown`].
#[derive(Deserialize)]
#[serde(untagged)]
enum ApiResult<'a> {
    /// Error Event.
    Error { error: AnthropicError },
    /// Successful Event.
    Event(Event<'a>),
}

/// Delta to be applied to a content [`Block`].
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum Delta<'a> {
    /// Text delta for a [`Block::Text`].
    #[serde(alias = "text_delta")]
    Text {
        /// The text content.
        text: Cow<'a, str>,
    },
    /// JSON delta for the input of a tool use block.
    #[serde(rename = "input_json_delta")]
    Json {
        /// The JSON delta.
        partial_json: Cow<'a, str>,
    },
    /// Deltas for blocks we never print (thinking, signatures, ...).
    #[serde(other)]
    Other,
}

/// Metadata about a message in progress. This does not contain actual text
/// deltas. That's the [`Delta`] in [`Event::ContentBlockDelta`].
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageDelta {
    /// Stop reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<StopReason>,
    /// Stop sequence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequence: Option<Cow<'static, str>>,
    /// Token usage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// Stream error. This can be JSON parsing errors or errors from the API.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// [`eventsource_stream::EventStreamError`] wrapping a [`reqwest::Error`].
    #[error("HTTP error: {error}")]
    Stream {
        #[from]
        /// Error from the `eventsource_stream` crate.
        error: eventsource_stream::EventStreamError<reqwest::Error>,
    },
    /// JSON parsing error.
    #[error("JSON error: {error}")]
    Parse {
        /// Error from [`serde_json`].
        error: serde_json::Error,
        /// [`eventsource_stream::Event`] that did not parse.
        event: eventsource_stream::Event,
    },
    /// Error from the API.
    #[error("API error: {error}")]
    Anthropic {
        /// Error from the API.
        error: AnthropicError,
        /// [`eventsource_stream::Event`] containing the error.
        event: eventsource_stream::Event,
    },
}

/// Stream of [`Event`]s or [`Error`]s.
pub struct Stream<'a> {
    inner: Pin<
        Box<
            dyn futures::Stream<Item = Result<Event<'a>, Error>>
                + Send
                + 'static,
        >,
    >,
}

static_assertions::assert_impl_all!(Stream<'_>: futures::Stream, Send);

impl<'a> Stream<'a> {
    /// Create a new stream from an [`eventsource_stream::EventStream`] or
    /// similar stream of [`eventsource_stream::Event`]s.
    pub fn new<S>(stream: S) -> Self
    where
        S: futures::Stream<
                Item = Result<
                    eventsource_stream::Event,
                    eventsource_stream::EventStreamError<reqwest::Error>,
                >,
            > + Send
            + 'static,
    {
        Self {
            inner: Box::pin(stream.map(|event| match event {
                Ok(event) => {
                    log::trace!("Event: {:?}", event);

                    match serde_json::from_str::<ApiResult>(&event.data) {
                        Ok(ApiResult::Event(event)) => Ok(event),
                        Ok(ApiResult::Error { error }) => {
                            Err(Error::Anthropic { error, event })
                        }
                        Err(error) => Err(Error::Parse { error, event }),
                    }
                }
                Err(error) => {
                    log::error!("Stream error: {:?}", error);
                    Err(Error::Stream { error })
                }
            })),
        }
    }
}

impl<'a> futures::Stream for Stream<'a> {
    type Item = Result<Event<'a>, Error>;

    fn poll_next(
        mut self: Pin<&mut Self>,
        cx: &mut std::task::Context,
    ) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

/// Extension trait for our crate [`Event`] [`Stream`]s to pick out the parts
/// worth printing. Errors always pass through. An error event (overloaded,
/// rate limited, ...) ends the stream on the server side, so it must reach
/// whoever prints the answer.
pub trait FilterExt<'a>:
    futures::stream::Stream<Item = Result<Event<'a>, Error>> + Sized
{
    /// Filter out everything but [`Event::ContentBlockDelta`] (and errors).
    fn deltas(self) -> impl futures::Stream<Item = Result<Delta<'a>, Error>> {
        self.filter_map(|result| async move {
            match result {
                Ok(Event::ContentBlockDelta { delta, .. }) => Some(Ok(delta)),
                Ok(_) => None,
                Err(error) => Some(Err(error)),
            }
        })
    }

    /// Filter out everything but text pieces (and errors).
    fn text(self) -> impl futures::Stream<Item = Result<Cow<'a, str>, Error>> {
        self.deltas().filter_map(|result| async move {
            match result {
                Ok(Delta::Text { text }) => Some(Ok(text)),
                Ok(_) => None,
                Err(error) => Some(Err(error)),
            }
        })
    }
}

impl<'a, S> FilterExt<'a> for S where
    S: futures::Stream<Item = Result<Event<'a>, Error>>
{
}
