//! [`Client`] for the Anthropic Messages API and related types.

use std::{num::NonZeroU16, sync::Arc};

use eventsource_stream::Eventsource;
use serde::{Deserialize, Serialize};

use crate::{response, stream, Key};

/// Result type for the client. See also [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Client for the Anthropic Messages API.
///
/// See [`Self::new`] for creating a new client and [`Self::message`] and
/// [`Self::stream`] to get started.
#[derive(Clone)]
pub struct Client {
    /// Inner [`reqwest::Client`]. Be aware that setting this to a custom client
    /// without the appropriate headers (such as `anthropic-version`) will
    /// result in rejected requests. It is **not necessary** to set the API key
    /// on a custom client.
    pub inner: reqwest::Client,
    /// API [`Key`]. It is set as a sensitive header on every request.
    pub key: Arc<Key>,
    /// Messages endpoint. Defaults to [`Self::DEFAULT_URL`].
    pub url: String,
}

impl Client {
    /// Version of the API. This is appended to the header as
    /// "anthropic-version".
    pub const ANTHROPIC_VERSION: &'static str = "2023-06-01";
    /// Our user agent.
    pub const USER_AGENT: &'static str =
        concat!(env!("CARGO_PKG_NAME"), "-", env!("CARGO_PKG_VERSION"));
    /// Default URL for the Messages API.
    pub const DEFAULT_URL: &'static str =
        "https://api.anthropic.com/v1/messages";

    /// Create a new client with the given key.
    pub fn new(key: Key) -> Result<Self> {
        log::info!(concat!("Creating ", env!("CARGO_PKG_NAME"), " client..."));
        log::debug!(concat!("Crate version: ", env!("CARGO_PKG_VERSION")));
        log::debug!("Anthropic version: {}", Self::ANTHROPIC_VERSION);

        // Headers for all requests.
        let mut headers = reqwest::header::HeaderMap::new();

        // Content type needs to be set to JSON.
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            reqwest::header::HeaderValue::from_static("application/json"),
        );

        // Anthropic version needs to be set.
        headers.insert(
            "anthropic-version",
            reqwest::header::HeaderValue::from_static(Self::ANTHROPIC_VERSION),
        );

        Ok(Self {
            inner: reqwest::Client::builder()
                .default_headers(headers)
                .user_agent(Self::USER_AGENT)
                .build()?,
            key: Arc::new(key),
            url: Self::DEFAULT_URL.to_string(),
        })
    }

    /// Use a different Messages compatible endpoint. Useful for testing and
    /// proxies.
    pub fn with_url<U>(mut self, url: U) -> Self
    where
        U: Into<String>,
    {
        self.url = url.into();
        self
    }

    /// Create a [`reqwest::RequestBuilder`] with the API key set as a sensitive
    /// header value.
    pub fn request_raw(
        &self,
        method: reqwest::Method,
        url: &str,
    ) -> Result<reqwest::RequestBuilder> {
        log::debug!("{} request to {}", method, url);

        let mut val =
            reqwest::header::HeaderValue::from_str(self.key.read())?;
        val.set_sensitive(true);

        Ok(self.inner.request(method, url).header("x-api-key", val))
    }

    /// Send a POST request with the API key set as a sensitive header value.
    pub async fn post<B>(&self, url: &str, body: B) -> Result<reqwest::Response>
    where
        B: serde::Serialize,
    {
        let req = self.request_raw(reqwest::Method::POST, url)?;

        if let Ok(json) = serde_json::to_string_pretty(&body) {
            log::debug!("Sending body:\n{}", json);
        } else {
            log::warn!("Could not serialize body. Request will fail.");
        }

        Ok(req.json(&body).send().await?)
    }

    /// Post a request to the Messages API at [`Self::url`].
    ///
    /// `prompt` can be a [`Prompt`] or anything that can be serialized but it
    /// should conform to the Messages API. The return will be either a
    /// [`Response`] of a single [`response::Message`] or a [`Stream`] of
    /// events depending on whether `stream` is set to `true` in the `prompt`.
    ///
    /// [`Prompt`]: crate::Prompt
    /// [`Response`]: crate::Response
    /// [`Stream`]: crate::Stream
    pub async fn request<P>(&self, prompt: P) -> Result<crate::Response<'static>>
    where
        P: Serialize,
    {
        self.request_custom(prompt, &self.url).await
    }

    /// Post a [`request`] to a custom URL.
    ///
    /// [`request`]: Self::request
    pub async fn request_custom<P>(
        &self,
        prompt: P,
        url: &str,
    ) -> Result<crate::Response<'static>>
    where
        P: Serialize,
    {
        let json = serde_json::to_value(prompt)?;
        let streaming = json["stream"].as_bool().unwrap_or(false);

        let response: reqwest::Response = self.post(url, json).await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().await?;
            return Err(AnthropicError::from_body(status, body).into());
        }

        if streaming {
            // Get a stream and wrap it in our stream type.
            Ok(crate::Response::Stream {
                stream: crate::Stream::new(
                    response.bytes_stream().eventsource(),
                ),
            })
        } else {
            // Get a single response message.
            Ok(crate::Response::Message {
                message: response.json().await?,
            })
        }
    }

    /// Make a [`request`] to the Messages API forcing `stream=false`. This
    /// function will always return a single [`response::Message`].
    ///
    /// [`request`]: Self::request
    pub async fn message<P>(
        &self,
        prompt: P,
    ) -> Result<response::Message<'static>>
    where
        P: Serialize,
    {
        let mut json = serde_json::to_value(prompt)?;
        json["stream"] = serde_json::Value::Bool(false);

        self.request(json)
            .await?
            .into_message()
            // The server is misbehaving if this happens.
            .ok_or(Error::UnexpectedResponse {
                message: "Expected a message, got a stream.",
            })
    }

    /// Make a [`request`] to the Messages API forcing `stream=true`. This
    /// function will always return a [`crate::Stream`].
    ///
    /// [`request`]: Self::request
    pub async fn stream<P>(&self, prompt: P) -> Result<crate::Stream<'static>>
    where
        P: Serialize,
    {
        let mut json = serde_json::to_value(prompt)?;
        json["stream"] = serde_json::Value::Bool(true);

        self.request(json)
            .await?
            .into_stream()
            .ok_or(Error::UnexpectedResponse {
                message: "Expected a stream, got a message.",
            })
    }
}

/// [`Client`] error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP error.
    #[error("HTTP error: {0}")]
    HTTP(#[from] reqwest::Error),
    /// The key cannot be sent as a header (for example it contains a
    /// newline in the middle).
    #[error("Api key is not a valid header value")]
    InvalidKey(#[from] reqwest::header::InvalidHeaderValue),
    /// Data could not be parsed.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    /// Anthropic error.
    #[error("Anthropic error: {0}")]
    Anthropic(#[from] AnthropicError),
    /// Error while reading a response stream.
    #[error("Stream error: {0}")]
    Stream(#[from] stream::Error),
    /// Unexpected response from the API. These should never happen unless the
    /// server is misbehaving (for example, returning a stream when a message is
    /// expected).
    #[error("Unexpected response: {message}")]
    #[allow(missing_docs)]
    UnexpectedResponse { message: &'static str },
}

impl Error {
    /// The [`AnthropicError`] carried by this error, whether it came back as
    /// the response to the request or as an event inside a stream.
    pub fn anthropic(&self) -> Option<&AnthropicError> {
        match self {
            Self::Anthropic(error) => Some(error),
            Self::Stream(stream::Error::Anthropic { error, .. }) => Some(error),
            _ => None,
        }
    }

    /// Whether the API rejected the key.
    pub fn is_authentication(&self) -> bool {
        matches!(self.anthropic(), Some(AnthropicError::Authentication { .. }))
    }
}

/// Anthropic error type.
#[derive(Debug, thiserror::Error, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
#[serde(tag = "type")]
#[allow(missing_docs)]
pub enum AnthropicError {
    #[error("invalid request (400): {message}")]
    #[serde(rename = "invalid_request_error")]
    InvalidRequest { message: String },
    #[error("authentication (401): {message}")]
    #[serde(rename = "authentication_error")]
    Authentication { message: String },
    #[error("billing (402): {message}")]
    #[serde(rename = "billing_error")]
    Billing { message: String },
    #[error("permission (403): {message}")]
    #[serde(rename = "permission_error")]
    Permission { message: String },
    #[error("not found (404): {message}")]
    #[serde(rename = "not_found_error")]
    NotFound { message: String },
    #[error("request too large (413): {message}")]
    // This inconsistency is in the API.
    RequestTooLarge { message: String },
    #[error("rate limit (429): {message}")]
    #[serde(rename = "rate_limit_error")]
    RateLimit { message: String },
    #[error("api error (500): {message}")]
    #[serde(rename = "api_error")]
    API { message: String },
    #[error("overloaded (529): {message}")]
    #[serde(rename = "overloaded_error")]
    Overloaded { message: String },
    // Anthropic's API specifies they can add more error codes in the future.
    #[error("unknown error ({code}): {message}")]
    Unknown { code: NonZeroU16, message: String },
}

impl AnthropicError {
    /// Get the HTTP status code for the error.
    pub fn status(&self) -> NonZeroU16 {
        let code = match self {
            Self::InvalidRequest { .. } => 400,
            Self::Authentication { .. } => 401,
            Self::Billing { .. } => 402,
            Self::Permission { .. } => 403,
            Self::NotFound { .. } => 404,
            Self::RequestTooLarge { .. } => 413,
            Self::RateLimit { .. } => 429,
            Self::API { .. } => 500,
            Self::Overloaded { .. } => 529,
            Self::Unknown { code, .. } => return *code,
        };
        NonZeroU16::new(code).unwrap_or(NonZeroU16::MIN)
    }

    /// The error `type` as the API names it.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } => "invalid_request_error",
            Self::Authentication { .. } => "authentication_error",
            Self::Billing { .. } => "billing_error",
            Self::Permission { .. } => "permission_error",
            Self::NotFound { .. } => "not_found_error",
            Self::RequestTooLarge { .. } => "request_too_large",
            Self::RateLimit { .. } => "rate_limit_error",
            Self::API { .. } => "api_error",
            Self::Overloaded { .. } => "overloaded_error",
            Self::Unknown { .. } => "unknown",
        }
    }

    /// Human readable message from the API.
    pub fn message(&self) -> &str {
        match self {
            Self::InvalidRequest { message }
            | Self::Authentication { message }
            | Self::Billing { message }
            | Self::Permission { message }
            | Self::NotFound { message }
            | Self::RequestTooLarge { message }
            | Self::RateLimit { message }
            | Self::API { message }
            | Self::Overloaded { message }
            | Self::Unknown { message, .. } => message,
        }
    }

    /// Parse an error response body. Bodies that are not a known API error
    /// (a proxy's HTML page, a new error type) become [`Self::Unknown`] with
    /// the raw body as the message.
    pub(crate) fn from_body(status: reqwest::StatusCode, body: String) -> Self {
        match serde_json::from_str::<AnthropicErrorWrapper>(&body) {
            Ok(wrapper) => wrapper.error,
            Err(error) => {
                log::debug!("Could not parse error body: {}", error);
                Self::Unknown {
                    code: NonZeroU16::new(status.as_u16())
                        .unwrap_or(NonZeroU16::MIN),
                    message: body,
                }
            }
        }
    }
}

// This is because the API tags errors and there isn't a way to tag
// both fields with "type" *and* the enum itself so we must wrap it.
#[derive(Deserialize)]
pub(crate) struct AnthropicErrorWrapper {
    pub(crate) error: AnthropicError,
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test error deserialization.

    #[test]
    fn test_anthropic_error_deserialize() {
        const AUTHENTICATION: &str = r#"{"type":"authentication_error","message":"invalid x-api-key"}"#;
        let error: AnthropicError =
            serde_json::from_str(AUTHENTICATION).unwrap();
        assert_eq!(
            error,
            AnthropicError::Authentication {
                message: "invalid x-api-key".to_string()
            }
        );
        assert_eq!(error.status().get(), 401);
        assert_eq!(error.kind(), "authentication_error");
        assert_eq!(error.message(), "invalid x-api-key");

        const REQUEST_TOO_LARGE: &str =
            r#"{"type":"request_too_large","message":"Request too large"}"#;
        let error: AnthropicError =
            serde_json::from_str(REQUEST_TOO_LARGE).unwrap();
        assert_eq!(
            error,
            AnthropicError::RequestTooLarge {
                message: "Request too large".to_string()
            }
        );
        assert_eq!(error.kind(), "request_too_large");

        const OVERLOADED: &str =
            r#"{"type":"overloaded_error","message":"Service overloaded"}"#;
        let error: AnthropicError = serde_json::from_str(OVERLOADED).unwrap();
        assert_eq!(error.status().get(), 529);
    }

    #[test]
    fn test_kind_matches_serde_tag() {
        let errors = [
            AnthropicError::InvalidRequest { message: "m".into() },
            AnthropicError::Authentication { message: "m".into() },
            AnthropicError::Billing { message: "m".into() },
            AnthropicError::Permission { message: "m".into() },
            AnthropicError::NotFound { message: "m".into() },
            AnthropicError::RequestTooLarge { message: "m".into() },
            AnthropicError::RateLimit { message: "m".into() },
            AnthropicError::API { message: "m".into() },
            AnthropicError::Overloaded { message: "m".into() },
        ];

        for error in errors {
            let json = serde_json::to_value(&error).unwrap();
            assert_eq!(json["type"], error.kind());
        }
    }

    #[test]
    fn test_from_body() {
        // We only need test one variant because the wrapper is the same for
        // all.
        const WRAPPED: &str = r#"{
  "type": "error",
  "error": {
    "type": "invalid_request_error",
    "message": "<string>"
  }
}"#;

        let error = AnthropicError::from_body(
            reqwest::StatusCode::BAD_REQUEST,
            WRAPPED.to_string(),
        );
        assert_eq!(
            error,
            AnthropicError::InvalidRequest {
                message: "<string>".to_string()
            }
        );

        let error = AnthropicError::from_body(
            reqwest::StatusCode::BAD_GATEWAY,
            "<html>Bad Gateway</html>".to_string(),
        );
        assert_eq!(error.status().get(), 502);
        assert_eq!(error.message(), "<html>Bad Gateway</html>");
    }

    #[test]
    fn test_is_authentication() {
        let error: Error = AnthropicError::Authentication {
            message: "invalid x-api-key".into(),
        }
        .into();
        assert!(error.is_authentication());

        let error: Error = AnthropicError::Overloaded {
            message: "Overloaded".into(),
        }
        .into();
        assert!(!error.is_authentication());
        assert_eq!(error.anthropic().unwrap().kind(), "overloaded_error");

        let error = Error::UnexpectedResponse { message: "nope" };
        assert!(!error.is_authentication());
        assert!(error.anthropic().is_none());
    }

    // Test the Client

    use crate::{prompt::Role, stream::FilterExt, Prompt};
    use futures::TryStreamExt;

    const CRATE_ROOT: &str = env!("CARGO_MANIFEST_DIR");

    // Not a real key. Do not use a string literal for a real key.
    const FAKE_API_KEY: &str = "sk-ant-REDACTED";

    // Error message for when the API key is not found.
    const NO_API_KEY: &str = "API key not found. Create a file named `api.key` in the crate root with your API key.";

    // Load the API key from the `api.key` file in the crate root.
    fn load_api_key() -> Option<Key> {
        crate::KeyStore::new(std::path::Path::new(CRATE_ROOT).join("api.key"))
            .load()
            .ok()
    }

    fn fake_key() -> Key {
        Key::try_from(FAKE_API_KEY.to_string()).unwrap()
    }

    #[test]
    fn test_client_new() {
        let client = Client::new(fake_key()).unwrap();
        assert_eq!(client.key.to_string(), FAKE_API_KEY);
        assert_eq!(client.url, Client::DEFAULT_URL);

        let client = client.with_url("http://localhost:1234/v1/messages");
        assert_eq!(client.url, "http://localhost:1234/v1/messages");
    }

    #[tokio::test]
    async fn test_client_error_status() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .match_header("x-api-key", FAKE_API_KEY)
            .match_header("anthropic-version", Client::ANTHROPIC_VERSION)
            .with_status(401)
            .with_header("content-type", "application/json")
            .with_body(r#"{"type":"error","error":{"type":"authentication_error","message":"invalid x-api-key"}}"#)
            .create_async()
            .await;

        let client = Client::new(fake_key())
            .unwrap()
            .with_url(format!("{}/v1/messages", server.url()));

        let error = client
            .message(Prompt::default().messages([(Role::User, "a")]))
            .await
            .unwrap_err();

        assert!(error.is_authentication());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_client_mock_message() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "stream": false,
                "max_tokens": 1,
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"msg_1","type":"message","role":"assistant","model":"claude-3-haiku-20240307","content":[{"type":"text","text":"Hi"}],"stop_reason":"max_tokens","stop_sequence":null,"usage":{"input_tokens":8,"output_tokens":1}}"#)
            .create_async()
            .await;

        let client = Client::new(fake_key())
            .unwrap()
            .with_url(format!("{}/v1/messages", server.url()));

        let message = client
            .message(
                Prompt::default()
                    .max_tokens(NonZeroU16::MIN)
                    .messages([(Role::User, "a")]),
            )
            .await
            .unwrap();

        assert_eq!(message.to_string(), "Hi");
        assert_eq!(message.stop_reason, Some(response::StopReason::MaxTokens));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_client_mock_stream() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "stream": true,
            })))
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(include_str!("../test/data/sse.stream.txt"))
            .create_async()
            .await;

        let client = Client::new(fake_key())
            .unwrap()
            .with_url(format!("{}/v1/messages", server.url()));

        let text: String = client
            .stream(Prompt::default().messages([(Role::User, "Hello")]))
            .await
            .unwrap()
            .text()
            .try_collect()
            .await
            .unwrap();

        assert_eq!(text, "Hi there");
        mock.assert_async().await;
    }

    #[tokio::test]
    #[ignore = "This test requires a real API key."]
    async fn test_client_message() {
        let client = Client::new(load_api_key().expect(NO_API_KEY)).unwrap();

        let message = client
            .message(Prompt::default().messages([(
                Role::User,
                "Emit just the \"🙏\" emoji, please.",
            )]))
            .await
            .unwrap();

        assert_eq!(message.role, Role::Assistant);
        assert!(message.to_string().contains("🙏"));
    }

    #[tokio::test]
    #[ignore = "This test requires a real API key."]
    async fn test_client_stream() {
        let client = Client::new(load_api_key().expect(NO_API_KEY)).unwrap();

        let stream = client
            .stream(Prompt::default().messages([(
                Role::User,
                "Emit just the \"🙏\" emoji, please.",
            )]))
            .await
            .unwrap();

        let msg: String = stream
            .text()
            .try_collect()
            .await
            .unwrap();

        assert_eq!(msg, "🙏");
    }
}
