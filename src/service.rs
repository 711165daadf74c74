//! The AI service as a session sees it: check a key, answer a prompt whole or
//! as a lazy sequence of text fragments. [`Claude`] is the implementation on
//! top of [`Client`].

use std::{borrow::Cow, future::Future, num::NonZeroU16};

use futures::{stream::LocalBoxStream, StreamExt, TryStreamExt};

use crate::{
    client, prompt::Role, stream::FilterExt, Client, Config, Model, Prompt,
};

/// Incremental text of one answer. Ends when the answer is complete.
pub type TextStream = LocalBoxStream<'static, client::Result<String>>;

/// External AI service.
pub trait Service {
    /// Make the cheapest possible request to find out whether the key is
    /// accepted.
    fn check(&self) -> impl Future<Output = client::Result<()>>;

    /// Answer `prompt` in one piece.
    fn complete(&self, prompt: &str) -> impl Future<Output = client::Result<String>>;

    /// Answer `prompt` as a [`TextStream`] of fragments.
    fn stream(&self, prompt: &str) -> impl Future<Output = client::Result<TextStream>>;
}

/// [`Service`] backed by the Anthropic Messages API.
#[derive(Clone)]
pub struct Claude {
    client: Client,
    model: Model,
    check_model: Model,
    max_tokens: NonZeroU16,
}

impl Claude {
    /// Wrap `client` using the models and limits in `config`.
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            model: config.model.clone(),
            check_model: config.check_model.clone(),
            max_tokens: config.max_tokens,
        }
    }

    fn prompt<'a>(&self, text: &'a str) -> Prompt<'a> {
        Prompt::default()
            .model(self.model.clone())
            .max_tokens(self.max_tokens)
            .messages([(Role::User, text)])
    }
}

impl Service for Claude {
    fn check(&self) -> impl Future<Output = client::Result<()>> {
        // One token of output is all it takes to find out.
        let prompt = Prompt::default()
            .model(self.check_model.clone())
            .max_tokens(NonZeroU16::MIN)
            .messages([(Role::User, "a")]);

        async move {
            let message = self.client.message(prompt).await?;
            log::debug!("Key check answered by {}", message.model);
            Ok(())
        }
    }

    fn complete(&self, prompt: &str) -> impl Future<Output = client::Result<String>> {
        let prompt = self.prompt(prompt);

        async move {
            let message = self.client.message(prompt).await?;
            log::debug!(
                "Answer used {} input and {} output tokens",
                message.usage.input_tokens,
                message.usage.output_tokens
            );
            Ok(message.to_string())
        }
    }

    fn stream(&self, prompt: &str) -> impl Future<Output = client::Result<TextStream>> {
        let prompt = self.prompt(prompt);

        async move {
            let stream = self
                .client
                .stream(prompt)
                .await?
                .text()
                .map_ok(Cow::into_owned)
                .map_err(client::Error::from)
                .boxed_local();

            Ok(stream)
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{cell::RefCell, collections::VecDeque};

    use super::*;
    use crate::client::AnthropicError;

    /// Fragments of one scripted answer. An `Err` fragment ends the answer.
    pub type Fragments = Vec<client::Result<&'static str>>;

    /// [`Service`] that replays scripted outcomes and records every prompt it
    /// was sent.
    #[derive(Default)]
    pub struct Scripted {
        pub check: RefCell<Option<client::Error>>,
        pub replies: RefCell<VecDeque<client::Result<Fragments>>>,
        pub sent: RefCell<Vec<String>>,
    }

    impl Scripted {
        pub fn rejecting_key() -> Self {
            let service = Self::default();
            *service.check.borrow_mut() = Some(
                AnthropicError::Authentication {
                    message: "invalid x-api-key".into(),
                }
                .into(),
            );
            service
        }

        pub fn reply(self, fragments: Vec<&'static str>) -> Self {
            self.replies
                .borrow_mut()
                .push_back(Ok(fragments.into_iter().map(Ok).collect()));
            self
        }

        /// Answer with `fragments`, then fail with `error` before the answer
        /// is complete.
        pub fn cut_off(
            self,
            fragments: Vec<&'static str>,
            error: client::Error,
        ) -> Self {
            let fragments = fragments
                .into_iter()
                .map(Ok)
                .chain(std::iter::once(Err(error)))
                .collect();
            self.replies.borrow_mut().push_back(Ok(fragments));
            self
        }

        pub fn fail(self, error: client::Error) -> Self {
            self.replies.borrow_mut().push_back(Err(error));
            self
        }

        fn next(&self, prompt: &str) -> client::Result<Fragments> {
            self.sent.borrow_mut().push(prompt.to_string());
            self.replies
                .borrow_mut()
                .pop_front()
                .expect("no scripted reply left")
        }
    }

    impl Service for Scripted {
        fn check(&self) -> impl Future<Output = client::Result<()>> {
            let outcome = self.check.borrow_mut().take();
            async move {
                match outcome {
                    Some(error) => Err(error),
                    None => Ok(()),
                }
            }
        }

        fn complete(&self, prompt: &str) -> impl Future<Output = client::Result<String>> {
            let reply = self
                .next(prompt)
                .and_then(|fragments| fragments.into_iter().collect());
            async move { reply }
        }

        fn stream(&self, prompt: &str) -> impl Future<Output = client::Result<TextStream>> {
            let reply = self.next(prompt).map(|fragments| {
                futures::stream::iter(
                    fragments
                        .into_iter()
                        .map(|fragment| fragment.map(str::to_string)),
                )
                .boxed_local()
            });
            async move { reply }
        }
    }

    const FAKE_API_KEY: &str = "sk-ant-REDACTED";

    fn claude(server: &mockito::Server) -> Claude {
        let key = crate::Key::try_from(FAKE_API_KEY.to_string()).unwrap();
        let client = Client::new(key)
            .unwrap()
            .with_url(format!("{}/v1/messages", server.url()));
        Claude::new(client, &Config::default())
    }

    #[tokio::test]
    async fn test_check_sends_minimal_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .match_body(mockito::Matcher::Json(serde_json::json!({
                "model": "claude-3-haiku-20240307",
                "messages": [{"role": "user", "content": "a"}],
                "max_tokens": 1,
                "stream": false,
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"msg_1","type":"message","role":"assistant","model":"claude-3-haiku-20240307","content":[{"type":"text","text":"Hi"}],"stop_reason":"max_tokens","stop_sequence":null,"usage":{"input_tokens":8,"output_tokens":1}}"#)
            .create_async()
            .await;

        claude(&server).check().await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_check_rejected_key() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/messages")
            .with_status(401)
            .with_header("content-type", "application/json")
            .with_body(r#"{"type":"error","error":{"type":"authentication_error","message":"invalid x-api-key"}}"#)
            .create_async()
            .await;

        let error = claude(&server).check().await.unwrap_err();
        assert!(error.is_authentication());
    }

    #[tokio::test]
    async fn test_complete() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/messages")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "model": "claude-3-5-sonnet-latest",
                "messages": [{"role": "user", "content": "Hello"}],
                "max_tokens": 1000,
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"msg_1","type":"message","role":"assistant","model":"claude-3-5-sonnet-20241022","content":[{"type":"text","text":"Hi there"}],"stop_reason":"end_turn","stop_sequence":null,"usage":{"input_tokens":8,"output_tokens":2}}"#)
            .create_async()
            .await;

        assert_eq!(claude(&server).complete("Hello").await.unwrap(), "Hi there");
    }

    #[tokio::test]
    async fn test_stream() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/messages")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "stream": true,
            })))
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(include_str!("../test/data/sse.stream.txt"))
            .create_async()
            .await;

        let fragments: Vec<String> = claude(&server)
            .stream("Hello")
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();

        assert_eq!(fragments, ["Hi", " there"]);
    }

    #[tokio::test]
    async fn test_overloaded_mid_stream_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/messages")
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(include_str!("../test/data/sse.overloaded.txt"))
            .create_async()
            .await;

        let mut terminal = crate::terminal::tests::Scripted::default();
        let error = crate::exchange::ask(
            &claude(&server),
            crate::exchange::Mode::Stream,
            "Hello",
            &mut terminal,
        )
        .await
        .unwrap_err();

        match error {
            crate::exchange::Error::Service(error) => {
                assert_eq!(error.anthropic().unwrap().kind(), "overloaded_error");
            }
            other => panic!("unexpected error: {other}"),
        }
        // The partial answer stays on screen, without the answer terminator.
        assert_eq!(terminal.output, "Hi\n");
    }
}
