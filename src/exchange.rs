//! One exchange with the AI service: send a prompt, print what comes back.

use std::io;

use futures::StreamExt;

use crate::{client, Service, Terminal};

/// Typing this (surrounding whitespace ignored) instead of a prompt goes back
/// to the menu.
pub const SENTINEL: &str = "menu";

/// How answers are printed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Print fragments as they arrive.
    #[default]
    Stream,
    /// Wait for the complete answer, then print it.
    Whole,
}

/// What came of an [`ask`].
#[derive(Debug, PartialEq, Eq)]
pub enum Reply {
    /// The user asked for the menu. Nothing was sent.
    Menu,
    /// The prompt was blank. Nothing was sent.
    Blank,
    /// The complete answer, already printed.
    Answered(String),
}

/// [`ask`] error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request failed. Worth reporting, not worth stopping for.
    #[error("{}", describe(.0))]
    Service(#[from] client::Error),
    /// The answer could not be printed.
    #[error("Terminal error: {0}")]
    Terminal(#[from] io::Error),
}

fn describe(error: &client::Error) -> String {
    match error.anthropic() {
        Some(error) => format!(
            "Messages error, type: {}, message: {}",
            error.kind(),
            error.message()
        ),
        None => format!("Messages error: {error}"),
    }
}

/// Send `prompt` to `service` and print the answer to `terminal`, followed by
/// a blank line.
pub async fn ask<S, T>(
    service: &S,
    mode: Mode,
    prompt: &str,
    terminal: &mut T,
) -> Result<Reply, Error>
where
    S: Service,
    T: Terminal + ?Sized,
{
    let prompt = prompt.trim();
    if prompt == SENTINEL {
        return Ok(Reply::Menu);
    }
    if prompt.is_empty() {
        return Ok(Reply::Blank);
    }

    log::debug!("Asking ({:?}): {}", mode, prompt);

    let answer = match mode {
        Mode::Whole => {
            let answer = service.complete(prompt).await?;
            terminal.print(&answer)?;
            answer
        }
        Mode::Stream => {
            let mut fragments = service.stream(prompt).await?;
            let mut answer = String::new();

            while let Some(fragment) = fragments.next().await {
                let fragment = match fragment {
                    Ok(fragment) => fragment,
                    Err(error) => {
                        // Keep whatever was printed readable.
                        if !answer.is_empty() {
                            terminal.print("\n")?;
                        }
                        return Err(error.into());
                    }
                };
                terminal.print(&fragment)?;
                answer.push_str(&fragment);
            }

            answer
        }
    };

    terminal.print("\n\n")?;
    Ok(Reply::Answered(answer))
}
