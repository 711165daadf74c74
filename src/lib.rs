#![warn(missing_docs)]
#![forbid(unsafe_code)]
//! `cmdlineai` asks Claude questions from a shell.
//!
//! A [`Session`] gets an API [`Key`] (from the [`KeyStore`] or a masked
//! prompt), checks it with a one token request, optionally saves it, and then
//! loops between a menu and a prompt. Each prompt is one exchange with the
//! [Anthropic Messages API], printed as a [`Stream`] of text or as a whole
//! [`response::Message`].
//!
//! [Anthropic Messages API]: <https://docs.anthropic.com/en/api/messages>

pub mod key;
pub use key::Key;

pub mod store;
pub use store::KeyStore;

pub mod client;
pub use client::Client;

pub mod model;
pub use model::Model;

pub mod prompt;
pub use prompt::Prompt;

pub mod stream;
pub use stream::Stream;

pub mod response;
pub use response::Response;

pub mod service;
pub use service::{Claude, Service};

pub mod terminal;
pub use terminal::{Console, Terminal};

pub mod exchange;
pub use exchange::Mode;

pub mod session;
pub use session::{Session, State};

pub mod config;
pub use config::Config;
