//! Session [`Config`].

use std::{num::NonZeroU16, path::PathBuf};

use crate::{exchange::Mode, session::State, Client, KeyStore, Model, Prompt};

/// Everything a session needs to know up front.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Where the key is stored between runs.
    pub key_path: PathBuf,
    /// Model that answers prompts.
    pub model: Model,
    /// Model used for the one token key check.
    pub check_model: Model,
    /// Upper bound on the length of each answer.
    pub max_tokens: NonZeroU16,
    /// Stream answers or print them whole.
    pub mode: Mode,
    /// Start at the menu rather than straight at the prompt.
    pub menu: bool,
    /// Messages API endpoint.
    pub url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            key_path: KeyStore::DEFAULT_PATH.into(),
            model: Model::default(),
            check_model: Model::Haiku30_20240307,
            max_tokens: Prompt::DEFAULT_MAX_TOKENS,
            mode: Mode::default(),
            menu: true,
            url: Client::DEFAULT_URL.to_string(),
        }
    }
}

impl Config {
    /// [`KeyStore`] at [`Self::key_path`].
    pub fn store(&self) -> KeyStore {
        KeyStore::new(&self.key_path)
    }

    /// [`State`] the loop starts in.
    pub fn start(&self) -> State {
        if self.menu {
            State::Menu
        } else {
            State::Asking
        }
    }
}
