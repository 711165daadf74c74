//! [`Session`]: get a working key, then loop between the menu and the prompt
//! until the user is done.

use std::io;

use crate::{
    client,
    exchange::{self, Mode, Reply},
    key::EmptyKey,
    store, Key, KeyStore, Service, Terminal,
};

/// Result type for [`Session`]. See also [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal session errors. Everything else is reported and the session carries
/// on.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The service rejected the key.
    #[error("Given api key is not valid")]
    InvalidKey,
    /// The key could not be checked for any other reason.
    #[error("Error validating api key: {0}")]
    Validation(client::Error),
    /// A client could not be built for the key.
    #[error("Could not create client: {0}")]
    Client(client::Error),
    /// Input ended before a key was given.
    #[error("No api key given")]
    NoKey,
    /// Reading from or writing to the terminal failed.
    #[error("Terminal error: {0}")]
    Terminal(#[from] io::Error),
}

/// Where the loop driver is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Showing the menu.
    Menu,
    /// Reading prompts and answering them.
    Asking,
    /// Done.
    Exit,
}

/// Where a [`Key`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Read from the [`KeyStore`].
    Disk,
    /// Typed in by the user.
    Prompt,
}

/// Menu entry that starts asking questions.
pub const ASK: &str = "Ask Claude";
/// Menu entry that ends the session.
pub const EXIT: &str = "Exit";
/// Menu entry that deletes the stored key.
pub const CLEAR: &str = "Clear api key";

/// Read the stored key, falling back to asking the user for one.
pub fn obtain_key<T>(store: &KeyStore, terminal: &mut T) -> Result<(Key, Origin)>
where
    T: Terminal + ?Sized,
{
    match store.load() {
        Ok(key) => {
            terminal.print(&format!(
                "Using api key \"{}\" from disk.\n",
                key.preview()
            ))?;
            return Ok((key, Origin::Disk));
        }
        Err(store::Error::NotFound { .. }) => {}
        Err(error) => log::warn!("Ignoring stored key: {}", error),
    }

    Ok((prompt_key(terminal)?, Origin::Prompt))
}

/// Ask for a key with echo disabled until a non-empty one is given.
pub fn prompt_key<T>(terminal: &mut T) -> Result<Key>
where
    T: Terminal + ?Sized,
{
    loop {
        let Some(input) = terminal.read_secret("Please give Anthropic api key")?
        else {
            return Err(Error::NoKey);
        };

        match Key::try_from(input) {
            Ok(key) => return Ok(key),
            Err(EmptyKey) => terminal.print("Api key cannot be empty.\n")?,
        }
    }
}

/// Check the key `service` was built with.
pub async fn validate<S>(service: &S) -> Result<()>
where
    S: Service,
{
    match service.check().await {
        Ok(()) => Ok(()),
        Err(error) if error.is_authentication() => {
            log::error!("Key rejected: {}", error);
            Err(Error::InvalidKey)
        }
        Err(error) => Err(Error::Validation(error)),
    }
}

/// Offer to save `key` for next time. Returns whether it was saved. Failing
/// to save is reported but not fatal.
pub fn persist<T>(store: &KeyStore, key: &Key, terminal: &mut T) -> Result<bool>
where
    T: Terminal + ?Sized,
{
    terminal
        .print("Api key is valid. Would you like to save it for next time? y/n\n")?;

    let answer = terminal.read_line()?.unwrap_or_default();
    if answer.trim() != "y" {
        terminal.print("Not saving api key.\n")?;
        return Ok(false);
    }

    match store.save(key) {
        Ok(()) => {
            terminal.print("Api key saved.\n")?;
            Ok(true)
        }
        Err(error) => {
            log::warn!("{}", error);
            terminal.print("Failed to save api key, continuing..\n")?;
            Ok(false)
        }
    }
}

/// A validated key, the service it unlocks and the terminal to talk through.
pub struct Session<S, T> {
    service: S,
    store: KeyStore,
    terminal: T,
    mode: Mode,
}

impl<S, T> Session<S, T>
where
    S: Service,
    T: Terminal,
{
    /// Get a key (from `store` or the user), build the service for it with
    /// `connect`, check it, and offer to save a freshly typed key.
    pub async fn open<F>(
        store: KeyStore,
        mut terminal: T,
        mode: Mode,
        connect: F,
    ) -> Result<Self>
    where
        F: FnOnce(Key) -> client::Result<S>,
    {
        let (key, origin) = obtain_key(&store, &mut terminal)?;
        let service = connect(key.clone()).map_err(Error::Client)?;

        validate(&service).await?;

        if origin == Origin::Prompt {
            persist(&store, &key, &mut terminal)?;
        }

        Ok(Self {
            service,
            store,
            terminal,
            mode,
        })
    }

    /// Drive the session from `start` until [`State::Exit`].
    pub async fn run(&mut self, start: State) -> Result<()> {
        let mut state = start;
        if state == State::Asking {
            self.terminal.print("Ask Claude something: ")?;
        }

        loop {
            state = match state {
                State::Menu => self.menu()?,
                State::Asking => self.asking().await?,
                State::Exit => return Ok(()),
            };
        }
    }

    /// Show the menu and act on the choice.
    pub fn menu(&mut self) -> Result<State> {
        let mut items = vec![ASK, EXIT];
        if self.store.exists() {
            items.push(CLEAR);
        }

        let choice = match self.terminal.select("Select action", &items) {
            Ok(Some(choice)) => items.get(choice).copied(),
            Ok(None) => None,
            Err(error) => {
                self.terminal.print(&format!("Prompt failed {error}\n"))?;
                return Ok(State::Exit);
            }
        };

        match choice {
            Some(ASK) => {
                self.terminal.print("Ask Claude something: ")?;
                Ok(State::Asking)
            }
            Some(CLEAR) => self.clear(),
            _ => {
                self.terminal.print("Exiting...\n")?;
                Ok(State::Exit)
            }
        }
    }

    /// Remove the stored key. Failure is reported and the menu comes back.
    pub fn clear(&mut self) -> Result<State> {
        match self.store.clear() {
            Ok(()) => self.terminal.print("Api key cleared.\n")?,
            Err(error) => {
                log::error!("{}", error);
                self.terminal.print("Error clearing api key\n")?;
            }
        }
        Ok(State::Menu)
    }

    /// Read one prompt and answer it.
    pub async fn asking(&mut self) -> Result<State> {
        let Some(line) = self.terminal.read_line()? else {
            return Ok(State::Exit);
        };

        match exchange::ask(&self.service, self.mode, &line, &mut self.terminal)
            .await
        {
            Ok(Reply::Menu) => Ok(State::Menu),
            Ok(Reply::Blank | Reply::Answered(_)) => Ok(State::Asking),
            Err(exchange::Error::Terminal(error)) => Err(error.into()),
            Err(error) => {
                log::warn!("{}", error);
                self.terminal.print(&format!("{error}\n"))?;
                Ok(State::Asking)
            }
        }
    }

    /// Everything printed so far goes through this terminal.
    pub fn terminal(&self) -> &T {
        &self.terminal
    }
}
