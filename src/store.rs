//! [`KeyStore`] keeps a single API [`Key`] in a plaintext file at a fixed
//! path so it does not have to be typed on every run.

use std::{
    io::{self, Write},
    path::{Path, PathBuf},
};

use crate::{key, Key};

/// Result type for [`KeyStore`] operations.
pub type Result<T> = std::result::Result<T, Error>;

/// [`KeyStore`] error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// There is no readable key file.
    #[error("No api key stored at {path}")]
    NotFound {
        /// Where we looked.
        path: PathBuf,
    },
    /// The key file exists but holds nothing but whitespace.
    #[error("Stored api key at {path} is empty")]
    Empty {
        /// The offending file.
        path: PathBuf,
    },
    /// Writing or removing the key file failed.
    #[error("I/O error on {path}: {error}")]
    Io {
        /// The key file.
        path: PathBuf,
        /// Underlying error.
        error: io::Error,
    },
}

/// Credential file at a fixed, injected path.
#[derive(Debug, Clone)]
pub struct KeyStore {
    path: PathBuf,
}

impl KeyStore {
    /// Default location of the key file.
    pub const DEFAULT_PATH: &'static str = "/tmp/cmdlineai_apikey";

    /// Create a store backed by `path`. Nothing is read or written yet.
    pub fn new<P>(path: P) -> Self
    where
        P: Into<PathBuf>,
    {
        Self { path: path.into() }
    }

    /// Path of the key file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a key file is present.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read the stored [`Key`]. Fails with [`Error::NotFound`] if the file is
    /// absent or unreadable.
    pub fn load(&self) -> Result<Key> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(error) => {
                log::debug!("Could not read {}: {}", self.path.display(), error);
                return Err(Error::NotFound {
                    path: self.path.clone(),
                });
            }
        };

        Key::try_from(contents).map_err(|key::EmptyKey| Error::Empty {
            path: self.path.clone(),
        })
    }

    /// Write `key` to the file in one operation, replacing any previous
    /// contents. On unix the file is only readable by its owner.
    pub fn save(&self, key: &Key) -> Result<()> {
        self.write(key).map_err(|error| Error::Io {
            path: self.path.clone(),
            error,
        })?;

        log::info!("Saved api key to {}", self.path.display());
        Ok(())
    }

    fn write(&self, key: &Key) -> io::Result<()> {
        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&self.path)?;
        file.write_all(key.read().as_bytes())?;
        file.flush()
    }

    /// Remove the key file.
    pub fn clear(&self) -> Result<()> {
        std::fs::remove_file(&self.path).map_err(|error| Error::Io {
            path: self.path.clone(),
            error,
        })?;

        log::info!("Removed api key at {}", self.path.display());
        Ok(())
    }
}

impl Default for KeyStore {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PATH)
    }
}
