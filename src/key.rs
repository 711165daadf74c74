//! [`Key`] is a wrapper around an Anthropic API key.

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Number of characters shown by [`Key::preview`].
pub const PREVIEW_LEN: usize = 20;

/// Error for when a key is empty after trimming surrounding whitespace.
#[derive(Debug, thiserror::Error, PartialEq)]
#[error("Api key is empty")]
pub struct EmptyKey;

/// Stores an Anthropic API key. The key is zeroized on drop.
///
/// The object features a [`Display`] implementation that can be used to write
/// out the key. **Be sure to zeroize whatever you write it to**. [`Debug`]
/// never prints the secret.
///
/// [`Display`]: std::fmt::Display
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Key {
    secret: String,
}

impl Key {
    /// Read the key as a string slice.
    pub fn read(&self) -> &str {
        &self.secret
    }

    /// The first [`PREVIEW_LEN`] characters of the key followed by `...`.
    /// Safe to print so the user can tell which key is in use.
    pub fn preview(&self) -> String {
        let head: String = self.secret.chars().take(PREVIEW_LEN).collect();
        format!("{head}...")
    }
}

impl TryFrom<String> for Key {
    type Error = EmptyKey;

    /// Create a new key from a string. Surrounding whitespace (such as the
    /// newline left by a line read) is trimmed. The string is zeroized after
    /// conversion.
    fn try_from(mut s: String) -> Result<Self, Self::Error> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            s.zeroize();
            return Err(EmptyKey);
        }

        let secret = trimmed.to_string();
        s.zeroize();

        Ok(Self { secret })
    }
}

impl std::fmt::Debug for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Key").field("secret", &"<redacted>").finish()
    }
}

impl std::fmt::Display for Key {
    /// Write out the key. Make sure to zeroize whatever you write it to if at
    /// all possible.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.secret)
    }
}
