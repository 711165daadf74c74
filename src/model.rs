//! [`Model`] to use for inference.
use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Model to use for inference. Any identifier the API accepts can be given
/// with [`Model::Custom`].
#[derive(
    Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord,
)]
pub enum Model {
    /// Sonnet 3.5 (latest). This is the default model.
    #[default]
    #[serde(rename = "claude-3-5-sonnet-latest")]
    Sonnet35,
    /// Sonnet 3.7 (latest)
    #[serde(rename = "claude-3-7-sonnet-latest")]
    Sonnet37,
    /// Sonnet 4
    #[serde(rename = "claude-sonnet-4-0")]
    Sonnet4,
    /// Opus 4
    #[serde(rename = "claude-opus-4-0")]
    Opus4,
    /// Haiku 3.0 2024-03-07. Cheapest, so it is used to check keys.
    #[serde(rename = "claude-3-haiku-20240307")]
    Haiku30_20240307,
    /// Haiku 3.5 (latest)
    #[serde(rename = "claude-3-5-haiku-latest")]
    Haiku35,
    /// Any other model identifier, including dated snapshots returned by the
    /// API.
    #[serde(untagged)]
    Custom(Cow<'static, str>),
}

impl Model {
    /// The identifier sent to the API.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Sonnet35 => "claude-3-5-sonnet-latest",
            Self::Sonnet37 => "claude-3-7-sonnet-latest",
            Self::Sonnet4 => "claude-sonnet-4-0",
            Self::Opus4 => "claude-opus-4-0",
            Self::Haiku30_20240307 => "claude-3-haiku-20240307",
            Self::Haiku35 => "claude-3-5-haiku-latest",
            Self::Custom(name) => name,
        }
    }
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Model {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(serde_json::from_value(serde_json::Value::String(s.to_string()))
            .unwrap_or_else(|_| Self::Custom(Cow::Owned(s.to_string()))))
    }
}
