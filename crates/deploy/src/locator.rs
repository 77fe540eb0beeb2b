//! Artifacts locator parsing.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use url::Url;

/// Release tag reported when the artifacts do not come from a named release.
pub const DEV_RELEASE: &str = "dev";

const TAG_SCHEME: &str = "tag://";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocatorError {
    #[error("locator is empty")]
    Empty,
    #[error("tag locator has no tag")]
    EmptyTag,
    #[error("unsupported locator scheme {0:?}, expected tag, file, http or https")]
    UnsupportedScheme(String),
    #[error(transparent)]
    Url(#[from] url::ParseError),
}

/// Where the compiled contract artifacts live.
///
/// Either a named contracts release (`tag://op-contracts/v1.6.0`) or a raw
/// location (`file:///path/to/forge-artifacts`, `https://host/artifacts.tar.gz`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArtifactsLocator {
    Tag(String),
    Url(Url),
}

impl ArtifactsLocator {
    pub fn tag(&self) -> Option<&str> {
        match self {
            Self::Tag(tag) => Some(tag),
            Self::Url(_) => None,
        }
    }

    /// The release tag recorded in the deployment input. Does not affect addresses.
    pub fn release_tag(&self) -> &str {
        self.tag().unwrap_or(DEV_RELEASE)
    }

    /// Whether the artifacts are read in place from the local filesystem.
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Url(url) if url.scheme() == "file")
    }
}

impl FromStr for ArtifactsLocator {
    type Err = LocatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(LocatorError::Empty);
        }

        if let Some(tag) = s.strip_prefix(TAG_SCHEME) {
            if tag.is_empty() {
                return Err(LocatorError::EmptyTag);
            }
            return Ok(Self::Tag(tag.to_string()));
        }

        let url = Url::parse(s)?;
        match url.scheme() {
            "file" | "http" | "https" => Ok(Self::Url(url)),
            other => Err(LocatorError::UnsupportedScheme(other.to_string())),
        }
    }
}

impl fmt::Display for ArtifactsLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tag(tag) => write!(f, "{TAG_SCHEME}{tag}"),
            Self::Url(url) => write!(f, "{url}"),
        }
    }
}

impl Serialize for ArtifactsLocator {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ArtifactsLocator {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
