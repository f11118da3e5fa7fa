use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// The enablement state of a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum State {
    /// The feature is turned on.
    Enabled,
    /// The feature is turned off.
    #[default]
    Disabled,
}

impl State {
    /// Returns `true` for [`State::Enabled`].
    pub fn is_enabled(&self) -> bool {
        matches!(self, State::Enabled)
    }
}

impl From<bool> for State {
    fn from(value: bool) -> Self {
        if value {
            State::Enabled
        } else {
            State::Disabled
        }
    }
}

impl Display for State {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            State::Enabled => f.write_str("ENABLED"),
            State::Disabled => f.write_str("DISABLED"),
        }
    }
}

/// Describes which tier of data produced a [`crate::FeatureCheckResponse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    /// The configuration was fetched live for this check.
    Live,
    /// The configuration already held in memory was used.
    InMemory,
    /// The last persisted configuration was used because the live fetch failed.
    Cached,
    /// No configuration was available; the request's default state was used.
    Default,
}

impl Display for ResponseSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponseSource::Live => f.write_str("live"),
            ResponseSource::InMemory => f.write_str("in-memory"),
            ResponseSource::Cached => f.write_str("cached"),
            ResponseSource::Default => f.write_str("default"),
        }
    }
}
