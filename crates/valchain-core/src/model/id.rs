//! Identifiers for rows, nodes and chains held by an editor session.
//!
//! Storage issues integer ids. Elements added during an editing session get a
//! process-unique temporary token until a save reconciles them, so the two
//! kinds are kept apart by the type instead of sharing one string field.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

const TEMPORARY_PREFIX: &str = "tmp-";

static NEXT_TEMPORARY: AtomicU64 = AtomicU64::new(1);

/// Identifier of an in-memory chain element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LocalId {
    /// Issued by the backing store.
    Persisted(i64),
    /// Generated locally, not yet saved.
    Temporary(u64),
}

impl LocalId {
    /// Allocate a fresh temporary id, unique for the life of the process.
    #[must_use]
    pub fn temporary() -> Self {
        Self::Temporary(NEXT_TEMPORARY.fetch_add(1, Ordering::Relaxed))
    }

    /// The storage id, if this element has been persisted.
    #[must_use]
    pub const fn persisted(self) -> Option<i64> {
        match self {
            Self::Persisted(id) => Some(id),
            Self::Temporary(_) => None,
        }
    }

    #[must_use]
    pub const fn is_temporary(self) -> bool {
        matches!(self, Self::Temporary(_))
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Persisted(id) => write!(f, "{id}"),
            Self::Temporary(token) => write!(f, "{TEMPORARY_PREFIX}{token}"),
        }
    }
}

/// Error returned when a string is not a valid [`LocalId`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid id '{0}': expected an integer or tmp-<n>")]
pub struct ParseIdError(String);

impl FromStr for LocalId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some(token) = trimmed.strip_prefix(TEMPORARY_PREFIX) {
            return token
                .parse::<u64>()
                .map(Self::Temporary)
                .map_err(|_| ParseIdError(s.to_string()));
        }
        trimmed
            .parse::<i64>()
            .map(Self::Persisted)
            .map_err(|_| ParseIdError(s.to_string()))
    }
}

impl TryFrom<String> for LocalId {
    type Error = ParseIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LocalId> for String {
    fn from(id: LocalId) -> Self {
        id.to_string()
    }
}
