use serde::Serialize;
use std::fmt;

/// Lifecycle of an editing session.
///
/// ```text
/// Unloaded -> Loading -> Ready <-> Editing -> Saving -> Ready
/// ```
///
/// `Editing` is `Ready` with unsaved changes. `Loading` and `Saving` are the
/// only busy states; a failed call returns to the state held before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Unloaded,
    Loading,
    Ready,
    Editing,
    Saving,
}

impl SessionState {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Unloaded => "unloaded",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Editing => "editing",
            Self::Saving => "saving",
        }
    }

    /// `true` while a gateway call is in flight.
    #[must_use]
    pub const fn is_busy(self) -> bool {
        matches!(self, Self::Loading | Self::Saving)
    }

    /// The busy state may only be entered from a settled one; saving also
    /// needs a chain.
    #[must_use]
    pub const fn can_enter(self, busy: Self) -> bool {
        match busy {
            Self::Loading => !self.is_busy(),
            Self::Saving => matches!(self, Self::Ready | Self::Editing),
            Self::Unloaded | Self::Ready | Self::Editing => false,
        }
    }

    /// The settled state after an in-memory edit.
    #[must_use]
    pub const fn after_edit(self) -> Self {
        match self {
            Self::Ready | Self::Editing => Self::Editing,
            other => other,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
