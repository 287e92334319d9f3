use std::fmt;

/// Machine-readable error codes for scripted callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotInitialized,
    ConfigParseError,
    InvalidInput,
    ChainNotFound,
    RowNotFound,
    NodeNotFound,
    DocumentNotFound,
    PositionExhausted,
    NoChainLoaded,
    StorageFailure,
    ExportFailed,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotInitialized => "E1001",
            Self::ConfigParseError => "E1002",
            Self::InvalidInput => "E2001",
            Self::ChainNotFound => "E2002",
            Self::RowNotFound => "E2003",
            Self::NodeNotFound => "E2004",
            Self::DocumentNotFound => "E2005",
            Self::PositionExhausted => "E2006",
            Self::NoChainLoaded => "E3001",
            Self::StorageFailure => "E5001",
            Self::ExportFailed => "E5002",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotInitialized => "Project not initialized",
            Self::ConfigParseError => "Config file parse error",
            Self::InvalidInput => "Invalid input",
            Self::ChainNotFound => "Value chain not found",
            Self::RowNotFound => "Row not found",
            Self::NodeNotFound => "Node not found",
            Self::DocumentNotFound => "Document not found",
            Self::PositionExhausted => "No position left",
            Self::NoChainLoaded => "No chain loaded",
            Self::StorageFailure => "Storage failure",
            Self::ExportFailed => "Export failed",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to the user.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run `vchain init` to initialize this directory."),
            Self::ConfigParseError => Some("Fix syntax in .valchain/config.toml and retry."),
            Self::InvalidInput => {
                Some("Name, title, document code and revision must be non-blank; dates use YYYY-MM-DD.")
            }
            Self::ChainNotFound => Some("Run `vchain list` to see available chains."),
            Self::RowNotFound | Self::NodeNotFound => {
                Some("Run `vchain show <chain>` to see current row and node ids.")
            }
            Self::DocumentNotFound => None,
            Self::PositionExhausted => {
                Some("The last row or node sits at the largest position; append elsewhere.")
            }
            Self::NoChainLoaded => Some("Load or create a chain before editing."),
            Self::StorageFailure => Some("Check the database path and permissions, then retry."),
            Self::ExportFailed => Some("Check the output path and write permissions."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Kind of stored entity named in a [`StoreError::NotFound`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    Document,
    Chain,
    Row,
    Node,
}

impl Entity {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Chain => "value chain",
            Self::Row => "row",
            Self::Node => "node",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures surfaced by the persistence gateway.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Malformed input to a create operation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The referenced id does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: Entity, id: i64 },

    /// The backing store failed.
    #[error("storage failure: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl StoreError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) const fn not_found(entity: Entity, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    /// Machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Validation(_) => ErrorCode::InvalidInput,
            Self::NotFound { entity, .. } => match entity {
                Entity::Document => ErrorCode::DocumentNotFound,
                Entity::Chain => ErrorCode::ChainNotFound,
                Entity::Row => ErrorCode::RowNotFound,
                Entity::Node => ErrorCode::NodeNotFound,
            },
            Self::Storage(_) => ErrorCode::StorageFailure,
        }
    }
}
