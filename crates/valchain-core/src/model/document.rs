use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

/// Date format used for document dates, both in storage and on the wire.
pub const DOCUMENT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Approval and versioning metadata attached 1:1 to a value chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub code: String,
    pub revision: String,
    pub date: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub approver: String,
}

impl DocumentInfo {
    /// Document metadata with the given code and revision, dated today.
    #[must_use]
    pub fn dated_today(code: impl Into<String>, revision: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            revision: revision.into(),
            date: today(),
            author: String::new(),
            approver: String::new(),
        }
    }

    /// Parse `date`, if it is a well-formed calendar date.
    #[must_use]
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.date.trim(), DOCUMENT_DATE_FORMAT).ok()
    }
}

/// Today's local date in [`DOCUMENT_DATE_FORMAT`].
#[must_use]
pub fn today() -> String {
    Local::now().date_naive().format(DOCUMENT_DATE_FORMAT).to_string()
}
