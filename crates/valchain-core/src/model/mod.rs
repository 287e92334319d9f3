//! In-memory data model shared by the gateway and the editor session.

pub mod chain;
pub mod document;
pub mod id;

pub use chain::{Chain, Node, PositionOverflow, Row, text_is_empty};
pub use document::DocumentInfo;
pub use id::{LocalId, ParseIdError};
