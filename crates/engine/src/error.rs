use std::fmt;

use crate::identity::{AxisKind, EntityId};

#[derive(Debug, Clone, PartialEq)]
pub enum GridError {
    /// An id is already live in the target axis.
    DuplicateId { axis: AxisKind, id: EntityId },
    /// A position names an unknown anchor, an anchor in another row section,
    /// or could not be parsed.
    InvalidPosition(String),
    /// The grid has been destroyed.
    UseAfterDestroy,
    /// A descriptor is internally inconsistent.
    InvalidDescriptor(String),
    /// JSON encode/decode failure.
    Json(String),
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateId { axis, id } => write!(f, "duplicate {axis} id '{id}'"),
            Self::InvalidPosition(msg) => write!(f, "invalid position: {msg}"),
            Self::UseAfterDestroy => write!(f, "grid has been destroyed"),
            Self::InvalidDescriptor(msg) => write!(f, "invalid descriptor: {msg}"),
            Self::Json(msg) => write!(f, "JSON error: {msg}"),
        }
    }
}

impl std::error::Error for GridError {}

impl From<serde_json::Error> for GridError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GridError>;
