use crate::domain::deal::Platform;
use std::fmt;

/// Failure taxonomy of a scouting run.
///
/// Only `InvalidInput` is ever returned from the pipeline. Source and store
/// failures are recovered where they happen and travel as values inside
/// search outcomes and persist outcomes.
#[derive(Debug, Clone, PartialEq)]
pub enum ScoutError {
    InvalidInput {
        field: &'static str,
        reason: String,
    },
    SourceUnavailable {
        platform: Platform,
        detail: String,
    },
    PersistenceFailure {
        detail: String,
    },
}

impl ScoutError {
    pub fn invalid_input(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ScoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoutError::InvalidInput { field, reason } => {
                write!(f, "invalid input (field={field}): {reason}")
            }
            ScoutError::SourceUnavailable { platform, detail } => {
                write!(f, "source unavailable (platform={platform}): {detail}")
            }
            ScoutError::PersistenceFailure { detail } => {
                write!(f, "persisting deals failed: {detail}")
            }
        }
    }
}

impl std::error::Error for ScoutError {}
