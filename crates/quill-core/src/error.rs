use std::fmt;

use thiserror::Error;

use crate::domain::{CommentId, QueueId};

#[derive(Debug, Error)]
pub enum QueueError {
    /// Unknown or malformed id, as the caller spelled it.
    #[error("queue item not found: {0}")]
    NotFound(String),

    #[error("duplicate queue id: {0}")]
    DuplicateId(QueueId),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// One rejected field of a comment submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub reason: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// Every field that failed validation, reported together.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct ValidationError {
    pub fields: Vec<FieldError>,
}

impl ValidationError {
    pub fn has_field(&self, field: &str) -> bool {
        self.fields.iter().any(|e| e.field == field)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("validation failed: ")?;
        for (i, e) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

/// Failure reported by a [`CommentCreator`](crate::ports::CommentCreator).
///
/// The display text ends up in `QueueItem::error_message`, so keep it readable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CreateCommentError {
    #[error("{0}")]
    Rejected(String),

    #[error("parent comment not found: {0}")]
    ParentNotFound(CommentId),

    #[error("{0}")]
    Storage(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_lists_every_field() {
        let err = ValidationError {
            fields: vec![
                FieldError {
                    field: "user_name",
                    reason: "is required".to_string(),
                },
                FieldError {
                    field: "text",
                    reason: "is required".to_string(),
                },
            ],
        };

        assert_eq!(
            err.to_string(),
            "validation failed: user_name: is required; text: is required"
        );
        assert!(err.has_field("text"));
        assert!(!err.has_field("email"));
    }

    #[test]
    fn create_error_message_is_displayable() {
        let err = CreateCommentError::Storage("db down".to_string());
        assert_eq!(err.to_string(), "db down");
    }
}
