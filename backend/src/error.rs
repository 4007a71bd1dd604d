//! Error types for the tasker data layer
//!
//! All errors use thiserror for structured error handling.
//! The three-way taxonomy (not found / validation / store) is preserved
//! through [`AppError::kind`] so the boundary can map it to status codes.

use thiserror::Error;

/// Broad classification used by callers to decide how to surface an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Entity absent or owned by someone else.
    NotFound,
    /// Caller-correctable input problem. Never retried.
    Validation,
    /// Connectivity, constraint, cancellation or other store-side failure.
    Store,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{entity} not found: {id}")]
    NotFound {
        entity: &'static str,
        id: String,
        code: &'static str,
    },

    #[error("{0}")]
    Validation(String),

    #[error("Database error during {op} (owner_id={owner_id}, entity_id={entity_id}): {source}")]
    Database {
        op: &'static str,
        owner_id: String,
        entity_id: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("Operation {op} was cancelled")]
    Cancelled { op: &'static str },

    #[error("Operation {op} exceeded its deadline")]
    DeadlineExceeded { op: &'static str },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    pub fn todo_not_found(id: impl ToString) -> Self {
        AppError::NotFound {
            entity: "todo",
            id: id.to_string(),
            code: "TODO_NOT_FOUND",
        }
    }

    pub fn category_not_found(id: impl ToString) -> Self {
        AppError::NotFound {
            entity: "category",
            id: id.to_string(),
            code: "CATEGORY_NOT_FOUND",
        }
    }

    pub fn comment_not_found(id: impl ToString) -> Self {
        AppError::NotFound {
            entity: "comment",
            id: id.to_string(),
            code: "COMMENT_NOT_FOUND",
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::NotFound { .. } => ErrorKind::NotFound,
            AppError::Validation(_) => ErrorKind::Validation,
            _ => ErrorKind::Store,
        }
    }

    /// Stable machine-readable code for the boundary layer.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound { code, .. } => *code,
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Cancelled { .. } => "CANCELLED",
            AppError::DeadlineExceeded { .. } => "DEADLINE_EXCEEDED",
            _ => "STORE_ERROR",
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

/// Attaches operation context to a raw sqlx error.
pub(crate) trait DbContext<T> {
    fn db_context(self, op: &'static str, owner_id: &str, entity_id: impl ToString) -> Result<T>;
}

impl<T> DbContext<T> for std::result::Result<T, sqlx::Error> {
    fn db_context(self, op: &'static str, owner_id: &str, entity_id: impl ToString) -> Result<T> {
        self.map_err(|source| AppError::Database {
            op,
            owner_id: owner_id.to_string(),
            entity_id: entity_id.to_string(),
            source,
        })
    }
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_stay_distinct() {
        assert_eq!(AppError::todo_not_found("x").kind(), ErrorKind::NotFound);
        assert_eq!(
            AppError::validation("no fields to update").kind(),
            ErrorKind::Validation
        );
        assert_eq!(AppError::Cancelled { op: "get_todo" }.kind(), ErrorKind::Store);
        assert_eq!(
            AppError::DeadlineExceeded { op: "get_todo" }.kind(),
            ErrorKind::Store
        );
    }

    #[test]
    fn test_codes() {
        assert_eq!(AppError::todo_not_found("x").code(), "TODO_NOT_FOUND");
        assert_eq!(AppError::category_not_found("x").code(), "CATEGORY_NOT_FOUND");
        assert_eq!(AppError::validation("bad").code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_database_error_carries_context() {
        let err: Result<()> =
            Err(sqlx::Error::RowNotFound).db_context("update_todo", "user-1", "todo-9");
        let msg = err.unwrap_err().to_string();
        assert!(msg.contains("update_todo"));
        assert!(msg.contains("user-1"));
        assert!(msg.contains("todo-9"));
    }

    #[test]
    fn test_serializes_as_message() {
        let json = serde_json::to_string(&AppError::validation("no fields to update")).unwrap();
        assert_eq!(json, "\"no fields to update\"");
    }
}
