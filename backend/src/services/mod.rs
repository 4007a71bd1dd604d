//! Services module
//!
//! Business rules that sit between callers and the repository.

pub mod categories;
pub mod comments;
pub mod todos;

pub use categories::CategoryService;
pub use comments::CommentService;
pub use todos::TodoService;

use crate::config::MAX_TITLE_LENGTH;
use crate::error::{AppError, Result};

/// Titles and names must be non-blank and fit the column limit.
pub(crate) fn validate_name(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{} is required", field)));
    }
    if value.chars().count() > MAX_TITLE_LENGTH {
        return Err(AppError::validation(format!(
            "{} must be at most {} characters",
            field, MAX_TITLE_LENGTH
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("title", "Buy milk").is_ok());
        assert!(validate_name("title", " \t").is_err());
        assert!(validate_name("title", &"é".repeat(MAX_TITLE_LENGTH)).is_ok());
        assert!(validate_name("title", &"é".repeat(MAX_TITLE_LENGTH + 1)).is_err());
    }
}
