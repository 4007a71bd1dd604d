//! Comments service
//!
//! Comments hang off a todo, so every call first confirms the todo belongs
//! to the caller with the cheap existence check.

use crate::config::MAX_COMMENT_LENGTH;
use crate::context::RequestContext;
use crate::database::{AddCommentPayload, Comment, Repository, UpdateCommentPayload};
use crate::error::{AppError, Result};
use uuid::Uuid;

fn validate_content(content: &str) -> Result<()> {
    if content.trim().is_empty() {
        return Err(AppError::validation("comment content is required"));
    }
    if content.chars().count() > MAX_COMMENT_LENGTH {
        return Err(AppError::validation(format!(
            "comment content must be at most {} characters",
            MAX_COMMENT_LENGTH
        )));
    }
    Ok(())
}

/// Service for todo comments
#[derive(Clone)]
pub struct CommentService {
    repo: Repository,
}

impl CommentService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    pub async fn add_comment(
        &self,
        ctx: &RequestContext,
        owner_id: &str,
        todo_id: Uuid,
        payload: AddCommentPayload,
    ) -> Result<Comment> {
        validate_content(&payload.content)?;

        self.repo.check_todo_exists(ctx, owner_id, todo_id).await?;

        let comment = self.repo.add_comment(ctx, owner_id, todo_id, payload).await?;

        tracing::info!("Comment {} added to todo {}", comment.id, todo_id);

        Ok(comment)
    }

    pub async fn get_comments_by_todo_id(
        &self,
        ctx: &RequestContext,
        owner_id: &str,
        todo_id: Uuid,
    ) -> Result<Vec<Comment>> {
        self.repo.check_todo_exists(ctx, owner_id, todo_id).await?;
        self.repo.get_comments_by_todo_id(ctx, owner_id, todo_id).await
    }

    pub async fn update_comment(
        &self,
        ctx: &RequestContext,
        owner_id: &str,
        payload: UpdateCommentPayload,
    ) -> Result<Comment> {
        validate_content(&payload.content)?;
        self.repo.update_comment(ctx, owner_id, payload).await
    }

    pub async fn delete_comment(
        &self,
        ctx: &RequestContext,
        owner_id: &str,
        comment_id: Uuid,
    ) -> Result<()> {
        self.repo.delete_comment(ctx, owner_id, comment_id).await
    }
}
