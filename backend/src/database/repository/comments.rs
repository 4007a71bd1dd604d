//! Comment reads and writes

use super::Repository;
use crate::context::RequestContext;
use crate::database::models::{AddCommentPayload, Comment, UpdateCommentPayload};
use crate::error::{AppError, DbContext, Result};
use chrono::Utc;
use uuid::Uuid;

impl Repository {
    /// Append a comment. Callers verify the todo belongs to `owner_id` first.
    pub async fn add_comment(
        &self,
        ctx: &RequestContext,
        owner_id: &str,
        todo_id: Uuid,
        payload: AddCommentPayload,
    ) -> Result<Comment> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        let mut tx = self.begin(ctx, "add_comment", owner_id, todo_id).await?;

        let comment = self
            .run(ctx, "add_comment", async {
                sqlx::query_as::<_, Comment>(
                    r#"
                    INSERT INTO todo_comments (id, todo_id, owner_id, content, created_at, updated_at)
                    VALUES (?, ?, ?, ?, ?, ?)
                    RETURNING *
                    "#,
                )
                .bind(id)
                .bind(todo_id)
                .bind(owner_id)
                .bind(&payload.content)
                .bind(now)
                .bind(now)
                .fetch_one(&mut *tx)
                .await
                .db_context("add_comment", owner_id, todo_id)
            })
            .await?;

        Self::commit(ctx, tx, "add_comment", owner_id, todo_id).await?;

        tracing::debug!("Created comment: {} for todo: {}", comment.id, todo_id);
        Ok(comment)
    }

    /// Comments on a todo in the order they were written
    pub async fn get_comments_by_todo_id(
        &self,
        ctx: &RequestContext,
        owner_id: &str,
        todo_id: Uuid,
    ) -> Result<Vec<Comment>> {
        self.run(ctx, "get_comments_by_todo_id", async {
            sqlx::query_as::<_, Comment>(
                r#"
                SELECT * FROM todo_comments
                WHERE todo_id = ? AND owner_id = ?
                ORDER BY created_at ASC, id ASC
                "#,
            )
            .bind(todo_id)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await
            .db_context("get_comments_by_todo_id", owner_id, todo_id)
        })
        .await
    }

    pub async fn get_comment(
        &self,
        ctx: &RequestContext,
        owner_id: &str,
        comment_id: Uuid,
    ) -> Result<Comment> {
        self.run(ctx, "get_comment", async {
            sqlx::query_as::<_, Comment>("SELECT * FROM todo_comments WHERE id = ? AND owner_id = ?")
                .bind(comment_id)
                .bind(owner_id)
                .fetch_optional(&self.pool)
                .await
                .db_context("get_comment", owner_id, comment_id)?
                .ok_or_else(|| AppError::comment_not_found(comment_id))
        })
        .await
    }

    pub async fn update_comment(
        &self,
        ctx: &RequestContext,
        owner_id: &str,
        payload: UpdateCommentPayload,
    ) -> Result<Comment> {
        let comment_id = payload.id;

        let mut tx = self.begin(ctx, "update_comment", owner_id, comment_id).await?;

        let comment = self.run(ctx, "update_comment", async {
            sqlx::query_as::<_, Comment>(
                r#"
                UPDATE todo_comments SET content = ?, updated_at = ?
                WHERE id = ? AND owner_id = ?
                RETURNING *
                "#,
            )
            .bind(&payload.content)
            .bind(Utc::now())
            .bind(comment_id)
            .bind(owner_id)
            .fetch_optional(&mut *tx)
            .await
            .db_context("update_comment", owner_id, comment_id)?
            .ok_or_else(|| AppError::comment_not_found(comment_id))
        })
        .await?;

        Self::commit(ctx, tx, "update_comment", owner_id, comment_id).await?;
        Ok(comment)
    }

    pub async fn delete_comment(
        &self,
        ctx: &RequestContext,
        owner_id: &str,
        comment_id: Uuid,
    ) -> Result<()> {
        let mut tx = self.begin(ctx, "delete_comment", owner_id, comment_id).await?;

        let rows = self
            .run(ctx, "delete_comment", async {
                sqlx::query("DELETE FROM todo_comments WHERE id = ? AND owner_id = ?")
                    .bind(comment_id)
                    .bind(owner_id)
                    .execute(&mut *tx)
                    .await
                    .db_context("delete_comment", owner_id, comment_id)
            })
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::comment_not_found(comment_id));
        }

        Self::commit(ctx, tx, "delete_comment", owner_id, comment_id).await?;

        tracing::debug!("Deleted comment: {}", comment_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::create_test_repo;
    use super::*;
    use crate::database::models::CreateTodoPayload;

    fn ctx() -> RequestContext {
        RequestContext::background()
    }

    fn say(content: &str) -> AddCommentPayload {
        AddCommentPayload {
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn test_comments_listed_in_creation_order() {
        let repo = create_test_repo().await;
        let todo = repo
            .create_todo(&ctx(), "user-1", CreateTodoPayload::new("Discuss"))
            .await
            .unwrap();

        for content in ["first", "second", "third"] {
            repo.add_comment(&ctx(), "user-1", todo.id, say(content))
                .await
                .unwrap();
        }

        let contents: Vec<String> = repo
            .get_comments_by_todo_id(&ctx(), "user-1", todo.id)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.content)
            .collect();
        assert_eq!(contents, vec!["first", "second", "third"]);

        let populated = repo.get_todo_by_id(&ctx(), "user-1", todo.id).await.unwrap();
        assert_eq!(populated.comments.len(), 3);
        assert_eq!(populated.comments[0].content, "first");
    }

    #[tokio::test]
    async fn test_comment_on_missing_todo_is_store_error() {
        let repo = create_test_repo().await;

        let err = repo
            .add_comment(&ctx(), "user-1", Uuid::new_v4(), say("orphan"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Database { op: "add_comment", .. }));
    }

    #[tokio::test]
    async fn test_update_and_delete_comment() {
        let repo = create_test_repo().await;
        let todo = repo
            .create_todo(&ctx(), "user-1", CreateTodoPayload::new("Discuss"))
            .await
            .unwrap();
        let comment = repo
            .add_comment(&ctx(), "user-1", todo.id, say("draft"))
            .await
            .unwrap();

        let edited = repo
            .update_comment(
                &ctx(),
                "user-1",
                UpdateCommentPayload {
                    id: comment.id,
                    content: "final".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(edited.content, "final");

        assert!(repo
            .delete_comment(&ctx(), "user-2", comment.id)
            .await
            .unwrap_err()
            .is_not_found());
        repo.delete_comment(&ctx(), "user-1", comment.id).await.unwrap();
        assert!(repo
            .get_comment(&ctx(), "user-1", comment.id)
            .await
            .unwrap_err()
            .is_not_found());
    }
}
