//! Todos service
//!
//! Business rules on top of the repository: title limits, and that parent
//! and category references resolve to rows the caller owns. Todos nest one
//! level deep, so a parent must itself be a root todo. The repository
//! enforces the nesting rule again inside the write; the checks here pick
//! the NotFound or Validation error a caller sees.

use super::validate_name;
use crate::context::RequestContext;
use crate::database::{
    CreateTodoPayload, GetTodosQuery, PaginatedResponse, PopulatedTodo, Repository, Todo,
    TodoStats, UpdateTodoPayload,
};
use crate::error::{AppError, Result};
use uuid::Uuid;

/// Service for managing todos
#[derive(Clone)]
pub struct TodoService {
    repo: Repository,
}

impl TodoService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Create a new todo
    pub async fn create_todo(
        &self,
        ctx: &RequestContext,
        owner_id: &str,
        payload: CreateTodoPayload,
    ) -> Result<Todo> {
        validate_name("title", &payload.title)?;

        if let Some(parent_id) = payload.parent_todo_id {
            self.ensure_valid_parent(ctx, owner_id, parent_id).await?;
        }

        if let Some(category_id) = payload.category_id {
            self.repo.get_category(ctx, owner_id, category_id).await?;
        }

        tracing::info!("Creating todo for owner {}: {}", owner_id, payload.title);

        let todo = self.repo.create_todo(ctx, owner_id, payload).await?;

        tracing::info!("Todo created successfully: {}", todo.id);

        Ok(todo)
    }

    /// Get a todo with category, children and comments
    pub async fn get_todo_by_id(
        &self,
        ctx: &RequestContext,
        owner_id: &str,
        todo_id: Uuid,
    ) -> Result<PopulatedTodo> {
        self.repo.get_todo_by_id(ctx, owner_id, todo_id).await
    }

    pub async fn check_todo_exists(
        &self,
        ctx: &RequestContext,
        owner_id: &str,
        todo_id: Uuid,
    ) -> Result<Todo> {
        self.repo.check_todo_exists(ctx, owner_id, todo_id).await
    }

    /// List todos matching `query`
    pub async fn get_todos(
        &self,
        ctx: &RequestContext,
        owner_id: &str,
        query: &GetTodosQuery,
    ) -> Result<PaginatedResponse<PopulatedTodo>> {
        let page = self.repo.get_todos(ctx, owner_id, query).await?;

        tracing::debug!(
            "Listed {} of {} todos for owner {} (page {}/{})",
            page.data.len(),
            page.total,
            owner_id,
            page.page,
            page.total_pages
        );

        Ok(page)
    }

    /// Update a todo
    pub async fn update_todo(
        &self,
        ctx: &RequestContext,
        owner_id: &str,
        payload: UpdateTodoPayload,
    ) -> Result<Todo> {
        if !payload.has_changes() {
            return Err(AppError::validation("no fields to update"));
        }

        if let Some(title) = &payload.title {
            validate_name("title", title)?;
        }

        if let Some(parent_id) = payload.parent_todo_id {
            if parent_id == payload.id {
                return Err(AppError::validation("a todo cannot be its own parent"));
            }
            self.ensure_valid_parent(ctx, owner_id, parent_id).await?;
        }

        if let Some(category_id) = payload.category_id {
            self.repo.get_category(ctx, owner_id, category_id).await?;
        }

        tracing::debug!("Updating todo: {}", payload.id);

        let todo = self.repo.update_todo(ctx, owner_id, payload).await?;

        tracing::debug!("Todo updated successfully: {}", todo.id);

        Ok(todo)
    }

    /// Delete a todo together with its sub-todos and comments
    pub async fn delete_todo(
        &self,
        ctx: &RequestContext,
        owner_id: &str,
        todo_id: Uuid,
    ) -> Result<()> {
        tracing::info!("Deleting todo: {}", todo_id);

        self.repo.delete_todo(ctx, owner_id, todo_id).await?;

        tracing::info!("Todo deleted successfully: {}", todo_id);

        Ok(())
    }

    pub async fn get_todo_stats(&self, ctx: &RequestContext, owner_id: &str) -> Result<TodoStats> {
        self.repo.get_todo_stats(ctx, owner_id).await
    }

    async fn ensure_valid_parent(
        &self,
        ctx: &RequestContext,
        owner_id: &str,
        parent_id: Uuid,
    ) -> Result<()> {
        let parent = self.repo.check_todo_exists(ctx, owner_id, parent_id).await?;
        if !parent.is_root() {
            return Err(AppError::validation(
                "sub-todos cannot have sub-todos of their own",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DatabaseConfig, MAX_TITLE_LENGTH};
    use crate::database::{create_pool, CreateCategoryPayload, TodoStatus};
    use crate::error::ErrorKind;

    async fn create_test_service() -> (TodoService, Repository) {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        let repo = Repository::new(pool);
        (TodoService::new(repo.clone()), repo)
    }

    fn ctx() -> RequestContext {
        RequestContext::background()
    }

    #[tokio::test]
    async fn test_create_and_get_todo() {
        let (service, _) = create_test_service().await;

        let todo = service
            .create_todo(&ctx(), "user-1", CreateTodoPayload::new("Test"))
            .await
            .unwrap();

        let fetched = service.get_todo_by_id(&ctx(), "user-1", todo.id).await.unwrap();

        assert_eq!(fetched.todo.id, todo.id);
        assert_eq!(fetched.todo.title, "Test");
    }

    #[tokio::test]
    async fn test_rejects_blank_and_long_titles() {
        let (service, _) = create_test_service().await;

        for title in ["".to_string(), "   ".to_string(), "x".repeat(MAX_TITLE_LENGTH + 1)] {
            let err = service
                .create_todo(&ctx(), "user-1", CreateTodoPayload::new(title))
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
    }

    #[tokio::test]
    async fn test_parent_must_be_owned_root() {
        let (service, _) = create_test_service().await;
        let root = service
            .create_todo(&ctx(), "user-1", CreateTodoPayload::new("Root"))
            .await
            .unwrap();
        let child = service
            .create_todo(
                &ctx(),
                "user-1",
                CreateTodoPayload {
                    parent_todo_id: Some(root.id),
                    ..CreateTodoPayload::new("Child")
                },
            )
            .await
            .unwrap();

        let err = service
            .create_todo(
                &ctx(),
                "user-1",
                CreateTodoPayload {
                    parent_todo_id: Some(child.id),
                    ..CreateTodoPayload::new("Grandchild")
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = service
            .create_todo(
                &ctx(),
                "user-2",
                CreateTodoPayload {
                    parent_todo_id: Some(root.id),
                    ..CreateTodoPayload::new("Intruder")
                },
            )
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_todo_with_children_cannot_be_reparented() {
        let (service, _) = create_test_service().await;
        let a = service
            .create_todo(&ctx(), "user-1", CreateTodoPayload::new("A"))
            .await
            .unwrap();
        let b = service
            .create_todo(&ctx(), "user-1", CreateTodoPayload::new("B"))
            .await
            .unwrap();
        service
            .create_todo(
                &ctx(),
                "user-1",
                CreateTodoPayload {
                    parent_todo_id: Some(a.id),
                    ..CreateTodoPayload::new("A.1")
                },
            )
            .await
            .unwrap();

        let err = service
            .update_todo(
                &ctx(),
                "user-1",
                UpdateTodoPayload {
                    parent_todo_id: Some(b.id),
                    ..UpdateTodoPayload::new(a.id)
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = service
            .update_todo(
                &ctx(),
                "user-1",
                UpdateTodoPayload {
                    parent_todo_id: Some(b.id),
                    ..UpdateTodoPayload::new(b.id)
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_category_must_be_owned() {
        let (service, repo) = create_test_service().await;
        let foreign = repo
            .create_category(
                &ctx(),
                "user-2",
                CreateCategoryPayload {
                    name: "Theirs".to_string(),
                    ..CreateCategoryPayload::default()
                },
            )
            .await
            .unwrap();

        let err = service
            .create_todo(
                &ctx(),
                "user-1",
                CreateTodoPayload {
                    category_id: Some(foreign.id),
                    ..CreateTodoPayload::new("Mine")
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "CATEGORY_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_empty_update_rejected_before_lookup() {
        let (service, _) = create_test_service().await;

        let err = service
            .update_todo(&ctx(), "user-1", UpdateTodoPayload::new(Uuid::new_v4()))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_complete_then_archive() {
        let (service, _) = create_test_service().await;
        let todo = service
            .create_todo(&ctx(), "user-1", CreateTodoPayload::new("Ship it"))
            .await
            .unwrap();

        for (status, expect_completed_at) in [
            (TodoStatus::Active, false),
            (TodoStatus::Completed, true),
            (TodoStatus::Archived, false),
        ] {
            let updated = service
                .update_todo(
                    &ctx(),
                    "user-1",
                    UpdateTodoPayload {
                        status: Some(status),
                        ..UpdateTodoPayload::new(todo.id)
                    },
                )
                .await
                .unwrap();
            assert_eq!(updated.status, status);
            assert_eq!(updated.completed_at.is_some(), expect_completed_at);
        }
    }
}
