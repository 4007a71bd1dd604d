//! Todo reads and writes

use super::{populate, Repository};
use crate::context::RequestContext;
use crate::database::models::*;
use crate::database::query::TodoQueryPlan;
use crate::error::{AppError, DbContext, Result};
use chrono::Utc;
use sqlx::types::Json;
use sqlx::{QueryBuilder, Sqlite};
use uuid::Uuid;

const STATS_SQL: &str = r#"
    SELECT
        COUNT(*) AS total,
        COUNT(CASE WHEN status = 'draft' THEN 1 END) AS draft,
        COUNT(CASE WHEN status = 'active' THEN 1 END) AS active,
        COUNT(CASE WHEN status = 'completed' THEN 1 END) AS completed,
        COUNT(CASE WHEN status = 'archived' THEN 1 END) AS archived,
        COUNT(
            CASE
                WHEN due_date IS NOT NULL
                AND julianday(due_date) < julianday('now')
                AND status != 'completed' THEN 1
            END
        ) AS overdue
    FROM todos
    WHERE owner_id = ?
"#;

const PARENT_NOT_ROOT: &str =
    "parent must be another root todo of the same owner, and a todo with sub-todos cannot be nested";

impl Repository {
    /// Create a new todo. Status starts as draft and priority defaults to medium.
    ///
    /// A parent, when given, must be a root todo of the same owner at the
    /// moment of the insert.
    pub async fn create_todo(
        &self,
        ctx: &RequestContext,
        owner_id: &str,
        payload: CreateTodoPayload,
    ) -> Result<Todo> {
        const OP: &str = "create_todo";
        let id = Uuid::new_v4();
        let now = Utc::now();
        let priority = payload.priority.unwrap_or_default();

        let mut tx = self.begin(ctx, OP, owner_id, id).await?;

        let todo = self
            .run(ctx, OP, async {
                sqlx::query_as::<_, Todo>(
                    r#"
                    INSERT INTO todos (
                        id, owner_id, title, title_folded, description, description_folded,
                        status, priority, due_date, completed_at, parent_todo_id, category_id,
                        metadata, sort_order, created_at, updated_at
                    )
                    SELECT ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL, ?, ?, ?, ?, ?, ?
                    WHERE ? IS NULL OR EXISTS (
                        SELECT 1 FROM todos p
                        WHERE p.id = ? AND p.owner_id = ? AND p.parent_todo_id IS NULL
                    )
                    RETURNING *
                    "#,
                )
                .bind(id)
                .bind(owner_id)
                .bind(&payload.title)
                .bind(payload.title.to_lowercase())
                .bind(&payload.description)
                .bind(payload.description.as_deref().map(str::to_lowercase))
                .bind(TodoStatus::Draft)
                .bind(priority)
                .bind(payload.due_date)
                .bind(payload.parent_todo_id)
                .bind(payload.category_id)
                .bind(payload.metadata.clone().map(Json))
                .bind(payload.sort_order.unwrap_or(0))
                .bind(now)
                .bind(now)
                .bind(payload.parent_todo_id)
                .bind(payload.parent_todo_id)
                .bind(owner_id)
                .fetch_optional(&mut *tx)
                .await
                .db_context(OP, owner_id, id)?
                .ok_or_else(|| AppError::validation(PARENT_NOT_ROOT))
            })
            .await?;

        Self::commit(ctx, tx, OP, owner_id, id).await?;

        tracing::debug!("Created todo: {} for owner: {}", todo.id, owner_id);
        Ok(todo)
    }

    /// Get a todo with its category, children and comments
    pub async fn get_todo_by_id(
        &self,
        ctx: &RequestContext,
        owner_id: &str,
        todo_id: Uuid,
    ) -> Result<PopulatedTodo> {
        const OP: &str = "get_todo_by_id";

        self.run(ctx, OP, async {
            let mut tx = self.pool.begin().await.db_context(OP, owner_id, todo_id)?;

            let todo = sqlx::query_as::<_, Todo>("SELECT * FROM todos WHERE id = ? AND owner_id = ?")
                .bind(todo_id)
                .bind(owner_id)
                .fetch_optional(&mut *tx)
                .await
                .db_context(OP, owner_id, todo_id)?
                .ok_or_else(|| AppError::todo_not_found(todo_id))?;

            let populated = populate(&mut tx, OP, owner_id, vec![todo]).await?;
            tx.commit().await.db_context(OP, owner_id, todo_id)?;

            populated
                .into_iter()
                .next()
                .ok_or_else(|| AppError::todo_not_found(todo_id))
        })
        .await
    }

    /// Bare todo row, for ownership checks that don't need the joins
    pub async fn check_todo_exists(
        &self,
        ctx: &RequestContext,
        owner_id: &str,
        todo_id: Uuid,
    ) -> Result<Todo> {
        self.run(ctx, "check_todo_exists", async {
            sqlx::query_as::<_, Todo>("SELECT * FROM todos WHERE id = ? AND owner_id = ?")
                .bind(todo_id)
                .bind(owner_id)
                .fetch_optional(&self.pool)
                .await
                .db_context("check_todo_exists", owner_id, todo_id)?
                .ok_or_else(|| AppError::todo_not_found(todo_id))
        })
        .await
    }

    /// List one page of populated todos. An empty match is an empty page.
    pub async fn get_todos(
        &self,
        ctx: &RequestContext,
        owner_id: &str,
        query: &GetTodosQuery,
    ) -> Result<PaginatedResponse<PopulatedTodo>> {
        const OP: &str = "get_todos";

        let plan = TodoQueryPlan::from_query(owner_id, query)?;

        self.run(ctx, OP, async {
            let mut tx = self.pool.begin().await.db_context(OP, owner_id, "-")?;

            let mut count_query = plan.count_query();
            let total: i64 = count_query
                .build_query_scalar()
                .fetch_one(&mut *tx)
                .await
                .db_context(OP, owner_id, "-")?;

            if total == 0 {
                return Ok(PaginatedResponse::empty(plan.page, plan.limit));
            }

            let mut page_query = plan.page_query();
            let roots: Vec<Todo> = page_query
                .build_query_as()
                .fetch_all(&mut *tx)
                .await
                .db_context(OP, owner_id, "-")?;

            let data = populate(&mut tx, OP, owner_id, roots).await?;
            tx.commit().await.db_context(OP, owner_id, "-")?;

            Ok(PaginatedResponse::new(data, plan.page, plan.limit, total))
        })
        .await
    }

    /// Apply the present fields of `payload`.
    ///
    /// Setting status also sets or clears `completed_at` in the same write.
    /// Moving a todo under a parent only succeeds if, at the moment of the
    /// write, the todo has no children and the parent is another root todo
    /// of the same owner.
    pub async fn update_todo(
        &self,
        ctx: &RequestContext,
        owner_id: &str,
        payload: UpdateTodoPayload,
    ) -> Result<Todo> {
        const OP: &str = "update_todo";

        if !payload.has_changes() {
            return Err(AppError::validation("no fields to update"));
        }

        let todo_id = payload.id;
        let new_parent = payload.parent_todo_id;
        let now = Utc::now();

        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE todos SET updated_at = ");
        qb.push_bind(now);

        if let Some(title) = payload.title {
            qb.push(", title_folded = ").push_bind(title.to_lowercase());
            qb.push(", title = ").push_bind(title);
        }

        if let Some(description) = payload.description {
            qb.push(", description_folded = ")
                .push_bind(description.to_lowercase());
            qb.push(", description = ").push_bind(description);
        }

        if let Some(status) = payload.status {
            qb.push(", status = ").push_bind(status);
            if status == TodoStatus::Completed {
                qb.push(", completed_at = ").push_bind(now);
            } else {
                qb.push(", completed_at = NULL");
            }
        }

        if let Some(priority) = payload.priority {
            qb.push(", priority = ").push_bind(priority);
        }

        if let Some(due_date) = payload.due_date {
            qb.push(", due_date = ").push_bind(due_date);
        }

        if let Some(parent_todo_id) = new_parent {
            qb.push(", parent_todo_id = ").push_bind(parent_todo_id);
        }

        if let Some(category_id) = payload.category_id {
            qb.push(", category_id = ").push_bind(category_id);
        }

        if let Some(metadata) = payload.metadata {
            qb.push(", metadata = ").push_bind(Json(metadata));
        }

        if let Some(sort_order) = payload.sort_order {
            qb.push(", sort_order = ").push_bind(sort_order);
        }

        qb.push(" WHERE id = ")
            .push_bind(todo_id)
            .push(" AND owner_id = ")
            .push_bind(owner_id.to_string());

        if let Some(parent_todo_id) = new_parent {
            qb.push(
                " AND NOT EXISTS (SELECT 1 FROM todos c WHERE c.parent_todo_id = todos.id) \
                 AND EXISTS (SELECT 1 FROM todos p WHERE p.id = ",
            )
            .push_bind(parent_todo_id)
            .push(" AND p.owner_id = ")
            .push_bind(owner_id.to_string())
            .push(" AND p.parent_todo_id IS NULL AND p.id != todos.id)");
        }

        qb.push(" RETURNING *");

        let mut tx = self.begin(ctx, OP, owner_id, todo_id).await?;

        let todo = self
            .run(ctx, OP, async {
                let updated = qb
                    .build_query_as::<Todo>()
                    .fetch_optional(&mut *tx)
                    .await
                    .db_context(OP, owner_id, todo_id)?;

                match updated {
                    Some(todo) => Ok(todo),
                    None if new_parent.is_some() => {
                        // Tell a rejected move apart from a missing todo
                        let exists: i64 = sqlx::query_scalar(
                            "SELECT COUNT(*) FROM todos WHERE id = ? AND owner_id = ?",
                        )
                        .bind(todo_id)
                        .bind(owner_id)
                        .fetch_one(&mut *tx)
                        .await
                        .db_context(OP, owner_id, todo_id)?;

                        if exists > 0 {
                            Err(AppError::validation(PARENT_NOT_ROOT))
                        } else {
                            Err(AppError::todo_not_found(todo_id))
                        }
                    }
                    None => Err(AppError::todo_not_found(todo_id)),
                }
            })
            .await?;

        Self::commit(ctx, tx, OP, owner_id, todo_id).await?;

        tracing::debug!("Updated todo: {}", todo.id);
        Ok(todo)
    }

    /// Hard delete. Children and comments go with it (ON DELETE CASCADE).
    pub async fn delete_todo(
        &self,
        ctx: &RequestContext,
        owner_id: &str,
        todo_id: Uuid,
    ) -> Result<()> {
        const OP: &str = "delete_todo";

        let mut tx = self.begin(ctx, OP, owner_id, todo_id).await?;

        let rows = self
            .run(ctx, OP, async {
                sqlx::query("DELETE FROM todos WHERE id = ? AND owner_id = ?")
                    .bind(todo_id)
                    .bind(owner_id)
                    .execute(&mut *tx)
                    .await
                    .db_context(OP, owner_id, todo_id)
            })
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::todo_not_found(todo_id));
        }

        Self::commit(ctx, tx, OP, owner_id, todo_id).await?;

        tracing::debug!("Deleted todo: {}", todo_id);
        Ok(())
    }

    /// Per-status and overdue counts for every todo of an owner
    pub async fn get_todo_stats(&self, ctx: &RequestContext, owner_id: &str) -> Result<TodoStats> {
        self.run(ctx, "get_todo_stats", async {
            sqlx::query_as::<_, TodoStats>(STATS_SQL)
                .bind(owner_id)
                .fetch_one(&self.pool)
                .await
                .db_context("get_todo_stats", owner_id, "-")
        })
        .await
    }
}
