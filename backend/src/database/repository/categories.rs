//! Category reads and writes

use super::Repository;
use crate::config::DEFAULT_CATEGORY_COLOR;
use crate::context::RequestContext;
use crate::database::models::{Category, CreateCategoryPayload, UpdateCategoryPayload};
use crate::error::{AppError, DbContext, Result};
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite};
use uuid::Uuid;

/// Names are unique per owner; surface a clash as a validation error.
fn map_unique_name(err: AppError, name: Option<&str>) -> AppError {
    let is_clash = matches!(
        &err,
        AppError::Database {
            source: sqlx::Error::Database(db),
            ..
        } if db.is_unique_violation()
    );

    if is_clash {
        AppError::validation(format!(
            "category name already exists: {}",
            name.unwrap_or_default()
        ))
    } else {
        err
    }
}

impl Repository {
    pub async fn create_category(
        &self,
        ctx: &RequestContext,
        owner_id: &str,
        payload: CreateCategoryPayload,
    ) -> Result<Category> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let color = payload
            .color
            .clone()
            .unwrap_or_else(|| DEFAULT_CATEGORY_COLOR.to_string());

        let mut tx = self.begin(ctx, "create_category", owner_id, id).await?;

        let category = self
            .run(ctx, "create_category", async {
                sqlx::query_as::<_, Category>(
                    r#"
                    INSERT INTO todo_categories (id, owner_id, name, color, description, created_at, updated_at)
                    VALUES (?, ?, ?, ?, ?, ?, ?)
                    RETURNING *
                    "#,
                )
                .bind(id)
                .bind(owner_id)
                .bind(&payload.name)
                .bind(&color)
                .bind(&payload.description)
                .bind(now)
                .bind(now)
                .fetch_one(&mut *tx)
                .await
                .db_context("create_category", owner_id, id)
            })
            .await
            .map_err(|e| map_unique_name(e, Some(&payload.name)))?;

        Self::commit(ctx, tx, "create_category", owner_id, id).await?;

        tracing::debug!("Created category: {} for owner: {}", category.id, owner_id);
        Ok(category)
    }

    pub async fn get_category(
        &self,
        ctx: &RequestContext,
        owner_id: &str,
        category_id: Uuid,
    ) -> Result<Category> {
        self.run(ctx, "get_category", async {
            sqlx::query_as::<_, Category>(
                "SELECT * FROM todo_categories WHERE id = ? AND owner_id = ?",
            )
            .bind(category_id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await
            .db_context("get_category", owner_id, category_id)?
            .ok_or_else(|| AppError::category_not_found(category_id))
        })
        .await
    }

    pub async fn list_categories(
        &self,
        ctx: &RequestContext,
        owner_id: &str,
    ) -> Result<Vec<Category>> {
        self.run(ctx, "list_categories", async {
            sqlx::query_as::<_, Category>(
                "SELECT * FROM todo_categories WHERE owner_id = ? ORDER BY name ASC",
            )
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await
            .db_context("list_categories", owner_id, "-")
        })
        .await
    }

    pub async fn update_category(
        &self,
        ctx: &RequestContext,
        owner_id: &str,
        payload: UpdateCategoryPayload,
    ) -> Result<Category> {
        if !payload.has_changes() {
            return Err(AppError::validation("no fields to update"));
        }

        let category_id = payload.id;
        let name = payload.name.clone();

        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE todo_categories SET updated_at = ");
        qb.push_bind(Utc::now());

        if let Some(name) = payload.name {
            qb.push(", name = ").push_bind(name);
        }

        if let Some(color) = payload.color {
            qb.push(", color = ").push_bind(color);
        }

        if let Some(description) = payload.description {
            qb.push(", description = ").push_bind(description);
        }

        qb.push(" WHERE id = ")
            .push_bind(category_id)
            .push(" AND owner_id = ")
            .push_bind(owner_id.to_string())
            .push(" RETURNING *");

        let mut tx = self.begin(ctx, "update_category", owner_id, category_id).await?;

        let category = self
            .run(ctx, "update_category", async {
                qb.build_query_as::<Category>()
                    .fetch_optional(&mut *tx)
                    .await
                    .db_context("update_category", owner_id, category_id)?
                    .ok_or_else(|| AppError::category_not_found(category_id))
            })
            .await
            .map_err(|e| map_unique_name(e, name.as_deref()))?;

        Self::commit(ctx, tx, "update_category", owner_id, category_id).await?;

        tracing::debug!("Updated category: {}", category.id);
        Ok(category)
    }

    /// Delete a category. Todos referencing it keep existing with no category.
    pub async fn delete_category(
        &self,
        ctx: &RequestContext,
        owner_id: &str,
        category_id: Uuid,
    ) -> Result<()> {
        let mut tx = self.begin(ctx, "delete_category", owner_id, category_id).await?;

        let rows = self
            .run(ctx, "delete_category", async {
                sqlx::query("DELETE FROM todo_categories WHERE id = ? AND owner_id = ?")
                    .bind(category_id)
                    .bind(owner_id)
                    .execute(&mut *tx)
                    .await
                    .db_context("delete_category", owner_id, category_id)
            })
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::category_not_found(category_id));
        }

        Self::commit(ctx, tx, "delete_category", owner_id, category_id).await?;

        tracing::debug!("Deleted category: {}", category_id);
        Ok(())
    }
}
