//! Categories service

use super::validate_name;
use crate::context::RequestContext;
use crate::database::{Category, CreateCategoryPayload, Repository, UpdateCategoryPayload};
use crate::error::{AppError, Result};
use uuid::Uuid;

/// Service for managing todo categories
#[derive(Clone)]
pub struct CategoryService {
    repo: Repository,
}

impl CategoryService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    pub async fn create_category(
        &self,
        ctx: &RequestContext,
        owner_id: &str,
        payload: CreateCategoryPayload,
    ) -> Result<Category> {
        validate_name("name", &payload.name)?;

        tracing::info!("Creating category for owner {}: {}", owner_id, payload.name);
        self.repo.create_category(ctx, owner_id, payload).await
    }

    pub async fn get_category(
        &self,
        ctx: &RequestContext,
        owner_id: &str,
        category_id: Uuid,
    ) -> Result<Category> {
        self.repo.get_category(ctx, owner_id, category_id).await
    }

    pub async fn list_categories(
        &self,
        ctx: &RequestContext,
        owner_id: &str,
    ) -> Result<Vec<Category>> {
        self.repo.list_categories(ctx, owner_id).await
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
        if let Some(name) = &payload.name {
            validate_name("name", name)?;
        }

        self.repo.update_category(ctx, owner_id, payload).await
    }

    /// Delete a category; its todos remain, uncategorized
    pub async fn delete_category(
        &self,
        ctx: &RequestContext,
        owner_id: &str,
        category_id: Uuid,
    ) -> Result<()> {
        tracing::info!("Deleting category: {}", category_id);
        self.repo.delete_category(ctx, owner_id, category_id).await
    }
}
