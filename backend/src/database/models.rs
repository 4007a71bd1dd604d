//! Database models
//!
//! Rust structs representing database entities, request payloads and
//! composed read views. All models use serde so the boundary layer can
//! hand them straight to clients.

use crate::config::DEFAULT_PAGE_LIMIT;
use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum TodoStatus {
    #[default]
    Draft,
    Active,
    Completed,
    Archived,
}

impl TodoStatus {
    pub const ALL: [TodoStatus; 4] = [
        TodoStatus::Draft,
        TodoStatus::Active,
        TodoStatus::Completed,
        TodoStatus::Archived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TodoStatus::Draft => "draft",
            TodoStatus::Active => "active",
            TodoStatus::Completed => "completed",
            TodoStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for TodoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TodoStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TodoStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| AppError::validation(format!("invalid status: {}", s)))
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum TodoPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TodoPriority {
    pub const ALL: [TodoPriority; 3] = [TodoPriority::Low, TodoPriority::Medium, TodoPriority::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            TodoPriority::Low => "low",
            TodoPriority::Medium => "medium",
            TodoPriority::High => "high",
        }
    }
}

impl fmt::Display for TodoPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TodoPriority {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TodoPriority::ALL
            .into_iter()
            .find(|priority| priority.as_str() == s)
            .ok_or_else(|| AppError::validation(format!("invalid priority: {}", s)))
    }
}

/// Free-form data attached to a todo, stored as JSON
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoMetadata {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder: Option<String>,
}

/// A todo row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Todo {
    pub id: Uuid,
    pub owner_id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: TodoStatus,
    pub priority: TodoPriority,
    pub due_date: Option<DateTime<Utc>>,
    /// Present exactly when `status` is completed
    pub completed_at: Option<DateTime<Utc>>,
    pub parent_todo_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub metadata: Option<Json<TodoMetadata>>,
    pub sort_order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Todo {
    pub fn is_root(&self) -> bool {
        self.parent_todo_id.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: Uuid,
    pub owner_id: String,
    pub name: String,
    pub color: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub todo_id: Uuid,
    pub owner_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A todo with its category, direct children and comments.
///
/// Assembled per query; never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulatedTodo {
    #[serde(flatten)]
    pub todo: Todo,
    pub category: Option<Category>,
    /// Ordered by `sort_order`, then `created_at`
    pub children: Vec<Todo>,
    /// Ordered by `created_at`
    pub comments: Vec<Comment>,
}

impl PopulatedTodo {
    pub fn new(todo: Todo) -> Self {
        Self {
            todo,
            category: None,
            children: Vec::new(),
            comments: Vec::new(),
        }
    }
}

/// Per-owner counts, computed on demand
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct TodoStats {
    pub total: i64,
    pub draft: i64,
    pub active: i64,
    pub completed: i64,
    pub archived: i64,
    pub overdue: i64,
}

impl TodoStats {
    pub fn count_for(&self, status: TodoStatus) -> i64 {
        match status {
            TodoStatus::Draft => self.draft,
            TodoStatus::Active => self.active,
            TodoStatus::Completed => self.completed,
            TodoStatus::Archived => self.archived,
        }
    }
}

/// Create todo request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateTodoPayload {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<TodoPriority>,
    pub due_date: Option<DateTime<Utc>>,
    pub parent_todo_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub metadata: Option<TodoMetadata>,
    pub sort_order: Option<i64>,
}

impl CreateTodoPayload {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Update todo request. Only present fields are written.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTodoPayload {
    pub id: Uuid,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TodoStatus>,
    pub priority: Option<TodoPriority>,
    pub due_date: Option<DateTime<Utc>>,
    pub parent_todo_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub metadata: Option<TodoMetadata>,
    pub sort_order: Option<i64>,
}

impl UpdateTodoPayload {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    pub fn has_changes(&self) -> bool {
        self.title.is_some()
            || self.description.is_some()
            || self.status.is_some()
            || self.priority.is_some()
            || self.due_date.is_some()
            || self.parent_todo_id.is_some()
            || self.category_id.is_some()
            || self.metadata.is_some()
            || self.sort_order.is_some()
    }
}

/// Columns a listing may be ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    CreatedAt,
    UpdatedAt,
    Title,
    Priority,
    DueDate,
    Status,
}

impl SortField {
    pub const ALL: [SortField; 6] = [
        SortField::CreatedAt,
        SortField::UpdatedAt,
        SortField::Title,
        SortField::Priority,
        SortField::DueDate,
        SortField::Status,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
            SortField::Title => "title",
            SortField::Priority => "priority",
            SortField::DueDate => "due_date",
            SortField::Status => "status",
        }
    }
}

impl FromStr for SortField {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortField::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| AppError::validation(format!("invalid sort field: {}", s)))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortOrder {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(AppError::validation(format!("invalid sort order: {}", other))),
        }
    }
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    DEFAULT_PAGE_LIMIT
}

/// Listing request: pagination plus optional filters and sort
#[derive(Debug, Clone, Deserialize)]
pub struct GetTodosQuery {
    /// 1-indexed
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    pub status: Option<TodoStatus>,
    pub priority: Option<TodoPriority>,
    pub category_id: Option<Uuid>,
    /// When absent only root todos are listed
    pub parent_todo_id: Option<Uuid>,
    pub due_from: Option<DateTime<Utc>>,
    pub due_to: Option<DateTime<Utc>>,
    pub overdue: Option<bool>,
    pub completed: Option<bool>,
    pub search: Option<String>,
    pub sort: Option<SortField>,
    pub order: Option<SortOrder>,
}

impl Default for GetTodosQuery {
    fn default() -> Self {
        Self::paged(default_page(), default_limit())
    }
}

impl GetTodosQuery {
    pub fn paged(page: u32, limit: u32) -> Self {
        Self {
            page,
            limit,
            status: None,
            priority: None,
            category_id: None,
            parent_todo_id: None,
            due_from: None,
            due_to: None,
            overdue: None,
            completed: None,
            search: None,
            sort: None,
            order: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub total_pages: i64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, page: u32, limit: u32, total: i64) -> Self {
        let limit_i = i64::from(limit.max(1));
        Self {
            data,
            page,
            limit,
            total,
            total_pages: (total + limit_i - 1) / limit_i,
        }
    }

    pub fn empty(page: u32, limit: u32) -> Self {
        Self::new(Vec::new(), page, limit, 0)
    }
}

/// Create category request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateCategoryPayload {
    pub name: String,
    pub color: Option<String>,
    pub description: Option<String>,
}

/// Update category request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCategoryPayload {
    pub id: Uuid,
    pub name: Option<String>,
    pub color: Option<String>,
    pub description: Option<String>,
}

impl UpdateCategoryPayload {
    pub fn has_changes(&self) -> bool {
        self.name.is_some() || self.color.is_some() || self.description.is_some()
    }
}

/// Add comment request
#[derive(Debug, Clone, Deserialize)]
pub struct AddCommentPayload {
    pub content: String,
}

/// Update comment request
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCommentPayload {
    pub id: Uuid,
    pub content: String,
}
