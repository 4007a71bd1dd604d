//! Repository layer for database operations
//!
//! Every operation is scoped by owner, runs inside a [`RequestContext`]
//! and is a single logical interaction with the store. Multi-statement
//! reads share one transaction so they see one snapshot. Writes always run
//! in a transaction that is only committed while the context is still
//! live, so a cancelled or expired call never leaves a mutation behind.

mod categories;
mod comments;
mod todos;

use super::models::{Category, Comment, PopulatedTodo, Todo};
use crate::config::{ObservabilityConfig, DEFAULT_SLOW_QUERY_THRESHOLD_MS};
use crate::context::RequestContext;
use crate::error::{DbContext, Result};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::collections::HashMap;
use std::future::Future;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
    slow_query_threshold: Duration,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            slow_query_threshold: Duration::from_millis(DEFAULT_SLOW_QUERY_THRESHOLD_MS),
        }
    }

    /// Repository using the configured slow-operation threshold
    pub fn from_config(pool: SqlitePool, config: &ObservabilityConfig) -> Self {
        Self::new(pool).with_slow_query_threshold(config.slow_query_threshold())
    }

    pub fn with_slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.slow_query_threshold = threshold;
        self
    }

    pub fn slow_query_threshold(&self) -> Duration {
        self.slow_query_threshold
    }

    /// Open a write transaction under `ctx`.
    async fn begin(
        &self,
        ctx: &RequestContext,
        op: &'static str,
        owner_id: &str,
        entity_id: impl ToString,
    ) -> Result<Transaction<'static, Sqlite>> {
        self.run(ctx, op, async {
            self.pool.begin().await.db_context(op, owner_id, entity_id)
        })
        .await
    }

    /// Commit `tx` as the last step of a write.
    ///
    /// If `ctx` finished while the statements ran, `tx` is dropped instead,
    /// which rolls it back.
    async fn commit(
        ctx: &RequestContext,
        tx: Transaction<'static, Sqlite>,
        op: &'static str,
        owner_id: &str,
        entity_id: impl ToString,
    ) -> Result<()> {
        ctx.check(op)?;
        tx.commit().await.db_context(op, owner_id, entity_id)
    }

    /// Run one store interaction under `ctx`, warning when it is slow.
    async fn run<F, T>(&self, ctx: &RequestContext, op: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let started = Instant::now();
        let result = ctx.run(op, fut).await;
        let elapsed = started.elapsed();

        if elapsed > self.slow_query_threshold {
            tracing::warn!(
                op,
                elapsed_ms = elapsed.as_millis() as u64,
                "Slow database operation"
            );
        }

        result
    }
}

/// Append `(?, ?, ...)` binding every id.
fn push_id_list(qb: &mut QueryBuilder<'static, Sqlite>, ids: &[Uuid]) {
    qb.push("(");
    let mut list = qb.separated(", ");
    for id in ids {
        list.push_bind(*id);
    }
    list.push_unseparated(")");
}

/// Attach category, children and comments to each root row.
///
/// Three keyed queries regardless of how many roots there are; row order
/// of `roots` is preserved.
async fn populate(
    conn: &mut SqliteConnection,
    op: &'static str,
    owner_id: &str,
    roots: Vec<Todo>,
) -> Result<Vec<PopulatedTodo>> {
    if roots.is_empty() {
        return Ok(Vec::new());
    }

    let root_ids: Vec<Uuid> = roots.iter().map(|t| t.id).collect();
    let entity = if root_ids.len() == 1 {
        root_ids[0].to_string()
    } else {
        format!("{} todos", root_ids.len())
    };

    let mut category_ids: Vec<Uuid> = roots.iter().filter_map(|t| t.category_id).collect();
    category_ids.sort_unstable();
    category_ids.dedup();

    let mut categories: HashMap<Uuid, Category> = HashMap::new();
    if !category_ids.is_empty() {
        let mut qb = QueryBuilder::new("SELECT * FROM todo_categories WHERE owner_id = ");
        qb.push_bind(owner_id.to_string()).push(" AND id IN ");
        push_id_list(&mut qb, &category_ids);

        let rows: Vec<Category> = qb
            .build_query_as()
            .fetch_all(&mut *conn)
            .await
            .db_context(op, owner_id, &entity)?;
        categories = rows.into_iter().map(|c| (c.id, c)).collect();
    }

    let mut qb = QueryBuilder::new("SELECT * FROM todos WHERE owner_id = ");
    qb.push_bind(owner_id.to_string())
        .push(" AND parent_todo_id IN ");
    push_id_list(&mut qb, &root_ids);
    qb.push(" ORDER BY sort_order ASC, created_at ASC, id ASC");

    let child_rows: Vec<Todo> = qb
        .build_query_as()
        .fetch_all(&mut *conn)
        .await
        .db_context(op, owner_id, &entity)?;

    let mut children: HashMap<Uuid, Vec<Todo>> = HashMap::new();
    for child in child_rows {
        if let Some(parent_id) = child.parent_todo_id {
            children.entry(parent_id).or_default().push(child);
        }
    }

    let mut qb = QueryBuilder::new("SELECT * FROM todo_comments WHERE owner_id = ");
    qb.push_bind(owner_id.to_string()).push(" AND todo_id IN ");
    push_id_list(&mut qb, &root_ids);
    qb.push(" ORDER BY created_at ASC, id ASC");

    let comment_rows: Vec<Comment> = qb
        .build_query_as()
        .fetch_all(&mut *conn)
        .await
        .db_context(op, owner_id, &entity)?;

    let mut comments: HashMap<Uuid, Vec<Comment>> = HashMap::new();
    for comment in comment_rows {
        comments.entry(comment.todo_id).or_default().push(comment);
    }

    Ok(roots
        .into_iter()
        .map(|todo| {
            // A dangling or foreign category reference degrades to None
            let category = todo.category_id.and_then(|id| categories.get(&id).cloned());
            PopulatedTodo {
                category,
                children: children.remove(&todo.id).unwrap_or_default(),
                comments: comments.remove(&todo.id).unwrap_or_default(),
                todo,
            }
        })
        .collect())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::Repository;
    use crate::config::DatabaseConfig;
    use crate::database::create_pool;

    pub async fn create_test_repo() -> Repository {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        Repository::new(pool)
    }
}
