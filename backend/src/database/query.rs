//! Listing query construction
//!
//! Turns a [`GetTodosQuery`] into an ordered list of typed filters plus
//! sort and pagination, then renders them into `sqlx::QueryBuilder`s.
//! Caller-supplied values only ever reach SQL through `push_bind`; every
//! fixed fragment comes from the translation tables below.

use super::models::{GetTodosQuery, SortField, SortOrder, TodoPriority, TodoStatus};
use crate::config::MAX_PAGE_LIMIT;
use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite};
use uuid::Uuid;

/// One constraint of a listing query together with its bound value.
#[derive(Debug, Clone, PartialEq)]
pub enum TodoFilter {
    Owner(String),
    Status(TodoStatus),
    Priority(TodoPriority),
    Category(Uuid),
    Parent(Uuid),
    /// Applied when no parent is requested
    RootOnly,
    DueFrom(DateTime<Utc>),
    DueTo(DateTime<Utc>),
    Overdue,
    Completed,
    NotCompleted,
    /// Already lowercased, escaped and wrapped in `%`. Matched against the
    /// lowercased title and description columns, so case is ignored for
    /// any script and not only ASCII.
    Search(String),
}

impl TodoFilter {
    fn push_sql(&self, qb: &mut QueryBuilder<'static, Sqlite>) {
        match self {
            TodoFilter::Owner(owner_id) => {
                qb.push("t.owner_id = ").push_bind(owner_id.clone());
            }
            TodoFilter::Status(status) => {
                qb.push("t.status = ").push_bind(*status);
            }
            TodoFilter::Priority(priority) => {
                qb.push("t.priority = ").push_bind(*priority);
            }
            TodoFilter::Category(category_id) => {
                qb.push("t.category_id = ").push_bind(*category_id);
            }
            TodoFilter::Parent(parent_id) => {
                qb.push("t.parent_todo_id = ").push_bind(*parent_id);
            }
            TodoFilter::RootOnly => {
                qb.push("t.parent_todo_id IS NULL");
            }
            TodoFilter::DueFrom(from) => {
                qb.push("julianday(t.due_date) >= julianday(")
                    .push_bind(*from)
                    .push(")");
            }
            TodoFilter::DueTo(to) => {
                qb.push("julianday(t.due_date) <= julianday(")
                    .push_bind(*to)
                    .push(")");
            }
            TodoFilter::Overdue => {
                qb.push(
                    "(t.due_date IS NOT NULL AND julianday(t.due_date) < julianday('now') \
                     AND t.status != 'completed')",
                );
            }
            TodoFilter::Completed => {
                qb.push("t.status = 'completed'");
            }
            TodoFilter::NotCompleted => {
                qb.push("t.status != 'completed'");
            }
            TodoFilter::Search(pattern) => {
                qb.push("(t.title_folded LIKE ")
                    .push_bind(pattern.clone())
                    .push(" ESCAPE '\\' OR t.description_folded LIKE ")
                    .push_bind(pattern.clone())
                    .push(" ESCAPE '\\')");
            }
        }
    }
}

/// Escape LIKE wildcards in `term` and wrap it for a substring match.
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn sort_expression(field: SortField) -> &'static str {
    match field {
        SortField::CreatedAt => "t.created_at",
        SortField::UpdatedAt => "t.updated_at",
        SortField::Title => "t.title",
        SortField::Priority => {
            "CASE t.priority WHEN 'low' THEN 0 WHEN 'medium' THEN 1 WHEN 'high' THEN 2 END"
        }
        SortField::DueDate => "t.due_date",
        SortField::Status => {
            "CASE t.status WHEN 'draft' THEN 0 WHEN 'active' THEN 1 \
             WHEN 'completed' THEN 2 WHEN 'archived' THEN 3 END"
        }
    }
}

fn direction(order: SortOrder) -> &'static str {
    match order {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    }
}

/// Validated, store-independent form of a listing request
#[derive(Debug, Clone, PartialEq)]
pub struct TodoQueryPlan {
    pub filters: Vec<TodoFilter>,
    pub sort: SortField,
    pub order: SortOrder,
    pub page: u32,
    pub limit: u32,
}

impl TodoQueryPlan {
    pub fn from_query(owner_id: &str, query: &GetTodosQuery) -> Result<Self> {
        if query.page == 0 {
            return Err(AppError::validation("page must be at least 1"));
        }
        if query.limit == 0 {
            return Err(AppError::validation("limit must be at least 1"));
        }
        if query.limit > MAX_PAGE_LIMIT {
            return Err(AppError::validation(format!(
                "limit must not exceed {}",
                MAX_PAGE_LIMIT
            )));
        }

        let mut filters = vec![TodoFilter::Owner(owner_id.to_string())];

        if let Some(status) = query.status {
            filters.push(TodoFilter::Status(status));
        }

        if let Some(priority) = query.priority {
            filters.push(TodoFilter::Priority(priority));
        }

        if let Some(category_id) = query.category_id {
            filters.push(TodoFilter::Category(category_id));
        }

        match query.parent_todo_id {
            Some(parent_id) => filters.push(TodoFilter::Parent(parent_id)),
            None => filters.push(TodoFilter::RootOnly),
        }

        if let Some(from) = query.due_from {
            filters.push(TodoFilter::DueFrom(from));
        }

        if let Some(to) = query.due_to {
            filters.push(TodoFilter::DueTo(to));
        }

        if query.overdue == Some(true) {
            filters.push(TodoFilter::Overdue);
        }

        match query.completed {
            Some(true) => filters.push(TodoFilter::Completed),
            Some(false) => filters.push(TodoFilter::NotCompleted),
            None => {}
        }

        if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
            filters.push(TodoFilter::Search(like_pattern(&search.to_lowercase())));
        }

        // No explicit field means newest first, whatever the order says.
        let (sort, order) = match query.sort {
            Some(field) => (field, query.order.unwrap_or_default()),
            None => (SortField::CreatedAt, SortOrder::Desc),
        };

        Ok(Self {
            filters,
            sort,
            order,
            page: query.page,
            limit: query.limit,
        })
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.limit)
    }

    fn push_where(&self, qb: &mut QueryBuilder<'static, Sqlite>) {
        for (i, filter) in self.filters.iter().enumerate() {
            qb.push(if i == 0 { " WHERE " } else { " AND " });
            filter.push_sql(qb);
        }
    }

    /// Total matching rows, ignoring pagination.
    pub fn count_query(&self) -> QueryBuilder<'static, Sqlite> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM todos t");
        self.push_where(&mut qb);
        qb
    }

    /// One page of matching root rows.
    pub fn page_query(&self) -> QueryBuilder<'static, Sqlite> {
        let mut qb = QueryBuilder::new("SELECT t.* FROM todos t");
        self.push_where(&mut qb);

        let dir = direction(self.order);
        qb.push(" ORDER BY ")
            .push(sort_expression(self.sort))
            .push(" ")
            .push(dir)
            .push(", t.id ")
            .push(dir);

        qb.push(" LIMIT ")
            .push_bind(i64::from(self.limit))
            .push(" OFFSET ")
            .push_bind(self.offset());
        qb
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(query: &GetTodosQuery) -> TodoQueryPlan {
        TodoQueryPlan::from_query("user-1", query).unwrap()
    }

    #[test]
    fn test_defaults_to_root_todos_newest_first() {
        let plan = plan(&GetTodosQuery::paged(1, 20));
        assert_eq!(
            plan.filters,
            vec![TodoFilter::Owner("user-1".to_string()), TodoFilter::RootOnly]
        );
        assert_eq!(plan.sort, SortField::CreatedAt);
        assert_eq!(plan.order, SortOrder::Desc);

        let sql = plan.page_query().into_sql();
        assert!(sql.contains("t.parent_todo_id IS NULL"));
        assert!(sql.contains("ORDER BY t.created_at DESC, t.id DESC"));
    }

    #[test]
    fn test_explicit_parent_replaces_root_filter() {
        let parent = Uuid::new_v4();
        let query = GetTodosQuery {
            parent_todo_id: Some(parent),
            ..GetTodosQuery::paged(1, 20)
        };
        let plan = plan(&query);
        assert!(plan.filters.contains(&TodoFilter::Parent(parent)));
        assert!(!plan.filters.contains(&TodoFilter::RootOnly));
    }

    #[test]
    fn test_explicit_sort_defaults_ascending() {
        let query = GetTodosQuery {
            sort: Some(SortField::Title),
            ..GetTodosQuery::paged(1, 20)
        };
        let sql = plan(&query).page_query().into_sql();
        assert!(sql.contains("ORDER BY t.title ASC, t.id ASC"));

        let query = GetTodosQuery {
            sort: Some(SortField::Priority),
            order: Some(SortOrder::Desc),
            ..GetTodosQuery::paged(1, 20)
        };
        let sql = plan(&query).page_query().into_sql();
        assert!(sql.contains("WHEN 'high' THEN 2 END DESC"));
    }

    #[test]
    fn test_search_is_bound_not_inlined() {
        let query = GetTodosQuery {
            search: Some("x' OR 1=1 --".to_string()),
            ..GetTodosQuery::paged(1, 20)
        };
        let plan = plan(&query);
        let sql = plan.page_query().into_sql();
        assert!(!sql.contains("1=1"));
        assert!(sql.contains("t.title_folded LIKE ? ESCAPE"));
        assert!(plan
            .filters
            .contains(&TodoFilter::Search("%x' or 1=1 --%".to_string())));
    }

    #[test]
    fn test_search_term_is_lowercased() {
        let query = GetTodosQuery {
            search: Some("ÉCLAIR Straße".to_string()),
            ..GetTodosQuery::paged(1, 20)
        };
        assert!(plan(&query)
            .filters
            .contains(&TodoFilter::Search("%éclair straße%".to_string())));
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("Test"), "%Test%");
        assert_eq!(like_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }

    #[test]
    fn test_blank_search_ignored() {
        let query = GetTodosQuery {
            search: Some("   ".to_string()),
            ..GetTodosQuery::paged(1, 20)
        };
        assert_eq!(plan(&query).filters.len(), 2);
    }

    #[test]
    fn test_completed_and_overdue_compose() {
        let query = GetTodosQuery {
            overdue: Some(true),
            completed: Some(false),
            ..GetTodosQuery::paged(1, 20)
        };
        let plan = plan(&query);
        assert!(plan.filters.contains(&TodoFilter::Overdue));
        assert!(plan.filters.contains(&TodoFilter::NotCompleted));

        let query = GetTodosQuery {
            overdue: Some(false),
            completed: Some(true),
            ..GetTodosQuery::paged(1, 20)
        };
        let filters = TodoQueryPlan::from_query("user-1", &query).unwrap().filters;
        assert!(!filters.contains(&TodoFilter::Overdue));
        assert!(filters.contains(&TodoFilter::Completed));
    }

    #[test]
    fn test_count_query_has_same_filters_without_paging() {
        let query = GetTodosQuery {
            status: Some(TodoStatus::Draft),
            priority: Some(TodoPriority::High),
            ..GetTodosQuery::paged(3, 10)
        };
        let plan = plan(&query);
        let count_sql = plan.count_query().into_sql();
        assert!(count_sql.starts_with("SELECT COUNT(*) FROM todos t WHERE "));
        assert!(count_sql.contains("t.status = ?"));
        assert!(count_sql.contains("t.priority = ?"));
        assert!(!count_sql.contains("LIMIT"));
        assert!(!count_sql.contains("ORDER BY"));
        assert_eq!(plan.offset(), 20);
    }

    #[test]
    fn test_rejects_bad_pagination() {
        for (page, limit) in [(0, 10), (1, 0), (1, MAX_PAGE_LIMIT + 1)] {
            let err = TodoQueryPlan::from_query("user-1", &GetTodosQuery::paged(page, limit))
                .unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
    }
}
