//! Tasker library
//!
//! Multi-owner todo storage: todos with one level of sub-todos, categories
//! and comments, backed by SQLite.

pub mod config;
pub mod context;
pub mod database;
pub mod error;
pub mod logging;
pub mod services;
