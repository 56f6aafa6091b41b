use std::fmt;

use async_trait::async_trait;
use shared::protocol::{ListQuery, Record};

use crate::error::BackendError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    Insert,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Table-scoped CRUD against the hosted datastore.
///
/// Every call may suspend and reports failure through its `Result`; no call
/// retries on its own.
#[async_trait]
pub trait BackendClient: Send + Sync {
    async fn list(&self, table: &str, query: &ListQuery) -> Result<Vec<Record>, BackendError>;
    /// Inserts the whole batch in a single call.
    async fn insert(&self, table: &str, records: Vec<Record>) -> Result<(), BackendError>;
    async fn update(&self, table: &str, id: &str, patch: Record) -> Result<(), BackendError>;
    async fn delete(&self, table: &str, id: &str) -> Result<(), BackendError>;
}
