//! In-process table store implementing [`BackendClient`].
//!
//! Used for offline runs of the console and as the fake backend in tests. It
//! behaves like the hosted store for the operations this crate issues:
//! generated `id`s, per-table column defaults, equality filters and ordering.

use std::{cmp::Ordering, collections::HashMap};

use async_trait::async_trait;
use serde_json::Value;
use shared::protocol::{Direction, Filter, ListQuery, Record};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::{
    backend::{BackendClient, Operation},
    error::BackendError,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendCall {
    pub operation: Operation,
    pub table: String,
    /// Rows carried by the call: batch size for inserts, 1 for update/delete, 0 for list.
    pub rows: usize,
}

#[derive(Default)]
struct MemoryState {
    tables: HashMap<String, Vec<Record>>,
    column_defaults: HashMap<String, Record>,
    failures: HashMap<Operation, String>,
    calls: Vec<BackendCall>,
}

impl MemoryState {
    fn record_call(&mut self, operation: Operation, table: &str, rows: usize) {
        self.calls.push(BackendCall {
            operation,
            table: table.to_string(),
            rows,
        });
    }

    fn injected_failure(&self, operation: Operation, table: &str) -> Result<(), BackendError> {
        match self.failures.get(&operation) {
            Some(reason) => Err(BackendError::Rejected {
                operation: operation.as_str(),
                table: table.to_string(),
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[derive(Default)]
pub struct InMemoryBackend {
    inner: Mutex<MemoryState>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a backend from `{ "<table>": [ {row}, ... ] }`.
    pub fn from_seed(seed: Value) -> Result<Self, BackendError> {
        let Value::Object(tables) = seed else {
            return Err(BackendError::Decode(
                "seed document must be an object of table arrays".into(),
            ));
        };
        let mut backend = Self::new();
        for (table, rows) in tables {
            let Value::Array(rows) = rows else {
                return Err(BackendError::Decode(format!(
                    "seed table '{table}' must be an array of rows"
                )));
            };
            let mut records = Vec::with_capacity(rows.len());
            for row in rows {
                match row {
                    Value::Object(record) => records.push(record),
                    other => {
                        return Err(BackendError::Decode(format!(
                            "seed row in '{table}' is not an object: {other}"
                        )))
                    }
                }
            }
            backend = backend.with_rows(&table, records);
        }
        Ok(backend)
    }

    pub fn with_rows(mut self, table: &str, rows: Vec<Record>) -> Self {
        self.inner
            .get_mut()
            .tables
            .entry(table.to_string())
            .or_default()
            .extend(rows);
        self
    }

    /// Value filled into `column` for inserted rows that do not carry it.
    pub fn with_column_default(mut self, table: &str, column: &str, value: Value) -> Self {
        self.inner
            .get_mut()
            .column_defaults
            .entry(table.to_string())
            .or_default()
            .insert(column.to_string(), value);
        self
    }

    /// Makes every subsequent `operation` call fail until cleared.
    pub async fn fail(&self, operation: Operation, reason: impl Into<String>) {
        self.inner
            .lock()
            .await
            .failures
            .insert(operation, reason.into());
    }

    pub async fn clear_failures(&self) {
        self.inner.lock().await.failures.clear();
    }

    pub async fn calls(&self) -> Vec<BackendCall> {
        self.inner.lock().await.calls.clone()
    }

    pub async fn rows(&self, table: &str) -> Vec<Record> {
        self.inner
            .lock()
            .await
            .tables
            .get(table)
            .cloned()
            .unwrap_or_default()
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn matches_filters(record: &Record, filters: &[Filter]) -> bool {
    filters.iter().all(|filter| match filter {
        Filter::Eq { column, value } => record
            .get(column)
            .is_some_and(|cell| scalar_text(cell) == scalar_text(value)),
    })
}

fn compare_cells(left: Option<&Value>, right: Option<&Value>) -> Ordering {
    match (left, right) {
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (Some(a), Some(b)) => scalar_text(a).cmp(&scalar_text(b)),
    }
}

fn has_id(record: &Record, id: &str) -> bool {
    record.get("id").is_some_and(|cell| scalar_text(cell) == id)
}

#[async_trait]
impl BackendClient for InMemoryBackend {
    async fn list(&self, table: &str, query: &ListQuery) -> Result<Vec<Record>, BackendError> {
        let mut state = self.inner.lock().await;
        state.record_call(Operation::List, table, 0);
        state.injected_failure(Operation::List, table)?;

        let mut rows: Vec<Record> = state
            .tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| matches_filters(row, &query.filters))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ordering = compare_cells(a.get(&order.column), b.get(&order.column));
                match order.direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            });
        }
        Ok(rows)
    }

    async fn insert(&self, table: &str, records: Vec<Record>) -> Result<(), BackendError> {
        let mut state = self.inner.lock().await;
        state.record_call(Operation::Insert, table, records.len());
        state.injected_failure(Operation::Insert, table)?;

        let defaults = state.column_defaults.get(table).cloned().unwrap_or_default();
        let stored = state.tables.entry(table.to_string()).or_default();
        for mut record in records {
            record
                .entry("id")
                .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
            for (column, value) in &defaults {
                record.entry(column.clone()).or_insert_with(|| value.clone());
            }
            stored.push(record);
        }
        Ok(())
    }

    async fn update(&self, table: &str, id: &str, patch: Record) -> Result<(), BackendError> {
        let mut state = self.inner.lock().await;
        state.record_call(Operation::Update, table, 1);
        state.injected_failure(Operation::Update, table)?;

        let mut touched = 0usize;
        if let Some(rows) = state.tables.get_mut(table) {
            for row in rows.iter_mut().filter(|row| has_id(row, id)) {
                for (column, value) in &patch {
                    row.insert(column.clone(), value.clone());
                }
                touched += 1;
            }
        }
        if touched == 0 {
            debug!(table, id, "update matched no rows");
        }
        Ok(())
    }

    async fn delete(&self, table: &str, id: &str) -> Result<(), BackendError> {
        let mut state = self.inner.lock().await;
        state.record_call(Operation::Delete, table, 1);
        state.injected_failure(Operation::Delete, table)?;

        if let Some(rows) = state.tables.get_mut(table) {
            let before = rows.len();
            rows.retain(|row| !has_id(row, id));
            if rows.len() == before {
                debug!(table, id, "delete matched no rows");
            }
        }
        Ok(())
    }
}
