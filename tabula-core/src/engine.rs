use crate::{Compiled, EngineType, Result, SqlWriter, Value};
use futures::{
    FutureExt, StreamExt, TryStreamExt,
    future::BoxFuture,
    stream::BoxStream,
};
use std::sync::Arc;

/// Metadata about modify operations (INSERT/UPDATE/DELETE).
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowsAffected {
    /// Total number of rows impacted.
    pub rows_affected: u64,
    /// Backend-specific last inserted / affected identifier when available.
    pub last_affected_id: Option<i64>,
}

impl Extend<RowsAffected> for RowsAffected {
    fn extend<T: IntoIterator<Item = RowsAffected>>(&mut self, iter: T) {
        for elem in iter {
            self.rows_affected += elem.rows_affected;
            if elem.last_affected_id.is_some() {
                self.last_affected_id = elem.last_affected_id;
            }
        }
    }
}

/// Shared reference-counted column name list.
pub type RowNames = Arc<[String]>;
/// Owned row value slice matching `RowNames` length.
pub type Row = Box<[Value]>;

/// A result row with its corresponding column labels.
#[derive(Debug, Clone, PartialEq)]
pub struct RowLabeled {
    /// Column names.
    pub labels: RowNames,
    /// Data values (aligned by index with `labels`).
    pub values: Row,
}

impl RowLabeled {
    pub fn new(labels: RowNames, values: Row) -> Self {
        Self { labels, values }
    }
    pub fn names(&self) -> &[String] {
        &self.labels
    }
    pub fn values(&self) -> &[Value] {
        &self.values
    }
    pub fn get_column(&self, name: &str) -> Option<&Value> {
        self.labels
            .iter()
            .position(|v| v == name)
            .map(|i| &self.values[i])
    }
}

impl From<RowLabeled> for Row {
    fn from(value: RowLabeled) -> Self {
        value.values
    }
}

/// Items emitted by [`Engine::run`], rows and modify results interleaved.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    /// A labeled row.
    Row(RowLabeled),
    /// A modify effect aggregation.
    Affected(RowsAffected),
}

/// Something able to execute compiled statements.
///
/// The driver behind it is out of scope here: tabula only renders SQL and
/// hands it over together with the bound values, in placeholder order.
pub trait Engine: Send + Sync {
    fn engine_type(&self) -> EngineType;

    fn sql_writer(&self) -> &'static dyn SqlWriter {
        self.engine_type().sql_writer()
    }

    /// General method to send any query and return any result type (either row or count)
    fn run(&self, query: Compiled) -> BoxStream<'_, anyhow::Result<QueryResult>>;

    /// Execute the query and returns the rows.
    fn fetch(&self, query: Compiled) -> BoxStream<'_, Result<RowLabeled>> {
        self.run(query)
            .filter_map(|v| async move {
                match v {
                    Ok(QueryResult::Row(v)) => Some(Ok(v)),
                    Err(e) => Some(Err(e.into())),
                    _ => None,
                }
            })
            .boxed()
    }

    /// Execute the query and return the total number of rows affected.
    fn execute(&self, query: Compiled) -> BoxFuture<'_, Result<RowsAffected>> {
        self.run(query)
            .filter_map(|v| async move {
                match v {
                    Ok(QueryResult::Affected(v)) => Some(Ok(v)),
                    Err(e) => Some(Err(e.into())),
                    _ => None,
                }
            })
            .try_collect()
            .boxed()
    }
}
