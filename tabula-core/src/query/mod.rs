mod alter;
mod count;
mod create;
mod delegates;
mod delete;
mod insert;
mod raw;
mod select;
mod update;

pub use alter::*;
pub use count::*;
pub use create::*;
pub use delegates::*;
pub use delete::*;
pub use insert::*;
pub use raw::*;
pub use select::*;
pub use update::*;

use crate::{Compiled, Engine, Result, RowLabeled, RowsAffected, Table, truncate_long};
use futures::TryStreamExt;
use std::{future::Future, sync::Arc};

/// A statement builder bound to one table.
///
/// Configuration methods only accumulate state, `querystrings` validates it
/// and renders. Nothing is checked before that point.
pub trait Query: Sized + Send {
    /// What `run` resolves to.
    type Output: Send;

    fn table(&self) -> &Arc<Table>;

    /// Validate and render the statements, in execution order.
    fn querystrings(&self) -> Result<Vec<crate::QueryString>>;

    /// Render for the dialect of the table's engine.
    fn compile(&self) -> Result<Vec<Compiled>> {
        let writer = self.table().sql_writer();
        Ok(self
            .querystrings()?
            .iter()
            .map(|v| v.compile(writer))
            .collect())
    }

    /// Execute through the table's engine.
    fn run(self) -> impl Future<Output = Result<Self::Output>> + Send;
}

pub(crate) async fn fetch_all(engine: &dyn Engine, query: Compiled) -> Result<Vec<RowLabeled>> {
    log::debug!("Fetching: {}", truncate_long!(query.sql));
    engine.fetch(query).try_collect().await
}

pub(crate) async fn execute_all(
    engine: &dyn Engine,
    queries: Vec<Compiled>,
) -> Result<RowsAffected> {
    let mut result = RowsAffected::default();
    for query in queries {
        log::debug!("Executing: {}", truncate_long!(query.sql));
        result.extend([engine.execute(query).await?]);
    }
    Ok(result)
}

/// Rows of every statement, in order.
pub(crate) async fn fetch_each(
    engine: &dyn Engine,
    queries: Vec<Compiled>,
) -> Result<Vec<RowLabeled>> {
    let mut rows = Vec::new();
    for query in queries {
        rows.extend(fetch_all(engine, query).await?);
    }
    Ok(rows)
}
