use crate::{Query, QueryString, Result, RowLabeled, Table, fetch_all};
use std::{future::Future, sync::Arc};

/// Hand written SQL run through the engine of a table.
#[derive(Debug, Clone)]
pub struct Raw {
    table: Arc<Table>,
    query: QueryString,
}

impl Raw {
    pub fn new(table: Arc<Table>, query: QueryString) -> Self {
        Self { table, query }
    }
}

impl Query for Raw {
    type Output = Vec<RowLabeled>;

    fn table(&self) -> &Arc<Table> {
        &self.table
    }

    fn querystrings(&self) -> Result<Vec<QueryString>> {
        Ok(vec![self.query.clone()])
    }

    fn run(self) -> impl Future<Output = Result<Self::Output>> + Send {
        async move {
            let engine = self.table.engine()?;
            fetch_all(engine.as_ref(), self.query.compile(engine.sql_writer())).await
        }
    }
}
