use crate::{
    Condition, Context, Error, Query, QueryString, Result, RowsAffected, Table, WhereDelegate,
    execute_all,
};
use std::{future::Future, sync::Arc};

/// `DELETE`, refusing to empty the table unless forced.
#[derive(Debug, Clone)]
pub struct Delete {
    table: Arc<Table>,
    where_delegate: WhereDelegate,
    force: bool,
}

impl Delete {
    pub fn new(table: Arc<Table>) -> Self {
        Self {
            table,
            where_delegate: Default::default(),
            force: false,
        }
    }
    pub fn filter(mut self, condition: Condition) -> Self {
        self.where_delegate.filter(condition);
        self
    }
    /// Allow deleting every row.
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn querystring(&self) -> Result<QueryString> {
        let condition = self.where_delegate.mutation_querystring(&self.table)?;
        if condition.is_none() && !self.force {
            return Err(Error::Usage(format!(
                "Do you really want to delete all the data from {}? If so, use `force(true)`",
                self.table.class_name()
            )));
        }
        let mut head = String::from("DELETE FROM ");
        self.table.sql_writer().write_identifier_quoted(
            &mut Context::default(),
            &mut head,
            self.table.tablename(),
        );
        let query = QueryString::text(head);
        match condition {
            Some(condition) => QueryString::new("{} WHERE {}", [query.into(), condition.into()]),
            None => Ok(query),
        }
    }
}

impl Query for Delete {
    type Output = RowsAffected;

    fn table(&self) -> &Arc<Table> {
        &self.table
    }

    fn querystrings(&self) -> Result<Vec<QueryString>> {
        Ok(vec![self.querystring()?])
    }

    fn run(self) -> impl Future<Output = Result<Self::Output>> + Send {
        async move {
            let engine = self.table.engine()?;
            execute_all(engine.as_ref(), self.compile()?).await
        }
    }
}
