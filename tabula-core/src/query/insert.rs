use crate::{
    AddDelegate, Arg, Context, Query, QueryString, Record, Result, Table, Value, escape_braces,
    fetch_each, separated_by,
};
use std::{future::Future, sync::Arc};

/// `INSERT` of one or more records, resolving to the new primary keys.
#[derive(Debug, Clone)]
pub struct Insert {
    table: Arc<Table>,
    add_delegate: AddDelegate,
}

impl Insert {
    pub fn new(table: Arc<Table>) -> Self {
        Self {
            table,
            add_delegate: Default::default(),
        }
    }

    pub fn add(mut self, rows: impl IntoIterator<Item = Record>) -> Self {
        self.add_delegate.add(rows);
        self
    }

    pub fn querystring(&self) -> Result<QueryString> {
        self.add_delegate.validate(&self.table)?;
        let writer = self.table.sql_writer();
        let mut context = Context::default();
        let mut head = String::with_capacity(64);
        head.push_str("INSERT INTO ");
        writer.write_identifier_quoted(&mut context, &mut head, self.table.tablename());
        head.push_str(" (");
        separated_by(
            &mut head,
            self.table.columns(),
            |out, column| out.push_str(column.name()),
            ", ",
        );
        head.push_str(") VALUES ");
        let rows = vec!["{}"; self.add_delegate.rows.len()].join(", ");
        let template = format!(
            "{}{} RETURNING {}",
            escape_braces(&head),
            rows,
            self.table.primary_key().name()
        );
        let args = self
            .add_delegate
            .rows
            .iter()
            .map(|v| v.querystring().map(Arg::Nested))
            .collect::<Result<Vec<_>>>()?;
        QueryString::new(template, args)
    }
}

impl Query for Insert {
    type Output = Vec<Value>;

    fn table(&self) -> &Arc<Table> {
        &self.table
    }

    fn querystrings(&self) -> Result<Vec<QueryString>> {
        Ok(vec![self.querystring()?])
    }

    fn run(self) -> impl Future<Output = Result<Self::Output>> + Send {
        async move {
            let engine = self.table.engine()?;
            let queries = self.compile()?;
            let rows = fetch_each(engine.as_ref(), queries).await?;
            let key = self.table.primary_key().name();
            Ok(rows
                .iter()
                .map(|row| row.get_column(key).cloned().unwrap_or_default())
                .collect())
        }
    }
}
