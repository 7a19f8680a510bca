use crate::{
    Arg, Column, Condition, Context, EngineType, Error, Projection, Query, QueryString, Result,
    RowLabeled, Select, SqlWriter, Table, Value, fetch_all, separated_by,
};
use std::{future::Future, sync::Arc};

/// Number of rows matching the filters.
///
/// Counts every row by default, the non null values of one `column`, or the
/// distinct combinations of the `distinct` columns.
#[derive(Debug, Clone)]
pub struct Count {
    select: Select,
    column: Option<Column>,
    distinct: Vec<Column>,
}

impl Count {
    pub fn new(table: Arc<Table>) -> Self {
        Self {
            select: Select::new(table),
            column: None,
            distinct: Vec::new(),
        }
    }
    pub fn filter(mut self, condition: Condition) -> Self {
        self.select = self.select.filter(condition);
        self
    }
    /// Count the rows where `column` is not null.
    pub fn column(mut self, column: Column) -> Self {
        self.column = Some(column);
        self
    }
    pub fn distinct(mut self, columns: impl IntoIterator<Item = Column>) -> Self {
        self.distinct = columns.into_iter().collect();
        self
    }
    pub fn querystring(&self) -> Result<QueryString> {
        let projection = match (&self.column, self.distinct.as_slice()) {
            (None, []) => Projection::text(r#"COUNT(*) AS "count""#),
            (Some(..), [_, ..]) => {
                return Err(Error::Usage(
                    "Count takes either a column or distinct columns, not both".into(),
                ));
            }
            (Some(column), []) => Projection {
                columns: vec![column],
                write: Box::new(
                    move |writer: &dyn SqlWriter, context: &mut Context, out: &mut String| {
                        out.push_str("COUNT(");
                        column.write_name(writer, context, out);
                        out.push_str(r#") AS "count""#);
                    },
                ),
            },
            (None, distinct) => {
                if distinct.len() > 1 && self.table().engine_type() == EngineType::Sqlite {
                    return Err(Error::Usage(
                        "SQLite can't count distinct combinations of several columns".into(),
                    ));
                }
                Projection {
                    columns: distinct.iter().collect(),
                    write: Box::new(
                        move |writer: &dyn SqlWriter, context: &mut Context, out: &mut String| {
                            out.push_str("COUNT(DISTINCT(");
                            separated_by(
                                out,
                                distinct,
                                |out, column| column.write_name(writer, context, out),
                                ", ",
                            );
                            out.push_str(r#")) AS "count""#);
                        },
                    ),
                }
            }
        };
        self.select.render(Some(&projection), false)
    }
}

impl Query for Count {
    type Output = i64;

    fn table(&self) -> &Arc<Table> {
        self.select.table()
    }

    fn querystrings(&self) -> Result<Vec<QueryString>> {
        Ok(vec![self.querystring()?])
    }

    fn run(self) -> impl Future<Output = Result<Self::Output>> + Send {
        async move {
            let engine = self.table().engine()?;
            let query = self.querystring()?.compile(engine.sql_writer());
            let rows = fetch_all(engine.as_ref(), query).await?;
            let value = single_value(&rows, "count")?;
            value.as_integer().ok_or_else(|| {
                Error::Conversion(format!("Expected an integer count, got {value:?}"))
            })
        }
    }
}

/// Whether at least one row matches the filters.
#[derive(Debug, Clone)]
pub struct Exists {
    select: Select,
}

impl Exists {
    pub fn new(table: Arc<Table>) -> Self {
        Self {
            select: Select::new(table),
        }
    }
    pub fn filter(mut self, condition: Condition) -> Self {
        self.select = self.select.filter(condition);
        self
    }
    pub fn querystring(&self) -> Result<QueryString> {
        QueryString::new(
            r#"SELECT EXISTS({}) AS "exists""#,
            [Arg::Nested(self.select.render(Some(&Projection::text("*")), false)?)],
        )
    }
}

impl Query for Exists {
    type Output = bool;

    fn table(&self) -> &Arc<Table> {
        self.select.table()
    }

    fn querystrings(&self) -> Result<Vec<QueryString>> {
        Ok(vec![self.querystring()?])
    }

    fn run(self) -> impl Future<Output = Result<Self::Output>> + Send {
        async move {
            let engine = self.table().engine()?;
            let query = self.querystring()?.compile(engine.sql_writer());
            let rows = fetch_all(engine.as_ref(), query).await?;
            as_bool(single_value(&rows, "exists")?)
        }
    }
}

pub(crate) fn single_value<'a>(rows: &'a [RowLabeled], label: &str) -> Result<&'a Value> {
    rows.first()
        .and_then(|row| row.get_column(label).or_else(|| row.values().first()))
        .ok_or_else(|| Error::Conversion(format!("Expected a row with a `{label}` column")))
}

/// Booleans come back as integers from engines without a boolean type.
pub(crate) fn as_bool(value: &Value) -> Result<bool> {
    match value {
        Value::Boolean(Some(v)) => Ok(*v),
        v => v
            .as_integer()
            .map(|v| v != 0)
            .ok_or_else(|| Error::Conversion(format!("Expected a boolean, got {v:?}"))),
    }
}
