use crate::{
    Column, ColumnsDelegate, Condition, Context, DistinctDelegate, LimitDelegate,
    OffsetDelegate, OrderByDelegate, Ordered, Query, QueryString, Record, Result, RowLabeled,
    SqlWriter, Table, WhereDelegate, check_owned, escape_braces, fetch_all, separated_by,
};
use std::{future::Future, sync::Arc};

/// `SELECT` returning labeled rows.
///
/// Columns reached through foreign keys are fetched with a `LEFT JOIN` per hop
/// and labeled with their dotted path:
///
/// ```rust,ignore
/// let rows = band
///     .select()
///     .columns([band.ref_column("name")?, band.ref_column("manager.name")?])
///     .filter(band.ref_column("popularity")?.gt(100))
///     .order_by(band.ref_column("name")?.asc())
///     .run()
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct Select {
    table: Arc<Table>,
    columns_delegate: ColumnsDelegate,
    where_delegate: WhereDelegate,
    order_by_delegate: OrderByDelegate,
    limit_delegate: LimitDelegate,
    offset_delegate: OffsetDelegate,
    distinct_delegate: DistinctDelegate,
}

impl Select {
    pub fn new(table: Arc<Table>) -> Self {
        Self {
            table,
            columns_delegate: Default::default(),
            where_delegate: Default::default(),
            order_by_delegate: Default::default(),
            limit_delegate: Default::default(),
            offset_delegate: Default::default(),
            distinct_delegate: Default::default(),
        }
    }
    pub fn columns(mut self, columns: impl IntoIterator<Item = Column>) -> Self {
        self.columns_delegate.columns(columns);
        self
    }
    pub fn filter(mut self, condition: Condition) -> Self {
        self.where_delegate.filter(condition);
        self
    }
    pub fn order_by(mut self, ordered: Ordered) -> Self {
        self.order_by_delegate.order_by([ordered]);
        self
    }
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit_delegate.limit = Some(limit);
        self
    }
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset_delegate.offset = Some(offset);
        self
    }
    pub fn distinct(mut self, distinct: bool) -> Self {
        self.distinct_delegate.distinct = distinct;
        self
    }
    /// Only the first row, or none.
    pub fn first(self) -> First<Select> {
        First(self.limit(1))
    }

    pub fn querystring(&self) -> Result<QueryString> {
        self.render(None, true)
    }

    /// Render with `projection` in place of the column list, the tail
    /// (`ORDER BY`, `LIMIT`, `OFFSET`) only when `tail` is set.
    pub(crate) fn render(
        &self,
        projection: Option<&Projection<'_>>,
        tail: bool,
    ) -> Result<QueryString> {
        let writer = self.table.sql_writer();
        let selected = if self.columns_delegate.selected.is_empty() {
            self.table.columns().to_vec()
        } else {
            self.columns_delegate.selected.clone()
        };
        let mut referenced: Vec<&Column> = Vec::new();
        match projection {
            Some(projection) => referenced.extend(projection.columns.iter().copied()),
            None => referenced.extend(&selected),
        }
        referenced.extend(self.where_delegate.columns());
        if tail {
            referenced.extend(self.order_by_delegate.order_by.iter().map(|v| &v.column));
        }
        check_owned(&self.table, referenced.iter().copied())?;
        let joins = Joins::collect(&self.table, referenced.iter().copied());
        let qualify = !joins.is_empty();

        let mut context = Context::new(qualify);
        let mut head = String::with_capacity(128);
        head.push_str("SELECT ");
        if self.distinct_delegate.distinct {
            head.push_str("DISTINCT ");
        }
        match projection {
            Some(projection) => (projection.write)(writer, &mut context, &mut head),
            None => separated_by(
                &mut head,
                &selected,
                |out, column| {
                    column.write_name(writer, &mut context, out);
                    if column.is_chained() {
                        out.push_str(" AS ");
                        writer.write_identifier_quoted(&mut context, out, &column.path());
                    }
                },
                ", ",
            ),
        }
        head.push_str(" FROM ");
        writer.write_identifier_quoted(&mut context, &mut head, self.table.tablename());
        joins.write(writer, &mut context, &mut head);

        let mut query = QueryString::text(head);
        if let Some(condition) = self.where_delegate.querystring(writer, qualify)? {
            query = QueryString::new("{} WHERE {}", [query.into(), condition.into()])?;
        }
        if tail {
            let mut tail = String::new();
            self.order_by_delegate.write(writer, qualify, &mut tail);
            self.limit_delegate.write(&mut tail);
            self.offset_delegate.write(&mut tail);
            if !tail.is_empty() {
                query = QueryString::new(format!("{{}}{}", escape_braces(&tail)), [query.into()])?;
            }
        }
        Ok(query)
    }
}

/// Replacement for the column list of a `SELECT`.
pub(crate) struct Projection<'a> {
    /// Columns read by the projection, joined like selected ones.
    pub columns: Vec<&'a Column>,
    pub write: Box<dyn Fn(&dyn SqlWriter, &mut Context, &mut String) + 'a>,
}

impl<'a> Projection<'a> {
    pub fn text(text: &'a str) -> Self {
        Self {
            columns: Vec::new(),
            write: Box::new(move |_: &dyn SqlWriter, _: &mut Context, out: &mut String| {
                out.push_str(text)
            }),
        }
    }
}

impl Query for Select {
    type Output = Vec<RowLabeled>;

    fn table(&self) -> &Arc<Table> {
        &self.table
    }

    fn querystrings(&self) -> Result<Vec<QueryString>> {
        Ok(vec![self.querystring()?])
    }

    fn run(self) -> impl Future<Output = Result<Self::Output>> + Send {
        async move {
            let engine = self.table.engine()?;
            let query = self.querystring()?.compile(engine.sql_writer());
            fetch_all(engine.as_ref(), query).await
        }
    }
}

/// `LEFT JOIN`s needed to reach chained columns, one per distinct hop prefix.
#[derive(Debug, Default)]
struct Joins {
    joins: Vec<Join>,
}

#[derive(Debug)]
struct Join {
    target: String,
    target_key: String,
    alias: String,
    left_alias: String,
    foreign_key: String,
}

impl Joins {
    fn collect<'a>(table: &Table, columns: impl IntoIterator<Item = &'a Column>) -> Self {
        let mut result = Self::default();
        for column in columns {
            let mut left_alias = table.tablename().to_owned();
            for hop in column.call_chain() {
                let alias = format!("{}${}", left_alias, hop.foreign_key.name());
                if !result.joins.iter().any(|v| v.alias == alias) {
                    result.joins.push(Join {
                        target: hop.target.tablename().to_owned(),
                        target_key: hop.target.primary_key().name().to_owned(),
                        alias: alias.clone(),
                        left_alias,
                        foreign_key: hop.foreign_key.name().to_owned(),
                    });
                }
                left_alias = alias;
            }
        }
        result
    }

    fn is_empty(&self) -> bool {
        self.joins.is_empty()
    }

    fn write(&self, writer: &dyn SqlWriter, context: &mut Context, out: &mut String) {
        for join in &self.joins {
            out.push_str(" LEFT JOIN ");
            writer.write_identifier_quoted(context, out, &join.target);
            out.push_str(" AS ");
            writer.write_identifier_quoted(context, out, &join.alias);
            out.push_str(" ON ");
            writer.write_identifier_quoted(context, out, &join.left_alias);
            out.push('.');
            out.push_str(&join.foreign_key);
            out.push_str(" = ");
            writer.write_identifier_quoted(context, out, &join.alias);
            out.push('.');
            out.push_str(&join.target_key);
        }
    }
}

/// `SELECT` of every column of the table, hydrated into records.
#[derive(Debug, Clone)]
pub struct Objects {
    select: Select,
}

impl Objects {
    pub fn new(table: Arc<Table>) -> Self {
        let columns = table.columns().to_vec();
        Self {
            select: Select::new(table).columns(columns),
        }
    }
    pub fn filter(mut self, condition: Condition) -> Self {
        self.select = self.select.filter(condition);
        self
    }
    pub fn order_by(mut self, ordered: Ordered) -> Self {
        self.select = self.select.order_by(ordered);
        self
    }
    pub fn limit(mut self, limit: u64) -> Self {
        self.select = self.select.limit(limit);
        self
    }
    pub fn offset(mut self, offset: u64) -> Self {
        self.select = self.select.offset(offset);
        self
    }
    pub fn first(self) -> First<Objects> {
        First(self.limit(1))
    }
    pub fn querystring(&self) -> Result<QueryString> {
        self.select.querystring()
    }
}

impl Query for Objects {
    type Output = Vec<Record>;

    fn table(&self) -> &Arc<Table> {
        &self.select.table
    }

    fn querystrings(&self) -> Result<Vec<QueryString>> {
        self.select.querystrings()
    }

    fn run(self) -> impl Future<Output = Result<Self::Output>> + Send {
        async move {
            let table = self.select.table.clone();
            let rows = self.select.run().await?;
            rows.iter().map(|row| Record::from_row(&table, row)).collect()
        }
    }
}

/// A query narrowed to its first result.
#[derive(Debug, Clone)]
pub struct First<Q>(Q);

impl<Q> First<Q> {
    pub fn inner(&self) -> &Q {
        &self.0
    }
}

impl Query for First<Select> {
    type Output = Option<RowLabeled>;

    fn table(&self) -> &Arc<Table> {
        self.0.table()
    }

    fn querystrings(&self) -> Result<Vec<QueryString>> {
        self.0.querystrings()
    }

    fn run(self) -> impl Future<Output = Result<Self::Output>> + Send {
        async move { Ok(self.0.run().await?.into_iter().next()) }
    }
}

impl Query for First<Objects> {
    type Output = Option<Record>;

    fn table(&self) -> &Arc<Table> {
        self.0.table()
    }

    fn querystrings(&self) -> Result<Vec<QueryString>> {
        self.0.querystrings()
    }

    fn run(self) -> impl Future<Output = Result<Self::Output>> + Send {
        async move { Ok(self.0.run().await?.into_iter().next()) }
    }
}
