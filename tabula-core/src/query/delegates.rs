use crate::{
    Arg, Column, Condition, Error, Ordered, QueryString, Record, Result, SqlWriter, Table,
};
use std::sync::Arc;

/// The `WHERE` clause, several filters are combined with `AND`.
#[derive(Debug, Clone, Default)]
pub struct WhereDelegate {
    pub condition: Option<Condition>,
}

impl WhereDelegate {
    pub fn filter(&mut self, condition: Condition) {
        self.condition = Some(match self.condition.take() {
            Some(current) => current & condition,
            None => condition,
        });
    }

    pub fn columns(&self) -> Vec<&Column> {
        self.condition
            .as_ref()
            .map(Condition::columns)
            .unwrap_or_default()
    }

    pub fn querystring(
        &self,
        writer: &dyn SqlWriter,
        qualify_columns: bool,
    ) -> Result<Option<QueryString>> {
        self.condition
            .as_ref()
            .map(|v| v.querystring(writer, qualify_columns))
            .transpose()
    }

    /// Condition usable by `UPDATE` and `DELETE`, which cannot join. Filters
    /// on related columns become a primary key lookup through a subquery.
    pub fn mutation_querystring(&self, table: &Arc<Table>) -> Result<Option<QueryString>> {
        let Some(condition) = &self.condition else {
            return Ok(None);
        };
        check_owned(table, condition.columns())?;
        let writer = table.sql_writer();
        if !condition.has_chained_columns() {
            return condition.querystring(writer, false).map(Some);
        }
        let subquery = table
            .select()
            .columns([table.primary_key().clone()])
            .filter(condition.clone())
            .querystring()?;
        let template = format!("{} IN ({{}})", table.primary_key().name());
        QueryString::new(template, [Arg::Nested(subquery)]).map(Some)
    }
}

/// Fail unless every column is read from `table`, directly or through its
/// foreign keys.
pub(crate) fn check_owned<'a>(
    table: &Arc<Table>,
    columns: impl IntoIterator<Item = &'a Column>,
) -> Result<()> {
    for column in columns {
        let belongs = column
            .root_table()
            .is_some_and(|t| Arc::ptr_eq(&t, table));
        if !belongs {
            return Err(Error::Usage(format!(
                "The column {} doesn't belong to {}",
                column.path(),
                table.class_name()
            )));
        }
    }
    Ok(())
}

/// Column assignments of an `UPDATE`.
#[derive(Debug, Clone, Default)]
pub struct ValuesDelegate {
    pub values: Vec<(Column, Arg)>,
}

impl ValuesDelegate {
    /// Assigning a column twice keeps the last value.
    pub fn set(&mut self, column: Column, value: Arg) {
        match self.values.iter_mut().find(|(c, _)| *c == column) {
            Some(entry) => entry.1 = value,
            None => self.values.push((column, value)),
        }
    }
}

/// Selected columns, all of them when empty.
#[derive(Debug, Clone, Default)]
pub struct ColumnsDelegate {
    pub selected: Vec<Column>,
}

impl ColumnsDelegate {
    pub fn columns(&mut self, columns: impl IntoIterator<Item = Column>) {
        self.selected.extend(columns);
    }
}

#[derive(Debug, Clone, Default)]
pub struct OrderByDelegate {
    pub order_by: Vec<Ordered>,
}

impl OrderByDelegate {
    pub fn order_by(&mut self, ordered: impl IntoIterator<Item = Ordered>) {
        self.order_by.extend(ordered);
    }

    pub fn write(&self, writer: &dyn SqlWriter, qualify_columns: bool, out: &mut String) {
        if self.order_by.is_empty() {
            return;
        }
        out.push_str(" ORDER BY ");
        out.push_str(
            &self
                .order_by
                .iter()
                .map(|v| v.sql(writer, qualify_columns))
                .collect::<Vec<_>>()
                .join(", "),
        );
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LimitDelegate {
    pub limit: Option<u64>,
}

impl LimitDelegate {
    pub fn write(&self, out: &mut String) {
        if let Some(limit) = self.limit {
            out.push_str(" LIMIT ");
            out.push_str(&limit.to_string());
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OffsetDelegate {
    pub offset: Option<u64>,
}

impl OffsetDelegate {
    pub fn write(&self, out: &mut String) {
        if let Some(offset) = self.offset {
            out.push_str(" OFFSET ");
            out.push_str(&offset.to_string());
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DistinctDelegate {
    pub distinct: bool,
}

/// Rows of an `INSERT`.
#[derive(Debug, Clone, Default)]
pub struct AddDelegate {
    pub rows: Vec<Record>,
}

impl AddDelegate {
    pub fn add(&mut self, rows: impl IntoIterator<Item = Record>) {
        self.rows.extend(rows);
    }

    pub fn validate(&self, table: &Arc<Table>) -> Result<()> {
        if self.rows.is_empty() {
            return Err(Error::Usage(format!(
                "No rows were added to the insert into {}",
                table.class_name()
            )));
        }
        if let Some(row) = self.rows.iter().find(|v| !Arc::ptr_eq(v.table(), table)) {
            return Err(Error::Usage(format!(
                "A {} row can't be inserted into {}",
                row.table().class_name(),
                table.class_name()
            )));
        }
        Ok(())
    }
}
