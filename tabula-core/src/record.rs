use crate::{
    Arg, Column, Delete, Error, First, Insert, Objects, Query, QueryString, Result, RowLabeled,
    RowsAffected, Table, Unquoted, Update, Value,
};
use std::{
    fmt::{self, Debug},
    future::Future,
    sync::Arc,
};

const NULL: &Value = &Value::Null;

/// One row of a table, one argument per column in column order.
///
/// Fields normally hold a [`Value`] but can also hold raw SQL
/// ([`Unquoted`]) or a nested query, which are spliced into the insert or
/// update as is.
#[derive(Clone)]
pub struct Record {
    table: Arc<Table>,
    fields: Vec<Arg>,
}

impl Record {
    /// Build a row, columns not given (or given as NULL) take their default.
    ///
    /// Fails for a column the table does not have, or a non nullable column
    /// left without a value or default.
    pub fn new<K, V>(table: &Arc<Table>, values: impl IntoIterator<Item = (K, V)>) -> Result<Self>
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut given: Vec<Option<Value>> = vec![None; table.columns().len()];
        for (name, value) in values {
            let name = name.as_ref();
            let Some(i) = table.columns().iter().position(|c| c.name() == name) else {
                return Err(Error::Usage(format!(
                    "Unrecognised column `{name}` for {}",
                    table.class_name()
                )));
            };
            given[i] = Some(value.into());
        }
        let mut fields = Vec::with_capacity(given.len());
        for (column, value) in table.columns().iter().zip(given) {
            let value = match value {
                Some(v) if !v.is_null() => v,
                _ if column.is_primary_key() => Value::Null,
                _ if column.has_default() => column.default_value(),
                _ if column.is_nullable() => Value::Null,
                _ => {
                    return Err(Error::Usage(format!(
                        "The column `{}` of {} requires a value",
                        column.name(),
                        table.class_name()
                    )));
                }
            };
            fields.push(Arg::Value(value));
        }
        Ok(Self {
            table: table.clone(),
            fields,
        })
    }

    /// Hydrate from a row fetched from the engine, missing columns are NULL.
    pub fn from_row(table: &Arc<Table>, row: &RowLabeled) -> Result<Self> {
        let fields = table
            .columns()
            .iter()
            .map(|c| Arg::Value(row.get_column(c.name()).cloned().unwrap_or_default()))
            .collect();
        Ok(Self {
            table: table.clone(),
            fields,
        })
    }

    pub fn table(&self) -> &Arc<Table> {
        &self.table
    }

    fn position(&self, name: &str) -> Result<usize> {
        self.table
            .columns()
            .iter()
            .position(|c| c.name() == name)
            .ok_or_else(|| {
                Error::Usage(format!(
                    "Unrecognised column `{name}` for {}",
                    self.table.class_name()
                ))
            })
    }

    /// Value of a column, fails when it holds raw SQL.
    pub fn get(&self, name: &str) -> Result<&Value> {
        match &self.fields[self.position(name)?] {
            Arg::Value(value) => Ok(value),
            _ => Err(Error::Usage(format!(
                "The column `{name}` holds SQL, not a value"
            ))),
        }
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<&mut Self> {
        self.set_arg(name, Arg::Value(value.into()))
    }

    /// Set raw SQL (`Unquoted`) or a nested query as the column content.
    pub fn set_arg(&mut self, name: &str, arg: impl Into<Arg>) -> Result<&mut Self> {
        let i = self.position(name)?;
        self.fields[i] = arg.into();
        Ok(self)
    }

    /// The primary key, `Value::Null` until the row is saved.
    pub fn id(&self) -> &Value {
        match &self.fields[0] {
            Arg::Value(value) => value,
            _ => NULL,
        }
    }

    pub fn is_persisted(&self) -> bool {
        !self.id().is_null()
    }

    pub(crate) fn fields(&self) -> impl Iterator<Item = (&Column, &Arg)> {
        self.table.columns().iter().zip(&self.fields)
    }

    /// The row as a parenthesized list for `INSERT ... VALUES`. An unsaved
    /// primary key becomes the dialect keyword generating a new one.
    pub fn querystring(&self) -> Result<QueryString> {
        let writer = self.table.sql_writer();
        let args = self.fields.iter().enumerate().map(|(i, arg)| match arg {
            Arg::Value(v) if i == 0 && v.is_null() => {
                Arg::Unquoted(Unquoted(writer.primary_key_insert_keyword().into()))
            }
            arg => arg.clone(),
        });
        let template = format!("({})", vec!["{}"; self.fields.len()].join(", "));
        QueryString::new(template, args)
    }

    /// Insert the row when new, update all of its columns otherwise.
    pub fn save(&mut self) -> Save<'_> {
        Save { record: self }
    }

    /// Delete the row and forget its primary key.
    pub fn remove(&mut self) -> Result<Delete> {
        if !self.is_persisted() {
            return Err(Error::Usage(format!(
                "This {} row was never saved",
                self.table.class_name()
            )));
        }
        let id = self.id().clone();
        self.fields[0] = Arg::Value(Value::Null);
        Ok(Delete::new(self.table.clone()).filter(self.table.primary_key().eq(id)))
    }

    /// The row a foreign key of this record points to.
    pub fn get_related(&self, name: &str) -> Result<First<Objects>> {
        let column = self.table.get_column_by_name(name)?;
        let target = column.referenced_table()?;
        let value = self.get(name)?.clone();
        Ok(target
            .objects()
            .filter(target.primary_key().eq(value))
            .first())
    }
}

impl Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut f = f.debug_struct(self.table.class_name());
        for (column, arg) in self.fields() {
            match arg {
                Arg::Value(v) => f.field(column.name(), v),
                Arg::Unquoted(v) => f.field(column.name(), v),
                Arg::Nested(v) => f.field(column.name(), &v.to_string()),
            };
        }
        f.finish()
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.table, &other.table)
            && self.fields.len() == other.fields.len()
            && self.fields.iter().zip(&other.fields).all(|(a, b)| match (a, b) {
                (Arg::Value(a), Arg::Value(b)) => a == b,
                (Arg::Unquoted(a), Arg::Unquoted(b)) => a == b,
                (Arg::Nested(a), Arg::Nested(b)) => a == b,
                _ => false,
            })
    }
}

/// Pending save of a [`Record`], running it stores the new primary key.
pub struct Save<'a> {
    record: &'a mut Record,
}

impl Save<'_> {
    pub fn is_insert(&self) -> bool {
        !self.record.is_persisted()
    }

    fn insert(&self) -> Insert {
        Insert::new(self.record.table.clone()).add([self.record.clone()])
    }

    fn update(&self) -> Update {
        let table = &self.record.table;
        let mut update =
            Update::new(table.clone()).filter(table.primary_key().eq(self.record.id().clone()));
        for (column, arg) in self.record.fields().skip(1) {
            update = update.set_arg(column, arg.clone());
        }
        update
    }
}

impl Query for Save<'_> {
    type Output = RowsAffected;

    fn table(&self) -> &Arc<Table> {
        &self.record.table
    }

    fn querystrings(&self) -> Result<Vec<QueryString>> {
        if self.is_insert() {
            self.insert().querystrings()
        } else {
            self.update().querystrings()
        }
    }

    fn run(self) -> impl Future<Output = Result<Self::Output>> + Send {
        async move {
            if !self.is_insert() {
                return self.update().run().await;
            }
            let ids = self.insert().run().await?;
            let Some(id) = ids.into_iter().next() else {
                return Err(Error::Conversion(
                    "The insert didn't return the new primary key".into(),
                ));
            };
            log::trace!("Saved {} with id {:?}", self.record.table.class_name(), id);
            self.record.fields[0] = Arg::Value(id);
            Ok(RowsAffected {
                rows_affected: 1,
                last_affected_id: self.record.id().as_integer(),
            })
        }
    }
}
