use crate::{
    Arg, Column, Condition, Context, Error, Query, QueryString, Result, RowsAffected, Table,
    ValuesDelegate, Value, WhereDelegate, escape_braces, execute_all,
};
use std::{future::Future, sync::Arc};

/// `UPDATE` of columns owned by the table.
///
/// ```rust
/// use tabula_core::{ColumnDef, Registry, Table, Value};
/// let registry = Registry::new();
/// let band = Table::builder("Band")
///     .column("name", ColumnDef::varchar(50))
///     .build(&registry)
///     .unwrap();
/// let name = band.ref_column("name").unwrap();
/// let query = band
///     .update()
///     .values([(name.clone(), Value::from("Spamalot"))])
///     .filter(name.eq("Pythonistas"))
///     .querystring()
///     .unwrap()
///     .compile(band.sql_writer());
/// assert_eq!(query.sql, r#"UPDATE "band" SET name = $1 WHERE name = $2"#);
/// ```
#[derive(Debug, Clone)]
pub struct Update {
    table: Arc<Table>,
    values_delegate: ValuesDelegate,
    where_delegate: WhereDelegate,
}

impl Update {
    pub fn new(table: Arc<Table>) -> Self {
        Self {
            table,
            values_delegate: Default::default(),
            where_delegate: Default::default(),
        }
    }

    pub fn values(mut self, values: impl IntoIterator<Item = (Column, Value)>) -> Self {
        for (column, value) in values {
            self.values_delegate.set(column, Arg::Value(value));
        }
        self
    }

    pub fn set(self, column: &Column, value: impl Into<Value>) -> Self {
        self.set_arg(column, Arg::Value(value.into()))
    }

    /// Assign raw SQL or a nested query.
    pub fn set_arg(mut self, column: &Column, arg: impl Into<Arg>) -> Self {
        self.values_delegate.set(column.clone(), arg.into());
        self
    }

    pub fn filter(mut self, condition: Condition) -> Self {
        self.where_delegate.filter(condition);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.values_delegate.values.is_empty() {
            return Err(Error::Usage(
                "No values were specified to update, please use `values`".into(),
            ));
        }
        for (column, _) in &self.values_delegate.values {
            if column.is_chained() {
                return Err(Error::Usage(format!(
                    "Related values can't be updated via an update, `{}` is reached through a foreign key",
                    column.path()
                )));
            }
            let owned = column.table().is_some_and(|t| Arc::ptr_eq(&t, &self.table));
            if !owned {
                return Err(Error::Usage(format!(
                    "The column `{}` doesn't belong to {}",
                    column.name(),
                    self.table.class_name()
                )));
            }
        }
        Ok(())
    }

    pub fn querystring(&self) -> Result<QueryString> {
        self.validate()?;
        let writer = self.table.sql_writer();
        let mut head = String::from("UPDATE ");
        writer.write_identifier_quoted(&mut Context::default(), &mut head, self.table.tablename());
        let assignments = self
            .values_delegate
            .values
            .iter()
            .map(|(column, _)| format!("{} = {{}}", column.name()))
            .collect::<Vec<_>>()
            .join(", ");
        let template = format!("{} SET {}", escape_braces(&head), assignments);
        let query = QueryString::new(
            template,
            self.values_delegate.values.iter().map(|(_, arg)| arg.clone()),
        )?;
        match self.where_delegate.mutation_querystring(&self.table)? {
            Some(condition) => QueryString::new("{} WHERE {}", [query.into(), condition.into()]),
            None => Ok(query),
        }
    }
}

impl Query for Update {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ColumnDef, Registry, Unquoted};

    fn tables() -> (Arc<Registry>, Arc<Table>, Arc<Table>) {
        let registry = Registry::new();
        let manager = Table::builder("Manager")
            .column("name", ColumnDef::varchar(50))
            .build(&registry)
            .unwrap();
        let band = Table::builder("Band")
            .column("name", ColumnDef::varchar(50))
            .column("manager", ColumnDef::foreign_key(&manager))
            .column("popularity", ColumnDef::integer())
            .build(&registry)
            .unwrap();
        (registry, manager, band)
    }

    #[test]
    fn update_values_then_where() {
        let (_registry, _manager, band) = tables();
        let name = band.ref_column("name").unwrap();
        let compiled = band
            .update()
            .values([(name.clone(), Value::from("Spamalot"))])
            .filter(name.eq("Pythonistas"))
            .querystring()
            .unwrap()
            .compile(band.sql_writer());
        assert_eq!(compiled.sql, r#"UPDATE "band" SET name = $1 WHERE name = $2"#);
        assert_eq!(
            compiled.values,
            [Value::from("Spamalot"), Value::from("Pythonistas")]
        );
    }

    #[test]
    fn update_raw_assignment() {
        let (_registry, _manager, band) = tables();
        let popularity = band.ref_column("popularity").unwrap();
        let compiled = band
            .update()
            .set_arg(&popularity, Unquoted("popularity + 1".into()))
            .set(&band.ref_column("name").unwrap(), "Rustaceans")
            .querystring()
            .unwrap()
            .compile(band.sql_writer());
        assert_eq!(
            compiled.sql,
            r#"UPDATE "band" SET popularity = popularity + 1, name = $1"#
        );
    }

    #[test]
    fn update_validation() {
        let (_registry, manager, band) = tables();
        assert!(matches!(band.update().querystring(), Err(Error::Usage(..))));
        let related = band.ref_column("manager.name").unwrap();
        let result = band.update().set(&related, "Guido").querystring();
        assert!(matches!(result, Err(Error::Usage(..))));
        let foreign = manager.ref_column("name").unwrap();
        let result = band.update().set(&foreign, "Guido").querystring();
        assert!(matches!(result, Err(Error::Usage(..))));
    }

    #[test]
    fn update_filtered_by_related_column() {
        let (_registry, _manager, band) = tables();
        let compiled = band
            .update()
            .set(&band.ref_column("popularity").unwrap(), 0)
            .filter(band.ref_column("manager.name").unwrap().eq("Guido"))
            .querystring()
            .unwrap()
            .compile(band.sql_writer());
        assert_eq!(
            compiled.sql,
            r#"UPDATE "band" SET popularity = $1 WHERE id IN (SELECT "band".id FROM "band" LEFT JOIN "manager" AS "band$manager" ON "band".manager = "band$manager".id WHERE "band$manager".name = $2)"#
        );
        assert_eq!(compiled.values, [Value::Int32(Some(0)), Value::from("Guido")]);
    }

    #[test]
    fn update_rejects_filters_on_other_tables() {
        let (_registry, manager, band) = tables();
        let name = band.ref_column("name").unwrap();
        let foreign = manager.ref_column("name").unwrap();
        let result = band
            .update()
            .set(&name, "Spamalot")
            .filter(foreign.eq("Guido"))
            .querystring();
        assert!(matches!(result, Err(Error::Usage(..))));
        let result = band
            .update()
            .set(&name, "Spamalot")
            .filter(name.eq("Pythonistas"))
            .filter(foreign.is_null())
            .querystring();
        assert!(matches!(result, Err(Error::Usage(..))));
    }
}
