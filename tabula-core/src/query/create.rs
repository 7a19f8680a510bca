use crate::{
    Arg, Context, Query, QueryString, Result, RowsAffected, Table, Value, as_bool, execute_all,
    fetch_all, single_value,
};
use std::{future::Future, sync::Arc};

/// `CREATE TABLE`, followed by a `CREATE INDEX` for each indexed column.
#[derive(Debug, Clone)]
pub struct Create {
    table: Arc<Table>,
    if_not_exists: bool,
    only_default_columns: bool,
}

impl Create {
    pub fn new(table: Arc<Table>) -> Self {
        Self {
            table,
            if_not_exists: false,
            only_default_columns: false,
        }
    }
    pub fn if_not_exists(mut self, if_not_exists: bool) -> Self {
        self.if_not_exists = if_not_exists;
        self
    }
    /// Only create the primary key column.
    pub fn only_default_columns(mut self, only_default_columns: bool) -> Self {
        self.only_default_columns = only_default_columns;
        self
    }
}

impl Query for Create {
    type Output = RowsAffected;

    fn table(&self) -> &Arc<Table> {
        &self.table
    }

    fn querystrings(&self) -> Result<Vec<QueryString>> {
        let writer = self.table.sql_writer();
        let mut context = Context::default();
        let columns = if self.only_default_columns {
            &self.table.columns()[..1]
        } else {
            self.table.columns()
        };
        let definitions = columns
            .iter()
            .map(|v| v.definition(writer).map(Arg::Nested))
            .collect::<Result<Vec<_>>>()?;
        let mut template = String::from("CREATE TABLE ");
        if self.if_not_exists {
            template.push_str("IF NOT EXISTS ");
        }
        writer.write_identifier_quoted(&mut context, &mut template, self.table.tablename());
        template.push_str(" (");
        template.push_str(&vec!["{}"; definitions.len()].join(", "));
        template.push(')');
        let mut result = vec![QueryString::new(template, definitions)?];
        for column in columns.iter().filter(|v| v.def().index) {
            let mut sql = String::from("CREATE INDEX ");
            if self.if_not_exists {
                sql.push_str("IF NOT EXISTS ");
            }
            writer.write_identifier_quoted(
                &mut context,
                &mut sql,
                &format!("{}_{}", self.table.tablename(), column.name()),
            );
            sql.push_str(" ON ");
            writer.write_identifier_quoted(&mut context, &mut sql, self.table.tablename());
            sql.push_str(" (");
            sql.push_str(column.name());
            sql.push(')');
            result.push(QueryString::text(sql));
        }
        Ok(result)
    }

    fn run(self) -> impl Future<Output = Result<Self::Output>> + Send {
        async move {
            let engine = self.table.engine()?;
            execute_all(engine.as_ref(), self.compile()?).await
        }
    }
}

/// `DROP TABLE`.
#[derive(Debug, Clone)]
pub struct DropTable {
    table: Arc<Table>,
    if_exists: bool,
    cascade: bool,
}

impl DropTable {
    pub fn new(table: Arc<Table>) -> Self {
        Self {
            table,
            if_exists: false,
            cascade: false,
        }
    }
    pub fn if_exists(mut self, if_exists: bool) -> Self {
        self.if_exists = if_exists;
        self
    }
    /// Also drop what depends on the table, ignored by engines without support.
    pub fn cascade(mut self, cascade: bool) -> Self {
        self.cascade = cascade;
        self
    }
}

impl Query for DropTable {
    type Output = RowsAffected;

    fn table(&self) -> &Arc<Table> {
        &self.table
    }

    fn querystrings(&self) -> Result<Vec<QueryString>> {
        let writer = self.table.sql_writer();
        let mut sql = String::from("DROP TABLE ");
        if self.if_exists {
            sql.push_str("IF EXISTS ");
        }
        writer.write_identifier_quoted(&mut Context::default(), &mut sql, self.table.tablename());
        if self.cascade && writer.drops_cascade() {
            sql.push_str(" CASCADE");
        }
        Ok(vec![QueryString::text(sql)])
    }

    fn run(self) -> impl Future<Output = Result<Self::Output>> + Send {
        async move {
            let engine = self.table.engine()?;
            execute_all(engine.as_ref(), self.compile()?).await
        }
    }
}

/// Whether the table exists in the database.
#[derive(Debug, Clone)]
pub struct TableExists {
    table: Arc<Table>,
}

impl TableExists {
    pub fn new(table: Arc<Table>) -> Self {
        Self { table }
    }
}

impl Query for TableExists {
    type Output = bool;

    fn table(&self) -> &Arc<Table> {
        &self.table
    }

    fn querystrings(&self) -> Result<Vec<QueryString>> {
        Ok(vec![QueryString::new(
            self.table.sql_writer().table_exists_template(),
            [Arg::Value(Value::Varchar(Some(
                self.table.tablename().to_owned(),
            )))],
        )?])
    }

    fn run(self) -> impl Future<Output = Result<Self::Output>> + Send {
        async move {
            let engine = self.table.engine()?;
            let mut queries = self.compile()?;
            let rows = match queries.pop() {
                Some(query) => fetch_all(engine.as_ref(), query).await?,
                None => Vec::new(),
            };
            as_bool(single_value(&rows, "exists")?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Action, ColumnDef, Config, EngineType, Error, LazyTableReference, Registry};
    use indoc::indoc;

    #[test]
    fn create_table() {
        let registry = Registry::new();
        let manager = Table::builder("Manager")
            .column("name", ColumnDef::varchar(50).unique(true).index(true))
            .build(&registry)
            .unwrap();
        let band = Table::builder("Band")
            .column("name", ColumnDef::varchar(50))
            .column("manager", ColumnDef::foreign_key(&manager).on_delete(Action::SetNull))
            .column("popularity", ColumnDef::integer().default(100))
            .build(&registry)
            .unwrap();

        let queries = manager.create().if_not_exists(true).compile().unwrap();
        assert_eq!(queries.len(), 2);
        assert_eq!(
            queries[0].sql,
            r#"CREATE TABLE IF NOT EXISTS "manager" (id SERIAL PRIMARY KEY, name VARCHAR(50) UNIQUE NOT NULL DEFAULT '')"#
        );
        assert_eq!(
            queries[1].sql,
            r#"CREATE INDEX IF NOT EXISTS "manager_name" ON "manager" (name)"#
        );

        let queries = band.create().compile().unwrap();
        assert_eq!(
            queries[0].sql,
            indoc! {r#"
                CREATE TABLE "band" (id SERIAL PRIMARY KEY, name VARCHAR(50) NOT NULL DEFAULT '', manager INTEGER REFERENCES "manager" (id) ON DELETE SET NULL ON UPDATE CASCADE, popularity INTEGER NOT NULL DEFAULT 100)
            "#}
            .trim()
        );
        assert!(queries[0].values.is_empty());

        let queries = band.create_without_columns().compile().unwrap();
        assert_eq!(queries[0].sql, r#"CREATE TABLE "band" (id SERIAL PRIMARY KEY)"#);
    }

    #[test]
    fn create_with_unresolved_reference() {
        let registry = Registry::new();
        let band = Table::builder("Band")
            .column(
                "manager",
                ColumnDef::foreign_key(LazyTableReference::module("Manager", "music.tables")),
            )
            .build(&registry)
            .unwrap();
        assert!(matches!(band.create().compile(), Err(Error::Resolution(..))));
    }

    #[test]
    fn drop_and_exists() {
        let registry = Registry::new();
        let band = Table::builder("Band").build(&registry).unwrap();
        let queries = band.drop().if_exists(true).cascade(true).compile().unwrap();
        assert_eq!(queries[0].sql, r#"DROP TABLE IF EXISTS "band" CASCADE"#);
        let queries = band.table_exists().compile().unwrap();
        assert_eq!(
            queries[0].sql,
            r#"SELECT EXISTS(SELECT * FROM information_schema.tables WHERE table_name = $1) AS "exists""#
        );
        assert_eq!(queries[0].values, [Value::from("band")]);

        let registry = Registry::with_config(Config::new().engine_type(EngineType::Sqlite));
        let band = Table::builder("Band").build(&registry).unwrap();
        let queries = band.drop().cascade(true).compile().unwrap();
        assert_eq!(queries[0].sql, r#"DROP TABLE "band""#);
        let queries = band.create().compile().unwrap();
        assert_eq!(queries[0].sql, r#"CREATE TABLE "band" (id INTEGER PRIMARY KEY)"#);
    }
}
