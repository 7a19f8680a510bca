use crate::{
    Action, Arg, Column, ColumnDef, ColumnDefault, ColumnType, Context, Error, Query,
    QueryString, Result, RowsAffected, SqlWriter, Table, Unquoted, Value, escape_braces,
    execute_all, fetch_all, is_valid_name,
};
use std::{future::Future, sync::Arc};

/// A column given either by handle or by name.
pub trait ColumnName {
    fn column_name(&self) -> &str;
    /// Declared type, when known.
    fn declared_type(&self) -> Option<&ColumnType> {
        None
    }
}

impl ColumnName for str {
    fn column_name(&self) -> &str {
        self
    }
}

impl ColumnName for String {
    fn column_name(&self) -> &str {
        self
    }
}

impl ColumnName for Column {
    fn column_name(&self) -> &str {
        self.name()
    }
    fn declared_type(&self) -> Option<&ColumnType> {
        Some(self.column_type())
    }
}

impl<T: ColumnName + ?Sized> ColumnName for &T {
    fn column_name(&self) -> &str {
        (**self).column_name()
    }
    fn declared_type(&self) -> Option<&ColumnType> {
        (**self).declared_type()
    }
}

#[derive(Debug, Clone)]
enum Alteration {
    AddColumn(Column),
    RenameColumn {
        column: String,
        new_name: String,
    },
    RenameTable(String),
    DropColumn(String),
    DropDefault(String),
    Unique {
        column: String,
        unique: bool,
    },
    Null {
        column: String,
        null: bool,
    },
    SetLength {
        column: String,
        length: u32,
    },
    SetDefault {
        column: String,
        value: Value,
    },
    SetDigits {
        column: String,
        digits: Option<(u8, u8)>,
    },
    DropConstraint(String),
    AddForeignKeyConstraint {
        constraint_name: String,
        column: String,
        referenced_table_name: String,
        referenced_column_name: String,
        on_delete: Option<Action>,
        on_update: Option<Action>,
    },
}

impl Alteration {
    /// Position of the alteration kind inside the statement.
    fn rank(&self) -> u8 {
        match self {
            Alteration::AddColumn(..) => 0,
            Alteration::RenameColumn { .. } => 1,
            Alteration::RenameTable(..) => 2,
            Alteration::DropColumn(..) => 3,
            Alteration::DropDefault(..) => 4,
            Alteration::Unique { .. } => 5,
            Alteration::Null { .. } => 6,
            Alteration::SetLength { .. } => 7,
            Alteration::SetDefault { .. } => 8,
            Alteration::SetDigits { .. } => 9,
            Alteration::DropConstraint(..) => 10,
            Alteration::AddForeignKeyConstraint { .. } => 11,
        }
    }

    fn querystring(&self, table: &Table, writer: &dyn SqlWriter) -> Result<QueryString> {
        let mut context = Context::default();
        let mut sql = String::with_capacity(64);
        match self {
            Alteration::AddColumn(column) => {
                return QueryString::new("ADD COLUMN {}", [Arg::Nested(column.definition(writer)?)]);
            }
            Alteration::RenameColumn { column, new_name } => {
                sql.push_str(&format!("RENAME COLUMN {column} TO {new_name}"));
            }
            Alteration::RenameTable(new_name) => {
                sql.push_str("RENAME TO ");
                writer.write_identifier_quoted(&mut context, &mut sql, new_name);
            }
            Alteration::DropColumn(column) => {
                sql.push_str(&format!("DROP COLUMN {column}"));
            }
            Alteration::DropDefault(column) => {
                sql.push_str(&format!("ALTER COLUMN {column} DROP DEFAULT"));
            }
            Alteration::Unique { column, unique: true } => {
                sql.push_str(&format!("ADD UNIQUE ({column})"));
            }
            Alteration::Unique {
                column,
                unique: false,
            } => {
                sql.push_str("DROP CONSTRAINT ");
                let key = format!("{}_{}_key", table.tablename(), column);
                writer.write_identifier_quoted(&mut context, &mut sql, &key);
            }
            Alteration::Null { column, null } => {
                sql.push_str(&format!(
                    "ALTER COLUMN {column} {} NOT NULL",
                    if *null { "DROP" } else { "SET" }
                ));
            }
            Alteration::SetLength { column, length } => {
                sql.push_str(&format!("ALTER COLUMN {column} TYPE "));
                writer.write_column_type(&mut context, &mut sql, &ColumnType::Varchar(*length));
            }
            Alteration::SetDefault { column, value } => {
                let mut literal = String::new();
                writer.write_value(&mut Context::inlined(), &mut literal, value);
                return QueryString::new(
                    format!("ALTER COLUMN {column} SET DEFAULT {{}}"),
                    [Arg::Unquoted(Unquoted(literal))],
                );
            }
            Alteration::SetDigits { column, digits } => {
                sql.push_str(&format!("ALTER COLUMN {column} TYPE "));
                writer.write_column_type(&mut context, &mut sql, &ColumnType::Numeric(*digits));
            }
            Alteration::DropConstraint(name) => {
                sql.push_str("DROP CONSTRAINT IF EXISTS ");
                writer.write_identifier_quoted(&mut context, &mut sql, name);
            }
            Alteration::AddForeignKeyConstraint {
                constraint_name,
                column,
                referenced_table_name,
                referenced_column_name,
                on_delete,
                on_update,
            } => {
                sql.push_str("ADD CONSTRAINT ");
                writer.write_identifier_quoted(&mut context, &mut sql, constraint_name);
                sql.push_str(&format!(" FOREIGN KEY ({column}) REFERENCES "));
                writer.write_identifier_quoted(&mut context, &mut sql, referenced_table_name);
                sql.push_str(&format!(" ({referenced_column_name})"));
                if let Some(action) = on_delete {
                    sql.push_str(" ON DELETE ");
                    writer.write_action(&mut context, &mut sql, action);
                }
                if let Some(action) = on_update {
                    sql.push_str(" ON UPDATE ");
                    writer.write_action(&mut context, &mut sql, action);
                }
            }
        }
        Ok(QueryString::text(sql))
    }
}

/// `ALTER TABLE`.
///
/// Engines able to batch get one statement with comma separated
/// alterations, the others one statement per alteration. Running it also
/// fills the columns it adds with their default on the existing rows.
///
/// ```rust
/// use tabula_core::{ColumnDef, Query, Registry, Table};
/// let registry = Registry::new();
/// let band = Table::builder("Band")
///     .column("popularity", ColumnDef::integer())
///     .build(&registry)
///     .unwrap();
/// let queries = band
///     .alter()
///     .rename_column("popularity", "rating")
///     .set_null("rating", true)
///     .compile()
///     .unwrap();
/// assert_eq!(
///     queries[0].sql,
///     r#"ALTER TABLE "band" RENAME COLUMN popularity TO rating, ALTER COLUMN rating DROP NOT NULL"#
/// );
/// ```
#[derive(Debug, Clone)]
pub struct Alter {
    table: Arc<Table>,
    alterations: Vec<Alteration>,
    drop_table: Option<bool>,
    errors: Vec<String>,
}

impl Alter {
    pub fn new(table: Arc<Table>) -> Self {
        Self {
            table,
            alterations: Vec::new(),
            drop_table: None,
            errors: Vec::new(),
        }
    }

    fn push(mut self, alteration: Alteration) -> Self {
        self.alterations.push(alteration);
        self
    }

    fn check_name(&mut self, name: &str) {
        if !is_valid_name(name) {
            self.errors.push(format!("`{name}` is not a valid name"));
        }
    }

    fn column_name(&mut self, column: impl ColumnName) -> String {
        let name = column.column_name().to_owned();
        self.check_name(&name);
        name
    }

    pub fn add_column(mut self, name: impl Into<String>, column: ColumnDef) -> Self {
        let name = name.into();
        self.check_name(&name);
        let column = Column::stamp(
            name,
            column,
            Arc::downgrade(&self.table),
            self.table.tablename(),
            false,
        );
        self.push(Alteration::AddColumn(column))
    }

    pub fn drop_column(mut self, column: impl ColumnName) -> Self {
        let column = self.column_name(column);
        self.push(Alteration::DropColumn(column))
    }

    pub fn drop_default(mut self, column: impl ColumnName) -> Self {
        let column = self.column_name(column);
        self.push(Alteration::DropDefault(column))
    }

    /// Replace the whole statement with a `DROP TABLE`.
    pub fn drop_table(mut self, cascade: bool) -> Self {
        self.drop_table = Some(cascade);
        self
    }

    /// Only the last rename is kept.
    pub fn rename_table(mut self, new_name: impl Into<String>) -> Self {
        let new_name = new_name.into();
        self.check_name(&new_name);
        self.alterations
            .retain(|v| !matches!(v, Alteration::RenameTable(..)));
        self.push(Alteration::RenameTable(new_name))
    }

    pub fn rename_column(mut self, column: impl ColumnName, new_name: impl Into<String>) -> Self {
        let column = self.column_name(column);
        let new_name = new_name.into();
        self.check_name(&new_name);
        self.push(Alteration::RenameColumn { column, new_name })
    }

    pub fn set_default(mut self, column: impl ColumnName, value: impl Into<Value>) -> Self {
        let column = self.column_name(column);
        self.push(Alteration::SetDefault {
            column,
            value: value.into(),
        })
    }

    pub fn set_null(mut self, column: impl ColumnName, null: bool) -> Self {
        let column = self.column_name(column);
        self.push(Alteration::Null { column, null })
    }

    pub fn set_unique(mut self, column: impl ColumnName, unique: bool) -> Self {
        let column = self.column_name(column);
        self.push(Alteration::Unique { column, unique })
    }

    /// Change the length of a varchar column. Skipped on engines that can't
    /// change column types.
    pub fn set_length(mut self, column: impl ColumnName, length: u32) -> Self {
        if !self.table.sql_writer().alters_column_types() {
            log::warn!(
                "{} doesn't support changes in length, skipping `{}`",
                self.table.engine_type(),
                column.column_name()
            );
            return self;
        }
        if let Some(column_type) = column.declared_type() {
            if !matches!(column_type, ColumnType::Varchar(..)) {
                self.errors.push(format!(
                    "Only varchar columns can have their length changed, `{}` is {:?}",
                    column.column_name(),
                    column_type
                ));
            }
        }
        let column = self.column_name(column);
        self.push(Alteration::SetLength { column, length })
    }

    /// Change precision and scale of a numeric column.
    pub fn set_digits(mut self, column: impl ColumnName, digits: Option<(u8, u8)>) -> Self {
        let column = self.column_name(column);
        self.push(Alteration::SetDigits { column, digits })
    }

    pub fn drop_constraint(mut self, constraint_name: impl Into<String>) -> Self {
        let constraint_name = constraint_name.into();
        self.check_name(&constraint_name);
        self.push(Alteration::DropConstraint(constraint_name))
    }

    fn constraint_name(&self, column: &str) -> String {
        format!("{}_{}_fk", self.table.tablename(), column)
    }

    pub fn drop_foreign_key_constraint(mut self, column: impl ColumnName) -> Self {
        let column = self.column_name(column);
        let name = self.constraint_name(&column);
        self.drop_constraint(name)
    }

    pub fn add_foreign_key_constraint(
        mut self,
        column: impl ColumnName,
        referenced_table_name: impl Into<String>,
        on_delete: Option<Action>,
        on_update: Option<Action>,
        referenced_column_name: impl Into<String>,
    ) -> Self {
        let column = self.column_name(column);
        let referenced_table_name = referenced_table_name.into();
        let referenced_column_name = referenced_column_name.into();
        self.check_name(&referenced_table_name);
        self.check_name(&referenced_column_name);
        let constraint_name = self.constraint_name(&column);
        self.push(Alteration::AddForeignKeyConstraint {
            constraint_name,
            column,
            referenced_table_name,
            referenced_column_name,
            on_delete,
            on_update,
        })
    }

    fn added_columns(&self) -> Vec<Column> {
        if self.drop_table.is_some() {
            return Vec::new();
        }
        self.alterations
            .iter()
            .filter_map(|v| match v {
                Alteration::AddColumn(column) if column.has_default() => Some(column.clone()),
                _ => None,
            })
            .collect()
    }

    /// Give the existing rows the default of the added columns. Static
    /// defaults are set with one update per column, callable ones row by row.
    async fn backfill(&self, columns: Vec<Column>) -> Result<RowsAffected> {
        let engine = self.table.engine()?;
        let writer = engine.sql_writer();
        let statics = columns
            .iter()
            .all(|v| matches!(v.def().default, Some(ColumnDefault::Value(..))));
        let mut queries = Vec::new();
        if statics {
            for column in &columns {
                queries.push(
                    self.table
                        .update()
                        .set(column, column.default_value())
                        .querystring()?
                        .compile(writer),
                );
            }
        } else {
            let primary_key = self.table.primary_key();
            let ids = self.table.select().columns([primary_key.clone()]).querystring()?;
            let rows = fetch_all(engine.as_ref(), ids.compile(writer)).await?;
            for row in rows {
                let id = row.get_column(primary_key.name()).cloned().unwrap_or_default();
                for column in &columns {
                    queries.push(
                        self.table
                            .update()
                            .set(column, column.default_value())
                            .filter(primary_key.eq(id.clone()))
                            .querystring()?
                            .compile(writer),
                    );
                }
            }
        }
        log::debug!(
            "Setting the default of {} added columns in {}",
            columns.len(),
            self.table.tablename()
        );
        execute_all(engine.as_ref(), queries).await
    }
}

impl Query for Alter {
    type Output = RowsAffected;

    fn table(&self) -> &Arc<Table> {
        &self.table
    }

    fn querystrings(&self) -> Result<Vec<QueryString>> {
        if let Some(error) = self.errors.first() {
            return Err(Error::Usage(error.clone()));
        }
        let writer = self.table.sql_writer();
        let mut context = Context::default();
        if let Some(cascade) = self.drop_table {
            return self.table.drop().cascade(cascade).querystrings();
        }
        if self.alterations.is_empty() {
            return Err(Error::Usage(format!(
                "No alteration was specified for {}",
                self.table.class_name()
            )));
        }
        // Backfills address the table by its current name
        let renames = self
            .alterations
            .iter()
            .any(|v| matches!(v, Alteration::RenameTable(..)));
        if renames && !self.added_columns().is_empty() {
            return Err(Error::Usage(format!(
                "Rename {} separately from adding columns with a default",
                self.table.class_name()
            )));
        }
        let mut alterations: Vec<&Alteration> = self.alterations.iter().collect();
        alterations.sort_by_key(|v| v.rank());
        let parts = alterations
            .into_iter()
            .map(|v| v.querystring(&self.table, writer).map(Arg::Nested))
            .collect::<Result<Vec<_>>>()?;
        let mut head = String::from("ALTER TABLE ");
        writer.write_identifier_quoted(&mut context, &mut head, self.table.tablename());
        let head = escape_braces(&head);
        if writer.batches_alterations() {
            let template = format!("{} {}", head, vec!["{}"; parts.len()].join(", "));
            Ok(vec![QueryString::new(template, parts)?])
        } else {
            parts
                .into_iter()
                .map(|v| QueryString::new(format!("{head} {{}}"), [v]))
                .collect()
        }
    }

    fn run(self) -> impl Future<Output = Result<Self::Output>> + Send {
        async move {
            let engine = self.table.engine()?;
            let mut result = execute_all(engine.as_ref(), self.compile()?).await?;
            let added = self.added_columns();
            if !added.is_empty() {
                result.extend([self.backfill(added).await?]);
            }
            Ok(result)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Config, EngineType, Registry};

    fn band(registry: &Arc<crate::Registry>) -> Arc<Table> {
        Table::builder("Band")
            .column("name", ColumnDef::varchar(50))
            .column("popularity", ColumnDef::integer())
            .column("rating", ColumnDef::numeric(Some((5, 2))))
            .build(registry)
            .unwrap()
    }

    #[test]
    fn batched_alterations_in_fixed_order() {
        let registry = Registry::new();
        let band = band(&registry);
        let name = band.ref_column("name").unwrap();
        let queries = band
            .alter()
            .set_default(&name, "Unknown")
            .drop_column("rating")
            .add_column("members", ColumnDef::integer().default(4))
            .set_unique(&name, false)
            .set_length(&name, 100)
            .drop_foreign_key_constraint("manager")
            .compile()
            .unwrap();
        assert_eq!(queries.len(), 1);
        assert_eq!(
            queries[0].sql,
            concat!(
                r#"ALTER TABLE "band" ADD COLUMN members INTEGER NOT NULL DEFAULT 4, "#,
                r#"DROP COLUMN rating, DROP CONSTRAINT "band_name_key", "#,
                r#"ALTER COLUMN name TYPE VARCHAR(100), ALTER COLUMN name SET DEFAULT 'Unknown', "#,
                r#"DROP CONSTRAINT IF EXISTS "band_manager_fk""#,
            )
        );
        assert!(queries[0].values.is_empty());
    }

    #[test]
    fn single_alterations() {
        let registry = Registry::new();
        let band = band(&registry);
        let sql = |alter: Alter| alter.compile().unwrap().remove(0).sql;
        assert_eq!(
            sql(band.alter().rename_table("musical_group").rename_table("group")),
            r#"ALTER TABLE "band" RENAME TO "group""#
        );
        assert_eq!(
            sql(band.alter().drop_default("popularity")),
            r#"ALTER TABLE "band" ALTER COLUMN popularity DROP DEFAULT"#
        );
        assert_eq!(
            sql(band.alter().set_null("name", false).set_unique("name", true)),
            r#"ALTER TABLE "band" ADD UNIQUE (name), ALTER COLUMN name SET NOT NULL"#
        );
        assert_eq!(
            sql(band.alter().set_digits("rating", Some((8, 3)))),
            r#"ALTER TABLE "band" ALTER COLUMN rating TYPE NUMERIC(8, 3)"#
        );
        assert_eq!(
            sql(band.alter().add_foreign_key_constraint(
                "manager",
                "manager",
                Some(Action::Cascade),
                None,
                "id"
            )),
            r#"ALTER TABLE "band" ADD CONSTRAINT "band_manager_fk" FOREIGN KEY (manager) REFERENCES "manager" (id) ON DELETE CASCADE"#
        );
        assert_eq!(
            sql(band.alter().drop_column("name").drop_table(true)),
            r#"DROP TABLE "band" CASCADE"#
        );
    }

    #[test]
    fn alter_validation() {
        let registry = Registry::new();
        let band = band(&registry);
        assert!(matches!(band.alter().compile(), Err(Error::Usage(..))));
        let popularity = band.ref_column("popularity").unwrap();
        assert!(matches!(
            band.alter().set_length(&popularity, 10).compile(),
            Err(Error::Usage(..))
        ));
        assert!(matches!(
            band.alter().rename_column("name", "full name").compile(),
            Err(Error::Usage(..))
        ));
    }

    #[test]
    fn existing_column_names_are_validated() {
        let registry = Registry::new();
        let band = band(&registry);
        let invalid = "name; DROP TABLE band";
        let alterations = [
            band.alter().drop_column(invalid),
            band.alter().drop_default(invalid),
            band.alter().rename_column(invalid, "title"),
            band.alter().set_default("name {}", "Unknown"),
            band.alter().set_null(invalid, true),
            band.alter().set_unique(invalid, true),
            band.alter().set_length(invalid, 10),
            band.alter().set_digits(invalid, None),
            band.alter().drop_constraint(invalid),
            band.alter().drop_foreign_key_constraint(invalid),
            band.alter()
                .add_foreign_key_constraint(invalid, "manager", None, None, "id"),
            band.alter()
                .add_foreign_key_constraint("manager", invalid, None, None, "id"),
            band.alter()
                .add_foreign_key_constraint("manager", "manager", None, None, invalid),
        ];
        for alter in alterations {
            assert!(matches!(alter.compile(), Err(Error::Usage(..))));
        }
    }

    #[test]
    fn rename_table_with_backfilled_columns() {
        let registry = Registry::new();
        let band = band(&registry);
        assert!(matches!(
            band.alter()
                .rename_table("musical_group")
                .add_column("members", ColumnDef::integer().default(4))
                .compile(),
            Err(Error::Usage(..))
        ));
        let queries = band
            .alter()
            .rename_table("musical_group")
            .drop_column("rating")
            .compile()
            .unwrap();
        assert_eq!(
            queries[0].sql,
            r#"ALTER TABLE "band" RENAME TO "musical_group", DROP COLUMN rating"#
        );
    }

    #[test]
    fn sqlite_one_statement_each() {
        let registry = Registry::with_config(Config::new().engine_type(EngineType::Sqlite));
        let band = band(&registry);
        let queries = band
            .alter()
            .add_column("members", ColumnDef::integer())
            .set_length("name", 100)
            .drop_column("rating")
            .compile()
            .unwrap();
        let sql: Vec<_> = queries.iter().map(|v| v.sql.as_str()).collect();
        assert_eq!(
            sql,
            [
                r#"ALTER TABLE "band" ADD COLUMN members INTEGER NOT NULL DEFAULT 0"#,
                r#"ALTER TABLE "band" DROP COLUMN rating"#,
            ]
        );
    }
}
