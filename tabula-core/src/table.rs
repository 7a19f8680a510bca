use crate::{
    Alter, Column, ColumnDef, Config, Count, Create, Delete, DropTable, Engine, EngineType,
    Error, Exists, Insert, Objects, QueryString, Raw, Record, Registry, Result, Select,
    SqlWriter, TableExists, Update, is_valid_name,
};
use convert_case::{Case, Casing};
use std::{
    collections::HashSet,
    fmt::{self, Debug},
    sync::{Arc, Weak},
};

/// Name of the implicit primary key every table gets.
pub const PRIMARY_KEY_NAME: &str = "id";

/// A declared table: its names, its columns and where it lives.
///
/// Built once through [`TableBuilder`] and shared as `Arc<Table>`. Every
/// query builder starts from here.
pub struct Table {
    class_name: String,
    tablename: String,
    module_path: Option<String>,
    app_name: Option<String>,
    tags: Vec<String>,
    help_text: Option<String>,
    columns: Vec<Column>,
    engine: Option<Arc<dyn Engine>>,
    registry: Weak<Registry>,
}

impl Table {
    pub fn builder(class_name: impl Into<String>) -> TableBuilder {
        TableBuilder::new(class_name)
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }
    pub fn tablename(&self) -> &str {
        &self.tablename
    }
    pub fn module_path(&self) -> Option<&str> {
        self.module_path.as_deref()
    }
    pub fn app_name(&self) -> Option<&str> {
        self.app_name.as_deref()
    }
    pub fn tags(&self) -> &[String] {
        &self.tags
    }
    pub fn help_text(&self) -> Option<&str> {
        self.help_text.as_deref()
    }
    /// All columns, primary key first then in declaration order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }
    /// Columns other than the primary key.
    pub fn non_default_columns(&self) -> &[Column] {
        &self.columns[1..]
    }
    pub fn primary_key(&self) -> &Column {
        &self.columns[0]
    }

    pub fn registry(&self) -> Result<Arc<Registry>> {
        self.registry.upgrade().ok_or_else(|| {
            Error::Resolution(format!(
                "The registry of table {} was dropped",
                self.class_name
            ))
        })
    }

    fn config(&self) -> Config {
        self.registry
            .upgrade()
            .map(|v| v.config())
            .unwrap_or_default()
    }

    /// Engine of the table, or the default one of the registry.
    pub fn engine(&self) -> Result<Arc<dyn Engine>> {
        if let Some(engine) = &self.engine {
            return Ok(engine.clone());
        }
        self.config().default_engine().cloned().ok_or_else(|| {
            Error::Configuration(format!(
                "No engine configured for table {}",
                self.class_name
            ))
        })
    }

    pub fn engine_type(&self) -> EngineType {
        match &self.engine {
            Some(engine) => engine.engine_type(),
            None => self.config().default_engine_type(),
        }
    }

    pub fn sql_writer(&self) -> &'static dyn SqlWriter {
        self.engine_type().sql_writer()
    }

    pub fn get_column_by_name(&self, name: &str) -> Result<Column> {
        self.columns
            .iter()
            .find(|c| c.name() == name)
            .cloned()
            .ok_or_else(|| {
                Error::Usage(format!(
                    "No matching column found with name == {name} in {}",
                    self.class_name
                ))
            })
    }

    /// Column reached by a dotted path following foreign keys, like
    /// `"manager.country.name"`.
    pub fn ref_column(&self, path: &str) -> Result<Column> {
        let mut names = path.split('.');
        let first = names.next().unwrap_or_default();
        let mut column = self.get_column_by_name(first)?;
        for name in names {
            column = column.join(name)?;
        }
        Ok(column)
    }

    pub fn select(self: &Arc<Self>) -> Select {
        Select::new(self.clone())
    }
    pub fn objects(self: &Arc<Self>) -> Objects {
        Objects::new(self.clone())
    }
    pub fn count(self: &Arc<Self>) -> Count {
        Count::new(self.clone())
    }
    pub fn exists(self: &Arc<Self>) -> Exists {
        Exists::new(self.clone())
    }
    pub fn insert(self: &Arc<Self>, rows: impl IntoIterator<Item = Record>) -> Insert {
        Insert::new(self.clone()).add(rows)
    }
    pub fn update(self: &Arc<Self>) -> Update {
        Update::new(self.clone())
    }
    pub fn delete(self: &Arc<Self>) -> Delete {
        Delete::new(self.clone())
    }
    pub fn create(self: &Arc<Self>) -> Create {
        Create::new(self.clone())
    }
    /// Create the table with the primary key only.
    pub fn create_without_columns(self: &Arc<Self>) -> Create {
        Create::new(self.clone()).only_default_columns(true)
    }
    pub fn drop(self: &Arc<Self>) -> DropTable {
        DropTable::new(self.clone())
    }
    pub fn alter(self: &Arc<Self>) -> Alter {
        Alter::new(self.clone())
    }
    pub fn table_exists(self: &Arc<Self>) -> TableExists {
        TableExists::new(self.clone())
    }
    pub fn raw(self: &Arc<Self>, query: QueryString) -> Raw {
        Raw::new(self.clone(), query)
    }
}

impl Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("class_name", &self.class_name)
            .field("tablename", &self.tablename)
            .field("module_path", &self.module_path)
            .field("app_name", &self.app_name)
            .field("tags", &self.tags)
            .field("columns", &self.columns)
            .finish()
    }
}

/// Declaration of a table.
///
/// ```rust
/// use tabula_core::{ColumnDef, Registry, Table};
/// let registry = Registry::new();
/// let band = Table::builder("Band")
///     .module("music.tables")
///     .column("name", ColumnDef::varchar(50))
///     .column("popularity", ColumnDef::integer())
///     .build(&registry)
///     .unwrap();
/// assert_eq!(band.tablename(), "band");
/// assert_eq!(band.columns()[0].name(), "id");
/// ```
#[derive(Default)]
pub struct TableBuilder {
    class_name: String,
    tablename: Option<String>,
    module_path: Option<String>,
    app_name: Option<String>,
    tags: Vec<String>,
    help_text: Option<String>,
    columns: Vec<(String, ColumnDef)>,
    engine: Option<Arc<dyn Engine>>,
}

impl TableBuilder {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            ..Default::default()
        }
    }
    /// Override the name derived from the class name.
    pub fn tablename(mut self, tablename: impl Into<String>) -> Self {
        self.tablename = Some(tablename.into());
        self
    }
    pub fn module(mut self, module_path: impl Into<String>) -> Self {
        self.module_path = Some(module_path.into());
        self
    }
    pub fn app(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
    pub fn help_text(mut self, help_text: impl Into<String>) -> Self {
        self.help_text = Some(help_text.into());
        self
    }
    pub fn engine(mut self, engine: Arc<dyn Engine>) -> Self {
        self.engine = Some(engine);
        self
    }
    pub fn column(mut self, name: impl Into<String>, column: ColumnDef) -> Self {
        self.columns.push((name.into(), column));
        self
    }

    /// Finalize the declaration and register the table.
    pub fn build(self, registry: &Arc<Registry>) -> Result<Arc<Table>> {
        let tablename = self
            .tablename
            .unwrap_or_else(|| self.class_name.to_case(Case::Snake));
        if !is_valid_name(&tablename) {
            return Err(Error::Schema(format!(
                "`{tablename}` is not a valid table name"
            )));
        }
        let mut names = HashSet::from([PRIMARY_KEY_NAME]);
        for (name, _) in &self.columns {
            if !is_valid_name(name) {
                return Err(Error::Schema(format!(
                    "`{name}` is not a valid column name in {}",
                    self.class_name
                )));
            }
            if !names.insert(name.as_str()) {
                return Err(Error::Schema(format!(
                    "The column `{name}` is declared more than once in {}",
                    self.class_name
                )));
            }
        }
        let table = Arc::new_cyclic(|weak: &Weak<Table>| {
            let mut columns = Vec::with_capacity(self.columns.len() + 1);
            columns.push(Column::stamp(
                PRIMARY_KEY_NAME,
                ColumnDef::serial().null(false),
                weak.clone(),
                &tablename,
                true,
            ));
            columns.extend(self.columns.into_iter().map(|(name, def)| {
                Column::stamp(name, def, weak.clone(), &tablename, false)
            }));
            Table {
                class_name: self.class_name,
                tablename: tablename.clone(),
                module_path: self.module_path,
                app_name: self.app_name,
                tags: self.tags,
                help_text: self.help_text,
                columns,
                engine: self.engine,
                registry: Arc::downgrade(registry),
            }
        });
        registry.register_table(&table)?;
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ColumnType, LazyTableReference};

    #[test]
    fn bootstrap() {
        let registry = Registry::new();
        let table = Table::builder("MusicBand")
            .column("name", ColumnDef::varchar(50))
            .column("popularity", ColumnDef::integer())
            .column("active", ColumnDef::boolean())
            .build(&registry)
            .unwrap();
        assert_eq!(table.tablename(), "music_band");
        let names: Vec<_> = table.columns().iter().map(Column::name).collect();
        assert_eq!(names, ["id", "name", "popularity", "active"]);
        assert!(matches!(table.primary_key().column_type(), ColumnType::Serial));
        assert!(table.primary_key().is_primary_key());
        assert_eq!(table.non_default_columns().len(), 3);
        for column in table.columns() {
            assert_eq!(column.tablename(), "music_band");
            assert!(Arc::ptr_eq(&column.table().unwrap(), &table));
        }
        assert_eq!(registry.tables().len(), 1);
    }

    #[test]
    fn duplicate_columns() {
        let registry = Registry::new();
        let result = Table::builder("Band")
            .column("name", ColumnDef::varchar(50))
            .column("name", ColumnDef::text())
            .build(&registry);
        assert!(matches!(result, Err(Error::Schema(..))));
        let result = Table::builder("Band")
            .column("id", ColumnDef::integer())
            .build(&registry);
        assert!(matches!(result, Err(Error::Schema(..))));
        let result = Table::builder("Band")
            .column("{name}", ColumnDef::text())
            .build(&registry);
        assert!(matches!(result, Err(Error::Schema(..))));
        assert!(registry.tables().is_empty());
    }

    #[test]
    fn tablename_override() {
        let registry = Registry::new();
        let table = Table::builder("Band")
            .tablename("bands")
            .build(&registry)
            .unwrap();
        assert_eq!(table.tablename(), "bands");
        assert_eq!(table.columns().len(), 1);
    }

    #[test]
    fn ref_column_follows_foreign_keys() {
        let registry = Registry::new();
        let country = Table::builder("Country")
            .column("name", ColumnDef::varchar(50))
            .build(&registry)
            .unwrap();
        let manager = Table::builder("Manager")
            .column("name", ColumnDef::varchar(50))
            .column("country", ColumnDef::foreign_key(&country))
            .build(&registry)
            .unwrap();
        let band = Table::builder("Band")
            .column("manager", ColumnDef::foreign_key(&manager))
            .build(&registry)
            .unwrap();
        let column = band.ref_column("manager.country.name").unwrap();
        assert_eq!(column.name(), "name");
        assert_eq!(column.tablename(), "country");
        assert_eq!(column.call_chain().len(), 2);
        assert_eq!(column.table_alias(), "band$manager$country");
        assert_eq!(column.path(), "manager.country.name");
        assert!(matches!(
            band.ref_column("manager.missing"),
            Err(Error::Usage(..))
        ));
        assert!(matches!(
            band.ref_column("id.name"),
            Err(Error::Usage(..))
        ));
    }

    #[test]
    fn lazy_reference_becomes_ready() {
        let registry = Registry::new();
        let band = Table::builder("Band")
            .module("music.tables")
            .column(
                "manager",
                ColumnDef::foreign_key(LazyTableReference::module("Manager", "music.tables")),
            )
            .build(&registry)
            .unwrap();
        let reference = band
            .get_column_by_name("manager")
            .unwrap()
            .foreign_key()
            .and_then(|fk| fk.references.lazy().cloned())
            .unwrap();
        assert!(!reference.is_ready());
        assert_eq!(registry.lazy_references().foreign_key_columns().len(), 1);
        let manager = Table::builder("Manager")
            .module("music.tables")
            .build(&registry)
            .unwrap();
        assert!(reference.is_ready());
        let targeting = registry.columns_targeting_table(&manager).unwrap();
        assert_eq!(targeting.len(), 1);
        assert_eq!(targeting[0].name(), "manager");
        assert_eq!(
            registry.columns_targeting_tablename("manager").unwrap().len(),
            1
        );
        assert!(registry.columns_targeting_tablename("band").unwrap().is_empty());
    }
}
