use crate::{Column, Error, Registry, Result, Table, read, write};
use std::{
    fmt::{self, Display},
    sync::{
        Arc, RwLock,
        atomic::{AtomicBool, Ordering},
    },
};

/// Where the target of a [`LazyTableReference`] is declared.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    /// Registered under an app name.
    App(String),
    /// Declared in (or exported by) a module.
    Module(String),
}

/// Foreign key target named by class name, located when first needed.
///
/// Lets two tables reference each other, or a table reference one declared
/// later in another module, without an import cycle. The reference turns
/// ready once a matching table is declared; `resolve` works regardless and
/// loads the module when needed.
#[derive(Debug)]
pub struct LazyTableReference {
    table_class_name: String,
    locator: Locator,
    ready: AtomicBool,
}

impl LazyTableReference {
    /// Exactly one of `app_name` and `module_path` must be provided.
    pub fn new(
        table_class_name: impl Into<String>,
        app_name: Option<&str>,
        module_path: Option<&str>,
    ) -> Result<Self> {
        let table_class_name = table_class_name.into();
        let locator = match (app_name, module_path) {
            (Some(app), None) => Locator::App(app.into()),
            (None, Some(module)) => Locator::Module(module.into()),
            (None, None) => {
                return Err(Error::Configuration(format!(
                    "You must specify either app_name or module_path for the reference to {}",
                    table_class_name
                )));
            }
            (Some(..), Some(..)) => {
                return Err(Error::Configuration(format!(
                    "You must only specify one of app_name and module_path for the reference to {}",
                    table_class_name
                )));
            }
        };
        Ok(Self {
            table_class_name,
            locator,
            ready: AtomicBool::new(false),
        })
    }

    pub fn app(table_class_name: impl Into<String>, app_name: impl Into<String>) -> Self {
        Self {
            table_class_name: table_class_name.into(),
            locator: Locator::App(app_name.into()),
            ready: AtomicBool::new(false),
        }
    }

    pub fn module(table_class_name: impl Into<String>, module_path: impl Into<String>) -> Self {
        Self {
            table_class_name: table_class_name.into(),
            locator: Locator::Module(module_path.into()),
            ready: AtomicBool::new(false),
        }
    }

    pub fn table_class_name(&self) -> &str {
        &self.table_class_name
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Whether `table` is the one this reference names.
    pub fn matches(&self, table: &Table) -> bool {
        table.class_name() == self.table_class_name
            && match &self.locator {
                Locator::App(app) => table.app_name() == Some(app.as_str()),
                Locator::Module(module) => table.module_path() == Some(module.as_str()),
            }
    }

    /// Flip to ready if one of `candidates` is the target. Once ready it stays
    /// ready, further calls are no-ops returning `true`.
    pub fn mark_ready_if_match<'a>(
        &self,
        candidates: impl IntoIterator<Item = &'a Arc<Table>>,
    ) -> bool {
        if self.is_ready() {
            return true;
        }
        if candidates.into_iter().any(|table| self.matches(table)) {
            self.ready.store(true, Ordering::Release);
            log::trace!("Reference to {} is ready", self.table_class_name);
            return true;
        }
        false
    }

    /// Locate the target table, loading its module if needed.
    pub fn resolve(&self, registry: &Arc<Registry>) -> Result<Arc<Table>> {
        match &self.locator {
            Locator::App(app) => registry
                .get_table_with_name(app, &self.table_class_name)
                .map_err(|e| match e {
                    Error::Engine(..) => e,
                    e => Error::Resolution(format!(
                        "Can't resolve {} in app {}: {}",
                        self.table_class_name, app, e
                    )),
                }),
            Locator::Module(path) => {
                let module = registry.import_module(path)?;
                module.get(&self.table_class_name).cloned().ok_or_else(|| {
                    Error::Resolution(format!(
                        "Can't find a Table called {} in {}",
                        self.table_class_name, path
                    ))
                })
            }
        }
    }
}

impl Display for LazyTableReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.locator {
            Locator::App(app) => write!(f, "App {}.{}", app, self.table_class_name),
            Locator::Module(module) => write!(f, "Module {}.{}", module, self.table_class_name),
        }
    }
}

/// Every foreign key column whose target is a [`LazyTableReference`].
#[derive(Debug, Default)]
pub struct LazyColumnReferenceStore {
    foreign_key_columns: RwLock<Vec<Column>>,
}

impl LazyColumnReferenceStore {
    /// Track `column`, returns `false` when it is already tracked or not a
    /// lazy foreign key.
    pub fn register(&self, column: Column) -> bool {
        let is_lazy = column
            .foreign_key()
            .is_some_and(|fk| fk.references.lazy().is_some());
        if !is_lazy {
            return false;
        }
        let mut columns = write(&self.foreign_key_columns);
        if columns.iter().any(|c| c.same_column(&column)) {
            return false;
        }
        columns.push(column);
        true
    }

    pub fn foreign_key_columns(&self) -> Vec<Column> {
        read(&self.foreign_key_columns).clone()
    }

    /// Offer a newly declared table to every tracked reference.
    pub fn notify_ready(&self, table: &Arc<Table>) {
        for column in read(&self.foreign_key_columns).iter() {
            if let Some(reference) = column.foreign_key().and_then(|fk| fk.references.lazy()) {
                reference.mark_ready_if_match([table]);
            }
        }
    }

    /// Tracked columns referencing `table`, resolving every reference.
    pub fn columns_targeting_table(
        &self,
        registry: &Arc<Registry>,
        table: &Arc<Table>,
    ) -> Result<Vec<Column>> {
        self.columns_targeting(registry, |target| Arc::ptr_eq(target, table))
    }

    /// Tracked columns referencing a table called `tablename`, resolving every reference.
    pub fn columns_targeting_tablename(
        &self,
        registry: &Arc<Registry>,
        tablename: &str,
    ) -> Result<Vec<Column>> {
        self.columns_targeting(registry, |target| target.tablename() == tablename)
    }

    fn columns_targeting(
        &self,
        registry: &Arc<Registry>,
        predicate: impl Fn(&Arc<Table>) -> bool,
    ) -> Result<Vec<Column>> {
        // Resolution can load modules that register more columns
        let columns = self.foreign_key_columns();
        let mut result = Vec::new();
        for column in columns {
            let Some(fk) = column.foreign_key() else {
                continue;
            };
            if predicate(&fk.references.resolve(registry)?) {
                result.push(column);
            }
        }
        Ok(result)
    }
}
