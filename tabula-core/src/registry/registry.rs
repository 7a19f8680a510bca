use crate::{
    AppConfig, AppRegistry, Column, Config, Error, LazyColumnReferenceStore, Result, Table, lock,
    read, write,
};
use std::{
    collections::HashMap,
    fmt::{self, Debug},
    sync::{Arc, LazyLock, Mutex, RwLock},
};

/// Declares the tables of a module when it is first imported.
pub type ModuleLoader = Arc<dyn Fn(&Arc<Registry>) -> Result<()> + Send + Sync>;

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
enum ModuleState {
    #[default]
    Unloaded,
    Loading,
    Loaded,
}

#[derive(Default)]
struct ModuleEntry {
    tables: Vec<Arc<Table>>,
    loader: Option<ModuleLoader>,
    state: ModuleState,
}

/// Snapshot of the tables reachable from a module path.
#[derive(Debug, Clone)]
pub struct Module {
    path: String,
    tables: Vec<Arc<Table>>,
}

impl Module {
    pub fn path(&self) -> &str {
        &self.path
    }
    pub fn tables(&self) -> &[Arc<Table>] {
        &self.tables
    }
    /// Table exposed under `class_name`.
    pub fn get(&self, class_name: &str) -> Option<&Arc<Table>> {
        self.tables.iter().find(|t| t.class_name() == class_name)
    }
}

/// Process wide catalogue of declared tables.
///
/// Tables are grouped by module path and app name. A module can be given a
/// loader that declares its tables on first import, which is how a lazy
/// reference pulls in a table declared elsewhere. No lock is held while a
/// loader runs, so loaders can declare tables and import other modules; a
/// module imported while it is still loading yields the tables declared so far.
pub struct Registry {
    tables: RwLock<Vec<Arc<Table>>>,
    modules: Mutex<HashMap<String, ModuleEntry>>,
    apps: RwLock<AppRegistry>,
    lazy_references: LazyColumnReferenceStore,
    config: RwLock<Config>,
    // Serializes declarations so a readiness flip is never missed
    declarations: Mutex<()>,
}

static GLOBAL: LazyLock<Arc<Registry>> = LazyLock::new(|| {
    let config = Config::from_env().unwrap_or_else(|e| {
        log::error!("{e:#}, using the default configuration");
        Config::default()
    });
    Registry::with_config(config)
});

impl Registry {
    pub fn new() -> Arc<Self> {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Arc<Self> {
        Arc::new(Self {
            tables: Default::default(),
            modules: Default::default(),
            apps: Default::default(),
            lazy_references: Default::default(),
            config: RwLock::new(config),
            declarations: Mutex::new(()),
        })
    }

    /// The registry shared by the whole process, configured from the environment.
    pub fn global() -> &'static Arc<Registry> {
        &GLOBAL
    }

    pub fn config(&self) -> Config {
        read(&self.config).clone()
    }

    pub fn configure(&self, config: Config) {
        *write(&self.config) = config;
    }

    /// Every table declared, in declaration order.
    pub fn tables(&self) -> Vec<Arc<Table>> {
        read(&self.tables).clone()
    }

    pub fn lazy_references(&self) -> &LazyColumnReferenceStore {
        &self.lazy_references
    }

    /// Register `loader` as the code declaring the tables of `path`.
    pub fn module(
        &self,
        path: impl Into<String>,
        loader: impl Fn(&Arc<Registry>) -> Result<()> + Send + Sync + 'static,
    ) -> Result<()> {
        let path = path.into();
        let mut modules = lock(&self.modules);
        let entry = modules.entry(path.clone()).or_default();
        if entry.loader.is_some() {
            return Err(Error::Configuration(format!(
                "The module `{path}` already has a loader"
            )));
        }
        entry.loader = Some(Arc::new(loader));
        Ok(())
    }

    /// Expose an already declared table from another module path.
    pub fn export(&self, path: impl Into<String>, table: &Arc<Table>) -> Result<()> {
        let path = path.into();
        let mut modules = lock(&self.modules);
        let entry = modules.entry(path.clone()).or_default();
        if entry.tables.iter().any(|t| t.class_name() == table.class_name()) {
            return Err(Error::Schema(format!(
                "The module `{path}` already exposes a table called {}",
                table.class_name()
            )));
        }
        entry.tables.push(table.clone());
        Ok(())
    }

    /// Run the loader of `path` once and return the tables it exposes.
    pub fn import_module(self: &Arc<Self>, path: &str) -> Result<Module> {
        let loader = {
            let mut modules = lock(&self.modules);
            let Some(entry) = modules.get_mut(path) else {
                return Err(Error::Resolution(format!("No module named `{path}`")));
            };
            match (&entry.loader, entry.state) {
                (Some(loader), ModuleState::Unloaded) => {
                    entry.state = ModuleState::Loading;
                    loader.clone()
                }
                _ => {
                    return Ok(Module {
                        path: path.into(),
                        tables: entry.tables.clone(),
                    });
                }
            }
        };
        log::debug!("Loading module `{path}`");
        let result = loader(self);
        let mut modules = lock(&self.modules);
        let entry = modules.entry(path.into()).or_default();
        match result {
            Ok(()) => {
                entry.state = ModuleState::Loaded;
                Ok(Module {
                    path: path.into(),
                    tables: entry.tables.clone(),
                })
            }
            Err(e) => {
                entry.state = ModuleState::Unloaded;
                log::error!("Could not load module `{path}`: {e:#}");
                Err(e)
            }
        }
    }

    /// Add an app, failing if one with the same name was already registered.
    pub fn register_app(&self, config: AppConfig) -> Result<()> {
        write(&self.apps).register(config)
    }

    pub fn get_app_config(&self, app_name: &str) -> Option<AppConfig> {
        read(&self.apps).get_app_config(app_name).cloned()
    }

    /// Every app, in registration order.
    pub fn app_configs(&self) -> Vec<AppConfig> {
        read(&self.apps).app_configs().cloned().collect()
    }

    /// Import the table modules listed by the app, if any.
    pub fn import_app_modules(self: &Arc<Self>, app_name: &str) -> Result<()> {
        let table_modules = read(&self.apps)
            .get_app_config(app_name)
            .map(|v| v.table_modules.clone())
            .unwrap_or_default();
        for module in &table_modules {
            self.import_module(module)?;
        }
        Ok(())
    }

    /// Table declared as `class_name` in the app, importing the app's table
    /// modules first.
    pub fn get_table_with_name(
        self: &Arc<Self>,
        app_name: &str,
        class_name: &str,
    ) -> Result<Arc<Table>> {
        self.import_app_modules(app_name)?;
        read(&self.apps).get_table_with_name(app_name, class_name)
    }

    /// Lazy foreign key columns pointing to `table`.
    pub fn columns_targeting_table(self: &Arc<Self>, table: &Arc<Table>) -> Result<Vec<Column>> {
        self.lazy_references.columns_targeting_table(self, table)
    }

    /// Lazy foreign key columns pointing to a table called `tablename`.
    pub fn columns_targeting_tablename(self: &Arc<Self>, tablename: &str) -> Result<Vec<Column>> {
        self.lazy_references
            .columns_targeting_tablename(self, tablename)
    }

    pub(crate) fn register_table(&self, table: &Arc<Table>) -> Result<()> {
        let _declaring = lock(&self.declarations);
        if let Some(path) = table.module_path() {
            let mut modules = lock(&self.modules);
            let entry = modules.entry(path.into()).or_default();
            if entry.tables.iter().any(|t| t.class_name() == table.class_name()) {
                return Err(Error::Schema(format!(
                    "The module `{path}` already declares a table called {}",
                    table.class_name()
                )));
            }
            entry.tables.push(table.clone());
        }
        if let Some(app) = table.app_name() {
            write(&self.apps).register_table(app, table.clone());
        }
        let tables = {
            let mut tables = write(&self.tables);
            tables.push(table.clone());
            tables.clone()
        };
        for column in table.columns() {
            if !self.lazy_references.register(column.clone()) {
                continue;
            }
            if let Some(reference) = column.foreign_key().and_then(|fk| fk.references.lazy()) {
                reference.mark_ready_if_match(&tables);
            }
        }
        self.lazy_references.notify_ready(table);
        log::trace!(
            "Declared table {} (`{}`) with {} columns",
            table.class_name(),
            table.tablename(),
            table.columns().len()
        );
        Ok(())
    }
}

impl Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field(
                "tables",
                &read(&self.tables)
                    .iter()
                    .map(|t| t.class_name().to_owned())
                    .collect::<Vec<_>>(),
            )
            .field("config", &*read(&self.config))
            .finish()
    }
}
