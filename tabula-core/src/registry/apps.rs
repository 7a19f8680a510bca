use crate::{Error, Registry, Result, Table};
use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
};

/// Tag matching every table in [`table_finder`].
pub const ALL_TAGS: &str = "__all__";

/// A named group of tables sharing migrations.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// The name of the app, for example `"music"`.
    pub app_name: String,
    /// Folder holding the migration files of the app.
    pub migrations_folder_path: String,
    /// Tables belonging to the app, in registration order.
    pub table_classes: Vec<Arc<Table>>,
    /// Apps whose migrations must run before the ones of this app.
    pub migration_dependencies: Vec<String>,
    /// Modules declaring the tables of the app, imported before a table lookup.
    pub table_modules: Vec<String>,
}

impl AppConfig {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            ..Default::default()
        }
    }
    pub fn migrations_folder_path(mut self, path: impl Into<String>) -> Self {
        self.migrations_folder_path = path.into();
        self
    }
    pub fn table(mut self, table: &Arc<Table>) -> Self {
        self.register_table(table.clone());
        self
    }
    pub fn migration_dependency(mut self, app_name: impl Into<String>) -> Self {
        self.migration_dependencies.push(app_name.into());
        self
    }
    pub fn table_module(mut self, path: impl Into<String>) -> Self {
        self.table_modules.push(path.into());
        self
    }

    pub fn register_table(&mut self, table: Arc<Table>) {
        if !self.table_classes.iter().any(|t| Arc::ptr_eq(t, &table)) {
            self.table_classes.push(table);
        }
    }

    pub fn get_table_with_name(&self, table_class_name: &str) -> Result<Arc<Table>> {
        self.table_classes
            .iter()
            .find(|t| t.class_name() == table_class_name)
            .cloned()
            .ok_or_else(|| {
                Error::Resolution(format!(
                    "No table with class name {table_class_name} exists."
                ))
            })
    }
}

#[derive(Debug)]
struct AppEntry {
    config: AppConfig,
    /// Registered explicitly, rather than created by a table naming the app.
    declared: bool,
}

/// App configurations by name.
#[derive(Debug, Default)]
pub struct AppRegistry {
    apps: Vec<AppEntry>,
}

impl AppRegistry {
    pub fn new(configs: impl IntoIterator<Item = AppConfig>) -> Result<Self> {
        let mut result = Self::default();
        for config in configs {
            result.register(config)?;
        }
        Ok(result)
    }

    /// Add `config`, tables already declared with its name are kept.
    pub fn register(&mut self, config: AppConfig) -> Result<()> {
        match self.apps.iter_mut().find(|v| v.config.app_name == config.app_name) {
            Some(entry) if entry.declared => Err(Error::Configuration(format!(
                "Multiple apps share the name `{}`",
                config.app_name
            ))),
            Some(entry) => {
                let implicit = std::mem::take(&mut entry.config.table_classes);
                entry.config = config;
                entry.declared = true;
                for table in implicit {
                    entry.config.register_table(table);
                }
                Ok(())
            }
            None => {
                self.apps.push(AppEntry {
                    config,
                    declared: true,
                });
                Ok(())
            }
        }
    }

    pub(crate) fn register_table(&mut self, app_name: &str, table: Arc<Table>) {
        match self.apps.iter_mut().find(|v| v.config.app_name == app_name) {
            Some(entry) => entry.config.register_table(table),
            None => self.apps.push(AppEntry {
                config: AppConfig::new(app_name).table(&table),
                declared: false,
            }),
        }
    }

    pub fn get_app_config(&self, app_name: &str) -> Option<&AppConfig> {
        self.apps
            .iter()
            .find(|v| v.config.app_name == app_name)
            .map(|v| &v.config)
    }

    pub fn app_configs(&self) -> impl Iterator<Item = &AppConfig> {
        self.apps.iter().map(|v| &v.config)
    }

    pub fn get_table_classes(&self, app_name: &str) -> Result<Vec<Arc<Table>>> {
        self.get_app_config(app_name)
            .map(|v| v.table_classes.clone())
            .ok_or_else(|| Error::Configuration(format!("Unrecognised app_name: {app_name}")))
    }

    pub fn get_table_with_name(&self, app_name: &str, table_class_name: &str) -> Result<Arc<Table>> {
        self.get_app_config(app_name)
            .ok_or_else(|| {
                Error::Configuration(format!("Can't find an app_config for {app_name}"))
            })?
            .get_table_with_name(table_class_name)
    }
}

/// Queries over the apps of a registry.
#[derive(Debug, Clone)]
pub struct Finder {
    registry: Arc<Registry>,
}

impl Finder {
    pub fn new(registry: &Arc<Registry>) -> Self {
        Self {
            registry: registry.clone(),
        }
    }

    /// Every app, dependencies before dependents when `sort_by_migration_dependencies`.
    pub fn get_app_configs(&self, sort_by_migration_dependencies: bool) -> Result<Vec<AppConfig>> {
        let configs = self.registry.app_configs();
        if sort_by_migration_dependencies {
            sort_app_configs(configs)
        } else {
            Ok(configs)
        }
    }

    pub fn get_app_names(&self, sort_by_migration_dependencies: bool) -> Result<Vec<String>> {
        Ok(self
            .get_app_configs(sort_by_migration_dependencies)?
            .into_iter()
            .map(|v| v.app_name)
            .collect())
    }

    pub fn get_app_config(&self, app_name: &str) -> Result<AppConfig> {
        self.registry
            .get_app_config(app_name)
            .ok_or_else(|| Error::Configuration(format!("No app found with name {app_name}")))
    }

    pub fn get_table_with_name(&self, app_name: &str, table_class_name: &str) -> Result<Arc<Table>> {
        self.registry.get_table_with_name(app_name, table_class_name)
    }

    /// Tables of the included apps, or of every app but the excluded ones.
    pub fn get_table_classes(
        &self,
        include_apps: &[&str],
        exclude_apps: &[&str],
    ) -> Result<Vec<Arc<Table>>> {
        if !include_apps.is_empty() && !exclude_apps.is_empty() {
            return Err(Error::Configuration(
                "Only specify `include_apps` or `exclude_apps`.".into(),
            ));
        }
        let app_names = if !include_apps.is_empty() {
            include_apps.iter().map(|v| v.to_string()).collect()
        } else {
            let mut names = self.get_app_names(true)?;
            names.retain(|v| !exclude_apps.contains(&v.as_str()));
            names
        };
        let mut tables = Vec::new();
        for app_name in app_names {
            self.registry.import_app_modules(&app_name)?;
            tables.extend(self.get_app_config(&app_name)?.table_classes);
        }
        Ok(tables)
    }
}

/// Kahn's algorithm, ties broken by registration order.
fn sort_app_configs(configs: Vec<AppConfig>) -> Result<Vec<AppConfig>> {
    let positions: HashMap<&str, usize> = configs
        .iter()
        .enumerate()
        .map(|(i, v)| (v.app_name.as_str(), i))
        .collect();
    let mut pending = vec![0usize; configs.len()];
    let mut dependents = vec![Vec::new(); configs.len()];
    for (i, config) in configs.iter().enumerate() {
        for dependency in &config.migration_dependencies {
            let Some(&d) = positions.get(dependency.as_str()) else {
                return Err(Error::Configuration(format!(
                    "The app `{}` depends on `{}` which is not registered",
                    config.app_name, dependency
                )));
            };
            pending[i] += 1;
            dependents[d].push(i);
        }
    }
    let mut ready: BTreeSet<usize> = (0..configs.len()).filter(|&i| pending[i] == 0).collect();
    let mut order = Vec::with_capacity(configs.len());
    while let Some(i) = ready.pop_first() {
        order.push(i);
        for &d in &dependents[i] {
            pending[d] -= 1;
            if pending[d] == 0 {
                ready.insert(d);
            }
        }
    }
    if order.len() != configs.len() {
        let cycle = (0..configs.len())
            .filter(|i| pending[*i] > 0)
            .map(|i| configs[i].app_name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(Error::Configuration(format!(
            "Circular migration dependencies between the apps {cycle}"
        )));
    }
    let mut configs: Vec<Option<AppConfig>> = configs.into_iter().map(Some).collect();
    Ok(order.into_iter().filter_map(|i| configs[i].take()).collect())
}

/// Tables declared in (or exported by) `modules`, filtered by tags.
///
/// A table is kept when `include_tags` contains [`ALL_TAGS`] or one of its
/// tags, and none of its tags is in `exclude_tags`. With `exclude_imported`
/// only tables declared in the module itself are kept.
pub fn table_finder(
    registry: &Arc<Registry>,
    modules: &[&str],
    include_tags: &[&str],
    exclude_tags: &[&str],
    exclude_imported: bool,
) -> Result<Vec<Arc<Table>>> {
    let mut result: Vec<Arc<Table>> = Vec::new();
    for path in modules {
        let module = registry.import_module(path)?;
        for table in module.tables() {
            if exclude_imported && table.module_path() != Some(*path) {
                continue;
            }
            let has_tag = |tags: &[&str]| table.tags().iter().any(|t| tags.contains(&t.as_str()));
            if has_tag(exclude_tags) {
                continue;
            }
            if (include_tags.contains(&ALL_TAGS) || has_tag(include_tags))
                && !result.iter().any(|t| Arc::ptr_eq(t, table))
            {
                result.push(table.clone());
            }
        }
    }
    Ok(result)
}
