use std::sync::Arc;
use tabula::{
    Action, AppConfig, ColumnDef, Config, Engine, LazyTableReference, Registry, Result, Table,
    Value,
};

/// Module declaring `Manager` and `Band`.
pub const TABLES_MODULE: &str = "music.tables";
/// Module declaring `Venue` and `Concert`, referencing `Band` lazily.
pub const CONCERTS_MODULE: &str = "music.concerts";

/// A registry with two apps spread over two modules, nothing loaded yet.
///
/// * `music`: `Manager`, `Band` (foreign key to `Manager` through the app).
/// * `concerts`: `Venue`, `Concert` (foreign keys to `Band` through its
///   module and to `Venue` directly), depending on `music` for migrations.
pub fn music_registry(engine: Option<Arc<dyn Engine>>) -> Result<Arc<Registry>> {
    let mut config = Config::new();
    if let Some(engine) = engine {
        config = config.engine(engine);
    }
    let registry = Registry::with_config(config);
    registry.register_app(
        AppConfig::new("music")
            .migrations_folder_path("music/migrations")
            .table_module(TABLES_MODULE),
    )?;
    registry.register_app(
        AppConfig::new("concerts")
            .migrations_folder_path("concerts/migrations")
            .migration_dependency("music")
            .table_module(CONCERTS_MODULE),
    )?;
    registry.module(TABLES_MODULE, |registry| {
        // Band first, its manager is declared afterwards
        Table::builder("Band")
            .module(TABLES_MODULE)
            .app("music")
            .tag("core")
            .column("name", ColumnDef::varchar(50).unique(true))
            .column(
                "manager",
                ColumnDef::foreign_key(LazyTableReference::app("Manager", "music"))
                    .on_delete(Action::SetNull),
            )
            .column("popularity", ColumnDef::integer().default(100).index(true))
            .build(registry)?;
        Table::builder("Manager")
            .module(TABLES_MODULE)
            .app("music")
            .tag("core")
            .column("name", ColumnDef::varchar(50))
            .build(registry)?;
        Ok(())
    })?;
    registry.module(CONCERTS_MODULE, |registry| {
        let venue = Table::builder("Venue")
            .module(CONCERTS_MODULE)
            .app("concerts")
            .tag("places")
            .column("name", ColumnDef::varchar(100))
            .column("capacity", ColumnDef::integer().null(true).no_default())
            .build(registry)?;
        Table::builder("Concert")
            .module(CONCERTS_MODULE)
            .app("concerts")
            .column(
                "band",
                ColumnDef::foreign_key(LazyTableReference::module("Band", TABLES_MODULE)),
            )
            .column("venue", ColumnDef::foreign_key(&venue))
            .column(
                "ticket_code",
                ColumnDef::varchar(20).default_with(|| Value::from(next_ticket_code())),
            )
            .build(registry)?;
        Ok(())
    })?;
    Ok(registry)
}

fn next_ticket_code() -> String {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    format!("T-{:04}", COUNTER.fetch_add(1, Ordering::Relaxed) + 1)
}
