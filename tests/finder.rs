#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use tabula::{
        ALL_TAGS, AppConfig, AppRegistry, Error, Finder, Registry, Table, table_finder,
    };
    use tabula_tests::{CONCERTS_MODULE, TABLES_MODULE, music_registry};

    fn class_names(tables: &[Arc<Table>]) -> Vec<&str> {
        tables.iter().map(|t| t.class_name()).collect()
    }

    #[test]
    fn app_names_sorted_by_dependencies() {
        let registry = Registry::new();
        registry
            .register_app(AppConfig::new("tickets").migration_dependency("concerts"))
            .unwrap();
        registry
            .register_app(AppConfig::new("concerts").migration_dependency("music"))
            .unwrap();
        registry.register_app(AppConfig::new("music")).unwrap();
        registry.register_app(AppConfig::new("merch")).unwrap();
        let finder = Finder::new(&registry);
        assert_eq!(
            finder.get_app_names(false).unwrap(),
            ["tickets", "concerts", "music", "merch"]
        );
        assert_eq!(
            finder.get_app_names(true).unwrap(),
            ["music", "concerts", "tickets", "merch"]
        );
    }

    #[test]
    fn broken_dependencies() {
        let registry = Registry::new();
        registry
            .register_app(AppConfig::new("music").migration_dependency("concerts"))
            .unwrap();
        registry
            .register_app(AppConfig::new("concerts").migration_dependency("music"))
            .unwrap();
        let finder = Finder::new(&registry);
        assert!(finder.get_app_names(false).is_ok());
        assert!(matches!(
            finder.get_app_names(true),
            Err(Error::Configuration(..))
        ));

        let registry = Registry::new();
        registry
            .register_app(AppConfig::new("concerts").migration_dependency("music"))
            .unwrap();
        assert!(matches!(
            Finder::new(&registry).get_app_configs(true),
            Err(Error::Configuration(..))
        ));
    }

    #[test]
    fn duplicate_app_names() {
        assert!(matches!(
            AppRegistry::new([AppConfig::new("music"), AppConfig::new("music")]),
            Err(Error::Configuration(..))
        ));

        // A table naming an app first, then the app registered explicitly
        let registry = Registry::new();
        let band = Table::builder("Band").app("music").build(&registry).unwrap();
        registry
            .register_app(AppConfig::new("music").migrations_folder_path("music/migrations"))
            .unwrap();
        let config = Finder::new(&registry).get_app_config("music").unwrap();
        assert_eq!(config.migrations_folder_path, "music/migrations");
        assert!(Arc::ptr_eq(&config.get_table_with_name("Band").unwrap(), &band));
        assert!(matches!(
            registry.register_app(AppConfig::new("music")),
            Err(Error::Configuration(..))
        ));
    }

    #[test]
    fn table_lookup() {
        let registry = music_registry(None).unwrap();
        let finder = Finder::new(&registry);
        let band = finder.get_table_with_name("music", "Band").unwrap();
        assert_eq!(band.tablename(), "band");
        assert!(matches!(
            finder.get_table_with_name("music", "Venue"),
            Err(Error::Resolution(..))
        ));
        assert!(matches!(
            finder.get_table_with_name("cinema", "Band"),
            Err(Error::Configuration(..))
        ));
        assert!(matches!(
            finder.get_app_config("cinema"),
            Err(Error::Configuration(..))
        ));
    }

    #[test]
    fn table_classes() {
        let registry = music_registry(None).unwrap();
        let finder = Finder::new(&registry);
        assert_eq!(
            class_names(&finder.get_table_classes(&[], &[]).unwrap()),
            ["Band", "Manager", "Venue", "Concert"]
        );
        assert_eq!(
            class_names(&finder.get_table_classes(&["concerts"], &[]).unwrap()),
            ["Venue", "Concert"]
        );
        assert_eq!(
            class_names(&finder.get_table_classes(&[], &["concerts"]).unwrap()),
            ["Band", "Manager"]
        );
        assert!(matches!(
            finder.get_table_classes(&["music"], &["concerts"]),
            Err(Error::Configuration(..))
        ));
        assert!(matches!(
            finder.get_table_classes(&["cinema"], &[]),
            Err(Error::Configuration(..))
        ));
    }

    #[test]
    fn tables_by_tag() {
        let registry = music_registry(None).unwrap();
        let tables = table_finder(&registry, &[TABLES_MODULE], &["core"], &[], false).unwrap();
        assert_eq!(class_names(&tables), ["Band", "Manager"]);
        let tables = table_finder(&registry, &[CONCERTS_MODULE], &["core"], &[], false).unwrap();
        assert!(tables.is_empty());
        let tables = table_finder(
            &registry,
            &[TABLES_MODULE, CONCERTS_MODULE],
            &[ALL_TAGS],
            &["places"],
            false,
        )
        .unwrap();
        assert_eq!(class_names(&tables), ["Band", "Manager", "Concert"]);

        // Exclusion wins over inclusion
        let tables =
            table_finder(&registry, &[CONCERTS_MODULE], &["places"], &["places"], false).unwrap();
        assert!(tables.is_empty());
        assert!(matches!(
            table_finder(&registry, &["music.missing"], &[ALL_TAGS], &[], false),
            Err(Error::Resolution(..))
        ));
    }

    #[test]
    fn tables_imported_into_a_module() {
        let registry = music_registry(None).unwrap();
        let band = registry.get_table_with_name("music", "Band").unwrap();
        registry.export(CONCERTS_MODULE, &band).unwrap();
        let tables = table_finder(&registry, &[CONCERTS_MODULE], &[ALL_TAGS], &[], false).unwrap();
        assert_eq!(class_names(&tables), ["Band", "Venue", "Concert"]);
        let tables = table_finder(&registry, &[CONCERTS_MODULE], &[ALL_TAGS], &[], true).unwrap();
        assert_eq!(class_names(&tables), ["Venue", "Concert"]);

        // Listed twice, returned once
        let tables = table_finder(
            &registry,
            &[TABLES_MODULE, CONCERTS_MODULE],
            &["core"],
            &[],
            false,
        )
        .unwrap();
        assert_eq!(class_names(&tables), ["Band", "Manager"]);
    }
}
