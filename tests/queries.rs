#[cfg(test)]
mod tests {
    use indoc::indoc;
    use std::sync::Arc;
    use tabula::{
        ColumnDef, EngineType, Error, Query, QueryString, Record, RowsAffected, Table, Unquoted,
        Value,
    };
    use tabula_tests::{RecordingEngine, init_logs, music_registry};

    fn band(engine: &Arc<RecordingEngine>) -> Arc<Table> {
        init_logs();
        let registry = music_registry(Some(engine.clone())).unwrap();
        registry.get_table_with_name("music", "Band").unwrap()
    }

    #[tokio::test]
    async fn update() {
        let engine = RecordingEngine::new(EngineType::Postgres);
        let band = band(&engine);
        let name = band.ref_column("name").unwrap();
        engine.reply_affected(1);
        let result = band
            .update()
            .set(&name, "Spamalot")
            .filter(name.eq("Pythonistas"))
            .run()
            .await
            .unwrap();
        assert_eq!(result.rows_affected, 1);
        let executed = engine.executed();
        assert_eq!(executed.len(), 1);
        assert_eq!(
            executed[0].sql,
            r#"UPDATE "band" SET name = $1 WHERE name = $2"#
        );
        assert_eq!(
            executed[0].values,
            [Value::from("Spamalot"), Value::from("Pythonistas")]
        );
    }

    #[tokio::test]
    async fn save_inserts_then_updates() {
        let engine = RecordingEngine::new(EngineType::Postgres);
        let band = band(&engine);
        let mut record = Record::new(&band, [("name", "Pythonistas")]).unwrap();
        assert!(record.save().is_insert());

        engine.reply_rows(["id"], vec![[Value::Int32(Some(7))]]);
        let result = record.save().run().await.unwrap();
        assert_eq!(
            result,
            RowsAffected {
                rows_affected: 1,
                last_affected_id: Some(7),
            }
        );
        assert_eq!(record.id(), &Value::Int32(Some(7)));
        assert!(record.is_persisted());

        record.set("popularity", 1000).unwrap();
        assert!(!record.save().is_insert());
        engine.reply_affected(1);
        record.save().run().await.unwrap();

        let sql = engine.sql();
        assert_eq!(
            sql,
            [
                r#"INSERT INTO "band" (id, name, manager, popularity) VALUES (DEFAULT, $1, $2, $3) RETURNING id"#,
                r#"UPDATE "band" SET name = $1, manager = $2, popularity = $3 WHERE id = $4"#,
            ]
        );
        let executed = engine.executed();
        assert_eq!(executed[1].values[2], Value::Int32(Some(1000)));
        assert_eq!(executed[1].values[3], Value::Int32(Some(7)));
    }

    #[tokio::test]
    async fn save_without_returned_id() {
        let engine = RecordingEngine::new(EngineType::Postgres);
        let band = band(&engine);
        let mut record = Record::new(&band, [("name", "Pythonistas")]).unwrap();
        engine.reply([]);
        assert!(matches!(
            record.save().run().await,
            Err(Error::Conversion(..))
        ));
        assert!(!record.is_persisted());
    }

    #[tokio::test]
    async fn remove_deletes_by_id() {
        let engine = RecordingEngine::new(EngineType::Sqlite);
        let band = band(&engine);
        let mut record = Record::new(&band, [("name", "Pythonistas")]).unwrap();
        assert!(matches!(record.remove(), Err(Error::Usage(..))));
        record.set("id", 3).unwrap();
        engine.reply_affected(1);
        let result = record.remove().unwrap().run().await.unwrap();
        assert_eq!(result.rows_affected, 1);
        assert!(!record.is_persisted());
        assert_eq!(engine.sql(), [r#"DELETE FROM "band" WHERE id = ?"#]);
        assert_eq!(engine.executed()[0].values, [Value::Int32(Some(3))]);
    }

    #[tokio::test]
    async fn objects_hydrate_records() {
        let engine = RecordingEngine::new(EngineType::Postgres);
        let band = band(&engine);
        let popularity = band.ref_column("popularity").unwrap();
        engine.reply_rows(
            ["id", "name", "manager", "popularity"],
            vec![
                [
                    Value::Int32(Some(1)),
                    Value::from("Pythonistas"),
                    Value::Int32(Some(2)),
                    Value::Int32(Some(1000)),
                ],
                [
                    Value::Int32(Some(3)),
                    Value::from("Rustaceans"),
                    Value::Null,
                    Value::Int32(Some(500)),
                ],
            ],
        );
        let records = band
            .objects()
            .filter(popularity.gt(100))
            .order_by(popularity.desc())
            .run()
            .await
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("name").unwrap(), &Value::from("Pythonistas"));
        assert_eq!(records[1].id(), &Value::Int32(Some(3)));
        assert!(records.iter().all(|v| Arc::ptr_eq(v.table(), &band)));
        assert_eq!(
            engine.sql(),
            [r#"SELECT id, name, manager, popularity FROM "band" WHERE popularity > $1 ORDER BY popularity DESC"#]
        );

        // The manager is looked up through the lazily resolved foreign key
        engine.reply_rows(
            ["id", "name"],
            vec![[Value::Int32(Some(2)), Value::from("Guido")]],
        );
        let manager = records[0]
            .get_related("manager")
            .unwrap()
            .run()
            .await
            .unwrap()
            .unwrap();
        assert_eq!(manager.table().class_name(), "Manager");
        assert_eq!(manager.get("name").unwrap(), &Value::from("Guido"));
        assert_eq!(
            engine.sql()[1],
            r#"SELECT id, name FROM "manager" WHERE id = $1 LIMIT 1"#
        );

        engine.reply([]);
        let first = band.select().first().run().await.unwrap();
        assert!(first.is_none());
    }

    #[tokio::test]
    async fn select_related_columns() {
        let engine = RecordingEngine::new(EngineType::Postgres);
        let band = band(&engine);
        let manager_name = band.ref_column("manager.name").unwrap();
        engine.reply_rows(
            ["name", "manager.name"],
            vec![[Value::from("Pythonistas"), Value::from("Guido")]],
        );
        let rows = band
            .select()
            .columns([band.ref_column("name").unwrap(), manager_name.clone()])
            .filter(manager_name.eq("Guido"))
            .run()
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_column("manager.name"), Some(&Value::from("Guido")));
        assert_eq!(
            engine.sql(),
            [indoc! {r#"
                SELECT "band".name, "band$manager".name AS "manager.name" FROM "band" LEFT JOIN "manager" AS "band$manager" ON "band".manager = "band$manager".id WHERE "band$manager".name = $1
            "#}
            .trim()]
        );
    }

    #[tokio::test]
    async fn count_and_exists() {
        let engine = RecordingEngine::new(EngineType::Sqlite);
        let band = band(&engine);
        let popularity = band.ref_column("popularity").unwrap();
        engine.reply_rows(["count"], vec![[Value::Int64(Some(3))]]);
        let count = band.count().filter(popularity.ge(100)).run().await.unwrap();
        assert_eq!(count, 3);
        engine.reply_rows(["exists"], vec![[Value::Int64(Some(1))]]);
        assert!(band.exists().run().await.unwrap());
        engine.reply_rows(["exists"], vec![[Value::Boolean(Some(false))]]);
        assert!(!band.exists().run().await.unwrap());
        assert_eq!(
            engine.sql(),
            [
                r#"SELECT COUNT(*) AS "count" FROM "band" WHERE popularity >= ?"#,
                r#"SELECT EXISTS(SELECT * FROM "band") AS "exists""#,
                r#"SELECT EXISTS(SELECT * FROM "band") AS "exists""#,
            ]
        );
        engine.reply([]);
        assert!(matches!(
            band.count().run().await,
            Err(Error::Conversion(..))
        ));
    }

    #[tokio::test]
    async fn table_ddl() {
        let engine = RecordingEngine::new(EngineType::Postgres);
        let band = band(&engine);
        engine.reply_rows(["exists"], vec![[Value::Boolean(Some(false))]]);
        assert!(!band.table_exists().run().await.unwrap());
        band.create().if_not_exists(true).run().await.unwrap();
        band.drop().if_exists(true).cascade(true).run().await.unwrap();
        let executed = engine.executed();
        assert_eq!(executed[0].values, [Value::from("band")]);
        assert!(executed[1].sql.starts_with(r#"CREATE TABLE IF NOT EXISTS "band" ("#));
        assert_eq!(
            executed.last().map(|v| v.sql.as_str()),
            Some(r#"DROP TABLE IF EXISTS "band" CASCADE"#)
        );
    }

    #[tokio::test]
    async fn alter_backfills_static_defaults() {
        let engine = RecordingEngine::new(EngineType::Postgres);
        let band = band(&engine);
        band.alter()
            .add_column("members", ColumnDef::integer().default(4))
            .run()
            .await
            .unwrap();
        let executed = engine.executed();
        assert_eq!(executed.len(), 2);
        assert!(executed[0].sql.starts_with(r#"ALTER TABLE "band" ADD COLUMN members"#));
        assert_eq!(executed[1].sql, r#"UPDATE "band" SET members = $1"#);
        assert_eq!(executed[1].values, [Value::Int32(Some(4))]);
    }

    #[tokio::test]
    async fn alter_backfills_callable_defaults_row_by_row() {
        let engine = RecordingEngine::new(EngineType::Postgres);
        let band = band(&engine);
        engine
            .reply_affected(0)
            .reply_rows(["id"], vec![[Value::Int32(Some(1))], [Value::Int32(Some(2))]]);
        band.alter()
            .add_column(
                "code",
                ColumnDef::varchar(10).default_with(|| Value::from("X")),
            )
            .run()
            .await
            .unwrap();
        let executed = engine.executed();
        assert_eq!(executed.len(), 4);
        assert_eq!(executed[1].sql, r#"SELECT id FROM "band""#);
        assert_eq!(executed[2].sql, r#"UPDATE "band" SET code = $1 WHERE id = $2"#);
        assert_eq!(
            executed[3].values,
            [Value::from("X"), Value::Int32(Some(2))]
        );
    }

    #[tokio::test]
    async fn raw_sql() {
        let engine = RecordingEngine::new(EngineType::Postgres);
        let band = band(&engine);
        let query = QueryString::new(
            "SELECT name FROM band WHERE popularity > {} AND {}",
            [Value::from(10).into(), Unquoted("TRUE".into()).into()],
        )
        .unwrap();
        engine.reply_rows(["name"], vec![[Value::from("Pythonistas")]]);
        let rows = band.raw(query).run().await.unwrap();
        assert_eq!(rows[0].values(), [Value::from("Pythonistas")]);
        assert_eq!(
            engine.sql(),
            ["SELECT name FROM band WHERE popularity > $1 AND TRUE"]
        );
    }

    #[tokio::test]
    async fn engine_failures() {
        let engine = RecordingEngine::new(EngineType::Postgres);
        let band = band(&engine);
        engine.fail("connection reset");
        let result = band.select().run().await;
        let Err(Error::Engine(error)) = result else {
            panic!("Expected an engine error");
        };
        assert_eq!(error.to_string(), "connection reset");

        // Rendering errors never reach the engine
        engine.clear();
        assert!(matches!(band.update().run().await, Err(Error::Usage(..))));
        assert!(engine.executed().is_empty());
    }

    #[tokio::test]
    async fn unconfigured_engine() {
        let registry = music_registry(None).unwrap();
        let band = registry.get_table_with_name("music", "Band").unwrap();
        assert!(matches!(band.count().run().await, Err(Error::Configuration(..))));
    }
}
