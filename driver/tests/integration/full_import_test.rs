use chrono::{DateTime, Duration, Utc};
use config::shared::ImportConfig;
use driver::error::ErrorKind;
use driver::import::{ImportOrchestrator, TableImportHandler};
use driver::sql::Statement;
use driver::test_utils::memory_warehouse::{MERGE_OPERATION, MemoryWarehouse};
use driver::test_utils::schema::{
    assert_column_names, assert_column_types, assert_timer_names, import_command, string_table,
    test_column, test_mappings, test_rows, test_table,
};
use driver::types::{ImportOptions, ImportStrategy, TableIdent};
use telemetry::init_test_tracing;

fn source() -> TableIdent {
    TableIdent::new("in_c_main", "source")
}

fn destination() -> TableIdent {
    TableIdent::new("out_c_main", "destination")
}

async fn warehouse_with_source() -> MemoryWarehouse {
    let warehouse = MemoryWarehouse::new();
    warehouse
        .insert_table(
            string_table(source(), &["col1", "col2", "col3"]),
            test_rows(&[&["1", "1", "1"], &["2", "2", "2"], &["3", "3", "3"]]),
        )
        .await;
    warehouse
}

#[tokio::test(flavor = "multi_thread")]
async fn mapped_full_import_loads_directly_into_destination() {
    init_test_tracing();

    let warehouse = warehouse_with_source().await;
    let handler = TableImportHandler::new(warehouse.clone(), ImportConfig::default());

    let mut command = import_command(source(), destination(), ImportOptions::default());
    command.source.column_mappings = test_mappings(&[("col1", "col1"), ("col2", "col4")]);

    let response = handler.handle(&(), command, &[], None).await.unwrap();

    assert_eq!(response.imported_rows_count, 0);
    assert!(response.imported_columns.is_empty());
    assert_eq!(response.table_rows_count, 3);
    assert_timer_names(&response.timers, &["loadToDestination"]);

    let table = warehouse.table(&destination()).await.unwrap();
    assert_column_names(&table, &["col1", "col4"]);
    assert_eq!(
        warehouse.rows(&destination()).await.unwrap(),
        test_rows(&[&["1", "1"], &["2", "2"], &["3", "3"]])
    );
    assert_eq!(warehouse.table_idents().await, vec![source(), destination()]);
}

#[tokio::test(flavor = "multi_thread")]
async fn timestamp_column_is_set_on_every_imported_row() {
    init_test_tracing();

    let warehouse = warehouse_with_source().await;
    let handler = TableImportHandler::new(warehouse.clone(), ImportConfig::default());

    let options = ImportOptions {
        timestamp_column_name: Some("_timestamp".to_string()),
        ..ImportOptions::default()
    };
    let mut command = import_command(source(), destination(), options);
    command.source.column_mappings = test_mappings(&[("col1", "col1"), ("col2", "col4")]);

    let started = Utc::now();
    let response = handler.handle(&(), command, &[], None).await.unwrap();

    assert_eq!(response.imported_rows_count, 3);
    assert_eq!(response.imported_columns, vec!["col1", "col4"]);
    assert_timer_names(
        &response.timers,
        &["loadToStaging", "insertIntoTargetFromStaging"],
    );

    let table = warehouse.table(&destination()).await.unwrap();
    assert_column_types(
        &table,
        &[("col1", "STRING"), ("col4", "STRING"), ("_timestamp", "TIMESTAMP")],
    );

    let rows = warehouse.rows(&destination()).await.unwrap();
    assert_eq!(rows.len(), 3);
    for row in rows {
        let timestamp = row[2].as_deref().unwrap();
        let timestamp = DateTime::parse_from_rfc3339(timestamp)
            .unwrap()
            .with_timezone(&Utc);
        assert!(timestamp >= started - Duration::seconds(1));
        assert!(timestamp <= Utc::now() + Duration::seconds(1));
    }

    // The staging table is gone once the import finished.
    assert_eq!(warehouse.table_idents().await, vec![source(), destination()]);
}

#[tokio::test(flavor = "multi_thread")]
async fn dedup_columns_keep_one_row_per_key() {
    init_test_tracing();

    let warehouse = MemoryWarehouse::new();
    warehouse
        .insert_table(
            string_table(source(), &["id", "name"]),
            test_rows(&[&["1", "a"], &["1", "b"], &["2", "c"]]),
        )
        .await;

    let options = ImportOptions {
        dedup_columns: vec!["id".to_string()],
        ..ImportOptions::default()
    };
    let config = ImportConfig::default();
    let result = ImportOrchestrator::new(&warehouse, &config)
        .import(&import_command(source(), destination(), options))
        .await
        .unwrap();

    assert_eq!(result.imported_rows_count, 2);
    assert_timer_names(
        &result.timers,
        &["loadToStaging", "dedup", "insertIntoTargetFromStaging"],
    );

    let table = warehouse.table(&destination()).await.unwrap();
    assert_eq!(table.primary_keys, vec!["id"]);
    assert_eq!(
        warehouse.rows(&destination()).await.unwrap(),
        test_rows(&[&["1", "a"], &["2", "c"]])
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_dedup_column_fails_before_any_statement() {
    init_test_tracing();

    let warehouse = warehouse_with_source().await;
    let options = ImportOptions {
        dedup_columns: vec!["missing".to_string()],
        ..ImportOptions::default()
    };
    let config = ImportConfig::default();
    let err = ImportOrchestrator::new(&warehouse, &config)
        .import(&import_command(source(), destination(), options))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ColumnsMismatch);
    assert!(err.detail().unwrap().contains("\"missing\""));
    assert!(warehouse.statements().await.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn string_table_strategy_creates_string_columns() {
    init_test_tracing();

    let warehouse = MemoryWarehouse::new();
    warehouse
        .insert_table(
            test_table(
                source(),
                vec![test_column("id", "INT64"), test_column("price", "NUMERIC")],
            ),
            test_rows(&[&["1", "9.5"]]),
        )
        .await;

    let options = ImportOptions {
        import_strategy: ImportStrategy::StringTable,
        ..ImportOptions::default()
    };
    let config = ImportConfig::default();
    ImportOrchestrator::new(&warehouse, &config)
        .import(&import_command(source(), destination(), options))
        .await
        .unwrap();

    let table = warehouse.table(&destination()).await.unwrap();
    assert_column_types(&table, &[("id", "STRING"), ("price", "STRING")]);
    assert_eq!(
        warehouse.rows(&destination()).await.unwrap(),
        test_rows(&[&["1", "9.5"]])
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_values_are_converted_to_null() {
    init_test_tracing();

    let warehouse = MemoryWarehouse::new();
    warehouse
        .insert_table(
            string_table(source(), &["id", "note"]),
            test_rows(&[&["1", ""], &["2", "x"]]),
        )
        .await;

    let options = ImportOptions {
        dedup_columns: vec!["id".to_string()],
        convert_empty_to_null_columns: vec!["NOTE".to_string()],
        ..ImportOptions::default()
    };
    let config = ImportConfig::default();
    ImportOrchestrator::new(&warehouse, &config)
        .import(&import_command(source(), destination(), options))
        .await
        .unwrap();

    assert_eq!(
        warehouse.rows(&destination()).await.unwrap(),
        vec![
            vec![Some("1".to_string()), None],
            vec![Some("2".to_string()), Some("x".to_string())],
        ]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn staging_table_is_dropped_when_merge_fails() {
    init_test_tracing();

    let warehouse = warehouse_with_source().await;
    warehouse.fail_on(MERGE_OPERATION).await;

    let options = ImportOptions {
        dedup_columns: vec!["col1".to_string()],
        ..ImportOptions::default()
    };
    let config = ImportConfig::default();
    let err = ImportOrchestrator::new(&warehouse, &config)
        .import(&import_command(source(), destination(), options))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::DestinationQueryFailed);
    assert_eq!(warehouse.table_idents().await, vec![source(), destination()]);

    let statements = warehouse.statements().await;
    let Some(Statement::DropTable { table }) = statements.last() else {
        panic!("expected the staging table to be dropped, got {statements:?}");
    };
    assert!(table.table.starts_with(&config.staging_table_prefix));
    assert_eq!(table.schema, destination().schema);
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_staging_drop_does_not_fail_the_import() {
    init_test_tracing();

    let warehouse = warehouse_with_source().await;
    warehouse.fail_on("drop_table").await;

    let options = ImportOptions {
        dedup_columns: vec!["col1".to_string()],
        ..ImportOptions::default()
    };
    let config = ImportConfig::default();
    let result = ImportOrchestrator::new(&warehouse, &config)
        .import(&import_command(source(), destination(), options))
        .await
        .unwrap();

    assert_eq!(result.imported_rows_count, 3);
    // The staging table survives the failed drop.
    assert_eq!(warehouse.table_idents().await.len(), 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn source_timestamp_column_is_imported_like_any_other_column() {
    init_test_tracing();

    let warehouse = MemoryWarehouse::new();
    warehouse
        .insert_table(
            string_table(source(), &["id", "_timestamp"]),
            test_rows(&[&["1", "2024-01-01 00:00:00"], &["2", "2024-01-02 00:00:00"]]),
        )
        .await;
    let handler = TableImportHandler::new(warehouse.clone(), ImportConfig::default());

    let command = import_command(source(), destination(), ImportOptions::default());
    let response = handler.handle(&(), command, &[], None).await.unwrap();

    assert_eq!(response.table_rows_count, 2);
    assert_timer_names(&response.timers, &["loadToDestination"]);

    let table = warehouse.table(&destination()).await.unwrap();
    assert_column_names(&table, &["id", "_timestamp"]);
    assert_eq!(
        warehouse.rows(&destination()).await.unwrap(),
        test_rows(&[&["1", "2024-01-01 00:00:00"], &["2", "2024-01-02 00:00:00"]])
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn source_timestamp_column_is_refreshed_when_configured() {
    init_test_tracing();

    let warehouse = MemoryWarehouse::new();
    warehouse
        .insert_table(
            string_table(source(), &["id", "_timestamp"]),
            test_rows(&[&["1", "2024-01-01 00:00:00"]]),
        )
        .await;
    let handler = TableImportHandler::new(warehouse.clone(), ImportConfig::default());

    let options = ImportOptions {
        timestamp_column_name: Some("_timestamp".to_string()),
        ..ImportOptions::default()
    };
    let command = import_command(source(), destination(), options);
    let response = handler.handle(&(), command, &[], None).await.unwrap();

    assert_eq!(response.imported_rows_count, 1);
    assert_eq!(response.imported_columns, vec!["id"]);

    let table = warehouse.table(&destination()).await.unwrap();
    assert_column_names(&table, &["id", "_timestamp"]);
    let rows = warehouse.rows(&destination()).await.unwrap();
    assert_eq!(rows[0][0].as_deref(), Some("1"));
    assert_ne!(rows[0][1].as_deref(), Some("2024-01-01 00:00:00"));
}
