use config::shared::ImportConfig;
use driver::error::ErrorKind;
use driver::import::ImportOrchestrator;
use driver::test_utils::memory_warehouse::MemoryWarehouse;
use driver::test_utils::schema::{assert_timer_names, import_command, string_table, test_rows};
use driver::types::{DedupType, ImportOptions, ImportType, TableIdent};
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
            string_table(source(), &["id", "name"]),
            test_rows(&[&["1", "a"], &["2", "b"]]),
        )
        .await;
    warehouse
}

#[tokio::test(flavor = "multi_thread")]
async fn incremental_import_loads_through_staging() {
    init_test_tracing();

    let warehouse = warehouse_with_source().await;
    let options = ImportOptions {
        import_type: ImportType::Incremental,
        ..ImportOptions::default()
    };

    let config = ImportConfig::default();
    let result = ImportOrchestrator::new(&warehouse, &config)
        .import(&import_command(source(), destination(), options))
        .await
        .unwrap();

    assert_eq!(result.imported_rows_count, 2);
    assert_eq!(result.imported_columns, vec!["id", "name"]);
    assert_timer_names(
        &result.timers,
        &["loadToStaging", "insertIntoTargetFromStaging"],
    );
    assert_eq!(
        warehouse.rows(&destination()).await.unwrap(),
        test_rows(&[&["1", "a"], &["2", "b"]])
    );
    assert_eq!(warehouse.table_idents().await, vec![source(), destination()]);
}

#[tokio::test(flavor = "multi_thread")]
async fn incremental_update_duplicates_is_not_implemented() {
    init_test_tracing();

    let warehouse = warehouse_with_source().await;
    let options = ImportOptions {
        import_type: ImportType::Incremental,
        dedup_type: DedupType::UpdateDuplicates,
        dedup_columns: vec!["id".to_string()],
        ..ImportOptions::default()
    };

    let config = ImportConfig::default();
    let err = ImportOrchestrator::new(&warehouse, &config)
        .import(&import_command(source(), destination(), options))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotImplemented);
    assert!(!err.kind().is_retryable());
    assert!(warehouse.statements().await.is_empty());
    assert!(warehouse.table(&destination()).await.is_none());
}
