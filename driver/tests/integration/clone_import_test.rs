use config::shared::ImportConfig;
use driver::error::ErrorKind;
use driver::import::ImportOrchestrator;
use driver::test_utils::memory_warehouse::MemoryWarehouse;
use driver::test_utils::schema::{
    assert_column_names, assert_timer_names, import_command, string_table, test_rows,
};
use driver::types::{ImportOptions, ImportType, TableIdent};
use telemetry::init_test_tracing;

fn source() -> TableIdent {
    TableIdent::new("in_c_main", "source")
}

fn clone_options() -> ImportOptions {
    ImportOptions {
        import_type: ImportType::Clone,
        ..ImportOptions::default()
    }
}

async fn warehouse_with_source() -> MemoryWarehouse {
    let warehouse = MemoryWarehouse::new();
    warehouse
        .insert_table(
            string_table(source(), &["id", "name"]),
            test_rows(&[&["1", "a"], &["2", "b"], &["3", "c"]]),
        )
        .await;
    warehouse
}

#[tokio::test(flavor = "multi_thread")]
async fn native_clone_reports_no_imported_rows() {
    init_test_tracing();

    let warehouse = warehouse_with_source().await;
    let destination = TableIdent::new("in_c_main", "clone");

    let config = ImportConfig::default();
    let result = ImportOrchestrator::new(&warehouse, &config)
        .import(&import_command(source(), destination.clone(), clone_options()))
        .await
        .unwrap();

    assert_eq!(result.imported_rows_count, 0);
    assert!(result.imported_columns.is_empty());
    assert_timer_names(&result.timers, &["cloneTable"]);
    assert_eq!(warehouse.rows(&destination).await.unwrap().len(), 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn rejected_clone_falls_back_to_copy_with_row_count() {
    init_test_tracing();

    let warehouse = warehouse_with_source().await;
    let destination = TableIdent::new("out_c_main", "clone");

    let config = ImportConfig::default();
    let result = ImportOrchestrator::new(&warehouse, &config)
        .import(&import_command(source(), destination.clone(), clone_options()))
        .await
        .unwrap();

    assert_eq!(result.imported_rows_count, 3);
    assert_eq!(result.imported_columns, vec!["id", "name"]);
    assert_timer_names(&result.timers, &["createTableAsSelect"]);

    let names: Vec<&str> = warehouse
        .statements()
        .await
        .iter()
        .map(|statement| statement.name())
        .collect();
    assert_eq!(names, vec!["clone_table", "create_table_as_select"]);

    let table = warehouse.table(&destination).await.unwrap();
    assert_column_names(&table, &["id", "name"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn disabled_native_clone_always_copies() {
    init_test_tracing();

    let warehouse = warehouse_with_source().await;
    let destination = TableIdent::new("in_c_main", "copy");

    let config = ImportConfig {
        native_clone_enabled: false,
        ..ImportConfig::default()
    };
    let result = ImportOrchestrator::new(&warehouse, &config)
        .import(&import_command(source(), destination.clone(), clone_options()))
        .await
        .unwrap();

    assert_eq!(result.imported_rows_count, 3);
    assert_eq!(warehouse.statements().await.len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn clone_failures_other_than_rejection_are_propagated() {
    init_test_tracing();

    let warehouse = warehouse_with_source().await;
    warehouse.fail_on("clone_table").await;

    let config = ImportConfig::default();
    let err = ImportOrchestrator::new(&warehouse, &config)
        .import(&import_command(
            source(),
            TableIdent::new("in_c_main", "clone"),
            clone_options(),
        ))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::DestinationQueryFailed);
    assert_eq!(warehouse.statements().await.len(), 1);
}
