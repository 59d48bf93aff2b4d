use config::shared::ImportConfig;
use driver::error::ErrorKind;
use driver::import::{ImportOrchestrator, TableImportHandler};
use driver::test_utils::memory_warehouse::MemoryWarehouse;
use driver::test_utils::schema::{
    assert_column_names, assert_timer_names, import_command, string_table, test_mappings,
    test_rows,
};
use driver::types::{ImportOptions, ImportType, TableIdent, TableKind};
use telemetry::init_test_tracing;

fn source() -> TableIdent {
    TableIdent::new("in_c_main", "source")
}

fn destination() -> TableIdent {
    TableIdent::new("out_c_main", "view")
}

fn view_options() -> ImportOptions {
    ImportOptions {
        import_type: ImportType::View,
        ..ImportOptions::default()
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn view_import_reports_no_imported_rows() {
    init_test_tracing();

    for rows in [test_rows(&[&["1", "a"], &["2", "b"]]), Vec::new()] {
        let warehouse = MemoryWarehouse::new();
        warehouse
            .insert_table(string_table(source(), &["id", "name"]), rows.clone())
            .await;
        let handler = TableImportHandler::new(warehouse.clone(), ImportConfig::default());

        let response = handler
            .handle(
                &(),
                import_command(source(), destination(), view_options()),
                &[],
                None,
            )
            .await
            .unwrap();

        assert_eq!(response.imported_rows_count, 0);
        assert!(response.imported_columns.is_empty());
        assert_timer_names(&response.timers, &["createView"]);
        assert_eq!(warehouse.rows(&destination()).await.unwrap(), rows);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn view_selects_every_source_column_regardless_of_mapping() {
    init_test_tracing();

    let warehouse = MemoryWarehouse::new();
    warehouse
        .insert_table(
            string_table(source(), &["id", "name", "note"]),
            test_rows(&[&["1", "a", "x"]]),
        )
        .await;

    let mut command = import_command(source(), destination(), view_options());
    command.source.column_mappings = test_mappings(&[("id", "identifier")]);

    let config = ImportConfig::default();
    ImportOrchestrator::new(&warehouse, &config)
        .import(&command)
        .await
        .unwrap();

    let view = warehouse.table(&destination()).await.unwrap();
    assert_eq!(view.kind, TableKind::View);
    assert_column_names(&view, &["id", "name", "note"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn view_over_missing_source_fails() {
    init_test_tracing();

    let warehouse = MemoryWarehouse::new();
    let config = ImportConfig::default();
    let err = ImportOrchestrator::new(&warehouse, &config)
        .import(&import_command(source(), destination(), view_options()))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ObjectNotFound);
    assert!(warehouse.statements().await.is_empty());
}
