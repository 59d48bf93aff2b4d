use config::shared::ImportConfig;
use driver::error::ErrorKind;
use driver::import::ImportOrchestrator;
use driver::sql::Statement;
use driver::test_utils::memory_warehouse::MemoryWarehouse;
use driver::test_utils::schema::{import_command, string_table, test_rows};
use driver::types::{CreateMode, ImportOptions, ImportType, TableIdent, TableKind};
use driver::warehouse::QueryExecutor;
use telemetry::init_test_tracing;

fn source() -> TableIdent {
    TableIdent::new("in_c_main", "source")
}

fn destination() -> TableIdent {
    TableIdent::new("in_c_main", "destination")
}

async fn warehouse_with_tables() -> MemoryWarehouse {
    let warehouse = MemoryWarehouse::new();
    warehouse
        .insert_table(
            string_table(source(), &["id", "name"]),
            test_rows(&[&["1", "a"], &["2", "b"]]),
        )
        .await;
    warehouse
        .insert_table(
            string_table(destination(), &["id", "name"]),
            test_rows(&[&["9", "z"]]),
        )
        .await;
    warehouse
}

fn options(import_type: ImportType, create_mode: CreateMode) -> ImportOptions {
    ImportOptions {
        import_type,
        create_mode,
        ..ImportOptions::default()
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn create_mode_never_touches_an_existing_destination() {
    init_test_tracing();

    let config = ImportConfig::default();
    for import_type in [
        ImportType::Full,
        ImportType::Incremental,
        ImportType::View,
        ImportType::Clone,
    ] {
        let warehouse = warehouse_with_tables().await;

        let err = ImportOrchestrator::new(&warehouse, &config)
            .import(&import_command(
                source(),
                destination(),
                options(import_type, CreateMode::Create),
            ))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ObjectAlreadyExists, "{import_type:?}");
        assert_eq!(err.code(), 2006);
        assert!(warehouse.statements().await.is_empty(), "{import_type:?}");
        assert_eq!(
            warehouse.rows(&destination()).await.unwrap(),
            test_rows(&[&["9", "z"]])
        );
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn replace_mode_does_not_replace_full_or_incremental_destinations() {
    init_test_tracing();

    let config = ImportConfig::default();
    for import_type in [ImportType::Full, ImportType::Incremental] {
        let warehouse = warehouse_with_tables().await;

        let err = ImportOrchestrator::new(&warehouse, &config)
            .import(&import_command(
                source(),
                destination(),
                options(import_type, CreateMode::Replace),
            ))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ObjectAlreadyExists, "{import_type:?}");
        assert!(warehouse.statements().await.is_empty());
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn replace_mode_drops_existing_view_before_creating_view() {
    init_test_tracing();

    let warehouse = MemoryWarehouse::new();
    warehouse
        .insert_table(string_table(source(), &["id"]), test_rows(&[&["1"]]))
        .await;
    warehouse
        .execute(&Statement::CreateView {
            view: destination(),
            source: source(),
        })
        .await
        .unwrap();

    let config = ImportConfig::default();
    let result = ImportOrchestrator::new(&warehouse, &config)
        .import(&import_command(
            source(),
            destination(),
            options(ImportType::View, CreateMode::Replace),
        ))
        .await
        .unwrap();

    assert_eq!(result.imported_rows_count, 0);
    let names: Vec<&str> = warehouse
        .statements()
        .await
        .iter()
        .map(Statement::name)
        .collect();
    assert_eq!(names, vec!["create_view", "drop_view", "create_view"]);
    assert_eq!(
        warehouse.table(&destination()).await.unwrap().kind,
        TableKind::View
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn replace_mode_drops_existing_table_before_cloning() {
    init_test_tracing();

    let warehouse = warehouse_with_tables().await;

    let config = ImportConfig::default();
    let result = ImportOrchestrator::new(&warehouse, &config)
        .import(&import_command(
            source(),
            destination(),
            options(ImportType::Clone, CreateMode::Replace),
        ))
        .await
        .unwrap();

    assert_eq!(result.imported_rows_count, 0);
    assert_eq!(
        warehouse.statements().await.first(),
        Some(&Statement::DropTable {
            table: destination()
        })
    );
    assert_eq!(
        warehouse.rows(&destination()).await.unwrap(),
        test_rows(&[&["1", "a"], &["2", "b"]])
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn replace_mode_keeps_destination_when_source_is_missing() {
    init_test_tracing();

    let config = ImportConfig::default();
    for import_type in [ImportType::View, ImportType::Clone] {
        let warehouse = warehouse_with_tables().await;

        let err = ImportOrchestrator::new(&warehouse, &config)
            .import(&import_command(
                TableIdent::new("in_c_main", "missing"),
                destination(),
                options(import_type, CreateMode::Replace),
            ))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ObjectNotFound, "{import_type:?}");
        assert!(warehouse.statements().await.is_empty(), "{import_type:?}");
        assert_eq!(
            warehouse.rows(&destination()).await,
            Some(test_rows(&[&["9", "z"]])),
            "{import_type:?}"
        );
    }
}
