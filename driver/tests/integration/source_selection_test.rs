use config::shared::ImportConfig;
use driver::error::ErrorKind;
use driver::import::ImportOrchestrator;
use driver::test_utils::memory_warehouse::MemoryWarehouse;
use driver::test_utils::schema::{
    assert_column_names, import_command, string_table, test_mappings, test_rows,
};
use driver::types::{ImportOptions, TableIdent, WhereFilter, WhereOperator};
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
            string_table(source(), &["id", "status", "amount"]),
            test_rows(&[
                &["1", "new", "5"],
                &["2", "open", "50"],
                &["3", "closed", "500"],
                &["4", "open", "7"],
            ]),
        )
        .await;
    warehouse
}

#[tokio::test(flavor = "multi_thread")]
async fn filters_and_limit_restrict_imported_rows() {
    init_test_tracing();

    let warehouse = warehouse_with_source().await;
    let mut command = import_command(source(), destination(), ImportOptions::default());
    command.source.column_mappings = test_mappings(&[("id", "id"), ("amount", "amount")]);
    let mut amount = WhereFilter::new("amount", WhereOperator::Gt, vec!["6".to_string()]);
    amount.data_type = Some("INT64".to_string());
    command.source.where_filters = vec![
        WhereFilter::new(
            "status",
            WhereOperator::Eq,
            vec!["new".to_string(), "open".to_string()],
        ),
        amount,
    ];
    command.source.limit = 1;

    let config = ImportConfig::default();
    ImportOrchestrator::new(&warehouse, &config)
        .import(&command)
        .await
        .unwrap();

    let table = warehouse.table(&destination()).await.unwrap();
    assert_column_names(&table, &["id", "amount"]);
    assert_eq!(
        warehouse.rows(&destination()).await.unwrap(),
        test_rows(&[&["2", "50"]])
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn reordered_mapping_renames_destination_columns() {
    init_test_tracing();

    let warehouse = warehouse_with_source().await;
    let mut command = import_command(source(), destination(), ImportOptions::default());
    command.source.column_mappings =
        test_mappings(&[("amount", "total"), ("ID", "order_id")]);

    let config = ImportConfig::default();
    ImportOrchestrator::new(&warehouse, &config)
        .import(&command)
        .await
        .unwrap();

    let table = warehouse.table(&destination()).await.unwrap();
    assert_column_names(&table, &["total", "order_id"]);
    assert_eq!(
        warehouse.rows(&destination()).await.unwrap().first(),
        Some(&vec![Some("5".to_string()), Some("1".to_string())])
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn every_missing_source_column_is_reported() {
    init_test_tracing();

    let warehouse = warehouse_with_source().await;
    let mut command = import_command(source(), destination(), ImportOptions::default());
    command.source.column_mappings =
        test_mappings(&[("id", "id"), ("col8", "a"), ("col9", "b")]);
    command.source.where_filters = vec![WhereFilter::new(
        "col10",
        WhereOperator::Eq,
        vec!["x".to_string()],
    )];

    let config = ImportConfig::default();
    let err = ImportOrchestrator::new(&warehouse, &config)
        .import(&command)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ColumnsMismatch);
    let detail = err.detail().unwrap();
    for name in ["col8", "col9", "col10"] {
        assert!(detail.contains(&format!("\"{name}\"")), "{detail}");
    }
    assert!(detail.contains("in_c_main"));
    assert!(warehouse.statements().await.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_source_table_is_not_found() {
    init_test_tracing();

    let warehouse = MemoryWarehouse::new();
    let config = ImportConfig::default();
    let err = ImportOrchestrator::new(&warehouse, &config)
        .import(&import_command(
            source(),
            destination(),
            ImportOptions::default(),
        ))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ObjectNotFound);
}
