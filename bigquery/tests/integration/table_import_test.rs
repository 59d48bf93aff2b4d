use std::env;

use bigquery::{BigQueryConnector, BigQueryCredentials};
use config::shared::ImportConfig;
use driver::import::TableImportHandler;
use driver::sql::{QueryBindings, SqlQuery, Statement};
use driver::types::{
    Column, ColumnSet, ImportCommand, ImportOptions, RuntimeOptions, SourceTableMapping,
    TableIdent, TableSchema,
};
use driver::warehouse::{QueryExecutor, SchemaReflector, WarehouseConnector};
use secrecy::SecretString;
use telemetry::init_test_tracing;
use uuid::Uuid;

/// Environment variable name for the BigQuery project id.
const BIGQUERY_PROJECT_ID_ENV_NAME: &str = "TESTS_BIGQUERY_PROJECT_ID";
/// Environment variable name for the BigQuery service account key path.
const BIGQUERY_SA_KEY_PATH_ENV_NAME: &str = "TESTS_BIGQUERY_SA_KEY_PATH";
/// Environment variable name for an existing dataset the tests may write to.
const BIGQUERY_DATASET_ENV_NAME: &str = "TESTS_BIGQUERY_DATASET";

/// Returns the credentials and dataset of the test project, [`None`] when not configured.
fn test_project() -> Option<(BigQueryCredentials, String)> {
    let project_id = env::var(BIGQUERY_PROJECT_ID_ENV_NAME).ok()?;
    let key_path = env::var(BIGQUERY_SA_KEY_PATH_ENV_NAME).ok()?;
    let dataset = env::var(BIGQUERY_DATASET_ENV_NAME).ok()?;
    let key = std::fs::read_to_string(key_path).expect("Failed to read the service account key");

    Some((
        BigQueryCredentials {
            project_id,
            service_account_key: SecretString::new(key),
        },
        dataset,
    ))
}

fn test_table_name(prefix: &str) -> String {
    format!("{prefix}_{}", Uuid::new_v4().simple())
}

#[tokio::test(flavor = "multi_thread")]
async fn full_import_copies_rows_between_tables() {
    init_test_tracing();

    let Some((credentials, dataset)) = test_project() else {
        eprintln!("skipping BigQuery test, {BIGQUERY_PROJECT_ID_ENV_NAME} is not set");
        return;
    };

    let connector = BigQueryConnector::default();
    let client = connector
        .connect(&credentials, &RuntimeOptions::default())
        .await
        .unwrap();

    let source = TableIdent::new(&dataset, test_table_name("source"));
    let destination = TableIdent::new(&dataset, test_table_name("destination"));

    let schema = TableSchema::new(
        source.clone(),
        ColumnSet::new(vec![
            Column::new("id", "INT64", None, false, None),
            Column::string("name"),
        ])
        .unwrap(),
    );
    client
        .execute(&Statement::CreateTable { schema })
        .await
        .unwrap();
    client
        .execute(&Statement::Raw {
            query: SqlQuery::new(
                format!(
                    "insert into `{}`.`{}` (`id`, `name`) values (1, 'a'), (2, 'b'), (3, 'c')",
                    source.schema, source.table
                ),
                QueryBindings::new(),
            ),
        })
        .await
        .unwrap();

    let reflected = client.table_definition(&source).await.unwrap().unwrap();
    assert_eq!(reflected.column_names(), vec!["id", "name"]);
    assert!(!reflected.columns.get("id").unwrap().nullable);

    let handler = TableImportHandler::new(connector, ImportConfig::default());
    let command = ImportCommand {
        source: SourceTableMapping::new(source.clone()),
        destination: destination.clone(),
        import_options: ImportOptions {
            dedup_columns: vec!["id".to_string()],
            ..ImportOptions::default()
        },
    };
    let response = handler
        .handle(&credentials, command, &[], None)
        .await
        .unwrap();

    assert_eq!(response.imported_rows_count, 3);
    assert_eq!(response.imported_columns, vec!["id", "name"]);

    for table in [source, destination] {
        client
            .execute(&Statement::DropTable { table })
            .await
            .unwrap();
    }
}
