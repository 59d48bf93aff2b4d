use std::collections::{BTreeMap, HashMap};
use std::fmt;

use driver::error::DriverResult;
use driver::source::SourceDescriptor;
use driver::sql::{QueryBindings, QueryParameter as BoundValue, SqlQuery, Statement};
use driver::types::{ImportOptions, ImportResult, LoadState, TableSchema};
use driver::warehouse::{
    BulkLoader, FinalTableMerger, LoadOptions, QueryExecutor, QueryOutcome, SqlBulkLoader,
    SqlFinalTableMerger,
};
use gcp_bigquery_client::Client;
use gcp_bigquery_client::client_builder::ClientBuilder;
use gcp_bigquery_client::error::BQError;
use gcp_bigquery_client::model::query_parameter::QueryParameter;
use gcp_bigquery_client::model::query_parameter_type::QueryParameterType;
use gcp_bigquery_client::model::query_parameter_value::QueryParameterValue;
use gcp_bigquery_client::model::query_request::QueryRequest;
use gcp_bigquery_client::model::query_response::ResultSet;
use gcp_bigquery_client::yup_oauth2::parse_service_account_key;
use tracing::{debug, info};

use crate::error::bq_error_to_driver_error;

/// Parameter mode of queries using `@name` parameters.
const NAMED_PARAMETER_MODE: &str = "NAMED";

/// Result of one query job.
pub(crate) struct QueryResult {
    pub(crate) rows: ResultSet,
    pub(crate) affected_rows: Option<u64>,
}

/// Client running import statements as BigQuery query jobs.
///
/// Every job runs in the configured location and carries the labels of the invocation that
/// opened the client.
#[derive(Clone)]
pub struct BigQueryClient {
    project_id: String,
    location: Option<String>,
    labels: BTreeMap<String, String>,
    client: Client,
}

impl BigQueryClient {
    /// Creates a new [`BigQueryClient`] from a service account key JSON string.
    pub async fn new_with_key(
        project_id: String,
        sa_key: &str,
        location: Option<String>,
    ) -> DriverResult<BigQueryClient> {
        let sa_key = parse_service_account_key(sa_key)
            .map_err(BQError::from)
            .map_err(bq_error_to_driver_error)?;
        let client = ClientBuilder::new()
            .build_from_service_account_key(sa_key, false)
            .await
            .map_err(bq_error_to_driver_error)?;

        info!(%project_id, ?location, "created bigquery client");

        Ok(BigQueryClient {
            project_id,
            location,
            labels: BTreeMap::new(),
            client,
        })
    }

    /// Attaches `labels` to every job started by this client.
    pub fn with_labels(mut self, labels: BTreeMap<String, String>) -> BigQueryClient {
        self.labels = labels;
        self
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Runs `query` as a query job and returns its rows.
    pub(crate) async fn query(&self, query: &SqlQuery) -> DriverResult<QueryResult> {
        let request = self.query_request(query);

        let response = self
            .client
            .job()
            .query(&self.project_id, request)
            .await
            .map_err(bq_error_to_driver_error)?;
        let affected_rows = response
            .num_dml_affected_rows
            .as_deref()
            .and_then(|rows| rows.parse::<u64>().ok());

        Ok(QueryResult {
            rows: ResultSet::new_from_query_response(response),
            affected_rows,
        })
    }

    fn query_request(&self, query: &SqlQuery) -> QueryRequest {
        let mut request = QueryRequest::new(query.sql.clone());
        request.location = self.location.clone();

        if !self.labels.is_empty() {
            request.labels = Some(
                self.labels
                    .iter()
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect::<HashMap<_, _>>(),
            );
        }

        if !query.bindings.is_empty() {
            request.parameter_mode = Some(NAMED_PARAMETER_MODE.to_string());
            request.query_parameters = Some(query_parameters(&query.bindings));
        }

        request
    }
}

impl fmt::Debug for BigQueryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BigQueryClient")
            .field("project_id", &self.project_id)
            .field("location", &self.location)
            .field("labels", &self.labels)
            .finish()
    }
}

/// Converts named bindings to BigQuery query parameters.
fn query_parameters(bindings: &QueryBindings) -> Vec<QueryParameter> {
    bindings
        .iter()
        .map(|(name, value)| {
            let (parameter_type, parameter_value) = match value {
                BoundValue::String(value) => (scalar_type("STRING"), scalar_value(value.clone())),
                BoundValue::StringArray(values) => (
                    QueryParameterType {
                        r#type: "ARRAY".to_string(),
                        array_type: Some(Box::new(scalar_type("STRING"))),
                        struct_types: None,
                    },
                    QueryParameterValue {
                        value: None,
                        array_values: Some(values.iter().cloned().map(scalar_value).collect()),
                        struct_values: None,
                    },
                ),
            };

            QueryParameter {
                name: Some(name.clone()),
                parameter_type: Some(parameter_type),
                parameter_value: Some(parameter_value),
            }
        })
        .collect()
}

fn scalar_type(name: &str) -> QueryParameterType {
    QueryParameterType {
        r#type: name.to_string(),
        array_type: None,
        struct_types: None,
    }
}

fn scalar_value(value: String) -> QueryParameterValue {
    QueryParameterValue {
        value: Some(value),
        array_values: None,
        struct_values: None,
    }
}

impl QueryExecutor for BigQueryClient {
    async fn execute(&self, statement: &Statement) -> DriverResult<QueryOutcome> {
        let query = SqlQuery::new(statement.to_sql()?, statement.bindings());

        debug!(statement = statement.name(), sql = %query.sql, "executing statement");

        let result = self.query(&query).await?;

        Ok(QueryOutcome {
            affected_rows: result.affected_rows,
        })
    }
}

impl BulkLoader for BigQueryClient {
    async fn load(
        &self,
        source: &SourceDescriptor,
        target: &TableSchema,
        options: &LoadOptions,
    ) -> DriverResult<LoadState> {
        SqlBulkLoader::new(self).load(source, target, options).await
    }
}

impl FinalTableMerger for BigQueryClient {
    async fn merge_to_final(
        &self,
        staging: &TableSchema,
        destination: &TableSchema,
        options: &ImportOptions,
        load_state: &LoadState,
    ) -> DriverResult<ImportResult> {
        SqlFinalTableMerger::new(self)
            .merge_to_final(staging, destination, options, load_state)
            .await
    }
}
