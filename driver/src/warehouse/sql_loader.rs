use tracing::debug;

use crate::error::DriverResult;
use crate::source::SourceDescriptor;
use crate::sql::{MappedSqlSourceBuilder, Statement};
use crate::types::{ColumnMapping, LoadState, TableSchema};
use crate::warehouse::{BulkLoader, LoadOptions, QueryExecutor};

/// Loads rows with a single `insert into ... select` statement.
#[derive(Debug, Clone)]
pub struct SqlBulkLoader<E> {
    executor: E,
}

impl<E> SqlBulkLoader<E> {
    pub fn new(executor: E) -> SqlBulkLoader<E> {
        Self { executor }
    }
}

impl<E> BulkLoader for SqlBulkLoader<E>
where
    E: QueryExecutor + Sync,
{
    async fn load(
        &self,
        source: &SourceDescriptor,
        target: &TableSchema,
        options: &LoadOptions,
    ) -> DriverResult<LoadState> {
        let mappings = if options.mappings.is_empty() {
            source
                .selected_columns
                .iter()
                .map(|name| ColumnMapping::new(name, name))
                .collect()
        } else {
            options.mappings.clone()
        };
        let columns: Vec<String> = mappings
            .iter()
            .map(|mapping| mapping.destination_column_name.clone())
            .collect();

        let query =
            MappedSqlSourceBuilder::new(mappings, options.cast_to_string, source.sql_base())?
                .render()?;
        let statement = Statement::InsertSelect {
            target: target.ident.clone(),
            columns: columns.clone(),
            query,
        };

        let outcome = self.executor.execute(&statement).await?;
        let rows = outcome.affected_rows.unwrap_or(0);

        debug!(source = %source.table(), target = %target.ident, rows, "loaded rows");

        Ok(LoadState { rows, columns })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::source::SourceKind;
    use crate::sql::SqlQuery;
    use crate::types::{Column, ColumnSet, TableIdent};
    use crate::warehouse::QueryOutcome;

    #[derive(Clone, Default)]
    struct RecordingExecutor {
        statements: Arc<Mutex<Vec<String>>>,
    }

    impl QueryExecutor for RecordingExecutor {
        async fn execute(&self, statement: &Statement) -> DriverResult<QueryOutcome> {
            self.statements.lock().unwrap().push(statement.to_sql()?);
            Ok(QueryOutcome {
                affected_rows: Some(3),
            })
        }
    }

    fn schema(table: &str, columns: &[&str]) -> TableSchema {
        TableSchema::new(
            TableIdent::new("ds", table),
            ColumnSet::new(columns.iter().map(|c| Column::string(*c)).collect()).unwrap(),
        )
    }

    fn direct_source() -> SourceDescriptor {
        let schema = schema("source", &["col1", "col2"]);
        SourceDescriptor {
            kind: SourceKind::DirectTable {
                table: schema.ident.clone(),
                primary_keys: vec![],
            },
            selected_columns: schema.column_names(),
            effective_schema: schema.clone(),
            full_schema: schema,
            where_filters: vec![],
            limit: 0,
            seconds: 0,
        }
    }

    #[tokio::test]
    async fn loads_identity_projection() {
        let executor = RecordingExecutor::default();
        let loader = SqlBulkLoader::new(executor.clone());

        let state = loader
            .load(
                &direct_source(),
                &schema("target", &["col1", "col2"]),
                &LoadOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(state.rows, 3);
        assert_eq!(state.columns, vec!["col1".to_string(), "col2".to_string()]);
        assert_eq!(
            executor.statements.lock().unwrap().as_slice(),
            ["insert into `ds`.`target` (`col1`, `col2`) select `src`.`col1` as `col1`, `src`.`col2` as `col2` from `ds`.`source` as `src`"]
        );
    }

    #[tokio::test]
    async fn loads_mapped_columns_from_generated_query_as_strings() {
        let executor = RecordingExecutor::default();
        let loader = SqlBulkLoader::new(executor.clone());

        let mut source = direct_source();
        source.kind = SourceKind::GeneratedQuery {
            query: SqlQuery::new("select `col2` from `ds`.`source` limit 1", Default::default()),
        };
        let options = LoadOptions {
            mappings: vec![ColumnMapping::new("col2", "other")],
            cast_to_string: true,
        };

        let state = loader
            .load(&source, &schema("target", &["other"]), &options)
            .await
            .unwrap();

        assert_eq!(state.columns, vec!["other".to_string()]);
        assert_eq!(
            executor.statements.lock().unwrap().as_slice(),
            ["insert into `ds`.`target` (`other`) select cast(`src`.`col2` as STRING) as `other` from (select `col2` from `ds`.`source` limit 1) as `src`"]
        );
    }
}
