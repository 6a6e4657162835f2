//! Table schemas used to parse batch files and project transformed rows.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use firehose_common::{PipelineError, Result, LANDING_COLUMNS};
use serde::Deserialize;
use tracing::info;

/// Column lookup for a `(database, table)` pair.
#[async_trait]
pub trait SchemaCatalog: Send + Sync {
    /// Ordered column names. With `include_partitions`, the partition
    /// columns follow the data columns.
    async fn columns(
        &self,
        database: &str,
        table: &str,
        include_partitions: bool,
    ) -> Result<Vec<String>>;
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TableSchema {
    pub database: String,
    pub table: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub partition_keys: Vec<String>,
}

pub const STAGING_COLUMNS: [&str; 10] = [
    "hash_id",
    "record_id",
    "tweet_id",
    "time_stamp",
    "user_name",
    "rt_count",
    "text_clean",
    "polarity",
    "subjectivity",
    "hashtag",
];

pub const PARTITION_COLUMNS: [&str; 3] = ["year", "month", "day"];

#[derive(Deserialize)]
struct CatalogFile {
    tables: Vec<TableSchema>,
}

/// Catalog held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    tables: HashMap<(String, String), TableSchema>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The landing table (raw batch rows) and the staging table (transformed
    /// rows, partitioned by day) under the given names.
    pub fn builtin(source: (&str, &str), target: (&str, &str)) -> Self {
        let owned = |cols: &[&str]| cols.iter().map(|c| c.to_string()).collect::<Vec<_>>();
        Self::new()
            .with_table(TableSchema {
                database: source.0.to_string(),
                table: source.1.to_string(),
                columns: owned(&LANDING_COLUMNS),
                partition_keys: Vec::new(),
            })
            .with_table(TableSchema {
                database: target.0.to_string(),
                table: target.1.to_string(),
                columns: owned(&STAGING_COLUMNS),
                partition_keys: owned(&PARTITION_COLUMNS),
            })
    }

    /// Tables from a JSON file of the form `{"tables": [TableSchema, ...]}`.
    pub async fn from_json_file(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| PipelineError::Config(format!("read catalog {}: {e}", path.display())))?;
        let catalog = Self::from_json(&raw)?;
        info!(path = %path.display(), tables = catalog.tables.len(), "Loaded schema catalog");
        Ok(catalog)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(raw)
            .map_err(|e| PipelineError::Config(format!("invalid catalog: {e}")))?;
        let mut catalog = Self::new();
        for table in file.tables {
            if table.columns.is_empty() {
                return Err(PipelineError::Config(format!(
                    "catalog table {}.{} has no columns",
                    table.database, table.table
                )));
            }
            catalog = catalog.with_table(table);
        }
        Ok(catalog)
    }

    pub fn with_table(mut self, table: TableSchema) -> Self {
        self.tables
            .insert((table.database.clone(), table.table.clone()), table);
        self
    }

    /// Tables in `other` replace same-named tables here.
    pub fn merged(mut self, other: StaticCatalog) -> Self {
        self.tables.extend(other.tables);
        self
    }

    pub fn table(&self, database: &str, table: &str) -> Option<&TableSchema> {
        self.tables.get(&(database.to_string(), table.to_string()))
    }
}

#[async_trait]
impl SchemaCatalog for StaticCatalog {
    async fn columns(
        &self,
        database: &str,
        table: &str,
        include_partitions: bool,
    ) -> Result<Vec<String>> {
        let schema = self.table(database, table).ok_or_else(|| {
            PipelineError::Validation(format!("table {database}.{table} not found in catalog"))
        })?;

        let mut columns = schema.columns.clone();
        if include_partitions {
            columns.extend(schema.partition_keys.iter().cloned());
        }
        Ok(columns)
    }
}
