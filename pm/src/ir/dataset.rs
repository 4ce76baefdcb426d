//! Dataset IR
//!
//! Datasets are the sources and sinks of Copy activities. Every dataset carries a
//! normalized [`DatasetType`], which is a closed set: code generation dispatches on it
//! without a fallback arm.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::linked_service::{AbfsService, SqlServerService};

/// Normalized dataset type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetType {
    Avro,
    Csv,
    Json,
    Orc,
    Parquet,
    Delta,
    Sqlserver,
}

impl DatasetType {
    pub const ALL: [DatasetType; 7] = [
        Self::Avro,
        Self::Csv,
        Self::Json,
        Self::Orc,
        Self::Parquet,
        Self::Delta,
        Self::Sqlserver,
    ];

    /// Map a dataset definition's `properties.type`
    pub fn from_dataset_tag(tag: &str) -> Option<Self> {
        debug!(%tag, "DatasetType::from_dataset_tag: called");
        match tag {
            "Avro" => Some(Self::Avro),
            "DelimitedText" => Some(Self::Csv),
            "Json" => Some(Self::Json),
            "Orc" => Some(Self::Orc),
            "Parquet" => Some(Self::Parquet),
            "AzureDatabricksDeltaLakeDataset" => Some(Self::Delta),
            "AzureSqlTable" => Some(Self::Sqlserver),
            _ => None,
        }
    }

    /// Map a Copy activity `source`/`sink` block type
    pub fn from_copy_tag(tag: &str) -> Option<Self> {
        debug!(%tag, "DatasetType::from_copy_tag: called");
        match tag {
            "AvroSource" | "AvroSink" => Some(Self::Avro),
            "DelimitedTextSource" | "DelimitedTextSink" => Some(Self::Csv),
            "JsonSource" | "JsonSink" => Some(Self::Json),
            "OrcSource" | "OrcSink" => Some(Self::Orc),
            "ParquetSource" | "ParquetSink" => Some(Self::Parquet),
            "AzureDatabricksDeltaLakeSource" | "AzureDatabricksDeltaLakeSink" => Some(Self::Delta),
            "AzureSqlSource" | "AzureSqlSink" => Some(Self::Sqlserver),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Avro => "avro",
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Orc => "orc",
            Self::Parquet => "parquet",
            Self::Delta => "delta",
            Self::Sqlserver => "sqlserver",
        }
    }

    /// File formats stored in an ABFS container
    pub fn is_file(&self) -> bool {
        matches!(self, Self::Avro | Self::Csv | Self::Json | Self::Orc | Self::Parquet)
    }

    /// Credentials that must exist in the secret scope before the generated script runs
    pub fn secret_names(&self) -> &'static [&'static str] {
        match self {
            Self::Avro | Self::Csv | Self::Json | Self::Orc | Self::Parquet => &["storage_account_key"],
            Self::Delta => &[],
            Self::Sqlserver => &["host", "database", "user_name", "password"],
        }
    }

    /// Reader/writer options emitted into generated scripts, in emission order
    pub fn option_names(&self) -> &'static [&'static str] {
        match self {
            Self::Csv => &[
                "header",
                "sep",
                "lineSep",
                "quote",
                "quoteAll",
                "escape",
                "nullValue",
                "compression",
                "encoding",
            ],
            Self::Json => &["encoding", "compression"],
            Self::Avro | Self::Orc | Self::Parquet => &["compression"],
            Self::Sqlserver => &["mode", "dbtable", "numPartitions", "batchsize", "sessionInitStatement"],
            Self::Delta => &[],
        }
    }
}

impl fmt::Display for DatasetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A translated dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Dataset {
    File(FileDataset),
    DeltaTable(DeltaTableDataset),
    SqlTable(SqlTableDataset),
}

impl Dataset {
    pub fn name(&self) -> &str {
        match self {
            Self::File(d) => &d.name,
            Self::DeltaTable(d) => &d.name,
            Self::SqlTable(d) => &d.name,
        }
    }

    pub fn dataset_type(&self) -> DatasetType {
        match self {
            Self::File(d) => d.dataset_type,
            Self::DeltaTable(_) => DatasetType::Delta,
            Self::SqlTable(_) => DatasetType::Sqlserver,
        }
    }

    pub fn service_name(&self) -> &str {
        match self {
            Self::File(d) => &d.service.name,
            Self::DeltaTable(d) => &d.service_name,
            Self::SqlTable(d) => &d.service.name,
        }
    }
}

/// Files in an ABFS container
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileDataset {
    pub name: String,
    pub dataset_type: DatasetType,
    pub container: String,
    /// `folder/file`, or just the file name when no folder is set
    pub folder_path: String,
    pub format_options: BTreeMap<String, String>,
    pub service: AbfsService,
}

/// A Delta table reachable from the workspace metastore
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeltaTableDataset {
    pub name: String,
    pub catalog: Option<String>,
    pub database: String,
    pub table: String,
    pub service_name: String,
}

impl DeltaTableDataset {
    /// Three-part table name; defaults to the legacy metastore catalog
    pub fn qualified_name(&self) -> String {
        let catalog = self.catalog.as_deref().unwrap_or("hive_metastore");
        format!("{}.{}.{}", catalog, self.database, self.table)
    }
}

/// A SQL Server table read or written over JDBC
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlTableDataset {
    pub name: String,
    pub schema: String,
    pub table: String,
    pub service: SqlServerService,
}

impl SqlTableDataset {
    pub fn dbtable(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }
}

/// Format and connection options from a Copy activity's `source` or `sink` block
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetProperties {
    pub dataset_type: DatasetType,
    pub options: BTreeMap<String, Value>,
}

/// One source column projected onto one sink column
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnMapping {
    pub source_column: String,
    pub sink_column: String,
    pub sink_type: Option<String>,
}
