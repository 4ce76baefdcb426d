//! Linked service IR
//!
//! Connection metadata normalized from source linked-service definitions. Cluster
//! specifications serialize directly into the `new_cluster` block of a job task.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// A translated linked service
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "service_type", rename_all = "snake_case")]
pub enum LinkedService {
    Abfs(AbfsService),
    DatabricksCluster(DatabricksService),
    SqlServer(SqlServerService),
}

impl LinkedService {
    pub fn name(&self) -> &str {
        match self {
            Self::Abfs(s) => &s.name,
            Self::DatabricksCluster(s) => &s.name,
            Self::SqlServer(s) => &s.name,
        }
    }
}

/// Storage account reachable over ABFS
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AbfsService {
    pub name: String,
    pub storage_account_name: String,
    /// Blob endpoint, e.g. `https://account.blob.core.windows.net/`
    pub url: String,
    /// Account key when the connection string embeds one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_key: Option<String>,
}

/// SQL Server reachable over JDBC
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SqlServerService {
    pub name: String,
    pub host: Option<String>,
    pub database: Option<String>,
    pub user_name: Option<String>,
    pub authentication_type: Option<String>,
}

/// Databricks workspace plus the cluster its activities should run on
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatabricksService {
    pub name: String,
    pub host_name: Option<String>,
    pub cluster: ClusterSpec,
}

/// Job cluster specification, serialized as a task's `new_cluster`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClusterSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spark_version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_type_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_node_type_id: Option<String>,

    pub custom_tags: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub spark_conf: Option<BTreeMap<String, Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub spark_env_vars: Option<BTreeMap<String, Value>>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub init_scripts: Vec<InitScript>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_log_conf: Option<ClusterLogConf>,

    #[serde(flatten)]
    pub workers: Option<WorkerSpec>,
}

/// Cluster sizing: autoscale bounds or a fixed worker count, never both
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum WorkerSpec {
    Autoscale { autoscale: Autoscale },
    Fixed { num_workers: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Autoscale {
    pub min_workers: u32,
    pub max_workers: u32,
}

/// Script or log location
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Destination {
    pub destination: String,
}

/// Where an init script is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InitScriptType {
    Dbfs,
    Volumes,
    Workspace,
}

impl InitScriptType {
    /// Classify a script path by its prefix; every path has a type
    pub fn classify(path: &str) -> Self {
        debug!(%path, "InitScriptType::classify: called");
        if path.starts_with("dbfs:") {
            Self::Dbfs
        } else if path.starts_with("/Volumes") {
            Self::Volumes
        } else {
            Self::Workspace
        }
    }
}

/// Init script reference, serialized as `{"<type>": {"destination": ...}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InitScript {
    Dbfs(Destination),
    Volumes(Destination),
    Workspace(Destination),
}

impl InitScript {
    pub fn from_path(path: &str) -> Self {
        let destination = Destination {
            destination: path.to_string(),
        };
        match InitScriptType::classify(path) {
            InitScriptType::Dbfs => Self::Dbfs(destination),
            InitScriptType::Volumes => Self::Volumes(destination),
            InitScriptType::Workspace => Self::Workspace(destination),
        }
    }

    pub fn script_type(&self) -> InitScriptType {
        match self {
            Self::Dbfs(_) => InitScriptType::Dbfs,
            Self::Volumes(_) => InitScriptType::Volumes,
            Self::Workspace(_) => InitScriptType::Workspace,
        }
    }
}

/// Cluster log delivery, always to DBFS
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterLogConf {
    pub dbfs: Destination,
}
