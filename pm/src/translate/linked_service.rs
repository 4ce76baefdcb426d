//! Linked service translators
//!
//! Normalize raw linked-service definitions (storage accounts, Databricks workspaces,
//! SQL servers) into IR. Missing or malformed connection attributes yield
//! [`Untranslatable`] rather than an error.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use super::fields::{array_field, present, scalar_to_string, str_field};
use crate::ir::{
    AbfsService, Autoscale, ClusterLogConf, ClusterSpec, DatabricksService, Destination, InitScript, LinkedService,
    PROVENANCE_TAG, SqlServerService, Translation, Untranslatable, WorkerSpec,
};

/// Name used for linked services that have none
pub const UNNAMED_LINKED_SERVICE: &str = "UNNAMED_LINKED_SERVICE";

static ACCOUNT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"AccountName=([a-zA-Z0-9]+)(?:;|$)").expect("account name pattern"));
static PROTOCOL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"DefaultEndpointsProtocol=([a-zA-Z0-9]+)(?:;|$)").expect("protocol pattern"));
static ENDPOINT_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"EndpointSuffix=([a-zA-Z0-9.]+)(?:;|$)").expect("endpoint suffix pattern"));
static ACCOUNT_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"AccountKey=([^;]+)(?:;|$)").expect("account key pattern"));

/// Kind of linked service a consumer needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    Abfs,
    DatabricksCluster,
    SqlServer,
}

impl ServiceKind {
    pub fn from_type_tag(tag: &str) -> Option<Self> {
        debug!(%tag, "ServiceKind::from_type_tag: called");
        match tag {
            "AzureBlobFS" | "AzureBlobStorage" | "AzureDataLakeStore" => Some(Self::Abfs),
            "AzureDatabricks" | "AzureDatabricksDeltaLake" => Some(Self::DatabricksCluster),
            "AzureSqlDatabase" | "AzureSqlMI" | "SqlServer" => Some(Self::SqlServer),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Abfs => "abfs",
            Self::DatabricksCluster => "databricks",
            Self::SqlServer => "sqlserver",
        }
    }
}

/// Fail when the definition's type tag names a different kind of service
///
/// Untagged definitions and unknown tags are accepted as `expected`.
pub fn check_kind(definition: &Value, expected: ServiceKind) -> Translation<()> {
    let tag = definition
        .get("properties")
        .and_then(|p| str_field(p, "type"))
        .or_else(|| str_field(definition, "type"));
    match tag.and_then(ServiceKind::from_type_tag) {
        Some(kind) if kind != expected => {
            debug!(?kind, ?expected, "check_kind: type tag does not match expected kind");
            Err(Untranslatable::new(
                definition.clone(),
                format!(
                    "Linked service type '{}' does not match expected kind '{}'",
                    tag.unwrap_or_default(),
                    expected.as_str()
                ),
            ))
        }
        _ => Ok(()),
    }
}

/// Translate a linked service of the expected kind
pub fn translate_linked_service(definition: &Value, expected: ServiceKind) -> Translation<LinkedService> {
    debug!(?expected, "translate_linked_service: called");
    check_kind(definition, expected)?;
    match expected {
        ServiceKind::Abfs => translate_abfs(definition).map(LinkedService::Abfs),
        ServiceKind::DatabricksCluster => translate_databricks(definition).map(LinkedService::DatabricksCluster),
        ServiceKind::SqlServer => translate_sql_server(definition).map(LinkedService::SqlServer),
    }
}

fn service_name(definition: &Value) -> String {
    str_field(definition, "name").unwrap_or(UNNAMED_LINKED_SERVICE).to_string()
}

fn require_definition(definition: &Value, label: &str) -> Translation<()> {
    match definition.as_object() {
        Some(object) if !object.is_empty() => Ok(()),
        _ => Err(Untranslatable::new(
            definition.clone(),
            format!("Missing {label} linked service definition"),
        )),
    }
}

/// Storage account from its connection string
pub fn translate_abfs(definition: &Value) -> Translation<AbfsService> {
    debug!("translate_abfs: called");
    require_definition(definition, "ABFS")?;
    let properties = definition.get("properties").unwrap_or(&Value::Null);
    let connection_string = str_field(properties, "url")
        .or_else(|| str_field(properties, "connection_string"))
        .ok_or_else(|| {
            Untranslatable::new(
                definition.clone(),
                "Missing property 'url' in ABFS linked service definition",
            )
        })?;

    let parts = parse_connection_string(connection_string)
        .map_err(|e| e.within(definition).context("Invalid property 'url' in ABFS linked service definition"))?;

    Ok(AbfsService {
        name: service_name(definition),
        storage_account_name: parts.account_name,
        url: parts.url,
        account_key: parts.account_key,
    })
}

struct ConnectionParts {
    account_name: String,
    url: String,
    account_key: Option<String>,
}

fn capture(pattern: &Regex, input: &str) -> Option<String> {
    pattern.captures(input).map(|c| c[1].to_string())
}

fn parse_connection_string(connection_string: &str) -> Translation<ConnectionParts> {
    debug!("parse_connection_string: called");
    let missing = |what: &str| {
        Untranslatable::new(
            connection_string,
            format!("Could not parse {what} from connection string '{connection_string}'"),
        )
    };
    let account_name = capture(&ACCOUNT_NAME, connection_string).ok_or_else(|| missing("Storage Account name"))?;
    let protocol = capture(&PROTOCOL, connection_string).ok_or_else(|| missing("Protocol"))?;
    let suffix = capture(&ENDPOINT_SUFFIX, connection_string).ok_or_else(|| missing("Suffix"))?;
    Ok(ConnectionParts {
        url: format!("{protocol}://{account_name}.blob.{suffix}/"),
        account_name,
        account_key: capture(&ACCOUNT_KEY, connection_string),
    })
}

/// SQL Server connection attributes
pub fn translate_sql_server(definition: &Value) -> Translation<SqlServerService> {
    debug!("translate_sql_server: called");
    require_definition(definition, "SQL Server")?;
    let properties = definition.get("properties").unwrap_or(&Value::Null);
    Ok(SqlServerService {
        name: service_name(definition),
        host: str_field(properties, "server").map(str::to_string),
        database: str_field(properties, "database").map(str::to_string),
        user_name: str_field(properties, "user_name").map(str::to_string),
        authentication_type: str_field(properties, "authentication_type").map(str::to_string),
    })
}

/// Databricks workspace with its job cluster
pub fn translate_databricks(definition: &Value) -> Translation<DatabricksService> {
    debug!("translate_databricks: called");
    let cluster = translate_cluster_spec(definition)?;
    let properties = definition.get("properties").unwrap_or(&Value::Null);
    Ok(DatabricksService {
        name: service_name(definition),
        host_name: str_field(properties, "domain").map(str::to_string),
        cluster,
    })
}

/// Job cluster settings from a Databricks linked service
pub fn translate_cluster_spec(definition: &Value) -> Translation<ClusterSpec> {
    debug!("translate_cluster_spec: called");
    require_definition(definition, "Databricks")?;
    let properties = definition.get("properties").unwrap_or(&Value::Null);

    let workers =
        parse_workers(present(properties, "new_cluster_num_of_worker")).map_err(|e| e.within(definition))?;

    let mut custom_tags = BTreeMap::new();
    if let Some(tags) = properties.get("new_cluster_custom_tags").and_then(Value::as_object) {
        for (key, value) in tags {
            custom_tags.insert(key.clone(), scalar_to_string(value));
        }
    }
    custom_tags.insert(PROVENANCE_TAG.to_string(), String::new());

    let init_scripts = array_field(properties, "new_cluster_init_scripts")
        .map(|scripts| scripts.iter().filter_map(Value::as_str).map(InitScript::from_path).collect())
        .unwrap_or_default();

    Ok(ClusterSpec {
        spark_version: str_field(properties, "new_cluster_version").map(str::to_string),
        node_type_id: str_field(properties, "new_cluster_node_type").map(str::to_string),
        driver_node_type_id: str_field(properties, "new_cluster_driver_node_type").map(str::to_string),
        custom_tags,
        spark_conf: object_map(properties, "new_cluster_spark_conf"),
        spark_env_vars: object_map(properties, "new_cluster_spark_env_vars"),
        init_scripts,
        cluster_log_conf: str_field(properties, "new_cluster_log_destination").map(|destination| ClusterLogConf {
            dbfs: Destination {
                destination: destination.to_string(),
            },
        }),
        workers,
    })
}

fn object_map(properties: &Value, key: &str) -> Option<BTreeMap<String, Value>> {
    properties
        .get(key)
        .and_then(Value::as_object)
        .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
}

/// `"min:max"` is an autoscale range; anything else must be a fixed worker count
pub fn parse_workers(raw: Option<&Value>) -> Translation<Option<WorkerSpec>> {
    debug!(?raw, "parse_workers: called");
    let Some(raw) = raw else {
        return Ok(None);
    };
    let text = match raw {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        other => {
            return Err(Untranslatable::new(
                other.clone(),
                format!("Invalid number of workers '{other}'"),
            ));
        }
    };

    if let Some((min, max)) = text.split_once(':') {
        let parsed = min.trim().parse::<u32>().ok().zip(max.trim().parse::<u32>().ok());
        return match parsed {
            Some((min_workers, max_workers)) if min_workers <= max_workers => Ok(Some(WorkerSpec::Autoscale {
                autoscale: Autoscale {
                    min_workers,
                    max_workers,
                },
            })),
            _ => Err(Untranslatable::new(
                raw.clone(),
                format!("Invalid autoscale policy '{text}'"),
            )),
        };
    }

    text.parse::<u32>()
        .map(|num_workers| Some(WorkerSpec::Fixed { num_workers }))
        .map_err(|_| Untranslatable::new(raw.clone(), format!("Invalid number of workers '{text}'")))
}
