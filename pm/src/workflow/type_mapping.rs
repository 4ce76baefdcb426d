//! Column type mapping
//!
//! Interim source column types to Spark SQL types used in generated `cast` expressions.

use tracing::debug;

use crate::ir::DatasetType;

/// Spark SQL type for a sink column, or `None` when the type has no mapping
///
/// Delta sinks already carry Spark types, so their declared type is used verbatim.
pub fn spark_type(sink_type: &str, sink: DatasetType) -> Option<String> {
    debug!(%sink_type, %sink, "spark_type: called");
    if sink == DatasetType::Delta {
        return Some(sink_type.to_string());
    }
    let mapped = match sink_type {
        "Boolean" => "boolean",
        "Int16" => "short",
        "Int32" => "int",
        "Int64" => "long",
        "Single" => "float",
        "Double" => "double",
        "Decimal" => "decimal(38, 38)",
        "String" | "Guid" => "string",
        "DateTime" | "DateTimeOffset" => "timestamp",
        "Byte[]" => "binary",
        _ => return None,
    };
    Some(mapped.to_string())
}
