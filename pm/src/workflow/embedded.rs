//! Embedded code generation templates
//!
//! Compiled into the binary from the `.hbs` files under `templates/`.

use tracing::debug;

pub const COPY_NOTEBOOK: &str = include_str!("../../templates/copy-notebook.hbs");
pub const DLT_NOTEBOOK: &str = include_str!("../../templates/dlt-notebook.hbs");

pub const READ_FILE: &str = include_str!("../../templates/read-file.hbs");
pub const READ_DELTA: &str = include_str!("../../templates/read-delta.hbs");
pub const READ_SQLSERVER: &str = include_str!("../../templates/read-sqlserver.hbs");

pub const WRITE_AVRO: &str = include_str!("../../templates/write-avro.hbs");
pub const WRITE_CSV: &str = include_str!("../../templates/write-csv.hbs");
pub const WRITE_JSON: &str = include_str!("../../templates/write-json.hbs");
pub const WRITE_ORC: &str = include_str!("../../templates/write-orc.hbs");
pub const WRITE_PARQUET: &str = include_str!("../../templates/write-parquet.hbs");
pub const WRITE_DELTA: &str = include_str!("../../templates/write-delta.hbs");
pub const WRITE_SQLSERVER: &str = include_str!("../../templates/write-sqlserver.hbs");

/// Every embedded template name, in listing order
pub const NAMES: [&str; 12] = [
    "copy-notebook",
    "dlt-notebook",
    "read-file",
    "read-delta",
    "read-sqlserver",
    "write-avro",
    "write-csv",
    "write-json",
    "write-orc",
    "write-parquet",
    "write-delta",
    "write-sqlserver",
];

/// Get the embedded template by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    let template = match name {
        "copy-notebook" => COPY_NOTEBOOK,
        "dlt-notebook" => DLT_NOTEBOOK,
        "read-file" => READ_FILE,
        "read-delta" => READ_DELTA,
        "read-sqlserver" => READ_SQLSERVER,
        "write-avro" => WRITE_AVRO,
        "write-csv" => WRITE_CSV,
        "write-json" => WRITE_JSON,
        "write-orc" => WRITE_ORC,
        "write-parquet" => WRITE_PARQUET,
        "write-delta" => WRITE_DELTA,
        "write-sqlserver" => WRITE_SQLSERVER,
        _ => {
            debug!(%name, "get_embedded: no match found");
            return None;
        }
    };
    Some(template)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_name_is_embedded() {
        for name in NAMES {
            assert!(get_embedded(name).is_some(), "{name}");
        }
    }

    #[test]
    fn test_notebooks_start_with_source_marker() {
        assert!(COPY_NOTEBOOK.starts_with("# Databricks notebook source"));
        assert!(DLT_NOTEBOOK.starts_with("# Databricks notebook source"));
        assert!(DLT_NOTEBOOK.contains("delta.createdBy.pipemigrate"));
    }

    #[test]
    fn test_get_embedded_unknown() {
        assert!(get_embedded("write-xml").is_none());
    }
}
