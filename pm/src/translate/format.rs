//! Format and connection option parsing
//!
//! Two inputs feed the options of a generated script: the dataset definition (file
//! format settings such as delimiters and compression) and the Copy activity's
//! `source`/`sink` block (write behavior, batch sizes, file prefixes).

use std::collections::BTreeMap;

use serde_json::{Value, json};
use tracing::debug;

use super::fields::{lookup, present, scalar_to_string, str_field};
use crate::diagnostics::Diagnostics;
use crate::ir::{DatasetProperties, DatasetType, Translation, Untranslatable};

/// Parse a Copy activity `source` or `sink` block
pub fn parse_dataset_properties(
    block: &Value,
    strict: bool,
    diagnostics: &mut Diagnostics,
) -> Translation<DatasetProperties> {
    debug!("parse_dataset_properties: called");
    let tag = match block.get("type") {
        Some(Value::String(tag)) => tag.as_str(),
        Some(other) => {
            return Err(Untranslatable::new(
                block.clone(),
                format!("Invalid value {other} for property 'type' in dataset definition"),
            ));
        }
        None => {
            return Err(Untranslatable::new(
                block.clone(),
                "Missing property 'type' in dataset definition",
            ));
        }
    };
    let dataset_type = DatasetType::from_copy_tag(tag).ok_or_else(|| {
        Untranslatable::new(block.clone(), format!("Unsupported source or sink type '{tag}'"))
    })?;

    let format_settings = block.get("format_settings").unwrap_or(&Value::Null);
    let mut options = BTreeMap::new();
    let mut put = |key: &str, value: Option<&Value>| {
        if let Some(value) = value.filter(|v| !v.is_null()) {
            options.insert(key.to_string(), value.clone());
        }
    };

    match dataset_type {
        DatasetType::Avro | DatasetType::Json | DatasetType::Orc | DatasetType::Parquet => {
            put("records_per_file", format_settings.get("max_rows_per_file"));
            put("file_path_prefix", format_settings.get("file_name_prefix"));
        }
        DatasetType::Csv => {
            put("quoteAll", format_settings.get("quote_all_text"));
            put("extension", format_settings.get("file_extension"));
            put("records_per_file", format_settings.get("max_rows_per_file"));
            put("file_path_prefix", format_settings.get("file_name_prefix"));
        }
        DatasetType::Delta => {}
        DatasetType::Sqlserver => {
            let isolation = parse_isolation_level(str_field(block, "isolation_level"));
            put("query_isolation_level", Some(&json!(isolation)));
            let timeout = parse_query_timeout(block, strict, diagnostics)?;
            put("query_timeout_seconds", Some(&json!(timeout)));
            put("numPartitions", block.get("max_concurrent_connections"));
            put("batchsize", block.get("write_batch_size"));
            put("sessionInitStatement", block.get("pre_copy_script"));
            if let Some(behavior) = present(block, "write_behavior") {
                let mode = parse_write_behavior(behavior)?;
                put("mode", Some(&json!(mode)));
            }
        }
    }

    Ok(DatasetProperties { dataset_type, options })
}

/// Source isolation level names to JDBC transaction isolation names
pub fn parse_isolation_level(level: Option<&str>) -> &'static str {
    match level {
        Some("ReadUncommitted") => "READ_UNCOMMITTED",
        Some("RepeatableRead") => "REPEATABLE_READ",
        Some("Serializable") => "SERIALIZABLE",
        Some("Snapshot") => "SNAPSHOT",
        _ => "READ_COMMITTED",
    }
}

fn parse_query_timeout(block: &Value, strict: bool, diagnostics: &mut Diagnostics) -> Translation<u64> {
    let Some(raw) = present(block, "query_timeout") else {
        return Ok(0);
    };
    let parsed = raw.as_str().and_then(parse_hms);
    match parsed {
        Some(seconds) => Ok(seconds),
        None if strict => Err(Untranslatable::new(
            raw.clone(),
            format!("Could not parse query timeout '{}'", scalar_to_string(raw)),
        )),
        None => {
            diagnostics.warn(
                "query_timeout",
                format!(
                    "Could not parse query timeout '{}', setting to 0",
                    scalar_to_string(raw)
                ),
            );
            Ok(0)
        }
    }
}

/// `HH:MM:SS` to seconds
pub fn parse_hms(text: &str) -> Option<u64> {
    let mut parts = text.trim().split(':');
    let hours: u64 = parts.next()?.parse().ok()?;
    let minutes: u64 = parts.next()?.parse().ok()?;
    let seconds: u64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || minutes >= 60 || seconds >= 60 {
        return None;
    }
    hours.checked_mul(3600)?.checked_add(minutes * 60 + seconds)
}

fn parse_write_behavior(behavior: &Value) -> Translation<&'static str> {
    match behavior.as_str() {
        Some(b) if b.eq_ignore_ascii_case("insert") => Ok("append"),
        _ => Err(Untranslatable::new(
            behavior.clone(),
            format!(
                "Cannot create an equivalent Copy Data task for writing to SQL Server in '{}' mode",
                scalar_to_string(behavior)
            ),
        )),
    }
}

/// File format options from a dataset definition
pub fn parse_format_options(dataset_type: DatasetType, dataset: &Value) -> BTreeMap<String, String> {
    debug!(%dataset_type, "parse_format_options: called");
    let mut options = BTreeMap::new();
    let mut put = |key: &str, value: Option<String>| {
        if let Some(value) = value {
            options.insert(key.to_string(), value);
        }
    };
    let text = |key: &str| lookup(dataset, key).map(scalar_to_string);

    match dataset_type {
        DatasetType::Csv => {
            let header = lookup(dataset, "first_row_as_header")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            put("header", Some(header.to_string()));
            put("sep", Some(escape_character(&text("column_delimiter").unwrap_or_else(|| ",".into()))));
            put("lineSep", Some(escape_character(&text("row_delimiter").unwrap_or_else(|| "\n".into()))));
            put("quote", Some(escape_character(&text("quote_char").unwrap_or_else(|| "\"".into()))));
            put("escape", Some(escape_character(&text("escape_char").unwrap_or_else(|| "\\".into()))));
            put("nullValue", Some(escape_character(&text("null_value").unwrap_or_default())));
            put("compression", compression_codec(dataset, "compression_codec"));
            put("encoding", text("encoding_name"));
        }
        DatasetType::Json => {
            put("encoding", text("encoding_name"));
            put("compression", compression_codec(dataset, "compression_codec"));
        }
        DatasetType::Avro => put("compression", text("avro_compression_codec")),
        DatasetType::Orc => put("compression", text("orc_compression_codec")),
        DatasetType::Parquet => put("compression", compression_codec(dataset, "compression_codec")),
        DatasetType::Delta | DatasetType::Sqlserver => {}
    }
    options
}

/// Codec given either as a plain name or as `{"type": name}`
fn compression_codec(dataset: &Value, key: &str) -> Option<String> {
    match lookup(dataset, key)? {
        Value::String(codec) => Some(codec.clone()),
        Value::Object(codec) => codec.get("type").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

/// JSON-escape a delimiter so control characters survive inside a raw string literal
pub fn escape_character(value: &str) -> String {
    let quoted = serde_json::to_string(value).unwrap_or_default();
    quoted
        .strip_prefix('"')
        .and_then(|q| q.strip_suffix('"'))
        .unwrap_or(&quoted)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_escape_character() {
        assert_eq!(escape_character("\n"), "\\n");
        assert_eq!(escape_character("\t"), "\\t");
        assert_eq!(escape_character(","), ",");
        assert_eq!(escape_character("\\"), "\\\\");
        assert_eq!(escape_character("\""), "\\\"");
    }

    #[test]
    fn test_csv_format_defaults() {
        let options = parse_format_options(DatasetType::Csv, &json!({"properties": {}}));
        assert_eq!(options["header"], "false");
        assert_eq!(options["sep"], ",");
        assert_eq!(options["lineSep"], "\\n");
        assert_eq!(options["escape"], "\\\\");
        assert_eq!(options["nullValue"], "");
        assert!(!options.contains_key("compression"));
    }

    #[test]
    fn test_csv_format_overrides() {
        let options = parse_format_options(
            DatasetType::Csv,
            &json!({"properties": {
                "first_row_as_header": true,
                "column_delimiter": "\t",
                "compression_codec": "gzip",
                "encoding_name": "UTF-8"
            }}),
        );
        assert_eq!(options["header"], "true");
        assert_eq!(options["sep"], "\\t");
        assert_eq!(options["compression"], "gzip");
        assert_eq!(options["encoding"], "UTF-8");
    }

    #[test]
    fn test_json_compression_object() {
        let options = parse_format_options(
            DatasetType::Json,
            &json!({"properties": {"compression_codec": {"type": "bzip2"}}}),
        );
        assert_eq!(options["compression"], "bzip2");
    }

    #[test]
    fn test_parse_hms() {
        assert_eq!(parse_hms("02:00:00"), Some(7200));
        assert_eq!(parse_hms("00:10:30"), Some(630));
        assert_eq!(parse_hms("00:61:00"), None);
        assert_eq!(parse_hms("soon"), None);
        assert_eq!(parse_hms("9999999999999999:00:00"), None);
    }

    #[test]
    fn test_sql_sink_properties() {
        let mut diagnostics = Diagnostics::new();
        let properties = parse_dataset_properties(
            &json!({
                "type": "AzureSqlSink",
                "write_behavior": "insert",
                "write_batch_size": 10000,
                "pre_copy_script": "TRUNCATE TABLE dbo.orders",
                "query_timeout": "02:00:00"
            }),
            false,
            &mut diagnostics,
        )
        .unwrap();
        assert_eq!(properties.dataset_type, DatasetType::Sqlserver);
        assert_eq!(properties.options["mode"], json!("append"));
        assert_eq!(properties.options["batchsize"], json!(10000));
        assert_eq!(properties.options["query_timeout_seconds"], json!(7200));
        assert_eq!(properties.options["query_isolation_level"], json!("READ_COMMITTED"));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_sql_upsert_is_untranslatable() {
        let mut diagnostics = Diagnostics::new();
        let err = parse_dataset_properties(
            &json!({"type": "AzureSqlSink", "write_behavior": "upsert"}),
            false,
            &mut diagnostics,
        )
        .unwrap_err();
        assert!(err.message.contains("'upsert' mode"));
    }

    #[test]
    fn test_sql_bad_timeout_lenient_and_strict() {
        let block = json!({"type": "AzureSqlSource", "query_timeout": "later", "isolation_level": "Snapshot"});

        let mut diagnostics = Diagnostics::new();
        let properties = parse_dataset_properties(&block, false, &mut diagnostics).unwrap();
        assert_eq!(properties.options["query_timeout_seconds"], json!(0));
        assert_eq!(properties.options["query_isolation_level"], json!("SNAPSHOT"));
        assert_eq!(diagnostics.len(), 1);

        let mut diagnostics = Diagnostics::new();
        assert!(parse_dataset_properties(&block, true, &mut diagnostics).is_err());
    }

    #[test]
    fn test_csv_sink_properties() {
        let mut diagnostics = Diagnostics::new();
        let properties = parse_dataset_properties(
            &json!({
                "type": "DelimitedTextSink",
                "format_settings": {"quote_all_text": true, "file_extension": ".csv", "max_rows_per_file": 5000}
            }),
            false,
            &mut diagnostics,
        )
        .unwrap();
        assert_eq!(properties.dataset_type, DatasetType::Csv);
        assert_eq!(properties.options["quoteAll"], json!(true));
        assert_eq!(properties.options["extension"], json!(".csv"));
        assert_eq!(properties.options["records_per_file"], json!(5000));
    }

    #[test]
    fn test_unknown_block_type() {
        let mut diagnostics = Diagnostics::new();
        let err = parse_dataset_properties(&json!({"type": "RestSource"}), false, &mut diagnostics).unwrap_err();
        assert_eq!(err.message, "Unsupported source or sink type 'RestSource'");
        let err = parse_dataset_properties(&json!({}), false, &mut diagnostics).unwrap_err();
        assert_eq!(err.message, "Missing property 'type' in dataset definition");
    }
}
