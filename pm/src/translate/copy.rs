//! Copy activity translation

use serde_json::Value;
use tracing::debug;

use super::dataset::translate_dataset;
use super::fields::{array_field, str_field, u64_field};
use super::format::parse_dataset_properties;
use crate::diagnostics::Diagnostics;
use crate::error::TranslateResult;
use crate::ir::{ColumnMapping, CopyActivity, Dataset, DatasetProperties, Translation, Untranslatable};

/// Translate the datasets, source/sink blocks and column mapping of a Copy activity
pub fn translate_copy(
    activity: &Value,
    strict: bool,
    diagnostics: &mut Diagnostics,
) -> TranslateResult<Translation<CopyActivity>> {
    debug!("translate_copy: called");
    let source = first_dataset(activity, "input_dataset_definitions")?;
    let sink = first_dataset(activity, "output_dataset_definitions")?;
    let source_properties = block_properties(activity, "source", strict, diagnostics);
    let sink_properties = block_properties(activity, "sink", strict, diagnostics);

    Ok(assemble(activity, source, sink, source_properties, sink_properties, diagnostics))
}

fn assemble(
    activity: &Value,
    source: Translation<Dataset>,
    sink: Translation<Dataset>,
    source_properties: Translation<DatasetProperties>,
    sink_properties: Translation<DatasetProperties>,
    diagnostics: &mut Diagnostics,
) -> Translation<CopyActivity> {
    let source = source?;
    let sink = sink?;
    let source_properties = source_properties?;
    let sink_properties = sink_properties?;
    check_side("Source", &source, &source_properties)?;
    check_side("Sink", &sink, &sink_properties)?;
    Ok(CopyActivity {
        source,
        sink,
        source_properties,
        sink_properties,
        column_mapping: parse_column_mapping(activity.get("translator"), diagnostics),
    })
}

fn first_dataset(activity: &Value, key: &str) -> TranslateResult<Translation<Dataset>> {
    match array_field(activity, key).and_then(|d| d.first()) {
        Some(definition) => translate_dataset(definition),
        None => Ok(Err(Untranslatable::new(
            activity.get(key).cloned().unwrap_or(Value::Null),
            format!("Missing property '{key}' in Copy activity"),
        ))),
    }
}

fn block_properties(
    activity: &Value,
    key: &str,
    strict: bool,
    diagnostics: &mut Diagnostics,
) -> Translation<DatasetProperties> {
    match activity.get(key).filter(|b| b.is_object()) {
        Some(block) => parse_dataset_properties(block, strict, diagnostics),
        None => Err(Untranslatable::new(
            activity.get(key).cloned().unwrap_or(Value::Null),
            format!("Missing property '{key}' in Copy activity"),
        )),
    }
}

fn check_side(side: &str, dataset: &Dataset, properties: &DatasetProperties) -> Translation<()> {
    if dataset.dataset_type() == properties.dataset_type {
        return Ok(());
    }
    Err(Untranslatable::new(
        dataset.name(),
        format!(
            "{side} type '{}' does not match dataset '{}' of type '{}'",
            properties.dataset_type,
            dataset.name(),
            dataset.dataset_type()
        ),
    ))
}

/// Column mappings from a `TabularTranslator` block; unnamed source columns use `_c{ordinal-1}`
pub fn parse_column_mapping(translator: Option<&Value>, diagnostics: &mut Diagnostics) -> Vec<ColumnMapping> {
    let Some(mappings) = translator.and_then(|t| array_field(t, "mappings")) else {
        return Vec::new();
    };
    let mut columns = Vec::with_capacity(mappings.len());
    for mapping in mappings {
        let source = mapping.get("source").unwrap_or(&Value::Null);
        let sink = mapping.get("sink").unwrap_or(&Value::Null);
        let source_column = match str_field(source, "name").filter(|n| !n.is_empty()) {
            Some(name) => name.to_string(),
            None => match u64_field(source, "ordinal").filter(|o| *o > 0) {
                Some(ordinal) => format!("_c{}", ordinal - 1),
                None => {
                    diagnostics.warn(
                        "translator.mappings",
                        format!("Dropped column mapping without a source name or ordinal: {mapping}"),
                    );
                    continue;
                }
            },
        };
        let sink_column = str_field(sink, "name")
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| source_column.clone());
        columns.push(ColumnMapping {
            source_column,
            sink_column,
            sink_type: str_field(sink, "type").map(str::to_string),
        });
    }
    columns
}
