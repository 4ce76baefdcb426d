//! Dataset translators
//!
//! Raw dataset definitions embed their linked service under
//! `linked_service_definition`. A dataset without one cannot be located at all, so
//! that case is a hard error; every other gap degrades to [`Untranslatable`].

use serde_json::Value;
use tracing::debug;

use super::fields::{object_field, str_field};
use super::format::parse_format_options;
use super::linked_service::{ServiceKind, translate_linked_service};
use crate::error::{TranslateError, TranslateResult};
use crate::ir::{
    Dataset, DatasetType, DeltaTableDataset, FileDataset, LinkedService, SqlTableDataset, Translation, Untranslatable,
};

/// Name used for datasets that have none
pub const UNNAMED_DATASET: &str = "UNNAMED_DATASET";

/// Translate one dataset definition
pub fn translate_dataset(definition: &Value) -> TranslateResult<Translation<Dataset>> {
    let name = str_field(definition, "name").unwrap_or(UNNAMED_DATASET).to_string();
    debug!(%name, "translate_dataset: called");

    let properties = match definition.get("properties") {
        Some(p) if p.as_object().is_some_and(|o| !o.is_empty()) => p,
        _ => {
            return Ok(Err(Untranslatable::new(
                definition.clone(),
                "Missing property 'properties' in dataset definition",
            )));
        }
    };
    let tag = match properties.get("type") {
        Some(Value::String(tag)) => tag.as_str(),
        Some(other) => {
            return Ok(Err(Untranslatable::new(
                definition.clone(),
                format!("Invalid value {other} for property 'type' in dataset definition"),
            )));
        }
        None => {
            return Ok(Err(Untranslatable::new(
                definition.clone(),
                "Missing property 'type' in dataset properties",
            )));
        }
    };
    let Some(dataset_type) = DatasetType::from_dataset_tag(tag) else {
        debug!(%tag, "translate_dataset: unsupported dataset type");
        return Ok(Err(Untranslatable::new(
            definition.clone(),
            format!("Unsupported dataset type '{tag}'"),
        )));
    };

    let linked_service = linked_service_definition(&name, definition)?;

    let translated = match dataset_type {
        DatasetType::Delta => translate_delta_table(name, properties, linked_service),
        DatasetType::Sqlserver => translate_sql_table(name, properties, linked_service),
        file_type => translate_file(name, file_type, definition, properties, linked_service),
    };
    Ok(translated.map_err(|e| e.within(definition)))
}

fn linked_service_definition<'a>(name: &str, definition: &'a Value) -> TranslateResult<&'a Value> {
    let unresolved = |reason: &str| TranslateError::UnresolvedLinkedService {
        dataset: name.to_string(),
        reason: reason.to_string(),
    };
    match definition.get("linked_service_definition") {
        Some(value) if value.as_object().is_some_and(|o| !o.is_empty()) => Ok(value),
        Some(Value::Object(_)) => Err(unresolved("Linked service definition is empty")),
        Some(Value::Null) | None => Err(unresolved("Missing linked service definition")),
        Some(_) => Err(unresolved("Linked service definition must be an object")),
    }
}

fn required<'a>(object: &'a Value, key: &str, parent: &str) -> Translation<&'a str> {
    str_field(object, key)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Untranslatable::new(object.clone(), format!("Missing property '{key}' in {parent}")))
}

fn translate_file(
    name: String,
    dataset_type: DatasetType,
    definition: &Value,
    properties: &Value,
    linked_service: &Value,
) -> Translation<Dataset> {
    debug!(%name, %dataset_type, "translate_file: called");
    if object_field(properties, "location").is_none() {
        return Err(Untranslatable::new(
            properties.clone(),
            "Missing property 'location' in dataset properties",
        ));
    }
    let location = &properties["location"];
    let container = required(location, "container", "dataset location")?;
    let file_name = required(location, "file_name", "dataset location")?;
    let folder_path = match str_field(location, "folder_path").filter(|f| !f.is_empty()) {
        Some(folder) => format!("{}/{}", folder.trim_end_matches('/'), file_name),
        None => file_name.to_string(),
    };

    let service = match translate_linked_service(linked_service, ServiceKind::Abfs)? {
        LinkedService::Abfs(service) => service,
        other => {
            return Err(Untranslatable::new(
                linked_service.clone(),
                format!("File dataset cannot use linked service '{}'", other.name()),
            ));
        }
    };

    Ok(Dataset::File(FileDataset {
        name,
        dataset_type,
        container: container.to_string(),
        folder_path,
        format_options: parse_format_options(dataset_type, definition),
        service,
    }))
}

fn translate_delta_table(name: String, properties: &Value, linked_service: &Value) -> Translation<Dataset> {
    debug!(%name, "translate_delta_table: called");
    let database = required(properties, "database", "dataset properties")?;
    let table = required(properties, "table", "dataset properties")?;
    let service_name = match translate_linked_service(linked_service, ServiceKind::DatabricksCluster)? {
        LinkedService::DatabricksCluster(service) => service.name,
        other => {
            return Err(Untranslatable::new(
                linked_service.clone(),
                format!("Delta dataset cannot use linked service '{}'", other.name()),
            ));
        }
    };
    Ok(Dataset::DeltaTable(DeltaTableDataset {
        name,
        catalog: str_field(properties, "catalog").map(str::to_string),
        database: database.to_string(),
        table: table.to_string(),
        service_name,
    }))
}

fn translate_sql_table(name: String, properties: &Value, linked_service: &Value) -> Translation<Dataset> {
    debug!(%name, "translate_sql_table: called");
    let schema = str_field(properties, "schema_type_properties_schema")
        .or_else(|| str_field(properties, "schema"))
        .ok_or_else(|| {
            Untranslatable::new(
                properties.clone(),
                "Missing property 'schema_type_properties_schema' in dataset properties",
            )
        })?;
    let table = required(properties, "table", "dataset properties")?;
    let service = match translate_linked_service(linked_service, ServiceKind::SqlServer)? {
        LinkedService::SqlServer(service) => service,
        other => {
            return Err(Untranslatable::new(
                linked_service.clone(),
                format!("SQL dataset cannot use linked service '{}'", other.name()),
            ));
        }
    };
    Ok(Dataset::SqlTable(SqlTableDataset {
        name,
        schema: schema.to_string(),
        table: table.to_string(),
        service,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn abfs_service() -> Value {
        json!({
            "name": "ls_storage",
            "properties": {
                "type": "AzureBlobFS",
                "url": "DefaultEndpointsProtocol=https;AccountName=lake01;EndpointSuffix=core.windows.net;"
            }
        })
    }

    #[test]
    fn test_csv_dataset() {
        let dataset = translate_dataset(&json!({
            "name": "orders_csv",
            "properties": {
                "type": "DelimitedText",
                "location": {"container": "raw", "folder_path": "orders/2024", "file_name": "orders.csv"},
                "first_row_as_header": true
            },
            "linked_service_definition": abfs_service()
        }))
        .unwrap()
        .unwrap();

        assert_eq!(dataset.dataset_type(), DatasetType::Csv);
        assert_eq!(dataset.service_name(), "ls_storage");
        match dataset {
            Dataset::File(file) => {
                assert_eq!(file.container, "raw");
                assert_eq!(file.folder_path, "orders/2024/orders.csv");
                assert_eq!(file.service.storage_account_name, "lake01");
                assert_eq!(file.format_options["header"], "true");
            }
            other => panic!("unexpected dataset: {other:?}"),
        }
    }

    #[test]
    fn test_file_without_folder() {
        let dataset = translate_dataset(&json!({
            "name": "events",
            "properties": {"type": "Parquet", "location": {"container": "raw", "file_name": "events.parquet"}},
            "linked_service_definition": abfs_service()
        }))
        .unwrap()
        .unwrap();
        match dataset {
            Dataset::File(file) => assert_eq!(file.folder_path, "events.parquet"),
            other => panic!("unexpected dataset: {other:?}"),
        }
    }

    #[test]
    fn test_missing_location_is_untranslatable() {
        let result = translate_dataset(&json!({
            "name": "events",
            "properties": {"type": "Json"},
            "linked_service_definition": abfs_service()
        }))
        .unwrap();
        assert_eq!(
            result.unwrap_err().message,
            "Missing property 'location' in dataset properties"
        );
    }

    #[test]
    fn test_missing_linked_service_is_hard_error() {
        let result = translate_dataset(&json!({
            "name": "events",
            "properties": {"type": "Json", "location": {"container": "c", "file_name": "f.json"}}
        }));
        match result {
            Err(TranslateError::UnresolvedLinkedService { dataset, .. }) => assert_eq!(dataset, "events"),
            other => panic!("expected unresolved linked service, got {other:?}"),
        }
    }

    #[test]
    fn test_linked_service_not_object_is_hard_error() {
        let result = translate_dataset(&json!({
            "name": "t",
            "properties": {"type": "AzureSqlTable", "table": "x"},
            "linked_service_definition": "ls_sql"
        }));
        assert!(matches!(result, Err(TranslateError::UnresolvedLinkedService { .. })));
    }

    #[test]
    fn test_sql_table() {
        let dataset = translate_dataset(&json!({
            "name": "orders_sql",
            "properties": {"type": "AzureSqlTable", "schema_type_properties_schema": "dbo", "table": "orders"},
            "linked_service_definition": {"name": "ls_sql", "properties": {"server": "db.example.net", "database": "sales"}}
        }))
        .unwrap()
        .unwrap();
        match dataset {
            Dataset::SqlTable(table) => {
                assert_eq!(table.dbtable(), "dbo.orders");
                assert_eq!(table.service.host.as_deref(), Some("db.example.net"));
            }
            other => panic!("unexpected dataset: {other:?}"),
        }
    }

    #[test]
    fn test_delta_table() {
        let dataset = translate_dataset(&json!({
            "name": "orders_delta",
            "properties": {"type": "AzureDatabricksDeltaLakeDataset", "database": "sales", "table": "orders"},
            "linked_service_definition": {"name": "ls_dbx", "properties": {"type": "AzureDatabricksDeltaLake"}}
        }))
        .unwrap()
        .unwrap();
        assert_eq!(dataset.dataset_type(), DatasetType::Delta);
        assert_eq!(dataset.service_name(), "ls_dbx");
    }

    #[test]
    fn test_unsupported_dataset_type() {
        let result = translate_dataset(&json!({
            "name": "blob",
            "properties": {"type": "Binary"},
            "linked_service_definition": abfs_service()
        }))
        .unwrap();
        assert_eq!(result.unwrap_err().message, "Unsupported dataset type 'Binary'");
    }

    #[test]
    fn test_wrong_service_kind_is_untranslatable() {
        let result = translate_dataset(&json!({
            "name": "orders_csv",
            "properties": {"type": "DelimitedText", "location": {"container": "raw", "file_name": "a.csv"}},
            "linked_service_definition": {"name": "ls_sql", "properties": {"type": "AzureSqlDatabase"}}
        }))
        .unwrap();
        assert!(result.is_err());
    }
}
