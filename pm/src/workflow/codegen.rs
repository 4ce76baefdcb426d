//! Copy activity code generation
//!
//! Renders the Python scripts that replace Copy activities. Option and mapping lines are
//! assembled here; the surrounding notebook, read, and write statements come from templates
//! so they can be overridden without rebuilding.

use serde_json::json;
use tracing::debug;

use super::secrets::secret_key;
use super::templates::TemplateLoader;
use super::type_mapping::spark_type;
use crate::diagnostics::Diagnostics;
use crate::error::{TranslateError, TranslateResult};
use crate::ir::{ColumnMapping, CopyActivity, Dataset, DatasetProperties, DatasetType};
use crate::translate::fields::scalar_to_string;

const JDBC_SECRETS: [(&str, &str); 4] = [
    ("host", "host"),
    ("database", "database"),
    ("user", "user_name"),
    ("password", "password"),
];

/// Make a dataset name usable as a Python identifier
pub fn identifier(name: &str) -> String {
    let mut ident: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if ident.is_empty() || ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    ident
}

/// Quote a value as a Python string literal
pub fn python_string(value: &str) -> String {
    // JSON string escapes are a subset of Python's
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{value}\""))
}

fn secret_lookup(scope: &str, key: &str) -> String {
    format!("dbutils.secrets.get(scope={}, key={})", python_string(scope), python_string(key))
}

/// Generates Copy activity scripts
#[derive(Debug)]
pub struct CodeGenerator<'a> {
    templates: &'a TemplateLoader,
    secret_scope: &'a str,
}

/// Variable names of the two sides of a copy
struct Names {
    source: String,
    sink: String,
}

impl Names {
    fn of(copy: &CopyActivity) -> Self {
        let source = identifier(copy.source.name());
        let mut sink = identifier(copy.sink.name());
        if sink == source {
            sink.push_str("_sink");
        }
        Self { source, sink }
    }
}

impl<'a> CodeGenerator<'a> {
    pub fn new(templates: &'a TemplateLoader, secret_scope: &'a str) -> Self {
        Self {
            templates,
            secret_scope,
        }
    }

    /// Script that reads the source, projects columns and writes the sink
    pub fn copy_notebook(&self, copy: &CopyActivity, diagnostics: &mut Diagnostics) -> TranslateResult<String> {
        debug!(source = %copy.source.name(), sink = %copy.sink.name(), "CodeGenerator::copy_notebook: called");
        let names = Names::of(copy);
        let context = json!({
            "source_options": self.options(&names.source, &copy.source, &copy.source_properties).join("\n"),
            "sink_options": self.options(&names.sink, &copy.sink, &copy.sink_properties).join("\n"),
            "read": self.read_expression(&names.source, &copy.source)?,
            "mapping": mapping(&names, copy.sink.dataset_type(), &copy.column_mapping, diagnostics),
            "write": self.write_expression(&names.sink, &copy.sink)?,
        });
        self.templates.render("copy-notebook", &context)
    }

    /// Script that defines a declarative pipeline table in place of the sink
    pub fn dlt_notebook(&self, copy: &CopyActivity, diagnostics: &mut Diagnostics) -> TranslateResult<String> {
        debug!(source = %copy.source.name(), sink = %copy.sink.name(), "CodeGenerator::dlt_notebook: called");
        let names = Names::of(copy);
        let read = self.read_expression(&names.source, &copy.source)?;
        let projection = mapping(&names, copy.sink.dataset_type(), &copy.column_mapping, diagnostics);
        let body = indent(&format!("{read}\n{projection}"));
        let table_name = match &copy.sink {
            Dataset::DeltaTable(table) => table.table.clone(),
            other => identifier(other.name()),
        };
        let context = json!({
            "source_options": self.options(&names.source, &copy.source, &copy.source_properties).join("\n"),
            "table_name": table_name,
            "source_name": copy.source.name(),
            "sink_name": copy.sink.name(),
            "function_name": format!("load_{}", names.sink),
            "body": body,
            "result": format!("{}_df", names.sink),
        });
        self.templates.render("dlt-notebook", &context)
    }

    fn options(&self, name: &str, dataset: &Dataset, properties: &DatasetProperties) -> Vec<String> {
        match dataset {
            Dataset::File(file) => {
                let mut lines = vec![format!("{name}_options = {{}}")];
                for option in file.dataset_type.option_names() {
                    let value = properties
                        .options
                        .get(*option)
                        .map(scalar_to_string)
                        .or_else(|| file.format_options.get(*option).cloned());
                    if let Some(value) = value.filter(|v| !v.is_empty()) {
                        lines.push(format!("{name}_options[\"{option}\"] = {}", python_string(&value)));
                    }
                }
                if let Some(records) = properties.options.get("records_per_file") {
                    lines.push(format!(
                        "spark.conf.set(\"spark.sql.files.maxRecordsPerFile\", {})",
                        python_string(&scalar_to_string(records))
                    ));
                }
                let account_key = secret_key(&file.service.name, "storage_account_key");
                lines.push(format!(
                    "spark.conf.set({}, {})",
                    python_string(&format!(
                        "fs.azure.account.key.{}.dfs.core.windows.net",
                        file.service.storage_account_name
                    )),
                    secret_lookup(self.secret_scope, &account_key)
                ));
                lines
            }
            Dataset::SqlTable(table) => {
                let mut lines = vec![format!("{name}_options = {{}}")];
                for (option, secret) in JDBC_SECRETS {
                    let key = secret_key(&table.service.name, secret);
                    lines.push(format!(
                        "{name}_options[\"{option}\"] = {}",
                        secret_lookup(self.secret_scope, &key)
                    ));
                }
                lines.push(format!(
                    "{name}_options[\"url\"] = \"jdbc:sqlserver://\" + {name}_options[\"host\"] + \";databaseName=\" + {name}_options[\"database\"]"
                ));
                for option in DatasetType::Sqlserver.option_names() {
                    let value = match *option {
                        "dbtable" => Some(table.dbtable()),
                        other => properties.options.get(other).map(scalar_to_string),
                    };
                    if let Some(value) = value {
                        lines.push(format!("{name}_options[\"{option}\"] = {}", python_string(&value)));
                    }
                }
                for (key, option) in [
                    ("query_isolation_level", "isolationLevel"),
                    ("query_timeout_seconds", "queryTimeout"),
                ] {
                    if let Some(value) = properties.options.get(key) {
                        lines.push(format!(
                            "{name}_options[\"{option}\"] = {}",
                            python_string(&scalar_to_string(value))
                        ));
                    }
                }
                lines
            }
            Dataset::DeltaTable(_) => Vec::new(),
        }
    }

    fn read_expression(&self, name: &str, dataset: &Dataset) -> TranslateResult<String> {
        let (template, context) = match dataset {
            Dataset::File(file) => (
                "read-file",
                json!({
                    "name": name,
                    "format": file.dataset_type.as_str(),
                    "container": file.container,
                    "storage_account_name": file.service.storage_account_name,
                    "folder_path": file.folder_path,
                }),
            ),
            Dataset::DeltaTable(table) => ("read-delta", json!({"name": name, "table": table.qualified_name()})),
            Dataset::SqlTable(table) => ("read-sqlserver", json!({"name": name, "dbtable": table.dbtable()})),
        };
        if self.templates.resolve(template).is_none() {
            return Err(TranslateError::UnsupportedSourceFormat(dataset.dataset_type().to_string()));
        }
        Ok(self.templates.render(template, &context)?.trim_end().to_string())
    }

    fn write_expression(&self, name: &str, dataset: &Dataset) -> TranslateResult<String> {
        let template = format!("write-{}", dataset.dataset_type());
        let context = match dataset {
            Dataset::File(file) => json!({
                "name": name,
                "container": file.container,
                "storage_account_name": file.service.storage_account_name,
                "folder_path": file.folder_path,
            }),
            Dataset::DeltaTable(table) => json!({"name": name, "table": table.qualified_name()}),
            Dataset::SqlTable(_) => json!({"name": name}),
        };
        if self.templates.resolve(&template).is_none() {
            return Err(TranslateError::UnsupportedSinkFormat(dataset.dataset_type().to_string()));
        }
        Ok(self.templates.render(&template, &context)?.trim_end().to_string())
    }
}

fn mapping(names: &Names, sink: DatasetType, columns: &[ColumnMapping], diagnostics: &mut Diagnostics) -> String {
    if columns.is_empty() {
        return format!("{}_df = {}_df", names.sink, names.source);
    }
    let expressions: Vec<String> = columns
        .iter()
        .map(|column| {
            let cast = column.sink_type.as_deref().and_then(|sink_type| {
                let mapped = spark_type(sink_type, sink);
                if mapped.is_none() {
                    diagnostics.warn(
                        format!("column_mapping.{}", column.sink_column),
                        format!("No Spark type for column type '{sink_type}', cast omitted"),
                    );
                }
                mapped
            });
            let expression = match cast {
                Some(spark) => format!("cast(`{}` as {spark}) as `{}`", column.source_column, column.sink_column),
                None => format!("`{}` as `{}`", column.source_column, column.sink_column),
            };
            python_string(&expression)
        })
        .collect();
    format!(
        "{}_df = {}_df.selectExpr(\n    {},\n)",
        names.sink,
        names.source,
        expressions.join(",\n    ")
    )
}

fn indent(block: &str) -> String {
    block
        .lines()
        .map(|line| if line.is_empty() { String::new() } else { format!("    {line}") })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{AbfsService, DeltaTableDataset, FileDataset, SqlServerService, SqlTableDataset};
    use serde_json::Value;
    use std::collections::BTreeMap;

    fn csv_source() -> Dataset {
        let mut format_options = BTreeMap::new();
        format_options.insert("header".to_string(), "true".to_string());
        format_options.insert("sep".to_string(), ",".to_string());
        Dataset::File(FileDataset {
            name: "raw-orders".to_string(),
            dataset_type: DatasetType::Csv,
            container: "raw".to_string(),
            folder_path: "orders/orders.csv".to_string(),
            format_options,
            service: AbfsService {
                name: "ls_lake".to_string(),
                storage_account_name: "lakeacct".to_string(),
                url: "https://lakeacct.blob.core.windows.net/".to_string(),
                account_key: None,
            },
        })
    }

    fn delta_sink() -> Dataset {
        Dataset::DeltaTable(DeltaTableDataset {
            name: "orders".to_string(),
            catalog: None,
            database: "sales".to_string(),
            table: "orders".to_string(),
            service_name: "ls_dbx".to_string(),
        })
    }

    fn sql_sink() -> Dataset {
        Dataset::SqlTable(SqlTableDataset {
            name: "orders_sql".to_string(),
            schema: "dbo".to_string(),
            table: "orders".to_string(),
            service: SqlServerService {
                name: "ls_sql".to_string(),
                host: None,
                database: None,
                user_name: None,
                authentication_type: None,
            },
        })
    }

    fn properties(dataset_type: DatasetType, options: &[(&str, Value)]) -> DatasetProperties {
        DatasetProperties {
            dataset_type,
            options: options.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
        }
    }

    fn copy(sink: Dataset, columns: Vec<ColumnMapping>) -> CopyActivity {
        let sink_type = sink.dataset_type();
        let sink_options = if sink_type == DatasetType::Sqlserver {
            vec![("mode", json!("append")), ("batchsize", json!(1000))]
        } else {
            Vec::new()
        };
        CopyActivity {
            source: csv_source(),
            sink,
            source_properties: properties(DatasetType::Csv, &[("records_per_file", json!(5000))]),
            sink_properties: properties(sink_type, &sink_options),
            column_mapping: columns,
        }
    }

    fn column(source: &str, sink: &str, sink_type: Option<&str>) -> ColumnMapping {
        ColumnMapping {
            source_column: source.to_string(),
            sink_column: sink.to_string(),
            sink_type: sink_type.map(str::to_string),
        }
    }

    #[test]
    fn test_identifier() {
        assert_eq!(identifier("raw-orders"), "raw_orders");
        assert_eq!(identifier("2024 sales"), "_2024_sales");
        assert_eq!(identifier(""), "_");
    }

    #[test]
    fn test_python_string_escapes() {
        assert_eq!(python_string("a\"b\\c"), r#""a\"b\\c""#);
    }

    #[test]
    fn test_copy_notebook_to_sql() {
        let templates = TemplateLoader::embedded_only();
        let generator = CodeGenerator::new(&templates, "scope");
        let mut diagnostics = Diagnostics::new();
        let activity = copy(sql_sink(), vec![column("id", "order_id", Some("Int64"))]);

        let script = generator.copy_notebook(&activity, &mut diagnostics).unwrap();
        assert!(script.starts_with("# Databricks notebook source"));
        assert!(script.contains("raw_orders_options[\"header\"] = \"true\""));
        assert!(script.contains("spark.sql.files.maxRecordsPerFile\", \"5000\""));
        assert!(script.contains(r#"dbutils.secrets.get(scope="scope", key="ls_lake_storage_account_key")"#));
        assert!(script.contains(r#"orders_sql_options["user"] = dbutils.secrets.get(scope="scope", key="ls_sql_user_name")"#));
        assert!(script.contains(r#"orders_sql_options["dbtable"] = "dbo.orders""#));
        assert!(script.contains(r#"orders_sql_options["mode"] = "append""#));
        assert!(script.contains(r#"orders_sql_options["batchsize"] = "1000""#));
        assert!(script.contains("abfss://raw@lakeacct.dfs.core.windows.net/orders/orders.csv"));
        assert!(script.contains("\"cast(`id` as long) as `order_id`\""));
        assert!(script.contains("orders_sql_df.write.format(\"jdbc\")"));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_unmapped_type_omits_cast() {
        let templates = TemplateLoader::embedded_only();
        let generator = CodeGenerator::new(&templates, "scope");
        let mut diagnostics = Diagnostics::new();
        let activity = copy(sql_sink(), vec![column("span", "span", Some("TimeSpan"))]);

        let script = generator.copy_notebook(&activity, &mut diagnostics).unwrap();
        assert!(script.contains("\"`span` as `span`\""));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics.entries()[0].property, "column_mapping.span");
    }

    #[test]
    fn test_empty_mapping_passes_frame_through() {
        let templates = TemplateLoader::embedded_only();
        let generator = CodeGenerator::new(&templates, "scope");
        let mut diagnostics = Diagnostics::new();
        let script = generator.copy_notebook(&copy(delta_sink(), Vec::new()), &mut diagnostics).unwrap();
        assert!(script.contains("orders_df = raw_orders_df"));
        assert!(script.contains(".saveAsTable(\"hive_metastore.sales.orders\")"));
    }

    #[test]
    fn test_dlt_notebook() {
        let templates = TemplateLoader::embedded_only();
        let generator = CodeGenerator::new(&templates, "scope");
        let mut diagnostics = Diagnostics::new();
        let activity = copy(delta_sink(), vec![column("amount", "amount", Some("decimal(10,2)"))]);

        let script = generator.dlt_notebook(&activity, &mut diagnostics).unwrap();
        assert!(script.starts_with("# Databricks notebook source"));
        assert!(script.contains("import dlt"));
        assert!(script.contains("name=\"orders\""));
        assert!(script.contains("def load_orders():"));
        assert!(script.contains("    raw_orders_df = ("));
        assert!(script.contains("cast(`amount` as decimal(10,2))"));
        assert!(script.contains("    return orders_df"));
        assert!(!script.contains("saveAsTable"));
    }

    #[test]
    fn test_same_names_do_not_collide() {
        let mut activity = copy(delta_sink(), Vec::new());
        if let Dataset::DeltaTable(table) = &mut activity.sink {
            table.name = "raw-orders".to_string();
        }
        let names = Names::of(&activity);
        assert_eq!(names.source, "raw_orders");
        assert_eq!(names.sink, "raw_orders_sink");
    }
}
