//! Secret provisioning instructions
//!
//! Generated scripts read credentials from a secret scope instead of embedding them.
//! Each dataset type needs a fixed set of secrets; values already known from the
//! linked service are passed along, the rest must be supplied by the user.

use serde::Serialize;
use tracing::debug;

use crate::ir::{Dataset, DatasetType};

/// One secret that must exist in the workspace before a generated script runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecretInstruction {
    pub scope: String,
    /// `{service_name}_{secret}`
    pub key: String,
    pub service_name: String,
    pub service_type: DatasetType,
    pub provided_value: Option<String>,
    pub user_input_required: bool,
}

/// Secret key as referenced by generated scripts
pub fn secret_key(service_name: &str, secret: &str) -> String {
    format!("{service_name}_{secret}")
}

fn known_value(dataset: &Dataset, secret: &str) -> Option<String> {
    match (dataset, secret) {
        (Dataset::File(file), "storage_account_key") => file.service.account_key.clone(),
        (Dataset::SqlTable(sql), "host") => sql.service.host.clone(),
        (Dataset::SqlTable(sql), "database") => sql.service.database.clone(),
        (Dataset::SqlTable(sql), "user_name") => sql.service.user_name.clone(),
        _ => None,
    }
}

/// Secrets a dataset needs, in table order
pub fn collect_secrets(dataset: &Dataset, scope: &str) -> Vec<SecretInstruction> {
    debug!(dataset = %dataset.name(), %scope, "collect_secrets: called");
    let service_name = dataset.service_name();
    let service_type = dataset.dataset_type();
    service_type
        .secret_names()
        .iter()
        .map(|secret| {
            let provided_value = known_value(dataset, secret);
            SecretInstruction {
                scope: scope.to_string(),
                key: secret_key(service_name, secret),
                service_name: service_name.to_string(),
                service_type,
                user_input_required: provided_value.is_none(),
                provided_value,
            }
        })
        .collect()
}
