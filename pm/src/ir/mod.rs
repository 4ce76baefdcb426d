//! Intermediate representation
//!
//! Canonical types produced by the translators and consumed by the workflow preparer.
//! IR values are built once per translation pass and not mutated afterwards.

pub mod activity;
pub mod dataset;
pub mod linked_service;
pub mod pipeline;
pub mod untranslatable;

pub use activity::{
    Activity, ActivityPayload, ConditionOp, CopyActivity, Dependency, ForEachActivity, IfConditionActivity,
    NotebookActivity, PLACEHOLDER_NOTEBOOK_PATH, PlaceholderActivity, SparkJarActivity, SparkPythonActivity,
    TaskMetadata, UNNAMED_TASK,
};
pub use dataset::{
    ColumnMapping, Dataset, DatasetProperties, DatasetType, DeltaTableDataset, FileDataset, SqlTableDataset,
};
pub use linked_service::{
    AbfsService, Autoscale, ClusterLogConf, ClusterSpec, DatabricksService, Destination, InitScript, InitScriptType,
    LinkedService, SqlServerService, WorkerSpec,
};
pub use pipeline::{JobParameter, PROVENANCE_TAG, Pipeline, Schedule, UNNAMED_WORKFLOW, with_provenance_tag};
pub use untranslatable::{Translation, Untranslatable};
