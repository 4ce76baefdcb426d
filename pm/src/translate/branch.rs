//! IfCondition and ForEach translation
//!
//! Both recurse through [`ActivityTranslator::translate`]. IfCondition children get a
//! synthesized edge on the parent keyed by branch outcome and are flattened later;
//! ForEach bodies stay nested under the loop.

use serde_json::Value;
use tracing::debug;

use super::activity::{ActivityTranslator, KindResult, Rejection};
use super::expression::{parse_array, parse_condition};
use super::fields::{array_field, str_field, u64_field};
use crate::error::TranslateResult;
use crate::ir::{Activity, ActivityPayload, Dependency, ForEachActivity, IfConditionActivity, Untranslatable};

/// The item reference a ForEach body receives implicitly
const ITEM_EXPRESSION: &str = "@item()";

/// Names of both IfCondition branches' children, false branch first
fn child_names(activity: &Value) -> Vec<&str> {
    ["if_false_activities", "if_true_activities"]
        .into_iter()
        .flat_map(|key| array_field(activity, key).into_iter().flatten())
        .filter_map(|child| str_field(child, "name"))
        .collect()
}

impl ActivityTranslator {
    pub(crate) fn translate_if_condition(&mut self, activity: &Value, parent_key: &str) -> KindResult {
        debug!(%parent_key, "ActivityTranslator::translate_if_condition: called");
        let Some(expression) = activity
            .get("expression")
            .and_then(|e| str_field(e, "value"))
            .filter(|v| !v.trim().is_empty())
        else {
            return Ok(Err(Rejection::value(
                "expression",
                Untranslatable::new(
                    activity.get("expression").cloned().unwrap_or(Value::Null),
                    "Missing property 'expression' in IfCondition activity",
                ),
            )));
        };
        let condition = match parse_condition(expression) {
            Ok(condition) => condition,
            Err(reason) => {
                let dropped = child_names(activity);
                let reason = if dropped.is_empty() {
                    reason
                } else {
                    Untranslatable {
                        message: format!("{}; dropped child activities: {}", reason.message, dropped.join(", ")),
                        value: reason.value,
                    }
                };
                return Ok(Err(Rejection::expression("expression", reason)));
            }
        };

        let mut children = Vec::new();
        for (key, outcome) in [("if_false_activities", "false"), ("if_true_activities", "true")] {
            for child in array_field(activity, key).into_iter().flatten() {
                let dependency = Dependency::on_outcome(parent_key, outcome);
                children.push(self.translate_branch_child(child, Some(dependency))?);
            }
        }
        if children.is_empty() {
            self.diagnostics_mut()
                .warn("child_activities", "No child activities of if-else condition activity");
        }

        Ok(Ok(ActivityPayload::IfCondition(IfConditionActivity {
            op: condition.op,
            left: condition.left,
            right: condition.right,
            children,
        })))
    }

    pub(crate) fn translate_for_each(&mut self, activity: &Value) -> KindResult {
        debug!("ActivityTranslator::translate_for_each: called");
        let items = match activity.get("items") {
            None | Some(Value::Null) => {
                return Ok(Err(rejected_items(Value::Null, "Missing property 'items' in ForEach activity")));
            }
            Some(items) if !items.is_object() => {
                return Ok(Err(rejected_items(
                    items.clone(),
                    format!("Invalid value '{items}' for property 'items' in ForEach activity"),
                )));
            }
            Some(items) => items,
        };
        let Some(expression) = str_field(items, "value") else {
            return Ok(Err(rejected_items(
                items.clone(),
                "Missing property 'value' in ForEach activity 'items'",
            )));
        };
        let items = match parse_array(expression) {
            Ok(items) => items,
            Err(reason) => return Ok(Err(Rejection::expression("items", reason))),
        };

        let inner = array_field(activity, "activities").map(Vec::as_slice).unwrap_or_default();
        if inner.is_empty() {
            return Ok(Err(Rejection::value(
                "activities",
                Untranslatable::new(Value::Null, "ForEach activity has no inner activities"),
            )));
        }
        if inner.len() > 1 {
            self.diagnostics_mut().warn(
                "activities",
                format!(
                    "ForEach activity has {} inner activities; only the first runs inside the for-each task",
                    inner.len()
                ),
            );
        }

        let mut activities = Vec::with_capacity(inner.len());
        for definition in inner {
            let filtered = self.filter_item_parameters(definition);
            activities.push(self.translate_branch_child(&filtered, None)?);
        }

        Ok(Ok(ActivityPayload::ForEach(ForEachActivity {
            items,
            concurrency: u64_field(activity, "batch_count").and_then(|c| u32::try_from(c).ok()),
            activities,
        })))
    }

    /// Translate a branch body activity; containable failures become placeholders
    fn translate_branch_child(&mut self, child: &Value, dependency: Option<Dependency>) -> TranslateResult<Activity> {
        match self.translate(child) {
            Ok(mut activity) => {
                activity.task.depends_on.extend(dependency);
                Ok(activity)
            }
            Err(error) if error.is_containable() && !(self.options().strict && error.is_strict_violation()) => {
                Ok(self.contain(child, dependency, error))
            }
            Err(error) => Err(error),
        }
    }

    /// Drop `@item()` base parameters, which the for-each task passes implicitly
    fn filter_item_parameters(&mut self, definition: &Value) -> Value {
        let mut filtered = definition.clone();
        let name = str_field(definition, "name");
        let activity_type = str_field(definition, "type");
        let is_notebook = activity_type == Some("DatabricksNotebook");

        let diagnostics = self.diagnostics_mut();
        diagnostics.enter(name, activity_type);
        match filtered.get_mut("base_parameters").and_then(Value::as_object_mut) {
            Some(parameters) => {
                let redundant: Vec<String> = parameters
                    .iter()
                    .filter(|(_, expression)| {
                        expression.get("value").and_then(Value::as_str) == Some(ITEM_EXPRESSION)
                            || expression.as_str() == Some(ITEM_EXPRESSION)
                    })
                    .map(|(name, _)| name.clone())
                    .collect();
                for parameter in redundant {
                    parameters.remove(&parameter);
                    diagnostics.warn(
                        format!("base_parameters.{parameter}"),
                        format!("Removing redundant parameter {parameter} with value {ITEM_EXPRESSION}"),
                    );
                }
            }
            None if is_notebook => {
                diagnostics.warn(
                    "base_parameters",
                    "Missing property 'base_parameters' for ForEach inner activity, treating as empty",
                );
            }
            None => {}
        }
        diagnostics.exit();
        filtered
    }
}

fn rejected_items(value: Value, message: impl Into<String>) -> Rejection {
    Rejection::value("items", Untranslatable::new(value, message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TranslateError;
    use crate::ir::ConditionOp;
    use crate::translate::TranslateOptions;
    use serde_json::json;

    fn notebook(name: &str) -> Value {
        json!({"name": name, "type": "DatabricksNotebook", "notebook_path": format!("/{name}")})
    }

    fn if_condition(expression: &str, if_true: Vec<Value>, if_false: Vec<Value>) -> Value {
        json!({
            "name": "Check",
            "type": "IfCondition",
            "expression": {"type": "Expression", "value": expression},
            "if_true_activities": if_true,
            "if_false_activities": if_false
        })
    }

    #[test]
    fn test_branch_flattening() {
        let mut translator = ActivityTranslator::new(TranslateOptions::default());
        let tasks = translator
            .translate_activities(&[if_condition(
                "@equals(pipeline().parameters.env, 'prod')",
                vec![notebook("Deploy")],
                vec![notebook("Skip")],
            )])
            .unwrap();

        assert_eq!(tasks.len(), 3);
        assert_eq!(tasks[0].task_key(), "Check");
        for (task, outcome) in [(&tasks[1], "false"), (&tasks[2], "true")] {
            assert_eq!(task.task.depends_on, vec![Dependency::on_outcome("Check", outcome)]);
        }
        match &tasks[0].payload {
            ActivityPayload::IfCondition(condition) => {
                assert_eq!(condition.op, ConditionOp::EqualTo);
                assert_eq!(condition.right, "prod");
                assert!(condition.children.is_empty());
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn test_nested_conditions_are_preorder() {
        let inner = json!({
            "name": "Inner",
            "type": "IfCondition",
            "expression": {"value": "@greater(1, 0)"},
            "if_true_activities": [notebook("Leaf")]
        });
        let mut translator = ActivityTranslator::new(TranslateOptions::default());
        let tasks = translator
            .translate_activities(&[if_condition("@less(1, 2)", vec![inner, notebook("After")], vec![])])
            .unwrap();
        let keys: Vec<&str> = tasks.iter().map(Activity::task_key).collect();
        assert_eq!(keys, vec!["Check", "Inner", "Leaf", "After"]);
        assert_eq!(tasks[2].task.depends_on, vec![Dependency::on_outcome("Inner", "true")]);
    }

    #[test]
    fn test_no_children_is_diagnosed() {
        let mut translator = ActivityTranslator::new(TranslateOptions::default());
        let tasks = translator
            .translate_activities(&[if_condition("@equals(1, 1)", vec![], vec![])])
            .unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(translator.diagnostics().entries()[0].property, "child_activities");
    }

    #[test]
    fn test_unmatched_condition() {
        let mut translator = ActivityTranslator::new(TranslateOptions::default());
        let activity = translator
            .translate(&if_condition("@contains('abc', 'a')", vec![notebook("A")], vec![]))
            .unwrap();
        assert!(activity.is_placeholder());
        assert_eq!(translator.diagnostics().entries()[0].property, "expression");
        assert!(
            translator.diagnostics().entries()[0]
                .message
                .ends_with("dropped child activities: A")
        );

        let mut translator = ActivityTranslator::new(TranslateOptions { strict: true });
        let err = translator
            .translate(&if_condition("@contains('abc', 'a')", vec![notebook("A")], vec![]))
            .unwrap_err();
        assert!(matches!(err, TranslateError::UnmatchedExpression { .. }));
    }

    #[test]
    fn test_failed_child_is_contained() {
        let bad_child = json!({
            "name": "Bad",
            "type": "DatabricksNotebook",
            "notebook_path": "/bad",
            "depends_on": [{"activity": "X", "dependency_conditions": ["Succeeded", "Failed"]}]
        });
        let mut translator = ActivityTranslator::new(TranslateOptions::default());
        let tasks = translator
            .translate_activities(&[if_condition("@equals(1, 1)", vec![bad_child, notebook("Good")], vec![])])
            .unwrap();

        assert_eq!(tasks.len(), 3);
        assert!(tasks[1].is_placeholder());
        assert_eq!(tasks[1].task.depends_on, vec![Dependency::on_outcome("Check", "true")]);
        assert!(!tasks[2].is_placeholder());
        let entry = &translator.diagnostics().entries()[0];
        assert_eq!(entry.activity_name.as_deref(), Some("Bad"));
    }

    #[test]
    fn test_for_each() {
        let mut translator = ActivityTranslator::new(TranslateOptions::default());
        let activity = translator
            .translate(&json!({
                "name": "Loop",
                "type": "ForEach",
                "batch_count": 4,
                "items": {"type": "Expression", "value": "@array('a,b,c')"},
                "activities": [{
                    "name": "Body",
                    "type": "DatabricksNotebook",
                    "notebook_path": "/body",
                    "base_parameters": {
                        "item": {"type": "Expression", "value": "@item()"},
                        "mode": "full"
                    }
                }]
            }))
            .unwrap();

        match &activity.payload {
            ActivityPayload::ForEach(for_each) => {
                assert_eq!(for_each.items, r#"["a","b","c"]"#);
                assert_eq!(for_each.concurrency, Some(4));
                assert_eq!(for_each.activities.len(), 1);
                assert!(for_each.activities[0].task.depends_on.is_empty());
                match &for_each.activities[0].payload {
                    ActivityPayload::Notebook(notebook) => {
                        assert_eq!(notebook.base_parameters.len(), 1);
                        assert_eq!(notebook.base_parameters["mode"], "full");
                    }
                    other => panic!("unexpected payload: {other:?}"),
                }
            }
            other => panic!("unexpected payload: {other:?}"),
        }
        let entry = &translator.diagnostics().entries()[0];
        assert_eq!(entry.property, "base_parameters.item");
        assert_eq!(entry.activity_name.as_deref(), Some("Body"));
    }

    #[test]
    fn test_for_each_body_without_parameters() {
        let mut translator = ActivityTranslator::new(TranslateOptions::default());
        translator
            .translate(&json!({
                "name": "Loop",
                "type": "ForEach",
                "items": {"value": "@createArray('x', 'y')"},
                "activities": [notebook("Body")]
            }))
            .unwrap();
        assert_eq!(translator.diagnostics().entries()[0].property, "base_parameters");
    }

    #[test]
    fn test_for_each_without_inner_activities_is_placeholder() {
        let mut translator = ActivityTranslator::new(TranslateOptions::default());
        let activity = translator
            .translate(&json!({
                "name": "Loop",
                "type": "ForEach",
                "items": {"value": "@array('a,b')"},
                "activities": []
            }))
            .unwrap();
        assert!(activity.is_placeholder());
        let entry = &translator.diagnostics().entries()[0];
        assert_eq!(entry.property, "activities");
        assert_eq!(entry.message, "ForEach activity has no inner activities");

        let mut translator = ActivityTranslator::new(TranslateOptions { strict: true });
        let err = translator
            .translate(&json!({"name": "Loop", "type": "ForEach", "items": {"value": "@array('a,b')"}}))
            .unwrap_err();
        assert!(matches!(err, TranslateError::Untranslatable { .. }));
    }

    #[test]
    fn test_for_each_bad_items() {
        let mut translator = ActivityTranslator::new(TranslateOptions::default());
        let activity = translator
            .translate(&json!({
                "name": "Loop",
                "type": "ForEach",
                "items": {"value": "@pipeline().parameters.list"},
                "activities": [notebook("Body")]
            }))
            .unwrap();
        assert!(activity.is_placeholder());

        let activity = translator
            .translate(&json!({"name": "Loop2", "type": "ForEach", "items": "a,b"}))
            .unwrap();
        assert!(activity.is_placeholder());
        assert!(
            translator.diagnostics().entries()[1]
                .message
                .starts_with("Invalid value")
        );
    }
}
