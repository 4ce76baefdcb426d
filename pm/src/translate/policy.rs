//! Activity policy and dependency parsing

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use super::fields::{present, scalar_to_string, str_field, u64_field};
use super::format::parse_hms;
use crate::diagnostics::Diagnostics;
use crate::error::{TranslateError, TranslateResult};
use crate::ir::Dependency;

/// Retry and timeout settings of one activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Policy {
    pub timeout_seconds: Option<u64>,
    pub max_retries: Option<u32>,
    pub min_retry_interval_millis: Option<u64>,
}

/// Parsed policies for one translation pass, keyed by activity name and policy body
#[derive(Debug, Default)]
pub struct PolicyCache {
    entries: HashMap<String, Policy>,
}

impl PolicyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_parse(&mut self, activity_name: &str, policy: Option<&Value>, diagnostics: &mut Diagnostics) -> Policy {
        let Some(policy) = policy.filter(|p| !p.is_null()) else {
            return Policy::default();
        };
        let key = format!("{activity_name}\u{0}{policy}");
        if let Some(cached) = self.entries.get(&key) {
            debug!(%activity_name, "PolicyCache::get_or_parse: cache hit");
            return *cached;
        }
        let parsed = parse_policy(policy, diagnostics);
        self.entries.insert(key, parsed);
        parsed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse an activity `policy` block
pub fn parse_policy(policy: &Value, diagnostics: &mut Diagnostics) -> Policy {
    debug!("parse_policy: called");
    if policy.get("secure_input").is_some() {
        diagnostics.warn(
            "secure_input",
            "Secure input logging not applicable to Databricks workflows.",
        );
    }
    if policy.get("secure_output").is_some() {
        diagnostics.warn(
            "secure_output",
            "Secure output logging not applicable to Databricks workflows.",
        );
    }

    let timeout_seconds = present(policy, "timeout").and_then(|raw| {
        let parsed = raw.as_str().and_then(parse_timeout);
        if parsed.is_none() {
            diagnostics.warn(
                "timeout",
                format!("Could not parse timeout '{}', task will run without one", scalar_to_string(raw)),
            );
        }
        parsed
    });

    let max_retries = present(policy, "retry").and_then(|raw| {
        let parsed = u64_field(policy, "retry").and_then(|r| u32::try_from(r).ok());
        if parsed.is_none() {
            diagnostics.warn(
                "retry",
                format!("Could not parse retry count '{}'", scalar_to_string(raw)),
            );
        }
        parsed
    });

    let min_retry_interval_millis = present(policy, "retry_interval_in_seconds").and_then(|raw| {
        let parsed = u64_field(policy, "retry_interval_in_seconds").and_then(|s| s.checked_mul(1000));
        if parsed.is_none() {
            diagnostics.warn(
                "retry_interval_in_seconds",
                format!("Could not parse retry interval '{}'", scalar_to_string(raw)),
            );
        }
        parsed
    });

    Policy {
        timeout_seconds,
        max_retries,
        min_retry_interval_millis,
    }
}

/// `HH:MM:SS` or `D.HH:MM:SS` to seconds
pub fn parse_timeout(text: &str) -> Option<u64> {
    let text = text.trim();
    match text.split_once('.') {
        Some((days, clock)) => {
            let days: u64 = days.parse().ok()?;
            let seconds = parse_hms(clock)?;
            if seconds >= 86_400 {
                return None;
            }
            days.checked_mul(86_400)?.checked_add(seconds)
        }
        None => parse_hms(text),
    }
}

/// Parse `depends_on` into dependency edges
pub fn parse_dependencies(raw: Option<&Value>, diagnostics: &mut Diagnostics) -> TranslateResult<Vec<Dependency>> {
    let Some(entries) = raw.and_then(Value::as_array) else {
        return Ok(Vec::new());
    };
    debug!(count = entries.len(), "parse_dependencies: called");

    let mut dependencies = Vec::with_capacity(entries.len());
    for entry in entries {
        let Some(upstream) = str_field(entry, "activity").filter(|a| !a.is_empty()) else {
            diagnostics.warn("depends_on", "Dropped a dependency without an upstream activity");
            continue;
        };
        let conditions = entry
            .get("dependency_conditions")
            .or_else(|| entry.get("dependencyConditions"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        if conditions.len() > 1 {
            return Err(TranslateError::AmbiguousDependency {
                activity: upstream.to_string(),
                count: conditions.len(),
            });
        }
        match conditions.first().and_then(Value::as_str) {
            None | Some("Succeeded") => {}
            Some(condition) => diagnostics.warn(
                "depends_on",
                format!("Dependency condition '{condition}' on '{upstream}' is not supported; the task runs when '{upstream}' succeeds"),
            ),
        }
        dependencies.push(Dependency::on(upstream));
    }
    Ok(dependencies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_parse_timeout_day_prefixed() {
        assert_eq!(parse_timeout("0.01:30:00"), Some(5400));
        assert_eq!(parse_timeout("7.00:00:00"), Some(604_800));
        assert_eq!(parse_timeout("0.00:05:00"), Some(300));
        assert_eq!(parse_timeout("01:00:00"), Some(3600));
    }

    #[test]
    fn test_parse_timeout_rejects_garbage() {
        assert_eq!(parse_timeout("soon"), None);
        assert_eq!(parse_timeout("1.25:00:00"), None);
        assert_eq!(parse_timeout("0.00:61:00"), None);
    }

    #[test]
    fn test_parse_timeout_out_of_range_is_none() {
        assert_eq!(parse_timeout("999999999999999.00:00:00"), None);
        assert_eq!(parse_timeout("9999999999999999:00:00"), None);
        assert_eq!(parse_timeout("213503982334601.00:00:00"), Some(213_503_982_334_601 * 86_400));
    }

    #[test]
    fn test_out_of_range_policy_values_are_diagnosed() {
        let mut diagnostics = Diagnostics::new();
        let policy = parse_policy(
            &json!({"timeout": "999999999999999.00:00:00", "retry_interval_in_seconds": u64::MAX}),
            &mut diagnostics,
        );
        assert_eq!(policy.timeout_seconds, None);
        assert_eq!(policy.min_retry_interval_millis, None);
        let properties: Vec<&str> = diagnostics.entries().iter().map(|d| d.property.as_str()).collect();
        assert_eq!(properties, vec!["timeout", "retry_interval_in_seconds"]);
    }

    #[test]
    fn test_parse_policy() {
        let mut diagnostics = Diagnostics::new();
        let policy = parse_policy(
            &json!({"timeout": "0.12:00:00", "retry": 3, "retry_interval_in_seconds": 30}),
            &mut diagnostics,
        );
        assert_eq!(
            policy,
            Policy {
                timeout_seconds: Some(43_200),
                max_retries: Some(3),
                min_retry_interval_millis: Some(30_000),
            }
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_secure_flags_are_diagnosed() {
        let mut diagnostics = Diagnostics::new();
        parse_policy(&json!({"secure_input": true, "secure_output": false}), &mut diagnostics);
        let properties: Vec<&str> = diagnostics.entries().iter().map(|d| d.property.as_str()).collect();
        assert_eq!(properties, vec!["secure_input", "secure_output"]);
    }

    #[test]
    fn test_unparsable_timeout_is_soft() {
        let mut diagnostics = Diagnostics::new();
        let policy = parse_policy(&json!({"timeout": "forever"}), &mut diagnostics);
        assert_eq!(policy.timeout_seconds, None);
        assert_eq!(diagnostics.entries()[0].property, "timeout");
    }

    #[test]
    fn test_cache_parses_once() {
        let mut cache = PolicyCache::new();
        let mut diagnostics = Diagnostics::new();
        let policy = json!({"secure_input": true, "retry": 1});
        cache.get_or_parse("Load", Some(&policy), &mut diagnostics);
        let cached = cache.get_or_parse("Load", Some(&policy), &mut diagnostics);
        assert_eq!(cached.max_retries, Some(1));
        assert_eq!(cache.len(), 1);
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_dependencies() {
        let mut diagnostics = Diagnostics::new();
        let dependencies = parse_dependencies(
            Some(&json!([
                {"activity": "Extract", "dependency_conditions": ["Succeeded"]},
                {"activity": "Clean"}
            ])),
            &mut diagnostics,
        )
        .unwrap();
        assert_eq!(dependencies, vec![Dependency::on("Extract"), Dependency::on("Clean")]);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_two_conditions_is_hard_error() {
        let mut diagnostics = Diagnostics::new();
        for key in ["dependency_conditions", "dependencyConditions"] {
            let result = parse_dependencies(
                Some(&json!([{"activity": "Extract", key: ["Succeeded", "Failed"]}])),
                &mut diagnostics,
            );
            match result {
                Err(TranslateError::AmbiguousDependency { activity, count }) => {
                    assert_eq!(activity, "Extract");
                    assert_eq!(count, 2);
                }
                other => panic!("expected ambiguous dependency, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_failure_condition_is_diagnosed() {
        let mut diagnostics = Diagnostics::new();
        let dependencies = parse_dependencies(
            Some(&json!([{"activity": "Extract", "dependency_conditions": ["Failed"]}])),
            &mut diagnostics,
        )
        .unwrap();
        assert_eq!(dependencies[0].outcome, None);
        assert_eq!(diagnostics.len(), 1);
    }

    proptest! {
        #[test]
        fn test_timeout_seconds(days in 0u64..1000, hours in 0u64..24, minutes in 0u64..60, seconds in 0u64..60) {
            let text = format!("{days}.{hours:02}:{minutes:02}:{seconds:02}");
            prop_assert_eq!(
                parse_timeout(&text),
                Some(days * 86_400 + hours * 3600 + minutes * 60 + seconds)
            );
        }

        #[test]
        fn test_timeout_never_panics(days in any::<u64>(), hours in any::<u64>(), minutes in 0u64..60, seconds in 0u64..60) {
            let clock = format!("{hours}:{minutes:02}:{seconds:02}");
            let expected = hours
                .checked_mul(3600)
                .and_then(|h| h.checked_add(minutes * 60 + seconds));
            prop_assert_eq!(parse_timeout(&clock), expected);

            let prefixed = format!("{days}.{clock}");
            let expected = expected
                .filter(|s| *s < 86_400)
                .and_then(|s| days.checked_mul(86_400)?.checked_add(s));
            prop_assert_eq!(parse_timeout(&prefixed), expected);
        }
    }
}
