//! Schedule trigger translation
//!
//! Recurrences become six-field quartz cron expressions evaluated in UTC.

use serde_json::Value;
use tracing::debug;

use super::fields::{array_field, scalar_to_string, str_field, u64_field};
use crate::diagnostics::Diagnostics;
use crate::ir::Schedule;

pub const DEFAULT_TIMEZONE: &str = "UTC";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frequency {
    Hour,
    Day,
    Week,
    Month,
}

impl Frequency {
    fn parse(tag: &str) -> Option<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "hour" => Some(Self::Hour),
            "day" => Some(Self::Day),
            "week" => Some(Self::Week),
            "month" => Some(Self::Month),
            _ => None,
        }
    }
}

/// Translate a schedule trigger document into a job schedule
pub fn translate_trigger(trigger: &Value, diagnostics: &mut Diagnostics) -> Option<Schedule> {
    debug!("translate_trigger: called");
    let Some(recurrence) = trigger.get("properties").and_then(|p| p.get("recurrence")).filter(|r| r.is_object()) else {
        diagnostics.warn("trigger.recurrence", "Trigger has no recurrence; the job will not be scheduled");
        return None;
    };
    let expression = cron_expression(recurrence, diagnostics)?;
    Some(Schedule {
        quartz_cron_expression: expression,
        timezone_id: DEFAULT_TIMEZONE.to_string(),
    })
}

/// Build the quartz cron expression for a recurrence block
pub fn cron_expression(recurrence: &Value, diagnostics: &mut Diagnostics) -> Option<String> {
    let frequency_tag = str_field(recurrence, "frequency").unwrap_or_default();
    let Some(frequency) = Frequency::parse(frequency_tag) else {
        diagnostics.warn(
            "schedule.frequency",
            format!("Unsupported trigger frequency '{frequency_tag}'; the job will not be scheduled"),
        );
        return None;
    };

    let intervals = match u64_field(recurrence, "interval") {
        Some(n) if n > 0 => n,
        _ => {
            diagnostics.warn("schedule.num_intervals", "Setting empty \"num_intervals\" to \"1\" by default");
            1
        }
    };

    let schedule = recurrence.get("schedule").unwrap_or(&Value::Null);
    let minutes = join_numbers(schedule, "minutes");
    let hours = join_numbers(schedule, "hours");
    debug!(?frequency, intervals, "cron_expression: building");

    let expression = match frequency {
        Frequency::Hour => format!("0 0 */{intervals} * * ?"),
        Frequency::Day => format!("0 {minutes} {hours} */{intervals} * ?"),
        Frequency::Week => {
            if intervals > 1 {
                diagnostics.warn(
                    "schedule.num_intervals",
                    "Ignoring \"num_intervals\" > 1 for weekly triggers; Using weekly interval",
                );
            }
            let days = week_days(schedule, diagnostics);
            format!("0 {minutes} {hours} ? * {days}")
        }
        Frequency::Month => {
            if intervals > 1 {
                diagnostics.warn(
                    "schedule.num_intervals",
                    "Ignoring \"num_intervals\" > 1 for monthly triggers; Using monthly interval",
                );
            }
            let days = join_numbers(schedule, "days");
            format!("0 {minutes} {hours} {days} * ?")
        }
    };
    Some(expression)
}

fn join_numbers(schedule: &Value, key: &str) -> String {
    match array_field(schedule, key) {
        Some(values) if !values.is_empty() => values.iter().map(scalar_to_string).collect::<Vec<_>>().join(","),
        _ => "0".to_string(),
    }
}

fn week_days(schedule: &Value, diagnostics: &mut Diagnostics) -> String {
    let Some(days) = array_field(schedule, "week_days").filter(|d| !d.is_empty()) else {
        return "1".to_string();
    };
    let mut numbers = Vec::with_capacity(days.len());
    for day in days {
        let name = scalar_to_string(day);
        match week_day_number(&name) {
            Some(number) => numbers.push(number.to_string()),
            None => diagnostics.warn(
                "schedule.week_days",
                format!("Unknown week day '{name}' dropped from schedule"),
            ),
        }
    }
    if numbers.is_empty() {
        return "1".to_string();
    }
    numbers.join(",")
}

/// Quartz day-of-week numbering, Sunday first
fn week_day_number(name: &str) -> Option<u8> {
    match name.to_ascii_lowercase().as_str() {
        "sunday" => Some(1),
        "monday" => Some(2),
        "tuesday" => Some(3),
        "wednesday" => Some(4),
        "thursday" => Some(5),
        "friday" => Some(6),
        "saturday" => Some(7),
        _ => None,
    }
}
