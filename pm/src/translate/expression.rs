//! Expression parsers
//!
//! Pattern-matching translators for the two expression shapes the target can express:
//! binary comparisons (condition tasks) and literal arrays (for-each inputs). Both are
//! total and return [`Untranslatable`] for anything else.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::ir::{ConditionOp, Translation, Untranslatable};

/// Ordered: the first matching pattern wins
static CONDITION_PATTERNS: LazyLock<Vec<(ConditionOp, Regex)>> = LazyLock::new(|| {
    [
        (ConditionOp::EqualTo, r"^@equals\((.+),\s*(.+)\)"),
        (ConditionOp::GreaterThan, r"^@greater\((.+),\s*(.+)\)"),
        (ConditionOp::GreaterThanOrEqual, r"^@greaterOrEquals\((.+),\s*(.+)\)"),
        (ConditionOp::LessThan, r"^@less\((.+),\s*(.+)\)"),
        (ConditionOp::LessThanOrEqual, r"^@lessOrEquals\((.+),\s*(.+)\)"),
        (ConditionOp::NotEqual, r"^@not\(equals\((.+),\s*(.+)\)\)"),
    ]
    .into_iter()
    .map(|(op, pattern)| (op, Regex::new(pattern).expect("condition pattern")))
    .collect()
});

static ARRAY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^@array\('(.+)'\)").expect("array pattern"));
static CREATE_ARRAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@createArray\((.+)\)").expect("createArray pattern"));

/// A binary comparison
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub op: ConditionOp,
    pub left: String,
    pub right: String,
}

fn strip_quotes(operand: &str) -> String {
    operand.replace(['"', '\''], "")
}

/// Parse a boolean condition such as `@equals(pipeline().parameters.env, 'prod')`
pub fn parse_condition(expression: &str) -> Translation<Condition> {
    debug!(%expression, "parse_condition: called");
    let expression = expression.trim();
    for (op, pattern) in CONDITION_PATTERNS.iter() {
        if let Some(captures) = pattern.captures(expression) {
            debug!(%op, "parse_condition: matched");
            return Ok(Condition {
                op: *op,
                left: strip_quotes(captures[1].trim()),
                right: strip_quotes(captures[2].trim()),
            });
        }
    }
    Err(Untranslatable::new(
        expression,
        format!("Unsupported conditional expression '{expression}'"),
    ))
}

/// Parse an item array into a JSON list of strings, e.g. `["1","2","3"]`
pub fn parse_array(expression: &str) -> Translation<String> {
    debug!(%expression, "parse_array: called");
    let expression = expression.trim();
    let items = if let Some(captures) = ARRAY.captures(expression) {
        debug!("parse_array: matched @array");
        captures[1].split(',').map(|item| strip_quotes(item.trim())).collect::<Vec<_>>()
    } else if let Some(captures) = CREATE_ARRAY.captures(expression) {
        debug!("parse_array: matched @createArray");
        parse_literal_list(&captures[1]).ok_or_else(|| {
            Untranslatable::new(
                expression,
                format!("Unsupported array literal in expression '{expression}'"),
            )
        })?
    } else {
        return Err(Untranslatable::new(
            expression,
            format!("Unsupported array expression '{expression}'"),
        ));
    };

    serde_json::to_string(&items).map_err(|e| Untranslatable::new(expression, e.to_string()))
}

/// Comma-separated string and number literals; anything else (calls, nesting) is rejected
fn parse_literal_list(input: &str) -> Option<Vec<String>> {
    let mut items = Vec::new();
    let mut chars = input.trim().chars().peekable();
    if chars.peek().is_none() {
        return Some(items);
    }

    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        match chars.peek().copied() {
            Some(quote @ ('\'' | '"')) => {
                chars.next();
                let mut item = String::new();
                loop {
                    match chars.next()? {
                        '\\' => item.push(chars.next()?),
                        c if c == quote => break,
                        c => item.push(c),
                    }
                }
                items.push(item);
            }
            Some(c) if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => {
                let mut number = String::new();
                while let Some(&c) = chars.peek() {
                    if c == ',' || c.is_whitespace() {
                        break;
                    }
                    number.push(c);
                    chars.next();
                }
                number.parse::<f64>().ok()?;
                items.push(number.trim_start_matches('+').to_string());
            }
            _ => return None,
        }
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        match chars.next() {
            None => break,
            Some(',') => continue,
            Some(_) => return None,
        }
    }
    Some(items)
}
