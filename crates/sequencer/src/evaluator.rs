use std::cmp::Ordering;

use survey_core::types::{Condition, Destination, LogicRule, LogicValue, Question, ResponseValue};
use tracing::{debug, warn};

/// Literal a consent question submits when accepted.
pub const ACCEPTED: &str = "accepted";
/// Literal a call-to-action question submits when its button is pressed.
pub const CLICKED: &str = "clicked";
/// Literal a question submits when the respondent dismisses it.
pub const DISMISSED: &str = "dismissed";

/// Evaluates branching rules against the answer just given for a question.
#[derive(Debug, Clone)]
pub struct LogicEvaluator;

impl LogicEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Returns the destination of the first rule on `question` that carries a
    /// destination and matches `value`. Rules without a destination are inert.
    pub fn resolve_destination(
        &self,
        question: &Question,
        value: &ResponseValue,
    ) -> Option<Destination> {
        for rule in &question.logic {
            let Some(destination) = rule.destination() else {
                continue;
            };

            if self.evaluate_condition(rule, value) {
                debug!(
                    question_id = %question.id,
                    condition = ?rule.condition,
                    destination = %destination,
                    "Logic rule matched"
                );
                return Some(destination);
            }
        }
        None
    }

    /// Pure predicate over one rule and a raw answer value.
    pub fn evaluate_condition(&self, rule: &LogicRule, value: &ResponseValue) -> bool {
        let operand = rule.value.as_ref();
        match rule.condition {
            Condition::Equals => equals(value, operand),
            Condition::NotEquals => !identical(value, operand),
            Condition::LessThan => compare(value, operand).is_some_and(Ordering::is_lt),
            Condition::LessEqual => compare(value, operand).is_some_and(Ordering::is_le),
            Condition::GreaterThan => compare(value, operand).is_some_and(Ordering::is_gt),
            Condition::GreaterEqual => compare(value, operand).is_some_and(Ordering::is_ge),
            Condition::IncludesAll => match (value, operand) {
                (ResponseValue::List(given), Some(LogicValue::List(wanted))) => {
                    wanted.iter().all(|w| given.contains(w))
                }
                _ => false,
            },
            Condition::IncludesOne => match (value, operand) {
                (ResponseValue::List(given), Some(LogicValue::List(wanted))) => {
                    wanted.iter().any(|w| given.contains(w))
                }
                _ => false,
            },
            Condition::Accepted => matches!(value, ResponseValue::Text(s) if s == ACCEPTED),
            Condition::Clicked => matches!(value, ResponseValue::Text(s) if s == CLICKED),
            Condition::Submitted => match value {
                ResponseValue::Text(s) => !s.is_empty() && s != DISMISSED,
                ResponseValue::List(items) => !items.is_empty(),
                ResponseValue::Number(_) => true,
                ResponseValue::Null => false,
            },
            Condition::Skipped => match value {
                ResponseValue::Text(s) => s.is_empty() || s == DISMISSED,
                ResponseValue::List(items) => items.is_empty(),
                ResponseValue::Number(_) => false,
                ResponseValue::Null => true,
            },
            Condition::Unrecognized => {
                warn!("Unrecognized logic condition, treating as no match");
                false
            }
        }
    }
}

impl Default for LogicEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

/// Single-element list membership, or loose equality of string forms.
fn equals(value: &ResponseValue, operand: Option<&LogicValue>) -> bool {
    let Some(operand) = operand else {
        return false;
    };

    if let (ResponseValue::List(items), LogicValue::Text(wanted)) = (value, operand) {
        if items.len() == 1 && items[0] == *wanted {
            return true;
        }
    }

    match value {
        ResponseValue::Null => false,
        _ => value.to_string() == operand.to_string(),
    }
}

/// Strict equality: same shape and same content. A missing operand is never
/// identical to an answer.
fn identical(value: &ResponseValue, operand: Option<&LogicValue>) -> bool {
    match (value, operand) {
        (ResponseValue::Text(a), Some(LogicValue::Text(b))) => a == b,
        (ResponseValue::Number(a), Some(LogicValue::Number(b))) => a == b,
        (ResponseValue::List(a), Some(LogicValue::List(b))) => a == b,
        _ => false,
    }
}

/// Ordering between an answer and a rule operand. Numbers compare
/// numerically, strings lexically, and a numeric string against a number is
/// parsed first. Anything else is incomparable.
fn compare(value: &ResponseValue, operand: Option<&LogicValue>) -> Option<Ordering> {
    match (value, operand?) {
        (ResponseValue::Number(a), LogicValue::Number(b)) => a.partial_cmp(b),
        (ResponseValue::Text(a), LogicValue::Text(b)) => Some(a.as_str().cmp(b.as_str())),
        (ResponseValue::Number(a), LogicValue::Text(b)) => {
            a.partial_cmp(&b.trim().parse::<f64>().ok()?)
        }
        (ResponseValue::Text(a), LogicValue::Number(b)) => {
            a.trim().parse::<f64>().ok()?.partial_cmp(b)
        }
        _ => None,
    }
}
