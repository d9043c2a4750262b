use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{SurveyError, SurveyResult};

/// Literal destination that sends a rule straight to the end of the survey.
pub const END_MARKER: &str = "end";

/// A survey definition: an ordered list of questions plus its terminal card.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Survey {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub questions: Vec<Question>,
    /// Seconds before the survey closes itself when left untouched.
    #[serde(default)]
    pub auto_close: Option<u64>,
    #[serde(default)]
    pub thank_you_card: ThankYouCard,
}

/// A single survey step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    /// Presentation type tag, e.g. `openText` or `cta`. Carried through
    /// untouched; the answer shape follows from it.
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub logic: Vec<LogicRule>,
}

/// Conditional redirect attached to a question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogicRule {
    pub condition: Condition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<LogicValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
}

/// Predicate tag of a logic rule. Unknown tags deserialize into
/// `Unrecognized`, which never matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Condition {
    Equals,
    NotEquals,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    IncludesAll,
    IncludesOne,
    Accepted,
    Clicked,
    Submitted,
    Skipped,
    #[serde(other)]
    Unrecognized,
}

/// Comparison operand of a logic rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LogicValue {
    Text(String),
    Number(f64),
    List(Vec<String>),
}

/// A raw answer value. Its shape depends on the question type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum ResponseValue {
    Text(String),
    Number(f64),
    List(Vec<String>),
    #[default]
    Null,
}

/// Answers submitted by a question, keyed by question id.
pub type ResponseData = HashMap<String, ResponseValue>;

/// Where a transition lands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "id")]
pub enum Destination {
    Question(String),
    End,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThankYouCard {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subheader: Option<String>,
}

impl Survey {
    /// Position of a question in traversal order.
    pub fn question_index(&self, question_id: &str) -> Option<usize> {
        self.questions.iter().position(|q| q.id == question_id)
    }

    pub fn question(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }

    pub fn first_question_id(&self) -> Option<&str> {
        self.questions.first().map(|q| q.id.as_str())
    }

    /// Checks the structural invariants the sequencer relies on: at least one
    /// question, unique ids, and every rule destination resolvable.
    pub fn validate(&self) -> SurveyResult<()> {
        if self.questions.is_empty() {
            return Err(SurveyError::InvalidSurvey(format!(
                "survey {} has no questions",
                self.id
            )));
        }

        let mut seen = HashSet::new();
        for question in &self.questions {
            if !seen.insert(question.id.as_str()) {
                return Err(SurveyError::InvalidSurvey(format!(
                    "duplicate question id {}",
                    question.id
                )));
            }
        }

        for question in &self.questions {
            for rule in &question.logic {
                if let Some(Destination::Question(target)) = rule.destination() {
                    if !seen.contains(target.as_str()) {
                        return Err(SurveyError::InvalidSurvey(format!(
                            "question {} has a rule pointing at unknown question {}",
                            question.id, target
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}

impl LogicRule {
    /// Parsed destination; `None` means the rule is inert.
    pub fn destination(&self) -> Option<Destination> {
        self.destination.as_deref().map(Destination::from_id)
    }
}

impl Destination {
    pub fn from_id(id: &str) -> Self {
        if id == END_MARKER {
            Destination::End
        } else {
            Destination::Question(id.to_string())
        }
    }

    pub fn is_end(&self) -> bool {
        matches!(self, Destination::End)
    }
}

impl ResponseValue {
    pub fn text(value: impl Into<String>) -> Self {
        ResponseValue::Text(value.into())
    }

    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ResponseValue::List(items.into_iter().map(Into::into).collect())
    }
}

/// String form used by loose comparisons: numbers drop a trailing `.0`,
/// lists join with commas.
impl fmt::Display for ResponseValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseValue::Text(s) => f.write_str(s),
            ResponseValue::Number(n) => write!(f, "{}", n),
            ResponseValue::List(items) => f.write_str(&items.join(",")),
            ResponseValue::Null => f.write_str("null"),
        }
    }
}

impl fmt::Display for LogicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicValue::Text(s) => f.write_str(s),
            LogicValue::Number(n) => write!(f, "{}", n),
            LogicValue::List(items) => f.write_str(&items.join(",")),
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Question(id) => f.write_str(id),
            Destination::End => f.write_str(END_MARKER),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn survey_json() -> &'static str {
        r#"{
            "id": "onboarding",
            "questions": [
                {"id": "q1", "type": "consent", "required": true, "headline": "Do you accept?", "logic": [
                    {"condition": "accepted", "destination": "q3"},
                    {"condition": "isBlue", "value": "x", "destination": "q2"}
                ]},
                {"id": "q2", "logic": [{"condition": "skipped", "destination": "end"}]},
                {"id": "q3", "type": "cta"}
            ],
            "autoClose": 10,
            "thankYouCard": {"enabled": true, "headline": "Thanks!"}
        }"#
    }

    #[test]
    fn test_deserialize_survey() {
        let survey: Survey = serde_json::from_str(survey_json()).unwrap();
        assert_eq!(survey.questions.len(), 3);
        assert_eq!(survey.auto_close, Some(10));
        assert!(survey.thank_you_card.enabled);
        assert_eq!(survey.questions[0].logic[0].condition, Condition::Accepted);
        assert_eq!(survey.questions[0].logic[1].condition, Condition::Unrecognized);
        assert_eq!(
            survey.questions[1].logic[0].destination(),
            Some(Destination::End)
        );
        assert!(survey.validate().is_ok());
    }

    #[test]
    fn test_question_type_and_required_survive_round_trip() {
        let survey: Survey = serde_json::from_str(survey_json()).unwrap();
        assert_eq!(survey.questions[0].kind, "consent");
        assert!(survey.questions[0].required);
        assert_eq!(survey.questions[1].kind, "");
        assert!(!survey.questions[1].required);

        let json = serde_json::to_value(&survey).unwrap();
        assert_eq!(json["questions"][0]["type"], "consent");
        assert_eq!(json["questions"][0]["required"], true);
        assert_eq!(json["questions"][2]["type"], "cta");

        let again: Survey = serde_json::from_value(json).unwrap();
        assert_eq!(again.questions[2].kind, "cta");
        assert!(again.questions[0].required);
    }

    #[test]
    fn test_response_value_shapes() {
        let data: ResponseData =
            serde_json::from_str(r#"{"a": "yes", "b": ["x", "y"], "c": 7, "d": null}"#).unwrap();
        assert_eq!(data["a"], ResponseValue::text("yes"));
        assert_eq!(data["b"], ResponseValue::list(["x", "y"]));
        assert_eq!(data["c"], ResponseValue::Number(7.0));
        assert_eq!(data["d"], ResponseValue::Null);
    }

    #[test]
    fn test_display_matches_loose_string_form() {
        assert_eq!(ResponseValue::Number(3.0).to_string(), "3");
        assert_eq!(ResponseValue::Number(2.5).to_string(), "2.5");
        assert_eq!(ResponseValue::list(["a", "b"]).to_string(), "a,b");
        assert_eq!(LogicValue::Number(0.0).to_string(), "0");
    }

    #[test]
    fn test_validate_rejects_unknown_destination() {
        let mut survey: Survey = serde_json::from_str(survey_json()).unwrap();
        survey.questions[2].logic.push(LogicRule {
            condition: Condition::Submitted,
            value: None,
            destination: Some("q9".to_string()),
        });
        assert!(matches!(
            survey.validate(),
            Err(SurveyError::InvalidSurvey(_))
        ));
    }

    #[test]
    fn test_validate_rejects_duplicates_and_empty() {
        let mut survey: Survey = serde_json::from_str(survey_json()).unwrap();
        survey.questions[2].id = "q1".to_string();
        assert!(survey.validate().is_err());

        survey.questions.clear();
        assert!(survey.validate().is_err());
    }

    #[test]
    fn test_question_lookup() {
        let survey: Survey = serde_json::from_str(survey_json()).unwrap();
        assert_eq!(survey.first_question_id(), Some("q1"));
        assert_eq!(survey.question_index("q3"), Some(2));
        assert!(survey.question("missing").is_none());
    }
}
