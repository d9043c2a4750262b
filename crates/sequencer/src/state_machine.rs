use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use survey_core::error::{SurveyError, SurveyResult};
use survey_core::types::ResponseValue;
use uuid::Uuid;

/// Lifecycle of a single traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraversalStatus {
    Active,
    Finished,
}

/// Describes a single valid status transition for a traversal.
#[derive(Debug, Clone)]
pub struct StatusTransition {
    pub from: TraversalStatus,
    pub to: TraversalStatus,
    pub trigger: &'static str,
}

const TRANSITIONS: &[StatusTransition] = &[StatusTransition {
    from: TraversalStatus::Active,
    to: TraversalStatus::Finished,
    trigger: "reached_end",
}];

/// Snapshot of where a respondent is in a survey. Presentation renders from
/// this and never mutates it directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraversalState {
    pub session_id: Uuid,
    pub survey_id: String,
    /// Always names an existing question; never the end marker.
    pub active_question_id: String,
    pub status: TraversalStatus,
    /// Ratio in [0, 1]; pinned to 1 once finished.
    pub progress: f64,
    /// Draft restored for the active question, if any.
    pub stored_response_value: Option<ResponseValue>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl TraversalState {
    pub fn new(survey_id: impl Into<String>, first_question_id: impl Into<String>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            survey_id: survey_id.into(),
            active_question_id: first_question_id.into(),
            status: TraversalStatus::Active,
            progress: 0.0,
            stored_response_value: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status == TraversalStatus::Finished
    }

    /// Returns `true` if the given transition is allowed.
    pub fn can_transition(from: TraversalStatus, to: TraversalStatus) -> bool {
        TRANSITIONS.iter().any(|t| t.from == from && t.to == to)
    }

    /// Point the traversal at another question and recompute progress.
    pub fn activate(
        &mut self,
        question_id: String,
        index: usize,
        total: usize,
        stored: Option<ResponseValue>,
    ) {
        self.active_question_id = question_id;
        self.stored_response_value = stored;
        self.progress = progress_ratio(index, total);
    }

    /// Moves the traversal into `Finished` with full progress. The draft of the
    /// last active question no longer applies and is dropped.
    pub fn finish(&mut self) -> SurveyResult<()> {
        if !Self::can_transition(self.status, TraversalStatus::Finished) {
            return Err(SurveyError::AlreadyFinished);
        }
        self.status = TraversalStatus::Finished;
        self.progress = 1.0;
        self.stored_response_value = None;
        self.finished_at = Some(Utc::now());
        Ok(())
    }
}

/// Share of the survey already behind the respondent.
pub fn progress_ratio(index: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    index as f64 / total as f64
}
