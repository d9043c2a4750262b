use std::sync::Arc;
use std::time::Duration;

use survey_core::config::{CountdownConfig, SequencerConfig};
use survey_core::error::{SurveyError, SurveyResult};
use survey_core::types::{Destination, Question, ResponseData, ResponseValue, Survey};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::countdown::Countdown;
use crate::drafts::{DraftStore, MemoryDraftStore};
use crate::evaluator::LogicEvaluator;
use crate::signal::{noop_responses, noop_signal, CompletionSignal, OnceSignal, ResponseSink};
use crate::state_machine::TraversalState;

/// Drives one respondent through a survey: tracks the active question,
/// applies branching rules on submit, and fires the close signal at the end.
///
/// Every transition takes `&mut self`, so a second submission cannot start
/// while one is still awaiting the response sink.
///
/// The close signal reaches the collaborator at most once per traversal, even
/// when the countdown runs out and the survey later finishes.
pub struct Sequencer {
    survey: Arc<Survey>,
    state: TraversalState,
    evaluator: LogicEvaluator,
    drafts: Arc<dyn DraftStore>,
    responses: Arc<dyn ResponseSink>,
    signal: Arc<dyn CompletionSignal>,
    thank_you_delay: Duration,
    pending_close: Option<JoinHandle<()>>,
    countdown: Option<Countdown>,
}

impl std::fmt::Debug for Sequencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sequencer")
            .field("survey_id", &self.survey.id)
            .field("questions", &self.survey.questions.len())
            .field("state", &self.state)
            .finish()
    }
}

impl Sequencer {
    /// Validates the survey and positions the traversal on its first question.
    pub fn new(survey: impl Into<Arc<Survey>>, config: &SequencerConfig) -> SurveyResult<Self> {
        let survey = survey.into();
        survey.validate()?;

        let first = survey.first_question_id().ok_or_else(|| {
            SurveyError::InvalidSurvey(format!("survey {} has no questions", survey.id))
        })?;
        let state = TraversalState::new(survey.id.clone(), first);

        info!(
            survey_id = %survey.id,
            session_id = %state.session_id,
            questions = survey.questions.len(),
            "Survey traversal started"
        );

        Ok(Self {
            survey,
            state,
            evaluator: LogicEvaluator::new(),
            drafts: Arc::new(MemoryDraftStore::default()),
            responses: noop_responses(),
            signal: Arc::new(OnceSignal::new(noop_signal())),
            thank_you_delay: Duration::from_millis(config.thank_you_delay_ms),
            pending_close: None,
            countdown: None,
        })
    }

    pub fn with_drafts(mut self, drafts: Arc<dyn DraftStore>) -> Self {
        self.drafts = drafts;
        self
    }

    pub fn with_responses(mut self, responses: Arc<dyn ResponseSink>) -> Self {
        self.responses = responses;
        self
    }

    pub fn with_signal(mut self, signal: Arc<dyn CompletionSignal>) -> Self {
        self.signal = Arc::new(OnceSignal::new(signal));
        self
    }

    pub fn survey(&self) -> &Survey {
        &self.survey
    }

    pub fn state(&self) -> &TraversalState {
        &self.state
    }

    pub fn active_question(&self) -> SurveyResult<&Question> {
        self.survey
            .question(&self.state.active_question_id)
            .ok_or_else(|| SurveyError::QuestionNotFound(self.state.active_question_id.clone()))
    }

    pub fn progress(&self) -> f64 {
        self.state.progress
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    /// A back action only makes sense past the first question and before the end.
    pub fn show_back_button(&self) -> bool {
        self.state.progress != 0.0 && !self.state.is_finished()
    }

    /// Default successor of the active question in survey order.
    pub fn next_question_id(&self) -> SurveyResult<Destination> {
        let index = self.active_index()?;
        Ok(self
            .survey
            .questions
            .get(index + 1)
            .map(|q| Destination::Question(q.id.clone()))
            .unwrap_or(Destination::End))
    }

    /// Predecessor of the active question. The first question has none.
    pub fn previous_question_id(&self) -> SurveyResult<String> {
        let index = self.active_index()?;
        index
            .checked_sub(1)
            .and_then(|prev| self.survey.questions.get(prev))
            .map(|q| q.id.clone())
            .ok_or_else(|| SurveyError::QuestionNotFound(self.state.active_question_id.clone()))
    }

    /// Finalizes the answer for the active question and moves forward,
    /// following the first matching logic rule if there is one.
    ///
    /// The response sink is awaited before any state changes; if it fails the
    /// traversal stays where it was and the error is returned.
    pub async fn submit(&mut self, answer: ResponseData) -> SurveyResult<Destination> {
        if self.state.is_finished() {
            return Err(SurveyError::AlreadyFinished);
        }

        let default_next = self.next_question_id()?;
        let question = self.active_question()?;
        let question_id = question.id.clone();
        let value = answer.get(&question_id).cloned().unwrap_or_default();

        let target = self
            .evaluator
            .resolve_destination(question, &value)
            .unwrap_or(default_next);

        self.responses
            .on_response(&question_id, &value)
            .await
            .map_err(SurveyError::Response)?;

        info!(
            session_id = %self.state.session_id,
            question_id = %question_id,
            destination = %target,
            "Answer submitted"
        );

        match &target {
            Destination::End => self.finish()?,
            Destination::Question(next) => self.activate(next)?,
        }
        Ok(target)
    }

    /// Moves to the next question in order without evaluating rules or
    /// reporting an answer. At the last question this falls through to
    /// [`Sequencer::submit`] so the survey still finishes properly.
    pub async fn go_to_next_question(&mut self, answer: ResponseData) -> SurveyResult<Destination> {
        if self.state.is_finished() {
            return Err(SurveyError::AlreadyFinished);
        }

        match self.next_question_id()? {
            Destination::End => self.submit(answer).await,
            Destination::Question(next) => {
                self.activate(&next)?;
                Ok(Destination::Question(next))
            }
        }
    }

    /// Steps back one question, saving `answer` as a draft first so it can be
    /// restored when the respondent returns. Logic rules are not consulted.
    pub fn go_back(&mut self, answer: Option<ResponseData>) -> SurveyResult<String> {
        if self.state.is_finished() {
            return Err(SurveyError::AlreadyFinished);
        }

        let previous = self.previous_question_id()?;

        if let Some(answer) = answer.filter(|a| !a.is_empty()) {
            self.drafts.store_response(&self.survey.id, &answer);
        }

        debug!(
            session_id = %self.state.session_id,
            from = %self.state.active_question_id,
            to = %previous,
            "Going back"
        );
        self.activate(&previous)?;
        Ok(previous)
    }

    /// Starts the auto-close countdown for this survey, sharing the same
    /// completion signal. Replaces any countdown already running. Idle when
    /// the survey has no auto-close duration.
    pub fn start_countdown(&mut self, config: &CountdownConfig) -> &Countdown {
        let mut countdown = Countdown::new(config, self.signal.clone());
        countdown.set_duration(self.survey.auto_close);
        self.countdown.insert(countdown)
    }

    pub fn countdown(&self) -> Option<&Countdown> {
        self.countdown.as_ref()
    }

    pub fn cancel_countdown(&mut self) {
        if let Some(countdown) = self.countdown.as_mut() {
            countdown.cancel();
        }
    }

    /// Waits for a delayed close signal, if one is pending.
    pub async fn wait_closed(&mut self) {
        if let Some(handle) = self.pending_close.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "Pending close task did not complete");
            }
        }
    }

    /// Drops a pending delayed close without firing it and stops the countdown.
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.pending_close.take() {
            handle.abort();
        }
        self.cancel_countdown();
    }

    fn active_index(&self) -> SurveyResult<usize> {
        self.survey
            .question_index(&self.state.active_question_id)
            .ok_or_else(|| SurveyError::QuestionNotFound(self.state.active_question_id.clone()))
    }

    fn activate(&mut self, question_id: &str) -> SurveyResult<()> {
        let index = self
            .survey
            .question_index(question_id)
            .ok_or_else(|| SurveyError::QuestionNotFound(question_id.to_string()))?;
        let stored: Option<ResponseValue> =
            self.drafts.get_stored_response(&self.survey.id, question_id);

        self.state.activate(
            question_id.to_string(),
            index,
            self.survey.questions.len(),
            stored,
        );
        Ok(())
    }

    fn finish(&mut self) -> SurveyResult<()> {
        self.state.finish()?;
        self.cancel_countdown();
        self.drafts.clear_stored_response(&self.survey.id);

        info!(
            survey_id = %self.survey.id,
            session_id = %self.state.session_id,
            "Survey finished"
        );

        if self.survey.thank_you_card.enabled {
            let signal = self.signal.clone();
            let delay = self.thank_you_delay;
            self.pending_close = Some(tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                signal.on_auto_close();
            }));
        } else {
            self.signal.on_auto_close();
        }
        Ok(())
    }
}

impl Drop for Sequencer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
