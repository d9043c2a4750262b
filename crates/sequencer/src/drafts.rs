//! Draft answers: values a respondent entered but has not finalized, kept so
//! they can be restored when navigating back and forth.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use survey_core::config::DraftConfig;
use survey_core::types::{ResponseData, ResponseValue};
use tracing::debug;

/// Read/write access to cached draft answers, keyed by survey.
pub trait DraftStore: Send + Sync {
    fn get_stored_response(&self, survey_id: &str, question_id: &str) -> Option<ResponseValue>;

    /// Merge `answer` into the drafts kept for `survey_id`.
    fn store_response(&self, survey_id: &str, answer: &ResponseData);

    /// Drop every draft for `survey_id`.
    fn clear_stored_response(&self, survey_id: &str);
}

struct DraftEntry {
    answers: ResponseData,
    updated_at: Instant,
}

/// Lock-free in-process draft store backed by DashMap.
pub struct MemoryDraftStore {
    store: Arc<DashMap<String, DraftEntry>>,
    ttl: Option<Duration>,
    max_surveys: usize,
}

impl MemoryDraftStore {
    pub fn new(config: &DraftConfig) -> Self {
        Self {
            store: Arc::new(DashMap::new()),
            ttl: (config.ttl_secs > 0).then(|| Duration::from_secs(config.ttl_secs)),
            max_surveys: config.max_surveys,
        }
    }

    fn is_expired(&self, entry: &DraftEntry) -> bool {
        self.ttl.is_some_and(|ttl| entry.updated_at.elapsed() > ttl)
    }

    /// Remove expired survey drafts. Returns how many were dropped.
    pub fn evict_expired(&self) -> usize {
        let Some(ttl) = self.ttl else {
            return 0;
        };
        let before = self.store.len();
        self.store
            .retain(|_, entry| entry.updated_at.elapsed() <= ttl);
        before - self.store.len()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

impl Default for MemoryDraftStore {
    fn default() -> Self {
        Self::new(&DraftConfig::default())
    }
}

impl DraftStore for MemoryDraftStore {
    fn get_stored_response(&self, survey_id: &str, question_id: &str) -> Option<ResponseValue> {
        let entry = self.store.get(survey_id)?;
        if self.is_expired(&entry) {
            drop(entry);
            self.store.remove(survey_id);
            return None;
        }
        entry.answers.get(question_id).cloned()
    }

    fn store_response(&self, survey_id: &str, answer: &ResponseData) {
        // Over capacity: new surveys are not tracked, existing ones still update.
        if self.store.len() >= self.max_surveys && !self.store.contains_key(survey_id) {
            debug!(survey_id = %survey_id, "Draft store full, dropping draft");
            return;
        }

        let mut entry = self
            .store
            .entry(survey_id.to_string())
            .or_insert_with(|| DraftEntry {
                answers: ResponseData::new(),
                updated_at: Instant::now(),
            });
        entry
            .answers
            .extend(answer.iter().map(|(k, v)| (k.clone(), v.clone())));
        entry.updated_at = Instant::now();
    }

    fn clear_stored_response(&self, survey_id: &str) {
        self.store.remove(survey_id);
    }
}
