//! Outbound collaborators of a traversal: where finalized answers go and who
//! hears that the survey should close.
//!
//! The sequencer holds `Arc<dyn ...>` handles so the same signal can be shared
//! with a countdown running on another task.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use survey_core::types::ResponseValue;
use tracing::info;

/// Receives the finalized answer for the active question. May perform I/O;
/// an error aborts the transition and reaches the caller untouched.
#[async_trait]
pub trait ResponseSink: Send + Sync {
    async fn on_response(&self, question_id: &str, value: &ResponseValue) -> anyhow::Result<()>;
}

/// Fired when the survey should be closed, either because it finished or
/// because the auto-close countdown ran out.
pub trait CompletionSignal: Send + Sync {
    fn on_auto_close(&self);
}

/// Sink that accepts every answer and does nothing with it.
pub struct NoOpResponses;

#[async_trait]
impl ResponseSink for NoOpResponses {
    async fn on_response(&self, _question_id: &str, _value: &ResponseValue) -> anyhow::Result<()> {
        Ok(())
    }
}

/// In-memory sink that captures answers in arrival order.
#[derive(Default)]
pub struct CaptureResponses {
    responses: Mutex<Vec<(String, ResponseValue)>>,
}

impl CaptureResponses {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn responses(&self) -> Vec<(String, ResponseValue)> {
        self.responses.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.responses.lock().len()
    }
}

#[async_trait]
impl ResponseSink for CaptureResponses {
    async fn on_response(&self, question_id: &str, value: &ResponseValue) -> anyhow::Result<()> {
        self.responses
            .lock()
            .push((question_id.to_string(), value.clone()));
        Ok(())
    }
}

/// Logs every answer and forwards it to an inner sink when one is set.
pub struct LogResponses {
    inner: Option<Arc<dyn ResponseSink>>,
}

impl LogResponses {
    pub fn new() -> Self {
        Self { inner: None }
    }

    pub fn wrapping(inner: Arc<dyn ResponseSink>) -> Self {
        Self { inner: Some(inner) }
    }
}

impl Default for LogResponses {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResponseSink for LogResponses {
    async fn on_response(&self, question_id: &str, value: &ResponseValue) -> anyhow::Result<()> {
        info!(question_id = %question_id, value = %value, "Response recorded");
        match &self.inner {
            Some(inner) => inner.on_response(question_id, value).await,
            None => Ok(()),
        }
    }
}

pub struct NoOpSignal;

impl CompletionSignal for NoOpSignal {
    fn on_auto_close(&self) {}
}

/// Counts how often the close signal fired.
#[derive(Default)]
pub struct CaptureSignal {
    fired: AtomicUsize,
}

impl CaptureSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.fired.load(Ordering::SeqCst)
    }

    pub fn fired(&self) -> bool {
        self.count() > 0
    }
}

impl CompletionSignal for CaptureSignal {
    fn on_auto_close(&self) {
        self.fired.fetch_add(1, Ordering::SeqCst);
    }
}

/// Passes the close signal through at most once, however many of the
/// countdown and the finish path ask for it.
pub struct OnceSignal {
    inner: Arc<dyn CompletionSignal>,
    fired: AtomicBool,
}

impl OnceSignal {
    pub fn new(inner: Arc<dyn CompletionSignal>) -> Self {
        Self {
            inner,
            fired: AtomicBool::new(false),
        }
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }
}

impl CompletionSignal for OnceSignal {
    fn on_auto_close(&self) {
        if !self.fired.swap(true, Ordering::SeqCst) {
            self.inner.on_auto_close();
        }
    }
}

pub fn noop_responses() -> Arc<dyn ResponseSink> {
    Arc::new(NoOpResponses)
}

pub fn noop_signal() -> Arc<dyn CompletionSignal> {
    Arc::new(NoOpSignal)
}

pub fn capture_responses() -> Arc<CaptureResponses> {
    Arc::new(CaptureResponses::new())
}

pub fn capture_signal() -> Arc<CaptureSignal> {
    Arc::new(CaptureSignal::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_capture_responses_keeps_order() {
        let sink = capture_responses();
        sink.on_response("q1", &ResponseValue::text("a")).await.unwrap();
        sink.on_response("q2", &ResponseValue::Number(4.0)).await.unwrap();

        let recorded = sink.responses();
        assert_eq!(sink.count(), 2);
        assert_eq!(recorded[0].0, "q1");
        assert_eq!(recorded[1].1, ResponseValue::Number(4.0));
    }

    #[test]
    fn test_capture_signal_counts() {
        let signal = capture_signal();
        assert!(!signal.fired());
        signal.on_auto_close();
        signal.on_auto_close();
        assert_eq!(signal.count(), 2);
    }

    #[tokio::test]
    async fn test_log_responses_forwards_to_inner() {
        let capture = capture_responses();
        let sink = LogResponses::wrapping(capture.clone());
        sink.on_response("q1", &ResponseValue::text("yes")).await.unwrap();
        sink.on_response("q2", &ResponseValue::Null).await.unwrap();

        assert_eq!(capture.count(), 2);
        assert_eq!(capture.responses()[0], ("q1".to_string(), ResponseValue::text("yes")));

        let standalone = LogResponses::new();
        assert!(standalone
            .on_response("q1", &ResponseValue::Number(3.0))
            .await
            .is_ok());
    }

    #[test]
    fn test_once_signal_fires_only_once() {
        let capture = capture_signal();
        let once = OnceSignal::new(capture.clone());
        assert!(!once.has_fired());

        once.on_auto_close();
        once.on_auto_close();
        assert!(once.has_fired());
        assert_eq!(capture.count(), 1);
    }
}
