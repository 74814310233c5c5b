//! Dashboard state and the UI boundary
//!
//! The core never renders anything; it talks to whatever frontend is
//! attached through [`UiBridge`]: status/error text, a loading indicator,
//! grounding citations, synthesized dashboard results, and one-shot image
//! capture requests for the diagnosis tool.

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::tools::SynthesizedResult;

/// How many recent dashboard entries are passed to tools as context
pub const HISTORY_CONTEXT_LEN: usize = 10;

/// One grounding citation surfaced beside the conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    pub uri: String,
    pub title: String,
}

/// Loading indicator state for an in-flight tool batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadingState {
    pub active: bool,
    pub tool_name: Option<String>,
}

impl LoadingState {
    /// Indicator raised for the named tool
    #[must_use]
    pub fn active(tool_name: impl Into<String>) -> Self {
        Self {
            active: true,
            tool_name: Some(tool_name.into()),
        }
    }

    /// Indicator cleared
    #[must_use]
    pub fn inactive() -> Self {
        Self::default()
    }
}

/// Events pushed to the attached frontend
#[derive(Debug)]
pub enum UiEvent {
    /// Status line text
    Status(String),
    /// Error text
    Error(String),
    /// Loading indicator change
    Loading(LoadingState),
    /// Citation list, replacing any previous list
    Citations(Vec<Citation>),
    /// A synthesized result to append to the dashboard
    Dashboard(Box<SynthesizedResult>),
}

/// A one-shot request for a captured crop image
///
/// Owned by the frontend once delivered; answering or dropping it resolves
/// the deferred diagnosis call. Dropping without answering cancels.
#[derive(Debug)]
pub struct ImageRequest {
    responder: oneshot::Sender<Option<String>>,
}

impl ImageRequest {
    /// Supply a captured image (base64, with or without a data-URL prefix)
    pub fn supply(self, image: String) {
        let _ = self.responder.send(Some(image));
    }

    /// Explicitly cancel the request
    pub fn cancel(self) {
        let _ = self.responder.send(None);
    }
}

/// Handle through which the core reaches the frontend
#[derive(Debug, Clone)]
pub struct UiBridge {
    events: mpsc::UnboundedSender<UiEvent>,
    image_requests: Option<mpsc::UnboundedSender<ImageRequest>>,
}

impl UiBridge {
    /// Bridge without image-capture support
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<UiEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        (
            Self {
                events,
                image_requests: None,
            },
            rx,
        )
    }

    /// Bridge with an image-capture registration point
    #[must_use]
    pub fn with_image_capture() -> (
        Self,
        mpsc::UnboundedReceiver<UiEvent>,
        mpsc::UnboundedReceiver<ImageRequest>,
    ) {
        let (events, rx) = mpsc::unbounded_channel();
        let (image_tx, image_rx) = mpsc::unbounded_channel();
        (
            Self {
                events,
                image_requests: Some(image_tx),
            },
            rx,
            image_rx,
        )
    }

    /// Update the status line
    pub fn set_status(&self, message: impl Into<String>) {
        let _ = self.events.send(UiEvent::Status(message.into()));
    }

    /// Surface an error
    pub fn set_error(&self, message: impl Into<String>) {
        let _ = self.events.send(UiEvent::Error(message.into()));
    }

    /// Update the loading indicator
    pub fn set_loading(&self, state: LoadingState) {
        let _ = self.events.send(UiEvent::Loading(state));
    }

    /// Replace the citation list
    pub fn set_citations(&self, citations: Vec<Citation>) {
        let _ = self.events.send(UiEvent::Citations(citations));
    }

    /// Append a synthesized result to the dashboard
    pub fn push_result(&self, result: SynthesizedResult) {
        let _ = self.events.send(UiEvent::Dashboard(Box::new(result)));
    }

    /// Whether a frontend image-capture hook is attached
    #[must_use]
    pub fn supports_image_capture(&self) -> bool {
        self.image_requests.is_some()
    }

    /// Ask the frontend for one captured image
    ///
    /// Returns `None` when no capture hook is attached (or the frontend is
    /// gone); otherwise a receiver resolved with the image, `None` on
    /// explicit cancel, or an error when the request is dropped unanswered.
    #[must_use]
    pub fn request_image(&self) -> Option<oneshot::Receiver<Option<String>>> {
        let sender = self.image_requests.as_ref()?;
        let (responder, receiver) = oneshot::channel();
        sender.send(ImageRequest { responder }).ok()?;
        Some(receiver)
    }
}

/// Ordered synthesized results for the current session
///
/// Append-only while the session runs; cleared wholesale on request. The
/// truncation to the last [`HISTORY_CONTEXT_LEN`] entries is the caller's
/// concern, not the dispatcher's.
#[derive(Debug, Default)]
pub struct DashboardHistory {
    entries: Vec<SynthesizedResult>,
}

impl DashboardHistory {
    /// Empty history
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one result
    pub fn push(&mut self, result: SynthesizedResult) {
        self.entries.push(result);
    }

    /// Clear all history
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the history is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The last `n` result payloads, oldest first, for tool context
    #[must_use]
    pub fn recent_context(&self, n: usize) -> Vec<Value> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries[skip..]
            .iter()
            .map(|entry| serde_json::to_value(&entry.response.result).unwrap_or(Value::Null))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::SynthesizedResult;

    fn entry(summary: &str) -> SynthesizedResult {
        SynthesizedResult::with_summary("id", summary)
    }

    #[test]
    fn history_truncates_to_last_n() {
        let mut history = DashboardHistory::new();
        for i in 0..15 {
            history.push(entry(&format!("result {i}")));
        }

        let context = history.recent_context(HISTORY_CONTEXT_LEN);
        assert_eq!(context.len(), HISTORY_CONTEXT_LEN);
        assert_eq!(context[0]["summary"], "result 5");
        assert_eq!(context[9]["summary"], "result 14");
    }

    #[test]
    fn clear_empties_history() {
        let mut history = DashboardHistory::new();
        history.push(entry("a"));
        history.clear();
        assert!(history.is_empty());
        assert!(history.recent_context(HISTORY_CONTEXT_LEN).is_empty());
    }

    #[tokio::test]
    async fn image_request_roundtrip() {
        let (ui, _events, mut images) = UiBridge::with_image_capture();

        let receiver = ui.request_image().unwrap();
        let request = images.recv().await.unwrap();
        request.supply("aGVsbG8=".to_string());

        assert_eq!(receiver.await.unwrap(), Some("aGVsbG8=".to_string()));
    }

    #[tokio::test]
    async fn dropped_request_reads_as_cancelled() {
        let (ui, _events, mut images) = UiBridge::with_image_capture();

        let receiver = ui.request_image().unwrap();
        let request = images.recv().await.unwrap();
        drop(request);

        assert!(receiver.await.is_err());
    }
}
