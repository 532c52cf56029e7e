use std::{
    collections::BTreeMap,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;

use crate::telemetry::{
    error::{SubmitError, TrialError},
    ports::{Submitter, Trial},
    types::{ActiveWindow, Document, SubmissionOutcome, SubmissionRecord},
};

#[derive(Debug, Clone)]
enum StaticContent {
    Document(Document),
    Empty,
    Failure(String),
    Panic(String),
}

/// Trial double with fixed content that counts `content()` calls.
#[derive(Debug)]
pub struct StaticTrial {
    id: String,
    display_name: String,
    window: ActiveWindow,
    content: StaticContent,
    content_calls: Arc<AtomicUsize>,
}

impl StaticTrial {
    pub fn new(id: impl Into<String>, window: ActiveWindow) -> Self {
        let id = id.into();
        Self {
            display_name: id.clone(),
            id,
            window,
            content: StaticContent::Document(Document::new()),
            content_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    pub fn with_content(mut self, content: Document) -> Self {
        self.content = StaticContent::Document(content);
        self
    }

    pub fn without_data(mut self) -> Self {
        self.content = StaticContent::Empty;
        self
    }

    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.content = StaticContent::Failure(message.into());
        self
    }

    /// `content()` panics with `message` instead of returning.
    pub fn panicking(mut self, message: impl Into<String>) -> Self {
        self.content = StaticContent::Panic(message.into());
        self
    }

    pub fn content_calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.content_calls)
    }
}

#[async_trait]
impl Trial for StaticTrial {
    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn active_window(&self) -> ActiveWindow {
        self.window
    }

    async fn content(&self) -> Result<Option<Document>, TrialError> {
        self.content_calls.fetch_add(1, Ordering::SeqCst);
        match &self.content {
            StaticContent::Document(document) => Ok(Some(document.clone())),
            StaticContent::Empty => Ok(None),
            StaticContent::Failure(message) => Err(TrialError::new(message.clone())),
            StaticContent::Panic(message) => panic!("{message}"),
        }
    }
}

/// Submitter double that records every record it is handed. Trials without
/// a scripted failure are answered with `200 OK`.
#[derive(Debug, Default)]
pub struct RecordingSubmitter {
    sent: Mutex<Vec<(String, SubmissionRecord)>>,
    failures: BTreeMap<String, SubmitError>,
}

impl RecordingSubmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(mut self, trial_id: impl Into<String>, error: SubmitError) -> Self {
        self.failures.insert(trial_id.into(), error);
        self
    }

    pub fn sent(&self) -> Vec<(String, SubmissionRecord)> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn sent_for(&self, trial_id: &str) -> Vec<SubmissionRecord> {
        self.sent()
            .into_iter()
            .filter(|(_, record)| record.trial_id() == trial_id)
            .map(|(_, record)| record)
            .collect()
    }
}

#[async_trait]
impl Submitter for RecordingSubmitter {
    async fn send(&self, endpoint: &str, record: &SubmissionRecord) -> SubmissionOutcome {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((endpoint.to_string(), record.clone()));

        match self.failures.get(record.trial_id()) {
            Some(error) => SubmissionOutcome::TransportFailure {
                error: error.clone(),
            },
            None => SubmissionOutcome::Delivered {
                status_line: "200 OK".to_string(),
            },
        }
    }
}
