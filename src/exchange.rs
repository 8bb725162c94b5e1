//! The chat exchange: one submission, one `/ask` request, one transcript update.
//!
//! Submission is split in two halves so a UI can run the network call on a
//! background task: [`ChatExchange::begin`] validates and performs the
//! synchronous transcript effects, [`ChatExchange::resolve`] reduces the
//! outcome and releases the in-flight state. [`ChatExchange::submit`] glues
//! both around a [`Backend`] for callers that just want to await.

use std::path::Path;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::attachment::{AttachmentError, Document};
use crate::backend::{AskError, AskReply, Backend};
use crate::chat::{MessageId, Outcome, QuickQuestion, RequestState, Transcript, FALLBACK_REPLY};
use crate::notify::Notices;

/// Why a submission never reached the network.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    #[error("Please enter a question or attach a PDF")]
    Empty,

    #[error("Still waiting for the previous answer")]
    Busy,
}

/// The outstanding exchange with the assistant endpoint.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub query: String,
    pub attachment: Option<Document>,
    pub user_id: String,
    /// Transcript message this request will resolve
    pub placeholder: MessageId,
}

/// Synthetic per-request user identifier
pub fn session_user_id() -> String {
    format!("web_user_{}", Utc::now().timestamp_millis())
}

impl From<Result<AskReply, AskError>> for Outcome {
    fn from(result: Result<AskReply, AskError>) -> Self {
        match result {
            Ok(reply) => Outcome::Success(
                reply
                    .response
                    .filter(|text| !text.is_empty())
                    .unwrap_or_else(|| FALLBACK_REPLY.to_string()),
            ),
            Err(err) => Outcome::Failure(err.to_string()),
        }
    }
}

#[derive(Debug, Default)]
pub struct ChatExchange {
    transcript: Transcript,
    state: RequestState,
    draft: String,
    attachment: Option<Document>,
    notices: Notices,
}

impl ChatExchange {
    /// A fresh exchange whose transcript opens with the assistant's greeting.
    pub fn new() -> Self {
        Self {
            transcript: Transcript::with_greeting(),
            ..Self::default()
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.state.is_in_flight()
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut String {
        &mut self.draft
    }

    pub fn attachment(&self) -> Option<&Document> {
        self.attachment.as_ref()
    }

    pub fn notices(&self) -> &Notices {
        &self.notices
    }

    pub fn notices_mut(&mut self) -> &mut Notices {
        &mut self.notices
    }

    pub fn attach(&mut self, document: Document) {
        self.notices.info(format!("Attached {}", document.name()));
        self.attachment = Some(document);
    }

    /// Validate and attach a file. Rejections raise a notice and leave the
    /// transcript and any previous attachment untouched.
    pub fn attach_path(&mut self, path: impl AsRef<Path>) -> Result<(), AttachmentError> {
        match Document::from_path(path) {
            Ok(document) => {
                self.attach(document);
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "attachment rejected");
                self.notices.error(err.to_string());
                Err(err)
            }
        }
    }

    pub fn detach(&mut self) -> Option<Document> {
        self.attachment.take()
    }

    /// Start an exchange for `query` and an optional attachment.
    pub fn begin(
        &mut self,
        query: &str,
        attachment: Option<Document>,
    ) -> Result<PendingRequest, Rejection> {
        if self.is_busy() {
            debug!("submission ignored while a request is in flight");
            return Err(Rejection::Busy);
        }

        let blank = query.trim().is_empty();
        if blank && attachment.is_none() {
            self.notices.error(Rejection::Empty.to_string());
            return Err(Rejection::Empty);
        }

        // Whitespace only decides emptiness; the query is shown and sent as typed
        let text = match &attachment {
            Some(doc) if blank => format!("[PDF: {}]", doc.name()),
            Some(doc) => format!("{} [PDF: {}]", query, doc.name()),
            None => query.to_string(),
        };
        self.transcript.push_user(text);

        let Some(placeholder) = self.transcript.push_placeholder() else {
            // Unreachable while RequestState tracks the placeholder
            return Err(Rejection::Busy);
        };
        self.state = RequestState::InFlight { placeholder };

        Ok(PendingRequest {
            query: query.to_string(),
            attachment,
            user_id: session_user_id(),
            placeholder,
        })
    }

    /// Start an exchange from the current draft and attachment.
    pub fn begin_draft(&mut self) -> Result<PendingRequest, Rejection> {
        if self.is_busy() {
            return Err(Rejection::Busy);
        }
        let query = self.draft.clone();
        let attachment = self.attachment.take();
        let result = self.begin(&query, attachment.clone());
        if result.is_err() {
            self.attachment = attachment;
        }
        result
    }

    pub fn begin_quick(&mut self, preset: &QuickQuestion) -> Result<PendingRequest, Rejection> {
        self.begin(preset.text, None)
    }

    /// Apply the outcome of the in-flight request. Always clears the draft,
    /// the attachment and the in-flight state once a terminal outcome lands.
    ///
    /// Returns the outcome that was applied, or `None` when nothing was in
    /// flight or the outcome was still `Pending`.
    pub fn resolve(&mut self, outcome: Outcome) -> Option<Outcome> {
        let RequestState::InFlight { placeholder } = self.state else {
            warn!("resolve called with no request in flight");
            return None;
        };

        match &outcome {
            Outcome::Pending => return None,
            Outcome::Success(_) => info!(placeholder, "answer received"),
            Outcome::Failure(reason) => {
                warn!(placeholder, %reason, "ask request failed");
                self.notices.error(format!("Connection failed: {reason}"));
            }
        }

        self.transcript.apply(placeholder, outcome.clone());
        self.draft.clear();
        self.attachment = None;
        self.state = RequestState::Idle;
        Some(outcome)
    }

    /// Run a whole exchange against `backend` and return the outcome that
    /// replaced the placeholder.
    pub async fn submit<B: Backend>(
        &mut self,
        backend: &B,
        query: &str,
        attachment: Option<Document>,
    ) -> Result<Outcome, Rejection> {
        let request = self.begin(query, attachment)?;
        let result = backend.ask(&request).await;
        let outcome = Outcome::from(result);
        self.resolve(outcome.clone());
        Ok(outcome)
    }

    pub async fn submit_quick_question<B: Backend>(
        &mut self,
        backend: &B,
        preset: &QuickQuestion,
    ) -> Result<Outcome, Rejection> {
        self.submit(backend, preset.text, None).await
    }
}
