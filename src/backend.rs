use std::future::Future;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::exchange::PendingRequest;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// Every way an `/ask` call can fail. All of them are shown to the user as a
/// connection failure.
#[derive(Debug, Error)]
pub enum AskError {
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("server returned {0}")]
    Status(StatusCode),

    #[error("could not decode response: {0}")]
    Decode(#[source] reqwest::Error),
}

/// Body of a successful `/ask` reply. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AskReply {
    #[serde(default)]
    pub response: Option<String>,
}

/// Something that can answer a pending request.
pub trait Backend {
    fn ask(&self, request: &PendingRequest) -> impl Future<Output = Result<AskReply, AskError>> + Send;
}

#[derive(Clone)]
pub struct AskClient {
    client: Client,
    base_url: String,
}

impl AskClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint(&self) -> String {
        format!("{}/ask", self.base_url)
    }

    fn form(request: &PendingRequest) -> Result<Form, AskError> {
        let mut form = Form::new()
            .text("user_query", request.query.clone())
            .text("user_id", request.user_id.clone());

        if let Some(doc) = &request.attachment {
            let part = Part::bytes(doc.bytes().to_vec())
                .file_name(doc.name().to_string())
                .mime_str(doc.media_type())
                .map_err(AskError::Transport)?;
            form = form.part("pdf_file", part);
        }

        Ok(form)
    }
}

impl Backend for AskClient {
    async fn ask(&self, request: &PendingRequest) -> Result<AskReply, AskError> {
        let url = self.endpoint();
        debug!(
            %url,
            user_id = %request.user_id,
            attachment = request.attachment.as_ref().map(|d| d.name()),
            "sending query"
        );

        let response = self
            .client
            .post(&url)
            .multipart(Self::form(request)?)
            .send()
            .await
            .map_err(AskError::Transport)?;

        if !response.status().is_success() {
            return Err(AskError::Status(response.status()));
        }

        response.json::<AskReply>().await.map_err(AskError::Decode)
    }
}
