//! HTTP client for the vocabulary API.

use std::time::Duration;

use async_trait::async_trait;
use learnflow_core::{
    CollectionId, FlowError, PronunciationResult, Task, Transport, WordOutcome,
};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

/// File name the scorer expects for uploaded clips.
const CLIP_FILE_NAME: &str = "voice.webm";

#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl UpstreamClient {
    /// Every request, pronunciation uploads included, fails once `timeout` elapses.
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, FlowError> {
        let resp = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| FlowError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(FlowError::Transport(format!("upstream returned {status}: {message}")));
        }
        Ok(resp)
    }

    async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, FlowError> {
        resp.json()
            .await
            .map_err(|e| FlowError::Transport(format!("invalid upstream response: {e}")))
    }
}

#[async_trait]
impl Transport for UpstreamClient {
    async fn fetch_tasks(
        &self,
        collection_id: CollectionId,
        word_ids: &[i64],
    ) -> learnflow_core::Result<Vec<Task>> {
        let query: Vec<(&str, i64)> = word_ids.iter().map(|id| ("word_ids", *id)).collect();
        let request = self
            .client
            .get(self.url(&format!("/tasks/{collection_id}")))
            .query(&query);
        Self::decode(self.send(request).await?).await
    }

    async fn fetch_repeat_tasks(&self, collection_id: CollectionId) -> learnflow_core::Result<Vec<Task>> {
        let request = self.client.get(self.url(&format!("/repeat/{collection_id}")));
        Self::decode(self.send(request).await?).await
    }

    async fn submit_pronunciation(
        &self,
        task_id: &str,
        word: &str,
        audio: Vec<u8>,
    ) -> learnflow_core::Result<PronunciationResult> {
        let clip = Part::bytes(audio)
            .file_name(CLIP_FILE_NAME)
            .mime_str("audio/webm")
            .map_err(|e| FlowError::Transport(e.to_string()))?;
        let form = Form::new().text("word", word.to_string()).part("audio", clip);

        let request = self
            .client
            .post(self.url(&format!("/pronunciation/{task_id}")))
            .multipart(form);
        Self::decode(self.send(request).await?).await
    }

    async fn submit_outcomes(
        &self,
        collection_id: CollectionId,
        outcomes: &[WordOutcome],
    ) -> learnflow_core::Result<()> {
        let request = self
            .client
            .post(self.url(&format!("/spaced_repeat/{collection_id}")))
            .json(outcomes);
        self.send(request).await?;
        Ok(())
    }
}
