use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::service::{AnalysisService, ChatUpload};
use async_trait::async_trait;
use convoq_protocol::{
    DateFormat, DeepAnalysisRequest, DeepMergeResult, FastResult, HistoricalRecord,
    ServiceErrorBody, UsageStats,
};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

pub struct HttpAnalysisService {
    client: Client,
    config: ClientConfig,
}

impl HttpAnalysisService {
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.auth_token {
            Some(token) => request.bearer_auth(token.as_str()),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(&self, what: &str, request: RequestBuilder) -> Result<T> {
        log::debug!("{what}: sending request");
        let response = self.authorize(request).send().await?;
        decode(what, response).await
    }
}

async fn decode<T: DeserializeOwned>(what: &str, response: Response) -> Result<T> {
    let status = response.status();
    let body = response.bytes().await?;
    if !status.is_success() {
        let detail = serde_json::from_slice::<ServiceErrorBody>(&body)
            .ok()
            .and_then(|err| err.message())
            .unwrap_or_else(|| String::from_utf8_lossy(&body).trim().to_string());
        log::warn!("{what}: service returned {status}");
        return Err(ClientError::Status {
            status: status.as_u16(),
            detail,
        });
    }
    Ok(serde_json::from_slice(&body)?)
}

#[async_trait]
impl AnalysisService for HttpAnalysisService {
    async fn analyze_fast(
        &self,
        upload: &ChatUpload,
        date_format: DateFormat,
    ) -> Result<FastResult> {
        let part = Part::bytes(upload.bytes.clone())
            .file_name(upload.file_name.clone())
            .mime_str("text/plain")?;
        let form = Form::new()
            .part("file", part)
            .text("date_format", date_format.as_str());
        let request = self
            .client
            .post(self.config.endpoint("/analyze/fast"))
            .multipart(form);
        self.send("analyze_fast", request).await
    }

    async fn analyze_deep(&self, request: &DeepAnalysisRequest) -> Result<DeepMergeResult> {
        let request = self
            .client
            .post(self.config.endpoint("/analyze/deep"))
            .json(request);
        self.send("analyze_deep", request).await
    }

    async fn history(&self) -> Result<Vec<HistoricalRecord>> {
        let request = self.client.get(self.config.endpoint("/history"));
        self.send("history", request).await
    }

    async fn usage(&self) -> Result<UsageStats> {
        let request = self.client.get(self.config.endpoint("/usage"));
        self.send("usage", request).await
    }
}
