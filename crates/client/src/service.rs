use crate::error::Result;
use async_trait::async_trait;
use convoq_protocol::{
    DateFormat, DeepAnalysisRequest, DeepMergeResult, FastResult, HistoricalRecord, UsageStats,
};
use std::path::Path;

/// A chat export ready to be uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ChatUpload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    pub async fn from_path(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "chat.txt".to_string());
        Ok(Self { file_name, bytes })
    }
}

/// The remote analysis service. Implemented over HTTP by
/// [`crate::HttpAnalysisService`] and by in-memory fakes in tests.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    async fn analyze_fast(
        &self,
        upload: &ChatUpload,
        date_format: DateFormat,
    ) -> Result<FastResult>;

    async fn analyze_deep(&self, request: &DeepAnalysisRequest) -> Result<DeepMergeResult>;

    async fn history(&self) -> Result<Vec<HistoricalRecord>>;

    async fn usage(&self) -> Result<UsageStats>;
}
