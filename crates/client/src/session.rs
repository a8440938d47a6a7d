use crate::error::Result;
use crate::service::{AnalysisService, ChatUpload};
use convoq_core::{
    AnalysisViewModel, DeepOutcome, DeepTicket, Disclosure, DisclosureEngine, HistoryEntry,
};
use convoq_protocol::{DateFormat, DeepMergeResult, HistoricalRecord, UsageStats};
use std::sync::Arc;

/// One user's dashboard: a disclosure engine fed by an analysis service.
///
/// Deep scans are split in three so that the engine is never borrowed across
/// the network round trip: [`Dashboard::begin_deep`] hands out a ticket,
/// [`Dashboard::fetch_deep`] only talks to the service, and
/// [`Dashboard::finish_deep`] delivers the completion. Anything the caller
/// does in between (reset, a new upload, a history selection) makes the
/// completion stale.
pub struct Dashboard<S> {
    service: Arc<S>,
    engine: DisclosureEngine,
    history: Vec<HistoricalRecord>,
}

impl<S: AnalysisService> Dashboard<S> {
    pub fn new(service: S) -> Self {
        Self::with_shared(Arc::new(service))
    }

    pub fn with_shared(service: Arc<S>) -> Self {
        Self {
            service,
            engine: DisclosureEngine::new(),
            history: Vec::new(),
        }
    }

    pub fn service(&self) -> Arc<S> {
        Arc::clone(&self.service)
    }

    pub fn engine(&self) -> &DisclosureEngine {
        &self.engine
    }

    pub fn state(&self) -> &Disclosure {
        self.engine.state()
    }

    pub fn view(&self) -> Option<&AnalysisViewModel> {
        self.engine.view()
    }

    pub fn deep_scan_enabled(&self) -> bool {
        self.engine.deep_scan_enabled()
    }

    /// Records fetched by the last [`Dashboard::load_history`].
    pub fn history(&self) -> &[HistoricalRecord] {
        &self.history
    }

    /// Uploads a chat and installs the fast result. On any failure the
    /// current view and state are kept.
    pub async fn upload(
        &mut self,
        upload: &ChatUpload,
        date_format: DateFormat,
    ) -> Result<&AnalysisViewModel> {
        log::info!(
            "uploading {} ({} bytes, date format {date_format})",
            upload.file_name,
            upload.bytes.len()
        );
        let fast = self.service.analyze_fast(upload, date_format).await?;
        Ok(self.engine.apply_fast(&fast)?)
    }

    pub fn begin_deep(&mut self) -> Result<DeepTicket> {
        Ok(self.engine.request_deep()?)
    }

    /// Network half of a deep scan. Takes no dashboard borrow.
    pub async fn fetch_deep(service: &S, ticket: &DeepTicket) -> Result<DeepMergeResult> {
        service.analyze_deep(&ticket.token.to_request()).await
    }

    /// Delivers the completion of a deep request. A failure for the live
    /// generation frees the trigger for a retry and is returned; failures
    /// and results for superseded generations are dropped.
    pub fn finish_deep(
        &mut self,
        ticket: &DeepTicket,
        result: Result<DeepMergeResult>,
    ) -> Result<DeepOutcome> {
        match result {
            Ok(deep) => Ok(self.engine.apply_deep(ticket.generation, &deep)),
            Err(err) => {
                if self.engine.deep_failed(ticket.generation) {
                    log::warn!("deep scan failed: {err}");
                    Err(err)
                } else {
                    log::info!(
                        "ignoring failure of superseded deep request (generation {}): {err}",
                        ticket.generation
                    );
                    Ok(DeepOutcome::Discarded)
                }
            }
        }
    }

    /// Runs a whole deep scan without interleaving.
    pub async fn deep_scan(&mut self) -> Result<DeepOutcome> {
        let ticket = self.begin_deep()?;
        let result = Self::fetch_deep(&self.service, &ticket).await;
        self.finish_deep(&ticket, result)
    }

    pub async fn load_history(&mut self) -> Result<Vec<HistoryEntry>> {
        let records = self.service.history().await?;
        log::debug!("loaded {} history records", records.len());
        self.history = records;
        Ok(self.history.iter().map(HistoryEntry::from_record).collect())
    }

    pub fn select_history(&mut self, record: &HistoricalRecord) -> Result<&AnalysisViewModel> {
        Ok(self.engine.select_history(record)?)
    }

    /// Selects the `index`-th record from the last loaded listing.
    pub fn select_history_at(&mut self, index: usize) -> Result<Option<&AnalysisViewModel>> {
        let Some(record) = self.history.get(index) else {
            return Ok(None);
        };
        Ok(Some(self.engine.select_history(record)?))
    }

    pub fn reset(&mut self) {
        self.engine.reset();
    }

    pub async fn usage(&self) -> Result<UsageStats> {
        self.service.usage().await
    }
}
