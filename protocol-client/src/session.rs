//! Headless analyzer session: the transient state behind the upload view.
//!
//! Holds the selected file, the last result, the current error and the
//! simulated progress. Operations take `&mut self`, so at most one upload is
//! in flight per session.

use std::sync::Arc;

use reqwest::Url;
use tracing::{error, info, warn};

use crate::{
    client::AnalyzerApi,
    error::AnalyzerError,
    file::ProtocolFile,
    locale::{Locale, Messages},
    models::{AnalysisResult, ResearchResults},
    progress::{COMPLETE, Progress, ProgressTicker},
};

/// How an `analyze` call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyzeOutcome {
    /// No file selected; nothing was sent.
    Skipped,
    Completed,
    Failed,
}

/// A finished export: the URL as returned and its absolute form.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedPdf {
    pub pdf_url: String,
    pub resolved: Url,
}

pub struct AnalyzerSession {
    api: Arc<dyn AnalyzerApi>,
    locale: Locale,
    file: Option<ProtocolFile>,
    result: Option<AnalysisResult>,
    error: Option<String>,
    progress: Progress,
}

impl AnalyzerSession {
    pub fn new(api: Arc<dyn AnalyzerApi>, locale: Locale) -> Self {
        Self {
            api,
            locale,
            file: None,
            result: None,
            error: None,
            progress: Progress::new(),
        }
    }

    pub fn messages(&self) -> &'static Messages {
        self.locale.messages()
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn file(&self) -> Option<&ProtocolFile> {
        self.file.as_ref()
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Handle for observing progress while `analyze` runs.
    pub fn progress(&self) -> Progress {
        self.progress.clone()
    }

    /// Holds `file` if its name ends in `.docx`, clearing any prior error and
    /// result. Otherwise drops the selection and sets the validation error.
    pub fn select_file(&mut self, file: ProtocolFile) -> bool {
        if file.is_docx() {
            info!("Selected {} ({} bytes)", file.name(), file.len());
            self.file = Some(file);
            self.error = None;
            self.result = None;
            true
        } else {
            warn!("Rejected {}: not a .docx file", file.name());
            self.file = None;
            self.error = Some(self.messages().invalid_file.to_string());
            false
        }
    }

    /// Reinstates a previously received result, e.g. one saved with `--json`,
    /// so it can be exported again.
    pub fn restore_result(&mut self, result: AnalysisResult) {
        self.error = None;
        self.result = Some(result);
    }

    /// Uploads the selected file and stores the result or the error message.
    pub async fn analyze(&mut self) -> AnalyzeOutcome {
        let Some(file) = self.file.as_ref() else {
            return AnalyzeOutcome::Skipped;
        };

        self.error = None;
        let in_flight = InFlight::start(self.progress.clone());

        let outcome = self.api.upload(file).await;
        in_flight.complete();

        match outcome {
            Ok(result) => {
                self.result = Some(result);
                AnalyzeOutcome::Completed
            }
            Err(err) => {
                error!("Protocol analysis failed: {}", err);
                self.error = Some(failure_message(&err, self.messages().analysis_failed));
                AnalyzeOutcome::Failed
            }
        }
    }

    /// Literature lookup. Failures are logged and yield `None`; the session's
    /// error and result are never touched.
    pub async fn research(
        &self,
        drug_name: &str,
        condition: Option<&str>,
    ) -> Option<ResearchResults> {
        if drug_name.trim().is_empty() {
            warn!("Skipping research lookup: empty drug name");
            return None;
        }

        match self.api.research(drug_name, condition).await {
            Ok(results) => Some(results),
            Err(err) => {
                warn!("Research lookup for {} failed: {}", drug_name, err);
                None
            }
        }
    }

    /// Posts the current result for PDF export. Without a result this is a
    /// no-op. Any failure sets the fixed export error message.
    pub async fn export_pdf(&mut self) -> Option<ExportedPdf> {
        let result = self.result.as_ref()?;

        let exported = match self.api.export_pdf(result).await {
            Ok(export) => self
                .api
                .resolve_url(&export.pdf_url)
                .map(|resolved| ExportedPdf {
                    pdf_url: export.pdf_url,
                    resolved,
                }),
            Err(err) => Err(err),
        };

        match exported {
            Ok(exported) => Some(exported),
            Err(err) => {
                error!("PDF export failed: {}", err);
                self.error = Some(self.messages().export_failed.to_string());
                None
            }
        }
    }
}

/// Server-provided message when there is one, otherwise `fallback`.
fn failure_message(err: &AnalyzerError, fallback: &str) -> String {
    err.server_message().unwrap_or(fallback).to_string()
}

/// Runs the progress ticker for the duration of an upload. Progress returns
/// to 0 when this is dropped, including when the upload future is cancelled.
struct InFlight {
    progress: Progress,
    ticker: Option<ProgressTicker>,
}

impl InFlight {
    fn start(progress: Progress) -> Self {
        progress.reset();
        progress.set_running(true);
        let ticker = ProgressTicker::start(progress.clone());
        Self {
            progress,
            ticker: Some(ticker),
        }
    }

    fn complete(mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.stop();
        }
        self.progress.set(COMPLETE);
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.progress.reset();
        self.progress.set_running(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::models::{Drug, ExportResponse, HealthStatus};
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Scripted [`AnalyzerApi`] counting every call.
    #[derive(Default)]
    struct FakeApi {
        upload_response: Mutex<Option<Result<AnalysisResult>>>,
        export_response: Mutex<Option<Result<ExportResponse>>>,
        research_response: Mutex<Option<Result<ResearchResults>>>,
        upload_delay: Duration,
        calls: AtomicUsize,
        exported: Mutex<Vec<AnalysisResult>>,
    }

    impl FakeApi {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn unscripted() -> AnalyzerError {
            AnalyzerError::Api {
                status: StatusCode::NOT_IMPLEMENTED,
                message: None,
            }
        }
    }

    #[async_trait]
    impl AnalyzerApi for FakeApi {
        async fn upload(&self, _file: &ProtocolFile) -> Result<AnalysisResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.upload_delay).await;
            self.upload_response
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(Self::unscripted()))
        }

        async fn research(&self, _: &str, _: Option<&str>) -> Result<ResearchResults> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.research_response
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(Self::unscripted()))
        }

        async fn export_pdf(&self, result: &AnalysisResult) -> Result<ExportResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.exported.lock().unwrap().push(result.clone());
            self.export_response
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(Self::unscripted()))
        }

        async fn health(&self) -> Result<HealthStatus> {
            Err(Self::unscripted())
        }

        async fn download(&self, _: &str) -> Result<Vec<u8>> {
            Err(Self::unscripted())
        }

        fn resolve_url(&self, url: &str) -> Result<Url> {
            Url::parse("http://analyzer.test")
                .and_then(|base| base.join(url))
                .map_err(|e| AnalyzerError::InvalidUrl(e.to_string()))
        }
    }

    fn sample_result() -> AnalysisResult {
        AnalysisResult {
            protocol_summary: Some("Protocol".to_string()),
            main_condition: Some("Hypertension".to_string()),
            drugs: Some(vec![Drug {
                name: Some("Lisinopril".to_string()),
                dosage: Some("10mg".to_string()),
                ..Default::default()
            }]),
            ..Default::default()
        }
    }

    fn docx() -> ProtocolFile {
        ProtocolFile::new("protocol.docx", b"PK".to_vec())
    }

    fn session(api: &Arc<FakeApi>) -> AnalyzerSession {
        AnalyzerSession::new(api.clone(), Locale::Ru)
    }

    #[tokio::test]
    async fn test_invalid_extension_sets_error_without_network() {
        let api = Arc::new(FakeApi::default());
        let mut session = session(&api);

        assert!(!session.select_file(ProtocolFile::new("protocol.pdf", b"%PDF".to_vec())));
        assert_eq!(session.error(), Some("Пожалуйста, выберите файл в формате DOCX"));
        assert!(session.file().is_none());

        assert_eq!(session.analyze().await, AnalyzeOutcome::Skipped);
        assert_eq!(api.calls(), 0);
    }

    #[tokio::test]
    async fn test_valid_selection_clears_error_and_result() {
        let api = Arc::new(FakeApi {
            upload_response: Mutex::new(Some(Ok(sample_result()))),
            ..Default::default()
        });
        let mut session = session(&api);

        session.select_file(docx());
        session.analyze().await;
        assert!(session.result().is_some());

        session.select_file(ProtocolFile::new("notes.txt", Vec::new()));
        assert!(session.error().is_some());

        assert!(session.select_file(docx()));
        assert!(session.error().is_none());
        assert!(session.result().is_none());
        assert_eq!(session.file().map(|f| f.name()), Some("protocol.docx"));
    }

    #[tokio::test]
    async fn test_successful_upload_stores_result() {
        let api = Arc::new(FakeApi {
            upload_response: Mutex::new(Some(Ok(sample_result()))),
            ..Default::default()
        });
        let mut session = session(&api);
        session.select_file(docx());

        assert_eq!(session.analyze().await, AnalyzeOutcome::Completed);
        assert_eq!(session.result(), Some(&sample_result()));
        assert!(session.error().is_none());
        assert_eq!(session.progress().value(), 0);
    }

    #[tokio::test]
    async fn test_server_error_message_is_surfaced_verbatim() {
        let api = Arc::new(FakeApi {
            upload_response: Mutex::new(Some(Err(AnalyzerError::Api {
                status: StatusCode::BAD_REQUEST,
                message: Some("Разрешены только DOCX файлы".to_string()),
            }))),
            ..Default::default()
        });
        let mut session = session(&api);
        session.select_file(docx());

        assert_eq!(session.analyze().await, AnalyzeOutcome::Failed);
        assert_eq!(session.error(), Some("Разрешены только DOCX файлы"));
        assert_eq!(session.progress().value(), 0);
        assert!(!session.progress().is_running());
    }

    #[tokio::test]
    async fn test_missing_error_message_uses_fallback() {
        let api = Arc::new(FakeApi {
            upload_response: Mutex::new(Some(Err(AnalyzerError::Api {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: None,
            }))),
            ..Default::default()
        });
        let mut session = AnalyzerSession::new(api.clone(), Locale::En);
        session.select_file(docx());

        session.analyze().await;
        assert_eq!(session.error(), Some("Failed to analyze the file"));
    }

    #[tokio::test]
    async fn test_rejected_analysis_surfaces_its_error() {
        let api = Arc::new(FakeApi {
            upload_response: Mutex::new(Some(Err(AnalyzerError::Rejected(Some(
                "Документ пуст или не содержит текста".to_string(),
            ))))),
            ..Default::default()
        });
        let mut session = session(&api);
        session.select_file(docx());

        assert_eq!(session.analyze().await, AnalyzeOutcome::Failed);
        assert_eq!(session.error(), Some("Документ пуст или не содержит текста"));
        assert!(session.result().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_is_capped_while_in_flight_and_reset_after() {
        let api = Arc::new(FakeApi {
            upload_response: Mutex::new(Some(Ok(sample_result()))),
            upload_delay: Duration::from_secs(10),
            ..Default::default()
        });
        let mut session = session(&api);
        session.select_file(docx());

        let progress = session.progress();
        assert!(!progress.is_running());
        let samples = Arc::new(Mutex::new(Vec::new()));
        let observer = {
            let samples = samples.clone();
            tokio::spawn(async move {
                loop {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    samples
                        .lock()
                        .unwrap()
                        .push((progress.value(), progress.is_running()));
                }
            })
        };

        assert_eq!(session.analyze().await, AnalyzeOutcome::Completed);
        observer.abort();

        let samples = samples.lock().unwrap();
        assert!(!samples.is_empty());
        assert!(samples.iter().all(|(v, running)| *v <= 90 && *running));
        assert_eq!(samples.iter().map(|(v, _)| *v).max(), Some(90));
        assert_eq!(session.progress().value(), 0);
        assert!(!session.progress().is_running());
    }

    #[tokio::test]
    async fn test_export_without_result_is_noop() {
        let api = Arc::new(FakeApi::default());
        let mut session = session(&api);

        assert!(session.export_pdf().await.is_none());
        assert_eq!(api.calls(), 0);
        assert!(session.error().is_none());
    }

    #[tokio::test]
    async fn test_export_posts_current_result_and_resolves_url() {
        let api = Arc::new(FakeApi {
            upload_response: Mutex::new(Some(Ok(sample_result()))),
            export_response: Mutex::new(Some(Ok(ExportResponse {
                pdf_url: "/api/download/protocol_analysis_20240105_134501.pdf".to_string(),
            }))),
            ..Default::default()
        });
        let mut session = session(&api);
        session.select_file(docx());
        session.analyze().await;

        let exported = session.export_pdf().await.unwrap();
        assert_eq!(
            exported.resolved.as_str(),
            "http://analyzer.test/api/download/protocol_analysis_20240105_134501.pdf"
        );
        assert_eq!(api.exported.lock().unwrap().as_slice(), &[sample_result()]);
    }

    #[tokio::test]
    async fn test_export_failure_sets_fixed_message() {
        let api = Arc::new(FakeApi {
            upload_response: Mutex::new(Some(Ok(sample_result()))),
            export_response: Mutex::new(Some(Err(AnalyzerError::Api {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: Some("Ошибка при создании PDF: disk full".to_string()),
            }))),
            ..Default::default()
        });
        let mut session = session(&api);
        session.select_file(docx());
        session.analyze().await;

        assert!(session.export_pdf().await.is_none());
        assert_eq!(session.error(), Some("Ошибка при экспорте в PDF"));
        assert!(session.result().is_some());
    }

    #[tokio::test]
    async fn test_research_failure_is_silent() {
        let api = Arc::new(FakeApi {
            upload_response: Mutex::new(Some(Ok(sample_result()))),
            ..Default::default()
        });
        let mut session = session(&api);
        session.select_file(docx());
        session.analyze().await;

        assert!(session.research("Lisinopril", Some("Hypertension")).await.is_none());
        assert!(session.error().is_none());
        assert_eq!(session.result(), Some(&sample_result()));
    }

    #[tokio::test]
    async fn test_research_with_blank_name_skips_network() {
        let api = Arc::new(FakeApi::default());
        let session = session(&api);

        assert!(session.research("   ", None).await.is_none());
        assert_eq!(api.calls(), 0);
    }
}
