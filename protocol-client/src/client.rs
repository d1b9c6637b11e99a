use async_trait::async_trait;
use reqwest::{
    Response, Url,
    multipart::{Form, Part},
};
use tracing::{error, info};

use crate::{
    config::ClientConfig,
    error::{AnalyzerError, Result},
    file::{DOCX_MIME, ProtocolFile},
    models::{AnalysisResult, ErrorResponse, ExportResponse, HealthStatus, ResearchResults},
};

pub const UPLOAD_PATH: &str = "/api/upload";
pub const RESEARCH_PATH: &str = "/api/research";
pub const EXPORT_PDF_PATH: &str = "/api/export/pdf";
pub const HEALTH_PATH: &str = "/api/health";

/// The analyzer backend's HTTP contract.
#[async_trait]
pub trait AnalyzerApi: Send + Sync {
    /// `POST /api/upload` with the document as multipart field `file`.
    async fn upload(&self, file: &ProtocolFile) -> Result<AnalysisResult>;

    /// `GET /api/research/{drug}?condition=...`
    async fn research(&self, drug_name: &str, condition: Option<&str>) -> Result<ResearchResults>;

    /// `POST /api/export/pdf` with the result previously received.
    async fn export_pdf(&self, result: &AnalysisResult) -> Result<ExportResponse>;

    async fn health(&self) -> Result<HealthStatus>;

    /// Fetches a generated file, e.g. the `pdf_url` of an export.
    async fn download(&self, url: &str) -> Result<Vec<u8>>;

    /// Absolute form of a possibly relative URL returned by the backend.
    fn resolve_url(&self, url: &str) -> Result<Url>;
}

/// reqwest-backed implementation of [`AnalyzerApi`].
#[derive(Clone)]
pub struct HttpAnalyzerClient {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpAnalyzerClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let base_url = Url::parse(&config.base_url)
            .map_err(|e| AnalyzerError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(AnalyzerError::InvalidUrl(config.base_url.clone()));
        }

        Ok(Self {
            client: builder.build()?,
            base_url,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| AnalyzerError::InvalidUrl(format!("{}: {}", path, e)))
    }

    fn research_url(&self, drug_name: &str, condition: Option<&str>) -> Result<Url> {
        let mut url = self.endpoint(&format!(
            "{}/{}",
            RESEARCH_PATH,
            urlencoding::encode(drug_name)
        ))?;
        if let Some(condition) = condition.filter(|c| !c.is_empty()) {
            url.query_pairs_mut().append_pair("condition", condition);
        }
        Ok(url)
    }
}

#[async_trait]
impl AnalyzerApi for HttpAnalyzerClient {
    async fn upload(&self, file: &ProtocolFile) -> Result<AnalysisResult> {
        let url = self.endpoint(UPLOAD_PATH)?;
        info!("Uploading {} ({} bytes) to {}", file.name(), file.len(), url);

        let part = Part::bytes(file.bytes().to_vec())
            .file_name(file.name().to_string())
            .mime_str(DOCX_MIME)?;
        let form = Form::new().part("file", part);

        let response = self.client.post(url).multipart(form).send().await?;
        if !response.status().is_success() {
            let err = api_error(response).await;
            error!("Upload of {} failed: {}", file.name(), err);
            return Err(err);
        }

        let body = response.bytes().await?;
        let result: AnalysisResult = serde_json::from_slice(&body)?;

        if result.is_rejected() {
            let message = result.error.clone().filter(|m| !m.is_empty());
            error!("Analysis of {} rejected: {:?}", file.name(), message);
            return Err(AnalyzerError::Rejected(message));
        }

        info!(
            "Analysis of {} completed: {} drugs extracted",
            file.name(),
            result.drugs().len()
        );
        Ok(result)
    }

    async fn research(&self, drug_name: &str, condition: Option<&str>) -> Result<ResearchResults> {
        let url = self.research_url(drug_name, condition)?;
        info!("Searching research for {}", drug_name);

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn export_pdf(&self, result: &AnalysisResult) -> Result<ExportResponse> {
        let url = self.endpoint(EXPORT_PDF_PATH)?;
        info!("Requesting PDF export");

        let response = self.client.post(url).json(result).send().await?;
        let status = response.status();
        if !status.is_success() {
            error!("PDF export failed with status {}", status);
            return Err(AnalyzerError::Api {
                status,
                message: None,
            });
        }

        let body = response.bytes().await?;
        let export: ExportResponse = serde_json::from_slice(&body)?;
        info!("PDF export ready at {}", export.pdf_url);
        Ok(export)
    }

    async fn health(&self) -> Result<HealthStatus> {
        let response = self.client.get(self.endpoint(HEALTH_PATH)?).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let url = self.resolve_url(url)?;
        info!("Downloading {}", url);

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(response.bytes().await?.to_vec())
    }

    fn resolve_url(&self, url: &str) -> Result<Url> {
        self.endpoint(url)
    }
}

/// Turns a non-2xx response into [`AnalyzerError::Api`], keeping the body's
/// `error` field when it decodes.
async fn api_error(response: Response) -> AnalyzerError {
    let status = response.status();
    let message = response
        .text()
        .await
        .ok()
        .and_then(|body| serde_json::from_str::<ErrorResponse>(&body).ok())
        .map(|body| body.error)
        .filter(|m| !m.is_empty());

    AnalyzerError::Api { status, message }
}
