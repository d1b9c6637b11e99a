pub mod client;
pub mod config;
pub mod error;
pub mod file;
pub mod locale;
pub mod models;
pub mod progress;
pub mod render;
pub mod session;

// Re-export commonly used types
pub use client::{AnalyzerApi, HttpAnalyzerClient};
pub use config::ClientConfig;
pub use error::{AnalyzerError, Result};
pub use file::{ProtocolFile, is_docx};
pub use locale::{Locale, Messages};
pub use models::{
    AnalysisResult, ClinicalTrial, Drug, ErrorResponse, ExportResponse, FdaApplication,
    HealthStatus, PubMedArticle, ResearchResults, non_blank,
};
pub use progress::{Progress, ProgressTicker};
pub use render::{DrugCard, ResultView, SummaryPanel, render_research};
pub use session::{AnalyzeOutcome, AnalyzerSession, ExportedPdf};
