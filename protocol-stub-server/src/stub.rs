use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const SAMPLE_REPORT_NAME: &str = "protocol_analysis_20240105_134501.pdf";
pub const SAMPLE_REPORT_BYTES: &[u8] = b"%PDF-1.4\n% stub report\n%%EOF\n";

/// A canned HTTP response.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: StatusCode,
    pub body: ReplyBody,
}

#[derive(Debug, Clone)]
pub enum ReplyBody {
    Json(Value),
    Text(String),
    Empty,
}

impl Reply {
    pub fn ok(body: Value) -> Self {
        Self::json(StatusCode::OK, body)
    }

    pub fn json(status: StatusCode, body: Value) -> Self {
        Self {
            status,
            body: ReplyBody::Json(body),
        }
    }

    pub fn error(status: StatusCode, message: &str) -> Self {
        Self::json(status, json!({ "error": message }))
    }

    pub fn text(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: ReplyBody::Text(body.into()),
        }
    }

    pub fn empty(status: StatusCode) -> Self {
        Self {
            status,
            body: ReplyBody::Empty,
        }
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        match self.body {
            ReplyBody::Json(body) => (self.status, Json(body)).into_response(),
            ReplyBody::Text(body) => (
                self.status,
                [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                body,
            )
                .into_response(),
            ReplyBody::Empty => self.status.into_response(),
        }
    }
}

/// What the stub answers on each route. Defaults mirror a healthy backend.
#[derive(Debug, Clone)]
pub struct StubBackend {
    pub upload: Reply,
    pub research: Reply,
    pub export: Reply,
    pub health: Reply,
    pub downloads: HashMap<String, Vec<u8>>,
}

impl Default for StubBackend {
    fn default() -> Self {
        Self {
            upload: Reply::ok(sample_analysis()),
            research: Reply::ok(sample_research()),
            export: Reply::ok(json!({ "pdf_url": format!("/api/download/{SAMPLE_REPORT_NAME}") })),
            health: Reply::ok(json!({
                "status": "healthy",
                "version": "2.0.0",
                "services": {
                    "gemini_ai": true,
                    "pubmed": true,
                    "clinical_trials": true,
                    "fda": true
                }
            })),
            downloads: HashMap::from([(
                SAMPLE_REPORT_NAME.to_string(),
                SAMPLE_REPORT_BYTES.to_vec(),
            )]),
        }
    }
}

impl StubBackend {
    pub fn with_upload(mut self, reply: Reply) -> Self {
        self.upload = reply;
        self
    }

    pub fn with_research(mut self, reply: Reply) -> Self {
        self.research = reply;
        self
    }

    pub fn with_export(mut self, reply: Reply) -> Self {
        self.export = reply;
        self
    }

    pub fn with_health(mut self, reply: Reply) -> Self {
        self.health = reply;
        self
    }
}

pub fn sample_analysis() -> Value {
    json!({
        "success": true,
        "protocol_summary": "Протокол ведения пациентов с артериальной гипертензией.",
        "main_condition": "Hypertension",
        "drugs": [
            {
                "id": "1",
                "name": "Lisinopril",
                "innEnglish": "lisinopril",
                "dosage": "10mg"
            }
        ],
        "analysis_timestamp": "20240105_134501"
    })
}

pub fn sample_research() -> Value {
    json!({
        "pubmed": [
            {
                "pmid": "12345678",
                "title": "Lisinopril in essential hypertension: a meta-analysis",
                "authors": "Smith J, Doe A",
                "journal": "Journal of Hypertension",
                "year": "2021",
                "type": "Meta-analysis",
                "url": "https://pubmed.ncbi.nlm.nih.gov/12345678/"
            }
        ],
        "clinical_trials": [],
        "fda": [
            {
                "applicationNumber": "NDA019777",
                "sponsorName": "Example Pharma",
                "url": "https://www.accessdata.fda.gov/scripts/cder/daf/index.cfm?event=overview.process&ApplNo=NDA019777"
            }
        ]
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedUpload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedResearch {
    pub drug_name: String,
    pub condition: Option<String>,
}

/// Everything the stub has been sent, for assertions.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    inner: Arc<Mutex<Recorded>>,
}

#[derive(Debug, Default)]
struct Recorded {
    requests: usize,
    uploads: Vec<RecordedUpload>,
    research: Vec<RecordedResearch>,
    exports: Vec<Value>,
}

impl Recorder {
    fn with<T>(&self, f: impl FnOnce(&mut Recorded) -> T) -> T {
        let mut guard = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }

    pub(crate) fn record_request(&self) {
        self.with(|r| r.requests += 1);
    }

    pub(crate) fn record_upload(&self, upload: RecordedUpload) {
        self.with(|r| r.uploads.push(upload));
    }

    pub(crate) fn record_research(&self, research: RecordedResearch) {
        self.with(|r| r.research.push(research));
    }

    pub(crate) fn record_export(&self, body: Value) {
        self.with(|r| r.exports.push(body));
    }

    /// Total requests received on any route.
    pub fn request_count(&self) -> usize {
        self.with(|r| r.requests)
    }

    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.with(|r| r.uploads.clone())
    }

    pub fn research(&self) -> Vec<RecordedResearch> {
        self.with(|r| r.research.clone())
    }

    pub fn exports(&self) -> Vec<Value> {
        self.with(|r| r.exports.clone())
    }
}
