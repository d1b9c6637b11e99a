pub mod service;
pub mod stub;

pub use axum::http::StatusCode;
pub use service::{AppState, create_app};
pub use stub::{
    RecordedResearch, RecordedUpload, Recorder, Reply, ReplyBody, SAMPLE_REPORT_BYTES,
    SAMPLE_REPORT_NAME, StubBackend, sample_analysis, sample_research,
};

use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::error;

/// A stub backend serving on an ephemeral localhost port. Shuts down on drop.
pub struct RunningStub {
    addr: SocketAddr,
    recorder: Recorder,
    handle: JoinHandle<()>,
}

impl RunningStub {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }
}

impl Drop for RunningStub {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub async fn spawn(backend: StubBackend) -> std::io::Result<RunningStub> {
    let (app, recorder) = create_app(backend);
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Stub backend stopped: {}", e);
        }
    });

    Ok(RunningStub {
        addr,
        recorder,
        handle,
    })
}
