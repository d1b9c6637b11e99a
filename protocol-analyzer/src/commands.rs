use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use protocol_client::{
    AnalysisResult, AnalyzeOutcome, AnalyzerApi, AnalyzerSession, Drug, Locale, Progress,
    ProtocolFile, ResultView, non_blank, render_research,
};
use tokio::task::JoinHandle;
use tracing::info;

use crate::cli::{AnalyzeArgs, ExportArgs, ResearchArgs};

const PROGRESS_REDRAW: Duration = Duration::from_millis(100);

/// Shared state for every subcommand: the backend and the output language.
pub struct CommandContext {
    api: Arc<dyn AnalyzerApi>,
    locale: Locale,
}

impl CommandContext {
    pub fn new(api: Arc<dyn AnalyzerApi>, locale: Locale) -> Self {
        Self { api, locale }
    }

    fn session(&self) -> AnalyzerSession {
        AnalyzerSession::new(self.api.clone(), self.locale)
    }

    pub async fn analyze(&self, args: AnalyzeArgs, out: &mut impl Write) -> Result<()> {
        let file = ProtocolFile::load(&args.file)
            .await
            .with_context(|| format!("cannot read {}", args.file.display()))?;

        let mut session = self.session();
        if !session.select_file(file) {
            bail!("{}", session_error(&session));
        }

        let indicator = (!args.quiet && !args.json)
            .then(|| draw_progress(session.progress(), session.messages().analyzing));
        let outcome = session.analyze().await;
        if let Some(indicator) = indicator {
            indicator.abort();
            eprintln!();
        }

        if outcome != AnalyzeOutcome::Completed {
            bail!("{}", session_error(&session));
        }
        let result = session
            .result()
            .cloned()
            .ok_or_else(|| anyhow!(session.messages().analysis_failed))?;

        if args.json {
            serde_json::to_writer_pretty(&mut *out, &result)?;
            writeln!(out)?;
            // stdout stays a single JSON document
            self.follow_up(&mut session, &result, &args, &mut std::io::stderr())
                .await
        } else {
            write!(out, "{}", ResultView::project(&result, self.locale))?;
            self.follow_up(&mut session, &result, &args, out).await
        }
    }

    /// Literature lookups and export requested alongside `analyze`.
    async fn follow_up(
        &self,
        session: &mut AnalyzerSession,
        result: &AnalysisResult,
        args: &AnalyzeArgs,
        out: &mut impl Write,
    ) -> Result<()> {
        if args.research {
            let condition = non_blank(result.main_condition.as_deref());
            for name in result.drugs().iter().filter_map(Drug::search_name) {
                let research = session
                    .research(name, condition)
                    .await
                    .unwrap_or_default();
                writeln!(out)?;
                write!(out, "{}", render_research(name, &research))?;
            }
        }

        if args.export || args.output.is_some() {
            self.export_session(session, args.output.as_deref(), out)
                .await?;
        }
        Ok(())
    }

    pub async fn research(&self, args: ResearchArgs, out: &mut impl Write) -> Result<()> {
        let research = self
            .session()
            .research(&args.drug, args.condition.as_deref())
            .await
            .unwrap_or_default();

        write!(out, "{}", render_research(&args.drug, &research))?;
        Ok(())
    }

    pub async fn export(&self, args: ExportArgs, out: &mut impl Write) -> Result<()> {
        let raw = tokio::fs::read_to_string(&args.result)
            .await
            .with_context(|| format!("cannot read {}", args.result.display()))?;
        let result: AnalysisResult = serde_json::from_str(&raw)
            .with_context(|| format!("{} is not an analysis result", args.result.display()))?;

        let mut session = self.session();
        session.restore_result(result);
        self.export_session(&mut session, args.output.as_deref(), out)
            .await
    }

    pub async fn health(&self, out: &mut impl Write) -> Result<()> {
        let health = self.api.health().await.context("backend unreachable")?;

        writeln!(
            out,
            "{} {}",
            health.status,
            health.version.as_deref().unwrap_or_default()
        )?;
        for (service, up) in &health.services {
            writeln!(out, "  {}: {}", service, if *up { "up" } else { "down" })?;
        }

        if !health.is_healthy() {
            bail!("backend reports status {}", health.status);
        }
        Ok(())
    }

    async fn export_session(
        &self,
        session: &mut AnalyzerSession,
        output: Option<&Path>,
        out: &mut impl Write,
    ) -> Result<()> {
        let Some(exported) = session.export_pdf().await else {
            bail!("{}", session_error(session));
        };
        writeln!(out, "PDF: {}", exported.resolved)?;

        if let Some(path) = output {
            let bytes = self
                .api
                .download(exported.resolved.as_str())
                .await
                .context(session.messages().export_failed)?;
            tokio::fs::write(path, &bytes)
                .await
                .with_context(|| format!("cannot write {}", path.display()))?;
            info!("Saved {} bytes to {}", bytes.len(), path.display());
            writeln!(out, "{}", path.display())?;
        }
        Ok(())
    }
}

fn session_error(session: &AnalyzerSession) -> String {
    session
        .error()
        .unwrap_or(session.messages().analysis_failed)
        .to_string()
}

/// Redraws `label NN%` on stderr until aborted.
fn draw_progress(progress: Progress, label: &'static str) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut shown = None;
        loop {
            let value = progress.value();
            if progress.is_running() && shown != Some(value) {
                eprint!("\r{} {}%", label, value);
                shown = Some(value);
            }
            tokio::time::sleep(PROGRESS_REDRAW).await;
        }
    })
}
