use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use protocol_client::{AnalyzerApi, ClientConfig, HttpAnalyzerClient, Locale};

use crate::commands::CommandContext;

#[derive(Parser, Debug)]
#[command(
    name = "protocol-analyzer",
    version,
    about = "Upload a DOCX clinical protocol for analysis, inspect the extracted drugs, export a PDF report."
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Connection flags. Each overrides its `ANALYZER_*` environment variable.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Backend origin, e.g. http://localhost:5000
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Output language (ru, en)
    #[arg(long, global = true)]
    pub lang: Option<Locale>,

    /// Request timeout in seconds; 0 disables it
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,
}

impl GlobalArgs {
    pub fn client_config(&self) -> ClientConfig {
        self.apply(ClientConfig::from_env())
    }

    fn apply(&self, mut config: ClientConfig) -> ClientConfig {
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(secs) = self.timeout_secs {
            config.timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(lang) = self.lang {
            config.locale = lang;
        }
        config
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload a protocol and print the analysis
    Analyze(AnalyzeArgs),
    /// Look up literature for a drug
    Research(ResearchArgs),
    /// Export a saved analysis (JSON) to PDF
    Export(ExportArgs),
    /// Check that the backend is up
    Health,
}

#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    /// Path to the .docx protocol
    pub file: PathBuf,

    /// Print the raw analysis JSON instead of the formatted summary
    #[arg(long)]
    pub json: bool,

    /// Export the analysis to PDF afterwards
    #[arg(long)]
    pub export: bool,

    /// Look up literature for every extracted drug
    #[arg(long)]
    pub research: bool,

    /// Save the exported PDF here (implies --export)
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Do not draw the progress indicator
    #[arg(long, short)]
    pub quiet: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ResearchArgs {
    /// Drug name, preferably the English INN
    pub drug: String,

    /// Condition to narrow the search
    #[arg(long, short)]
    pub condition: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    /// Analysis JSON as printed by `analyze --json`
    pub result: PathBuf,

    /// Save the PDF here
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let config = self.global.client_config();
        let api: Arc<dyn AnalyzerApi> = Arc::new(HttpAnalyzerClient::new(&config)?);
        let context = CommandContext::new(api, config.locale);

        let mut stdout = std::io::stdout().lock();
        match self.command {
            Commands::Analyze(args) => context.analyze(args, &mut stdout).await,
            Commands::Research(args) => context.research(args, &mut stdout).await,
            Commands::Export(args) => context.export(args, &mut stdout).await,
            Commands::Health => context.health(&mut stdout).await,
        }
    }
}
