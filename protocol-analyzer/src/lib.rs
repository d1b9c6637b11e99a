pub mod cli;
pub mod commands;

pub use cli::{AnalyzeArgs, Cli, Commands, ExportArgs, GlobalArgs, ResearchArgs};
pub use commands::CommandContext;
