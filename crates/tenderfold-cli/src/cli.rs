//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tenderfold_domain::VersionKind;

/// Tenderfold CLI - Fold tender documents into one canonical project record.
#[derive(Debug, Parser)]
#[command(name = "tenderfold")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "TENDERFOLD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Database file path (overrides the configuration)
    #[arg(long, global = true, env = "TENDERFOLD_DB")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
    /// Quiet format (IDs only)
    Quiet,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ingest a document into a project
    Ingest(IngestArgs),

    /// Show the current baseline of a project
    Baseline(BaselineArgs),

    /// List the versions of a project
    Versions(ProjectArgs),

    /// Show the provenance history of a section
    History(HistoryArgs),

    /// Recompute a baseline from the stored versions and compare
    Rebuild(ProjectArgs),

    /// Delete a project with its versions, baseline and provenance
    Delete(DeleteArgs),

    /// List known projects
    Projects,

    /// Manage the configuration file
    Config(ConfigArgs),
}

/// Arguments for the ingest command.
#[derive(Debug, Parser)]
pub struct IngestArgs {
    /// Plain-text document to ingest
    pub file: PathBuf,

    /// Project id
    #[arg(short, long)]
    pub project: String,

    /// Role of the document in the project
    #[arg(short, long, value_enum, default_value = "base")]
    pub kind: KindArg,

    /// Extraction backend (overrides the configuration)
    #[arg(long, value_enum)]
    pub llm: Option<LlmArg>,

    /// Do not fill an empty product list from table patterns
    #[arg(long)]
    pub no_fallback: bool,
}

/// Arguments for the baseline command.
#[derive(Debug, Parser)]
pub struct BaselineArgs {
    /// Project id
    #[arg(short, long)]
    pub project: String,

    /// Only show this section (dotted path, e.g. productMapping.miiProductStatus)
    #[arg(short, long)]
    pub section: Option<String>,
}

/// Arguments naming a single project.
#[derive(Debug, Parser)]
pub struct ProjectArgs {
    /// Project id
    #[arg(short, long)]
    pub project: String,
}

/// Arguments for the history command.
#[derive(Debug, Parser)]
pub struct HistoryArgs {
    /// Project id
    #[arg(short, long)]
    pub project: String,

    /// Section path; all sections when omitted
    pub section: Option<String>,

    /// Maximum number of records (most recent kept)
    #[arg(short, long)]
    pub limit: Option<usize>,
}

/// Arguments for the delete command.
#[derive(Debug, Parser)]
pub struct DeleteArgs {
    /// Project id
    #[arg(short, long)]
    pub project: String,

    /// Skip confirmation prompt
    #[arg(short = 'y', long)]
    pub yes: bool,
}

/// Arguments for configuration management.
#[derive(Debug, Parser)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Print the configuration file path
    Path,

    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Check the configuration for invalid values
    Validate,
}

/// Document kind argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum KindArg {
    /// The original tender document
    Base,
    /// A corrigendum or amendment
    Amendment,
    /// Supporting reference material
    ReferenceUpdate,
}

/// Extraction backend argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LlmArg {
    /// Offline mock returning empty records (fallback extraction only)
    Mock,
    /// Local Ollama server
    Ollama,
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
            CliFormat::Quiet => crate::config::OutputFormat::Quiet,
        }
    }
}

impl From<KindArg> for VersionKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Base => VersionKind::Base,
            KindArg::Amendment => VersionKind::Amendment,
            KindArg::ReferenceUpdate => VersionKind::ReferenceUpdate,
        }
    }
}

impl From<LlmArg> for crate::config::LlmBackend {
    fn from(llm: LlmArg) -> Self {
        match llm {
            LlmArg::Mock => crate::config::LlmBackend::Mock,
            LlmArg::Ollama => crate::config::LlmBackend::Ollama,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_command() {
        let cli = Cli::parse_from([
            "tenderfold",
            "ingest",
            "rfp.txt",
            "--project",
            "metro-hvac",
            "--kind",
            "amendment",
            "--llm",
            "mock",
        ]);
        match cli.command {
            Command::Ingest(args) => {
                assert_eq!(args.project, "metro-hvac");
                assert_eq!(args.kind, KindArg::Amendment);
                assert_eq!(args.llm, Some(LlmArg::Mock));
                assert!(!args.no_fallback);
            }
            _ => panic!("Expected Ingest command"),
        }
    }

    #[test]
    fn test_history_command_with_global_flags() {
        let cli = Cli::parse_from([
            "tenderfold",
            "history",
            "-p",
            "metro-hvac",
            "legal.penalties",
            "--format",
            "json",
            "--db",
            "/tmp/t.db",
        ]);
        assert!(matches!(cli.format, Some(CliFormat::Json)));
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/t.db")));
        match cli.command {
            Command::History(args) => {
                assert_eq!(args.section.as_deref(), Some("legal.penalties"));
                assert!(args.limit.is_none());
            }
            _ => panic!("Expected History command"),
        }
    }

    #[test]
    fn test_kind_conversion() {
        let kind: VersionKind = KindArg::ReferenceUpdate.into();
        assert_eq!(kind, VersionKind::ReferenceUpdate);
        let kind: VersionKind = KindArg::Base.into();
        assert!(kind.is_base());
    }

    #[test]
    fn test_ingest_requires_project() {
        let result = Cli::try_parse_from(["tenderfold", "ingest", "rfp.txt"]);
        assert!(result.is_err());
    }
}
