//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use simreport_core::extraction::{ExtractionConfig, OpenRouterSource};
use simreport_core::pipeline::{ProgressReporter, RunConfig, RunSummary};
use simreport_dataset::Dataset;
use simreport_documents::{DiscoveryOptions, DocumentTextExtractor};
use simreport_shared::{
    AppConfig, MissingInputPolicy, SimReportError, init_config, load_config, load_config_from,
    resolve_api_key,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// simreport: extract simulation report parameters into a dataset.
#[derive(Parser)]
#[command(
    name = "simreport",
    version,
    about = "Extract engineering parameters from ANSYS simulation reports into a tabular dataset.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file to use instead of ~/.simreport/simreport.toml.
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config_file: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// How derived values treat missing inputs.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum MissingInputs {
    /// Count missing inputs as 0.
    Zero,
    /// Leave affected derived values empty.
    NotAvailable,
}

impl From<MissingInputs> for MissingInputPolicy {
    fn from(value: MissingInputs) -> Self {
        match value {
            MissingInputs::Zero => Self::Zero,
            MissingInputs::NotAvailable => Self::NotAvailable,
        }
    }
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Extract every report into the dataset and save it.
    Run {
        /// Template spreadsheet (.csv, .xlsx) fixing the column order.
        #[arg(long)]
        template: PathBuf,

        /// Directory searched recursively for reports.
        #[arg(long)]
        reports_dir: PathBuf,

        /// Output dataset (.csv or .xlsx).
        #[arg(short, long)]
        output: PathBuf,

        /// OpenRouter API key (defaults to the configured env var).
        #[arg(long)]
        api_key: Option<String>,

        /// OpenRouter model ID (defaults to the configured model).
        #[arg(short, long)]
        model: Option<String>,

        /// How derived values treat missing inputs.
        #[arg(long, value_enum)]
        missing_inputs: Option<MissingInputs>,
    },

    /// List the reports a run would process.
    Discover {
        /// Directory searched recursively for reports.
        #[arg(long)]
        reports_dir: PathBuf,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "simreport=info",
        1 => "simreport=debug",
        _ => "simreport=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    // Init never reads the existing config
    if let Command::Config {
        action: ConfigAction::Init,
    } = cli.command
    {
        return cmd_config_init();
    }

    let config = resolve_config(cli.config_file.as_deref())?;

    match cli.command {
        Command::Run {
            template,
            reports_dir,
            output,
            api_key,
            model,
            missing_inputs,
        } => {
            let args = RunArgs {
                template,
                reports_dir,
                output,
                api_key,
                model,
                missing_inputs,
            };
            cmd_run(&config, args).await
        }
        Command::Discover { reports_dir } => cmd_discover(&config, &reports_dir),
        Command::Config {
            action: ConfigAction::Init,
        } => cmd_config_init(),
        Command::Config {
            action: ConfigAction::Show,
        } => cmd_config_show(&config),
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

struct RunArgs {
    template: PathBuf,
    reports_dir: PathBuf,
    output: PathBuf,
    api_key: Option<String>,
    model: Option<String>,
    missing_inputs: Option<MissingInputs>,
}

async fn cmd_run(config: &AppConfig, args: RunArgs) -> Result<()> {
    // Fail on setup problems before any report is sent off
    let api_key = resolve_api_key(config, args.api_key.as_deref())?;
    if !Dataset::can_persist_to(&args.output) {
        return Err(SimReportError::validation(format!(
            "cannot write '{}': output must end in .csv or .xlsx",
            args.output.display()
        ))
        .into());
    }

    let mut extraction = ExtractionConfig::new(&config.openrouter, api_key);
    if let Some(model) = args.model {
        extraction.model_id = model;
    }
    let source = OpenRouterSource::new(extraction)?;

    let run_config = RunConfig {
        template_path: args.template,
        reports_dir: args.reports_dir,
        output_path: args.output,
        discovery: DiscoveryOptions::from(&config.discovery),
        missing_inputs: args
            .missing_inputs
            .map_or(config.derived.missing_inputs, Into::into),
        row_defaults: config.row_defaults.clone(),
    };

    info!(
        template = %run_config.template_path.display(),
        reports_dir = %run_config.reports_dir.display(),
        model = source.model_id(),
        "extracting reports"
    );

    let reporter = CliProgress::new();
    let summary = simreport_core::pipeline::run(
        &run_config,
        &DocumentTextExtractor,
        &source,
        &reporter,
    )
    .await?;

    println!();
    println!("  Dataset saved.");
    println!("  Run:      {}", summary.run_id);
    println!("  Reports:  {}", summary.documents_found);
    println!("  Appended: {}", summary.rows_appended);
    if let Some(first_id) = summary.first_id {
        println!("  IDs:      {first_id}..={}", first_id + summary.rows_appended as u64 - 1);
    }
    println!("  Skipped:  {}", summary.skipped.len());
    for skipped in &summary.skipped {
        println!("    - {}: {}", skipped.path.display(), skipped.reason);
    }
    println!("  Rows:     {}", summary.total_rows);
    println!("  Path:     {}", summary.output_path.display());
    println!("  Time:     {:.1}s", summary.elapsed.as_secs_f64());
    println!();

    Ok(())
}

fn cmd_discover(config: &AppConfig, reports_dir: &Path) -> Result<()> {
    let opts = DiscoveryOptions::from(&config.discovery);
    let paths = simreport_documents::discover(reports_dir, &opts);

    for path in &paths {
        println!("{}", path.display());
    }
    println!();
    println!("  {} report(s) found under {}", paths.len(), reports_dir.display());

    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn document_started(&self, path: &Path, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Extracting [{current}/{total}] {}", path.display()));
    }

    fn document_skipped(&self, path: &Path, reason: &str) {
        self.spinner
            .println(format!("  skipped {}: {reason}", path.display()));
    }

    fn done(&self, _summary: &RunSummary) {
        self.spinner.finish_and_clear();
    }
}

/// Clears the spinner when a run ends early with an error.
impl Drop for CliProgress {
    fn drop(&mut self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn spinner_is_cleared_when_run_fails() {
        let reporter = CliProgress::new();
        reporter.phase("Loading template");
        let spinner = reporter.spinner.clone();
        assert!(!spinner.is_finished());

        drop(reporter);
        assert!(spinner.is_finished());
    }

    #[test]
    fn run_accepts_missing_input_policy() {
        let cli = Cli::try_parse_from([
            "simreport",
            "run",
            "--template",
            "template.xlsx",
            "--reports-dir",
            "reports",
            "-o",
            "out.xlsx",
            "--missing-inputs",
            "not-available",
        ])
        .unwrap();

        match cli.command {
            Command::Run { missing_inputs, .. } => assert!(matches!(
                missing_inputs.map(MissingInputPolicy::from),
                Some(MissingInputPolicy::NotAvailable)
            )),
            _ => panic!("expected run"),
        }
    }
}
