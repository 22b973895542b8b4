use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use url_upload::config::{ConfigLoader, Settings};
use url_upload::domain::ResolverKind;
use url_upload::error::UploadError;
use url_upload::output::{JsonOutput, OutputMode, TextOutput};
use url_upload::upload::{UploadSummary, UrlFetcher};

#[derive(Parser)]
#[command(name = "url-upload")]
#[command(about = "Download a URL into a temporary file and report it like a file upload")]
#[command(version)]
struct Cli {
    #[arg(long, global = true)]
    text: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Fetch a URL and resolve its filename and content type")]
    Fetch(FetchArgs),
}

#[derive(Args)]
struct FetchArgs {
    url: String,

    #[arg(long)]
    config: Option<String>,

    #[arg(long)]
    resolver: Option<ResolverKind>,

    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    #[arg(long, value_name = "DEST")]
    keep: Option<PathBuf>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<UploadError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &UploadError) -> u8 {
    match error {
        UploadError::InvalidUrl(_)
        | UploadError::MissingFilename(_)
        | UploadError::ConfigRead(_)
        | UploadError::ConfigParse(_)
        | UploadError::InvalidConfig(_) => 2,
        UploadError::Fetch(_) | UploadError::FetchStatus { .. } => 3,
        UploadError::MissingContentType(_) => 4,
        UploadError::Filesystem(_) => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.text {
        OutputMode::Text
    } else {
        OutputMode::Json
    };

    match cli.command {
        Commands::Fetch(args) => run_fetch(args, output_mode),
    }
}

fn run_fetch(args: FetchArgs, output_mode: OutputMode) -> miette::Result<()> {
    let FetchArgs {
        url,
        config,
        resolver,
        timeout,
        keep,
    } = args;

    let mut settings = ConfigLoader::resolve(config.as_deref())?;
    apply_overrides(&mut settings, resolver, timeout)?;

    let fetcher = UrlFetcher::from_settings(&settings)?;
    let upload = fetcher.fetch(&url)?;

    // Without --keep the temp file is removed once `upload` drops.
    let summary = match keep {
        Some(destination) => upload.persist(&destination)?,
        None => upload.summary(),
    };
    print_summary(&summary, output_mode)
}

fn apply_overrides(
    settings: &mut Settings,
    resolver: Option<ResolverKind>,
    timeout: Option<u64>,
) -> Result<(), UploadError> {
    if let Some(resolver) = resolver {
        settings.resolver = resolver;
    }
    if let Some(timeout) = timeout {
        if timeout == 0 {
            return Err(UploadError::InvalidConfig(
                "--timeout must be greater than zero".to_string(),
            ));
        }
        settings.http.timeout = Duration::from_secs(timeout);
    }
    Ok(())
}

fn print_summary(summary: &UploadSummary, output_mode: OutputMode) -> miette::Result<()> {
    match output_mode {
        OutputMode::Json => JsonOutput::print_upload(summary).into_diagnostic(),
        OutputMode::Text => TextOutput::print_upload(summary).into_diagnostic(),
    }
}
