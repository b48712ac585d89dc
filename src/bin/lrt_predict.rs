use std::process::ExitCode;

use camino::{Utf8Path, Utf8PathBuf};
use clap::{ArgAction, Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use lrt_predict::app::{App, TraceSink};
use lrt_predict::config::{self, Credentials, FetchConfig, FetchMode, PredictConfig};
use lrt_predict::deps;
use lrt_predict::domain::{RemoteResource, Source, Species};
use lrt_predict::engine::RetryPolicy;
use lrt_predict::ensembl::EnsemblClient;
use lrt_predict::error::LrtError;
use lrt_predict::phytozome::PhytozomeClient;
use lrt_predict::portal::CdsPortal;
use lrt_predict::store::Store;

#[derive(Parser)]
#[command(name = "lrt-predict")]
#[command(about = "Fetch and BLAST-format CDS data, then collect best-hit homologues for LRT prediction")]
#[command(version, author)]
struct Cli {
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Download CDS archives, verify checksums, and format search databases")]
    Fetch(FetchArgs),
    #[command(about = "Search query sequences against the databases and write best-hit sequences")]
    Predict(PredictArgs),
}

#[derive(Args)]
struct FetchArgs {
    #[arg(long, help = "Base directory for the species data tree")]
    base: Utf8PathBuf,

    #[arg(long, help = "JGI Genomes Portal user name (or LRT_JGI_USER)")]
    user: Option<String>,

    #[arg(long, help = "JGI Genomes Portal password (or LRT_JGI_PASSWORD)")]
    password: Option<String>,

    #[arg(long, help = "File with one species name per line, replacing the built-in list")]
    species_list: Option<Utf8PathBuf>,

    #[arg(long, conflicts_with = "convert_only", help = "Download only, skip database formatting")]
    fetch_only: bool,

    #[arg(long, help = "Format the archives already on disk, no network access")]
    convert_only: bool,

    #[arg(long, default_value = config::DEFAULT_FORMAT_TOOL)]
    format_tool: String,

    #[arg(long, default_value_t = 5, help = "Download attempts per archive before giving up")]
    max_attempts: u32,
}

#[derive(Args)]
struct PredictArgs {
    #[arg(long, help = "Base directory holding the formatted databases")]
    base: Utf8PathBuf,

    #[arg(long, help = "FASTA file of query sequences")]
    fasta: Utf8PathBuf,

    #[arg(long, default_value_t = 0.05, help = "E-value threshold for accepting a hit")]
    evalue: f64,

    #[arg(long, default_value = config::DEFAULT_SEARCH_TOOL)]
    search_tool: String,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(lrt) = report.downcast_ref::<LrtError>() {
            return ExitCode::from(map_exit_code(lrt));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &LrtError) -> u8 {
    match error {
        LrtError::MissingExecutables(_) => 2,
        LrtError::JgiHttp(_)
        | LrtError::JgiStatus { .. }
        | LrtError::EnsemblHttp(_)
        | LrtError::EnsemblStatus { .. }
        | LrtError::DownloadRetriesExhausted { .. }
        | LrtError::ManifestParse(_) => 3,
        LrtError::MissingCredentials
        | LrtError::LoginRejected
        | LrtError::AccountExpired
        | LrtError::TokenNotFound => 4,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Fetch(args) => run_fetch(args),
        Commands::Predict(args) => run_predict(args),
    }
}

fn run_fetch(args: FetchArgs) -> miette::Result<()> {
    deps::require_executables(&["gzip", "makeblastdb", args.format_tool.as_str()])
        .into_diagnostic()?;

    let mut config = FetchConfig::new(args.base.clone());
    config.mode = if args.convert_only {
        FetchMode::ConvertOnly
    } else if args.fetch_only {
        FetchMode::FetchOnly
    } else {
        FetchMode::FetchAndConvert
    };
    config.format_tool = args.format_tool;
    config.retry = RetryPolicy {
        max_attempts: args.max_attempts,
        ..RetryPolicy::default()
    };
    if let Some(path) = &args.species_list {
        config.allow_list = config::load_species_list(path).into_diagnostic()?;
    }

    let store = Store::new(args.base);
    let summary = if config.mode == FetchMode::ConvertOnly {
        // Nothing is downloaded, so no sign-on happens and no portal is
        // ever contacted.
        let app = App::new(store, NopPortal(Source::Phytozome), NopPortal(Source::Ensembl));
        app.fetch(&config, &TraceSink).into_diagnostic()?
    } else {
        let credentials =
            Credentials::resolve(args.user, args.password).into_diagnostic()?;
        let phytozome = PhytozomeClient::sign_on(&credentials).into_diagnostic()?;
        let ensembl = EnsemblClient::new().into_diagnostic()?;
        let app = App::new(store, phytozome, ensembl);
        app.fetch(&config, &TraceSink).into_diagnostic()?
    };

    print_json(&summary)
}

fn run_predict(args: PredictArgs) -> miette::Result<()> {
    deps::require_executables(&[args.search_tool.as_str()]).into_diagnostic()?;

    let mut config = PredictConfig::new(args.base.clone(), args.fasta, args.evalue);
    config.search_tool = args.search_tool;

    let store = Store::new(args.base);
    let app = App::new(store, NopPortal(Source::Phytozome), NopPortal(Source::Ensembl));
    let summary = app.predict(&config, &TraceSink).into_diagnostic()?;

    print_json(&summary)
}

fn print_json<T: serde::Serialize>(value: &T) -> miette::Result<()> {
    let json = serde_json::to_string_pretty(value).into_diagnostic()?;
    println!("{json}");
    Ok(())
}

struct NopPortal(Source);

impl NopPortal {
    fn not_configured(&self) -> LrtError {
        match self.0 {
            Source::Phytozome => LrtError::JgiHttp("portal client not configured".to_string()),
            Source::Ensembl => LrtError::EnsemblHttp("portal client not configured".to_string()),
        }
    }
}

impl CdsPortal for NopPortal {
    fn source(&self) -> Source {
        self.0
    }

    fn list_resources(
        &self,
        _suffix: &str,
        _allow_list: &[Species],
    ) -> Result<Vec<RemoteResource>, LrtError> {
        Err(self.not_configured())
    }

    fn fetch_to_file(&self, _url: &str, _dest: &Utf8Path) -> Result<(), LrtError> {
        Err(self.not_configured())
    }
}
