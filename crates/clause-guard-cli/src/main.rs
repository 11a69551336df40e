use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use clause_guard_core::{render_report, DocumentFormat, OutputFormat, RiskBand, ScanReport};
use clause_guard_server::{auth, build_scorer, AppState, Database, Settings};
use colored::Colorize;
use tokio::io::AsyncReadExt;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "clause-guard",
    author,
    version,
    about = "Contract risk scoring service and CLI"
)]
struct Cli {
    /// Settings file (TOML); defaults to ./clause-guard.toml when present
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Phrase file, one risky phrase per line; overrides the configured list
    #[arg(long, value_name = "FILE", global = true)]
    phrases: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP service
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Score a document (.txt, .pdf, .docx) or plain text from stdin
    Scan {
        /// Document to scan; reads stdin when omitted
        path: Option<PathBuf>,
        /// Emit the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the risky phrases in effect
    ListPhrases {
        /// Emit phrases as JSON instead of human-readable text
        #[arg(long)]
        json: bool,
    },
    /// Create the database schema
    InitDb,
    /// Grant (or with --revoke, remove) administrator rights
    PromoteAdmin {
        email: String,
        #[arg(long)]
        revoke: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    let cli = Cli::parse();
    let settings = load_settings(&cli)?;
    match cli.command.unwrap_or(Commands::ListPhrases { json: false }) {
        Commands::Serve { host, port } => serve(settings, host, port).await?,
        Commands::Scan { path, json } => scan(&settings, path.as_deref(), json).await?,
        Commands::ListPhrases { json } => list_phrases(&settings, json).await?,
        Commands::InitDb => init_db(&settings).await?,
        Commands::PromoteAdmin { email, revoke } => {
            promote_admin(&settings, &email, !revoke).await?
        }
    }
    Ok(())
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(path) = &cli.phrases {
        settings.phrases_file = Some(path.clone());
    }
    Ok(settings)
}

async fn serve(mut settings: Settings, host: Option<String>, port: Option<u16>) -> Result<()> {
    if let Some(host) = host {
        settings.host = host;
    }
    if let Some(port) = port {
        settings.port = port;
    }
    let state = AppState::from_settings(settings).await?;
    clause_guard_server::serve(Arc::new(state), shutdown_signal()).await
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for ctrl-c: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

async fn scan(settings: &Settings, path: Option<&Path>, json: bool) -> Result<()> {
    let text = match path {
        Some(path) => read_document(path).await?,
        None => {
            let mut buf = Vec::new();
            tokio::io::stdin()
                .read_to_end(&mut buf)
                .await
                .context("failed to read stdin")?;
            DocumentFormat::PlainText.extract_text(&buf)?
        }
    };

    let scorer = build_scorer(settings).await?;
    let report = scorer.scan(&text);
    if json {
        println!("{}", render_report(&report, OutputFormat::Json)?);
    } else {
        print_human(&report)?;
    }
    Ok(())
}

async fn read_document(path: &Path) -> Result<String> {
    let format = DocumentFormat::from_filename(path)?;
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    format
        .extract_text(&bytes)
        .with_context(|| format!("failed to extract text from {}", path.display()))
}

fn print_human(report: &ScanReport) -> Result<()> {
    let rendered = render_report(report, OutputFormat::Human)?;
    let (headline, rest) = rendered.split_once('\n').unwrap_or((rendered.as_str(), ""));
    let headline = match report.risk_band {
        RiskBand::Low => headline.green(),
        RiskBand::Medium => headline.yellow(),
        RiskBand::High => headline.red().bold(),
    };
    println!("{headline}");
    if !rest.is_empty() {
        println!("{}", rest.trim_end());
    }
    Ok(())
}

async fn list_phrases(settings: &Settings, json: bool) -> Result<()> {
    let scorer = build_scorer(settings).await?;
    let phrases: Vec<&str> = scorer.phrases().iter().collect();
    if json {
        println!("{}", serde_json::to_string_pretty(&phrases)?);
        return Ok(());
    }

    let source = settings
        .phrases_file
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "built-in list".to_string());
    println!("{} phrase(s) loaded from {}", phrases.len(), source);
    for phrase in phrases {
        println!("- {phrase}");
    }
    Ok(())
}

async fn init_db(settings: &Settings) -> Result<()> {
    let db = Database::connect(&settings.database_url).await?;
    db.init_schema().await?;
    println!("Database ready at {}", settings.database_url);
    Ok(())
}

async fn promote_admin(settings: &Settings, email: &str, is_admin: bool) -> Result<()> {
    let db = Database::connect(&settings.database_url).await?;
    db.init_schema().await?;
    let email = auth::normalize_email(email);
    if !db.set_admin(&email, is_admin).await? {
        bail!("no user registered with email {email}");
    }
    let verb = if is_admin { "granted to" } else { "revoked from" };
    println!("Admin rights {verb} {email}");
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info,sqlx=warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}
