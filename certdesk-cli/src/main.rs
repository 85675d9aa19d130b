//! certdesk - issue TLS certificates by publishing DNS-01 records by hand.
//!
//! # Commands
//!
//! - `certdesk order -e <email> <domains>...` - Create an order and print the TXT records
//! - `certdesk list` - List orders
//! - `certdesk show <id>` - Show an order and its challenges
//! - `certdesk challenges <id>` - Print the TXT records of an order
//! - `certdesk check <id>` - Check that the TXT records are visible
//! - `certdesk finalize <id>` - Have the CA validate and issue the certificate
//! - `certdesk export <id>` - Write the certificate as PEM, full chain, PKCS#12 or ZIP
//! - `certdesk delete <id>` - Delete an order
//! - `certdesk keygen` - Generate a master key
//! - `certdesk completions <shell>` - Generate shell completions

use certdesk_acme::directories;
use certdesk_config::Settings;
use certdesk_crypto::KeyType;
use certdesk_issuer::ExportFormat;
use certdesk_log::{Level, LogConfig};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use colored::Colorize;
use std::io;
use std::path::PathBuf;
use uuid::Uuid;

mod commands;
mod context;
mod error;
mod output;

use commands::{dns, export, finalize, keygen, order, orders};
use context::AppContext;
use error::CliResult;

/// certdesk - manual DNS-01 certificates
#[derive(Parser)]
#[command(name = "certdesk")]
#[command(author = "Pegasus Heavy Industries LLC")]
#[command(version)]
#[command(about = "Issue TLS certificates by publishing DNS-01 TXT records by hand")]
#[command(propagate_version = true)]
#[command(after_help = format!(
    "{}\n  {} certdesk keygen\n  {} certdesk order -e admin@example.com example.com '*.example.com'\n  {} certdesk check <id>\n  {} certdesk finalize <id>\n  {} certdesk export <id> --format zip",
    "Examples:".bright_cyan().bold(),
    "$".dimmed(),
    "$".dimmed(),
    "$".dimmed(),
    "$".dimmed(),
    "$".dimmed(),
))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (JSON, TOML or .env)
    #[arg(short, long, global = true, env = "CERTDESK_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding certdesk.json
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use the Let's Encrypt staging directory
    #[arg(long, global = true)]
    staging: bool,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an order and print the TXT records to publish
    #[command(visible_alias = "new")]
    Order(OrderArgs),

    /// List orders, newest first
    #[command(alias = "ls")]
    List,

    /// Show an order and its challenges
    Show { id: Uuid },

    /// Print the TXT records of an order
    Challenges {
        id: Uuid,

        /// Print zone-file lines
        #[arg(long)]
        zone: bool,
    },

    /// Check that the TXT records are visible
    Check { id: Uuid },

    /// Have the CA validate the records and issue the certificate
    Finalize {
        id: Uuid,

        /// Skip the local DNS check
        #[arg(long)]
        skip_check: bool,
    },

    /// Write an issued certificate to disk
    Export(ExportArgs),

    /// Delete an order and its challenges
    #[command(alias = "rm")]
    Delete {
        id: Uuid,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Generate a master key
    Keygen,

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
struct OrderArgs {
    /// Account email
    #[arg(short, long, env = "CERTDESK_EMAIL")]
    email: String,

    /// Domains to include; the first becomes the common name
    #[arg(required = true)]
    domains: Vec<String>,

    /// Certificate key algorithm
    #[arg(long, value_enum, default_value_t = KeyAlgorithm::Rsa)]
    key_type: KeyAlgorithm,

    /// Key size (RSA 2048/4096, ECC 256/384); 0 picks the default
    #[arg(long, default_value_t = 0)]
    key_size: u32,
}

#[derive(Args)]
struct ExportArgs {
    id: Uuid,

    /// pem, fullchain, pfx or zip
    #[arg(short, long, default_value = "pem", value_parser = parse_format)]
    format: ExportFormat,

    /// Output file, or - for stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// PKCS#12 password
    #[arg(long, env = "CERTDESK_PFX_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum KeyAlgorithm {
    Rsa,
    Ecc,
}

impl From<KeyAlgorithm> for KeyType {
    fn from(value: KeyAlgorithm) -> Self {
        match value {
            KeyAlgorithm::Rsa => KeyType::Rsa,
            KeyAlgorithm::Ecc => KeyType::Ecc,
        }
    }
}

fn parse_format(s: &str) -> Result<ExportFormat, String> {
    s.parse().map_err(|e: certdesk_issuer::IssuerError| e.to_string())
}

fn init_logging(verbose: bool) {
    let mut config = LogConfig::from_env();
    if verbose {
        config = config.with_debug(true);
    } else if !config.debug && std::env::var("CERTDESK_LOG_LEVEL").is_err() {
        config = config.with_level(Level::Warn);
    }

    if let Err(err) = certdesk_log::try_init(&config) {
        eprintln!("warning: {}", err);
    }
}

fn load_settings(cli: &Cli) -> CliResult<Settings> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(dir) = &cli.data_dir {
        settings.storage.data_dir = dir.clone();
    }
    if cli.staging {
        settings.acme.directory_url = directories::LETS_ENCRYPT_STAGING.to_string();
    }
    tracing::debug!(
        directory = %settings.acme.directory_url,
        data_dir = %settings.storage.data_dir.display(),
        "Loaded settings"
    );
    Ok(settings)
}

async fn run(cli: Cli) -> CliResult<()> {
    match &cli.command {
        Commands::Keygen => return keygen::run(cli.json),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(*shell, &mut cmd, "certdesk", &mut io::stdout());
            return Ok(());
        }
        _ => {}
    }

    let settings = load_settings(&cli)?;
    let ctx = AppContext::open(&settings).await?;
    let json = cli.json;

    match cli.command {
        Commands::Order(args) => {
            order::run(
                &ctx,
                &args.email,
                &args.domains,
                args.key_type.into(),
                args.key_size,
                json,
            )
            .await
        }
        Commands::List => orders::list(&ctx, json).await,
        Commands::Show { id } => orders::show(&ctx, id, json).await,
        Commands::Challenges { id, zone } => dns::challenges(&ctx, id, zone, json).await,
        Commands::Check { id } => dns::check(&ctx, id, json).await,
        Commands::Finalize { id, skip_check } => finalize::run(&ctx, id, skip_check, json).await,
        Commands::Export(args) => {
            export::run(
                &ctx,
                args.id,
                args.format,
                args.output.as_deref(),
                args.password.as_deref(),
            )
            .await
        }
        Commands::Delete { id, yes } => orders::delete(&ctx, id, yes).await,
        Commands::Keygen | Commands::Completions { .. } => Ok(()),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }
    init_logging(cli.verbose);

    if let Err(err) = run(cli).await {
        output::error(&err.to_string());
        if let Some(order_id) = match &err {
            error::CliError::Issuer(e) => e.order_id(),
            _ => None,
        } {
            eprintln!("    order: {}", order_id);
        }
        std::process::exit(err.exit_code());
    }
}
