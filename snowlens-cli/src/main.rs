//! Snowlens CLI - interactive credential flows and query-history views
//!
//! Provides commands for connecting to a warehouse in each of the four
//! authentication modes, managing saved connection bundles, and
//! rendering query-execution history as tag summaries or a timeline
//! chart.

use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use chrono::{NaiveDate, NaiveTime};
use clap::{Args, Parser, Subcommand, ValueEnum};
use snowlens_core::{
    decode_private_key, history, Account, AuthMethod, ConnectError, ConnectionProfile, KeyError,
    ProfileStore, QueryError, RestClient, Session, SessionCache, SnowlensError, StoreError,
    Timeline, TomlFileStore, ValidationError,
};
use std::sync::Arc;

/// Snowlens command-line interface for warehouse query-history exploration
#[derive(Parser)]
#[command(name = "snowlens")]
#[command(author, version, about = "Warehouse credential flows and query-history explorer")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the secrets file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    pub secrets_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Open a warehouse session
    #[command(subcommand, about = "Connect to the warehouse in one of the four modes")]
    Connect(ConnectCommands),

    /// Manage saved connections
    #[command(subcommand, about = "List or delete saved connection bundles")]
    Connections(ConnectionCommands),

    /// Retrieve and render query history
    #[command(subcommand, about = "Fetch query-execution history for a time window")]
    History(HistoryCommands),
}

/// Account and username shared by every non-saved connect mode
#[derive(Args)]
pub struct TargetArgs {
    /// Account locator or full account URL
    #[arg(short, long)]
    pub account: String,

    /// Login name
    #[arg(short, long)]
    pub user: String,
}

/// Optional session context, omitted from the parameter set when blank
#[derive(Args, Default)]
pub struct ContextArgs {
    /// Role to assume after login
    #[arg(long)]
    pub role: Option<String>,

    /// Virtual warehouse
    #[arg(long)]
    pub warehouse: Option<String>,

    /// Default database
    #[arg(long)]
    pub database: Option<String>,

    /// Default schema
    #[arg(long)]
    pub schema: Option<String>,
}

/// Connect subcommands, one per authentication mode
#[derive(Subcommand)]
pub enum ConnectCommands {
    /// Password authentication
    #[command(about = "Connect with account, username, and password")]
    Password {
        #[command(flatten)]
        target: TargetArgs,

        /// Password (prefer the environment variable over the flag)
        #[arg(long, env = "SNOWLENS_PASSWORD", hide_env_values = true)]
        password: String,

        #[command(flatten)]
        context: ContextArgs,

        /// Save this connection bundle to the secrets file
        #[arg(long)]
        save: bool,
    },

    /// Federated single-sign-on through the browser
    #[command(about = "Connect via the external-browser SSO flow")]
    Sso {
        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        context: ContextArgs,

        /// Save this connection bundle to the secrets file
        #[arg(long)]
        save: bool,
    },

    /// Key-pair authentication
    #[command(about = "Connect with an RSA private key, optionally encrypted")]
    Keypair {
        #[command(flatten)]
        target: TargetArgs,

        /// Path to the private-key PEM file
        #[arg(short, long)]
        key: PathBuf,

        /// The key file is passphrase-encrypted
        #[arg(long)]
        encrypted: bool,

        /// Passphrase for an encrypted key
        #[arg(long, env = "SNOWLENS_PASSPHRASE", hide_env_values = true)]
        passphrase: Option<String>,

        #[command(flatten)]
        context: ContextArgs,

        /// Save this connection bundle to the secrets file
        #[arg(long)]
        save: bool,
    },

    /// Reuse of a previously saved connection
    #[command(about = "Connect with a saved bundle from the secrets file")]
    Saved {
        /// Saved connection name; omit to list what is available
        name: Option<String>,
    },
}

/// Saved-connection subcommands
#[derive(Subcommand)]
pub enum ConnectionCommands {
    /// List saved connections
    #[command(about = "List saved connection bundles")]
    List {
        /// Output format
        #[arg(short, long, default_value = "names", value_enum)]
        format: OutputFormat,
    },

    /// Delete a saved connection
    #[command(about = "Delete a saved connection bundle")]
    Delete {
        /// Saved connection name
        name: String,
    },
}

/// History subcommands
#[derive(Subcommand)]
pub enum HistoryCommands {
    /// Summarize tagged query batches in a window
    #[command(about = "List query batches grouped by tag prefix")]
    Tags {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Draw one tagged batch as a timeline chart
    #[command(about = "Render the queries of one tag as a timeline")]
    Timeline {
        #[command(flatten)]
        filter: FilterArgs,

        /// Tag prefix selecting the batch
        #[arg(short, long)]
        tag: String,

        /// Chart width in columns
        #[arg(long, default_value = "80")]
        width: usize,
    },
}

/// Shared history filter criteria
#[derive(Args)]
pub struct FilterArgs {
    /// Saved connection to query through
    #[arg(short, long)]
    pub connection: String,

    /// Warehouse name to match
    #[arg(short, long)]
    pub warehouse: String,

    /// User name to match
    #[arg(short, long)]
    pub user: String,

    /// Query date (YYYY-MM-DD)
    #[arg(short, long)]
    pub date: NaiveDate,

    /// Window start time of day (HH:MM:SS)
    #[arg(long, default_value = "00:00:00")]
    pub from: NaiveTime,

    /// Window end time of day (HH:MM:SS)
    #[arg(long, default_value = "23:59:59")]
    pub to: NaiveTime,
}

/// Output format for listings
#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// One key per line
    Names,
    /// Formatted table with account and user columns
    Table,
    /// JSON array of keys
    Json,
}

/// Exit codes for the CLI
mod exit_codes {
    /// General error (validation, storage, IO)
    pub const GENERAL_ERROR: i32 = 1;
    /// Connection or query failure against the warehouse
    pub const CONNECTION_FAILURE: i32 = 2;
}

/// CLI error type
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Input validation failure, reported before any network call
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Private-key failure
    #[error("{0}")]
    Key(#[from] KeyError),

    /// Warehouse connection failure
    #[error("{0}")]
    Connect(#[from] ConnectError),

    /// Secrets store failure
    #[error("{0}")]
    Store(#[from] StoreError),

    /// Query failure
    #[error("{0}")]
    Query(#[from] QueryError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<SnowlensError> for CliError {
    fn from(err: SnowlensError) -> Self {
        match err {
            SnowlensError::Validation(e) => Self::Validation(e),
            SnowlensError::Key(e) => Self::Key(e),
            SnowlensError::Connect(e) => Self::Connect(e),
            SnowlensError::Store(e) => Self::Store(e),
            SnowlensError::Query(e) => Self::Query(e),
            SnowlensError::Io(e) => Self::Io(e),
        }
    }
}

impl CliError {
    /// Returns the appropriate exit code for this error type.
    ///
    /// Exit codes:
    /// - 0: Success (not an error)
    /// - 1: General error (validation, key handling, storage, IO)
    /// - 2: Connection or query failure against the warehouse
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Connect(_) | Self::Query(_) => exit_codes::CONNECTION_FAILURE,
            Self::Validation(_) | Self::Key(_) | Self::Store(_) | Self::Io(_) => {
                exit_codes::GENERAL_ERROR
            }
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let store = match open_store(cli.secrets_file) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(e.exit_code());
        }
    };

    // One cache per process: repeated submissions with identical
    // parameters reuse the session instead of logging in again.
    let cache = SessionCache::new();

    let result = match cli.command {
        Commands::Connect(subcmd) => cmd_connect(subcmd, &store, &cache).await,
        Commands::Connections(subcmd) => cmd_connections(subcmd, &store).await,
        Commands::History(subcmd) => cmd_history(subcmd, &store, &cache).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(e.exit_code());
    }
}

/// Opens the secrets store at the default or overridden path
fn open_store(path: Option<PathBuf>) -> Result<TomlFileStore, CliError> {
    match path {
        Some(path) => Ok(TomlFileStore::with_path(path)),
        None => Ok(TomlFileStore::new()?),
    }
}

/// Connect command handler: builds the profile for the selected mode,
/// validates it, opens the session, and optionally saves the bundle
async fn cmd_connect(
    subcmd: ConnectCommands,
    store: &TomlFileStore,
    cache: &SessionCache,
) -> Result<(), CliError> {
    let (profile, save) = match subcmd {
        ConnectCommands::Password {
            target,
            password,
            context,
            save,
        } => (
            build_profile(&target, AuthMethod::password(password), context)?,
            save,
        ),
        ConnectCommands::Sso {
            target,
            context,
            save,
        } => (
            build_profile(&target, AuthMethod::ExternalBrowser, context)?,
            save,
        ),
        ConnectCommands::Keypair {
            target,
            key,
            encrypted,
            passphrase,
            context,
            save,
        } => {
            let pem = fs::read(&key)?;
            let der = decode_private_key(&pem, encrypted, passphrase.as_deref())?;
            (
                build_profile(&target, AuthMethod::KeyPair { der }, context)?,
                save,
            )
        }
        ConnectCommands::Saved { name } => {
            let Some(name) = name else {
                return print_saved_hint(store).await;
            };
            let profile = store
                .get(&name)
                .await?
                .ok_or_else(|| StoreError::NotFound(name))?;
            (profile, false)
        }
    };

    profile.validate()?;
    open_session(cache, &profile).await?;
    println!(
        "Connected to {} as {} ({} mode).",
        profile.account,
        profile.user,
        profile.mode()
    );

    if save {
        let key = profile.storage_key();
        store.put(&key, &profile).await?;
        println!("Saved connection '{key}'.");
    }
    Ok(())
}

/// Saved-connection command handler
async fn cmd_connections(
    subcmd: ConnectionCommands,
    store: &TomlFileStore,
) -> Result<(), CliError> {
    match subcmd {
        ConnectionCommands::List { format } => {
            let mut keys = store.list().await?;
            keys.sort();
            match format {
                OutputFormat::Names => {
                    for key in keys {
                        println!("{key}");
                    }
                }
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&keys).unwrap_or_default());
                }
                OutputFormat::Table => {
                    let mut rows = Vec::with_capacity(keys.len());
                    for key in keys {
                        if let Some(profile) = store.get(&key).await? {
                            rows.push(vec![
                                key,
                                profile.mode().to_string(),
                                profile.account.to_string(),
                                profile.user,
                            ]);
                        }
                    }
                    print!(
                        "{}",
                        format_table(&["NAME", "MODE", "ACCOUNT", "USER"], &rows)
                    );
                }
            }
            Ok(())
        }
        ConnectionCommands::Delete { name } => {
            store.delete(&name).await?;
            println!("Deleted connection '{name}'.");
            Ok(())
        }
    }
}

/// History command handler: connects through a saved bundle and renders
/// either the tag summary table or the per-tag timeline
async fn cmd_history(
    subcmd: HistoryCommands,
    store: &TomlFileStore,
    cache: &SessionCache,
) -> Result<(), CliError> {
    match subcmd {
        HistoryCommands::Tags { filter } => {
            let (session, filter) = open_filtered_session(store, cache, &filter).await?;
            let summaries = history::list_tags(session.as_ref(), &filter).await?;
            let rows: Vec<Vec<String>> = summaries
                .into_iter()
                .map(|s| {
                    vec![
                        if s.tag.is_empty() {
                            "(untagged)".to_string()
                        } else {
                            s.tag
                        },
                        s.first_start.format("%H:%M:%S").to_string(),
                        s.last_start.format("%H:%M:%S").to_string(),
                        s.query_count.to_string(),
                    ]
                })
                .collect();
            print!(
                "{}",
                format_table(&["TAG", "FIRST START", "LAST START", "QUERIES"], &rows)
            );
            Ok(())
        }
        HistoryCommands::Timeline { filter, tag, width } => {
            let (session, filter) = open_filtered_session(store, cache, &filter).await?;
            let records = history::list_queries(session.as_ref(), &filter, &tag).await?;
            if records.is_empty() {
                println!("No queries found for tag '{tag}' in the window.");
                return Ok(());
            }
            let timeline = Timeline::layout(filter.window, &records, width);
            for line in timeline.render() {
                println!("{line}");
            }
            Ok(())
        }
    }
}

/// Builds a validated profile from target and context arguments
fn build_profile(
    target: &TargetArgs,
    auth: AuthMethod,
    context: ContextArgs,
) -> Result<ConnectionProfile, CliError> {
    let account = Account::parse(&target.account)?;
    Ok(ConnectionProfile::new(account, target.user.clone(), auth)
        .with_role(context.role.unwrap_or_default())
        .with_warehouse(context.warehouse.unwrap_or_default())
        .with_database(context.database.unwrap_or_default())
        .with_schema(context.schema.unwrap_or_default()))
}

/// Opens a session for a profile through the process-wide cache
async fn open_session(
    cache: &SessionCache,
    profile: &ConnectionProfile,
) -> Result<Arc<dyn Session>, CliError> {
    let client = RestClient::new();
    Ok(cache.get_or_connect(&client, profile).await?)
}

/// Resolves a saved connection and builds the history filter
async fn open_filtered_session(
    store: &TomlFileStore,
    cache: &SessionCache,
    args: &FilterArgs,
) -> Result<(Arc<dyn Session>, history::HistoryFilter), CliError> {
    let profile = store
        .get(&args.connection)
        .await?
        .ok_or_else(|| StoreError::NotFound(args.connection.clone()))?;
    profile.validate()?;

    let filter = history::HistoryFilter {
        warehouse: args.warehouse.clone(),
        user: args.user.clone(),
        window: history::TimeWindow::on_date(args.date, args.from, args.to)?,
    };
    filter.validate()?;

    let session = open_session(cache, &profile).await?;
    Ok((session, filter))
}

/// Lists saved connections as a hint when `connect saved` gets no name
async fn print_saved_hint(store: &TomlFileStore) -> Result<(), CliError> {
    let mut keys = store.list().await?;
    if keys.is_empty() {
        println!("No saved connections. Use 'snowlens connect <mode> --save' to create one.");
        return Ok(());
    }
    keys.sort();
    println!("Available saved connections:");
    for key in keys {
        println!("  {key}");
    }
    Ok(())
}

/// Formats rows as a padded text table with a header rule
fn format_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.len());
            }
        }
    }

    let mut out = String::new();
    for (i, header) in headers.iter().enumerate() {
        let _ = write!(out, "{:<width$}  ", header, width = widths[i]);
    }
    out.push('\n');
    for (i, _) in headers.iter().enumerate() {
        let _ = write!(out, "{:-<width$}  ", "", width = widths[i]);
    }
    out.push('\n');
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            let _ = write!(out, "{:<width$}  ", cell, width = widths[i]);
        }
        out.push('\n');
    }
    out
}
