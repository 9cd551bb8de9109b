use clap::{ArgAction, Parser, Subcommand};
use commands::{config, daemon, lists, sync};
use listsync_config::PathManager;
use listsync_models::MediaKind;

mod commands;
mod logging;
mod output;

#[derive(Parser)]
#[command(name = "listsync")]
#[command(about = "listsync - Keep Trakt lists in line with saved searches")]
#[command(version)]
struct Cli {
    /// Enable verbose output (use multiple times for more verbosity: -v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "human", value_enum)]
    output: output::OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create, inspect, rename and delete managed lists
    Lists {
        #[command(subcommand)]
        cmd: ListCommands,
    },
    /// Reconcile lists against their filters (one-time run)
    #[command(long_about = "Search for everything each list's filter matches and add or remove items so the remote list holds exactly that. Without --list, every list that is flagged for processing and has not run within the configured interval is processed.")]
    Sync {
        /// Process only this list, whether or not it is due
        #[arg(long, value_name = "ID")]
        list: Option<u64>,

        /// Compute changes without modifying any remote list
        #[arg(long, action = ArgAction::SetTrue)]
        dry_run: bool,
    },
    /// Run as daemon with internal scheduler
    #[command(long_about = "Run listsync in the foreground and reconcile due lists on the configured cron schedule. An initial run happens on startup unless --no-startup-sync is specified. Stop with Ctrl-C.")]
    Daemon {
        /// Cron schedule expression with seconds (e.g., '0 0 */6 * * *' for every 6 hours)
        #[arg(long, value_name = "SCHEDULE")]
        schedule: Option<String>,

        /// Skip initial run on startup
        #[arg(long, action = ArgAction::SetTrue)]
        no_startup_sync: bool,

        /// Write logs to a daily rotating file in the log directory instead of stderr
        #[arg(long, action = ArgAction::SetTrue)]
        log_to_file: bool,
    },
    /// Configure API credentials and user tokens
    Config {
        #[command(subcommand)]
        cmd: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub(crate) enum ListCommands {
    /// Create a list on Trakt and start managing it
    Create(lists::CreateArgs),

    /// Fetch a list's id, slug and name from Trakt
    Get {
        id: u64,

        /// Owner of the list (defaults to trakt.default_user)
        #[arg(long)]
        owner: Option<String>,
    },

    /// Rename a managed list
    Rename { id: u64, name: String },

    /// Delete a managed list from Trakt and stop managing it
    Delete {
        id: u64,

        /// Do not ask for confirmation
        #[arg(long, short, action = ArgAction::SetTrue)]
        yes: bool,
    },

    /// Show the managed lists
    Show {
        /// Only lists of this kind
        #[arg(long)]
        kind: Option<MediaKind>,
    },
}

#[derive(Subcommand)]
pub(crate) enum ConfigCommands {
    /// Show current configuration (masks sensitive data)
    #[command(long_about = "Display the current configuration and the users with stored credentials. Secrets are masked. Use --full to show them.")]
    Show {
        /// Show full configuration including masked secrets
        #[arg(long, action = ArgAction::SetTrue)]
        full: bool,
    },

    /// Configure the Trakt API application
    #[command(long_about = "Configure Trakt API credentials. You'll need to create a Trakt API application at https://trakt.tv/oauth/applications first.")]
    Trakt {
        /// Trakt Client ID (if not provided, will prompt)
        #[arg(long)]
        client_id: Option<String>,

        /// Trakt Client Secret (if not provided, will prompt)
        #[arg(long)]
        client_secret: Option<String>,

        /// User assumed when a command names no owner
        #[arg(long)]
        default_user: Option<String>,
    },

    /// Store an OAuth token for a user
    #[command(long_about = "Store an access and refresh token obtained from Trakt for a user. Without --user the username is looked up with the access token. Expired tokens are refreshed automatically on use.")]
    Token {
        /// Trakt username the token belongs to
        #[arg(long)]
        user: Option<String>,

        /// Access token (if not provided, will prompt)
        #[arg(long)]
        access_token: Option<String>,

        /// Refresh token (if not provided, will prompt)
        #[arg(long)]
        refresh_token: Option<String>,

        /// Seconds until the access token expires
        #[arg(long, default_value_t = 7_776_000)]
        expires_in: i64,
    },
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    // The daemon can log to a rotating file; everything else logs to stderr
    let log_file = match &cli.command {
        Commands::Daemon { log_to_file: true, .. } => Some(PathManager::default().daemon_log_file()),
        _ => None,
    };
    logging::init_logging_with_file(cli.verbose, cli.quiet, log_file)
        .map_err(|e| color_eyre::eyre::eyre!("{}", e))?;

    let output = output::Output::new(cli.output, cli.quiet);

    match cli.command {
        Commands::Lists { cmd } => lists::run_lists(cmd, &output).await,
        Commands::Sync { list, dry_run } => sync::run_sync(list, dry_run, &output).await,
        Commands::Daemon {
            schedule,
            no_startup_sync,
            ..
        } => daemon::run_daemon(schedule, no_startup_sync, &output).await,
        Commands::Config { cmd } => config::run_config(cmd, &output).await,
    }
}
