//! CLI entry and dispatch.

use anyhow::{Context, Result};
use clap::Parser;
use pollr_core::backend::Backend;
use pollr_core::config;
use pollr_core::logging;
use pollr_core::model::{PollId, UserProfile};
use pollr_core::screens::AppContext;
use pollr_core::screens::gate::{self, GateDecision};
use pollr_core::session::{RefreshOptions, SessionStorage, SessionStore};

mod commands;

#[derive(Parser)]
#[command(name = "pollr")]
#[command(version)]
#[command(about = "Create polls and vote from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Sign in with email and password
    Login(Credentials),
    /// Create an account
    Signup(Credentials),
    /// Sign out and forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Send a password reset email
    ResetPassword {
        /// Account email
        #[arg(long)]
        email: String,
    },
    /// Change the password of the signed-in user
    UpdatePassword {
        /// New password (read from stdin if omitted)
        #[arg(long)]
        password: Option<String>,
        /// Confirmation (read from stdin if omitted)
        #[arg(long)]
        confirm: Option<String>,
    },
    /// Browse, create, and vote on polls
    Polls {
        #[command(subcommand)]
        command: PollCommands,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Args, Debug, Clone)]
struct Credentials {
    /// Account email
    #[arg(long)]
    email: String,
    /// Password (read from stdin if omitted)
    #[arg(long)]
    password: Option<String>,
}

#[derive(clap::Subcommand)]
enum PollCommands {
    /// Lists all polls, newest first
    List,
    /// Creates a poll
    New {
        /// The question to ask
        #[arg(short, long)]
        question: String,
        /// An answer option (repeat for each option)
        #[arg(short, long = "option", value_name = "OPTION")]
        options: Vec<String>,
    },
    /// Shows a poll with its results
    Show {
        #[arg(value_name = "POLL_ID")]
        id: PollId,
    },
    /// Votes on a poll
    Vote {
        #[arg(value_name = "POLL_ID")]
        id: PollId,
        /// Option text or its 1-based number
        #[arg(short, long)]
        option: String,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
    /// Print a fresh config generated from defaults
    Generate,
    /// Store the backend URL and anon key
    SetBackend {
        #[arg(value_name = "URL")]
        url: String,
        #[arg(value_name = "ANON_KEY")]
        anon_key: String,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;
    rt.block_on(async move { dispatch(cli).await })
}

/// Loads the stored session and wires up the screen context.
async fn connect(config: config::Config) -> Result<AppContext> {
    let settings = config.backend.resolve().context("resolve backend")?;
    tracing::debug!(backend = %settings.url, "connecting");
    let store = SessionStore::new(
        Backend::new(&settings),
        SessionStorage::default(),
        RefreshOptions::from(&config.auth),
    );
    store.initialize().await;
    tracing::debug!(signed_in = store.user().is_some(), "session restored");
    Ok(AppContext::new(store, config))
}

/// Auth gate for one-shot commands.
async fn require_user(ctx: &AppContext) -> Result<UserProfile> {
    match gate::resolve(&ctx.session).await {
        GateDecision::Allow(user) => Ok(user),
        GateDecision::Loading | GateDecision::RedirectToLogin => {
            anyhow::bail!("Not signed in. Run `pollr login --email <EMAIL>` first.")
        }
    }
}

async fn dispatch(cli: Cli) -> Result<()> {
    let config = config::Config::load().context("load config")?;
    let _log_guard = logging::init(&config.log).context("init logging")?;

    // config commands work without a backend
    let command = match cli.command {
        Some(Commands::Config { command }) => return config_command(command),
        other => other,
    };

    let ctx = connect(config).await?;

    // default to interactive mode
    let Some(command) = command else {
        return commands::interactive::run(&ctx).await;
    };

    match command {
        Commands::Login(creds) => {
            commands::auth::login(&ctx, &creds.email, creds.password).await
        }
        Commands::Signup(creds) => {
            commands::auth::signup(&ctx, &creds.email, creds.password).await
        }
        Commands::Logout => commands::auth::logout(&ctx).await,
        Commands::Whoami => {
            let user = require_user(&ctx).await?;
            commands::auth::whoami(&ctx, user).await
        }
        Commands::ResetPassword { email } => commands::auth::reset_password(&ctx, &email).await,
        Commands::UpdatePassword { password, confirm } => {
            require_user(&ctx).await?;
            commands::auth::update_password(&ctx, password, confirm).await
        }
        Commands::Polls { command } => {
            let user = require_user(&ctx).await?;
            match command {
                PollCommands::List => commands::polls::list(&ctx, &user).await,
                PollCommands::New { question, options } => {
                    commands::polls::create(&ctx, &question, &options).await
                }
                PollCommands::Show { id } => commands::polls::show(&ctx, id).await,
                PollCommands::Vote { id, option } => {
                    commands::polls::vote(&ctx, id, &option).await
                }
            }
        }
        Commands::Config { command } => config_command(command),
    }
}

fn config_command(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Path => commands::config::path(),
        ConfigCommands::Init => commands::config::init(),
        ConfigCommands::Generate => commands::config::generate(),
        ConfigCommands::SetBackend { url, anon_key } => {
            commands::config::set_backend(&url, &anon_key)
        }
    }
}
