mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::assign::AssignArgs;
use commands::event::CreateArgs;

#[derive(Parser)]
#[command(name = "momfit")]
#[command(about = "Community roles, chat intents and event scheduling for MomFit")]
#[command(version)]
struct Cli {
    /// Path to the MomFit config directory (default: ~/.momfit)
    #[arg(long, global = true, env = "MOMFIT_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create config and database, seed default roles
    Init {
        /// Give this user the global Owner role
        #[arg(long)]
        owner: Option<String>,
    },

    /// List roles, or one user's assignments with --user
    Roles {
        #[arg(long)]
        user: Option<String>,
        /// Community for the effective-grants summary
        #[arg(long)]
        community: Option<String>,
    },

    /// Assign a role to a user (or revoke an assignment)
    Assign {
        user: String,
        /// Role name, e.g. Admin
        #[arg(default_value = "Member")]
        role: String,
        /// Restrict to one community (default: global)
        #[arg(long)]
        community: Option<String>,
        /// Who is granting the role
        #[arg(long)]
        by: Option<String>,
        #[arg(long)]
        expires_in_days: Option<u32>,
        /// Revoke this assignment id instead of assigning
        #[arg(long, conflicts_with_all = ["community", "expires_in_days"])]
        revoke: Option<String>,
    },

    /// Check whether a user holds a permission (scope:action:resource)
    Check {
        user: String,
        permission: String,
        #[arg(long)]
        community: Option<String>,
    },

    /// Classify a chat message; with --community and --user, raise an admin suggestion
    Detect {
        text: String,
        #[arg(long)]
        community: Option<String>,
        #[arg(long)]
        user: Option<String>,
    },

    /// Manage community events
    Event {
        #[command(subcommand)]
        command: EventCommand,
    },

    /// Review event suggestions raised from chat
    Notifications {
        #[command(subcommand)]
        command: NotificationCommand,
    },

    /// Show current configuration
    Config,
}

#[derive(Subcommand)]
enum EventCommand {
    /// Create an event
    Create(CreateArgs),
    /// List upcoming events
    List {
        community: String,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Delete an event (creator or community event manager)
    Delete { event_id: String, user: String },
}

#[derive(Subcommand)]
enum NotificationCommand {
    /// List pending suggestions
    List { community: String },
    /// Create the suggested event
    Approve { id: String, admin: String },
    /// Reject the suggestion
    Dismiss { id: String, admin: String },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("momfit=info".parse::<tracing_subscriber::filter::Directive>()?),
        )
        .init();

    let cli = Cli::parse();

    let base_dir = match cli.config_dir {
        Some(ref dir) => dir.clone(),
        None => momfit_core::config::MomfitConfig::default_base_dir()?,
    };

    let rt = tokio::runtime::Runtime::new()?;

    match cli.command {
        Commands::Init { ref owner } => {
            rt.block_on(commands::init::run(&base_dir, owner.as_deref()))
        }
        Commands::Roles {
            ref user,
            ref community,
        } => rt.block_on(commands::roles::run(
            &base_dir,
            user.as_deref(),
            community.as_deref(),
        )),
        Commands::Assign {
            ref user,
            ref role,
            ref community,
            ref by,
            expires_in_days,
            ref revoke,
        } => rt.block_on(commands::assign::run(
            &base_dir,
            AssignArgs {
                user,
                role,
                community: community.as_deref(),
                assigned_by: by.as_deref(),
                expires_in_days,
                revoke: revoke.as_deref(),
            },
        )),
        Commands::Check {
            ref user,
            ref permission,
            ref community,
        } => rt.block_on(commands::check::run(
            &base_dir,
            user,
            permission,
            community.as_deref(),
        )),
        Commands::Detect {
            ref text,
            ref community,
            ref user,
        } => rt.block_on(commands::detect::run(
            &base_dir,
            text,
            community.as_deref(),
            user.as_deref(),
        )),
        Commands::Event { ref command } => match command {
            EventCommand::Create(args) => rt.block_on(commands::event::create(&base_dir, args)),
            EventCommand::List { community, limit } => {
                rt.block_on(commands::event::list(&base_dir, community, *limit))
            }
            EventCommand::Delete { event_id, user } => {
                rt.block_on(commands::event::delete(&base_dir, event_id, user))
            }
        },
        Commands::Notifications { ref command } => match command {
            NotificationCommand::List { community } => {
                rt.block_on(commands::notifications::list(&base_dir, community))
            }
            NotificationCommand::Approve { id, admin } => {
                rt.block_on(commands::notifications::approve(&base_dir, id, admin))
            }
            NotificationCommand::Dismiss { id, admin } => {
                rt.block_on(commands::notifications::dismiss(&base_dir, id, admin))
            }
        },
        Commands::Config => commands::config::run(&base_dir),
    }
}
