//! lokal-cli - Lightweight LokalChat client
//!
//! A terminal client for a LokalChat server: REST for commands and
//! history, a WebSocket for live events.

mod api;
mod auth;
mod config;
mod models;
mod socket;
mod sync;
mod tui;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "lokal-cli")]
#[command(about = "Lightweight CLI client for a LokalChat server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in with username and password
    Login {
        username: String,

        /// Password (prompted when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Register a new account
    Register {
        username: String,

        /// Display name shown to other users
        #[arg(short, long)]
        display_name: String,

        /// Password (prompted when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Log out and clear stored credentials
    Logout,

    /// Show current authentication status
    Status,

    /// List chats
    Chats {
        /// Maximum number of chats to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Read messages from a chat
    Read {
        /// Chat ID (from `chats` output)
        chat_id: String,

        /// Maximum number of messages to show
        #[arg(short, long, default_value = "20")]
        limit: u32,
    },

    /// Send a message
    Send {
        /// Chat ID (from `chats` output)
        #[arg(short, long)]
        to: String,

        /// Message content
        message: String,
    },

    /// Send a file into a chat
    SendFile {
        /// Chat ID (from `chats` output)
        #[arg(short, long)]
        to: String,

        /// Path to the file
        file: std::path::PathBuf,
    },

    /// Show one chat and its members
    Chat {
        /// Chat ID (from `chats` output)
        chat_id: String,
    },

    /// Create a chat (1:1 or group)
    CreateChat {
        /// Member user IDs, comma separated
        #[arg(short, long, value_delimiter = ',')]
        members: Vec<String>,

        /// Group chat name (omit for a 1:1 chat)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Rename a group chat
    Rename {
        chat_id: String,
        name: String,
    },

    /// Add members to a chat
    AddMembers {
        chat_id: String,

        /// Member user IDs, comma separated
        #[arg(short, long, value_delimiter = ',')]
        members: Vec<String>,
    },

    /// Remove a member from a chat
    RemoveMember {
        chat_id: String,
        user_id: String,
    },

    /// Connect to the push socket and print events
    Listen,

    /// Show current user info (verify auth works)
    Whoami,

    /// Update your profile
    Profile {
        #[arg(short, long)]
        display_name: Option<String>,

        #[arg(short, long)]
        password: Option<String>,

        /// Avatar image to upload
        #[arg(short, long)]
        avatar: Option<std::path::PathBuf>,
    },

    /// Search users by name
    Search { query: String },

    /// Launch the terminal user interface
    Tui,

    /// Administrative commands (admin accounts only)
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// List all users
    Users,

    /// Create a user
    CreateUser {
        username: String,

        #[arg(short, long)]
        display_name: String,

        #[arg(short, long)]
        password: String,

        /// Grant admin rights
        #[arg(long)]
        admin: bool,
    },

    /// Update a user
    UpdateUser {
        user_id: String,

        #[arg(short, long)]
        display_name: Option<String>,

        /// Grant or revoke admin rights
        #[arg(long)]
        admin: Option<bool>,

        /// Enable or disable the account
        #[arg(long)]
        active: Option<bool>,
    },

    /// Delete a user
    DeleteUser { user_id: String },

    /// Show server statistics
    Stats,
}

/// Store + gateway pair for one-shot chat commands (no socket attached).
async fn cli_gateway() -> Result<(sync::ChatStore, sync::CommandGateway)> {
    use anyhow::Context;

    let config = config::Config::load()?;
    let user = config
        .get_user()
        .context("Not logged in. Run 'lokal-cli login <username>' first.")?;
    let api = api::client::ApiClient::new().await?;
    Ok((
        sync::ChatStore::new(user.id),
        sync::CommandGateway::new(api, None),
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match cli.command {
        Commands::Login { username, password } => {
            auth::login(&username, password).await?;
        }
        Commands::Register {
            username,
            display_name,
            password,
        } => {
            auth::register(&username, &display_name, password).await?;
        }
        Commands::Logout => {
            auth::logout().await?;
        }
        Commands::Status => {
            auth::status().await?;
        }
        Commands::Chats { limit } => {
            api::chat::list_chats(limit).await?;
        }
        Commands::Read { chat_id, limit } => {
            api::chat::read_messages(&chat_id, limit).await?;
        }
        Commands::Send { to, message } => {
            api::chat::send_message(&to, &message).await?;
        }
        Commands::SendFile { to, file } => {
            api::chat::send_file(&to, &file).await?;
        }
        Commands::Chat { chat_id } => {
            api::chat::show_chat(&chat_id).await?;
        }
        Commands::CreateChat { members, name } => {
            let (mut store, gateway) = cli_gateway().await?;
            let chat = gateway
                .create_chat(&mut store, &members, name.as_deref())
                .await?;
            println!("Created chat {} ({})", chat.name, chat.id);
        }
        Commands::Rename { chat_id, name } => {
            let (mut store, gateway) = cli_gateway().await?;
            gateway.rename_chat(&mut store, &chat_id, &name).await?;
            println!("Renamed chat to {}", name);
        }
        Commands::AddMembers { chat_id, members } => {
            let (mut store, gateway) = cli_gateway().await?;
            gateway.add_members(&mut store, &chat_id, &members).await?;
            println!("Added {} member(s).", members.len());
        }
        Commands::RemoveMember { chat_id, user_id } => {
            let (mut store, gateway) = cli_gateway().await?;
            gateway.remove_member(&mut store, &chat_id, &user_id).await?;
            println!("Removed member {}.", user_id);
        }
        Commands::Listen => {
            socket::listen().await?;
        }
        Commands::Whoami => {
            api::user::whoami().await?;
        }
        Commands::Profile {
            display_name,
            password,
            avatar,
        } => {
            api::user::update_profile(display_name, password, avatar.as_deref()).await?;
        }
        Commands::Search { query } => {
            api::user::search_users(&query).await?;
        }
        Commands::Tui => {
            tui::run().await?;
        }
        Commands::Admin { command } => match command {
            AdminCommands::Users => {
                api::user::admin_list_users().await?;
            }
            AdminCommands::CreateUser {
                username,
                display_name,
                password,
                admin,
            } => {
                api::user::admin_create_user(&username, &password, &display_name, admin).await?;
            }
            AdminCommands::UpdateUser {
                user_id,
                display_name,
                admin,
                active,
            } => {
                api::user::admin_update_user(&user_id, display_name, admin, active).await?;
            }
            AdminCommands::DeleteUser { user_id } => {
                api::user::admin_delete_user(&user_id).await?;
            }
            AdminCommands::Stats => {
                api::user::admin_stats().await?;
            }
        },
    }

    Ok(())
}
