//! Pocketcord CLI - bounded-memory chat client.
//!
//! Thin shell over the `pocketcord` library: loads configuration, connects,
//! runs one client operation, prints plain text, exits.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use pocketcord::transport::HttpTransport;
use pocketcord::{ChatClient, Config};

#[derive(Parser)]
#[command(name = "pocketcord")]
#[command(version)]
#[command(about = "Bounded-memory client for a chat-service REST API")]
struct Cli {
    /// Group id to select instead of the first one discovered
    #[arg(long, global = true)]
    group: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the groups the account belongs to
    Groups,
    /// Show the latest messages of the current text channel
    Messages,
    /// List members of the current group
    Members,
    /// Send a message to the current text channel
    Send {
        /// Message text
        text: String,
    },
}

/// Connects a client for one CLI invocation, optionally switching to an
/// explicitly requested group first.
fn connect_client(config: &Config, group: Option<&str>) -> Result<ChatClient> {
    let transport = HttpTransport::new().context("Failed to build HTTP transport")?;
    let mut client = ChatClient::new(config.base_url.clone(), Box::new(transport));
    client
        .connect(&config.token)
        .context("Failed to connect to the chat service")?;
    if let Some(group_id) = group {
        client
            .switch_group(group_id)
            .with_context(|| format!("Failed to switch to group {group_id}"))?;
    }
    Ok(client)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let config = Config::load()?;
    if !config.has_token() {
        anyhow::bail!(
            "No token configured. Put it in {}/token.txt or set POCKETCORD_TOKEN.",
            Config::config_dir()?.display()
        );
    }

    let mut client = connect_client(&config, cli.group.as_deref())?;

    match cli.command {
        Commands::Groups => {
            for group in client.groups() {
                println!("{}  {}", group.id, group.name);
            }
        }
        Commands::Messages => {
            client.fetch_messages()?;
            for message in client.messages() {
                println!("[{}] {}: {}", message.timestamp, message.author, message.content);
            }
        }
        Commands::Members => {
            client.fetch_members()?;
            for member in client.members() {
                println!("{}#{}", member.username, member.discriminator);
            }
        }
        Commands::Send { text } => {
            client.send_message(&text)?;
            println!("Sent.");
        }
    }

    client.cleanup();
    Ok(())
}
