mod command;
mod console;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::*;
use command::{ChatCommand, HELP};
use console::ConsoleBehavior;
use dialoguer::Input;
use std::net::SocketAddr;
use std::sync::Arc;
use tether_client::link::WebRtcLinkFactory;
use tether_client::relay::{WsRelayTransport, forward_relay_events};
use tether_client::{ClientConfig, JoinPolicy, LinkConfig, MeshClient, RoomRole};
use tether_core::IceServerConfig;
use tether_relay::RelayConfig;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tether", bin_name = "tether")]
#[command(about = "Peer-to-peer mesh signaling over a WebSocket relay", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the signaling relay server
    Relay {
        #[arg(long, default_value = "0.0.0.0:8080")]
        bind: SocketAddr,
    },
    /// Join a room and chat with every peer in it
    Join(JoinArgs),
}

#[derive(Args)]
struct JoinArgs {
    /// Relay base url; the join path is appended to it
    #[arg(long, default_value = "ws://127.0.0.1:8080/ws")]
    relay: String,

    #[arg(long)]
    room: Option<String>,

    #[arg(long)]
    user: Option<String>,

    /// Wait for join requests instead of sending one
    #[arg(long)]
    master: bool,

    /// Ask before calling back a joiner (master only)
    #[arg(long, requires = "master")]
    gatekeeper: bool,

    /// Resolve simultaneous offers by comparing user ids
    #[arg(long)]
    tie_break: bool,

    /// STUN server url; repeat for several, omit for host candidates only
    #[arg(long)]
    stun: Vec<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let runtime = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;

    match cli.command {
        Commands::Relay { bind } => {
            info!("Starting relay on {}", bind);
            println!("{}", format!("🛰  Relay on ws://{}/ws", bind).green().bold());
            runtime.block_on(tether_relay::serve(RelayConfig::new(bind)))
        }
        Commands::Join(args) => {
            // Prompts block, so they run before the runtime takes over.
            let config = client_config(&args)?;
            runtime.block_on(join(args, config))
        }
    }
}

fn client_config(args: &JoinArgs) -> Result<ClientConfig> {
    let room = match &args.room {
        Some(room) => room.clone(),
        None => Input::<String>::new()
            .with_prompt("Room")
            .interact_text()
            .context("Failed to read room")?,
    };
    let user = match &args.user {
        Some(user) => user.clone(),
        None => Input::<String>::new()
            .with_prompt("User")
            .interact_text()
            .context("Failed to read user")?,
    };

    let role = if args.master {
        RoomRole::Master
    } else {
        RoomRole::Member
    };
    let policy = if args.gatekeeper {
        JoinPolicy::Gatekeeper
    } else {
        JoinPolicy::AutoAccept
    };

    Ok(ClientConfig::new(room, user)
        .with_role(role)
        .with_join_policy(policy)
        .with_tie_break(args.tie_break))
}

async fn join(args: JoinArgs, config: ClientConfig) -> Result<()> {
    let link_config = LinkConfig {
        ice_servers: args.stun.iter().map(IceServerConfig::stun).collect(),
    };

    info!(
        "Joining room {:?} as {:?} via {}",
        config.room_id, config.user_id, args.relay
    );
    let (transport, events) =
        WsRelayTransport::connect(&args.relay, &config.room_id, &config.user_id).await?;
    let transport = Arc::new(transport);
    let behavior = Arc::new(ConsoleBehavior::new());

    let client = MeshClient::new(
        config,
        transport.clone(),
        Arc::new(WebRtcLinkFactory::new(link_config)),
        behavior.clone(),
    );
    tokio::spawn(forward_relay_events(events, vec![client.clone()]));

    println!(
        "{}",
        format!(
            "🔗 {} joined room {}. Type /help for commands.",
            client.local_id(),
            client.room_id()
        )
        .green()
        .bold()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match ChatCommand::parse(&line) {
            ChatCommand::Say(text) => client.send_broadcast_message(text)?,
            ChatCommand::Call(peer) => client.start_call(peer)?,
            ChatCommand::Hangup(peer) => {
                if !client.hangup(peer.clone()).await? {
                    println!("{}", format!("No session with {}", peer).yellow());
                }
            }
            ChatCommand::Accept(peer) => {
                if !behavior.accept(&peer).await {
                    println!("{}", format!("{} is not waiting to join", peer).yellow());
                }
            }
            ChatCommand::Peers => print_peers(&client, &behavior).await,
            ChatCommand::Help => println!("{}", HELP),
            ChatCommand::Quit => break,
            ChatCommand::Empty => {}
            ChatCommand::Invalid(reason) => println!("{}", reason.red()),
        }
        if !client.is_running() {
            warn!("Signaling router for {:?} stopped", client.local_id());
            println!("{}", "Signaling stopped".red());
            break;
        }
    }

    info!("Leaving room {:?}", client.room_id());
    client.shutdown();
    transport.close();
    println!("{}", "👋 Bye".dimmed());
    Ok(())
}

async fn print_peers(client: &MeshClient, behavior: &ConsoleBehavior) {
    let peers = client.peers();
    if peers.is_empty() {
        println!("{}", "No peers yet".dimmed());
    }
    for peer in peers {
        let state = client
            .session_state(&peer)
            .map(|s| s.to_string())
            .unwrap_or_default();
        println!("  {} {}", peer.to_string().cyan(), state.dimmed());
    }
    for peer in behavior.waiting().await {
        println!("  {} {}", peer.to_string().yellow(), "waiting for /accept".dimmed());
    }
}
