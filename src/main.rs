//! agora: CLI for the Agora on-chain social protocol
//!
//! Connects a wallet session, drives the view controller against the
//! configured chain endpoint and pinning proxy, and prints a plain-text
//! rendering of the resulting projection.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use agora_client::config::Config;
use agora_client::contract::{ContractGateway, JsonRpcContract};
use agora_client::controller::{EntityKey, EntityState, Projection, ViewController};
use agora_client::store::PinningClient;
use agora_client::types::{EventId, PostId, TokenId};
use agora_client::wallet::{RpcWallet, WalletSession};

#[derive(Parser)]
#[command(name = "agora")]
#[command(about = "Client for the Agora on-chain social protocol")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "agora.toml")]
    config: String,

    /// Chain endpoint (overrides config file)
    #[arg(long, env = "AGORA_CHAIN_RPC")]
    chain_rpc: Option<String>,

    /// Wallet provider endpoint (overrides config file)
    #[arg(long, env = "AGORA_WALLET_RPC")]
    wallet_rpc: Option<String>,

    /// Pinning proxy endpoint (overrides config file)
    #[arg(long, env = "AGORA_STORE_API")]
    store_api: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the post feed
    Feed,
    /// Publish a post
    Post { text: String },
    /// Tip a post with the configured amount
    Tip { post_id: u64 },
    /// Profile NFT operations
    Profile {
        #[command(subcommand)]
        cmd: ProfileCmd,
    },
    /// Event operations
    Events {
        #[command(subcommand)]
        cmd: EventsCmd,
    },
    /// Stay connected and keep the view fresh across wallet changes
    Session,
}

#[derive(Subcommand)]
enum ProfileCmd {
    /// Show the active profile and owned NFTs
    Show,
    /// Mint a new profile NFT
    Mint {
        username: String,
        /// Avatar image file
        avatar: PathBuf,
    },
    /// Set another owned NFT as the active profile
    Switch { token_id: u64 },
}

#[derive(Subcommand)]
enum EventsCmd {
    /// List events
    List,
    /// Create an event (categories by convention: Meme, Art, Literature, Random)
    Create {
        name: String,
        category: String,
        max_participants: u32,
    },
    /// Join an event, attaching the configured fee
    Join { event_id: u64 },
    /// Attach an image to an event
    UploadImage {
        event_id: u64,
        image: PathBuf,
        caption: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("agora_client=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(std::path::Path::new(&cli.config))?;
    if let Some(chain_rpc) = cli.chain_rpc {
        config.chain.rpc_url = chain_rpc;
    }
    if let Some(wallet_rpc) = cli.wallet_rpc {
        config.wallet.rpc_url = wallet_rpc;
    }
    if let Some(store_api) = cli.store_api {
        config.store.api_url = store_api;
    }

    info!(chain = %config.chain.rpc_url, store = %config.store.api_url, "Starting agora client");

    let wallet_provider = Arc::new(RpcWallet::new(
        &config.wallet.rpc_url,
        config.wallet.poll_interval_ms,
    ));
    let capability = Arc::new(JsonRpcContract::new(
        &config.chain.rpc_url,
        config.chain.http_timeout_secs,
    )?);
    let gateway = Arc::new(ContractGateway::new(
        capability,
        config.chain.tx_timeout_secs,
        config.chain.receipt_poll_ms,
    ));
    let store = Arc::new(PinningClient::new(
        &config.store.api_url,
        &config.store.gateway_url,
        config.store.timeout_secs,
    )?);

    let controller = Arc::new(ViewController::new(
        WalletSession::new(wallet_provider.clone()),
        gateway,
        store,
        config.tip_amount()?,
        config.join_fee()?,
    ));

    let session = controller.connect().await?;
    println!(
        "Connected as {} on chain {}",
        session
            .wallet_address
            .as_ref()
            .map(|a| a.short())
            .unwrap_or_default(),
        session.chain_id
    );

    match cli.command {
        Command::Feed => {
            print_feed(&controller.projection().await);
        }
        Command::Post { text } => {
            controller.upload_post(&text).await?;
            println!("Posted.");
            print_feed(&controller.projection().await);
        }
        Command::Tip { post_id } => {
            controller.tip_post(PostId(post_id)).await?;
            println!("Tipped post {post_id}.");
            print_feed(&controller.projection().await);
        }
        Command::Profile { cmd } => match cmd {
            ProfileCmd::Show => {
                print_profile(&controller.projection().await);
            }
            ProfileCmd::Mint { username, avatar } => {
                let file_name = avatar
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("avatar")
                    .to_string();
                let bytes = std::fs::read(&avatar)
                    .with_context(|| format!("reading {}", avatar.display()))?;
                controller.mint_profile(&username, &file_name, bytes).await?;
                println!("Minted profile NFT for {username}.");
                print_profile(&controller.projection().await);
            }
            ProfileCmd::Switch { token_id } => {
                controller.switch_profile(TokenId(token_id)).await?;
                println!("Active profile set to token {token_id}.");
                print_profile(&controller.projection().await);
            }
        },
        Command::Events { cmd } => match cmd {
            EventsCmd::List => {
                print_events(&controller.projection().await);
            }
            EventsCmd::Create {
                name,
                category,
                max_participants,
            } => {
                controller.create_event(&name, &category, max_participants).await?;
                println!("Created event {name}.");
                print_events(&controller.projection().await);
            }
            EventsCmd::Join { event_id } => {
                controller.join_event(EventId(event_id)).await?;
                println!("Joined event {event_id}.");
                print_events(&controller.projection().await);
            }
            EventsCmd::UploadImage {
                event_id,
                image,
                caption,
            } => {
                let file_name = image
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("image")
                    .to_string();
                let bytes =
                    std::fs::read(&image).with_context(|| format!("reading {}", image.display()))?;
                controller
                    .upload_event_image(EventId(event_id), &file_name, bytes, &caption)
                    .await?;
                println!("Image attached to event {event_id}.");
                print_events(&controller.projection().await);
            }
        },
        Command::Session => {
            wallet_provider.start_watcher();
            controller.spawn_wallet_watcher();
            println!("Session running; watching for wallet changes. Ctrl-C to exit.");
            tokio::signal::ctrl_c().await?;
        }
    }

    Ok(())
}

fn badge(projection: &Projection, key: &EntityKey) -> &'static str {
    match projection.state(key) {
        EntityState::Clean => "",
        EntityState::Pending => " [pending]",
        EntityState::Stale => " [stale]",
        EntityState::Error { .. } => " [error]",
    }
}

fn print_feed(projection: &Projection) {
    if !projection.has_profile {
        println!("Must own an NFT to post");
    }
    println!("Feed{}:", badge(projection, &EntityKey::Feed));
    if projection.posts.is_empty() {
        println!("  (no posts yet)");
        return;
    }
    for post in &projection.posts {
        let author = post
            .author
            .as_ref()
            .map(|a| a.username.clone())
            .unwrap_or_else(|| "(unknown)".to_string());
        let content = post.content.as_deref().unwrap_or("(content unavailable)");
        print!(
            "  #{} {} | {} | tips: {}",
            post.id,
            author,
            content,
            post.tip_total.format_ether()
        );
        if let Some(error) = &post.fetch_error {
            print!(" [!] {error}");
        }
        println!("{}", badge(projection, &EntityKey::Post(post.id)));
    }
}

fn print_profile(projection: &Projection) {
    match &projection.active_profile {
        Some(profile) => println!(
            "Active profile: {} (token {}){}",
            profile.username,
            profile.token_id,
            badge(projection, &EntityKey::Profile)
        ),
        None => println!(
            "No NFT profile, please create one...{}",
            badge(projection, &EntityKey::Profile)
        ),
    }
    for nft in &projection.my_nfts {
        println!("  token {}: {} ({})", nft.token_id, nft.username, nft.avatar);
    }
}

fn print_events(projection: &Projection) {
    println!("Events{}:", badge(projection, &EntityKey::Events));
    if projection.events.is_empty() {
        println!("  (no events)");
        return;
    }
    for event in &projection.events {
        println!(
            "  #{} {} [{}] {}/{} joined{}",
            event.id,
            event.name,
            event.category,
            event.participants.len(),
            event.max_participants,
            badge(projection, &EntityKey::Event(event.id))
        );
        for image in &event.images {
            println!("     image: {} | {}", image.url, image.caption);
        }
    }
}
