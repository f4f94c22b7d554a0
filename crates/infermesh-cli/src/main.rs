//! CLI entry point for the Infermesh client.
//!
//! This binary provides the `infermesh` command with subcommands for vault
//! lifecycle (init/unlock/verify) and node inspection (list/pick).

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use infermesh_swarm::http::{HttpIndexApi, HttpUserApi};
use infermesh_swarm::{NodePicker, NodeReconciler, SwarmConfig, SwarmState, UserApi};
use infermesh_vault::Vault;
use tracing::info;
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

/// Infermesh — distributed inference client tooling.
#[derive(Parser)]
#[command(
    name = "infermesh",
    version,
    about = "Infermesh client — secure vault and node orchestration"
)]
struct Cli {
    /// Path to the swarm config TOML (endpoints, blacklist TTL).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Vault lifecycle.
    Vault {
        #[command(subcommand)]
        command: VaultCommands,
    },
    /// Node directory inspection.
    Nodes {
        #[command(subcommand)]
        command: NodeCommands,
    },
    /// List the caller's conversations.
    Chats {
        /// Caller identity.
        #[arg(long)]
        identity: String,
        /// Registry handle.
        #[arg(long)]
        registry: String,
        /// Include archived conversations.
        #[arg(long)]
        archived: bool,
    },
}

#[derive(Subcommand)]
enum VaultCommands {
    /// Create a new vault protected by a PIN.
    Init {
        /// Vault file path.
        #[arg(long, default_value = "vault.json")]
        path: PathBuf,
    },
    /// Unlock an existing vault and print the root key encoding.
    Unlock {
        /// Vault file path.
        #[arg(long, default_value = "vault.json")]
        path: PathBuf,
    },
    /// Check a cached session key against the stored vault.
    Verify {
        /// Vault file path.
        #[arg(long, default_value = "vault.json")]
        path: PathBuf,
        /// The encoded root key to check.
        #[arg(long)]
        key: String,
    },
}

#[derive(Subcommand)]
enum NodeCommands {
    /// Reconcile and list the trusted node set.
    List {
        /// Caller identity.
        #[arg(long)]
        identity: String,
        /// Registry handle.
        #[arg(long)]
        registry: String,
    },
    /// Reconcile and pick one node for a model.
    Pick {
        /// Model to pick a node for.
        model: String,
        /// Caller identity.
        #[arg(long)]
        identity: String,
        /// Registry handle.
        #[arg(long)]
        registry: String,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("info");

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Vault { command } => match command {
            VaultCommands::Init { path } => cmd_vault_init(path),
            VaultCommands::Unlock { path } => cmd_vault_unlock(path),
            VaultCommands::Verify { path, key } => cmd_vault_verify(path, &key),
        },
        Commands::Nodes { command } => match command {
            NodeCommands::List { identity, registry } => {
                cmd_nodes_list(&config, &identity, &registry).await
            }
            NodeCommands::Pick {
                model,
                identity,
                registry,
            } => cmd_nodes_pick(&config, &model, &identity, &registry).await,
        },
        Commands::Chats {
            identity,
            registry,
            archived,
        } => cmd_chats(&config, &identity, &registry, archived).await,
    }
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_config(path: Option<&std::path::Path>) -> Result<SwarmConfig> {
    match path {
        Some(p) => {
            let raw = std::fs::read_to_string(p)
                .with_context(|| format!("failed to read config {}", p.display()))?;
            Ok(SwarmConfig::from_toml_str(&raw)?)
        }
        None => Ok(SwarmConfig::default()),
    }
}

// ---------------------------------------------------------------------------
// Subcommands: vault
// ---------------------------------------------------------------------------

fn cmd_vault_init(path: PathBuf) -> Result<()> {
    let pin = prompt_pin("Choose a PIN: ")?;
    let confirm = prompt_pin("Confirm the PIN: ")?;
    if pin != confirm {
        bail!("PINs do not match");
    }

    let (vault, _root_key) = Vault::create(&path, &pin).context("vault creation failed")?;
    info!(path = %vault.path().display(), "vault initialized");
    println!("Vault created at {}", vault.path().display());
    Ok(())
}

fn cmd_vault_unlock(path: PathBuf) -> Result<()> {
    let vault = Vault::open(&path).context("failed to open vault")?;
    let pin = prompt_pin("PIN: ")?;

    match vault.unlock(&pin)? {
        Some(root_key) => {
            println!("{}", root_key.encoded());
            Ok(())
        }
        None => bail!("wrong PIN"),
    }
}

fn cmd_vault_verify(path: PathBuf, key: &str) -> Result<()> {
    let vault = Vault::open(&path).context("failed to open vault")?;
    if vault.verify_session_key(key) {
        println!("ok");
        Ok(())
    } else {
        bail!("key does not match this vault");
    }
}

fn prompt_pin(prompt: &str) -> Result<String> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut pin = String::new();
    io::stdin()
        .lock()
        .read_line(&mut pin)
        .context("failed to read PIN")?;
    Ok(pin.trim().to_owned())
}

// ---------------------------------------------------------------------------
// Subcommands: nodes
// ---------------------------------------------------------------------------

async fn cmd_nodes_list(config: &SwarmConfig, identity: &str, registry: &str) -> Result<()> {
    let state = SwarmState::new();
    let reconciler = NodeReconciler::new(
        Arc::new(HttpIndexApi::new(config)),
        Arc::new(HttpUserApi::new(config)),
        state,
    );

    let nodes = reconciler.reconcile(identity, registry, true).await?;
    if nodes.is_empty() {
        println!("No trusted nodes.");
        return Ok(());
    }
    for node in nodes {
        println!(
            "{}  model={}  principal={}  address={}  key={}",
            node.node_id,
            node.model_id,
            node.principal,
            node.address,
            node.public_key.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}

async fn cmd_nodes_pick(
    config: &SwarmConfig,
    model: &str,
    identity: &str,
    registry: &str,
) -> Result<()> {
    let state = SwarmState::new();
    let reconciler = NodeReconciler::new(
        Arc::new(HttpIndexApi::new(config)),
        Arc::new(HttpUserApi::new(config)),
        state.clone(),
    );
    reconciler.reconcile(identity, registry, true).await?;

    match NodePicker::new(state).pick_node_for_model(model) {
        Some(picked) => {
            println!("{}  address={}", picked.node_id, picked.address);
            Ok(())
        }
        None => bail!("no eligible node for model {model} — try a different model or wait"),
    }
}

async fn cmd_chats(
    config: &SwarmConfig,
    identity: &str,
    registry: &str,
    include_archived: bool,
) -> Result<()> {
    let api = HttpUserApi::new(config);
    let chats = api.list_chats(identity, registry, include_archived).await?;
    if chats.is_empty() {
        println!("No conversations.");
        return Ok(());
    }
    for chat in chats {
        let marker = if chat.archived { " [archived]" } else { "" };
        println!("{}  {}{}", chat.chat_id, chat.title, marker);
    }
    Ok(())
}
