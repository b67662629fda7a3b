//! Sidechain Node
//!
//! Operator tooling over the node's state store: inspect the validator
//! ledger, list exit events with their event root, build exit proofs for a
//! known checkpoint block and print the effective configuration.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sidechain_consensus::{build_exit_proof, event_root};
use state_store::StateStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;

use config::NodeConfig;

/// Sidechain validator-set and checkpoint node
#[derive(Parser, Debug)]
#[command(name = "sidechain-node")]
#[command(about = "Inspect the sidechain validator ledger and bridge exit events", long_about = None)]
struct Args {
    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Data directory for persistent state (overrides the config file)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Checkpoint interval in blocks (overrides the config file)
    #[arg(long)]
    checkpoint_interval: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every validator in the ledger
    Validators,
    /// List the exit events of an epoch and their event root
    ExitEvents {
        #[arg(long)]
        epoch: u64,
    },
    /// Build the inclusion proof of an exit event in a checkpoint
    ExitProof {
        #[arg(long)]
        id: u64,
        /// Checkpoint block covering the event, as recorded on the root chain
        #[arg(long)]
        checkpoint_block: u64,
    },
    /// Print the effective configuration
    Config,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = NodeConfig::load(args.config.as_deref())?;
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(log_level) = args.log_level {
        config.log_level = log_level;
    }
    if let Some(interval) = args.checkpoint_interval {
        config.consensus.checkpoint_interval = interval;
    }

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    match args.command {
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        Command::Validators => list_validators(&config),
        Command::ExitEvents { epoch } => list_exit_events(&config, epoch),
        Command::ExitProof {
            id,
            checkpoint_block,
        } => print_exit_proof(&config, id, checkpoint_block),
    }
}

fn open_store(config: &NodeConfig) -> Result<StateStore> {
    StateStore::open(&config.data_dir)
        .with_context(|| format!("failed to open state store at {}", config.data_dir.display()))
}

fn list_validators(config: &NodeConfig) -> Result<()> {
    let store = open_store(config)?;
    let ledger = store.stake().get_full_validator_set()?;

    tracing::info!(
        "Ledger at block {}, epoch {}, last updated at block {}",
        ledger.block_number,
        ledger.epoch_id,
        ledger.updated_at_block_number
    );

    for validator in &ledger.validators.all_sorted() {
        println!("{}", validator);
    }

    Ok(())
}

fn list_exit_events(config: &NodeConfig, epoch: u64) -> Result<()> {
    let store = open_store(config)?;
    let events = store.exit_events().get_exit_events_for_epoch(epoch)?;

    for event in &events {
        println!("{}", serde_json::to_string(event)?);
    }

    let root = event_root(&events)?;
    tracing::info!("Epoch {}: {} exit events, event root {}", epoch, events.len(), root);

    Ok(())
}

fn print_exit_proof(config: &NodeConfig, id: u64, checkpoint_block: u64) -> Result<()> {
    let store = open_store(config)?;
    let event = store.exit_events().get_exit_event(id)?;

    if event.block_number > checkpoint_block {
        anyhow::bail!(
            "exit {} was filed at block {}, after checkpoint block {}",
            id,
            event.block_number,
            checkpoint_block
        );
    }

    let proof = build_exit_proof(store.exit_events(), event, checkpoint_block)?;
    proof.verify()?;

    println!("{}", serde_json::to_string_pretty(&proof)?);

    Ok(())
}
