//! merkle-miner command-line driver.
//!
//! Appends transactions to the flat transaction log, prints the Merkle tree
//! over the log, mines a block on top of the stored chain tip, and lists
//! stored blocks.

use anyhow::Context;
use clap::{Parser, Subcommand};
use merkle_miner::config::Config;
use merkle_miner::core::{BlockAssembler, Transaction};
use merkle_miner::crypto::{MerkleTree, ProofOfWorkMiner};
use merkle_miner::storage::{BlockLog, TransactionLog};
use merkle_miner::utils::{format_hash_rate, format_seconds, init_logging};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "merkle-miner")]
#[command(about = "Merkle-root block assembly with proof-of-work", long_about = None)]
struct Cli {
    /// Directory holding the transaction and block logs
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Append simple-value transactions to the log
    Add {
        #[arg(required = true, allow_negative_numbers = true)]
        values: Vec<i64>,
    },
    /// Append a transfer between two parties
    Transfer {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: u64,
    },
    /// Print the leaves, every tree level and the Merkle root of the log
    Root,
    /// Mine a block over the logged transactions
    Mine {
        /// Required leading '0' hex characters
        #[arg(short, long)]
        difficulty: Option<u32>,
        /// Parallel search lanes
        #[arg(short, long)]
        threads: Option<usize>,
        #[arg(long)]
        max_attempts: Option<u64>,
        /// Give up after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// List stored blocks and verify each one
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::from_env().context("failed to load configuration")?;
    if let Some(dir) = cli.data_dir {
        config.storage.data_dir = dir;
    }
    if let Commands::Mine {
        difficulty,
        threads,
        max_attempts,
        timeout,
    } = &cli.command
    {
        if let Some(difficulty) = difficulty {
            config.mining.difficulty = *difficulty;
        }
        if let Some(threads) = threads {
            config.mining.threads = *threads;
        }
        if max_attempts.is_some() {
            config.mining.max_attempts = *max_attempts;
        }
        if timeout.is_some() {
            config.mining.timeout_seconds = *timeout;
        }
    }
    config.validate()?;

    init_logging(&config.logging);

    match cli.command {
        Commands::Add { values } => {
            let batch: Vec<Transaction> = values.into_iter().map(Transaction::simple).collect();
            add(&config, &batch)
        }
        Commands::Transfer { from, to, amount } => {
            add(&config, &[Transaction::transfer(from, to, amount)])
        }
        Commands::Root => root(&config),
        Commands::Mine { .. } => mine(&config).await,
        Commands::Show => show(&config),
    }
}

fn add(config: &Config, batch: &[Transaction]) -> anyhow::Result<()> {
    let log = TransactionLog::open(config.transactions_path());
    let added = log.append(batch)?;

    for record in &added {
        println!("➕ {} ({})", record.data, record.hash);
    }
    println!("📝 {} transaction(s) in {}", log.load()?.len(), log.path().display());
    Ok(())
}

fn root(config: &Config) -> anyhow::Result<()> {
    let log = TransactionLog::open(config.transactions_path());
    let transactions = log.verify_integrity()?;
    let tree = MerkleTree::from_records(&transactions)?;

    for (depth, level) in tree.levels().iter().enumerate() {
        println!("level {} ({} node(s))", depth, level.len());
        for digest in level {
            println!("  {}", digest);
        }
    }
    println!("🌳 merkle root: {}", tree.root());
    Ok(())
}

async fn mine(config: &Config) -> anyhow::Result<()> {
    let tx_log = TransactionLog::open(config.transactions_path());
    let block_log = BlockLog::open(config.blocks_path());

    let transactions = tx_log
        .verify_integrity()
        .context("transaction log failed verification")?;
    let link = block_log.last_link(config.chain.genesis_hash_len)?;
    let difficulty = config.mining.difficulty;

    info!(
        transactions = transactions.len(),
        difficulty,
        threads = config.mining.threads,
        link = %link,
        "starting block assembly"
    );

    let assembler = BlockAssembler::new(ProofOfWorkMiner::new(config.pow_config()));
    let stop = assembler.miner().stop_handle();
    let task_link = link.clone();
    let mut task = tokio::task::spawn_blocking(move || {
        let started = std::time::Instant::now();
        let assembled = assembler.assemble_on(&task_link, transactions, difficulty);
        let attempts = assembler.miner().attempts();
        assembled.map(|(block, next)| (block, next, attempts, started.elapsed().as_secs_f64()))
    });

    let (block, next, attempts, elapsed) = tokio::select! {
        joined = &mut task => joined??,
        Ok(()) = tokio::signal::ctrl_c() => {
            warn!("interrupt received, stopping miner");
            stop.stop();
            task.await??
        }
    };

    // The log must still hold exactly what was committed to
    tx_log.verify_against(block.transactions())?;
    let record = block_log.append(&block)?;

    let hash_rate = if elapsed > 0.0 { attempts as f64 / elapsed } else { 0.0 };
    println!("⛏️  block #{} mined", next.height());
    println!("   previous: {}", block.previous_hash());
    println!("   root:     {}", block.merkle_root());
    println!("   nonce:    {}", block.nonce());
    println!("   hash:     {}", block.hash());
    println!(
        "   {} attempts in {} ({})",
        attempts,
        format_seconds(elapsed),
        format_hash_rate(hash_rate)
    );
    println!("   stored:   {}", record.timestamp.to_rfc3339());
    Ok(())
}

fn show(config: &Config) -> anyhow::Result<()> {
    let log = BlockLog::open(config.blocks_path());
    let records = log.load()?;
    if records.is_empty() {
        println!("no blocks in {}", log.path().display());
        return Ok(());
    }

    let mut failures = 0usize;
    for (height, record) in records.iter().enumerate() {
        let status = match record.block.verify() {
            Ok(()) if record.hash == *record.block.hash() => "✅".to_string(),
            Ok(()) => {
                failures += 1;
                "❌ record hash differs from block hash".to_string()
            }
            Err(e) => {
                failures += 1;
                format!("❌ {}", e)
            }
        };
        println!(
            "#{} {} {} nonce={} txs={} difficulty={} {}",
            height + 1,
            record.timestamp.to_rfc3339(),
            record.hash,
            record.block.nonce(),
            record.block.transactions().len(),
            record.block.difficulty(),
            status
        );
    }

    if failures > 0 {
        anyhow::bail!("{} stored block(s) failed verification", failures);
    }
    Ok(())
}
