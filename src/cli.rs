// CLI commands

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use crate::config::LedgerConfig;
use crate::error::Result;
use crate::ledger::Ledger;

#[derive(Parser)]
#[command(name = "utxo-ledger")]
#[command(about = "Append-only UTXO ledger with proof of work", long_about = None)]
pub struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database directory (overrides the configuration file)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new ledger and send the genesis reward to ADDRESS
    #[command(name = "createblockchain")]
    CreateBlockchain {
        #[arg(long)]
        address: String,
    },

    /// Get the balance of ADDRESS
    #[command(name = "getbalance")]
    GetBalance {
        #[arg(long)]
        address: String,
    },

    /// Print every block from newest to oldest
    #[command(name = "printchain")]
    PrintChain,

    /// Send AMOUNT from FROM to TO and mine the transfer
    Send {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        amount: u64,
    },

    /// Re-validate the proof of work of every block
    Verify,
}

/// CLI handler
pub struct CliHandler {
    config: LedgerConfig,
}

impl CliHandler {
    pub fn new(config_path: Option<&Path>, data_dir: Option<&Path>) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => {
                log::info!("Loading configuration from {}", path.display());
                LedgerConfig::load(path)?
            }
            None => LedgerConfig::default(),
        };
        if let Some(dir) = data_dir {
            config.data_dir = dir.to_path_buf();
        }
        Ok(Self { config })
    }

    /// Handle CLI command
    pub fn handle(&self, command: Commands) -> Result<()> {
        match command {
            Commands::CreateBlockchain { address } => self.create(&address),
            Commands::GetBalance { address } => self.balance(&address),
            Commands::PrintChain => self.print_chain(),
            Commands::Send { from, to, amount } => self.send(&from, &to, amount),
            Commands::Verify => self.verify(),
        }
    }

    fn create(&self, address: &str) -> Result<()> {
        let ledger = Ledger::create(self.config.clone(), address)?;
        println!("✓ Ledger created");
        println!("  Genesis: {}", ledger.tip());
        Ok(())
    }

    fn balance(&self, address: &str) -> Result<()> {
        let ledger = Ledger::open(self.config.clone())?;
        let balance = ledger.balance(address)?;
        println!("Balance of '{}': {}", address, balance);
        Ok(())
    }

    fn print_chain(&self) -> Result<()> {
        let ledger = Ledger::open(self.config.clone())?;
        let pow = ledger.proof_of_work();

        for block in ledger.iter() {
            let block = block?;
            match block.prev_hash {
                Some(prev) => println!("Prev. hash: {}", prev),
                None => println!("Prev. hash: (genesis)"),
            }
            println!("Hash: {}", block.hash);
            println!("Timestamp: {}", block.timestamp);
            println!("Nonce: {}", block.nonce);
            println!("PoW: {}", pow.validate(&block));
            for (i, tx) in block.transactions.iter().enumerate() {
                println!("  [{}] {}", i, tx.id);
            }
            println!();
        }
        Ok(())
    }

    fn send(&self, from: &str, to: &str, amount: u64) -> Result<()> {
        let ledger = Ledger::open(self.config.clone())?;
        let block = ledger.send(from, to, amount)?;
        println!("✓ Sent {} from {} to {}", amount, from, to);
        println!("  Block: {}", block.hash);
        Ok(())
    }

    fn verify(&self) -> Result<()> {
        let ledger = Ledger::open(self.config.clone())?;
        let count = ledger.verify_chain()?;
        println!("✓ {} blocks verified", count);
        Ok(())
    }
}
