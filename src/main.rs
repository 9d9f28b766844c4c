// Entry point for the ledger CLI. Every command opens the sled store,
// rebuilds the chain manager from the stored blocks, acts, and saves the
// chain back when it changed.
use clap::Parser;
use crypto_ledger::{
    validate_address, AlertSystem, CancelToken, ChainManager, Command, JsonFileStore,
    LedgerConfig, Opt, SledStore, SnapshotStore, Wallets,
};
use log::{error, info, LevelFilter};
use std::process;
use std::sync::Arc;

fn main() {
    env_logger::builder().filter_level(LevelFilter::Info).init();

    let opt = Opt::parse();

    if let Err(e) = run(opt) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn run(opt: Opt) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &opt.config {
        Some(path) => LedgerConfig::from_file(path)?,
        None => LedgerConfig::new()?,
    };
    let store = SledStore::open(&config.data_dir)?;
    let mut wallets = Wallets::open(store.get_db())?;

    // Wallet commands never touch the chain
    match &opt.command {
        Command::Createwallet => {
            let address = wallets.create_wallet()?;
            println!("Your new address: {address}");
            return Ok(());
        }
        Command::ListAddresses => {
            for address in wallets.get_addresses() {
                println!("{address}")
            }
            return Ok(());
        }
        _ => {}
    }

    let alerts = AlertSystem::start(config.alert_history);
    let snapshot = store.load()?.unwrap_or_default();
    let mut manager = ChainManager::restore(
        config,
        snapshot,
        Arc::new(wallets.keyring()),
        alerts.sink(),
    )?;

    match opt.command {
        Command::Createchain { address } => {
            if !validate_address(&address) {
                return Err(format!("Invalid address: {address}").into());
            }
            let genesis = manager.create_genesis(&address)?;
            store.save(&manager.snapshot())?;
            println!("Genesis block: {}", genesis.get_hash());
        }
        Command::GetBalance { address } => {
            if !validate_address(&address) {
                return Err(format!("Invalid address: {address}").into());
            }
            let balance = manager.get_balance(&address);
            println!("Balance of {address}: {balance}");
        }
        Command::Send {
            from,
            to,
            amount,
            miner,
        } => {
            if !validate_address(&to) {
                return Err(format!("Invalid recipient address: {to}").into());
            }
            let wallet = wallets
                .get_wallet(&from)
                .ok_or_else(|| format!("No local wallet for {from}"))?;
            let transaction = wallet.create_transaction(&to, amount)?;
            let tx_id = transaction.get_id().to_string();
            manager.submit_transaction(transaction)?;

            let miner = miner.unwrap_or_else(|| from.clone());
            let block = manager.mine_block(&miner, &CancelToken::new())?;
            store.save(&manager.snapshot())?;
            info!("Transaction {tx_id} confirmed in block {}", block.get_index());
            println!("Success!")
        }
        Command::Printchain => {
            for block in manager.get_blocks().iter().rev() {
                println!("Block {}", block.get_index());
                println!("Pre block hash: {}", block.get_previous_hash());
                println!("Cur block hash: {}", block.get_hash());
                println!("Merkle root: {}", block.get_merkle_root());
                println!("Nonce: {}", block.get_nonce());
                println!("Timestamp: {}", block.get_timestamp());
                for tx in block.get_transactions() {
                    println!("- Transaction {}", tx.get_id());
                    println!(
                        "-- {} -> {}: {}",
                        tx.get_sender(),
                        tx.get_receiver(),
                        tx.get_amount()
                    );
                }
                println!()
            }
        }
        Command::Validate => {
            manager.validate_chain()?;
            println!(
                "Chain of {} blocks is valid, tip {}",
                manager.len(),
                manager.tip_hash().unwrap_or("-")
            );
        }
        Command::Export { path } => {
            let file = JsonFileStore::new(&path);
            file.save(&manager.snapshot())?;
            println!("Exported {} blocks to {}", manager.len(), path.display());
        }
        Command::Createwallet | Command::ListAddresses => {}
    }
    Ok(())
}
