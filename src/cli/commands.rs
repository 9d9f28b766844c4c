use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "crypto-ledger")]
pub struct Opt {
    #[arg(
        long = "config",
        global = true,
        help = "TOML file overriding the default ledger settings"
    )]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(name = "createchain", about = "Create the genesis block")]
    Createchain {
        #[arg(help = "The address to send the genesis reward to")]
        address: String,
    },
    #[command(name = "createwallet", about = "Create a new wallet")]
    Createwallet,
    #[command(name = "listaddresses", about = "Print local wallet addresses")]
    ListAddresses,
    #[command(
        name = "getbalance",
        about = "Get the balance of the target address"
    )]
    GetBalance {
        #[arg(help = "The wallet address")]
        address: String,
    },
    #[command(
        name = "send",
        about = "Sign a transfer, admit it and mine it into a block"
    )]
    Send {
        #[arg(help = "Source wallet address")]
        from: String,
        #[arg(help = "Destination address")]
        to: String,
        #[arg(help = "Amount to send")]
        amount: u64,
        #[arg(
            long = "miner",
            help = "Address receiving the block reward (defaults to the sender)"
        )]
        miner: Option<String>,
    },
    #[command(name = "printchain", about = "Print all blocks in the chain")]
    Printchain,
    #[command(name = "validate", about = "Check every block link, hash and proof")]
    Validate,
    #[command(name = "export", about = "Write the chain to a JSON snapshot file")]
    Export {
        #[arg(help = "Destination file")]
        path: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_send_with_miner() {
        let opt = Opt::try_parse_from([
            "crypto-ledger",
            "send",
            "alice",
            "bob",
            "5",
            "--miner",
            "carol",
        ])
        .unwrap();
        match opt.command {
            Command::Send {
                from,
                to,
                amount,
                miner,
            } => {
                assert_eq!(from, "alice");
                assert_eq!(to, "bob");
                assert_eq!(amount, 5);
                assert_eq!(miner.as_deref(), Some("carol"));
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert!(opt.config.is_none());
    }

    #[test]
    fn test_global_config_flag() {
        let opt =
            Opt::try_parse_from(["crypto-ledger", "validate", "--config", "ledger.toml"]).unwrap();
        assert_eq!(opt.config, Some(PathBuf::from("ledger.toml")));
        assert!(matches!(opt.command, Command::Validate));
    }

    #[test]
    fn test_rejects_negative_amount() {
        assert!(Opt::try_parse_from(["crypto-ledger", "send", "a", "b", "-1"]).is_err());
    }
}
