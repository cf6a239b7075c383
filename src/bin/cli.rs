use alloy::primitives::{Address, Bytes, B256};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use evm_actions::actions::transaction_status;
use evm_actions::{
    wallet_context, BalancesProvider, BridgeAction, BridgeParams, ChainRegistry, Config,
    GasEstimate, PluginContext, Settings, SwapAction, SwapParams, Transaction, TransferAction,
    TransferParams,
};

#[derive(Parser, Debug)]
#[command(name = "evm-actions")]
#[command(about = "Transfer, swap and bridge tokens from an EVM wallet", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List supported chains
    Chains,
    /// Show the wallet address, balance and active chain
    Status,
    /// Token balances on one or more chains
    Balances {
        #[arg(short, long, value_delimiter = ',', default_value = "sepolia")]
        chains: Vec<String>,
    },
    /// Send native currency
    Transfer {
        #[arg(short, long)]
        chain: String,
        #[arg(short, long)]
        to: Address,
        /// Amount in ether
        #[arg(short, long)]
        amount: String,
        #[arg(long)]
        data: Option<Bytes>,
    },
    /// Swap tokens on one chain
    Swap {
        #[arg(short, long)]
        chain: String,
        #[arg(long)]
        from_token: Address,
        #[arg(long)]
        to_token: Address,
        #[arg(short, long)]
        amount: String,
        /// Slippage as a fraction, e.g. 0.01
        #[arg(long)]
        slippage: Option<f64>,
        /// Only estimate gas for the first transaction
        #[arg(long)]
        estimate: bool,
    },
    /// Bridge tokens across chains
    Bridge {
        #[arg(long)]
        from_chain: String,
        #[arg(long)]
        to_chain: String,
        #[arg(long)]
        from_token: Address,
        #[arg(long)]
        to_token: Address,
        #[arg(short, long)]
        amount: String,
        #[arg(long)]
        to_address: Option<Address>,
        #[arg(long)]
        estimate: bool,
    },
    /// Receipt status of a transaction
    TxStatus {
        #[arg(short, long)]
        chain: String,
        hash: B256,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let args = Args::parse();
    let config = Config::load()?;
    let settings = Settings::from_env(&config);

    match args.command {
        Command::Chains => {
            let registry = ChainRegistry::load(&settings)?;
            println!("{:14} | {:>10} | {:20} | RPC", "Chain", "Chain ID", "Name");
            println!("{}", "=".repeat(80));
            for chain in registry.iter() {
                println!(
                    "{:14} | {:>10} | {:20} | {}",
                    chain.id, chain.chain_id, chain.name, chain.rpc_url
                );
            }
        }
        Command::Status => {
            let ctx = connect(settings)?;
            println!("{}", wallet_context(&ctx.wallet).await);
        }
        Command::Balances { chains } => {
            let ctx = connect(settings)?;
            let balances = BalancesProvider::new(&ctx.wallet, ctx.prices.as_ref())
                .wallet_balances(&chains)
                .await?;
            println!("Address: {}\n", ctx.wallet.address());
            for chain in balances {
                println!("Chain: {} (total ${})", chain.chain, chain.total_value_usd);
                println!("{}", "=".repeat(60));
                for token in chain.tokens {
                    println!(
                        "{:6} | {:>20} | ${:>12.2}",
                        token.symbol,
                        token.formatted_balance(),
                        token.value_usd
                    );
                }
                println!("{}", "=".repeat(60));
            }
        }
        Command::Transfer {
            chain,
            to,
            amount,
            data,
        } => {
            let mut ctx = connect(settings)?;
            let tx = TransferAction::new(&mut ctx.wallet)
                .transfer(TransferParams {
                    from_chain: chain,
                    to_address: to,
                    amount,
                    data,
                })
                .await?;
            print_transaction(&ctx, &tx);
        }
        Command::Swap {
            chain,
            from_token,
            to_token,
            amount,
            slippage,
            estimate,
        } => {
            let mut ctx = connect(settings)?;
            let params = SwapParams {
                chain,
                from_token,
                to_token,
                amount,
                slippage,
            };
            let mut action = SwapAction::new(&mut ctx.wallet, ctx.router.as_ref())
                .with_executor(ctx.executor.clone());
            if estimate {
                print_estimate(&action.estimate_gas(&params).await?);
            } else {
                let tx = action.swap(params).await?;
                print_transaction(&ctx, &tx);
            }
        }
        Command::Bridge {
            from_chain,
            to_chain,
            from_token,
            to_token,
            amount,
            to_address,
            estimate,
        } => {
            let mut ctx = connect(settings)?;
            let params = BridgeParams {
                from_chain,
                to_chain,
                from_token,
                to_token,
                amount,
                to_address,
            };
            let mut action = BridgeAction::new(&mut ctx.wallet, ctx.router.as_ref())
                .with_executor(ctx.executor.clone());
            if estimate {
                print_estimate(&action.estimate_gas(&params).await?);
            } else {
                let tx = action.bridge(params.clone()).await?;
                let status = action.bridge_status(tx.hash, &params).await?;
                print_transaction(&ctx, &tx);
                println!("Bridge:  {status:?}");
            }
        }
        Command::TxStatus { chain, hash } => {
            let ctx = connect(settings)?;
            let status = transaction_status(&ctx.wallet, hash, &chain).await?;
            println!("{hash}: {status}");
        }
    }

    Ok(())
}

fn connect(settings: Settings) -> Result<PluginContext> {
    PluginContext::from_settings(settings).context("failed to set up wallet")
}

fn print_transaction(ctx: &PluginContext, tx: &Transaction) {
    println!("Hash:    {}", tx.hash);
    println!("From:    {}", tx.from);
    println!("To:      {}", tx.to);
    println!("Value:   {}", tx.value);
    let explorer = tx
        .chain_id
        .and_then(|id| ctx.wallet.registry().by_chain_id(id));
    if let Some(chain) = explorer {
        println!("Explorer: {}", chain.explorer_tx_url(tx.hash));
    }
}

fn print_estimate(estimate: &GasEstimate) {
    match estimate {
        GasEstimate::Estimated(gas) => println!("Estimated gas: {gas}"),
        GasEstimate::Unavailable { reason } => println!("Gas estimate unavailable: {reason}"),
    }
}
