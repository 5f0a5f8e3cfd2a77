use clap::{
    Parser,
    Subcommand,
};
use color_eyre::eyre::{
    Result,
    eyre,
};
use lottery_client::{
    Action,
    ClientConfig,
    EthRpcClient,
    LotterySnapshot,
    OperationStatus,
    Orchestrator,
    ledger::Address,
    snapshot,
    units,
};
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;

const DEFAULT_RPC_URL: &str = "http://localhost:8545";

#[derive(Parser, Debug)]
#[command(
    name = "lottery-client",
    about = "Place bets and manage a ledger lottery from the command line",
    version
)]
struct Args {
    /// JSON-RPC endpoint of the node
    #[arg(long, default_value = DEFAULT_RPC_URL)]
    rpc_url: String,

    /// Lottery contract address
    #[arg(long)]
    lottery: String,

    /// Payment token contract address
    #[arg(long)]
    token: String,

    /// Account to act as (must be unlocked on the node)
    #[arg(long)]
    account: String,

    /// Seconds to keep polling for a confirmation before reporting unknown
    #[arg(long, default_value_t = 120)]
    confirmation_timeout: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show lottery, token and prize state
    Info,
    /// Place a single bet
    Bet,
    /// Place several bets in one transaction
    BetMany {
        /// Number of bets, a positive integer
        count: u64,
    },
    /// Buy payment tokens with native currency
    Buy {
        /// Native amount to spend, decimal units
        amount: String,
    },
    /// Return payment tokens for native currency
    Return {
        /// Token amount to return, decimal units
        amount: String,
    },
    /// Withdraw accumulated prize
    WithdrawPrize {
        /// Token amount to withdraw, decimal units
        amount: String,
    },
    /// Open a betting round (owner only)
    OpenBets {
        /// Betting window length in seconds
        duration: u64,
    },
    /// Close the current round (owner only)
    CloseLottery,
    /// Withdraw collected fees (owner only)
    OwnerWithdraw {
        /// Token amount to withdraw, decimal units
        amount: String,
    },
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn parse_address(input: &str, what: &str) -> Result<Address> {
    input
        .parse()
        .map_err(|err| eyre!("invalid {what} address: {err}"))
}

fn parse_amount(input: &str) -> Result<u128> {
    units::parse_units(input, units::TOKEN_DECIMALS).map_err(|err| eyre!("{err}"))
}

fn print_snapshot(snapshot: &LotterySnapshot) {
    let decimals = units::TOKEN_DECIMALS;
    println!("Bet price:     {} {}", units::format_units(snapshot.lottery.bet_price, decimals), snapshot.token.symbol);
    println!("Bet fee:       {} {}", units::format_units(snapshot.lottery.bet_fee, decimals), snapshot.token.symbol);
    println!("Bets open:     {}", if snapshot.lottery.bets_open { "yes" } else { "no" });
    if snapshot.lottery.bets_open {
        let closing = chrono::DateTime::from_timestamp(
            snapshot.lottery.closing_timestamp as i64,
            0,
        )
        .map(|at| at.to_rfc2822())
        .unwrap_or_else(|| snapshot.lottery.closing_timestamp.to_string());
        println!("Closing time:  {closing}");
    }
    println!("Players:       {}", snapshot.lottery.slot_count);
    println!("Your balance:  {} {}", units::format_units(snapshot.token.balance, decimals), snapshot.token.symbol);
    println!("Your prize:    {} {}", units::format_units(snapshot.prize, decimals), snapshot.token.symbol);
}

async fn print_info(
    orchestrator: &Orchestrator<EthRpcClient>,
    config: &ClientConfig,
) -> Result<()> {
    let reader = orchestrator.ledger();
    let snapshot = orchestrator.snapshot().await?;
    let token_name = snapshot::fetch_token_name(reader, config).await?;
    let payment_token = snapshot::fetch_payment_token(reader, config).await?;
    if payment_token != config.token {
        warn!(
            configured = %config.token,
            contract = %payment_token,
            "configured token address does not match the contract's payment token"
        );
    }
    println!("Lottery:       {}", config.lottery);
    println!("Token:         {token_name} ({}) at {}", snapshot.token.symbol, payment_token);
    print_snapshot(&snapshot);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();
    let args = Args::parse();

    let config = ClientConfig {
        rpc_url: args.rpc_url.clone(),
        lottery: parse_address(&args.lottery, "lottery")?,
        token: parse_address(&args.token, "token")?,
        account: parse_address(&args.account, "account")?,
    };
    let ledger = EthRpcClient::new(&config.rpc_url, config.account)
        .map_err(|err| eyre!("{err}"))?;
    let mut orchestrator = Orchestrator::new(ledger, config.clone())
        .with_confirmation_timeout(Duration::from_secs(args.confirmation_timeout));

    let action = match args.command {
        Command::Info => {
            return print_info(&orchestrator, &config).await;
        }
        Command::Bet => Action::BetOnce,
        Command::BetMany { count } => Action::BetMany { count },
        Command::Buy { amount } => Action::BuyTokens {
            amount: parse_amount(&amount)?,
        },
        Command::Return { amount } => Action::ReturnTokens {
            amount: parse_amount(&amount)?,
        },
        Command::WithdrawPrize { amount } => Action::WithdrawPrize {
            amount: parse_amount(&amount)?,
        },
        Command::OpenBets { duration } => Action::OpenBets {
            duration_secs: duration,
        },
        Command::CloseLottery => Action::CloseLottery,
        Command::OwnerWithdraw { amount } => Action::OwnerWithdraw {
            amount: parse_amount(&amount)?,
        },
    };

    let kind = action.kind();
    let outcome = orchestrator.execute(action).await;

    match outcome.operation.status {
        OperationStatus::Succeeded => {
            if let Some(tx_id) = outcome.operation.primary_tx {
                println!("{kind} succeeded ({tx_id})");
            } else {
                println!("{kind} succeeded");
            }
        }
        OperationStatus::Unknown => {
            if let Some(tx_id) = outcome.operation.primary_tx {
                println!(
                    "{kind} outcome unknown; transaction {tx_id} may still confirm; check it before retrying"
                );
            } else if let Some(tx_id) = outcome.operation.authorization_tx {
                println!(
                    "{kind} outcome unknown; approval {tx_id} may still confirm; check it before retrying"
                );
            }
        }
        _ => {
            let message = outcome
                .operation
                .error
                .map(|err| err.to_string())
                .unwrap_or_else(|| "unknown failure".to_string());
            if let Some(snapshot) = &outcome.snapshot {
                print_snapshot(snapshot);
            }
            return Err(eyre!("{kind} failed: {message}"));
        }
    }

    if let Some(snapshot) = &outcome.snapshot {
        print_snapshot(snapshot);
    }
    Ok(())
}
