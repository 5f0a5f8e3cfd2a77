//! On-chain state snapshots.
//!
//! Snapshots are read fresh at the start of every action and again after a
//! certain terminal outcome; staleness between actions is expected and
//! tolerated. A refresh always replaces the whole snapshot, never patches it.

use crate::{
    config::ClientConfig,
    error::ReadError,
    ledger::{
        Address,
        CallArg,
        LedgerReader,
        ReadCall,
    },
};
use tracing::warn;

/// Lottery contract state relevant to validation and display.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LotteryState {
    pub bet_price: u128,
    pub bet_fee: u128,
    pub bets_open: bool,
    pub closing_timestamp: u64,
    pub slot_count: u64,
    pub owner: Address,
}

/// Caller-side view of the payment token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenSnapshot {
    pub balance: u128,
    /// Allowance granted to the lottery contract.
    pub allowance: u128,
    pub symbol: String,
}

/// The full presentation-facing bundle handed back with every outcome.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LotterySnapshot {
    pub lottery: LotteryState,
    pub token: TokenSnapshot,
    /// Prize currently withdrawable by the configured account.
    pub prize: u128,
    /// Latest block timestamp at read time.
    pub chain_timestamp: u64,
}

async fn read_uint<R: LedgerReader>(
    reader: &R,
    target: Address,
    function: &'static str,
) -> Result<u128, ReadError> {
    reader.read(target, ReadCall::uint(function)).await?.into_uint()
}

async fn read_uint_u64<R: LedgerReader>(
    reader: &R,
    target: Address,
    function: &'static str,
) -> Result<u64, ReadError> {
    let value = read_uint(reader, target, function).await?;
    u64::try_from(value)
        .map_err(|_| ReadError::Decode(format!("{function} value exceeds u64")))
}

pub async fn fetch_lottery_state<R: LedgerReader>(
    reader: &R,
    lottery: Address,
) -> Result<LotteryState, ReadError> {
    let (bet_price, bet_fee, bets_open, closing_timestamp, slot_count, owner) =
        tokio::try_join!(
            read_uint(reader, lottery, "betPrice"),
            read_uint(reader, lottery, "betFee"),
            async {
                reader
                    .read(lottery, ReadCall::bool("getBetsOpen"))
                    .await?
                    .into_bool()
            },
            read_uint_u64(reader, lottery, "getBetsClosingTime"),
            read_uint_u64(reader, lottery, "getNumberOfSlots"),
            async { reader.read(lottery, ReadCall::addr("owner")).await?.into_addr() },
        )?;
    let state = LotteryState {
        bet_price,
        bet_fee,
        bets_open,
        closing_timestamp,
        slot_count,
        owner,
    };
    // The contract deploys with fee < price; anything else is reported, not
    // trusted and not fatal.
    if state.bet_fee >= state.bet_price {
        warn!(
            bet_price = state.bet_price,
            bet_fee = state.bet_fee,
            "bet fee is not below bet price; lottery state looks inconsistent"
        );
    }
    Ok(state)
}

pub async fn fetch_token_snapshot<R: LedgerReader>(
    reader: &R,
    config: &ClientConfig,
) -> Result<TokenSnapshot, ReadError> {
    let (balance, allowance, symbol) = tokio::try_join!(
        async {
            reader
                .read(
                    config.token,
                    ReadCall::uint("balanceOf")
                        .with_args(vec![CallArg::Addr(config.account)]),
                )
                .await?
                .into_uint()
        },
        async {
            reader
                .read(
                    config.token,
                    ReadCall::uint("allowance").with_args(vec![
                        CallArg::Addr(config.account),
                        CallArg::Addr(config.lottery),
                    ]),
                )
                .await?
                .into_uint()
        },
        async {
            reader
                .read(config.lottery, ReadCall::text("getTokenSymbol"))
                .await?
                .into_text()
        },
    )?;
    Ok(TokenSnapshot {
        balance,
        allowance,
        symbol,
    })
}

pub async fn fetch_prize<R: LedgerReader>(
    reader: &R,
    config: &ClientConfig,
) -> Result<u128, ReadError> {
    reader
        .read(
            config.lottery,
            ReadCall::uint("getPrizeOf").with_args(vec![CallArg::Addr(config.account)]),
        )
        .await?
        .into_uint()
}

/// Reads the whole snapshot in one concurrent batch.
pub async fn fetch_snapshot<R: LedgerReader>(
    reader: &R,
    config: &ClientConfig,
) -> Result<LotterySnapshot, ReadError> {
    let (lottery, token, prize, chain_timestamp) = tokio::try_join!(
        fetch_lottery_state(reader, config.lottery),
        fetch_token_snapshot(reader, config),
        fetch_prize(reader, config),
        reader.block_timestamp(),
    )?;
    Ok(LotterySnapshot {
        lottery,
        token,
        prize,
        chain_timestamp,
    })
}

pub async fn fetch_token_name<R: LedgerReader>(
    reader: &R,
    config: &ClientConfig,
) -> Result<String, ReadError> {
    reader
        .read(config.lottery, ReadCall::text("getTokenName"))
        .await?
        .into_text()
}

pub async fn fetch_payment_token<R: LedgerReader>(
    reader: &R,
    config: &ClientConfig,
) -> Result<Address, ReadError> {
    reader
        .read(config.lottery, ReadCall::addr("getPaymentTokenAddress"))
        .await?
        .into_addr()
}
