//! In-memory scripted ledger for orchestration tests.
//!
//! Reads are answered from a fixed state table; writes are recorded and
//! confirmed, reverted, rejected or timed out according to per-function
//! outcomes. A confirmed `approve` updates the scripted allowance so
//! post-action refreshes see it.

use crate::{
    config::ClientConfig,
    error::{
        ReadError,
        WriteError,
    },
    ledger::{
        Address,
        CallArg,
        CallValue,
        LedgerReader,
        LedgerWriter,
        ReadCall,
        Receipt,
        TxId,
        WriteCall,
    },
};
use std::{
    collections::HashMap,
    sync::Mutex,
    time::Duration,
};

pub fn addr(byte: u8) -> Address {
    Address::new([byte; 20])
}

pub fn test_config() -> ClientConfig {
    ClientConfig {
        rpc_url: "http://localhost:8545".to_string(),
        lottery: addr(0xAA),
        token: addr(0xBB),
        account: addr(0x11),
    }
}

/// How the fake ledger resolves a write to a given function.
#[derive(Clone, Debug)]
pub enum WriteOutcome {
    Confirm,
    Reject(String),
    Revert(Option<String>),
    Timeout,
    /// The confirmation never resolves; the caller stays suspended.
    Pending,
}

/// One recorded state-changing call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmittedCall {
    pub target: Address,
    pub function: &'static str,
    pub args: Vec<CallArg>,
    pub value: u128,
}

struct Inner {
    bet_price: u128,
    bet_fee: u128,
    bets_open: bool,
    closing_timestamp: u64,
    slot_count: u64,
    owner: Address,
    symbol: String,
    token_name: String,
    token_address: Address,
    balance: u128,
    allowance: u128,
    prize: u128,
    chain_timestamp: u64,
    read_errors: HashMap<&'static str, ReadError>,
    outcomes: HashMap<&'static str, WriteOutcome>,
    submitted: Vec<SubmittedCall>,
    pending: HashMap<TxId, &'static str>,
    next_tx: u8,
}

pub struct FakeLedger {
    inner: Mutex<Inner>,
}

impl Default for FakeLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeLedger {
    pub fn new() -> Self {
        let config = test_config();
        Self {
            inner: Mutex::new(Inner {
                bet_price: 100,
                bet_fee: 5,
                bets_open: true,
                closing_timestamp: 2_000,
                slot_count: 3,
                owner: addr(0x99),
                symbol: "LT0".to_string(),
                token_name: "Lottery Token".to_string(),
                token_address: config.token,
                balance: 1_000,
                allowance: 0,
                prize: 0,
                chain_timestamp: 1_000,
                read_errors: HashMap::new(),
                outcomes: HashMap::new(),
                submitted: Vec::new(),
                pending: HashMap::new(),
                next_tx: 0,
            }),
        }
    }

    pub fn with_bet_price(self, bet_price: u128) -> Self {
        self.inner.lock().unwrap().bet_price = bet_price;
        self
    }

    pub fn with_bet_fee(self, bet_fee: u128) -> Self {
        self.inner.lock().unwrap().bet_fee = bet_fee;
        self
    }

    pub fn with_bets_open(self, bets_open: bool) -> Self {
        self.inner.lock().unwrap().bets_open = bets_open;
        self
    }

    pub fn with_closing_timestamp(self, closing_timestamp: u64) -> Self {
        self.inner.lock().unwrap().closing_timestamp = closing_timestamp;
        self
    }

    pub fn with_chain_timestamp(self, chain_timestamp: u64) -> Self {
        self.inner.lock().unwrap().chain_timestamp = chain_timestamp;
        self
    }

    pub fn with_owner(self, owner: Address) -> Self {
        self.inner.lock().unwrap().owner = owner;
        self
    }

    pub fn with_balance(self, balance: u128) -> Self {
        self.inner.lock().unwrap().balance = balance;
        self
    }

    pub fn with_allowance(self, allowance: u128) -> Self {
        self.inner.lock().unwrap().allowance = allowance;
        self
    }

    pub fn with_prize(self, prize: u128) -> Self {
        self.inner.lock().unwrap().prize = prize;
        self
    }

    pub fn with_outcome(self, function: &'static str, outcome: WriteOutcome) -> Self {
        self.inner.lock().unwrap().outcomes.insert(function, outcome);
        self
    }

    pub fn with_read_error(self, function: &'static str, error: ReadError) -> Self {
        self.inner.lock().unwrap().read_errors.insert(function, error);
        self
    }

    pub fn submitted(&self) -> Vec<SubmittedCall> {
        self.inner.lock().unwrap().submitted.clone()
    }

    pub fn submitted_functions(&self) -> Vec<&'static str> {
        self.inner
            .lock()
            .unwrap()
            .submitted
            .iter()
            .map(|call| call.function)
            .collect()
    }

    pub fn allowance(&self) -> u128 {
        self.inner.lock().unwrap().allowance
    }
}

impl LedgerReader for FakeLedger {
    async fn read(
        &self,
        _target: Address,
        call: ReadCall,
    ) -> Result<CallValue, ReadError> {
        let inner = self.inner.lock().unwrap();
        if let Some(error) = inner.read_errors.get(call.function) {
            return Err(error.clone());
        }
        match call.function {
            "betPrice" => Ok(CallValue::Uint(inner.bet_price)),
            "betFee" => Ok(CallValue::Uint(inner.bet_fee)),
            "getBetsOpen" => Ok(CallValue::Bool(inner.bets_open)),
            "getBetsClosingTime" => {
                Ok(CallValue::Uint(u128::from(inner.closing_timestamp)))
            }
            "getNumberOfSlots" => Ok(CallValue::Uint(u128::from(inner.slot_count))),
            "owner" => Ok(CallValue::Addr(inner.owner)),
            "getTokenSymbol" => Ok(CallValue::Text(inner.symbol.clone())),
            "getTokenName" => Ok(CallValue::Text(inner.token_name.clone())),
            "getPaymentTokenAddress" => Ok(CallValue::Addr(inner.token_address)),
            "balanceOf" => Ok(CallValue::Uint(inner.balance)),
            "allowance" => Ok(CallValue::Uint(inner.allowance)),
            "getPrizeOf" => Ok(CallValue::Uint(inner.prize)),
            other => Err(ReadError::Decode(format!("unexpected read of {other}"))),
        }
    }

    async fn block_timestamp(&self) -> Result<u64, ReadError> {
        let inner = self.inner.lock().unwrap();
        if let Some(error) = inner.read_errors.get("blockTimestamp") {
            return Err(error.clone());
        }
        Ok(inner.chain_timestamp)
    }
}

impl LedgerWriter for FakeLedger {
    async fn submit(
        &self,
        target: Address,
        call: WriteCall,
    ) -> Result<TxId, WriteError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(WriteOutcome::Reject(message)) = inner.outcomes.get(call.function) {
            return Err(WriteError::Submission(message.clone()));
        }
        inner.next_tx += 1;
        let tx_id = TxId::new([inner.next_tx; 32]);
        inner.pending.insert(tx_id, call.function);
        inner.submitted.push(SubmittedCall {
            target,
            function: call.function,
            args: call.args,
            value: call.value,
        });
        Ok(tx_id)
    }

    async fn await_confirmation(
        &self,
        tx_id: TxId,
        _poll_interval: Duration,
        timeout: Duration,
    ) -> Result<Receipt, WriteError> {
        let mut inner = self.inner.lock().unwrap();
        let function = inner
            .pending
            .remove(&tx_id)
            .ok_or_else(|| WriteError::Submission("unknown transaction".to_string()))?;
        let outcome = inner
            .outcomes
            .get(function)
            .cloned()
            .unwrap_or(WriteOutcome::Confirm);
        match outcome {
            WriteOutcome::Confirm => {
                if function == "approve" {
                    let approved = inner
                        .submitted
                        .iter()
                        .rev()
                        .find(|call| call.function == "approve")
                        .and_then(|call| call.args.get(1).cloned());
                    if let Some(CallArg::Uint(amount)) = approved {
                        inner.allowance = amount;
                    }
                }
                Ok(Receipt {
                    tx_id,
                    block_number: u64::from(inner.next_tx),
                })
            }
            WriteOutcome::Reject(message) => Err(WriteError::Submission(message)),
            WriteOutcome::Revert(reason) => Err(WriteError::Reverted { reason }),
            WriteOutcome::Timeout => Err(WriteError::Timeout { waited: timeout }),
            WriteOutcome::Pending => {
                // Release the lock before suspending so other calls proceed.
                drop(inner);
                std::future::pending().await
            }
        }
    }
}
