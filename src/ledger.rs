//! Typed facades over the remote ledger.
//!
//! `LedgerReader` is the stateless query surface, `LedgerWriter` submits
//! state-changing calls and waits for confirmation receipts. The orchestrator
//! is generic over both so tests can script a ledger in memory while the
//! binary talks JSON-RPC.

use crate::error::{
    ReadError,
    WriteError,
};
use std::{
    error::Error,
    fmt,
    str::FromStr,
    time::Duration,
};

/// 20-byte account or contract identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address([u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for Address {
    type Err = HexParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        decode_fixed(input, "address").map(Address)
    }
}

/// 32-byte transaction hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxId([u8; 32]);

impl TxId {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for TxId {
    type Err = HexParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        decode_fixed(input, "transaction id").map(TxId)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HexParseError {
    what: &'static str,
    input: String,
}

impl fmt::Display for HexParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: {:?}", self.what, self.input)
    }
}

impl Error for HexParseError {}

fn decode_fixed<const N: usize>(
    input: &str,
    what: &'static str,
) -> Result<[u8; N], HexParseError> {
    let raw = input.strip_prefix("0x").unwrap_or(input);
    let parse_error = || HexParseError {
        what,
        input: input.to_string(),
    };
    let bytes = hex::decode(raw).map_err(|_| parse_error())?;
    bytes.try_into().map_err(|_| parse_error())
}

/// Argument of a contract call. Amounts are smallest-unit integers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallArg {
    Uint(u128),
    Addr(Address),
}

/// Return type a read expects; mismatches surface as `ReadError::Decode`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueKind {
    Uint,
    Bool,
    Addr,
    Text,
}

/// Decoded return value of a read call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallValue {
    Uint(u128),
    Bool(bool),
    Addr(Address),
    Text(String),
}

impl CallValue {
    pub fn into_uint(self) -> Result<u128, ReadError> {
        match self {
            CallValue::Uint(value) => Ok(value),
            other => Err(ReadError::Decode(format!("expected uint, got {other:?}"))),
        }
    }

    pub fn into_bool(self) -> Result<bool, ReadError> {
        match self {
            CallValue::Bool(value) => Ok(value),
            other => Err(ReadError::Decode(format!("expected bool, got {other:?}"))),
        }
    }

    pub fn into_addr(self) -> Result<Address, ReadError> {
        match self {
            CallValue::Addr(value) => Ok(value),
            other => {
                Err(ReadError::Decode(format!("expected address, got {other:?}")))
            }
        }
    }

    pub fn into_text(self) -> Result<String, ReadError> {
        match self {
            CallValue::Text(value) => Ok(value),
            other => {
                Err(ReadError::Decode(format!("expected string, got {other:?}")))
            }
        }
    }
}

/// A side-effect-free contract query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadCall {
    pub function: &'static str,
    pub args: Vec<CallArg>,
    pub ret: ValueKind,
}

impl ReadCall {
    pub fn uint(function: &'static str) -> Self {
        Self::new(function, ValueKind::Uint)
    }

    pub fn bool(function: &'static str) -> Self {
        Self::new(function, ValueKind::Bool)
    }

    pub fn addr(function: &'static str) -> Self {
        Self::new(function, ValueKind::Addr)
    }

    pub fn text(function: &'static str) -> Self {
        Self::new(function, ValueKind::Text)
    }

    pub fn with_args(mut self, args: Vec<CallArg>) -> Self {
        self.args = args;
        self
    }

    fn new(function: &'static str, ret: ValueKind) -> Self {
        Self {
            function,
            args: Vec::new(),
            ret,
        }
    }
}

/// A state-changing contract call. `value` is native currency attached to
/// the call, smallest unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteCall {
    pub function: &'static str,
    pub args: Vec<CallArg>,
    pub value: u128,
}

impl WriteCall {
    pub fn new(function: &'static str) -> Self {
        Self {
            function,
            args: Vec::new(),
            value: 0,
        }
    }

    pub fn with_args(mut self, args: Vec<CallArg>) -> Self {
        self.args = args;
        self
    }

    pub fn with_value(mut self, value: u128) -> Self {
        self.value = value;
        self
    }
}

/// Confirmation receipt of a successfully mined transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Receipt {
    pub tx_id: TxId,
    pub block_number: u64,
}

pub trait LedgerReader {
    /// Runs a read call against `target` and decodes the result. No retries;
    /// the orchestrator decides what a failure means.
    async fn read(&self, target: Address, call: ReadCall)
    -> Result<CallValue, ReadError>;

    /// Timestamp of the latest block. The remote `now` for every time
    /// comparison; local wall clock is never authoritative.
    async fn block_timestamp(&self) -> Result<u64, ReadError>;
}

pub trait LedgerWriter {
    /// Submits a signed state-changing call. A `Submission` failure is
    /// terminal and never retried.
    async fn submit(&self, target: Address, call: WriteCall)
    -> Result<TxId, WriteError>;

    /// Polls for the confirmation receipt of `tx_id`. `Reverted` means mined
    /// and rolled back; `Timeout` means the outcome is unknown.
    async fn await_confirmation(
        &self,
        tx_id: TxId,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Result<Receipt, WriteError>;
}
