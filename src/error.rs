//! Error taxonomy for the orchestration core.
//!
//! Read-path failures (`ReadError`) abort an action before any write is
//! attempted. Write-path failures (`WriteError`) are terminal per call; a
//! confirmation timeout is the one outcome that is not known to be terminal
//! and maps to the `Unknown` operation status rather than `Failed`.

use crate::ledger::Address;
use std::{
    error::Error,
    fmt,
    time::Duration,
};

/// Failure of a side-effect-free ledger query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReadError {
    /// Transport or node failure. The orchestrator decides whether to retry.
    Rpc(String),
    /// The returned bytes did not match the expected type.
    Decode(String),
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadError::Rpc(msg) => write!(f, "rpc error: {msg}"),
            ReadError::Decode(msg) => write!(f, "decode error: {msg}"),
        }
    }
}

impl Error for ReadError {}

/// Failure of a state-changing ledger call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WriteError {
    /// Signer or node rejected the call before mining. Never retried.
    Submission(String),
    /// The transaction was mined and rolled back.
    Reverted { reason: Option<String> },
    /// No confirmation observed within the polling budget. The transaction
    /// may still land; the outcome is unknown, not failed.
    Timeout { waited: Duration },
}

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteError::Submission(msg) => {
                write!(f, "submission rejected: {msg}")
            }
            WriteError::Reverted { reason: Some(reason) } => {
                write!(f, "transaction reverted: {reason}")
            }
            WriteError::Reverted { reason: None } => {
                write!(f, "transaction reverted")
            }
            WriteError::Timeout { waited } => {
                write!(f, "no confirmation within {waited:?}")
            }
        }
    }
}

impl Error for WriteError {}

/// A client-checkable condition that failed during `Validating`. Nothing was
/// submitted to the chain; each variant names the check that failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PreconditionFailure {
    BetsNotOpen,
    BettingWindowClosed { now: u64, closing_timestamp: u64 },
    InsufficientBalance { balance: u128, required: u128 },
    InsufficientPrize { requested: u128, available: u128 },
    NonPositiveAmount,
    NotOwner { caller: Address, owner: Address },
    AmountOverflow,
}

impl fmt::Display for PreconditionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreconditionFailure::BetsNotOpen => {
                write!(f, "bets are not open")
            }
            PreconditionFailure::BettingWindowClosed {
                now,
                closing_timestamp,
            } => write!(
                f,
                "betting window closed (chain time {now}, closing time {closing_timestamp})"
            ),
            PreconditionFailure::InsufficientBalance { balance, required } => {
                write!(
                    f,
                    "insufficient token balance ({balance} available, {required} required)"
                )
            }
            PreconditionFailure::InsufficientPrize {
                requested,
                available,
            } => write!(
                f,
                "requested prize {requested} exceeds available prize {available}"
            ),
            PreconditionFailure::NonPositiveAmount => {
                write!(f, "amount must be greater than zero")
            }
            PreconditionFailure::NotOwner { caller, owner } => {
                write!(f, "caller {caller} is not the contract owner {owner}")
            }
            PreconditionFailure::AmountOverflow => {
                write!(f, "amount arithmetic overflowed")
            }
        }
    }
}

impl Error for PreconditionFailure {}

/// Terminal error of one orchestrated action. Authorization-step errors are
/// tagged apart from primary-call errors so a caller knows whether a spend
/// authorization now exists even though the action itself failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionError {
    Precondition(PreconditionFailure),
    Read(ReadError),
    Authorization(WriteError),
    Primary(WriteError),
    AlreadyRunning,
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionError::Precondition(failure) => {
                write!(f, "precondition failed: {failure}")
            }
            ActionError::Read(err) => write!(f, "state read failed: {err}"),
            ActionError::Authorization(err) => {
                write!(f, "spend authorization failed: {err}")
            }
            ActionError::Primary(err) => write!(f, "primary call failed: {err}"),
            ActionError::AlreadyRunning => {
                write!(f, "another operation is still in flight")
            }
        }
    }
}

impl Error for ActionError {}

impl From<PreconditionFailure> for ActionError {
    fn from(failure: PreconditionFailure) -> Self {
        ActionError::Precondition(failure)
    }
}

impl From<ReadError> for ActionError {
    fn from(err: ReadError) -> Self {
        ActionError::Read(err)
    }
}
