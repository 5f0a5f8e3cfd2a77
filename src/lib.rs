#![allow(async_fn_in_trait)]

pub mod actions;
pub mod config;
pub mod error;
pub mod ledger;
pub mod orchestrator;
pub mod rpc;
pub mod snapshot;
pub mod units;

pub mod test_helpers;

pub use actions::{
    Action,
    ActionKind,
};
pub use config::ClientConfig;
pub use error::{
    ActionError,
    PreconditionFailure,
    ReadError,
    WriteError,
};
pub use ledger::{
    Address,
    LedgerReader,
    LedgerWriter,
    TxId,
};
pub use orchestrator::{
    OperationStatus,
    Orchestrator,
    Outcome,
    PendingOperation,
};
pub use rpc::EthRpcClient;
pub use snapshot::{
    LotterySnapshot,
    LotteryState,
    TokenSnapshot,
};
