//! The transaction orchestrator.
//!
//! Every action runs the same pipeline: snapshot state, validate
//! preconditions, authorize the spend when the allowance falls short, submit
//! the primary call, await confirmation, refresh the snapshot. The pipeline
//! is the state machine
//! `Idle → Validating → [Authorizing] → Submitting → Confirming →
//! Succeeded | Failed | Unknown`; all failures come back as a terminal
//! `PendingOperation`, never as a raw error.

use crate::{
    actions::{
        Action,
        ActionKind,
        ValidationState,
    },
    config::ClientConfig,
    error::{
        ActionError,
        ReadError,
        WriteError,
    },
    ledger::{
        CallArg,
        LedgerReader,
        LedgerWriter,
        TxId,
        WriteCall,
    },
    snapshot::{
        self,
        LotterySnapshot,
    },
};
use std::{
    fmt,
    time::Duration,
};
use tokio::sync::mpsc;
use tracing::{
    error,
    info,
    warn,
};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationStatus {
    Idle,
    Validating,
    Authorizing,
    Submitting,
    Confirming,
    Succeeded,
    Failed,
    /// Confirmation was not observed within the budget. The transaction may
    /// still land; retrying blindly could double-spend.
    Unknown,
}

impl OperationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OperationStatus::Succeeded
                | OperationStatus::Failed
                | OperationStatus::Unknown
        )
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationStatus::Idle => "idle",
            OperationStatus::Validating => "validating",
            OperationStatus::Authorizing => "authorizing",
            OperationStatus::Submitting => "submitting",
            OperationStatus::Confirming => "confirming",
            OperationStatus::Succeeded => "succeeded",
            OperationStatus::Failed => "failed",
            OperationStatus::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// One in-flight user action. Created at action start, mutated through the
/// state machine, discarded once its terminal state has been reported.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingOperation {
    pub kind: ActionKind,
    pub status: OperationStatus,
    pub authorization_tx: Option<TxId>,
    pub primary_tx: Option<TxId>,
    pub error: Option<ActionError>,
}

impl PendingOperation {
    fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            status: OperationStatus::Idle,
            authorization_tx: None,
            primary_tx: None,
            error: None,
        }
    }
}

/// Final report of one orchestrated action. `snapshot` is refreshed after
/// `Succeeded` and `Failed`; an `Unknown` outcome keeps the validation-time
/// snapshot, and a failure before the first read completes carries none.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outcome {
    pub snapshot: Option<LotterySnapshot>,
    pub operation: PendingOperation,
}

pub struct Orchestrator<L> {
    ledger: L,
    config: ClientConfig,
    poll_interval: Duration,
    confirmation_timeout: Duration,
    progress: Option<mpsc::UnboundedSender<PendingOperation>>,
    in_flight: bool,
}

impl<L> Orchestrator<L> {
    pub fn new(ledger: L, config: ClientConfig) -> Self {
        Self {
            ledger,
            config,
            poll_interval: DEFAULT_POLL_INTERVAL,
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
            progress: None,
            in_flight: false,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_confirmation_timeout(mut self, timeout: Duration) -> Self {
        self.confirmation_timeout = timeout;
        self
    }

    /// Opens the progress channel. Every rendering-relevant transition of the
    /// running operation is pushed on it.
    pub fn progress_channel(&mut self) -> mpsc::UnboundedReceiver<PendingOperation> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.progress = Some(sender);
        receiver
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    fn transition(&self, operation: &mut PendingOperation, status: OperationStatus) {
        operation.status = status;
        info!(kind = %operation.kind, %status, "operation state");
        self.report(operation);
    }

    fn report(&self, operation: &PendingOperation) {
        if let Some(progress) = &self.progress {
            let _ = progress.send(operation.clone());
        }
    }
}

impl<L: LedgerReader + LedgerWriter> Orchestrator<L> {
    /// Reads a fresh snapshot outside of any action.
    pub async fn snapshot(&self) -> Result<LotterySnapshot, ReadError> {
        snapshot::fetch_snapshot(&self.ledger, &self.config).await
    }

    /// Runs one action through the full pipeline to a terminal state.
    ///
    /// Re-entrancy is rejected, not queued: a second call while an operation
    /// is non-terminal fails with `AlreadyRunning` and submits nothing.
    pub async fn execute(&mut self, action: Action) -> Outcome {
        let mut operation = PendingOperation::new(action.kind());
        if self.in_flight {
            operation.error = Some(ActionError::AlreadyRunning);
            self.transition(&mut operation, OperationStatus::Failed);
            return Outcome {
                snapshot: None,
                operation,
            };
        }
        self.in_flight = true;

        let mut validation_snapshot = None;
        let result = self
            .run_pipeline(&action, &mut operation, &mut validation_snapshot)
            .await;

        match result {
            Ok(()) => {
                self.transition(&mut operation, OperationStatus::Succeeded);
            }
            Err(err) => {
                let status = match &err {
                    ActionError::Authorization(WriteError::Timeout { .. })
                    | ActionError::Primary(WriteError::Timeout { .. }) => {
                        OperationStatus::Unknown
                    }
                    _ => OperationStatus::Failed,
                };
                if status == OperationStatus::Unknown {
                    warn!(
                        kind = %operation.kind,
                        %err,
                        "confirmation timed out; outcome unknown; check the pending transaction before retrying"
                    );
                } else {
                    error!(kind = %operation.kind, %err, "action failed");
                }
                operation.error = Some(err);
                self.transition(&mut operation, status);
            }
        }

        // Refresh only once the outcome is certain; an unknown outcome keeps
        // the validation-time snapshot.
        let snapshot = match operation.status {
            OperationStatus::Succeeded | OperationStatus::Failed => {
                match snapshot::fetch_snapshot(&self.ledger, &self.config).await {
                    Ok(fresh) => Some(fresh),
                    Err(err) => {
                        warn!(%err, "post-action snapshot refresh failed");
                        validation_snapshot
                    }
                }
            }
            _ => validation_snapshot,
        };

        self.in_flight = false;
        Outcome {
            snapshot,
            operation,
        }
    }

    async fn run_pipeline(
        &self,
        action: &Action,
        operation: &mut PendingOperation,
        validation_snapshot: &mut Option<LotterySnapshot>,
    ) -> Result<(), ActionError> {
        self.transition(operation, OperationStatus::Validating);
        let fresh = snapshot::fetch_snapshot(&self.ledger, &self.config).await?;
        let state = ValidationState {
            account: self.config.account,
            lottery: fresh.lottery.clone(),
            token: fresh.token.clone(),
            chain_timestamp: fresh.chain_timestamp,
            prize: fresh.prize,
        };
        *validation_snapshot = Some(fresh);

        let plan = action.plan(&state)?;

        if let Some(required) = plan.token_spend
            && state.token.allowance < required
        {
            self.transition(operation, OperationStatus::Authorizing);
            info!(
                kind = %operation.kind,
                required,
                allowance = state.token.allowance,
                "allowance below required total; submitting approval"
            );
            // Sized to exactly the required total, replacing any prior
            // unspent allowance.
            let approval = WriteCall::new("approve").with_args(vec![
                CallArg::Addr(self.config.lottery),
                CallArg::Uint(required),
            ]);
            let tx_id = self
                .ledger
                .submit(self.config.token, approval)
                .await
                .map_err(ActionError::Authorization)?;
            operation.authorization_tx = Some(tx_id);
            self.report(operation);
            self.ledger
                .await_confirmation(tx_id, self.poll_interval, self.confirmation_timeout)
                .await
                .map_err(ActionError::Authorization)?;
        }

        self.transition(operation, OperationStatus::Submitting);
        let tx_id = self
            .ledger
            .submit(self.config.lottery, plan.call)
            .await
            .map_err(ActionError::Primary)?;
        operation.primary_tx = Some(tx_id);

        self.transition(operation, OperationStatus::Confirming);
        let receipt = self
            .ledger
            .await_confirmation(tx_id, self.poll_interval, self.confirmation_timeout)
            .await
            .map_err(ActionError::Primary)?;
        info!(
            kind = %operation.kind,
            tx = %receipt.tx_id,
            block = receipt.block_number,
            "transaction confirmed"
        );
        Ok(())
    }
}
