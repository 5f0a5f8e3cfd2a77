#![allow(non_snake_case)]
use lottery_client::{
    actions::CLOSING_BUFFER_SECS,
    ledger::CallArg,
    test_helpers::{
        test_config,
        FakeLedger,
    },
    Action,
    ActionError,
    OperationStatus,
    Orchestrator,
    PreconditionFailure,
};

#[tokio::test]
async fn open_bets__closing_time_is_chain_time_plus_duration_plus_buffer() {
    // given: the caller is the owner and the chain clock reads 1_000
    let ledger = FakeLedger::new()
        .with_owner(test_config().account)
        .with_chain_timestamp(1_000);
    let mut orchestrator = Orchestrator::new(ledger, test_config());

    // when
    let outcome = orchestrator
        .execute(Action::OpenBets { duration_secs: 120 })
        .await;

    // then
    assert_eq!(OperationStatus::Succeeded, outcome.operation.status);
    let submitted = orchestrator.ledger().submitted();
    assert_eq!(1, submitted.len());
    assert_eq!("openBets", submitted[0].function);
    assert_eq!(
        vec![CallArg::Uint(u128::from(1_000u64 + 120 + CLOSING_BUFFER_SECS))],
        submitted[0].args
    );
}

#[tokio::test]
async fn open_bets__rejected_for_non_owner() {
    // given
    let ledger = FakeLedger::new();
    let mut orchestrator = Orchestrator::new(ledger, test_config());

    // when
    let outcome = orchestrator
        .execute(Action::OpenBets { duration_secs: 120 })
        .await;

    // then
    assert_eq!(OperationStatus::Failed, outcome.operation.status);
    assert!(matches!(
        outcome.operation.error,
        Some(ActionError::Precondition(PreconditionFailure::NotOwner { .. }))
    ));
    assert!(orchestrator.ledger().submitted().is_empty());
}

#[tokio::test]
async fn open_bets__zero_duration_is_rejected() {
    // given
    let ledger = FakeLedger::new().with_owner(test_config().account);
    let mut orchestrator = Orchestrator::new(ledger, test_config());

    // when
    let outcome = orchestrator
        .execute(Action::OpenBets { duration_secs: 0 })
        .await;

    // then
    assert_eq!(OperationStatus::Failed, outcome.operation.status);
    assert_eq!(
        Some(ActionError::Precondition(
            PreconditionFailure::NonPositiveAmount
        )),
        outcome.operation.error
    );
}

#[tokio::test]
async fn close_lottery__owner_submits_the_close_call() {
    // given
    let ledger = FakeLedger::new().with_owner(test_config().account);
    let mut orchestrator = Orchestrator::new(ledger, test_config());

    // when
    let outcome = orchestrator.execute(Action::CloseLottery).await;

    // then
    assert_eq!(OperationStatus::Succeeded, outcome.operation.status);
    assert_eq!(
        vec!["closeLottery"],
        orchestrator.ledger().submitted_functions()
    );
}

#[tokio::test]
async fn close_lottery__rejected_for_non_owner() {
    // given
    let ledger = FakeLedger::new();
    let mut orchestrator = Orchestrator::new(ledger, test_config());

    // when
    let outcome = orchestrator.execute(Action::CloseLottery).await;

    // then
    assert_eq!(OperationStatus::Failed, outcome.operation.status);
    assert!(orchestrator.ledger().submitted().is_empty());
}

#[tokio::test]
async fn owner_withdraw__passes_the_amount_through() {
    // given
    let ledger = FakeLedger::new().with_owner(test_config().account);
    let mut orchestrator = Orchestrator::new(ledger, test_config());

    // when
    let outcome = orchestrator
        .execute(Action::OwnerWithdraw { amount: 900 })
        .await;

    // then
    assert_eq!(OperationStatus::Succeeded, outcome.operation.status);
    let submitted = orchestrator.ledger().submitted();
    assert_eq!("ownerWithdraw", submitted[0].function);
    assert_eq!(vec![CallArg::Uint(900)], submitted[0].args);
    assert!(outcome.operation.authorization_tx.is_none());
}

#[tokio::test]
async fn owner_withdraw__rejected_for_non_owner() {
    // given
    let ledger = FakeLedger::new();
    let mut orchestrator = Orchestrator::new(ledger, test_config());

    // when
    let outcome = orchestrator
        .execute(Action::OwnerWithdraw { amount: 900 })
        .await;

    // then
    assert_eq!(OperationStatus::Failed, outcome.operation.status);
    assert!(matches!(
        outcome.operation.error,
        Some(ActionError::Precondition(PreconditionFailure::NotOwner { .. }))
    ));
    assert!(orchestrator.ledger().submitted().is_empty());
}
