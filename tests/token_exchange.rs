#![allow(non_snake_case)]
use lottery_client::{
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
async fn buy_tokens__attaches_native_value_and_never_approves() {
    // given
    let ledger = FakeLedger::new();
    let mut orchestrator = Orchestrator::new(ledger, test_config());

    // when
    let outcome = orchestrator.execute(Action::BuyTokens { amount: 500 }).await;

    // then
    assert_eq!(OperationStatus::Succeeded, outcome.operation.status);
    assert!(outcome.operation.authorization_tx.is_none());
    let submitted = orchestrator.ledger().submitted();
    assert_eq!(1, submitted.len());
    assert_eq!("purchaseTokens", submitted[0].function);
    assert_eq!(500, submitted[0].value);
    assert!(submitted[0].args.is_empty());
}

#[tokio::test]
async fn buy_tokens__zero_amount_is_rejected() {
    // given
    let ledger = FakeLedger::new();
    let mut orchestrator = Orchestrator::new(ledger, test_config());

    // when
    let outcome = orchestrator.execute(Action::BuyTokens { amount: 0 }).await;

    // then
    assert_eq!(OperationStatus::Failed, outcome.operation.status);
    assert_eq!(
        Some(ActionError::Precondition(
            PreconditionFailure::NonPositiveAmount
        )),
        outcome.operation.error
    );
    assert!(orchestrator.ledger().submitted().is_empty());
}

#[tokio::test]
async fn return_tokens__approves_the_returned_amount_first() {
    // given
    let ledger = FakeLedger::new().with_balance(300);
    let mut orchestrator = Orchestrator::new(ledger, test_config());

    // when
    let outcome = orchestrator
        .execute(Action::ReturnTokens { amount: 250 })
        .await;

    // then
    assert_eq!(OperationStatus::Succeeded, outcome.operation.status);
    let submitted = orchestrator.ledger().submitted();
    assert_eq!("approve", submitted[0].function);
    assert_eq!(
        vec![CallArg::Addr(test_config().lottery), CallArg::Uint(250)],
        submitted[0].args
    );
    assert_eq!("returnTokens", submitted[1].function);
    assert_eq!(vec![CallArg::Uint(250)], submitted[1].args);
}

#[tokio::test]
async fn return_tokens__cannot_return_more_than_the_balance() {
    // given
    let ledger = FakeLedger::new().with_balance(300);
    let mut orchestrator = Orchestrator::new(ledger, test_config());

    // when
    let outcome = orchestrator
        .execute(Action::ReturnTokens { amount: 301 })
        .await;

    // then
    assert_eq!(OperationStatus::Failed, outcome.operation.status);
    assert_eq!(
        Some(ActionError::Precondition(
            PreconditionFailure::InsufficientBalance {
                balance: 300,
                required: 301,
            }
        )),
        outcome.operation.error
    );
    assert!(orchestrator.ledger().submitted().is_empty());
}

#[tokio::test]
async fn withdraw_prize__pays_out_up_to_the_accrued_prize() {
    // given
    let ledger = FakeLedger::new().with_prize(80);
    let mut orchestrator = Orchestrator::new(ledger, test_config());

    // when
    let outcome = orchestrator
        .execute(Action::WithdrawPrize { amount: 80 })
        .await;

    // then
    assert_eq!(OperationStatus::Succeeded, outcome.operation.status);
    assert!(outcome.operation.authorization_tx.is_none());
    let submitted = orchestrator.ledger().submitted();
    assert_eq!(vec!["prizeWithdraw"], orchestrator.ledger().submitted_functions());
    assert_eq!(vec![CallArg::Uint(80)], submitted[0].args);
}

#[tokio::test]
async fn withdraw_prize__rejects_amounts_above_the_accrued_prize() {
    // given
    let ledger = FakeLedger::new().with_prize(80);
    let mut orchestrator = Orchestrator::new(ledger, test_config());

    // when
    let outcome = orchestrator
        .execute(Action::WithdrawPrize { amount: 81 })
        .await;

    // then
    assert_eq!(OperationStatus::Failed, outcome.operation.status);
    assert_eq!(
        Some(ActionError::Precondition(
            PreconditionFailure::InsufficientPrize {
                requested: 81,
                available: 80,
            }
        )),
        outcome.operation.error
    );
    assert!(orchestrator.ledger().submitted().is_empty());
}
