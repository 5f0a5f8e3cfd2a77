//! Per-action parameter sets and precondition predicates.
//!
//! Each action is one row of a declarative table: its preconditions, the
//! token spend that must be covered by allowance (if any) and the primary
//! contract call. One orchestrator pipeline serves every row; adding an
//! action means adding a row here, not new control flow.

use crate::{
    error::PreconditionFailure,
    ledger::{
        Address,
        CallArg,
        WriteCall,
    },
    snapshot::{
        LotteryState,
        TokenSnapshot,
    },
};
use std::fmt;

/// Seconds added on top of `chain_now + duration` when opening bets, to
/// tolerate the gap between the timestamp read and the mined block.
pub const CLOSING_BUFFER_SECS: u64 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionKind {
    BetOnce,
    BetMany,
    BuyTokens,
    ReturnTokens,
    WithdrawPrize,
    OpenBets,
    CloseLottery,
    OwnerWithdraw,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionKind::BetOnce => "bet-once",
            ActionKind::BetMany => "bet-many",
            ActionKind::BuyTokens => "buy-tokens",
            ActionKind::ReturnTokens => "return-tokens",
            ActionKind::WithdrawPrize => "withdraw-prize",
            ActionKind::OpenBets => "open-bets",
            ActionKind::CloseLottery => "close-lottery",
            ActionKind::OwnerWithdraw => "owner-withdraw",
        };
        f.write_str(name)
    }
}

/// One user-initiated action with its parameters. All amounts are
/// smallest-unit integers; nothing fractional reaches this type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    BetOnce,
    BetMany { count: u64 },
    BuyTokens { amount: u128 },
    ReturnTokens { amount: u128 },
    WithdrawPrize { amount: u128 },
    OpenBets { duration_secs: u64 },
    CloseLottery,
    OwnerWithdraw { amount: u128 },
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::BetOnce => ActionKind::BetOnce,
            Action::BetMany { .. } => ActionKind::BetMany,
            Action::BuyTokens { .. } => ActionKind::BuyTokens,
            Action::ReturnTokens { .. } => ActionKind::ReturnTokens,
            Action::WithdrawPrize { .. } => ActionKind::WithdrawPrize,
            Action::OpenBets { .. } => ActionKind::OpenBets,
            Action::CloseLottery => ActionKind::CloseLottery,
            Action::OwnerWithdraw { .. } => ActionKind::OwnerWithdraw,
        }
    }
}

/// State read during `Validating`, in one concurrent batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationState {
    pub account: Address,
    pub lottery: LotteryState,
    pub token: TokenSnapshot,
    pub chain_timestamp: u64,
    pub prize: u128,
}

/// What the write path has to do for one validated action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionPlan {
    /// Token amount the lottery contract will pull; the allowance must cover
    /// it before the primary call is submitted. `None` for actions paid in
    /// native currency or by contract authority.
    pub token_spend: Option<u128>,
    /// The primary call, targeted at the lottery contract.
    pub call: WriteCall,
}

/// Exact cost of `count` bets: `(bet_price + bet_fee) * count` in checked
/// integer arithmetic.
pub fn required_total(
    lottery: &LotteryState,
    count: u64,
) -> Result<u128, PreconditionFailure> {
    lottery
        .bet_price
        .checked_add(lottery.bet_fee)
        .and_then(|per_bet| per_bet.checked_mul(u128::from(count)))
        .ok_or(PreconditionFailure::AmountOverflow)
}

impl Action {
    /// The action table. Evaluates every declared precondition against the
    /// validation snapshot and fails with the first that does not hold; no
    /// write may be attempted in that case.
    pub fn plan(
        &self,
        state: &ValidationState,
    ) -> Result<ActionPlan, PreconditionFailure> {
        match self {
            Action::BetOnce => {
                check_betting_window(state)?;
                let required = required_total(&state.lottery, 1)?;
                check_balance(state, required)?;
                Ok(ActionPlan {
                    token_spend: Some(required),
                    call: WriteCall::new("bet"),
                })
            }
            Action::BetMany { count } => {
                check_positive(u128::from(*count))?;
                check_betting_window(state)?;
                let required = required_total(&state.lottery, *count)?;
                check_balance(state, required)?;
                Ok(ActionPlan {
                    token_spend: Some(required),
                    call: WriteCall::new("betMany")
                        .with_args(vec![CallArg::Uint(u128::from(*count))]),
                })
            }
            Action::BuyTokens { amount } => {
                check_positive(*amount)?;
                Ok(ActionPlan {
                    token_spend: None,
                    call: WriteCall::new("purchaseTokens").with_value(*amount),
                })
            }
            Action::ReturnTokens { amount } => {
                check_positive(*amount)?;
                check_balance(state, *amount)?;
                Ok(ActionPlan {
                    token_spend: Some(*amount),
                    call: WriteCall::new("returnTokens")
                        .with_args(vec![CallArg::Uint(*amount)]),
                })
            }
            Action::WithdrawPrize { amount } => {
                check_positive(*amount)?;
                if *amount > state.prize {
                    return Err(PreconditionFailure::InsufficientPrize {
                        requested: *amount,
                        available: state.prize,
                    });
                }
                Ok(ActionPlan {
                    token_spend: None,
                    call: WriteCall::new("prizeWithdraw")
                        .with_args(vec![CallArg::Uint(*amount)]),
                })
            }
            Action::OpenBets { duration_secs } => {
                check_owner(state)?;
                check_positive(u128::from(*duration_secs))?;
                let closing = state
                    .chain_timestamp
                    .checked_add(*duration_secs)
                    .and_then(|at| at.checked_add(CLOSING_BUFFER_SECS))
                    .ok_or(PreconditionFailure::AmountOverflow)?;
                Ok(ActionPlan {
                    token_spend: None,
                    call: WriteCall::new("openBets")
                        .with_args(vec![CallArg::Uint(u128::from(closing))]),
                })
            }
            Action::CloseLottery => {
                check_owner(state)?;
                Ok(ActionPlan {
                    token_spend: None,
                    call: WriteCall::new("closeLottery"),
                })
            }
            Action::OwnerWithdraw { amount } => {
                check_owner(state)?;
                check_positive(*amount)?;
                Ok(ActionPlan {
                    token_spend: None,
                    call: WriteCall::new("ownerWithdraw")
                        .with_args(vec![CallArg::Uint(*amount)]),
                })
            }
        }
    }
}

fn check_betting_window(state: &ValidationState) -> Result<(), PreconditionFailure> {
    if !state.lottery.bets_open {
        return Err(PreconditionFailure::BetsNotOpen);
    }
    if state.chain_timestamp >= state.lottery.closing_timestamp {
        return Err(PreconditionFailure::BettingWindowClosed {
            now: state.chain_timestamp,
            closing_timestamp: state.lottery.closing_timestamp,
        });
    }
    Ok(())
}

fn check_balance(
    state: &ValidationState,
    required: u128,
) -> Result<(), PreconditionFailure> {
    if state.token.balance < required {
        return Err(PreconditionFailure::InsufficientBalance {
            balance: state.token.balance,
            required,
        });
    }
    Ok(())
}

fn check_positive(amount: u128) -> Result<(), PreconditionFailure> {
    if amount == 0 {
        return Err(PreconditionFailure::NonPositiveAmount);
    }
    Ok(())
}

fn check_owner(state: &ValidationState) -> Result<(), PreconditionFailure> {
    if state.account != state.lottery.owner {
        return Err(PreconditionFailure::NotOwner {
            caller: state.account,
            owner: state.lottery.owner,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn lottery_state() -> LotteryState {
        LotteryState {
            bet_price: 100,
            bet_fee: 5,
            bets_open: true,
            closing_timestamp: 2_000,
            slot_count: 0,
            owner: Address::new([0x99; 20]),
        }
    }

    fn validation_state() -> ValidationState {
        ValidationState {
            account: Address::new([0x11; 20]),
            lottery: lottery_state(),
            token: TokenSnapshot {
                balance: 1_000,
                allowance: 0,
                symbol: "LT0".to_string(),
            },
            chain_timestamp: 1_000,
            prize: 0,
        }
    }

    #[test]
    fn required_total__multiplies_without_rounding() {
        assert_eq!(105, required_total(&lottery_state(), 1).unwrap());
        assert_eq!(735, required_total(&lottery_state(), 7).unwrap());
    }

    proptest! {
        #[test]
        fn required_total__is_price_plus_fee_times_count(
            bet_price in 0..=u128::from(u64::MAX),
            bet_fee in 0..=u128::from(u64::MAX),
            count in 1..=u64::from(u32::MAX),
        ) {
            let lottery = LotteryState {
                bet_price,
                bet_fee,
                ..lottery_state()
            };
            let expected = (bet_price + bet_fee) * u128::from(count);
            prop_assert_eq!(Ok(expected), required_total(&lottery, count));
        }
    }

    #[test]
    fn required_total__overflow_is_a_precondition_failure() {
        let lottery = LotteryState {
            bet_price: u128::MAX,
            bet_fee: 0,
            ..lottery_state()
        };
        assert_eq!(
            Err(PreconditionFailure::AmountOverflow),
            required_total(&lottery, 2)
        );
    }

    #[test]
    fn plan__bet_once_spends_price_plus_fee() {
        let plan = Action::BetOnce.plan(&validation_state()).unwrap();
        assert_eq!(Some(105), plan.token_spend);
        assert_eq!("bet", plan.call.function);
        assert!(plan.call.args.is_empty());
    }

    #[test]
    fn plan__bet_many_carries_the_count() {
        let plan = Action::BetMany { count: 3 }.plan(&validation_state()).unwrap();
        assert_eq!(Some(315), plan.token_spend);
        assert_eq!("betMany", plan.call.function);
        assert_eq!(vec![CallArg::Uint(3)], plan.call.args);
    }

    #[test]
    fn plan__bet_many_rejects_zero_count() {
        assert_eq!(
            Err(PreconditionFailure::NonPositiveAmount),
            Action::BetMany { count: 0 }.plan(&validation_state())
        );
    }

    #[test]
    fn plan__bet_requires_open_bets() {
        let mut state = validation_state();
        state.lottery.bets_open = false;
        assert_eq!(
            Err(PreconditionFailure::BetsNotOpen),
            Action::BetOnce.plan(&state)
        );
    }

    #[test]
    fn plan__bet_rejects_expired_window() {
        let mut state = validation_state();
        state.chain_timestamp = state.lottery.closing_timestamp;
        assert_eq!(
            Err(PreconditionFailure::BettingWindowClosed {
                now: 2_000,
                closing_timestamp: 2_000,
            }),
            Action::BetOnce.plan(&state)
        );
    }

    #[test]
    fn plan__buy_tokens_attaches_native_value_and_needs_no_allowance() {
        let plan = Action::BuyTokens { amount: 7 }.plan(&validation_state()).unwrap();
        assert_eq!(None, plan.token_spend);
        assert_eq!("purchaseTokens", plan.call.function);
        assert_eq!(7, plan.call.value);
    }

    #[test]
    fn plan__open_bets_adds_duration_and_buffer_to_chain_time() {
        let mut state = validation_state();
        state.account = state.lottery.owner;
        let plan = Action::OpenBets { duration_secs: 120 }.plan(&state).unwrap();
        assert_eq!(
            vec![CallArg::Uint(u128::from(1_000u64 + 120 + CLOSING_BUFFER_SECS))],
            plan.call.args
        );
    }

    #[test]
    fn plan__owner_actions_reject_non_owner() {
        let state = validation_state();
        for action in [
            Action::OpenBets { duration_secs: 60 },
            Action::CloseLottery,
            Action::OwnerWithdraw { amount: 1 },
        ] {
            assert!(matches!(
                action.plan(&state),
                Err(PreconditionFailure::NotOwner { .. })
            ));
        }
    }

    #[test]
    fn plan__withdraw_prize_is_capped_by_available_prize() {
        let mut state = validation_state();
        state.prize = 50;
        assert_eq!(
            Err(PreconditionFailure::InsufficientPrize {
                requested: 51,
                available: 50,
            }),
            Action::WithdrawPrize { amount: 51 }.plan(&state)
        );
        assert!(Action::WithdrawPrize { amount: 50 }.plan(&state).is_ok());
    }
}
