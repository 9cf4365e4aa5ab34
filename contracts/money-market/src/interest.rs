use soroban_sdk::{Address, Env};

use crate::constants::BORROW_RATE_MAX_MANTISSA;
use crate::errors::MarketError;
use crate::events::AccrueInterest;
use crate::interfaces::InterestRateModelClient;
use crate::storage::{read_state, write_state, MarketConfig, MarketState};
use crate::transfer::get_cash;

/// Brings the market's borrow index and totals up to the current ledger time.
/// A second call within the same second changes nothing and emits nothing.
pub fn accrue_interest(env: &Env, config: &MarketConfig) -> Result<MarketState, MarketError> {
    let mut state = read_state(env);
    let now = env.ledger().timestamp();
    if now == state.accrual_timestamp {
        return Ok(state);
    }

    let cash_prior = get_cash(env, &config.underlying)?;
    let borrow_rate = borrow_rate_per_second(env, config, &state, cash_prior)?;
    let interest_accumulated = state.accrue(env, borrow_rate, now, config.reserve_factor)?;
    write_state(env, &state);

    AccrueInterest {
        cash_prior,
        interest_accumulated,
        borrow_index: state.borrow_index,
        total_borrows: state.total_borrows,
    }
    .publish(env);
    Ok(state)
}

/// Quotes an idle pool on a candidate model before it is wired in. A model
/// that cannot answer, or answers above the ceiling, is refused.
pub fn validate_rate_model(env: &Env, model: &Address) -> Result<(), MarketError> {
    match InterestRateModelClient::new(env, model).try_get_borrow_rate(&0, &0, &0) {
        Ok(Ok(rate)) if rate <= BORROW_RATE_MAX_MANTISSA => Ok(()),
        Ok(Ok(_)) => Err(MarketError::BorrowRateTooHigh),
        _ => Err(MarketError::InvalidInterestRateModel),
    }
}

pub fn borrow_rate_per_second(
    env: &Env,
    config: &MarketConfig,
    state: &MarketState,
    cash: u128,
) -> Result<u128, MarketError> {
    let rate = InterestRateModelClient::new(env, &config.interest_rate_model).get_borrow_rate(
        &cash,
        &state.rate_model_borrows()?,
        &state.total_reserves,
    );
    if rate > BORROW_RATE_MAX_MANTISSA {
        return Err(MarketError::BorrowRateTooHigh);
    }
    Ok(rate)
}

pub fn supply_rate_per_second(
    env: &Env,
    config: &MarketConfig,
    state: &MarketState,
    cash: u128,
) -> Result<u128, MarketError> {
    Ok(
        InterestRateModelClient::new(env, &config.interest_rate_model).get_supply_rate(
            &cash,
            &state.rate_model_borrows()?,
            &state.total_reserves,
            &config.reserve_factor,
        ),
    )
}
