use soroban_sdk::{token, Address, Env};

use crate::errors::MarketError;
use crate::math::to_i128;

/// Underlying held by this market.
pub fn get_cash(env: &Env, underlying: &Address) -> Result<u128, MarketError> {
    let balance = token::Client::new(env, underlying).balance(&env.current_contract_address());
    u128::try_from(balance).map_err(|_| MarketError::TransferFailed)
}

/// Pulls `amount` from `from` and returns what actually arrived. Tokens that
/// skim a fee deliver less than requested; callers credit the returned value.
pub fn do_transfer_in(
    env: &Env,
    underlying: &Address,
    from: &Address,
    amount: u128,
) -> Result<u128, MarketError> {
    let me = env.current_contract_address();
    let before = get_cash(env, underlying)?;
    token::Client::new(env, underlying).transfer(from, &me, &to_i128(amount)?);
    let after = get_cash(env, underlying)?;
    after.checked_sub(before).ok_or(MarketError::TransferFailed)
}

/// Sends exactly `amount`. A failing token transfer traps the invocation.
pub fn do_transfer_out(
    env: &Env,
    underlying: &Address,
    to: &Address,
    amount: u128,
) -> Result<(), MarketError> {
    token::Client::new(env, underlying).transfer(
        &env.current_contract_address(),
        to,
        &to_i128(amount)?,
    );
    Ok(())
}
