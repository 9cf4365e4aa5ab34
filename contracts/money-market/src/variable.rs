use soroban_sdk::{Address, Env};

use crate::errors::MarketError;
use crate::math::{add, mul_div, sub};
use crate::storage::{read_borrow_snapshot, write_borrow_snapshot, BorrowSnapshot, MarketState};

/// `principal * borrow_index / interest_index`, rounded down.
pub fn borrow_balance_stored(
    env: &Env,
    state: &MarketState,
    account: &Address,
) -> Result<u128, MarketError> {
    match read_borrow_snapshot(env, account) {
        None => Ok(0),
        Some(snapshot) => mul_div(
            env,
            snapshot.principal,
            state.borrow_index,
            snapshot.interest_index,
        ),
    }
}

/// Moves an account's variable debt by `delta` and keeps `total_borrows` in
/// step. The snapshot is re-anchored at the current index; a zero balance
/// removes it. Returns the account's new balance.
pub fn update_borrow(
    env: &Env,
    state: &mut MarketState,
    account: &Address,
    delta: u128,
    is_increase: bool,
) -> Result<u128, MarketError> {
    let owed = borrow_balance_stored(env, state, account)?;
    let new_balance = if is_increase {
        state.add_variable_borrow(delta)?;
        add(owed, delta)?
    } else {
        let balance = sub(owed, delta)?;
        state.remove_variable_borrow(delta);
        balance
    };
    write_borrow_snapshot(
        env,
        account,
        &BorrowSnapshot {
            principal: new_balance,
            interest_index: state.borrow_index,
        },
    );
    Ok(new_balance)
}
