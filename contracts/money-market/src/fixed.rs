use soroban_sdk::{Address, Env, Vec};

use crate::constants::{BORROW_RATE_MAX_MANTISSA, MAX_FIXED_DURATION, MAX_OPEN_FIXED_LOANS};
use crate::errors::MarketError;
use crate::interfaces::InterestRateModelClient;
use crate::math::{add, mul_exp, sub};
use crate::storage::{
    read_fixed_book, read_fixed_loan, remove_fixed_loan, write_fixed_book, write_fixed_loan,
    FixedLoan, MarketConfig, MarketState,
};

/// Principal plus simple interest from origination to `now`. Interest keeps
/// running past maturity at the loan's own rate.
pub fn loan_owed(env: &Env, loan: &FixedLoan, now: u64) -> Result<u128, MarketError> {
    let elapsed = now
        .checked_sub(loan.originated_at)
        .ok_or(MarketError::MathUnderflow)?;
    let factor = loan
        .rate_per_second
        .checked_mul(elapsed as u128)
        .ok_or(MarketError::MathOverflow)?;
    add(loan.principal, mul_exp(env, loan.principal, factor)?)
}

/// Sum of everything owed on the account's open fixed loans.
pub fn fixed_borrow_balance(env: &Env, account: &Address, now: u64) -> Result<u128, MarketError> {
    let book = read_fixed_book(env, account);
    let mut total = 0u128;
    for index in book.open.iter() {
        if let Some(loan) = read_fixed_loan(env, account, index) {
            total = add(total, loan_owed(env, &loan, now)?)?;
        }
    }
    Ok(total)
}

pub fn validate_maturity(now: u64, maturity: u64) -> Result<(), MarketError> {
    if maturity <= now || maturity - now > MAX_FIXED_DURATION {
        return Err(MarketError::InvalidMaturity);
    }
    Ok(())
}

/// Model rate at the utilization the pool will have once `amount` leaves,
/// plus the market's fixed premium.
pub fn quote_fixed_rate(
    env: &Env,
    config: &MarketConfig,
    state: &MarketState,
    cash: u128,
    amount: u128,
) -> Result<u128, MarketError> {
    let model_rate = InterestRateModelClient::new(env, &config.interest_rate_model)
        .get_borrow_rate(
            &sub(cash, amount)?,
            &add(state.rate_model_borrows()?, amount)?,
            &state.total_reserves,
        );
    let rate = add(model_rate, config.fixed_rate_premium)?;
    if rate > BORROW_RATE_MAX_MANTISSA {
        return Err(MarketError::BorrowRateTooHigh);
    }
    Ok(rate)
}

/// Records a new loan at the account's next index and returns that index.
pub fn originate(
    env: &Env,
    state: &mut MarketState,
    account: &Address,
    amount: u128,
    rate_per_second: u128,
    maturity: u64,
) -> Result<u64, MarketError> {
    let mut book = read_fixed_book(env, account);
    if book.open.len() >= MAX_OPEN_FIXED_LOANS {
        return Err(MarketError::TooManyFixedLoans);
    }
    let index = book.next_index;
    book.next_index = index.checked_add(1).ok_or(MarketError::MathOverflow)?;
    book.open.push_back(index);

    state.add_fixed_principal(amount)?;
    write_fixed_loan(
        env,
        account,
        index,
        &FixedLoan {
            principal: amount,
            rate_per_second,
            originated_at: env.ledger().timestamp(),
            maturity,
        },
    );
    write_fixed_book(env, account, &book);
    Ok(index)
}

/// Checks a repayment batch before anything moves: it must be non-empty,
/// free of duplicates, and every index must name an open loan.
pub fn validate_batch(env: &Env, account: &Address, indexes: &Vec<u64>) -> Result<(), MarketError> {
    if indexes.is_empty() {
        return Err(MarketError::EmptyLoanBatch);
    }
    for (pos, index) in indexes.iter().enumerate() {
        for earlier in indexes.iter().take(pos) {
            if earlier == index {
                return Err(MarketError::DuplicateLoanIndex);
            }
        }
        if read_fixed_loan(env, account, index).is_none() {
            return Err(MarketError::LoanNotFound);
        }
    }
    Ok(())
}

pub fn load_loan(env: &Env, account: &Address, index: u64) -> Result<FixedLoan, MarketError> {
    read_fixed_loan(env, account, index).ok_or(MarketError::LoanNotFound)
}

/// Applies `received` against a loan that owed `owed`. A full payment closes
/// the loan; a short one leaves the shortfall as fresh principal from now.
/// Returns the remaining principal.
#[allow(clippy::too_many_arguments)]
pub fn settle(
    env: &Env,
    state: &mut MarketState,
    config: &MarketConfig,
    account: &Address,
    index: u64,
    loan: &FixedLoan,
    owed: u128,
    received: u128,
) -> Result<u128, MarketError> {
    let interest = sub(owed, loan.principal)?;
    let remaining = owed.saturating_sub(received);
    state.settle_fixed(env, loan.principal, remaining, interest, config.reserve_factor)?;

    if remaining == 0 {
        remove_fixed_loan(env, account, index);
        let mut book = read_fixed_book(env, account);
        if let Some(pos) = book.open.first_index_of(index) {
            book.open.remove(pos);
        }
        write_fixed_book(env, account, &book);
    } else {
        write_fixed_loan(
            env,
            account,
            index,
            &FixedLoan {
                principal: remaining,
                rate_per_second: loan.rate_per_second,
                originated_at: env.ledger().timestamp(),
                maturity: loan.maturity,
            },
        );
    }
    Ok(remaining)
}
