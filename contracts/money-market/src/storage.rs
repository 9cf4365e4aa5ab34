use soroban_sdk::{contracttype, panic_with_error, Address, Env, Vec};
use stellar_tokens::fungible::Base as TokenBase;

use crate::constants::{TTL_EXTEND_TO, TTL_THRESHOLD};
use crate::errors::MarketError;

#[contracttype]
pub enum DataKey {
    Admin,
    Config,
    State,
    BorrowSnapshot(Address),
    FixedBook(Address),
    FixedLoan(Address, u64),
}

/// Wiring and risk parameters, written by `initialize` and the admin setters.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MarketConfig {
    pub underlying: Address,
    pub controller: Address,
    pub interest_rate_model: Address,
    pub initial_exchange_rate: u128,
    pub reserve_factor: u128,
    pub fixed_rate_premium: u128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MarketState {
    pub total_borrows: u128,
    /// Outstanding fixed principal. Fixed interest reaches reserves and the
    /// exchange rate only when a loan is settled.
    pub total_fixed_borrows: u128,
    pub total_reserves: u128,
    pub borrow_index: u128,
    pub accrual_timestamp: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BorrowSnapshot {
    pub principal: u128,
    pub interest_index: u128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FixedLoan {
    pub principal: u128,
    pub rate_per_second: u128,
    pub originated_at: u64,
    pub maturity: u64,
}

/// Open fixed-rate loan indexes for one account. `next_index` only grows.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FixedBook {
    pub next_index: u64,
    pub open: Vec<u64>,
}

/// Position of one account in one market, as seen by the controller.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MarketSnapshot {
    pub claim_balance: u128,
    pub borrow_balance: u128,
    pub exchange_rate: u128,
}

pub fn is_initialized(env: &Env) -> bool {
    env.storage().persistent().has(&DataKey::Config)
}

pub fn read_admin(env: &Env) -> Address {
    env.storage()
        .persistent()
        .get(&DataKey::Admin)
        .unwrap_or_else(|| panic_with_error!(env, MarketError::NotInitialized))
}

pub fn write_admin(env: &Env, admin: &Address) {
    env.storage().persistent().set(&DataKey::Admin, admin);
}

pub fn read_config(env: &Env) -> MarketConfig {
    bump_core_ttl(env);
    env.storage()
        .persistent()
        .get(&DataKey::Config)
        .unwrap_or_else(|| panic_with_error!(env, MarketError::NotInitialized))
}

pub fn write_config(env: &Env, config: &MarketConfig) {
    env.storage().persistent().set(&DataKey::Config, config);
}

pub fn read_state(env: &Env) -> MarketState {
    env.storage()
        .persistent()
        .get(&DataKey::State)
        .unwrap_or_else(|| panic_with_error!(env, MarketError::NotInitialized))
}

pub fn write_state(env: &Env, state: &MarketState) {
    env.storage().persistent().set(&DataKey::State, state);
}

pub fn read_borrow_snapshot(env: &Env, account: &Address) -> Option<BorrowSnapshot> {
    env.storage()
        .persistent()
        .get(&DataKey::BorrowSnapshot(account.clone()))
}

pub fn write_borrow_snapshot(env: &Env, account: &Address, snapshot: &BorrowSnapshot) {
    let key = DataKey::BorrowSnapshot(account.clone());
    if snapshot.principal == 0 {
        env.storage().persistent().remove(&key);
        return;
    }
    env.storage().persistent().set(&key, snapshot);
    env.storage()
        .persistent()
        .extend_ttl(&key, TTL_THRESHOLD, TTL_EXTEND_TO);
}

pub fn read_fixed_book(env: &Env, account: &Address) -> FixedBook {
    env.storage()
        .persistent()
        .get(&DataKey::FixedBook(account.clone()))
        .unwrap_or(FixedBook {
            next_index: 0,
            open: Vec::new(env),
        })
}

pub fn write_fixed_book(env: &Env, account: &Address, book: &FixedBook) {
    let key = DataKey::FixedBook(account.clone());
    env.storage().persistent().set(&key, book);
    env.storage()
        .persistent()
        .extend_ttl(&key, TTL_THRESHOLD, TTL_EXTEND_TO);
}

pub fn read_fixed_loan(env: &Env, account: &Address, index: u64) -> Option<FixedLoan> {
    env.storage()
        .persistent()
        .get(&DataKey::FixedLoan(account.clone(), index))
}

pub fn write_fixed_loan(env: &Env, account: &Address, index: u64, loan: &FixedLoan) {
    let key = DataKey::FixedLoan(account.clone(), index);
    env.storage().persistent().set(&key, loan);
    env.storage()
        .persistent()
        .extend_ttl(&key, TTL_THRESHOLD, TTL_EXTEND_TO);
}

pub fn remove_fixed_loan(env: &Env, account: &Address, index: u64) {
    env.storage()
        .persistent()
        .remove(&DataKey::FixedLoan(account.clone(), index));
}

pub fn bump_core_ttl(env: &Env) {
    let persistent = env.storage().persistent();
    for key in [DataKey::Admin, DataKey::Config, DataKey::State] {
        if persistent.has(&key) {
            persistent.extend_ttl(&key, TTL_THRESHOLD, TTL_EXTEND_TO);
        }
    }
}

pub fn claim_balance(env: &Env, account: &Address) -> u128 {
    let bal = TokenBase::balance(env, account);
    if bal < 0 {
        panic_with_error!(env, MarketError::MathUnderflow);
    }
    bal as u128
}

pub fn claim_supply(env: &Env) -> u128 {
    let supply = TokenBase::total_supply(env);
    if supply < 0 {
        panic_with_error!(env, MarketError::MathUnderflow);
    }
    supply as u128
}
