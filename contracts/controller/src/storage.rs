use soroban_sdk::{contracttype, Address, Env, Map, Vec};

use crate::ControllerError;

#[contracttype]
pub enum DataKey {
    Admin,
    Oracle,
    SupportedMarkets,     // Map<Address, bool>
    MarketCF(Address),    // u128 mantissa
    UserMarkets(Address), // Vec<Address>
    CloseFactor,          // u128 mantissa
    LiquidationIncentive, // u128 mantissa
}

/// A market's view of one account, passed in by the calling market so the
/// controller does not call back into it.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MarketSnapshot {
    pub claim_balance: u128,
    pub borrow_balance: u128,
    pub exchange_rate: u128,
}

pub const EXP_SCALE: u128 = 1_000_000_000_000_000_000u128;
pub const CLOSE_FACTOR_MIN: u128 = EXP_SCALE / 20; // 0.05
pub const CLOSE_FACTOR_MAX: u128 = EXP_SCALE * 9 / 10; // 0.9
pub const COLLATERAL_FACTOR_MAX: u128 = EXP_SCALE * 9 / 10; // 0.9
pub const LIQUIDATION_INCENTIVE_MIN: u128 = EXP_SCALE;
pub const LIQUIDATION_INCENTIVE_MAX: u128 = EXP_SCALE * 3 / 2;
pub const DEFAULT_CLOSE_FACTOR: u128 = EXP_SCALE / 2;
pub const DEFAULT_LIQUIDATION_INCENTIVE: u128 = 1_080_000_000_000_000_000u128;
pub const MAX_ASSETS_PER_ACCOUNT: u32 = 16;

const TTL_THRESHOLD: u32 = 100_000;
const TTL_EXTEND_TO: u32 = 200_000;

pub fn read_admin(env: &Env) -> Result<Address, ControllerError> {
    env.storage()
        .persistent()
        .get(&DataKey::Admin)
        .ok_or(ControllerError::NotInitialized)
}

pub fn require_admin(env: &Env) -> Result<Address, ControllerError> {
    let admin = read_admin(env)?;
    bump_core_ttl(env);
    admin.require_auth();
    Ok(admin)
}

pub fn read_oracle(env: &Env) -> Result<Address, ControllerError> {
    env.storage()
        .persistent()
        .get(&DataKey::Oracle)
        .ok_or(ControllerError::NotInitialized)
}

pub fn read_mantissa(env: &Env, key: &DataKey, default: u128) -> u128 {
    env.storage().persistent().get(key).unwrap_or(default)
}

pub fn supported_markets(env: &Env) -> Map<Address, bool> {
    env.storage()
        .persistent()
        .get(&DataKey::SupportedMarkets)
        .unwrap_or(Map::new(env))
}

pub fn is_listed(env: &Env, market: &Address) -> bool {
    supported_markets(env).get(market.clone()).unwrap_or(false)
}

pub fn read_collateral_factor(env: &Env, market: &Address) -> u128 {
    env.storage()
        .persistent()
        .get(&DataKey::MarketCF(market.clone()))
        .unwrap_or(0)
}

pub fn user_markets(env: &Env, account: &Address) -> Vec<Address> {
    env.storage()
        .persistent()
        .get(&DataKey::UserMarkets(account.clone()))
        .unwrap_or(Vec::new(env))
}

pub fn write_user_markets(env: &Env, account: &Address, markets: &Vec<Address>) {
    let key = DataKey::UserMarkets(account.clone());
    if markets.is_empty() {
        env.storage().persistent().remove(&key);
        return;
    }
    env.storage().persistent().set(&key, markets);
    env.storage()
        .persistent()
        .extend_ttl(&key, TTL_THRESHOLD, TTL_EXTEND_TO);
}

pub fn bump_core_ttl(env: &Env) {
    let persistent = env.storage().persistent();
    for key in [
        DataKey::Admin,
        DataKey::Oracle,
        DataKey::SupportedMarkets,
        DataKey::CloseFactor,
        DataKey::LiquidationIncentive,
    ] {
        if persistent.has(&key) {
            persistent.extend_ttl(&key, TTL_THRESHOLD, TTL_EXTEND_TO);
        }
    }
}
