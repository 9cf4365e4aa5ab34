#![cfg(test)]
use super::*;
use price_oracle::{PriceOracle, PriceOracleClient};
use soroban_sdk::testutils::Address as _;
use soroban_sdk::{contract, contractimpl, contracttype, vec, Address, Env};

const ONE: u128 = EXP_SCALE;

// Market stand-in that reports whatever snapshot the test stored for an account.
#[contract]
struct MockMarket;

#[contracttype]
enum MockKey {
    Snapshot(Address),
}

#[contractimpl]
impl MockMarket {
    pub fn set_snapshot(env: Env, account: Address, snapshot: MarketSnapshot) {
        env.storage()
            .persistent()
            .set(&MockKey::Snapshot(account), &snapshot);
    }

    pub fn get_account_snapshot(env: Env, account: Address) -> MarketSnapshot {
        env.storage()
            .persistent()
            .get(&MockKey::Snapshot(account))
            .unwrap_or(MarketSnapshot {
                claim_balance: 0,
                borrow_balance: 0,
                exchange_rate: ONE,
            })
    }
}

struct Setup<'a> {
    controller: ControllerClient<'a>,
    oracle: PriceOracleClient<'a>,
}

fn setup(env: &Env) -> Setup<'_> {
    env.mock_all_auths();
    let admin = Address::generate(env);
    let oracle_id = env.register(PriceOracle, ());
    let oracle = PriceOracleClient::new(env, &oracle_id);
    oracle.initialize(&admin);

    let controller_id = env.register(Controller, ());
    let controller = ControllerClient::new(env, &controller_id);
    controller.initialize(&admin, &oracle_id);
    Setup { controller, oracle }
}

fn listed_market<'a>(env: &'a Env, s: &Setup, price: u128, cf: u128) -> MockMarketClient<'a> {
    let id = env.register(MockMarket, ());
    s.oracle
        .set_underlying_price(&id, &Address::generate(env), &price);
    s.controller.support_market(&id, &cf);
    MockMarketClient::new(env, &id)
}

fn snapshot(claim_balance: u128, borrow_balance: u128) -> MarketSnapshot {
    MarketSnapshot {
        claim_balance,
        borrow_balance,
        exchange_rate: ONE,
    }
}

#[test]
fn test_initialize_sets_defaults() {
    let env = Env::default();
    let s = setup(&env);
    assert_eq!(s.controller.close_factor(), ONE / 2);
    assert_eq!(s.controller.liquidation_incentive(), 1_080_000_000_000_000_000);
    assert_eq!(s.controller.oracle(), s.oracle.address);
    assert_eq!(
        s.controller
            .try_initialize(&Address::generate(&env), &s.oracle.address),
        Err(Ok(ControllerError::AlreadyInitialized))
    );
}

#[test]
fn test_support_market_and_collateral_factor_bounds() {
    let env = Env::default();
    let s = setup(&env);
    let market = listed_market(&env, &s, ONE, ONE / 2);
    assert!(s.controller.is_market_listed(&market.address));
    assert_eq!(s.controller.collateral_factor(&market.address), ONE / 2);

    assert_eq!(
        s.controller.try_support_market(&market.address, &(ONE / 2)),
        Err(Ok(ControllerError::MarketAlreadyListed))
    );
    assert_eq!(
        s.controller.try_set_collateral_factor(&market.address, &ONE),
        Err(Ok(ControllerError::InvalidCollateralFactor))
    );
    let unlisted = Address::generate(&env);
    assert_eq!(
        s.controller.try_set_collateral_factor(&unlisted, &(ONE / 2)),
        Err(Ok(ControllerError::MarketNotListed))
    );
    assert!(!s.controller.is_market_listed(&unlisted));

    s.controller
        .set_collateral_factor(&market.address, &(ONE * 3 / 10));
    assert_eq!(s.controller.collateral_factor(&market.address), ONE * 3 / 10);
}

#[test]
fn test_close_factor_and_incentive_bounds() {
    let env = Env::default();
    let s = setup(&env);
    assert_eq!(
        s.controller.try_set_close_factor(&(ONE / 100)),
        Err(Ok(ControllerError::InvalidCloseFactor))
    );
    assert_eq!(
        s.controller.try_set_close_factor(&ONE),
        Err(Ok(ControllerError::InvalidCloseFactor))
    );
    s.controller.set_close_factor(&(ONE * 3 / 10));
    assert_eq!(s.controller.close_factor(), ONE * 3 / 10);

    assert_eq!(
        s.controller.try_set_liquidation_incentive(&(ONE / 2)),
        Err(Ok(ControllerError::InvalidLiquidationIncentive))
    );
    assert_eq!(
        s.controller.try_set_liquidation_incentive(&(ONE * 2)),
        Err(Ok(ControllerError::InvalidLiquidationIncentive))
    );
    s.controller.set_liquidation_incentive(&(ONE * 11 / 10));
    assert_eq!(s.controller.liquidation_incentive(), ONE * 11 / 10);
}

#[test]
fn test_enter_markets_is_idempotent_and_requires_listing() {
    let env = Env::default();
    let s = setup(&env);
    let user = Address::generate(&env);
    let m1 = listed_market(&env, &s, ONE, ONE / 2);

    s.controller
        .enter_markets(&user, &vec![&env, m1.address.clone(), m1.address.clone()]);
    assert_eq!(s.controller.assets_in(&user).len(), 1);
    assert!(s.controller.check_membership(&user, &m1.address));

    let unlisted = Address::generate(&env);
    assert_eq!(
        s.controller
            .try_enter_markets(&user, &vec![&env, unlisted.clone()]),
        Err(Ok(ControllerError::MarketNotListed))
    );
    assert!(!s.controller.check_membership(&user, &unlisted));
}

#[test]
fn test_enter_markets_caps_membership() {
    let env = Env::default();
    let s = setup(&env);
    let user = Address::generate(&env);
    for _ in 0..MAX_ASSETS_PER_ACCOUNT {
        let m = listed_market(&env, &s, ONE, ONE / 2);
        s.controller
            .enter_markets(&user, &vec![&env, m.address.clone()]);
    }
    let extra = listed_market(&env, &s, ONE, ONE / 2);
    assert_eq!(
        s.controller
            .try_enter_markets(&user, &vec![&env, extra.address.clone()]),
        Err(Ok(ControllerError::TooManyMarkets))
    );
}

#[test]
fn test_enter_market_for_borrower() {
    let env = Env::default();
    let s = setup(&env);
    let borrower = Address::generate(&env);
    let m1 = listed_market(&env, &s, ONE, ONE / 2);

    s.controller.enter_market_for_borrower(&m1.address, &borrower);
    assert!(s.controller.check_membership(&borrower, &m1.address));

    assert_eq!(
        s.controller
            .try_enter_market_for_borrower(&Address::generate(&env), &borrower),
        Err(Ok(ControllerError::MarketNotListed))
    );
}

#[test]
fn test_account_liquidity_sums_entered_markets() {
    let env = Env::default();
    let s = setup(&env);
    let user = Address::generate(&env);
    let collateral = listed_market(&env, &s, ONE, ONE / 2);
    let debt = listed_market(&env, &s, 2 * ONE, ONE / 2);

    collateral.set_snapshot(&user, &snapshot(1_000, 0));
    debt.set_snapshot(&user, &snapshot(0, 100));
    s.controller.enter_markets(
        &user,
        &vec![&env, collateral.address.clone(), debt.address.clone()],
    );

    // 1000 * 0.5 * 1 - 100 * 2
    assert_eq!(s.controller.account_liquidity(&user), (300, 0));

    debt.set_snapshot(&user, &snapshot(0, 400));
    assert_eq!(s.controller.account_liquidity(&user), (0, 300));
    assert!(s.controller.is_undercollateralized(
        &user,
        &debt.address,
        &snapshot(0, 400)
    ));
}

#[test]
fn test_exchange_rate_scales_collateral() {
    let env = Env::default();
    let s = setup(&env);
    let user = Address::generate(&env);
    let market = listed_market(&env, &s, ONE, ONE / 2);
    market.set_snapshot(
        &user,
        &MarketSnapshot {
            claim_balance: 1_000,
            borrow_balance: 0,
            exchange_rate: 2 * ONE,
        },
    );
    s.controller
        .enter_markets(&user, &vec![&env, market.address.clone()]);
    assert_eq!(s.controller.account_liquidity(&user), (1_000, 0));
}

#[test]
fn test_hypothetical_liquidity_uses_hint() {
    let env = Env::default();
    let s = setup(&env);
    let user = Address::generate(&env);
    let market = listed_market(&env, &s, ONE, ONE / 2);
    // Stored snapshot is stale; the hint is authoritative for this market.
    market.set_snapshot(&user, &snapshot(10, 0));
    s.controller
        .enter_markets(&user, &vec![&env, market.address.clone()]);

    let hint = snapshot(1_000, 0);
    assert_eq!(
        s.controller
            .hypothetical_liquidity(&user, &market.address, &hint, &500, &0),
        (250, 0)
    );
    assert_eq!(
        s.controller
            .hypothetical_liquidity(&user, &market.address, &hint, &0, &600),
        (0, 100)
    );
}

#[test]
fn test_max_borrowable_converts_to_underlying() {
    let env = Env::default();
    let s = setup(&env);
    let user = Address::generate(&env);
    let collateral = listed_market(&env, &s, ONE, ONE / 2);
    let debt = listed_market(&env, &s, 2 * ONE, ONE / 2);
    collateral.set_snapshot(&user, &snapshot(1_000, 0));
    s.controller
        .enter_markets(&user, &vec![&env, collateral.address.clone()]);
    s.controller.enter_market_for_borrower(&debt.address, &user);

    assert_eq!(
        s.controller
            .max_borrowable(&user, &debt.address, &snapshot(0, 0)),
        250
    );
    assert_eq!(
        s.controller
            .max_borrowable(&user, &debt.address, &snapshot(0, 300)),
        0
    );
}

#[test]
fn test_missing_price_fails_only_for_open_positions() {
    let env = Env::default();
    let s = setup(&env);
    let user = Address::generate(&env);
    let priced = listed_market(&env, &s, ONE, ONE / 2);
    let unpriced = listed_market(&env, &s, 0, ONE / 2);
    priced.set_snapshot(&user, &snapshot(100, 0));
    s.controller.enter_markets(
        &user,
        &vec![&env, priced.address.clone(), unpriced.address.clone()],
    );
    assert_eq!(s.controller.account_liquidity(&user), (50, 0));

    unpriced.set_snapshot(&user, &snapshot(0, 1));
    assert_eq!(
        s.controller.try_account_liquidity(&user),
        Err(Ok(ControllerError::PriceUnavailable))
    );
}

#[test]
fn test_exit_market_rules() {
    let env = Env::default();
    let s = setup(&env);
    let user = Address::generate(&env);
    let collateral = listed_market(&env, &s, ONE, ONE / 2);
    let debt = listed_market(&env, &s, ONE, ONE / 2);
    collateral.set_snapshot(&user, &snapshot(1_000, 0));
    debt.set_snapshot(&user, &snapshot(0, 100));
    s.controller.enter_markets(
        &user,
        &vec![&env, collateral.address.clone(), debt.address.clone()],
    );

    assert_eq!(
        s.controller.try_exit_market(&user, &debt.address),
        Err(Ok(ControllerError::NonzeroBorrowBalance))
    );
    assert_eq!(
        s.controller.try_exit_market(&user, &collateral.address),
        Err(Ok(ControllerError::InsufficientLiquidity))
    );

    debt.set_snapshot(&user, &snapshot(0, 0));
    s.controller.exit_market(&user, &debt.address);
    s.controller.exit_market(&user, &collateral.address);
    assert_eq!(s.controller.assets_in(&user).len(), 0);

    // Leaving a market never entered is a no-op.
    s.controller.exit_market(&user, &debt.address);
}

#[test]
fn test_set_admin_and_oracle() {
    let env = Env::default();
    let s = setup(&env);
    let new_admin = Address::generate(&env);
    s.controller.set_admin(&new_admin);
    assert_eq!(s.controller.admin(), new_admin);

    let new_oracle = Address::generate(&env);
    s.controller.set_price_oracle(&new_oracle);
    assert_eq!(s.controller.oracle(), new_oracle);
}
