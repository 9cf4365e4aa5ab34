use soroban_sdk::{contractclient, Address, Env};

use crate::errors::MarketError;
use crate::storage::MarketSnapshot;

/// Calls a market makes into its controller. The calling market's own
/// position travels as `hint`; the controller never calls back into it.
#[allow(dead_code)]
#[contractclient(name = "ControllerClient")]
pub trait ControllerInterface {
    fn is_market_listed(env: Env, market: Address) -> bool;
    fn enter_market_for_borrower(env: Env, market: Address, borrower: Address);
    fn hypothetical_liquidity(
        env: Env,
        account: Address,
        market: Address,
        hint: MarketSnapshot,
        redeem_tokens: u128,
        borrow_amount: u128,
    ) -> (u128, u128);
    fn max_borrowable(env: Env, account: Address, market: Address, hint: MarketSnapshot) -> u128;
    fn is_undercollateralized(
        env: Env,
        account: Address,
        market: Address,
        hint: MarketSnapshot,
    ) -> bool;
    fn close_factor(env: Env) -> u128;
    fn liquidation_incentive(env: Env) -> u128;
    fn oracle(env: Env) -> Address;
}

#[allow(dead_code)]
#[contractclient(name = "PriceOracleClient")]
pub trait PriceOracleInterface {
    fn get_underlying_price(env: Env, market: Address) -> u128;
}

#[allow(dead_code)]
#[contractclient(name = "InterestRateModelClient")]
pub trait InterestRateModelInterface {
    fn get_borrow_rate(env: Env, cash: u128, borrows: u128, reserves: u128) -> u128;
    fn get_supply_rate(
        env: Env,
        cash: u128,
        borrows: u128,
        reserves: u128,
        reserve_factor: u128,
    ) -> u128;
}

/// The collateral side of a cross-market liquidation.
#[allow(dead_code)]
#[contractclient(name = "PeerMarketClient")]
pub trait PeerMarketInterface {
    fn accrue_interest(env: Env) -> Result<(), MarketError>;
    fn controller(env: Env) -> Address;
    fn exchange_rate_stored(env: Env) -> Result<u128, MarketError>;
    fn balance(env: Env, account: Address) -> u128;
    fn seize(
        env: Env,
        seizer_market: Address,
        liquidator: Address,
        borrower: Address,
        seize_tokens: u128,
    ) -> Result<(), MarketError>;
}
