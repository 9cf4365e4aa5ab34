#![no_std]
use soroban_sdk::{
    contract, contractclient, contracterror, contractimpl, Address, Env, Map, Vec, U256,
};

mod events;
mod storage;

use events::*;
pub use storage::MarketSnapshot;
use storage::*;

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum ControllerError {
    AlreadyInitialized = 101,
    NotInitialized = 102,
    MarketNotListed = 103,
    MarketAlreadyListed = 104,
    InvalidCollateralFactor = 105,
    InvalidCloseFactor = 106,
    InvalidLiquidationIncentive = 107,
    TooManyMarkets = 108,
    NonzeroBorrowBalance = 109,
    InsufficientLiquidity = 110,
    PriceUnavailable = 111,
    MathOverflow = 112,
}

#[allow(dead_code)]
#[contractclient(name = "MarketClient")]
pub trait MarketInterface {
    fn get_account_snapshot(env: Env, account: Address) -> MarketSnapshot;
}

#[allow(dead_code)]
#[contractclient(name = "OracleClient")]
pub trait OracleInterface {
    fn get_underlying_price(env: Env, market: Address) -> u128;
}

/// Hypothetical change applied to one market while summing an account.
struct Adjustment<'a> {
    market: &'a Address,
    hint: &'a MarketSnapshot,
    redeem_tokens: u128,
    borrow_amount: u128,
}

#[contract]
pub struct Controller;

#[contractimpl]
impl Controller {
    pub fn initialize(env: Env, admin: Address, oracle: Address) -> Result<(), ControllerError> {
        if env.storage().persistent().has(&DataKey::Admin) {
            return Err(ControllerError::AlreadyInitialized);
        }
        admin.require_auth();
        let persistent = env.storage().persistent();
        persistent.set(&DataKey::Admin, &admin);
        persistent.set(&DataKey::Oracle, &oracle);
        persistent.set(&DataKey::CloseFactor, &DEFAULT_CLOSE_FACTOR);
        persistent.set(&DataKey::LiquidationIncentive, &DEFAULT_LIQUIDATION_INCENTIVE);
        persistent.set(&DataKey::SupportedMarkets, &Map::<Address, bool>::new(&env));
        bump_core_ttl(&env);
        Ok(())
    }

    // Admin parameters

    pub fn set_admin(env: Env, new_admin: Address) -> Result<(), ControllerError> {
        require_admin(&env)?;
        env.storage().persistent().set(&DataKey::Admin, &new_admin);
        AdminUpdated { admin: new_admin }.publish(&env);
        Ok(())
    }

    pub fn set_price_oracle(env: Env, oracle: Address) -> Result<(), ControllerError> {
        require_admin(&env)?;
        env.storage().persistent().set(&DataKey::Oracle, &oracle);
        NewPriceOracle { oracle }.publish(&env);
        Ok(())
    }

    pub fn set_close_factor(env: Env, close_factor: u128) -> Result<(), ControllerError> {
        require_admin(&env)?;
        if !(CLOSE_FACTOR_MIN..=CLOSE_FACTOR_MAX).contains(&close_factor) {
            return Err(ControllerError::InvalidCloseFactor);
        }
        let old = read_mantissa(&env, &DataKey::CloseFactor, DEFAULT_CLOSE_FACTOR);
        env.storage()
            .persistent()
            .set(&DataKey::CloseFactor, &close_factor);
        NewCloseFactor {
            old_close_factor_mantissa: old,
            new_close_factor_mantissa: close_factor,
        }
        .publish(&env);
        Ok(())
    }

    pub fn set_liquidation_incentive(env: Env, incentive: u128) -> Result<(), ControllerError> {
        require_admin(&env)?;
        if !(LIQUIDATION_INCENTIVE_MIN..=LIQUIDATION_INCENTIVE_MAX).contains(&incentive) {
            return Err(ControllerError::InvalidLiquidationIncentive);
        }
        let old = read_mantissa(
            &env,
            &DataKey::LiquidationIncentive,
            DEFAULT_LIQUIDATION_INCENTIVE,
        );
        env.storage()
            .persistent()
            .set(&DataKey::LiquidationIncentive, &incentive);
        NewLiquidationIncentive {
            old_incentive_mantissa: old,
            new_incentive_mantissa: incentive,
        }
        .publish(&env);
        Ok(())
    }

    /// Lists a market with its collateral factor.
    pub fn support_market(
        env: Env,
        market: Address,
        collateral_factor: u128,
    ) -> Result<(), ControllerError> {
        require_admin(&env)?;
        if is_listed(&env, &market) {
            return Err(ControllerError::MarketAlreadyListed);
        }
        if collateral_factor > COLLATERAL_FACTOR_MAX {
            return Err(ControllerError::InvalidCollateralFactor);
        }
        let mut markets = supported_markets(&env);
        markets.set(market.clone(), true);
        env.storage()
            .persistent()
            .set(&DataKey::SupportedMarkets, &markets);
        env.storage()
            .persistent()
            .set(&DataKey::MarketCF(market.clone()), &collateral_factor);
        MarketListed {
            market,
            collateral_factor_mantissa: collateral_factor,
        }
        .publish(&env);
        Ok(())
    }

    pub fn set_collateral_factor(
        env: Env,
        market: Address,
        collateral_factor: u128,
    ) -> Result<(), ControllerError> {
        require_admin(&env)?;
        if !is_listed(&env, &market) {
            return Err(ControllerError::MarketNotListed);
        }
        if collateral_factor > COLLATERAL_FACTOR_MAX {
            return Err(ControllerError::InvalidCollateralFactor);
        }
        let old = read_collateral_factor(&env, &market);
        env.storage()
            .persistent()
            .set(&DataKey::MarketCF(market.clone()), &collateral_factor);
        NewCollateralFactor {
            market,
            old_collateral_factor_mantissa: old,
            new_collateral_factor_mantissa: collateral_factor,
        }
        .publish(&env);
        Ok(())
    }

    // Membership

    pub fn enter_markets(
        env: Env,
        account: Address,
        markets: Vec<Address>,
    ) -> Result<(), ControllerError> {
        account.require_auth();
        for market in markets.iter() {
            add_membership(&env, &market, &account)?;
        }
        Ok(())
    }

    /// Called by a market when `borrower` borrows from it.
    pub fn enter_market_for_borrower(
        env: Env,
        market: Address,
        borrower: Address,
    ) -> Result<(), ControllerError> {
        market.require_auth();
        add_membership(&env, &market, &borrower)
    }

    /// Leaves a market. Refused while the account owes it anything or while
    /// dropping its collateral would leave a shortfall.
    pub fn exit_market(env: Env, account: Address, market: Address) -> Result<(), ControllerError> {
        account.require_auth();
        let mut entered = user_markets(&env, &account);
        let Some(pos) = entered.first_index_of(market.clone()) else {
            return Ok(());
        };
        let snapshot = MarketClient::new(&env, &market).get_account_snapshot(&account);
        if snapshot.borrow_balance > 0 {
            return Err(ControllerError::NonzeroBorrowBalance);
        }
        let adjustment = Adjustment {
            market: &market,
            hint: &snapshot,
            redeem_tokens: snapshot.claim_balance,
            borrow_amount: 0,
        };
        let (_, shortfall) = liquidity(&env, &account, Some(adjustment))?;
        if shortfall > 0 {
            return Err(ControllerError::InsufficientLiquidity);
        }
        entered.remove(pos);
        write_user_markets(&env, &account, &entered);
        MarketExited { market, account }.publish(&env);
        Ok(())
    }

    pub fn assets_in(env: Env, account: Address) -> Vec<Address> {
        user_markets(&env, &account)
    }

    pub fn check_membership(env: Env, account: Address, market: Address) -> bool {
        user_markets(&env, &account).contains(market)
    }

    // Liquidity

    /// `(liquidity, shortfall)` in oracle units; at most one is non-zero.
    pub fn account_liquidity(env: Env, account: Address) -> Result<(u128, u128), ControllerError> {
        liquidity(&env, &account, None)
    }

    /// Liquidity after redeeming `redeem_tokens` of and borrowing
    /// `borrow_amount` from `market`, whose position is taken from `hint`.
    pub fn hypothetical_liquidity(
        env: Env,
        account: Address,
        market: Address,
        hint: MarketSnapshot,
        redeem_tokens: u128,
        borrow_amount: u128,
    ) -> Result<(u128, u128), ControllerError> {
        liquidity(
            &env,
            &account,
            Some(Adjustment {
                market: &market,
                hint: &hint,
                redeem_tokens,
                borrow_amount,
            }),
        )
    }

    /// Largest further borrow from `market`, in its underlying.
    pub fn max_borrowable(
        env: Env,
        account: Address,
        market: Address,
        hint: MarketSnapshot,
    ) -> Result<u128, ControllerError> {
        let adjustment = Adjustment {
            market: &market,
            hint: &hint,
            redeem_tokens: 0,
            borrow_amount: 0,
        };
        let (excess, shortfall) = liquidity(&env, &account, Some(adjustment))?;
        if shortfall > 0 || excess == 0 {
            return Ok(0);
        }
        let price = price_of(&OracleClient::new(&env, &read_oracle(&env)?), &market)?;
        mul_div(&env, excess, EXP_SCALE, price)
    }

    pub fn is_undercollateralized(
        env: Env,
        account: Address,
        market: Address,
        hint: MarketSnapshot,
    ) -> Result<bool, ControllerError> {
        let adjustment = Adjustment {
            market: &market,
            hint: &hint,
            redeem_tokens: 0,
            borrow_amount: 0,
        };
        let (_, shortfall) = liquidity(&env, &account, Some(adjustment))?;
        Ok(shortfall > 0)
    }

    // Views

    pub fn is_market_listed(env: Env, market: Address) -> bool {
        is_listed(&env, &market)
    }

    pub fn collateral_factor(env: Env, market: Address) -> Result<u128, ControllerError> {
        if !is_listed(&env, &market) {
            return Err(ControllerError::MarketNotListed);
        }
        Ok(read_collateral_factor(&env, &market))
    }

    pub fn close_factor(env: Env) -> u128 {
        read_mantissa(&env, &DataKey::CloseFactor, DEFAULT_CLOSE_FACTOR)
    }

    pub fn liquidation_incentive(env: Env) -> u128 {
        read_mantissa(
            &env,
            &DataKey::LiquidationIncentive,
            DEFAULT_LIQUIDATION_INCENTIVE,
        )
    }

    pub fn oracle(env: Env) -> Result<Address, ControllerError> {
        read_oracle(&env)
    }

    pub fn admin(env: Env) -> Result<Address, ControllerError> {
        read_admin(&env)
    }
}

fn add_membership(env: &Env, market: &Address, account: &Address) -> Result<(), ControllerError> {
    if !is_listed(env, market) {
        return Err(ControllerError::MarketNotListed);
    }
    let mut entered = user_markets(env, account);
    if entered.contains(market.clone()) {
        return Ok(());
    }
    if entered.len() >= MAX_ASSETS_PER_ACCOUNT {
        return Err(ControllerError::TooManyMarkets);
    }
    entered.push_back(market.clone());
    write_user_markets(env, account, &entered);
    MarketEntered {
        market: market.clone(),
        account: account.clone(),
    }
    .publish(env);
    Ok(())
}

/// Sums collateral (claim balance x exchange rate x collateral factor x price)
/// against debt (borrow balance x price) over every market the account has
/// entered. The adjusted market's position comes from its hint.
fn liquidity(
    env: &Env,
    account: &Address,
    adjustment: Option<Adjustment>,
) -> Result<(u128, u128), ControllerError> {
    let oracle = OracleClient::new(env, &read_oracle(env)?);
    let mut sum_collateral = 0u128;
    let mut sum_borrow = 0u128;

    for asset in user_markets(env, account).iter() {
        let (snapshot, redeem_tokens, borrow_amount) = match &adjustment {
            Some(adj) if *adj.market == asset => {
                (adj.hint.clone(), adj.redeem_tokens, adj.borrow_amount)
            }
            _ => (
                MarketClient::new(env, &asset).get_account_snapshot(account),
                0,
                0,
            ),
        };
        if snapshot.claim_balance == 0
            && snapshot.borrow_balance == 0
            && redeem_tokens == 0
            && borrow_amount == 0
        {
            continue;
        }

        let price = price_of(&oracle, &asset)?;
        let collateral_factor = read_collateral_factor(env, &asset);
        let tokens_to_denom = mul_exp(
            env,
            mul_exp(env, collateral_factor, snapshot.exchange_rate)?,
            price,
        )?;

        sum_collateral = add(
            sum_collateral,
            mul_exp(env, tokens_to_denom, snapshot.claim_balance)?,
        )?;
        sum_borrow = add(sum_borrow, mul_exp(env, price, snapshot.borrow_balance)?)?;
        sum_borrow = add(sum_borrow, mul_exp(env, tokens_to_denom, redeem_tokens)?)?;
        sum_borrow = add(sum_borrow, mul_exp(env, price, borrow_amount)?)?;
    }

    if sum_collateral > sum_borrow {
        Ok((sum_collateral - sum_borrow, 0))
    } else {
        Ok((0, sum_borrow - sum_collateral))
    }
}

fn price_of(oracle: &OracleClient, market: &Address) -> Result<u128, ControllerError> {
    match oracle.get_underlying_price(market) {
        0 => Err(ControllerError::PriceUnavailable),
        price => Ok(price),
    }
}

fn add(a: u128, b: u128) -> Result<u128, ControllerError> {
    a.checked_add(b).ok_or(ControllerError::MathOverflow)
}

fn mul_exp(env: &Env, a: u128, b: u128) -> Result<u128, ControllerError> {
    mul_div(env, a, b, EXP_SCALE)
}

fn mul_div(env: &Env, a: u128, b: u128, denominator: u128) -> Result<u128, ControllerError> {
    if let Some(product) = a.checked_mul(b) {
        return Ok(product / denominator);
    }
    U256::from_u128(env, a)
        .mul(&U256::from_u128(env, b))
        .div(&U256::from_u128(env, denominator))
        .to_u128()
        .ok_or(ControllerError::MathOverflow)
}

mod test;
