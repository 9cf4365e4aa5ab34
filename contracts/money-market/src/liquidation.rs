use soroban_sdk::{Address, Env};
use stellar_tokens::fungible::Base as TokenBase;

use crate::errors::MarketError;
use crate::interfaces::{ControllerClient, PeerMarketClient, PriceOracleClient};
use crate::math::{div_exp, mul_exp, to_i128};
use crate::storage::{claim_balance, MarketConfig, MarketSnapshot};

/// Claim tokens of the collateral market worth `actual_repay` of the repaid
/// asset plus the liquidation incentive:
/// `repay * incentive * price_repaid / (price_collateral * exchange_rate)`.
pub fn compute_seize_tokens(
    env: &Env,
    actual_repay: u128,
    incentive: u128,
    price_repaid: u128,
    price_collateral: u128,
    collateral_exchange_rate: u128,
) -> Result<u128, MarketError> {
    if price_repaid == 0 || price_collateral == 0 {
        return Err(MarketError::PriceUnavailable);
    }
    let numerator = mul_exp(env, incentive, price_repaid)?;
    let denominator = mul_exp(env, price_collateral, collateral_exchange_rate)?;
    if denominator == 0 {
        return Err(MarketError::DivisionByZero);
    }
    let ratio = div_exp(env, numerator, denominator)?;
    mul_exp(env, ratio, actual_repay)
}

/// Prices both markets and converts a repayment into seized claim tokens.
pub fn seize_tokens_for(
    env: &Env,
    controller: &ControllerClient,
    collateral_market: &Address,
    actual_repay: u128,
    collateral_exchange_rate: u128,
) -> Result<u128, MarketError> {
    let oracle = PriceOracleClient::new(env, &controller.oracle());
    compute_seize_tokens(
        env,
        actual_repay,
        controller.liquidation_incentive(),
        oracle.get_underlying_price(&env.current_contract_address()),
        oracle.get_underlying_price(collateral_market),
        collateral_exchange_rate,
    )
}

/// Shared preconditions of both liquidation paths. The borrower's position in
/// this market is passed as the controller hint.
pub fn ensure_liquidatable(
    env: &Env,
    config: &MarketConfig,
    liquidator: &Address,
    borrower: &Address,
    collateral_market: &Address,
    hint: &MarketSnapshot,
) -> Result<(), MarketError> {
    if liquidator == borrower {
        return Err(MarketError::LiquidatorIsBorrower);
    }
    let me = env.current_contract_address();
    let controller = ControllerClient::new(env, &config.controller);
    if !controller.is_market_listed(&me) || !controller.is_market_listed(collateral_market) {
        return Err(MarketError::MarketNotListed);
    }
    if *collateral_market != me
        && PeerMarketClient::new(env, collateral_market).controller() != config.controller
    {
        return Err(MarketError::ControllerMismatch);
    }
    if !controller.is_undercollateralized(borrower, &me, hint) {
        return Err(MarketError::NotUndercollateralized);
    }
    Ok(())
}

/// Moves `seize_tokens` claim tokens from borrower to liquidator in this market.
pub fn seize_internal(
    env: &Env,
    liquidator: &Address,
    borrower: &Address,
    seize_tokens: u128,
) -> Result<(), MarketError> {
    if liquidator == borrower {
        return Err(MarketError::LiquidatorIsBorrower);
    }
    if claim_balance(env, borrower) < seize_tokens {
        return Err(MarketError::InsufficientCollateralToSeize);
    }
    if seize_tokens == 0 {
        return Ok(());
    }
    let amount = to_i128(seize_tokens)?;
    TokenBase::update(env, Some(borrower), Some(liquidator), amount);
    stellar_tokens::fungible::emit_transfer(env, borrower, liquidator, amount);
    Ok(())
}

/// Runs the seize in whichever market holds the collateral.
pub fn seize_collateral(
    env: &Env,
    collateral_market: &Address,
    liquidator: &Address,
    borrower: &Address,
    seize_tokens: u128,
) -> Result<(), MarketError> {
    let me = env.current_contract_address();
    if *collateral_market == me {
        return seize_internal(env, liquidator, borrower, seize_tokens);
    }
    let peer = PeerMarketClient::new(env, collateral_market);
    if peer.balance(borrower) < seize_tokens {
        return Err(MarketError::InsufficientCollateralToSeize);
    }
    peer.seize(&me, liquidator, borrower, &seize_tokens);
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::constants::EXP_SCALE;

    #[test]
    fn test_seize_tokens_reference_case() {
        let env = Env::default();
        // 50 repaid at 2.00, collateral at 1.00 with exchange rate 1.0, 8% bonus.
        let seize = compute_seize_tokens(
            &env,
            50,
            1_080_000_000_000_000_000,
            2 * EXP_SCALE,
            EXP_SCALE,
            EXP_SCALE,
        )
        .unwrap();
        assert_eq!(seize, 108);
    }

    #[test]
    fn test_seize_tokens_scales_with_exchange_rate() {
        let env = Env::default();
        let seize = compute_seize_tokens(
            &env,
            1_000_000,
            EXP_SCALE,
            EXP_SCALE,
            EXP_SCALE,
            2 * EXP_SCALE,
        )
        .unwrap();
        assert_eq!(seize, 500_000);
    }

    #[test]
    fn test_seize_tokens_zero_price() {
        let env = Env::default();
        assert_eq!(
            compute_seize_tokens(&env, 50, EXP_SCALE, 0, EXP_SCALE, EXP_SCALE),
            Err(MarketError::PriceUnavailable)
        );
        assert_eq!(
            compute_seize_tokens(&env, 50, EXP_SCALE, EXP_SCALE, 0, EXP_SCALE),
            Err(MarketError::PriceUnavailable)
        );
    }
}
