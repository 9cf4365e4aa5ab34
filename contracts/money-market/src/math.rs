use soroban_sdk::{Env, U256};

use crate::constants::EXP_SCALE;
use crate::errors::MarketError;

pub fn add(a: u128, b: u128) -> Result<u128, MarketError> {
    a.checked_add(b).ok_or(MarketError::MathOverflow)
}

pub fn sub(a: u128, b: u128) -> Result<u128, MarketError> {
    a.checked_sub(b).ok_or(MarketError::MathUnderflow)
}

/// `a * b / denominator`, rounded down. Falls back to 256-bit width when the
/// product does not fit in 128 bits.
pub fn mul_div(env: &Env, a: u128, b: u128, denominator: u128) -> Result<u128, MarketError> {
    if denominator == 0 {
        return Err(MarketError::DivisionByZero);
    }
    if let Some(product) = a.checked_mul(b) {
        return Ok(product / denominator);
    }
    let wide = U256::from_u128(env, a).mul(&U256::from_u128(env, b));
    wide.div(&U256::from_u128(env, denominator))
        .to_u128()
        .ok_or(MarketError::MathOverflow)
}

/// `a * b / denominator`, rounded up.
pub fn mul_div_up(env: &Env, a: u128, b: u128, denominator: u128) -> Result<u128, MarketError> {
    if denominator == 0 {
        return Err(MarketError::DivisionByZero);
    }
    if let Some(product) = a.checked_mul(b) {
        let quotient = product / denominator;
        return if product % denominator == 0 {
            Ok(quotient)
        } else {
            add(quotient, 1)
        };
    }
    let d = U256::from_u128(env, denominator);
    let wide = U256::from_u128(env, a).mul(&U256::from_u128(env, b));
    let bumped = wide.add(&d.sub(&U256::from_u32(env, 1)));
    bumped.div(&d).to_u128().ok_or(MarketError::MathOverflow)
}

/// Multiplies an amount (or mantissa) by a 1e18 mantissa.
pub fn mul_exp(env: &Env, a: u128, mantissa: u128) -> Result<u128, MarketError> {
    mul_div(env, a, mantissa, EXP_SCALE)
}

/// Divides `a` by a 1e18 mantissa, rounded down.
pub fn div_exp(env: &Env, a: u128, mantissa: u128) -> Result<u128, MarketError> {
    mul_div(env, a, EXP_SCALE, mantissa)
}

pub fn div_exp_up(env: &Env, a: u128, mantissa: u128) -> Result<u128, MarketError> {
    mul_div_up(env, a, EXP_SCALE, mantissa)
}

pub fn to_i128(amount: u128) -> Result<i128, MarketError> {
    i128::try_from(amount).map_err(|_| MarketError::MathOverflow)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_mul_div_widens_past_u128() {
        let env = Env::default();
        let big = u128::MAX / 2;
        // (big * 4e18) / 8e18 == big / 2
        let out = mul_div(&env, big, 4 * EXP_SCALE, 8 * EXP_SCALE).unwrap();
        assert_eq!(out, big / 2);
    }

    #[test]
    fn test_mul_div_result_too_large_overflows() {
        let env = Env::default();
        assert_eq!(
            mul_div(&env, u128::MAX, 3, 2),
            Err(MarketError::MathOverflow)
        );
    }

    #[test]
    fn test_rounding_directions() {
        let env = Env::default();
        assert_eq!(div_exp(&env, 3, 2 * EXP_SCALE).unwrap(), 1);
        assert_eq!(div_exp_up(&env, 3, 2 * EXP_SCALE).unwrap(), 2);
        assert_eq!(div_exp_up(&env, 4, 2 * EXP_SCALE).unwrap(), 2);
        assert_eq!(mul_div_up(&env, u128::MAX, 2, 4).unwrap(), u128::MAX / 2 + 1);
    }

    #[test]
    fn test_zero_denominator() {
        let env = Env::default();
        assert_eq!(mul_div(&env, 1, 1, 0), Err(MarketError::DivisionByZero));
        assert_eq!(div_exp_up(&env, 1, 0), Err(MarketError::DivisionByZero));
    }
}
