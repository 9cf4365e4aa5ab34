use soroban_sdk::Env;

use crate::constants::EXP_SCALE;
use crate::errors::MarketError;
use crate::math::{add, mul_div, mul_exp, sub};
use crate::storage::MarketState;

impl MarketState {
    pub fn new(now: u64) -> Self {
        MarketState {
            total_borrows: 0,
            total_fixed_borrows: 0,
            total_reserves: 0,
            borrow_index: EXP_SCALE,
            accrual_timestamp: now,
        }
    }

    /// Borrows the rate model is quoted on: variable plus fixed principal.
    pub fn rate_model_borrows(&self) -> Result<u128, MarketError> {
        add(self.total_borrows, self.total_fixed_borrows)
    }

    /// Advances the index and variable borrows to `now`. Returns the interest
    /// accumulated on variable debt.
    pub fn accrue(
        &mut self,
        env: &Env,
        borrow_rate: u128,
        now: u64,
        reserve_factor: u128,
    ) -> Result<u128, MarketError> {
        let elapsed = now
            .checked_sub(self.accrual_timestamp)
            .ok_or(MarketError::MathUnderflow)?;
        let simple_interest_factor = borrow_rate
            .checked_mul(elapsed as u128)
            .ok_or(MarketError::MathOverflow)?;
        let interest = mul_exp(env, simple_interest_factor, self.total_borrows)?;
        let reserves_delta = mul_exp(env, reserve_factor, interest)?;
        let index_delta = mul_exp(env, simple_interest_factor, self.borrow_index)?;

        self.total_borrows = add(self.total_borrows, interest)?;
        self.total_reserves = add(self.total_reserves, reserves_delta)?;
        self.borrow_index = add(self.borrow_index, index_delta)?;
        self.accrual_timestamp = now;
        Ok(interest)
    }

    pub fn add_variable_borrow(&mut self, amount: u128) -> Result<(), MarketError> {
        self.total_borrows = add(self.total_borrows, amount)?;
        Ok(())
    }

    /// Account balances round down independently of the aggregate, so the last
    /// repayment may exceed `total_borrows` by a few units; the aggregate floors
    /// at zero instead of blocking that repayment.
    pub fn remove_variable_borrow(&mut self, amount: u128) {
        self.total_borrows = self.total_borrows.saturating_sub(amount);
    }

    pub fn add_fixed_principal(&mut self, amount: u128) -> Result<(), MarketError> {
        self.total_fixed_borrows = add(self.total_fixed_borrows, amount)?;
        Ok(())
    }

    /// Settles one fixed loan: recognises its accrued interest into reserves and
    /// swaps its old principal for the remaining one.
    pub fn settle_fixed(
        &mut self,
        env: &Env,
        old_principal: u128,
        new_principal: u128,
        interest: u128,
        reserve_factor: u128,
    ) -> Result<(), MarketError> {
        let reserves_delta = mul_exp(env, reserve_factor, interest)?;
        self.total_reserves = add(self.total_reserves, reserves_delta)?;
        self.total_fixed_borrows = add(sub(self.total_fixed_borrows, old_principal)?, new_principal)?;
        Ok(())
    }

    pub fn add_reserves(&mut self, amount: u128) -> Result<(), MarketError> {
        self.total_reserves = add(self.total_reserves, amount)?;
        Ok(())
    }

    pub fn reduce_reserves(&mut self, amount: u128) -> Result<(), MarketError> {
        if amount > self.total_reserves {
            return Err(MarketError::InsufficientReserves);
        }
        self.total_reserves -= amount;
        Ok(())
    }

    /// `cash + total_borrows + total_fixed_borrows - total_reserves`.
    pub fn total_underlying(&self, cash: u128) -> Result<u128, MarketError> {
        sub(add(cash, self.rate_model_borrows()?)?, self.total_reserves)
    }

    pub fn exchange_rate(
        &self,
        env: &Env,
        cash: u128,
        claim_supply: u128,
        initial_exchange_rate: u128,
    ) -> Result<u128, MarketError> {
        if claim_supply == 0 {
            return Ok(initial_exchange_rate);
        }
        mul_div(env, self.total_underlying(cash)?, EXP_SCALE, claim_supply)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_accrue_moves_index_borrows_and_reserves() {
        let env = Env::default();
        let mut state = MarketState::new(100);
        state.total_borrows = 1_000_000_000_000;
        // 1e9 per second for 1000 seconds, 10% reserve factor
        let interest = state
            .accrue(&env, 1_000_000_000, 1_100, EXP_SCALE / 10)
            .unwrap();
        assert_eq!(interest, 1_000_000);
        assert_eq!(state.total_borrows, 1_000_001_000_000);
        assert_eq!(state.total_reserves, 100_000);
        assert_eq!(state.borrow_index, EXP_SCALE + 1_000_000_000_000);
        assert_eq!(state.accrual_timestamp, 1_100);
    }

    #[test]
    fn test_accrue_rejects_time_going_backwards() {
        let env = Env::default();
        let mut state = MarketState::new(100);
        assert_eq!(
            state.accrue(&env, 1, 99, 0),
            Err(MarketError::MathUnderflow)
        );
    }

    #[test]
    fn test_exchange_rate_uses_initial_rate_without_supply() {
        let env = Env::default();
        let state = MarketState::new(0);
        assert_eq!(state.exchange_rate(&env, 500, 0, 2 * EXP_SCALE).unwrap(), 2 * EXP_SCALE);
    }

    #[test]
    fn test_exchange_rate_counts_fixed_borrows_and_excludes_reserves() {
        let env = Env::default();
        let mut state = MarketState::new(0);
        state.total_borrows = 300;
        state.total_fixed_borrows = 200;
        state.total_reserves = 100;
        // (600 + 300 + 200 - 100) / 500
        assert_eq!(state.exchange_rate(&env, 600, 500, EXP_SCALE).unwrap(), 2 * EXP_SCALE);
    }

    #[test]
    fn test_reduce_reserves_beyond_balance_fails() {
        let mut state = MarketState::new(0);
        state.add_reserves(10).unwrap();
        assert_eq!(state.reduce_reserves(11), Err(MarketError::InsufficientReserves));
        state.reduce_reserves(10).unwrap();
        assert_eq!(state.total_reserves, 0);
    }
}
