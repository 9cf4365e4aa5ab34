use soroban_sdk::{contractevent, Address, Vec};

/// Mirrors Compound's AccrueInterest event.
#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AccrueInterest {
    pub cash_prior: u128,
    pub interest_accumulated: u128,
    pub borrow_index: u128,
    pub total_borrows: u128,
}

/// Mirrors Compound's Mint event: emitted when claim tokens are minted.
#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Mint {
    #[topic]
    pub minter: Address,
    pub mint_amount: u128,
    pub mint_tokens: u128,
}

/// Mirrors Compound's Redeem event: emitted when claim tokens are burned.
#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Redeem {
    #[topic]
    pub redeemer: Address,
    pub redeem_amount: u128,
    pub redeem_tokens: u128,
}

/// Mirrors Compound's Borrow event.
#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Borrow {
    #[topic]
    pub borrower: Address,
    pub borrow_amount: u128,
    pub account_borrows: u128,
    pub total_borrows: u128,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BorrowFixedRate {
    #[topic]
    pub borrower: Address,
    pub loan_index: u64,
    pub borrow_amount: u128,
    pub rate_per_second: u128,
    pub maturity: u64,
}

/// Mirrors Compound's RepayBorrow event.
#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RepayBorrow {
    #[topic]
    pub payer: Address,
    #[topic]
    pub borrower: Address,
    pub repay_amount: u128,
    pub account_borrows: u128,
    pub total_borrows: u128,
}

/// One settled fixed-rate loan. `remaining_principal` is zero when the loan was closed.
#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RepayFixedRate {
    #[topic]
    pub payer: Address,
    #[topic]
    pub borrower: Address,
    pub loan_index: u64,
    pub repay_amount: u128,
    pub remaining_principal: u128,
}

/// Mirrors Compound's LiquidateBorrow event.
#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LiquidateBorrow {
    #[topic]
    pub liquidator: Address,
    #[topic]
    pub borrower: Address,
    pub repay_amount: u128,
    pub collateral_market: Address,
    pub seize_tokens: u128,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LiquidateFixedRate {
    #[topic]
    pub liquidator: Address,
    #[topic]
    pub borrower: Address,
    pub loan_indexes: Vec<u64>,
    pub repay_amount: u128,
    pub collateral_market: Address,
    pub seize_tokens: u128,
}

/// Mirrors Compound's ReservesAdded event.
#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReservesAdded {
    #[topic]
    pub benefactor: Address,
    pub add_amount: u128,
    pub new_total_reserves: u128,
}

/// Mirrors Compound's ReservesReduced event.
#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReservesReduced {
    #[topic]
    pub admin: Address,
    pub reduce_amount: u128,
    pub new_total_reserves: u128,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TokenSwept {
    #[topic]
    pub token: Address,
    pub amount: u128,
}

/// Mirrors Compound's NewReserveFactor event.
#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NewReserveFactor {
    pub old_reserve_factor_mantissa: u128,
    pub new_reserve_factor_mantissa: u128,
}

/// Mirrors Compound's NewMarketInterestRateModel event.
#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NewInterestRateModel {
    #[topic]
    pub model: Address,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NewFixedRatePremium {
    pub premium_mantissa: u128,
}

/// Mirrors Compound's NewAdmin event.
#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NewAdmin {
    #[topic]
    pub admin: Address,
}
