use soroban_sdk::{contract, contractimpl, token, Address, Env, String, Vec};
use stellar_tokens::fungible::burnable::emit_burn;
use stellar_tokens::fungible::Base as TokenBase;

use crate::constants::{BORROW_RATE_MAX_MANTISSA, RESERVE_FACTOR_MAX_MANTISSA};
use crate::errors::MarketError;
use crate::events::{
    Borrow, BorrowFixedRate, LiquidateBorrow, LiquidateFixedRate, Mint, NewAdmin,
    NewFixedRatePremium, NewInterestRateModel, NewReserveFactor, Redeem, RepayBorrow,
    RepayFixedRate, ReservesAdded, ReservesReduced, TokenSwept,
};
use crate::interfaces::{ControllerClient, PeerMarketClient};
use crate::math::{add, div_exp, div_exp_up, mul_exp, to_i128};
use crate::storage::*;
use crate::{fixed, interest, liquidation, transfer, variable};

#[contract]
pub struct MoneyMarket;

#[contractimpl]
impl MoneyMarket {
    /// Wires the market to its underlying asset, controller and rate model and
    /// names its claim token. Reserve factor and fixed premium start at zero.
    #[allow(clippy::too_many_arguments)]
    pub fn initialize(
        env: Env,
        admin: Address,
        underlying: Address,
        controller: Address,
        interest_rate_model: Address,
        initial_exchange_rate: u128,
        name: String,
        symbol: String,
        decimals: u32,
    ) -> Result<(), MarketError> {
        if is_initialized(&env) {
            return Err(MarketError::AlreadyInitialized);
        }
        admin.require_auth();
        if initial_exchange_rate == 0 {
            return Err(MarketError::InvalidExchangeRate);
        }
        interest::validate_rate_model(&env, &interest_rate_model)?;

        write_admin(&env, &admin);
        write_config(
            &env,
            &MarketConfig {
                underlying,
                controller,
                interest_rate_model,
                initial_exchange_rate,
                reserve_factor: 0,
                fixed_rate_premium: 0,
            },
        );
        write_state(&env, &MarketState::new(env.ledger().timestamp()));
        TokenBase::set_metadata(&env, decimals, name, symbol);
        bump_core_ttl(&env);
        Ok(())
    }

    pub fn accrue_interest(env: Env) -> Result<(), MarketError> {
        let config = read_config(&env);
        interest::accrue_interest(&env, &config)?;
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Supply side
    // ---------------------------------------------------------------------

    /// Supplies `amount` of the underlying and mints claim tokens for what
    /// actually arrived. Returns the minted claim tokens.
    pub fn mint(env: Env, minter: Address, amount: u128) -> Result<u128, MarketError> {
        minter.require_auth();
        let config = read_config(&env);
        let state = interest::accrue_interest(&env, &config)?;
        if amount == 0 {
            return Err(MarketError::InvalidAmount);
        }
        let controller = ControllerClient::new(&env, &config.controller);
        if !controller.is_market_listed(&env.current_contract_address()) {
            return Err(MarketError::MarketNotListed);
        }

        let exchange_rate = stored_exchange_rate(&env, &config, &state)?;
        let received = transfer::do_transfer_in(&env, &config.underlying, &minter, amount)?;
        let mint_tokens = div_exp(&env, received, exchange_rate)?;
        if mint_tokens == 0 {
            return Err(MarketError::AmountTooSmall);
        }
        TokenBase::mint(&env, &minter, to_i128(mint_tokens)?);

        Mint {
            minter,
            mint_amount: received,
            mint_tokens,
        }
        .publish(&env);
        Ok(mint_tokens)
    }

    /// Burns `claim_tokens` and pays out their underlying value. Returns the
    /// underlying paid.
    pub fn redeem(env: Env, redeemer: Address, claim_tokens: u128) -> Result<u128, MarketError> {
        redeemer.require_auth();
        if claim_tokens == 0 {
            return Err(MarketError::InvalidAmount);
        }
        let (_, amount) = redeem_fresh(&env, &redeemer, claim_tokens, 0)?;
        Ok(amount)
    }

    /// Pays out exactly `amount` of the underlying, burning claim tokens
    /// rounded up. Returns the claim tokens burned.
    pub fn redeem_underlying(
        env: Env,
        redeemer: Address,
        amount: u128,
    ) -> Result<u128, MarketError> {
        redeemer.require_auth();
        if amount == 0 {
            return Err(MarketError::InvalidAmount);
        }
        let (tokens, _) = redeem_fresh(&env, &redeemer, 0, amount)?;
        Ok(tokens)
    }

    // ---------------------------------------------------------------------
    // Variable-rate debt
    // ---------------------------------------------------------------------

    pub fn borrow(env: Env, borrower: Address, amount: u128) -> Result<(), MarketError> {
        borrower.require_auth();
        let config = read_config(&env);
        let mut state = interest::accrue_interest(&env, &config)?;
        if amount == 0 {
            return Err(MarketError::InvalidAmount);
        }
        let cash = transfer::get_cash(&env, &config.underlying)?;
        if cash < amount {
            return Err(MarketError::InsufficientCash);
        }
        check_borrow_allowed(&env, &config, &state, &borrower, amount)?;

        let account_borrows = variable::update_borrow(&env, &mut state, &borrower, amount, true)?;
        write_state(&env, &state);
        transfer::do_transfer_out(&env, &config.underlying, &borrower, amount)?;

        Borrow {
            borrower,
            borrow_amount: amount,
            account_borrows,
            total_borrows: state.total_borrows,
        }
        .publish(&env);
        Ok(())
    }

    /// Repays the caller's own variable debt. `u128::MAX` repays everything.
    /// Returns the amount credited.
    pub fn repay_borrow(env: Env, borrower: Address, amount: u128) -> Result<u128, MarketError> {
        borrower.require_auth();
        repay_borrow_fresh(&env, &borrower, &borrower, amount)
    }

    pub fn repay_borrow_behalf(
        env: Env,
        payer: Address,
        borrower: Address,
        amount: u128,
    ) -> Result<u128, MarketError> {
        payer.require_auth();
        repay_borrow_fresh(&env, &payer, &borrower, amount)
    }

    // ---------------------------------------------------------------------
    // Fixed-rate debt
    // ---------------------------------------------------------------------

    /// Opens a fixed-rate loan maturing at `maturity` and returns its index.
    pub fn borrow_fixed_rate(
        env: Env,
        borrower: Address,
        amount: u128,
        maturity: u64,
    ) -> Result<u64, MarketError> {
        borrower.require_auth();
        let config = read_config(&env);
        let mut state = interest::accrue_interest(&env, &config)?;
        if amount == 0 {
            return Err(MarketError::InvalidAmount);
        }
        fixed::validate_maturity(env.ledger().timestamp(), maturity)?;
        let cash = transfer::get_cash(&env, &config.underlying)?;
        if cash < amount {
            return Err(MarketError::InsufficientCash);
        }
        check_borrow_allowed(&env, &config, &state, &borrower, amount)?;

        let rate_per_second = fixed::quote_fixed_rate(&env, &config, &state, cash, amount)?;
        let loan_index =
            fixed::originate(&env, &mut state, &borrower, amount, rate_per_second, maturity)?;
        write_state(&env, &state);
        transfer::do_transfer_out(&env, &config.underlying, &borrower, amount)?;

        BorrowFixedRate {
            borrower,
            loan_index,
            borrow_amount: amount,
            rate_per_second,
            maturity,
        }
        .publish(&env);
        Ok(loan_index)
    }

    /// Repays the listed loans in full. Returns the total amount credited.
    pub fn repay_borrow_fixed_rate(
        env: Env,
        borrower: Address,
        indexes: Vec<u64>,
    ) -> Result<u128, MarketError> {
        borrower.require_auth();
        repay_fixed_fresh(&env, &borrower, &borrower, &indexes)
    }

    pub fn repay_borrow_fixed_rate_behalf(
        env: Env,
        payer: Address,
        borrower: Address,
        indexes: Vec<u64>,
    ) -> Result<u128, MarketError> {
        payer.require_auth();
        repay_fixed_fresh(&env, &payer, &borrower, &indexes)
    }

    // ---------------------------------------------------------------------
    // Liquidation
    // ---------------------------------------------------------------------

    /// Repays part of an undercollateralized borrower's variable debt and
    /// takes their claim tokens in `collateral_market`. Returns the seized
    /// claim tokens.
    pub fn liquidate_borrow(
        env: Env,
        liquidator: Address,
        borrower: Address,
        repay_amount: u128,
        collateral_market: Address,
    ) -> Result<u128, MarketError> {
        liquidator.require_auth();
        let config = read_config(&env);
        let mut state = accrue_both(&env, &config, &collateral_market)?;
        let hint = account_snapshot(&env, &config, &state, &borrower)?;
        liquidation::ensure_liquidatable(
            &env,
            &config,
            &liquidator,
            &borrower,
            &collateral_market,
            &hint,
        )?;

        if repay_amount == 0 {
            return Err(MarketError::InvalidAmount);
        }
        let owed = variable::borrow_balance_stored(&env, &state, &borrower)?;
        if owed == 0 {
            return Err(MarketError::NothingToRepay);
        }
        let controller = ControllerClient::new(&env, &config.controller);
        if repay_amount > mul_exp(&env, controller.close_factor(), owed)? {
            return Err(MarketError::TooMuchRepay);
        }

        let actual_repay =
            repay_variable(&env, &config, &mut state, &liquidator, &borrower, repay_amount)?;
        write_state(&env, &state);
        let seize_tokens = seize_after_repay(
            &env,
            &config,
            &state,
            &liquidator,
            &borrower,
            &collateral_market,
            actual_repay,
        )?;

        LiquidateBorrow {
            liquidator,
            borrower,
            repay_amount: actual_repay,
            collateral_market,
            seize_tokens,
        }
        .publish(&env);
        Ok(seize_tokens)
    }

    /// Repays the listed fixed-rate loans of an undercollateralized borrower
    /// in full and seizes collateral for the sum in one step.
    pub fn liquidate_borrow_fixed_rate(
        env: Env,
        liquidator: Address,
        borrower: Address,
        indexes: Vec<u64>,
        collateral_market: Address,
    ) -> Result<u128, MarketError> {
        liquidator.require_auth();
        let config = read_config(&env);
        let mut state = accrue_both(&env, &config, &collateral_market)?;
        let hint = account_snapshot(&env, &config, &state, &borrower)?;
        liquidation::ensure_liquidatable(
            &env,
            &config,
            &liquidator,
            &borrower,
            &collateral_market,
            &hint,
        )?;

        let actual_repay = repay_fixed(&env, &config, &mut state, &liquidator, &borrower, &indexes)?;
        write_state(&env, &state);
        let seize_tokens = seize_after_repay(
            &env,
            &config,
            &state,
            &liquidator,
            &borrower,
            &collateral_market,
            actual_repay,
        )?;

        LiquidateFixedRate {
            liquidator,
            borrower,
            loan_indexes: indexes,
            repay_amount: actual_repay,
            collateral_market,
            seize_tokens,
        }
        .publish(&env);
        Ok(seize_tokens)
    }

    /// Collateral side of a cross-market liquidation. Only a listed market
    /// sharing this market's controller may call it.
    pub fn seize(
        env: Env,
        seizer_market: Address,
        liquidator: Address,
        borrower: Address,
        seize_tokens: u128,
    ) -> Result<(), MarketError> {
        seizer_market.require_auth();
        let config = read_config(&env);
        let controller = ControllerClient::new(&env, &config.controller);
        if !controller.is_market_listed(&seizer_market)
            || !controller.is_market_listed(&env.current_contract_address())
        {
            return Err(MarketError::MarketNotListed);
        }
        liquidation::seize_internal(&env, &liquidator, &borrower, seize_tokens)
    }

    // ---------------------------------------------------------------------
    // Reserves and admin
    // ---------------------------------------------------------------------

    /// Adds what actually arrives from `from` to reserves.
    pub fn add_reserves(env: Env, from: Address, amount: u128) -> Result<u128, MarketError> {
        from.require_auth();
        let config = read_config(&env);
        let mut state = interest::accrue_interest(&env, &config)?;
        if amount == 0 {
            return Err(MarketError::InvalidAmount);
        }
        let received = transfer::do_transfer_in(&env, &config.underlying, &from, amount)?;
        state.add_reserves(received)?;
        write_state(&env, &state);

        ReservesAdded {
            benefactor: from,
            add_amount: received,
            new_total_reserves: state.total_reserves,
        }
        .publish(&env);
        Ok(received)
    }

    pub fn reduce_reserves(env: Env, amount: u128) -> Result<(), MarketError> {
        let admin = require_admin(&env);
        let config = read_config(&env);
        let mut state = interest::accrue_interest(&env, &config)?;
        if amount == 0 {
            return Err(MarketError::InvalidAmount);
        }
        if transfer::get_cash(&env, &config.underlying)? < amount {
            return Err(MarketError::InsufficientCash);
        }
        state.reduce_reserves(amount)?;
        write_state(&env, &state);
        transfer::do_transfer_out(&env, &config.underlying, &admin, amount)?;

        ReservesReduced {
            admin,
            reduce_amount: amount,
            new_total_reserves: state.total_reserves,
        }
        .publish(&env);
        Ok(())
    }

    /// Sends this market's whole balance of a foreign token to the admin.
    pub fn sweep_token(env: Env, token: Address) -> Result<u128, MarketError> {
        let admin = require_admin(&env);
        let config = read_config(&env);
        let me = env.current_contract_address();
        if token == config.underlying || token == me {
            return Err(MarketError::CannotSweepUnderlying);
        }
        let client = token::Client::new(&env, &token);
        let balance = client.balance(&me);
        if balance > 0 {
            client.transfer(&me, &admin, &balance);
        }
        let amount = u128::try_from(balance).map_err(|_| MarketError::TransferFailed)?;

        TokenSwept { token, amount }.publish(&env);
        Ok(amount)
    }

    pub fn set_reserve_factor(env: Env, reserve_factor: u128) -> Result<(), MarketError> {
        require_admin(&env);
        let mut config = read_config(&env);
        interest::accrue_interest(&env, &config)?;
        if reserve_factor > RESERVE_FACTOR_MAX_MANTISSA {
            return Err(MarketError::InvalidReserveFactor);
        }
        let old = config.reserve_factor;
        config.reserve_factor = reserve_factor;
        write_config(&env, &config);

        NewReserveFactor {
            old_reserve_factor_mantissa: old,
            new_reserve_factor_mantissa: reserve_factor,
        }
        .publish(&env);
        Ok(())
    }

    pub fn set_interest_rate_model(env: Env, model: Address) -> Result<(), MarketError> {
        require_admin(&env);
        let mut config = read_config(&env);
        interest::accrue_interest(&env, &config)?;
        interest::validate_rate_model(&env, &model)?;
        config.interest_rate_model = model.clone();
        write_config(&env, &config);

        NewInterestRateModel { model }.publish(&env);
        Ok(())
    }

    /// Spread added on top of the model rate when a fixed loan is quoted.
    pub fn set_fixed_rate_premium(env: Env, premium: u128) -> Result<(), MarketError> {
        require_admin(&env);
        let mut config = read_config(&env);
        if premium > BORROW_RATE_MAX_MANTISSA {
            return Err(MarketError::BorrowRateTooHigh);
        }
        config.fixed_rate_premium = premium;
        write_config(&env, &config);

        NewFixedRatePremium {
            premium_mantissa: premium,
        }
        .publish(&env);
        Ok(())
    }

    pub fn set_admin(env: Env, new_admin: Address) {
        require_admin(&env);
        write_admin(&env, &new_admin);
        NewAdmin { admin: new_admin }.publish(&env);
    }

    // ---------------------------------------------------------------------
    // Claim token
    // ---------------------------------------------------------------------

    pub fn transfer(env: Env, from: Address, to: Address, amount: u128) -> Result<(), MarketError> {
        transfer_claim(&env, None, &from, &to, amount)
    }

    pub fn transfer_from(
        env: Env,
        spender: Address,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), MarketError> {
        transfer_claim(&env, Some(&spender), &from, &to, amount)
    }

    pub fn approve(
        env: Env,
        owner: Address,
        spender: Address,
        amount: u128,
        live_until_ledger: u32,
    ) -> Result<(), MarketError> {
        TokenBase::approve(&env, &owner, &spender, to_i128(amount)?, live_until_ledger);
        Ok(())
    }

    pub fn allowance(env: Env, owner: Address, spender: Address) -> u128 {
        let allowance = TokenBase::allowance(&env, &owner, &spender);
        if allowance < 0 {
            0
        } else {
            allowance as u128
        }
    }

    pub fn balance(env: Env, account: Address) -> u128 {
        claim_balance(&env, &account)
    }

    pub fn total_supply(env: Env) -> u128 {
        claim_supply(&env)
    }

    pub fn decimals(env: Env) -> u32 {
        TokenBase::decimals(&env)
    }

    pub fn name(env: Env) -> String {
        TokenBase::name(&env)
    }

    pub fn symbol(env: Env) -> String {
        TokenBase::symbol(&env)
    }

    // ---------------------------------------------------------------------
    // Views
    // ---------------------------------------------------------------------

    pub fn exchange_rate_stored(env: Env) -> Result<u128, MarketError> {
        let config = read_config(&env);
        stored_exchange_rate(&env, &config, &read_state(&env))
    }

    pub fn exchange_rate_current(env: Env) -> Result<u128, MarketError> {
        let config = read_config(&env);
        let state = interest::accrue_interest(&env, &config)?;
        stored_exchange_rate(&env, &config, &state)
    }

    pub fn get_cash(env: Env) -> Result<u128, MarketError> {
        transfer::get_cash(&env, &read_config(&env).underlying)
    }

    pub fn get_state(env: Env) -> MarketState {
        read_state(&env)
    }

    pub fn get_config(env: Env) -> MarketConfig {
        read_config(&env)
    }

    pub fn borrow_balance_stored(env: Env, account: Address) -> Result<u128, MarketError> {
        variable::borrow_balance_stored(&env, &read_state(&env), &account)
    }

    pub fn borrow_balance_current(env: Env, account: Address) -> Result<u128, MarketError> {
        let config = read_config(&env);
        let state = interest::accrue_interest(&env, &config)?;
        variable::borrow_balance_stored(&env, &state, &account)
    }

    pub fn fixed_loan(env: Env, account: Address, index: u64) -> Option<FixedLoan> {
        read_fixed_loan(&env, &account, index)
    }

    pub fn fixed_loan_owed(env: Env, account: Address, index: u64) -> Result<u128, MarketError> {
        let loan = fixed::load_loan(&env, &account, index)?;
        fixed::loan_owed(&env, &loan, env.ledger().timestamp())
    }

    pub fn open_fixed_loans(env: Env, account: Address) -> Vec<u64> {
        read_fixed_book(&env, &account).open
    }

    pub fn fixed_borrow_balance(env: Env, account: Address) -> Result<u128, MarketError> {
        fixed::fixed_borrow_balance(&env, &account, env.ledger().timestamp())
    }

    pub fn balance_of_underlying(env: Env, account: Address) -> Result<u128, MarketError> {
        let config = read_config(&env);
        let state = interest::accrue_interest(&env, &config)?;
        let exchange_rate = stored_exchange_rate(&env, &config, &state)?;
        mul_exp(&env, claim_balance(&env, &account), exchange_rate)
    }

    /// Claim balance, total debt of both kinds and exchange rate, from stored
    /// values. This is what the controller values the account with.
    pub fn get_account_snapshot(env: Env, account: Address) -> Result<MarketSnapshot, MarketError> {
        let config = read_config(&env);
        account_snapshot(&env, &config, &read_state(&env), &account)
    }

    pub fn borrow_rate_per_second(env: Env) -> Result<u128, MarketError> {
        let config = read_config(&env);
        let cash = transfer::get_cash(&env, &config.underlying)?;
        interest::borrow_rate_per_second(&env, &config, &read_state(&env), cash)
    }

    pub fn supply_rate_per_second(env: Env) -> Result<u128, MarketError> {
        let config = read_config(&env);
        let cash = transfer::get_cash(&env, &config.underlying)?;
        interest::supply_rate_per_second(&env, &config, &read_state(&env), cash)
    }

    pub fn underlying(env: Env) -> Address {
        read_config(&env).underlying
    }

    pub fn controller(env: Env) -> Address {
        read_config(&env).controller
    }

    pub fn admin(env: Env) -> Address {
        read_admin(&env)
    }
}

fn require_admin(env: &Env) -> Address {
    let admin = read_admin(env);
    admin.require_auth();
    admin
}

fn stored_exchange_rate(
    env: &Env,
    config: &MarketConfig,
    state: &MarketState,
) -> Result<u128, MarketError> {
    let cash = transfer::get_cash(env, &config.underlying)?;
    state.exchange_rate(env, cash, claim_supply(env), config.initial_exchange_rate)
}

fn account_snapshot(
    env: &Env,
    config: &MarketConfig,
    state: &MarketState,
    account: &Address,
) -> Result<MarketSnapshot, MarketError> {
    let variable_debt = variable::borrow_balance_stored(env, state, account)?;
    let fixed_debt = fixed::fixed_borrow_balance(env, account, env.ledger().timestamp())?;
    Ok(MarketSnapshot {
        claim_balance: claim_balance(env, account),
        borrow_balance: add(variable_debt, fixed_debt)?,
        exchange_rate: stored_exchange_rate(env, config, state)?,
    })
}

fn accrue_both(
    env: &Env,
    config: &MarketConfig,
    collateral_market: &Address,
) -> Result<MarketState, MarketError> {
    let state = interest::accrue_interest(env, config)?;
    if *collateral_market != env.current_contract_address() {
        PeerMarketClient::new(env, collateral_market).accrue_interest();
    }
    Ok(state)
}

/// Auto-enters the borrower and checks `amount` against the controller's
/// borrowing headroom.
fn check_borrow_allowed(
    env: &Env,
    config: &MarketConfig,
    state: &MarketState,
    borrower: &Address,
    amount: u128,
) -> Result<(), MarketError> {
    let me = env.current_contract_address();
    let controller = ControllerClient::new(env, &config.controller);
    controller.enter_market_for_borrower(&me, borrower);
    let hint = account_snapshot(env, config, state, borrower)?;
    if amount > controller.max_borrowable(borrower, &me, &hint) {
        return Err(MarketError::Undercollateralized);
    }
    Ok(())
}

fn redeem_fresh(
    env: &Env,
    redeemer: &Address,
    tokens_in: u128,
    amount_in: u128,
) -> Result<(u128, u128), MarketError> {
    let config = read_config(env);
    let state = interest::accrue_interest(env, &config)?;
    let exchange_rate = stored_exchange_rate(env, &config, &state)?;
    let (redeem_tokens, redeem_amount) = if tokens_in > 0 {
        (tokens_in, mul_exp(env, tokens_in, exchange_rate)?)
    } else {
        (div_exp_up(env, amount_in, exchange_rate)?, amount_in)
    };
    if redeem_amount == 0 {
        return Err(MarketError::AmountTooSmall);
    }
    if claim_balance(env, redeemer) < redeem_tokens {
        return Err(MarketError::InsufficientClaimBalance);
    }
    if transfer::get_cash(env, &config.underlying)? < redeem_amount {
        return Err(MarketError::InsufficientCash);
    }

    let hint = account_snapshot(env, &config, &state, redeemer)?;
    let (_, shortfall) = ControllerClient::new(env, &config.controller).hypothetical_liquidity(
        redeemer,
        &env.current_contract_address(),
        &hint,
        &redeem_tokens,
        &0,
    );
    if shortfall > 0 {
        return Err(MarketError::Undercollateralized);
    }

    let burn = to_i128(redeem_tokens)?;
    TokenBase::update(env, Some(redeemer), None, burn);
    emit_burn(env, redeemer, burn);
    transfer::do_transfer_out(env, &config.underlying, redeemer, redeem_amount)?;

    Redeem {
        redeemer: redeemer.clone(),
        redeem_amount,
        redeem_tokens,
    }
    .publish(env);
    Ok((redeem_tokens, redeem_amount))
}

fn repay_borrow_fresh(
    env: &Env,
    payer: &Address,
    borrower: &Address,
    amount: u128,
) -> Result<u128, MarketError> {
    let config = read_config(env);
    let mut state = interest::accrue_interest(env, &config)?;
    let actual = repay_variable(env, &config, &mut state, payer, borrower, amount)?;
    write_state(env, &state);
    Ok(actual)
}

/// Pulls at most what is owed and credits the measured amount.
fn repay_variable(
    env: &Env,
    config: &MarketConfig,
    state: &mut MarketState,
    payer: &Address,
    borrower: &Address,
    amount: u128,
) -> Result<u128, MarketError> {
    if amount == 0 {
        return Err(MarketError::InvalidAmount);
    }
    let owed = variable::borrow_balance_stored(env, state, borrower)?;
    if owed == 0 {
        return Err(MarketError::NothingToRepay);
    }
    let received = transfer::do_transfer_in(env, &config.underlying, payer, amount.min(owed))?;
    let credited = received.min(owed);
    let account_borrows = variable::update_borrow(env, state, borrower, credited, false)?;

    RepayBorrow {
        payer: payer.clone(),
        borrower: borrower.clone(),
        repay_amount: credited,
        account_borrows,
        total_borrows: state.total_borrows,
    }
    .publish(env);
    Ok(credited)
}

fn repay_fixed_fresh(
    env: &Env,
    payer: &Address,
    borrower: &Address,
    indexes: &Vec<u64>,
) -> Result<u128, MarketError> {
    let config = read_config(env);
    let mut state = interest::accrue_interest(env, &config)?;
    let total = repay_fixed(env, &config, &mut state, payer, borrower, indexes)?;
    write_state(env, &state);
    Ok(total)
}

/// Settles every listed loan against what the payer actually delivers. The
/// whole batch is validated before the first transfer.
fn repay_fixed(
    env: &Env,
    config: &MarketConfig,
    state: &mut MarketState,
    payer: &Address,
    borrower: &Address,
    indexes: &Vec<u64>,
) -> Result<u128, MarketError> {
    fixed::validate_batch(env, borrower, indexes)?;
    let now = env.ledger().timestamp();
    let mut total = 0u128;
    for index in indexes.iter() {
        let loan = fixed::load_loan(env, borrower, index)?;
        let owed = fixed::loan_owed(env, &loan, now)?;
        let received = transfer::do_transfer_in(env, &config.underlying, payer, owed)?;
        let remaining_principal =
            fixed::settle(env, state, config, borrower, index, &loan, owed, received)?;
        let credited = received.min(owed);
        total = add(total, credited)?;

        RepayFixedRate {
            payer: payer.clone(),
            borrower: borrower.clone(),
            loan_index: index,
            repay_amount: credited,
            remaining_principal,
        }
        .publish(env);
    }
    Ok(total)
}

fn seize_after_repay(
    env: &Env,
    config: &MarketConfig,
    state: &MarketState,
    liquidator: &Address,
    borrower: &Address,
    collateral_market: &Address,
    actual_repay: u128,
) -> Result<u128, MarketError> {
    let collateral_exchange_rate = if *collateral_market == env.current_contract_address() {
        stored_exchange_rate(env, config, state)?
    } else {
        PeerMarketClient::new(env, collateral_market).exchange_rate_stored()
    };
    let controller = ControllerClient::new(env, &config.controller);
    let seize_tokens = liquidation::seize_tokens_for(
        env,
        &controller,
        collateral_market,
        actual_repay,
        collateral_exchange_rate,
    )?;
    liquidation::seize_collateral(env, collateral_market, liquidator, borrower, seize_tokens)?;
    Ok(seize_tokens)
}

/// Moves claim tokens unless doing so leaves `from` short of collateral.
fn transfer_claim(
    env: &Env,
    spender: Option<&Address>,
    from: &Address,
    to: &Address,
    amount: u128,
) -> Result<(), MarketError> {
    let config = read_config(env);
    if amount == 0 {
        return Ok(());
    }
    if claim_balance(env, from) < amount {
        return Err(MarketError::InsufficientClaimBalance);
    }
    let hint = account_snapshot(env, &config, &read_state(env), from)?;
    let (_, shortfall) = ControllerClient::new(env, &config.controller).hypothetical_liquidity(
        from,
        &env.current_contract_address(),
        &hint,
        &amount,
        &0,
    );
    if shortfall > 0 {
        return Err(MarketError::Undercollateralized);
    }

    let value = to_i128(amount)?;
    match spender {
        Some(spender) => TokenBase::transfer_from(env, spender, from, to, value),
        None => TokenBase::transfer(env, from, to, value),
    }
    Ok(())
}
