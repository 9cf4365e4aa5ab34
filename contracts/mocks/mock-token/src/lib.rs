#![no_std]

use soroban_sdk::{contract, contractimpl, contracttype, Address, Env, String};
use stellar_tokens::fungible::burnable::emit_burn;
use stellar_tokens::fungible::Base as TokenBase;

const BPS_SCALE: i128 = 10_000;

#[contracttype]
enum DataKey {
    Admin,
    FeeBps,
}

/// Test token whose `transfer` burns `fee_bps` of every amount on the way,
/// so the receiver gets less than the sender requested.
#[contract]
pub struct MockToken;

#[contractimpl]
impl MockToken {
    pub fn initialize(env: Env, admin: Address, name: String, symbol: String, decimals: u32) {
        if env.storage().instance().has(&DataKey::Admin) {
            panic!("already initialized");
        }
        TokenBase::set_metadata(&env, decimals, name, symbol);
        env.storage().instance().set(&DataKey::Admin, &admin);
        env.storage().instance().set(&DataKey::FeeBps, &0u32);
    }

    pub fn set_fee_bps(env: Env, fee_bps: u32) {
        read_admin(&env).require_auth();
        if fee_bps as i128 > BPS_SCALE {
            panic!("fee above 100%");
        }
        env.storage().instance().set(&DataKey::FeeBps, &fee_bps);
    }

    pub fn fee_bps(env: Env) -> u32 {
        env.storage().instance().get(&DataKey::FeeBps).unwrap_or(0)
    }

    pub fn name(env: Env) -> String {
        TokenBase::name(&env)
    }

    pub fn symbol(env: Env) -> String {
        TokenBase::symbol(&env)
    }

    pub fn decimals(env: Env) -> u32 {
        TokenBase::decimals(&env)
    }

    pub fn total_supply(env: Env) -> i128 {
        TokenBase::total_supply(&env)
    }

    pub fn balance(env: Env, id: Address) -> i128 {
        TokenBase::balance(&env, &id)
    }

    pub fn allowance(env: Env, owner: Address, spender: Address) -> i128 {
        TokenBase::allowance(&env, &owner, &spender)
    }

    pub fn approve(
        env: Env,
        owner: Address,
        spender: Address,
        amount: i128,
        live_until_ledger: u32,
    ) {
        owner.require_auth();
        TokenBase::approve(&env, &owner, &spender, amount, live_until_ledger);
    }

    pub fn transfer(env: Env, from: Address, to: Address, amount: i128) {
        if amount <= 0 {
            panic!("bad amount");
        }
        let fee = skim_fee(&env, amount);
        TokenBase::transfer(&env, &from, &to, amount - fee);
        if fee > 0 {
            TokenBase::update(&env, Some(&from), None, fee);
            emit_burn(&env, &from, fee);
        }
    }

    pub fn mint(env: Env, to: Address, amount: i128) {
        read_admin(&env).require_auth();
        if amount <= 0 {
            panic!("bad amount");
        }
        TokenBase::mint(&env, &to, amount);
    }
}

fn read_admin(env: &Env) -> Address {
    env.storage()
        .instance()
        .get(&DataKey::Admin)
        .expect("not initialized")
}

fn skim_fee(env: &Env, amount: i128) -> i128 {
    let fee_bps: u32 = env.storage().instance().get(&DataKey::FeeBps).unwrap_or(0);
    amount * fee_bps as i128 / BPS_SCALE
}

#[cfg(test)]
mod test {
    use super::*;
    use soroban_sdk::testutils::Address as _;

    #[test]
    fn test_transfer_skims_fee() {
        let env = Env::default();
        env.mock_all_auths();
        let id = env.register(MockToken, ());
        let client = MockTokenClient::new(&env, &id);
        let admin = Address::generate(&env);
        let alice = Address::generate(&env);
        let bob = Address::generate(&env);
        client.initialize(
            &admin,
            &String::from_str(&env, "Fee Token"),
            &String::from_str(&env, "FEE"),
            &7,
        );
        client.mint(&alice, &1_000);
        client.set_fee_bps(&300);

        client.transfer(&alice, &bob, &100);
        assert_eq!(client.balance(&bob), 97);
        assert_eq!(client.balance(&alice), 900);
        assert_eq!(client.total_supply(), 997);
    }

    #[test]
    fn test_zero_fee_is_plain_transfer() {
        let env = Env::default();
        env.mock_all_auths();
        let id = env.register(MockToken, ());
        let client = MockTokenClient::new(&env, &id);
        let alice = Address::generate(&env);
        let bob = Address::generate(&env);
        client.initialize(
            &Address::generate(&env),
            &String::from_str(&env, "Plain"),
            &String::from_str(&env, "PLN"),
            &7,
        );
        client.mint(&alice, &50);
        client.transfer(&alice, &bob, &50);
        assert_eq!(client.balance(&bob), 50);
        assert_eq!(client.fee_bps(), 0);
    }
}
