#![no_std]
//! Admin-posted price feed. Prices are 1e18 mantissas per smallest unit of
//! the asset; zero means no price.

use soroban_sdk::{
    contract, contracterror, contractevent, contractimpl, contracttype, Address, Env,
};

const TTL_THRESHOLD: u32 = 100_000;
const TTL_EXTEND_TO: u32 = 200_000;

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum OracleError {
    AlreadyInitialized = 201,
    NotInitialized = 202,
}

#[contracttype]
enum DataKey {
    Admin,
    Price(Address),
    MarketUnderlying(Address),
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PricePosted {
    #[topic]
    pub asset: Address,
    pub previous_price: u128,
    pub new_price: u128,
}

#[contract]
pub struct PriceOracle;

#[contractimpl]
impl PriceOracle {
    pub fn initialize(env: Env, admin: Address) -> Result<(), OracleError> {
        if env.storage().persistent().has(&DataKey::Admin) {
            return Err(OracleError::AlreadyInitialized);
        }
        admin.require_auth();
        env.storage().persistent().set(&DataKey::Admin, &admin);
        bump(&env, &DataKey::Admin);
        Ok(())
    }

    /// Posts the price of `underlying` and remembers that `market` trades it,
    /// so `get_underlying_price(market)` never has to ask the market.
    pub fn set_underlying_price(
        env: Env,
        market: Address,
        underlying: Address,
        price: u128,
    ) -> Result<(), OracleError> {
        require_admin(&env)?;
        let key = DataKey::MarketUnderlying(market);
        env.storage().persistent().set(&key, &underlying);
        bump(&env, &key);
        post_price(&env, underlying, price);
        Ok(())
    }

    pub fn set_direct_price(env: Env, asset: Address, price: u128) -> Result<(), OracleError> {
        require_admin(&env)?;
        post_price(&env, asset, price);
        Ok(())
    }

    /// Price of a market's underlying; 0 for an unknown market or asset.
    pub fn get_underlying_price(env: Env, market: Address) -> u128 {
        let underlying: Option<Address> = env
            .storage()
            .persistent()
            .get(&DataKey::MarketUnderlying(market));
        match underlying {
            Some(asset) => Self::asset_prices(env, asset),
            None => 0,
        }
    }

    pub fn asset_prices(env: Env, asset: Address) -> u128 {
        env.storage()
            .persistent()
            .get(&DataKey::Price(asset))
            .unwrap_or(0)
    }

    pub fn admin(env: Env) -> Result<Address, OracleError> {
        env.storage()
            .persistent()
            .get(&DataKey::Admin)
            .ok_or(OracleError::NotInitialized)
    }
}

fn require_admin(env: &Env) -> Result<(), OracleError> {
    let admin: Address = env
        .storage()
        .persistent()
        .get(&DataKey::Admin)
        .ok_or(OracleError::NotInitialized)?;
    admin.require_auth();
    bump(env, &DataKey::Admin);
    Ok(())
}

fn post_price(env: &Env, asset: Address, price: u128) {
    let key = DataKey::Price(asset.clone());
    let previous_price: u128 = env.storage().persistent().get(&key).unwrap_or(0);
    env.storage().persistent().set(&key, &price);
    bump(env, &key);
    PricePosted {
        asset,
        previous_price,
        new_price: price,
    }
    .publish(env);
}

fn bump(env: &Env, key: &DataKey) {
    env.storage()
        .persistent()
        .extend_ttl(key, TTL_THRESHOLD, TTL_EXTEND_TO);
}

#[cfg(test)]
mod test {
    use super::*;
    use soroban_sdk::testutils::{Address as _, MockAuth, MockAuthInvoke};
    use soroban_sdk::IntoVal;

    #[test]
    fn test_market_price_follows_underlying() {
        let env = Env::default();
        env.mock_all_auths();
        let id = env.register(PriceOracle, ());
        let client = PriceOracleClient::new(&env, &id);
        client.initialize(&Address::generate(&env));

        let market = Address::generate(&env);
        let asset = Address::generate(&env);
        assert_eq!(client.get_underlying_price(&market), 0);

        client.set_underlying_price(&market, &asset, &2_000_000_000_000_000_000);
        assert_eq!(client.get_underlying_price(&market), 2_000_000_000_000_000_000);
        assert_eq!(client.asset_prices(&asset), 2_000_000_000_000_000_000);

        client.set_direct_price(&asset, &0);
        assert_eq!(client.get_underlying_price(&market), 0);
    }

    #[test]
    fn test_initialize_once() {
        let env = Env::default();
        env.mock_all_auths();
        let id = env.register(PriceOracle, ());
        let client = PriceOracleClient::new(&env, &id);
        let admin = Address::generate(&env);
        client.initialize(&admin);
        assert_eq!(client.admin(), admin);
        assert_eq!(
            client.try_initialize(&admin),
            Err(Ok(OracleError::AlreadyInitialized))
        );
    }

    #[test]
    fn test_posting_requires_initialization() {
        let env = Env::default();
        env.mock_all_auths();
        let id = env.register(PriceOracle, ());
        let client = PriceOracleClient::new(&env, &id);
        assert_eq!(
            client.try_set_direct_price(&Address::generate(&env), &1),
            Err(Ok(OracleError::NotInitialized))
        );
    }

    #[test]
    #[should_panic]
    fn test_posting_requires_admin_auth() {
        let env = Env::default();
        let id = env.register(PriceOracle, ());
        let client = PriceOracleClient::new(&env, &id);
        let admin = Address::generate(&env);
        client
            .mock_auths(&[MockAuth {
                address: &admin,
                invoke: &MockAuthInvoke {
                    contract: &id,
                    fn_name: "initialize",
                    args: (&admin,).into_val(&env),
                    sub_invokes: &[],
                },
            }])
            .initialize(&admin);
        client.set_direct_price(&Address::generate(&env), &1);
    }
}
