#![no_std]
use soroban_sdk::{
    contract, contracterror, contractevent, contractimpl, contracttype, panic_with_error, Address,
    Env,
};

const EXP_SCALE: u128 = 1_000_000_000_000_000_000u128;
pub const SECONDS_PER_YEAR: u128 = 365 * 24 * 60 * 60;
/// 10_000% per year.
const MAX_MULTIPLIER_PER_YEAR: u128 = 100 * EXP_SCALE;
const TTL_THRESHOLD: u32 = 100_000;
const TTL_EXTEND_TO: u32 = 200_000;

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum RateModelError {
    AlreadyInitialized = 301,
    NotInitialized = 302,
    InvalidKink = 303,
    InvalidRateParams = 304,
}

#[contracttype]
enum DataKey {
    Admin,
    Params,
}

/// Curve parameters, stored per second as 1e18 mantissas.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RateParams {
    pub base_rate_per_second: u128,
    pub multiplier_per_second: u128,
    pub jump_multiplier_per_second: u128,
    pub kink: u128,
}

#[contract]
pub struct JumpRateModel;

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NewInterestParams {
    pub base_rate_per_second: u128,
    pub multiplier_per_second: u128,
    pub jump_multiplier_per_second: u128,
    pub kink: u128,
}

#[contractimpl]
impl JumpRateModel {
    /// Per-year inputs are converted to per-second rates once, here.
    pub fn initialize(
        env: Env,
        admin: Address,
        base_rate_per_year: u128,
        multiplier_per_year: u128,
        jump_multiplier_per_year: u128,
        kink: u128,
    ) -> Result<(), RateModelError> {
        if env.storage().persistent().has(&DataKey::Admin) {
            return Err(RateModelError::AlreadyInitialized);
        }
        admin.require_auth();
        env.storage().persistent().set(&DataKey::Admin, &admin);
        write_params(
            &env,
            base_rate_per_year,
            multiplier_per_year,
            jump_multiplier_per_year,
            kink,
        )
    }

    pub fn update_jump_rate_model(
        env: Env,
        base_rate_per_year: u128,
        multiplier_per_year: u128,
        jump_multiplier_per_year: u128,
        kink: u128,
    ) -> Result<(), RateModelError> {
        let admin: Address = env
            .storage()
            .persistent()
            .get(&DataKey::Admin)
            .ok_or(RateModelError::NotInitialized)?;
        admin.require_auth();
        write_params(
            &env,
            base_rate_per_year,
            multiplier_per_year,
            jump_multiplier_per_year,
            kink,
        )
    }

    pub fn params(env: Env) -> RateParams {
        read_params(&env)
    }

    /// Borrows over the pool's net assets, as a 1e18 mantissa.
    pub fn utilization_rate(_env: Env, cash: u128, borrows: u128, reserves: u128) -> u128 {
        utilization(cash, borrows, reserves)
    }

    pub fn get_borrow_rate(env: Env, cash: u128, borrows: u128, reserves: u128) -> u128 {
        let params = read_params(&env);
        borrow_rate(&params, utilization(cash, borrows, reserves))
    }

    pub fn get_supply_rate(
        env: Env,
        cash: u128,
        borrows: u128,
        reserves: u128,
        reserve_factor: u128,
    ) -> u128 {
        let params = read_params(&env);
        let util = utilization(cash, borrows, reserves);
        let one_minus_rf = EXP_SCALE.saturating_sub(reserve_factor);
        let rate_to_pool = borrow_rate(&params, util).saturating_mul(one_minus_rf) / EXP_SCALE;
        util.saturating_mul(rate_to_pool) / EXP_SCALE
    }
}

fn write_params(
    env: &Env,
    base_rate_per_year: u128,
    multiplier_per_year: u128,
    jump_multiplier_per_year: u128,
    kink: u128,
) -> Result<(), RateModelError> {
    if kink > EXP_SCALE {
        return Err(RateModelError::InvalidKink);
    }
    if base_rate_per_year > MAX_MULTIPLIER_PER_YEAR
        || multiplier_per_year > MAX_MULTIPLIER_PER_YEAR
        || jump_multiplier_per_year > MAX_MULTIPLIER_PER_YEAR
    {
        return Err(RateModelError::InvalidRateParams);
    }
    let params = RateParams {
        base_rate_per_second: base_rate_per_year / SECONDS_PER_YEAR,
        multiplier_per_second: multiplier_per_year / SECONDS_PER_YEAR,
        jump_multiplier_per_second: jump_multiplier_per_year / SECONDS_PER_YEAR,
        kink,
    };
    env.storage().persistent().set(&DataKey::Params, &params);
    bump_ttl(env);

    NewInterestParams {
        base_rate_per_second: params.base_rate_per_second,
        multiplier_per_second: params.multiplier_per_second,
        jump_multiplier_per_second: params.jump_multiplier_per_second,
        kink,
    }
    .publish(env);
    Ok(())
}

fn read_params(env: &Env) -> RateParams {
    bump_ttl(env);
    env.storage()
        .persistent()
        .get(&DataKey::Params)
        .unwrap_or_else(|| panic_with_error!(env, RateModelError::NotInitialized))
}

fn utilization(cash: u128, borrows: u128, reserves: u128) -> u128 {
    if borrows == 0 {
        return 0;
    }
    let denom = cash.saturating_add(borrows).saturating_sub(reserves);
    if denom == 0 {
        return 0;
    }
    borrows.saturating_mul(EXP_SCALE) / denom
}

fn borrow_rate(params: &RateParams, util: u128) -> u128 {
    let base = params.base_rate_per_second;
    if util <= params.kink {
        base.saturating_add(util.saturating_mul(params.multiplier_per_second) / EXP_SCALE)
    } else {
        let normal = base
            .saturating_add(params.kink.saturating_mul(params.multiplier_per_second) / EXP_SCALE);
        let excess = util - params.kink;
        normal.saturating_add(excess.saturating_mul(params.jump_multiplier_per_second) / EXP_SCALE)
    }
}

fn bump_ttl(env: &Env) {
    let persistent = env.storage().persistent();
    for key in [DataKey::Admin, DataKey::Params] {
        if persistent.has(&key) {
            persistent.extend_ttl(&key, TTL_THRESHOLD, TTL_EXTEND_TO);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use soroban_sdk::testutils::Address as _;

    const PER_SECOND_1E9_AS_YEARLY: u128 = 1_000_000_000 * SECONDS_PER_YEAR;

    fn setup<'a>(env: &'a Env, base: u128, mult: u128, jump: u128, kink: u128) -> JumpRateModelClient<'a> {
        let id = env.register(JumpRateModel, ());
        let client = JumpRateModelClient::new(env, &id);
        client.initialize(&Address::generate(env), &base, &mult, &jump, &kink);
        client
    }

    #[test]
    fn test_yearly_params_become_per_second() {
        let env = Env::default();
        env.mock_all_auths();
        let client = setup(&env, PER_SECOND_1E9_AS_YEARLY, 0, 0, EXP_SCALE / 2);
        assert_eq!(client.params().base_rate_per_second, 1_000_000_000);
        // Flat curve: utilization does not matter.
        assert_eq!(client.get_borrow_rate(&1_000, &0, &0), 1_000_000_000);
        assert_eq!(client.get_borrow_rate(&0, &1_000, &0), 1_000_000_000);
    }

    #[test]
    fn test_rate_jumps_above_kink() {
        let env = Env::default();
        env.mock_all_auths();
        let client = setup(
            &env,
            0,
            PER_SECOND_1E9_AS_YEARLY,
            10 * PER_SECOND_1E9_AS_YEARLY,
            EXP_SCALE / 2,
        );
        // 25% utilization: 0.25 * 1e9
        assert_eq!(client.get_borrow_rate(&750, &250, &0), 250_000_000);
        // 75% utilization: 0.5 * 1e9 + 0.25 * 1e10
        assert_eq!(client.get_borrow_rate(&250, &750, &0), 3_000_000_000);
        assert_eq!(client.utilization_rate(&250, &750, &0), 750_000_000_000_000_000);
    }

    #[test]
    fn test_supply_rate_excludes_reserve_share() {
        let env = Env::default();
        env.mock_all_auths();
        let client = setup(&env, PER_SECOND_1E9_AS_YEARLY, 0, 0, EXP_SCALE);
        // 50% utilization, 20% reserve factor: 1e9 * 0.8 * 0.5
        let supply = client.get_supply_rate(&500, &500, &0, &(EXP_SCALE / 5));
        assert_eq!(supply, 400_000_000);
        assert_eq!(client.get_supply_rate(&500, &0, &0, &0), 0);
    }

    #[test]
    fn test_initialize_validation() {
        let env = Env::default();
        env.mock_all_auths();
        let id = env.register(JumpRateModel, ());
        let client = JumpRateModelClient::new(&env, &id);
        let admin = Address::generate(&env);
        assert_eq!(
            client.try_initialize(&admin, &0, &0, &0, &(EXP_SCALE + 1)),
            Err(Ok(RateModelError::InvalidKink))
        );
        assert_eq!(
            client.try_initialize(&admin, &0, &(MAX_MULTIPLIER_PER_YEAR + 1), &0, &0),
            Err(Ok(RateModelError::InvalidRateParams))
        );
        client.initialize(&admin, &0, &0, &0, &0);
        assert_eq!(
            client.try_initialize(&admin, &0, &0, &0, &0),
            Err(Ok(RateModelError::AlreadyInitialized))
        );
    }

    #[test]
    fn test_update_replaces_curve() {
        let env = Env::default();
        env.mock_all_auths();
        let client = setup(&env, 0, 0, 0, EXP_SCALE);
        assert_eq!(client.get_borrow_rate(&1, &1, &0), 0);
        client.update_jump_rate_model(&PER_SECOND_1E9_AS_YEARLY, &0, &0, &EXP_SCALE);
        assert_eq!(client.get_borrow_rate(&1, &1, &0), 1_000_000_000);
    }

    #[test]
    #[should_panic]
    fn test_uninitialized_model_rejects_quotes() {
        let env = Env::default();
        let id = env.register(JumpRateModel, ());
        JumpRateModelClient::new(&env, &id).get_borrow_rate(&1, &1, &0);
    }
}
