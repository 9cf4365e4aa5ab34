pub const EXP_SCALE: u128 = 1_000_000_000_000_000_000u128; // 1e18

/// Per-second borrow rate ceiling (0.0005% per second).
pub const BORROW_RATE_MAX_MANTISSA: u128 = 5_000_000_000_000u128;
pub const RESERVE_FACTOR_MAX_MANTISSA: u128 = EXP_SCALE;

pub const MAX_OPEN_FIXED_LOANS: u32 = 32;
pub const MAX_FIXED_DURATION: u64 = 2 * 365 * 24 * 60 * 60;

pub const TTL_THRESHOLD: u32 = 100_000;
pub const TTL_EXTEND_TO: u32 = 200_000;
