use soroban_sdk::contracterror;

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum MarketError {
    // Lifecycle
    AlreadyInitialized = 1,
    NotInitialized = 2,

    // Validation
    InvalidAmount = 10,
    AmountTooSmall = 11,
    InvalidMaturity = 12,
    EmptyLoanBatch = 13,
    DuplicateLoanIndex = 14,
    LoanNotFound = 15,
    TooManyFixedLoans = 16,
    CannotSweepUnderlying = 17,
    LiquidatorIsBorrower = 18,
    MarketNotListed = 19,
    ControllerMismatch = 20,
    InvalidReserveFactor = 21,
    InvalidExchangeRate = 22,
    InvalidInterestRateModel = 23,

    // Insufficient resource
    InsufficientCash = 30,
    InsufficientClaimBalance = 31,
    InsufficientReserves = 32,
    NothingToRepay = 33,
    InsufficientCollateralToSeize = 34,
    TooMuchRepay = 35,

    // Collateral
    Undercollateralized = 40,
    NotUndercollateralized = 41,

    // Oracle and rate model
    PriceUnavailable = 50,
    BorrowRateTooHigh = 51,

    // External transfer
    TransferFailed = 60,

    // Math
    MathOverflow = 70,
    MathUnderflow = 71,
    DivisionByZero = 72,
}
