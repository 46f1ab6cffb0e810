//! Protocol error definitions.

use odra::prelude::*;

/// Points engine errors
#[repr(u16)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PointsError {
    // Pause errors (1xx)
    ProtocolPaused = 100,
    OraclePaused = 101,
    RedemptionPaused = 102,

    // Amount / ledger errors (2xx)
    InvalidAmount = 200,
    InsufficientBalance = 201,
    InsufficientLocked = 202,
    ExceedsSupplyCap = 203,
    ExceedsDailyLimit = 204,
    ArithmeticOverflow = 205,

    // Oracle errors (3xx)
    InvalidPriceData = 300,
    InvalidConfidence = 301,

    // Vault errors (4xx)
    VaultNotFound = 400,
    VaultNotDefiReady = 401,
    VaultInactive = 402,
    Infeasible = 403,
    InvalidCapability = 404,
    VaultHasReservedBacking = 405,
    InsufficientCollateral = 406,

    // Access control errors (5xx)
    Unauthorized = 500,
    UnauthorizedProtocol = 501,

    // Configuration errors (9xx)
    InvalidConfig = 900,
}

impl PointsError {
    pub const fn message(&self) -> &'static str {
        match self {
            // Pause
            PointsError::ProtocolPaused => "Operation blocked: protocol domain paused",
            PointsError::OraclePaused => "Oracle paused",
            PointsError::RedemptionPaused => "Redemptions paused",

            // Amounts
            PointsError::InvalidAmount => "Invalid amount",
            PointsError::InsufficientBalance => "Insufficient available points",
            PointsError::InsufficientLocked => "Insufficient locked points",
            PointsError::ExceedsSupplyCap => "Mint exceeds max total supply",
            PointsError::ExceedsDailyLimit => "Mint exceeds daily limit",
            PointsError::ArithmeticOverflow => "Arithmetic overflow",

            // Oracle
            PointsError::InvalidPriceData => "Price is zero, stale or unknown",
            PointsError::InvalidConfidence => "Confidence out of range (0-10000 bps)",

            // Vault
            PointsError::VaultNotFound => "Partner vault not found",
            PointsError::VaultNotDefiReady => "Vault not ready for DeFi transfer",
            PointsError::VaultInactive => "Partner vault inactive",
            PointsError::Infeasible => "Vault cannot cover the requested collateral",
            PointsError::InvalidCapability => "Caller does not hold the partner capability",
            PointsError::VaultHasReservedBacking => "Vault still backs outstanding points",
            PointsError::InsufficientCollateral => "Amount exceeds withdrawable collateral",

            // Access control
            PointsError::Unauthorized => "Unauthorized: caller is not admin",
            PointsError::UnauthorizedProtocol => "Unauthorized: caller lacks protocol role",

            // Config
            PointsError::InvalidConfig => "Invalid configuration parameter",
        }
    }
}

impl core::fmt::Display for PointsError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.message())
    }
}

impl From<PointsError> for OdraError {
    fn from(error: PointsError) -> Self {
        #[cfg(target_arch = "wasm32")]
        {
            OdraError::user(error as u16)
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            OdraError::user(error as u16, error.message())
        }
    }
}
