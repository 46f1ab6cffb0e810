//! Fixed-point arithmetic shared by the ledger, partner vaults and redemptions.
//!
//! Conventions:
//! - Prices carry 8 decimals (`PRICE_SCALE`)
//! - Ratios are basis points (`BPS_SCALE` = 100%)
//! - Every division floors; nothing rounds up in favor of the caller
//! - Products are formed in u128 and must fit back into u64

use crate::errors::PointsError;

/// Seconds in a year (365 days)
pub const SECONDS_PER_YEAR: u64 = 31_536_000;

/// Basis points scale (100% = 10000 bps)
pub const BPS_SCALE: u64 = 10_000;

/// Oracle price scale (8 decimals)
pub const PRICE_SCALE: u64 = 100_000_000;

/// Milliseconds in one day bucket
pub const MS_PER_DAY: u64 = 86_400_000;

/// Day bucket for a millisecond timestamp.
pub fn day_bucket(timestamp_ms: u64) -> u64 {
    timestamp_ms / MS_PER_DAY
}

fn narrow(value: u128) -> Result<u64, PointsError> {
    u64::try_from(value).map_err(|_| PointsError::ArithmeticOverflow)
}

/// Simple APY reward: `stake * apy_bps * duration / (SECONDS_PER_YEAR * BPS_SCALE)`.
///
/// `usd_precision` is the decimal scale `stake_amount` is expressed in. The
/// formula is scale-invariant, so it is only required to be non-zero; the
/// reward comes back in the same unit as the stake.
pub fn calculate_apy_rewards(
    stake_amount: u64,
    apy_bps: u64,
    duration_seconds: u64,
    usd_precision: u64,
) -> Result<u64, PointsError> {
    if usd_precision == 0 {
        return Err(PointsError::InvalidAmount);
    }

    let reward = (stake_amount as u128)
        .checked_mul(apy_bps as u128)
        .and_then(|v| v.checked_mul(duration_seconds as u128))
        .ok_or(PointsError::ArithmeticOverflow)?
        / (SECONDS_PER_YEAR as u128 * BPS_SCALE as u128);

    narrow(reward)
}

/// USD value of `asset_amount` at an 8-decimal `asset_price`. Zero price gives zero.
pub fn convert_sui_to_usd_value(asset_amount: u64, asset_price: u64) -> Result<u64, PointsError> {
    narrow(asset_amount as u128 * asset_price as u128 / PRICE_SCALE as u128)
}

/// Asset units bought by `usd_value` at an 8-decimal `asset_price`.
pub fn usd_to_asset_amount(usd_value: u64, asset_price: u64) -> Result<u64, PointsError> {
    if asset_price == 0 {
        return Err(PointsError::InvalidPriceData);
    }
    narrow(usd_value as u128 * PRICE_SCALE as u128 / asset_price as u128)
}

/// Collateral units reserved against `points` (one unit per `points_per_usd` points).
pub fn points_to_collateral(points: u64, points_per_usd: u64) -> u64 {
    if points_per_usd == 0 {
        return 0;
    }
    points / points_per_usd
}

/// `total * 10000 / reserved`, or 10000 (fully backed) when nothing is reserved.
pub fn backing_ratio_bps(total: u64, reserved: u64) -> u64 {
    if reserved == 0 {
        return BPS_SCALE;
    }
    let ratio = total as u128 * BPS_SCALE as u128 / reserved as u128;
    u64::try_from(ratio).unwrap_or(u64::MAX)
}
