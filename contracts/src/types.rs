//! Common types used across the points engine.

use odra::prelude::*;
use crate::errors::PointsError;
use crate::math::{backing_ratio_bps, day_bucket};

/// Provenance tag carried on mint events
#[odra::odra_type]
#[derive(Copy, PartialOrd, Ord)]
pub enum PointType {
    StakingReward,
    GovernanceReward,
    ReferralBonus,
    LiquidityMining,
    LoanCollateral,
    EmergencyMint,
    PartnerReward,
}

/// Independent pause domains exposed by the admin configuration
#[odra::odra_type]
#[derive(Copy, PartialOrd, Ord)]
pub enum PauseDomain {
    /// Pauses every other domain
    Global,
    Mint,
    Redemption,
    Governance,
    Oracle,
    Vault,
}

/// Per-user point balance
#[odra::odra_type]
#[derive(Default, Copy)]
pub struct PointBalance {
    /// Points usable for redemption
    pub available: u64,
    /// Points held in reserve
    pub locked: u64,
}

impl PointBalance {
    /// Full balance (available + locked)
    pub fn total(&self) -> u64 {
        self.available.saturating_add(self.locked)
    }

    pub fn credit(&mut self, amount: u64) -> Result<(), PointsError> {
        self.available = self
            .available
            .checked_add(amount)
            .ok_or(PointsError::ArithmeticOverflow)?;
        Ok(())
    }

    pub fn debit(&mut self, amount: u64) -> Result<(), PointsError> {
        if self.available < amount {
            return Err(PointsError::InsufficientBalance);
        }
        self.available -= amount;
        Ok(())
    }

    /// Move `amount` from available to locked
    pub fn lock(&mut self, amount: u64) -> Result<(), PointsError> {
        if self.available < amount {
            return Err(PointsError::InsufficientBalance);
        }
        self.available -= amount;
        self.locked += amount;
        Ok(())
    }

    /// Move `amount` from locked back to available
    pub fn unlock(&mut self, amount: u64) -> Result<(), PointsError> {
        if self.locked < amount {
            return Err(PointsError::InsufficientLocked);
        }
        self.locked -= amount;
        self.available += amount;
        Ok(())
    }
}

/// Per-user daily mint tracking, reset lazily on day-bucket rollover
#[odra::odra_type]
#[derive(Default, Copy)]
pub struct DailyMintWindow {
    /// timestamp_ms / 86_400_000 of the last mint
    pub day_bucket: u64,
    /// Points minted inside `day_bucket`
    pub minted_this_window: u64,
}

impl DailyMintWindow {
    /// Minted amount as seen at `now_ms`; a stale bucket reads as zero.
    pub fn minted_at(&self, now_ms: u64) -> u64 {
        if self.day_bucket == day_bucket(now_ms) {
            self.minted_this_window
        } else {
            0
        }
    }

    /// Window after minting `amount` at `now_ms`, or `ExceedsDailyLimit`.
    pub fn after_mint(&self, now_ms: u64, amount: u64, limit: u64) -> Result<Self, PointsError> {
        let minted = self
            .minted_at(now_ms)
            .checked_add(amount)
            .ok_or(PointsError::ExceedsDailyLimit)?;
        if minted > limit {
            return Err(PointsError::ExceedsDailyLimit);
        }
        Ok(Self {
            day_bucket: day_bucket(now_ms),
            minted_this_window: minted,
        })
    }
}

/// Global supply counters of the ledger
#[odra::odra_type]
pub struct LedgerGlobals {
    pub total_minted: u64,
    pub total_burned: u64,
    pub max_total_supply: u64,
    pub paused: bool,
}

impl LedgerGlobals {
    /// Points in existence (minted minus burned)
    pub fn circulating(&self) -> u64 {
        self.total_minted.saturating_sub(self.total_burned)
    }
}

/// Stored price for a trading pair
#[odra::odra_type]
#[derive(Default)]
pub struct PriceRecord {
    /// 8-decimal fixed point
    pub price: u64,
    /// Basis points, 0-10000
    pub confidence: u32,
    pub updated_at_ms: u64,
}

/// Price record plus freshness, as returned by oracle queries
#[odra::odra_type]
pub struct PriceData {
    pub price: u64,
    pub confidence: u32,
    pub updated_at_ms: u64,
    pub is_stale: bool,
}

/// External-protocol custody and yield state of a vault
#[odra::odra_type]
#[derive(Default)]
pub struct DefiState {
    /// Whether the vault may be deployed to a DeFi protocol
    pub enabled: bool,
    pub protocol_name: Option<String>,
    pub apy_bps: Option<u32>,
    pub max_utilization_bps: Option<u32>,
    /// Set once, on transfer to a protocol
    pub custodian: Option<Address>,
    /// Collateral under the custodian's control
    pub deposit_amount: u64,
    /// Never decreases
    pub lifetime_yield: u64,
}

/// Who operationally controls a vault's collateral
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Custody {
    Native,
    External(Address),
}

impl DefiState {
    pub fn custody(&self) -> Custody {
        match self.custodian {
            Some(custodian) => Custody::External(custodian),
            None => Custody::Native,
        }
    }

    pub fn is_deployed(&self) -> bool {
        self.custodian.is_some()
    }
}

/// Partner collateral vault
#[odra::odra_type]
pub struct PartnerVault {
    pub owner: Address,
    pub generation_id: u32,
    /// Collateral held (smallest unit)
    pub usdc_balance: u64,
    /// Collateral earmarked against outstanding points
    pub reserved_backing: u64,
    /// Max partner-attributable points per day (0 = unlimited)
    pub daily_quota: u64,
    pub quota_used_today: u64,
    pub active: bool,
    pub created_at_ms: u64,
    pub defi: DefiState,
}

impl PartnerVault {
    /// `usdc_balance - reserved_backing`, floored at zero
    pub fn available_collateral(&self) -> u64 {
        self.usdc_balance.saturating_sub(self.reserved_backing)
    }

    pub fn can_support_collateral(&self, collateral_amount: u64) -> bool {
        self.available_collateral() >= collateral_amount
    }

    /// Whether reserving `extra_reserve` more stays within the balance
    pub fn can_reserve(&self, extra_reserve: u64) -> bool {
        self.reserved_backing
            .checked_add(extra_reserve)
            .map_or(false, |reserved| reserved <= self.usdc_balance)
    }

    pub fn collateral_details(&self) -> CollateralDetails {
        let ratio = backing_ratio_bps(self.usdc_balance, self.reserved_backing);
        CollateralDetails {
            total: self.usdc_balance,
            available: self.available_collateral(),
            reserved: self.reserved_backing,
            backing_ratio_bps: ratio,
            health_factor_bps: ratio,
        }
    }
}

/// Authorization record bound 1:1 to a vault
#[odra::odra_type]
pub struct PartnerCap {
    /// Equal to the vault id
    pub cap_id: u64,
    pub vault_id: u64,
    /// Partner that created the vault
    pub partner_address: Address,
    /// Current custody holder (partner or DeFi custodian)
    pub vault_owner: Address,
    pub name: String,
    pub description: String,
}

/// Cross-partner aggregates kept by the registry
#[odra::odra_type]
#[derive(Default)]
pub struct RegistryTotals {
    pub total_partners: u64,
    pub total_generations: u64,
    pub total_usdc_locked: u64,
    pub total_usdc_in_defi: u64,
    pub total_yield_generated: u64,
    pub total_vaults_in_defi: u64,
}

/// Vault collateral breakdown
#[odra::odra_type]
pub struct CollateralDetails {
    pub total: u64,
    pub available: u64,
    pub reserved: u64,
    pub backing_ratio_bps: u64,
    pub health_factor_bps: u64,
}

/// Read-only protocol parameters
#[odra::odra_type]
pub struct ProtocolParams {
    /// Points issued per unit of collateral/USD
    pub points_per_usd: u64,
    /// Max points minted to one user per day bucket
    pub daily_mint_limit: u64,
    /// Minimum vault balance for DeFi deployment
    pub defi_min_collateral: u64,
    /// Daily quota assigned to new vaults (0 = unlimited)
    pub partner_daily_quota: u64,
    /// Whether new vaults start DeFi-enabled
    pub defi_enabled_by_default: bool,
}
