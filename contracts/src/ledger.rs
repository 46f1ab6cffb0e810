//! Points Ledger Contract
//!
//! Non-transferable loyalty points with protocol-controlled issuance.
//! Only authorized protocol modules can mint, burn, lock or unlock.
//!
//! Invariants:
//! - total_minted - total_burned == sum of every user's available + locked
//! - total_minted - total_burned <= max_total_supply
//! - minted_this_window <= daily_mint_limit after every successful mint

use odra::prelude::*;
use odra::ContractRef;
use crate::access_control::{
    AccessControlContractRef, ROLE_ADMIN, ROLE_BURNER, ROLE_LOCKER, ROLE_MINTER, ROLE_PAUSER,
};
use crate::config::ProtocolConfigContractRef;
use crate::errors::PointsError;
use crate::math;
use crate::partner_vault::PartnerRegistryContractRef;
use crate::types::{DailyMintWindow, LedgerGlobals, PauseDomain, PointBalance, PointType};

#[odra::event]
pub struct PointsMinted {
    pub user: Address,
    pub amount: u64,
    pub point_type: PointType,
    pub reason: String,
    pub timestamp_ms: u64,
}

#[odra::event]
pub struct PointsBurned {
    pub user: Address,
    pub amount: u64,
    pub reason: String,
    pub timestamp_ms: u64,
}

#[odra::event]
pub struct PointsLocked {
    pub user: Address,
    pub amount: u64,
    pub reason: String,
    pub timestamp_ms: u64,
}

#[odra::event]
pub struct PointsUnlocked {
    pub user: Address,
    pub amount: u64,
    pub reason: String,
    pub timestamp_ms: u64,
}

/// Points Ledger Contract
#[odra::module(events = [PointsMinted, PointsBurned, PointsLocked, PointsUnlocked])]
pub struct PointsLedger {
    /// Access control contract address
    access_control: Var<Address>,
    /// Protocol configuration contract address
    config: Var<Address>,
    /// Partner registry, for backed mints
    partner_registry: Var<Option<Address>>,
    /// Balance per user
    balances: Mapping<Address, PointBalance>,
    /// Daily mint window per user
    mint_windows: Mapping<Address, DailyMintWindow>,
    /// Total points ever minted
    total_minted: Var<u64>,
    /// Total points ever burned
    total_burned: Var<u64>,
    /// Cap on circulating supply
    max_total_supply: Var<u64>,
    /// Ledger-level pause switch
    paused: Var<bool>,
}

#[odra::module]
impl PointsLedger {
    /// Initialize the ledger
    pub fn init(&mut self, access_control: Address, config: Address, max_total_supply: u64) {
        self.access_control.set(access_control);
        self.config.set(config);
        self.partner_registry.set(None);
        self.total_minted.set(0);
        self.total_burned.set(0);
        self.max_total_supply.set(max_total_supply);
        self.paused.set(false);
    }

    // ========== Issuance ==========

    /// Mint points to `user` (minter role only)
    pub fn mint(&mut self, user: Address, amount: u64, point_type: PointType, reason: String) {
        self.require_role(ROLE_MINTER);
        self.mint_internal(user, amount, point_type, reason);
    }

    /// Mint partner-attributable points and reserve backing in `vault_id`
    ///
    /// The vault must be able to reserve `amount / points_per_usd` more
    /// collateral, otherwise the whole mint reverts with `Infeasible`.
    pub fn mint_backed(&mut self, user: Address, amount: u64, vault_id: u64, reason: String) {
        self.require_role(ROLE_MINTER);
        let Some(registry_addr) = self.partner_registry.get().flatten() else {
            self.env().revert(PointsError::InvalidConfig)
        };
        let mut registry = PartnerRegistryContractRef::new(self.env(), registry_addr);
        if !registry.can_support_points_minting(vault_id, amount) {
            self.env().revert(PointsError::Infeasible);
        }

        self.mint_internal(user, amount, PointType::PartnerReward, reason);
        registry.record_points_minting(vault_id, amount);
    }

    /// Burn available points from `user` (burner role only)
    pub fn burn(&mut self, user: Address, amount: u64, reason: String) {
        self.require_role(ROLE_BURNER);
        if amount == 0 {
            self.env().revert(PointsError::InvalidAmount);
        }

        let mut balance = self.balance_of(user);
        if let Err(e) = balance.debit(amount) {
            self.env().revert(e);
        }

        let burned = self.total_burned();
        self.balances.set(&user, balance);
        self.total_burned.set(burned + amount);

        self.env().emit_event(PointsBurned {
            user,
            amount,
            reason,
            timestamp_ms: self.env().get_block_time(),
        });
    }

    // ========== Locking ==========

    /// Move `amount` from available to locked (locker role only)
    pub fn lock(&mut self, user: Address, amount: u64, reason: String) {
        self.require_role(ROLE_LOCKER);
        if amount == 0 {
            self.env().revert(PointsError::InvalidAmount);
        }

        let mut balance = self.balance_of(user);
        if let Err(e) = balance.lock(amount) {
            self.env().revert(e);
        }
        self.balances.set(&user, balance);

        self.env().emit_event(PointsLocked {
            user,
            amount,
            reason,
            timestamp_ms: self.env().get_block_time(),
        });
    }

    /// Move `amount` from locked back to available (locker role only)
    pub fn unlock(&mut self, user: Address, amount: u64, reason: String) {
        self.require_role(ROLE_LOCKER);
        if amount == 0 {
            self.env().revert(PointsError::InvalidAmount);
        }

        let mut balance = self.balance_of(user);
        if let Err(e) = balance.unlock(amount) {
            self.env().revert(e);
        }
        self.balances.set(&user, balance);

        self.env().emit_event(PointsUnlocked {
            user,
            amount,
            reason,
            timestamp_ms: self.env().get_block_time(),
        });
    }

    // ========== Balance Queries ==========

    pub fn balance_of(&self, user: Address) -> PointBalance {
        self.balances.get(&user).unwrap_or_default()
    }

    pub fn available_balance_of(&self, user: Address) -> u64 {
        self.balance_of(user).available
    }

    pub fn locked_balance_of(&self, user: Address) -> u64 {
        self.balance_of(user).locked
    }

    pub fn total_balance_of(&self, user: Address) -> u64 {
        self.balance_of(user).total()
    }

    // ========== Supply Queries ==========

    pub fn total_minted(&self) -> u64 {
        self.total_minted.get().unwrap_or(0)
    }

    pub fn total_burned(&self) -> u64 {
        self.total_burned.get().unwrap_or(0)
    }

    /// Minted minus burned
    pub fn circulating_supply(&self) -> u64 {
        self.get_globals().circulating()
    }

    pub fn get_globals(&self) -> LedgerGlobals {
        LedgerGlobals {
            total_minted: self.total_minted(),
            total_burned: self.total_burned(),
            max_total_supply: self.max_total_supply.get().unwrap_or(0),
            paused: self.is_paused(),
        }
    }

    /// `(minted_this_window, daily_mint_limit)` at the current block time
    pub fn get_daily_mint_window(&self, user: Address) -> (u64, u64) {
        let now = self.env().get_block_time();
        let window = self.mint_windows.get(&user).unwrap_or_default();
        (window.minted_at(now), self.config_ref().daily_mint_limit())
    }

    pub fn is_paused(&self) -> bool {
        self.paused.get().unwrap_or(false)
    }

    pub fn get_partner_registry(&self) -> Option<Address> {
        self.partner_registry.get().flatten()
    }

    // ========== Pure Helpers ==========

    /// Simple APY reward over `duration_seconds`, floored
    pub fn calculate_apy_rewards(
        &self,
        stake_amount: u64,
        apy_bps: u32,
        duration_seconds: u64,
        usd_precision: u64,
    ) -> u64 {
        match math::calculate_apy_rewards(stake_amount, apy_bps as u64, duration_seconds, usd_precision) {
            Ok(reward) => reward,
            Err(e) => self.env().revert(e),
        }
    }

    /// USD value of an asset amount at an 8-decimal price
    pub fn convert_sui_to_usd_value(&self, asset_amount: u64, asset_price: u64) -> u64 {
        match math::convert_sui_to_usd_value(asset_amount, asset_price) {
            Ok(value) => value,
            Err(e) => self.env().revert(e),
        }
    }

    // ========== Admin Functions ==========

    /// Pause or unpause minting (pauser only)
    pub fn set_paused(&mut self, paused: bool) {
        self.require_role(ROLE_PAUSER);
        self.paused.set(paused);
    }

    /// Set the supply cap (admin only); may not drop below circulating supply
    pub fn set_max_total_supply(&mut self, max_total_supply: u64) {
        self.require_role(ROLE_ADMIN);
        if max_total_supply < self.circulating_supply() {
            self.env().revert(PointsError::InvalidConfig);
        }
        self.max_total_supply.set(max_total_supply);
    }

    /// Set the partner registry used by backed mints (admin only)
    pub fn set_partner_registry(&mut self, partner_registry: Address) {
        self.require_role(ROLE_ADMIN);
        self.partner_registry.set(Some(partner_registry));
    }

    // ========== Internal Functions ==========

    fn mint_internal(&mut self, user: Address, amount: u64, point_type: PointType, reason: String) {
        let config = self.config_ref();
        if self.is_paused() || config.is_paused(PauseDomain::Mint) {
            self.env().revert(PointsError::ProtocolPaused);
        }
        if amount == 0 {
            self.env().revert(PointsError::InvalidAmount);
        }

        let globals = self.get_globals();
        let within_cap = globals
            .circulating()
            .checked_add(amount)
            .map_or(false, |supply| supply <= globals.max_total_supply);
        if !within_cap {
            self.env().revert(PointsError::ExceedsSupplyCap);
        }

        let now = self.env().get_block_time();
        let window = self.mint_windows.get(&user).unwrap_or_default();
        let window = match window.after_mint(now, amount, config.daily_mint_limit()) {
            Ok(window) => window,
            Err(e) => self.env().revert(e),
        };

        let mut balance = self.balance_of(user);
        if let Err(e) = balance.credit(amount) {
            self.env().revert(e);
        }
        let Some(total_minted) = globals.total_minted.checked_add(amount) else {
            self.env().revert(PointsError::ArithmeticOverflow)
        };

        self.balances.set(&user, balance);
        self.mint_windows.set(&user, window);
        self.total_minted.set(total_minted);

        self.env().emit_event(PointsMinted {
            user,
            amount,
            point_type,
            reason,
            timestamp_ms: now,
        });
    }

    fn config_ref(&self) -> ProtocolConfigContractRef {
        let Some(config) = self.config.get() else {
            self.env().revert(PointsError::InvalidConfig)
        };
        ProtocolConfigContractRef::new(self.env(), config)
    }

    fn require_role(&self, role_id: u8) {
        let Some(access_control) = self.access_control.get() else {
            self.env().revert(PointsError::InvalidConfig)
        };
        let caller = self.env().caller();
        let roles = AccessControlContractRef::new(self.env(), access_control);
        if !roles.has_role_or_admin(role_id, caller) {
            self.env().revert(PointsError::UnauthorizedProtocol);
        }
    }
}
