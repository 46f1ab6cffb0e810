//! Redemption Engine Contract
//!
//! Lets users redeem available points for collateral out of a partner vault
//! at the oracle price of the configured collateral pair.
//!
//! Key mechanics:
//! - `usd_value = points / points_per_usd`, floored
//! - `asset_amount = usd_value * 1e8 / price`, floored
//! - Points are burned, the vault's backing released, and the asset paid
//!   out of the vault in the same transaction
//!
//! Every check runs before the first write, so a rejected redemption leaves
//! the ledger and the registry untouched.

use odra::prelude::*;
use odra::ContractRef;
use crate::access_control::{AccessControlContractRef, ROLE_ADMIN};
use crate::config::ProtocolConfigContractRef;
use crate::errors::PointsError;
use crate::ledger::PointsLedgerContractRef;
use crate::math::usd_to_asset_amount;
use crate::oracle::PriceOracleContractRef;
use crate::partner_vault::PartnerRegistryContractRef;
use crate::types::PauseDomain;

/// Collateral pair quoted when none is configured
pub const DEFAULT_COLLATERAL_PAIR: &str = "SUI/USD";

/// Result of a redemption
#[odra::odra_type]
pub struct RedemptionResult {
    /// Vault the asset was paid from
    pub vault_id: u64,
    /// Points burned
    pub points_redeemed: u64,
    /// USD value of the burned points
    pub usd_value: u64,
    /// Asset units paid to the redeemer
    pub asset_amount: u64,
}

/// Redemption statistics
#[odra::odra_type]
#[derive(Default)]
pub struct RedemptionStats {
    /// Total points redeemed (cumulative)
    pub total_points_redeemed: u64,
    /// Total USD value redeemed (cumulative)
    pub total_usd_value: u64,
    /// Total asset units paid out (cumulative)
    pub total_assets_paid: u64,
    /// Total redemption operations
    pub total_redemptions: u64,
}

/// Emitted on every successful redemption
#[odra::event]
pub struct PointsRedeemed {
    pub user: Address,
    pub vault_id: u64,
    pub points_amount: u64,
    pub usd_value: u64,
    pub asset_amount: u64,
    pub timestamp_ms: u64,
}

/// Redemption Engine Contract
#[odra::module(events = [PointsRedeemed])]
pub struct RedemptionEngine {
    /// Access control contract address
    access_control: Var<Address>,
    /// Protocol configuration contract address
    config: Var<Address>,
    /// Points ledger contract address
    ledger: Var<Address>,
    /// Partner registry contract address
    partner_registry: Var<Address>,
    /// Price oracle contract address
    oracle: Var<Address>,
    /// Pair quoted for the redeemed asset
    collateral_pair: Var<String>,

    // === Statistics ===
    stats: Var<RedemptionStats>,
}

#[odra::module]
impl RedemptionEngine {
    /// Initialize the redemption engine
    pub fn init(
        &mut self,
        access_control: Address,
        config: Address,
        ledger: Address,
        partner_registry: Address,
        oracle: Address,
        collateral_pair: String,
    ) {
        self.access_control.set(access_control);
        self.config.set(config);
        self.ledger.set(ledger);
        self.partner_registry.set(partner_registry);
        self.oracle.set(oracle);
        self.collateral_pair.set(collateral_pair);
        self.stats.set(RedemptionStats::default());
    }

    // ========== Redemption Functions ==========

    /// Burn `amount` of the caller's available points and pay the asset
    /// equivalent out of `vault_id`
    pub fn redeem_points_for_assets(&mut self, vault_id: u64, amount: u64) -> RedemptionResult {
        if self.config_ref().is_paused(PauseDomain::Redemption) {
            self.env().revert(PointsError::RedemptionPaused);
        }
        if amount == 0 {
            self.env().revert(PointsError::InvalidAmount);
        }

        let user = self.env().caller();
        let mut ledger = self.ledger_ref();
        if ledger.available_balance_of(user) < amount {
            self.env().revert(PointsError::InsufficientBalance);
        }

        let Some(price) = self.usable_price() else {
            self.env().revert(PointsError::InvalidPriceData)
        };
        let usd_value = amount / self.config_ref().points_per_usd();
        let asset_amount = match usd_to_asset_amount(usd_value, price) {
            Ok(0) => self.env().revert(PointsError::InvalidAmount),
            Ok(asset_amount) => asset_amount,
            Err(e) => self.env().revert(e),
        };

        let mut registry = self.registry_ref();
        if !self.vault_can_pay(&registry, vault_id, asset_amount) {
            self.env().revert(PointsError::Infeasible);
        }

        // Commit
        ledger.burn(user, amount, String::from("redemption"));
        registry.on_points_burned_vault(vault_id, amount);
        registry.withdraw_for_redemption(vault_id, asset_amount, user);

        let mut stats = self.get_stats();
        stats.total_points_redeemed = stats.total_points_redeemed.saturating_add(amount);
        stats.total_usd_value = stats.total_usd_value.saturating_add(usd_value);
        stats.total_assets_paid = stats.total_assets_paid.saturating_add(asset_amount);
        stats.total_redemptions = stats.total_redemptions.saturating_add(1);
        self.stats.set(stats);

        self.env().emit_event(PointsRedeemed {
            user,
            vault_id,
            points_amount: amount,
            usd_value,
            asset_amount,
            timestamp_ms: self.env().get_block_time(),
        });

        RedemptionResult {
            vault_id,
            points_redeemed: amount,
            usd_value,
            asset_amount,
        }
    }

    // ========== Query Functions ==========

    /// `(feasible, reserve_ratio_bps)` for redeeming `amount` points from
    /// `vault_id`; never reverts for an unknown vault
    pub fn check_redemption_feasible(&self, vault_id: u64, amount: u64) -> (bool, u64) {
        let registry = self.registry_ref();
        if registry.get_vault(vault_id).is_none() {
            return (false, 0);
        }
        let reserve_ratio_bps = registry.get_vault_collateral_details(vault_id).backing_ratio_bps;

        let feasible = match self.quote(amount) {
            Some((_, asset_amount)) if asset_amount > 0 => {
                self.vault_can_pay(&registry, vault_id, asset_amount)
            }
            _ => false,
        };
        (feasible, reserve_ratio_bps)
    }

    /// `(usd_value, asset_amount)` for `amount` points; zeros when the price
    /// is unusable
    pub fn get_redemption_quote(&self, amount: u64) -> (u64, u64) {
        self.quote(amount).unwrap_or((0, 0))
    }

    /// Get redemption statistics
    pub fn get_stats(&self) -> RedemptionStats {
        self.stats.get().unwrap_or_default()
    }

    pub fn get_collateral_pair(&self) -> String {
        self.collateral_pair
            .get()
            .unwrap_or_else(|| String::from(DEFAULT_COLLATERAL_PAIR))
    }

    pub fn get_ledger(&self) -> Option<Address> {
        self.ledger.get()
    }

    pub fn get_partner_registry(&self) -> Option<Address> {
        self.partner_registry.get()
    }

    pub fn get_oracle(&self) -> Option<Address> {
        self.oracle.get()
    }

    pub fn get_config(&self) -> Option<Address> {
        self.config.get()
    }

    // ========== Admin Functions ==========

    /// Set the quoted collateral pair (admin only)
    pub fn set_collateral_pair(&mut self, pair: String) {
        self.require_role(ROLE_ADMIN);
        if pair.is_empty() {
            self.env().revert(PointsError::InvalidConfig);
        }
        self.collateral_pair.set(pair);
    }

    // ========== Internal Functions ==========

    fn quote(&self, amount: u64) -> Option<(u64, u64)> {
        let price = self.usable_price()?;
        let usd_value = amount / self.config_ref().points_per_usd();
        let asset_amount = usd_to_asset_amount(usd_value, price).ok()?;
        Some((usd_value, asset_amount))
    }

    /// Oracle price if fresh, non-zero and not paused
    fn usable_price(&self) -> Option<u64> {
        let pair = self.get_collateral_pair();
        let oracle = self.oracle_ref();
        if !oracle.is_price_fresh(pair.clone()) {
            return None;
        }
        match oracle.get_price(pair) {
            0 => None,
            price => Some(price),
        }
    }

    fn vault_can_pay(
        &self,
        registry: &PartnerRegistryContractRef,
        vault_id: u64,
        asset_amount: u64,
    ) -> bool {
        match registry.get_vault(vault_id) {
            Some(vault) if vault.active => registry.can_support_transaction(vault_id, asset_amount),
            _ => false,
        }
    }

    fn ledger_ref(&self) -> PointsLedgerContractRef {
        PointsLedgerContractRef::new(self.env(), self.require_address(&self.ledger))
    }

    fn registry_ref(&self) -> PartnerRegistryContractRef {
        PartnerRegistryContractRef::new(self.env(), self.require_address(&self.partner_registry))
    }

    fn oracle_ref(&self) -> PriceOracleContractRef {
        PriceOracleContractRef::new(self.env(), self.require_address(&self.oracle))
    }

    fn config_ref(&self) -> ProtocolConfigContractRef {
        ProtocolConfigContractRef::new(self.env(), self.require_address(&self.config))
    }

    fn require_address(&self, slot: &Var<Address>) -> Address {
        match slot.get() {
            Some(address) => address,
            None => self.env().revert(PointsError::InvalidConfig),
        }
    }

    fn require_role(&self, role_id: u8) {
        let access_control = self.require_address(&self.access_control);
        let caller = self.env().caller();
        let roles = AccessControlContractRef::new(self.env(), access_control);
        if !roles.has_role_or_admin(role_id, caller) {
            self.env().revert(PointsError::UnauthorizedProtocol);
        }
    }
}
