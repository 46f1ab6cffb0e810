//! Partner Registry Contract
//!
//! Holds every partner collateral vault, the capability record bound to
//! each vault, and the cross-partner aggregates.
//!
//! Key mechanics:
//! - Collateral is the native token attached to payable entry points; the
//!   contract purse holds the sum of all live vault balances
//! - Points minted on a partner's behalf reserve `points / points_per_usd`
//!   collateral; burns release it (floored at zero)
//! - Reserved collateral can never be withdrawn by the partner
//! - A vault can be handed to a DeFi custodian once; the custodian then
//!   holds custody (deposits, withdrawals, yield) while the cap keeps the
//!   partner as provenance
//!
//! Every vault mutation updates `RegistryTotals` in the same call, so the
//! aggregates always equal the sums over live vaults.

use odra::prelude::*;
use odra::ContractRef;
use odra::casper_types::U512;
use crate::access_control::{AccessControlContractRef, ROLE_VAULT_OPERATOR};
use crate::config::ProtocolConfigContractRef;
use crate::errors::PointsError;
use crate::math::{day_bucket, points_to_collateral, BPS_SCALE};
use crate::types::{
    CollateralDetails, Custody, DefiState, PartnerCap, PartnerVault, PauseDomain, ProtocolParams,
    RegistryTotals,
};

#[odra::event]
pub struct PartnerVaultCreated {
    pub cap_id: u64,
    pub partner: Address,
    pub generation_id: u32,
    pub collateral: u64,
}

#[odra::event]
pub struct BackingReserved {
    pub vault_id: u64,
    pub points_amount: u64,
    pub collateral_reserved: u64,
}

#[odra::event]
pub struct BackingReleased {
    pub vault_id: u64,
    pub points_amount: u64,
    pub collateral_released: u64,
}

#[odra::event]
pub struct VaultTransferredToDefi {
    pub vault_id: u64,
    pub protocol_name: String,
    pub custodian: Address,
    pub deposit_amount: u64,
}

#[odra::event]
pub struct VaultRevenueAdded {
    pub vault_id: u64,
    pub yield_amount: u64,
    pub lifetime_yield: u64,
}

#[odra::event]
pub struct CollateralDeposited {
    pub vault_id: u64,
    pub depositor: Address,
    pub amount: u64,
}

#[odra::event]
pub struct CollateralWithdrawn {
    pub vault_id: u64,
    pub recipient: Address,
    pub amount: u64,
}

/// Partner Registry Contract
#[odra::module(events = [
    PartnerVaultCreated,
    BackingReserved,
    BackingReleased,
    VaultTransferredToDefi,
    VaultRevenueAdded,
    CollateralDeposited,
    CollateralWithdrawn
])]
pub struct PartnerRegistry {
    /// Access control contract address
    access_control: Var<Address>,
    /// Protocol configuration contract address
    config: Var<Address>,
    /// Vault per vault id
    vaults: Mapping<u64, PartnerVault>,
    /// Capability per cap id (cap id == vault id)
    caps: Mapping<u64, PartnerCap>,
    /// Retired vault ids
    closed: Mapping<u64, bool>,
    /// Day bucket `quota_used_today` refers to, per vault
    quota_days: Mapping<u64, u64>,
    /// Live vaults per generation
    generation_members: Mapping<u32, u64>,
    /// Number of vault ids issued
    vault_count: Var<u64>,
    /// Cross-partner aggregates
    totals: Var<RegistryTotals>,
}

#[odra::module]
impl PartnerRegistry {
    /// Initialize the registry
    pub fn init(&mut self, access_control: Address, config: Address) {
        self.access_control.set(access_control);
        self.config.set(config);
        self.vault_count.set(0);
        self.totals.set(RegistryTotals::default());
    }

    // ========== Partner Onboarding ==========

    /// Create a vault funded with the attached collateral; returns the cap id
    #[odra(payable)]
    pub fn create_partner_with_vault(
        &mut self,
        name: String,
        description: String,
        generation_id: u32,
    ) -> u64 {
        self.config_ref().assert_not_paused(PauseDomain::Vault);
        let collateral = self.attached_amount();
        if collateral == 0 {
            self.env().revert(PointsError::InvalidAmount);
        }

        let params = self.params();
        let partner = self.env().caller();
        let now = self.env().get_block_time();
        let vault_id = self.vault_count.get().unwrap_or(0);

        let vault = PartnerVault {
            owner: partner,
            generation_id,
            usdc_balance: collateral,
            reserved_backing: 0,
            daily_quota: params.partner_daily_quota,
            quota_used_today: 0,
            active: true,
            created_at_ms: now,
            defi: DefiState {
                enabled: params.defi_enabled_by_default,
                ..Default::default()
            },
        };
        let cap = PartnerCap {
            cap_id: vault_id,
            vault_id,
            partner_address: partner,
            vault_owner: partner,
            name,
            description,
        };

        let mut totals = self.get_totals();
        let members = self.generation_members.get(&generation_id).unwrap_or(0);
        if members == 0 {
            totals.total_generations += 1;
        }
        totals.total_partners += 1;
        totals.total_usdc_locked = self.checked_add(totals.total_usdc_locked, collateral);

        self.vaults.set(&vault_id, vault);
        self.caps.set(&vault_id, cap);
        self.quota_days.set(&vault_id, day_bucket(now));
        self.generation_members.set(&generation_id, members + 1);
        self.vault_count.set(vault_id + 1);
        self.totals.set(totals);

        self.env().emit_event(PartnerVaultCreated {
            cap_id: vault_id,
            partner,
            generation_id,
            collateral,
        });

        vault_id
    }

    // ========== Backing Accounting (Protocol Only) ==========

    /// Reserve backing for points minted on behalf of this vault's partner
    ///
    /// Does not check the reservation against the balance; callers gate on
    /// `can_support_points_minting` first.
    pub fn record_points_minting(&mut self, vault_id: u64, points_amount: u64) {
        self.require_role(ROLE_VAULT_OPERATOR);
        let mut vault = self.load_vault(vault_id);
        if !vault.active {
            self.env().revert(PointsError::VaultInactive);
        }

        let today = day_bucket(self.env().get_block_time());
        if self.quota_days.get(&vault_id) != Some(today) {
            vault.quota_used_today = 0;
            self.quota_days.set(&vault_id, today);
        }
        let Some(used) = vault.quota_used_today.checked_add(points_amount) else {
            self.env().revert(PointsError::ExceedsDailyLimit)
        };
        if vault.daily_quota > 0 && used > vault.daily_quota {
            self.env().revert(PointsError::ExceedsDailyLimit);
        }
        vault.quota_used_today = used;

        let reserve = points_to_collateral(points_amount, self.params().points_per_usd);
        vault.reserved_backing = self.checked_add(vault.reserved_backing, reserve);
        self.vaults.set(&vault_id, vault);

        self.env().emit_event(BackingReserved {
            vault_id,
            points_amount,
            collateral_reserved: reserve,
        });
    }

    /// Release backing for burned points, floored at zero
    pub fn on_points_burned_vault(&mut self, vault_id: u64, points_amount: u64) {
        self.require_role(ROLE_VAULT_OPERATOR);
        let mut vault = self.load_vault(vault_id);

        let release = points_to_collateral(points_amount, self.params().points_per_usd)
            .min(vault.reserved_backing);
        vault.reserved_backing -= release;
        self.vaults.set(&vault_id, vault);

        self.env().emit_event(BackingReleased {
            vault_id,
            points_amount,
            collateral_released: release,
        });
    }

    /// Pay unreserved collateral out of a vault for a redemption
    pub fn withdraw_for_redemption(&mut self, vault_id: u64, amount: u64, recipient: Address) {
        self.require_role(ROLE_VAULT_OPERATOR);
        if amount == 0 {
            self.env().revert(PointsError::InvalidAmount);
        }
        let mut vault = self.load_vault(vault_id);
        if !vault.active {
            self.env().revert(PointsError::VaultInactive);
        }
        if !vault.can_support_collateral(amount) {
            self.env().revert(PointsError::Infeasible);
        }

        let mut totals = self.get_totals();
        self.debit_collateral(&mut vault, &mut totals, amount);
        self.vaults.set(&vault_id, vault);
        self.totals.set(totals);

        self.env().transfer_tokens(&recipient, &U512::from(amount));
        self.env().emit_event(CollateralWithdrawn {
            vault_id,
            recipient,
            amount,
        });
    }

    // ========== Vault Queries ==========

    /// Whether the vault could reserve backing for `points_amount` more points
    pub fn can_support_points_minting(&self, vault_id: u64, points_amount: u64) -> bool {
        let vault = self.load_vault(vault_id);
        let reserve = points_to_collateral(points_amount, self.params().points_per_usd);
        vault.can_reserve(reserve)
    }

    /// Whether unreserved collateral covers `collateral_amount`
    pub fn can_support_transaction(&self, vault_id: u64, collateral_amount: u64) -> bool {
        self.load_vault(vault_id).can_support_collateral(collateral_amount)
    }

    pub fn get_vault_collateral_details(&self, vault_id: u64) -> CollateralDetails {
        self.load_vault(vault_id).collateral_details()
    }

    /// Collateral the custody holder may withdraw (never the reserved part)
    pub fn calculate_max_withdrawable(&self, vault_id: u64) -> u64 {
        self.load_vault(vault_id).available_collateral()
    }

    pub fn is_vault_defi_ready(&self, vault_id: u64) -> bool {
        let vault = self.load_vault(vault_id);
        vault.defi.enabled && vault.usdc_balance >= self.params().defi_min_collateral
    }

    /// `(quota_used_today, daily_quota)` at the current block time
    pub fn get_quota_usage(&self, vault_id: u64) -> (u64, u64) {
        let vault = self.load_vault(vault_id);
        let today = day_bucket(self.env().get_block_time());
        let used = if self.quota_days.get(&vault_id) == Some(today) {
            vault.quota_used_today
        } else {
            0
        };
        (used, vault.daily_quota)
    }

    /// Live vault, if any
    pub fn get_vault(&self, vault_id: u64) -> Option<PartnerVault> {
        if self.is_closed(vault_id) {
            return None;
        }
        self.vaults.get(&vault_id)
    }

    /// Live capability, if any
    pub fn get_partner_cap(&self, cap_id: u64) -> Option<PartnerCap> {
        if self.is_closed(cap_id) {
            return None;
        }
        self.caps.get(&cap_id)
    }

    /// DeFi custodian of the vault; `None` while self-custodied
    pub fn get_custody(&self, vault_id: u64) -> Option<Address> {
        self.load_vault(vault_id).defi.custodian
    }

    pub fn get_totals(&self) -> RegistryTotals {
        self.totals.get().unwrap_or_default()
    }

    /// Number of vault ids ever issued
    pub fn vault_count(&self) -> u64 {
        self.vault_count.get().unwrap_or(0)
    }

    pub fn partners_in_generation(&self, generation_id: u32) -> u64 {
        self.generation_members.get(&generation_id).unwrap_or(0)
    }

    // ========== DeFi Custody ==========

    /// Hand the vault to a DeFi custodian (partner only, one-way)
    pub fn transfer_vault_to_defi_protocol(
        &mut self,
        cap_id: u64,
        protocol_name: String,
        apy_bps: u32,
        max_utilization_bps: u32,
        custodian: Address,
    ) {
        self.config_ref().assert_not_paused(PauseDomain::Vault);
        let mut cap = self.load_cap(cap_id);
        self.require_partner(&cap);
        if apy_bps as u64 > BPS_SCALE || max_utilization_bps as u64 > BPS_SCALE {
            self.env().revert(PointsError::InvalidConfig);
        }

        let mut vault = self.load_vault(cap.vault_id);
        if vault.defi.is_deployed() || !self.is_vault_defi_ready(cap.vault_id) {
            self.env().revert(PointsError::VaultNotDefiReady);
        }

        let deposit_amount = vault.usdc_balance;
        vault.defi.protocol_name = Some(protocol_name.clone());
        vault.defi.apy_bps = Some(apy_bps);
        vault.defi.max_utilization_bps = Some(max_utilization_bps);
        vault.defi.custodian = Some(custodian);
        vault.defi.deposit_amount = deposit_amount;
        cap.vault_owner = custodian;

        let mut totals = self.get_totals();
        totals.total_usdc_in_defi = self.checked_add(totals.total_usdc_in_defi, deposit_amount);
        totals.total_vaults_in_defi += 1;

        self.vaults.set(&cap.vault_id, vault);
        self.caps.set(&cap_id, cap);
        self.totals.set(totals);

        self.env().emit_event(VaultTransferredToDefi {
            vault_id: cap_id,
            protocol_name,
            custodian,
            deposit_amount,
        });
    }

    /// Book yield together with the attached asset that realizes it
    ///
    /// Callable by the vault's custody holder or a vault operator. The
    /// attached value must equal `yield_amount`.
    #[odra(payable)]
    pub fn add_revenue_to_vault(&mut self, vault_id: u64, yield_amount: u64) {
        let cap = self.load_cap(vault_id);
        let caller = self.env().caller();
        if caller != cap.vault_owner && !self.has_role(ROLE_VAULT_OPERATOR, caller) {
            self.env().revert(PointsError::InvalidCapability);
        }
        if yield_amount == 0 || self.attached_amount() != yield_amount {
            self.env().revert(PointsError::InvalidAmount);
        }

        let mut vault = self.load_vault(vault_id);
        let mut totals = self.get_totals();
        vault.defi.lifetime_yield = self.checked_add(vault.defi.lifetime_yield, yield_amount);
        totals.total_yield_generated = self.checked_add(totals.total_yield_generated, yield_amount);
        self.credit_collateral(&mut vault, &mut totals, yield_amount);

        let lifetime_yield = vault.defi.lifetime_yield;
        self.vaults.set(&vault_id, vault);
        self.totals.set(totals);

        self.env().emit_event(VaultRevenueAdded {
            vault_id,
            yield_amount,
            lifetime_yield,
        });
    }

    // ========== Partner Collateral Management ==========

    /// Top up a vault with the attached collateral (custody holder only)
    #[odra(payable)]
    pub fn deposit_collateral(&mut self, cap_id: u64) {
        self.config_ref().assert_not_paused(PauseDomain::Vault);
        let cap = self.load_cap(cap_id);
        self.require_custody_holder(&cap);
        let amount = self.attached_amount();
        if amount == 0 {
            self.env().revert(PointsError::InvalidAmount);
        }

        let mut vault = self.load_vault(cap.vault_id);
        let mut totals = self.get_totals();
        self.credit_collateral(&mut vault, &mut totals, amount);
        self.vaults.set(&cap.vault_id, vault);
        self.totals.set(totals);

        self.env().emit_event(CollateralDeposited {
            vault_id: cap.vault_id,
            depositor: self.env().caller(),
            amount,
        });
    }

    /// Withdraw unreserved collateral to the caller (custody holder only)
    pub fn withdraw_collateral(&mut self, cap_id: u64, amount: u64) {
        self.config_ref().assert_not_paused(PauseDomain::Vault);
        let cap = self.load_cap(cap_id);
        self.require_custody_holder(&cap);
        if amount == 0 {
            self.env().revert(PointsError::InvalidAmount);
        }

        let mut vault = self.load_vault(cap.vault_id);
        if amount > vault.available_collateral() {
            self.env().revert(PointsError::InsufficientCollateral);
        }

        let mut totals = self.get_totals();
        self.debit_collateral(&mut vault, &mut totals, amount);
        self.vaults.set(&cap.vault_id, vault);
        self.totals.set(totals);

        let recipient = self.env().caller();
        self.env().transfer_tokens(&recipient, &U512::from(amount));
        self.env().emit_event(CollateralWithdrawn {
            vault_id: cap.vault_id,
            recipient,
            amount,
        });
    }

    /// Activate or deactivate a vault (partner only)
    pub fn set_vault_active(&mut self, cap_id: u64, active: bool) {
        let cap = self.load_cap(cap_id);
        self.require_partner(&cap);
        let mut vault = self.load_vault(cap.vault_id);
        vault.active = active;
        self.vaults.set(&cap.vault_id, vault);
    }

    /// Opt the vault in or out of DeFi deployment (partner only, before transfer)
    pub fn set_defi_enabled(&mut self, cap_id: u64, enabled: bool) {
        let cap = self.load_cap(cap_id);
        self.require_partner(&cap);
        let mut vault = self.load_vault(cap.vault_id);
        if vault.defi.is_deployed() {
            self.env().revert(PointsError::VaultNotDefiReady);
        }
        vault.defi.enabled = enabled;
        self.vaults.set(&cap.vault_id, vault);
    }

    /// Tear down a self-custodied vault with no outstanding reservation
    ///
    /// Refunds the whole balance to the partner and retires vault and cap.
    pub fn close_partner_vault(&mut self, cap_id: u64) {
        let cap = self.load_cap(cap_id);
        self.require_partner(&cap);
        let vault = self.load_vault(cap.vault_id);
        if let Custody::External(_) = vault.defi.custody() {
            self.env().revert(PointsError::VaultNotDefiReady);
        }
        if vault.reserved_backing > 0 {
            self.env().revert(PointsError::VaultHasReservedBacking);
        }

        let mut totals = self.get_totals();
        totals.total_partners -= 1;
        totals.total_usdc_locked -= vault.usdc_balance;
        totals.total_yield_generated -= vault.defi.lifetime_yield;
        let members = self.generation_members.get(&vault.generation_id).unwrap_or(0);
        if members <= 1 {
            totals.total_generations -= 1;
        }

        self.generation_members.set(&vault.generation_id, members.saturating_sub(1));
        self.closed.set(&cap.vault_id, true);
        self.totals.set(totals);

        if vault.usdc_balance > 0 {
            self.env().transfer_tokens(&cap.partner_address, &U512::from(vault.usdc_balance));
            self.env().emit_event(CollateralWithdrawn {
                vault_id: cap.vault_id,
                recipient: cap.partner_address,
                amount: vault.usdc_balance,
            });
        }
    }

    // ========== Internal Functions ==========

    fn credit_collateral(&self, vault: &mut PartnerVault, totals: &mut RegistryTotals, amount: u64) {
        vault.usdc_balance = self.checked_add(vault.usdc_balance, amount);
        totals.total_usdc_locked = self.checked_add(totals.total_usdc_locked, amount);
        if vault.defi.is_deployed() {
            vault.defi.deposit_amount += amount;
            totals.total_usdc_in_defi = self.checked_add(totals.total_usdc_in_defi, amount);
        }
    }

    /// Caller guarantees `amount <= vault.usdc_balance`
    fn debit_collateral(&self, vault: &mut PartnerVault, totals: &mut RegistryTotals, amount: u64) {
        vault.usdc_balance -= amount;
        totals.total_usdc_locked -= amount;
        if vault.defi.is_deployed() {
            let from_deposit = amount.min(vault.defi.deposit_amount);
            vault.defi.deposit_amount -= from_deposit;
            totals.total_usdc_in_defi -= from_deposit;
        }
    }

    fn checked_add(&self, a: u64, b: u64) -> u64 {
        match a.checked_add(b) {
            Some(sum) => sum,
            None => self.env().revert(PointsError::ArithmeticOverflow),
        }
    }

    fn attached_amount(&self) -> u64 {
        let attached = self.env().attached_value();
        if attached > U512::from(u64::MAX) {
            self.env().revert(PointsError::ArithmeticOverflow);
        }
        attached.as_u64()
    }

    fn is_closed(&self, vault_id: u64) -> bool {
        self.closed.get(&vault_id).unwrap_or(false)
    }

    fn load_vault(&self, vault_id: u64) -> PartnerVault {
        match self.get_vault(vault_id) {
            Some(vault) => vault,
            None => self.env().revert(PointsError::VaultNotFound),
        }
    }

    fn load_cap(&self, cap_id: u64) -> PartnerCap {
        match self.get_partner_cap(cap_id) {
            Some(cap) => cap,
            None => self.env().revert(PointsError::VaultNotFound),
        }
    }

    fn require_partner(&self, cap: &PartnerCap) {
        if self.env().caller() != cap.partner_address {
            self.env().revert(PointsError::InvalidCapability);
        }
    }

    fn require_custody_holder(&self, cap: &PartnerCap) {
        if self.env().caller() != cap.vault_owner {
            self.env().revert(PointsError::InvalidCapability);
        }
    }

    fn params(&self) -> ProtocolParams {
        self.config_ref().get_params()
    }

    fn config_ref(&self) -> ProtocolConfigContractRef {
        let Some(config) = self.config.get() else {
            self.env().revert(PointsError::InvalidConfig)
        };
        ProtocolConfigContractRef::new(self.env(), config)
    }

    fn has_role(&self, role_id: u8, account: Address) -> bool {
        let Some(access_control) = self.access_control.get() else {
            self.env().revert(PointsError::InvalidConfig)
        };
        AccessControlContractRef::new(self.env(), access_control).has_role_or_admin(role_id, account)
    }

    fn require_role(&self, role_id: u8) {
        if !self.has_role(role_id, self.env().caller()) {
            self.env().revert(PointsError::UnauthorizedProtocol);
        }
    }
}
