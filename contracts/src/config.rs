//! Protocol configuration contract.
//!
//! Holds the read-only parameter object consumed by the ledger, partner
//! registry and redemption engine, plus the independent pause domains.

use odra::prelude::*;
use odra::ContractRef;
use crate::access_control::{AccessControlContractRef, ROLE_ADMIN, ROLE_PAUSER};
use crate::errors::PointsError;
use crate::types::{PauseDomain, ProtocolParams};

/// Emitted when a pause domain flips
#[odra::event]
pub struct PauseChanged {
    pub domain: PauseDomain,
    pub paused: bool,
}

/// Protocol configuration contract
#[odra::module(events = [PauseChanged])]
pub struct ProtocolConfig {
    /// Access control contract address
    access_control: Var<Address>,
    /// Protocol parameters
    params: Var<ProtocolParams>,
    /// Pause flags per domain
    paused: Mapping<PauseDomain, bool>,
}

#[odra::module]
impl ProtocolConfig {
    /// Initialize with primitive parameter values
    pub fn init(
        &mut self,
        access_control: Address,
        points_per_usd: u64,
        daily_mint_limit: u64,
        defi_min_collateral: u64,
        partner_daily_quota: u64,
        defi_enabled_by_default: bool,
    ) {
        let params = ProtocolParams {
            points_per_usd,
            daily_mint_limit,
            defi_min_collateral,
            partner_daily_quota,
            defi_enabled_by_default,
        };
        self.validate(&params);
        self.access_control.set(access_control);
        self.params.set(params);
    }

    // ========== Parameter Queries ==========

    /// Get protocol parameters
    pub fn get_params(&self) -> ProtocolParams {
        match self.params.get() {
            Some(params) => params,
            None => self.env().revert(PointsError::InvalidConfig),
        }
    }

    pub fn points_per_usd(&self) -> u64 {
        self.get_params().points_per_usd
    }

    pub fn daily_mint_limit(&self) -> u64 {
        self.get_params().daily_mint_limit
    }

    pub fn defi_min_collateral(&self) -> u64 {
        self.get_params().defi_min_collateral
    }

    /// Get access control address
    pub fn get_access_control(&self) -> Option<Address> {
        self.access_control.get()
    }

    // ========== Pause Domains ==========

    /// Whether `domain` is paused, directly or through the global flag
    pub fn is_paused(&self, domain: PauseDomain) -> bool {
        self.paused.get(&PauseDomain::Global).unwrap_or(false)
            || self.paused.get(&domain).unwrap_or(false)
    }

    /// Revert with `ProtocolPaused` if `domain` is paused
    pub fn assert_not_paused(&self, domain: PauseDomain) {
        if self.is_paused(domain) {
            self.env().revert(PointsError::ProtocolPaused);
        }
    }

    /// Pause a domain (pauser only)
    pub fn pause(&mut self, domain: PauseDomain) {
        self.require_role(ROLE_PAUSER);
        self.set_paused(domain, true);
    }

    /// Unpause a domain (pauser only)
    pub fn unpause(&mut self, domain: PauseDomain) {
        self.require_role(ROLE_PAUSER);
        self.set_paused(domain, false);
    }

    // ========== Admin Functions ==========

    /// Replace protocol parameters (admin only)
    pub fn set_params(&mut self, params: ProtocolParams) {
        self.require_role(ROLE_ADMIN);
        self.validate(&params);
        self.params.set(params);
    }

    // ========== Internal Functions ==========

    fn set_paused(&mut self, domain: PauseDomain, paused: bool) {
        self.paused.set(&domain, paused);
        self.env().emit_event(PauseChanged { domain, paused });
    }

    fn validate(&self, params: &ProtocolParams) {
        if params.points_per_usd == 0 || params.daily_mint_limit == 0 {
            self.env().revert(PointsError::InvalidConfig);
        }
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
