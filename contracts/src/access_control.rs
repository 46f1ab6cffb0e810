//! Access Control Contract
//!
//! Role-based authorization for the points engine. Every restricted entry
//! point in the other contracts asks this contract whether its caller holds
//! the required role.
//!
//! Roles:
//! - ADMIN: grants/revokes all roles, passes every role check
//! - MINTER: issues points (staking, referral and partner modules)
//! - BURNER: burns points (redemption engine)
//! - LOCKER: moves points between available and locked
//! - ORACLE: publishes prices
//! - PAUSER: flips pause flags
//! - VAULT_OPERATOR: drives vault reservation and redemption withdrawals

use odra::prelude::*;
use crate::errors::PointsError;

/// Role constants (u8 for efficient storage)
pub const ROLE_ADMIN: u8 = 0;
pub const ROLE_MINTER: u8 = 1;
pub const ROLE_BURNER: u8 = 2;
pub const ROLE_LOCKER: u8 = 3;
pub const ROLE_ORACLE: u8 = 4;
pub const ROLE_PAUSER: u8 = 5;
pub const ROLE_VAULT_OPERATOR: u8 = 6;

const ROLE_COUNT: u8 = 7;

/// Emitted when a role is granted or revoked
#[odra::event]
pub struct RoleChanged {
    pub role_id: u8,
    pub account: Address,
    pub granted: bool,
    pub changed_by: Address,
}

/// Access Control Contract
#[odra::module(events = [RoleChanged])]
pub struct AccessControl {
    /// Role assignments: (role, account) -> bool
    roles: Mapping<(u8, Address), bool>,
    /// Role admin mapping: role -> admin_role
    role_admin: Mapping<u8, u8>,
    /// Number of accounts with each role
    role_count: Mapping<u8, u32>,
    /// Whether the contract is initialized
    initialized: Var<bool>,
}

#[odra::module]
impl AccessControl {
    /// Initialize access control with initial admin
    pub fn init(&mut self, initial_admin: Address) {
        if self.initialized.get().unwrap_or(false) {
            self.env().revert(PointsError::InvalidConfig);
        }

        self.set_role_internal(ROLE_ADMIN, initial_admin, true);

        for role_id in 0..ROLE_COUNT {
            self.role_admin.set(&role_id, ROLE_ADMIN);
        }

        self.initialized.set(true);
    }

    // ========== Role Query Functions ==========

    /// Check if account has a specific role
    pub fn has_role(&self, role_id: u8, account: Address) -> bool {
        self.roles.get(&(role_id, account)).unwrap_or(false)
    }

    /// Check if account has a specific role or is an admin
    pub fn has_role_or_admin(&self, role_id: u8, account: Address) -> bool {
        self.has_role(role_id, account) || self.has_role(ROLE_ADMIN, account)
    }

    /// Get the admin role for a given role
    pub fn get_role_admin(&self, role_id: u8) -> u8 {
        self.role_admin.get(&role_id).unwrap_or(ROLE_ADMIN)
    }

    /// Get the number of accounts with a role
    pub fn get_role_member_count(&self, role_id: u8) -> u32 {
        self.role_count.get(&role_id).unwrap_or(0)
    }

    // ========== Role Management Functions ==========

    /// Grant a role to an account (requires role admin)
    pub fn grant_role(&mut self, role_id: u8, account: Address) {
        self.require_role_admin(role_id);
        if role_id >= ROLE_COUNT {
            self.env().revert(PointsError::InvalidConfig);
        }

        if self.has_role(role_id, account) {
            return;
        }

        self.set_role_internal(role_id, account, true);
    }

    /// Revoke a role from an account (requires role admin)
    pub fn revoke_role(&mut self, role_id: u8, account: Address) {
        self.require_role_admin(role_id);

        if !self.has_role(role_id, account) {
            return;
        }

        self.require_not_last_admin(role_id);
        self.set_role_internal(role_id, account, false);
    }

    /// Renounce a role (caller gives up their own role)
    pub fn renounce_role(&mut self, role_id: u8) {
        let caller = self.env().caller();

        if !self.has_role(role_id, caller) {
            return;
        }

        self.require_not_last_admin(role_id);
        self.set_role_internal(role_id, caller, false);
    }

    /// Set the admin role for a role (admin only)
    pub fn set_role_admin(&mut self, role_id: u8, admin_role_id: u8) {
        if !self.has_role(ROLE_ADMIN, self.env().caller()) {
            self.env().revert(PointsError::Unauthorized);
        }
        if role_id >= ROLE_COUNT || admin_role_id >= ROLE_COUNT {
            self.env().revert(PointsError::InvalidConfig);
        }
        self.role_admin.set(&role_id, admin_role_id);
    }

    // ========== Internal Functions ==========

    fn set_role_internal(&mut self, role_id: u8, account: Address, value: bool) {
        let had_role = self.roles.get(&(role_id, account)).unwrap_or(false);

        self.roles.set(&(role_id, account), value);

        let current_count = self.role_count.get(&role_id).unwrap_or(0);
        if value && !had_role {
            self.role_count.set(&role_id, current_count + 1);
        } else if !value && had_role && current_count > 0 {
            self.role_count.set(&role_id, current_count - 1);
        }

        self.env().emit_event(RoleChanged {
            role_id,
            account,
            granted: value,
            changed_by: self.env().caller(),
        });
    }

    fn require_role_admin(&self, role_id: u8) {
        let admin_role_id = self.get_role_admin(role_id);
        if !self.has_role(admin_role_id, self.env().caller()) {
            self.env().revert(PointsError::UnauthorizedProtocol);
        }
    }

    fn require_not_last_admin(&self, role_id: u8) {
        if role_id == ROLE_ADMIN && self.get_role_member_count(ROLE_ADMIN) <= 1 {
            self.env().revert(PointsError::InvalidConfig);
        }
    }
}
