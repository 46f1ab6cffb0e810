//! Price Oracle Contract
//!
//! Stores one price record per trading pair, published by ORACLE-role
//! feeders. Implements:
//! - 8-decimal fixed-point prices with basis-point confidence
//! - Freshness checks against a configurable maximum age
//! - A pause switch that makes every feed read as unusable
//!
//! Writes are unconditional overwrites; feeders are trusted to supply
//! increasing timestamps. Zero prices are accepted at write time and
//! rejected when consumed.

use odra::prelude::*;
use odra::ContractRef;
use crate::access_control::{AccessControlContractRef, ROLE_ADMIN, ROLE_ORACLE, ROLE_PAUSER};
use crate::errors::PointsError;
use crate::math::BPS_SCALE;
use crate::types::{PriceData, PriceRecord};

/// Default maximum price age in milliseconds (1 hour)
pub const DEFAULT_MAX_STALENESS_MS: u64 = 3_600_000;

/// Emitted on every price write
#[odra::event]
pub struct PriceUpdated {
    pub pair: String,
    pub price: u64,
    pub confidence: u32,
    pub observed_at_ms: u64,
}

/// Price Oracle Contract
#[odra::module(events = [PriceUpdated])]
pub struct PriceOracle {
    /// Access control contract address
    access_control: Var<Address>,
    /// Price record per pair
    prices: Mapping<String, PriceRecord>,
    /// Known pairs, by insertion index
    pairs: Mapping<u32, String>,
    /// Number of known pairs
    pair_count: Var<u32>,
    /// Maximum age before a price is stale
    max_staleness_ms: Var<u64>,
    /// Whether the oracle is paused
    paused: Var<bool>,
}

#[odra::module]
impl PriceOracle {
    /// Initialize the oracle
    pub fn init(&mut self, access_control: Address, max_staleness_ms: u64) {
        if max_staleness_ms == 0 {
            self.env().revert(PointsError::InvalidConfig);
        }
        self.access_control.set(access_control);
        self.max_staleness_ms.set(max_staleness_ms);
        self.pair_count.set(0);
        self.paused.set(false);
    }

    // ========== Price Updates ==========

    /// Publish a price for `pair` (oracle role only)
    pub fn set_price(&mut self, pair: String, price: u64, confidence: u32, observed_at_ms: u64) {
        self.require_role(ROLE_ORACLE);
        if self.is_paused() {
            self.env().revert(PointsError::OraclePaused);
        }
        if confidence as u64 > BPS_SCALE {
            self.env().revert(PointsError::InvalidConfidence);
        }

        if self.prices.get(&pair).is_none() {
            let index = self.pair_count.get().unwrap_or(0);
            self.pairs.set(&index, pair.clone());
            self.pair_count.set(index + 1);
        }

        self.prices.set(
            &pair,
            PriceRecord {
                price,
                confidence,
                updated_at_ms: observed_at_ms,
            },
        );

        self.env().emit_event(PriceUpdated {
            pair,
            price,
            confidence,
            observed_at_ms,
        });
    }

    // ========== Price Queries ==========

    /// Raw price; zero for an unknown pair
    pub fn get_price(&self, pair: String) -> u64 {
        self.get_price_record(pair).price
    }

    /// Price and confidence; zeros for an unknown pair
    pub fn get_price_with_confidence(&self, pair: String) -> (u64, u32) {
        let record = self.get_price_record(pair);
        (record.price, record.confidence)
    }

    /// Stored record; the default (all-zero) record for an unknown pair
    pub fn get_price_record(&self, pair: String) -> PriceRecord {
        self.prices.get(&pair).unwrap_or_default()
    }

    /// Price record with staleness evaluated at the current block time
    pub fn get_price_data(&self, pair: String) -> PriceData {
        match self.prices.get(&pair) {
            Some(record) => PriceData {
                price: record.price,
                confidence: record.confidence,
                updated_at_ms: record.updated_at_ms,
                is_stale: self.is_stale(record.updated_at_ms),
            },
            None => PriceData {
                price: 0,
                confidence: 0,
                updated_at_ms: 0,
                is_stale: true,
            },
        }
    }

    /// False if the pair is unknown, stale, or the oracle is paused
    pub fn is_price_fresh(&self, pair: String) -> bool {
        if self.is_paused() {
            return false;
        }
        match self.prices.get(&pair) {
            Some(record) => !self.is_stale(record.updated_at_ms),
            None => false,
        }
    }

    /// Price usable for a conversion, reverting when it is not
    pub fn require_usable_price(&self, pair: String) -> u64 {
        if self.is_paused() {
            self.env().revert(PointsError::OraclePaused);
        }
        let data = self.get_price_data(pair);
        if data.price == 0 || data.is_stale {
            self.env().revert(PointsError::InvalidPriceData);
        }
        data.price
    }

    /// Known pairs in insertion order
    pub fn get_pairs(&self) -> Vec<String> {
        let count = self.pair_count.get().unwrap_or(0);
        (0..count).filter_map(|i| self.pairs.get(&i)).collect()
    }

    pub fn pair_count(&self) -> u32 {
        self.pair_count.get().unwrap_or(0)
    }

    pub fn get_max_staleness_ms(&self) -> u64 {
        self.max_staleness_ms.get().unwrap_or(DEFAULT_MAX_STALENESS_MS)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.get().unwrap_or(false)
    }

    // ========== Admin Functions ==========

    /// Pause the oracle (pauser only)
    pub fn pause(&mut self) {
        self.require_role(ROLE_PAUSER);
        self.paused.set(true);
    }

    /// Unpause the oracle (pauser only)
    pub fn unpause(&mut self) {
        self.require_role(ROLE_PAUSER);
        self.paused.set(false);
    }

    /// Set maximum price age (admin only)
    pub fn set_max_staleness_ms(&mut self, max_staleness_ms: u64) {
        self.require_role(ROLE_ADMIN);
        if max_staleness_ms == 0 {
            self.env().revert(PointsError::InvalidConfig);
        }
        self.max_staleness_ms.set(max_staleness_ms);
    }

    // ========== Internal Functions ==========

    fn is_stale(&self, updated_at_ms: u64) -> bool {
        let now = self.env().get_block_time();
        now.saturating_sub(updated_at_ms) > self.get_max_staleness_ms()
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
