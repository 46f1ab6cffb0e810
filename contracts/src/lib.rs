//! Points Engine Contracts
//!
//! Non-transferable loyalty points with partner-collateralized redemption.
//!
//! ## Architecture
//!
//! - **AccessControl**: Role registry consulted by every restricted entry point
//! - **ProtocolConfig**: Shared parameters and pause domains
//! - **PriceOracle**: Per-pair 8-decimal prices with staleness checks
//! - **PointsLedger**: Available/locked balances, supply cap, daily mint limits
//! - **PartnerRegistry**: Partner collateral vaults, capabilities, DeFi custody
//! - **RedemptionEngine**: Burns points and pays collateral from a vault
//!
//! ## Flow
//!
//! Minting modules credit points through the ledger; partner-backed mints
//! also reserve collateral in the partner's vault. A redemption burns the
//! caller's points, releases the vault's backing and pays the asset
//! equivalent at the oracle price, all in one transaction.

#![cfg_attr(target_arch = "wasm32", no_std)]

#[cfg(target_arch = "wasm32")]
extern crate alloc;

// Re-export odra for downstream usage
pub use odra;

// Core module declarations
pub mod types;
pub mod errors;
pub mod math;

// Contract modules
pub mod access_control;
pub mod config;
pub mod oracle;
pub mod ledger;
pub mod partner_vault;
pub mod redemption_engine;
