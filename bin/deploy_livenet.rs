//! Deploy the points engine to Casper livenet/testnet using Odra livenet environment.
//!
//! Usage:
//!   cargo run --bin deploy_livenet --release
//!
//! Requires .env file with:
//!   ODRA_CASPER_LIVENET_SECRET_KEY_PATH=/path/to/secret_key.pem
//!   ODRA_CASPER_LIVENET_NODE_ADDRESS=https://node.testnet.casper.network
//!   ODRA_CASPER_LIVENET_CHAIN_NAME=casper-test
//!   ODRA_CASPER_LIVENET_PAYMENT_AMOUNT=200000000000
//!
//! Optional protocol overrides:
//!   POINTS_PER_USD, POINTS_DAILY_MINT_LIMIT, POINTS_MAX_TOTAL_SUPPLY,
//!   POINTS_DEFI_MIN_COLLATERAL, POINTS_PARTNER_DAILY_QUOTA,
//!   POINTS_DEFI_ENABLED_BY_DEFAULT, POINTS_MAX_STALENESS_MS,
//!   POINTS_COLLATERAL_PAIR, POINTS_DEPLOY_MANIFEST

use std::str::FromStr;

use odra::host::{Deployer, HostRef};
use odra::prelude::*;

use points_engine_contracts::access_control::{
    AccessControl, AccessControlInitArgs, ROLE_BURNER, ROLE_VAULT_OPERATOR,
};
use points_engine_contracts::config::{ProtocolConfig, ProtocolConfigInitArgs};
use points_engine_contracts::ledger::{PointsLedger, PointsLedgerInitArgs};
use points_engine_contracts::oracle::{PriceOracle, PriceOracleInitArgs, DEFAULT_MAX_STALENESS_MS};
use points_engine_contracts::partner_vault::{PartnerRegistry, PartnerRegistryInitArgs};
use points_engine_contracts::redemption_engine::{
    RedemptionEngine, RedemptionEngineInitArgs, DEFAULT_COLLATERAL_PAIR,
};

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn main() {
    // Load environment from .env file
    dotenv::dotenv().ok();

    println!("=== Points Engine Livenet Deployment ===");
    println!();

    // Initialize Odra livenet environment
    let env = odra_casper_livenet_env::env();

    // Configure payment amount for deployments/calls (required for Casper 2.0 txs)
    let payment_amount: u64 = env_or("ODRA_CASPER_LIVENET_PAYMENT_AMOUNT", 200_000_000_000);
    env.set_gas(payment_amount);

    let deployer = env.caller();
    println!("Deployer: {:?}", deployer);
    println!();

    // Protocol parameters
    let points_per_usd: u64 = env_or("POINTS_PER_USD", 1_000);
    let daily_mint_limit: u64 = env_or("POINTS_DAILY_MINT_LIMIT", 100_000);
    let max_total_supply: u64 = env_or("POINTS_MAX_TOTAL_SUPPLY", 1_000_000_000_000);
    let defi_min_collateral: u64 = env_or("POINTS_DEFI_MIN_COLLATERAL", 1_000);
    let partner_daily_quota: u64 = env_or("POINTS_PARTNER_DAILY_QUOTA", 0);
    let defi_enabled_by_default: bool = env_or("POINTS_DEFI_ENABLED_BY_DEFAULT", true);
    let max_staleness_ms: u64 = env_or("POINTS_MAX_STALENESS_MS", DEFAULT_MAX_STALENESS_MS);
    let collateral_pair: String =
        env_or("POINTS_COLLATERAL_PAIR", String::from(DEFAULT_COLLATERAL_PAIR));

    // ==================== Phase 1: Governance ====================
    println!("=== Phase 1: Deploying Governance Contracts ===");
    println!();

    println!("Deploying AccessControl...");
    let mut access_control = AccessControl::deploy(
        &env,
        AccessControlInitArgs {
            initial_admin: deployer,
        },
    );
    let access_control_addr = access_control.address().clone();
    println!("AccessControl deployed at: {:?}", access_control_addr);

    println!("Deploying ProtocolConfig...");
    let config = ProtocolConfig::deploy(
        &env,
        ProtocolConfigInitArgs {
            access_control: access_control_addr,
            points_per_usd,
            daily_mint_limit,
            defi_min_collateral,
            partner_daily_quota,
            defi_enabled_by_default,
        },
    );
    let config_addr = config.address().clone();
    println!("ProtocolConfig deployed at: {:?}", config_addr);

    println!();

    // ==================== Phase 2: Core Contracts ====================
    println!("=== Phase 2: Deploying Core Contracts ===");
    println!();

    println!("Deploying PriceOracle...");
    let oracle = PriceOracle::deploy(
        &env,
        PriceOracleInitArgs {
            access_control: access_control_addr,
            max_staleness_ms,
        },
    );
    let oracle_addr = oracle.address().clone();
    println!("PriceOracle deployed at: {:?}", oracle_addr);

    println!("Deploying PointsLedger...");
    let mut ledger = PointsLedger::deploy(
        &env,
        PointsLedgerInitArgs {
            access_control: access_control_addr,
            config: config_addr,
            max_total_supply,
        },
    );
    let ledger_addr = ledger.address().clone();
    println!("PointsLedger deployed at: {:?}", ledger_addr);

    println!("Deploying PartnerRegistry...");
    let registry = PartnerRegistry::deploy(
        &env,
        PartnerRegistryInitArgs {
            access_control: access_control_addr,
            config: config_addr,
        },
    );
    let registry_addr = registry.address().clone();
    println!("PartnerRegistry deployed at: {:?}", registry_addr);

    println!("Deploying RedemptionEngine...");
    let engine = RedemptionEngine::deploy(
        &env,
        RedemptionEngineInitArgs {
            access_control: access_control_addr,
            config: config_addr,
            ledger: ledger_addr,
            partner_registry: registry_addr,
            oracle: oracle_addr,
            collateral_pair: collateral_pair.clone(),
        },
    );
    let engine_addr = engine.address().clone();
    println!("RedemptionEngine deployed at: {:?}", engine_addr);

    println!();

    // ==================== Phase 3: Wiring ====================
    println!("=== Phase 3: Cross-contract Configuration ===");
    println!();

    println!("Configuring PointsLedger -> PartnerRegistry link...");
    ledger.set_partner_registry(registry_addr);
    println!("Done.");

    println!("Granting RedemptionEngine BURNER and VAULT_OPERATOR...");
    access_control.grant_role(ROLE_BURNER, engine_addr);
    access_control.grant_role(ROLE_VAULT_OPERATOR, engine_addr);
    println!("Done.");

    println!("Granting PointsLedger VAULT_OPERATOR...");
    access_control.grant_role(ROLE_VAULT_OPERATOR, ledger_addr);
    println!("Done.");

    println!();
    println!("=== Deployment Complete ===");
    println!();
    println!("Contract Addresses:");
    println!("  AccessControl:      {:?}", access_control_addr);
    println!("  ProtocolConfig:     {:?}", config_addr);
    println!("  PriceOracle:        {:?}", oracle_addr);
    println!("  PointsLedger:       {:?}", ledger_addr);
    println!("  PartnerRegistry:    {:?}", registry_addr);
    println!("  RedemptionEngine:   {:?}", engine_addr);

    let manifest = serde_json::json!({
        "deployer": deployer.to_formatted_string(),
        "collateral_pair": collateral_pair,
        "params": {
            "points_per_usd": points_per_usd,
            "daily_mint_limit": daily_mint_limit,
            "max_total_supply": max_total_supply,
            "defi_min_collateral": defi_min_collateral,
            "partner_daily_quota": partner_daily_quota,
            "defi_enabled_by_default": defi_enabled_by_default,
            "max_staleness_ms": max_staleness_ms,
        },
        "contracts": {
            "access_control": access_control_addr.to_formatted_string(),
            "protocol_config": config_addr.to_formatted_string(),
            "price_oracle": oracle_addr.to_formatted_string(),
            "points_ledger": ledger_addr.to_formatted_string(),
            "partner_registry": registry_addr.to_formatted_string(),
            "redemption_engine": engine_addr.to_formatted_string(),
        },
    });

    let manifest_path = env_or("POINTS_DEPLOY_MANIFEST", String::from("deployment.json"));
    match serde_json::to_string_pretty(&manifest) {
        Ok(body) => match std::fs::write(&manifest_path, body) {
            Ok(()) => println!("\nManifest written to {}", manifest_path),
            Err(e) => eprintln!("\nFailed to write manifest {}: {}", manifest_path, e),
        },
        Err(e) => eprintln!("\nFailed to serialize manifest: {}", e),
    }
}
