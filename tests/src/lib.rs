//! Points Engine Integration Tests
//!
//! Deploys the full contract set on the Odra test VM and drives it the way
//! minting modules, partners, feeders and redeemers do.

#[cfg(test)]
mod fixture {
    use odra::casper_types::U512;
    use odra::host::{Deployer, HostEnv, HostRef};
    use odra::prelude::*;
    use points_engine_contracts::access_control::{
        AccessControl, AccessControlHostRef, AccessControlInitArgs, ROLE_BURNER, ROLE_LOCKER,
        ROLE_MINTER, ROLE_ORACLE, ROLE_PAUSER, ROLE_VAULT_OPERATOR,
    };
    use points_engine_contracts::config::{ProtocolConfig, ProtocolConfigHostRef, ProtocolConfigInitArgs};
    use points_engine_contracts::ledger::{PointsLedger, PointsLedgerHostRef, PointsLedgerInitArgs};
    use points_engine_contracts::oracle::{PriceOracle, PriceOracleHostRef, PriceOracleInitArgs};
    use points_engine_contracts::partner_vault::{
        PartnerRegistry, PartnerRegistryHostRef, PartnerRegistryInitArgs,
    };
    use points_engine_contracts::redemption_engine::{
        RedemptionEngine, RedemptionEngineHostRef, RedemptionEngineInitArgs,
    };

    pub const PAIR: &str = "SUI/USD";
    pub const POINTS_PER_USD: u64 = 1_000;
    pub const DAILY_MINT_LIMIT: u64 = 100_000;
    pub const MAX_TOTAL_SUPPLY: u64 = 1_000_000_000;
    pub const DEFI_MIN_COLLATERAL: u64 = 500;
    pub const MAX_STALENESS_MS: u64 = 3_600_000;
    /// 2.00 USD with 8 decimals
    pub const SUI_PRICE: u64 = 200_000_000;

    pub struct Protocol {
        pub env: HostEnv,
        pub admin: Address,
        pub operator: Address,
        pub feeder: Address,
        pub partner: Address,
        pub user: Address,
        pub custodian: Address,
        pub access_control: AccessControlHostRef,
        pub config: ProtocolConfigHostRef,
        pub oracle: PriceOracleHostRef,
        pub ledger: PointsLedgerHostRef,
        pub registry: PartnerRegistryHostRef,
        pub engine: RedemptionEngineHostRef,
    }

    pub fn setup() -> Protocol {
        setup_with_quota(0)
    }

    /// Deploy and wire every contract; `partner_daily_quota` applies to new vaults
    pub fn setup_with_quota(partner_daily_quota: u64) -> Protocol {
        let env = odra_test::env();
        let admin = env.get_account(0);
        let operator = env.get_account(1);
        let feeder = env.get_account(2);
        let partner = env.get_account(3);
        let user = env.get_account(4);
        let custodian = env.get_account(5);
        env.set_caller(admin);

        let mut access_control = AccessControl::deploy(
            &env,
            AccessControlInitArgs {
                initial_admin: admin,
            },
        );
        let access_control_addr = access_control.address().clone();

        let config = ProtocolConfig::deploy(
            &env,
            ProtocolConfigInitArgs {
                access_control: access_control_addr,
                points_per_usd: POINTS_PER_USD,
                daily_mint_limit: DAILY_MINT_LIMIT,
                defi_min_collateral: DEFI_MIN_COLLATERAL,
                partner_daily_quota,
                defi_enabled_by_default: true,
            },
        );
        let config_addr = config.address().clone();

        let oracle = PriceOracle::deploy(
            &env,
            PriceOracleInitArgs {
                access_control: access_control_addr,
                max_staleness_ms: MAX_STALENESS_MS,
            },
        );
        let oracle_addr = oracle.address().clone();

        let mut ledger = PointsLedger::deploy(
            &env,
            PointsLedgerInitArgs {
                access_control: access_control_addr,
                config: config_addr,
                max_total_supply: MAX_TOTAL_SUPPLY,
            },
        );
        let ledger_addr = ledger.address().clone();

        let registry = PartnerRegistry::deploy(
            &env,
            PartnerRegistryInitArgs {
                access_control: access_control_addr,
                config: config_addr,
            },
        );
        let registry_addr = registry.address().clone();

        let engine = RedemptionEngine::deploy(
            &env,
            RedemptionEngineInitArgs {
                access_control: access_control_addr,
                config: config_addr,
                ledger: ledger_addr,
                partner_registry: registry_addr,
                oracle: oracle_addr,
                collateral_pair: String::from(PAIR),
            },
        );
        let engine_addr = engine.address().clone();

        ledger.set_partner_registry(registry_addr);
        for role in [ROLE_MINTER, ROLE_BURNER, ROLE_LOCKER] {
            access_control.grant_role(role, operator);
        }
        access_control.grant_role(ROLE_ORACLE, feeder);
        access_control.grant_role(ROLE_PAUSER, operator);
        access_control.grant_role(ROLE_BURNER, engine_addr);
        access_control.grant_role(ROLE_VAULT_OPERATOR, engine_addr);
        access_control.grant_role(ROLE_VAULT_OPERATOR, ledger_addr);

        Protocol {
            env,
            admin,
            operator,
            feeder,
            partner,
            user,
            custodian,
            access_control,
            config,
            oracle,
            ledger,
            registry,
            engine,
        }
    }

    impl Protocol {
        /// Publish `price` for the collateral pair, observed now
        pub fn feed_price(&mut self, price: u64) {
            self.env.set_caller(self.feeder);
            let now = self.env.block_time();
            self.oracle.set_price(String::from(PAIR), price, 9_900, now);
        }

        /// Create a vault for the partner funded with `collateral` units
        pub fn create_vault(&mut self, collateral: u64) -> u64 {
            self.env.set_caller(self.partner);
            self.registry
                .with_tokens(U512::from(collateral))
                .create_partner_with_vault(String::from("Acme"), String::from("Acme rewards"), 1)
        }

        pub fn mint(&mut self, to: Address, amount: u64) {
            self.env.set_caller(self.operator);
            self.ledger
                .mint(to, amount, points_engine_contracts::types::PointType::StakingReward, String::from("stake"));
        }

        pub fn registry_balance(&self) -> U512 {
            self.env.balance_of(self.registry.address())
        }
    }
}

#[cfg(test)]
mod ledger_tests {
    use crate::fixture::*;
    use points_engine_contracts::errors::PointsError;
    use points_engine_contracts::math::MS_PER_DAY;
    use points_engine_contracts::types::PointType;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_supply_conservation_across_mints_and_burns() {
        let mut p = setup();
        let other = p.env.get_account(6);
        p.mint(p.user, 40_000);
        p.mint(other, 25_000);

        p.env.set_caller(p.operator);
        p.ledger.burn(p.user, 15_000, String::from("spend"));
        p.ledger.lock(other, 5_000, String::from("loan"));

        let held = p.ledger.total_balance_of(p.user) + p.ledger.total_balance_of(other);
        assert_eq!(p.ledger.total_minted(), 65_000);
        assert_eq!(p.ledger.total_burned(), 15_000);
        assert_eq!(p.ledger.circulating_supply(), held);
    }

    #[test]
    fn test_lock_and_unlock_preserve_total() {
        let mut p = setup();
        p.mint(p.user, 10_000);

        p.env.set_caller(p.operator);
        p.ledger.lock(p.user, 4_000, String::from("loan"));
        assert_eq!(p.ledger.available_balance_of(p.user), 6_000);
        assert_eq!(p.ledger.locked_balance_of(p.user), 4_000);
        assert_eq!(p.ledger.total_balance_of(p.user), 10_000);

        assert_eq!(
            p.ledger.try_unlock(p.user, 4_001, String::from("repay")),
            Err(PointsError::InsufficientLocked.into())
        );
        assert_eq!(
            p.ledger.try_burn(p.user, 6_001, String::from("spend")),
            Err(PointsError::InsufficientBalance.into())
        );

        p.ledger.unlock(p.user, 4_000, String::from("repay"));
        assert_eq!(p.ledger.available_balance_of(p.user), 10_000);
        assert_eq!(p.ledger.total_balance_of(p.user), 10_000);
    }

    #[test]
    fn test_daily_limit_boundary_and_rollover() {
        let mut p = setup();
        p.mint(p.user, DAILY_MINT_LIMIT);
        assert_eq!(p.ledger.get_daily_mint_window(p.user), (DAILY_MINT_LIMIT, DAILY_MINT_LIMIT));

        p.env.set_caller(p.operator);
        assert_eq!(
            p.ledger.try_mint(p.user, 1, PointType::StakingReward, String::from("stake")),
            Err(PointsError::ExceedsDailyLimit.into())
        );

        p.env.advance_block_time(MS_PER_DAY);
        assert_eq!(p.ledger.get_daily_mint_window(p.user), (0, DAILY_MINT_LIMIT));
        p.mint(p.user, DAILY_MINT_LIMIT);
        assert_eq!(p.ledger.available_balance_of(p.user), 2 * DAILY_MINT_LIMIT);
    }

    #[test]
    fn test_daily_limit_is_per_user() {
        let mut p = setup();
        let other = p.env.get_account(6);
        p.mint(p.user, DAILY_MINT_LIMIT);
        p.mint(other, DAILY_MINT_LIMIT);
        assert_eq!(p.ledger.total_minted(), 2 * DAILY_MINT_LIMIT);
    }

    #[test]
    fn test_supply_cap() {
        let mut p = setup();
        p.env.set_caller(p.admin);
        p.ledger.set_max_total_supply(60_000);
        p.mint(p.user, 60_000);

        p.env.set_caller(p.operator);
        assert_eq!(
            p.ledger.try_mint(p.user, 1, PointType::StakingReward, String::from("stake")),
            Err(PointsError::ExceedsSupplyCap.into())
        );

        // Burning frees headroom under the cap
        p.ledger.burn(p.user, 10_000, String::from("spend"));
        p.mint(p.user, 10_000);
        assert_eq!(p.ledger.circulating_supply(), 60_000);

        p.env.set_caller(p.admin);
        assert_eq!(
            p.ledger.try_set_max_total_supply(59_999),
            Err(PointsError::InvalidConfig.into())
        );
    }

    #[test]
    fn test_zero_amounts_rejected() {
        let mut p = setup();
        p.env.set_caller(p.operator);
        assert_eq!(
            p.ledger.try_mint(p.user, 0, PointType::StakingReward, String::from("stake")),
            Err(PointsError::InvalidAmount.into())
        );
        assert_eq!(
            p.ledger.try_lock(p.user, 0, String::from("loan")),
            Err(PointsError::InvalidAmount.into())
        );
        assert_eq!(
            p.ledger.try_unlock(p.user, 0, String::from("loan")),
            Err(PointsError::InvalidAmount.into())
        );
        assert_eq!(
            p.ledger.try_burn(p.user, 0, String::from("spend")),
            Err(PointsError::InvalidAmount.into())
        );
    }

    #[test]
    fn test_ledger_pause_blocks_minting() {
        let mut p = setup();
        p.mint(p.user, 1_000);

        p.env.set_caller(p.operator);
        p.ledger.set_paused(true);
        assert!(p.ledger.is_paused());
        assert_eq!(
            p.ledger.try_mint(p.user, 1_000, PointType::StakingReward, String::from("stake")),
            Err(PointsError::ProtocolPaused.into())
        );
        // Existing balances stay spendable
        p.ledger.burn(p.user, 400, String::from("spend"));
        assert_eq!(p.ledger.available_balance_of(p.user), 600);

        p.env.set_caller(p.user);
        assert_eq!(
            p.ledger.try_set_paused(false),
            Err(PointsError::UnauthorizedProtocol.into())
        );

        p.env.set_caller(p.operator);
        p.ledger.set_paused(false);
        p.ledger.mint(p.user, 1_000, PointType::StakingReward, String::from("stake"));
        assert_eq!(p.ledger.available_balance_of(p.user), 1_600);
    }

    #[test]
    fn test_mint_requires_minter_role() {
        let mut p = setup();
        p.env.set_caller(p.user);
        assert_eq!(
            p.ledger.try_mint(p.user, 1_000, PointType::EmergencyMint, String::from("self")),
            Err(PointsError::UnauthorizedProtocol.into())
        );
        assert_eq!(p.ledger.total_minted(), 0);
    }

    #[test]
    fn test_pure_helpers() {
        let p = setup();
        // 1,000,000 staked at 10% APY for one year
        assert_eq!(p.ledger.calculate_apy_rewards(1_000_000, 1_000, 31_536_000, 1_000_000), 100_000);
        assert_eq!(
            p.ledger.try_calculate_apy_rewards(1_000_000, 1_000, 31_536_000, 0),
            Err(PointsError::InvalidAmount.into())
        );
        assert_eq!(p.ledger.convert_sui_to_usd_value(25, SUI_PRICE), 50);
    }
}

#[cfg(test)]
mod oracle_tests {
    use crate::fixture::*;
    use points_engine_contracts::errors::PointsError;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_staleness_boundary() {
        let mut p = setup();
        p.feed_price(SUI_PRICE);
        let t0 = p.env.block_time();

        p.env.advance_block_time(MAX_STALENESS_MS);
        assert!(p.oracle.is_price_fresh(String::from(PAIR)));
        let data = p.oracle.get_price_data(String::from(PAIR));
        assert_eq!(data.updated_at_ms, t0);
        assert!(!data.is_stale);

        p.env.advance_block_time(1);
        assert!(!p.oracle.is_price_fresh(String::from(PAIR)));
        assert!(p.oracle.get_price_data(String::from(PAIR)).is_stale);
        assert_eq!(
            p.oracle.try_require_usable_price(String::from(PAIR)),
            Err(PointsError::InvalidPriceData.into())
        );
    }

    #[test]
    fn test_unknown_pair() {
        let p = setup();
        assert_eq!(p.oracle.get_price(String::from("BTC/USD")), 0);
        assert!(!p.oracle.is_price_fresh(String::from("BTC/USD")));
        assert!(p.oracle.get_price_data(String::from("BTC/USD")).is_stale);
    }

    #[test]
    fn test_confidence_bounds_and_roles() {
        let mut p = setup();
        p.env.set_caller(p.feeder);
        assert_eq!(
            p.oracle.try_set_price(String::from(PAIR), SUI_PRICE, 10_001, 0),
            Err(PointsError::InvalidConfidence.into())
        );

        p.env.set_caller(p.user);
        assert_eq!(
            p.oracle.try_set_price(String::from(PAIR), SUI_PRICE, 9_000, 0),
            Err(PointsError::UnauthorizedProtocol.into())
        );

        p.feed_price(SUI_PRICE);
        p.feed_price(SUI_PRICE + 1);
        assert_eq!(p.oracle.get_pairs(), vec![String::from(PAIR)]);
        assert_eq!(
            p.oracle.get_price_with_confidence(String::from(PAIR)),
            (SUI_PRICE + 1, 9_900)
        );
    }

    #[test]
    fn test_paused_oracle_rejects_writes_and_reads_unusable() {
        let mut p = setup();
        p.feed_price(SUI_PRICE);

        p.env.set_caller(p.operator);
        p.oracle.pause();
        assert!(!p.oracle.is_price_fresh(String::from(PAIR)));

        p.env.set_caller(p.feeder);
        assert_eq!(
            p.oracle.try_set_price(String::from(PAIR), SUI_PRICE, 9_000, 0),
            Err(PointsError::OraclePaused.into())
        );
    }
}

#[cfg(test)]
mod partner_vault_tests {
    use crate::fixture::*;
    use odra::casper_types::U512;
    use odra::host::HostRef;
    use points_engine_contracts::errors::PointsError;
    use points_engine_contracts::math::MS_PER_DAY;
    use points_engine_contracts::types::PauseDomain;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_create_vault_updates_totals() {
        let mut p = setup();
        let first = p.create_vault(1_000);
        let second = p.create_vault(400);
        assert_eq!((first, second), (0, 1));
        assert_eq!(p.registry_balance(), U512::from(1_400u64));

        let totals = p.registry.get_totals();
        assert_eq!(totals.total_partners, 2);
        assert_eq!(totals.total_generations, 1);
        assert_eq!(totals.total_usdc_locked, 1_400);
        assert_eq!(p.registry.partners_in_generation(1), 2);

        let cap = p.registry.get_partner_cap(first).unwrap();
        assert_eq!(cap.partner_address, p.partner);
        assert_eq!(cap.vault_owner, p.partner);
        assert_eq!(p.registry.get_custody(first), None);
    }

    #[test]
    fn test_create_vault_requires_collateral() {
        let mut p = setup();
        p.env.set_caller(p.partner);
        assert_eq!(
            p.registry
                .try_create_partner_with_vault(String::from("Acme"), String::new(), 1),
            Err(PointsError::InvalidAmount.into())
        );
    }

    #[test]
    fn test_backed_mints_never_over_reserve() {
        let mut p = setup();
        let vault = p.create_vault(100);

        p.env.set_caller(p.operator);
        p.ledger.mint_backed(p.user, 60_000, vault, String::from("campaign"));
        let details = p.registry.get_vault_collateral_details(vault);
        assert_eq!(details.reserved, 60);
        assert_eq!(details.available, 40);
        assert!(p.registry.can_support_points_minting(vault, 40_000));
        assert!(!p.registry.can_support_points_minting(vault, 41_000));

        assert_eq!(
            p.ledger.try_mint_backed(p.user, 41_000, vault, String::from("campaign")),
            Err(PointsError::Infeasible.into())
        );
        // Rejected mint credits nothing
        assert_eq!(p.ledger.available_balance_of(p.user), 60_000);

        let details = p.registry.get_vault_collateral_details(vault);
        assert!(details.reserved <= details.total);
        assert_eq!(details.backing_ratio_bps, 16_666);
    }

    #[test]
    fn test_partner_cannot_withdraw_reserved_collateral() {
        let mut p = setup();
        let vault = p.create_vault(100);
        p.env.set_caller(p.operator);
        p.ledger.mint_backed(p.user, 60_000, vault, String::from("campaign"));

        assert_eq!(p.registry.calculate_max_withdrawable(vault), 40);
        p.env.set_caller(p.partner);
        assert_eq!(
            p.registry.try_withdraw_collateral(vault, 41),
            Err(PointsError::InsufficientCollateral.into())
        );

        p.registry.withdraw_collateral(vault, 40);
        assert_eq!(p.registry_balance(), U512::from(60u64));
        assert_eq!(p.registry.get_totals().total_usdc_locked, 60);
        assert_eq!(
            p.registry.try_close_partner_vault(vault),
            Err(PointsError::VaultHasReservedBacking.into())
        );
    }

    #[test]
    fn test_only_partner_manages_vault() {
        let mut p = setup();
        let vault = p.create_vault(100);
        p.env.set_caller(p.user);
        assert_eq!(
            p.registry.try_withdraw_collateral(vault, 1),
            Err(PointsError::InvalidCapability.into())
        );
        assert_eq!(
            p.registry.try_set_vault_active(vault, false),
            Err(PointsError::InvalidCapability.into())
        );
        assert_eq!(
            p.registry.try_record_points_minting(vault, 1_000),
            Err(PointsError::UnauthorizedProtocol.into())
        );
    }

    #[test]
    fn test_partner_daily_quota() {
        let mut p = setup_with_quota(30_000);
        let vault = p.create_vault(1_000);

        p.env.set_caller(p.operator);
        p.ledger.mint_backed(p.user, 30_000, vault, String::from("campaign"));
        assert_eq!(
            p.ledger.try_mint_backed(p.user, 1, vault, String::from("campaign")),
            Err(PointsError::ExceedsDailyLimit.into())
        );
        assert_eq!(p.registry.get_quota_usage(vault), (30_000, 30_000));

        p.env.advance_block_time(MS_PER_DAY);
        assert_eq!(p.registry.get_quota_usage(vault), (0, 30_000));
        p.ledger.mint_backed(p.user, 30_000, vault, String::from("campaign"));
        assert_eq!(p.registry.get_vault_collateral_details(vault).reserved, 60);
    }

    #[test]
    fn test_inactive_vault_rejects_backed_mints() {
        let mut p = setup();
        let vault = p.create_vault(1_000);
        p.env.set_caller(p.partner);
        p.registry.set_vault_active(vault, false);

        p.env.set_caller(p.operator);
        assert_eq!(
            p.ledger.try_mint_backed(p.user, 1_000, vault, String::from("campaign")),
            Err(PointsError::VaultInactive.into())
        );
        assert_eq!(p.ledger.total_minted(), 0);
    }

    #[test]
    fn test_defi_transfer_moves_custody() {
        let mut p = setup();
        let vault = p.create_vault(1_000);
        assert!(p.registry.is_vault_defi_ready(vault));

        p.env.set_caller(p.partner);
        p.registry
            .transfer_vault_to_defi_protocol(vault, String::from("Lendr"), 800, 9_000, p.custodian);

        let totals = p.registry.get_totals();
        assert_eq!(totals.total_usdc_in_defi, 1_000);
        assert_eq!(totals.total_vaults_in_defi, 1);
        assert_eq!(p.registry.get_custody(vault), Some(p.custodian));
        let cap = p.registry.get_partner_cap(vault).unwrap();
        assert_eq!(cap.partner_address, p.partner);
        assert_eq!(cap.vault_owner, p.custodian);

        // One-way
        assert_eq!(
            p.registry.try_transfer_vault_to_defi_protocol(
                vault,
                String::from("Other"),
                500,
                9_000,
                p.custodian
            ),
            Err(PointsError::VaultNotDefiReady.into())
        );
        // Custody moved away from the partner
        assert_eq!(
            p.registry.try_withdraw_collateral(vault, 1),
            Err(PointsError::InvalidCapability.into())
        );

        p.env.set_caller(p.custodian);
        p.registry.with_tokens(U512::from(100u64)).deposit_collateral(vault);
        p.registry.withdraw_collateral(vault, 300);
        let vault_state = p.registry.get_vault(vault).unwrap();
        assert_eq!(vault_state.usdc_balance, 800);
        assert_eq!(vault_state.defi.deposit_amount, 800);
        assert_eq!(p.registry.get_totals().total_usdc_in_defi, 800);
    }

    #[test]
    fn test_defi_transfer_requires_minimum_collateral() {
        let mut p = setup();
        let vault = p.create_vault(DEFI_MIN_COLLATERAL - 1);
        assert!(!p.registry.is_vault_defi_ready(vault));

        p.env.set_caller(p.partner);
        assert_eq!(
            p.registry.try_transfer_vault_to_defi_protocol(
                vault,
                String::from("Lendr"),
                800,
                9_000,
                p.custodian
            ),
            Err(PointsError::VaultNotDefiReady.into())
        );
    }

    #[test]
    fn test_revenue_requires_matching_deposit() {
        let mut p = setup();
        let vault = p.create_vault(1_000);
        p.env.set_caller(p.partner);
        p.registry
            .transfer_vault_to_defi_protocol(vault, String::from("Lendr"), 800, 9_000, p.custodian);

        p.env.set_caller(p.custodian);
        assert_eq!(
            p.registry.with_tokens(U512::from(10u64)).try_add_revenue_to_vault(vault, 50),
            Err(PointsError::InvalidAmount.into())
        );
        p.registry.with_tokens(U512::from(50u64)).add_revenue_to_vault(vault, 50);

        let vault_state = p.registry.get_vault(vault).unwrap();
        assert_eq!(vault_state.defi.lifetime_yield, 50);
        assert_eq!(vault_state.usdc_balance, 1_050);
        let totals = p.registry.get_totals();
        assert_eq!(totals.total_yield_generated, 50);
        assert_eq!(totals.total_usdc_locked, 1_050);
        assert_eq!(totals.total_usdc_in_defi, 1_050);
        assert_eq!(p.registry_balance(), U512::from(1_050u64));

        p.env.set_caller(p.user);
        assert_eq!(
            p.registry.with_tokens(U512::from(5u64)).try_add_revenue_to_vault(vault, 5),
            Err(PointsError::InvalidCapability.into())
        );
    }

    #[test]
    fn test_close_vault_refunds_and_retires() {
        let mut p = setup();
        let vault = p.create_vault(700);
        p.env.set_caller(p.partner);
        p.registry.close_partner_vault(vault);

        assert_eq!(p.registry.get_vault(vault), None);
        assert_eq!(p.registry.get_partner_cap(vault), None);
        assert_eq!(p.registry_balance(), U512::zero());
        let totals = p.registry.get_totals();
        assert_eq!(totals.total_partners, 0);
        assert_eq!(totals.total_generations, 0);
        assert_eq!(totals.total_usdc_locked, 0);
        assert_eq!(
            p.registry.try_get_vault_collateral_details(vault),
            Err(PointsError::VaultNotFound.into())
        );
    }

    #[test]
    fn test_close_vault_retires_booked_yield() {
        let mut p = setup();
        let vault = p.create_vault(700);
        p.env.set_caller(p.partner);
        p.registry.with_tokens(U512::from(50u64)).add_revenue_to_vault(vault, 50);
        let totals = p.registry.get_totals();
        assert_eq!(totals.total_yield_generated, 50);
        assert_eq!(totals.total_usdc_locked, 750);

        p.registry.close_partner_vault(vault);

        let totals = p.registry.get_totals();
        assert_eq!(totals.total_yield_generated, 0);
        assert_eq!(totals.total_usdc_locked, 0);
        assert_eq!(totals.total_partners, 0);
        assert_eq!(p.registry_balance(), U512::zero());
    }

    #[test]
    fn test_defi_opt_out_blocks_transfer() {
        let mut p = setup();
        let vault = p.create_vault(1_000);

        p.env.set_caller(p.user);
        assert_eq!(
            p.registry.try_set_defi_enabled(vault, false),
            Err(PointsError::InvalidCapability.into())
        );

        p.env.set_caller(p.partner);
        p.registry.set_defi_enabled(vault, false);
        assert!(!p.registry.is_vault_defi_ready(vault));
        assert_eq!(
            p.registry.try_transfer_vault_to_defi_protocol(
                vault,
                String::from("Lendr"),
                800,
                9_000,
                p.custodian
            ),
            Err(PointsError::VaultNotDefiReady.into())
        );

        p.registry.set_defi_enabled(vault, true);
        assert!(p.registry.is_vault_defi_ready(vault));
        p.registry
            .transfer_vault_to_defi_protocol(vault, String::from("Lendr"), 800, 9_000, p.custodian);

        // Frozen once deployed
        assert_eq!(
            p.registry.try_set_defi_enabled(vault, false),
            Err(PointsError::VaultNotDefiReady.into())
        );
        assert!(p.registry.get_vault(vault).unwrap().defi.enabled);
    }

    #[test]
    fn test_vault_pause_blocks_partner_operations() {
        let mut p = setup();
        let vault = p.create_vault(1_000);
        p.env.set_caller(p.operator);
        p.config.pause(PauseDomain::Vault);

        p.env.set_caller(p.partner);
        assert_eq!(
            p.registry.try_withdraw_collateral(vault, 1),
            Err(PointsError::ProtocolPaused.into())
        );
        assert_eq!(
            p.registry
                .with_tokens(U512::from(10u64))
                .try_create_partner_with_vault(String::from("Beta"), String::new(), 2),
            Err(PointsError::ProtocolPaused.into())
        );
    }
}

#[cfg(test)]
mod redemption_tests {
    use crate::fixture::*;
    use odra::casper_types::U512;
    use odra::host::HostRef;
    use points_engine_contracts::errors::PointsError;
    use points_engine_contracts::types::PauseDomain;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_redeem_points_for_assets() {
        let mut p = setup();
        let vault = p.create_vault(1_000);
        p.feed_price(SUI_PRICE);
        p.mint(p.user, 50_000);
        assert_eq!(p.engine.get_redemption_quote(50_000), (50, 25));
        assert_eq!(p.engine.check_redemption_feasible(vault, 50_000), (true, 10_000));

        p.env.set_caller(p.user);
        let result = p.engine.redeem_points_for_assets(vault, 50_000);
        assert_eq!(result.usd_value, 50);
        assert_eq!(result.asset_amount, 25);

        assert_eq!(p.ledger.available_balance_of(p.user), 0);
        assert_eq!(p.ledger.total_burned(), 50_000);
        assert_eq!(p.registry_balance(), U512::from(975u64));
        assert_eq!(p.registry.get_vault(vault).unwrap().usdc_balance, 975);
        assert_eq!(p.registry.get_totals().total_usdc_locked, 975);

        let stats = p.engine.get_stats();
        assert_eq!(stats.total_points_redeemed, 50_000);
        assert_eq!(stats.total_assets_paid, 25);
        assert_eq!(stats.total_redemptions, 1);
        assert!(p.env.emitted(p.engine.address(), "PointsRedeemed"));
    }

    #[test]
    fn test_infeasible_redemption_changes_nothing() {
        let mut p = setup();
        let vault = p.create_vault(10);
        p.feed_price(SUI_PRICE);
        p.mint(p.user, 50_000);
        assert_eq!(p.engine.check_redemption_feasible(vault, 50_000), (false, 10_000));

        p.env.set_caller(p.user);
        assert_eq!(
            p.engine.try_redeem_points_for_assets(vault, 50_000),
            Err(PointsError::Infeasible.into())
        );
        assert_eq!(p.ledger.available_balance_of(p.user), 50_000);
        assert_eq!(p.ledger.total_burned(), 0);
        let details = p.registry.get_vault_collateral_details(vault);
        assert_eq!((details.total, details.reserved), (10, 0));
        assert_eq!(p.registry_balance(), U512::from(10u64));
    }

    #[test]
    fn test_redemption_releases_backing() {
        let mut p = setup();
        let vault = p.create_vault(100);
        p.feed_price(SUI_PRICE);
        p.env.set_caller(p.operator);
        p.ledger.mint_backed(p.user, 60_000, vault, String::from("campaign"));

        p.env.set_caller(p.user);
        p.engine.redeem_points_for_assets(vault, 20_000);

        let details = p.registry.get_vault_collateral_details(vault);
        assert_eq!(details.total, 90);
        assert_eq!(details.reserved, 40);
        assert!(details.reserved <= details.total);
        assert_eq!(p.ledger.available_balance_of(p.user), 40_000);
    }

    #[test]
    fn test_backing_release_floors_at_zero() {
        let mut p = setup();
        let vault = p.create_vault(1_000);
        p.feed_price(SUI_PRICE);
        p.env.set_caller(p.operator);
        p.ledger.mint_backed(p.user, 60_000, vault, String::from("campaign"));
        assert_eq!(p.registry.get_vault_collateral_details(vault).reserved, 60);

        // Unbacked points redeemed against the same vault release more than it holds reserved
        let holder = p.env.get_account(6);
        p.mint(holder, 100_000);
        p.env.set_caller(holder);
        let result = p.engine.redeem_points_for_assets(vault, 100_000);
        assert_eq!(result.asset_amount, 50);

        let details = p.registry.get_vault_collateral_details(vault);
        assert_eq!(details.total, 950);
        assert_eq!(details.reserved, 0);
        assert_eq!(p.ledger.available_balance_of(p.user), 60_000);
    }

    #[test]
    fn test_redemption_from_deployed_vault_debits_defi_totals() {
        let mut p = setup();
        let vault = p.create_vault(1_000);
        p.env.set_caller(p.partner);
        p.registry
            .transfer_vault_to_defi_protocol(vault, String::from("Lendr"), 800, 9_000, p.custodian);
        p.feed_price(SUI_PRICE);
        p.mint(p.user, 50_000);

        p.env.set_caller(p.user);
        p.engine.redeem_points_for_assets(vault, 50_000);

        let vault_state = p.registry.get_vault(vault).unwrap();
        assert_eq!(vault_state.usdc_balance, 975);
        assert_eq!(vault_state.defi.deposit_amount, 975);
        let totals = p.registry.get_totals();
        assert_eq!(totals.total_usdc_in_defi, 975);
        assert_eq!(totals.total_usdc_locked, 975);
        assert_eq!(p.registry_balance(), U512::from(975u64));
    }

    #[test]
    fn test_low_confidence_price_still_quotes() {
        let mut p = setup();
        let vault = p.create_vault(1_000);
        p.env.set_caller(p.feeder);
        let now = p.env.block_time();
        p.oracle.set_price(String::from(PAIR), SUI_PRICE, 0, now);
        assert_eq!(p.oracle.get_price_with_confidence(String::from(PAIR)), (SUI_PRICE, 0));

        assert_eq!(p.engine.get_redemption_quote(50_000), (50, 25));
        p.mint(p.user, 50_000);
        p.env.set_caller(p.user);
        assert_eq!(p.engine.redeem_points_for_assets(vault, 50_000).asset_amount, 25);
    }

    #[test]
    fn test_redemption_input_checks() {
        let mut p = setup();
        let vault = p.create_vault(1_000);
        p.mint(p.user, 50_000);

        p.env.set_caller(p.user);
        assert_eq!(
            p.engine.try_redeem_points_for_assets(vault, 0),
            Err(PointsError::InvalidAmount.into())
        );
        assert_eq!(
            p.engine.try_redeem_points_for_assets(vault, 50_001),
            Err(PointsError::InsufficientBalance.into())
        );
        // No price published yet
        assert_eq!(
            p.engine.try_redeem_points_for_assets(vault, 50_000),
            Err(PointsError::InvalidPriceData.into())
        );
        assert_eq!(p.engine.get_redemption_quote(50_000), (0, 0));

        p.feed_price(SUI_PRICE);
        p.env.set_caller(p.user);
        // Less than one dollar pays nothing
        assert_eq!(
            p.engine.try_redeem_points_for_assets(vault, 999),
            Err(PointsError::InvalidAmount.into())
        );
    }

    #[test]
    fn test_locked_points_cannot_be_redeemed() {
        let mut p = setup();
        let vault = p.create_vault(1_000);
        p.feed_price(SUI_PRICE);
        p.mint(p.user, 50_000);
        p.env.set_caller(p.operator);
        p.ledger.lock(p.user, 10_000, String::from("loan"));

        p.env.set_caller(p.user);
        assert_eq!(
            p.engine.try_redeem_points_for_assets(vault, 50_000),
            Err(PointsError::InsufficientBalance.into())
        );
        p.engine.redeem_points_for_assets(vault, 40_000);
        assert_eq!(p.ledger.locked_balance_of(p.user), 10_000);
    }

    #[test]
    fn test_stale_or_paused_price_blocks_redemption() {
        let mut p = setup();
        let vault = p.create_vault(1_000);
        p.feed_price(SUI_PRICE);
        p.mint(p.user, 50_000);

        p.env.advance_block_time(MAX_STALENESS_MS + 1);
        p.env.set_caller(p.user);
        assert_eq!(
            p.engine.try_redeem_points_for_assets(vault, 50_000),
            Err(PointsError::InvalidPriceData.into())
        );

        p.feed_price(SUI_PRICE);
        p.env.set_caller(p.operator);
        p.oracle.pause();
        p.env.set_caller(p.user);
        assert_eq!(
            p.engine.try_redeem_points_for_assets(vault, 50_000),
            Err(PointsError::InvalidPriceData.into())
        );
    }

    #[test]
    fn test_pause_domains() {
        let mut p = setup();
        let vault = p.create_vault(1_000);
        p.feed_price(SUI_PRICE);
        p.mint(p.user, 50_000);

        p.env.set_caller(p.operator);
        p.config.pause(PauseDomain::Redemption);
        p.env.set_caller(p.user);
        assert_eq!(
            p.engine.try_redeem_points_for_assets(vault, 50_000),
            Err(PointsError::RedemptionPaused.into())
        );
        // Minting is a separate domain
        p.mint(p.user, 1_000);

        p.env.set_caller(p.operator);
        p.config.unpause(PauseDomain::Redemption);
        p.config.pause(PauseDomain::Global);
        assert!(p.config.is_paused(PauseDomain::Mint));
        assert_eq!(
            p.ledger.try_mint(
                p.user,
                1_000,
                points_engine_contracts::types::PointType::StakingReward,
                String::from("stake")
            ),
            Err(PointsError::ProtocolPaused.into())
        );
        p.env.set_caller(p.user);
        assert_eq!(
            p.engine.try_redeem_points_for_assets(vault, 50_000),
            Err(PointsError::RedemptionPaused.into())
        );

        p.env.set_caller(p.operator);
        p.config.unpause(PauseDomain::Global);
        p.env.set_caller(p.user);
        p.engine.redeem_points_for_assets(vault, 50_000);
        assert_eq!(p.ledger.available_balance_of(p.user), 1_000);
    }

    #[test]
    fn test_collateral_pair_is_admin_only() {
        let mut p = setup();
        p.env.set_caller(p.user);
        assert_eq!(
            p.engine.try_set_collateral_pair(String::from("ETH/USD")),
            Err(PointsError::UnauthorizedProtocol.into())
        );
        p.env.set_caller(p.admin);
        p.engine.set_collateral_pair(String::from("ETH/USD"));
        assert_eq!(p.engine.get_collateral_pair(), String::from("ETH/USD"));
    }
}
