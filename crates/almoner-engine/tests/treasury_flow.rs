// crates/almoner-engine/tests/treasury_flow.rs
//
// End-to-end treasury scenarios: owner-only administration, fee split on
// deposits, eco-fund withdrawal, conversion guards and swaps through the
// in-memory router, the one-shot governance binding, and reward sweeps.

use almoner_core::error::{AlmonerError, ErrorKind, Role};
use almoner_core::identity::{Address, AssetId};
use almoner_core::memory::{InMemoryLedger, InMemoryRouter};
use almoner_core::traits::CredentialLedger;
use almoner_core::Amount;
use almoner_economics::token::tokens;
use almoner_engine::{Almoner, AlmonerConfig, AlmonerEvent, Deployment, Parameter};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

type Engine = Almoner<InMemoryLedger, InMemoryRouter>;

fn boost() -> AssetId {
    AssetId::labelled("boost")
}

fn ycrv() -> AssetId {
    AssetId::labelled("ycrv")
}

fn weth() -> AssetId {
    AssetId::labelled("weth")
}

fn owner() -> Address {
    Address::labelled("owner")
}

fn gov() -> Address {
    Address::labelled("gov")
}

fn treasury() -> Address {
    Address::labelled("treasury")
}

fn router_address() -> Address {
    Address::labelled("router")
}

fn alice() -> Address {
    Address::labelled("alice")
}

/// Engine over a ledger with weth/ycrv and weth/boost pools, and alice
/// holding every asset with the treasury approved.
fn engine() -> Engine {
    let mut ledger = InMemoryLedger::new();
    let lp = Address::labelled("lp");
    for asset in [boost(), ycrv(), weth()] {
        ledger.mint(&asset, &lp, tokens(100_000)).unwrap();
        ledger.mint(&asset, &alice(), tokens(10_000)).unwrap();
        ledger.approve(&asset, &alice(), &treasury(), Amount::MAX).unwrap();
    }

    let mut router = InMemoryRouter::new(router_address());
    router
        .add_liquidity(&mut ledger, &lp, &boost(), tokens(10_000), &weth(), tokens(100))
        .unwrap();
    router
        .add_liquidity(&mut ledger, &lp, &ycrv(), tokens(10_000), &weth(), tokens(100))
        .unwrap();

    let deployment = Deployment {
        owner: owner(),
        governance: gov(),
        treasury: treasury(),
        eco_fund: owner(),
        stake_asset: boost(),
        settlement_asset: ycrv(),
    };
    Almoner::new(&AlmonerConfig::default(), deployment, ledger, router).unwrap()
}

fn held(almoner: &Engine, asset: &AssetId) -> Amount {
    almoner.ledger().balance_of(asset, &treasury())
}

fn assert_books_balance(almoner: &Engine) {
    for asset in [boost(), ycrv(), weth()] {
        let account = almoner.treasury_account(&asset);
        assert_eq!(
            account.eco_fund_balance + account.operating_balance,
            held(almoner, &asset),
            "treasury books drifted for {}",
            asset
        );
    }
}

// ---------------------------------------------------------------------------
// Administration
// ---------------------------------------------------------------------------

#[test]
fn test_initial_wiring() {
    let almoner = engine();
    let t = almoner.treasury();
    assert_eq!(t.settlement_asset(), &ycrv());
    assert_eq!(t.reward_asset(), &boost());
    assert_eq!(t.swap_router(), &router_address());
    assert_eq!(t.eco_fund(), &owner());
    assert_eq!(t.gov(), None);
    assert_eq!(t.fund_percentage(), 500);
    assert_eq!(t.burn_percentage(), 0);
}

#[test]
fn test_unauthorized_setters_fail() {
    let mut almoner = engine();
    let owner_only = |r: Result<(), AlmonerError>| {
        matches!(r, Err(AlmonerError::Unauthorized { role: Role::Owner }))
    };
    assert!(owner_only(almoner.set_swap_router(&alice(), alice())));
    assert!(owner_only(almoner.set_eco_fund(&alice(), alice())));
    assert!(matches!(
        almoner.set_gov(&alice(), gov()),
        Err(AlmonerError::GovernanceBindingRefused)
    ));
    assert!(owner_only(almoner.set_fund_percentage(&alice(), 1)));
    assert!(owner_only(almoner.set_burn_percentage(&alice(), 1)));
    assert!(matches!(
        almoner.treasury_withdraw(&alice(), 5, &alice()),
        Err(AlmonerError::Unauthorized { role: Role::Governance })
    ));
    assert!(almoner.drain_events().is_empty());
}

#[test]
fn test_owner_sets_router_and_eco_fund() {
    let mut almoner = engine();
    almoner.set_swap_router(&owner(), alice()).unwrap();
    assert_eq!(almoner.treasury().swap_router(), &alice());
    almoner.set_swap_router(&owner(), router_address()).unwrap();
    assert_eq!(almoner.treasury().swap_router(), &router_address());

    almoner.set_eco_fund(&owner(), alice()).unwrap();
    assert_eq!(almoner.treasury().eco_fund(), &alice());
    almoner.set_eco_fund(&owner(), owner()).unwrap();
    assert_eq!(almoner.treasury().eco_fund(), &owner());

    let events = almoner.drain_events();
    assert_eq!(events.len(), 4);
    assert_eq!(
        events[0],
        AlmonerEvent::ParameterChanged {
            parameter: Parameter::SwapRouter(alice())
        }
    );
}

#[test]
fn test_percentage_setters_and_caps() {
    let mut almoner = engine();
    almoner.set_fund_percentage(&owner(), 250).unwrap();
    assert_eq!(almoner.treasury().fund_percentage(), 250);
    let err = almoner.set_fund_percentage(&owner(), 1501).unwrap_err();
    assert!(err.to_string().starts_with("exceed max percent"));
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(almoner.treasury().fund_percentage(), 250);

    almoner.set_burn_percentage(&owner(), 1234).unwrap();
    assert_eq!(almoner.treasury().burn_percentage(), 1234);
    assert!(matches!(
        almoner.set_burn_percentage(&owner(), 10_001),
        Err(AlmonerError::ExceedsMaxPercent { value: 10_001, max: 10_000 })
    ));
}

#[test]
fn test_gov_binds_only_once() {
    let mut almoner = engine();
    almoner.set_gov(&owner(), gov()).unwrap();
    assert_eq!(almoner.treasury().gov(), Some(&gov()));
    let err = almoner.set_gov(&owner(), alice()).unwrap_err();
    assert!(matches!(err, AlmonerError::GovernanceAlreadyBound));
    assert!(err.to_string().starts_with("not authorized"));
    assert_eq!(almoner.treasury().gov(), Some(&gov()));
}

// ---------------------------------------------------------------------------
// Inflows and outflows
// ---------------------------------------------------------------------------

#[test]
fn test_deposits_split_into_eco_fund() {
    let mut almoner = engine();
    almoner.deposit(&alice(), &weth(), 1000).unwrap();
    let eco_1 = almoner.eco_fund_balance(&weth());
    let operating_1 = almoner.treasury_balance_of(&weth());
    assert!(eco_1 > 0);
    assert_eq!(eco_1 + operating_1, held(&almoner, &weth()));

    almoner.deposit(&alice(), &weth(), 1000).unwrap();
    let eco_2 = almoner.eco_fund_balance(&weth());
    let operating_2 = almoner.treasury_balance_of(&weth());
    assert!(eco_2 > eco_1);
    assert!(operating_2 > operating_1);
    assert_eq!(eco_2 + operating_2, held(&almoner, &weth()));
    assert_eq!(held(&almoner, &weth()), 2000);
}

#[test]
fn test_deposit_without_allowance_changes_nothing() {
    let mut almoner = engine();
    let stranger = Address::labelled("stranger");
    almoner.ledger_mut().mint(&weth(), &stranger, 1000).unwrap();
    let err = almoner.deposit(&stranger, &weth(), 1000).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::External);
    assert_eq!(almoner.treasury_account(&weth()).custodied(), 0);
    assert_books_balance(&almoner);
}

#[test]
fn test_withdraw_eco_fund() {
    let mut almoner = engine();
    almoner.deposit(&alice(), &weth(), 2000).unwrap();
    let eco = almoner.eco_fund_balance(&weth());
    let before = almoner.ledger().balance_of(&weth(), &owner());

    assert!(almoner.withdraw_eco_fund(&alice(), &weth(), eco).is_err());
    almoner.withdraw_eco_fund(&owner(), &weth(), eco).unwrap();
    assert!(almoner.ledger().balance_of(&weth(), &owner()) > before);
    assert_eq!(almoner.eco_fund_balance(&weth()), 0);
    assert_books_balance(&almoner);
}

#[test]
fn test_withdraw_above_operating_balance_fails() {
    let mut almoner = engine();
    almoner.set_gov(&owner(), owner()).unwrap();
    almoner.deposit(&alice(), &ycrv(), 1000).unwrap();
    let err = almoner.treasury_withdraw(&owner(), 10_000, &alice()).unwrap_err();
    assert!(err.to_string().starts_with("insufficient funds"));

    let before = almoner.ledger().balance_of(&ycrv(), &alice());
    almoner.treasury_withdraw(&owner(), 950, &alice()).unwrap();
    assert_eq!(almoner.ledger().balance_of(&ycrv(), &alice()), before + 950);
    assert_eq!(almoner.treasury_balance_of(&ycrv()), 0);
    assert_books_balance(&almoner);
}

#[test]
fn test_reward_voters_moves_boost_to_governance() {
    let mut almoner = engine();
    almoner.deposit(&alice(), &boost(), 10_000).unwrap();
    let swept = almoner.reward_voters(1_000).unwrap();
    assert_eq!(swept, 9_500);
    assert_eq!(almoner.ledger().balance_of(&boost(), &gov()), 9_500);
    assert_eq!(almoner.treasury_balance_of(&boost()), 0);
    assert_eq!(almoner.eco_fund_balance(&boost()), 500);
    assert!(matches!(
        almoner.drain_events().last(),
        Some(AlmonerEvent::RewardAdded { amount: 9_500, .. })
    ));
    assert_books_balance(&almoner);
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

#[test]
fn test_conversion_rejects_canonical_sources() {
    let mut almoner = engine();
    almoner.deposit(&alice(), &weth(), 1000).unwrap();

    let err = almoner
        .convert_to_default_token(&owner(), &[boost(), weth()], 1000)
        .unwrap_err();
    assert_eq!(err.to_string(), "src can't be boost");
    assert!(matches!(
        almoner.convert_to_boost_token(&owner(), &[boost(), weth()], 1000),
        Err(AlmonerError::SourceIsRewardAsset)
    ));

    let err = almoner
        .convert_to_default_token(&owner(), &[ycrv(), weth()], 1000)
        .unwrap_err();
    assert_eq!(err.to_string(), "src can't be defaultToken");
    assert!(matches!(
        almoner.convert_to_boost_token(&owner(), &[ycrv(), weth()], 1000),
        Err(AlmonerError::SourceIsSettlementAsset)
    ));
}

#[test]
fn test_conversion_rejects_wrong_destination() {
    let mut almoner = engine();
    almoner.deposit(&alice(), &weth(), 1000).unwrap();
    assert!(matches!(
        almoner.convert_to_default_token(&owner(), &[weth(), boost()], 10),
        Err(AlmonerError::DestinationMismatch { .. })
    ));
    assert!(matches!(
        almoner.convert_to_boost_token(&owner(), &[weth(), ycrv()], 10),
        Err(AlmonerError::DestinationMismatch { .. })
    ));
}

#[test]
fn test_conversion_rejects_insufficient_funds() {
    let mut almoner = engine();
    almoner.deposit(&alice(), &weth(), 1000).unwrap();
    let err = almoner
        .convert_to_default_token(&owner(), &[weth(), ycrv()], 9_999_999)
        .unwrap_err();
    assert!(err.to_string().starts_with("insufficient funds"));
    assert!(matches!(
        almoner.convert_to_boost_token(&owner(), &[weth(), boost()], 9_999_999),
        Err(AlmonerError::InsufficientFunds { .. })
    ));
}

#[test]
fn test_conversion_is_owner_only() {
    let mut almoner = engine();
    almoner.deposit(&alice(), &weth(), 1000).unwrap();
    assert!(matches!(
        almoner.convert_to_default_token(&alice(), &[weth(), ycrv()], 10),
        Err(AlmonerError::Unauthorized { role: Role::Owner })
    ));
}

#[test]
fn test_valid_conversions() {
    let mut almoner = engine();
    almoner.deposit(&alice(), &weth(), 1000).unwrap();
    let weth_held = held(&almoner, &weth());
    let ycrv_held = held(&almoner, &ycrv());
    let boost_held = held(&almoner, &boost());

    let to_default = almoner
        .convert_to_default_token(&owner(), &[weth(), ycrv()], 10)
        .unwrap();
    assert!(to_default.amount_out > 0);
    assert_eq!(held(&almoner, &weth()), weth_held - 10);

    let to_boost = almoner
        .convert_to_boost_token(&owner(), &[weth(), boost()], 10)
        .unwrap();
    assert!(to_boost.amount_out > 0);
    assert_eq!(held(&almoner, &weth()), weth_held - 20);
    assert_eq!(held(&almoner, &ycrv()), ycrv_held + to_default.amount_out);
    assert_eq!(held(&almoner, &boost()), boost_held + to_boost.amount_out);
    assert_eq!(almoner.treasury_balance_of(&ycrv()), to_default.amount_out);
    assert_books_balance(&almoner);
}

#[test]
fn test_conversion_through_unconfigured_router_fails() {
    let mut almoner = engine();
    almoner.deposit(&alice(), &weth(), 1000).unwrap();
    almoner.set_swap_router(&owner(), alice()).unwrap();
    let operating = almoner.treasury_balance_of(&weth());
    let err = almoner
        .convert_to_default_token(&owner(), &[weth(), ycrv()], 10)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::External);
    assert_eq!(almoner.treasury_balance_of(&weth()), operating);
    assert_books_balance(&almoner);
}
