// crates/almoner-core/src/memory.rs
//
// In-memory collaborators: a fungible-credential ledger and a
// constant-product swap router. They back the test suites and any host
// that embeds the engine without an external chain.

use std::collections::HashMap;

use crate::error::AlmonerError;
use crate::identity::{Address, AssetId};
use crate::math::mul_div;
use crate::traits::{CredentialLedger, SwapRouter};
use crate::Amount;

/// Balances and allowances for any number of assets.
///
/// An allowance of `Amount::MAX` is treated as unlimited and never consumed.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    balances: HashMap<(AssetId, Address), Amount>,
    allowances: HashMap<(AssetId, Address, Address), Amount>,
    supply: HashMap<AssetId, Amount>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `amount` new units of `asset` in `to`'s balance.
    pub fn mint(&mut self, asset: &AssetId, to: &Address, amount: Amount) -> Result<(), AlmonerError> {
        let supply = self.supply.entry(*asset).or_insert(0);
        *supply = supply
            .checked_add(amount)
            .ok_or(AlmonerError::Overflow("ledger supply"))?;
        let balance = self.balances.entry((*asset, *to)).or_insert(0);
        *balance += amount;
        Ok(())
    }

    /// Total units of `asset` ever minted.
    pub fn total_supply(&self, asset: &AssetId) -> Amount {
        self.supply.get(asset).copied().unwrap_or(0)
    }

    fn debit(&mut self, asset: &AssetId, from: &Address, amount: Amount) -> Result<(), AlmonerError> {
        let available = self.balance_of(asset, from);
        if available < amount {
            return Err(AlmonerError::Collaborator(format!(
                "transfer amount exceeds balance: {} has {} of {}, needs {}",
                from, available, asset, amount
            )));
        }
        self.balances.insert((*asset, *from), available - amount);
        Ok(())
    }

    fn credit(&mut self, asset: &AssetId, to: &Address, amount: Amount) {
        // Cannot overflow: every unit was minted under the checked supply.
        *self.balances.entry((*asset, *to)).or_insert(0) += amount;
    }
}

impl CredentialLedger for InMemoryLedger {
    fn balance_of(&self, asset: &AssetId, holder: &Address) -> Amount {
        self.balances.get(&(*asset, *holder)).copied().unwrap_or(0)
    }

    fn allowance(&self, asset: &AssetId, owner: &Address, spender: &Address) -> Amount {
        self.allowances
            .get(&(*asset, *owner, *spender))
            .copied()
            .unwrap_or(0)
    }

    fn approve(
        &mut self,
        asset: &AssetId,
        owner: &Address,
        spender: &Address,
        amount: Amount,
    ) -> Result<(), AlmonerError> {
        self.allowances.insert((*asset, *owner, *spender), amount);
        Ok(())
    }

    fn transfer(
        &mut self,
        asset: &AssetId,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), AlmonerError> {
        self.debit(asset, from, amount)?;
        self.credit(asset, to, amount);
        Ok(())
    }

    fn transfer_from(
        &mut self,
        asset: &AssetId,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), AlmonerError> {
        let allowed = self.allowance(asset, from, spender);
        if allowed < amount {
            return Err(AlmonerError::Collaborator(format!(
                "transfer amount exceeds allowance: {} may move {} of {} from {}, needs {}",
                spender, allowed, asset, from, amount
            )));
        }
        self.debit(asset, from, amount)?;
        self.credit(asset, to, amount);
        if allowed != Amount::MAX {
            self.allowances
                .insert((*asset, *from, *spender), allowed - amount);
        }
        Ok(())
    }
}

/// Fee charged by every pool hop, in parts per thousand (0.3%).
pub const POOL_FEE_PER_MILLE: u128 = 3;

/// Constant-product router over pairwise pools.
///
/// Reserves are held in the router's own ledger balance; a multi-hop swap
/// keeps intermediate assets inside the router.
#[derive(Debug, Clone)]
pub struct InMemoryRouter {
    address: Address,
    /// Keyed by the ordered asset pair; reserves stored in key order.
    pools: HashMap<(AssetId, AssetId), (Amount, Amount)>,
}

impl InMemoryRouter {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            pools: HashMap::new(),
        }
    }

    fn key(a: &AssetId, b: &AssetId) -> (AssetId, AssetId) {
        if a <= b {
            (*a, *b)
        } else {
            (*b, *a)
        }
    }

    /// Reserves of the `a`/`b` pool, ordered as `(reserve_a, reserve_b)`.
    pub fn reserves(&self, a: &AssetId, b: &AssetId) -> Option<(Amount, Amount)> {
        let key = Self::key(a, b);
        self.pools.get(&key).map(|&(r0, r1)| if key.0 == *a { (r0, r1) } else { (r1, r0) })
    }

    fn set_reserves(&mut self, a: &AssetId, b: &AssetId, ra: Amount, rb: Amount) {
        let key = Self::key(a, b);
        let value = if key.0 == *a { (ra, rb) } else { (rb, ra) };
        self.pools.insert(key, value);
    }

    /// Seed (or top up) the `a`/`b` pool with liquidity from `provider`.
    pub fn add_liquidity<L: CredentialLedger>(
        &mut self,
        ledger: &mut L,
        provider: &Address,
        a: &AssetId,
        amount_a: Amount,
        b: &AssetId,
        amount_b: Amount,
    ) -> Result<(), AlmonerError> {
        if a == b {
            return Err(AlmonerError::Collaborator("pool needs two distinct assets".to_string()));
        }
        let (ra, rb) = self.reserves(a, b).unwrap_or((0, 0));
        let new_a = ra.checked_add(amount_a).ok_or(AlmonerError::Overflow("pool reserves"))?;
        let new_b = rb.checked_add(amount_b).ok_or(AlmonerError::Overflow("pool reserves"))?;
        ledger.transfer(a, provider, &self.address, amount_a)?;
        if let Err(e) = ledger.transfer(b, provider, &self.address, amount_b) {
            // Hand the first leg back so the call stays all-or-nothing.
            ledger.transfer(a, &self.address, provider, amount_a)?;
            return Err(e);
        }
        self.set_reserves(a, b, new_a, new_b);
        Ok(())
    }

    /// Output of a single hop under the constant-product rule with fee.
    fn hop_output(amount_in: Amount, reserve_in: Amount, reserve_out: Amount) -> Result<Amount, AlmonerError> {
        let in_with_fee = amount_in
            .checked_mul(1000 - POOL_FEE_PER_MILLE)
            .ok_or(AlmonerError::Overflow("swap input"))?;
        let denominator = reserve_in
            .checked_mul(1000)
            .and_then(|r| r.checked_add(in_with_fee))
            .ok_or(AlmonerError::Overflow("swap reserves"))?;
        mul_div(in_with_fee, reserve_out, denominator, "swap output")
    }

    /// Amounts produced at every step of `path` for `amount_in`, without
    /// touching the pools.
    pub fn quote(&self, path: &[AssetId], amount_in: Amount) -> Result<Vec<Amount>, AlmonerError> {
        if path.len() < 2 {
            return Err(AlmonerError::InvalidPath { len: path.len() });
        }
        let mut amounts = Vec::with_capacity(path.len());
        amounts.push(amount_in);
        for hop in path.windows(2) {
            let (reserve_in, reserve_out) = self.reserves(&hop[0], &hop[1]).ok_or_else(|| {
                AlmonerError::Collaborator(format!("no pool for {} -> {}", hop[0], hop[1]))
            })?;
            let current = *amounts.last().unwrap_or(&0);
            amounts.push(Self::hop_output(current, reserve_in, reserve_out)?);
        }
        Ok(amounts)
    }
}

impl SwapRouter for InMemoryRouter {
    fn address(&self) -> Address {
        self.address
    }

    fn swap_exact_input<L: CredentialLedger>(
        &mut self,
        ledger: &mut L,
        payer: &Address,
        path: &[AssetId],
        amount_in: Amount,
        recipient: &Address,
    ) -> Result<Amount, AlmonerError> {
        let amounts = self.quote(path, amount_in)?;
        let amount_out = amounts[amounts.len() - 1];
        if amount_out == 0 {
            return Err(AlmonerError::Collaborator("insufficient output amount".to_string()));
        }

        let router = self.address;
        ledger.transfer_from(&path[0], &router, payer, &router, amount_in)?;
        if let Err(e) = ledger.transfer(&path[path.len() - 1], &router, recipient, amount_out) {
            ledger.transfer(&path[0], &router, payer, amount_in)?;
            return Err(e);
        }

        for (i, hop) in path.windows(2).enumerate() {
            let (reserve_in, reserve_out) = self.reserves(&hop[0], &hop[1]).unwrap_or((0, 0));
            self.set_reserves(
                &hop[0],
                &hop[1],
                reserve_in + amounts[i],
                reserve_out - amounts[i + 1],
            );
        }

        tracing::debug!(
            hops = path.len() - 1,
            amount_in = %amount_in,
            amount_out = %amount_out,
            "In-memory router swap executed"
        );
        Ok(amount_out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(label: &str) -> AssetId {
        AssetId::labelled(label)
    }

    fn who(label: &str) -> Address {
        Address::labelled(label)
    }

    #[test]
    fn test_transfer_moves_balance() {
        let mut ledger = InMemoryLedger::new();
        ledger.mint(&asset("boost"), &who("alice"), 100).unwrap();
        ledger
            .transfer(&asset("boost"), &who("alice"), &who("bob"), 40)
            .unwrap();
        assert_eq!(ledger.balance_of(&asset("boost"), &who("alice")), 60);
        assert_eq!(ledger.balance_of(&asset("boost"), &who("bob")), 40);
        assert_eq!(ledger.total_supply(&asset("boost")), 100);
    }

    #[test]
    fn test_transfer_exceeding_balance_changes_nothing() {
        let mut ledger = InMemoryLedger::new();
        ledger.mint(&asset("boost"), &who("alice"), 10).unwrap();
        assert!(ledger
            .transfer(&asset("boost"), &who("alice"), &who("bob"), 11)
            .is_err());
        assert_eq!(ledger.balance_of(&asset("boost"), &who("alice")), 10);
        assert_eq!(ledger.balance_of(&asset("boost"), &who("bob")), 0);
    }

    #[test]
    fn test_transfer_from_consumes_allowance() {
        let mut ledger = InMemoryLedger::new();
        let boost = asset("boost");
        ledger.mint(&boost, &who("alice"), 100).unwrap();
        ledger.approve(&boost, &who("alice"), &who("gov"), 30).unwrap();

        ledger
            .transfer_from(&boost, &who("gov"), &who("alice"), &who("gov"), 20)
            .unwrap();
        assert_eq!(ledger.allowance(&boost, &who("alice"), &who("gov")), 10);
        assert!(ledger
            .transfer_from(&boost, &who("gov"), &who("alice"), &who("gov"), 20)
            .is_err());
    }

    #[test]
    fn test_unlimited_allowance_is_not_consumed() {
        let mut ledger = InMemoryLedger::new();
        let boost = asset("boost");
        ledger.mint(&boost, &who("alice"), 100).unwrap();
        ledger
            .approve(&boost, &who("alice"), &who("gov"), Amount::MAX)
            .unwrap();
        ledger
            .transfer_from(&boost, &who("gov"), &who("alice"), &who("gov"), 100)
            .unwrap();
        assert_eq!(ledger.allowance(&boost, &who("alice"), &who("gov")), Amount::MAX);
    }

    fn seeded_router() -> (InMemoryLedger, InMemoryRouter) {
        let mut ledger = InMemoryLedger::new();
        let mut router = InMemoryRouter::new(who("router"));
        let lp = who("lp");
        for (label, amount) in [("weth", 1_000_000), ("ycrv", 2_000_000), ("boost", 2_000_000)] {
            ledger.mint(&asset(label), &lp, amount).unwrap();
        }
        router
            .add_liquidity(&mut ledger, &lp, &asset("weth"), 500_000, &asset("ycrv"), 1_000_000)
            .unwrap();
        router
            .add_liquidity(&mut ledger, &lp, &asset("weth"), 500_000, &asset("boost"), 1_000_000)
            .unwrap();
        (ledger, router)
    }

    #[test]
    fn test_reserves_are_reported_in_caller_order() {
        let (_, router) = seeded_router();
        assert_eq!(
            router.reserves(&asset("weth"), &asset("ycrv")),
            Some((500_000, 1_000_000))
        );
        assert_eq!(
            router.reserves(&asset("ycrv"), &asset("weth")),
            Some((1_000_000, 500_000))
        );
    }

    #[test]
    fn test_single_hop_swap_delivers_quoted_output() {
        let (mut ledger, mut router) = seeded_router();
        let treasury = who("treasury");
        let weth = asset("weth");
        let ycrv = asset("ycrv");
        ledger.mint(&weth, &treasury, 1_000).unwrap();
        ledger.approve(&weth, &treasury, &router.address(), 1_000).unwrap();

        let path = [weth, ycrv];
        let quoted = router.quote(&path, 1_000).unwrap()[1];
        let out = router
            .swap_exact_input(&mut ledger, &treasury, &path, 1_000, &treasury)
            .unwrap();

        assert_eq!(out, quoted);
        assert!(out > 0 && out < 2_000);
        assert_eq!(ledger.balance_of(&ycrv, &treasury), out);
        assert_eq!(ledger.balance_of(&weth, &treasury), 0);
        assert_eq!(router.reserves(&weth, &ycrv), Some((501_000, 1_000_000 - out)));
    }

    #[test]
    fn test_multi_hop_swap_routes_through_intermediate() {
        let (mut ledger, mut router) = seeded_router();
        let treasury = who("treasury");
        ledger.mint(&asset("ycrv"), &treasury, 10_000).unwrap();
        ledger
            .approve(&asset("ycrv"), &treasury, &router.address(), Amount::MAX)
            .unwrap();

        let path = [asset("ycrv"), asset("weth"), asset("boost")];
        let out = router
            .swap_exact_input(&mut ledger, &treasury, &path, 10_000, &treasury)
            .unwrap();
        assert!(out > 0);
        assert_eq!(ledger.balance_of(&asset("boost"), &treasury), out);
    }

    #[test]
    fn test_swap_without_pool_fails_and_keeps_balances() {
        let (mut ledger, mut router) = seeded_router();
        let treasury = who("treasury");
        ledger.mint(&asset("dai"), &treasury, 100).unwrap();
        ledger
            .approve(&asset("dai"), &treasury, &router.address(), 100)
            .unwrap();
        let path = [asset("dai"), asset("ycrv")];
        assert!(router
            .swap_exact_input(&mut ledger, &treasury, &path, 100, &treasury)
            .is_err());
        assert_eq!(ledger.balance_of(&asset("dai"), &treasury), 100);
    }

    #[test]
    fn test_swap_without_allowance_fails() {
        let (mut ledger, mut router) = seeded_router();
        let treasury = who("treasury");
        ledger.mint(&asset("weth"), &treasury, 100).unwrap();
        let path = [asset("weth"), asset("ycrv")];
        assert!(router
            .swap_exact_input(&mut ledger, &treasury, &path, 100, &treasury)
            .is_err());
    }
}
