//! Market Data Subsystem (C9, §4.9). Last-price tracking, the
//! unrealized-P&L formula, and the significant-change publish gate.

use parking_lot::RwLock;
use riskguard_integration::collection::FnvIndexMap;
use riskguard_risk::context::MarketDataQuery;
use riskguard_sdk::{ContractId, Money, Side, SymbolRoot, TickInfo};
use rust_decimal::Decimal;

/// Minimum absolute change in unrealized P&L required before
/// `UNREALIZED_PNL_UPDATE` is published, to avoid rule-evaluation thrash
/// at quote rates of many Hz (§4.9, confirmed by `original_source/`).
const SIGNIFICANT_CHANGE_THRESHOLD: Decimal = Decimal::from_parts(1000, 0, 0, false, 2);

#[derive(Default)]
struct Inner {
    last_price: FnvIndexMap<SymbolRoot, Money>,
    last_emitted_pnl: FnvIndexMap<ContractId, Money>,
}

#[derive(Default)]
pub struct MarketDataSubsystem {
    inner: RwLock<Inner>,
}

impl std::fmt::Debug for MarketDataSubsystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketDataSubsystem").finish_non_exhaustive()
    }
}

/// Outcome of feeding one quote through [`MarketDataSubsystem::update_from_quote`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteOutcome {
    /// Neither `last_price` nor a usable bid/ask midpoint - ignored.
    Unusable,
    Updated { last_price: Money },
}

impl MarketDataSubsystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// "use `last_price` if present and > 0, else bid/ask midpoint, else
    /// ignore" (§4.9, sharpened by `original_source/`'s priority-ordering
    /// over the distilled spec's plain midpoint fallback).
    pub fn update_from_quote(
        &self,
        symbol: &SymbolRoot,
        last_price: Option<Decimal>,
        bid: Option<Decimal>,
        ask: Option<Decimal>,
    ) -> QuoteOutcome {
        let resolved = match last_price.filter(|p| *p > Decimal::ZERO) {
            Some(price) => Some(price),
            None => match (bid, ask) {
                (Some(b), Some(a)) if b > Decimal::ZERO && a > Decimal::ZERO => Some((b + a) / Decimal::from(2)),
                _ => None,
            },
        };

        match resolved {
            Some(price) => {
                self.inner.write().last_price.insert(symbol.clone(), price);
                QuoteOutcome::Updated { last_price: price }
            }
            None => QuoteOutcome::Unusable,
        }
    }

    pub fn last_price_for(&self, symbol: &SymbolRoot) -> Option<Money> {
        self.inner.read().last_price.get(symbol).copied()
    }

    /// The unrealized-P&L formula from §4.9.
    pub fn unrealized_pnl(side: Side, quantity: u32, entry_price: Decimal, current_price: Decimal, tick: TickInfo) -> Decimal {
        if tick.tick_size.is_zero() {
            return Decimal::ZERO;
        }
        let ticks = (current_price - entry_price) / tick.tick_size;
        Decimal::from(side.sign()) * ticks * Decimal::from(quantity) * tick.tick_value
    }

    /// Gates `UNREALIZED_PNL_UPDATE` publication on a significant-enough
    /// change since the last emission for this contract (§4.9). Always
    /// records the new value so the next comparison is against it.
    pub fn should_publish_pnl_update(&self, contract_id: &ContractId, new_pnl: Decimal) -> bool {
        let mut inner = self.inner.write();
        let significant = match inner.last_emitted_pnl.get(contract_id) {
            Some(last) => (new_pnl - last).abs() > SIGNIFICANT_CHANGE_THRESHOLD,
            None => true,
        };
        if significant {
            inner.last_emitted_pnl.insert(contract_id.clone(), new_pnl);
        }
        significant
    }
}

impl MarketDataQuery for MarketDataSubsystem {
    fn last_price(&self, symbol: &SymbolRoot) -> Option<Money> {
        self.last_price_for(symbol)
    }
}
