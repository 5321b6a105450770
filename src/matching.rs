use crate::orders::Order;
use rust_decimal::Decimal;
use serde::Serialize;
use std::cmp::Reverse;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// Why a probed buy/sell pair did not produce a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NoMatchReason {
    #[error("instrument symbols differ")]
    SymbolMismatch,
    #[error("buy price below sell price")]
    PricesDoNotCross,
    #[error("no resolvable price")]
    UnresolvablePrice,
}

impl Serialize for NoMatchReason {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A candidate pairing of one buy and one sell order.
///
/// Candidates are transient: a matching pass proposes them and an operator
/// confirms (or discards) each one. Nothing here is an executed trade.
/// When `matched` is false, `reason` says why and price/quantity are absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub matched: bool,
    pub buy_order_id: Uuid,
    pub sell_order_id: Uuid,
    pub symbol: String,
    /// Execution price: arithmetic midpoint of the two resolved prices.
    pub price: Option<Decimal>,
    /// Execution quantity: the smaller of the two order quantities.
    pub quantity: Option<u64>,
    pub reason: Option<NoMatchReason>,
}

fn no_match(buy: &Order, sell: &Order, reason: NoMatchReason) -> MatchResult {
    MatchResult {
        matched: false,
        buy_order_id: buy.id,
        sell_order_id: sell.id,
        symbol: buy.symbol.clone(),
        price: None,
        quantity: None,
        reason: Some(reason),
    }
}

/// Probes a single buy/sell pair.
///
/// A candidate is emitted when both orders resolve a price, their symbols are
/// identical, and the buy price is at or above the sell price. The execution
/// price is the midpoint; the quantity is `min` of the two, since the
/// smaller order caps what can actually change hands.
pub fn try_match(buy: &Order, sell: &Order) -> MatchResult {
    let (Some(buy_price), Some(sell_price)) = (buy.resolved_price(), sell.resolved_price())
    else {
        return no_match(buy, sell, NoMatchReason::UnresolvablePrice);
    };
    if buy.symbol != sell.symbol {
        return no_match(buy, sell, NoMatchReason::SymbolMismatch);
    }
    if buy_price < sell_price {
        return no_match(buy, sell, NoMatchReason::PricesDoNotCross);
    }
    MatchResult {
        matched: true,
        buy_order_id: buy.id,
        sell_order_id: sell.id,
        symbol: buy.symbol.clone(),
        price: Some((buy_price + sell_price) / Decimal::TWO),
        quantity: Some(buy.quantity.min(sell.quantity)),
        reason: None,
    }
}

/// Runs a matching pass over snapshots of buy and sell orders.
///
/// Price-time priority on both sides: buys by descending resolved price,
/// sells by ascending, earlier `created_at` breaking ties. Every buy is then
/// probed against every sell in priority order: a **full cross product**,
/// with no quantity consumption between pairs.
///
/// The same order can therefore appear in several candidates. That is
/// deliberate: the pass proposes, the operator disposes. Confirming one
/// candidate and discarding the overlapping rest is the approval workflow's
/// job, so do not "fix" this into a greedy book-style matcher.
///
/// Inputs are borrowed read-only; output is deterministic for a given input.
/// Orders without a resolvable price are skipped before sorting.
pub fn match_orders(buys: &[Order], sells: &[Order]) -> Vec<MatchResult> {
    let mut bids: Vec<&Order> = buys.iter().filter(|o| o.resolved_price().is_some()).collect();
    let mut asks: Vec<&Order> = sells
        .iter()
        .filter(|o| o.resolved_price().is_some())
        .collect();

    bids.sort_by_key(|o| (Reverse(o.resolved_price().unwrap_or_default()), o.created_at));
    asks.sort_by_key(|o| (o.resolved_price().unwrap_or_default(), o.created_at));

    let mut candidates = Vec::new();
    for buy in &bids {
        for sell in &asks {
            let result = try_match(buy, sell);
            if result.matched {
                candidates.push(result);
            }
        }
    }
    debug!(
        buys = bids.len(),
        sells = asks.len(),
        candidates = candidates.len(),
        "matching pass complete"
    );
    candidates
}
