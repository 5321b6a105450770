use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

/// Represents which side of the market the order is on.
///
/// # Intuition
/// - `Buy`: the account wants to purchase the instrument. Buy orders rank from
///   **highest to lowest price** — a higher bid is more willing to trade.
/// - `Sell`: the account wants to sell. Sell orders rank from **lowest to
///   highest price** — a lower ask is more willing to trade.
///
/// This ranking ensures a matching pass always proposes the **best price
/// first**: the most aggressive buyer is paired before the passive ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

/// Lifecycle state of an order.
///
/// Only `Pending` and `Approved` orders may proceed to execution; everything
/// else is terminal from the desk's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Approved,
    Completed,
    Rejected,
    Cancelled,
}

/// The five trade kinds handled by the desk, each with its own price fields.
///
/// - `Plain`: ordinary equity order with a single unit price.
/// - `CrossBorder`: carries the foreign-currency price, the already-converted
///   domestic price, and the rate used. The engine never converts currency;
///   `domestic_price` is the tradable one.
/// - `Subscription`: new-issue application. Carries an issue price and an
///   applied quantity but **no tradable price**; it never enters matching.
/// - `Block`: negotiated block trade with a minimum execution quantity.
/// - `Board`: limit-up board order; its reference price stands in for a
///   regular unit price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OrderKind {
    Plain {
        price: Decimal,
    },
    CrossBorder {
        foreign_price: Decimal,
        domestic_price: Decimal,
        fx_rate: Decimal,
    },
    Subscription {
        issue_price: Decimal,
        applied_quantity: u64,
    },
    Block {
        price: Decimal,
        min_quantity: u64,
    },
    Board {
        limit_up_price: Decimal,
    },
}

/// An order submitted by an account, as snapshotted from the store.
///
/// The matching core treats these as read-only: a pass borrows a batch of
/// them, proposes candidates, and the approval workflow persists whatever the
/// operator confirms. `approved_by`/`approved_at` are stamped only by the
/// confirmation and forced-execution paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub account_id: Uuid,
    pub symbol: String,
    pub side: Side,
    pub quantity: u64,
    pub status: OrderStatus,
    pub kind: OrderKind,
    pub created_at: SystemTime,
    pub approved_by: Option<String>,
    pub approved_at: Option<SystemTime>,
}

impl Order {
    /// The single comparable price for this order, if it has one.
    ///
    /// Direct unit price first (`Plain`, `CrossBorder` domestic, `Block`),
    /// else the limit-up reference price (`Board`). A `Subscription` has no
    /// tradable price and resolves to `None`, which keeps it out of matching
    /// entirely rather than letting it cross at a phantom price of zero.
    pub fn resolved_price(&self) -> Option<Decimal> {
        match &self.kind {
            OrderKind::Plain { price } => Some(*price),
            OrderKind::CrossBorder { domestic_price, .. } => Some(*domestic_price),
            OrderKind::Block { price, .. } => Some(*price),
            OrderKind::Board { limit_up_price } => Some(*limit_up_price),
            OrderKind::Subscription { .. } => None,
        }
    }

    /// Whether the lifecycle state still permits execution.
    pub fn is_executable(&self) -> bool {
        matches!(self.status, OrderStatus::Pending | OrderStatus::Approved)
    }
}
