use crate::orders::{Order, Side};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

/// Why an order may not proceed to execution.
///
/// These are expected business outcomes, not faults; the check reports them
/// instead of erroring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IneligibilityReason {
    #[error("insufficient account balance")]
    InsufficientBalance,
    #[error("order status does not permit execution")]
    StatusNotExecutable,
}

impl Serialize for IneligibilityReason {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Advisory verdict from [`can_execute`]. `reason` is set iff `allowed` is
/// false.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Eligibility {
    pub allowed: bool,
    pub reason: Option<IneligibilityReason>,
}

impl Eligibility {
    fn allowed() -> Self {
        Eligibility {
            allowed: true,
            reason: None,
        }
    }

    fn rejected(reason: IneligibilityReason) -> Self {
        Eligibility {
            allowed: false,
            reason: Some(reason),
        }
    }
}

/// Checks whether `order` may proceed to execution given the account's
/// available balance.
///
/// Buy side: the account must cover resolved price x quantity. Either side:
/// the order must still be in an executable state. Purely advisory: the
/// caller freezes funds and transitions status itself, and nothing is
/// mutated here.
///
/// `available_balance` arrives already fetched (and, for cross-border
/// orders, already in domestic currency); no conversion happens here. A buy
/// without a resolvable price requires nothing fundable, so only the status
/// rule can reject it. The matcher will never propose it anyway.
pub fn can_execute(order: &Order, available_balance: Decimal) -> Eligibility {
    if order.side == Side::Buy {
        let required = order.resolved_price().unwrap_or_default() * Decimal::from(order.quantity);
        if available_balance < required {
            return Eligibility::rejected(IneligibilityReason::InsufficientBalance);
        }
    }
    if !order.is_executable() {
        return Eligibility::rejected(IneligibilityReason::StatusNotExecutable);
    }
    Eligibility::allowed()
}
