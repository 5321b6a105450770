use crate::orders::{Order, OrderStatus};
use std::time::SystemTime;
use tracing::info;

/// Completes an order on an operator's authority.
///
/// Returns a stamped copy (status `Completed`, approver identity, approval
/// time) and leaves the input untouched; the caller persists the result.
/// No eligibility check runs here: forced execution exists precisely to
/// settle an order manually when the normal match/confirm path can't, so it
/// bypasses both the matcher and [`crate::eligibility::can_execute`].
pub fn force_execute(order: &Order, approver_id: &str) -> Order {
    info!(order_id = %order.id, approver = approver_id, "forced execution");
    let mut executed = order.clone();
    executed.status = OrderStatus::Completed;
    executed.approved_by = Some(approver_id.to_string());
    executed.approved_at = Some(SystemTime::now());
    executed
}
