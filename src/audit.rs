use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

/// Administrative actions worth a paper trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditAction {
    OrderCreated,
    MatchConfirmed,
    ForcedExecution,
}

/// One entry in the desk's audit log: who did what to which orders, when.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub actor: String,
    pub action: AuditAction,
    pub order_ids: Vec<Uuid>,
    pub at: SystemTime,
}

impl AuditEntry {
    pub fn record(actor: impl Into<String>, action: AuditAction, order_ids: Vec<Uuid>) -> Self {
        AuditEntry {
            id: Uuid::new_v4(),
            actor: actor.into(),
            action,
            order_ids,
            at: SystemTime::now(),
        }
    }
}
