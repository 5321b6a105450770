use std::time::SystemTime;

use axum::{
    Json, Router, debug_handler,
    extract::{Path, Query, State},
    routing::{get, post},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use crate::{
    audit::{AuditAction, AuditEntry},
    eligibility::{Eligibility, can_execute},
    errors::ApiError,
    matching::{MatchResult, match_orders, try_match},
    orders::{Order, OrderKind, OrderStatus, Side},
    settlement::force_execute,
    state::AppState,
    symbol::Symbol,
};

const DEFAULT_PAGE_LIMIT: usize = 100;
const MAX_PAGE_LIMIT: usize = 1000;

#[derive(Deserialize)]
pub struct NewOrder {
    pub account_id: Uuid,
    pub symbol: String,
    pub side: Side,
    pub quantity: u64,
    pub kind: OrderKind,
}

#[derive(Serialize, Deserialize)]
pub struct OrderAck {
    pub order_id: Uuid,
}

#[derive(Deserialize)]
pub struct PageParams {
    pub limit: Option<usize>,
    pub after: Option<String>,
}

#[derive(Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<String>,
}

#[derive(Deserialize)]
pub struct BalanceQuery {
    pub available_balance: Decimal,
}

#[derive(Deserialize)]
pub struct ForceRequest {
    pub approver_id: String,
}

#[derive(Deserialize)]
pub struct ConfirmRequest {
    pub buy_id: Uuid,
    pub sell_id: Uuid,
    pub approver_id: String,
    /// Buyer's available balance, fetched by the caller from the account
    /// system; sellers need no funding.
    pub buyer_balance: Decimal,
}

#[derive(Serialize)]
pub struct ConfirmAck {
    pub candidate: MatchResult,
    pub buy: Order,
    pub sell: Order,
}

fn parse_symbol(raw: &str) -> Result<Symbol, ApiError> {
    raw.parse::<Symbol>().map_err(ApiError::BadSymbol)
}

fn effective_limit(requested: Option<usize>) -> usize {
    requested.unwrap_or(DEFAULT_PAGE_LIMIT).min(MAX_PAGE_LIMIT)
}

/// Intake: persist a new pending order.
#[debug_handler]
pub async fn create_order(
    State(state): State<AppState>,
    Json(payload): Json<NewOrder>,
) -> Result<Json<OrderAck>, ApiError> {
    if payload.quantity == 0 {
        return Err(ApiError::ZeroQuantity);
    }
    let symbol = parse_symbol(&payload.symbol)?;

    let order = Order {
        id: Uuid::new_v4(),
        account_id: payload.account_id,
        symbol: symbol.code().to_string(),
        side: payload.side,
        quantity: payload.quantity,
        status: OrderStatus::Pending,
        kind: payload.kind,
        created_at: SystemTime::now(),
        approved_by: None,
        approved_at: None,
    };

    let mut store = state.store.lock().unwrap();
    store.insert_order(&order)?;
    store.append_audit(&AuditEntry::record(
        payload.account_id.to_string(),
        AuditAction::OrderCreated,
        vec![order.id],
    ))?;
    info!(order_id = %order.id, symbol = %order.symbol, "order accepted");
    Ok(Json(OrderAck { order_id: order.id }))
}

/// Page one symbol's orders ascending by creation time.
pub async fn list_orders(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let symbol = parse_symbol(&symbol)?;
    let limit = effective_limit(params.limit);

    let store = state.store.lock().unwrap();
    let (items, next) = store.page_orders_asc(symbol.code(), params.after.as_deref(), limit)?;
    Ok((
        [("x-effective-limit", limit.to_string())],
        Json(Page { items, next }),
    ))
}

/// Run a matching pass over the symbol's executable orders and return the
/// candidates. Nothing is persisted; candidates are proposals for the
/// operator, who confirms at most one per order via `/confirmations`.
pub async fn propose_matches(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<Vec<MatchResult>>, ApiError> {
    let symbol = parse_symbol(&symbol)?;

    let snapshot = {
        let store = state.store.lock().unwrap();
        store.executable_for_symbol(symbol.code())?
    };
    let (buys, sells): (Vec<Order>, Vec<Order>) =
        snapshot.into_iter().partition(|o| o.side == Side::Buy);
    Ok(Json(match_orders(&buys, &sells)))
}

/// Advisory eligibility check against a caller-supplied balance.
pub async fn check_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(query): Json<BalanceQuery>,
) -> Result<Json<Eligibility>, ApiError> {
    let store = state.store.lock().unwrap();
    let order = store.get_order(id)?.ok_or(ApiError::OrderNotFound)?;
    Ok(Json(can_execute(&order, query.available_balance)))
}

/// Confirm one proposed candidate: re-probe the pair, re-check eligibility
/// on both sides, then stamp and persist both orders as completed.
#[debug_handler]
pub async fn confirm_match(
    State(state): State<AppState>,
    Json(req): Json<ConfirmRequest>,
) -> Result<Json<ConfirmAck>, ApiError> {
    let mut store = state.store.lock().unwrap();
    let buy = store.get_order(req.buy_id)?.ok_or(ApiError::OrderNotFound)?;
    let sell = store
        .get_order(req.sell_id)?
        .ok_or(ApiError::OrderNotFound)?;

    // The candidate was computed from an earlier snapshot; the pair must
    // still cross now.
    let candidate = try_match(&buy, &sell);
    if let Some(reason) = candidate.reason {
        return Err(ApiError::NoMatch(reason));
    }
    if let Some(reason) = can_execute(&buy, req.buyer_balance).reason {
        return Err(ApiError::Ineligible(reason));
    }
    // Sellers deliver stock, not cash; only the status rule applies.
    if let Some(reason) = can_execute(&sell, Decimal::ZERO).reason {
        return Err(ApiError::Ineligible(reason));
    }

    // Completion stamp is the same transformation the forced path uses; the
    // checks above are the difference.
    let buy_done = force_execute(&buy, &req.approver_id);
    let sell_done = force_execute(&sell, &req.approver_id);
    store.update_order(&buy_done)?;
    store.update_order(&sell_done)?;
    store.append_audit(&AuditEntry::record(
        req.approver_id.clone(),
        AuditAction::MatchConfirmed,
        vec![buy_done.id, sell_done.id],
    ))?;
    info!(buy = %buy_done.id, sell = %sell_done.id, approver = %req.approver_id, "match confirmed");
    Ok(Json(ConfirmAck {
        candidate,
        buy: buy_done,
        sell: sell_done,
    }))
}

/// Administrative forced execution: completes the order without matching or
/// eligibility, on the approver's authority.
pub async fn force_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ForceRequest>,
) -> Result<Json<Order>, ApiError> {
    let mut store = state.store.lock().unwrap();
    let order = store.get_order(id)?.ok_or(ApiError::OrderNotFound)?;
    if order.status == OrderStatus::Completed {
        return Err(ApiError::AlreadyCompleted);
    }

    let executed = force_execute(&order, &req.approver_id);
    store.update_order(&executed)?;
    store.append_audit(&AuditEntry::record(
        req.approver_id,
        AuditAction::ForcedExecution,
        vec![executed.id],
    ))?;
    Ok(Json(executed))
}

/// Page the audit log ascending by time.
pub async fn list_audit(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let limit = effective_limit(params.limit);
    let store = state.store.lock().unwrap();
    let (items, next) = store.page_audit_asc(params.after.as_deref(), limit)?;
    Ok((
        [("x-effective-limit", limit.to_string())],
        Json(Page { items, next }),
    ))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/orders", post(create_order))
        .route("/orders/{symbol}", get(list_orders))
        .route("/orders/{id}/check", post(check_order))
        .route("/orders/{id}/force", post(force_order))
        .route("/matches/{symbol}", post(propose_matches))
        .route("/confirmations", post(confirm_match))
        .route("/audit", get(list_audit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
