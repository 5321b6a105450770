use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64;
use bincode::{
    config::{self, standard},
    error::{DecodeError, EncodeError},
};
use parity_db::{BTreeIterator, ColId, Db, Options};
use serde_json::{self};
use std::{
    path::Path,
    time::{SystemTime, UNIX_EPOCH},
};
use thiserror::Error;
use uuid::Uuid;

use crate::audit::AuditEntry;
use crate::orders::Order;

/// Orders, keyed "{symbol}:{created_at_nanos}{order_id}" for prefix scans.
const COL_ORDERS: ColId = 0;
/// Order id -> order key, for point lookups and status updates.
const COL_ORDER_IDX: ColId = 1;
/// Audit entries, keyed "{at_nanos}{entry_id}" in global time order.
const COL_AUDIT: ColId = 2;

//Cursor (opaque to clients)
#[derive(serde::Serialize, serde::Deserialize)]
struct Cursor {
    ts_nanos: u128,
    id: Uuid,
}

/// Errors from the key/value store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("ParityDB error: {0}")]
    Parity(#[from] parity_db::Error),
    #[error("Serialization/Deserialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Bincode encode error: {0}")]
    BincodeEncode(#[from] EncodeError),

    #[error("Bincode decode error: {0}")]
    BincodeDecode(#[from] DecodeError),

    #[error("Invalid cursor")]
    BadCursor,

    #[error("unknown order id: {0}")]
    UnknownOrder(Uuid),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// ParityDB-backed store for orders and the audit log.
///
/// This sits outside the matching core: handlers pull snapshots out, run the
/// pure pass over them, and persist whatever the operator confirms.
pub struct Store {
    db: Db,
}

impl Store {
    /// Open (or create) a ParityDB at `path`. Orders and audit entries get
    /// B-tree indexes for ordered scans; the id index stays a plain column.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let mut opts = Options::with_columns(path.as_ref(), 3);
        opts.columns[COL_ORDERS as usize].btree_index = true;
        opts.columns[COL_AUDIT as usize].btree_index = true;
        let db = Db::open_or_create(&opts)?;
        Ok(Store { db })
    }

    #[inline]
    fn to_nanos(ts: SystemTime) -> u128 {
        ts.duration_since(UNIX_EPOCH).unwrap().as_nanos()
    }

    #[inline]
    fn order_prefix(symbol: &str) -> Vec<u8> {
        let mut k = Vec::with_capacity(symbol.len() + 1);
        k.extend_from_slice(symbol.as_bytes());
        k.push(b':');
        k
    }

    #[inline]
    fn order_key(order: &Order) -> Vec<u8> {
        let mut key = Self::order_prefix(&order.symbol);
        key.extend_from_slice(&Self::to_nanos(order.created_at).to_be_bytes());
        key.extend_from_slice(order.id.as_bytes());
        key
    }

    #[inline]
    fn audit_key(entry: &AuditEntry) -> Vec<u8> {
        let mut key = Self::to_nanos(entry.at).to_be_bytes().to_vec();
        key.extend_from_slice(entry.id.as_bytes());
        key
    }

    #[inline]
    fn encode_cursor(c: &Cursor) -> String {
        B64.encode(serde_json::to_vec(c).unwrap())
    }

    #[inline]
    fn decode_cursor(s: &str) -> StoreResult<Cursor> {
        let bytes = B64.decode(s).map_err(|_| StoreError::BadCursor)?;
        serde_json::from_slice(&bytes).map_err(|_| StoreError::BadCursor)
    }

    #[inline]
    fn order_key_from_cursor(symbol: &str, c: &Cursor) -> Vec<u8> {
        let mut k = Self::order_prefix(symbol);
        k.extend_from_slice(&c.ts_nanos.to_be_bytes());
        k.extend_from_slice(c.id.as_bytes());
        k
    }

    #[inline]
    fn audit_key_from_cursor(c: &Cursor) -> Vec<u8> {
        let mut k = c.ts_nanos.to_be_bytes().to_vec();
        k.extend_from_slice(c.id.as_bytes());
        k
    }

    /// Position `it` just past the cursor key (validating that the key really
    /// exists), or at `start` when no cursor was given.
    fn seek_past_cursor(
        &self,
        it: &mut BTreeIterator<'_>,
        col: ColId,
        full: Option<Vec<u8>>,
        start: &[u8],
    ) -> StoreResult<()> {
        match full {
            Some(full) => {
                let mut check = self.db.iter(col)?;
                check.seek(&full)?;
                match check.next()? {
                    Some((k, _)) if k == full => {}
                    _ => return Err(StoreError::BadCursor),
                }
                // Start strictly after that exact key
                it.seek(&full)?;
                let _ = it.next()?; //consume the equal key
            }
            None => it.seek(start)?,
        }
        Ok(())
    }

    /// Insert a new order and its id-index entry in one commit.
    pub fn insert_order(&mut self, order: &Order) -> StoreResult<()> {
        let key = Self::order_key(order);
        let value = bincode::serde::encode_to_vec(order, config::standard())?;
        self.db.commit(vec![
            (COL_ORDERS, key.clone(), Some(value)),
            (COL_ORDER_IDX, order.id.as_bytes().to_vec(), Some(key)),
        ])?;
        Ok(())
    }

    /// Point lookup by order id via the index column.
    pub fn get_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
        let Some(key) = self.db.get(COL_ORDER_IDX, id.as_bytes())? else {
            return Ok(None);
        };
        let Some(raw) = self.db.get(COL_ORDERS, &key)? else {
            return Ok(None);
        };
        let (order, _): (Order, usize) = bincode::serde::decode_from_slice(&raw, standard())?;
        Ok(Some(order))
    }

    /// Overwrite an existing order in place. Symbol and creation time are
    /// immutable, so the original key still addresses it.
    pub fn update_order(&mut self, order: &Order) -> StoreResult<()> {
        let Some(key) = self.db.get(COL_ORDER_IDX, order.id.as_bytes())? else {
            return Err(StoreError::UnknownOrder(order.id));
        };
        let value = bincode::serde::encode_to_vec(order, config::standard())?;
        self.db.commit(vec![(COL_ORDERS, key, Some(value))])?;
        Ok(())
    }

    /// Page orders for one symbol ascending by creation time.
    pub fn page_orders_asc(
        &self,
        symbol: &str,
        after: Option<&str>,
        limit: usize,
    ) -> StoreResult<(Vec<Order>, Option<String>)> {
        let mut it: BTreeIterator<'_> = self.db.iter(COL_ORDERS)?;
        let prefix = Self::order_prefix(symbol);

        let full = match after {
            None => None,
            Some(s) => Some(Self::order_key_from_cursor(symbol, &Self::decode_cursor(s)?)),
        };
        self.seek_past_cursor(&mut it, COL_ORDERS, full, &prefix)?;

        let mut items = Vec::with_capacity(limit.min(256));
        let mut last_cursor: Option<String> = None;

        while items.len() < limit {
            match it.next()? {
                Some((k, v)) if k.starts_with(&prefix) => {
                    let (order, _): (Order, usize) =
                        bincode::serde::decode_from_slice(&v, standard())?;
                    last_cursor = Some(Self::encode_cursor(&Cursor {
                        ts_nanos: Self::to_nanos(order.created_at),
                        id: order.id,
                    }));
                    items.push(order);
                }
                _ => break,
            }
        }

        Ok((items, last_cursor))
    }

    /// Snapshot of a symbol's still-executable orders, for a matching pass.
    pub fn executable_for_symbol(&self, symbol: &str) -> StoreResult<Vec<Order>> {
        let mut it = self.db.iter(COL_ORDERS)?;
        let prefix = Self::order_prefix(symbol);
        it.seek(&prefix)?;

        let mut orders = Vec::new();
        while let Some((key, raw)) = it.next()? {
            if !key.starts_with(&prefix) {
                break;
            }
            let (order, _): (Order, usize) = bincode::serde::decode_from_slice(&raw, standard())?;
            if order.is_executable() {
                orders.push(order);
            }
        }
        Ok(orders)
    }

    /// Append one audit entry.
    pub fn append_audit(&mut self, entry: &AuditEntry) -> StoreResult<()> {
        let key = Self::audit_key(entry);
        let value = bincode::serde::encode_to_vec(entry, config::standard())?;
        self.db.commit(vec![(COL_AUDIT, key, Some(value))])?;
        Ok(())
    }

    /// Page the audit log ascending by time.
    pub fn page_audit_asc(
        &self,
        after: Option<&str>,
        limit: usize,
    ) -> StoreResult<(Vec<AuditEntry>, Option<String>)> {
        let mut it: BTreeIterator<'_> = self.db.iter(COL_AUDIT)?;

        let full = match after {
            None => None,
            Some(s) => Some(Self::audit_key_from_cursor(&Self::decode_cursor(s)?)),
        };
        self.seek_past_cursor(&mut it, COL_AUDIT, full, &[])?;

        let mut items = Vec::with_capacity(limit.min(256));
        let mut last_cursor: Option<String> = None;

        while items.len() < limit {
            match it.next()? {
                Some((_, v)) => {
                    let (entry, _): (AuditEntry, usize) =
                        bincode::serde::decode_from_slice(&v, standard())?;
                    last_cursor = Some(Self::encode_cursor(&Cursor {
                        ts_nanos: Self::to_nanos(entry.at),
                        id: entry.id,
                    }));
                    items.push(entry);
                }
                None => break,
            }
        }

        Ok((items, last_cursor))
    }
}
