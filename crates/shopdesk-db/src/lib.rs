//! ShopDesk SQLite database.
//!
//! Source of truth for orders and return requests. The chat path reads the
//! search indexes; the return workflow reads and writes here.

use async_trait::async_trait;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};
use serde_json::Value;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use shopdesk_core::error::{Result, ShopDeskError};
use shopdesk_core::traits::{OrderStore, ReturnStore};
use shopdesk_core::types::{OrderPatch, OrderRecord, ReturnRecord, ReturnStatus};

pub struct ShopDb {
    conn: Mutex<Connection>,
}

const ORDER_COLUMNS: &str = "order_id, customer_id, order_date, delivery_date, status, \
     total_amount, items_json, shipping_address_json, created_at, updated_at";

const RETURN_COLUMNS: &str = "return_id, order_id, customer_id, status, reason, items_json, \
     refund_amount, restocking_fee, created_at, updated_at";

fn db_err(e: rusqlite::Error) -> ShopDeskError {
    ShopDeskError::Database(e.to_string())
}

fn is_duplicate(e: &rusqlite::Error) -> bool {
    matches!(e, rusqlite::Error::SqliteFailure(f, _) if f.code == ErrorCode::ConstraintViolation)
}

fn parse_json(raw: String) -> Value {
    serde_json::from_str(&raw).unwrap_or(Value::Null)
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn order_from_row(row: &Row) -> rusqlite::Result<OrderRecord> {
    Ok(OrderRecord {
        order_id: row.get(0)?,
        customer_id: row.get(1)?,
        order_date: row.get(2)?,
        delivery_date: row.get(3)?,
        status: row.get::<_, String>(4)?.into(),
        total_amount: row.get(5)?,
        items: parse_json(row.get(6)?),
        shipping_address: parse_json(row.get(7)?),
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn return_from_row(row: &Row) -> rusqlite::Result<ReturnRecord> {
    let status: String = row.get(3)?;
    Ok(ReturnRecord {
        return_id: row.get(0)?,
        order_id: row.get(1)?,
        customer_id: row.get(2)?,
        status: ReturnStatus::parse(&status).unwrap_or(ReturnStatus::Pending),
        reason: row.get(4)?,
        items: parse_json(row.get(5)?),
        refund_amount: row.get(6)?,
        restocking_fee: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

impl ShopDb {
    /// Open or create the database file.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(db_err)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;").ok();
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        tracing::debug!("🗄️ Database ready at {}", path.display());
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let db = Self {
            conn: Mutex::new(Connection::open_in_memory().map_err(db_err)?),
        };
        db.migrate()?;
        Ok(db)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| ShopDeskError::Database(format!("Lock: {e}")))
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS orders (
                order_id TEXT PRIMARY KEY,
                customer_id TEXT NOT NULL,
                order_date TEXT NOT NULL,
                delivery_date TEXT,
                status TEXT NOT NULL DEFAULT 'pending',
                total_amount REAL NOT NULL DEFAULT 0,
                items_json TEXT DEFAULT '[]',
                shipping_address_json TEXT DEFAULT '{}',
                created_at TEXT DEFAULT (datetime('now')),
                updated_at TEXT DEFAULT (datetime('now'))
            );
            CREATE INDEX IF NOT EXISTS idx_orders_customer ON orders(customer_id);

            CREATE TABLE IF NOT EXISTS returns (
                return_id TEXT PRIMARY KEY,
                order_id TEXT NOT NULL,
                customer_id TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                reason TEXT NOT NULL,
                items_json TEXT DEFAULT '[]',
                refund_amount REAL NOT NULL DEFAULT 0,
                restocking_fee REAL NOT NULL DEFAULT 0,
                created_at TEXT DEFAULT (datetime('now')),
                updated_at TEXT DEFAULT (datetime('now'))
            );
            CREATE INDEX IF NOT EXISTS idx_returns_order ON returns(order_id);
            ",
        )
        .map_err(|e| ShopDeskError::Database(format!("Migration error: {e}")))?;
        Ok(())
    }

    fn fetch_order(conn: &Connection, order_id: &str) -> Result<Option<OrderRecord>> {
        conn.query_row(
            &format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_id = ?1"),
            params![order_id],
            order_from_row,
        )
        .optional()
        .map_err(db_err)
    }
}

#[async_trait]
impl OrderStore for ShopDb {
    async fn get_order(&self, order_id: &str) -> Result<Option<OrderRecord>> {
        let conn = self.lock()?;
        Self::fetch_order(&conn, order_id)
    }

    async fn create_order(&self, order: &OrderRecord) -> Result<()> {
        let conn = self.lock()?;
        let created_at = if order.created_at.is_empty() { now() } else { order.created_at.clone() };
        let updated_at = if order.updated_at.is_empty() { created_at.clone() } else { order.updated_at.clone() };
        conn.execute(
            &format!("INSERT INTO orders ({ORDER_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"),
            params![
                order.order_id,
                order.customer_id,
                order.order_date,
                order.delivery_date,
                order.status.as_str(),
                order.total_amount,
                order.items.to_string(),
                order.shipping_address.to_string(),
                created_at,
                updated_at,
            ],
        )
        .map_err(|e| {
            if is_duplicate(&e) {
                ShopDeskError::InvalidInput(format!("Order {} already exists", order.order_id))
            } else {
                db_err(e)
            }
        })?;
        tracing::info!("🛒 Order {} created", order.order_id);
        Ok(())
    }

    async fn list_orders(&self, customer_id: Option<&str>) -> Result<Vec<OrderRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {ORDER_COLUMNS} FROM orders \
                 WHERE (?1 IS NULL OR customer_id = ?1) ORDER BY created_at DESC, order_id"
            ))
            .map_err(db_err)?;
        let orders = stmt
            .query_map(params![customer_id], order_from_row)
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err)?;
        Ok(orders)
    }

    async fn update_order(&self, order_id: &str, patch: &OrderPatch) -> Result<OrderRecord> {
        let conn = self.lock()?;
        let mut order = Self::fetch_order(&conn, order_id)?
            .ok_or_else(|| ShopDeskError::NotFound(format!("Order {order_id} not found")))?;

        if let Some(status) = &patch.status {
            order.status = status.clone();
        }
        if let Some(date) = &patch.delivery_date {
            order.delivery_date = Some(date.clone());
        }
        if let Some(total) = patch.total_amount {
            order.total_amount = total;
        }
        if let Some(addr) = &patch.shipping_address {
            order.shipping_address = addr.clone();
        }
        order.updated_at = now();

        conn.execute(
            "UPDATE orders SET status = ?1, delivery_date = ?2, total_amount = ?3, \
             shipping_address_json = ?4, updated_at = ?5 WHERE order_id = ?6",
            params![
                order.status.as_str(),
                order.delivery_date,
                order.total_amount,
                order.shipping_address.to_string(),
                order.updated_at,
                order_id,
            ],
        )
        .map_err(db_err)?;
        tracing::info!("✏️ Order {order_id} updated → {}", order.status);
        Ok(order)
    }
}

#[async_trait]
impl ReturnStore for ShopDb {
    async fn get_return(&self, return_id: &str) -> Result<Option<ReturnRecord>> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {RETURN_COLUMNS} FROM returns WHERE return_id = ?1"),
            params![return_id],
            return_from_row,
        )
        .optional()
        .map_err(db_err)
    }

    async fn create_return(&self, record: &ReturnRecord) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            &format!("INSERT INTO returns ({RETURN_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"),
            params![
                record.return_id,
                record.order_id,
                record.customer_id,
                record.status.as_str(),
                record.reason,
                record.items.to_string(),
                record.refund_amount,
                record.restocking_fee,
                record.created_at,
                record.updated_at,
            ],
        )
        .map_err(|e| {
            if is_duplicate(&e) {
                ShopDeskError::InvalidInput(format!("Return {} already exists", record.return_id))
            } else {
                db_err(e)
            }
        })?;
        tracing::info!("📦 Return {} created for {}", record.return_id, record.order_id);
        Ok(())
    }

    async fn list_returns(&self, order_id: Option<&str>) -> Result<Vec<ReturnRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {RETURN_COLUMNS} FROM returns \
                 WHERE (?1 IS NULL OR order_id = ?1) ORDER BY created_at DESC, return_id"
            ))
            .map_err(db_err)?;
        let returns = stmt
            .query_map(params![order_id], return_from_row)
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err)?;
        Ok(returns)
    }

    async fn update_return_status(&self, return_id: &str, status: ReturnStatus) -> Result<()> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE returns SET status = ?1, updated_at = ?2 WHERE return_id = ?3",
                params![status.as_str(), now(), return_id],
            )
            .map_err(db_err)?;
        if changed == 0 {
            return Err(ShopDeskError::NotFound(format!("Return {return_id} not found")));
        }
        Ok(())
    }
}
