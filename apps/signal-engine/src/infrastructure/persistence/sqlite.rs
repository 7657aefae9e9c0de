//! SQLite-backed implementation of the persistence ports.
//!
//! One store implements all three ports (order ledger, signal store, signal
//! log) over a shared connection pool. Prices are stored as decimal strings
//! and timestamps as RFC 3339 text.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};

use crate::application::ports::{LedgerError, OrderLedger, SignalLog, SignalStore};
use crate::domain::order::{
    Order, OrderStatus, OrderType, OrderVariety, ProductType, TxnType,
};
use crate::domain::shared::{
    BrokerAccountId, BrokerOrderId, ClientId, SignalId, SymbolToken, UserId,
};
use crate::domain::signal::{BracketMode, LinkedAccount, Signal, SignalStatus};

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS signals (
    id            TEXT PRIMARY KEY,
    user_id       TEXT NOT NULL,
    name          TEXT NOT NULL,
    exchange      TEXT NOT NULL,
    symbol        TEXT NOT NULL,
    symbol_token  TEXT NOT NULL,
    lot_size      INTEGER NOT NULL,
    size          INTEGER NOT NULL,
    target        TEXT NOT NULL,
    stop_loss     TEXT NOT NULL,
    mode          TEXT NOT NULL,
    status        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS signal_accounts (
    signal_id          TEXT NOT NULL,
    broker_account_id  TEXT NOT NULL,
    client_id          TEXT NOT NULL,
    PRIMARY KEY (signal_id, broker_account_id)
);

CREATE TABLE IF NOT EXISTS orders (
    broker_order_id    TEXT PRIMARY KEY,
    unique_order_id    TEXT,
    parent_order_id    TEXT,
    txn_type           TEXT NOT NULL,
    variety            TEXT NOT NULL,
    order_type         TEXT NOT NULL,
    product_type       TEXT NOT NULL,
    exchange           TEXT NOT NULL,
    symbol             TEXT NOT NULL,
    symbol_token       TEXT NOT NULL,
    qty                INTEGER NOT NULL,
    lot_size           INTEGER NOT NULL,
    filled_shares      INTEGER NOT NULL,
    unfilled_shares    INTEGER NOT NULL,
    price              TEXT NOT NULL,
    average_price      TEXT NOT NULL,
    status             TEXT NOT NULL,
    user_id            TEXT NOT NULL,
    signal_id          TEXT NOT NULL,
    broker_account_id  TEXT NOT NULL,
    client_id          TEXT NOT NULL,
    created_at         TEXT NOT NULL,
    updated_at         TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_orders_parent ON orders (parent_order_id);

CREATE TABLE IF NOT EXISTS signal_log (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    signal_id  TEXT NOT NULL,
    user_id    TEXT NOT NULL,
    payload    TEXT NOT NULL,
    created_at TEXT NOT NULL
);
";

/// SQLite store implementing the order ledger, signal store, and signal log.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the database file and ensure the schema exists.
    ///
    /// # Errors
    ///
    /// Returns a connection error if the file cannot be opened or the schema
    /// statements fail.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| LedgerError::Connection(e.to_string()))?;

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<(), LedgerError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(())
    }

    /// Insert or replace a signal and its linked accounts.
    ///
    /// Signals are managed outside the pipeline; this exists for seeding and
    /// tests.
    ///
    /// # Errors
    ///
    /// Returns a query error if any statement fails.
    pub async fn save_signal(&self, signal: &Signal) -> Result<(), LedgerError> {
        sqlx::query(
            "INSERT OR REPLACE INTO signals
             (id, user_id, name, exchange, symbol, symbol_token, lot_size, size,
              target, stop_loss, mode, status)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(signal.id.as_str())
        .bind(signal.user_id.as_str())
        .bind(&signal.name)
        .bind(&signal.exchange)
        .bind(&signal.symbol)
        .bind(signal.symbol_token.as_str())
        .bind(i64::from(signal.lot_size))
        .bind(i64::from(signal.size))
        .bind(signal.target.to_string())
        .bind(signal.stop_loss.to_string())
        .bind(signal.mode.as_str())
        .bind(signal.status.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        sqlx::query("DELETE FROM signal_accounts WHERE signal_id = ?")
            .bind(signal.id.as_str())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        for account in &signal.accounts {
            sqlx::query(
                "INSERT INTO signal_accounts (signal_id, broker_account_id, client_id)
                 VALUES (?, ?, ?)",
            )
            .bind(signal.id.as_str())
            .bind(account.broker_account_id.as_str())
            .bind(account.client_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        }
        Ok(())
    }
}

fn map_sqlx(error: sqlx::Error) -> LedgerError {
    match error {
        sqlx::Error::Io(e) => LedgerError::Connection(e.to_string()),
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            LedgerError::Connection(error.to_string())
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            LedgerError::Decode(error.to_string())
        }
        other => LedgerError::Query(other.to_string()),
    }
}

fn decimal_column(row: &SqliteRow, column: &str) -> Result<Decimal, LedgerError> {
    let text: String = row.try_get(column).map_err(map_sqlx)?;
    text.parse()
        .map_err(|e| LedgerError::Decode(format!("{column}: {e}")))
}

fn timestamp_column(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>, LedgerError> {
    let text: String = row.try_get(column).map_err(map_sqlx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| LedgerError::Decode(format!("{column}: {e}")))
}

#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
fn row_to_order(row: &SqliteRow) -> Result<Order, LedgerError> {
    let qty: i64 = row.try_get("qty").map_err(map_sqlx)?;
    let lot_size: i64 = row.try_get("lot_size").map_err(map_sqlx)?;
    Ok(Order {
        broker_order_id: BrokerOrderId::new(
            row.try_get::<String, _>("broker_order_id").map_err(map_sqlx)?,
        ),
        unique_order_id: row.try_get("unique_order_id").map_err(map_sqlx)?,
        parent_order_id: row
            .try_get::<Option<String>, _>("parent_order_id")
            .map_err(map_sqlx)?
            .map(BrokerOrderId::new),
        txn_type: TxnType::parse(&row.try_get::<String, _>("txn_type").map_err(map_sqlx)?)
            .ok_or_else(|| LedgerError::Decode("txn_type".to_string()))?,
        variety: OrderVariety::parse(&row.try_get::<String, _>("variety").map_err(map_sqlx)?),
        order_type: OrderType::parse(&row.try_get::<String, _>("order_type").map_err(map_sqlx)?),
        product_type: ProductType::parse(
            &row.try_get::<String, _>("product_type").map_err(map_sqlx)?,
        ),
        exchange: row.try_get("exchange").map_err(map_sqlx)?,
        symbol: row.try_get("symbol").map_err(map_sqlx)?,
        symbol_token: SymbolToken::new(
            row.try_get::<String, _>("symbol_token").map_err(map_sqlx)?,
        ),
        qty: qty as u32,
        lot_size: lot_size as u32,
        filled_shares: row.try_get("filled_shares").map_err(map_sqlx)?,
        unfilled_shares: row.try_get("unfilled_shares").map_err(map_sqlx)?,
        price: decimal_column(row, "price")?,
        average_price: decimal_column(row, "average_price")?,
        status: OrderStatus::parse(&row.try_get::<String, _>("status").map_err(map_sqlx)?),
        user_id: UserId::new(row.try_get::<String, _>("user_id").map_err(map_sqlx)?),
        signal_id: SignalId::new(row.try_get::<String, _>("signal_id").map_err(map_sqlx)?),
        broker_account_id: BrokerAccountId::new(
            row.try_get::<String, _>("broker_account_id").map_err(map_sqlx)?,
        ),
        client_id: ClientId::new(row.try_get::<String, _>("client_id").map_err(map_sqlx)?),
        created_at: timestamp_column(row, "created_at")?,
        updated_at: timestamp_column(row, "updated_at")?,
    })
}

#[async_trait]
impl OrderLedger for SqliteStore {
    async fn insert(&self, order: &Order) -> Result<(), LedgerError> {
        sqlx::query(
            "INSERT INTO orders
             (broker_order_id, unique_order_id, parent_order_id, txn_type, variety,
              order_type, product_type, exchange, symbol, symbol_token, qty, lot_size,
              filled_shares, unfilled_shares, price, average_price, status, user_id,
              signal_id, broker_account_id, client_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(order.broker_order_id.as_str())
        .bind(order.unique_order_id.as_deref())
        .bind(order.parent_order_id.as_ref().map(BrokerOrderId::as_str))
        .bind(order.txn_type.as_str())
        .bind(order.variety.as_str())
        .bind(order.order_type.as_str())
        .bind(order.product_type.as_str())
        .bind(&order.exchange)
        .bind(&order.symbol)
        .bind(order.symbol_token.as_str())
        .bind(i64::from(order.qty))
        .bind(i64::from(order.lot_size))
        .bind(order.filled_shares)
        .bind(order.unfilled_shares)
        .bind(order.price.to_string())
        .bind(order.average_price.to_string())
        .bind(order.status.as_str())
        .bind(order.user_id.as_str())
        .bind(order.signal_id.as_str())
        .bind(order.broker_account_id.as_str())
        .bind(order.client_id.as_str())
        .bind(order.created_at.to_rfc3339())
        .bind(order.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn find_by_broker_order(
        &self,
        order_id: &BrokerOrderId,
        client_id: &ClientId,
    ) -> Result<Option<Order>, LedgerError> {
        let row = sqlx::query("SELECT * FROM orders WHERE broker_order_id = ? AND client_id = ?")
            .bind(order_id.as_str())
            .bind(client_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;
        row.as_ref().map(row_to_order).transpose()
    }

    async fn update(&self, order: &Order) -> Result<(), LedgerError> {
        sqlx::query(
            "UPDATE orders
             SET status = ?, filled_shares = ?, unfilled_shares = ?, price = ?,
                 average_price = ?, updated_at = ?
             WHERE broker_order_id = ?",
        )
        .bind(order.status.as_str())
        .bind(order.filled_shares)
        .bind(order.unfilled_shares)
        .bind(order.price.to_string())
        .bind(order.average_price.to_string())
        .bind(order.updated_at.to_rfc3339())
        .bind(order.broker_order_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn open_children(&self, parent: &BrokerOrderId) -> Result<Vec<Order>, LedgerError> {
        let rows = sqlx::query(
            "SELECT * FROM orders
             WHERE parent_order_id = ? AND status NOT IN ('EXECUTED', 'CANCELED')",
        )
        .bind(parent.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;
        rows.iter().map(row_to_order).collect()
    }

    async fn mark_canceled(&self, order_id: &BrokerOrderId) -> Result<(), LedgerError> {
        sqlx::query("UPDATE orders SET status = 'CANCELED', updated_at = ? WHERE broker_order_id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(order_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(())
    }
}

#[async_trait]
impl SignalStore for SqliteStore {
    async fn find(&self, id: &SignalId) -> Result<Option<Signal>, LedgerError> {
        let Some(row) = sqlx::query("SELECT * FROM signals WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?
        else {
            return Ok(None);
        };

        let account_rows = sqlx::query(
            "SELECT broker_account_id, client_id FROM signal_accounts WHERE signal_id = ?",
        )
        .bind(id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;
        let accounts = account_rows
            .iter()
            .map(|r| {
                Ok(LinkedAccount {
                    broker_account_id: BrokerAccountId::new(
                        r.try_get::<String, _>("broker_account_id").map_err(map_sqlx)?,
                    ),
                    client_id: ClientId::new(
                        r.try_get::<String, _>("client_id").map_err(map_sqlx)?,
                    ),
                })
            })
            .collect::<Result<Vec<_>, LedgerError>>()?;

        let lot_size: i64 = row.try_get("lot_size").map_err(map_sqlx)?;
        let size: i64 = row.try_get("size").map_err(map_sqlx)?;
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        let signal = Signal {
            id: SignalId::new(row.try_get::<String, _>("id").map_err(map_sqlx)?),
            user_id: UserId::new(row.try_get::<String, _>("user_id").map_err(map_sqlx)?),
            name: row.try_get("name").map_err(map_sqlx)?,
            exchange: row.try_get("exchange").map_err(map_sqlx)?,
            symbol: row.try_get("symbol").map_err(map_sqlx)?,
            symbol_token: SymbolToken::new(
                row.try_get::<String, _>("symbol_token").map_err(map_sqlx)?,
            ),
            lot_size: lot_size as u32,
            size: size as u32,
            target: decimal_column(&row, "target")?,
            stop_loss: decimal_column(&row, "stop_loss")?,
            mode: BracketMode::parse(&row.try_get::<String, _>("mode").map_err(map_sqlx)?),
            status: SignalStatus::parse(&row.try_get::<String, _>("status").map_err(map_sqlx)?),
            accounts,
        };
        Ok(Some(signal))
    }
}

#[async_trait]
impl SignalLog for SqliteStore {
    async fn append(
        &self,
        signal_id: &SignalId,
        user_id: &UserId,
        payload: serde_json::Value,
    ) -> Result<(), LedgerError> {
        sqlx::query(
            "INSERT INTO signal_log (signal_id, user_id, payload, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(signal_id.as_str())
        .bind(user_id.as_str())
        .bind(payload.to_string())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }
}
