#![forbid(unsafe_code)]
//! SQLite-backed storefront state.
//!
//! One [`Store`] owns the database connection and exposes catalog reads,
//! per-user cart writes, the transactional order placement path, and the
//! order event outbox that feeds post-commit notifications.

mod cart;
mod catalog;
mod fake;
mod orders;
mod outbox;
mod schema;

pub use cart::CartEntry;
pub use catalog::{NewProduct, ProductFilter, ProductOrder};
pub use fake::FakePaymentGateway;
pub use orders::{OrderDetail, PaymentGateway, PaymentGatewayError};
pub use outbox::{OrderEvent, OutboxStatus, EVENT_ORDER_PLACED};
pub use schema::SCHEMA_VERSION;

use rusqlite::Connection;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum StoreErrorCode {
    NotFound,
    Validation,
    EmptyCart,
    InsufficientStock,
    PaymentGateway,
    Conflict,
    Io,
    Internal,
}

impl StoreErrorCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Validation => "validation_error",
            Self::EmptyCart => "empty_cart",
            Self::InsufficientStock => "insufficient_stock",
            Self::PaymentGateway => "payment_gateway_error",
            Self::Conflict => "conflict",
            Self::Io => "io_error",
            Self::Internal => "internal_error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    pub code: StoreErrorCode,
    pub message: String,
}

impl StoreError {
    #[must_use]
    pub fn new(code: StoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for StoreError {}

/// Serializes all database access through one connection. SQLite runs in
/// WAL mode with foreign keys on; the schema is applied on open.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| StoreError::new(StoreErrorCode::Io, e.to_string()))?;
            }
        }
        let conn = Connection::open(path)
            .map_err(|e| StoreError::new(StoreErrorCode::Io, e.to_string()))?;
        schema::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::new(StoreErrorCode::Io, e.to_string()))?;
        schema::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn ping(&self) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.query_row("SELECT 1", [], |_| Ok(()))
            .map_err(|e| StoreError::new(StoreErrorCode::Internal, e.to_string()))
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::new(StoreErrorCode::Internal, "connection mutex poisoned"))
    }
}

pub(crate) fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

pub const CRATE_NAME: &str = "toko-store";
