// SPDX-License-Identifier: Apache-2.0

use crate::catalog::internal;
use crate::{Store, StoreError, StoreErrorCode};
use rusqlite::{params, OptionalExtension};
use toko_model::{OrderId, ParseError};

pub const EVENT_ORDER_PLACED: &str = "order_placed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum OutboxStatus {
    Pending,
    Delivered,
    Failed,
}

impl OutboxStatus {
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        match raw {
            "pending" => Ok(Self::Pending),
            "delivered" => Ok(Self::Delivered),
            "failed" => Ok(Self::Failed),
            _ => Err(ParseError::InvalidFormat(
                "outbox status must be 'pending', 'delivered', or 'failed'",
            )),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Delivered => "delivered",
            Self::Failed => "failed",
        }
    }
}

/// A queued post-commit notification. Written in the same transaction as
/// the order it describes, drained by the outbox worker afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderEvent {
    pub id: i64,
    pub order_id: OrderId,
    pub kind: String,
    pub payload: String,
    pub status: OutboxStatus,
    pub attempts: u32,
    pub created_at: i64,
}

impl Store {
    pub fn pending_events(&self, limit: usize) -> Result<Vec<OrderEvent>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, order_id, kind, payload, status, attempts, created_at
                 FROM order_events WHERE status = 'pending' ORDER BY id LIMIT ?1",
            )
            .map_err(internal)?;
        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, u32>(5)?,
                    row.get::<_, i64>(6)?,
                ))
            })
            .map_err(internal)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(internal)?;
        let mut events = Vec::with_capacity(rows.len());
        for (id, order, kind, payload, status, attempts, created_at) in rows {
            let order_id = OrderId::new(order)
                .map_err(|e| StoreError::new(StoreErrorCode::Internal, e.to_string()))?;
            let status = OutboxStatus::parse(&status)
                .map_err(|e| StoreError::new(StoreErrorCode::Internal, e.to_string()))?;
            events.push(OrderEvent {
                id,
                order_id,
                kind,
                payload,
                status,
                attempts,
                created_at,
            });
        }
        Ok(events)
    }

    pub fn mark_event_delivered(&self, event_id: i64) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let affected = conn
            .execute(
                "UPDATE order_events SET status = 'delivered' WHERE id = ?1",
                params![event_id],
            )
            .map_err(internal)?;
        if affected == 0 {
            return Err(StoreError::new(
                StoreErrorCode::NotFound,
                format!("order event {event_id} not found"),
            ));
        }
        Ok(())
    }

    /// Bumps the attempt counter; the event goes to `failed` once the
    /// counter reaches `max_attempts`, otherwise it stays pending for the
    /// next drain.
    pub fn record_event_failure(
        &self,
        event_id: i64,
        max_attempts: u32,
    ) -> Result<OutboxStatus, StoreError> {
        let conn = self.conn()?;
        let affected = conn
            .execute(
                "UPDATE order_events
                 SET attempts = attempts + 1,
                     status = CASE WHEN attempts + 1 >= ?1 THEN 'failed' ELSE 'pending' END
                 WHERE id = ?2",
                params![max_attempts, event_id],
            )
            .map_err(internal)?;
        if affected == 0 {
            return Err(StoreError::new(
                StoreErrorCode::NotFound,
                format!("order event {event_id} not found"),
            ));
        }
        let status: String = conn
            .query_row(
                "SELECT status FROM order_events WHERE id = ?1",
                params![event_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(internal)?
            .ok_or_else(|| {
                StoreError::new(
                    StoreErrorCode::NotFound,
                    format!("order event {event_id} not found"),
                )
            })?;
        OutboxStatus::parse(&status)
            .map_err(|e| StoreError::new(StoreErrorCode::Internal, e.to_string()))
    }
}
