// SPDX-License-Identifier: Apache-2.0

use crate::catalog::internal;
use crate::outbox::EVENT_ORDER_PLACED;
use crate::{unix_now, Store, StoreError, StoreErrorCode};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::fmt::{Display, Formatter};
use toko_model::{
    status_with_tracking, CityId, InvoiceNumber, Order, OrderDraft, OrderId, OrderLine,
    OrderStatus, PaymentCustomer, PaymentItem, PaymentMethod, PaymentRequest, ProductId,
    ShippingAddress, StateId, UserId, SHIPPING_ITEM_ID,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentGatewayError(pub String);

impl Display for PaymentGatewayError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for PaymentGatewayError {}

/// Issues a payment token for an order about to be committed. Called from
/// inside the placement transaction, so a failure here rolls the whole
/// order back.
pub trait PaymentGateway: Send + Sync {
    fn create_transaction(&self, request: &PaymentRequest) -> Result<String, PaymentGatewayError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderDetail {
    pub order: Order,
    pub lines: Vec<OrderLine>,
}

struct CartPick {
    line_id: i64,
    product_id: i64,
    quantity: u32,
    name: String,
    price: f64,
    weight_kg: f64,
}

struct OrderRow {
    id: i64,
    user_id: i64,
    invoice_number: Option<String>,
    payment_method: String,
    status: i64,
    courier: String,
    shipping_service: String,
    recipient: String,
    phone: String,
    state_id: i64,
    city_id: i64,
    street: String,
    postal_code: String,
    sub_total: f64,
    total_shipping: f64,
    total: f64,
    payment_token: Option<String>,
    tracking_number: Option<String>,
    payment_proof: Option<String>,
    created_at: i64,
}

const ORDER_SELECT: &str = "
    SELECT id, user_id, invoice_number, payment_method, status, courier, shipping_service,
           recipient, phone, state_id, city_id, street, postal_code,
           sub_total, total_shipping, total, payment_token, tracking_number, payment_proof,
           created_at
    FROM orders";

impl Store {
    /// Turns the user's cart into an order atomically.
    ///
    /// Within one transaction: the cart is re-read, order and line rows are
    /// written with price/weight snapshots, stock is decremented only where
    /// enough remains, the invoice number is derived from the fresh order
    /// id, an online order asks the gateway for a token, the consumed cart
    /// lines are dropped, and an `order_placed` event row joins the commit.
    /// Any failure leaves no trace: no order, no stock change, cart intact.
    pub fn place_order(
        &self,
        user: UserId,
        draft: &OrderDraft,
        gateway: &dyn PaymentGateway,
    ) -> Result<OrderDetail, StoreError> {
        draft
            .validate()
            .map_err(|e| StoreError::new(StoreErrorCode::Validation, e.to_string()))?;
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(internal)?;

        let picks = cart_picks(&tx, user)?;
        if picks.is_empty() {
            return Err(StoreError::new(
                StoreErrorCode::EmptyCart,
                "cart has no lines",
            ));
        }

        let sub_total: f64 = picks
            .iter()
            .map(|p| f64::from(p.quantity) * p.price)
            .sum();
        let total = sub_total + draft.total_shipping;
        let now = unix_now();

        tx.execute(
            "INSERT INTO orders (user_id, payment_method, status, courier, shipping_service,
                                 recipient, phone, state_id, city_id, street, postal_code,
                                 sub_total, total_shipping, total, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                user.get(),
                draft.payment_method.as_str(),
                OrderStatus::Pending.code(),
                draft.courier,
                draft.shipping_service,
                draft.address.recipient,
                draft.address.phone,
                draft.address.state_id.get(),
                draft.address.city_id.get(),
                draft.address.street,
                draft.address.postal_code,
                sub_total,
                draft.total_shipping,
                total,
                now
            ],
        )
        .map_err(internal)?;
        let order_rowid = tx.last_insert_rowid();
        let order_id = OrderId::new(order_rowid)
            .map_err(|e| StoreError::new(StoreErrorCode::Internal, e.to_string()))?;

        let mut lines = Vec::with_capacity(picks.len());
        {
            let mut line_stmt = tx
                .prepare(
                    "INSERT INTO order_lines (order_id, product_id, product_name, quantity,
                                              unit_price, unit_weight_kg, total)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                )
                .map_err(internal)?;
            let mut stock_stmt = tx
                .prepare("UPDATE products SET stock = stock - ?1 WHERE id = ?2 AND stock >= ?1")
                .map_err(internal)?;
            for pick in &picks {
                let line_total = f64::from(pick.quantity) * pick.price;
                line_stmt
                    .execute(params![
                        order_rowid,
                        pick.product_id,
                        pick.name,
                        pick.quantity,
                        pick.price,
                        pick.weight_kg,
                        line_total
                    ])
                    .map_err(internal)?;
                let line_rowid = tx.last_insert_rowid();
                let affected = stock_stmt
                    .execute(params![pick.quantity, pick.product_id])
                    .map_err(internal)?;
                if affected == 0 {
                    return Err(StoreError::new(
                        StoreErrorCode::InsufficientStock,
                        format!(
                            "insufficient stock for '{}' (product {})",
                            pick.name, pick.product_id
                        ),
                    ));
                }
                let product_id = ProductId::new(pick.product_id)
                    .map_err(|e| StoreError::new(StoreErrorCode::Internal, e.to_string()))?;
                lines.push(OrderLine::new(
                    line_rowid,
                    order_id,
                    product_id,
                    pick.name.clone(),
                    pick.quantity,
                    pick.price,
                    pick.weight_kg,
                    line_total,
                ));
            }
        }

        let invoice = InvoiceNumber::from_order_id(order_id);
        let payment_token = match draft.payment_method {
            PaymentMethod::OnlineGateway => {
                let request = payment_request(&invoice, total, draft, &picks);
                let token = gateway
                    .create_transaction(&request)
                    .map_err(|e| StoreError::new(StoreErrorCode::PaymentGateway, e.0))?;
                Some(token)
            }
            PaymentMethod::ManualTransfer => None,
            // `PaymentMethod` is #[non_exhaustive]; both current variants are
            // handled above, so this arm is unreachable today.
            _ => unreachable!("unhandled payment method variant"),
        };
        tx.execute(
            "UPDATE orders SET invoice_number = ?1, payment_token = ?2 WHERE id = ?3",
            params![invoice.as_str(), payment_token, order_rowid],
        )
        .map_err(internal)?;

        {
            let mut drop_stmt = tx
                .prepare("DELETE FROM cart_lines WHERE id = ?1")
                .map_err(internal)?;
            for pick in &picks {
                drop_stmt.execute(params![pick.line_id]).map_err(internal)?;
            }
        }

        let payload = serde_json::json!({
            "order_id": order_rowid,
            "invoice_number": invoice.as_str(),
            "user_id": user.get(),
            "payment_method": draft.payment_method.as_str(),
            "total": total,
        })
        .to_string();
        tx.execute(
            "INSERT INTO order_events (order_id, kind, payload, status, attempts, created_at)
             VALUES (?1, ?2, ?3, 'pending', 0, ?4)",
            params![order_rowid, EVENT_ORDER_PLACED, payload, now],
        )
        .map_err(internal)?;

        tx.commit().map_err(internal)?;

        let order = Order::new(
            order_id,
            user,
            invoice,
            draft.payment_method,
            OrderStatus::Pending,
            draft.courier.clone(),
            draft.shipping_service.clone(),
            draft.address.clone(),
            sub_total,
            draft.total_shipping,
            total,
            payment_token,
            None,
            None,
            now,
        );
        Ok(OrderDetail { order, lines })
    }

    pub fn list_orders(&self, user: UserId) -> Result<Vec<Order>, StoreError> {
        let conn = self.conn()?;
        let sql = format!("{ORDER_SELECT} WHERE user_id = ?1 ORDER BY created_at DESC, id DESC");
        let mut stmt = conn.prepare(&sql).map_err(internal)?;
        let rows = stmt
            .query_map(params![user.get()], read_order_row)
            .map_err(internal)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(internal)?;
        rows.into_iter().map(order_from_row).collect()
    }

    pub fn get_order(&self, user: UserId, order_id: OrderId) -> Result<OrderDetail, StoreError> {
        let conn = self.conn()?;
        let order = read_user_order(&conn, user, order_id)?;
        let lines = order_lines(&conn, order_id)?;
        Ok(OrderDetail { order, lines })
    }

    /// Records a manual transfer receipt reference on the user's order.
    pub fn attach_payment_proof(
        &self,
        user: UserId,
        order_id: OrderId,
        proof: &str,
    ) -> Result<Order, StoreError> {
        let proof = proof.trim();
        if proof.is_empty() {
            return Err(StoreError::new(
                StoreErrorCode::Validation,
                "payment proof must not be empty",
            ));
        }
        let conn = self.conn()?;
        let current = read_user_order(&conn, user, order_id)?;
        let status = status_with_tracking(current.status, current.tracking_number.as_deref());
        conn.execute(
            "UPDATE orders SET payment_proof = ?1, status = ?2 WHERE id = ?3",
            params![proof, status.code(), order_id.get()],
        )
        .map_err(internal)?;
        read_user_order(&conn, user, order_id)
    }

    /// Admin-side shipment handoff. Stamping a tracking number moves the
    /// order to shipped in the same statement.
    pub fn set_tracking_number(
        &self,
        order_id: OrderId,
        tracking: &str,
    ) -> Result<Order, StoreError> {
        let tracking = tracking.trim();
        if tracking.is_empty() {
            return Err(StoreError::new(
                StoreErrorCode::Validation,
                "tracking number must not be empty",
            ));
        }
        let conn = self.conn()?;
        let row = conn
            .query_row(
                &format!("{ORDER_SELECT} WHERE id = ?1"),
                params![order_id.get()],
                read_order_row,
            )
            .optional()
            .map_err(internal)?;
        let current = order_from_row(row.ok_or_else(|| {
            StoreError::new(StoreErrorCode::NotFound, format!("order {order_id} not found"))
        })?)?;
        let status = status_with_tracking(current.status, Some(tracking));
        conn.execute(
            "UPDATE orders SET tracking_number = ?1, status = ?2 WHERE id = ?3",
            params![tracking, status.code(), order_id.get()],
        )
        .map_err(internal)?;
        read_user_order(&conn, current.user_id, order_id)
    }
}

fn cart_picks(conn: &Connection, user: UserId) -> Result<Vec<CartPick>, StoreError> {
    let mut stmt = conn
        .prepare(
            "SELECT c.id, c.product_id, c.quantity, p.name, p.price, p.weight_kg
             FROM cart_lines c JOIN products p ON p.id = c.product_id
             WHERE c.user_id = ?1
             ORDER BY c.id",
        )
        .map_err(internal)?;
    let picks = stmt
        .query_map(params![user.get()], |row| {
            Ok(CartPick {
                line_id: row.get(0)?,
                product_id: row.get(1)?,
                quantity: row.get(2)?,
                name: row.get(3)?,
                price: row.get(4)?,
                weight_kg: row.get(5)?,
            })
        })
        .map_err(internal)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(internal)?;
    Ok(picks)
}

fn payment_request(
    invoice: &InvoiceNumber,
    total: f64,
    draft: &OrderDraft,
    picks: &[CartPick],
) -> PaymentRequest {
    let mut items: Vec<PaymentItem> = picks
        .iter()
        .map(|p| {
            PaymentItem::new(
                p.product_id.to_string(),
                p.name.clone(),
                p.price,
                p.quantity,
            )
        })
        .collect();
    if draft.total_shipping > 0.0 {
        items.push(PaymentItem::new(
            SHIPPING_ITEM_ID.to_string(),
            format!("Shipping {} {}", draft.courier, draft.shipping_service),
            draft.total_shipping,
            1,
        ));
    }
    let customer = PaymentCustomer::new(
        draft.address.recipient.clone(),
        draft.address.phone.clone(),
        draft.email.clone(),
    );
    PaymentRequest::new(invoice.clone(), total, customer, items)
}

fn read_order_row(row: &Row<'_>) -> rusqlite::Result<OrderRow> {
    Ok(OrderRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        invoice_number: row.get(2)?,
        payment_method: row.get(3)?,
        status: row.get(4)?,
        courier: row.get(5)?,
        shipping_service: row.get(6)?,
        recipient: row.get(7)?,
        phone: row.get(8)?,
        state_id: row.get(9)?,
        city_id: row.get(10)?,
        street: row.get(11)?,
        postal_code: row.get(12)?,
        sub_total: row.get(13)?,
        total_shipping: row.get(14)?,
        total: row.get(15)?,
        payment_token: row.get(16)?,
        tracking_number: row.get(17)?,
        payment_proof: row.get(18)?,
        created_at: row.get(19)?,
    })
}

fn order_from_row(row: OrderRow) -> Result<Order, StoreError> {
    let corrupt = |msg: String| StoreError::new(StoreErrorCode::Internal, msg);
    let invoice_raw = row
        .invoice_number
        .ok_or_else(|| corrupt(format!("order {} has no invoice number", row.id)))?;
    let address = ShippingAddress::new(
        row.recipient,
        row.phone,
        StateId::new(row.state_id).map_err(|e| corrupt(format!("order row state: {e}")))?,
        CityId::new(row.city_id).map_err(|e| corrupt(format!("order row city: {e}")))?,
        row.street,
        row.postal_code,
    );
    Ok(Order::new(
        OrderId::new(row.id).map_err(|e| corrupt(format!("order row id: {e}")))?,
        UserId::new(row.user_id).map_err(|e| corrupt(format!("order row user: {e}")))?,
        InvoiceNumber::parse(&invoice_raw)
            .map_err(|e| corrupt(format!("order row invoice: {e}")))?,
        PaymentMethod::parse(&row.payment_method)
            .map_err(|e| corrupt(format!("order row payment method: {e}")))?,
        OrderStatus::from_code(row.status)
            .map_err(|e| corrupt(format!("order row status: {e}")))?,
        row.courier,
        row.shipping_service,
        address,
        row.sub_total,
        row.total_shipping,
        row.total,
        row.payment_token,
        row.tracking_number,
        row.payment_proof,
        row.created_at,
    ))
}

fn read_user_order(
    conn: &Connection,
    user: UserId,
    order_id: OrderId,
) -> Result<Order, StoreError> {
    let sql = format!("{ORDER_SELECT} WHERE id = ?1 AND user_id = ?2");
    let row = conn
        .query_row(&sql, params![order_id.get(), user.get()], read_order_row)
        .optional()
        .map_err(internal)?;
    let row = row.ok_or_else(|| {
        StoreError::new(StoreErrorCode::NotFound, format!("order {order_id} not found"))
    })?;
    order_from_row(row)
}

fn order_lines(conn: &Connection, order_id: OrderId) -> Result<Vec<OrderLine>, StoreError> {
    let mut stmt = conn
        .prepare(
            "SELECT id, product_id, product_name, quantity, unit_price, unit_weight_kg, total
             FROM order_lines WHERE order_id = ?1 ORDER BY id",
        )
        .map_err(internal)?;
    let rows = stmt
        .query_map(params![order_id.get()], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, u32>(3)?,
                row.get::<_, f64>(4)?,
                row.get::<_, f64>(5)?,
                row.get::<_, f64>(6)?,
            ))
        })
        .map_err(internal)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(internal)?;
    let mut lines = Vec::with_capacity(rows.len());
    for (id, product, name, quantity, unit_price, unit_weight_kg, total) in rows {
        let product_id = ProductId::new(product)
            .map_err(|e| StoreError::new(StoreErrorCode::Internal, e.to_string()))?;
        lines.push(OrderLine::new(
            id,
            order_id,
            product_id,
            name,
            quantity,
            unit_price,
            unit_weight_kg,
            total,
        ));
    }
    Ok(lines)
}
