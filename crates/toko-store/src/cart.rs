// SPDX-License-Identifier: Apache-2.0

use crate::catalog::internal;
use crate::{Store, StoreError, StoreErrorCode};
use rusqlite::{params, Connection, OptionalExtension};
use toko_model::{
    CartLine, CartLineId, CartTotals, CategoryId, Product, ProductId, Slug, UserId,
};

/// One cart line joined with the product it points at.
#[derive(Debug, Clone, PartialEq)]
pub struct CartEntry {
    pub line: CartLine,
    pub product: Product,
}

struct CartJoinRow {
    line_id: i64,
    product_id: i64,
    quantity: u32,
    name: String,
    slug: String,
    description: String,
    image: Option<String>,
    price: f64,
    weight_kg: f64,
    stock: u32,
    created_at: i64,
    category_csv: String,
}

const CART_JOIN_SELECT: &str = "
    SELECT c.id, c.product_id, c.quantity,
           p.name, p.slug, p.description, p.image, p.price, p.weight_kg, p.stock, p.created_at,
           COALESCE((SELECT GROUP_CONCAT(category_id) FROM product_categories pc
                     WHERE pc.product_id = p.id), '')
    FROM cart_lines c JOIN products p ON p.id = c.product_id
    WHERE c.user_id = ?1
    ORDER BY c.id";

impl Store {
    /// Inserts or replaces the user's line for a product. A repeated add
    /// overwrites the quantity rather than accumulating it.
    pub fn upsert_cart_line(
        &self,
        user: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartEntry, StoreError> {
        if quantity == 0 {
            return Err(StoreError::new(
                StoreErrorCode::Validation,
                "quantity must be >= 1",
            ));
        }
        let conn = self.conn()?;
        let stock: Option<u32> = conn
            .query_row(
                "SELECT stock FROM products WHERE id = ?1",
                params![product_id.get()],
                |row| row.get(0),
            )
            .optional()
            .map_err(internal)?;
        let stock = stock.ok_or_else(|| {
            StoreError::new(
                StoreErrorCode::NotFound,
                format!("product {product_id} not found"),
            )
        })?;
        if stock == 0 {
            return Err(StoreError::new(
                StoreErrorCode::Validation,
                format!("product {product_id} is out of stock"),
            ));
        }
        if quantity > stock {
            return Err(StoreError::new(
                StoreErrorCode::Validation,
                format!("quantity {quantity} exceeds available stock ({stock} left)"),
            ));
        }
        conn.execute(
            "INSERT INTO cart_lines (user_id, product_id, quantity) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id, product_id) DO UPDATE SET quantity = excluded.quantity",
            params![user.get(), product_id.get(), quantity],
        )
        .map_err(internal)?;
        let entry = cart_entry_for_product(&conn, user, product_id)?;
        entry.ok_or_else(|| {
            StoreError::new(StoreErrorCode::Internal, "cart line vanished after upsert")
        })
    }

    pub fn list_cart(&self, user: UserId) -> Result<(Vec<CartEntry>, CartTotals), StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(CART_JOIN_SELECT).map_err(internal)?;
        let rows = stmt
            .query_map(params![user.get()], read_cart_join_row)
            .map_err(internal)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(internal)?;
        let mut entries = Vec::with_capacity(rows.len());
        let mut totals = CartTotals::default();
        for row in rows {
            let entry = cart_entry_from_row(user, row)?;
            totals.add_line(entry.line.quantity, entry.product.price);
            entries.push(entry);
        }
        Ok((entries, totals))
    }

    /// Removes one line from the user's cart. Lines belonging to other
    /// users are invisible here and report not found.
    pub fn delete_cart_line(&self, user: UserId, line_id: CartLineId) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let affected = conn
            .execute(
                "DELETE FROM cart_lines WHERE id = ?1 AND user_id = ?2",
                params![line_id.get(), user.get()],
            )
            .map_err(internal)?;
        if affected == 0 {
            return Err(StoreError::new(
                StoreErrorCode::NotFound,
                format!("cart line {line_id} not found"),
            ));
        }
        Ok(())
    }

    /// Total physical weight of the cart, or `None` when the cart has no
    /// lines so callers can distinguish empty from weightless.
    pub fn cart_weight_kg(&self, user: UserId) -> Result<Option<f64>, StoreError> {
        let conn = self.conn()?;
        let (count, weight): (i64, f64) = conn
            .query_row(
                "SELECT COUNT(c.id), COALESCE(SUM(p.weight_kg * c.quantity), 0.0)
                 FROM cart_lines c JOIN products p ON p.id = c.product_id
                 WHERE c.user_id = ?1",
                params![user.get()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map_err(internal)?;
        if count == 0 {
            return Ok(None);
        }
        Ok(Some(weight))
    }
}

fn read_cart_join_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CartJoinRow> {
    Ok(CartJoinRow {
        line_id: row.get(0)?,
        product_id: row.get(1)?,
        quantity: row.get(2)?,
        name: row.get(3)?,
        slug: row.get(4)?,
        description: row.get(5)?,
        image: row.get(6)?,
        price: row.get(7)?,
        weight_kg: row.get(8)?,
        stock: row.get(9)?,
        created_at: row.get(10)?,
        category_csv: row.get(11)?,
    })
}

fn cart_entry_from_row(user: UserId, row: CartJoinRow) -> Result<CartEntry, StoreError> {
    let corrupt = |msg: String| StoreError::new(StoreErrorCode::Internal, msg);
    let line_id =
        CartLineId::new(row.line_id).map_err(|e| corrupt(format!("cart row id: {e}")))?;
    let product_id =
        ProductId::new(row.product_id).map_err(|e| corrupt(format!("cart row product: {e}")))?;
    let slug = Slug::parse(&row.slug).map_err(|e| corrupt(format!("cart row slug: {e}")))?;
    let mut category_ids = Vec::new();
    for part in row.category_csv.split(',').filter(|p| !p.is_empty()) {
        let raw = part
            .parse::<i64>()
            .map_err(|e| corrupt(format!("cart row category: {e}")))?;
        category_ids
            .push(CategoryId::new(raw).map_err(|e| corrupt(format!("cart row category: {e}")))?);
    }
    category_ids.sort();
    Ok(CartEntry {
        line: CartLine::new(line_id, user, product_id, row.quantity),
        product: Product::new(
            product_id,
            row.name,
            slug,
            row.description,
            row.image,
            row.price,
            row.weight_kg,
            row.stock,
            category_ids,
            row.created_at,
        ),
    })
}

fn cart_entry_for_product(
    conn: &Connection,
    user: UserId,
    product_id: ProductId,
) -> Result<Option<CartEntry>, StoreError> {
    let sql = "
        SELECT c.id, c.product_id, c.quantity,
               p.name, p.slug, p.description, p.image, p.price, p.weight_kg, p.stock, p.created_at,
               COALESCE((SELECT GROUP_CONCAT(category_id) FROM product_categories pc
                         WHERE pc.product_id = p.id), '')
        FROM cart_lines c JOIN products p ON p.id = c.product_id
        WHERE c.user_id = ?1 AND c.product_id = ?2";
    let row = conn
        .query_row(sql, params![user.get(), product_id.get()], read_cart_join_row)
        .optional()
        .map_err(internal)?;
    match row {
        Some(row) => Ok(Some(cart_entry_from_row(user, row)?)),
        None => Ok(None),
    }
}
