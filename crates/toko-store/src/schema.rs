// SPDX-License-Identifier: Apache-2.0

use crate::{StoreError, StoreErrorCode};
use rusqlite::Connection;

pub const SCHEMA_VERSION: i64 = 1;

pub(crate) fn init_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "
        PRAGMA journal_mode=WAL;
        PRAGMA synchronous=NORMAL;
        PRAGMA foreign_keys=ON;
        PRAGMA busy_timeout=5000;
        CREATE TABLE IF NOT EXISTS categories (
          id INTEGER PRIMARY KEY,
          name TEXT NOT NULL UNIQUE
        );
        CREATE TABLE IF NOT EXISTS states (
          id INTEGER PRIMARY KEY,
          name TEXT NOT NULL UNIQUE
        );
        CREATE TABLE IF NOT EXISTS cities (
          id INTEGER PRIMARY KEY,
          state_id INTEGER NOT NULL REFERENCES states(id),
          name TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS shop_profile (
          id INTEGER PRIMARY KEY CHECK (id = 1),
          name TEXT NOT NULL,
          owner TEXT NOT NULL,
          email TEXT NOT NULL,
          phone TEXT NOT NULL,
          state_id INTEGER NOT NULL REFERENCES states(id),
          city_id INTEGER NOT NULL REFERENCES cities(id),
          address TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS products (
          id INTEGER PRIMARY KEY,
          name TEXT NOT NULL,
          slug TEXT NOT NULL UNIQUE,
          description TEXT NOT NULL DEFAULT '',
          image TEXT,
          price REAL NOT NULL CHECK (price >= 0),
          weight_kg REAL NOT NULL CHECK (weight_kg > 0),
          stock INTEGER NOT NULL CHECK (stock >= 0),
          created_at INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS product_categories (
          product_id INTEGER NOT NULL REFERENCES products(id) ON DELETE CASCADE,
          category_id INTEGER NOT NULL REFERENCES categories(id) ON DELETE CASCADE,
          PRIMARY KEY (product_id, category_id)
        );
        CREATE TABLE IF NOT EXISTS cart_lines (
          id INTEGER PRIMARY KEY,
          user_id INTEGER NOT NULL,
          product_id INTEGER NOT NULL REFERENCES products(id),
          quantity INTEGER NOT NULL CHECK (quantity > 0),
          UNIQUE (user_id, product_id)
        );
        CREATE TABLE IF NOT EXISTS orders (
          id INTEGER PRIMARY KEY,
          user_id INTEGER NOT NULL,
          invoice_number TEXT UNIQUE,
          payment_method TEXT NOT NULL,
          status INTEGER NOT NULL DEFAULT 0,
          courier TEXT NOT NULL,
          shipping_service TEXT NOT NULL,
          recipient TEXT NOT NULL,
          phone TEXT NOT NULL,
          state_id INTEGER NOT NULL,
          city_id INTEGER NOT NULL,
          street TEXT NOT NULL,
          postal_code TEXT NOT NULL,
          sub_total REAL NOT NULL CHECK (sub_total >= 0),
          total_shipping REAL NOT NULL CHECK (total_shipping >= 0),
          total REAL NOT NULL CHECK (total >= 0),
          payment_token TEXT,
          tracking_number TEXT,
          payment_proof TEXT,
          created_at INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS order_lines (
          id INTEGER PRIMARY KEY,
          order_id INTEGER NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
          product_id INTEGER NOT NULL REFERENCES products(id),
          product_name TEXT NOT NULL,
          quantity INTEGER NOT NULL CHECK (quantity > 0),
          unit_price REAL NOT NULL CHECK (unit_price >= 0),
          unit_weight_kg REAL NOT NULL CHECK (unit_weight_kg > 0),
          total REAL NOT NULL CHECK (total >= 0)
        );
        CREATE TABLE IF NOT EXISTS order_events (
          id INTEGER PRIMARY KEY,
          order_id INTEGER NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
          kind TEXT NOT NULL,
          payload TEXT NOT NULL,
          status TEXT NOT NULL DEFAULT 'pending',
          attempts INTEGER NOT NULL DEFAULT 0,
          created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_cities_state ON cities(state_id);
        CREATE INDEX IF NOT EXISTS idx_products_created ON products(created_at DESC);
        CREATE INDEX IF NOT EXISTS idx_cart_lines_user ON cart_lines(user_id);
        CREATE INDEX IF NOT EXISTS idx_orders_user ON orders(user_id, created_at DESC);
        CREATE INDEX IF NOT EXISTS idx_order_lines_order ON order_lines(order_id);
        CREATE INDEX IF NOT EXISTS idx_order_events_status ON order_events(status, id);
        ",
    )
    .map_err(|e| StoreError::new(StoreErrorCode::Internal, e.to_string()))?;
    conn.execute_batch(&format!("PRAGMA user_version={SCHEMA_VERSION};"))
        .map_err(|e| StoreError::new(StoreErrorCode::Internal, e.to_string()))?;
    Ok(())
}
