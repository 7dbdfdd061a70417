// SPDX-License-Identifier: Apache-2.0

use crate::{unix_now, Store, StoreError, StoreErrorCode};
use rusqlite::{params, params_from_iter, types::Value, OptionalExtension, Row};
use toko_model::{
    Category, CategoryId, City, CityId, Product, ProductId, Shop, Slug, State, StateId,
};

pub const DEFAULT_PRODUCT_LIMIT: u32 = 50;
pub const MAX_PRODUCT_LIMIT: u32 = 200;

const PRODUCT_SELECT: &str = "
    SELECT p.id, p.name, p.slug, p.description, p.image, p.price, p.weight_kg, p.stock,
           p.created_at,
           COALESCE((SELECT GROUP_CONCAT(category_id) FROM product_categories pc
                     WHERE pc.product_id = p.id), '')
    FROM products p";

/// Result ordering for product listings. `Newest` is the storefront
/// default; ties always break on id so pages are stable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProductOrder {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
}

impl ProductOrder {
    const fn sql(self) -> &'static str {
        match self {
            Self::Newest => "p.created_at DESC, p.id DESC",
            Self::PriceAsc => "p.price ASC, p.id ASC",
            Self::PriceDesc => "p.price DESC, p.id DESC",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFilter {
    pub category_id: Option<CategoryId>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub search: Option<String>,
    pub in_stock_only: bool,
    pub order: ProductOrder,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub slug: Option<Slug>,
    pub description: String,
    pub image: Option<String>,
    pub price: f64,
    pub weight_kg: f64,
    pub stock: u32,
    pub category_ids: Vec<CategoryId>,
}

struct ProductRow {
    id: i64,
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

fn read_product_row(row: &Row<'_>) -> rusqlite::Result<ProductRow> {
    Ok(ProductRow {
        id: row.get(0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
        description: row.get(3)?,
        image: row.get(4)?,
        price: row.get(5)?,
        weight_kg: row.get(6)?,
        stock: row.get(7)?,
        created_at: row.get(8)?,
        category_csv: row.get(9)?,
    })
}

fn product_from_row(row: ProductRow) -> Result<Product, StoreError> {
    let corrupt = |msg: String| StoreError::new(StoreErrorCode::Internal, msg);
    let id = ProductId::new(row.id).map_err(|e| corrupt(format!("product row id: {e}")))?;
    let slug = Slug::parse(&row.slug).map_err(|e| corrupt(format!("product row slug: {e}")))?;
    let mut category_ids = Vec::new();
    for part in row.category_csv.split(',').filter(|p| !p.is_empty()) {
        let raw = part
            .parse::<i64>()
            .map_err(|e| corrupt(format!("product row category: {e}")))?;
        category_ids
            .push(CategoryId::new(raw).map_err(|e| corrupt(format!("product row category: {e}")))?);
    }
    category_ids.sort();
    Ok(Product::new(
        id,
        row.name,
        slug,
        row.description,
        row.image,
        row.price,
        row.weight_kg,
        row.stock,
        category_ids,
        row.created_at,
    ))
}

fn named_rows(
    conn: &rusqlite::Connection,
    table: &str,
    search: Option<&str>,
) -> Result<Vec<(i64, String)>, StoreError> {
    let mut sql = format!("SELECT id, name FROM {table}");
    let mut params_list: Vec<Value> = Vec::new();
    if let Some(term) = search {
        sql.push_str(" WHERE name LIKE ? ESCAPE '!'");
        params_list.push(Value::Text(like_pattern(term)));
    }
    sql.push_str(" ORDER BY name, id");
    let mut stmt = conn.prepare(&sql).map_err(internal)?;
    let rows = stmt
        .query_map(params_from_iter(params_list.iter()), |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })
        .map_err(internal)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(internal)?;
    Ok(rows)
}

impl Store {
    pub fn list_categories(&self, search: Option<&str>) -> Result<Vec<Category>, StoreError> {
        let conn = self.conn()?;
        let rows = named_rows(&conn, "categories", search)?;
        let mut out = Vec::with_capacity(rows.len());
        for (id, name) in rows {
            let id = CategoryId::new(id)
                .map_err(|e| StoreError::new(StoreErrorCode::Internal, e.to_string()))?;
            out.push(Category::new(id, name));
        }
        Ok(out)
    }

    pub fn insert_category(&self, name: &str) -> Result<Category, StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::new(
                StoreErrorCode::Validation,
                "category name must not be empty",
            ));
        }
        let conn = self.conn()?;
        conn.execute("INSERT INTO categories (name) VALUES (?1)", params![name])
            .map_err(constraint_to_conflict("category name already exists"))?;
        let id = CategoryId::new(conn.last_insert_rowid())
            .map_err(|e| StoreError::new(StoreErrorCode::Internal, e.to_string()))?;
        Ok(Category::new(id, name.to_string()))
    }

    pub fn list_states(&self, search: Option<&str>) -> Result<Vec<State>, StoreError> {
        let conn = self.conn()?;
        let rows = named_rows(&conn, "states", search)?;
        let mut out = Vec::with_capacity(rows.len());
        for (id, name) in rows {
            let id = StateId::new(id)
                .map_err(|e| StoreError::new(StoreErrorCode::Internal, e.to_string()))?;
            out.push(State::new(id, name));
        }
        Ok(out)
    }

    pub fn insert_state(&self, name: &str) -> Result<State, StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::new(
                StoreErrorCode::Validation,
                "state name must not be empty",
            ));
        }
        let conn = self.conn()?;
        conn.execute("INSERT INTO states (name) VALUES (?1)", params![name])
            .map_err(constraint_to_conflict("state name already exists"))?;
        let id = StateId::new(conn.last_insert_rowid())
            .map_err(|e| StoreError::new(StoreErrorCode::Internal, e.to_string()))?;
        Ok(State::new(id, name.to_string()))
    }

    pub fn list_cities(&self, state_id: Option<StateId>) -> Result<Vec<City>, StoreError> {
        let conn = self.conn()?;
        let mut sql = String::from("SELECT id, state_id, name FROM cities");
        let mut params_list: Vec<Value> = Vec::new();
        if let Some(state) = state_id {
            sql.push_str(" WHERE state_id = ?");
            params_list.push(Value::Integer(state.get()));
        }
        sql.push_str(" ORDER BY name, id");
        let mut stmt = conn.prepare(&sql).map_err(internal)?;
        let rows = stmt
            .query_map(params_from_iter(params_list.iter()), |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(internal)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(internal)?;
        let mut out = Vec::with_capacity(rows.len());
        for (id, state, name) in rows {
            let id = CityId::new(id)
                .map_err(|e| StoreError::new(StoreErrorCode::Internal, e.to_string()))?;
            let state_id = StateId::new(state)
                .map_err(|e| StoreError::new(StoreErrorCode::Internal, e.to_string()))?;
            out.push(City::new(id, state_id, name));
        }
        Ok(out)
    }

    pub fn insert_city(&self, state_id: StateId, name: &str) -> Result<City, StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::new(
                StoreErrorCode::Validation,
                "city name must not be empty",
            ));
        }
        let conn = self.conn()?;
        let state_exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM states WHERE id = ?1)",
                params![state_id.get()],
                |row| row.get(0),
            )
            .map_err(internal)?;
        if !state_exists {
            return Err(StoreError::new(
                StoreErrorCode::NotFound,
                format!("state {state_id} not found"),
            ));
        }
        conn.execute(
            "INSERT INTO cities (state_id, name) VALUES (?1, ?2)",
            params![state_id.get(), name],
        )
        .map_err(internal)?;
        let id = CityId::new(conn.last_insert_rowid())
            .map_err(|e| StoreError::new(StoreErrorCode::Internal, e.to_string()))?;
        Ok(City::new(id, state_id, name.to_string()))
    }

    pub fn set_shop_profile(&self, shop: &Shop) -> Result<(), StoreError> {
        shop.validate()
            .map_err(|e| StoreError::new(StoreErrorCode::Validation, e.to_string()))?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO shop_profile (id, name, owner, email, phone, state_id, city_id, address)
             VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
               name = excluded.name, owner = excluded.owner, email = excluded.email,
               phone = excluded.phone, state_id = excluded.state_id,
               city_id = excluded.city_id, address = excluded.address",
            params![
                shop.name,
                shop.owner,
                shop.email,
                shop.phone,
                shop.state_id.get(),
                shop.city_id.get(),
                shop.address
            ],
        )
        .map_err(internal)?;
        Ok(())
    }

    pub fn shop_profile(&self) -> Result<Shop, StoreError> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT name, owner, email, phone, state_id, city_id, address
                 FROM shop_profile WHERE id = 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, i64>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                },
            )
            .optional()
            .map_err(internal)?;
        let (name, owner, email, phone, state, city, address) = row.ok_or_else(|| {
            StoreError::new(StoreErrorCode::NotFound, "shop profile not configured")
        })?;
        let state_id = StateId::new(state)
            .map_err(|e| StoreError::new(StoreErrorCode::Internal, e.to_string()))?;
        let city_id = CityId::new(city)
            .map_err(|e| StoreError::new(StoreErrorCode::Internal, e.to_string()))?;
        Ok(Shop::new(name, owner, email, phone, state_id, city_id, address))
    }

    pub fn insert_product(&self, new: &NewProduct) -> Result<Product, StoreError> {
        let invalid = |msg: &str| StoreError::new(StoreErrorCode::Validation, msg.to_string());
        if new.name.trim().is_empty() {
            return Err(invalid("product name must not be empty"));
        }
        if !new.price.is_finite() || new.price < 0.0 {
            return Err(invalid("product price must be >= 0"));
        }
        if !new.weight_kg.is_finite() || new.weight_kg <= 0.0 {
            return Err(invalid("product weight must be > 0"));
        }
        let slug = match &new.slug {
            Some(slug) => slug.clone(),
            None => Slug::from_name(&new.name)
                .map_err(|e| StoreError::new(StoreErrorCode::Validation, e.to_string()))?,
        };
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(internal)?;
        tx.execute(
            "INSERT INTO products (name, slug, description, image, price, weight_kg, stock, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                new.name,
                slug.as_str(),
                new.description,
                new.image,
                new.price,
                new.weight_kg,
                new.stock,
                unix_now()
            ],
        )
        .map_err(constraint_to_conflict("product slug already exists"))?;
        let rowid = tx.last_insert_rowid();
        {
            let mut stmt = tx
                .prepare("INSERT INTO product_categories (product_id, category_id) VALUES (?1, ?2)")
                .map_err(internal)?;
            for category in &new.category_ids {
                stmt.execute(params![rowid, category.get()]).map_err(|e| {
                    match constraint_kind(&e) {
                        Some(_) => StoreError::new(
                            StoreErrorCode::Validation,
                            format!("category {category} does not exist"),
                        ),
                        None => internal(e),
                    }
                })?;
            }
        }
        tx.commit().map_err(internal)?;
        drop(conn);
        let id = ProductId::new(rowid)
            .map_err(|e| StoreError::new(StoreErrorCode::Internal, e.to_string()))?;
        self.get_product(id)
    }

    pub fn update_product_stock(&self, id: ProductId, stock: u32) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let affected = conn
            .execute(
                "UPDATE products SET stock = ?1 WHERE id = ?2",
                params![stock, id.get()],
            )
            .map_err(internal)?;
        if affected == 0 {
            return Err(StoreError::new(
                StoreErrorCode::NotFound,
                format!("product {id} not found"),
            ));
        }
        Ok(())
    }

    pub fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, StoreError> {
        let mut where_parts: Vec<String> = Vec::new();
        let mut params_list: Vec<Value> = Vec::new();
        if let Some(category) = filter.category_id {
            where_parts.push(
                "p.id IN (SELECT product_id FROM product_categories WHERE category_id = ?)"
                    .to_string(),
            );
            params_list.push(Value::Integer(category.get()));
        }
        if let Some(min_price) = filter.min_price {
            where_parts.push("p.price >= ?".to_string());
            params_list.push(Value::Real(min_price));
        }
        if let Some(max_price) = filter.max_price {
            where_parts.push("p.price <= ?".to_string());
            params_list.push(Value::Real(max_price));
        }
        if let Some(search) = &filter.search {
            where_parts.push("p.name LIKE ? ESCAPE '!'".to_string());
            params_list.push(Value::Text(like_pattern(search)));
        }
        if filter.in_stock_only {
            where_parts.push("p.stock > 0".to_string());
        }
        let mut sql = String::from(PRODUCT_SELECT);
        if !where_parts.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_parts.join(" AND "));
        }
        sql.push_str(" ORDER BY ");
        sql.push_str(filter.order.sql());
        sql.push_str(" LIMIT ? OFFSET ?");
        let limit = filter
            .limit
            .unwrap_or(DEFAULT_PRODUCT_LIMIT)
            .min(MAX_PRODUCT_LIMIT);
        params_list.push(Value::Integer(i64::from(limit)));
        params_list.push(Value::Integer(i64::from(filter.offset.unwrap_or(0))));

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql).map_err(internal)?;
        let rows = stmt
            .query_map(params_from_iter(params_list.iter()), read_product_row)
            .map_err(internal)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(internal)?;
        rows.into_iter().map(product_from_row).collect()
    }

    pub fn get_product(&self, id: ProductId) -> Result<Product, StoreError> {
        let conn = self.conn()?;
        let sql = format!("{PRODUCT_SELECT} WHERE p.id = ?1");
        let row = conn
            .query_row(&sql, params![id.get()], read_product_row)
            .optional()
            .map_err(internal)?;
        let row = row.ok_or_else(|| {
            StoreError::new(StoreErrorCode::NotFound, format!("product {id} not found"))
        })?;
        product_from_row(row)
    }
}

pub(crate) fn internal(e: rusqlite::Error) -> StoreError {
    StoreError::new(StoreErrorCode::Internal, e.to_string())
}

// LIKE wildcards in user input are matched literally.
fn like_pattern(term: &str) -> String {
    format!(
        "%{}%",
        term.replace('!', "!!").replace('%', "!%").replace('_', "!_")
    )
}

fn constraint_kind(e: &rusqlite::Error) -> Option<()> {
    match e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Some(())
        }
        _ => None,
    }
}

fn constraint_to_conflict(message: &'static str) -> impl Fn(rusqlite::Error) -> StoreError {
    move |e| match constraint_kind(&e) {
        Some(_) => StoreError::new(StoreErrorCode::Conflict, message),
        None => internal(e),
    }
}
