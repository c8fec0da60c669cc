//! Postgres-backed document store.
//!
//! Each record type lives in its own table as a `jsonb` document next to the
//! few columns that carry constraints or are used for lookups.
//!
//! ## Error Mapping
//!
//! | PostgreSQL Error Code | StoreError | Scenario |
//! |----------------------|------------|----------|
//! | `23505` (unique violation) | `Conflict` | Duplicate email, second vendor profile for a user |
//! | Any other / non-database | `Backend` | Connection failures, decode errors, ... |
//!
//! ## Locking
//!
//! Reads through a unit of work use `SELECT … FOR UPDATE`, so the row stays
//! locked until commit or rollback. Callers that lock several products lock
//! them in ascending id order.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use bazaar_core::{OrderId, ProductId, UserId, VendorId, newest_first};
use bazaar_parties::{User, UserQuery, Vendor, VendorQuery, normalize_email};
use bazaar_products::{Product, ProductQuery};
use bazaar_sales::{Order, OrderQuery};

use super::{Store, StoreError, UnitOfWork};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        email TEXT NOT NULL,
        doc JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS users_email_key ON users (lower(email))",
    r#"
    CREATE TABLE IF NOT EXISTS vendors (
        id UUID PRIMARY KEY,
        user_id UUID NOT NULL,
        doc JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS vendors_user_id_key ON vendors (user_id)",
    r#"
    CREATE TABLE IF NOT EXISTS products (
        id UUID PRIMARY KEY,
        vendor_id UUID NOT NULL,
        doc JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS products_vendor_id_idx ON products (vendor_id)",
    r#"
    CREATE TABLE IF NOT EXISTS orders (
        id UUID PRIMARY KEY,
        user_id UUID NOT NULL,
        doc JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS orders_user_id_idx ON orders (user_id)",
];

/// Postgres-backed store.
///
/// Uses SQLx connection pool which is thread-safe (Arc + Send + Sync).
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect and make sure the schema exists.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    /// Create tables and indexes if missing. Idempotent.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("migrate", e))?;
        }
        Ok(())
    }

    async fn fetch_one_doc<T: DeserializeOwned + Send + Unpin + 'static>(
        &self,
        sql: &'static str,
        id: Uuid,
        operation: &str,
    ) -> Result<Option<T>, StoreError> {
        let row = sqlx::query(sql)
            .bind(id)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;
        row.map(|r| decode_doc(&r, operation)).transpose()
    }

    /// `sql` takes one optional uuid parameter (`$1::uuid IS NULL OR ...`).
    async fn fetch_docs<T: DeserializeOwned + Send + Unpin + 'static>(
        &self,
        sql: &'static str,
        filter: Option<Uuid>,
        operation: &str,
    ) -> Result<Vec<T>, StoreError> {
        let rows = sqlx::query(sql)
            .bind(filter)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;
        rows.iter().map(|r| decode_doc(r, operation)).collect()
    }
}

fn decode_doc<T: DeserializeOwned + Send + Unpin + 'static>(row: &PgRow, operation: &str) -> Result<T, StoreError> {
    row.try_get::<Json<T>, _>("doc")
        .map(|Json(doc)| doc)
        .map_err(|e| map_sqlx_error(operation, e))
}

#[async_trait]
impl Store for PostgresStore {
    #[instrument(skip(self), err)]
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        Ok(Box::new(PostgresUnitOfWork { tx }))
    }

    async fn user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        self.fetch_one_doc("SELECT doc FROM users WHERE id = $1", *id.as_uuid(), "load_user")
            .await
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query("SELECT doc FROM users WHERE lower(email) = $1")
            .bind(normalize_email(email))
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("load_user_by_email", e))?;
        row.map(|r| decode_doc(&r, "load_user_by_email")).transpose()
    }

    #[instrument(skip(self), err)]
    async fn users(&self, query: &UserQuery) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT doc FROM users
            WHERE ($1::text IS NULL OR doc->>'role' = $1)
              AND ($2::text IS NULL OR doc->>'status' = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(query.role.map(|r| r.as_str()))
        .bind(query.status.map(|s| s.as_str()))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_users", e))?;

        let mut users = Vec::with_capacity(rows.len());
        for row in &rows {
            let user: User = decode_doc(row, "list_users")?;
            if query.matches(&user) {
                users.push(user);
            }
        }
        Ok(users)
    }

    async fn vendor(&self, id: VendorId) -> Result<Option<Vendor>, StoreError> {
        self.fetch_one_doc("SELECT doc FROM vendors WHERE id = $1", *id.as_uuid(), "load_vendor")
            .await
    }

    async fn vendor_by_user(&self, user_id: UserId) -> Result<Option<Vendor>, StoreError> {
        self.fetch_one_doc(
            "SELECT doc FROM vendors WHERE user_id = $1",
            *user_id.as_uuid(),
            "load_vendor_by_user",
        )
        .await
    }

    #[instrument(skip(self), err)]
    async fn vendors(&self, query: &VendorQuery) -> Result<Vec<Vendor>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT doc FROM vendors
            WHERE ($1::text IS NULL OR doc->>'status' = $1)
              AND ($2::text IS NULL OR doc->>'category' = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(query.status.map(|s| s.as_str()))
        .bind(query.category.map(|c| c.as_str()))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_vendors", e))?;

        rows.iter().map(|r| decode_doc(r, "list_vendors")).collect()
    }

    async fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        self.fetch_one_doc("SELECT doc FROM products WHERE id = $1", *id.as_uuid(), "load_product")
            .await
    }

    #[instrument(skip(self), err)]
    async fn products(&self, query: &ProductQuery) -> Result<Vec<Product>, StoreError> {
        let products: Vec<Product> = self
            .fetch_docs(
                "SELECT doc FROM products WHERE ($1::uuid IS NULL OR vendor_id = $1)",
                query.vendor_id.map(Uuid::from),
                "list_products",
            )
            .await?;
        Ok(query.apply(products))
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        self.fetch_one_doc("SELECT doc FROM orders WHERE id = $1", *id.as_uuid(), "load_order")
            .await
    }

    #[instrument(skip(self), err)]
    async fn orders(&self, query: &OrderQuery) -> Result<Vec<Order>, StoreError> {
        let orders: Vec<Order> = self
            .fetch_docs(
                "SELECT doc FROM orders WHERE ($1::uuid IS NULL OR user_id = $1) ORDER BY created_at DESC",
                query.user_id.map(Uuid::from),
                "list_orders",
            )
            .await?;
        let mut orders: Vec<Order> = orders.into_iter().filter(|o| query.matches(o)).collect();
        newest_first(&mut orders);
        Ok(orders)
    }
}

/// A database transaction. Dropping it without `commit` rolls back.
struct PostgresUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

impl PostgresUnitOfWork {
    async fn lock_doc<T: DeserializeOwned + Send + Unpin + 'static>(
        &mut self,
        sql: &'static str,
        id: Uuid,
        operation: &str,
    ) -> Result<Option<T>, StoreError> {
        let row = sqlx::query(sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;
        row.map(|r| decode_doc(&r, operation)).transpose()
    }

    async fn upsert<T: Serialize + Sync>(
        &mut self,
        sql: &'static str,
        id: Uuid,
        key: KeyColumn,
        doc: &T,
        created_at: chrono::DateTime<chrono::Utc>,
        operation: &str,
    ) -> Result<(), StoreError> {
        let query = sqlx::query(sql).bind(id);
        let query = match key {
            KeyColumn::Text(text) => query.bind(text),
            KeyColumn::Uuid(uuid) => query.bind(uuid),
        };
        query
            .bind(Json(doc))
            .bind(created_at)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;
        Ok(())
    }

    async fn delete(&mut self, sql: &'static str, id: Uuid, operation: &str) -> Result<(), StoreError> {
        sqlx::query(sql)
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;
        Ok(())
    }
}

/// The indexed column stored next to a document.
enum KeyColumn {
    Text(String),
    Uuid(Uuid),
}

#[async_trait]
impl UnitOfWork for PostgresUnitOfWork {
    async fn user(&mut self, id: UserId) -> Result<Option<User>, StoreError> {
        self.lock_doc("SELECT doc FROM users WHERE id = $1 FOR UPDATE", *id.as_uuid(), "lock_user")
            .await
    }

    async fn user_by_email(&mut self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query("SELECT doc FROM users WHERE lower(email) = $1 FOR UPDATE")
            .bind(normalize_email(email))
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("lock_user_by_email", e))?;
        row.map(|r| decode_doc(&r, "lock_user_by_email")).transpose()
    }

    async fn vendor(&mut self, id: VendorId) -> Result<Option<Vendor>, StoreError> {
        self.lock_doc("SELECT doc FROM vendors WHERE id = $1 FOR UPDATE", *id.as_uuid(), "lock_vendor")
            .await
    }

    async fn vendor_by_user(&mut self, user_id: UserId) -> Result<Option<Vendor>, StoreError> {
        self.lock_doc(
            "SELECT doc FROM vendors WHERE user_id = $1 FOR UPDATE",
            *user_id.as_uuid(),
            "lock_vendor_by_user",
        )
        .await
    }

    async fn product(&mut self, id: ProductId) -> Result<Option<Product>, StoreError> {
        self.lock_doc("SELECT doc FROM products WHERE id = $1 FOR UPDATE", *id.as_uuid(), "lock_product")
            .await
    }

    async fn order(&mut self, id: OrderId) -> Result<Option<Order>, StoreError> {
        self.lock_doc("SELECT doc FROM orders WHERE id = $1 FOR UPDATE", *id.as_uuid(), "lock_order")
            .await
    }

    async fn save_user(&mut self, user: &User) -> Result<(), StoreError> {
        self.upsert(
            r#"
            INSERT INTO users (id, email, doc, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET email = EXCLUDED.email, doc = EXCLUDED.doc
            "#,
            *user.id.as_uuid(),
            KeyColumn::Text(user.email.clone()),
            user,
            user.created_at,
            "save_user",
        )
        .await
    }

    async fn save_vendor(&mut self, vendor: &Vendor) -> Result<(), StoreError> {
        self.upsert(
            r#"
            INSERT INTO vendors (id, user_id, doc, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET doc = EXCLUDED.doc
            "#,
            *vendor.id.as_uuid(),
            KeyColumn::Uuid(*vendor.user_id.as_uuid()),
            vendor,
            vendor.created_at,
            "save_vendor",
        )
        .await
    }

    async fn save_product(&mut self, product: &Product) -> Result<(), StoreError> {
        self.upsert(
            r#"
            INSERT INTO products (id, vendor_id, doc, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET doc = EXCLUDED.doc
            "#,
            *product.id.as_uuid(),
            KeyColumn::Uuid(*product.vendor_id.as_uuid()),
            product,
            product.created_at,
            "save_product",
        )
        .await
    }

    async fn save_order(&mut self, order: &Order) -> Result<(), StoreError> {
        self.upsert(
            r#"
            INSERT INTO orders (id, user_id, doc, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET doc = EXCLUDED.doc
            "#,
            *order.id.as_uuid(),
            KeyColumn::Uuid(*order.user_id.as_uuid()),
            order,
            order.created_at,
            "save_order",
        )
        .await
    }

    async fn delete_user(&mut self, id: UserId) -> Result<(), StoreError> {
        self.delete("DELETE FROM users WHERE id = $1", *id.as_uuid(), "delete_user")
            .await
    }

    async fn delete_product(&mut self, id: ProductId) -> Result<(), StoreError> {
        self.delete("DELETE FROM products WHERE id = $1", *id.as_uuid(), "delete_product")
            .await
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }
}

/// Client-facing message for a unique violation on `constraint`.
fn unique_violation_message(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some("users_email_key") => "User already exists with this email",
        Some("vendors_user_id_key") => "You already have a vendor account",
        _ => "Record already exists",
    }
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => match db_err.code() {
            Some(code) if code.as_ref() == "23505" => {
                StoreError::Conflict(unique_violation_message(db_err.constraint()).to_string())
            }
            _ => StoreError::Backend(format!("database error in {}: {}", operation, db_err.message())),
        },
        sqlx::Error::PoolClosed => StoreError::Backend(format!("connection pool closed in {}", operation)),
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}
