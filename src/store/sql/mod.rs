//! Relational strategy backed by SQLite through sqlx.
//!
//! Ids are integer keys; the raw path segment is parsed here and a malformed
//! id becomes [`StoreError::MalformedId`].

mod catalog;
mod people;
mod schedule;

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::SqlitePool;
use tracing::info;

use super::{failed, Entity, Operation, StoreError, StoreResult};
use crate::models::RecordId;
use crate::validation::ValidationError;

#[derive(Clone)]
pub struct SqlStore {
    pool: SqlitePool,
}

impl SqlStore {
    /// Opens the pool and creates the schema when missing.
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(failed(format!("Invalid database url {database_url}")))?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every connection to `:memory:` is its own database, so keep exactly one alive.
        let pool_options = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(failed("Failed to connect to the relational database".into()))?;

        let store = Self { pool };
        store.migrate().await?;
        info!("Relational store ready at {database_url}");
        Ok(store)
    }

    pub async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(failed("Relational database is unreachable".into()))?;
        Ok(())
    }

    async fn migrate(&self) -> StoreResult<()> {
        let statements = [
            r"
            CREATE TABLE IF NOT EXISTS persons (
                person_id INTEGER PRIMARY KEY AUTOINCREMENT,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                phone TEXT NOT NULL,
                address TEXT,
                date_of_birth TEXT NOT NULL
            )
            ",
            r"
            CREATE TABLE IF NOT EXISTS memberships (
                membership_id INTEGER PRIMARY KEY AUTOINCREMENT,
                membership_name TEXT NOT NULL,
                price_per_month REAL NOT NULL,
                access_level TEXT,
                duration TEXT,
                max_class_bookings INTEGER,
                description TEXT
            )
            ",
            r"
            CREATE TABLE IF NOT EXISTS products (
                product_id INTEGER PRIMARY KEY AUTOINCREMENT,
                product_name TEXT NOT NULL,
                description TEXT,
                price REAL NOT NULL,
                stock_quantity INTEGER NOT NULL DEFAULT 0,
                category_id INTEGER
            )
            ",
            r"
            CREATE TABLE IF NOT EXISTS members (
                member_id INTEGER PRIMARY KEY AUTOINCREMENT,
                person_id INTEGER NOT NULL UNIQUE REFERENCES persons(person_id),
                membership_id INTEGER REFERENCES memberships(membership_id) ON DELETE SET NULL,
                join_date TEXT NOT NULL
            )
            ",
            r"
            CREATE TABLE IF NOT EXISTS employees (
                employee_id INTEGER PRIMARY KEY AUTOINCREMENT,
                person_id INTEGER NOT NULL UNIQUE REFERENCES persons(person_id),
                hire_date TEXT NOT NULL,
                job_title_id INTEGER,
                department_id INTEGER,
                salary REAL NOT NULL,
                employment_status TEXT NOT NULL
            )
            ",
            r"
            CREATE TABLE IF NOT EXISTS classes (
                class_id INTEGER PRIMARY KEY AUTOINCREMENT,
                class_name TEXT NOT NULL,
                description TEXT,
                class_type TEXT,
                duration_min INTEGER,
                max_participants INTEGER NOT NULL CHECK (max_participants > 0),
                employee_id INTEGER REFERENCES employees(employee_id) ON DELETE SET NULL,
                center_id INTEGER,
                schedule_date TEXT NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL
            )
            ",
            r"
            CREATE TABLE IF NOT EXISTS bookings (
                booking_id INTEGER PRIMARY KEY AUTOINCREMENT,
                class_id INTEGER NOT NULL REFERENCES classes(class_id) ON DELETE CASCADE,
                member_id INTEGER NOT NULL REFERENCES members(member_id) ON DELETE CASCADE,
                booking_date TEXT NOT NULL,
                status TEXT NOT NULL CHECK (status IN ('CONFIRMED', 'PENDING', 'CANCELLED')),
                UNIQUE (member_id, class_id)
            )
            ",
            "CREATE INDEX IF NOT EXISTS idx_bookings_class_id ON bookings(class_id)",
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(failed("Failed to create database schema".into()))?;
        }
        Ok(())
    }

    async fn fetch_all<E: Entity>(
        &self,
        sql: &str,
        map: fn(&SqliteRow) -> Result<E, sqlx::Error>,
    ) -> StoreResult<Vec<E>> {
        let failure = Operation::Retrieve.failure::<E>();
        let rows = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(failed(failure.clone()))?;
        rows.iter()
            .map(map)
            .collect::<Result<_, _>>()
            .map_err(failed(failure))
    }

    async fn fetch_one<E: Entity>(
        &self,
        sql: &str,
        id: i64,
        map: fn(&SqliteRow) -> Result<E, sqlx::Error>,
    ) -> StoreResult<E> {
        let failure = format!("Failed to retrieve {}", E::NAME.to_lowercase());
        let row = sqlx::query(sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(failed(failure.clone()))?
            .ok_or(StoreError::NotFound(E::NAME))?;
        map(&row).map_err(failed(failure))
    }

    async fn delete_one<E: Entity>(&self, sql: &str, raw_id: &str) -> StoreResult<()> {
        let id = parse_id::<E>(raw_id)?;
        let result = sqlx::query(sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(write_error::<E>(Operation::Delete, "record"))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(E::NAME));
        }
        Ok(())
    }
}

/// Parses a raw path id into a positive integer key.
pub(crate) fn parse_id<E: Entity>(raw: &str) -> StoreResult<i64> {
    match raw.trim().parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(StoreError::MalformedId {
            entity: E::NAME,
            id: raw.to_string(),
        }),
    }
}

/// Coerces a reference carried in a payload into an integer key.
pub(crate) fn reference_key<E: Entity>(id: &RecordId) -> StoreResult<i64> {
    match id {
        RecordId::Int(key) => Ok(*key),
        RecordId::Object(raw) => parse_id::<E>(raw),
    }
}

/// Maps constraint violations to caller-facing failures; everything else is logged.
pub(crate) fn write_error<E: Entity>(
    operation: Operation,
    reference: &'static str,
) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |err| {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return StoreError::Conflict(format!("{} already exists", E::NAME));
            }
            if db_err.is_foreign_key_violation() {
                return ValidationError::UnknownReference(reference).into();
            }
            if db_err.is_check_violation() {
                return StoreError::Conflict(format!("{} violates a constraint", E::NAME));
            }
        }
        failed(operation.failure::<E>())(err)
    }
}

#[cfg(test)]
pub(crate) async fn memory_store() -> SqlStore {
    SqlStore::connect("sqlite::memory:", 1)
        .await
        .expect("in-memory store opens")
}
