use async_trait::async_trait;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::{SqlStore, parse_id, write_error};
use crate::models::{Membership, MembershipInput, Product, ProductInput, RecordId};
use crate::store::{EntityStore, Operation, StoreError, StoreResult};
use crate::validation::Validate;

const SELECT_PRODUCTS: &str = "SELECT product_id, product_name, description, price, stock_quantity, category_id FROM products";

const SELECT_MEMBERSHIPS: &str = "SELECT membership_id, membership_name, price_per_month, access_level, duration, max_class_bookings, description FROM memberships";

fn product_from_row(row: &SqliteRow) -> Result<Product, sqlx::Error> {
    Ok(Product {
        id: RecordId::Int(row.try_get("product_id")?),
        details: ProductInput {
            product_name: row.try_get("product_name")?,
            description: row.try_get("description")?,
            price: row.try_get("price")?,
            stock_quantity: row.try_get("stock_quantity")?,
            category_id: row.try_get("category_id")?,
        },
    })
}

fn membership_from_row(row: &SqliteRow) -> Result<Membership, sqlx::Error> {
    Ok(Membership {
        id: RecordId::Int(row.try_get("membership_id")?),
        details: MembershipInput {
            membership_name: row.try_get("membership_name")?,
            price_per_month: row.try_get("price_per_month")?,
            access_level: row.try_get("access_level")?,
            duration: row.try_get("duration")?,
            max_class_bookings: row.try_get("max_class_bookings")?,
            description: row.try_get("description")?,
        },
    })
}

#[async_trait]
impl EntityStore<Product> for SqlStore {
    async fn get_all(&self) -> StoreResult<Vec<Product>> {
        self.fetch_all(&format!("{SELECT_PRODUCTS} ORDER BY product_id"), product_from_row)
            .await
    }

    async fn get_by_id(&self, id: &str) -> StoreResult<Product> {
        let id = parse_id::<Product>(id)?;
        self.fetch_one(
            &format!("{SELECT_PRODUCTS} WHERE product_id = ?"),
            id,
            product_from_row,
        )
        .await
    }

    async fn add(&self, input: ProductInput) -> StoreResult<Product> {
        let input = input.validated()?;
        let result = sqlx::query(
            "INSERT INTO products (product_name, description, price, stock_quantity, category_id) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&input.product_name)
        .bind(&input.description)
        .bind(input.price)
        .bind(input.stock_quantity)
        .bind(input.category_id)
        .execute(&self.pool)
        .await
        .map_err(write_error::<Product>(Operation::Create, "category"))?;

        Ok(Product {
            id: RecordId::Int(result.last_insert_rowid()),
            details: input,
        })
    }

    async fn update(&self, id: &str, input: ProductInput) -> StoreResult<Product> {
        let id = parse_id::<Product>(id)?;
        let input = input.validated()?;
        let result = sqlx::query(
            "UPDATE products SET product_name = ?, description = ?, price = ?, stock_quantity = ?, category_id = ? WHERE product_id = ?",
        )
        .bind(&input.product_name)
        .bind(&input.description)
        .bind(input.price)
        .bind(input.stock_quantity)
        .bind(input.category_id)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(write_error::<Product>(Operation::Update, "category"))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("Product"));
        }
        Ok(Product {
            id: RecordId::Int(id),
            details: input,
        })
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        self.delete_one::<Product>("DELETE FROM products WHERE product_id = ?", id)
            .await
    }
}

#[async_trait]
impl EntityStore<Membership> for SqlStore {
    async fn get_all(&self) -> StoreResult<Vec<Membership>> {
        self.fetch_all(
            &format!("{SELECT_MEMBERSHIPS} ORDER BY membership_id"),
            membership_from_row,
        )
        .await
    }

    async fn get_by_id(&self, id: &str) -> StoreResult<Membership> {
        let id = parse_id::<Membership>(id)?;
        self.fetch_one(
            &format!("{SELECT_MEMBERSHIPS} WHERE membership_id = ?"),
            id,
            membership_from_row,
        )
        .await
    }

    async fn add(&self, input: MembershipInput) -> StoreResult<Membership> {
        let input = input.validated()?;
        let result = sqlx::query(
            "INSERT INTO memberships (membership_name, price_per_month, access_level, duration, max_class_bookings, description) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&input.membership_name)
        .bind(input.price_per_month)
        .bind(&input.access_level)
        .bind(&input.duration)
        .bind(input.max_class_bookings)
        .bind(&input.description)
        .execute(&self.pool)
        .await
        .map_err(write_error::<Membership>(Operation::Create, "record"))?;

        Ok(Membership {
            id: RecordId::Int(result.last_insert_rowid()),
            details: input,
        })
    }

    async fn update(&self, id: &str, input: MembershipInput) -> StoreResult<Membership> {
        let id = parse_id::<Membership>(id)?;
        let input = input.validated()?;
        let result = sqlx::query(
            "UPDATE memberships SET membership_name = ?, price_per_month = ?, access_level = ?, duration = ?, max_class_bookings = ?, description = ? WHERE membership_id = ?",
        )
        .bind(&input.membership_name)
        .bind(input.price_per_month)
        .bind(&input.access_level)
        .bind(&input.duration)
        .bind(input.max_class_bookings)
        .bind(&input.description)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(write_error::<Membership>(Operation::Update, "record"))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("Membership"));
        }
        Ok(Membership {
            id: RecordId::Int(id),
            details: input,
        })
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        self.delete_one::<Membership>("DELETE FROM memberships WHERE membership_id = ?", id)
            .await
    }
}
