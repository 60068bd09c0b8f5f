use async_trait::async_trait;
use sqlx::{types::Json, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use super::{DateRange, OrderFilter, ProductFilter, Store, StoreError, StoreResult};
use crate::{
    database::{init_schema, Database},
    models::{
        Category, DashboardStats, NewCategory, NewOrder, NewPromo, NewUser, Order,
        OrderProductType, OrderStatus, OrderSummary, Product, ProductInput, PromoCode,
        StatusCount, Totals, User, Variant, VariantInput,
    },
};

const PRODUCT_SELECT: &str = r#"
    SELECT p.*, c.name AS category_name
    FROM products p LEFT JOIN categories c ON p.category_id = c.id
    WHERE 1=1
"#;

/// `Store` backed by the Postgres pool.
#[derive(Clone)]
pub struct PgStore {
    pool: Database,
}

impl PgStore {
    pub fn new(pool: Database) -> Self {
        Self { pool }
    }

    pub async fn init_schema(&self) -> Result<(), sqlx::Error> {
        init_schema(&self.pool).await
    }

    async fn attach_variants(&self, products: &mut [Product]) -> StoreResult<()> {
        let ids: Vec<Uuid> = products
            .iter()
            .filter(|p| p.is_variable)
            .map(|p| p.id)
            .collect();
        if ids.is_empty() {
            return Ok(());
        }

        let variants = sqlx::query_as::<_, Variant>(
            "SELECT * FROM product_variants WHERE product_id = ANY($1) ORDER BY product_id, position",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        for product in products.iter_mut().filter(|p| p.is_variable) {
            product.variants = variants
                .iter()
                .filter(|v| v.product_id == product.id)
                .cloned()
                .collect();
        }
        Ok(())
    }

    async fn totals(
        &self,
        product_type: Option<OrderProductType>,
        range: DateRange,
    ) -> StoreResult<Totals> {
        let mut query = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) AS count, COALESCE(SUM(total), 0) AS revenue FROM orders WHERE 1=1",
        );
        if let Some(product_type) = product_type {
            query.push(" AND product_type = ").push_bind(product_type.as_str());
        }
        if let Some(from) = range.from {
            query.push(" AND created_at >= ").push_bind(from);
        }
        if let Some(to) = range.to {
            query.push(" AND created_at < ").push_bind(to).push(" + 1");
        }

        Ok(query.build_query_as::<Totals>().fetch_one(&self.pool).await?)
    }
}

fn unique_conflict(err: sqlx::Error, message: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(message.to_string())
        }
        _ => StoreError::Database(err),
    }
}

async fn insert_variants(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
    variants: &[VariantInput],
) -> Result<(), sqlx::Error> {
    for (position, variant) in variants.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO product_variants (product_id, position, color, size, gsm, price, stock, image)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(product_id)
        .bind(position as i32)
        .bind(&variant.color)
        .bind(&variant.size)
        .bind(&variant.gsm)
        .bind(variant.price)
        .bind(variant.stock)
        .bind(&variant.image)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (name, email, password_hash) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_conflict(e, "Email already registered"))
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        Ok(sqlx::query_as::<_, Category>(
            "SELECT * FROM categories ORDER BY parent_id NULLS FIRST, name",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn get_category(&self, id: Uuid) -> StoreResult<Option<Category>> {
        Ok(sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_category(&self, category: NewCategory) -> StoreResult<Category> {
        Ok(sqlx::query_as::<_, Category>(
            "INSERT INTO categories (name, parent_id, product_type) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(&category.name)
        .bind(category.parent_id)
        .bind(category.product_type.as_str())
        .fetch_one(&self.pool)
        .await?)
    }

    async fn delete_category(&self, id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1 OR parent_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn list_products(&self, filter: ProductFilter) -> StoreResult<Vec<Product>> {
        let mut query = QueryBuilder::<Postgres>::new(PRODUCT_SELECT);
        if filter.active_only {
            query.push(" AND p.active = TRUE");
        }
        if let Some(product_type) = filter.product_type {
            query.push(" AND p.product_type = ").push_bind(product_type.as_str());
        }
        query.push(" ORDER BY p.created_at DESC");

        let mut products = query
            .build_query_as::<Product>()
            .fetch_all(&self.pool)
            .await?;
        self.attach_variants(&mut products).await?;
        Ok(products)
    }

    async fn get_product(&self, id: Uuid, active_only: bool) -> StoreResult<Option<Product>> {
        let mut query = QueryBuilder::<Postgres>::new(PRODUCT_SELECT);
        query.push(" AND p.id = ").push_bind(id);
        if active_only {
            query.push(" AND p.active = TRUE");
        }

        let Some(product) = query
            .build_query_as::<Product>()
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let mut products = [product];
        self.attach_variants(&mut products).await?;
        let [product] = products;
        Ok(Some(product))
    }

    async fn create_product(&self, product: ProductInput) -> StoreResult<Uuid> {
        let mut tx = self.pool.begin().await?;

        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO products (
                product_type, category_id, name, description, original_price, sale_price,
                stock, is_variable, images, pricing, badge, active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id
            "#,
        )
        .bind(product.product_type.as_str())
        .bind(product.category_id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.original_price)
        .bind(product.sale_price)
        .bind(product.stored_stock())
        .bind(product.is_variable)
        .bind(Json(&product.images))
        .bind(product.pricing.as_ref().map(Json))
        .bind(&product.badge)
        .bind(product.active)
        .fetch_one(&mut *tx)
        .await?;

        if product.is_variable {
            if let Some(variants) = &product.variants {
                insert_variants(&mut tx, id, variants).await?;
            }
        }

        tx.commit().await?;
        Ok(id)
    }

    async fn update_product(&self, id: Uuid, product: ProductInput) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE products SET
                product_type = $1, category_id = $2, name = $3, description = $4,
                original_price = $5, sale_price = $6, stock = $7, is_variable = $8,
                images = $9, pricing = $10, badge = $11, active = $12
            WHERE id = $13
            "#,
        )
        .bind(product.product_type.as_str())
        .bind(product.category_id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.original_price)
        .bind(product.sale_price)
        .bind(product.stored_stock())
        .bind(product.is_variable)
        .bind(Json(&product.images))
        .bind(product.pricing.as_ref().map(Json))
        .bind(&product.badge)
        .bind(product.active)
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            return Ok(false);
        }

        if product.is_variable {
            if let Some(variants) = &product.variants {
                sqlx::query("DELETE FROM product_variants WHERE product_id = $1")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                insert_variants(&mut tx, id, variants).await?;
            }
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn delete_product(&self, id: Uuid) -> StoreResult<bool> {
        // product_variants rows go with it (ON DELETE CASCADE)
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_promos(&self) -> StoreResult<Vec<PromoCode>> {
        Ok(sqlx::query_as::<_, PromoCode>("SELECT * FROM promo_codes ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?)
    }

    async fn find_active_promo(&self, code: &str) -> StoreResult<Option<PromoCode>> {
        Ok(sqlx::query_as::<_, PromoCode>(
            "SELECT * FROM promo_codes WHERE code = $1 AND active = TRUE",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn create_promo(&self, promo: NewPromo) -> StoreResult<Uuid> {
        sqlx::query_scalar(
            r#"
            INSERT INTO promo_codes (code, discount_type, discount_value, min_order, max_uses, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&promo.code)
        .bind(promo.discount_type.as_str())
        .bind(promo.discount_value)
        .bind(promo.min_order)
        .bind(promo.max_uses)
        .bind(promo.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_conflict(e, "Code already exists"))
    }

    async fn set_promo_active(&self, id: Uuid, active: bool) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE promo_codes SET active = $1 WHERE id = $2")
            .bind(active)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_promo(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM promo_codes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn place_order(&self, order: NewOrder) -> StoreResult<Uuid> {
        let mut tx = self.pool.begin().await?;

        if let Some(code) = &order.promo_code {
            // Concurrent redemptions serialize on the row lock and the
            // limit is re-checked against the committed count.
            let redeemed = sqlx::query(
                r#"
                UPDATE promo_codes SET used_count = used_count + 1
                WHERE code = $1 AND active = TRUE
                  AND (max_uses IS NULL OR used_count < max_uses)
                "#,
            )
            .bind(code)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            if redeemed == 0 {
                return Err(StoreError::PromoUnavailable(code.clone()));
            }
        }

        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO orders (
                user_id, product_type, items, subtotal, discount, total, promo_code,
                customer_name, customer_email, customer_phone, customer_address
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id
            "#,
        )
        .bind(order.user_id)
        .bind(order.product_type.as_str())
        .bind(Json(&order.items))
        .bind(order.invoice.subtotal)
        .bind(order.invoice.discount)
        .bind(order.invoice.total)
        .bind(&order.promo_code)
        .bind(&order.contact.name)
        .bind(&order.contact.email)
        .bind(&order.contact.phone)
        .bind(&order.contact.address)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(id)
    }

    async fn get_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
        Ok(sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_orders(&self, filter: OrderFilter) -> StoreResult<Vec<Order>> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM orders WHERE 1=1");
        if let Some(product_type) = filter.product_type {
            query.push(" AND product_type = ").push_bind(product_type.as_str());
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        query.push(" ORDER BY created_at DESC");

        Ok(query.build_query_as::<Order>().fetch_all(&self.pool).await?)
    }

    async fn list_orders_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Order>> {
        Ok(sqlx::query_as::<_, Order>(
            "SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn update_order_status(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE orders SET status = $1 WHERE id = $2 AND status = $3")
            .bind(to.as_str())
            .bind(id)
            .bind(from.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn dashboard(&self, range: DateRange) -> StoreResult<DashboardStats> {
        let total = self.totals(None, range).await?;
        let tshirt = self.totals(Some(OrderProductType::Tshirt), range).await?;
        let jewellery = self.totals(Some(OrderProductType::Jewellery), range).await?;

        let recent_orders = sqlx::query_as::<_, OrderSummary>(
            r#"
            SELECT id, customer_name, product_type, total, status, created_at
            FROM orders ORDER BY created_at DESC LIMIT 5
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let status_breakdown = sqlx::query_as::<_, StatusCount>(
            "SELECT status, COUNT(*) AS count FROM orders GROUP BY status ORDER BY status",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(DashboardStats {
            total,
            tshirt,
            jewellery,
            recent_orders,
            status_breakdown,
        })
    }
}
