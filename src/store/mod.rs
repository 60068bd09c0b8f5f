//! Persistence gateway. Handlers talk to an `Arc<dyn Store>` injected
//! through the router state.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Category, DashboardStats, NewCategory, NewOrder, NewPromo, NewUser, Order, OrderProductType,
    OrderStatus, Product, ProductInput, ProductType, PromoCode, User,
};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique key is already taken.
    #[error("{0}")]
    Conflict(String),

    /// The promo code was exhausted, deactivated or removed before the
    /// order could redeem it. Nothing was written.
    #[error("promo code {0} is no longer redeemable")]
    PromoUnavailable(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Copy, Default)]
pub struct ProductFilter {
    pub product_type: Option<ProductType>,
    pub active_only: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OrderFilter {
    pub product_type: Option<OrderProductType>,
    pub status: Option<OrderStatus>,
}

/// Inclusive date bounds on `created_at`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Fails with `Conflict` when the email is already registered.
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Ordered by parent, then name.
    async fn list_categories(&self) -> StoreResult<Vec<Category>>;
    async fn get_category(&self, id: Uuid) -> StoreResult<Option<Category>>;
    async fn create_category(&self, category: NewCategory) -> StoreResult<Category>;
    /// Deletes the category and its direct children. Returns rows removed.
    async fn delete_category(&self, id: Uuid) -> StoreResult<u64>;

    /// Newest first, with variants attached to variable products.
    async fn list_products(&self, filter: ProductFilter) -> StoreResult<Vec<Product>>;
    async fn get_product(&self, id: Uuid, active_only: bool) -> StoreResult<Option<Product>>;
    async fn create_product(&self, product: ProductInput) -> StoreResult<Uuid>;
    /// Replaces the variant batch when the input is variable and carries
    /// variants. Returns false when the product does not exist.
    async fn update_product(&self, id: Uuid, product: ProductInput) -> StoreResult<bool>;
    /// Removes the product and its variants.
    async fn delete_product(&self, id: Uuid) -> StoreResult<bool>;

    async fn list_promos(&self) -> StoreResult<Vec<PromoCode>>;
    /// Exact match on an already normalized code, active codes only.
    async fn find_active_promo(&self, code: &str) -> StoreResult<Option<PromoCode>>;
    /// Fails with `Conflict` when the code exists.
    async fn create_promo(&self, promo: NewPromo) -> StoreResult<Uuid>;
    async fn set_promo_active(&self, id: Uuid, active: bool) -> StoreResult<bool>;
    async fn delete_promo(&self, id: Uuid) -> StoreResult<bool>;

    /// Writes the order and redeems its promo code as one unit.
    ///
    /// The redemption only happens while the code is active and below its
    /// limit; otherwise nothing is written and `PromoUnavailable` is returned.
    async fn place_order(&self, order: NewOrder) -> StoreResult<Uuid>;
    async fn get_order(&self, id: Uuid) -> StoreResult<Option<Order>>;
    /// Newest first.
    async fn list_orders(&self, filter: OrderFilter) -> StoreResult<Vec<Order>>;
    /// Newest first.
    async fn list_orders_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Order>>;
    /// Moves the order to `to` only while it is still in `from`. Returns
    /// false when the order is missing or its status moved meanwhile.
    async fn update_order_status(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> StoreResult<bool>;

    async fn dashboard(&self, range: DateRange) -> StoreResult<DashboardStats>;
}
