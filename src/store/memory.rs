use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{DateRange, OrderFilter, ProductFilter, Store, StoreError, StoreResult};
use crate::models::{
    Category, DashboardStats, NewCategory, NewOrder, NewPromo, NewUser, Order, OrderProductType,
    OrderStatus, OrderSummary, Product, ProductInput, PromoCode, StatusCount, Totals, User,
    Variant, VariantInput,
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    categories: Vec<Category>,
    /// Insertion order; variants are kept on the product.
    products: Vec<Product>,
    promos: Vec<PromoCode>,
    orders: Vec<Order>,
}

/// In-process `Store` used by the test suite. Every operation takes the
/// table lock once, so multi-row writes are atomic here too.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn variant_rows(product_id: Uuid, variants: &[VariantInput]) -> Vec<Variant> {
    variants
        .iter()
        .map(|v| Variant {
            id: Uuid::new_v4(),
            product_id,
            color: v.color.clone(),
            size: v.size.clone(),
            gsm: v.gsm.clone(),
            price: v.price,
            stock: v.stock,
            image: v.image.clone(),
        })
        .collect()
}

impl Tables {
    fn category_name(&self, id: Option<Uuid>) -> Option<String> {
        let id = id?;
        self.categories
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.name.clone())
    }

    /// Product as a read would return it: category joined, variants only
    /// on variable products.
    fn present(&self, product: &Product) -> Product {
        let mut product = product.clone();
        product.category_name = self.category_name(product.category_id);
        if !product.is_variable {
            product.variants.clear();
        }
        product
    }
}

fn in_range(order: &Order, range: DateRange) -> bool {
    let day: NaiveDate = order.created_at.date_naive();
    range.from.map_or(true, |from| day >= from) && range.to.map_or(true, |to| day <= to)
}

fn totals<'a>(orders: impl Iterator<Item = &'a Order>) -> Totals {
    orders.fold(Totals::default(), |acc, order| Totals {
        count: acc.count + 1,
        revenue: acc.revenue + order.total,
    })
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict("Email already registered".to_string()));
        }
        let user = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let tables = self.tables.read().await;
        let mut categories = tables.categories.clone();
        // roots (no parent) first, like NULLS FIRST
        categories.sort_by(|a, b| {
            (a.parent_id.is_some(), a.parent_id, &a.name).cmp(&(
                b.parent_id.is_some(),
                b.parent_id,
                &b.name,
            ))
        });
        Ok(categories)
    }

    async fn get_category(&self, id: Uuid) -> StoreResult<Option<Category>> {
        let tables = self.tables.read().await;
        Ok(tables.categories.iter().find(|c| c.id == id).cloned())
    }

    async fn create_category(&self, category: NewCategory) -> StoreResult<Category> {
        let mut tables = self.tables.write().await;
        let category = Category {
            id: Uuid::new_v4(),
            name: category.name,
            parent_id: category.parent_id,
            product_type: category.product_type,
            created_at: Utc::now(),
        };
        tables.categories.push(category.clone());
        Ok(category)
    }

    async fn delete_category(&self, id: Uuid) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.categories.len();
        tables
            .categories
            .retain(|c| c.id != id && c.parent_id != Some(id));
        let removed = before - tables.categories.len();

        // products in a removed category become uncategorised
        let remaining: Vec<Uuid> = tables.categories.iter().map(|c| c.id).collect();
        for product in tables.products.iter_mut() {
            if product.category_id.is_some_and(|cid| !remaining.contains(&cid)) {
                product.category_id = None;
            }
        }
        Ok(removed as u64)
    }

    async fn list_products(&self, filter: ProductFilter) -> StoreResult<Vec<Product>> {
        let tables = self.tables.read().await;
        Ok(tables
            .products
            .iter()
            .rev()
            .filter(|p| !filter.active_only || p.active)
            .filter(|p| filter.product_type.map_or(true, |t| p.product_type == t))
            .map(|p| tables.present(p))
            .collect())
    }

    async fn get_product(&self, id: Uuid, active_only: bool) -> StoreResult<Option<Product>> {
        let tables = self.tables.read().await;
        Ok(tables
            .products
            .iter()
            .find(|p| p.id == id && (!active_only || p.active))
            .map(|p| tables.present(p)))
    }

    async fn create_product(&self, product: ProductInput) -> StoreResult<Uuid> {
        let mut tables = self.tables.write().await;
        let id = Uuid::new_v4();
        let variants = match (&product.variants, product.is_variable) {
            (Some(variants), true) => variant_rows(id, variants),
            _ => Vec::new(),
        };
        tables.products.push(Product {
            id,
            product_type: product.product_type,
            category_id: product.category_id,
            category_name: None,
            stock: product.stored_stock(),
            name: product.name,
            description: product.description,
            original_price: product.original_price,
            sale_price: product.sale_price,
            is_variable: product.is_variable,
            images: Json(product.images),
            pricing: product.pricing.map(Json),
            badge: product.badge,
            active: product.active,
            created_at: Utc::now(),
            variants,
        });
        Ok(id)
    }

    async fn update_product(&self, id: Uuid, product: ProductInput) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let Some(stored) = tables.products.iter_mut().find(|p| p.id == id) else {
            return Ok(false);
        };

        stored.stock = product.stored_stock();
        stored.product_type = product.product_type;
        stored.category_id = product.category_id;
        stored.name = product.name;
        stored.description = product.description;
        stored.original_price = product.original_price;
        stored.sale_price = product.sale_price;
        stored.is_variable = product.is_variable;
        stored.images = Json(product.images);
        stored.pricing = product.pricing.map(Json);
        stored.badge = product.badge;
        stored.active = product.active;
        if product.is_variable {
            if let Some(variants) = &product.variants {
                stored.variants = variant_rows(id, variants);
            }
        }
        Ok(true)
    }

    async fn delete_product(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.products.len();
        tables.products.retain(|p| p.id != id);
        Ok(tables.products.len() < before)
    }

    async fn list_promos(&self) -> StoreResult<Vec<PromoCode>> {
        let tables = self.tables.read().await;
        Ok(tables.promos.iter().rev().cloned().collect())
    }

    async fn find_active_promo(&self, code: &str) -> StoreResult<Option<PromoCode>> {
        let tables = self.tables.read().await;
        Ok(tables
            .promos
            .iter()
            .find(|p| p.code == code && p.active)
            .cloned())
    }

    async fn create_promo(&self, promo: NewPromo) -> StoreResult<Uuid> {
        let mut tables = self.tables.write().await;
        if tables.promos.iter().any(|p| p.code == promo.code) {
            return Err(StoreError::Conflict("Code already exists".to_string()));
        }
        let id = Uuid::new_v4();
        tables.promos.push(PromoCode {
            id,
            code: promo.code,
            discount_type: promo.discount_type,
            discount_value: promo.discount_value,
            min_order: promo.min_order,
            max_uses: promo.max_uses,
            used_count: 0,
            active: true,
            expires_at: promo.expires_at,
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn set_promo_active(&self, id: Uuid, active: bool) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.promos.iter_mut().find(|p| p.id == id) {
            Some(promo) => {
                promo.active = active;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_promo(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.promos.len();
        tables.promos.retain(|p| p.id != id);
        Ok(tables.promos.len() < before)
    }

    async fn place_order(&self, order: NewOrder) -> StoreResult<Uuid> {
        let mut tables = self.tables.write().await;

        if let Some(code) = &order.promo_code {
            let promo = tables
                .promos
                .iter_mut()
                .find(|p| &p.code == code && p.active && p.has_redemptions_left())
                .ok_or_else(|| StoreError::PromoUnavailable(code.clone()))?;
            promo.used_count += 1;
        }

        let id = Uuid::new_v4();
        tables.orders.push(Order {
            id,
            user_id: order.user_id,
            product_type: order.product_type,
            items: Json(order.items),
            subtotal: order.invoice.subtotal,
            discount: order.invoice.discount,
            total: order.invoice.total,
            promo_code: order.promo_code,
            status: OrderStatus::Pending,
            customer_name: order.contact.name,
            customer_email: order.contact.email,
            customer_phone: order.contact.phone,
            customer_address: order.contact.address,
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn get_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
        let tables = self.tables.read().await;
        Ok(tables.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn list_orders(&self, filter: OrderFilter) -> StoreResult<Vec<Order>> {
        let tables = self.tables.read().await;
        Ok(tables
            .orders
            .iter()
            .rev()
            .filter(|o| filter.product_type.map_or(true, |t| o.product_type == t))
            .filter(|o| filter.status.map_or(true, |s| o.status == s))
            .cloned()
            .collect())
    }

    async fn list_orders_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Order>> {
        let tables = self.tables.read().await;
        Ok(tables
            .orders
            .iter()
            .rev()
            .filter(|o| o.user_id == Some(user_id))
            .cloned()
            .collect())
    }

    async fn update_order_status(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.orders.iter_mut().find(|o| o.id == id && o.status == from) {
            Some(order) => {
                order.status = to;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn dashboard(&self, range: DateRange) -> StoreResult<DashboardStats> {
        let tables = self.tables.read().await;
        let orders: &[Order] = &tables.orders;
        let in_window = || orders.iter().filter(move |o| in_range(o, range));
        let of_type = |t: OrderProductType| in_window().filter(move |o| o.product_type == t);

        let recent_orders = orders
            .iter()
            .rev()
            .take(5)
            .map(|o| OrderSummary {
                id: o.id,
                customer_name: o.customer_name.clone(),
                product_type: o.product_type,
                total: o.total,
                status: o.status,
                created_at: o.created_at,
            })
            .collect();

        let mut counts: BTreeMap<&'static str, (OrderStatus, i64)> = BTreeMap::new();
        for order in orders {
            counts
                .entry(order.status.as_str())
                .or_insert((order.status, 0))
                .1 += 1;
        }
        let status_breakdown = counts
            .into_values()
            .map(|(status, count)| StatusCount { status, count })
            .collect();

        Ok(DashboardStats {
            total: totals(in_window()),
            tshirt: totals(of_type(OrderProductType::Tshirt)),
            jewellery: totals(of_type(OrderProductType::Jewellery)),
            recent_orders,
            status_breakdown,
        })
    }
}
