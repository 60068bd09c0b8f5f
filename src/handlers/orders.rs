use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_extra::extract::WithRejection;
use chrono::Utc;
use log::{info, warn};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::promos::validate_code;
use crate::{
    error::ApiError,
    middleware::{CurrentAdmin, CurrentCustomer},
    models::{
        non_blank, CreateOrderRequest, CustomerContact, LineItem, NewOrder, Order,
        OrderItemRequest, OrderProductType, OrderStatus,
    },
    pricing::{self, Selection},
    store::{OrderFilter, Store},
    AppState,
};

#[derive(Deserialize)]
pub struct OrderQuery {
    #[serde(default, rename = "type")]
    product_type: String,
    #[serde(default)]
    status: String,
}

#[derive(Deserialize)]
pub struct StatusUpdate {
    status: OrderStatus,
}

pub async fn place_order(
    State(state): State<AppState>,
    CurrentCustomer(claims): CurrentCustomer,
    WithRejection(Json(form), _): WithRejection<Json<CreateOrderRequest>, ApiError>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if form.items.is_empty() {
        return Err(ApiError::validation("Cart is empty"));
    }
    let contact = contact_from(&form)?;

    let mut items = Vec::with_capacity(form.items.len());
    for requested in &form.items {
        items.push(price_line(state.store.as_ref(), requested).await?);
    }

    if pricing::subtotal(&items) > pricing::max_amount() {
        return Err(ApiError::validation("Order total is too large"));
    }

    let promo = match non_blank(form.promo_code.clone()) {
        Some(code) => {
            let today = Utc::now().date_naive();
            Some(validate_code(state.store.as_ref(), &code, pricing::subtotal(&items), today).await?)
        }
        None => None,
    };
    let invoice = pricing::price_order(&items, promo.as_ref());

    if !invoice.agrees_with(form.subtotal, form.discount, form.total) {
        warn!(
            "Order totals from {} disagree: sent {}/{}/{}, computed {}/{}/{}",
            claims.email,
            form.subtotal,
            form.discount,
            form.total,
            invoice.subtotal,
            invoice.discount,
            invoice.total
        );
        return Err(ApiError::Conflict(
            "Prices changed, please review your cart".to_string(),
        ));
    }

    let order = NewOrder {
        user_id: Some(claims.sub),
        product_type: OrderProductType::from_items(&items),
        items,
        invoice,
        promo_code: promo.map(|quote| quote.code),
        contact,
    };
    let id = state.store.place_order(order).await?;

    info!("Order {} placed by {} for {}", id, claims.email, invoice.total);
    Ok((
        StatusCode::CREATED,
        Json(json!({ "id": id, "message": "Order placed successfully" })),
    ))
}

pub async fn my_orders(
    State(state): State<AppState>,
    CurrentCustomer(claims): CurrentCustomer,
) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(state.store.list_orders_for_user(claims.sub).await?))
}

pub async fn admin_list_orders(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    WithRejection(Query(query), _): WithRejection<Query<OrderQuery>, ApiError>,
) -> Result<Json<Vec<Order>>, ApiError> {
    let filter = OrderFilter {
        product_type: parse_filter(&query.product_type, "Invalid product type")?,
        status: parse_filter(&query.status, "Invalid status")?,
    };
    Ok(Json(state.store.list_orders(filter).await?))
}

pub async fn update_order_status(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    Path(order_id): Path<Uuid>,
    WithRejection(Json(form), _): WithRejection<Json<StatusUpdate>, ApiError>,
) -> Result<Json<Value>, ApiError> {
    let order = state
        .store
        .get_order(order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Not found".to_string()))?;

    if !order.status.can_transition_to(form.status) {
        return Err(ApiError::Conflict(format!(
            "Cannot move order from {} to {}",
            order.status, form.status
        )));
    }
    if order.status != form.status {
        let moved = state
            .store
            .update_order_status(order_id, order.status, form.status)
            .await?;
        if !moved {
            return Err(ApiError::Conflict(
                "Order status changed, please reload".to_string(),
            ));
        }
        info!("Order {} moved from {} to {}", order_id, order.status, form.status);
    }

    Ok(Json(json!({ "success": true })))
}

fn contact_from(form: &CreateOrderRequest) -> Result<CustomerContact, ApiError> {
    let contact = CustomerContact {
        name: form.customer_name.trim().to_string(),
        email: form.customer_email.trim().to_string(),
        phone: non_blank(form.customer_phone.clone()),
        address: form.customer_address.trim().to_string(),
    };
    if contact.name.is_empty() || contact.email.is_empty() || contact.address.is_empty() {
        return Err(ApiError::validation("Name, email and address required"));
    }
    Ok(contact)
}

/// Snapshots one cart line at today's catalog price.
async fn price_line(store: &dyn Store, requested: &OrderItemRequest) -> Result<LineItem, ApiError> {
    if requested.quantity == 0 {
        return Err(ApiError::validation("Quantity must be at least 1"));
    }
    if requested.quantity > OrderItemRequest::MAX_QUANTITY {
        return Err(ApiError::validation(format!(
            "Quantity cannot exceed {}",
            OrderItemRequest::MAX_QUANTITY
        )));
    }

    let product = store
        .get_product(requested.product_id, true)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))?;

    let selection = Selection {
        color: non_blank(requested.color.clone()),
        size: non_blank(requested.size.clone()),
        gsm: non_blank(requested.gsm.clone()),
    };
    let resolution = pricing::resolve(&product, &selection)?;
    if product.is_variable && !resolution.matched {
        return Err(ApiError::validation(format!(
            "Selected options are not available for {}",
            product.name
        )));
    }

    Ok(LineItem {
        product_id: product.id,
        product_type: product.product_type,
        name: product.name,
        unit_price: resolution.unit_price,
        quantity: requested.quantity,
        size: selection.size,
        gsm: selection.gsm,
        color: selection.color,
        image: resolution.image,
    })
}

fn parse_filter<T: std::str::FromStr>(raw: &str, message: &str) -> Result<Option<T>, ApiError> {
    match raw.trim() {
        "" => Ok(None),
        value => value.parse().map(Some).map_err(|_| ApiError::validation(message)),
    }
}
