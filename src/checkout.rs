//! Client-side cart and checkout flow.
//!
//! Lines are priced when they are added to the cart; the server re-prices
//! them when the order is placed and refuses the order if the totals no
//! longer agree.

use std::fmt::Display;
use std::future::Future;

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    models::{CreateOrderRequest, CustomerContact, LineItem, OrderItemRequest},
    pricing::{self, promo::discount_for, Invoice, PromoQuote},
};

/// Identity of a cart line. Adding the same key again merges quantities.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LineKey {
    pub product_id: Uuid,
    pub size: Option<String>,
    pub gsm: Option<String>,
    pub color: Option<String>,
}

impl LineKey {
    pub fn of(item: &LineItem) -> Self {
        Self {
            product_id: item.product_id,
            size: item.size.clone(),
            gsm: item.gsm.clone(),
            color: item.color.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Cart {
    lines: Vec<LineItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn add(&mut self, item: LineItem) {
        if item.quantity == 0 {
            return;
        }
        let key = LineKey::of(&item);
        match self.lines.iter_mut().find(|line| LineKey::of(line) == key) {
            Some(line) => line.quantity = line.quantity.saturating_add(item.quantity),
            None => self.lines.push(item),
        }
    }

    pub fn remove(&mut self, key: &LineKey) {
        self.lines.retain(|line| LineKey::of(line) != *key);
    }

    /// A quantity of zero or less removes the line.
    pub fn update_quantity(&mut self, key: &LineKey, quantity: i64) {
        if quantity <= 0 {
            self.remove(key);
            return;
        }
        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        if let Some(line) = self.lines.iter_mut().find(|line| LineKey::of(line) == *key) {
            line.quantity = quantity;
        }
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn total_items(&self) -> u32 {
        self.lines
            .iter()
            .fold(0u32, |total, line| total.saturating_add(line.quantity))
    }

    pub fn total_price(&self) -> Decimal {
        pricing::subtotal(&self.lines)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutStep {
    Details,
    Payment,
    Success,
}

/// What the storefront should render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Back to the cart page; there is nothing to check out.
    Cart,
    Step(CheckoutStep),
}

#[derive(Debug, Error, PartialEq)]
pub enum CheckoutError {
    #[error("Your cart is empty")]
    EmptyCart,

    #[error("cannot move from {from:?} to {to:?}")]
    InvalidTransition { from: CheckoutStep, to: CheckoutStep },

    #[error("Order could not be placed: {0}")]
    Submission(String),
}

#[derive(Debug, Clone)]
pub struct Checkout {
    cart: Cart,
    step: CheckoutStep,
    promo: Option<PromoQuote>,
}

impl Checkout {
    pub fn new(cart: Cart) -> Self {
        Self {
            cart,
            step: CheckoutStep::Details,
            promo: None,
        }
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn cart_mut(&mut self) -> &mut Cart {
        &mut self.cart
    }

    pub fn step(&self) -> CheckoutStep {
        self.step
    }

    pub fn promo(&self) -> Option<&PromoQuote> {
        self.promo.as_ref()
    }

    pub fn view(&self) -> View {
        if self.cart.is_empty() && self.step != CheckoutStep::Success {
            View::Cart
        } else {
            View::Step(self.step)
        }
    }

    pub fn continue_to_payment(&mut self) -> Result<(), CheckoutError> {
        self.transition(CheckoutStep::Details, CheckoutStep::Payment)
    }

    pub fn back_to_details(&mut self) -> Result<(), CheckoutError> {
        self.transition(CheckoutStep::Payment, CheckoutStep::Details)
    }

    fn transition(&mut self, from: CheckoutStep, to: CheckoutStep) -> Result<(), CheckoutError> {
        if self.step != from {
            return Err(CheckoutError::InvalidTransition { from: self.step, to });
        }
        if self.cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        self.step = to;
        Ok(())
    }

    /// Keeps a quote returned by the validate endpoint. Invalid quotes are ignored.
    pub fn apply_promo(&mut self, quote: PromoQuote) {
        if quote.valid {
            self.promo = Some(quote);
        }
    }

    pub fn remove_promo(&mut self) {
        self.promo = None;
    }

    /// The discount is recomputed against the current cart, the way the
    /// server will price it.
    pub fn invoice(&self) -> Invoice {
        let quote = self.promo.as_ref().map(|quote| PromoQuote {
            discount: discount_for(quote.discount_type, quote.discount_value, self.cart.total_price())
                .unwrap_or(quote.discount),
            ..quote.clone()
        });
        pricing::price_order(self.cart.lines(), quote.as_ref())
    }

    pub fn order_request(&self, contact: &CustomerContact) -> CreateOrderRequest {
        let invoice = self.invoice();
        CreateOrderRequest {
            items: self.cart.lines().iter().map(OrderItemRequest::from).collect(),
            subtotal: invoice.subtotal,
            discount: invoice.discount,
            total: invoice.total,
            promo_code: self.promo.as_ref().map(|quote| quote.code.clone()),
            customer_name: contact.name.clone(),
            customer_email: contact.email.clone(),
            customer_phone: contact.phone.clone(),
            customer_address: contact.address.clone(),
            product_type: None,
        }
    }

    /// Submits the order from the payment step.
    ///
    /// On success the checkout reaches `Success` and the cart is cleared.
    /// On failure it stays on `Payment` with the cart untouched so the
    /// shopper can retry.
    pub async fn place_order<F, Fut, E>(
        &mut self,
        contact: &CustomerContact,
        submit: F,
    ) -> Result<Uuid, CheckoutError>
    where
        F: FnOnce(CreateOrderRequest) -> Fut,
        Fut: Future<Output = Result<Uuid, E>>,
        E: Display,
    {
        if self.step != CheckoutStep::Payment {
            return Err(CheckoutError::InvalidTransition {
                from: self.step,
                to: CheckoutStep::Success,
            });
        }
        if self.cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let id = submit(self.order_request(contact))
            .await
            .map_err(|e| CheckoutError::Submission(e.to_string()))?;

        self.step = CheckoutStep::Success;
        self.cart.clear();
        self.promo = None;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DiscountKind, ProductType};

    fn tee(size: &str, price: i64, quantity: u32) -> LineItem {
        LineItem {
            product_id: Uuid::from_u128(7),
            product_type: ProductType::Tshirt,
            name: "Void Oversized Tee".to_string(),
            unit_price: Decimal::from(price),
            quantity,
            size: Some(size.to_string()),
            gsm: Some("240".to_string()),
            color: Some("Black".to_string()),
            image: None,
        }
    }

    fn contact() -> CustomerContact {
        CustomerContact {
            name: "Asha".to_string(),
            email: "asha@example.com".to_string(),
            phone: None,
            address: "12 MG Road, Pune".to_string(),
        }
    }

    fn ten_percent() -> PromoQuote {
        PromoQuote {
            valid: true,
            discount: Decimal::from(100),
            discount_type: DiscountKind::Percent,
            discount_value: Decimal::from(10),
            code: "ZUED10".to_string(),
        }
    }

    #[test]
    fn same_options_merge_into_one_line() {
        let mut cart = Cart::new();
        cart.add(tee("M", 999, 1));
        cart.add(tee("M", 999, 2));
        cart.add(tee("L", 999, 1));

        assert_eq!(cart.lines().len(), 2);
        assert_eq!(cart.total_items(), 4);
        assert_eq!(cart.total_price(), Decimal::from(3996));
    }

    #[test]
    fn merging_huge_quantities_saturates() {
        let mut cart = Cart::new();
        cart.add(tee("M", 999, u32::MAX));
        cart.add(tee("M", 999, 5));
        cart.add(tee("L", 999, 5));

        assert_eq!(cart.lines()[0].quantity, u32::MAX);
        assert_eq!(cart.total_items(), u32::MAX);
    }

    #[test]
    fn zero_quantity_removes_line() {
        let mut cart = Cart::new();
        cart.add(tee("M", 999, 1));
        let key = LineKey::of(&cart.lines()[0]);

        cart.update_quantity(&key, 3);
        assert_eq!(cart.total_items(), 3);

        cart.update_quantity(&key, 0);
        assert!(cart.is_empty());
    }

    #[test]
    fn empty_cart_renders_cart_view() {
        let mut checkout = Checkout::new(Cart::new());
        assert_eq!(checkout.view(), View::Cart);
        assert_eq!(checkout.continue_to_payment(), Err(CheckoutError::EmptyCart));
    }

    #[test]
    fn steps_follow_details_payment_with_back_edge() {
        let mut cart = Cart::new();
        cart.add(tee("M", 999, 1));
        let mut checkout = Checkout::new(cart);

        assert!(checkout.back_to_details().is_err());
        checkout.continue_to_payment().unwrap();
        assert_eq!(checkout.view(), View::Step(CheckoutStep::Payment));
        checkout.back_to_details().unwrap();
        assert_eq!(checkout.step(), CheckoutStep::Details);
    }

    #[test]
    fn promo_discount_follows_cart_changes() {
        let mut cart = Cart::new();
        cart.add(tee("M", 1000, 1));
        let mut checkout = Checkout::new(cart);
        checkout.apply_promo(ten_percent());
        assert_eq!(checkout.invoice().total, Decimal::from(900));

        checkout.cart_mut().add(tee("M", 1000, 1));
        let invoice = checkout.invoice();
        assert_eq!(invoice.discount, Decimal::from(200));
        assert_eq!(invoice.total, Decimal::from(1800));

        let request = checkout.order_request(&contact());
        assert_eq!(request.promo_code.as_deref(), Some("ZUED10"));
        assert_eq!(request.items.len(), 1);
        assert_eq!(request.items[0].quantity, 2);
    }

    #[tokio::test]
    async fn failed_submission_keeps_cart_on_payment() {
        let mut cart = Cart::new();
        cart.add(tee("M", 999, 1));
        let mut checkout = Checkout::new(cart);
        checkout.continue_to_payment().unwrap();

        let result = checkout
            .place_order(&contact(), |_| async { Err::<Uuid, _>("Server error") })
            .await;

        assert_eq!(
            result,
            Err(CheckoutError::Submission("Server error".to_string()))
        );
        assert_eq!(checkout.step(), CheckoutStep::Payment);
        assert_eq!(checkout.cart().total_items(), 1);
    }

    #[tokio::test]
    async fn placed_order_clears_cart() {
        let mut cart = Cart::new();
        cart.add(tee("M", 999, 1));
        let mut checkout = Checkout::new(cart);
        checkout.continue_to_payment().unwrap();

        let order_id = Uuid::new_v4();
        let placed = checkout
            .place_order(&contact(), |request| async move {
                assert_eq!(request.total, Decimal::from(999));
                Ok::<_, String>(order_id)
            })
            .await
            .unwrap();

        assert_eq!(placed, order_id);
        assert_eq!(checkout.view(), View::Step(CheckoutStep::Success));
        assert!(checkout.cart().is_empty());
    }

    #[tokio::test]
    async fn cannot_place_order_from_details() {
        let mut cart = Cart::new();
        cart.add(tee("M", 999, 1));
        let mut checkout = Checkout::new(cart);

        let result = checkout
            .place_order(&contact(), |_| async { Ok::<_, String>(Uuid::new_v4()) })
            .await;
        assert!(matches!(result, Err(CheckoutError::InvalidTransition { .. })));
    }
}
