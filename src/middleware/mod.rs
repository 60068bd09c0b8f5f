pub mod auth;

pub use auth::{CurrentAdmin, CurrentCustomer};
