//! Client for the HashiCups REST API.
//!
//! Provider code only talks to the [`HashicupsApi`] trait. [`HttpClient`] is
//! the implementation used against a real server; tests substitute
//! [`crate::testing::MockApi`].

mod error;
mod http;
pub mod models;

pub use error::ClientError;
pub use http::{HttpClient, DEFAULT_HOST, REQUEST_TIMEOUT};
pub use models::{Coffee, CoffeeRef, Ingredient, NewOrderItem, Order, OrderItem};

/// Calls the provider makes against the coffee shop API.
#[async_trait::async_trait]
pub trait HashicupsApi: Send + Sync {
    /// List every coffee on the menu.
    async fn get_coffees(&self) -> Result<Vec<Coffee>, ClientError>;

    /// Place a new order and return it as stored by the API.
    async fn create_order(&self, items: &[NewOrderItem]) -> Result<Order, ClientError>;

    /// Fetch an existing order by ID.
    async fn get_order(&self, order_id: &str) -> Result<Order, ClientError>;
}
