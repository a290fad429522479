//! HashiCups provider
//!
//! A plugin provider exposing the HashiCups coffee shop API to an
//! infrastructure-as-code host:
//!
//! - **`hashicups_coffees`** data source: the full menu, coffees and their ingredients
//! - **`hashicups_order`** resource: places an order and refreshes it from the API
//!
//! The host drives the provider through [`ProviderService`]. [`serve`] exposes it
//! over gRPC; [`testing::ProviderTester`] drives it in process.
//!
//! # Quick Start
//!
//! ```no_run
//! use hashicups_provider::{init_logging, serve, HashicupsProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), hashicups_provider::ProviderError> {
//!     init_logging();
//!     serve(HashicupsProvider::new()).await
//! }
//! ```
//!
//! # Handshake Protocol
//!
//! When the provider starts via [`serve`], it outputs a handshake string to stdout:
//!
//! ```text
//! PROVIDER_PLUGIN|1|127.0.0.1:50051
//! ```
//!
//! Format: `PROVIDER_PLUGIN|<protocol_version>|<address>`
//!
//! # Known limitations
//!
//! The API cannot change or cancel orders. Update only rewrites local state and
//! delete only drops the order from state.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod coffees;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod order;
pub mod price;
pub mod provider;
pub mod resource;
pub mod schema;
pub mod server;
pub mod testing;
pub mod types;
pub mod validation;

#[allow(missing_docs)]
#[allow(clippy::all)]
pub mod generated;

pub use coffees::CoffeesDataSource;
pub use config::ProviderConfig;
pub use error::ProviderError;
pub use logging::{init_logging, try_init_logging};
pub use order::OrderResource;
pub use price::Price;
pub use provider::{Connector, HashicupsProvider, HttpConnector, ProviderData};
pub use resource::{DataSource, Resource};
pub use schema::ProviderSchema;
pub use server::{
    serve, serve_on, serve_on_with_options, serve_with_options, ProviderService, ServeOptions,
};
pub use types::{
    AttributeChange, OperationResponse, PlanResult, ProviderMetadata, ServerCapabilities,
    HANDSHAKE_PREFIX, PROTOCOL_VERSION,
};
pub use validation::{is_valid, validate, validate_result};
