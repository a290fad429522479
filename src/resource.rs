//! Per-type handlers the provider dispatches to.
//!
//! Each resource and data source type is one value implementing [`Resource`]
//! or [`DataSource`]. Handlers get the configured client through
//! [`ProviderData`]; they hold no client of their own.

use serde_json::Value;

use crate::error::ProviderError;
use crate::provider::ProviderData;
use crate::schema::Schema;
use crate::types::PlanResult;

/// A managed resource type.
#[async_trait::async_trait]
pub trait Resource: Send + Sync {
    /// Type name the host refers to, e.g. `hashicups_order`.
    fn type_name(&self) -> &'static str;

    /// Attribute schema of the resource.
    fn schema(&self) -> Schema;

    /// Compute the planned state. `proposed_state` is `Null` for a destroy plan.
    async fn plan(
        &self,
        prior_state: Option<Value>,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError>;

    /// Create the resource from a planned state and return the new state.
    async fn create(&self, data: &ProviderData, planned_state: Value)
        -> Result<Value, ProviderError>;

    /// Refresh `current_state` from the remote system.
    async fn read(&self, data: &ProviderData, current_state: Value)
        -> Result<Value, ProviderError>;

    /// Apply a planned change to an existing resource.
    async fn update(
        &self,
        data: &ProviderData,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError>;

    /// Delete the resource.
    async fn delete(&self, data: &ProviderData, current_state: Value)
        -> Result<(), ProviderError>;
}

/// A read-only data source type.
#[async_trait::async_trait]
pub trait DataSource: Send + Sync {
    /// Type name the host refers to, e.g. `hashicups_coffees`.
    fn type_name(&self) -> &'static str;

    /// Attribute schema of the data source.
    fn schema(&self) -> Schema;

    /// Read the data source and return its full state.
    async fn read(&self, data: &ProviderData, config: Value) -> Result<Value, ProviderError>;
}
