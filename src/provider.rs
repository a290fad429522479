//! The HashiCups provider: configuration, the configured-client gate, and
//! dispatch to the resource and data source by type name.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::client::{ClientError, HashicupsApi, HttpClient};
use crate::coffees::CoffeesDataSource;
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::order::OrderResource;
use crate::resource::{DataSource, Resource};
use crate::schema::{Attribute, Diagnostic, ProviderSchema, Schema};
use crate::server::ProviderService;
use crate::types::{PlanResult, ServerCapabilities};
use crate::validation::validate;

/// What `configure` hands to every handler: the API client, once there is one.
#[derive(Clone, Default)]
pub struct ProviderData {
    client: Option<Arc<dyn HashicupsApi>>,
}

impl ProviderData {
    /// Provider data holding a configured client.
    pub fn new(client: Arc<dyn HashicupsApi>) -> Self {
        Self {
            client: Some(client),
        }
    }

    /// Provider data before `configure` has run.
    pub fn unconfigured() -> Self {
        Self::default()
    }

    /// Whether a client has been installed.
    pub fn is_ready(&self) -> bool {
        self.client.is_some()
    }

    /// The configured client, or [`ProviderError::NotConfigured`].
    pub fn client(&self) -> Result<&Arc<dyn HashicupsApi>, ProviderError> {
        self.client.as_ref().ok_or(ProviderError::NotConfigured)
    }
}

impl fmt::Debug for ProviderData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderData")
            .field("ready", &self.is_ready())
            .finish()
    }
}

/// Builds an API client from resolved configuration.
#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    /// Connect (and sign in) to the API described by `config`.
    async fn connect(&self, config: &ProviderConfig)
        -> Result<Arc<dyn HashicupsApi>, ClientError>;
}

/// Connects with [`HttpClient::sign_in`].
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpConnector;

#[async_trait::async_trait]
impl Connector for HttpConnector {
    async fn connect(
        &self,
        config: &ProviderConfig,
    ) -> Result<Arc<dyn HashicupsApi>, ClientError> {
        let client = HttpClient::sign_in(&config.host, &config.username, &config.password).await?;
        Ok(Arc::new(client))
    }
}

/// The HashiCups provider.
///
/// Serves the `hashicups_order` resource and the `hashicups_coffees` data
/// source. Until [`ProviderService::configure`] succeeds every operation that
/// needs the API fails with "Provider not configured".
pub struct HashicupsProvider {
    connector: Box<dyn Connector>,
    data: RwLock<ProviderData>,
    resources: HashMap<&'static str, Box<dyn Resource>>,
    data_sources: HashMap<&'static str, Box<dyn DataSource>>,
}

impl HashicupsProvider {
    /// Provider that connects over HTTP.
    pub fn new() -> Self {
        Self::with_connector(HttpConnector)
    }

    /// Provider that builds its client with `connector`.
    pub fn with_connector(connector: impl Connector + 'static) -> Self {
        let resources: Vec<Box<dyn Resource>> = vec![Box::new(OrderResource)];
        let data_sources: Vec<Box<dyn DataSource>> = vec![Box::new(CoffeesDataSource)];

        Self {
            connector: Box::new(connector),
            data: RwLock::new(ProviderData::unconfigured()),
            resources: resources.into_iter().map(|r| (r.type_name(), r)).collect(),
            data_sources: data_sources
                .into_iter()
                .map(|d| (d.type_name(), d))
                .collect(),
        }
    }

    /// Snapshot of the current provider data.
    pub async fn data(&self) -> ProviderData {
        self.data.read().await.clone()
    }

    fn provider_config_schema() -> Schema {
        Schema::v0()
            .with_attribute(
                "host",
                Attribute::optional_string()
                    .with_description("URI of the HashiCups API. May also be set with HASHICUPS_HOST."),
            )
            .with_attribute(
                "username",
                Attribute::optional_string()
                    .with_description("Username for the API. May also be set with HASHICUPS_USERNAME."),
            )
            .with_attribute(
                "password",
                Attribute::optional_string()
                    .sensitive()
                    .with_description("Password for the API. May also be set with HASHICUPS_PASSWORD."),
            )
    }

    fn resource(&self, resource_type: &str) -> Result<&dyn Resource, ProviderError> {
        self.resources
            .get(resource_type)
            .map(Box::as_ref)
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))
    }

    fn data_source(&self, data_source_type: &str) -> Result<&dyn DataSource, ProviderError> {
        self.data_sources
            .get(data_source_type)
            .map(Box::as_ref)
            .ok_or_else(|| ProviderError::UnknownResource(data_source_type.to_string()))
    }
}

impl Default for HashicupsProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HashicupsProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut resources: Vec<_> = self.resources.keys().collect();
        resources.sort();
        let mut data_sources: Vec<_> = self.data_sources.keys().collect();
        data_sources.sort();
        f.debug_struct("HashicupsProvider")
            .field("resources", &resources)
            .field("data_sources", &data_sources)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl ProviderService for HashicupsProvider {
    fn schema(&self) -> ProviderSchema {
        let mut schema = ProviderSchema::new().with_provider_config(Self::provider_config_schema());
        for (name, resource) in &self.resources {
            schema = schema.with_resource(*name, resource.schema());
        }
        for (name, data_source) in &self.data_sources {
            schema = schema.with_data_source(*name, data_source.schema());
        }
        schema
    }

    // Orders plan their own removal (a null proposal yields a "removed" change).
    fn capabilities(&self) -> ServerCapabilities {
        ServerCapabilities { plan_destroy: true }
    }

    async fn validate_provider_config(
        &self,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(validate(&Self::provider_config_schema(), &config))
    }

    #[instrument(skip_all, name = "provider.configure")]
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let config = match ProviderConfig::resolve(&config) {
            Ok(config) => config,
            Err(diagnostics) => {
                warn!(diagnostics = diagnostics.len(), "Provider configuration incomplete");
                return Ok(diagnostics);
            }
        };
        debug!(host = %config.host, username = %config.username, "Creating HashiCups client");

        let client = match self.connector.connect(&config).await {
            Ok(client) => client,
            Err(e) => {
                return Ok(vec![Diagnostic::error("Unable to create client").with_detail(
                    format!("Unable to create HashiCups client:\n\n{}", e),
                )]);
            }
        };

        *self.data.write().await = ProviderData::new(client);
        info!(host = %config.host, "Configured HashiCups client");
        Ok(vec![])
    }

    async fn stop(&self) -> Result<(), ProviderError> {
        info!("Stopping HashiCups provider");
        Ok(())
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let resource = self.resource(resource_type)?;
        Ok(validate(&resource.schema(), &config))
    }

    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        _config: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.resource(resource_type)?
            .plan(prior_state, proposed_state)
            .await
    }

    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        let data = self.data().await;
        resource.create(&data, planned_state).await
    }

    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        let data = self.data().await;
        resource.read(&data, current_state).await
    }

    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        let data = self.data().await;
        resource.update(&data, prior_state, planned_state).await
    }

    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        let resource = self.resource(resource_type)?;
        let data = self.data().await;
        resource.delete(&data, current_state).await
    }

    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let data_source = self.data_source(data_source_type)?;
        Ok(validate(&data_source.schema(), &config))
    }

    async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let data_source = self.data_source(data_source_type)?;
        let data = self.data().await;
        data_source.read(&data, config).await
    }
}
