//! Server helpers for running the provider.
//!
//! This module defines the `ProviderService` trait the provider implements,
//! and the `serve` functions that start a gRPC server with the handshake protocol.
//!
//! # Signal Handling
//!
//! The server handles OS signals (SIGTERM, SIGINT) for graceful shutdown.
//! When a signal is received, the server:
//! 1. Stops accepting new connections
//! 2. Waits for in-flight requests to complete (with configurable timeout)
//! 3. Calls the provider's `stop()` method
//! 4. Exits cleanly

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::net::TcpListener;
use tonic::transport::Server;
use tracing::{debug, error, info, instrument, warn};

use crate::error::ProviderError;
use crate::generated;
use crate::schema::{
    has_errors, Attribute, AttributeKind, Diagnostic, DiagnosticSeverity, NestingMode,
    ProviderSchema, Schema,
};
use crate::types::{
    json_bytes, json_value, OperationResponse, PlanResult, ProviderMetadata, ServerCapabilities,
    HANDSHAKE_PREFIX, PROTOCOL_VERSION,
};

/// The callbacks a plugin host invokes on a provider.
///
/// Uses plain Rust types; the gRPC driver in this module and
/// [`crate::testing::ProviderTester`] both call through it.
#[async_trait::async_trait]
pub trait ProviderService: Send + Sync + 'static {
    // =========================================================================
    // Schema & Metadata
    // =========================================================================

    /// Return the provider's schema including all resources and data sources.
    fn schema(&self) -> ProviderSchema;

    /// Capabilities advertised in `GetMetadata`. None by default.
    fn capabilities(&self) -> ServerCapabilities {
        ServerCapabilities::default()
    }

    /// Return provider metadata. By default, this is derived from the schema.
    fn metadata(&self) -> ProviderMetadata {
        let schema = self.schema();
        let mut resources: Vec<String> = schema.resources.keys().cloned().collect();
        resources.sort();
        let mut data_sources: Vec<String> = schema.data_sources.keys().cloned().collect();
        data_sources.sort();
        ProviderMetadata {
            resources,
            data_sources,
            capabilities: self.capabilities(),
        }
    }

    // =========================================================================
    // Provider Lifecycle
    // =========================================================================

    /// Validate the provider configuration before configuring.
    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let _ = config;
        Ok(vec![])
    }

    /// Configure the provider with credentials and settings.
    /// Returns diagnostics (errors and warnings).
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError>;

    /// Stop the provider gracefully.
    async fn stop(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Validate a resource's configuration before planning.
    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let _ = (resource_type, config);
        Ok(vec![])
    }

    /// Plan changes for a resource.
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        config: Value,
    ) -> Result<PlanResult, ProviderError>;

    /// Create a new resource.
    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError>;

    /// Read the current state of a resource.
    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError>;

    /// Update an existing resource.
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError>;

    /// Delete a resource.
    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError>;

    // =========================================================================
    // Data Source Operations
    // =========================================================================

    /// Validate a data source's configuration.
    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let _ = (data_source_type, config);
        Ok(vec![])
    }

    /// Read data from an external source.
    async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError>;
}

/// Wrapper that implements the generated gRPC trait.
struct ProviderGrpcService<P: ProviderService> {
    provider: Arc<P>,
}

fn diagnostics_to_proto(diagnostics: Vec<Diagnostic>) -> Vec<generated::Diagnostic> {
    diagnostics
        .into_iter()
        .map(|d| generated::Diagnostic {
            severity: match d.severity {
                DiagnosticSeverity::Error => generated::diagnostic::Severity::Error as i32,
                DiagnosticSeverity::Warning => generated::diagnostic::Severity::Warning as i32,
            },
            summary: d.summary,
            detail: d.detail.unwrap_or_default(),
            attribute: d.attribute.unwrap_or_default(),
        })
        .collect()
}

fn error_to_diagnostics(err: &ProviderError) -> Vec<generated::Diagnostic> {
    diagnostics_to_proto(vec![err.to_diagnostic()])
}

// Split a callback result into wire state and diagnostics.
fn state_to_proto(result: Result<Value, ProviderError>) -> (Vec<u8>, Vec<generated::Diagnostic>) {
    let response = OperationResponse::from(result);
    let state = response.state.as_ref().map(json_bytes).unwrap_or_default();
    (state, diagnostics_to_proto(response.diagnostics))
}

fn attributes_to_proto(
    attributes: &std::collections::HashMap<String, Attribute>,
) -> Vec<generated::Attribute> {
    let mut names: Vec<&String> = attributes.keys().collect();
    names.sort();
    names
        .into_iter()
        .map(|name| attribute_to_proto(name, &attributes[name]))
        .collect()
}

fn attribute_to_proto(name: &str, attr: &Attribute) -> generated::Attribute {
    let (attr_type, nested) = match &attr.kind {
        AttributeKind::Typed(attr_type) => (serde_json::to_vec(attr_type).unwrap_or_default(), None),
        AttributeKind::Nested(nested) => (
            Vec::new(),
            Some(generated::NestedAttributes {
                nesting_mode: match nested.nesting_mode {
                    NestingMode::Single => generated::nested_attributes::NestingMode::Single as i32,
                    NestingMode::List => generated::nested_attributes::NestingMode::List as i32,
                },
                attributes: attributes_to_proto(&nested.attributes),
            }),
        ),
    };

    generated::Attribute {
        name: name.to_string(),
        r#type: attr_type,
        required: attr.flags.required,
        optional: attr.flags.optional,
        computed: attr.flags.computed,
        sensitive: attr.flags.sensitive,
        description: attr.description.clone().unwrap_or_default(),
        nested,
    }
}

fn schema_to_proto(schema: &Schema) -> generated::Schema {
    generated::Schema {
        version: schema.version as i64,
        attributes: attributes_to_proto(&schema.attributes),
        description: schema.description.clone().unwrap_or_default(),
    }
}

fn log_validation(operation: &str, type_name: &str, diagnostics: &[Diagnostic]) {
    if has_errors(diagnostics) {
        warn!(type_name = %type_name, diagnostics = diagnostics.len(), "{} completed with errors", operation);
    } else {
        info!(type_name = %type_name, "{} completed successfully", operation);
    }
}

#[tonic::async_trait]
impl<P: ProviderService> generated::provider_server::Provider for ProviderGrpcService<P> {
    #[instrument(skip(self, _request), name = "grpc.get_metadata")]
    async fn get_metadata(
        &self,
        _request: tonic::Request<generated::GetMetadataRequest>,
    ) -> Result<tonic::Response<generated::GetMetadataResponse>, tonic::Status> {
        debug!("GetMetadata called");
        let metadata = self.provider.metadata();
        info!(
            resources = metadata.resources.len(),
            data_sources = metadata.data_sources.len(),
            "GetMetadata completed"
        );
        Ok(tonic::Response::new(generated::GetMetadataResponse {
            server_capabilities: Some(generated::ServerCapabilities {
                plan_destroy: metadata.capabilities.plan_destroy,
            }),
            resources: metadata.resources,
            data_sources: metadata.data_sources,
            diagnostics: vec![],
        }))
    }

    #[instrument(skip(self, _request), name = "grpc.get_schema")]
    async fn get_schema(
        &self,
        _request: tonic::Request<generated::GetSchemaRequest>,
    ) -> Result<tonic::Response<generated::GetSchemaResponse>, tonic::Status> {
        debug!("GetSchema called");
        let schema = self.provider.schema();
        Ok(tonic::Response::new(generated::GetSchemaResponse {
            provider: Some(schema_to_proto(&schema.provider)),
            resources: schema
                .resources
                .iter()
                .map(|(k, v)| (k.clone(), schema_to_proto(v)))
                .collect(),
            data_sources: schema
                .data_sources
                .iter()
                .map(|(k, v)| (k.clone(), schema_to_proto(v)))
                .collect(),
            diagnostics: vec![],
        }))
    }

    #[instrument(skip(self, request), name = "grpc.validate_provider_config")]
    async fn validate_provider_config(
        &self,
        request: tonic::Request<generated::ValidateProviderConfigRequest>,
    ) -> Result<tonic::Response<generated::ValidateProviderConfigResponse>, tonic::Status> {
        debug!("ValidateProviderConfig called");
        let config = json_value(&request.into_inner().config);

        let diagnostics = match self.provider.validate_provider_config(config).await {
            Ok(diagnostics) => {
                log_validation("ValidateProviderConfig", "provider", &diagnostics);
                diagnostics_to_proto(diagnostics)
            }
            Err(e) => {
                error!(error = %e, "ValidateProviderConfig failed");
                error_to_diagnostics(&e)
            }
        };
        Ok(tonic::Response::new(
            generated::ValidateProviderConfigResponse { diagnostics },
        ))
    }

    #[instrument(skip(self, request), name = "grpc.configure")]
    async fn configure(
        &self,
        request: tonic::Request<generated::ConfigureRequest>,
    ) -> Result<tonic::Response<generated::ConfigureResponse>, tonic::Status> {
        debug!("Configure called");
        let config = json_value(&request.into_inner().config);

        let diagnostics = match self.provider.configure(config).await {
            Ok(diagnostics) => {
                if has_errors(&diagnostics) {
                    warn!(diagnostics = diagnostics.len(), "Configure completed with errors");
                } else {
                    info!("Configure completed successfully");
                }
                diagnostics_to_proto(diagnostics)
            }
            Err(e) => {
                error!(error = %e, "Configure failed");
                error_to_diagnostics(&e)
            }
        };
        Ok(tonic::Response::new(generated::ConfigureResponse {
            diagnostics,
        }))
    }

    #[instrument(skip(self, _request), name = "grpc.stop")]
    async fn stop(
        &self,
        _request: tonic::Request<generated::StopRequest>,
    ) -> Result<tonic::Response<generated::StopResponse>, tonic::Status> {
        info!("Stop called");
        let error = match self.provider.stop().await {
            Ok(()) => String::new(),
            Err(e) => {
                error!(error = %e, "Stop failed");
                e.to_string()
            }
        };
        Ok(tonic::Response::new(generated::StopResponse { error }))
    }

    #[instrument(skip(self, request), name = "grpc.validate_resource_config")]
    async fn validate_resource_config(
        &self,
        request: tonic::Request<generated::ValidateResourceConfigRequest>,
    ) -> Result<tonic::Response<generated::ValidateResourceConfigResponse>, tonic::Status> {
        let req = request.into_inner();
        debug!(resource_type = %req.resource_type, "ValidateResourceConfig called");
        let config = json_value(&req.config);

        let diagnostics = match self
            .provider
            .validate_resource_config(&req.resource_type, config)
            .await
        {
            Ok(diagnostics) => {
                log_validation("ValidateResourceConfig", &req.resource_type, &diagnostics);
                diagnostics_to_proto(diagnostics)
            }
            Err(e) => {
                error!(resource_type = %req.resource_type, error = %e, "ValidateResourceConfig failed");
                error_to_diagnostics(&e)
            }
        };
        Ok(tonic::Response::new(
            generated::ValidateResourceConfigResponse { diagnostics },
        ))
    }

    #[instrument(skip(self, request), name = "grpc.plan")]
    async fn plan(
        &self,
        request: tonic::Request<generated::PlanRequest>,
    ) -> Result<tonic::Response<generated::PlanResponse>, tonic::Status> {
        let req = request.into_inner();
        let is_create = req.prior_state.is_empty();
        debug!(resource_type = %req.resource_type, is_create = is_create, "Plan called");

        let prior_state = if is_create {
            None
        } else {
            Some(json_value(&req.prior_state))
        };

        match self
            .provider
            .plan(
                &req.resource_type,
                prior_state,
                json_value(&req.proposed_state),
                json_value(&req.config),
            )
            .await
        {
            Ok(result) => {
                info!(
                    resource_type = %req.resource_type,
                    changes = result.changes.len(),
                    requires_replace = result.requires_replace,
                    "Plan completed"
                );
                Ok(tonic::Response::new(generated::PlanResponse {
                    planned_state: json_bytes(&result.planned_state),
                    changes: result.changes.into_iter().map(Into::into).collect(),
                    requires_replace: result.requires_replace,
                    diagnostics: vec![],
                }))
            }
            Err(e) => {
                error!(resource_type = %req.resource_type, error = %e, "Plan failed");
                Ok(tonic::Response::new(generated::PlanResponse {
                    planned_state: vec![],
                    changes: vec![],
                    requires_replace: false,
                    diagnostics: error_to_diagnostics(&e),
                }))
            }
        }
    }

    #[instrument(skip(self, request), name = "grpc.create")]
    async fn create(
        &self,
        request: tonic::Request<generated::CreateRequest>,
    ) -> Result<tonic::Response<generated::CreateResponse>, tonic::Status> {
        let req = request.into_inner();
        info!(resource_type = %req.resource_type, "Create called");

        let result = self
            .provider
            .create(&req.resource_type, json_value(&req.planned_state))
            .await;
        match &result {
            Ok(_) => info!(resource_type = %req.resource_type, "Create completed successfully"),
            Err(e) => error!(resource_type = %req.resource_type, error = %e, "Create failed"),
        }

        let (state, diagnostics) = state_to_proto(result);
        Ok(tonic::Response::new(generated::CreateResponse {
            state,
            diagnostics,
        }))
    }

    #[instrument(skip(self, request), name = "grpc.read")]
    async fn read(
        &self,
        request: tonic::Request<generated::ReadRequest>,
    ) -> Result<tonic::Response<generated::ReadResponse>, tonic::Status> {
        let req = request.into_inner();
        debug!(resource_type = %req.resource_type, "Read called");

        let result = self
            .provider
            .read(&req.resource_type, json_value(&req.current_state))
            .await;
        match &result {
            Ok(_) => debug!(resource_type = %req.resource_type, "Read completed successfully"),
            Err(e) => error!(resource_type = %req.resource_type, error = %e, "Read failed"),
        }

        let (state, diagnostics) = state_to_proto(result);
        Ok(tonic::Response::new(generated::ReadResponse {
            state,
            diagnostics,
        }))
    }

    #[instrument(skip(self, request), name = "grpc.update")]
    async fn update(
        &self,
        request: tonic::Request<generated::UpdateRequest>,
    ) -> Result<tonic::Response<generated::UpdateResponse>, tonic::Status> {
        let req = request.into_inner();
        info!(resource_type = %req.resource_type, "Update called");

        let result = self
            .provider
            .update(
                &req.resource_type,
                json_value(&req.prior_state),
                json_value(&req.planned_state),
            )
            .await;
        match &result {
            Ok(_) => info!(resource_type = %req.resource_type, "Update completed successfully"),
            Err(e) => error!(resource_type = %req.resource_type, error = %e, "Update failed"),
        }

        let (state, diagnostics) = state_to_proto(result);
        Ok(tonic::Response::new(generated::UpdateResponse {
            state,
            diagnostics,
        }))
    }

    #[instrument(skip(self, request), name = "grpc.delete")]
    async fn delete(
        &self,
        request: tonic::Request<generated::DeleteRequest>,
    ) -> Result<tonic::Response<generated::DeleteResponse>, tonic::Status> {
        let req = request.into_inner();
        info!(resource_type = %req.resource_type, "Delete called");

        let diagnostics = match self
            .provider
            .delete(&req.resource_type, json_value(&req.current_state))
            .await
        {
            Ok(()) => {
                info!(resource_type = %req.resource_type, "Delete completed successfully");
                vec![]
            }
            Err(e) => {
                error!(resource_type = %req.resource_type, error = %e, "Delete failed");
                error_to_diagnostics(&e)
            }
        };
        Ok(tonic::Response::new(generated::DeleteResponse {
            diagnostics,
        }))
    }

    #[instrument(skip(self, request), name = "grpc.validate_data_source_config")]
    async fn validate_data_source_config(
        &self,
        request: tonic::Request<generated::ValidateDataSourceConfigRequest>,
    ) -> Result<tonic::Response<generated::ValidateDataSourceConfigResponse>, tonic::Status> {
        let req = request.into_inner();
        debug!(data_source_type = %req.data_source_type, "ValidateDataSourceConfig called");

        let diagnostics = match self
            .provider
            .validate_data_source_config(&req.data_source_type, json_value(&req.config))
            .await
        {
            Ok(diagnostics) => {
                log_validation("ValidateDataSourceConfig", &req.data_source_type, &diagnostics);
                diagnostics_to_proto(diagnostics)
            }
            Err(e) => {
                error!(data_source_type = %req.data_source_type, error = %e, "ValidateDataSourceConfig failed");
                error_to_diagnostics(&e)
            }
        };
        Ok(tonic::Response::new(
            generated::ValidateDataSourceConfigResponse { diagnostics },
        ))
    }

    #[instrument(skip(self, request), name = "grpc.read_data_source")]
    async fn read_data_source(
        &self,
        request: tonic::Request<generated::ReadDataSourceRequest>,
    ) -> Result<tonic::Response<generated::ReadDataSourceResponse>, tonic::Status> {
        let req = request.into_inner();
        debug!(data_source_type = %req.data_source_type, "ReadDataSource called");

        let result = self
            .provider
            .read_data_source(&req.data_source_type, json_value(&req.config))
            .await;
        match &result {
            Ok(_) => info!(data_source_type = %req.data_source_type, "ReadDataSource completed successfully"),
            Err(e) => error!(data_source_type = %req.data_source_type, error = %e, "ReadDataSource failed"),
        }

        let (state, diagnostics) = state_to_proto(result);
        Ok(tonic::Response::new(generated::ReadDataSourceResponse {
            state,
            diagnostics,
        }))
    }
}

/// Options for configuring the provider server.
#[derive(Debug, Clone)]
pub struct ServeOptions {
    /// Timeout for graceful shutdown. After receiving a shutdown signal,
    /// the server will wait this long for in-flight requests to complete.
    /// Default: 30 seconds.
    pub shutdown_timeout: Duration,
}

impl Default for ServeOptions {
    fn default() -> Self {
        Self {
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl ServeOptions {
    /// Create new serve options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the shutdown timeout.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT; CTRL+C elsewhere).
///
/// If the handlers cannot be installed this never resolves and the server
/// runs until the host kills it.
async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => info!("Received SIGTERM, initiating graceful shutdown"),
                    _ = sigint.recv() => info!("Received SIGINT, initiating graceful shutdown"),
                }
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!(error = %e, "Failed to install signal handlers");
                std::future::pending::<()>().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received CTRL+C, initiating graceful shutdown"),
            Err(e) => {
                warn!(error = %e, "Failed to install CTRL+C handler");
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Serve a provider implementation as a gRPC server.
///
/// This function:
/// 1. Binds an available port on localhost
/// 2. Outputs the handshake string to stdout
/// 3. Starts the gRPC server
/// 4. Handles shutdown signals (SIGTERM/SIGINT) gracefully
///
/// The handshake format is: `PROVIDER_PLUGIN|<version>|<address>`
///
/// For custom configuration, use [`serve_with_options`].
pub async fn serve<P: ProviderService>(provider: P) -> Result<(), ProviderError> {
    serve_with_options(provider, ServeOptions::default()).await
}

/// Serve a provider with custom options.
pub async fn serve_with_options<P: ProviderService>(
    provider: P,
    options: ServeOptions,
) -> Result<(), ProviderError> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    serve_on_listener(provider, listener, options).await
}

/// Serve a provider on a specific address.
pub async fn serve_on<P: ProviderService>(
    provider: P,
    addr: SocketAddr,
) -> Result<(), ProviderError> {
    serve_on_with_options(provider, addr, ServeOptions::default()).await
}

/// Serve a provider on a specific address with custom options.
pub async fn serve_on_with_options<P: ProviderService>(
    provider: P,
    addr: SocketAddr,
    options: ServeOptions,
) -> Result<(), ProviderError> {
    let listener = TcpListener::bind(addr).await?;
    serve_on_listener(provider, listener, options).await
}

/// The handshake line announcing `addr` to the host.
pub fn handshake_line(addr: SocketAddr) -> String {
    format!("{}|{}|{}", HANDSHAKE_PREFIX, PROTOCOL_VERSION, addr)
}

async fn serve_on_listener<P: ProviderService>(
    provider: P,
    listener: TcpListener,
    options: ServeOptions,
) -> Result<(), ProviderError> {
    let addr = listener.local_addr()?;
    println!("{}", handshake_line(addr));
    info!(address = %addr, "Provider server starting");

    let provider = Arc::new(provider);
    let provider_for_shutdown = Arc::clone(&provider);

    let grpc_service = ProviderGrpcService { provider };
    let server = generated::provider_server::ProviderServer::new(grpc_service);

    let (signalled_tx, signalled_rx) = tokio::sync::oneshot::channel::<()>();
    let shutdown = async move {
        wait_for_shutdown_signal().await;
        let _ = signalled_tx.send(());
    };

    let server_future = Server::builder()
        .add_service(server)
        .serve_with_incoming_shutdown(
            tokio_stream::wrappers::TcpListenerStream::new(listener),
            shutdown,
        );

    // In-flight requests get `shutdown_timeout` to drain once a signal arrives.
    let shutdown_timeout = options.shutdown_timeout;
    let drain_deadline = async move {
        match signalled_rx.await {
            Ok(()) => tokio::time::sleep(shutdown_timeout).await,
            Err(_) => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        result = server_future => match result {
            Ok(()) => info!("Server shutdown complete"),
            Err(e) => {
                error!(error = %e, "Server error");
                return Err(e.into());
            }
        },
        _ = drain_deadline => {
            warn!(timeout = ?shutdown_timeout, "Shutdown timeout exceeded, forcing shutdown");
        }
    }

    debug!("Calling provider stop()");
    if let Err(e) = provider_for_shutdown.stop().await {
        warn!(error = %e, "Provider stop() returned error");
    }

    info!("Provider shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generated::provider_server::Provider;
    use crate::provider::HashicupsProvider;
    use crate::testing::{api_coffee, MockApi, MockCall, MockConnector};
    use serde_json::json;

    fn service(api: Arc<MockApi>) -> ProviderGrpcService<HashicupsProvider> {
        ProviderGrpcService {
            provider: Arc::new(HashicupsProvider::with_connector(MockConnector::new(api))),
        }
    }

    async fn configure(svc: &ProviderGrpcService<HashicupsProvider>) {
        let response = svc
            .configure(tonic::Request::new(generated::ConfigureRequest {
                config: json_bytes(&json!({
                    "host": "http://localhost:19090",
                    "username": "education",
                    "password": "test123"
                })),
            }))
            .await
            .unwrap()
            .into_inner();
        assert!(response.diagnostics.is_empty());
    }

    #[test]
    fn test_handshake_line() {
        let addr: SocketAddr = "127.0.0.1:50051".parse().unwrap();
        assert_eq!(handshake_line(addr), "PROVIDER_PLUGIN|1|127.0.0.1:50051");
    }

    #[test]
    fn test_serve_options() {
        assert_eq!(ServeOptions::new().shutdown_timeout, Duration::from_secs(30));
        let options = ServeOptions::new().with_shutdown_timeout(Duration::from_secs(5));
        assert_eq!(options.shutdown_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_nested_schema_to_proto() {
        let schema = HashicupsProvider::new().schema();
        let order = schema_to_proto(&schema.resources["hashicups_order"]);

        let names: Vec<&str> = order.attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["id", "items", "last_updated"]);

        let items = &order.attributes[1];
        assert!(items.required);
        assert!(items.r#type.is_empty());
        let nested = items.nested.as_ref().unwrap();
        assert_eq!(
            nested.nesting_mode,
            generated::nested_attributes::NestingMode::List as i32
        );
        let coffee = nested.attributes.iter().find(|a| a.name == "coffee").unwrap();
        let coffee_nested = coffee.nested.as_ref().unwrap();
        assert_eq!(
            coffee_nested.nesting_mode,
            generated::nested_attributes::NestingMode::Single as i32
        );
        let id = coffee_nested.attributes.iter().find(|a| a.name == "id").unwrap();
        assert!(id.required);
        assert_eq!(json_value(&id.r#type), json!("number"));
    }

    #[test]
    fn test_diagnostics_to_proto() {
        let proto = diagnostics_to_proto(vec![
            Diagnostic::error("Unable to find host").with_attribute("host"),
            Diagnostic::warning("careful").with_detail("details"),
        ]);
        assert_eq!(proto[0].severity, generated::diagnostic::Severity::Error as i32);
        assert_eq!(proto[0].attribute, "host");
        assert!(proto[0].detail.is_empty());
        assert_eq!(proto[1].severity, generated::diagnostic::Severity::Warning as i32);
        assert_eq!(proto[1].detail, "details");
    }

    #[tokio::test]
    async fn test_get_metadata() {
        let svc = service(Arc::new(MockApi::new()));
        let response = svc
            .get_metadata(tonic::Request::new(generated::GetMetadataRequest {}))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(response.resources, vec!["hashicups_order"]);
        assert_eq!(response.data_sources, vec!["hashicups_coffees"]);
        let capabilities = response.server_capabilities.unwrap();
        assert!(capabilities.plan_destroy);
    }

    #[tokio::test]
    async fn test_read_data_source_failure_is_one_diagnostic() {
        let api = Arc::new(MockApi::new().failing(MockCall::GetCoffees, 500, "boom"));
        let svc = service(api);
        configure(&svc).await;

        let response = svc
            .read_data_source(tonic::Request::new(generated::ReadDataSourceRequest {
                data_source_type: "hashicups_coffees".to_string(),
                config: vec![],
            }))
            .await
            .unwrap()
            .into_inner();

        assert!(response.state.is_empty());
        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].summary, "Error retrieving coffee");
        assert_eq!(response.diagnostics[0].detail, "status: 500, body: boom");
    }

    #[tokio::test]
    async fn test_create_and_read_over_grpc() {
        let api = Arc::new(
            MockApi::new().with_coffees(vec![api_coffee(3, "Packer Spiced Latte", &[1])]),
        );
        let svc = service(api.clone());
        configure(&svc).await;

        let created = svc
            .create(tonic::Request::new(generated::CreateRequest {
                resource_type: "hashicups_order".to_string(),
                planned_state: json_bytes(&json!({
                    "items": [{"quantity": 2, "coffee": {"id": 3}}]
                })),
            }))
            .await
            .unwrap()
            .into_inner();
        assert!(created.diagnostics.is_empty());
        let state = json_value(&created.state);
        assert_eq!(state["id"], json!("1"));

        let read = svc
            .read(tonic::Request::new(generated::ReadRequest {
                resource_type: "hashicups_order".to_string(),
                current_state: created.state.clone(),
            }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(json_value(&read.state), state);
        assert_eq!(api.calls(MockCall::GetOrder), 1);
    }

    #[tokio::test]
    async fn test_create_unconfigured_over_grpc() {
        let api = Arc::new(MockApi::new());
        let svc = service(api.clone());

        let response = svc
            .create(tonic::Request::new(generated::CreateRequest {
                resource_type: "hashicups_order".to_string(),
                planned_state: json_bytes(&json!({
                    "items": [{"quantity": 2, "coffee": {"id": 3}}]
                })),
            }))
            .await
            .unwrap()
            .into_inner();

        assert!(response.state.is_empty());
        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].summary, "Provider not configured");
        assert_eq!(api.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_plan_destroy_over_grpc() {
        let svc = service(Arc::new(MockApi::new()));
        let response = svc
            .plan(tonic::Request::new(generated::PlanRequest {
                resource_type: "hashicups_order".to_string(),
                prior_state: json_bytes(&json!({"id": "1", "items": []})),
                proposed_state: vec![],
                config: vec![],
            }))
            .await
            .unwrap()
            .into_inner();

        assert!(response.planned_state.is_empty());
        assert_eq!(response.changes.len(), 1);
        assert!(!response.requires_replace);
        assert!(response.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn test_delete_unknown_type() {
        let svc = service(Arc::new(MockApi::new()));
        let response = svc
            .delete(tonic::Request::new(generated::DeleteRequest {
                resource_type: "hashicups_tea".to_string(),
                current_state: vec![],
            }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(
            response.diagnostics[0].summary,
            "Unknown resource type: hashicups_tea"
        );
    }
}
