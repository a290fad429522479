//! Testing utilities for the provider.
//!
//! [`ProviderTester`] drives any [`ProviderService`] in process, without a
//! gRPC server. [`MockApi`] and [`MockConnector`] stand in for the HashiCups
//! API so callbacks can be exercised and their API calls counted.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use hashicups_provider::testing::{api_coffee, MockApi, MockCall, MockConnector, ProviderTester};
//! use hashicups_provider::HashicupsProvider;
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let api = Arc::new(MockApi::new().with_coffees(vec![api_coffee(1, "HCP Aeropress", &[6])]));
//! let tester = ProviderTester::new(HashicupsProvider::with_connector(MockConnector::new(api.clone())));
//!
//! tester
//!     .configure(json!({"host": "http://localhost:19090", "username": "education", "password": "test123"}))
//!     .await
//!     .unwrap();
//! let state = tester.read_data_source("hashicups_coffees", json!({})).await.unwrap();
//!
//! assert_eq!(state["coffees"][0]["name"], "HCP Aeropress");
//! assert_eq!(api.calls(MockCall::GetCoffees), 1);
//! # });
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use crate::client::{
    ClientError, Coffee, HashicupsApi, Ingredient, NewOrderItem, Order, OrderItem,
};
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::price::Price;
use crate::provider::Connector;
use crate::schema::{Diagnostic, ProviderSchema};
use crate::server::ProviderService;
use crate::types::{OperationResponse, PlanResult};

/// A test harness for provider implementations.
///
/// Wraps a `ProviderService` and offers simplified methods for testing
/// without a gRPC server.
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl<P: ProviderService> ProviderTester<P> {
    /// Create a new tester for the given provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Get a reference to the underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    // =========================================================================
    // Schema & Metadata
    // =========================================================================

    /// Get the provider's schema.
    pub fn schema(&self) -> ProviderSchema {
        self.provider.schema()
    }

    /// Get the list of resource type names.
    pub fn resource_types(&self) -> Vec<String> {
        self.provider.metadata().resources
    }

    /// Get the list of data source type names.
    pub fn data_source_types(&self) -> Vec<String> {
        self.provider.metadata().data_sources
    }

    // =========================================================================
    // Provider Lifecycle
    // =========================================================================

    /// Validate provider configuration.
    ///
    /// Returns `Err` with the error diagnostics if there are any.
    pub async fn validate_provider_config(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.validate_provider_config(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Configure the provider.
    ///
    /// Returns `Err` with the error diagnostics if there are any.
    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.configure(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Stop the provider.
    pub async fn stop(&self) -> Result<(), ProviderError> {
        self.provider.stop().await
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Validate a resource configuration.
    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_resource_config(resource_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    /// Plan a resource creation (no prior state).
    pub async fn plan_create(
        &self,
        resource_type: &str,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, None, proposed_state.clone(), proposed_state)
            .await
    }

    /// Plan a resource update.
    pub async fn plan_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(
                resource_type,
                Some(prior_state),
                proposed_state.clone(),
                proposed_state,
            )
            .await
    }

    /// Plan a resource deletion.
    pub async fn plan_delete(
        &self,
        resource_type: &str,
        prior_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), Value::Null, Value::Null)
            .await
    }

    /// Create a new resource.
    pub async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.create(resource_type, planned_state).await
    }

    /// Create a resource and return what the host would receive.
    pub async fn create_response(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> OperationResponse<Value> {
        self.create(resource_type, planned_state).await.into()
    }

    /// Read the current state of a resource.
    pub async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.read(resource_type, current_state).await
    }

    /// Read a resource and return what the host would receive.
    pub async fn read_response(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> OperationResponse<Value> {
        self.read(resource_type, current_state).await.into()
    }

    /// Update an existing resource.
    pub async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .update(resource_type, prior_state, planned_state)
            .await
    }

    /// Delete a resource.
    pub async fn delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        self.provider.delete(resource_type, current_state).await
    }

    // =========================================================================
    // Data Source Operations
    // =========================================================================

    /// Validate a data source configuration.
    pub async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_data_source_config(data_source_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    /// Read data from a data source.
    pub async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .read_data_source(data_source_type, config)
            .await
    }

    /// Read a data source and return what the host would receive.
    pub async fn read_data_source_response(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> OperationResponse<Value> {
        self.read_data_source(data_source_type, config).await.into()
    }

    // =========================================================================
    // Lifecycle Helpers
    // =========================================================================

    /// Run a full create lifecycle: plan → create → read.
    ///
    /// Returns the final state after read.
    pub async fn lifecycle_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let plan_result = self.plan_create(resource_type, config).await?;
        let created_state = self
            .create(resource_type, plan_result.planned_state)
            .await?;
        self.read(resource_type, created_state).await
    }

    /// Run a full update lifecycle: plan → update → read.
    ///
    /// Returns the final state after read.
    pub async fn lifecycle_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<Value, ProviderError> {
        let plan_result = self
            .plan_update(resource_type, prior_state.clone(), proposed_state)
            .await?;
        let updated_state = self
            .update(resource_type, prior_state, plan_result.planned_state)
            .await?;
        self.read(resource_type, updated_state).await
    }

    /// Run a full delete lifecycle: plan → delete.
    pub async fn lifecycle_delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        self.plan_delete(resource_type, current_state.clone())
            .await?;
        self.delete(resource_type, current_state).await
    }
}

/// Error type for test operations that may fail with diagnostics.
#[derive(Debug)]
pub enum TestError {
    /// The operation failed with diagnostics.
    Diagnostics(Vec<Diagnostic>),
    /// The operation failed with a provider error.
    Provider(ProviderError),
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestError::Diagnostics(diags) => {
                writeln!(f, "Operation failed with {} diagnostic(s):", diags.len())?;
                for diag in diags {
                    write!(f, "  [{:?}] {}", diag.severity, diag.summary)?;
                    if let Some(detail) = &diag.detail {
                        write!(f, ": {}", detail)?;
                    }
                    if let Some(attr) = &diag.attribute {
                        write!(f, " (at {})", attr)?;
                    }
                    writeln!(f)?;
                }
                Ok(())
            }
            TestError::Provider(e) => write!(f, "Provider error: {}", e),
        }
    }
}

impl std::error::Error for TestError {}

impl From<ProviderError> for TestError {
    fn from(e: ProviderError) -> Self {
        TestError::Provider(e)
    }
}

fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors: Vec<_> = diagnostics.into_iter().filter(Diagnostic::is_error).collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

// =========================================================================
// Assertion Helpers
// =========================================================================

/// Assert that a plan has a change for a specific attribute path.
///
/// # Panics
///
/// Panics if the plan does not have a change for the given path.
pub fn assert_plan_changes_attribute(plan: &PlanResult, path: &str) {
    let has_change = plan.changes.iter().any(|c| c.path == path);
    assert!(
        has_change,
        "Expected plan to change attribute '{}', but it was not changed. Changed attributes: {:?}",
        path,
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that a plan result indicates no changes.
///
/// # Panics
///
/// Panics if the plan has any changes.
pub fn assert_plan_no_changes(plan: &PlanResult) {
    assert!(
        plan.changes.is_empty(),
        "Expected no changes, but got {} change(s): {:?}",
        plan.changes.len(),
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that diagnostics contain no errors.
///
/// # Panics
///
/// Panics if there are any error diagnostics.
pub fn assert_no_errors(diagnostics: &[Diagnostic]) {
    let errors: Vec<_> = diagnostics.iter().filter(|d| d.is_error()).collect();

    assert!(
        errors.is_empty(),
        "Expected no errors, but got {} error(s): {:?}",
        errors.len(),
        errors.iter().map(|d| &d.summary).collect::<Vec<_>>()
    );
}

/// Assert that a response failed with exactly one error, whose summary is `summary`.
///
/// # Panics
///
/// Panics if the response carries state or any other diagnostics.
pub fn assert_single_error<T: std::fmt::Debug>(response: &OperationResponse<T>, summary: &str) {
    assert!(
        response.state.is_none(),
        "Expected no state, got {:?}",
        response.state
    );
    assert_eq!(
        response.diagnostics.len(),
        1,
        "Expected exactly one diagnostic, got {:?}",
        response.diagnostics
    );
    assert!(response.diagnostics[0].is_error());
    assert_eq!(response.diagnostics[0].summary, summary);
}

// =========================================================================
// API doubles
// =========================================================================

/// The API calls [`MockApi`] counts and can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockCall {
    /// `GET /coffees`.
    GetCoffees,
    /// `POST /orders`.
    CreateOrder,
    /// `GET /orders/{id}`.
    GetOrder,
}

impl MockCall {
    fn index(self) -> usize {
        match self {
            MockCall::GetCoffees => 0,
            MockCall::CreateOrder => 1,
            MockCall::GetOrder => 2,
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory stand-in for the HashiCups API.
///
/// Orders it creates are kept and returned by `get_order`; unknown order IDs
/// answer with a 404. Any call can be scripted to fail with a status.
#[derive(Debug, Default)]
pub struct MockApi {
    coffees: Vec<Coffee>,
    created_order: Option<Order>,
    failures: HashMap<MockCall, (u16, String)>,
    orders: Mutex<HashMap<String, Order>>,
    last_order_request: Mutex<Option<Vec<NewOrderItem>>>,
    next_order_id: AtomicI64,
    calls: [AtomicUsize; 3],
}

impl MockApi {
    /// An API with an empty menu and no orders.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `coffees` from `get_coffees`; new orders look coffees up here.
    pub fn with_coffees(mut self, coffees: Vec<Coffee>) -> Self {
        self.coffees = coffees;
        self
    }

    /// Answer every `create_order` with `order`, regardless of the request.
    pub fn with_created_order(mut self, order: Order) -> Self {
        self.created_order = Some(order);
        self
    }

    /// Seed an existing order.
    pub fn with_order(self, order: Order) -> Self {
        lock(&self.orders).insert(order.id.to_string(), order);
        self
    }

    /// Make `call` fail with the given HTTP status and body.
    pub fn failing(mut self, call: MockCall, status: u16, body: impl Into<String>) -> Self {
        self.failures.insert(call, (status, body.into()));
        self
    }

    /// How many times `call` was made.
    pub fn calls(&self, call: MockCall) -> usize {
        self.calls[call.index()].load(Ordering::SeqCst)
    }

    /// How many API calls were made in total.
    pub fn total_calls(&self) -> usize {
        self.calls.iter().map(|c| c.load(Ordering::SeqCst)).sum()
    }

    /// The items of the most recent `create_order` call.
    pub fn last_order_request(&self) -> Option<Vec<NewOrderItem>> {
        lock(&self.last_order_request).clone()
    }

    fn record(&self, call: MockCall) -> Result<(), ClientError> {
        self.calls[call.index()].fetch_add(1, Ordering::SeqCst);
        match self.failures.get(&call) {
            Some((status, body)) => Err(ClientError::Status {
                status: *status,
                body: body.clone(),
            }),
            None => Ok(()),
        }
    }

    fn menu_coffee(&self, id: i64) -> Coffee {
        self.coffees
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .unwrap_or_else(|| api_coffee(id, "", &[]))
    }
}

#[async_trait::async_trait]
impl HashicupsApi for MockApi {
    async fn get_coffees(&self) -> Result<Vec<Coffee>, ClientError> {
        self.record(MockCall::GetCoffees)?;
        Ok(self.coffees.clone())
    }

    async fn create_order(&self, items: &[NewOrderItem]) -> Result<Order, ClientError> {
        self.record(MockCall::CreateOrder)?;
        *lock(&self.last_order_request) = Some(items.to_vec());

        let order = match &self.created_order {
            Some(order) => order.clone(),
            None => Order {
                id: self.next_order_id.fetch_add(1, Ordering::SeqCst) + 1,
                items: items
                    .iter()
                    .map(|item| OrderItem {
                        coffee: self.menu_coffee(item.coffee.id),
                        quantity: item.quantity,
                    })
                    .collect(),
            },
        };
        lock(&self.orders).insert(order.id.to_string(), order.clone());
        Ok(order)
    }

    async fn get_order(&self, order_id: &str) -> Result<Order, ClientError> {
        self.record(MockCall::GetOrder)?;
        lock(&self.orders)
            .get(order_id)
            .cloned()
            .ok_or_else(|| ClientError::Status {
                status: 404,
                body: "order not found".to_string(),
            })
    }
}

/// [`Connector`] handing out a shared [`MockApi`], or failing with a status.
///
/// Clones share their connection count.
#[derive(Debug, Clone)]
pub struct MockConnector {
    api: Option<Arc<MockApi>>,
    failure: Option<(u16, String)>,
    connections: Arc<AtomicUsize>,
    last_config: Arc<Mutex<Option<ProviderConfig>>>,
}

impl MockConnector {
    /// Connector that always yields `api`.
    pub fn new(api: Arc<MockApi>) -> Self {
        Self {
            api: Some(api),
            failure: None,
            connections: Arc::default(),
            last_config: Arc::default(),
        }
    }

    /// Connector whose sign-in always fails with `status`.
    pub fn failing(status: u16, body: impl Into<String>) -> Self {
        Self {
            api: None,
            failure: Some((status, body.into())),
            connections: Arc::default(),
            last_config: Arc::default(),
        }
    }

    /// How many clients were handed out.
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// The configuration of the most recent connection attempt.
    pub fn last_config(&self) -> Option<ProviderConfig> {
        lock(&self.last_config).clone()
    }
}

#[async_trait::async_trait]
impl Connector for MockConnector {
    async fn connect(
        &self,
        config: &ProviderConfig,
    ) -> Result<Arc<dyn HashicupsApi>, ClientError> {
        *lock(&self.last_config) = Some(config.clone());
        if let Some((status, body)) = &self.failure {
            return Err(ClientError::Status {
                status: *status,
                body: body.clone(),
            });
        }
        let api = self.api.clone().unwrap_or_default();
        self.connections.fetch_add(1, Ordering::SeqCst);
        Ok(api)
    }
}

/// An API coffee with placeholder text and the given ingredient IDs.
pub fn api_coffee(id: i64, name: &str, ingredient_ids: &[i64]) -> Coffee {
    Coffee {
        id,
        name: name.to_string(),
        teaser: format!("{} teaser", name),
        description: String::new(),
        price: Price::from(200),
        image: format!("/{}.png", id),
        ingredients: ingredient_ids
            .iter()
            .map(|&id| Ingredient {
                id,
                name: String::new(),
                quantity: 0,
                unit: String::new(),
            })
            .collect(),
    }
}
